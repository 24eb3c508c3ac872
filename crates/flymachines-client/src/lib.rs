//! Client for the Fly Machines API.
//!
//! [`MachinesClient`] covers the machine lifecycle calls, the lease protocol
//! for coordinating exclusive writes across independent callers, and the
//! long-poll wait for state transitions. Every operation is a single
//! request/response exchange driven by a [`RequestContext`].
//!
//! ```no_run
//! use flymachines_client::{ClientConfig, MachinesClient, RequestContext};
//! use std::time::Duration;
//!
//! # async fn example() -> flymachines_client::MachinesResult<()> {
//! let client = MachinesClient::with_reqwest(ClientConfig::from_env("my-app"))?;
//! let ctx = RequestContext::background().with_timeout(Duration::from_secs(60));
//!
//! let machine = client.get(&ctx, "4d89040f431938").await?;
//! let lease = client.acquire_lease(&ctx, &machine.id, Some(30)).await?;
//! client.wait_started(&ctx, &machine, Some(Duration::from_secs(30))).await?;
//! client.release_lease(&ctx, &machine.id, &lease.nonce).await?;
//! # Ok(())
//! # }
//! ```

pub mod features;
pub mod shared;

use std::sync::Arc;
use std::time::Duration;

use features::lease::LeaseService;
use features::machines::MachineService;
use features::transport::ApiService;
use features::wait::WaitService;

pub use features::transport::{
    ReqwestTransport, Transport, TransportError, TransportRequest, TransportResponse,
};
pub use shared::config::{ClientConfig, DEFAULT_BASE_URL, PRIVATE_BASE_URL, PUBLIC_BASE_URL};
pub use shared::context::{CancelHandle, RequestContext};
pub use shared::error::{ApiError, MachinesError, MachinesResult};
pub use shared::types::{
    AcquireLeaseRequest, CreateMachineRequest, DeleteMachineRequest, ListMachinesRequest,
    ReleaseLeaseRequest, StopMachineRequest, WaitRequest, LEASE_NONCE_HEADER,
};

pub use flymachines_core::{Config, Lease, Machine, State};

/// Facade over the machine, lease and wait services.
///
/// Holds no per-call mutable state; one client can be shared across tasks.
/// Two callers racing for the same lease are arbitrated by the API alone.
pub struct MachinesClient {
    api: Arc<ApiService>,
    machines: MachineService,
    leases: LeaseService,
    waits: WaitService,
}

impl MachinesClient {
    pub fn new(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        let api = Arc::new(ApiService::new(config, transport));
        Self {
            machines: MachineService::new(api.clone()),
            leases: LeaseService::new(api.clone()),
            waits: WaitService::new(api.clone()),
            api,
        }
    }

    /// Builds a client backed by the default reqwest transport.
    pub fn with_reqwest(config: ClientConfig) -> MachinesResult<Self> {
        let transport = ReqwestTransport::new()?;
        Ok(Self::new(config, Arc::new(transport)))
    }

    pub fn config(&self) -> &ClientConfig {
        self.api.config()
    }

    pub async fn list(
        &self,
        ctx: &RequestContext,
        request: ListMachinesRequest,
    ) -> MachinesResult<Vec<Machine>> {
        self.machines.list(ctx, request).await
    }

    pub async fn get(&self, ctx: &RequestContext, machine_id: &str) -> MachinesResult<Machine> {
        self.machines.get(ctx, machine_id).await
    }

    pub async fn create(
        &self,
        ctx: &RequestContext,
        request: CreateMachineRequest,
    ) -> MachinesResult<Machine> {
        self.machines.create(ctx, request).await
    }

    pub async fn stop(&self, ctx: &RequestContext, request: StopMachineRequest) -> MachinesResult<()> {
        self.machines.stop(ctx, request).await
    }

    pub async fn delete(
        &self,
        ctx: &RequestContext,
        request: DeleteMachineRequest,
    ) -> MachinesResult<()> {
        self.machines.delete(ctx, request).await
    }

    pub async fn acquire_lease(
        &self,
        ctx: &RequestContext,
        machine_id: &str,
        ttl: Option<u64>,
    ) -> MachinesResult<Lease> {
        let request = AcquireLeaseRequest {
            machine_id: machine_id.to_string(),
            ttl,
        };
        self.leases.acquire(ctx, request).await
    }

    pub async fn release_lease(
        &self,
        ctx: &RequestContext,
        machine_id: &str,
        nonce: &str,
    ) -> MachinesResult<()> {
        self.leases
            .release(ctx, ReleaseLeaseRequest::new(machine_id, nonce))
            .await
    }

    /// Releases a lease previously returned by [`MachinesClient::acquire_lease`].
    pub async fn release(
        &self,
        ctx: &RequestContext,
        machine_id: &str,
        lease: &Lease,
    ) -> MachinesResult<()> {
        self.leases
            .release(ctx, ReleaseLeaseRequest::for_lease(machine_id, lease))
            .await
    }

    pub async fn wait(&self, ctx: &RequestContext, request: WaitRequest) -> MachinesResult<()> {
        self.waits.wait(ctx, request).await
    }

    pub async fn wait_started(
        &self,
        ctx: &RequestContext,
        machine: &Machine,
        timeout: Option<Duration>,
    ) -> MachinesResult<()> {
        self.waits.wait_started(ctx, machine, timeout).await
    }

    pub async fn wait_stopped(
        &self,
        ctx: &RequestContext,
        machine: &Machine,
        timeout: Option<Duration>,
    ) -> MachinesResult<()> {
        self.waits.wait_stopped(ctx, machine, timeout).await
    }

    pub async fn wait_destroyed(
        &self,
        ctx: &RequestContext,
        machine: &Machine,
        timeout: Option<Duration>,
    ) -> MachinesResult<()> {
        self.waits.wait_destroyed(ctx, machine, timeout).await
    }
}
