use crate::features::transport::{ApiRequest, ApiService};
use crate::shared::context::RequestContext;
use crate::shared::error::MachinesResult;
use crate::shared::types::{Machine, State, WaitRequest};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::info;

/// Blocks on the API's long-poll until a machine reaches a target state.
///
/// There is no client-side polling: one request is held open by the server.
/// The request's `timeout` is the server's ceiling; the context's deadline is
/// the caller's. Whichever fires first decides between an API error and
/// [`crate::MachinesError::DeadlineExceeded`].
pub struct WaitService {
    api: Arc<ApiService>,
}

impl WaitService {
    pub fn new(api: Arc<ApiService>) -> Self {
        Self { api }
    }

    pub async fn wait(&self, ctx: &RequestContext, request: WaitRequest) -> MachinesResult<()> {
        request.validate()?;

        let api_request = request.query().into_iter().fold(
            ApiRequest::get(&["machines", request.machine_id.as_str(), "wait"]),
            |api_request, (key, value)| api_request.query(key, value),
        );

        let started = Instant::now();
        self.api.fetch_empty(ctx, api_request).await?;

        info!(
            machine_id = %request.machine_id,
            state = %request.target_state,
            instance_id = request.instance_id.as_deref().unwrap_or_default(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Machine reached target state"
        );

        Ok(())
    }

    /// Starting always targets the latest instance, so no instance id is sent.
    pub async fn wait_started(
        &self,
        ctx: &RequestContext,
        machine: &Machine,
        timeout: Option<Duration>,
    ) -> MachinesResult<()> {
        self.wait(ctx, with_timeout(WaitRequest::new(&machine.id, State::Started), timeout))
            .await
    }

    /// Scoped to the machine's current instance so a replacement that starts
    /// later cannot satisfy the wait.
    pub async fn wait_stopped(
        &self,
        ctx: &RequestContext,
        machine: &Machine,
        timeout: Option<Duration>,
    ) -> MachinesResult<()> {
        let request = WaitRequest::new(&machine.id, State::Stopped)
            .with_instance_id(machine.instance_id.as_str());
        self.wait(ctx, with_timeout(request, timeout)).await
    }

    /// A destroyed instance cannot disambiguate anything; no instance id.
    pub async fn wait_destroyed(
        &self,
        ctx: &RequestContext,
        machine: &Machine,
        timeout: Option<Duration>,
    ) -> MachinesResult<()> {
        self.wait(ctx, with_timeout(WaitRequest::new(&machine.id, State::Destroyed), timeout))
            .await
    }
}

fn with_timeout(request: WaitRequest, timeout: Option<Duration>) -> WaitRequest {
    match timeout {
        Some(timeout) => request.with_timeout(timeout),
        None => request,
    }
}
