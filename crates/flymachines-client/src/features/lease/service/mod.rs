use crate::features::transport::{ApiRequest, ApiService};
use crate::shared::context::RequestContext;
use crate::shared::error::MachinesResult;
use crate::shared::types::{AcquireLeaseRequest, Lease, ReleaseLeaseRequest, LEASE_NONCE_HEADER};
use std::sync::Arc;
use tracing::info;

/// Acquires and releases machine leases.
///
/// Holds no lease state of its own: exclusivity is arbitrated by the API, and
/// two services in different processes see only what the API reports. The
/// nonce is a bearer capability, not a lock; release it explicitly when the
/// critical section ends rather than waiting for expiry.
pub struct LeaseService {
    api: Arc<ApiService>,
}

impl LeaseService {
    pub fn new(api: Arc<ApiService>) -> Self {
        Self { api }
    }

    fn lease_path(machine_id: &str) -> [&str; 3] {
        ["machines", machine_id, "lease"]
    }

    /// Acquire a lease. A conflicting live lease held by someone else comes
    /// back as a plain API error carrying the remote status.
    pub async fn acquire(
        &self,
        ctx: &RequestContext,
        request: AcquireLeaseRequest,
    ) -> MachinesResult<Lease> {
        request.validate()?;

        let api_request =
            ApiRequest::post(&Self::lease_path(&request.machine_id)).json(&request.body())?;
        let lease: Lease = self.api.fetch_json(ctx, api_request).await?;

        info!(
            machine_id = %request.machine_id,
            owner = %lease.owner,
            expires_at = %lease
                .expires_at_time()
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            "Lease acquired"
        );

        Ok(lease)
    }

    /// Release a lease. Authorization is possession of the nonce, sent in
    /// its own header. A stale or mismatched nonce is an ordinary API error.
    pub async fn release(
        &self,
        ctx: &RequestContext,
        request: ReleaseLeaseRequest,
    ) -> MachinesResult<()> {
        request.validate()?;

        let api_request = ApiRequest::delete(&Self::lease_path(&request.machine_id))
            .header(LEASE_NONCE_HEADER, request.nonce.as_str());
        self.api.fetch_empty(ctx, api_request).await?;

        info!(machine_id = %request.machine_id, "Lease released");

        Ok(())
    }
}
