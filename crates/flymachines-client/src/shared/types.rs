use crate::shared::error::{MachinesError, MachinesResult};
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;

pub use flymachines_core::{Config, Lease, Machine, Size, State};

/// Header carrying the lease nonce on release.
pub const LEASE_NONCE_HEADER: &str = "fly-machine-lease-nonce";

fn require_machine_id(machine_id: &str) -> MachinesResult<()> {
    if machine_id.is_empty() {
        return Err(MachinesError::MachineIdRequired);
    }
    Ok(())
}

/// Whole seconds, rounded up, never below one.
pub(crate) fn duration_secs(duration: Duration) -> u64 {
    let secs = duration
        .as_secs()
        .saturating_add(u64::from(duration.subsec_nanos() > 0));
    secs.max(1)
}

/// Filter for listing machines. The filter is applied client-side.
#[derive(Debug, Clone, Default)]
pub struct ListMachinesRequest {
    pub state: Option<State>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateMachineRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Sent as `null` when absent; the API decides whether that is acceptable.
    pub config: Option<Config>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<Size>,
    #[serde(skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
}

#[derive(Debug, Clone, Default)]
pub struct StopMachineRequest {
    pub machine_id: String,
    pub signal: Option<String>,
    pub timeout: Option<Duration>,
}

impl StopMachineRequest {
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> MachinesResult<()> {
        require_machine_id(&self.machine_id)
    }

    pub(crate) fn body(&self) -> StopBody {
        StopBody {
            signal: self.signal.clone(),
            timeout: self.timeout.map(|t| format!("{}s", duration_secs(t))),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct StopBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    signal: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    timeout: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct DeleteMachineRequest {
    pub machine_id: String,
    /// Ask the API to kill a running machine instead of refusing.
    pub kill: bool,
}

impl DeleteMachineRequest {
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            kill: false,
        }
    }

    pub fn validate(&self) -> MachinesResult<()> {
        require_machine_id(&self.machine_id)
    }
}

/// Long-poll until a machine reaches `target_state`.
#[derive(Debug, Clone)]
pub struct WaitRequest {
    pub machine_id: String,
    pub target_state: State,
    /// Scopes the wait to one instance generation.
    pub instance_id: Option<String>,
    /// Server-side ceiling for the long-poll.
    pub timeout: Option<Duration>,
}

impl WaitRequest {
    pub fn new(machine_id: impl Into<String>, target_state: State) -> Self {
        Self {
            machine_id: machine_id.into(),
            target_state,
            instance_id: None,
            timeout: None,
        }
    }

    pub fn with_instance_id(mut self, instance_id: impl Into<String>) -> Self {
        let instance_id = instance_id.into();
        self.instance_id = (!instance_id.is_empty()).then_some(instance_id);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn validate(&self) -> MachinesResult<()> {
        require_machine_id(&self.machine_id)?;
        if !self.target_state.is_wait_target() {
            return Err(MachinesError::InvalidWaitState(self.target_state));
        }
        Ok(())
    }

    pub(crate) fn query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("state", self.target_state.as_str().to_string())];
        if let Some(instance_id) = &self.instance_id {
            query.push(("instance_id", instance_id.clone()));
        }
        if let Some(timeout) = self.timeout {
            query.push(("timeout", duration_secs(timeout).to_string()));
        }
        query
    }
}

#[derive(Debug, Clone, Default)]
pub struct AcquireLeaseRequest {
    pub machine_id: String,
    /// Requested lifetime in seconds; the API picks a default when absent.
    pub ttl: Option<u64>,
}

impl AcquireLeaseRequest {
    pub fn new(machine_id: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            ttl: None,
        }
    }

    pub fn with_ttl(mut self, ttl: u64) -> Self {
        self.ttl = Some(ttl);
        self
    }

    pub fn validate(&self) -> MachinesResult<()> {
        require_machine_id(&self.machine_id)
    }

    pub(crate) fn body(&self) -> LeaseBody {
        LeaseBody { ttl: self.ttl }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LeaseBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    ttl: Option<u64>,
}

#[derive(Clone, Default)]
pub struct ReleaseLeaseRequest {
    pub machine_id: String,
    pub nonce: String,
}

impl ReleaseLeaseRequest {
    pub fn new(machine_id: impl Into<String>, nonce: impl Into<String>) -> Self {
        Self {
            machine_id: machine_id.into(),
            nonce: nonce.into(),
        }
    }

    pub fn for_lease(machine_id: impl Into<String>, lease: &Lease) -> Self {
        Self::new(machine_id, lease.nonce.clone())
    }

    pub fn validate(&self) -> MachinesResult<()> {
        require_machine_id(&self.machine_id)?;
        if self.nonce.is_empty() {
            return Err(MachinesError::NonceRequired);
        }
        Ok(())
    }
}

impl std::fmt::Debug for ReleaseLeaseRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseLeaseRequest")
            .field("machine_id", &self.machine_id)
            .field("nonce", &"<redacted>")
            .finish()
    }
}
