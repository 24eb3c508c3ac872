pub mod config;

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use config::{
    CheckConfig, CheckHeader, ConcurrencyConfig, Config, CpuKind, GuestConfig, InitConfig,
    PortConfig, Protocol, RestartConfig, RestartPolicy, ServiceConfig, Schedule, Size,
};

/// Lifecycle state reported for a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum State {
    #[default]
    Created,
    Starting,
    Started,
    Stopping,
    Stopped,
    Replacing,
    Destroying,
    Destroyed,
    /// Any state this client does not know about yet.
    #[serde(other)]
    Unknown,
}

impl State {
    pub const ALL: [State; 8] = [
        State::Created,
        State::Starting,
        State::Started,
        State::Stopping,
        State::Stopped,
        State::Replacing,
        State::Destroying,
        State::Destroyed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            State::Created => "created",
            State::Starting => "starting",
            State::Started => "started",
            State::Stopping => "stopping",
            State::Stopped => "stopped",
            State::Replacing => "replacing",
            State::Destroying => "destroying",
            State::Destroyed => "destroyed",
            State::Unknown => "unknown",
        }
    }

    /// Whether the remote wait endpoint accepts this state as a target.
    pub fn is_wait_target(&self) -> bool {
        matches!(self, State::Started | State::Stopped | State::Destroyed)
    }

    /// States directly reachable from this one.
    pub fn successors(&self) -> &'static [State] {
        match self {
            State::Created => &[State::Starting, State::Destroying],
            State::Starting => &[State::Started, State::Destroying],
            State::Started => &[State::Stopping, State::Replacing, State::Destroying],
            State::Stopping => &[State::Stopped, State::Destroying],
            State::Stopped => &[State::Destroying],
            State::Replacing => &[State::Starting, State::Destroying],
            State::Destroying => &[State::Destroyed],
            State::Destroyed | State::Unknown => &[],
        }
    }

    pub fn can_transition_to(&self, next: State) -> bool {
        self.successors().contains(&next)
    }

    pub fn is_terminal(&self) -> bool {
        self.successors().is_empty() && *self != State::Unknown
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStateError(pub String);

impl fmt::Display for ParseStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown machine state '{}'", self.0)
    }
}

impl std::error::Error for ParseStateError {}

impl FromStr for State {
    type Err = ParseStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        State::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseStateError(s.to_string()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    #[serde(default)]
    pub registry: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub tag: String,
    #[serde(default)]
    pub digest: String,
}

/// Read-only projection of a remote machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Machine {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub state: State,
    #[serde(default)]
    pub region: String,
    /// Changes every time the underlying instance is replaced.
    #[serde(default)]
    pub instance_id: String,
    #[serde(default)]
    pub private_ip: String,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
    #[serde(default)]
    pub image_ref: ImageRef,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub config: Config,
}

impl Machine {
    pub fn can_stop(&self) -> bool {
        matches!(self.state, State::Starting | State::Started)
    }

    pub fn can_delete(&self) -> bool {
        matches!(
            self.state,
            State::Starting | State::Started | State::Stopping | State::Stopped
        )
    }

    pub fn created_at_time(&self) -> Option<DateTime<Utc>> {
        parse_rfc3339(&self.created_at)
    }

    pub fn updated_at_time(&self) -> Option<DateTime<Utc>> {
        parse_rfc3339(&self.updated_at)
    }

    /// One-line summary suitable for logs.
    pub fn inspect(&self) -> String {
        format!(
            "machine(id={:?} instance_id={:?} region={:?} state={:?} created_at={:?} updated_at={:?})",
            self.id,
            self.instance_id,
            self.region,
            self.state.as_str(),
            self.created_at,
            self.updated_at,
        )
    }
}

fn parse_rfc3339(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|ts| ts.with_timezone(&Utc))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub request: Option<EventRequest>,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl Event {
    pub fn inspect(&self) -> String {
        format!(
            "event(id={:?} type={:?} status={:?} source={:?} ts={})",
            self.id, self.kind, self.status, self.source, self.timestamp,
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_event: Option<ExitEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExitEvent {
    #[serde(default)]
    pub exit_code: i32,
    #[serde(default)]
    pub exited_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub guest_exit_code: i32,
    #[serde(default)]
    pub guest_signal: i32,
    #[serde(default)]
    pub oom_killed: bool,
    #[serde(default)]
    pub requested_stop: bool,
    #[serde(default)]
    pub restarting: bool,
    #[serde(default)]
    pub signal: i32,
}

/// Time-bounded exclusive-access token for one machine.
///
/// The nonce is a bearer capability: whoever holds it can release the lease.
/// Exclusivity is arbitrated entirely by the remote API; nothing here locks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub nonce: String,
    /// Absolute expiry, epoch seconds.
    pub expires_at: i64,
    #[serde(default)]
    pub owner: String,
}

impl Lease {
    pub fn expires_at_time(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.expires_at, 0).single()
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() < self.expires_at
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_state_wire_names() {
        for state in State::ALL {
            let json = serde_json::to_string(&state).unwrap();
            assert_eq!(json, format!("\"{}\"", state.as_str()));
            assert_eq!(state.as_str().parse::<State>().unwrap(), state);
        }
    }

    #[test]
    fn test_unrecognized_state_decodes_as_unknown() {
        let state: State = serde_json::from_str("\"suspended\"").unwrap();
        assert_eq!(state, State::Unknown);
        assert!(!state.is_wait_target());
        assert!("suspended".parse::<State>().is_err());
    }

    #[test]
    fn test_wait_targets() {
        let targets: Vec<State> = State::ALL
            .into_iter()
            .filter(State::is_wait_target)
            .collect();
        assert_eq!(targets, vec![State::Started, State::Stopped, State::Destroyed]);
    }

    #[test]
    fn test_lifecycle_transitions() {
        assert!(State::Created.can_transition_to(State::Starting));
        assert!(State::Started.can_transition_to(State::Replacing));
        assert!(State::Replacing.can_transition_to(State::Starting));
        assert!(!State::Stopped.can_transition_to(State::Started));
        assert!(State::Destroyed.successors().is_empty());
        assert!(State::Destroyed.is_terminal());
        assert!(!State::Unknown.is_terminal());
    }

    proptest! {
        #[test]
        fn prop_every_live_state_can_be_destroyed(idx in 0usize..6) {
            let state = State::ALL[idx];
            prop_assert!(state.can_transition_to(State::Destroying));
        }
    }

    #[test]
    fn test_machine_decodes_partial_payload() {
        let machine: Machine = serde_json::from_value(serde_json::json!({
            "id": "4d89040f431938",
            "name": "winter-cloud-3782",
            "state": "started",
            "region": "iad",
            "instance_id": "01GW6XGH1FZ2N6TQMMB9JMV2QB",
            "created_at": "2023-03-21T20:48:09Z",
            "config": { "image": "nginx:latest" }
        }))
        .unwrap();

        assert_eq!(machine.id, "4d89040f431938");
        assert_eq!(machine.state, State::Started);
        assert_eq!(machine.config.image, "nginx:latest");
        assert!(machine.events.is_empty());
        assert!(machine.created_at_time().is_some());
        assert!(machine.updated_at_time().is_none());
    }

    #[test]
    fn test_machine_with_newer_config_values_decodes() {
        let machine: Machine = serde_json::from_value(serde_json::json!({
            "id": "4d89040f431938",
            "state": "started",
            "config": {
                "image": "nginx:latest",
                "schedule": "",
                "restart": { "policy": "spot-price" },
                "guest": { "cpu_kind": "shared", "cpus": 1 }
            }
        }))
        .unwrap();

        assert_eq!(machine.state, State::Started);
        assert_eq!(machine.config.image, "nginx:latest");
        assert_eq!(machine.config.schedule, Some(Schedule::Unknown));
        assert_eq!(machine.config.guest.map(|g| g.memory_mb), Some(0));
    }

    #[test]
    fn test_machine_can_stop_and_delete() {
        let mut machine = Machine {
            id: "m1".to_string(),
            state: State::Started,
            ..Machine::default()
        };
        assert!(machine.can_stop());
        assert!(machine.can_delete());

        machine.state = State::Stopped;
        assert!(!machine.can_stop());
        assert!(machine.can_delete());

        machine.state = State::Destroying;
        assert!(!machine.can_delete());
    }

    #[test]
    fn test_machine_inspect() {
        let machine = Machine {
            id: "m1".to_string(),
            instance_id: "i1".to_string(),
            region: "ord".to_string(),
            state: State::Stopped,
            ..Machine::default()
        };
        assert_eq!(
            machine.inspect(),
            r#"machine(id="m1" instance_id="i1" region="ord" state="stopped" created_at="" updated_at="")"#
        );
    }

    #[test]
    fn test_event_inspect_uses_type_field() {
        let event: Event = serde_json::from_value(serde_json::json!({
            "id": "e1",
            "type": "exit",
            "status": "stopped",
            "source": "flyd",
            "timestamp": 1679431689000i64,
            "request": { "exit_event": { "exit_code": 0, "requested_stop": true } }
        }))
        .unwrap();

        assert_eq!(
            event.inspect(),
            r#"event(id="e1" type="exit" status="stopped" source="flyd" ts=1679431689000)"#
        );
        assert!(event.request.unwrap().exit_event.unwrap().requested_stop);
    }

    #[test]
    fn test_lease_validity_window() {
        let lease = Lease {
            nonce: "1234".to_string(),
            expires_at: 1679456889,
            owner: "owner@corp.com".to_string(),
        };

        let before = Utc.timestamp_opt(1679456888, 0).unwrap();
        let at = Utc.timestamp_opt(1679456889, 0).unwrap();
        assert!(lease.is_valid_at(before));
        assert!(!lease.is_valid_at(at));
        assert_eq!(lease.expires_at_time(), Some(at));
    }
}
