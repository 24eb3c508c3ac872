//! Machine configuration schema.
//!
//! These types mirror the JSON accepted by the create endpoint and echoed back
//! in every machine record. No validation happens client-side; the remote API
//! is the authority on which combinations are accepted.
//!
//! Every enumeration decodes values it does not recognise as `Unknown`, and
//! missing fields fall back to their defaults, so a machine record written by
//! a newer API version still decodes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Size {
    #[serde(rename = "shared-cpu-1x")]
    SharedCpu1x,
    #[serde(rename = "shared-cpu-2x")]
    SharedCpu2x,
    #[serde(rename = "shared-cpu-4x")]
    SharedCpu4x,
    #[serde(rename = "shared-cpu-8x")]
    SharedCpu8x,
    #[serde(rename = "performance-1x")]
    Performance1x,
    #[serde(rename = "performance-2x")]
    Performance2x,
    #[serde(rename = "performance-4x")]
    Performance4x,
    #[serde(rename = "performance-8x")]
    Performance8x,
    #[serde(rename = "performance-16x")]
    Performance16x,
    #[serde(rename = "unknown")]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CpuKind {
    #[default]
    Shared,
    Performance,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RestartPolicy {
    #[serde(rename = "no")]
    No,
    #[serde(rename = "on-failure")]
    OnFailure,
    #[serde(rename = "always")]
    Always,
    #[serde(rename = "unknown")]
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Schedule {
    Hourly,
    Daily,
    Weekly,
    Monthly,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    #[default]
    Tcp,
    Udp,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub image: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init: Option<InitConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restart: Option<RestartConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guest: Option<GuestConfig>,
    #[serde(default)]
    pub auto_destroy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schedule: Option<Schedule>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub services: Vec<ServiceConfig>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub checks: HashMap<String, CheckConfig>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitConfig {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub exec: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cmd: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub entrypoint: Vec<String>,
    #[serde(default)]
    pub tty: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestartConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<RestartPolicy>,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub max_retries: u32,
}

impl RestartConfig {
    pub fn never() -> Self {
        Self {
            policy: Some(RestartPolicy::No),
            max_retries: 0,
        }
    }

    pub fn once() -> Self {
        Self {
            policy: Some(RestartPolicy::OnFailure),
            max_retries: 1,
        }
    }
}

fn is_zero(value: &u32) -> bool {
    *value == 0
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestConfig {
    #[serde(default)]
    pub cpu_kind: CpuKind,
    #[serde(default)]
    pub cpus: u32,
    #[serde(default)]
    pub memory_mb: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub protocol: Protocol,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concurrency: Option<ConcurrencyConfig>,
    /// Port the machine listens on.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub internal_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<PortConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConcurrencyConfig {
    #[serde(rename = "type", default, skip_serializing_if = "String::is_empty")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub soft_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hard_limit: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub force_https: Option<bool>,
}

impl PortConfig {
    /// Plain HTTP on port 80, redirected to HTTPS.
    pub fn http() -> Self {
        Self {
            port: Some(80),
            handlers: vec!["http".to_string()],
            force_https: Some(true),
        }
    }

    /// TLS-terminated HTTP on port 443.
    pub fn https() -> Self {
        Self {
            port: Some(443),
            handlers: vec!["tls".to_string(), "http".to_string()],
            force_https: None,
        }
    }

    pub fn default_web() -> Vec<Self> {
        vec![Self::http(), Self::https()]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckConfig {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(default)]
    pub interval: String,
    #[serde(default)]
    pub timeout: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub method: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls_skip_verify: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<CheckHeader>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckHeader {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub values: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_size_wire_names() {
        assert_eq!(
            serde_json::to_value(Size::SharedCpu2x).unwrap(),
            serde_json::json!("shared-cpu-2x")
        );
        assert_eq!(
            serde_json::to_value(Size::Performance16x).unwrap(),
            serde_json::json!("performance-16x")
        );
    }

    #[test]
    fn test_restart_policy_presets() {
        let value = serde_json::to_value(RestartConfig::once()).unwrap();
        assert_eq!(
            value,
            serde_json::json!({ "policy": "on-failure", "max_retries": 1 })
        );

        let value = serde_json::to_value(RestartConfig::never()).unwrap();
        assert_eq!(value, serde_json::json!({ "policy": "no" }));
    }

    #[test]
    fn test_default_web_ports() {
        let ports = PortConfig::default_web();
        assert_eq!(ports.len(), 2);
        assert_eq!(
            serde_json::to_value(&ports[0]).unwrap(),
            serde_json::json!({ "port": 80, "handlers": ["http"], "force_https": true })
        );
        assert_eq!(
            serde_json::to_value(&ports[1]).unwrap(),
            serde_json::json!({ "port": 443, "handlers": ["tls", "http"] })
        );
    }

    #[test]
    fn test_minimal_config_serialization() {
        let config = Config {
            image: "nginx:latest".to_string(),
            guest: Some(GuestConfig {
                cpu_kind: CpuKind::Shared,
                cpus: 1,
                memory_mb: 256,
            }),
            ..Config::default()
        };

        assert_eq!(
            serde_json::to_value(&config).unwrap(),
            serde_json::json!({
                "image": "nginx:latest",
                "guest": { "cpu_kind": "shared", "cpus": 1, "memory_mb": 256 },
                "auto_destroy": false
            })
        );
    }

    #[test]
    fn test_unrecognised_values_decode_as_unknown() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "image": "app:1",
            "schedule": "",
            "restart": { "policy": "spot-price" },
            "guest": { "cpu_kind": "a100-pcie-40gb", "cpus": 8 },
            "services": [{ "protocol": "quic", "internal_port": 443 }]
        }))
        .unwrap();

        assert_eq!(config.schedule, Some(Schedule::Unknown));
        assert_eq!(
            config.restart.as_ref().and_then(|r| r.policy),
            Some(RestartPolicy::Unknown)
        );
        let guest = config.guest.unwrap();
        assert_eq!(guest.cpu_kind, CpuKind::Unknown);
        assert_eq!(guest.cpus, 8);
        assert_eq!(guest.memory_mb, 0);
        assert_eq!(config.services[0].protocol, Protocol::Unknown);

        let size: Size = serde_json::from_value(serde_json::json!("a100-80gb")).unwrap();
        assert_eq!(size, Size::Unknown);
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "guest": {},
            "services": [{ "ports": [{ "port": 80 }] }],
            "checks": { "alive": { "headers": [{ "values": ["1"] }] } }
        }))
        .unwrap();

        assert_eq!(config.guest, Some(GuestConfig::default()));
        assert_eq!(config.services[0].protocol, Protocol::Tcp);
        assert_eq!(config.checks["alive"].headers[0].name, "");
    }

    #[test]
    fn test_service_config_decodes_with_checks() {
        let config: Config = serde_json::from_value(serde_json::json!({
            "image": "app:1",
            "services": [{
                "protocol": "tcp",
                "internal_port": 8080,
                "ports": [{ "port": 443, "handlers": ["tls", "http"] }],
                "concurrency": { "type": "connections", "soft_limit": 20, "hard_limit": 25 }
            }],
            "checks": {
                "alive": { "type": "http", "port": 8080, "interval": "15s", "timeout": "2s", "path": "/health" }
            }
        }))
        .unwrap();

        let service = &config.services[0];
        assert_eq!(service.protocol, Protocol::Tcp);
        assert_eq!(service.internal_port, Some(8080));
        assert_eq!(service.concurrency.as_ref().unwrap().kind, "connections");
        assert_eq!(config.checks["alive"].path, "/health");
    }
}
