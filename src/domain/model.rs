use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_RELEASE_BASE_URL: &str =
    "https://github.com/XTLS/Xray-core/releases/latest/download";
pub const DEFAULT_ISP_META_URL: &str = "https://speed.cloudflare.com/meta";
pub const DEFAULT_PUBLIC_IP_URL: &str = "https://api.ipify.org";

/// Fully resolved launcher settings after defaults, TOML and CLI are merged.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeSettings {
    pub domain: String,
    pub uuid: Option<String>,
    pub port: Option<u16>,
    pub node_name: String,
    pub work_dir: PathBuf,
    pub release_base_url: String,
    pub arch: Option<Arch>,
    pub isp_meta_url: String,
    pub public_ip_url: String,
    pub go_mem_limit: String,
    pub go_gc: String,
    pub restart_limit: u32,
    pub check_interval: Duration,
    pub startup_grace: Duration,
    pub terminate_timeout: Duration,
    pub download_timeout: Duration,
    pub probe_timeout: Duration,
    pub monitor: bool,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            domain: String::new(),
            uuid: None,
            port: None,
            node_name: "Panel".to_string(),
            work_dir: PathBuf::from("."),
            release_base_url: DEFAULT_RELEASE_BASE_URL.to_string(),
            arch: None,
            isp_meta_url: DEFAULT_ISP_META_URL.to_string(),
            public_ip_url: DEFAULT_PUBLIC_IP_URL.to_string(),
            go_mem_limit: "15MiB".to_string(),
            go_gc: "15".to_string(),
            restart_limit: 5,
            check_interval: Duration::from_secs(30),
            startup_grace: Duration::from_secs(2),
            terminate_timeout: Duration::from_secs(3),
            download_timeout: Duration::from_secs(30),
            probe_timeout: Duration::from_secs(5),
            monitor: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Arch {
    Amd64,
    Arm64,
}

impl Arch {
    /// Unknown machines fall back to amd64, which is what panel hosts run.
    pub fn from_machine(machine: &str) -> Self {
        match machine.to_ascii_lowercase().as_str() {
            "aarch64" | "arm64" => Arch::Arm64,
            _ => Arch::Amd64,
        }
    }

    pub fn current() -> Self {
        Self::from_machine(std::env::consts::ARCH)
    }

    pub fn release_asset(&self) -> &'static str {
        match self {
            Arch::Amd64 => "Xray-linux-64.zip",
            Arch::Arm64 => "Xray-linux-arm64-v8a.zip",
        }
    }
}

impl std::fmt::Display for Arch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Arch::Amd64 => write!(f, "amd64"),
            Arch::Arm64 => write!(f, "arm64"),
        }
    }
}

/// Client id and WebSocket path of one launcher run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    pub uuid: String,
    pub ws_path: String,
}

impl NodeIdentity {
    /// Keeps a configured uuid; the path is always fresh so each run gets
    /// a new unguessable endpoint.
    pub fn generate(configured_uuid: Option<&str>) -> Self {
        let uuid = configured_uuid
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let path_seed = uuid::Uuid::new_v4().to_string();
        let prefix = path_seed.split('-').next().unwrap_or(&path_seed);
        Self {
            uuid,
            ws_path: format!("/{}", prefix),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XrayConfig {
    pub log: LogSettings,
    pub inbounds: Vec<Inbound>,
    pub outbounds: Vec<Outbound>,
    pub policy: Policy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogSettings {
    pub loglevel: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Inbound {
    pub port: u16,
    pub listen: String,
    pub protocol: String,
    pub settings: InboundSettings,
    pub stream_settings: StreamSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundSettings {
    pub clients: Vec<Client>,
    pub decryption: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Client {
    pub id: String,
    pub level: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamSettings {
    pub network: String,
    pub security: String,
    pub ws_settings: WsSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WsSettings {
    pub path: String,
    pub headers: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Outbound {
    pub protocol: String,
    pub settings: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub levels: BTreeMap<String, PolicyLevel>,
    pub system: SystemPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyLevel {
    pub buffer_size: u32,
    pub conn_idle: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemPolicy {
    pub stats_outbound_uplink: bool,
    pub stats_outbound_downlink: bool,
}

impl XrayConfig {
    /// VLESS inbound over plain WebSocket; TLS is terminated by the CDN edge.
    pub fn vless_ws(uuid: &str, path: &str, domain: &str, port: u16) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Host".to_string(), domain.to_string());

        let mut levels = BTreeMap::new();
        levels.insert(
            "0".to_string(),
            PolicyLevel {
                buffer_size: 256,
                conn_idle: 120,
            },
        );

        Self {
            log: LogSettings {
                loglevel: "error".to_string(),
            },
            inbounds: vec![Inbound {
                port,
                listen: "0.0.0.0".to_string(),
                protocol: "vless".to_string(),
                settings: InboundSettings {
                    clients: vec![Client {
                        id: uuid.to_string(),
                        level: 0,
                    }],
                    decryption: "none".to_string(),
                },
                stream_settings: StreamSettings {
                    network: "ws".to_string(),
                    security: "none".to_string(),
                    ws_settings: WsSettings {
                        path: path.to_string(),
                        headers,
                    },
                },
            }],
            outbounds: vec![Outbound {
                protocol: "freedom".to_string(),
                settings: serde_json::Map::new(),
            }],
            policy: Policy {
                levels,
                system: SystemPolicy {
                    stats_outbound_uplink: false,
                    stats_outbound_downlink: false,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arch_mapping() {
        assert_eq!(Arch::from_machine("x86_64"), Arch::Amd64);
        assert_eq!(Arch::from_machine("x64"), Arch::Amd64);
        assert_eq!(Arch::from_machine("AARCH64"), Arch::Arm64);
        assert_eq!(Arch::from_machine("arm64"), Arch::Arm64);
        assert_eq!(Arch::from_machine("riscv64"), Arch::Amd64);
        assert_eq!(Arch::Arm64.release_asset(), "Xray-linux-arm64-v8a.zip");
        assert_eq!(Arch::Amd64.release_asset(), "Xray-linux-64.zip");
    }

    #[test]
    fn test_identity_keeps_configured_uuid() {
        let id = NodeIdentity::generate(Some("6f1e0c2a-3b4d-4e5f-8a9b-0c1d2e3f4a5b"));
        assert_eq!(id.uuid, "6f1e0c2a-3b4d-4e5f-8a9b-0c1d2e3f4a5b");
        assert_eq!(id.ws_path.len(), 9);
        assert!(id.ws_path.starts_with('/'));
        assert!(id.ws_path[1..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_identity_generates_uuid() {
        let id = NodeIdentity::generate(None);
        assert!(uuid::Uuid::parse_str(&id.uuid).is_ok());
    }

    #[test]
    fn test_vless_ws_config_shape() {
        let config = XrayConfig::vless_ws("abc", "/1234abcd", "cdn.example.com", 25565);
        let value = serde_json::to_value(&config).unwrap();

        let expected = serde_json::json!({
            "log": {"loglevel": "error"},
            "inbounds": [{
                "port": 25565,
                "listen": "0.0.0.0",
                "protocol": "vless",
                "settings": {
                    "clients": [{"id": "abc", "level": 0}],
                    "decryption": "none"
                },
                "streamSettings": {
                    "network": "ws",
                    "security": "none",
                    "wsSettings": {"path": "/1234abcd", "headers": {"Host": "cdn.example.com"}}
                }
            }],
            "outbounds": [{"protocol": "freedom", "settings": {}}],
            "policy": {
                "levels": {"0": {"bufferSize": 256, "connIdle": 120}},
                "system": {"statsOutboundUplink": false, "statsOutboundDownlink": false}
            }
        });
        assert_eq!(value, expected);
    }
}
