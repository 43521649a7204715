use crate::utils::error::{NodeError, Result};
use reqwest::Client;
use std::collections::BTreeMap;
use std::time::Duration;

pub const SERVER_MEMORY: &str = "SERVER_MEMORY";
pub const SERVER_IP: &str = "SERVER_IP";
pub const SERVER_PORT: &str = "SERVER_PORT";

const INDICATORS: [(&str, &str); 3] = [
    (SERVER_MEMORY, "Pterodactyl 內存限制"),
    (SERVER_IP, "Pterodactyl 服務器IP"),
    (SERVER_PORT, "Pterodactyl 主端口"),
];

/// Variables the panel injects into every server container.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PanelEnvironment {
    detected: BTreeMap<&'static str, String>,
}

impl PanelEnvironment {
    pub fn detect<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut detected = BTreeMap::new();
        for (key, description) in INDICATORS {
            if let Some(value) = lookup(key).filter(|v| !v.is_empty()) {
                tracing::info!("✓ 檢測到 {}: {}", description, value);
                detected.insert(key, value);
            }
        }
        Self { detected }
    }

    pub fn from_process_env() -> Self {
        Self::detect(|key| std::env::var(key).ok())
    }

    pub fn is_pterodactyl(&self) -> bool {
        !self.detected.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.detected.get(key).map(String::as_str)
    }

    pub fn memory_limit(&self) -> &str {
        self.get(SERVER_MEMORY).unwrap_or("Unknown")
    }

    /// A manual port wins over the panel allocation.
    pub fn resolve_port(&self, manual: Option<u16>) -> Result<u16> {
        if let Some(port) = manual {
            tracing::info!("✓ 正在使用手動設置的 PORT");
            return Ok(port);
        }

        match self.get(SERVER_PORT).and_then(|p| p.trim().parse::<u16>().ok()) {
            Some(port) if port != 0 => {
                tracing::info!("✓ 正在使用 Pterodactyl 分配的 SERVER_PORT");
                Ok(port)
            }
            _ => Err(NodeError::NoListenPort),
        }
    }

    /// Panel-assigned address, or the address seen from outside.
    pub async fn public_ip(&self, client: &Client, lookup_url: &str, timeout: Duration) -> String {
        if let Some(ip) = self.get(SERVER_IP).filter(|ip| *ip != "0.0.0.0") {
            return ip.to_string();
        }

        match fetch_text(client, lookup_url, timeout).await {
            Ok(ip) if !ip.is_empty() => ip,
            Ok(_) => "127.0.0.1".to_string(),
            Err(e) => {
                tracing::warn!("⚠ Public IP lookup failed: {}", e);
                "127.0.0.1".to_string()
            }
        }
    }
}

async fn fetch_text(client: &Client, url: &str, timeout: Duration) -> Result<String> {
    let response = client
        .get(url)
        .timeout(timeout)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.text().await?.trim().to_string())
}
