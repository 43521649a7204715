pub mod cli;
pub mod toml_config;

use crate::domain::model::NodeSettings;
use crate::utils::error::Result;
use crate::utils::validation::{
    validate_domain, validate_non_empty_string, validate_path, validate_range, validate_url,
    validate_uuid, Validate,
};
use std::time::Duration;

#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "panel-node")]
#[command(about = "VLESS + WebSocket node launcher for Pterodactyl containers behind a CDN")]
pub struct CliConfig {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Domain proxied by the CDN
    #[arg(long, env = "NODE_DOMAIN")]
    pub domain: Option<String>,

    /// Fixed client UUID, generated when omitted
    #[arg(long, env = "NODE_UUID")]
    pub uuid: Option<String>,

    /// Listen port, defaults to the panel's SERVER_PORT
    #[arg(long, env = "NODE_PORT")]
    pub port: Option<u16>,

    /// Node name shown in clients
    #[arg(long, env = "NODE_NAME")]
    pub node_name: Option<String>,

    #[arg(long)]
    pub work_dir: Option<String>,

    #[arg(long)]
    pub restart_limit: Option<u32>,

    /// Seconds between health checks
    #[arg(long)]
    pub check_interval: Option<u64>,

    #[arg(long, help = "Sample memory and CPU of the Xray process")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON lines")]
    pub log_json: bool,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// Defaults, then the TOML file, then flags and env. Validated.
    pub fn resolve(&self) -> Result<NodeSettings> {
        let mut settings = NodeSettings::default();

        if let Some(path) = &self.config {
            tracing::info!("📁 Loading configuration from: {}", path);
            toml_config::TomlConfig::from_file(path)?.apply_to(&mut settings);
        }

        if let Some(domain) = &self.domain {
            settings.domain = domain.clone();
        }
        if let Some(uuid) = self.uuid.as_ref().filter(|u| !u.is_empty()) {
            settings.uuid = Some(uuid.clone());
        }
        if self.port.is_some() {
            settings.port = self.port;
        }
        if let Some(name) = &self.node_name {
            settings.node_name = name.clone();
        }
        if let Some(dir) = &self.work_dir {
            settings.work_dir = dir.into();
        }
        if let Some(limit) = self.restart_limit {
            settings.restart_limit = limit;
        }
        if let Some(secs) = self.check_interval {
            settings.check_interval = Duration::from_secs(secs);
        }
        if self.monitor {
            settings.monitor = true;
        }

        settings.validate()?;
        Ok(settings)
    }
}

impl Validate for NodeSettings {
    fn validate(&self) -> Result<()> {
        validate_domain("node.domain", &self.domain)?;
        validate_non_empty_string("node.name", &self.node_name)?;
        if let Some(uuid) = &self.uuid {
            validate_uuid("node.uuid", uuid)?;
        }
        if let Some(port) = self.port {
            validate_range("node.port", port, 1, u16::MAX)?;
        }
        validate_path("node.work_dir", &self.work_dir.to_string_lossy())?;
        validate_url("xray.release_base_url", &self.release_base_url)?;
        validate_url("probe.isp_meta_url", &self.isp_meta_url)?;
        validate_url("probe.public_ip_url", &self.public_ip_url)?;
        validate_range(
            "supervisor.check_interval_seconds",
            self.check_interval.as_secs(),
            1,
            86_400,
        )?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_settings() -> NodeSettings {
        NodeSettings {
            domain: "cdn.example.com".to_string(),
            ..NodeSettings::default()
        }
    }

    #[test]
    fn test_defaults_need_a_domain() {
        assert!(NodeSettings::default().validate().is_err());
        assert!(valid_settings().validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut s = valid_settings();
        s.uuid = Some("nope".to_string());
        assert!(s.validate().is_err());

        let mut s = valid_settings();
        s.port = Some(0);
        assert!(s.validate().is_err());

        let mut s = valid_settings();
        s.check_interval = Duration::from_millis(10);
        assert!(s.validate().is_err());

        let mut s = valid_settings();
        s.release_base_url = "file:///tmp".to_string();
        assert!(s.validate().is_err());
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_cli_overrides_toml() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"[node]\ndomain = \"toml.example.com\"\nname = \"FromToml\"\n[supervisor]\nrestart_limit = 9\n",
        )
        .unwrap();

        let cli = CliConfig {
            config: Some(file.path().to_string_lossy().to_string()),
            domain: Some("cli.example.com".to_string()),
            port: Some(8080),
            ..CliConfig::default()
        };

        let settings = cli.resolve().unwrap();
        assert_eq!(settings.domain, "cli.example.com");
        assert_eq!(settings.node_name, "FromToml");
        assert_eq!(settings.port, Some(8080));
        assert_eq!(settings.restart_limit, 9);
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_cli_parses_flags() {
        let cli = CliConfig::parse_from([
            "panel-node",
            "--domain",
            "cdn.example.com",
            "--port",
            "443",
            "--monitor",
        ]);
        assert_eq!(cli.domain.as_deref(), Some("cdn.example.com"));
        assert_eq!(cli.port, Some(443));
        assert!(cli.monitor);
    }

    #[cfg(feature = "cli")]
    #[test]
    fn test_cli_reads_env_fallbacks() {
        const VARS: [(&str, &str); 4] = [
            ("NODE_DOMAIN", "env.example.com"),
            ("NODE_UUID", "6f1e0c2a-3b4d-4e5f-8a9b-0c1d2e3f4a5b"),
            ("NODE_PORT", "2053"),
            ("NODE_NAME", "FromEnv"),
        ];
        for (key, value) in VARS {
            std::env::set_var(key, value);
        }

        let from_env = CliConfig::parse_from(["panel-node"]);
        let flag_wins = CliConfig::parse_from(["panel-node", "--node-name", "FromFlag"]);

        for (key, _) in VARS {
            std::env::remove_var(key);
        }

        let settings = from_env.resolve().unwrap();
        assert_eq!(settings.domain, "env.example.com");
        assert_eq!(
            settings.uuid.as_deref(),
            Some("6f1e0c2a-3b4d-4e5f-8a9b-0c1d2e3f4a5b")
        );
        assert_eq!(settings.port, Some(2053));
        assert_eq!(settings.node_name, "FromEnv");
        assert_eq!(flag_wins.node_name.as_deref(), Some("FromFlag"));
    }
}
