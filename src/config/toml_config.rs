use crate::domain::model::{Arch, NodeSettings};
use crate::utils::error::{NodeError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub node: NodeSection,
    #[serde(default)]
    pub xray: XraySection,
    #[serde(default)]
    pub probe: ProbeSection,
    #[serde(default)]
    pub supervisor: SupervisorSection,
    #[serde(default)]
    pub bootstrap: BootstrapSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeSection {
    pub domain: Option<String>,
    pub uuid: Option<String>,
    pub port: Option<u16>,
    pub name: Option<String>,
    pub work_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct XraySection {
    pub release_base_url: Option<String>,
    pub arch: Option<Arch>,
    pub go_mem_limit: Option<String>,
    pub go_gc: Option<String>,
    pub download_timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProbeSection {
    pub isp_meta_url: Option<String>,
    pub public_ip_url: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SupervisorSection {
    pub restart_limit: Option<u32>,
    pub check_interval_seconds: Option<u64>,
    pub startup_grace_seconds: Option<u64>,
    pub terminate_timeout_seconds: Option<u64>,
    pub monitor: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BootstrapSection {
    pub install_command: Option<String>,
    pub launch_command: Option<String>,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(NodeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| NodeError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SERVER_PORT})
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| NodeError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// 將檔案中出現的欄位覆蓋到設定上
    pub fn apply_to(&self, settings: &mut NodeSettings) {
        let node = &self.node;
        if let Some(domain) = &node.domain {
            settings.domain = domain.clone();
        }
        if let Some(uuid) = node.uuid.as_ref().filter(|u| !u.is_empty()) {
            settings.uuid = Some(uuid.clone());
        }
        if node.port.is_some() {
            settings.port = node.port;
        }
        if let Some(name) = &node.name {
            settings.node_name = name.clone();
        }
        if let Some(dir) = &node.work_dir {
            settings.work_dir = PathBuf::from(dir);
        }

        let xray = &self.xray;
        if let Some(url) = &xray.release_base_url {
            settings.release_base_url = url.clone();
        }
        if xray.arch.is_some() {
            settings.arch = xray.arch;
        }
        if let Some(limit) = &xray.go_mem_limit {
            settings.go_mem_limit = limit.clone();
        }
        if let Some(gc) = &xray.go_gc {
            settings.go_gc = gc.clone();
        }
        if let Some(secs) = xray.download_timeout_seconds {
            settings.download_timeout = Duration::from_secs(secs);
        }

        let probe = &self.probe;
        if let Some(url) = &probe.isp_meta_url {
            settings.isp_meta_url = url.clone();
        }
        if let Some(url) = &probe.public_ip_url {
            settings.public_ip_url = url.clone();
        }
        if let Some(secs) = probe.timeout_seconds {
            settings.probe_timeout = Duration::from_secs(secs);
        }

        let sup = &self.supervisor;
        if let Some(limit) = sup.restart_limit {
            settings.restart_limit = limit;
        }
        if let Some(secs) = sup.check_interval_seconds {
            settings.check_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = sup.startup_grace_seconds {
            settings.startup_grace = Duration::from_secs(secs);
        }
        if let Some(secs) = sup.terminate_timeout_seconds {
            settings.terminate_timeout = Duration::from_secs(secs);
        }
        if let Some(monitor) = sup.monitor {
            settings.monitor = monitor;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_full_toml_config() {
        let toml_content = r#"
[node]
domain = "cdn.example.com"
uuid = "6f1e0c2a-3b4d-4e5f-8a9b-0c1d2e3f4a5b"
port = 25565
name = "Tokyo"

[xray]
arch = "arm64"
go_mem_limit = "20MiB"

[supervisor]
restart_limit = 2
check_interval_seconds = 10

[bootstrap]
install_command = "true"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        let mut settings = NodeSettings::default();
        config.apply_to(&mut settings);

        assert_eq!(settings.domain, "cdn.example.com");
        assert_eq!(settings.port, Some(25565));
        assert_eq!(settings.node_name, "Tokyo");
        assert_eq!(settings.arch, Some(Arch::Arm64));
        assert_eq!(settings.go_mem_limit, "20MiB");
        assert_eq!(settings.go_gc, "15");
        assert_eq!(settings.restart_limit, 2);
        assert_eq!(settings.check_interval, Duration::from_secs(10));
        assert_eq!(config.bootstrap.install_command.as_deref(), Some("true"));
        assert!(config.bootstrap.launch_command.is_none());
    }

    #[test]
    fn test_empty_file_keeps_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();
        let mut settings = NodeSettings::default();
        config.apply_to(&mut settings);
        assert_eq!(settings, NodeSettings::default());
    }

    #[test]
    fn test_blank_uuid_means_generate() {
        let config = TomlConfig::from_toml_str("[node]\nuuid = \"\"\n").unwrap();
        let mut settings = NodeSettings::default();
        config.apply_to(&mut settings);
        assert!(settings.uuid.is_none());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("PANEL_NODE_TEST_DOMAIN", "env.example.com");

        let toml_content = r#"
[node]
domain = "${PANEL_NODE_TEST_DOMAIN}"
name = "${PANEL_NODE_TEST_UNSET}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.node.domain.as_deref(), Some("env.example.com"));
        assert_eq!(config.node.name.as_deref(), Some("${PANEL_NODE_TEST_UNSET}"));

        std::env::remove_var("PANEL_NODE_TEST_DOMAIN");
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = TomlConfig::from_toml_str("[node\ndomain = 1").unwrap_err();
        assert!(matches!(err, NodeError::ConfigError { .. }));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[node]\ndomain = \"file.example.com\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.node.domain.as_deref(), Some("file.example.com"));
    }
}
