pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use crate::config::CliConfig;

pub use crate::config::cli::Workspace;
pub use crate::config::toml_config::TomlConfig;
pub use crate::core::{
    bootstrap::Bootstrap,
    environment::PanelEnvironment,
    process::{ShellRunner, TokioLauncher},
    supervisor::{StopReason, Supervisor},
};
pub use crate::utils::error::{NodeError, Result};
