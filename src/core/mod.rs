pub mod bootstrap;
pub mod environment;
pub mod isp;
pub mod link;
pub mod process;
pub mod supervisor;
pub mod xray;

pub use crate::domain::model::{NodeIdentity, NodeSettings, XrayConfig};
pub use crate::domain::ports::{CommandRunner, ManagedProcess, ProcessLauncher, Storage};
pub use crate::utils::error::Result;
