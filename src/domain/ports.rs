use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
}

/// Exit status of a shell command. `code` is `None` when the process was
/// terminated by a signal, which is then carried in `signal`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CommandOutcome {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl CommandOutcome {
    pub fn exited(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    pub fn killed(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Status as a shell reports it: the exit code, or 128 + N after
    /// signal N. 1 when neither is known.
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(signal)) => 128 + signal,
            (None, None) => 1,
        }
    }
}

#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &str) -> Result<CommandOutcome>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub current_dir: PathBuf,
    pub env: Vec<(String, String)>,
}

#[async_trait]
pub trait ManagedProcess: Send {
    fn id(&self) -> Option<u32>;

    /// `Some(description)` once the process has exited.
    fn try_exit(&mut self) -> Result<Option<String>>;

    /// Ask politely, then kill after `grace`.
    async fn terminate(&mut self, grace: Duration) -> Result<()>;
}

#[async_trait]
pub trait ProcessLauncher: Send + Sync {
    type Process: ManagedProcess;

    async fn spawn(&self, spec: &LaunchSpec) -> Result<Self::Process>;
}
