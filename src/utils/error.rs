use thiserror::Error;

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Pterodactyl environment not detected")]
    NotPterodactyl,

    #[error("No listen port available (SERVER_PORT unset or zero)")]
    NoListenPort,

    #[error("Download of {url} failed with status {status}")]
    DownloadError { url: String, status: u16 },

    #[error("Unexpected response: {message}")]
    ResponseError { message: String },

    #[error("Xray archive not found: {path}")]
    ArchiveMissing { path: String },

    #[error("Xray executable not found in archive")]
    BinaryNotFound,

    #[error("Xray exited during startup ({status})")]
    StartupFailed { status: String },

    #[error("Command '{command}' failed: {message}")]
    CommandError { command: String, message: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Environment,
    Network,
    Filesystem,
    Process,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl NodeError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            NodeError::ConfigError { .. }
            | NodeError::InvalidConfigValueError { .. }
            | NodeError::SerializationError(_) => ErrorCategory::Configuration,
            NodeError::NotPterodactyl | NodeError::NoListenPort => ErrorCategory::Environment,
            NodeError::HttpError(_)
            | NodeError::DownloadError { .. }
            | NodeError::ResponseError { .. } => ErrorCategory::Network,
            NodeError::ZipError(_)
            | NodeError::IoError(_)
            | NodeError::ArchiveMissing { .. }
            | NodeError::BinaryNotFound => ErrorCategory::Filesystem,
            NodeError::StartupFailed { .. } | NodeError::CommandError { .. } => {
                ErrorCategory::Process
            }
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network => ErrorSeverity::Medium,
            ErrorCategory::Configuration | ErrorCategory::Environment => ErrorSeverity::High,
            ErrorCategory::Process => ErrorSeverity::High,
            ErrorCategory::Filesystem => ErrorSeverity::Critical,
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            NodeError::NotPterodactyl => {
                "Run inside a Pterodactyl container or export SERVER_PORT / SERVER_IP / SERVER_MEMORY"
            }
            NodeError::NoListenPort => "Allocate a port in the panel or pass --port",
            NodeError::HttpError(_)
            | NodeError::DownloadError { .. }
            | NodeError::ResponseError { .. } => {
                "Check outbound network access to GitHub and retry"
            }
            NodeError::ArchiveMissing { .. } | NodeError::BinaryNotFound => {
                "Delete the work directory and let the release archive download again"
            }
            NodeError::ZipError(_) => "The downloaded archive is corrupt, retry the download",
            NodeError::IoError(_) => "Check disk space and permissions of the work directory",
            NodeError::StartupFailed { .. } => {
                "Check the listen port is free and the container has enough memory"
            }
            NodeError::CommandError { .. } => "Verify the command exists on PATH",
            NodeError::ConfigError { .. }
            | NodeError::InvalidConfigValueError { .. }
            | NodeError::SerializationError(_) => "Review the configuration file and CLI flags",
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            NodeError::NotPterodactyl => "未檢測到 Pterodactyl 環境，腳本終止".to_string(),
            NodeError::NoListenPort => "未檢測到可用的監聽端口，終止".to_string(),
            NodeError::BinaryNotFound => "未找到 Xray 可執行文件".to_string(),
            NodeError::StartupFailed { .. } => "Xray 啟動失敗".to_string(),
            other => other.to_string(),
        }
    }

    /// Process exit code for a binary that stops on this error.
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, NodeError>;
