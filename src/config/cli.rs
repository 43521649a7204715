use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

pub const ARCHIVE_FILE: &str = "xray.zip";
pub const BINARY_DIR: &str = "xray";
pub const BINARY_FILE: &str = "xray/xray";
pub const CONFIG_FILE: &str = "config.json";
pub const LINKS_FILE: &str = "vless_xray_links.txt";

/// Every artefact the launcher leaves in the work dir.
pub const ARTEFACTS: [&str; 4] = [ARCHIVE_FILE, CONFIG_FILE, LINKS_FILE, BINARY_DIR];

/// The launcher's working directory on local disk.
#[derive(Debug, Clone)]
pub struct Workspace {
    base_path: PathBuf,
}

impl Workspace {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.base_path.join(relative)
    }

    pub fn exists(&self, relative: &str) -> bool {
        self.path(relative).exists()
    }

    pub async fn cleanup(&self) {
        for artefact in ARTEFACTS {
            if let Err(e) = self.remove(artefact).await {
                tracing::warn!("⚠ Failed to remove {}: {}", artefact, e);
            }
        }
    }
}

impl Storage for Workspace {
    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.path(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }

    async fn remove(&self, path: &str) -> Result<()> {
        let full_path = self.path(path);
        let result = match tokio::fs::metadata(&full_path).await {
            Ok(meta) if meta.is_dir() => tokio::fs::remove_dir_all(&full_path).await,
            Ok(_) => tokio::fs::remove_file(&full_path).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
