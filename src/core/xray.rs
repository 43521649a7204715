use crate::config::cli::{Workspace, ARCHIVE_FILE, BINARY_DIR, BINARY_FILE};
use crate::domain::model::Arch;
use crate::utils::error::{NodeError, Result};
use futures::StreamExt;
use reqwest::Client;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

const USER_AGENT: &str = "Mozilla/5.0";

/// Fetches the Xray release archive and unpacks the core binary into the
/// workspace.
pub struct XrayInstaller {
    client: Client,
    workspace: Workspace,
    release_base_url: String,
    timeout: Duration,
}

impl XrayInstaller {
    pub fn new(
        client: Client,
        workspace: Workspace,
        release_base_url: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            workspace,
            release_base_url: release_base_url.into(),
            timeout,
        }
    }

    pub fn asset_url(&self, arch: Arch) -> String {
        format!(
            "{}/{}",
            self.release_base_url.trim_end_matches('/'),
            arch.release_asset()
        )
    }

    pub fn binary_path(&self) -> PathBuf {
        self.workspace.path(BINARY_FILE)
    }

    /// Reuses a binary left by a previous run.
    pub async fn ensure(&self, arch: Arch) -> Result<PathBuf> {
        if self.workspace.exists(BINARY_FILE) {
            tracing::debug!("Xray binary already present, skipping download");
            return Ok(self.binary_path());
        }
        self.download(arch).await?;

        let workspace = self.workspace.clone();
        tokio::task::spawn_blocking(move || extract_archive(&workspace))
            .await
            .map_err(std::io::Error::other)?
    }

    pub async fn download(&self, arch: Arch) -> Result<PathBuf> {
        let url = self.asset_url(arch);
        tracing::info!("⬇ 下載 Xray ({})...", arch);
        tracing::debug!("Release URL: {}", url);

        let response = self
            .client
            .get(&url)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .timeout(self.timeout)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(NodeError::DownloadError {
                url,
                status: response.status().as_u16(),
            });
        }

        let archive_path = self.workspace.path(ARCHIVE_FILE);
        if let Some(parent) = archive_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let mut file = tokio::fs::File::create(&archive_path).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            written += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        tracing::info!("✓ 下載完成 ({} bytes)", written);
        Ok(archive_path)
    }

    /// Blocking; `ensure` runs it off the async workers.
    pub fn extract(&self) -> Result<PathBuf> {
        extract_archive(&self.workspace)
    }
}

/// Unpacks the first `xray` entry to `xray/xray` and deletes the archive.
fn extract_archive(workspace: &Workspace) -> Result<PathBuf> {
    let archive_path = workspace.path(ARCHIVE_FILE);
    if !archive_path.exists() {
        return Err(NodeError::ArchiveMissing {
            path: archive_path.display().to_string(),
        });
    }

    let found = unpack_binary(workspace, &archive_path);
    std::fs::remove_file(&archive_path)?;

    if !found? {
        return Err(NodeError::BinaryNotFound);
    }

    let binary = workspace.path(BINARY_FILE);
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&binary, std::fs::Permissions::from_mode(0o755))?;
    }

    tracing::info!("✓ 文件清理完成，已節省空間");
    Ok(binary)
}

fn unpack_binary(workspace: &Workspace, archive_path: &Path) -> Result<bool> {
    let mut archive = zip::ZipArchive::new(BufReader::new(File::open(archive_path)?))?;

    for i in 0..archive.len() {
        let mut entry = archive.by_index(i)?;
        let name = entry.name().to_string();
        if !entry.is_file() || !(name == "xray" || name.ends_with("/xray")) {
            continue;
        }

        tracing::debug!("Extracting archive entry {}", name);
        std::fs::create_dir_all(workspace.path(BINARY_DIR))?;
        let mut out = File::create(workspace.path(BINARY_FILE))?;
        std::io::copy(&mut entry, &mut out)?;
        return Ok(true);
    }

    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::{SimpleFileOptions, ZipWriter};

    fn release_zip(entries: &[(&str, &str)]) -> Vec<u8> {
        let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
        for (name, data) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
        zip.finish().unwrap().into_inner()
    }

    fn installer(dir: &TempDir, base: &str) -> XrayInstaller {
        XrayInstaller::new(
            Client::new(),
            Workspace::new(dir.path()),
            base,
            Duration::from_secs(5),
        )
    }

    #[test]
    fn test_asset_url() {
        let dir = TempDir::new().unwrap();
        let inst = installer(&dir, "https://github.com/XTLS/Xray-core/releases/latest/download/");
        assert_eq!(
            inst.asset_url(Arch::Amd64),
            "https://github.com/XTLS/Xray-core/releases/latest/download/Xray-linux-64.zip"
        );
    }

    #[tokio::test]
    async fn test_download_and_extract() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start();
        let body = release_zip(&[
            ("LICENSE", "license"),
            ("geoip.dat", "geo"),
            ("xray", "#!/bin/sh\n"),
        ]);
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/Xray-linux-arm64-v8a.zip")
                .header("User-Agent", "Mozilla/5.0");
            then.status(200).body(body);
        });

        let inst = installer(&dir, &server.url(""));
        let binary = inst.ensure(Arch::Arm64).await.unwrap();

        mock.assert();
        assert_eq!(std::fs::read(&binary).unwrap(), b"#!/bin/sh\n");
        assert!(!dir.path().join(ARCHIVE_FILE).exists());

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&binary).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }

        // second call reuses the binary
        inst.ensure(Arch::Arm64).await.unwrap();
        mock.assert_hits(1);
    }

    #[test]
    fn test_extract_nested_entry() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(ARCHIVE_FILE),
            release_zip(&[("Xray-linux-64/xray", "core"), ("Xray-linux-64/README.md", "doc")]),
        )
        .unwrap();

        let binary = installer(&dir, "http://unused").extract().unwrap();
        assert_eq!(std::fs::read(binary).unwrap(), b"core");
    }

    #[test]
    fn test_extract_without_binary() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(ARCHIVE_FILE),
            release_zip(&[("xray.sig", "sig"), ("bin/xray-helper", "x")]),
        )
        .unwrap();

        let err = installer(&dir, "http://unused").extract().unwrap_err();
        assert!(matches!(err, NodeError::BinaryNotFound));
        assert!(!dir.path().join(ARCHIVE_FILE).exists());
    }

    #[test]
    fn test_extract_missing_archive() {
        let dir = TempDir::new().unwrap();
        let err = installer(&dir, "http://unused").extract().unwrap_err();
        assert!(matches!(err, NodeError::ArchiveMissing { .. }));
    }

    #[tokio::test]
    async fn test_download_http_error() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/Xray-linux-64.zip");
            then.status(404);
        });

        let err = installer(&dir, &server.url(""))
            .download(Arch::Amd64)
            .await
            .unwrap_err();
        assert!(matches!(err, NodeError::DownloadError { status: 404, .. }));
    }
}
