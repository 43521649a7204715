use crate::config::cli::{Workspace, CONFIG_FILE, LINKS_FILE};
use crate::core::environment::PanelEnvironment;
use crate::core::isp::lookup_isp;
use crate::core::link::{display_name, links_file_content, operator_hints, vless_share_link};
use crate::core::xray::XrayInstaller;
use crate::domain::model::{Arch, NodeIdentity, NodeSettings, XrayConfig};
use crate::domain::ports::{LaunchSpec, ManagedProcess, ProcessLauncher, Storage};
use crate::utils::error::{NodeError, Result};
use crate::utils::monitor::SystemMonitor;
use chrono::{DateTime, Utc};
use reqwest::Client;
use std::future::Future;
use tokio::time::MissedTickBehavior;

const BANNER: &str = "
=====================================
VLESS Xray 代理服務（CDN模式）
專為 64MB Pterodactyl 容器優化
=====================================";

/// What a successful start produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeReport {
    pub port: u16,
    pub origin_ip: String,
    pub isp: String,
    pub link: String,
}

#[derive(Debug)]
pub enum StopReason {
    Shutdown,
    RestartLimitReached,
    Failed(NodeError),
}

impl StopReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            StopReason::Shutdown => 0,
            StopReason::RestartLimitReached => 1,
            StopReason::Failed(e) => e.exit_code(),
        }
    }
}

/// Owns the Xray child for the lifetime of the launcher: start, health
/// checks, bounded restarts, cleanup.
pub struct Supervisor<L: ProcessLauncher> {
    settings: NodeSettings,
    environment: PanelEnvironment,
    launcher: L,
    client: Client,
    workspace: Workspace,
    installer: XrayInstaller,
    identity: NodeIdentity,
    process: Option<L::Process>,
    started_at: Option<DateTime<Utc>>,
    restart_count: u32,
    monitor: SystemMonitor,
}

impl<L: ProcessLauncher> Supervisor<L> {
    pub fn new(settings: NodeSettings, environment: PanelEnvironment, launcher: L) -> Result<Self> {
        let client = Client::builder().build()?;
        let workspace = Workspace::new(settings.work_dir.clone());
        let installer = XrayInstaller::new(
            client.clone(),
            workspace.clone(),
            settings.release_base_url.clone(),
            settings.download_timeout,
        );
        let identity = NodeIdentity::generate(settings.uuid.as_deref());
        let monitor = SystemMonitor::new(settings.monitor);

        Ok(Self {
            settings,
            environment,
            launcher,
            client,
            workspace,
            installer,
            identity,
            process: None,
            started_at: None,
            restart_count: 0,
            monitor,
        })
    }

    pub fn identity(&self) -> &NodeIdentity {
        &self.identity
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub async fn start(&mut self) -> Result<NodeReport> {
        println!("{}", BANNER);

        if !self.environment.is_pterodactyl() {
            return Err(NodeError::NotPterodactyl);
        }

        let port = self.environment.resolve_port(self.settings.port)?;
        tracing::info!("✓ 內存限制: {}", self.environment.memory_limit());
        tracing::info!("✓ 代理監聽端口: {}", port);

        let arch = self.settings.arch.unwrap_or_else(Arch::current);
        let binary = self.installer.ensure(arch).await?;

        let config = XrayConfig::vless_ws(
            &self.identity.uuid,
            &self.identity.ws_path,
            &self.settings.domain,
            port,
        );
        self.workspace
            .write_file(CONFIG_FILE, &serde_json::to_vec_pretty(&config)?)
            .await?;

        let isp = lookup_isp(
            &self.client,
            &self.settings.isp_meta_url,
            self.settings.probe_timeout,
        )
        .await;
        let origin_ip = self
            .environment
            .public_ip(
                &self.client,
                &self.settings.public_ip_url,
                self.settings.probe_timeout,
            )
            .await;

        let report = NodeReport {
            port,
            link: vless_share_link(
                &self.identity,
                &self.settings.domain,
                &display_name(&self.settings.node_name, &isp),
            ),
            origin_ip,
            isp,
        };
        self.workspace
            .write_file(LINKS_FILE, links_file_content(&report.link).as_bytes())
            .await?;
        self.display(&report);

        tracing::info!("啟動 Xray...");
        let spec = LaunchSpec {
            program: tokio::fs::canonicalize(&binary).await?,
            args: vec![
                "run".to_string(),
                "-config".to_string(),
                tokio::fs::canonicalize(self.workspace.path(CONFIG_FILE))
                    .await?
                    .display()
                    .to_string(),
            ],
            current_dir: self.workspace.base_path().to_path_buf(),
            env: vec![
                ("GOMEMLIMIT".to_string(), self.settings.go_mem_limit.clone()),
                ("GOGC".to_string(), self.settings.go_gc.clone()),
            ],
        };
        let process = self.launcher.spawn(&spec).await?;
        self.process = Some(process);
        self.started_at = Some(Utc::now());

        tokio::time::sleep(self.settings.startup_grace).await;
        if let Some(status) = self.poll_exit()? {
            return Err(NodeError::StartupFailed { status });
        }

        tracing::info!("✓ Xray 運行中");
        println!("\n✅ 服務運行中 (Ctrl+C 停止)");
        Ok(report)
    }

    fn display(&self, report: &NodeReport) {
        let rule = "=".repeat(60);
        println!("\n{}\nVLESS Xray CDN 節點已啟動\n{}", rule, rule);
        println!("\n🔗 CDN 節點鏈接:\n{}", report.link);
        println!("\n鏈接已保存到: {}", self.workspace.path(LINKS_FILE).display());
        println!("\n⚠ 提示:");
        for (i, hint) in operator_hints(&self.settings.domain, report.port, &report.origin_ip)
            .iter()
            .enumerate()
        {
            println!("{}. {}", i + 1, hint);
        }
    }

    /// `Some(status)` when the child has gone away.
    fn poll_exit(&mut self) -> Result<Option<String>> {
        match self.process.as_mut() {
            Some(process) => process.try_exit(),
            None => Ok(Some("not running".to_string())),
        }
    }

    /// Checks the child every `check_interval` and restarts it when it dies,
    /// at most `restart_limit` times. `shutdown` wins over a due tick and
    /// interrupts a restart in progress.
    pub async fn supervise<S>(&mut self, mut shutdown: S) -> StopReason
    where
        S: Future<Output = ()> + Unpin,
    {
        let mut ticker = tokio::time::interval(self.settings.check_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        ticker.tick().await;

        loop {
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("停止服務...");
                    return StopReason::Shutdown;
                }
                _ = ticker.tick() => {}
            }

            let status = match self.poll_exit() {
                Ok(None) => {
                    if let Some(pid) = self.process.as_ref().and_then(|p| p.id()) {
                        self.monitor.log_stats("Xray", pid);
                    }
                    continue;
                }
                Ok(Some(status)) => status,
                Err(e) => {
                    tracing::warn!("⚠ Health check failed: {}", e);
                    continue;
                }
            };

            let uptime = self
                .started_at
                .map(|t| (Utc::now() - t).num_seconds())
                .unwrap_or(0);
            tracing::warn!("⚠ Xray 進程異常退出 ({}) after {}s，嘗試重啟", status, uptime);

            self.restart_count += 1;
            if self.restart_count > self.settings.restart_limit {
                tracing::error!("❌ 達到最大重啟次數 ({})，停止重啟", self.settings.restart_limit);
                return StopReason::RestartLimitReached;
            }

            self.cleanup().await;
            let restarted = tokio::select! {
                biased;
                _ = &mut shutdown => {
                    tracing::info!("停止服務...");
                    return StopReason::Shutdown;
                }
                result = self.start() => result,
            };
            if let Err(e) = restarted {
                tracing::error!("❌ 重啟失敗: {}", e);
                return StopReason::Failed(e);
            }
            ticker.reset();
        }
    }

    /// Start, supervise until `shutdown` resolves, then clean up. Cleanup
    /// runs on every path.
    pub async fn run<F>(&mut self, shutdown: F) -> StopReason
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);

        let started = tokio::select! {
            biased;
            _ = shutdown.as_mut() => {
                self.cleanup().await;
                return StopReason::Shutdown;
            }
            result = self.start() => result,
        };

        let reason = match started {
            Ok(_) => self.supervise(shutdown.as_mut()).await,
            Err(e) => {
                tracing::error!("❌ 啟動失敗: {}", e);
                StopReason::Failed(e)
            }
        };

        self.cleanup().await;
        self.monitor.log_final_stats();
        tracing::info!("服務已停止");
        reason
    }

    /// Stops the child and removes every file the launcher created.
    pub async fn cleanup(&mut self) {
        if let Some(mut process) = self.process.take() {
            if let Err(e) = process.terminate(self.settings.terminate_timeout).await {
                tracing::warn!("⚠ Failed to stop Xray: {}", e);
            }
        }
        self.started_at = None;
        self.workspace.cleanup().await;
    }
}

/// Resolves on Ctrl-C, or SIGTERM on unix (what the panel sends on stop).
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("⚠ Ctrl-C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("⚠ SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
