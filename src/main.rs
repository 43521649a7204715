use clap::Parser;
use panel_node::core::supervisor::shutdown_signal;
use panel_node::utils::logger;
use panel_node::{CliConfig, PanelEnvironment, StopReason, Supervisor, TokioLauncher};

#[tokio::main]
async fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting panel-node");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 合併並驗證配置
    let settings = match config.resolve() {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };

    if settings.monitor {
        tracing::info!("🔍 Process monitoring enabled");
    }

    let environment = PanelEnvironment::from_process_env();
    let mut supervisor = match Supervisor::new(settings, environment, TokioLauncher) {
        Ok(supervisor) => supervisor,
        Err(e) => {
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(e.exit_code());
        }
    };

    let reason = supervisor.run(shutdown_signal()).await;

    match &reason {
        StopReason::Shutdown => println!("服務已停止"),
        StopReason::RestartLimitReached => {
            eprintln!("❌ 達到最大重啟次數，服務已停止");
        }
        StopReason::Failed(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Node failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("\n❌ 啟動失敗: {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());
        }
    }

    let exit_code = reason.exit_code();
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}
