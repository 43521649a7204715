use crate::domain::ports::CommandRunner;

pub const DEFAULT_INSTALL_COMMAND: &str = "pip install -r requirements.txt";
pub const DEFAULT_LAUNCH_COMMAND: &str = "python app.py";

/// Exit status of a failed install step.
pub const INSTALL_FAILED_EXIT: i32 = 1;

/// Install dependencies, then start the application. Strictly two ordered
/// steps, no retries.
pub struct Bootstrap<R: CommandRunner> {
    runner: R,
    install_command: String,
    launch_command: String,
}

impl<R: CommandRunner> Bootstrap<R> {
    pub fn new(runner: R) -> Self {
        Self::with_commands(runner, DEFAULT_INSTALL_COMMAND, DEFAULT_LAUNCH_COMMAND)
    }

    pub fn with_commands(
        runner: R,
        install_command: impl Into<String>,
        launch_command: impl Into<String>,
    ) -> Self {
        Self {
            runner,
            install_command: install_command.into(),
            launch_command: launch_command.into(),
        }
    }

    pub fn install_command(&self) -> &str {
        &self.install_command
    }

    pub fn launch_command(&self) -> &str {
        &self.launch_command
    }

    /// Returns the process exit code.
    pub async fn run(&self) -> i32 {
        tracing::info!("📦 Installing dependencies: {}", self.install_command);
        let install_ok = match self.runner.run(&self.install_command).await {
            Ok(outcome) if outcome.success() => true,
            Ok(outcome) => {
                tracing::error!("Install step exited with {}", outcome.exit_code());
                false
            }
            Err(e) => {
                tracing::error!("Install step could not run: {}", e);
                false
            }
        };

        if !install_ok {
            eprintln!("❌ 依賴安裝失敗，請檢查 requirements.txt 或網路連線");
            return INSTALL_FAILED_EXIT;
        }

        tracing::info!("🚀 Launching: {}", self.launch_command);
        match self.runner.run(&self.launch_command).await {
            Ok(outcome) => {
                if let Some(signal) = outcome.signal {
                    tracing::warn!("⚠ Launch step killed by signal {}", signal);
                }
                outcome.exit_code()
            }
            Err(e) => {
                tracing::error!("Launch step could not run: {}", e);
                eprintln!("❌ {}", e.user_friendly_message());
                e.exit_code()
            }
        }
    }
}
