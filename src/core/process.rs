use crate::domain::ports::{CommandOutcome, CommandRunner, LaunchSpec, ManagedProcess, ProcessLauncher};
use crate::utils::error::{NodeError, Result};
use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, Command};

/// Runs commands through `sh -c`, inheriting stdio so install output
/// reaches the panel console.
#[derive(Debug, Clone, Default)]
pub struct ShellRunner;

#[async_trait]
impl CommandRunner for ShellRunner {
    async fn run(&self, command: &str) -> Result<CommandOutcome> {
        tracing::debug!("Running: sh -c {:?}", command);
        let status = Command::new("sh")
            .arg("-c")
            .arg(command)
            .status()
            .await
            .map_err(|e| NodeError::CommandError {
                command: command.to_string(),
                message: e.to_string(),
            })?;

        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Ok(CommandOutcome {
            code: status.code(),
            signal,
        })
    }
}

/// Spawns the core with output discarded; it logs errors only and the
/// panel console has no use for them.
#[derive(Debug, Clone, Default)]
pub struct TokioLauncher;

pub struct TokioProcess {
    child: Child,
}

#[async_trait]
impl ProcessLauncher for TokioLauncher {
    type Process = TokioProcess;

    async fn spawn(&self, spec: &LaunchSpec) -> Result<TokioProcess> {
        let child = Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.current_dir)
            .envs(spec.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NodeError::CommandError {
                command: spec.program.display().to_string(),
                message: e.to_string(),
            })?;

        tracing::debug!("Spawned {} (pid {:?})", spec.program.display(), child.id());
        Ok(TokioProcess { child })
    }
}

#[async_trait]
impl ManagedProcess for TokioProcess {
    fn id(&self) -> Option<u32> {
        self.child.id()
    }

    fn try_exit(&mut self) -> Result<Option<String>> {
        Ok(self.child.try_wait()?.map(|status| status.to_string()))
    }

    async fn terminate(&mut self, grace: Duration) -> Result<()> {
        if self.child.try_wait()?.is_some() {
            return Ok(());
        }

        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;

            if let Some(pid) = self.child.id() {
                if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                    tracing::warn!("⚠ SIGTERM to pid {} failed: {}", pid, e);
                }
                if tokio::time::timeout(grace, self.child.wait()).await.is_ok() {
                    return Ok(());
                }
                tracing::warn!("⚠ Process ignored SIGTERM for {:?}, killing", grace);
            }
        }

        #[cfg(not(unix))]
        let _ = grace;

        self.child.kill().await?;
        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> LaunchSpec {
        LaunchSpec {
            program: "sh".into(),
            args: vec!["-c".to_string(), script.to_string()],
            current_dir: std::env::temp_dir(),
            env: vec![("PANEL_NODE_MARK".to_string(), "1".to_string())],
        }
    }

    #[tokio::test]
    async fn test_shell_runner_reports_exit_code() {
        let runner = ShellRunner;
        assert!(runner.run("true").await.unwrap().success());
        assert_eq!(runner.run("exit 7").await.unwrap().code, Some(7));
    }

    #[tokio::test]
    async fn test_shell_runner_reports_signal_death() {
        let outcome = ShellRunner.run("kill -9 $$").await.unwrap();
        assert_eq!(outcome.code, None);
        assert_eq!(outcome.signal, Some(9));
        assert_eq!(outcome.exit_code(), 137);
    }

    #[tokio::test]
    async fn test_spawned_process_exit_is_observed() {
        let mut process = TokioLauncher
            .spawn(&sh("test \"$PANEL_NODE_MARK\" = 1 && exit 3"))
            .await
            .unwrap();

        let mut exited = None;
        for _ in 0..50 {
            exited = process.try_exit().unwrap();
            if exited.is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert!(exited.unwrap().contains('3'));
    }

    #[tokio::test]
    async fn test_terminate_stops_long_running_process() {
        let mut process = TokioLauncher.spawn(&sh("sleep 30")).await.unwrap();
        assert!(process.try_exit().unwrap().is_none());

        process.terminate(Duration::from_secs(3)).await.unwrap();
        assert!(process.try_exit().unwrap().is_some());
    }

    #[tokio::test]
    async fn test_terminate_kills_after_grace() {
        let mut process = TokioLauncher
            .spawn(&sh("trap '' TERM; sleep 30"))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;

        process.terminate(Duration::from_millis(200)).await.unwrap();
        assert!(process.try_exit().unwrap().is_some());
    }
}
