//! The backend adapter process: spawn it with piped stdio, hand its
//! stdout/stdin to the router as the backend-side DAP channel, and keep its
//! stderr flowing into the diagnostic log.

use std::{
    path::{Path, PathBuf},
    process::Stdio,
    time::Duration,
};

use tokio::{
    io::{AsyncBufReadExt, BufReader},
    process::{Child, ChildStderr, ChildStdin, ChildStdout, Command},
    task::JoinHandle,
};
use tracing::debug;

use crate::error::DecorError;

/// Launch configuration for the backend adapter.
#[derive(Clone, Debug)]
pub struct BackendConfig {
    pub binary: PathBuf,
    pub args: Vec<String>,
    pub env: Vec<(String, String)>,
    pub current_dir: Option<PathBuf>,
}

impl BackendConfig {
    pub fn new(binary: impl Into<PathBuf>) -> BackendConfig {
        BackendConfig {
            binary: binary.into(),
            args: Vec::new(),
            env: Vec::new(),
            current_dir: None,
        }
    }
}

#[derive(Debug)]
pub struct BackendProcess {
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    child: Child,
    stderr_task: Option<JoinHandle<()>>,
}

impl BackendProcess {
    pub async fn spawn(config: &BackendConfig) -> Result<BackendProcess, DecorError> {
        let mut command = Command::new(&config.binary);
        command
            .args(&config.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &config.current_dir {
            command.current_dir(dir);
        }
        for (key, value) in &config.env {
            command.env(key, value);
        }

        let mut child = spawn_with_retry(&mut command, &config.binary).await?;
        let stdout = child.stdout.take().ok_or(DecorError::StdoutUnavailable)?;
        let stdin = child.stdin.take().ok_or(DecorError::StdinUnavailable)?;
        let stderr_task = child.stderr.take().map(|stderr| tokio::spawn(stderr_task(stderr)));

        Ok(BackendProcess {
            stdin: Some(stdin),
            stdout: Some(stdout),
            child,
            stderr_task,
        })
    }

    /// Takes the DAP channel. Callable once.
    pub fn take_io(&mut self) -> Result<(ChildStdout, ChildStdin), DecorError> {
        let stdout = self.stdout.take().ok_or(DecorError::StdoutUnavailable)?;
        let stdin = self.stdin.take().ok_or(DecorError::StdinUnavailable)?;
        Ok((stdout, stdin))
    }

    /// Waits for the backend to exit.
    pub async fn wait(&mut self) -> Result<std::process::ExitStatus, DecorError> {
        Ok(self.child.wait().await?)
    }
}

impl Drop for BackendProcess {
    fn drop(&mut self) {
        if let Some(task) = &self.stderr_task {
            task.abort();
        }
        let _ = self.child.start_kill();
    }
}

async fn spawn_with_retry(command: &mut Command, binary: &Path) -> Result<Child, DecorError> {
    let mut backoff = Duration::from_millis(2);
    for attempt in 0..5 {
        match command.spawn() {
            Ok(child) => return Ok(child),
            Err(source) => {
                let is_busy = matches!(source.kind(), std::io::ErrorKind::ExecutableFileBusy)
                    || source.raw_os_error() == Some(26);
                if is_busy && attempt < 4 {
                    tokio::time::sleep(backoff).await;
                    backoff = std::cmp::min(backoff * 2, Duration::from_millis(50));
                    continue;
                }
                return Err(DecorError::Spawn {
                    binary: binary.to_path_buf(),
                    source,
                });
            }
        }
    }

    unreachable!("spawn_with_retry should return before exhausting retries")
}

async fn stderr_task(stderr: ChildStderr) {
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        debug!("backend stderr: {line}");
    }
}
