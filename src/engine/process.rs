//! Real engine processes
//!
//! Spawns the ISOTROPY executable with piped stdin/stdout. Output is read as
//! bytes and decoded lossily, since the engine occasionally emits Latin-1.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};

use super::transport::{Launcher, Transport};
use crate::config::{EngineConfig, DATA_ENV};
use crate::error::{Error, Result};

/// Launches ISOTROPY according to an [`EngineConfig`]
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    config: EngineConfig,
}

impl ProcessLauncher {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[async_trait::async_trait]
impl Launcher for ProcessLauncher {
    type Transport = ProcessTransport;

    async fn launch(&self) -> Result<ProcessTransport> {
        let path = self.config.executable_path()?;
        if !path.is_file() {
            return Err(Error::EngineNotFound {
                path,
                reason: "no such file".to_string(),
            });
        }
        let data_dir = self.config.data_directory_env()?;
        let working_dir = self.config.resolve_working_directory()?;

        debug!(
            "starting isotropy {} in {} (ISODATA={})",
            path.display(),
            working_dir.display(),
            data_dir
        );

        let mut child = Command::new(&path)
            .env(DATA_ENV, &data_dir)
            .current_dir(&working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => Error::EngineNotFound {
                    path: path.clone(),
                    reason: e.to_string(),
                },
                _ => Error::EngineSpawnFailed {
                    path: path.clone(),
                    reason: e.to_string(),
                },
            })?;

        let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
            return Err(Error::EngineSpawnFailed {
                path,
                reason: "standard streams were not captured".to_string(),
            });
        };

        Ok(ProcessTransport {
            pid: child.id(),
            child,
            stdin,
            stdout: BufReader::new(stdout),
            buffer: Vec::with_capacity(256),
        })
    }

    fn remove_scratch_files(&self) -> Result<Vec<PathBuf>> {
        let working_dir = self.config.resolve_working_directory()?;
        let pattern = working_dir.join(&self.config.scratch_pattern);
        let pattern = pattern.to_string_lossy();

        let mut removed = Vec::new();
        for entry in glob::glob(&pattern)? {
            match entry {
                Ok(path) => match std::fs::remove_file(&path) {
                    Ok(()) => removed.push(path),
                    Err(e) => warn!("failed to remove {}: {}", path.display(), e),
                },
                Err(e) => warn!("unreadable scratch entry: {}", e),
            }
        }
        if !removed.is_empty() {
            warn!("removed isotropy scratch files {:?}", removed);
        }
        Ok(removed)
    }

    fn describe(&self) -> String {
        match self.config.executable_path() {
            Ok(path) => path.display().to_string(),
            Err(_) => format!("{} (location unset)", self.config.executable),
        }
    }
}

/// Pipes of one running ISOTROPY process
#[derive(Debug)]
pub struct ProcessTransport {
    child: Child,
    pid: Option<u32>,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    buffer: Vec<u8>,
}

impl ProcessTransport {
    async fn wait_for_exit(&mut self, grace: Duration) -> bool {
        match tokio::time::timeout(grace, self.child.wait()).await {
            Ok(Ok(status)) => {
                debug!("isotropy exited with {}", status);
                true
            }
            Ok(Err(e)) => {
                warn!("failed to wait for isotropy: {}", e);
                false
            }
            Err(_) => false,
        }
    }

    #[cfg(unix)]
    fn send_terminate(&self) {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.pid {
            if let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
                debug!("SIGTERM to {} failed: {}", pid, e);
            }
        }
    }

    #[cfg(not(unix))]
    fn send_terminate(&self) {}
}

#[async_trait::async_trait]
impl Transport for ProcessTransport {
    async fn read_line(&mut self) -> Result<Option<String>> {
        self.buffer.clear();
        let n = self
            .stdout
            .read_until(b'\n', &mut self.buffer)
            .await
            .map_err(Error::from_pipe)?;
        if n == 0 {
            return Ok(None);
        }
        while matches!(self.buffer.last(), Some(b'\n' | b'\r')) {
            self.buffer.pop();
        }
        Ok(Some(String::from_utf8_lossy(&self.buffer).into_owned()))
    }

    async fn write_line(&mut self, line: &str) -> Result<()> {
        let mut bytes = Vec::with_capacity(line.len() + 1);
        bytes.extend_from_slice(line.as_bytes());
        bytes.push(b'\n');
        self.stdin.write_all(&bytes).await.map_err(Error::from_pipe)?;
        self.stdin.flush().await.map_err(Error::from_pipe)
    }

    async fn terminate(&mut self, grace: Duration) -> Result<()> {
        if self.wait_for_exit(grace).await {
            return Ok(());
        }

        self.send_terminate();
        if self.wait_for_exit(grace).await {
            return Ok(());
        }

        warn!("isotropy ignored shutdown; killing pid {:?}", self.pid);
        if let Err(e) = self.child.kill().await {
            warn!("failed to kill isotropy: {}", e);
        }
        Ok(())
    }

    fn pid(&self) -> Option<u32> {
        self.pid
    }
}
