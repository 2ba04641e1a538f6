//! External process whose log is being tailed
//!
//! The `Child` handle is moved into a background wait task. That task
//! publishes the exit on a watch channel and accepts a one-shot kill request.

use std::path::Path;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tokio::sync::{oneshot, watch};

use logrelay_core::prelude::*;

/// How the external process ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessExit {
    /// Exit code; `None` when ended by a signal or when waiting failed
    pub code: Option<i32>,
    /// Whether the exit followed a kill request
    pub killed: bool,
}

impl ProcessExit {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Code to propagate as this program's own exit status
    pub fn exit_code(&self) -> i32 {
        self.code.unwrap_or(1)
    }
}

/// A spawned external program
#[derive(Debug)]
pub struct ExternalProcess {
    program: String,
    pid: Option<u32>,
    kill_tx: Option<oneshot::Sender<()>>,
    exit_rx: watch::Receiver<Option<ProcessExit>>,
}

impl ExternalProcess {
    /// Spawn `program` with `args`, in `cwd` when given.
    ///
    /// Stdout lines are traced at debug level, stderr goes straight to ours.
    pub fn spawn<S: AsRef<str>>(program: &str, args: &[S], cwd: Option<&Path>) -> Result<Self> {
        let args: Vec<&str> = args.iter().map(|a| a.as_ref()).collect();
        info!("Spawning external process: {} {}", program, args.join(" "));

        let mut command = Command::new(program);
        command
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::ProgramNotFound {
                    program: program.to_string(),
                }
            } else {
                Error::ProcessSpawn {
                    program: program.to_string(),
                    reason: e.to_string(),
                }
            }
        })?;

        let pid = child.id();
        info!("External process started with PID: {:?}", pid);

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(Self::stdout_reader(stdout, program.to_string()));
        }

        let (kill_tx, kill_rx) = oneshot::channel::<()>();
        let (exit_tx, exit_rx) = watch::channel(None);
        tokio::spawn(Self::wait_for_exit(child, kill_rx, exit_tx));

        Ok(Self {
            program: program.to_string(),
            pid,
            kill_tx: Some(kill_tx),
            exit_rx,
        })
    }

    /// Background task: owns `child` until it exits or a kill is requested
    async fn wait_for_exit(
        mut child: Child,
        kill_rx: oneshot::Receiver<()>,
        exit_tx: watch::Sender<Option<ProcessExit>>,
    ) {
        let exit = tokio::select! {
            result = child.wait() => match result {
                Ok(status) => {
                    info!("External process exited with status: {:?}", status);
                    ProcessExit { code: status.code(), killed: false }
                }
                Err(e) => {
                    error!("Error waiting for external process: {}", e);
                    ProcessExit { code: None, killed: false }
                }
            },
            Ok(()) = kill_rx => {
                info!("Kill requested, terminating external process");
                if let Err(e) = child.kill().await {
                    error!("Failed to kill external process: {}", e);
                }
                let code = match child.wait().await {
                    Ok(status) => status.code(),
                    Err(e) => {
                        error!("Error waiting after kill: {}", e);
                        None
                    }
                };
                ProcessExit { code, killed: true }
            }
        };

        let _ = exit_tx.send(Some(exit));
    }

    async fn stdout_reader(stdout: ChildStdout, program: String) {
        let mut lines = BufReader::new(stdout).lines();
        let mut count = 0usize;
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    count += 1;
                    debug!("{}: {}", program, line);
                }
                Ok(None) => break,
                Err(e) => {
                    debug!("{}: stdout read error: {}", program, e);
                    break;
                }
            }
        }
        trace!("{}: stdout closed after {} lines", program, count);
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    pub fn has_exited(&self) -> bool {
        self.exit_rx.borrow().is_some()
    }

    /// Ask the wait task to kill the process; later calls do nothing
    pub fn kill(&mut self) {
        if let Some(tx) = self.kill_tx.take() {
            let _ = tx.send(());
        }
    }

    /// Wait for the process to end. Safe to call again after it returned.
    pub async fn wait(&mut self) -> Result<ProcessExit> {
        let exit = *self
            .exit_rx
            .wait_for(|exit| exit.is_some())
            .await
            .map_err(|_| Error::process(format!("wait task for {} ended early", self.program)))?;
        exit.ok_or_else(|| Error::process("exit state missing"))
    }
}

impl Drop for ExternalProcess {
    fn drop(&mut self) {
        self.kill();
    }
}
