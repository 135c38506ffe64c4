use crate::{CancelToken, ProcessConfig};
use async_trait::async_trait;
use chrono::Utc;
use dotrelay_core::{ExecutionRequest, ExecutionResult};
use std::process::{ExitStatus, Stdio};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Runs an [`ExecutionRequest`] to completion. Implementations never fail:
/// every ending is reported as an [`ExecutionResult`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, request: ExecutionRequest, cancel: CancelToken) -> ExecutionResult;
}

/// Spawns the external tool as a child process
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner {
    config: ProcessConfig,
}

enum Ending {
    Exited(std::io::Result<ExitStatus>),
    TimedOut(Duration),
    Cancelled,
}

impl ProcessRunner {
    pub fn new(config: ProcessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }

    /// Execute a request, bounded by its timeout (or the configured default)
    /// and by `cancel`.
    pub async fn execute(
        &self,
        request: &ExecutionRequest,
        cancel: &CancelToken,
    ) -> ExecutionResult {
        let started_at = Utc::now();
        let start_instant = Instant::now();
        let timeout = request.timeout.unwrap_or(self.config.default_timeout);

        if cancel.is_cancelled() {
            return ExecutionResult::cancelled(request, String::new(), String::new(), started_at, 0);
        }

        let mut command = Command::new(&request.executable);
        command
            .args(request.arguments.argv())
            .envs(&self.config.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &request.working_directory {
            command.current_dir(dir);
        }
        // Own process group, so descendants can be killed with the child.
        #[cfg(unix)]
        command.process_group(0);

        debug!(
            command = %request.command_line(),
            working_directory = ?request.working_directory,
            timeout_ms = timeout.as_millis() as u64,
            "Spawning process"
        );

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                warn!(
                    executable = %request.executable,
                    error = %e,
                    "Failed to start process"
                );
                return ExecutionResult::launch_failed(request, e.to_string());
            }
        };

        let mut group = ProcessGroup::of(&child);

        // Both pipes are drained while we wait so a chatty child never blocks on a full pipe.
        let stdout = Capture::spawn(child.stdout.take());
        let stderr = Capture::spawn(child.stderr.take());

        let ending = tokio::select! {
            status = child.wait() => Ending::Exited(status),
            _ = tokio::time::sleep(timeout) => Ending::TimedOut(timeout),
            _ = cancel.cancelled() => Ending::Cancelled,
        };

        if !matches!(ending, Ending::Exited(_)) {
            group.kill();
            if let Err(e) = child.kill().await {
                warn!(error = %e, "Failed to kill process");
            }
        }
        group.disarm();

        let grace = self.config.drain_grace;
        let (stdout, stderr) = tokio::join!(stdout.finish(grace), stderr.finish(grace));
        let duration_ms = start_instant.elapsed().as_millis() as u64;

        let result = match ending {
            Ending::Exited(Ok(status)) => ExecutionResult::completed(
                request,
                exit_code(status),
                stdout,
                stderr,
                started_at,
                duration_ms,
            ),
            Ending::Exited(Err(e)) => {
                warn!(error = %e, "Failed to wait for process");
                ExecutionResult::completed(request, -1, stdout, stderr, started_at, duration_ms)
            }
            Ending::TimedOut(after) => {
                warn!(
                    command = %request.command_line(),
                    timeout_ms = after.as_millis() as u64,
                    "Process exceeded its timeout and was killed"
                );
                ExecutionResult::timed_out(request, after, stdout, stderr, started_at, duration_ms)
            }
            Ending::Cancelled => {
                info!(command = %request.command_line(), "Process cancelled");
                ExecutionResult::cancelled(request, stdout, stderr, started_at, duration_ms)
            }
        };

        info!(
            execution_id = %result.id(),
            exit_code = result.exit_code(),
            duration_ms = result.duration_ms(),
            "Process finished"
        );

        result
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(&self, request: ExecutionRequest, cancel: CancelToken) -> ExecutionResult {
        self.execute(&request, &cancel).await
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

/// Process group led by the child. Killed as a whole on timeout, on
/// cancellation, and when the execution future is dropped mid-run.
struct ProcessGroup {
    pgid: Option<u32>,
}

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self { pgid: child.id() }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid);
        }
    }

    /// The group was reaped normally; nothing to kill on drop.
    fn disarm(&mut self) {
        self.pgid = None;
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    use nix::sys::signal::{killpg, Signal};
    use nix::unistd::Pid;

    if let Err(e) = killpg(Pid::from_raw(pgid as i32), Signal::SIGKILL) {
        debug!(pgid, error = %e, "Failed to kill process group");
    }
}

// kill_on_drop covers the direct child; there is no group to signal.
#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

/// Accumulates one output stream on a background task.
struct Capture {
    buffer: Arc<Mutex<Vec<u8>>>,
    task: Option<JoinHandle<()>>,
}

impl Capture {
    fn spawn<R>(reader: Option<R>) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let task = reader.map(|mut reader| {
            let buffer = Arc::clone(&buffer);
            tokio::spawn(async move {
                let mut chunk = vec![0u8; 8192];
                loop {
                    match reader.read(&mut chunk).await {
                        Ok(0) => break,
                        Ok(n) => lock(&buffer).extend_from_slice(&chunk[..n]),
                        Err(e) => {
                            debug!(error = %e, "Output stream read failed");
                            break;
                        }
                    }
                }
            })
        });
        Self { buffer, task }
    }

    /// Wait up to `grace` for the stream to reach EOF, then return what was read.
    async fn finish(self, grace: Duration) -> String {
        if let Some(mut task) = self.task {
            if tokio::time::timeout(grace, &mut task).await.is_err() {
                // A grandchild still holds the pipe open.
                debug!("Output stream still open after drain grace, abandoning");
                task.abort();
            }
        }
        let bytes = std::mem::take(&mut *lock(&self.buffer));
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

fn lock(buffer: &Mutex<Vec<u8>>) -> std::sync::MutexGuard<'_, Vec<u8>> {
    buffer.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
