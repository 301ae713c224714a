use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::{Child, Command};
use tokio::time;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ScanError;

/// Raw result of a child process that ran to completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub exit_code: i32,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

/// Runs an argument vector as a child process.
///
/// Implementations must leave no child running when they return, whatever
/// the outcome.
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn run(
        &self,
        argv: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ScanError>;
}

#[async_trait]
impl<T: ProcessRunner + ?Sized> ProcessRunner for Arc<T> {
    async fn run(
        &self,
        argv: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ScanError> {
        (**self).run(argv, timeout, cancel).await
    }
}

/// Runs processes with `tokio::process`, without a shell.
///
/// - stdin is closed, stdout and stderr are piped and drained concurrently
///   with the wait so a chatty child cannot block on a full pipe.
/// - The child runs in its own process group. On timeout or cancellation the
///   whole group is killed and the child reaped before returning; after a
///   normal exit any stragglers left in the group are killed too.
/// - If the calling future is dropped (e.g. the HTTP client went away) the
///   group is killed and `kill_on_drop` takes care of the child.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioProcessRunner;

enum Outcome {
    Exited(std::io::Result<ExitStatus>),
    TimedOut,
    Cancelled,
}

#[async_trait]
impl ProcessRunner for TokioProcessRunner {
    async fn run(
        &self,
        argv: &[String],
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<ProcessOutput, ScanError> {
        let (program, args) = argv
            .split_first()
            .ok_or_else(|| ScanError::InvalidArgument("empty argument vector".into()))?;
        debug!(?argv, "spawning");

        let mut cmd = Command::new(program);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let mut child = cmd.spawn().map_err(|source| ScanError::BinaryNotFound {
            program: program.clone(),
            source,
        })?;
        let mut group = GroupKill::new(child.id(), program);

        let stdout = tokio::spawn(read_all(child.stdout.take()));
        let stderr = tokio::spawn(read_all(child.stderr.take()));
        let deadline = time::Instant::now() + timeout;

        let outcome = tokio::select! {
            status = child.wait() => Outcome::Exited(status),
            _ = time::sleep_until(deadline) => Outcome::TimedOut,
            _ = cancel.cancelled() => Outcome::Cancelled,
        };

        let status = match outcome {
            Outcome::Exited(Ok(status)) => status,
            Outcome::Exited(Err(source)) => {
                group.kill();
                terminate(&mut child, program).await;
                return Err(ScanError::Io {
                    program: program.clone(),
                    source,
                });
            }
            Outcome::TimedOut => {
                warn!(%program, ?timeout, "timed out, killing process group");
                group.kill();
                terminate(&mut child, program).await;
                stdout.abort();
                stderr.abort();
                return Err(ScanError::Timeout {
                    program: program.clone(),
                    after: timeout,
                });
            }
            Outcome::Cancelled => {
                warn!(%program, "cancelled, killing process group");
                group.kill();
                terminate(&mut child, program).await;
                stdout.abort();
                stderr.abort();
                return Err(ScanError::Cancelled {
                    program: program.clone(),
                });
            }
        };

        // Leftover background processes would hold the pipes open.
        group.kill();
        let drained = time::timeout_at(deadline, async {
            let out = stdout.await.map_err(std::io::Error::other)??;
            let err = stderr.await.map_err(std::io::Error::other)??;
            Ok::<_, std::io::Error>((out, err))
        })
        .await;

        match drained {
            Ok(Ok((stdout, stderr))) => Ok(ProcessOutput {
                exit_code: exit_code(status),
                stdout,
                stderr,
            }),
            Ok(Err(source)) => Err(ScanError::Io {
                program: program.clone(),
                source,
            }),
            Err(_) => {
                warn!(%program, ?timeout, "output pipes still open at deadline");
                Err(ScanError::Timeout {
                    program: program.clone(),
                    after: timeout,
                })
            }
        }
    }
}

/// Kills the child's process group, at most once, and on drop.
///
/// The child leads its own group, so this reaches anything it spawned.
struct GroupKill<'a> {
    pgid: Option<u32>,
    program: &'a str,
}

impl<'a> GroupKill<'a> {
    fn new(pgid: Option<u32>, program: &'a str) -> Self {
        Self { pgid, program }
    }

    fn kill(&mut self) {
        if let Some(pgid) = self.pgid.take() {
            kill_group(pgid, self.program);
        }
    }
}

impl Drop for GroupKill<'_> {
    fn drop(&mut self) {
        self.kill();
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32, program: &str) {
    let Ok(pgid) = libc::pid_t::try_from(pgid) else {
        return;
    };
    // SAFETY: killpg only takes integer arguments.
    let rc = unsafe { libc::killpg(pgid, libc::SIGKILL) };
    if rc != 0 {
        let err = std::io::Error::last_os_error();
        if err.raw_os_error() != Some(libc::ESRCH) {
            warn!(%program, pgid, "failed to kill process group: {err}");
        }
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32, _program: &str) {}

async fn read_all<R: AsyncRead + Unpin>(stream: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut s) = stream {
        s.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// Kill and reap the direct child.
async fn terminate(child: &mut Child, program: &str) {
    if let Err(e) = child.kill().await {
        warn!(%program, "failed to kill child: {e}");
    }
}

/// Exit code, or the negated signal number when the child was killed by one.
fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(sig) = status.signal() {
            return -sig;
        }
    }
    -1
}
