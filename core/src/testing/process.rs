use std::{
    ffi::OsString,
    io,
    os::unix::process::ExitStatusExt,
    path::{Path, PathBuf},
    process::{ExitStatus, Stdio},
    time::Duration,
};

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    process::{Child, ChildStdin, Command},
    time::Instant,
};

use crate::context::{self, LiveProcesses, ProcessSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitKind {
    Exited(i32),
    Signaled(i32),
}

impl ExitKind {
    /// Only `exit(0)` counts as a normal exit.
    pub fn is_success(&self) -> bool {
        *self == ExitKind::Exited(0)
    }
}

impl From<ExitStatus> for ExitKind {
    fn from(status: ExitStatus) -> Self {
        match status.code() {
            Some(code) => ExitKind::Exited(code),
            None => ExitKind::Signaled(status.signal().unwrap_or(0)),
        }
    }
}

impl std::fmt::Display for ExitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExitKind::Exited(code) => write!(f, "exitcode={}", code),
            ExitKind::Signaled(sig) => write!(f, "terminated by signal {}", sig),
        }
    }
}

/// Everything read from the child before it exited or was killed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Captured {
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    pub elapsed: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Exited(ExitKind, Captured),
    TimedOut(Captured),
}

impl RunOutcome {
    pub fn captured(&self) -> &Captured {
        match self {
            RunOutcome::Exited(_, c) | RunOutcome::TimedOut(c) => c,
        }
    }
}

/// Spawns one program per `run()` call, feeds it a fixed payload and waits for it
/// under a wall-clock limit.
#[derive(Debug, Clone)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<OsString>,
    slot: ProcessSlot,
}

impl ProcessRunner {
    /// Time a child gets to exit after SIGTERM before it is SIGKILLed.
    const TERM_GRACE: Duration = Duration::from_millis(200);

    pub fn new(program: impl Into<PathBuf>, slot: ProcessSlot) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            slot,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Returns `Err` only if the child could not be spawned or its pipes failed.
    /// In the latter case the child has already been terminated and reaped.
    pub async fn run(
        &self,
        input: &[u8],
        time_limit: Duration,
        live: &LiveProcesses,
    ) -> io::Result<RunOutcome> {
        let mut proc = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;
        let _registration = proc.id().map(|pid| {
            log::debug!("Spawned {} (pid={})", self.program.display(), pid);
            live.register(self.slot, pid)
        });

        let stdin = proc.stdin.take().ok_or_else(|| pipe_error("stdin"))?;
        let mut stdout = proc.stdout.take().ok_or_else(|| pipe_error("stdout"))?;
        let mut stderr = proc.stderr.take().ok_or_else(|| pipe_error("stderr"))?;

        let mut stdout_buf = Vec::new();
        let mut stderr_buf = Vec::new();
        let start_at = Instant::now();

        // The interaction is dropped as soon as the deadline wins, so the child and the
        // buffers (holding whatever was read so far) are free to use afterwards.
        let res = {
            let interaction = async {
                tokio::try_join!(
                    feed_stdin(stdin, input),
                    stdout.read_to_end(&mut stdout_buf),
                    stderr.read_to_end(&mut stderr_buf),
                )?;
                proc.wait().await
            };
            tokio::select! {
                res = interaction => Some(res),
                _ = tokio::time::sleep(time_limit) => None,
            }
        };
        let elapsed = start_at.elapsed();

        let captured = Captured {
            stdout: stdout_buf,
            stderr: stderr_buf,
            elapsed,
        };
        match res {
            Some(Ok(status)) => Ok(RunOutcome::Exited(status.into(), captured)),
            Some(Err(e)) => {
                terminate(&mut proc).await;
                Err(e)
            }
            None => {
                log::debug!(
                    "{} exceeded {}ms",
                    self.program.display(),
                    time_limit.as_millis()
                );
                terminate(&mut proc).await;
                Ok(RunOutcome::TimedOut(captured))
            }
        }
    }
}

fn pipe_error(name: &str) -> io::Error {
    io::Error::new(io::ErrorKind::Other, format!("Failed to open {}", name))
}

/// Writes the whole payload and closes stdin. A child that exits without reading
/// everything is not an error.
async fn feed_stdin(mut stdin: ChildStdin, input: &[u8]) -> io::Result<()> {
    let res = async {
        stdin.write_all(input).await?;
        stdin.flush().await
    }
    .await;
    drop(stdin); // NOTE: the child sees EOF only after this

    match res {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
        res => res,
    }
}

/// SIGTERM, then SIGKILL after a grace period. Always reaps the child.
async fn terminate(proc: &mut Child) {
    let Some(pid) = proc.id() else {
        return; // already reaped
    };
    context::send_sigterm(pid);

    match tokio::time::timeout(ProcessRunner::TERM_GRACE, proc.wait()).await {
        Ok(Ok(status)) => {
            log::debug!("pid={} exited after SIGTERM ({})", pid, ExitKind::from(status));
            return;
        }
        Ok(Err(e)) => log::warn!("Failed to wait pid={}: {}", pid, e),
        Err(_) => log::debug!("pid={} ignored SIGTERM", pid),
    }
    proc.kill()
        .await
        .unwrap_or_else(|e| log::warn!("Failed to kill pid={}: {:#}", pid, e));
}
