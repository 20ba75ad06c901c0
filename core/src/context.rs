//! State shared between the harness and the interrupt handler.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, AtomicU32, Ordering},
        OnceLock,
    },
};

use nix::{
    errno::Errno,
    sys::signal::{self, Signal},
    unistd::Pid,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessSlot {
    Candidate,
    Evaluator,
}

/// Pids of the children currently alive (0 = none).
/// At most one candidate and one evaluator run at any time.
#[derive(Debug, Default)]
pub struct LiveProcesses {
    candidate: AtomicU32,
    evaluator: AtomicU32,
}

/// Unregisters the pid when dropped.
#[must_use]
pub struct Registration<'a> {
    slot: &'a AtomicU32,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.slot.store(0, Ordering::SeqCst);
    }
}

impl LiveProcesses {
    fn slot(&self, slot: ProcessSlot) -> &AtomicU32 {
        match slot {
            ProcessSlot::Candidate => &self.candidate,
            ProcessSlot::Evaluator => &self.evaluator,
        }
    }

    pub fn register(&self, slot: ProcessSlot, pid: u32) -> Registration<'_> {
        let slot = self.slot(slot);
        slot.store(pid, Ordering::SeqCst);
        Registration { slot }
    }

    pub fn pid(&self, slot: ProcessSlot) -> Option<u32> {
        match self.slot(slot).load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// Sends SIGTERM to every registered child. Already exited children are ignored.
    pub fn terminate_all(&self) {
        for slot in [ProcessSlot::Candidate, ProcessSlot::Evaluator] {
            if let Some(pid) = self.pid(slot) {
                send_sigterm(pid);
            }
        }
    }
}

pub(crate) fn send_sigterm(pid: u32) {
    log::debug!("Sending SIGTERM to pid={}", pid);
    match signal::kill(Pid::from_raw(pid as i32), Signal::SIGTERM) {
        Ok(()) | Err(Errno::ESRCH) => {}
        Err(e) => log::warn!("Failed to send SIGTERM to pid={}: {}", pid, e),
    }
}

/// The executable under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    path: PathBuf,
    temporary: bool,
}

impl Artifact {
    /// Built by us: removed on cleanup unless kept.
    pub fn compiled(path: impl Into<PathBuf>, keep: bool) -> Self {
        Self {
            path: path.into(),
            temporary: !keep,
        }
    }

    /// Supplied by the user: never removed.
    pub fn prebuilt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            temporary: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_temporary(&self) -> bool {
        self.temporary
    }
}

#[derive(Debug, Default)]
pub struct ExecutionContext {
    live: LiveProcesses,
    artifact: OnceLock<Artifact>,
    cleaned_up: AtomicBool,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_processes(&self) -> &LiveProcesses {
        &self.live
    }

    /// Returns false if an artifact was already set.
    pub fn set_artifact(&self, artifact: Artifact) -> bool {
        self.artifact.set(artifact).is_ok()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.get()
    }

    /// Terminates live children and removes the temporary artifact.
    /// Only the first call does anything, whichever of the normal exit path or the
    /// interrupt handler gets here first.
    pub fn cleanup(&self) {
        if self.cleaned_up.swap(true, Ordering::SeqCst) {
            return;
        }
        self.live.terminate_all();

        let Some(artifact) = self.artifact.get() else {
            return
        };
        if !artifact.is_temporary() {
            return;
        }
        match fsutil::remove_file(artifact.path()) {
            Ok(()) => log::debug!("Removed {}", artifact.path().display()),
            Err(e) if e.io_kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => log::warn!("{}", e),
        }
    }

    pub fn is_cleaned_up(&self) -> bool {
        self.cleaned_up.load(Ordering::SeqCst)
    }
}
