use std::{path::PathBuf, time::Duration};

use super::process::{ExitKind, ProcessRunner, RunOutcome};
use crate::context::{LiveProcesses, ProcessSlot};

/// An external program that decides whether the candidate's output is acceptable.
///
/// It reads the candidate's output (optionally preceded by the case input) on stdin and
/// accepts by exiting with 0 or by printing a line consisting of `OK`.
#[derive(Debug, Clone)]
pub struct Evaluator {
    runner: ProcessRunner,
    time_limit: Duration,
    feed_input: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalOutcome {
    Accepted,
    Rejected,
    /// The evaluator itself failed; its answer cannot be trusted.
    Error(String),
}

impl Evaluator {
    const DEFAULT_TIME_LIMIT: Duration = Duration::from_millis(1000);
    const ACCEPT_TOKEN: &str = "OK";

    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            runner: ProcessRunner::new(program, ProcessSlot::Evaluator),
            time_limit: Self::DEFAULT_TIME_LIMIT,
            feed_input: false,
        }
    }

    pub fn time_limit(mut self, limit: Duration) -> Self {
        self.time_limit = limit;
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString>,
    {
        self.runner = self.runner.args(args);
        self
    }

    /// Send the case input before the candidate output.
    pub fn feed_input(mut self, yes: bool) -> Self {
        self.feed_input = yes;
        self
    }

    pub async fn evaluate(&self, input: &[u8], output: &[u8], live: &LiveProcesses) -> EvalOutcome {
        let payload = if self.feed_input {
            [input, output].concat()
        } else {
            output.to_vec()
        };

        let program = self.runner.program().display();
        match self.runner.run(&payload, self.time_limit, live).await {
            Err(e) => {
                log::warn!("Failed to communicate with evaluator {}: {}", program, e);
                EvalOutcome::Error(format!("Failed to communicate with evaluator: {}", e))
            }
            Ok(RunOutcome::TimedOut(_)) => {
                log::warn!("Evaluator {} timed out", program);
                EvalOutcome::Error(format!(
                    "Evaluator exceeded {}ms",
                    self.time_limit.as_millis()
                ))
            }
            Ok(RunOutcome::Exited(status @ ExitKind::Signaled(_), _)) => {
                log::warn!("Evaluator {} crashed ({})", program, status);
                EvalOutcome::Error(format!("Evaluator crashed ({})", status))
            }
            Ok(RunOutcome::Exited(status, captured)) => {
                if status.is_success() || Self::prints_accept_token(&captured.stdout) {
                    EvalOutcome::Accepted
                } else {
                    EvalOutcome::Rejected
                }
            }
        }
    }

    fn prints_accept_token(stdout: &[u8]) -> bool {
        String::from_utf8_lossy(stdout)
            .lines()
            .any(|line| line.trim() == Self::ACCEPT_TOKEN)
    }
}
