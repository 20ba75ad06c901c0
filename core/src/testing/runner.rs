use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;

use super::{evaluator::*, process::*, result::*, testcase::*};
use crate::context::{ExecutionContext, ProcessSlot};

/// Runs one testcase at a time against the candidate and decides its verdict.
#[derive(Debug, Clone)]
pub struct TestRunner {
    candidate: ProcessRunner,
    execution_time_limit: Duration,
    evaluator: Option<Evaluator>,
    ctx: Arc<ExecutionContext>,
}

impl TestRunner {
    const DEFAULT_EXEC_TIME_LIMIT: Duration = Duration::from_millis(1000);

    pub fn new(program: impl Into<PathBuf>, ctx: Arc<ExecutionContext>) -> Self {
        Self {
            candidate: ProcessRunner::new(program, ProcessSlot::Candidate),
            execution_time_limit: Self::DEFAULT_EXEC_TIME_LIMIT,
            evaluator: None,
            ctx,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<std::ffi::OsString>,
    {
        self.candidate = self.candidate.args(args);
        self
    }

    pub fn execution_time_limit(mut self, limit: Duration) -> Self {
        self.execution_time_limit = limit;
        self
    }

    pub fn evaluator(mut self, evaluator: Option<Evaluator>) -> Self {
        self.evaluator = evaluator;
        self
    }

    /// Per-case failures end up in the verdict. `Err` means the harness itself is broken
    /// (unreadable case, candidate cannot be spawned).
    pub async fn run<T>(&self, testcase: &T) -> anyhow::Result<TestOutcome>
    where
        T: AsyncTestcase + Sync,
    {
        let (input, expected) = tokio::try_join!(testcase.read_input(), testcase.read_expected())?;
        // Only a missing newline is added; empty input stays empty.
        let input = with_trailing_newline(input);

        let outcome = self
            .candidate
            .run(
                &input,
                self.execution_time_limit,
                self.ctx.live_processes(),
            )
            .await
            .with_context(|| {
                format!(
                    "Failed to run '{}' on {}",
                    self.candidate.program().to_string_lossy(),
                    testcase.name()
                )
            })?;

        let expected = expected.map(|b| String::from_utf8_lossy(&b).into_owned());
        let mut note = None;

        let (verdict, status, captured) = match outcome {
            RunOutcome::TimedOut(captured) => (Verdict::TimeLimitExceeded, None, captured),
            RunOutcome::Exited(status, captured) => {
                let stdout = String::from_utf8_lossy(&captured.stdout);
                let verdict = match (&expected, &self.evaluator) {
                    (Some(expected), _) if outputs_match(expected, &stdout) => Verdict::Accepted,
                    (None, None) => {
                        note = Some("No expected output and no evaluator configured".to_owned());
                        Verdict::EvalError
                    }
                    (_, Some(evaluator)) => {
                        let res = evaluator
                            .evaluate(&input, &captured.stdout, self.ctx.live_processes())
                            .await;
                        match res {
                            EvalOutcome::Accepted => Verdict::Accepted,
                            EvalOutcome::Rejected => classify_mismatch(status),
                            EvalOutcome::Error(msg) => {
                                note = Some(msg);
                                Verdict::EvalError
                            }
                        }
                    }
                    (Some(_), None) => classify_mismatch(status),
                };
                (verdict, Some(status), captured)
            }
        };

        Ok(TestOutcome {
            verdict,
            testcase_name: testcase.name().to_owned(),
            input_path: testcase.input_path().map(ToOwned::to_owned),
            execution_time: captured.elapsed,
            output: ProcessOutput {
                status,
                stdout: String::from_utf8_lossy(&captured.stdout).into(),
                stderr: String::from_utf8_lossy(&captured.stderr).into(),
            },
            expected,
            note,
        })
    }
}

/// Unifies `\r\n` and lone `\r` to `\n` and trims surrounding whitespace.
pub fn normalize_output(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n").trim().to_owned()
}

pub fn outputs_match(expected: &str, actual: &str) -> bool {
    normalize_output(expected) == normalize_output(actual)
}

/// Verdict for output that was not accepted.
fn classify_mismatch(status: ExitKind) -> Verdict {
    if status.is_success() {
        Verdict::WrongAnswer
    } else {
        Verdict::RuntimeError
    }
}

fn with_trailing_newline(mut input: Vec<u8>) -> Vec<u8> {
    if input.last().map_or(false, |&c| c != b'\n') {
        input.push(b'\n');
    }
    input
}
