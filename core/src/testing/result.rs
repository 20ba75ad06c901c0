use std::{collections::HashMap, path::PathBuf, time::Duration};

use super::process::ExitKind;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display, strum::EnumIter,
)]
pub enum Verdict {
    #[strum(serialize = "OK")]
    Accepted,
    #[strum(serialize = "WA")]
    WrongAnswer,
    #[strum(serialize = "RTE")]
    RuntimeError,
    #[strum(serialize = "TIME")]
    TimeLimitExceeded,
    #[strum(serialize = "EVAL")]
    EvalError,
}

/// What the candidate printed. `status` is `None` when it was killed for exceeding the limit.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProcessOutput {
    pub status: Option<ExitKind>,
    pub stdout: String,
    pub stderr: String,
}

#[derive(Debug, Clone)]
pub struct TestOutcome {
    pub verdict: Verdict,
    pub testcase_name: String,
    pub input_path: Option<PathBuf>,
    pub execution_time: Duration,
    pub output: ProcessOutput,
    pub expected: Option<String>,
    /// Why the evaluator could not be trusted, for `EvalError`.
    pub note: Option<String>,
}

/// Number of cases per verdict.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tally {
    counts: HashMap<Verdict, usize>,
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, verdict: Verdict) {
        *self.counts.entry(verdict).or_default() += 1;
    }

    pub fn count(&self, verdict: Verdict) -> usize {
        self.counts.get(&verdict).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn passed(&self) -> usize {
        self.count(Verdict::Accepted)
    }

    pub fn all_passed(&self) -> bool {
        self.passed() == self.total()
    }

    /// Percentage of accepted cases; 0 when nothing ran.
    pub fn percentage(&self) -> f64 {
        match self.total() {
            0 => 0.0,
            total => self.passed() as f64 * 100.0 / total as f64,
        }
    }

    pub fn points(&self, points_per_case: u64) -> u64 {
        self.passed() as u64 * points_per_case
    }
}

impl FromIterator<Verdict> for Tally {
    fn from_iter<I: IntoIterator<Item = Verdict>>(iter: I) -> Self {
        let mut tally = Self::new();
        iter.into_iter().for_each(|v| tally.record(v));
        tally
    }
}
