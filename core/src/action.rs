pub mod error {
    #[allow(unused_imports)]
    pub(crate) use anyhow::{anyhow, bail, ensure, Context as _};
    pub use anyhow::{Error, Result};

    use std::path::PathBuf;

    /// Conditions that stop the run before any testcase is executed.
    #[derive(Debug, thiserror::Error)]
    pub enum PreflightError {
        #[error("Source file '{}' does not exist", .0.display())]
        MissingSource(PathBuf),

        #[error("Test directory '{}' does not exist", .0.display())]
        MissingTestDir(PathBuf),

        #[error("Evaluator '{}' does not exist", .0.display())]
        MissingEvaluator(PathBuf),

        #[error("No input files found in '{}' (input extension '{input_ext}')", .dir.display())]
        NoInputFiles { dir: PathBuf, input_ext: String },

        #[error("Case #{index} does not exist: only {count} cases were found")]
        NoSuchCase { index: usize, count: usize },

        #[error("Refusing to dump outputs into the test directory '{}' itself", .0.display())]
        DumpIntoTestDir(PathBuf),
    }
}
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use error::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::compile::{CompileError, Compiler};
use crate::context::ExecutionContext;
use crate::style;
use crate::testing::{
    CaseLayout, Evaluator, FsTestcase, Tally, TestOutcome, TestRunner, Verdict,
};

#[derive(Debug, Clone)]
pub struct EvalOptions {
    pub program: PathBuf,
    pub time_limit: Duration,
    /// Feed the case input to the evaluator before the candidate output.
    pub feed_input: bool,
}

#[derive(Debug, Clone, Default)]
pub struct DisplayOptions {
    pub show_path: bool,
    /// Only print the final statistics.
    pub succinct: bool,
    /// Print expected/actual output of every failed case.
    pub show_output: bool,
    pub points_per_case: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct TestOptions {
    pub sources: Vec<PathBuf>,
    pub testcase_dir: PathBuf,
    pub layout: CaseLayout,
    pub time_limit: Duration,
    pub evaluator: Option<EvalOptions>,
    /// Zero-based index into the natural-sorted case list.
    pub only_case: Option<usize>,
    /// Write every candidate output below this directory.
    pub dump_dir: Option<PathBuf>,
    pub display: DisplayOptions,
}

#[derive(Debug, Clone)]
pub struct TestReport {
    pub tally: Tally,
    /// (case index, outcome) in execution order.
    pub outcomes: Vec<(usize, TestOutcome)>,
}

fn check_preflight(opts: &TestOptions) -> Result<()> {
    if let Some(missing) = opts.sources.iter().find(|p| !p.is_file()) {
        return Err(PreflightError::MissingSource(missing.to_owned()).into());
    }
    if !opts.testcase_dir.is_dir() {
        return Err(PreflightError::MissingTestDir(opts.testcase_dir.to_owned()).into());
    }
    if let Some(eval) = &opts.evaluator {
        if !eval.program.is_file() {
            return Err(PreflightError::MissingEvaluator(eval.program.to_owned()).into());
        }
    }
    if let Some(dump_dir) = &opts.dump_dir {
        // Dumped files would overwrite the expected outputs.
        let same = match (
            fsutil::canonicalize_path(dump_dir),
            fsutil::canonicalize_path(&opts.testcase_dir),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if same {
            return Err(PreflightError::DumpIntoTestDir(dump_dir.to_owned()).into());
        }
    }
    Ok(())
}

/// Compiles the sources, runs every (or the selected) testcase and prints the results.
pub async fn do_test(
    opts: &TestOptions,
    compiler: &Compiler,
    ctx: Arc<ExecutionContext>,
) -> Result<TestReport> {
    check_preflight(opts)?;

    let testcases = FsTestcase::enumerate(&opts.testcase_dir, &opts.layout)
        .context("Failed to find testcases")?;
    if testcases.is_empty() {
        return Err(PreflightError::NoInputFiles {
            dir: opts.testcase_dir.to_owned(),
            input_ext: opts.layout.input_ext().to_owned(),
        }
        .into());
    }
    if let Some(index) = opts.only_case {
        if index >= testcases.len() {
            return Err(PreflightError::NoSuchCase {
                index,
                count: testcases.len(),
            }
            .into());
        }
    }

    let compilation = match compiler.compile(&opts.sources, &opts.testcase_dir).await {
        Ok(c) => c,
        Err(e) => {
            if let CompileError::NoArtifact { diagnostics } = &e {
                style::print_compiler_output(diagnostics);
            }
            return Err(e.into());
        }
    };
    style::print_compiler_output(&compilation.diagnostics);

    let program = compilation.artifact.path().to_owned();
    if !ctx.set_artifact(compilation.artifact) {
        log::warn!("An artifact was already registered; keeping the first one");
    }

    let evaluator = opts.evaluator.as_ref().map(|e| {
        Evaluator::new(&e.program)
            .time_limit(e.time_limit)
            .feed_input(e.feed_input)
    });
    let runner = TestRunner::new(&program, ctx.clone())
        .execution_time_limit(opts.time_limit)
        .evaluator(evaluator);

    log::info!(
        "Running {} ({} testcases, time limit {}ms)",
        program.display(),
        testcases.len(),
        opts.time_limit.as_millis()
    );

    let style = ProgressStyle::default_spinner()
        .template("{spinner} {msg}")
        .context("Invalid progress template")?;

    let mut tally = Tally::new();
    let mut outcomes = Vec::new();

    for (index, t) in testcases.iter().enumerate() {
        if opts.only_case.map_or(false, |only| only != index) {
            continue;
        }

        let bar = if opts.display.succinct {
            ProgressBar::hidden()
        } else {
            ProgressBar::new_spinner()
                .with_style(style.clone())
                .with_message(format!("Case #{:02} ...", index))
        };
        bar.enable_steady_tick(Duration::from_millis(50));

        let res = runner.run(t).await;
        bar.finish_and_clear();
        let res = res?;

        if !opts.display.succinct {
            println!(
                "{}",
                style::format_case_line(index, &res, opts.display.show_path)
            );
        }
        if let Some(dump_dir) = &opts.dump_dir {
            dump_output(dump_dir, &opts.testcase_dir, &opts.layout, &res)?;
        }

        tally.record(res.verdict);
        outcomes.push((index, res));
    }

    if opts.display.show_output {
        outcomes
            .iter()
            .filter(|(_, res)| res.verdict != Verdict::Accepted)
            .for_each(|(index, res)| style::print_test_result_detail(*index, res));
    }

    style::print_test_result_summary(&tally, opts.display.points_per_case);
    Ok(TestReport { tally, outcomes })
}

/// Where the output of `testcase` is dumped: its path relative to `testcase_dir`,
/// moved below `dump_dir`, with the output extension.
pub fn dump_path_for(
    dump_dir: &Path,
    testcase_dir: &Path,
    layout: &CaseLayout,
    input: &Path,
) -> PathBuf {
    let rel = input.strip_prefix(testcase_dir).unwrap_or(input);
    let rel = match rel.file_name() {
        Some(_) if rel.is_relative() => rel,
        _ => Path::new(input.file_name().unwrap_or(input.as_os_str())),
    };
    layout.expected_path_for(&dump_dir.join(rel))
}

fn dump_output(
    dump_dir: &Path,
    testcase_dir: &Path,
    layout: &CaseLayout,
    res: &TestOutcome,
) -> Result<()> {
    let Some(input) = &res.input_path else {
        return Ok(());
    };
    let path = dump_path_for(dump_dir, testcase_dir, layout, input);
    fsutil::write_with_mkdir(&path, &res.output.stdout)
        .with_context(|| format!("Failed to dump output of {}", res.testcase_name))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn dump_path_mirrors_testcase_dir() {
        let layout = CaseLayout::new(".in", ".ans");
        assert_eq!(
            dump_path_for(
                Path::new("/dump"),
                Path::new("/t"),
                &layout,
                Path::new("/t/sub/3.in")
            ),
            Path::new("/dump/sub/3.ans")
        );
        assert_eq!(
            dump_path_for(
                Path::new("/dump"),
                Path::new("/elsewhere"),
                &layout,
                Path::new("/t/3.in")
            ),
            Path::new("/dump/3.ans")
        );
    }

    #[test]
    fn dump_uses_input_path_of_outcome() {
        use crate::testing::ProcessOutput;

        let dir = tempfile::tempdir().unwrap();
        let tests = dir.path().join("tests");
        let dump = dir.path().join("dump");
        let mut res = TestOutcome {
            verdict: Verdict::WrongAnswer,
            testcase_name: "3".to_owned(),
            input_path: Some(tests.join("sub/3.in")),
            execution_time: Duration::ZERO,
            output: ProcessOutput {
                status: None,
                stdout: "8\n".to_owned(),
                stderr: String::new(),
            },
            expected: Some("7\n".to_owned()),
            note: None,
        };
        dump_output(&dump, &tests, &CaseLayout::default(), &res).unwrap();
        assert_eq!(
            std::fs::read_to_string(dump.join("sub/3.out")).unwrap(),
            "8\n"
        );

        // On-memory cases have nothing to mirror.
        res.input_path = None;
        let other = dir.path().join("other");
        dump_output(&other, &tests, &CaseLayout::default(), &res).unwrap();
        assert!(!other.exists());
    }

    #[test]
    fn preflight_reports_missing_paths() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.cpp");
        std::fs::write(&src, "").unwrap();

        let mut opts = TestOptions {
            sources: vec![src.clone(), dir.path().join("lib.cpp")],
            testcase_dir: dir.path().to_owned(),
            layout: CaseLayout::default(),
            time_limit: Duration::from_secs(1),
            evaluator: None,
            only_case: None,
            dump_dir: None,
            display: DisplayOptions::default(),
        };
        let err = check_preflight(&opts).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreflightError>(),
            Some(PreflightError::MissingSource(_))
        ));

        opts.sources = vec![src];
        opts.evaluator = Some(EvalOptions {
            program: dir.path().join("checker"),
            time_limit: Duration::from_secs(1),
            feed_input: false,
        });
        let err = check_preflight(&opts).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreflightError>(),
            Some(PreflightError::MissingEvaluator(_))
        ));

        opts.evaluator = None;
        opts.dump_dir = Some(dir.path().join("."));
        let err = check_preflight(&opts).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreflightError>(),
            Some(PreflightError::DumpIntoTestDir(_))
        ));

        opts.dump_dir = Some(dir.path().join("dump"));
        assert!(check_preflight(&opts).is_ok());

        opts.testcase_dir = dir.path().join("missing");
        let err = check_preflight(&opts).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PreflightError>(),
            Some(PreflightError::MissingTestDir(_))
        ));
    }
}
