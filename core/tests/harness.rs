use std::{
    os::unix::fs::PermissionsExt,
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use casetest_core::{
    action::{self, error::PreflightError, DisplayOptions, EvalOptions, TestOptions},
    compile::{CompileRule, Compiler},
    config::SourcePattern,
    context::ProcessSlot,
    testing::{CaseLayout, ExitKind, Verdict},
    ExecutionContext,
};
use nix::{errno::Errno, sys::signal, unistd::Pid};

fn write_script(path: &Path, body: &str) {
    std::fs::write(path, format!("#!/bin/sh\n{}\n", body)).unwrap();
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn write_cases(dir: &Path, cases: &[(&str, &str, Option<&str>)]) {
    for (name, input, expected) in cases {
        std::fs::write(dir.join(format!("{}.in", name)), input).unwrap();
        if let Some(expected) = expected {
            std::fs::write(dir.join(format!("{}.out", name)), expected).unwrap();
        }
    }
}

fn options(source: PathBuf, dir: &Path) -> TestOptions {
    TestOptions {
        sources: vec![source],
        testcase_dir: dir.to_owned(),
        layout: CaseLayout::default(),
        time_limit: Duration::from_secs(1),
        evaluator: None,
        only_case: None,
        dump_dir: None,
        display: DisplayOptions {
            succinct: true,
            ..Default::default()
        },
    }
}

fn builtin_compiler() -> Compiler {
    Compiler::from_config(&casetest_core::Config::builtin().unwrap())
}

/// Candidate behaves according to the first number it reads.
const CANDIDATE: &str = r#"
read a b
case "$a" in
  3) echo $((a + b)) ;;
  5) echo 8 ;;
  6) kill -SEGV $$ ;;
  7) while :; do :; done ;;
  *) echo "$a" ;;
esac
"#;

#[tokio::test]
async fn verdicts_in_natural_order() {
    let dir = tempfile::tempdir().unwrap();
    let bin = dir.path().join("bin");
    std::fs::create_dir(&bin).unwrap();
    let prog = bin.join("solve");
    write_script(&prog, CANDIDATE);

    let cases = dir.path().join("cases");
    std::fs::create_dir(&cases).unwrap();
    write_cases(
        &cases,
        &[
            ("1", "3 4\n", Some("7\n")),
            ("2", "5 4\n", Some("9\n")),
            ("10", "7 0\n", Some("7\n")),
            ("3", "6 0\n", Some("6\n")),
            ("4", "9 0\n", None),
        ],
    );

    let ctx = Arc::new(ExecutionContext::new());
    let report = action::do_test(&options(prog, &cases), &builtin_compiler(), ctx.clone())
        .await
        .unwrap();
    ctx.cleanup();

    let got: Vec<_> = report
        .outcomes
        .iter()
        .map(|(i, res)| (*i, res.verdict))
        .collect();
    assert_eq!(
        got,
        vec![
            (0, Verdict::Accepted),
            (1, Verdict::WrongAnswer),
            (2, Verdict::RuntimeError),
            (3, Verdict::EvalError),
            (4, Verdict::TimeLimitExceeded),
        ]
    );
    assert_eq!(report.tally.total(), 5);
    assert_eq!(report.tally.passed(), 1);
    assert_eq!(report.tally.count(Verdict::TimeLimitExceeded), 1);
}

#[tokio::test]
async fn selected_case_runs_alone() {
    let dir = tempfile::tempdir().unwrap();
    let prog = dir.path().join("solve");
    write_script(&prog, CANDIDATE);
    write_cases(
        dir.path(),
        &[("a1", "3 4\n", Some("7\n")), ("a2", "5 4\n", Some("9\n"))],
    );

    let mut opts = options(prog, dir.path());
    opts.only_case = Some(1);
    let ctx = Arc::new(ExecutionContext::new());
    let report = action::do_test(&opts, &builtin_compiler(), ctx)
        .await
        .unwrap();

    assert_eq!(report.tally.total(), 1);
    assert_eq!(report.outcomes[0].0, 1);
    assert_eq!(report.outcomes[0].1.verdict, Verdict::WrongAnswer);

    opts.only_case = Some(2);
    let err = action::do_test(&opts, &builtin_compiler(), Arc::new(ExecutionContext::new()))
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PreflightError>(),
        Some(PreflightError::NoSuchCase { index: 2, count: 2 })
    ));
}

#[tokio::test]
async fn evaluator_adjudicates_and_rerun_is_identical() {
    let dir = tempfile::tempdir().unwrap();
    let prog = dir.path().join("solve");
    write_script(&prog, "read a b; echo $((a + b + 1))");
    let checker = dir.path().join("checker");
    write_script(&checker, r#"read a b; read c; [ "$c" -gt $((a + b)) ] && echo OK"#);
    write_cases(
        dir.path(),
        &[("1", "3 4\n", None), ("2", "1 1\n", Some("2\n"))],
    );

    let mut opts = options(prog, dir.path());
    opts.evaluator = Some(EvalOptions {
        program: checker,
        time_limit: Duration::from_secs(1),
        feed_input: true,
    });

    let mut runs = Vec::new();
    for _ in 0..2 {
        let report = action::do_test(&opts, &builtin_compiler(), Arc::new(ExecutionContext::new()))
            .await
            .unwrap();
        runs.push(report);
    }
    assert_eq!(runs[0].tally, runs[1].tally);
    assert_eq!(runs[0].tally.passed(), 2);
}

#[tokio::test]
async fn dumps_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let prog = dir.path().join("solve");
    write_script(&prog, CANDIDATE);
    let cases = dir.path().join("cases");
    std::fs::create_dir_all(cases.join("sub")).unwrap();
    write_cases(&cases, &[("1", "3 4\n", Some("7\n")), ("sub/2", "5 4\n", Some("9\n"))]);

    let dump = dir.path().join("dump");
    let mut opts = options(prog, &cases);
    opts.dump_dir = Some(dump.clone());
    action::do_test(&opts, &builtin_compiler(), Arc::new(ExecutionContext::new()))
        .await
        .unwrap();

    assert_eq!(std::fs::read_to_string(dump.join("1.out")).unwrap(), "7\n");
    assert_eq!(std::fs::read_to_string(dump.join("sub/2.out")).unwrap(), "8\n");
}

#[tokio::test]
async fn compiled_artifact_is_removed_unless_kept() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("sum.sh");
    std::fs::write(&src, "read a b; echo $((a + b))\n").unwrap();
    write_cases(dir.path(), &[("1", "3 4\n", Some("7\n"))]);

    let rules = vec![CompileRule {
        pattern: SourcePattern::parse("*.sh").unwrap(),
        command: "{ echo '#!/bin/sh'; cat #{sources}; } > #{outPath} && chmod +x #{outPath}"
            .to_owned(),
    }];

    for keep in [false, true] {
        let compiler = Compiler::new("/bin/sh", rules.clone()).keep_artifact(keep);
        let ctx = Arc::new(ExecutionContext::new());
        let report = action::do_test(&options(src.clone(), dir.path()), &compiler, ctx.clone())
            .await
            .unwrap();
        assert_eq!(report.tally.passed(), 1);

        let artifact = dir.path().join("sum");
        assert!(artifact.is_file());
        ctx.cleanup();
        assert_eq!(artifact.is_file(), keep);
    }
}

#[tokio::test]
async fn no_input_files_is_distinct_error() {
    let dir = tempfile::tempdir().unwrap();
    let prog = dir.path().join("solve");
    write_script(&prog, CANDIDATE);
    std::fs::write(dir.path().join("1.txt"), "3 4\n").unwrap();

    let err = action::do_test(
        &options(prog, dir.path()),
        &builtin_compiler(),
        Arc::new(ExecutionContext::new()),
    )
    .await
    .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<PreflightError>(),
        Some(PreflightError::NoInputFiles { .. })
    ));
}

#[tokio::test]
async fn compile_failure_aborts_before_running() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("main.c");
    std::fs::write(&src, "int main( {").unwrap();
    write_cases(dir.path(), &[("1", "3 4\n", Some("7\n"))]);

    let compiler = Compiler::new(
        "/bin/sh",
        vec![CompileRule {
            pattern: SourcePattern::parse("*.c").unwrap(),
            command: "echo 'main.c:1:11: error: expected declaration' >&2; exit 1".to_owned(),
        }],
    );
    let ctx = Arc::new(ExecutionContext::new());
    let err = action::do_test(&options(src, dir.path()), &compiler, ctx.clone())
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Couldn't compile the program");
    assert!(ctx.artifact().is_none());
}

#[tokio::test]
async fn cleanup_during_run_terminates_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let prog = dir.path().join("solve");
    write_script(&prog, "exec sleep 30");
    write_cases(dir.path(), &[("1", "3 4\n", Some("7\n"))]);

    let mut opts = options(prog, dir.path());
    opts.time_limit = Duration::from_secs(60);
    let ctx = Arc::new(ExecutionContext::new());
    let run = tokio::spawn({
        let ctx = ctx.clone();
        async move {
            let compiler = builtin_compiler();
            action::do_test(&opts, &compiler, ctx).await
        }
    });

    let pid = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Some(pid) = ctx.live_processes().pid(ProcessSlot::Candidate) {
                break pid;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .unwrap();

    ctx.cleanup();
    let report = tokio::time::timeout(Duration::from_secs(5), run)
        .await
        .unwrap()
        .unwrap()
        .unwrap();

    let res = &report.outcomes[0].1;
    assert_eq!(res.verdict, Verdict::RuntimeError);
    assert_eq!(res.output.status, Some(ExitKind::Signaled(signal::Signal::SIGTERM as i32)));
    assert_eq!(signal::kill(Pid::from_raw(pid as i32), None), Err(Errno::ESRCH));
}
