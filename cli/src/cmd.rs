use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use casetest_core::{
    action::{self, DisplayOptions, EvalOptions, TestOptions},
    compile::Compiler,
    interactive,
    testing::CaseLayout,
    Config, ExecutionContext,
};

use crate::util;

/// Compiles a C/C++ program and judges it against a directory of testcases.
#[derive(Debug, clap::Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Source files linked together; the first one decides the toolchain
    #[arg()] // positional argument
    pub sources: Vec<PathBuf>,

    /// Directory containing the testcases
    #[arg(short = 'd', long)]
    pub dir: Option<PathBuf>,

    /// Time limit per case in seconds
    #[arg(short = 't', long, value_parser = util::parse_seconds)]
    pub time: Option<Duration>,

    /// Only run the case with this index
    #[arg(short = 'c', long = "case", value_name = "N")]
    pub only_case: Option<usize>,

    /// Extension of input files
    #[arg(short = 'i', long = "input-ext")]
    pub input_ext: Option<String>,

    /// Extension of expected output files
    #[arg(short = 'o', long = "output-ext")]
    pub output_ext: Option<String>,

    /// Program that judges the output when it differs from the expected one
    #[arg(short = 'e', long)]
    pub evaluator: Option<PathBuf>,

    /// Time limit of the evaluator in seconds
    #[arg(long, value_parser = util::parse_seconds)]
    pub eval_time: Option<Duration>,

    /// Feed the case input to the evaluator before the program output
    #[arg(long)]
    pub eval_with_input: bool,

    /// Report points instead of a percentage
    #[arg(short = 'p', long, value_name = "N")]
    pub points: Option<u64>,

    /// Hide the case path in each result line
    #[arg(long)]
    pub nopath: bool,

    /// Only print the final statistics
    #[arg(long)]
    pub succinct: bool,

    /// Print expected and actual output of failed cases
    #[arg(long)]
    pub show_output: bool,

    /// Write the output of every case below this directory
    #[arg(long, value_name = "DIR")]
    pub dump_dir: Option<PathBuf>,

    /// Keep the compiled program
    #[arg(short = 'k', long)]
    pub keep: bool,

    #[arg(short = 'v', long)]
    pub verbose: bool,
}

pub async fn exec(args: &Args, ctx: Arc<ExecutionContext>) -> anyhow::Result<()> {
    let cfg = Config::load(util::current_dir())?;

    let sources = match args.sources.is_empty() {
        false => args.sources.clone(),
        true => interactive::ask_paths("Source file(s)").context("Failed to read source files")?,
    };
    let testcase_dir = match &args.dir {
        Some(dir) => dir.clone(),
        None => interactive::ask_path("Test directory").context("Failed to read test directory")?,
    };

    let layout = CaseLayout::new(
        args.input_ext.as_deref().unwrap_or(&cfg.test.input_ext),
        args.output_ext.as_deref().unwrap_or(&cfg.test.output_ext),
    );
    let evaluator = args.evaluator.as_ref().map(|program| EvalOptions {
        program: program.clone(),
        time_limit: args.eval_time.unwrap_or_else(|| cfg.test.eval_time_limit()),
        feed_input: args.eval_with_input,
    });

    let opts = TestOptions {
        sources,
        testcase_dir,
        layout,
        time_limit: args.time.unwrap_or_else(|| cfg.test.time_limit()),
        evaluator,
        only_case: args.only_case,
        dump_dir: args.dump_dir.clone(),
        display: DisplayOptions {
            show_path: !args.nopath,
            succinct: args.succinct,
            show_output: args.show_output,
            points_per_case: args.points,
        },
    };

    let compiler =
        Compiler::from_config(&cfg).keep_artifact(args.keep || cfg.test.keep_artifact);

    let _ = action::do_test(&opts, &compiler, ctx).await?;
    Ok(())
}
