mod cmd;
mod util;

use std::sync::Arc;

use casetest_core::{action::error::PreflightError, style, ExecutionContext};
use clap::Parser;
use colored::Colorize;

#[tokio::main]
async fn main() {
    let args = cmd::Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .init();

    let ctx = Arc::new(ExecutionContext::new());

    // Runs beside the harness so that live children are still registered when it fires.
    let interrupt = tokio::spawn({
        let ctx = ctx.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                ctx.cleanup();
                println!("\n{}", "Interrupted.".yellow());
                std::process::exit(1);
            }
        }
    });

    let res = cmd::exec(&args, ctx.clone()).await;
    interrupt.abort();
    ctx.cleanup();

    if let Err(e) = res {
        match e.downcast_ref::<PreflightError>() {
            Some(PreflightError::NoInputFiles { dir, input_ext }) => {
                style::print_no_input_files(dir, input_ext)
            }
            _ => eprintln!("Error: {:?}", e),
        }
        std::process::exit(1);
    }
}
