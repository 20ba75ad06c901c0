use std::path::Path;

use colored::{Color, ColoredString, Colorize};
use crossterm::terminal;

use crate::testing::{Tally, TestOutcome, Verdict};

pub fn is_truecolor_supported() -> bool {
    let Ok(v) = std::env::var("COLORTERM") else {
        return false
    };
    matches!(v.as_str(), "truecolor" | "24bit")
}

pub trait ColorTheme {
    fn color(&self) -> Color;
}

impl ColorTheme for Verdict {
    fn color(&self) -> Color {
        use Verdict::*;
        if !self::is_truecolor_supported() {
            return match self {
                Accepted => Color::Green,
                WrongAnswer => Color::Red,
                RuntimeError => Color::BrightRed,
                TimeLimitExceeded => Color::Yellow,
                EvalError => Color::Magenta,
            };
        }

        match self {
            Accepted => Color::TrueColor {
                r: 30,
                g: 180,
                b: 40,
            },
            WrongAnswer => Color::TrueColor {
                r: 220,
                g: 42,
                b: 42,
            },
            RuntimeError => Color::TrueColor {
                r: 240,
                g: 96,
                b: 32,
            },
            TimeLimitExceeded => Color::TrueColor {
                r: 210,
                g: 138,
                b: 4,
            },
            EvalError => Color::TrueColor {
                r: 171,
                g: 40,
                b: 200,
            },
        }
    }
}

/// Verdict label padded to a fixed width, e.g. `" OK "`, `"TIME"`.
pub fn verdict_label(verdict: Verdict) -> ColoredString {
    format!("{:^4}", verdict.to_string())
        .color(verdict.color())
        .bold()
}

/// `Case #03:  WA   0.0153s  tests/3.in`
pub fn format_case_line(index: usize, res: &TestOutcome, show_path: bool) -> String {
    let mut line = format!(
        "Case #{:02}: {}\t{:.4}s",
        index,
        verdict_label(res.verdict),
        res.execution_time.as_secs_f64(),
    );
    if show_path {
        line += "\t";
        line += &res.testcase_name;
    }
    if let Some(note) = &res.note {
        line += &format!("\t({})", note.dimmed());
    }
    line
}

pub fn print_compiler_output(diagnostics: &str) {
    if diagnostics.is_empty() {
        return;
    }
    println!("{}", "Compiler output:".yellow());
    print!("{}", diagnostics);
    if !diagnostics.ends_with('\n') {
        println!();
    }
}

pub fn print_no_input_files(dir: &Path, input_ext: &str) {
    println!(
        "{}No input files found in {}.",
        "Error: ".red(),
        dir.to_string_lossy()
    );
    println!(
        "Check that you inputted the correct testing directory, or try setting the -i and -o flags \
         to the extension of the test cases (currently '{}').",
        input_ext
    );
}

pub fn print_test_result_summary(tally: &Tally, points_per_case: Option<u64>) {
    let passed = tally.passed();
    let total = tally.total();

    let headline = match points_per_case {
        Some(points) => format!(
            "{} points. ({} out of {})",
            tally.points(points),
            passed,
            total
        ),
        None => format!(
            "{:.2}% correct. ({} out of {})",
            tally.percentage(),
            passed,
            total
        ),
    };
    if tally.all_passed() {
        println!("{}", headline.green());
    } else {
        println!("{}", headline.bright_red());
    }

    println!(
        "{} correct, {} timeouts, {} incorrect, {} runtime errors, {} evaluation errors.",
        passed.to_string().bold(),
        tally.count(Verdict::TimeLimitExceeded).to_string().bold(),
        tally.count(Verdict::WrongAnswer).to_string().bold(),
        tally.count(Verdict::RuntimeError).to_string().bold(),
        tally.count(Verdict::EvalError).to_string().bold(),
    );
}

pub fn print_test_result_detail(index: usize, res: &TestOutcome) {
    let stdout_lines: Vec<_> = res.output.stdout.lines().collect();

    let (cols, _) = terminal::size().unwrap_or((40, 40));
    let cols = (cols as usize).max(20);

    const BOLD_LINE: &str = "━";
    const THIN_LINE: &str = "─";

    let bold_bar = BOLD_LINE.repeat(cols).blue().bold();

    let title = match res.output.status {
        Some(status) => format!("Case #{:02} ({})", index, status),
        None => format!("Case #{:02}", index),
    };
    println!(
        "\n{}: {} [{}ms]\n{}",
        title.bright_yellow().bold(),
        verdict_label(res.verdict),
        res.execution_time.as_millis(),
        bold_bar,
    );

    fn print_sub_title(s: &str, cols: usize) {
        println!(
            "{}{}",
            s.cyan().bold(),
            THIN_LINE
                .repeat(cols.saturating_sub(s.len() + 1))
                .bright_black(),
        )
    }

    fn print_lines(lines: &[&str], entire_str: &str) {
        if lines.is_empty() {
            println!("{}", "<EMPTY>".magenta().dimmed());
            return;
        }
        for (i, line) in lines.iter().enumerate() {
            let trimmed = line.trim_end();
            print!("{}", trimmed);

            let num_trailing_whitespace = line.len() - trimmed.len();
            if num_trailing_whitespace > 0 {
                print!(
                    "{}{}",
                    " ".repeat(num_trailing_whitespace).on_red(),
                    "(Trailing whitespace)".bright_red().bold()
                );
            }

            let is_last_line = i + 1 == lines.len();
            if is_last_line && !entire_str.ends_with('\n') {
                print!("{}", " Missing new line ".on_yellow().black().bold());
            }

            println!();
        }
    }

    match &res.expected {
        Some(expected) => {
            let expected_lines: Vec<_> = expected.lines().collect();
            print_sub_title("[expected]", cols);
            print_lines(&expected_lines, expected);
        }
        None => print_sub_title("[expected: none]", cols),
    }

    print_sub_title("[stdout]", cols);
    print_lines(&stdout_lines, &res.output.stdout);

    if !res.output.stderr.is_empty() {
        print_sub_title("[stderr]", cols);
        print!("{}", res.output.stderr);
    }

    println!("{}", bold_bar);
}
