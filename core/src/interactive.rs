use std::{io, path::PathBuf};

use dialoguer::{theme::ColorfulTheme, Input};

fn theme() -> ColorfulTheme {
    ColorfulTheme::default()
}

pub fn ask_text(prompt: &str) -> io::Result<String> {
    Input::with_theme(&theme())
        .with_prompt(prompt)
        .interact_text()
        .map(|s: String| s.trim().to_owned())
}

/// Asks for one or more whitespace-separated paths.
pub fn ask_paths(prompt: &str) -> io::Result<Vec<PathBuf>> {
    let answer = ask_text(prompt)?;
    Ok(answer.split_whitespace().map(PathBuf::from).collect())
}

pub fn ask_path(prompt: &str) -> io::Result<PathBuf> {
    ask_text(prompt).map(PathBuf::from)
}
