use std::{
    collections::HashMap,
    ffi::OsStr,
    io,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::process::Command;

use crate::{
    config::{CompileRuleConfig, Config, SourcePattern},
    context::Artifact,
    str_interp::{interp, InterpError},
};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("No source file given")]
    NoSource,

    #[error("Unsupported source file '{}': only C or C++ source code (or an executable) is accepted", .0.display())]
    Unsupported(PathBuf),

    #[error("Invalid compile command: {0}")]
    Template(#[from] InterpError),

    #[error("Failed to spawn '{shell} -c {cmd}': {source}")]
    Spawn {
        shell: String,
        cmd: String,
        #[source]
        source: io::Error,
    },

    #[error("Couldn't compile the program")]
    NoArtifact { diagnostics: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileRule {
    pub pattern: SourcePattern,
    pub command: String,
}

impl From<&CompileRuleConfig> for CompileRule {
    fn from(c: &CompileRuleConfig) -> Self {
        Self {
            pattern: c.pattern.clone(),
            command: c.command.clone(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Compilation {
    pub artifact: Artifact,
    /// Everything the compiler printed (stdout and stderr).
    pub diagnostics: String,
}

#[derive(Debug, Clone)]
pub struct Compiler {
    shell: PathBuf,
    rules: Vec<CompileRule>,
    keep_artifact: bool,
}

impl Compiler {
    pub fn new(shell: impl Into<PathBuf>, rules: Vec<CompileRule>) -> Self {
        Self {
            shell: shell.into(),
            rules,
            keep_artifact: false,
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.test.shell.to_owned(),
            cfg.compile.iter().map(Into::into).collect(),
        )
    }

    pub fn keep_artifact(mut self, keep: bool) -> Self {
        self.keep_artifact = keep;
        self
    }

    fn find_rule(&self, source: &Path) -> Option<&CompileRule> {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches_source(source))
    }

    /// Where the executable for `sources` is written: `out_dir/<stem of first source>`.
    pub fn artifact_path(sources: &[PathBuf], out_dir: &Path) -> Option<PathBuf> {
        let stem = sources.first()?.file_stem()?;
        Some(out_dir.join(stem))
    }

    /// Builds the shell command line for `sources`, or `None` if no rule applies.
    pub fn command_for(
        &self,
        sources: &[PathBuf],
        out_path: &Path,
    ) -> Result<Option<String>, CompileError> {
        let first = sources.first().ok_or(CompileError::NoSource)?;
        let Some(rule) = self.find_rule(first) else {
            return Ok(None);
        };

        let quoted = sources
            .iter()
            .map(|p| shell_quote(&p.to_string_lossy()))
            .collect::<Vec<_>>()
            .join(" ");
        let out_quoted = shell_quote(&out_path.to_string_lossy());
        let first_quoted = shell_quote(&first.to_string_lossy());

        let mut vars: HashMap<&'static str, &OsStr> = HashMap::new();
        vars.insert("sources", OsStr::new(&quoted));
        vars.insert("outPath", OsStr::new(&out_quoted));
        vars.insert("filePath", OsStr::new(&first_quoted));
        vars.insert(
            "fileStem",
            first
                .file_stem()
                .unwrap_or(OsStr::new("UNDEFINED_FILE_STEM")),
        );
        vars.insert(
            "fileDir",
            first.parent().unwrap_or(Path::new(".")).as_os_str(),
        );
        Ok(Some(interp(&rule.command, &vars)?))
    }

    /// Compiles (and links) `sources` into `out_dir`.
    ///
    /// A single source without a matching rule is accepted as-is if it is executable;
    /// such an artifact is never deleted afterwards.
    pub async fn compile(
        &self,
        sources: &[PathBuf],
        out_dir: &Path,
    ) -> Result<Compilation, CompileError> {
        let first = sources.first().ok_or(CompileError::NoSource)?;
        let out_path = Self::artifact_path(sources, out_dir)
            .ok_or_else(|| CompileError::Unsupported(first.to_owned()))?;

        let Some(cmd) = self.command_for(sources, &out_path)? else {
            if sources.len() == 1 && fsutil::is_executable(first) {
                log::info!("{} is already executable", first.display());
                return Ok(Compilation {
                    artifact: Artifact::prebuilt(first),
                    diagnostics: String::new(),
                });
            }
            return Err(CompileError::Unsupported(first.to_owned()));
        };

        // A stale binary from an earlier run must not pass for a successful build.
        if let Err(e) = fsutil::remove_file(&out_path) {
            if e.io_kind() != io::ErrorKind::NotFound {
                log::warn!("{}", e);
            }
        }

        log::info!("Compiling {}", first.display());
        log::info!("{}", cmd);

        let output = Command::new(&self.shell)
            .args(["-c", &cmd])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|source| CompileError::Spawn {
                shell: self.shell.to_string_lossy().into_owned(),
                cmd: cmd.clone(),
                source,
            })?;

        let mut diagnostics = String::from_utf8_lossy(&output.stdout).into_owned();
        diagnostics += &String::from_utf8_lossy(&output.stderr);

        if !out_path.is_file() {
            return Err(CompileError::NoArtifact { diagnostics });
        }
        Ok(Compilation {
            artifact: Artifact::compiled(out_path, self.keep_artifact),
            diagnostics,
        })
    }
}

/// Single-quotes `s` for POSIX shells.
pub fn shell_quote(s: &str) -> String {
    // terminate '  ->  enclose ' with "  ->  restart '
    format!("'{}'", s.replace('\'', r#"'"'"'"#))
}
