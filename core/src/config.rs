use std::fmt;
use std::path::{Path, PathBuf};
use std::result::Result as StdResult;
use std::time::Duration;

use anyhow::Context as _;
use rust_embed::RustEmbed;
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Config {
    #[serde(skip)]
    pub source_config_file: Option<PathBuf>,
    pub test: TestConfig,
    #[serde(default)]
    pub compile: Vec<CompileRuleConfig>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TestConfig {
    pub shell: PathBuf,
    pub time_limit_ms: u64,
    pub eval_time_limit_ms: u64,
    pub input_ext: String,
    pub output_ext: String,
    #[serde(default)]
    pub keep_artifact: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CompileRuleConfig {
    pub pattern: SourcePattern,
    pub command: String,
}

/// Glob matched against the file name (not the whole path) of a source file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub struct SourcePattern(glob::Pattern);

impl SourcePattern {
    pub fn parse(pattern: &str) -> StdResult<Self, glob::PatternError> {
        glob::Pattern::new(pattern).map(Self)
    }

    pub fn matches_source(&self, source: &Path) -> bool {
        source
            .file_name()
            .map_or(false, |name| self.0.matches(&name.to_string_lossy()))
    }
}

impl TryFrom<String> for SourcePattern {
    type Error = glob::PatternError;

    fn try_from(s: String) -> StdResult<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl fmt::Display for SourcePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0.as_str())
    }
}

#[derive(RustEmbed)]
#[folder = "assets/"]
struct Asset;

impl Config {
    pub const FILENAME: &str = "casetest.toml";

    pub fn default_toml() -> anyhow::Result<String> {
        let file = Asset::get(Self::FILENAME)
            .with_context(|| format!("Built-in {} is missing", Self::FILENAME))?;
        let s = std::str::from_utf8(file.data.as_ref())
            .with_context(|| format!("Built-in {} is not UTF-8", Self::FILENAME))?;
        Ok(s.to_owned())
    }

    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml(&Self::default_toml()?).context("Invalid built-in config")
    }

    pub fn from_toml(s: &str) -> StdResult<Self, toml::de::Error> {
        toml::from_str(s)
    }

    pub fn from_toml_file(filepath: PathBuf) -> anyhow::Result<Self> {
        let toml = fsutil::read_to_string(&filepath).context("Cannot read a file")?;
        let mut cfg = Self::from_toml(&toml)
            .with_context(|| format!("Invalid config TOML: {:?}", filepath))?;
        cfg.source_config_file = Some(filepath);
        Ok(cfg)
    }

    /// Find config file in ancestor dirs, including current dir.
    pub fn find_file_in_ancestors(cur_dir: impl AsRef<Path>) -> Option<PathBuf> {
        cur_dir
            .as_ref()
            .ancestors()
            .map(|dir| dir.join(Self::FILENAME))
            .find(|path| path.is_file())
    }

    /// The nearest `casetest.toml`, or the built-in defaults when there is none.
    pub fn load(cur_dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        match Self::find_file_in_ancestors(cur_dir) {
            Some(path) => {
                log::debug!("Using config {}", path.display());
                Self::from_toml_file(path)
            }
            None => Self::builtin(),
        }
    }
}

impl TestConfig {
    pub fn time_limit(&self) -> Duration {
        Duration::from_millis(self.time_limit_ms)
    }

    pub fn eval_time_limit(&self) -> Duration {
        Duration::from_millis(self.eval_time_limit_ms)
    }
}
