use std::{
    io,
    path::{Path, PathBuf},
};

use anyhow::Context as _;
use async_trait::async_trait;

use crate::natord;

#[async_trait]
pub trait AsyncTestcase {
    fn name(&self) -> &str;

    /// On-disk location of the input, if any.
    fn input_path(&self) -> Option<&Path> {
        None
    }

    async fn read_input(&self) -> anyhow::Result<Vec<u8>>;

    /// `Ok(None)` when the case has no expected output.
    async fn read_expected(&self) -> anyhow::Result<Option<Vec<u8>>>;
}

/// Input and expected-output file extensions, always starting with a dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaseLayout {
    input_ext: String,
    output_ext: String,
}

impl Default for CaseLayout {
    fn default() -> Self {
        Self::new(".in", ".out")
    }
}

impl CaseLayout {
    pub fn new(input_ext: &str, output_ext: &str) -> Self {
        Self {
            input_ext: Self::dotted(input_ext),
            output_ext: Self::dotted(output_ext),
        }
    }

    fn dotted(ext: &str) -> String {
        let ext = ext.trim();
        if ext.starts_with('.') {
            ext.to_owned()
        } else {
            format!(".{}", ext)
        }
    }

    pub fn input_ext(&self) -> &str {
        &self.input_ext
    }

    pub fn output_ext(&self) -> &str {
        &self.output_ext
    }

    /// `dir/case1.in` => `dir/case1.out`
    pub fn expected_path_for(&self, input: &Path) -> PathBuf {
        input.with_extension(self.output_ext.trim_start_matches('.'))
    }

    pub fn testcase_for(&self, input: impl Into<PathBuf>) -> FsTestcase {
        let input = input.into();
        let expected = self.expected_path_for(&input);
        FsTestcase::new(input.to_string_lossy().into_owned(), input, expected)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FsTestcase {
    name: String,
    input_data_path: PathBuf,
    expected_data_path: PathBuf,
}

impl FsTestcase {
    pub fn new(
        name: impl Into<String>,
        input: impl Into<PathBuf>,
        expected: impl Into<PathBuf>,
    ) -> Self {
        Self {
            name: name.into(),
            input_data_path: input.into(),
            expected_data_path: expected.into(),
        }
    }

    pub fn expected_data_path(&self) -> &Path {
        &self.expected_data_path
    }

    /// All cases below `dir` (recursively), in natural order of their input path.
    pub fn enumerate(dir: impl AsRef<Path>, layout: &CaseLayout) -> fsutil::Result<Vec<Self>> {
        let mut inputs = fsutil::find_files_with_extension(&dir, layout.input_ext())?;
        inputs.sort_by(|a, b| natord::compare_paths(a, b));
        Ok(inputs
            .into_iter()
            .map(|path| layout.testcase_for(path))
            .collect())
    }
}

#[async_trait]
impl AsyncTestcase for FsTestcase {
    fn name(&self) -> &str {
        &self.name
    }

    fn input_path(&self) -> Option<&Path> {
        Some(&self.input_data_path)
    }

    async fn read_input(&self) -> anyhow::Result<Vec<u8>> {
        tokio::fs::read(&self.input_data_path)
            .await
            .with_context(|| {
                format!(
                    "Failed to read testcase {}",
                    self.input_data_path.to_string_lossy(),
                )
            })
    }

    async fn read_expected(&self) -> anyhow::Result<Option<Vec<u8>>> {
        match tokio::fs::read(&self.expected_data_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| {
                format!(
                    "Failed to read expected output {}",
                    self.expected_data_path.to_string_lossy(),
                )
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OnMemoryTestcase<B: AsRef<[u8]>> {
    pub name: String,
    pub input: B,
    pub expected: Option<B>,
}

impl<B> OnMemoryTestcase<B>
where
    B: AsRef<[u8]>,
{
    pub fn new(name: impl Into<String>, input: impl Into<B>, expected: impl Into<B>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            expected: Some(expected.into()),
        }
    }

    pub fn without_expected(name: impl Into<String>, input: impl Into<B>) -> Self {
        Self {
            name: name.into(),
            input: input.into(),
            expected: None,
        }
    }
}

#[async_trait]
impl<B> AsyncTestcase for OnMemoryTestcase<B>
where
    B: AsRef<[u8]> + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    async fn read_input(&self) -> anyhow::Result<Vec<u8>> {
        Ok(self.input.as_ref().to_vec())
    }

    async fn read_expected(&self) -> anyhow::Result<Option<Vec<u8>>> {
        Ok(self.expected.as_ref().map(|b| b.as_ref().to_vec()))
    }
}
