use std::{
    ffi::OsStr,
    fs::{self, ReadDir},
    path::{Path, PathBuf},
};

pub mod error {
    use std::{io, path::PathBuf};

    pub type Result<T> = std::result::Result<T, self::Error>;

    type Msg = &'static str;

    #[derive(Debug, thiserror::Error)]
    pub enum Error {
        #[error("{0} ({1}): {2}")]
        SingleIO(Msg, PathBuf, #[source] io::Error),

        #[error("Failed to canonicalize path '{0}': {1}")]
        CanonicalizePath(PathBuf, #[source] io::Error),
    }

    impl Error {
        pub fn io_kind(&self) -> io::ErrorKind {
            match self {
                Self::SingleIO(_, _, e) | Self::CanonicalizePath(_, e) => e.kind(),
            }
        }
    }
}
pub use error::{Error, Result};

pub fn mkdir_all(path: impl AsRef<Path>) -> Result<()> {
    let dir = path.as_ref();
    fs::create_dir_all(dir).map_err(|e| Error::SingleIO("Cannot create dir", dir.to_owned(), e))
}

pub fn write<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    fs::write(&filepath, contents)
        .map_err(|e| Error::SingleIO("Cannot write file", filepath.as_ref().to_owned(), e))
}

/// Like [`write`], creating missing parent directories first.
pub fn write_with_mkdir<P, C>(filepath: P, contents: C) -> Result<()>
where
    P: AsRef<Path>,
    C: AsRef<[u8]>,
{
    match filepath.as_ref().parent() {
        Some(dir) if !dir.as_os_str().is_empty() => self::mkdir_all(dir)?,
        _ => {}
    }
    self::write(filepath, contents)
}

pub fn read_to_string(filepath: impl AsRef<Path>) -> Result<String> {
    fs::read_to_string(&filepath)
        .map_err(|e| Error::SingleIO("Cannot read file", filepath.as_ref().to_owned(), e))
}

pub fn remove_file(filepath: impl AsRef<Path>) -> Result<()> {
    fs::remove_file(&filepath)
        .map_err(|e| Error::SingleIO("Cannot remove file", filepath.as_ref().to_owned(), e))
}

pub fn read_dir(dir: impl AsRef<Path>) -> Result<ReadDir> {
    fs::read_dir(&dir).map_err(|e| Error::SingleIO("Cannot read dir", dir.as_ref().to_owned(), e))
}

pub fn canonicalize_path(path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    path.canonicalize()
        .map_err(|e| Error::CanonicalizePath(path.to_owned(), e))
}

/// Returns true if `path` is a regular file with any execute bit set.
#[cfg(unix)]
pub fn is_executable(path: impl AsRef<Path>) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
pub fn is_executable(path: impl AsRef<Path>) -> bool {
    path.as_ref().extension() == Some(OsStr::new("exe"))
}

/// Recursively collects regular files under `dir` whose extension equals `ext`.
/// `ext` may be given with or without the leading dot.
/// Unreadable subdirectories are skipped; only failure to read `dir` itself is an error.
///
/// ```
/// let dir = tempfile::tempdir().unwrap();
/// std::fs::create_dir(dir.path().join("sub")).unwrap();
/// std::fs::write(dir.path().join("1.in"), "").unwrap();
/// std::fs::write(dir.path().join("sub/2.in"), "").unwrap();
/// std::fs::write(dir.path().join("1.out"), "").unwrap();
///
/// let mut found = fsutil::find_files_with_extension(dir.path(), ".in").unwrap();
/// found.sort();
/// assert_eq!(found, vec![dir.path().join("1.in"), dir.path().join("sub/2.in")]);
/// ```
pub fn find_files_with_extension(dir: impl AsRef<Path>, ext: &str) -> Result<Vec<PathBuf>> {
    let ext = OsStr::new(ext.trim_start_matches('.'));
    let mut res = Vec::new();
    let mut stack = vec![dir.as_ref().to_owned()];
    let mut is_root = true;

    while let Some(dir) = stack.pop() {
        let entries = match self::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if is_root => return Err(e),
            Err(_) => continue,
        };
        is_root = false;

        for entry in entries.filter_map(std::result::Result::ok) {
            let Ok(ft) = entry.file_type() else {
                continue
            };
            let path = entry.path();
            if ft.is_dir() {
                stack.push(path);
            } else if path.extension() == Some(ext) {
                res.push(path);
            }
        }
    }
    Ok(res)
}
