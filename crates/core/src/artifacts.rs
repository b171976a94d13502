//! Artifact directory layout and hardened filesystem access.
//!
//! Every job gets its own output directory under a shared root. Names coming
//! from clients (downloads) or from the engine (artifact writes) are checked
//! with [`validate_relative_path`] before they are joined onto that
//! directory, so nothing outside it can be read or written.
//!
//! Reads only ever serve regular files that sit directly inside the job
//! directory. Symlinks are not followed: a symlink is reported as not
//! found, the same way [`list_files`] leaves it out of the listing.

use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf};

use crate::job::JobId;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Default parent directory of all per-job output directories.
pub const DEFAULT_OUTPUT_ROOT: &str = "generated_project";

/// Maximum number of path components accepted in an artifact name.
pub const MAX_PATH_DEPTH: usize = 16;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why an artifact could not be served or written.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    /// The name would resolve outside the job directory, or is malformed.
    #[error("Invalid file path: {0}")]
    InvalidPath(String),

    /// No regular file with that name sits directly in the job directory.
    #[error("File not found")]
    NotFound,

    /// The file exists but is not UTF-8 text.
    #[error("File is not valid UTF-8 text")]
    NotText,

    #[error("Filesystem error: {0}")]
    Io(#[from] io::Error),
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Output directory for one job: `<root>/<job id>`.
pub fn job_output_dir(root: &Path, id: &JobId) -> PathBuf {
    root.join(id.as_str())
}

// ---------------------------------------------------------------------------
// Path validation
// ---------------------------------------------------------------------------

/// Validate an untrusted relative path and return it as a [`PathBuf`].
///
/// Rules:
/// 1. Non-empty, no NUL bytes, no backslashes.
/// 2. Not absolute (no root or prefix component).
/// 3. No `.`, `..` or empty segments.
/// 4. At most [`MAX_PATH_DEPTH`] segments.
pub fn validate_relative_path(name: &str) -> Result<PathBuf, ArtifactError> {
    if name.is_empty() {
        return Err(ArtifactError::InvalidPath("path is empty".into()));
    }
    if name.contains('\0') {
        return Err(ArtifactError::InvalidPath("path contains NUL bytes".into()));
    }
    if name.contains('\\') {
        return Err(ArtifactError::InvalidPath(
            "path contains backslashes".into(),
        ));
    }
    if name.starts_with('/') {
        return Err(ArtifactError::InvalidPath(
            "absolute paths are not allowed".into(),
        ));
    }
    if name.split('/').any(|segment| segment == "." || segment == "..") {
        return Err(ArtifactError::InvalidPath(
            "path traversal is not allowed".into(),
        ));
    }
    if name.split('/').any(str::is_empty) {
        return Err(ArtifactError::InvalidPath(
            "path contains empty segments".into(),
        ));
    }

    let path = Path::new(name);
    let mut depth = 0;
    for component in path.components() {
        match component {
            Component::Normal(_) => depth += 1,
            _ => {
                return Err(ArtifactError::InvalidPath(
                    "path must be relative and normalized".into(),
                ))
            }
        }
    }
    if depth == 0 {
        return Err(ArtifactError::InvalidPath("path is empty".into()));
    }
    if depth > MAX_PATH_DEPTH {
        return Err(ArtifactError::InvalidPath(format!(
            "path exceeds maximum depth of {MAX_PATH_DEPTH}"
        )));
    }

    Ok(path.to_path_buf())
}

// ---------------------------------------------------------------------------
// Listing
// ---------------------------------------------------------------------------

/// Names of the regular files directly inside `dir`, sorted.
///
/// A missing directory yields an empty list. Subdirectories, symlinks and
/// entries whose names are not UTF-8 are skipped.
pub fn list_files(dir: &Path) -> Result<Vec<String>, ArtifactError> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        match entry.file_name().into_string() {
            Ok(name) => files.push(name),
            Err(raw) => {
                tracing::debug!(dir = %dir.display(), name = ?raw, "Skipping artifact with non-UTF-8 name");
            }
        }
    }
    files.sort();
    Ok(files)
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Read one artifact from `dir` as UTF-8 text.
///
/// Escaping names fail with [`ArtifactError::InvalidPath`] before the
/// filesystem is touched. Nested names, missing entries, symlinks and
/// anything that is not a regular file fail with [`ArtifactError::NotFound`].
pub fn read_text(dir: &Path, name: &str) -> Result<String, ArtifactError> {
    let relative = validate_relative_path(name)?;
    if relative.components().count() != 1 {
        return Err(ArtifactError::NotFound);
    }

    let path = dir.join(relative);
    let mut file = match open_no_follow(&path) {
        Ok(file) => file,
        Err(e) if is_missing_or_link(&e) => return Err(ArtifactError::NotFound),
        Err(e) => return Err(e.into()),
    };
    if !file.metadata()?.file_type().is_file() {
        return Err(ArtifactError::NotFound);
    }

    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    String::from_utf8(bytes).map_err(|_| ArtifactError::NotText)
}

/// Open `path` for reading without following a final symlink.
///
/// `O_NONBLOCK` keeps a FIFO planted in the directory from stalling the
/// open; the type check on the handle rejects it afterwards.
#[cfg(unix)]
fn open_no_follow(path: &Path) -> io::Result<File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .read(true)
        .custom_flags(libc::O_NOFOLLOW | libc::O_NONBLOCK)
        .open(path)
}

#[cfg(not(unix))]
fn open_no_follow(path: &Path) -> io::Result<File> {
    if fs::symlink_metadata(path)?.file_type().is_symlink() {
        return Err(io::Error::new(io::ErrorKind::NotFound, "symlink"));
    }
    File::open(path)
}

/// `ELOOP` is what `O_NOFOLLOW` reports for a symlink.
fn is_missing_or_link(e: &io::Error) -> bool {
    #[cfg(unix)]
    {
        if e.raw_os_error() == Some(libc::ELOOP) {
            return true;
        }
    }
    e.kind() == io::ErrorKind::NotFound
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

/// Write artifacts into `dir`, creating it and any nested directories.
///
/// Every path is validated before anything is written, so a single bad
/// name leaves the directory untouched. `dir` is created even when
/// `artifacts` is empty.
pub fn write_artifacts<'a, I>(dir: &Path, artifacts: I) -> Result<usize, ArtifactError>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let planned = artifacts
        .into_iter()
        .map(|(name, content)| validate_relative_path(name).map(|path| (path, content)))
        .collect::<Result<Vec<_>, _>>()?;

    fs::create_dir_all(dir)?;
    for (relative, content) in &planned {
        let path = dir.join(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, content)?;
    }
    Ok(planned.len())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
