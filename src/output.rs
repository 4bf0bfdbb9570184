use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OutputError {
    #[error("failed to create directory {path}: {source}")]
    CreateDir { path: String, source: io::Error },
    #[error("failed to write {path}: {source}")]
    Write { path: String, source: io::Error },
    #[error("failed to serialize snapshot: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Creates the parent directory of `path` if needed. Existing directories are fine.
pub fn ensure_parent_dir(path: &Path) -> Result<(), OutputError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|source| OutputError::CreateDir {
                path: parent.display().to_string(),
                source,
            })
        }
        _ => Ok(()),
    }
}

/// Replaces `path` with `contents`. The data goes to a sibling temp file first
/// and is renamed over the target, so readers never see a half-written file.
pub fn write_replacing(path: &Path, contents: &[u8]) -> Result<(), OutputError> {
    ensure_parent_dir(path)?;
    let tmp = temp_sibling(path);
    let write_err = |source: io::Error| OutputError::Write {
        path: path.display().to_string(),
        source,
    };

    fs::write(&tmp, contents).map_err(write_err)?;
    if let Err(err) = fs::rename(&tmp, path) {
        let _ = fs::remove_file(&tmp);
        return Err(write_err(err));
    }
    Ok(())
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_missing_directories_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("_data").join("dashboard.json");

        write_replacing(&target, b"{\"a\":1}").unwrap();
        write_replacing(&target, b"{\"a\":2}").unwrap();

        assert_eq!(fs::read_to_string(&target).unwrap(), "{\"a\":2}");
        assert!(!temp_sibling(&target).exists());
    }

    #[test]
    fn bare_file_name_needs_no_directory() {
        ensure_parent_dir(Path::new("dashboard.json")).unwrap();
    }

    #[test]
    fn parent_that_is_a_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("_data");
        fs::write(&blocker, "not a dir").unwrap();

        let err = write_replacing(&blocker.join("dashboard.json"), b"{}").unwrap_err();
        assert!(matches!(err, OutputError::CreateDir { .. }));
    }

    #[test]
    fn temp_file_sits_next_to_target() {
        let tmp = temp_sibling(Path::new("_data/dashboard.json"));
        assert_eq!(tmp, PathBuf::from("_data/dashboard.json.tmp"));
    }
}
