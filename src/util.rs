// src/util.rs

use anyhow::{Context, Result};
use std::path::Path;

/// Read a UTF-8 file into a String with a clear error message.
pub fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file {:?}", path))
}

/// Write `contents` to `path` unless something is already there.
///
/// Returns whether the file was written.
pub fn write_if_missing(path: &Path, contents: &str) -> Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    std::fs::write(path, contents).with_context(|| format!("Failed to write file {:?}", path))?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn existing_files_are_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");

        assert!(write_if_missing(&path, "first").unwrap());
        assert!(!write_if_missing(&path, "second").unwrap());
        assert_eq!(read_to_string(&path).unwrap(), "first");
    }

    #[test]
    fn missing_file_error_names_the_path() {
        let err = read_to_string(Path::new("/definitely/not/here.py")).unwrap_err();
        assert!(format!("{:#}", err).contains("here.py"));
    }
}
