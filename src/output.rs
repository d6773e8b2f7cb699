use crate::error::ExtractError;
use std::path::{Path, PathBuf};

/// Write `text` verbatim to `dir/file_name`, creating `dir` if needed.
///
/// Existing files are overwritten and the write is not atomic: a crash
/// mid-write can leave a truncated file behind.
pub fn save_text(dir: &Path, text: &str, file_name: &str) -> Result<PathBuf, ExtractError> {
    std::fs::create_dir_all(dir).map_err(|e| ExtractError::OutputWrite {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let path = dir.join(file_name);
    std::fs::write(&path, text.as_bytes()).map_err(|e| ExtractError::OutputWrite {
        path: path.clone(),
        source: e,
    })?;

    tracing::info!("Saved {} bytes to {:?}", text.len(), path);
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_round_trips_multiline_text() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("output");
        let text = "[Embedded text extracted from PDF]\n\n\n[Text extracted from images]\nlínea uno\r\nline two\n";

        let path = save_text(&dir, text, "report.txt").unwrap();

        assert_eq!(path, dir.join("report.txt"));
        assert_eq!(std::fs::read(&path).unwrap(), text.as_bytes());
    }

    #[test]
    fn test_save_overwrites_existing_file() {
        let tmp = tempfile::tempdir().unwrap();

        save_text(tmp.path(), "first version, longer", "out.txt").unwrap();
        let path = save_text(tmp.path(), "second", "out.txt").unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap(), "second");
    }

    #[test]
    fn test_save_into_file_path_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();

        let result = save_text(&blocker, "text", "report.txt");
        assert!(matches!(result, Err(ExtractError::OutputWrite { .. })));
    }
}
