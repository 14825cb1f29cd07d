//! Find every directory under a root that carries a release record.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, instrument, warn};
use walkdir::WalkDir;

use crate::record::{RecordError, RecordResult};

/// Directories under `root` (including `root`) that contain `file_name`.
///
/// `.git` directories are not entered. Unreadable entries and non-UTF-8
/// paths are skipped with a warning. The result is sorted.
#[instrument]
pub fn find_release_dirs(root: &Utf8Path, file_name: &str) -> RecordResult<Vec<Utf8PathBuf>> {
    if !root.is_dir() {
        return Err(RecordError::NotADirectory(root.to_path_buf()));
    }

    let mut dirs: Vec<Utf8PathBuf> = WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git")
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_dir())
        .filter_map(|entry| match Utf8PathBuf::from_path_buf(entry.into_path()) {
            Ok(path) => Some(path),
            Err(path) => {
                warn!(path = %path.display(), "skipping non UTF-8 path");
                None
            }
        })
        .filter(|dir| dir.join(file_name).is_file())
        .collect();

    dirs.sort();
    debug!(count = dirs.len(), "release directories found");
    Ok(dirs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::DEFAULT_FILE_NAME;
    use std::fs;
    use tempfile::TempDir;

    fn touch_record(dir: &Utf8Path) {
        fs::create_dir_all(dir).unwrap();
        fs::write(dir.join(DEFAULT_FILE_NAME), "release=0.1.0\ntag=x-0.1.0\n").unwrap();
    }

    #[test]
    fn finds_nested_directories_sorted() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        touch_record(&root.join("zeta"));
        touch_record(&root.join("alpha/inner"));
        fs::create_dir_all(root.join("plain")).unwrap();

        let dirs = find_release_dirs(&root, DEFAULT_FILE_NAME).unwrap();
        assert_eq!(dirs, vec![root.join("alpha/inner"), root.join("zeta")]);
    }

    #[test]
    fn includes_root_itself() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        touch_record(&root);

        assert_eq!(find_release_dirs(&root, DEFAULT_FILE_NAME).unwrap(), vec![root]);
    }

    #[test]
    fn skips_git_directory() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        touch_record(&root.join(".git/modules/x"));

        assert!(find_release_dirs(&root, DEFAULT_FILE_NAME).unwrap().is_empty());
    }

    #[test]
    fn honours_custom_file_name() {
        let tmp = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        touch_record(&root.join("a"));
        fs::write(root.join("a/RELEASE"), "").unwrap();
        fs::create_dir_all(root.join("b")).unwrap();
        fs::write(root.join("b/RELEASE"), "").unwrap();

        let dirs = find_release_dirs(&root, "RELEASE").unwrap();
        assert_eq!(dirs, vec![root.join("a"), root.join("b")]);
    }

    #[test]
    fn root_must_be_directory() {
        let err = find_release_dirs(Utf8Path::new("/nonexistent/reltag"), DEFAULT_FILE_NAME)
            .unwrap_err();
        assert!(matches!(err, RecordError::NotADirectory(_)));
    }
}
