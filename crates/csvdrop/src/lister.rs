//! Discovery of eligible input files

use crate::error::{IntakeError, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Extension marking a file as loadable
pub const DATA_EXTENSION: &str = ".csv";

/// A data file found in the scanned folder
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    path: PathBuf,
    file_name: String,
}

impl InputFile {
    /// Wrap `path` if its file name carries the data extension
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let file_name = path.file_name()?.to_str()?.to_string();
        has_data_extension(&file_name).then_some(Self { path, file_name })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Full name, e.g. `orders.csv`
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Name without the data extension, e.g. `orders`
    pub fn base_name(&self) -> &str {
        &self.file_name[..self.file_name.len() - DATA_EXTENSION.len()]
    }

    /// The extension as written on disk (`.csv`, `.CSV`, ...)
    pub fn extension(&self) -> &str {
        &self.file_name[self.file_name.len() - DATA_EXTENSION.len()..]
    }
}

fn has_data_extension(file_name: &str) -> bool {
    file_name.len() > DATA_EXTENSION.len()
        && file_name.is_char_boundary(file_name.len() - DATA_EXTENSION.len())
        && file_name[file_name.len() - DATA_EXTENSION.len()..].eq_ignore_ascii_case(DATA_EXTENSION)
}

/// Lists eligible files in one folder, without recursing
#[derive(Debug, Clone, Copy, Default)]
pub struct FileLister;

impl FileLister {
    pub fn new() -> Self {
        Self
    }

    /// Eligible files in `folder`, in directory enumeration order
    ///
    /// Directories are never returned, even when their name ends in `.csv`.
    /// The folder itself must exist; an empty result is not an error.
    pub fn list(&self, folder: &Path) -> Result<Vec<InputFile>> {
        let list_err = |source: std::io::Error| IntakeError::ListFolder {
            path: folder.to_path_buf(),
            source,
        };

        let mut files = Vec::new();
        for entry in fs::read_dir(folder).map_err(list_err)? {
            let entry = entry.map_err(list_err)?;
            let path = entry.path();

            let Some(file) = InputFile::from_path(&path) else {
                debug!(path = %path.display(), "Skipping entry without data extension");
                continue;
            };

            // metadata() follows symlinks, so a link to a directory is skipped too
            match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => files.push(file),
                Ok(_) => debug!(path = %path.display(), "Skipping non-file entry"),
                Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable entry"),
            }
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use tempfile::TempDir;

    fn names(files: &[InputFile]) -> BTreeSet<String> {
        files.iter().map(|f| f.file_name().to_string()).collect()
    }

    #[test]
    fn test_input_file_parts() {
        let file = InputFile::from_path("/inbox/orders.2024.csv").unwrap();
        assert_eq!(file.file_name(), "orders.2024.csv");
        assert_eq!(file.base_name(), "orders.2024");
        assert_eq!(file.extension(), ".csv");

        let upper = InputFile::from_path("/inbox/ORDERS.CSV").unwrap();
        assert_eq!(upper.base_name(), "ORDERS");
        assert_eq!(upper.extension(), ".CSV");

        assert!(InputFile::from_path("/inbox/orders.csv.tmp").is_none());
        assert!(InputFile::from_path("/inbox/.csv").is_none());
        assert!(InputFile::from_path("/inbox/notes.txt").is_none());
    }

    #[test]
    fn test_list_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        for name in ["a.csv", "b.CSV", "c.txt", "d.csv.partial"] {
            fs::write(dir.path().join(name), "name,email,something\n").unwrap();
        }

        let files = FileLister::new().list(dir.path()).unwrap();
        assert_eq!(names(&files), BTreeSet::from(["a.csv".to_string(), "b.CSV".to_string()]));
    }

    #[test]
    fn test_list_includes_dot_prefixed_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".orders.csv"), "name,email,something\n").unwrap();

        let files = FileLister::new().list(dir.path()).unwrap();
        assert_eq!(names(&files), BTreeSet::from([".orders.csv".to_string()]));
        assert_eq!(files[0].base_name(), ".orders");
    }

    #[test]
    fn test_list_skips_directories_named_like_data() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("nested.csv")).unwrap();
        fs::create_dir(dir.path().join("done")).unwrap();
        fs::write(dir.path().join("done").join("old.done.csv"), "x").unwrap();
        fs::write(dir.path().join("real.csv"), "x").unwrap();

        let files = FileLister::new().list(dir.path()).unwrap();
        assert_eq!(names(&files), BTreeSet::from(["real.csv".to_string()]));
    }

    #[test]
    fn test_list_empty_folder() {
        let dir = TempDir::new().unwrap();
        assert!(FileLister::new().list(dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_list_missing_folder_is_error() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("gone");
        let err = FileLister::new().list(&missing).unwrap_err();
        assert!(matches!(err, IntakeError::ListFolder { .. }));
    }
}
