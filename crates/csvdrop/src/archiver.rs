//! Relocation of processed files into `done/` or `error/`
//!
//! Every move is a same-filesystem rename, so a file is either still at its
//! original path or at its archive path, never both and never neither. Any
//! failure here is returned as a fatal [`IntakeError`]: continuing with a file
//! whose location is unknown risks loading it twice on the next run.

use crate::error::{IntakeError, Result};
use crate::lister::{InputFile, DATA_EXTENSION};
use crate::loader::LoadOutcome;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Which archive folder a file goes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveDestination {
    Done,
    Error,
}

impl ArchiveDestination {
    pub fn for_outcome(outcome: &LoadOutcome) -> Self {
        if outcome.is_success() {
            ArchiveDestination::Done
        } else {
            ArchiveDestination::Error
        }
    }

    /// Subfolder name relative to the scanned folder
    pub fn dir_name(self) -> &'static str {
        match self {
            ArchiveDestination::Done => "done",
            ArchiveDestination::Error => "error",
        }
    }

    /// Marker inserted before the extension, `a.csv` -> `a.done.csv`
    fn suffix(self) -> &'static str {
        self.dir_name()
    }
}

/// Where an archived file ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePath {
    pub destination: ArchiveDestination,
    pub path: PathBuf,
}

/// Moves files out of the scanned folder once their outcome is known
#[derive(Debug, Clone)]
pub struct OutcomeArchiver {
    root: PathBuf,
}

impl OutcomeArchiver {
    /// `root` is the scanned folder; archive folders are created beneath it on demand
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn destination_dir(&self, destination: ArchiveDestination) -> PathBuf {
        self.root.join(destination.dir_name())
    }

    /// Move `file` into the folder matching `outcome`
    pub fn archive(&self, file: &InputFile, outcome: &LoadOutcome) -> Result<ArchivePath> {
        let destination = ArchiveDestination::for_outcome(outcome);
        let dir = self.destination_dir(destination);

        ensure_dir(&dir)?;

        let target = free_target(&dir, file, destination);
        fs::rename(file.path(), &target).map_err(|source| IntakeError::MoveFile {
            from: file.path().to_path_buf(),
            to: target.clone(),
            source,
        })?;

        debug!(
            from = %file.path().display(),
            to = %target.display(),
            "Archived file"
        );

        Ok(ArchivePath {
            destination,
            path: target,
        })
    }
}

/// Create `dir` unless it already exists
///
/// Concurrent creation by another process counts as success.
fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }

    match fs::create_dir(dir) {
        Ok(()) => {
            debug!(dir = %dir.display(), "Created archive folder");
            Ok(())
        },
        Err(e) if e.kind() == ErrorKind::AlreadyExists && dir.is_dir() => Ok(()),
        Err(source) => Err(IntakeError::CreateArchiveDir {
            path: dir.to_path_buf(),
            source,
        }),
    }
}

/// `<base>.<suffix>.csv`, or `<base>.<n>.<suffix>.csv` if that is taken
///
/// rename(2) replaces an existing target silently, which would destroy an
/// earlier archive of a file with the same name.
fn free_target(dir: &Path, file: &InputFile, destination: ArchiveDestination) -> PathBuf {
    let base = file.base_name();
    let suffix = destination.suffix();

    let first = dir.join(format!("{}.{}{}", base, suffix, DATA_EXTENSION));
    if !first.exists() {
        return first;
    }

    (1u64..)
        .map(|n| dir.join(format!("{}.{}.{}{}", base, n, suffix, DATA_EXTENSION)))
        .find(|candidate| !candidate.exists())
        .unwrap_or(first)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn drop_file(dir: &Path, name: &str) -> InputFile {
        let path = dir.join(name);
        fs::write(&path, "name,email,something\nada,ada@example.com,x\n").unwrap();
        InputFile::from_path(path).unwrap()
    }

    fn failure() -> LoadOutcome {
        LoadOutcome::Failure {
            reason: "duplicate key value violates unique constraint".to_string(),
        }
    }

    #[test]
    fn test_success_goes_to_done() {
        let dir = TempDir::new().unwrap();
        let file = drop_file(dir.path(), "a.csv");
        let archiver = OutcomeArchiver::new(dir.path());

        let archived = archiver.archive(&file, &LoadOutcome::Success { rows: 1 }).unwrap();

        assert_eq!(archived.destination, ArchiveDestination::Done);
        assert_eq!(archived.path, dir.path().join("done").join("a.done.csv"));
        assert!(archived.path.is_file());
        assert!(!file.path().exists());
        assert!(!dir.path().join("error").exists());
    }

    #[test]
    fn test_failure_goes_to_error() {
        let dir = TempDir::new().unwrap();
        let file = drop_file(dir.path(), "b.csv");
        let archiver = OutcomeArchiver::new(dir.path());

        let archived = archiver.archive(&file, &failure()).unwrap();

        assert_eq!(archived.destination, ArchiveDestination::Error);
        assert_eq!(archived.path, dir.path().join("error").join("b.error.csv"));
        assert!(!file.path().exists());
        assert!(!dir.path().join("done").exists());
    }

    #[test]
    fn test_existing_archive_dir_is_reused() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("done")).unwrap();
        let archiver = OutcomeArchiver::new(dir.path());

        for name in ["x.csv", "y.csv"] {
            let file = drop_file(dir.path(), name);
            archiver.archive(&file, &LoadOutcome::Success { rows: 1 }).unwrap();
        }

        assert!(dir.path().join("done/x.done.csv").is_file());
        assert!(dir.path().join("done/y.done.csv").is_file());
    }

    #[test]
    fn test_name_collision_never_overwrites() {
        let dir = TempDir::new().unwrap();
        let archiver = OutcomeArchiver::new(dir.path());

        let first = drop_file(dir.path(), "daily.csv");
        archiver.archive(&first, &LoadOutcome::Success { rows: 1 }).unwrap();
        fs::write(dir.path().join("done/daily.done.csv"), "first run").unwrap();

        let second = drop_file(dir.path(), "daily.csv");
        let archived = archiver.archive(&second, &LoadOutcome::Success { rows: 1 }).unwrap();

        assert_eq!(archived.path, dir.path().join("done/daily.1.done.csv"));
        assert_eq!(
            fs::read_to_string(dir.path().join("done/daily.done.csv")).unwrap(),
            "first run"
        );
    }

    #[test]
    fn test_uppercase_extension_is_normalised() {
        let dir = TempDir::new().unwrap();
        let file = drop_file(dir.path(), "REPORT.CSV");
        let archived = OutcomeArchiver::new(dir.path()).archive(&file, &failure()).unwrap();
        assert_eq!(archived.path, dir.path().join("error/REPORT.error.csv"));
    }

    #[test]
    fn test_blocked_archive_dir_is_fatal_and_leaves_file() {
        let dir = TempDir::new().unwrap();
        // a regular file where the folder should be
        fs::write(dir.path().join("done"), "not a folder").unwrap();
        let file = drop_file(dir.path(), "a.csv");

        let err = OutcomeArchiver::new(dir.path())
            .archive(&file, &LoadOutcome::Success { rows: 1 })
            .unwrap_err();

        assert!(matches!(err, IntakeError::CreateArchiveDir { .. }));
        assert!(file.path().is_file());
    }

    #[test]
    fn test_vanished_source_is_fatal() {
        let dir = TempDir::new().unwrap();
        let file = drop_file(dir.path(), "a.csv");
        fs::remove_file(file.path()).unwrap();

        let err = OutcomeArchiver::new(dir.path())
            .archive(&file, &LoadOutcome::Success { rows: 1 })
            .unwrap_err();

        assert!(matches!(err, IntakeError::MoveFile { .. }));
    }
}
