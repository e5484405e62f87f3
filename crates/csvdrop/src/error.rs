//! Error types for csvdrop
//!
//! Two families with different severities:
//!
//! - [`IntakeError`] stops the batch. Startup errors are raised before any
//!   side effect; archive errors are raised as soon as a file's location can
//!   no longer be trusted.
//! - [`LoadError`] is local to one file. The loader folds it into a
//!   `LoadOutcome::Failure` and the file is archived under `error/`.

use csvdrop_common::EnvError;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for batch operations
pub type Result<T> = std::result::Result<T, IntakeError>;

/// Errors that abort the batch
#[derive(Error, Debug)]
pub enum IntakeError {
    /// Folder argument points nowhere
    #[error("Folder path {} does not exist", .0.display())]
    FolderNotFound(PathBuf),

    /// Folder argument points at something other than a directory
    #[error("Folder path {} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Configuration is missing or invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading the scanned folder failed
    #[error("Failed to list folder {}: {source}", .path.display())]
    ListFolder {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The done/error folder could not be created
    #[error("Failed to create archive folder {}: {source}", .path.display())]
    CreateArchiveDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Moving a processed file into its archive folder failed
    #[error("Failed to move {} to {}: {source}", .from.display(), .to.display())]
    MoveFile {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Connecting to the storage backend failed
    #[error("Database error: {0}. Check the CSVDROP_DB_* or DATABASE_URL settings.")]
    Database(#[from] sqlx::Error),
}

impl IntakeError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Whether the error happened before anything was touched
    ///
    /// Startup errors map to the precondition exit code; everything else is
    /// a runtime failure.
    pub fn is_startup(&self) -> bool {
        matches!(
            self,
            Self::FolderNotFound(_) | Self::NotADirectory(_) | Self::Config(_)
        )
    }
}

impl From<EnvError> for IntakeError {
    fn from(err: EnvError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Errors that fail a single file's load
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error("loader is shut down")]
    Closed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_startup_classification() {
        assert!(IntakeError::FolderNotFound(PathBuf::from("/nope")).is_startup());
        assert!(IntakeError::config("bad table").is_startup());

        let move_err = IntakeError::MoveFile {
            from: PathBuf::from("/in/a.csv"),
            to: PathBuf::from("/in/done/a.done.csv"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(!move_err.is_startup());
    }

    #[test]
    fn test_folder_not_found_names_path() {
        let err = IntakeError::FolderNotFound(PathBuf::from("/srv/inbox"));
        assert_eq!(err.to_string(), "Folder path /srv/inbox does not exist");
    }

    #[test]
    fn test_env_error_becomes_config() {
        let err: IntakeError = EnvError::new("CSVDROP_DB_PORT", "abc", "invalid digit").into();
        assert!(matches!(err, IntakeError::Config(_)));
        assert!(err.to_string().contains("CSVDROP_DB_PORT"));
    }
}
