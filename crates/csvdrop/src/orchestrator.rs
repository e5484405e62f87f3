//! One pass over the intake folder
//!
//! Loads for every discovered file are dispatched without waiting on each
//! other; results are archived in completion order. The folder is re-listed
//! after every archive, but the batch only decides it is finished once no load
//! is still in flight, so a fast empty listing can never cut off a slower load.

use crate::archiver::OutcomeArchiver;
use crate::error::{IntakeError, Result};
use crate::lister::{FileLister, InputFile};
use crate::loader::{BulkLoader, LoadOutcome};
use futures::future;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Files found by one listing pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Batch {
    files: Vec<InputFile>,
}

impl Batch {
    pub fn new(files: Vec<InputFile>) -> Self {
        Self { files }
    }

    pub fn files(&self) -> &[InputFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Why the batch stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Nothing eligible at startup
    NothingToDo,
    /// Every load settled and the folder holds no eligible files
    Exhausted,
    /// Every load settled, but files arrived while the batch ran.
    /// They are left for the next scheduled run.
    FilesRemaining(usize),
}

/// Summary of one pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchReport {
    pub dispatched: usize,
    pub loaded: usize,
    pub failed: usize,
    pub rows_loaded: u64,
    pub elapsed: Duration,
    pub termination: Termination,
}

impl BatchReport {
    fn nothing_to_do(elapsed: Duration) -> Self {
        Self {
            dispatched: 0,
            loaded: 0,
            failed: 0,
            rows_loaded: 0,
            elapsed,
            termination: Termination::NothingToDo,
        }
    }
}

/// Drives discovery, loading and archiving for one folder
#[derive(Debug, Clone)]
pub struct BatchOrchestrator {
    folder: PathBuf,
    lister: FileLister,
    archiver: OutcomeArchiver,
    max_in_flight: usize,
}

impl BatchOrchestrator {
    /// Fails without side effects if `folder` is missing or not a directory
    pub fn new(folder: impl Into<PathBuf>, max_in_flight: usize) -> Result<Self> {
        let folder = folder.into();
        Self::check_folder(&folder)?;

        Ok(Self {
            lister: FileLister::new(),
            archiver: OutcomeArchiver::new(&folder),
            max_in_flight: max_in_flight.max(1),
            folder,
        })
    }

    /// The precondition every run starts with
    pub fn check_folder(folder: &Path) -> Result<()> {
        if !folder.exists() {
            return Err(IntakeError::FolderNotFound(folder.to_path_buf()));
        }
        if !folder.is_dir() {
            return Err(IntakeError::NotADirectory(folder.to_path_buf()));
        }
        Ok(())
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// The startup listing
    pub fn discover(&self) -> Result<Batch> {
        Ok(Batch::new(self.lister.list(&self.folder)?))
    }

    /// List the folder, then process what was found
    pub async fn run<L>(&self, loader: &L) -> Result<BatchReport>
    where
        L: BulkLoader + ?Sized,
    {
        let batch = self.discover()?;
        self.process(batch, loader).await
    }

    /// Load and archive every file in `batch`
    ///
    /// After the first archive or listing error no further loads are started.
    /// Loads already in flight are awaited and archived, since they may have
    /// committed, and then that first error is returned. Files never
    /// dispatched stay where they were.
    pub async fn process<L>(&self, batch: Batch, loader: &L) -> Result<BatchReport>
    where
        L: BulkLoader + ?Sized,
    {
        let started = Instant::now();

        if batch.is_empty() {
            info!(folder = %self.folder.display(), "No files to consume");
            return Ok(BatchReport::nothing_to_do(started.elapsed()));
        }

        let dispatched = batch.len();
        info!(
            folder = %self.folder.display(),
            files = dispatched,
            max_in_flight = self.max_in_flight,
            "Dispatching loads"
        );

        let halted = AtomicBool::new(false);
        let mut completions = stream::iter(batch.files)
            .take_while(|_| future::ready(!halted.load(Ordering::SeqCst)))
            .map(|file| async move {
                info!(file = %file.path().display(), "Processing file");
                let outcome = loader.load(&file).await;
                (file, outcome)
            })
            .buffer_unordered(self.max_in_flight);

        let mut in_flight = dispatched;
        let mut loaded = 0;
        let mut failed = 0;
        let mut rows_loaded = 0;
        let mut remaining = 0;
        let mut fatal: Option<IntakeError> = None;

        while let Some((file, outcome)) = completions.next().await {
            in_flight -= 1;

            match &outcome {
                LoadOutcome::Success { rows } => {
                    info!(file = %file.path().display(), rows = *rows, "Finished processing file");
                    loaded += 1;
                    rows_loaded += *rows;
                },
                LoadOutcome::Failure { reason } => {
                    error!(file = %file.path().display(), reason = %reason, "Error while processing file");
                    failed += 1;
                },
            }

            let archived = match self.archiver.archive(&file, &outcome) {
                Ok(archived) => archived,
                Err(e) => {
                    error!(file = %file.path().display(), error = %e, "Failed to archive file");
                    halted.store(true, Ordering::SeqCst);
                    fatal.get_or_insert(e);
                    continue;
                },
            };

            if fatal.is_some() {
                debug!(archived = %archived.path.display(), "File archived while stopping");
                continue;
            }

            match self.lister.list(&self.folder) {
                Ok(files) => remaining = files.len(),
                Err(e) => {
                    halted.store(true, Ordering::SeqCst);
                    fatal = Some(e);
                    continue;
                },
            }

            debug!(
                archived = %archived.path.display(),
                in_flight,
                remaining,
                "File archived"
            );
        }

        if let Some(e) = fatal {
            return Err(e);
        }

        // in_flight is zero here: every dispatched load has been archived
        let termination = if remaining == 0 {
            Termination::Exhausted
        } else {
            warn!(
                folder = %self.folder.display(),
                remaining,
                "Files arrived during the run; leaving them for the next run"
            );
            Termination::FilesRemaining(remaining)
        };

        let report = BatchReport {
            dispatched,
            loaded,
            failed,
            rows_loaded,
            elapsed: started.elapsed(),
            termination,
        };

        info!(
            dispatched = report.dispatched,
            loaded = report.loaded,
            failed = report.failed,
            rows = report.rows_loaded,
            elapsed_secs = report.elapsed.as_secs_f64(),
            "Batch complete"
        );

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_rejects_missing_folder() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("inbox");

        let err = BatchOrchestrator::new(&missing, 4).unwrap_err();
        assert!(matches!(err, IntakeError::FolderNotFound(ref p) if *p == missing));
        assert!(!missing.exists());
    }

    #[test]
    fn test_new_rejects_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("a.csv");
        std::fs::write(&file, "x").unwrap();

        let err = BatchOrchestrator::new(&file, 4).unwrap_err();
        assert!(matches!(err, IntakeError::NotADirectory(_)));
    }

    #[test]
    fn test_zero_in_flight_is_clamped() {
        let dir = TempDir::new().unwrap();
        let orchestrator = BatchOrchestrator::new(dir.path(), 0).unwrap();
        assert_eq!(orchestrator.max_in_flight, 1);
    }

    #[test]
    fn test_discover_empty_folder() {
        let dir = TempDir::new().unwrap();
        let batch = BatchOrchestrator::new(dir.path(), 4).unwrap().discover().unwrap();
        assert!(batch.is_empty());
    }
}
