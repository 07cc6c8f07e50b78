//! Collection packaging into a single zip archive.

use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use tracing::info;
use zip::CompressionMethod;
use zip::ZipWriter;
use zip::write::FileOptions;

use crate::error::{FsOpsError, FsOpsResult};

/// Outcome of packaging a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReport {
    /// Location of the written archive.
    pub path: PathBuf,
    /// Candidates stored in the archive.
    pub included: usize,
    /// Candidates left out because of the track cap.
    pub skipped: usize,
}

/// Builds deflate-compressed archives from a capped prefix of candidate files.
#[derive(Debug, Clone, Copy)]
pub struct ArchiveAssembler {
    cap: usize,
}

impl ArchiveAssembler {
    /// Create an assembler storing at most `cap` files per archive.
    #[must_use]
    pub const fn new(cap: usize) -> Self {
        Self { cap }
    }

    /// Maximum number of files stored per archive.
    #[must_use]
    pub const fn cap(&self) -> usize {
        self.cap
    }

    /// Write `<dir>/<stem>.zip` from the first `cap` candidates, each stored
    /// under its base name.
    ///
    /// # Errors
    ///
    /// Returns an error when the stem is empty, a candidate has no file name, or
    /// any file cannot be read or written.
    pub fn build(
        &self,
        dir: &Path,
        candidates: &[PathBuf],
        stem: &str,
    ) -> FsOpsResult<ArchiveReport> {
        if stem.is_empty() {
            return Err(FsOpsError::invalid_input("stem", "empty", stem));
        }
        let path = dir.join(format!("{stem}.zip"));
        let file = File::create(&path)
            .map_err(|source| FsOpsError::io("archive.create", &path, source))?;
        let mut writer = ZipWriter::new(file);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        let selected = &candidates[..candidates.len().min(self.cap)];
        for candidate in selected {
            let name = candidate
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    FsOpsError::invalid_input(
                        "candidate",
                        "missing_file_name",
                        candidate.display().to_string(),
                    )
                })?;
            writer
                .start_file(name, options)
                .map_err(|source| FsOpsError::zip("archive.start_entry", candidate, source))?;
            let mut source_file = File::open(candidate)
                .map_err(|source| FsOpsError::io("archive.open_entry", candidate, source))?;
            io::copy(&mut source_file, &mut writer)
                .map_err(|source| FsOpsError::io("archive.copy_entry", candidate, source))?;
        }
        writer
            .finish()
            .map_err(|source| FsOpsError::zip("archive.finish", &path, source))?;

        let report = ArchiveReport {
            path,
            included: selected.len(),
            skipped: candidates.len() - selected.len(),
        };
        info!(
            archive = %report.path.display(),
            included = report.included,
            skipped = report.skipped,
            cap = self.cap,
            "collection packaged"
        );
        Ok(report)
    }
}
