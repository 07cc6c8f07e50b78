//! Per-request scratch directories.
//!
//! # Design
//! - Each request owns one uniquely named directory below a shared base.
//! - A [`Workspace`] is removed exactly once: explicitly through
//!   [`Workspace::release`] or implicitly when it is dropped.
//! - Removal failures are logged and never surface to the caller.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, error, info};
use uuid::Uuid;

use crate::error::{FsOpsError, FsOpsResult};

/// Allocates and sweeps request workspaces below a base directory.
#[derive(Debug, Clone)]
pub struct WorkspaceManager {
    base: PathBuf,
    active: Arc<AtomicUsize>,
}

impl WorkspaceManager {
    /// Create a manager rooted at `base`. Nothing touches the disk until
    /// [`Self::prepare`] or [`Self::allocate`] runs.
    #[must_use]
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Base directory holding every workspace.
    #[must_use]
    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Number of workspaces allocated and not yet released.
    #[must_use]
    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// Create the base directory if it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn prepare(&self) -> FsOpsResult<()> {
        fs::create_dir_all(&self.base)
            .map_err(|source| FsOpsError::io("workspace.prepare", &self.base, source))?;
        info!(base = %self.base.display(), "workspace base ready");
        Ok(())
    }

    /// Allocate a fresh workspace directory named after a random UUID.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be created.
    pub fn allocate(&self) -> FsOpsResult<Workspace> {
        fs::create_dir_all(&self.base)
            .map_err(|source| FsOpsError::io("workspace.prepare", &self.base, source))?;
        let id = Uuid::new_v4();
        let path = self.base.join(id.to_string());
        fs::create_dir(&path)
            .map_err(|source| FsOpsError::io("workspace.allocate", &path, source))?;
        self.active.fetch_add(1, Ordering::SeqCst);
        debug!(workspace = %id, path = %path.display(), "workspace allocated");
        Ok(Workspace {
            id,
            path,
            active: Arc::clone(&self.active),
            released: false,
        })
    }

    /// Remove every entry below the base directory and return how many were removed.
    ///
    /// Entries that cannot be removed are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error when the base directory exists but cannot be listed.
    pub fn sweep(&self) -> FsOpsResult<usize> {
        let entries = match fs::read_dir(&self.base) {
            Ok(entries) => entries,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(0),
            Err(source) => return Err(FsOpsError::io("workspace.sweep", &self.base, source)),
        };

        let mut removed = 0;
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    error!(base = %self.base.display(), error = %err, "failed to read workspace entry");
                    continue;
                }
            };
            let path = entry.path();
            let outcome = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match outcome {
                Ok(()) => removed += 1,
                Err(err) => {
                    error!(path = %path.display(), error = %err, "failed to remove workspace entry");
                }
            }
        }
        info!(base = %self.base.display(), removed, "workspace base swept");
        Ok(removed)
    }
}

/// Exclusive scratch directory owned by one request.
#[derive(Debug)]
pub struct Workspace {
    id: Uuid,
    path: PathBuf,
    active: Arc<AtomicUsize>,
    released: bool,
}

impl Workspace {
    /// Unique identifier used as the directory name.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Directory path of the workspace.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Files directly inside the workspace carrying `extension`, in directory
    /// enumeration order.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be listed.
    pub fn candidates(&self, extension: &str) -> FsOpsResult<Vec<PathBuf>> {
        Self::candidates_in(&self.path, extension)
    }

    /// Files directly inside `dir` carrying `extension`, for callers that moved
    /// the path onto a blocking task.
    ///
    /// # Errors
    ///
    /// Returns an error when the directory cannot be listed.
    pub fn candidates_in(dir: &Path, extension: &str) -> FsOpsResult<Vec<PathBuf>> {
        let entries = fs::read_dir(dir)
            .map_err(|source| FsOpsError::io("workspace.candidates", dir, source))?;
        let mut files = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| FsOpsError::io("workspace.candidates", dir, source))?
                .path();
            let matches = path
                .extension()
                .is_some_and(|ext| ext.to_str() == Some(extension));
            if matches && path.is_file() {
                files.push(path);
            }
        }
        Ok(files)
    }

    /// Delete the workspace recursively.
    pub fn release(mut self) {
        self.remove();
    }

    fn remove(&mut self) {
        if self.released {
            return;
        }
        self.released = true;
        self.active.fetch_sub(1, Ordering::SeqCst);
        match fs::remove_dir_all(&self.path) {
            Ok(()) => info!(workspace = %self.id, "cleaned up workspace"),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(workspace = %self.id, "workspace already gone");
            }
            Err(err) => {
                error!(workspace = %self.id, path = %self.path.display(), error = %err, "failed to remove workspace");
            }
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.remove();
    }
}
