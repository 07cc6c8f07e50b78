//! Scratch directory helpers.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tempfile::TempDir;

/// Create a temporary directory removed when the guard drops.
///
/// # Errors
///
/// Returns an error if the directory cannot be created.
pub fn scratch_dir() -> Result<TempDir> {
    tempfile::Builder::new()
        .prefix("tunedrop-test-")
        .tempdir()
        .context("failed to create scratch directory")
}

/// Number of entries directly inside `dir`, zero when it does not exist.
///
/// # Errors
///
/// Returns an error if the directory exists but cannot be listed.
pub fn entry_count(dir: &Path) -> Result<usize> {
    if !dir.exists() {
        return Ok(0);
    }
    let entries = fs::read_dir(dir).with_context(|| format!("failed to list {}", dir.display()))?;
    Ok(entries.count())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_count_handles_missing_and_populated_dirs() -> Result<()> {
        let dir = scratch_dir()?;
        assert_eq!(entry_count(&dir.path().join("missing"))?, 0);
        fs::write(dir.path().join("a.mp3"), b"a")?;
        fs::create_dir(dir.path().join("nested"))?;
        assert_eq!(entry_count(dir.path())?, 2);
        Ok(())
    }
}
