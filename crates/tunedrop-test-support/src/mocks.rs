//! Scripted [`MediaExtractor`] used by orchestrator and router tests.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;

use tunedrop_extract::{ExtractError, ExtractOptions, ExtractResult, MediaExtractor, Metadata};

#[derive(Debug, Clone)]
enum Outcome {
    Metadata(Metadata),
    Fail(String),
}

impl Outcome {
    fn resolve(&self) -> ExtractResult<Metadata> {
        match self {
            Self::Metadata(metadata) => Ok(metadata.clone()),
            Self::Fail(message) => Err(ExtractError::Exited {
                code: Some(1),
                stderr: format!("ERROR: {message}\n"),
            }),
        }
    }
}

/// Extractor replaying canned metadata and writing canned files.
///
/// `extract` writes every configured file into the directory of the output
/// template, even when it then reports a failure, mimicking partial downloads.
#[derive(Debug)]
pub struct ScriptedExtractor {
    peek: Outcome,
    extract: Outcome,
    files: Vec<String>,
    delay: Duration,
    peek_calls: AtomicUsize,
    extract_calls: AtomicUsize,
    output_dirs: Mutex<Vec<PathBuf>>,
}

impl ScriptedExtractor {
    /// A single item titled `title` producing `<title>.mp3`.
    #[must_use]
    pub fn single(title: &str) -> Self {
        let metadata = Metadata::item(title);
        Self::with_outcomes(
            Outcome::Metadata(metadata.clone()),
            Outcome::Metadata(metadata),
            vec![format!("{title}.mp3")],
        )
    }

    /// A collection titled `title` producing one file per name in `files`.
    #[must_use]
    pub fn collection(title: &str, files: &[&str]) -> Self {
        let ids = files
            .iter()
            .map(|file| file.rsplit_once('.').map_or(*file, |(stem, _)| stem));
        let metadata = Metadata::collection(title, ids);
        Self::with_outcomes(
            Outcome::Metadata(metadata.clone()),
            Outcome::Metadata(metadata),
            files.iter().map(ToString::to_string).collect(),
        )
    }

    fn with_outcomes(peek: Outcome, extract: Outcome, files: Vec<String>) -> Self {
        Self {
            peek,
            extract,
            files,
            delay: Duration::ZERO,
            peek_calls: AtomicUsize::new(0),
            extract_calls: AtomicUsize::new(0),
            output_dirs: Mutex::new(Vec::new()),
        }
    }

    /// Replace the files written by `extract`.
    #[must_use]
    pub fn with_files<I, S>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    /// Make `peek` fail with `message`.
    #[must_use]
    pub fn with_peek_failure(mut self, message: &str) -> Self {
        self.peek = Outcome::Fail(message.to_string());
        self
    }

    /// Make `extract` fail with `message` after writing its files.
    #[must_use]
    pub fn with_extract_failure(mut self, message: &str) -> Self {
        self.extract = Outcome::Fail(message.to_string());
        self
    }

    /// Block every call for `delay` before answering.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Number of `peek` invocations so far.
    #[must_use]
    pub fn peek_calls(&self) -> usize {
        self.peek_calls.load(Ordering::SeqCst)
    }

    /// Number of `extract` invocations so far.
    #[must_use]
    pub fn extract_calls(&self) -> usize {
        self.extract_calls.load(Ordering::SeqCst)
    }

    /// Directories `extract` wrote into, in call order.
    #[must_use]
    pub fn output_dirs(&self) -> Vec<PathBuf> {
        self.output_dirs
            .lock()
            .map(|dirs| dirs.clone())
            .unwrap_or_default()
    }

    fn write_files(&self, dir: &Path) -> ExtractResult<()> {
        if self.files.is_empty() {
            return Ok(());
        }
        fs::create_dir_all(dir).map_err(|source| ExtractError::Io {
            operation: "scripted.create_dir",
            source,
        })?;
        for name in &self.files {
            fs::write(dir.join(name), name.as_bytes()).map_err(|source| ExtractError::Io {
                operation: "scripted.write",
                source,
            })?;
        }
        Ok(())
    }
}

impl MediaExtractor for ScriptedExtractor {
    fn peek(&self, _url: &str) -> ExtractResult<Metadata> {
        self.peek_calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        self.peek.resolve()
    }

    fn extract(&self, _url: &str, options: &ExtractOptions) -> ExtractResult<Metadata> {
        self.extract_calls.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.delay);
        let dir = options
            .output_template
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        if let Ok(mut dirs) = self.output_dirs.lock() {
            dirs.push(dir.clone());
        }
        self.write_files(&dir)?;
        self.extract.resolve()
    }
}
