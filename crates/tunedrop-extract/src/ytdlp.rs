//! `yt-dlp` subprocess adapter.
//!
//! # Design
//! - Metadata comes from `--dump-single-json`; downloads add `--no-simulate`.
//! - Output pipes are drained on helper threads so a large playlist document
//!   cannot stall the child.
//! - A per-process deadline kills the child when it expires.

use std::ffi::OsString;
use std::io::{self, Read};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, error, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::extractor::{ExtractOptions, MediaExtractor};
use crate::model::Metadata;

const DEFAULT_DEADLINE: Duration = Duration::from_secs(600);
const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// [`MediaExtractor`] backed by the `yt-dlp` command line tool.
#[derive(Debug, Clone)]
pub struct YtDlpExtractor {
    program: PathBuf,
    ffmpeg_location: Option<PathBuf>,
    deadline: Duration,
}

impl YtDlpExtractor {
    /// Create an adapter invoking `program`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            ffmpeg_location: None,
            deadline: DEFAULT_DEADLINE,
        }
    }

    /// Point the tool at a specific transcoder location.
    #[must_use]
    pub fn with_ffmpeg_location(mut self, location: Option<PathBuf>) -> Self {
        self.ffmpeg_location = location;
        self
    }

    /// Kill the child process once it has run for `deadline`.
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    fn run(&self, operation: &'static str, args: Vec<OsString>) -> ExtractResult<Metadata> {
        debug!(program = %self.program.display(), operation, "launching extractor");
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| ExtractError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = drain(child.stdout.take());
        let stderr = drain(child.stderr.take());
        let status = wait_with_deadline(&mut child, self.deadline, operation)?;
        let stdout = collect(stdout, operation)?;
        let stderr = collect(stderr, operation)?;

        if !status.success() {
            let stderr = String::from_utf8_lossy(&stderr).into_owned();
            warn!(operation, code = ?status.code(), "extractor exited unsuccessfully");
            return Err(ExtractError::Exited {
                code: status.code(),
                stderr,
            });
        }
        serde_json::from_slice(&stdout).map_err(|source| ExtractError::Metadata { source })
    }

    fn common_args(&self) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["--dump-single-json".into()];
        if let Some(location) = &self.ffmpeg_location {
            args.push("--ffmpeg-location".into());
            args.push(location.clone().into_os_string());
        }
        args
    }
}

impl MediaExtractor for YtDlpExtractor {
    fn peek(&self, url: &str) -> ExtractResult<Metadata> {
        let mut args = self.common_args();
        args.extend([
            "--flat-playlist".into(),
            "--quiet".into(),
            "--no-warnings".into(),
            "--".into(),
            url.into(),
        ]);
        self.run("peek", args)
    }

    fn extract(&self, url: &str, options: &ExtractOptions) -> ExtractResult<Metadata> {
        let mut args = self.common_args();
        args.push("--no-simulate".into());
        args.extend(options.to_args());
        args.extend(["--".into(), url.into()]);
        self.run("extract", args)
    }
}

fn drain<R>(pipe: Option<R>) -> JoinHandle<io::Result<Vec<u8>>>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut buffer = Vec::new();
        if let Some(mut pipe) = pipe {
            pipe.read_to_end(&mut buffer)?;
        }
        Ok(buffer)
    })
}

fn collect(
    reader: JoinHandle<io::Result<Vec<u8>>>,
    operation: &'static str,
) -> ExtractResult<Vec<u8>> {
    reader
        .join()
        .map_err(|_| ExtractError::Io {
            operation,
            source: io::Error::other("output reader panicked"),
        })?
        .map_err(|source| ExtractError::Io { operation, source })
}

fn wait_with_deadline(
    child: &mut Child,
    deadline: Duration,
    operation: &'static str,
) -> ExtractResult<ExitStatus> {
    let expires = Instant::now() + deadline;
    loop {
        if let Some(status) = child
            .try_wait()
            .map_err(|source| ExtractError::Io { operation, source })?
        {
            return Ok(status);
        }
        if Instant::now() >= expires {
            error!(
                operation,
                timeout_secs = deadline.as_secs(),
                "extractor timed out, killing"
            );
            if let Err(err) = child.kill() {
                warn!(operation, error = %err, "failed to kill extractor");
            }
            let _ = child.wait();
            return Err(ExtractError::TimedOut {
                operation,
                timeout: deadline,
            });
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use anyhow::Result;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;

    fn script(dir: &Path, name: &str, body: &str) -> Result<PathBuf> {
        let path = dir.join(name);
        fs::write(&path, format!("#!/bin/sh\n{body}\n"))?;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))?;
        Ok(path)
    }

    // Every subprocess case lives in one test so no other test forks while a
    // script is still open for writing.
    #[test]
    fn runs_the_tool_and_maps_failures() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let args_log = temp.path().join("args.txt");

        let peek = script(
            temp.path(),
            "peek.sh",
            &format!(
                "printf '%s\\n' \"$@\" > '{}'\necho '{{\"_type\":\"playlist\",\"title\":\"Mix\",\"entries\":[{{\"id\":\"a\"}},null]}}'",
                args_log.display()
            ),
        )?;
        let failing = script(
            temp.path(),
            "fail.sh",
            "echo 'ERROR: Video unavailable' >&2\nexit 1",
        )?;
        let garbage = script(temp.path(), "garbage.sh", "echo not-json")?;
        let slow = script(temp.path(), "slow.sh", "exec sleep 5")?;

        let metadata = YtDlpExtractor::new(&peek).peek("https://example.test/list")?;
        assert_eq!(metadata.title.as_deref(), Some("Mix"));
        assert_eq!(metadata.entry_count(), 1);
        let logged = fs::read_to_string(&args_log)?;
        let logged: Vec<&str> = logged.lines().collect();
        assert!(logged.contains(&"--dump-single-json"));
        assert!(logged.contains(&"--flat-playlist"));
        assert_eq!(logged.last(), Some(&"https://example.test/list"));

        let options = ExtractOptions::audio(temp.path());
        YtDlpExtractor::new(&peek)
            .with_ffmpeg_location(Some(PathBuf::from("/opt/ffmpeg")))
            .extract("https://example.test/v", &options)?;
        let logged = fs::read_to_string(&args_log)?;
        assert!(logged.lines().any(|line| line == "--no-simulate"));
        assert!(logged.lines().any(|line| line == "/opt/ffmpeg"));

        let err = YtDlpExtractor::new(&failing).peek("u");
        assert!(matches!(err, Err(ExtractError::Exited { code: Some(1), .. })));
        assert_eq!(
            err.err().as_ref().map(ExtractError::summary).as_deref(),
            Some("ERROR: Video unavailable")
        );

        assert!(matches!(
            YtDlpExtractor::new(&garbage).peek("u"),
            Err(ExtractError::Metadata { .. })
        ));

        let started = Instant::now();
        let err = YtDlpExtractor::new(&slow)
            .with_deadline(Duration::from_millis(200))
            .peek("u");
        assert!(matches!(err, Err(ExtractError::TimedOut { operation: "peek", .. })));
        assert!(started.elapsed() < Duration::from_secs(4));

        assert!(matches!(
            YtDlpExtractor::new(temp.path().join("missing")).peek("u"),
            Err(ExtractError::Spawn { .. })
        ));
        Ok(())
    }
}
