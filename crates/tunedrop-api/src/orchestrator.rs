//! Request orchestration for single and collection downloads.
//!
//! # Design
//! - Each call owns one [`Workspace`]; every rejection or failure releases it
//!   before returning, and a successful call hands it to the [`Artifact`].
//! - Business rejections are [`DownloadError`] values, mapped to HTTP at the
//!   handler boundary.
//! - Blocking work (extraction, archiving) never runs on the async workers.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, warn};
use tunedrop_extract::{
    Classification, ExtractError, ExtractOptions, ExtractionPool, Metadata, classify,
};
use tunedrop_fsops::{
    ArchiveAssembler, FsOpsError, Workspace, WorkspaceManager, archive_stem, sanitize_file_name,
    sanitize_or,
};
use tunedrop_telemetry::Metrics;

use crate::http::constants::{
    AUDIO_EXTENSION, CONTENT_TYPE_MP3, CONTENT_TYPE_ZIP, DEFAULT_COLLECTION_TITLE,
};

/// Errors terminating a download request.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// The source URL was missing or blank.
    #[error("source url missing")]
    MissingUrl,
    /// A collection was sent to the single item endpoint.
    #[error("collection sent to single endpoint")]
    CollectionOnSingle,
    /// A single item was sent to the collection endpoint.
    #[error("single item sent to collection endpoint")]
    SingleOnCollection,
    /// Extraction finished without producing an audio file.
    #[error("extraction produced no audio")]
    NoOutput,
    /// The extraction tool failed.
    #[error("extraction failed")]
    Extraction {
        /// Flow that was running.
        kind: Classification,
        /// Underlying extraction error.
        source: ExtractError,
    },
    /// Workspace or archive handling failed.
    #[error("workspace operation failed")]
    Workspace {
        /// Flow that was running.
        kind: Classification,
        /// Underlying filesystem error.
        source: FsOpsError,
    },
    /// A background task running filesystem work failed.
    #[error("background task failed")]
    Task {
        /// Flow that was running.
        kind: Classification,
        /// Underlying join error.
        source: tokio::task::JoinError,
    },
}

impl DownloadError {
    /// Whether the caller, not the service, is at fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::MissingUrl | Self::CollectionOnSingle | Self::SingleOnCollection
        )
    }

    /// Caller facing description.
    #[must_use]
    pub fn detail(&self) -> String {
        match self {
            Self::MissingUrl => "Invalid YT URL".to_string(),
            Self::CollectionOnSingle => "Use playlist endpoint".to_string(),
            Self::SingleOnCollection => "Use single endpoint for single videos".to_string(),
            Self::NoOutput => "No MP3 found".to_string(),
            Self::Extraction { kind, source } => failure_detail(*kind, &source.summary()),
            Self::Workspace { kind, source } => failure_detail(*kind, &source.to_string()),
            Self::Task { kind, .. } => failure_detail(*kind, &self.to_string()),
        }
    }
}

fn failure_detail(kind: Classification, reason: &str) -> String {
    match kind {
        Classification::Single => format!("Download Failed: {reason}"),
        Classification::Collection => format!("Playlist download failed: {reason}"),
    }
}

/// A finished download ready to be streamed.
///
/// Owns the request workspace; dropping the artifact deletes the file.
#[derive(Debug)]
pub struct Artifact {
    /// Workspace holding the file.
    pub workspace: Workspace,
    /// File to stream.
    pub path: PathBuf,
    /// Sanitised download name.
    pub file_name: String,
    /// Media type of the file.
    pub content_type: &'static str,
}

/// Composes workspaces, extraction, classification and archiving per request.
#[derive(Clone)]
pub struct DownloadOrchestrator {
    workspaces: WorkspaceManager,
    pool: ExtractionPool,
    archive: ArchiveAssembler,
    telemetry: Metrics,
}

impl DownloadOrchestrator {
    /// Wire the orchestrator to its collaborators.
    #[must_use]
    pub const fn new(
        workspaces: WorkspaceManager,
        pool: ExtractionPool,
        archive: ArchiveAssembler,
        telemetry: Metrics,
    ) -> Self {
        Self {
            workspaces,
            pool,
            archive,
            telemetry,
        }
    }

    /// Workspace manager backing every request.
    #[must_use]
    pub const fn workspaces(&self) -> &WorkspaceManager {
        &self.workspaces
    }

    /// Download a single item as an MP3.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] describing the rejection or failure; the
    /// workspace has already been released when an error is returned.
    pub async fn single(&self, url: Option<&str>) -> Result<Artifact, DownloadError> {
        let result = self.run_single(url).await;
        self.record(Classification::Single, &result);
        result
    }

    /// Download a collection as a zip archive of MP3s.
    ///
    /// # Errors
    ///
    /// Returns a [`DownloadError`] describing the rejection or failure; the
    /// workspace has already been released when an error is returned.
    pub async fn collection(&self, url: Option<&str>) -> Result<Artifact, DownloadError> {
        let result = self.run_collection(url).await;
        self.record(Classification::Collection, &result);
        result
    }

    async fn run_single(&self, url: Option<&str>) -> Result<Artifact, DownloadError> {
        let kind = Classification::Single;
        let url = require_url(url)?;
        let workspace = self.allocate(kind)?;

        let options = ExtractOptions::audio(workspace.path());
        let metadata = match self.extract(url.clone(), options).await {
            Ok(metadata) => metadata,
            Err(source) => {
                error!(workspace = %workspace.id(), error = %source, "single download failed");
                workspace.release();
                return Err(DownloadError::Extraction { kind, source });
            }
        };

        if classify(&metadata) == Classification::Collection {
            warn!(url = %url, "collection sent to single endpoint");
            workspace.release();
            return Err(DownloadError::CollectionOnSingle);
        }

        let candidates = match workspace.candidates(AUDIO_EXTENSION) {
            Ok(candidates) => candidates,
            Err(source) => {
                workspace.release();
                return Err(DownloadError::Workspace { kind, source });
            }
        };
        let Some(path) = candidates.into_iter().next() else {
            warn!(workspace = %workspace.id(), "extraction produced no audio file");
            workspace.release();
            return Err(DownloadError::NoOutput);
        };

        let raw_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mut file_name = sanitize_file_name(&raw_name);
        if file_name.is_empty() {
            file_name = format!("audio-{}.{AUDIO_EXTENSION}", workspace.id());
        }
        info!(workspace = %workspace.id(), file = %file_name, "single download ready");

        Ok(Artifact {
            workspace,
            path,
            file_name,
            content_type: CONTENT_TYPE_MP3,
        })
    }

    async fn run_collection(&self, url: Option<&str>) -> Result<Artifact, DownloadError> {
        let kind = Classification::Collection;
        let url = require_url(url)?;
        let workspace = self.allocate(kind)?;

        let metadata = match self.peek(url.clone()).await {
            Ok(metadata) => metadata,
            Err(source) => {
                error!(workspace = %workspace.id(), error = %source, "collection lookup failed");
                workspace.release();
                return Err(DownloadError::Extraction { kind, source });
            }
        };
        if classify(&metadata) != Classification::Collection {
            warn!(url = %url, "single item sent to collection endpoint");
            workspace.release();
            return Err(DownloadError::SingleOnCollection);
        }

        let title = metadata
            .title
            .as_deref()
            .unwrap_or(DEFAULT_COLLECTION_TITLE);
        let fallback = format!("{DEFAULT_COLLECTION_TITLE}-{}", workspace.id());
        let stem = archive_stem(&sanitize_or(title, &fallback));
        info!(
            workspace = %workspace.id(),
            collection = %stem,
            tracks = metadata.entry_count(),
            cap = self.archive.cap(),
            "processing collection"
        );

        let options = ExtractOptions::audio(workspace.path());
        if let Err(source) = self.extract(url, options).await {
            error!(workspace = %workspace.id(), error = %source, "collection download failed");
            workspace.release();
            return Err(DownloadError::Extraction { kind, source });
        }

        let archive = self.archive;
        let dir = workspace.path().to_path_buf();
        let archive_stem = stem.clone();
        let built = tokio::task::spawn_blocking(move || {
            let candidates = Workspace::candidates_in(&dir, AUDIO_EXTENSION)?;
            info!(found = candidates.len(), "collection files produced");
            archive.build(&dir, &candidates, &archive_stem)
        })
        .await;

        let report = match built {
            Ok(Ok(report)) => report,
            Ok(Err(source)) => {
                error!(workspace = %workspace.id(), error = %source, "collection packaging failed");
                workspace.release();
                return Err(DownloadError::Workspace { kind, source });
            }
            Err(source) => {
                workspace.release();
                return Err(DownloadError::Task { kind, source });
            }
        };

        Ok(Artifact {
            workspace,
            path: report.path,
            file_name: format!("{stem}.zip"),
            content_type: CONTENT_TYPE_ZIP,
        })
    }

    fn allocate(&self, kind: Classification) -> Result<Workspace, DownloadError> {
        let workspace = self
            .workspaces
            .allocate()
            .map_err(|source| DownloadError::Workspace { kind, source })?;
        self.telemetry.set_active_workspaces(self.workspaces.active());
        Ok(workspace)
    }

    async fn peek(&self, url: String) -> Result<Metadata, ExtractError> {
        let result = self.pool.peek(url).await;
        self.telemetry.inc_extraction("peek", outcome(result.is_ok()));
        result
    }

    async fn extract(
        &self,
        url: String,
        options: ExtractOptions,
    ) -> Result<Metadata, ExtractError> {
        let result = self.pool.extract(url, options).await;
        self.telemetry.inc_extraction("extract", outcome(result.is_ok()));
        result
    }

    fn record(&self, kind: Classification, result: &Result<Artifact, DownloadError>) {
        let label = match result {
            Ok(_) => "ok",
            Err(err) if err.is_client_error() => "rejected",
            Err(_) => "failed",
        };
        self.telemetry.inc_download(kind.as_str(), label);
        self.telemetry.set_active_workspaces(self.workspaces.active());
    }
}

const fn outcome(ok: bool) -> &'static str {
    if ok { "ok" } else { "failed" }
}

fn require_url(url: Option<&str>) -> Result<String, DownloadError> {
    url.map(str::trim)
        .filter(|url| !url.is_empty())
        .map(ToString::to_string)
        .ok_or(DownloadError::MissingUrl)
}
