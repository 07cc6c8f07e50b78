//! Orchestrator flows driven through a scripted extractor.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tempfile::TempDir;
use tunedrop_api::{DownloadError, DownloadOrchestrator};
use tunedrop_extract::{ExtractError, ExtractionPool};
use tunedrop_fsops::{ArchiveAssembler, WorkspaceManager};
use tunedrop_telemetry::Metrics;
use tunedrop_test_support::{ScriptedExtractor, entry_count, scratch_dir};

struct Fixture {
    _temp: TempDir,
    workspaces: WorkspaceManager,
    extractor: Arc<ScriptedExtractor>,
    metrics: Metrics,
    orchestrator: DownloadOrchestrator,
}

impl Fixture {
    fn new(extractor: ScriptedExtractor) -> Result<Self> {
        Self::with_limits(extractor, 50, Duration::from_secs(10))
    }

    fn with_limits(extractor: ScriptedExtractor, cap: usize, timeout: Duration) -> Result<Self> {
        let temp = scratch_dir()?;
        let workspaces = WorkspaceManager::new(temp.path().join("downloads"));
        let extractor = Arc::new(extractor);
        let pool = ExtractionPool::new(extractor.clone(), 2, timeout);
        let metrics = Metrics::new()?;
        let orchestrator = DownloadOrchestrator::new(
            workspaces.clone(),
            pool,
            ArchiveAssembler::new(cap),
            metrics.clone(),
        );
        Ok(Self {
            _temp: temp,
            workspaces,
            extractor,
            metrics,
            orchestrator,
        })
    }

    fn leftover(&self) -> Result<usize> {
        entry_count(self.workspaces.base())
    }
}

#[tokio::test]
async fn single_returns_sanitised_audio_and_owns_workspace() -> Result<()> {
    let fixture = Fixture::new(ScriptedExtractor::single("Some Title"))?;

    let artifact = fixture.orchestrator.single(Some("https://example.test/v")).await?;
    assert_eq!(artifact.file_name, "Some Title.mp3");
    assert_eq!(artifact.content_type, "audio/mpeg");
    assert!(artifact.path.is_file());
    assert_eq!(fixture.workspaces.active(), 1);

    drop(artifact);
    assert_eq!(fixture.workspaces.active(), 0);
    assert_eq!(fixture.leftover()?, 0);
    Ok(())
}

#[tokio::test]
async fn single_strips_non_ascii_and_falls_back_on_empty_names() -> Result<()> {
    let fixture = Fixture::new(ScriptedExtractor::single("x").with_files(["tést fïlè.mp3"]))?;
    let artifact = fixture.orchestrator.single(Some("u")).await?;
    assert_eq!(artifact.file_name, "tst fl.mp3");
    drop(artifact);

    let fixture = Fixture::new(ScriptedExtractor::single("x").with_files(["???.mp3"]))?;
    let artifact = fixture.orchestrator.single(Some("u")).await?;
    assert!(artifact.file_name.starts_with("audio-"));
    assert!(artifact.file_name.ends_with(".mp3"));
    Ok(())
}

#[tokio::test]
async fn missing_url_is_rejected_without_work() -> Result<()> {
    let fixture = Fixture::new(ScriptedExtractor::single("Song"))?;

    for url in [None, Some(""), Some("   ")] {
        let err = fixture.orchestrator.single(url).await;
        assert!(matches!(err, Err(DownloadError::MissingUrl)));
        let err = fixture.orchestrator.collection(url).await;
        assert!(matches!(err, Err(DownloadError::MissingUrl)));
    }
    assert_eq!(fixture.extractor.peek_calls(), 0);
    assert_eq!(fixture.extractor.extract_calls(), 0);
    assert_eq!(fixture.leftover()?, 0);
    Ok(())
}

#[tokio::test]
async fn single_extraction_failure_releases_workspace() -> Result<()> {
    let fixture = Fixture::new(
        ScriptedExtractor::single("Song")
            .with_files(["Song.webm.part"])
            .with_extract_failure("Video unavailable"),
    )?;

    let err = fixture.orchestrator.single(Some("u")).await;
    let Err(err) = err else {
        anyhow::bail!("expected extraction failure");
    };
    assert!(err.detail().starts_with("Download Failed:"));
    assert!(err.detail().contains("Video unavailable"));
    assert!(!err.is_client_error());

    let dirs = fixture.extractor.output_dirs();
    assert_eq!(dirs.len(), 1);
    assert!(!dirs[0].exists());
    assert_eq!(fixture.workspaces.active(), 0);
    Ok(())
}

#[tokio::test]
async fn single_without_audio_output_fails() -> Result<()> {
    let fixture = Fixture::new(ScriptedExtractor::single("Song").with_files(["Song.webm"]))?;

    let err = fixture.orchestrator.single(Some("u")).await;
    assert!(matches!(err, Err(DownloadError::NoOutput)));
    assert_eq!(fixture.leftover()?, 0);
    Ok(())
}

#[tokio::test]
async fn collection_on_single_endpoint_is_rejected() -> Result<()> {
    let fixture = Fixture::new(ScriptedExtractor::collection(
        "Mix",
        &["a.mp3", "b.mp3"],
    ))?;

    let err = fixture.orchestrator.single(Some("u")).await;
    assert!(matches!(err, Err(DownloadError::CollectionOnSingle)));
    assert_eq!(fixture.leftover()?, 0);
    assert_eq!(fixture.workspaces.active(), 0);
    Ok(())
}

#[tokio::test]
async fn single_on_collection_endpoint_only_peeks() -> Result<()> {
    let fixture = Fixture::new(ScriptedExtractor::single("Song"))?;

    let err = fixture.orchestrator.collection(Some("u")).await;
    assert!(matches!(err, Err(DownloadError::SingleOnCollection)));
    assert_eq!(fixture.extractor.peek_calls(), 1);
    assert_eq!(fixture.extractor.extract_calls(), 0);
    assert_eq!(fixture.leftover()?, 0);
    Ok(())
}

#[tokio::test]
async fn collection_archive_is_capped() -> Result<()> {
    let names: Vec<String> = (0..75).map(|idx| format!("track{idx:02}.mp3")).collect();
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let fixture = Fixture::new(ScriptedExtractor::collection("Big Mix", &refs))?;

    let artifact = fixture.orchestrator.collection(Some("u")).await?;
    assert_eq!(artifact.file_name, "Big_Mix.zip");
    assert_eq!(artifact.content_type, "application/zip");

    let file = std::fs::File::open(&artifact.path)?;
    let mut archive = zip::ZipArchive::new(file)?;
    assert_eq!(archive.len(), 50);
    for idx in 0..archive.len() {
        let entry = archive.by_index(idx)?;
        assert!(!entry.name().contains('/'));
        assert!(entry.name().ends_with(".mp3"));
    }
    Ok(())
}

#[tokio::test]
async fn collection_failures_release_workspace() -> Result<()> {
    let fixture = Fixture::new(
        ScriptedExtractor::collection("Mix", &["a.mp3"]).with_peek_failure("private playlist"),
    )?;
    let err = fixture.orchestrator.collection(Some("u")).await;
    let Err(err) = err else {
        anyhow::bail!("expected peek failure");
    };
    assert!(err.detail().starts_with("Playlist download failed:"));
    assert_eq!(fixture.leftover()?, 0);

    let fixture = Fixture::new(
        ScriptedExtractor::collection("Mix", &["a.mp3"]).with_extract_failure("throttled"),
    )?;
    let err = fixture.orchestrator.collection(Some("u")).await;
    assert!(matches!(err, Err(DownloadError::Extraction { .. })));
    assert_eq!(fixture.leftover()?, 0);
    assert_eq!(fixture.workspaces.active(), 0);
    Ok(())
}

#[tokio::test]
async fn collection_title_falls_back_to_default() -> Result<()> {
    let fixture = Fixture::new(ScriptedExtractor::collection("???", &["a.mp3"]))?;

    let artifact = fixture.orchestrator.collection(Some("u")).await?;
    assert!(artifact.file_name.starts_with("playlist-"));
    assert!(artifact.file_name.ends_with(".zip"));
    Ok(())
}

#[tokio::test]
async fn pool_timeout_fails_and_releases_workspace() -> Result<()> {
    let fixture = Fixture::with_limits(
        ScriptedExtractor::single("Slow").with_delay(Duration::from_millis(400)),
        50,
        Duration::from_millis(50),
    )?;

    let err = fixture.orchestrator.single(Some("u")).await;
    assert!(matches!(
        err,
        Err(DownloadError::Extraction {
            source: ExtractError::TimedOut { .. },
            ..
        })
    ));
    assert_eq!(fixture.workspaces.active(), 0);
    assert_eq!(fixture.leftover()?, 0);
    Ok(())
}

#[tokio::test]
async fn timed_out_extraction_cannot_write_after_release() -> Result<()> {
    let fixture = Fixture::with_limits(
        ScriptedExtractor::single("Late")
            .with_files(["Late.webm.part"])
            .with_delay(Duration::from_millis(200)),
        50,
        Duration::from_millis(50),
    )?;

    let err = fixture.orchestrator.single(Some("u")).await;
    assert!(matches!(
        err,
        Err(DownloadError::Extraction {
            source: ExtractError::TimedOut { .. },
            ..
        })
    ));

    tokio::time::sleep(Duration::from_millis(300)).await;
    let dirs = fixture.extractor.output_dirs();
    assert_eq!(dirs.len(), 1);
    assert!(!dirs[0].exists());
    assert_eq!(fixture.workspaces.active(), 0);
    assert_eq!(fixture.leftover()?, 0);
    Ok(())
}

#[tokio::test]
async fn outcomes_are_counted() -> Result<()> {
    let fixture = Fixture::new(ScriptedExtractor::single("Song"))?;
    drop(fixture.orchestrator.single(Some("u")).await?);
    let _ = fixture.orchestrator.single(None).await;

    let rendered = fixture.metrics.render()?;
    assert!(rendered.contains("downloads_total"));
    assert!(rendered.contains("outcome=\"ok\""));
    assert!(rendered.contains("outcome=\"rejected\""));
    assert!(rendered.contains("extraction_calls_total"));
    Ok(())
}
