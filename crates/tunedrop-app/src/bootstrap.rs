use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tunedrop_api::{
    ApiServer, ApiServerError, ApiState, CounterStore, DownloadOrchestrator, MemoryCounterStore,
    RateLimitGate, RedisCounterStore,
};
use tunedrop_config::{RateLimitBackend, ServiceConfig};
use tunedrop_extract::{ExtractionPool, MediaExtractor, YtDlpExtractor, worker_deadline};
use tunedrop_fsops::{ArchiveAssembler, WorkspaceManager};
use tunedrop_telemetry::{LogFormat, LoggingConfig, Metrics};

use crate::error::{AppError, AppResult};

/// Dependencies required to bootstrap the Tunedrop service.
pub(crate) struct BootstrapDependencies {
    config: ServiceConfig,
    extractor: Arc<dyn MediaExtractor>,
    telemetry: Metrics,
}

impl BootstrapDependencies {
    /// Construct production dependencies from the environment for the binary entrypoint.
    pub(crate) fn from_env() -> AppResult<Self> {
        let config = tunedrop_config::load_from_env()
            .map_err(|err| AppError::config("config.load_from_env", err))?;
        let extractor = YtDlpExtractor::new(config.extraction.ytdlp_bin.clone())
            .with_ffmpeg_location(config.extraction.ffmpeg_location.clone())
            .with_deadline(worker_deadline(config.extraction.timeout));
        let telemetry =
            Metrics::new().map_err(|err| AppError::telemetry("telemetry.metrics", err))?;

        Ok(Self {
            config,
            extractor: Arc::new(extractor),
            telemetry,
        })
    }
}

/// Entry point for the Tunedrop boot sequence.
///
/// # Errors
///
/// Returns an error if configuration, logging, the listener or the server fails.
pub async fn run_app() -> AppResult<()> {
    let dependencies = BootstrapDependencies::from_env()?;
    init_logging(&dependencies.config)?;

    let addr = dependencies.config.server.socket_addr();
    info!(addr = %addr, "Launching API listener");
    let listener = TcpListener::bind(addr).await.map_err(|source| {
        AppError::api_server("api_server.bind", ApiServerError::Bind { addr, source })
    })?;

    run_app_with(dependencies, listener, shutdown_signal()).await
}

/// Boot sequence that relies entirely on injected dependencies to simplify testing.
pub(crate) async fn run_app_with<F>(
    dependencies: BootstrapDependencies,
    listener: TcpListener,
    shutdown: F,
) -> AppResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    info!("Tunedrop bootstrap starting");

    let BootstrapDependencies {
        config,
        extractor,
        telemetry,
    } = dependencies;

    let workspaces = WorkspaceManager::new(config.storage.download_dir.clone());
    workspaces
        .prepare()
        .map_err(|err| AppError::fsops("workspace.prepare", err))?;

    let pool = ExtractionPool::new(
        extractor,
        config.extraction.worker_pool_size,
        config.extraction.timeout,
    );
    let orchestrator = DownloadOrchestrator::new(
        workspaces.clone(),
        pool,
        ArchiveAssembler::new(config.extraction.max_playlist_tracks),
        telemetry.clone(),
    );
    let gate = build_gate(&config)?;
    let api = ApiServer::new(ApiState::new(orchestrator, gate, telemetry));

    let serve_result = api.serve_listener(listener, shutdown).await;

    match workspaces.sweep() {
        Ok(removed) => info!(removed, "scratch storage swept"),
        Err(err) => error!(error = %err, "failed to sweep scratch storage"),
    }

    serve_result.map_err(|err| AppError::api_server("api_server.serve", err))?;
    info!("API server shutdown complete");
    Ok(())
}

fn init_logging(config: &ServiceConfig) -> AppResult<()> {
    let logging = LoggingConfig {
        format: LogFormat::from_setting(config.logging.format.as_deref()),
        file: config.logging.file.as_deref(),
        ..LoggingConfig::default()
    };
    tunedrop_telemetry::init_logging(&logging)
        .map_err(|err| AppError::telemetry("telemetry.init", err))
}

fn build_gate(config: &ServiceConfig) -> AppResult<Option<RateLimitGate>> {
    let settings = &config.rate_limit;
    if !settings.enabled {
        warn!("download rate limiting disabled");
        return Ok(None);
    }
    let store: Arc<dyn CounterStore> = match settings.backend {
        RateLimitBackend::Memory => Arc::new(MemoryCounterStore::new()),
        RateLimitBackend::Redis => Arc::new(
            RedisCounterStore::open(&settings.url)
                .map_err(|err| AppError::rate_limit("rate_limit.open_store", err))?,
        ),
    };
    info!(
        backend = ?settings.backend,
        times = settings.times,
        window_secs = settings.window.as_secs(),
        "download rate limiting enabled"
    );
    Ok(Some(
        RateLimitGate::new(store, settings.times, settings.window)
            .trust_forwarded_for(settings.trust_forwarded_for),
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "failed to install ctrl-c handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
