//! Shared state handed to every handler.

use tunedrop_telemetry::Metrics;

use crate::http::rate_limit::RateLimitGate;
use crate::orchestrator::DownloadOrchestrator;

/// Dependencies reachable from handlers and middleware.
pub struct ApiState {
    pub(crate) orchestrator: DownloadOrchestrator,
    pub(crate) gate: Option<RateLimitGate>,
    pub(crate) telemetry: Metrics,
}

impl ApiState {
    /// Bundle the orchestrator, the optional admission gate and telemetry.
    #[must_use]
    pub const fn new(
        orchestrator: DownloadOrchestrator,
        gate: Option<RateLimitGate>,
        telemetry: Metrics,
    ) -> Self {
        Self {
            orchestrator,
            gate,
            telemetry,
        }
    }
}
