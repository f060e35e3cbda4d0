pub mod config;
pub mod models;
pub mod db;
pub mod rubric;
pub mod pipeline;

use tracing_subscriber::EnvFilter;

pub use pipeline::analysis::{
    AnalysisError, AnalysisEvent, AnalysisOutcome, AnalysisRequest, AnalysisRunner, RunHandle,
    RunStatus,
};

/// Install the global tracing subscriber. `RUST_LOG` wins over the default
/// filter. Safe to call more than once; later calls are no-ops.
pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .try_init();

    tracing::info!("{} v{} logging initialized", config::APP_NAME, config::APP_VERSION);
}
