//! Shared application service layer for floodcast.
//!
//! Front ends call into this crate to load forecast configs, run the
//! river-flow and flood cycles with caching, compare runs against
//! benchmark tables, and query stored results.

pub mod benchmark;
pub mod error;
pub mod flood_service;
pub mod forecast_service;
pub mod progress;
pub mod project_service;
pub mod query;

// Re-export key types for convenience
pub use benchmark::{
    BenchmarkCheck, BenchmarkData, BenchmarkReport, DEFAULT_TOLERANCE, compare_with_benchmark,
    write_benchmark,
};
pub use error::{AppError, AppResult};
pub use flood_service::{
    FloodRunRequest, FloodRunResponse, TimestampFailure, ensure_flood_run,
    ensure_flood_run_with_progress, load_flood_run,
};
pub use forecast_service::{
    FlowRunOptions, FlowRunRequest, FlowRunResponse, ensure_flow_run,
    ensure_flow_run_with_progress, list_runs, load_flow_run, load_manifest, next_state,
};
pub use fc_flood::ModelRegistry;
pub use progress::{FloodProgress, RunKind, RunProgressEvent, RunStage};
pub use project_service::{ConfigSummary, load_config, save_config, summarize};
pub use query::{
    FlowSummary, aggregated_at, ensemble_at_lead, extract_member_series, get_flow_summary,
    peak_risk,
};
