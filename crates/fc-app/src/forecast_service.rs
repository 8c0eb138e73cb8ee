//! River-flow run execution and caching.

use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use fc_hydro::{RiverFlowForecast, StoreState, generate_river_flows};
use fc_results::{FlowRecord, RunInputs, RunManifest, RunStore, RunType};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::progress::{RunKind, RunProgressEvent, RunStage};
use crate::project_service;

#[derive(Debug, Clone)]
pub struct FlowRunOptions {
    pub use_cache: bool,
    /// Start from the state a previous run left instead of the config's table.
    pub continue_from: Option<String>,
}

impl Default for FlowRunOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            continue_from: None,
        }
    }
}

pub struct FlowRunRequest<'a> {
    pub config_path: &'a Path,
    /// Time of the first weather step
    pub start: DateTime<Utc>,
    pub options: FlowRunOptions,
}

#[derive(Debug, Clone)]
pub struct FlowRunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    /// Present when the run was simulated rather than loaded.
    pub forecast: Option<RiverFlowForecast>,
    pub elapsed_s: f64,
}

fn emit(
    progress_cb: &mut Option<&mut dyn FnMut(RunProgressEvent)>,
    stage: RunStage,
    started: Instant,
    message: &str,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(RunProgressEvent::stage(
            RunKind::RiverFlow,
            stage,
            started.elapsed().as_secs_f64(),
            Some(message.to_string()),
        ));
    }
}

pub fn ensure_flow_run(request: &FlowRunRequest) -> AppResult<FlowRunResponse> {
    ensure_flow_run_with_progress(request, None)
}

/// Execute or load a river-flow run and stream progress events.
pub fn ensure_flow_run_with_progress(
    request: &FlowRunRequest,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<FlowRunResponse> {
    let started = Instant::now();

    emit(&mut progress_cb, RunStage::LoadingConfig, started, "Loading config");
    let config = project_service::load_config(request.config_path)?;
    let store = RunStore::for_config(request.config_path)?;

    emit(&mut progress_cb, RunStage::ReadingInputs, started, "Reading input tables");
    let mut inputs = project_service::load_flow_inputs(request.config_path, &config)?;
    if let Some(previous) = &request.options.continue_from {
        let state = store.load_next_state(previous)?;
        if state.len() != inputs.parameters.len() {
            return Err(AppError::InvalidInput(format!(
                "run {previous} left {} states for {} parameter rows",
                state.len(),
                inputs.parameters.len()
            )));
        }
        inputs.initial_state = state;
    }

    emit(&mut progress_cb, RunStage::CheckingCache, started, "Checking run cache");
    let model_version = project_service::flood_settings(&config)
        .map(|f| f.model_version.clone())
        .unwrap_or_default();
    let run_id = fc_results::compute_run_id(&RunInputs {
        config: &config,
        start: request.start,
        weather: &inputs.records,
        parameters: &inputs.parameters,
        initial_state: &inputs.initial_state,
        model_version: &model_version,
    });

    if request.options.use_cache && store.has_run(&run_id) {
        emit(&mut progress_cb, RunStage::LoadingCachedResult, started, "Loading cached run");
        let manifest = store.load_manifest(&run_id)?;
        info!(%run_id, "river flow run loaded from cache");
        emit(&mut progress_cb, RunStage::Completed, started, "Completed");
        return Ok(FlowRunResponse {
            run_id,
            manifest,
            loaded_from_cache: true,
            forecast: None,
            elapsed_s: started.elapsed().as_secs_f64(),
        });
    }

    emit(&mut progress_cb, RunStage::SimulatingFlows, started, "Simulating ensemble");
    let forecast = generate_river_flows(
        &inputs.weather,
        &inputs.catchment,
        &inputs.parameters,
        &inputs.initial_state,
    )?;

    emit(&mut progress_cb, RunStage::SavingResults, started, "Saving results");
    let manifest = RunManifest {
        run_id: run_id.clone(),
        catchment_id: config.catchment.id.clone(),
        timestamp: Utc::now().to_rfc3339(),
        start: request.start,
        run_type: RunType::RiverFlow {
            steps: forecast.flows.steps(),
            members: forecast.flows.members(),
            dt_days: forecast.dt,
        },
        model_version,
    };
    store.save_flow_run(
        &manifest,
        &flow_records(&forecast, request.start),
        &forecast.next_state,
    )?;
    info!(%run_id, members = forecast.flows.members(), "river flow run saved");

    emit(&mut progress_cb, RunStage::Completed, started, "Completed");
    Ok(FlowRunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        forecast: Some(forecast),
        elapsed_s: started.elapsed().as_secs_f64(),
    })
}

/// Time of lead step `lead` for a run starting at `start`.
pub fn lead_time(start: DateTime<Utc>, lead: usize, dt_days: f64) -> DateTime<Utc> {
    let seconds = (lead as f64 * dt_days * 86_400.0).round() as i64;
    start + Duration::seconds(seconds)
}

/// One record per (lead, member), lead-major.
pub fn flow_records(forecast: &RiverFlowForecast, start: DateTime<Utc>) -> Vec<FlowRecord> {
    let flows = &forecast.flows;
    let mut records = Vec::with_capacity(flows.steps() * flows.members());
    for lead in 0..flows.steps() {
        let time = lead_time(start, lead, forecast.dt);
        for member in 0..flows.members() {
            records.push(FlowRecord {
                lead,
                member,
                time,
                flow_m3s: flows.get(lead, member).unwrap_or(f64::NAN),
                rainfall: forecast.rainfall[lead],
                pet: forecast.pet[lead],
            });
        }
    }
    records
}

/// List runs for the config's catchment, most recent first.
pub fn list_runs(config_path: &Path) -> AppResult<Vec<RunManifest>> {
    let config = project_service::load_config(config_path)?;
    let store = RunStore::for_config(config_path)?;

    let mut runs = store.list_runs(&config.catchment.id)?;
    runs.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
    Ok(runs)
}

pub fn load_manifest(config_path: &Path, run_id: &str) -> AppResult<RunManifest> {
    let store = RunStore::for_config(config_path)?;
    Ok(store.load_manifest(run_id)?)
}

/// Load a river-flow run's manifest and records.
pub fn load_flow_run(config_path: &Path, run_id: &str) -> AppResult<(RunManifest, Vec<FlowRecord>)> {
    let store = RunStore::for_config(config_path)?;

    let manifest = store.load_manifest(run_id)?;
    let records = store.load_flows(run_id)?;

    Ok((manifest, records))
}

/// Next initial state of a stored run.
pub fn next_state(config_path: &Path, run_id: &str) -> AppResult<Vec<StoreState>> {
    let store = RunStore::for_config(config_path)?;
    Ok(store.load_next_state(run_id)?)
}
