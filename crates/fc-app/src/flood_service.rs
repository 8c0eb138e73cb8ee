//! Flood cycle: depth prediction, aggregation and risk for every lead step of
//! a stored river-flow run.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use fc_flood::{
    BoundingBox, DepthStatistics, EnsembleFlows, FloodModel, GridOptions, GridRun, ModelRegistry,
    RiskPoint, aggregate_levels, predict_grid, risk_series,
};
use fc_project::schema::FloodDef;
use fc_results::{
    AggregatedRecord, BatchDiff, FlowRecord, PredictionStore, RunManifest, RunStore, RunType,
};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use crate::error::{AppError, AppResult};
use crate::progress::{FloodProgress, RunKind, RunProgressEvent, RunStage};
use crate::project_service;

pub struct FloodRunRequest<'a> {
    pub config_path: &'a Path,
    /// River-flow run whose ensemble drives the prediction
    pub flow_run_id: &'a str,
    pub use_cache: bool,
}

/// A timestamp whose prediction failed; other timestamps still complete.
#[derive(Debug, Clone, PartialEq)]
pub struct TimestampFailure {
    pub time: DateTime<Utc>,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct FloodRunResponse {
    pub run_id: String,
    pub manifest: RunManifest,
    pub loaded_from_cache: bool,
    pub no_flood: Vec<DateTime<Utc>>,
    pub failures: Vec<TimestampFailure>,
    /// Depth rows written across all committed batches; zero on a cache hit
    pub cells_written: BatchDiff,
    pub elapsed_s: f64,
}

/// Ensemble flows per lead time, in time order.
pub fn ensemble_by_time(records: &[FlowRecord]) -> AppResult<Vec<(DateTime<Utc>, EnsembleFlows)>> {
    let mut by_time: BTreeMap<DateTime<Utc>, Vec<(usize, f64)>> = BTreeMap::new();
    for record in records {
        by_time
            .entry(record.time)
            .or_default()
            .push((record.member, record.flow_m3s));
    }

    by_time
        .into_iter()
        .map(|(time, mut members)| {
            members.sort_by_key(|(member, _)| *member);
            let values = members.into_iter().map(|(_, q)| q).collect();
            Ok((time, EnsembleFlows::single(values)?))
        })
        .collect()
}

fn flood_run_id(flow_run_id: &str, settings: &FloodDef, model: &FloodModel) -> String {
    let mut hasher = Sha256::new();
    hasher.update(flow_run_id.as_bytes());
    hasher.update(serde_json::to_string(settings).unwrap_or_default().as_bytes());
    hasher.update(serde_json::to_string(model.cells()).unwrap_or_default().as_bytes());
    format!("{:x}", hasher.finalize())
}

pub fn ensure_flood_run(request: &FloodRunRequest) -> AppResult<FloodRunResponse> {
    ensure_flood_run_with_progress(request, &ModelRegistry::new(), None)
}

/// Run the flood cycle over a river-flow run, activating the config's model
/// in `registry` first.
pub fn ensure_flood_run_with_progress(
    request: &FloodRunRequest,
    registry: &ModelRegistry,
    mut progress_cb: Option<&mut dyn FnMut(RunProgressEvent)>,
) -> AppResult<FloodRunResponse> {
    let started = Instant::now();
    let mut emit = |stage: RunStage, message: String, flood: Option<FloodProgress>| {
        if let Some(cb) = progress_cb.as_deref_mut() {
            let mut event = RunProgressEvent::stage(
                RunKind::Flood,
                stage,
                started.elapsed().as_secs_f64(),
                Some(message),
            );
            event.flood = flood;
            cb(event);
        }
    };

    emit(RunStage::LoadingConfig, "Loading config".to_string(), None);
    let config = project_service::load_config(request.config_path)?;
    let settings = project_service::flood_settings(&config)?.clone();
    let store = RunStore::for_config(request.config_path)?;

    emit(RunStage::ReadingInputs, "Loading flood model".to_string(), None);
    let model = project_service::load_flood_model(request.config_path, &config)?;
    let run_id = flood_run_id(request.flow_run_id, &settings, &model);

    emit(RunStage::CheckingCache, "Checking run cache".to_string(), None);
    if request.use_cache && store.has_run(&run_id) {
        emit(RunStage::LoadingCachedResult, "Loading cached run".to_string(), None);
        let manifest = store.load_manifest(&run_id)?;
        info!(%run_id, "flood run loaded from cache");
        emit(RunStage::Completed, "Completed".to_string(), None);
        return Ok(FloodRunResponse {
            run_id,
            manifest,
            loaded_from_cache: true,
            no_flood: Vec::new(),
            failures: Vec::new(),
            cells_written: BatchDiff::default(),
            elapsed_s: started.elapsed().as_secs_f64(),
        });
    }

    let source = store.load_manifest(request.flow_run_id)?;
    if !matches!(source.run_type, RunType::RiverFlow { .. }) {
        return Err(AppError::InvalidInput(format!(
            "run {} is not a river-flow run",
            request.flow_run_id
        )));
    }
    let ensembles = ensemble_by_time(&store.load_flows(request.flow_run_id)?)?;

    registry.activate(model);
    let Some(model) = registry.current() else {
        return Err(AppError::Flood("no active flood model".to_string()));
    };
    let mask = settings.channel_mask()?;
    let thresholds = settings.thresholds()?;
    let options = GridOptions {
        batch_size: settings.batch_size,
        resume_from_batch: 0,
    };
    let batches = model.cells().len().div_ceil(settings.batch_size.max(1));
    let boxes: BTreeMap<_, BoundingBox> = model
        .cells()
        .iter()
        .map(|cell| (cell.id, cell.bounding_box()))
        .collect();

    info!(
        %run_id,
        source = request.flow_run_id,
        timestamps = ensembles.len(),
        version = model.version(),
        "flood cycle started"
    );

    let predictions = PredictionStore::new();
    let mut aggregated = Vec::new();
    let mut no_flood = Vec::new();
    let mut failures = Vec::new();
    let mut cells_written = BatchDiff::default();

    for (index, (time, flows)) in ensembles.iter().enumerate() {
        let progress = |batch: Option<usize>| FloodProgress {
            timestamp_index: index,
            timestamps: ensembles.len(),
            batch,
            batches,
        };
        emit(
            RunStage::PredictingDepths,
            format!("Predicting depths at {time}"),
            Some(progress(None)),
        );

        let outcome = predict_grid(flows, &model, &mask, &options, |batch, cells| {
            let diff = predictions.apply_batch(*time, model.version(), cells);
            debug!(
                %time,
                batch,
                created = diff.created,
                updated = diff.updated,
                deleted = diff.deleted,
                "depth batch committed"
            );
            cells_written += diff;
            emit(
                RunStage::PredictingDepths,
                format!("Committed batch {}/{batches}", batch + 1),
                Some(progress(Some(batch))),
            );
            Ok(())
        });

        match outcome {
            Ok(GridRun::NoFlood) => {
                predictions.delete_time(*time);
                no_flood.push(*time);
                continue;
            }
            Ok(GridRun::Completed { .. }) => {}
            Err(e) => {
                // Batches committed before the failure are discarded with the timestamp.
                predictions.delete_time(*time);
                warn!(%time, error = %e, "flood prediction failed for timestamp");
                failures.push(TimestampFailure {
                    time: *time,
                    message: e.to_string(),
                });
                continue;
            }
        }

        emit(
            RunStage::Aggregating,
            format!("Aggregating depths at {time}"),
            Some(progress(None)),
        );
        let cells: Vec<(BoundingBox, DepthStatistics)> = predictions
            .statistics_at(*time, model.version())
            .into_iter()
            .filter_map(|(cell, stats)| boxes.get(&cell).map(|b| (*b, stats)))
            .collect();
        match aggregate_levels(&cells, &settings.aggregation_levels) {
            Ok(depths) => aggregated.extend(
                depths
                    .into_iter()
                    .map(|depth| AggregatedRecord { time: *time, depth }),
            ),
            Err(e) => {
                warn!(%time, error = %e, "aggregation failed for timestamp");
                failures.push(TimestampFailure {
                    time: *time,
                    message: e.to_string(),
                });
            }
        }
    }

    emit(RunStage::ComputingRisk, "Computing flood risk".to_string(), None);
    let depths = predictions.all();
    let medians: Vec<(DateTime<Utc>, DepthStatistics)> =
        depths.iter().map(|p| (p.time, p.statistics)).collect();
    predictions.replace_risk(&risk_series(&medians, &thresholds));
    let risk = predictions.risk();

    emit(RunStage::SavingResults, "Saving results".to_string(), None);
    let manifest = RunManifest {
        run_id: run_id.clone(),
        catchment_id: config.catchment.id.clone(),
        timestamp: Utc::now().to_rfc3339(),
        start: source.start,
        run_type: RunType::Flood {
            source_run: request.flow_run_id.to_string(),
            timestamps: ensembles.len(),
            failed: failures.len(),
        },
        model_version: model.version().to_string(),
    };
    store.save_flood_run(&manifest, &depths, &aggregated, &risk)?;
    info!(
        %run_id,
        predictions = depths.len(),
        bins = aggregated.len(),
        failed = failures.len(),
        "flood run saved"
    );

    emit(RunStage::Completed, "Completed".to_string(), None);
    Ok(FloodRunResponse {
        run_id,
        manifest,
        loaded_from_cache: false,
        no_flood,
        failures,
        cells_written,
        elapsed_s: started.elapsed().as_secs_f64(),
    })
}

/// Load a flood run's manifest, risk series and aggregated bins.
pub fn load_flood_run(
    config_path: &Path,
    run_id: &str,
) -> AppResult<(RunManifest, Vec<RiskPoint>, Vec<AggregatedRecord>)> {
    let store = RunStore::for_config(config_path)?;

    let manifest = store.load_manifest(run_id)?;
    if !matches!(manifest.run_type, RunType::Flood { .. }) {
        return Err(AppError::InvalidInput(format!("run {run_id} is not a flood run")));
    }
    let risk = store.load_risk(run_id)?;
    let aggregated = store.load_aggregated(run_id)?;

    Ok((manifest, risk, aggregated))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(lead: usize, member: usize, flow: f64) -> FlowRecord {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        FlowRecord {
            lead,
            member,
            time: start + Duration::hours(6 * lead as i64),
            flow_m3s: flow,
            rainfall: 0.0,
            pet: 0.0,
        }
    }

    #[test]
    fn ensembles_group_by_time_in_member_order() {
        let records = vec![
            record(1, 1, 4.0),
            record(0, 1, 2.0),
            record(0, 0, 1.0),
            record(1, 0, 3.0),
        ];
        let ensembles = ensemble_by_time(&records).unwrap();
        assert_eq!(ensembles.len(), 2);
        assert!(ensembles[0].0 < ensembles[1].0);
        assert_eq!(ensembles[0].1.values(), &[1.0, 2.0]);
        assert_eq!(ensembles[1].1.values(), &[3.0, 4.0]);
    }
}
