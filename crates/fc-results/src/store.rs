//! Run storage API.
//!
//! Each run lives in its own directory holding `manifest.json` and one JSONL
//! file per record kind.

use crate::types::{AggregatedRecord, DepthPrediction, FlowRecord, RunManifest};
use crate::{ResultsError, ResultsResult};
use fc_flood::RiskPoint;
use fc_hydro::StoreState;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST: &str = "manifest.json";
const FLOWS: &str = "flows.jsonl";
const DEPTHS: &str = "depths.jsonl";
const AGGREGATED: &str = "aggregated.jsonl";
const RISK: &str = "risk.jsonl";
const NEXT_STATE: &str = "next_state.csv";

#[derive(Clone)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store under `.floodcast/runs` next to the config file.
    pub fn for_config(config_path: &Path) -> ResultsResult<Self> {
        let config_dir = config_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "config path has no parent directory".to_string(),
            })?;
        let runs_dir = config_dir.join(".floodcast").join("runs");
        Self::new(runs_dir)
    }

    pub fn root(&self) -> &Path {
        &self.root_dir
    }

    fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    pub fn has_run(&self, run_id: &str) -> bool {
        self.run_dir(run_id).join(MANIFEST).exists()
    }

    pub fn save_manifest(&self, manifest: &RunManifest) -> ResultsResult<()> {
        let run_dir = self.run_dir(&manifest.run_id);
        fs::create_dir_all(&run_dir)?;
        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(run_dir.join(MANIFEST), manifest_json)?;
        Ok(())
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        let manifest_path = self.run_dir(run_id).join(MANIFEST);

        if !manifest_path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(manifest_path)?;
        let manifest = serde_json::from_str(&content)?;
        Ok(manifest)
    }

    /// Save a river-flow run: manifest, flow records and the next state.
    pub fn save_flow_run(
        &self,
        manifest: &RunManifest,
        flows: &[FlowRecord],
        next_state: &[StoreState],
    ) -> ResultsResult<()> {
        self.save_manifest(manifest)?;
        let run_dir = self.run_dir(&manifest.run_id);
        write_jsonl(&run_dir.join(FLOWS), flows)?;
        fc_project::tables::write_initial_conditions(&run_dir.join(NEXT_STATE), next_state)?;
        Ok(())
    }

    pub fn load_flows(&self, run_id: &str) -> ResultsResult<Vec<FlowRecord>> {
        self.load_records(run_id, FLOWS)
    }

    pub fn next_state_path(&self, run_id: &str) -> PathBuf {
        self.run_dir(run_id).join(NEXT_STATE)
    }

    pub fn load_next_state(&self, run_id: &str) -> ResultsResult<Vec<StoreState>> {
        let path = self.next_state_path(run_id);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        Ok(fc_project::tables::read_initial_conditions(&path)?)
    }

    /// Save a flood run's depth, aggregate and risk records.
    pub fn save_flood_run(
        &self,
        manifest: &RunManifest,
        depths: &[DepthPrediction],
        aggregated: &[AggregatedRecord],
        risk: &[RiskPoint],
    ) -> ResultsResult<()> {
        self.save_manifest(manifest)?;
        let run_dir = self.run_dir(&manifest.run_id);
        write_jsonl(&run_dir.join(DEPTHS), depths)?;
        write_jsonl(&run_dir.join(AGGREGATED), aggregated)?;
        write_jsonl(&run_dir.join(RISK), risk)?;
        Ok(())
    }

    pub fn load_depths(&self, run_id: &str) -> ResultsResult<Vec<DepthPrediction>> {
        self.load_records(run_id, DEPTHS)
    }

    pub fn load_aggregated(&self, run_id: &str) -> ResultsResult<Vec<AggregatedRecord>> {
        self.load_records(run_id, AGGREGATED)
    }

    pub fn load_risk(&self, run_id: &str) -> ResultsResult<Vec<RiskPoint>> {
        self.load_records(run_id, RISK)
    }

    fn load_records<T: DeserializeOwned>(&self, run_id: &str, file: &str) -> ResultsResult<Vec<T>> {
        let path = self.run_dir(run_id).join(file);

        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(path)?;
        let mut records = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(line)?);
            }
        }

        Ok(records)
    }

    pub fn list_runs(&self, catchment_id: &str) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && manifest.catchment_id == catchment_id
                {
                    runs.push(manifest);
                }
            }
        }
        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }
}

fn write_jsonl<T: Serialize>(path: &Path, records: &[T]) -> ResultsResult<()> {
    let mut content = String::new();
    for record in records {
        let line = serde_json::to_string(record)?;
        content.push_str(&line);
        content.push('\n');
    }
    fs::write(path, content)?;
    Ok(())
}
