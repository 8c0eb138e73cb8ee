//! Progress events streamed to front ends while a run executes.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunKind {
    RiverFlow,
    Flood,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RunStage {
    LoadingConfig,
    CheckingCache,
    LoadingCachedResult,
    ReadingInputs,
    SimulatingFlows,
    PredictingDepths,
    Aggregating,
    ComputingRisk,
    SavingResults,
    Completed,
}

impl RunStage {
    pub fn label(&self) -> &'static str {
        match self {
            RunStage::LoadingConfig => "Loading config",
            RunStage::CheckingCache => "Checking cache",
            RunStage::LoadingCachedResult => "Loading cached result",
            RunStage::ReadingInputs => "Reading inputs",
            RunStage::SimulatingFlows => "Simulating flows",
            RunStage::PredictingDepths => "Predicting depths",
            RunStage::Aggregating => "Aggregating",
            RunStage::ComputingRisk => "Computing risk",
            RunStage::SavingResults => "Saving results",
            RunStage::Completed => "Completed",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FloodProgress {
    pub timestamp_index: usize,
    pub timestamps: usize,
    pub batch: Option<usize>,
    pub batches: usize,
}

#[derive(Debug, Clone)]
pub struct RunProgressEvent {
    pub kind: RunKind,
    pub stage: RunStage,
    pub elapsed_wall_s: f64,
    pub message: Option<String>,
    pub flood: Option<FloodProgress>,
}

impl RunProgressEvent {
    pub fn stage(kind: RunKind, stage: RunStage, elapsed_wall_s: f64, message: Option<String>) -> Self {
        Self {
            kind,
            stage,
            elapsed_wall_s,
            message,
            flood: None,
        }
    }
}
