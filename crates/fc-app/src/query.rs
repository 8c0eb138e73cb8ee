//! Query helpers for extracting data from loaded runs.

use chrono::{DateTime, Utc};
use fc_flood::RiskPoint;
use fc_results::{AggregatedRecord, FlowRecord};

use crate::error::{AppError, AppResult};

/// Summary of a river-flow run's records.
#[derive(Debug, Clone)]
pub struct FlowSummary {
    pub time_range: (DateTime<Utc>, DateTime<Utc>),
    pub record_count: usize,
    pub steps: usize,
    pub members: usize,
    pub peak_flow_m3s: f64,
}

pub fn get_flow_summary(records: &[FlowRecord]) -> AppResult<FlowSummary> {
    let (Some(first), Some(last)) = (records.first(), records.last()) else {
        return Err(AppError::InvalidInput("No records in run".to_string()));
    };

    let steps = records.iter().map(|r| r.lead).max().unwrap_or(0) + 1;
    let members = records.iter().map(|r| r.member).max().unwrap_or(0) + 1;
    let peak_flow_m3s = records
        .iter()
        .map(|r| r.flow_m3s)
        .fold(f64::NEG_INFINITY, f64::max);

    Ok(FlowSummary {
        time_range: (first.time, last.time),
        record_count: records.len(),
        steps,
        members,
        peak_flow_m3s,
    })
}

/// Flow series of one ensemble member.
pub fn extract_member_series(
    records: &[FlowRecord],
    member: usize,
) -> AppResult<Vec<(DateTime<Utc>, f64)>> {
    let series: Vec<_> = records
        .iter()
        .filter(|r| r.member == member)
        .map(|r| (r.time, r.flow_m3s))
        .collect();

    if series.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "Unknown ensemble member: {}",
            member
        )));
    }
    Ok(series)
}

/// Flows of every member at one lead step, in member order.
pub fn ensemble_at_lead(records: &[FlowRecord], lead: usize) -> AppResult<Vec<f64>> {
    let mut at_lead: Vec<&FlowRecord> = records.iter().filter(|r| r.lead == lead).collect();
    if at_lead.is_empty() {
        return Err(AppError::InvalidInput(format!("Unknown lead step: {}", lead)));
    }
    at_lead.sort_by_key(|r| r.member);
    Ok(at_lead.into_iter().map(|r| r.flow_m3s).collect())
}

/// Aggregated bins at one level and time.
pub fn aggregated_at(
    records: &[AggregatedRecord],
    time: DateTime<Utc>,
    level: u32,
) -> Vec<AggregatedRecord> {
    records
        .iter()
        .filter(|r| r.time == time && r.depth.level == level)
        .copied()
        .collect()
}

/// Highest-risk point of a flood run.
pub fn peak_risk(points: &[RiskPoint]) -> Option<RiskPoint> {
    points
        .iter()
        .copied()
        .max_by(|a, b| a.risk.total_cmp(&b.risk))
}
