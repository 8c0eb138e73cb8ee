//! Prediction, aggregation and risk over a small synthetic floodplain.

use chrono::{TimeZone, Utc};
use fc_core::CellId;
use fc_flood::{
    ChannelMask, EnsembleFlows, FloodCellParameters, FloodModel, GridOptions, GridRun,
    CellOutcome, RegressionForm, RiskThresholds, aggregate_levels, predict_grid, risk_series,
};

const SIDE: u32 = 16;

/// Depth rises towards the low corner of the plain.
fn model() -> FloodModel {
    let cells = (0..SIDE * SIDE)
        .map(|k| {
            let (i, j) = (k % SIDE, k / SIDE);
            let elevation = (i + j) as f64 * 0.25;
            FloodCellParameters {
                id: CellId::from_index(k),
                x: i as f64 * 10.0 + 5.0,
                y: j as f64 * 10.0 + 5.0,
                size: 10.0,
                betas: vec![-elevation, 0.05],
                min_q: Some(5.0),
            }
        })
        .collect();
    FloodModel::new("plain-v1", RegressionForm::Polynomial, cells).unwrap()
}

#[test]
fn full_pipeline_for_one_timestamp() {
    let model = model();
    let flows = EnsembleFlows::single((0..50).map(|m| 20.0 + m as f64).collect()).unwrap();

    let river = vec![(0.0, 0.0), (20.0, 0.0), (20.0, 20.0), (0.0, 20.0)];
    let mask = ChannelMask::new(vec![river]).unwrap();

    let mut stored = Vec::new();
    let mut batches = 0;
    let run = predict_grid(
        &flows,
        &model,
        &mask,
        &GridOptions {
            batch_size: 64,
            resume_from_batch: 0,
        },
        |_, batch| {
            batches += 1;
            for p in batch {
                if let CellOutcome::Store(stats) = p.outcome {
                    stored.push((p.cell, stats));
                }
            }
            Ok(())
        },
    )
    .unwrap();

    assert_eq!(batches, 4);
    let GridRun::Completed { masked, stored: n, .. } = run else {
        panic!("expected a completed run, got {run:?}");
    };
    assert_eq!(masked, 4);
    assert_eq!(n, stored.len());
    assert!(stored.iter().all(|(_, s)| s.upper_centile > 0.0));
    assert!(stored.iter().all(|(id, _)| id.index() % SIDE >= 2 || id.index() / SIDE >= 2));

    let footprints: Vec<_> = stored
        .iter()
        .map(|(id, stats)| (model.cells()[id.index() as usize].bounding_box(), *stats))
        .collect();
    let aggregated = aggregate_levels(&footprints, &[2, 4]).unwrap();
    assert!(aggregated.iter().any(|a| a.level == 2));
    assert!(aggregated.iter().all(|a| a.statistics.upper_centile > 0.0));

    let time = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
    let timed: Vec<_> = stored.iter().map(|(_, s)| (time, *s)).collect();
    let thresholds = RiskThresholds::new(10, 200).unwrap();
    let series = risk_series(&timed, &thresholds);
    assert_eq!(series.len(), 1);
    assert!(series[0].risk > 0.0 && series[0].risk <= 1.0);
}

#[test]
fn low_flow_is_no_flood() {
    let flows = EnsembleFlows::single(vec![1.0, 2.0, 4.9]).unwrap();
    let run = predict_grid(
        &flows,
        &model(),
        &ChannelMask::default(),
        &GridOptions::default(),
        |_, _| panic!("no batch expected"),
    )
    .unwrap();
    assert_eq!(run, GridRun::NoFlood);
}
