use chrono::{TimeZone, Utc};
use fc_core::CellId;
use fc_flood::{AggregatedDepth, BoundingBox, DepthStatistics, RiskPoint};
use fc_hydro::StoreState;
use fc_results::*;

fn scratch(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(format!("fc_results_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

fn manifest(run_id: &str, catchment: &str, timestamp: &str) -> RunManifest {
    RunManifest {
        run_id: run_id.to_string(),
        catchment_id: catchment.to_string(),
        timestamp: timestamp.to_string(),
        start: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
        run_type: RunType::RiverFlow {
            steps: 2,
            members: 1,
            dt_days: 0.25,
        },
        model_version: "v1".to_string(),
    }
}

#[test]
fn save_and_load_flow_run() {
    let store = RunStore::new(scratch("flows")).unwrap();
    let m = manifest("run_a", "majalaya", "2024-01-01T00:00:00Z");
    let t0 = m.start;
    let flows = vec![
        FlowRecord {
            lead: 0,
            member: 0,
            time: t0,
            flow_m3s: 12.5,
            rainfall: 4.0,
            pet: 3.1,
        },
        FlowRecord {
            lead: 1,
            member: 0,
            time: t0 + chrono::Duration::hours(6),
            flow_m3s: 13.0,
            rainfall: 0.0,
            pet: 3.3,
        },
    ];
    let next = vec![StoreState {
        storage: 41.5,
        slow_flow: 1.25,
        fast_flow: 0.5,
    }];

    store.save_flow_run(&m, &flows, &next).unwrap();

    assert!(store.has_run("run_a"));
    assert_eq!(store.load_manifest("run_a").unwrap(), m);
    assert_eq!(store.load_flows("run_a").unwrap(), flows);
    assert_eq!(store.load_next_state("run_a").unwrap(), next);
}

#[test]
fn save_and_load_flood_run() {
    let store = RunStore::new(scratch("flood")).unwrap();
    let mut m = manifest("run_f", "majalaya", "2024-01-01T01:00:00Z");
    m.run_type = RunType::Flood {
        source_run: "run_a".to_string(),
        timestamps: 1,
        failed: 0,
    };
    let time = m.start;
    let stats = DepthStatistics {
        lower_centile: 0.1,
        mid_lower_centile: 0.2,
        median: 0.3,
        upper_centile: 0.9,
    };
    let depths = vec![DepthPrediction {
        time,
        cell: CellId::from_index(4),
        model_version: "v1".to_string(),
        statistics: stats,
    }];
    let aggregated = vec![AggregatedRecord {
        time,
        depth: AggregatedDepth {
            bounding_box: BoundingBox::new(0.0, 0.0, 10.0, 10.0),
            level: 32,
            contributors: 1,
            statistics: stats,
        },
    }];
    let risk = vec![RiskPoint {
        time,
        flooded_cells: 1,
        risk: 0.0,
    }];

    store.save_flood_run(&m, &depths, &aggregated, &risk).unwrap();
    assert_eq!(store.load_depths("run_f").unwrap(), depths);
    assert_eq!(store.load_aggregated("run_f").unwrap(), aggregated);
    assert_eq!(store.load_risk("run_f").unwrap(), risk);
}

#[test]
fn list_runs_by_catchment() {
    let store = RunStore::new(scratch("list")).unwrap();
    store
        .save_manifest(&manifest("run2", "c1", "2024-01-02T00:00:00Z"))
        .unwrap();
    store
        .save_manifest(&manifest("run1", "c1", "2024-01-01T00:00:00Z"))
        .unwrap();
    store
        .save_manifest(&manifest("run3", "c2", "2024-01-03T00:00:00Z"))
        .unwrap();

    let c1 = store.list_runs("c1").unwrap();
    assert_eq!(c1.len(), 2);
    assert_eq!(c1[0].run_id, "run1");
    assert_eq!(store.list_runs("c2").unwrap().len(), 1);

    store.delete_run("run3").unwrap();
    assert!(store.list_runs("c2").unwrap().is_empty());
    assert!(matches!(
        store.load_manifest("run3"),
        Err(ResultsError::RunNotFound { .. })
    ));
}
