//! River-flow run, cache hit, flood run and benchmark check in a scratch
//! project directory.

use std::path::{Path, PathBuf};

use chrono::{TimeZone, Utc};
use fc_app::*;
use fc_hydro::{StoreState, WeatherRecord};
use fc_project::schema::*;
use fc_project::tables;

const STEPS: usize = 8;
const MEMBERS: usize = 5;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("fc_app_{name}"));
    let _ = std::fs::remove_dir_all(&dir);
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_project(dir: &Path) -> PathBuf {
    let weather: Vec<WeatherRecord> = (0..STEPS)
        .map(|i| WeatherRecord {
            relative_humidity: 80.0,
            max_temperature: 298.0,
            min_temperature: 292.0 + (i % 4) as f64,
            wind_u: 1.5,
            wind_v: -0.5,
            precipitation: if i % 4 == 2 { 8.0 } else { 0.5 },
        })
        .collect();
    tables::write_weather(&dir.join("weather.csv"), &weather).unwrap();

    let params: String = (0..MEMBERS)
        .map(|j| format!("{},{},{},{}\n", 100.0 + 10.0 * j as f64, 20.0, 2.0, 10.0))
        .collect();
    std::fs::write(dir.join("params.csv"), params).unwrap();

    let state = vec![
        StoreState {
            storage: 40.0,
            slow_flow: 2.0,
            fast_flow: 1.0,
        };
        MEMBERS
    ];
    tables::write_initial_conditions(&dir.join("f0.csv"), &state).unwrap();

    // 4 x 4 unit cells, depth = 0.1 q
    let mut flood = String::from("x,y,size,beta0,beta1\n");
    for row in 0..4 {
        for col in 0..4 {
            flood.push_str(&format!("{},{},1.0,0.0,0.1\n", col as f64 + 0.5, row as f64 + 0.5));
        }
    }
    std::fs::write(dir.join("flood.csv"), flood).unwrap();

    let config = ForecastConfig {
        version: 1,
        name: "Scratch".to_string(),
        catchment: CatchmentDef {
            id: "scratch".to_string(),
            name: "Scratch".to_string(),
            area_km2: 212.264,
            altitude_m: 1157.0,
            latitude_deg: -7.125,
        },
        weather: WeatherDef {
            steps_per_day: 4,
            ..WeatherDef::default()
        },
        inputs: InputsDef {
            weather: "weather.csv".into(),
            parameters: "params.csv".into(),
            initial_conditions: "f0.csv".into(),
            flood_parameters: Some("flood.csv".into()),
        },
        flood: Some(FloodDef {
            batch_size: 5,
            aggregation_levels: vec![1, 2, 3, 4],
            channel_cell_count: 2,
            large_flood_count: 10,
            // Covers the first column of cell centres
            river_channels: vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 4.0], [0.0, 4.0]]],
            ..FloodDef::default()
        }),
    };
    let path = dir.join("forecast.yaml");
    save_config(&path, &config).unwrap();
    path
}

#[test]
fn flow_run_is_cached_and_drives_flood_run() {
    let dir = scratch("cycle");
    let config_path = write_project(&dir);
    let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let request = FlowRunRequest {
        config_path: &config_path,
        start,
        options: FlowRunOptions::default(),
    };

    let mut stages = Vec::new();
    let mut on_progress = |event: RunProgressEvent| stages.push(event.stage);
    let first = ensure_flow_run_with_progress(&request, Some(&mut on_progress)).unwrap();
    assert!(!first.loaded_from_cache);
    assert_eq!(stages.first(), Some(&RunStage::LoadingConfig));
    assert_eq!(stages.last(), Some(&RunStage::Completed));

    let forecast = first.forecast.as_ref().unwrap();
    assert_eq!(forecast.flows.steps(), STEPS);
    assert_eq!(forecast.flows.members(), MEMBERS);

    let second = ensure_flow_run(&request).unwrap();
    assert!(second.loaded_from_cache);
    assert_eq!(second.run_id, first.run_id);

    let (manifest, records) = load_flow_run(&config_path, &first.run_id).unwrap();
    assert_eq!(manifest, first.manifest);
    assert_eq!(records.len(), STEPS * MEMBERS);
    let summary = get_flow_summary(&records).unwrap();
    assert_eq!(summary.steps, STEPS);
    assert_eq!(summary.members, MEMBERS);
    assert!(summary.peak_flow_m3s > 0.0);

    let flood = ensure_flood_run(&FloodRunRequest {
        config_path: &config_path,
        flow_run_id: &first.run_id,
        use_cache: true,
    })
    .unwrap();
    assert!(!flood.loaded_from_cache);
    assert!(flood.failures.is_empty(), "{:?}", flood.failures);
    assert!(flood.no_flood.is_empty());

    let depths = fc_results::RunStore::for_config(&config_path)
        .unwrap()
        .load_depths(&flood.run_id)
        .unwrap();
    // 16 cells less the 4 under the channel, at every lead step
    assert_eq!(depths.len(), 12 * STEPS);
    assert!(depths.iter().all(|d| d.statistics.median > 0.0));
    assert_eq!(flood.cells_written.created, depths.len());
    assert_eq!(flood.cells_written.updated, 0);

    let store = fc_results::RunStore::for_config(&config_path).unwrap();
    let risk = store.load_risk(&flood.run_id).unwrap();
    assert_eq!(risk.len(), STEPS);
    assert!(risk.iter().all(|p| p.flooded_cells == 12 && p.risk == 1.0));

    let aggregated = store.load_aggregated(&flood.run_id).unwrap();
    assert!(!aggregated.is_empty());
    for level in 1..=4 {
        assert!(aggregated.iter().any(|a| a.depth.level == level), "level {level}");
    }
    assert!(aggregated.iter().all(|a| (1..=4).contains(&a.depth.level)));

    let again = ensure_flood_run(&FloodRunRequest {
        config_path: &config_path,
        flow_run_id: &first.run_id,
        use_cache: true,
    })
    .unwrap();
    assert!(again.loaded_from_cache);
    assert_eq!(again.cells_written, fc_results::BatchDiff::default());

    let runs = list_runs(&config_path).unwrap();
    assert_eq!(runs.len(), 2);
}

#[test]
fn stored_run_matches_benchmark_written_from_forecast() {
    let dir = scratch("benchmark");
    let config_path = write_project(&dir);
    let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let response = ensure_flow_run(&FlowRunRequest {
        config_path: &config_path,
        start,
        options: FlowRunOptions {
            use_cache: false,
            continue_from: None,
        },
    })
    .unwrap();

    let bench_dir = dir.join("benchmark");
    let forecast = response.forecast.as_ref().unwrap();
    write_benchmark(&BenchmarkData::from_forecast(forecast), &bench_dir).unwrap();

    let (_, records) = load_flow_run(&config_path, &response.run_id).unwrap();
    let state = next_state(&config_path, &response.run_id).unwrap();
    let data = BenchmarkData::from_records(&records, &state).unwrap();
    let report = compare_with_benchmark(&data, &bench_dir, DEFAULT_TOLERANCE).unwrap();
    assert!(report.passed(), "{report:?}");
}

#[test]
fn continued_run_starts_from_previous_state() {
    let dir = scratch("continue");
    let config_path = write_project(&dir);
    let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
    let first = ensure_flow_run(&FlowRunRequest {
        config_path: &config_path,
        start,
        options: FlowRunOptions::default(),
    })
    .unwrap();

    let next = ensure_flow_run(&FlowRunRequest {
        config_path: &config_path,
        start: start + chrono::Duration::days(2),
        options: FlowRunOptions {
            use_cache: true,
            continue_from: Some(first.run_id.clone()),
        },
    })
    .unwrap();
    assert_ne!(next.run_id, first.run_id);
    assert!(!next.loaded_from_cache);
}

#[test]
fn missing_config_is_reported() {
    let dir = scratch("missing");
    let err = load_config(&dir.join("nope.yaml")).unwrap_err();
    assert!(matches!(err, AppError::ConfigFileRead { .. }));
}
