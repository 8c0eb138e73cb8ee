use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use fc_app::{
    AppError, AppResult, BenchmarkData, FloodRunRequest, FlowRunOptions, FlowRunRequest,
    ModelRegistry, RunProgressEvent, RunStage, benchmark, flood_service, forecast_service,
    project_service, query,
};
use fc_results::RunType;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::warn;

#[derive(Parser)]
#[command(name = "fc-cli")]
#[command(about = "floodcast CLI - river flow and flood depth forecasting", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a forecast config and its input tables
    Validate {
        /// Path to the forecast YAML file
        config_path: PathBuf,
    },
    /// Run the river-flow ensemble
    RunFlows {
        /// Path to the forecast YAML file
        config_path: PathBuf,
        /// Time of the first weather step (RFC 3339)
        #[arg(long)]
        start: DateTime<Utc>,
        /// Start from the state a previous run left
        #[arg(long)]
        continue_from: Option<String>,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// Predict flood depths and risk from a river-flow run
    RunFlood {
        /// Path to the forecast YAML file
        config_path: PathBuf,
        /// River-flow run ID
        flow_run_id: String,
        /// Skip cache and force re-run
        #[arg(long)]
        no_cache: bool,
    },
    /// List cached runs for the config's catchment
    Runs {
        /// Path to the forecast YAML file
        config_path: PathBuf,
    },
    /// Show details of a cached run
    ShowRun {
        /// Path to the forecast YAML file
        config_path: PathBuf,
        /// Run ID to display
        run_id: String,
    },
    /// Export flows of one member, or of every member at one lead step
    ExportFlows {
        /// Path to the forecast YAML file
        config_path: PathBuf,
        /// Run ID
        run_id: String,
        /// Ensemble member index
        #[arg(long, conflicts_with = "lead")]
        member: Option<usize>,
        /// Lead step index
        #[arg(long)]
        lead: Option<usize>,
        /// Output CSV file path (optional, defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Compare a river-flow run against benchmark tables
    Benchmark {
        /// Path to the forecast YAML file
        config_path: PathBuf,
        /// River-flow run ID
        run_id: String,
        /// Directory holding Q_, qp_, Eq_ and F0_Benchmark.csv
        benchmark_dir: PathBuf,
        /// Relative tolerance
        #[arg(long, default_value_t = fc_app::DEFAULT_TOLERANCE)]
        tolerance: f64,
        /// Write the run's tables into the directory instead of comparing
        #[arg(long)]
        write: bool,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> AppResult<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate { config_path } => cmd_validate(&config_path),
        Commands::RunFlows {
            config_path,
            start,
            continue_from,
            no_cache,
        } => cmd_run_flows(&config_path, start, continue_from, !no_cache),
        Commands::RunFlood {
            config_path,
            flow_run_id,
            no_cache,
        } => cmd_run_flood(&config_path, &flow_run_id, !no_cache),
        Commands::Runs { config_path } => cmd_runs(&config_path),
        Commands::ShowRun {
            config_path,
            run_id,
        } => cmd_show_run(&config_path, &run_id),
        Commands::ExportFlows {
            config_path,
            run_id,
            member,
            lead,
            output,
        } => cmd_export_flows(&config_path, &run_id, member, lead, output.as_deref()),
        Commands::Benchmark {
            config_path,
            run_id,
            benchmark_dir,
            tolerance,
            write,
            json,
        } => cmd_benchmark(&config_path, &run_id, &benchmark_dir, tolerance, write, json),
    }
}

fn cmd_validate(config_path: &Path) -> AppResult<()> {
    println!("Validating config: {}", config_path.display());
    let config = project_service::load_config(config_path)?;
    let inputs = project_service::load_flow_inputs(config_path, &config)?;
    let summary = project_service::summarize(&config);
    println!("✓ Config is valid");
    println!("  Catchment: {} ({:.2} km²)", summary.catchment_id, summary.area_km2);
    println!(
        "  Weather: {} steps at {} per day",
        inputs.weather.len(),
        summary.steps_per_day
    );
    println!("  Parameter rows: {}", inputs.parameters.len());

    if summary.has_flood_model {
        let model = project_service::load_flood_model(config_path, &config)?;
        println!(
            "  Flood model: {} ({} cells)",
            model.version(),
            model.cells().len()
        );
    }
    Ok(())
}

fn progress_printer() -> impl FnMut(RunProgressEvent) {
    let mut last_emit = Instant::now();
    let mut last_stage = String::new();
    move |event| {
        let stage_key = format!("{:?}", event.stage);
        let emit_now = stage_key != last_stage || last_emit.elapsed().as_millis() >= 100;
        if emit_now {
            render_cli_progress(&event);
            last_stage = stage_key;
            last_emit = Instant::now();
        }
    }
}

fn cmd_run_flows(
    config_path: &Path,
    start: DateTime<Utc>,
    continue_from: Option<String>,
    use_cache: bool,
) -> AppResult<()> {
    println!("Running river flow ensemble from {}", start.to_rfc3339());

    let request = FlowRunRequest {
        config_path,
        start,
        options: FlowRunOptions {
            use_cache,
            continue_from,
        },
    };

    let mut printer = progress_printer();
    let response = forecast_service::ensure_flow_run_with_progress(&request, Some(&mut printer))?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ River flows completed: {}", response.run_id);
    }
    println!("  Elapsed: {:.3}s", response.elapsed_s);

    let (_manifest, records) = forecast_service::load_flow_run(config_path, &response.run_id)?;
    let summary = query::get_flow_summary(&records)?;
    println!("  Steps: {}", summary.steps);
    println!("  Members: {}", summary.members);
    println!("  Peak flow: {:.3} m³/s", summary.peak_flow_m3s);

    Ok(())
}

fn cmd_run_flood(config_path: &Path, flow_run_id: &str, use_cache: bool) -> AppResult<()> {
    println!("Predicting flood depths from run: {}", flow_run_id);

    let request = FloodRunRequest {
        config_path,
        flow_run_id,
        use_cache,
    };
    let registry = ModelRegistry::new();
    let mut printer = progress_printer();
    let response =
        flood_service::ensure_flood_run_with_progress(&request, &registry, Some(&mut printer))?;
    clear_progress_line();

    if response.loaded_from_cache {
        println!("✓ Loaded from cache: {}", response.run_id);
    } else {
        println!("✓ Flood run completed: {}", response.run_id);
    }
    println!("  Elapsed: {:.3}s", response.elapsed_s);
    if !response.loaded_from_cache {
        println!("  Depth rows written: {}", response.cells_written.created);
    }
    if !response.no_flood.is_empty() {
        println!("  No flood at {} timestamps", response.no_flood.len());
    }
    for failure in &response.failures {
        warn!(time = %failure.time, "{}", failure.message);
    }
    if !response.failures.is_empty() {
        println!("  Failed timestamps: {}", response.failures.len());
    }

    let (_manifest, risk, _aggregated) = flood_service::load_flood_run(config_path, &response.run_id)?;
    if let Some(peak) = query::peak_risk(&risk) {
        println!(
            "  Peak risk: {:.1}% at {} ({} flooded cells)",
            100.0 * peak.risk,
            peak.time.to_rfc3339(),
            peak.flooded_cells
        );
    }

    Ok(())
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &RunProgressEvent) {
    match (&event.stage, &event.flood) {
        (RunStage::PredictingDepths, Some(f)) => {
            let width = 28usize;
            let fraction = if f.timestamps == 0 {
                1.0
            } else {
                f.timestamp_index as f64 / f.timestamps as f64
            };
            let filled = ((fraction * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            let mut line = format!(
                "\r[{}] {}/{}  phase={}",
                bar,
                f.timestamp_index + 1,
                f.timestamps,
                event.stage.label()
            );
            if let Some(batch) = f.batch {
                line.push_str(&format!("  batch={}/{}", batch + 1, f.batches));
            }
            line.push_str(&format!("  elapsed={:.1}s", event.elapsed_wall_s));
            print!("{}", line);
            let _ = io::stdout().flush();
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
    }
}

fn cmd_runs(config_path: &Path) -> AppResult<()> {
    let runs = forecast_service::list_runs(config_path)?;

    if runs.is_empty() {
        println!("No cached runs found");
    } else {
        println!("Cached runs for catchment '{}':", runs[0].catchment_id);
        for manifest in runs {
            let kind = match manifest.run_type {
                RunType::RiverFlow { .. } => "flow",
                RunType::Flood { .. } => "flood",
            };
            println!("  {} [{}] ({})", manifest.run_id, kind, manifest.timestamp);
        }
    }
    Ok(())
}

fn cmd_show_run(config_path: &Path, run_id: &str) -> AppResult<()> {
    println!("Loading run: {}", run_id);

    let manifest = forecast_service::load_manifest(config_path, run_id)?;
    println!("\nRun Summary:");
    println!("  Catchment: {}", manifest.catchment_id);
    println!("  Start: {}", manifest.start.to_rfc3339());
    println!("  Created: {}", manifest.timestamp);

    match manifest.run_type {
        RunType::RiverFlow {
            steps,
            members,
            dt_days,
        } => {
            let (_manifest, records) = forecast_service::load_flow_run(config_path, run_id)?;
            let summary = query::get_flow_summary(&records)?;
            println!("  Type: river flow ({} x {}, dt = {} d)", steps, members, dt_days);
            println!(
                "  Time range: {} - {}",
                summary.time_range.0.to_rfc3339(),
                summary.time_range.1.to_rfc3339()
            );
            println!("  Peak flow: {:.3} m³/s", summary.peak_flow_m3s);
        }
        RunType::Flood {
            source_run,
            timestamps,
            failed,
        } => {
            let (_manifest, risk, aggregated) = flood_service::load_flood_run(config_path, run_id)?;
            println!("  Type: flood (from {})", source_run);
            println!("  Model version: {}", manifest.model_version);
            println!("  Timestamps: {} ({} failed)", timestamps, failed);
            println!("  Aggregated bins: {}", aggregated.len());
            println!("\nRisk:");
            for point in risk {
                println!(
                    "  {}  {:>6.1}%  ({} cells)",
                    point.time.to_rfc3339(),
                    100.0 * point.risk,
                    point.flooded_cells
                );
            }
        }
    }

    Ok(())
}

fn cmd_export_flows(
    config_path: &Path,
    run_id: &str,
    member: Option<usize>,
    lead: Option<usize>,
    output: Option<&Path>,
) -> AppResult<()> {
    let (_manifest, records) = forecast_service::load_flow_run(config_path, run_id)?;

    // Build CSV
    let (csv, points) = match (member, lead) {
        (_, Some(lead)) => {
            let flows = query::ensemble_at_lead(&records, lead)?;
            let mut csv = String::from("member,flow_m3s\n");
            for (m, q) in flows.iter().enumerate() {
                csv.push_str(&format!("{},{}\n", m, q));
            }
            (csv, flows.len())
        }
        (member, None) => {
            let series = query::extract_member_series(&records, member.unwrap_or(0))?;
            let mut csv = String::from("time,flow_m3s\n");
            for (t, q) in &series {
                csv.push_str(&format!("{},{}\n", t.to_rfc3339(), q));
            }
            (csv, series.len())
        }
    };

    // Write to file or stdout
    if let Some(path) = output {
        std::fs::write(path, csv)?;
        println!("✓ Exported {} data points to {}", points, path.display());
    } else {
        print!("{}", csv);
    }

    Ok(())
}

fn cmd_benchmark(
    config_path: &Path,
    run_id: &str,
    benchmark_dir: &Path,
    tolerance: f64,
    write: bool,
    json: bool,
) -> AppResult<()> {
    let (_manifest, records) = forecast_service::load_flow_run(config_path, run_id)?;
    let state = forecast_service::next_state(config_path, run_id)?;
    let data = BenchmarkData::from_records(&records, &state)?;

    if write {
        benchmark::write_benchmark(&data, benchmark_dir)?;
        println!("✓ Wrote benchmark tables to {}", benchmark_dir.display());
        return Ok(());
    }

    let report = benchmark::compare_with_benchmark(&data, benchmark_dir, tolerance)?;
    if json {
        let text = serde_json::to_string_pretty(&report)
            .map_err(|e| AppError::Benchmark(e.to_string()))?;
        println!("{}", text);
    } else {
        println!("Benchmark comparison (tolerance {:e}):", report.tolerance);
        for check in &report.checks {
            let mark = if check.passed { "✓" } else { "✗" };
            print!(
                "  {} {:<3} {} values, max relative error {:.3e}",
                mark, check.name, check.values, check.max_relative_error
            );
            if let Some(message) = &check.message {
                print!("  ({})", message);
            }
            println!();
        }
    }

    if report.passed() {
        Ok(())
    } else {
        Err(AppError::Benchmark(format!(
            "run {} differs from {}",
            run_id,
            benchmark_dir.display()
        )))
    }
}
