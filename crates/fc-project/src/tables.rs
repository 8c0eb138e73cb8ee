//! CSV tables referenced by a forecast configuration.
//!
//! - **Weather** (header): `relative_humidity,max_temperature,min_temperature,wind_u,wind_v,precipitation`
//! - **Catchment parameters** (no header): `Smax,qmax,k,Tr`, extra columns ignored
//! - **Initial conditions** (no header): `storage,slow_flow,fast_flow`
//! - **Flood parameters** (header): `x,y,size,beta0..betaN[,min_q]`
//! - **Numeric tables** (no header): comma or whitespace separated numbers

use std::io::Read;
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use fc_core::CellId;
use fc_flood::FloodCellParameters;
use fc_hydro::{CatchmentParameters, StoreState, WeatherRecord};

use crate::{ProjectError, ProjectResult};

fn table_error(path: &Path, what: impl Into<String>) -> ProjectError {
    ProjectError::Table {
        path: path.display().to_string(),
        what: what.into(),
    }
}

fn parse_field(path: &Path, record: &StringRecord, row: usize, col: usize) -> ProjectResult<f64> {
    let raw = record.get(col).unwrap_or("").trim();
    raw.parse::<f64>()
        .map_err(|_| table_error(path, format!("row {row}, column {col}: '{raw}' is not a number")))
}

/// Parse the first `columns` fields of every headerless row.
fn read_fixed_columns(path: &Path, columns: usize) -> ProjectResult<Vec<Vec<f64>>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        if record.len() < columns {
            return Err(table_error(
                path,
                format!("row {row} has {} columns, expected {columns}", record.len()),
            ));
        }
        rows.push(
            (0..columns)
                .map(|col| parse_field(path, &record, row, col))
                .collect::<ProjectResult<Vec<_>>>()?,
        );
    }
    Ok(rows)
}

pub fn read_weather(path: &Path) -> ProjectResult<Vec<WeatherRecord>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let records = rdr
        .deserialize()
        .collect::<Result<Vec<WeatherRecord>, csv::Error>>()?;
    if records.is_empty() {
        return Err(table_error(path, "no weather records"));
    }
    Ok(records)
}

pub fn write_weather(path: &Path, records: &[WeatherRecord]) -> ProjectResult<()> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_path(path)?;
    for record in records {
        wtr.serialize(record)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn read_parameters(path: &Path) -> ProjectResult<Vec<CatchmentParameters>> {
    let rows = read_fixed_columns(path, 4)?;
    if rows.is_empty() {
        return Err(table_error(path, "no catchment parameter rows"));
    }
    Ok(rows
        .into_iter()
        .map(|r| CatchmentParameters {
            smax: r[0],
            qmax: r[1],
            k: r[2],
            tr: r[3],
        })
        .collect())
}

pub fn read_initial_conditions(path: &Path) -> ProjectResult<Vec<StoreState>> {
    let rows = read_fixed_columns(path, 3)?;
    if rows.is_empty() {
        return Err(table_error(path, "no initial conditions"));
    }
    Ok(rows
        .into_iter()
        .map(|r| StoreState {
            storage: r[0],
            slow_flow: r[1],
            fast_flow: r[2],
        })
        .collect())
}

pub fn write_initial_conditions(path: &Path, state: &[StoreState]) -> ProjectResult<()> {
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(path)?;
    for s in state {
        wtr.write_record([
            s.storage.to_string(),
            s.slow_flow.to_string(),
            s.fast_flow.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Cell ids follow row order.
pub fn read_flood_parameters(path: &Path) -> ProjectResult<Vec<FloodCellParameters>> {
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let headers = rdr.headers()?.clone();

    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let (Some(x_col), Some(y_col), Some(size_col)) = (column("x"), column("y"), column("size"))
    else {
        return Err(table_error(path, "header must name x, y and size"));
    };
    let min_q_col = column("min_q");

    let mut beta_cols: Vec<(usize, usize)> = headers
        .iter()
        .enumerate()
        .filter_map(|(col, h)| {
            h.strip_prefix("beta")
                .and_then(|n| n.parse::<usize>().ok())
                .map(|order| (order, col))
        })
        .collect();
    beta_cols.sort_unstable();
    if beta_cols.is_empty() {
        return Err(table_error(path, "no beta columns"));
    }
    if let Some(gap) = beta_cols.iter().enumerate().find(|(i, (order, _))| i != order) {
        return Err(table_error(path, format!("beta columns skip beta{}", gap.0)));
    }

    let mut cells = Vec::new();
    for (row, result) in rdr.records().enumerate() {
        let record = result?;
        let betas = beta_cols
            .iter()
            .map(|&(_, col)| parse_field(path, &record, row, col))
            .collect::<ProjectResult<Vec<_>>>()?;
        let min_q = match min_q_col {
            Some(col) if !record.get(col).unwrap_or("").trim().is_empty() => {
                Some(parse_field(path, &record, row, col)?)
            }
            _ => None,
        };
        let index = u32::try_from(row).map_err(|_| table_error(path, "too many cells"))?;
        cells.push(FloodCellParameters {
            id: CellId::from_index(index),
            x: parse_field(path, &record, row, x_col)?,
            y: parse_field(path, &record, row, y_col)?,
            size: parse_field(path, &record, row, size_col)?,
            betas,
            min_q,
        });
    }
    if cells.is_empty() {
        return Err(table_error(path, "no flood cells"));
    }
    Ok(cells)
}

/// Read a headerless numeric table separated by commas or whitespace.
pub fn read_numeric_table(path: &Path) -> ProjectResult<Vec<Vec<f64>>> {
    let mut content = String::new();
    std::fs::File::open(path)?.read_to_string(&mut content)?;
    parse_numeric_table(&content).map_err(|what| table_error(path, what))
}

pub fn parse_numeric_table(content: &str) -> Result<Vec<Vec<f64>>, String> {
    let mut rows = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let row = line
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|f| !f.is_empty())
            .map(|f| {
                f.parse::<f64>()
                    .map_err(|_| format!("line {}: '{f}' is not a number", line_no + 1))
            })
            .collect::<Result<Vec<_>, _>>()?;
        if let Some(first) = rows.first().map(Vec::len)
            && first != row.len()
        {
            return Err(format!(
                "line {} has {} values, expected {first}",
                line_no + 1,
                row.len()
            ));
        }
        rows.push(row);
    }
    Ok(rows)
}
