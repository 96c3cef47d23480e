use crate::error::Result;
use crate::pipeline::PipelineResults;
use crate::reports;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

pub const TEMPERATURE_FORECAST_FILE: &str = "temperature_forecast.csv";
pub const RAINFALL_FORECAST_FILE: &str = "rainfall_forecast.csv";
pub const TEMPERATURE_METRICS_FILE: &str = "temperature_metrics.csv";
pub const RAINFALL_METRICS_FILE: &str = "rainfall_metrics.csv";
pub const FEATURES_FILE: &str = "historical_features.csv";
pub const SUMMARY_FILE: &str = "summary.json";

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// Write the four result tables, the engineered history and the JSON run
/// summary into `dir`, creating it if needed. Returns the written paths.
pub fn save_results(results: &PipelineResults, dir: &Path) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(dir)?;
    let mut written = Vec::new();

    let path = dir.join(TEMPERATURE_FORECAST_FILE);
    write_csv(&path, &results.temp_forecast)?;
    written.push(path);

    let path = dir.join(RAINFALL_FORECAST_FILE);
    write_csv(&path, &results.rain_forecast)?;
    written.push(path);

    let path = dir.join(TEMPERATURE_METRICS_FILE);
    write_csv(&path, &[results.temp_metrics])?;
    written.push(path);

    let path = dir.join(RAINFALL_METRICS_FILE);
    write_csv(&path, &[results.rain_metrics])?;
    written.push(path);

    let path = dir.join(FEATURES_FILE);
    write_csv(&path, &results.features)?;
    written.push(path);

    let path = dir.join(SUMMARY_FILE);
    write_json(&path, &reports::run_summary(results))?;
    written.push(path);

    info!(dir = %dir.display(), files = written.len(), "Saved results");
    Ok(written)
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
