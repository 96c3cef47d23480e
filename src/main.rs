// Entry point for a single batch run.
//
// The run loads settings, executes the pipeline once, prints the report to
// stdout and writes the result tables. Logs go to stderr. Any error aborts
// the run with a non-zero exit status.
mod alerts;
mod config;
mod error;
mod features;
mod forecast;
mod loader;
mod model;
mod output;
mod pipeline;
mod reports;
mod risk;
mod synthetic;
mod types;
mod util;

use config::Settings;
use pipeline::{ClimateForecastingPipeline, PipelineResults};
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use types::RiskTier;

const RULE: &str = "============================================================";

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("climate_forecast=info")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn banner(title: &str) {
    println!("\n{RULE}");
    println!("{title}");
    println!("{RULE}");
}

/// Print the structured report for a completed run.
fn print_results(r: &PipelineResults) {
    banner("HISTORICAL OVERVIEW");
    println!(
        "  {} daily observations ({} training, {} validation)",
        util::format_int(r.observations),
        util::format_int(r.training_days),
        util::format_int(r.validation_days)
    );
    if let Some(load) = &r.load_report {
        println!(
            "  Feed rows read: {} ({} skipped without a usable date)",
            util::format_int(load.total_rows),
            util::format_int(load.parse_errors)
        );
    }
    let c = &r.clean_report;
    println!(
        "  Cleaning: {} duplicates dropped, {} missing days inserted, {} values filled, {} values clipped\n",
        util::format_int(c.duplicates),
        util::format_int(c.inserted_days),
        util::format_int(c.filled_values),
        util::format_int(c.clipped_values)
    );
    output::preview_table_rows(&reports::season_overview(&r.features), 3);
    if let Some(latest) = r.features.last() {
        println!(
            "  Latest 30-day rainfall: {}mm, dry days in last 21: {}",
            latest
                .rain_rolling_30d
                .map_or("n/a".to_string(), |v| util::format_number(v, 1)),
            latest
                .drought_days
                .map_or("n/a".to_string(), |v| v.to_string())
        );
    }

    banner("MODEL PERFORMANCE");
    println!("  Temperature Forecast Accuracy: {}%", r.temp_metrics.accuracy);
    println!(
        "    MAE {}  RMSE {}  MAPE {}%",
        r.temp_metrics.mae, r.temp_metrics.rmse, r.temp_metrics.mape
    );
    println!("  Rainfall Forecast Accuracy: {}%", r.rain_metrics.accuracy);
    println!(
        "    MAE {}  RMSE {}  MAPE {}%",
        r.rain_metrics.mae, r.rain_metrics.rmse, r.rain_metrics.mape
    );
    println!(
        "  Average Accuracy: {:.2}%",
        (r.temp_metrics.accuracy + r.rain_metrics.accuracy) / 2.0
    );

    banner("RISK ASSESSMENT");
    println!(
        "  Drought Impact: {}",
        util::format_currency(r.drought_impact.total_impact)
    );
    println!(
        "  High Risk Days: {}",
        r.drought_impact.days(RiskTier::High)
    );
    let mm = |v: Option<f64>| {
        v.map_or("n/a".to_string(), |v| format!("{}mm", util::format_number(v, 1)))
    };
    println!(
        "  Lowest 21-day rainfall: {}",
        mm(reports::lowest_aggregate(&r.drought_risk))
    );
    println!(
        "  Peak 7-day rainfall: {}",
        mm(reports::peak_aggregate(&r.flood_risk))
    );
    println!(
        "  Longest hot streak: {} days\n",
        reports::longest_hot_streak(&r.heat_risk)
    );
    output::preview_table_rows(
        &reports::impact_rows(&[&r.drought_impact, &r.flood_impact, &r.heat_impact]),
        3,
    );

    banner(&format!("ALERTS GENERATED: {}", r.alerts.len()));
    println!("{}", alerts::generate_alert_report(&r.alerts));

    banner(&format!("FORECAST SUMMARY (NEXT {} DAYS)", r.forecast_days));
    let stats = reports::forecast_stats(&r.temp_forecast, &r.rain_forecast);
    println!("  Avg Temperature: {:.1}°C", stats.avg_temperature);
    println!("  Total Rainfall: {:.1}mm", stats.total_rainfall);
    println!("  Max Temperature: {:.1}°C", stats.max_temperature);
    println!("  Max Daily Rainfall: {:.1}mm\n", stats.max_daily_rainfall);
    println!("Temperature forecast (first 7 days)\n");
    output::preview_table_rows(&reports::forecast_rows(&r.temp_forecast, "°C"), 7);
    println!("Rainfall forecast (first 7 days)\n");
    output::preview_table_rows(&reports::forecast_rows(&r.rain_forecast, "mm"), 7);
}

fn run(settings: Settings) -> error::Result<()> {
    let output_dir = settings.output.directory.clone();
    let mut pipeline = ClimateForecastingPipeline::new(settings);
    let results = pipeline.run_complete_forecast(chrono::Local::now().date_naive())?;

    print_results(&results);

    let written = output::save_results(&results, &output_dir)?;
    println!("Results saved to '{}/':", output_dir.display());
    for path in written {
        println!("  {}", path.display());
    }
    Ok(())
}

fn main() -> ExitCode {
    init_tracing();
    let settings = Settings::load();

    println!("{RULE}");
    println!("     CLIMATE FORECASTING SYSTEM - v{}", env!("CARGO_PKG_VERSION"));
    println!("{RULE}");

    match run(settings) {
        Ok(()) => {
            banner("FORECASTING COMPLETED SUCCESSFULLY!");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("\nError running pipeline: {e}");
            ExitCode::FAILURE
        }
    }
}
