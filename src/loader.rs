// Observation feed loading and cleaning.
//
// Both the CSV feed and the synthetic generator go through `clean_data`,
// which guarantees the downstream invariant: one observation per calendar
// day, ascending, no gaps, every value present and physically plausible.
use crate::error::{DataQualityError, Result};
use crate::types::{Observation, RawObservation, RawRow};
use crate::util::{average, parse_date_safe, parse_f64_safe, quantile};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info};

/// Trailing window used to fill missing values.
const FILL_WINDOW: usize = 7;
const OUTLIER_LOWER_Q: f64 = 0.01;
const OUTLIER_UPPER_Q: f64 = 0.99;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LoadReport {
    pub total_rows: usize,
    pub parse_errors: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct CleanReport {
    pub input_rows: usize,
    pub duplicates: usize,
    pub inserted_days: usize,
    pub filled_values: usize,
    pub clipped_values: usize,
    pub output_rows: usize,
}

/// Read observations from a CSV feed. Rows without a usable date are
/// counted and skipped; unusable measurements become missing values.
pub fn load_csv(path: &Path) -> Result<(Vec<RawObservation>, LoadReport)> {
    let mut rdr = ReaderBuilder::new().flexible(true).from_path(path)?;
    let mut report = LoadReport::default();
    let mut rows = Vec::new();

    for result in rdr.deserialize::<RawRow>() {
        report.total_rows += 1;
        let row = match result {
            Ok(r) => r,
            Err(_) => {
                report.parse_errors += 1;
                continue;
            }
        };
        let Some(date) = parse_date_safe(row.date.as_deref()) else {
            report.parse_errors += 1;
            continue;
        };
        rows.push(RawObservation {
            date,
            temperature: parse_f64_safe(row.temperature.as_deref()),
            rainfall: parse_f64_safe(row.rainfall.as_deref()),
            humidity: parse_f64_safe(row.humidity.as_deref()),
            wind_speed: parse_f64_safe(row.wind_speed.as_deref()),
        });
    }

    info!(
        path = %path.display(),
        rows = report.total_rows,
        skipped = report.parse_errors,
        "Loaded observations feed"
    );
    Ok((rows, report))
}

/// Clean raw observations into a gapless, ascending daily series.
pub fn clean_data(raw: Vec<RawObservation>) -> Result<(Vec<Observation>, CleanReport)> {
    info!("Cleaning weather data");
    let mut report = CleanReport {
        input_rows: raw.len(),
        ..CleanReport::default()
    };

    // First occurrence of each date wins.
    let mut by_date: BTreeMap<NaiveDate, RawObservation> = BTreeMap::new();
    for r in raw {
        if by_date.contains_key(&r.date) {
            report.duplicates += 1;
        } else {
            by_date.insert(r.date, r);
        }
    }
    let (Some(&first), Some(&last)) = (by_date.keys().next(), by_date.keys().next_back()) else {
        return Err(DataQualityError::EmptySeries.into());
    };

    let mut series: Vec<RawObservation> = Vec::with_capacity(by_date.len());
    let mut day = first;
    while day <= last {
        match by_date.remove(&day) {
            Some(r) => series.push(r),
            None => {
                report.inserted_days += 1;
                series.push(RawObservation {
                    date: day,
                    temperature: None,
                    rainfall: None,
                    humidity: None,
                    wind_speed: None,
                });
            }
        }
        match day.succ_opt() {
            Some(next) => day = next,
            None => break,
        }
    }

    let dates: Vec<NaiveDate> = series.iter().map(|r| r.date).collect();
    let mut temperature = fill_missing(
        "temperature",
        series.iter().map(|r| r.temperature).collect(),
        &mut report.filled_values,
    )?;
    let mut rainfall = fill_missing(
        "rainfall",
        series.iter().map(|r| r.rainfall).collect(),
        &mut report.filled_values,
    )?;
    let mut humidity = fill_missing(
        "humidity",
        series.iter().map(|r| r.humidity).collect(),
        &mut report.filled_values,
    )?;
    let mut wind_speed = fill_missing(
        "wind_speed",
        series.iter().map(|r| r.wind_speed).collect(),
        &mut report.filled_values,
    )?;

    // Outliers are pulled in to the percentile bounds rather than dropped so
    // the series stays gapless.
    for values in [&mut temperature, &mut humidity] {
        let lo = quantile(values.clone(), OUTLIER_LOWER_Q).unwrap_or(f64::MIN);
        let hi = quantile(values.clone(), OUTLIER_UPPER_Q).unwrap_or(f64::MAX);
        report.clipped_values += clip(values, lo, hi);
    }

    report.clipped_values += clip(&mut temperature, -10.0, 50.0);
    report.clipped_values += clip(&mut humidity, 0.0, 100.0);
    report.clipped_values += clip(&mut rainfall, 0.0, 500.0);
    report.clipped_values += clip(&mut wind_speed, 0.0, 150.0);

    let cleaned: Vec<Observation> = dates
        .into_iter()
        .enumerate()
        .map(|(i, date)| Observation {
            date,
            temperature: temperature[i],
            rainfall: rainfall[i],
            humidity: humidity[i],
            wind_speed: wind_speed[i],
        })
        .collect();
    report.output_rows = cleaned.len();

    debug!(?report, "Clean report");
    info!(
        input = report.input_rows,
        records = report.output_rows,
        duplicates = report.duplicates,
        inserted = report.inserted_days,
        filled = report.filled_values,
        clipped = report.clipped_values,
        "Cleaned weather data"
    );
    Ok((cleaned, report))
}

/// Fill gaps with the mean of the values present in the trailing window,
/// falling back to the column mean when the whole window is empty.
fn fill_missing(
    column: &'static str,
    values: Vec<Option<f64>>,
    filled: &mut usize,
) -> Result<Vec<f64>> {
    let present: Vec<f64> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return Err(DataQualityError::EmptyColumn(column).into());
    }
    let column_mean = average(&present);

    let out = values
        .iter()
        .enumerate()
        .map(|(i, v)| match v {
            Some(v) => *v,
            None => {
                *filled += 1;
                let start = (i + 1).saturating_sub(FILL_WINDOW);
                let window: Vec<f64> = values[start..=i].iter().flatten().copied().collect();
                if window.is_empty() {
                    column_mean
                } else {
                    average(&window)
                }
            }
        })
        .collect();
    Ok(out)
}

fn clip(values: &mut [f64], lo: f64, hi: f64) -> usize {
    let mut clipped = 0;
    for v in values.iter_mut() {
        let c = v.clamp(lo, hi);
        if c != *v {
            *v = c;
            clipped += 1;
        }
    }
    clipped
}
