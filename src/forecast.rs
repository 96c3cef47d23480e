// Temperature and rainfall forecasting plus accuracy scoring.
use crate::config::ModelSettings;
use crate::error::{ClimateError, DataQualityError, Result};
use crate::model::{FittedModel, SeasonalTrendModel};
use crate::types::{AccuracyMetrics, ForecastPoint, MergedForecast, Observation};
use crate::util::round_to;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::info;

/// Which observation column a model forecasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Temperature,
    Rainfall,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Temperature => "temperature",
            Metric::Rainfall => "rainfall",
        }
    }

    pub fn value(&self, o: &Observation) -> f64 {
        match self {
            Metric::Temperature => o.temperature,
            Metric::Rainfall => o.rainfall,
        }
    }
}

/// Holds one model per metric. Predicting before the matching model is
/// trained is a precondition error.
pub struct ClimateForecaster {
    settings: ModelSettings,
    temp_model: Option<FittedModel>,
    rain_model: Option<FittedModel>,
}

impl ClimateForecaster {
    pub fn new(settings: ModelSettings) -> Self {
        Self {
            settings,
            temp_model: None,
            rain_model: None,
        }
    }

    pub fn train_temperature_model(&mut self, data: &[Observation]) -> Result<()> {
        info!("Training temperature forecasting model");
        let model = SeasonalTrendModel::new("Temperature", self.settings.temperature.clone());
        self.temp_model = Some(model.fit(&history(data, Metric::Temperature))?);
        info!("Temperature model trained successfully");
        Ok(())
    }

    pub fn train_rainfall_model(&mut self, data: &[Observation]) -> Result<()> {
        info!("Training rainfall forecasting model");
        let model = SeasonalTrendModel::new("Rainfall", self.settings.rainfall.clone());
        self.rain_model = Some(model.fit(&history(data, Metric::Rainfall))?);
        info!("Rainfall model trained successfully");
        Ok(())
    }

    pub fn predict_temperature(&self, periods: usize) -> Result<Vec<ForecastPoint>> {
        predict(self.temp_model.as_ref(), "Temperature", periods)
    }

    pub fn predict_rainfall(&self, periods: usize) -> Result<Vec<ForecastPoint>> {
        predict(self.rain_model.as_ref(), "Rainfall", periods)
    }
}

fn history(data: &[Observation], metric: Metric) -> Vec<(NaiveDate, f64)> {
    data.iter().map(|o| (o.date, metric.value(o))).collect()
}

fn predict(
    model: Option<&FittedModel>,
    name: &'static str,
    periods: usize,
) -> Result<Vec<ForecastPoint>> {
    let model = model.ok_or(ClimateError::Precondition(name))?;
    info!(
        model = model.name(),
        periods,
        from = %model.last_date(),
        "Generating forecast"
    );
    model.predict(periods)
}

/// Score a forecast against actuals joined on date.
///
/// Every actual row must have a forecast for its date; a join that matches
/// nothing, or leaves actual rows uncovered, is a data quality error rather
/// than a silently smaller sample.
pub fn evaluate_model(
    actual: &[Observation],
    forecast: &[ForecastPoint],
    metric: Metric,
) -> Result<AccuracyMetrics> {
    info!("Evaluating {} forecast", metric.name());
    let by_date: HashMap<NaiveDate, f64> = forecast
        .iter()
        .map(|p| (p.date, p.point_estimate))
        .collect();

    let mut pairs: Vec<(f64, f64)> = Vec::with_capacity(actual.len());
    let mut first_missing = None;
    for o in actual {
        match by_date.get(&o.date) {
            Some(pred) => pairs.push((metric.value(o), *pred)),
            None => {
                first_missing.get_or_insert(o.date);
            }
        }
    }

    if pairs.is_empty() {
        return Err(DataQualityError::EmptyEvaluation {
            metric: metric.name().to_string(),
        }
        .into());
    }
    if let Some(first_missing) = first_missing {
        return Err(DataQualityError::IncompleteCoverage {
            metric: metric.name().to_string(),
            matched: pairs.len(),
            expected: actual.len(),
            first_missing,
        }
        .into());
    }

    let metrics = accuracy_metrics(&pairs);
    info!(
        "{} Forecast Accuracy: {}%",
        capitalize(metric.name()),
        metrics.accuracy
    );
    Ok(metrics)
}

/// MAE, RMSE and MAPE over `(actual, predicted)` pairs. MAPE divides by
/// `max(|actual|, EPSILON)`, so zero actuals inflate it rather than dividing
/// by zero.
pub fn accuracy_metrics(pairs: &[(f64, f64)]) -> AccuracyMetrics {
    let n = pairs.len() as f64;
    let mae = pairs.iter().map(|(a, p)| (a - p).abs()).sum::<f64>() / n;
    let mse = pairs.iter().map(|(a, p)| (a - p).powi(2)).sum::<f64>() / n;
    let mape = pairs
        .iter()
        .map(|(a, p)| (a - p).abs() / a.abs().max(f64::EPSILON))
        .sum::<f64>()
        / n;
    AccuracyMetrics {
        mae: round_to(mae, 2),
        rmse: round_to(mse.sqrt(), 2),
        mape: round_to(mape * 100.0, 2),
        accuracy: round_to((1.0 - mape) * 100.0, 2),
    }
}

/// Inner join of two forecasts on date, in the order of `temperature`.
pub fn merge_forecasts(
    temperature: &[ForecastPoint],
    rainfall: &[ForecastPoint],
) -> Vec<MergedForecast> {
    let rain: HashMap<NaiveDate, &ForecastPoint> = rainfall.iter().map(|p| (p.date, p)).collect();
    temperature
        .iter()
        .filter_map(|t| {
            rain.get(&t.date).map(|r| MergedForecast {
                date: t.date,
                temperature: *t,
                rainfall: **r,
            })
        })
        .collect()
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
