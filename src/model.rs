// Seasonal-trend forecasting on top of augurs' Prophet.
//
// Dates cross the boundary as Unix timestamps at midnight; custom
// seasonalities gated by a month condition get a boolean column per
// condition, both when fitting and when predicting.
use crate::config::{ModelConfig, SeasonCondition, SeasonalityMode};
use crate::error::{ClimateError, DataQualityError, Result};
use crate::types::ForecastPoint;
use augurs_prophet::wasmstan::WasmstanOptimizer;
use augurs_prophet::optimizer::OptimizeOpts;
use augurs_prophet::{
    FeatureMode, PositiveFloat, PredictionData, Prophet, ProphetOptions,
    Seasonality, SeasonalityOption, TimestampSeconds, TrainingData,
};
use chrono::{Datelike, Days, NaiveDate};
use std::collections::HashMap;
use std::num::NonZeroU32;
use tracing::debug;

const SECONDS_PER_DAY: i64 = 86_400;
/// `NaiveDate::num_days_from_ce` of 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i64 = 719_163;

pub fn timestamp(date: NaiveDate) -> TimestampSeconds {
    (date.num_days_from_ce() as i64 - UNIX_EPOCH_DAYS_FROM_CE) * SECONDS_PER_DAY
}

/// Unfitted model: configuration plus a name used in logs and errors.
#[derive(Debug, Clone)]
pub struct SeasonalTrendModel {
    name: &'static str,
    config: ModelConfig,
}

/// A model fitted to one history, able to extend it into the future.
pub struct FittedModel {
    name: &'static str,
    prophet: Prophet<WasmstanOptimizer>,
    last: NaiveDate,
    conditions: Vec<SeasonCondition>,
}

impl SeasonalTrendModel {
    pub fn new(name: &'static str, config: ModelConfig) -> Self {
        Self { name, config }
    }

    fn invalid(&self, field: &'static str, value: f64) -> ClimateError {
        ClimateError::ModelParameter {
            model: self.name,
            field,
            value,
        }
    }

    fn options(&self) -> Result<ProphetOptions> {
        let c = &self.config;
        Ok(ProphetOptions {
            n_changepoints: c
                .n_changepoints
                .try_into()
                .map_err(|_| self.invalid("n_changepoints", c.n_changepoints as f64))?,
            changepoint_range: c
                .changepoint_range
                .try_into()
                .map_err(|_| self.invalid("changepoint_range", c.changepoint_range))?,
            changepoint_prior_scale: c
                .changepoint_prior_scale
                .try_into()
                .map_err(|_| self.invalid("changepoint_prior_scale", c.changepoint_prior_scale))?,
            seasonality_prior_scale: c
                .seasonality_prior_scale
                .try_into()
                .map_err(|_| self.invalid("seasonality_prior_scale", c.seasonality_prior_scale))?,
            yearly_seasonality: SeasonalityOption::Manual(c.yearly_seasonality),
            weekly_seasonality: SeasonalityOption::Manual(c.weekly_seasonality),
            daily_seasonality: SeasonalityOption::Manual(c.daily_seasonality),
            seasonality_mode: match c.seasonality_mode {
                SeasonalityMode::Additive => FeatureMode::Additive,
                SeasonalityMode::Multiplicative => FeatureMode::Multiplicative,
            },
            ..ProphetOptions::default()
        })
    }

    fn conditions(&self) -> Vec<SeasonCondition> {
        self.config
            .seasonalities
            .iter()
            .filter_map(|s| s.condition.clone())
            .collect()
    }

    /// Fit on an ascending daily history of `(date, value)` pairs.
    pub fn fit(&self, history: &[(NaiveDate, f64)]) -> Result<FittedModel> {
        let Some(&(last, _)) = history.last() else {
            return Err(DataQualityError::EmptySeries.into());
        };

        let mut prophet = Prophet::new(self.options()?, WasmstanOptimizer::new());
        for s in &self.config.seasonalities {
            let period: PositiveFloat = s
                .period
                .try_into()
                .map_err(|_| self.invalid("period", s.period))?;
            let order = u32::try_from(s.fourier_order)
                .ok()
                .and_then(NonZeroU32::new)
                .ok_or_else(|| self.invalid("fourier_order", s.fourier_order as f64))?;
            let mut seasonality = Seasonality::new(period, order);
            if let Some(c) = &s.condition {
                seasonality = seasonality.with_condition(c.name.clone());
            }
            prophet.add_seasonality(s.name.clone(), seasonality)?;
        }

        let dates: Vec<NaiveDate> = history.iter().map(|(d, _)| *d).collect();
        let conditions = self.conditions();
        let mut data = TrainingData::new(
            dates.iter().map(|d| timestamp(*d)).collect(),
            history.iter().map(|(_, y)| *y).collect(),
        )?;
        if !conditions.is_empty() {
            data = data.with_seasonality_conditions(condition_columns(&conditions, &dates))?;
        }
        prophet.fit(data, OptimizeOpts::default())?;

        debug!(
            model = self.name,
            rows = history.len(),
            seasonalities = ?self.config.seasonalities.iter().map(|s| s.name.as_str()).collect::<Vec<_>>(),
            "Fitted seasonal trend model"
        );
        Ok(FittedModel {
            name: self.name,
            prophet,
            last,
            conditions,
        })
    }
}

impl FittedModel {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn last_date(&self) -> NaiveDate {
        self.last
    }

    /// Forecast the `periods` days after the end of the history, with the
    /// model's 80% uncertainty interval.
    pub fn predict(&self, periods: usize) -> Result<Vec<ForecastPoint>> {
        if periods == 0 {
            return Ok(Vec::new());
        }
        let dates: Vec<NaiveDate> = (1..=periods as u64)
            .map(|h| self.last.checked_add_days(Days::new(h)))
            .collect::<Option<_>>()
            .ok_or(DataQualityError::DateOutOfRange("forecast horizon"))?;

        let mut data = PredictionData::new(dates.iter().map(|d| timestamp(*d)).collect());
        if !self.conditions.is_empty() {
            data = data.with_seasonality_conditions(condition_columns(&self.conditions, &dates))?;
        }
        let yhat = self.prophet.predict(Some(data))?.yhat;
        let point = yhat.point;
        let lower = yhat.lower.unwrap_or_else(|| point.clone());
        let upper = yhat.upper.unwrap_or_else(|| point.clone());

        Ok(dates
            .into_iter()
            .zip(point)
            .zip(lower.into_iter().zip(upper))
            .map(|((date, p), (lo, hi))| ForecastPoint {
                date,
                point_estimate: p,
                lower_bound: lo.min(p),
                upper_bound: hi.max(p),
            })
            .collect())
    }
}

/// One boolean column per named condition: whether each date's month is in
/// the condition's set.
fn condition_columns(
    conditions: &[SeasonCondition],
    dates: &[NaiveDate],
) -> HashMap<String, Vec<bool>> {
    conditions
        .iter()
        .map(|c| {
            let column = dates.iter().map(|d| c.holds(d.month())).collect();
            (c.name.clone(), column)
        })
        .collect()
}
