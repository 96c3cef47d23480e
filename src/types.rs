use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use tabled::Tabled;

/// One row of the observations feed before cleaning. Any value may be
/// missing.
#[derive(Debug, Deserialize)]
pub struct RawRow {
    #[serde(alias = "ds", alias = "Date")]
    pub date: Option<String>,
    #[serde(alias = "Temperature")]
    pub temperature: Option<String>,
    #[serde(alias = "Rainfall")]
    pub rainfall: Option<String>,
    #[serde(alias = "Humidity")]
    pub humidity: Option<String>,
    #[serde(alias = "WindSpeed")]
    pub wind_speed: Option<String>,
}

/// A dated observation whose measurements may still be missing.
#[derive(Debug, Clone, PartialEq)]
pub struct RawObservation {
    pub date: NaiveDate,
    pub temperature: Option<f64>,
    pub rainfall: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
}

/// A cleaned daily observation. One per date, ascending, no gaps.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    /// °C
    pub temperature: f64,
    /// mm, never negative
    pub rainfall: f64,
    /// %, within `[0, 100]`
    pub humidity: f64,
    /// km/h, never negative
    pub wind_speed: f64,
}

impl From<Observation> for RawObservation {
    fn from(o: Observation) -> Self {
        Self {
            date: o.date,
            temperature: Some(o.temperature),
            rainfall: Some(o.rainfall),
            humidity: Some(o.humidity),
            wind_speed: Some(o.wind_speed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Season {
    #[serde(rename = "Long Rains")]
    LongRains,
    #[serde(rename = "Short Rains")]
    ShortRains,
    #[serde(rename = "Dry Season")]
    DrySeason,
}

impl Season {
    pub fn from_month(month: u32) -> Self {
        match month {
            3..=5 => Season::LongRains,
            10 | 11 => Season::ShortRains,
            _ => Season::DrySeason,
        }
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Season::LongRains => "Long Rains",
            Season::ShortRains => "Short Rains",
            Season::DrySeason => "Dry Season",
        })
    }
}

/// Observation enriched with calendar and trailing-window features.
/// Window features are `None` until their window is full.
#[derive(Debug, Clone, Serialize)]
pub struct FeatureRow {
    pub date: NaiveDate,
    pub temperature: f64,
    pub rainfall: f64,
    pub humidity: f64,
    pub wind_speed: f64,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub day_of_year: u32,
    pub quarter: u32,
    pub season: Season,
    pub temp_rolling_7d: Option<f64>,
    pub temp_rolling_14d: Option<f64>,
    pub temp_rolling_30d: Option<f64>,
    pub rain_rolling_7d: Option<f64>,
    pub rain_rolling_14d: Option<f64>,
    pub rain_rolling_30d: Option<f64>,
    pub heat_index: f64,
    /// Days with under 5 mm of rain in the trailing 21 days.
    pub drought_days: Option<u32>,
}

/// One forecast day. `lower_bound <= point_estimate <= upper_bound`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub point_estimate: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

/// Temperature and rainfall forecasts joined on date.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MergedForecast {
    pub date: NaiveDate,
    pub temperature: ForecastPoint,
    pub rainfall: ForecastPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Hazard {
    Drought,
    Flood,
    ExtremeHeat,
}

impl Hazard {
    pub fn label(&self) -> &'static str {
        match self {
            Hazard::Drought => "drought",
            Hazard::Flood => "flood",
            Hazard::ExtremeHeat => "extreme heat",
        }
    }
}

impl fmt::Display for Hazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered risk tier: `Low < Medium < High`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    Low,
    Medium,
    High,
}

impl RiskTier {
    pub const ALL: [RiskTier; 3] = [RiskTier::High, RiskTier::Medium, RiskTier::Low];
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RiskTier::Low => "Low",
            RiskTier::Medium => "Medium",
            RiskTier::High => "High",
        })
    }
}

/// A forecast day classified for one hazard.
///
/// Rows inside the leading partial window of a rolling hazard have no
/// aggregate, tier or score.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskRecord {
    pub hazard: Hazard,
    pub point: ForecastPoint,
    pub rolling_aggregate: Option<f64>,
    pub tier: Option<RiskTier>,
    /// Within `[0, 100]`.
    pub score: Option<f64>,
    /// Only tracked for extreme heat.
    pub consecutive_hot_days: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImpactSummary {
    pub hazard: Hazard,
    pub total_impact: f64,
    pub high_risk_days: usize,
    pub medium_risk_days: usize,
    pub low_risk_days: usize,
    /// Leading-window days with no tier. They never contribute to impact.
    pub unclassified_days: usize,
}

impl ImpactSummary {
    pub fn days(&self, tier: RiskTier) -> usize {
        match tier {
            RiskTier::High => self.high_risk_days,
            RiskTier::Medium => self.medium_risk_days,
            RiskTier::Low => self.low_risk_days,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Warning,
    Critical,
}

/// What an alert fired on. Heavy rainfall is a single-day reading, distinct
/// from the rolling flood classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AlertKind {
    ExtremeHeat,
    HeavyRainfall,
    Drought,
}

impl AlertKind {
    pub const ALL: [AlertKind; 3] = [
        AlertKind::ExtremeHeat,
        AlertKind::HeavyRainfall,
        AlertKind::Drought,
    ];
}

impl fmt::Display for AlertKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AlertKind::ExtremeHeat => "Extreme heat",
            AlertKind::HeavyRainfall => "Heavy rainfall",
            AlertKind::Drought => "Drought",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertEvent {
    pub date: NaiveDate,
    pub kind: AlertKind,
    pub observed_value: f64,
    pub threshold_exceeded: f64,
    pub severity: Severity,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccuracyMetrics {
    pub mae: f64,
    pub rmse: f64,
    /// Percent.
    pub mape: f64,
    /// Percent; `100 - mape`.
    pub accuracy: f64,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ForecastRow {
    #[tabled(rename = "Date")]
    pub date: String,
    #[tabled(rename = "Forecast")]
    pub forecast: String,
    #[tabled(rename = "Lower")]
    pub lower: String,
    #[tabled(rename = "Upper")]
    pub upper: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct ImpactRow {
    #[tabled(rename = "Hazard")]
    pub hazard: String,
    #[tabled(rename = "HighDays")]
    pub high_days: usize,
    #[tabled(rename = "MediumDays")]
    pub medium_days: usize,
    #[tabled(rename = "LowDays")]
    pub low_days: usize,
    #[tabled(rename = "Unclassified")]
    pub unclassified_days: usize,
    #[tabled(rename = "TotalImpact")]
    pub total_impact: String,
}

#[derive(Debug, Serialize, Tabled, Clone)]
pub struct SeasonRow {
    #[tabled(rename = "Season")]
    pub season: String,
    #[tabled(rename = "Days")]
    pub days: usize,
    #[tabled(rename = "AvgTemp")]
    pub avg_temperature: String,
    #[tabled(rename = "AvgDailyRain")]
    pub avg_rainfall: String,
    #[tabled(rename = "AvgHeatIndex")]
    pub avg_heat_index: String,
}

#[derive(Debug, Serialize)]
pub struct RunSummary {
    pub observations: usize,
    pub training_days: usize,
    pub validation_days: usize,
    pub forecast_days: usize,
    pub temperature_accuracy: f64,
    pub rainfall_accuracy: f64,
    pub impacts: Vec<ImpactSummary>,
    pub longest_hot_streak: u32,
    pub peak_7d_rainfall: Option<f64>,
    pub alert_count: usize,
    pub alerts: Vec<AlertEvent>,
}
