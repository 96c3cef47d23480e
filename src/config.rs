// Run configuration.
//
// Settings are resolved once at startup:
// 1. Defaults in code
// 2. An optional TOML file (`$CLIMATE_CONFIG`, else `./climate.toml`)
//
// Invalid sections are replaced by their defaults and reported as warnings,
// so a bad file never stops a run.

use crate::error::ConfigError;
use crate::types::RiskTier;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "CLIMATE_CONFIG";
pub const DEFAULT_CONFIG_FILE: &str = "climate.toml";
pub const MAX_HISTORICAL_YEARS: u32 = 200;
pub const MAX_FORECAST_DAYS: usize = 3650;

/// Complete, validated configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub data: DataSettings,
    pub models: ModelSettings,
    pub risk_thresholds: RiskThresholds,
    pub financial_impact: RateTable,
    pub alert_thresholds: AlertThresholds,
    /// Days to forecast past the end of the training slice.
    pub forecast_days: usize,
    /// Fraction of history used for training; the rest is held out.
    pub train_test_split: f64,
    pub output: OutputSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data: DataSettings::default(),
            models: ModelSettings::default(),
            risk_thresholds: RiskThresholds::default(),
            financial_impact: RateTable::default(),
            alert_thresholds: AlertThresholds::default(),
            forecast_days: 30,
            train_test_split: 0.9,
            output: OutputSettings::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DataSettings {
    pub historical_years: u32,
    /// Mean temperature in °C.
    pub temperature_base: f64,
    /// Amplitude of the yearly temperature cycle in °C.
    pub seasonal_variation: f64,
    /// Mean relative humidity in %.
    pub base_humidity: f64,
    pub seed: u64,
    /// Observations CSV. Synthetic data is generated when unset.
    pub input_path: Option<PathBuf>,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            historical_years: 10,
            temperature_base: 25.0,
            seasonal_variation: 5.0,
            base_humidity: 60.0,
            seed: 42,
            input_path: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeasonalityMode {
    Additive,
    Multiplicative,
}

/// Boolean condition on a custom seasonality: the component only applies on
/// days whose month is listed.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SeasonCondition {
    pub name: String,
    pub months: Vec<u32>,
}

impl SeasonCondition {
    pub fn holds(&self, month: u32) -> bool {
        self.months.contains(&month)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CustomSeasonality {
    pub name: String,
    /// Period in days.
    pub period: f64,
    pub fourier_order: usize,
    #[serde(default)]
    pub condition: Option<SeasonCondition>,
}

/// Hyperparameters for one forecast model.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelConfig {
    pub yearly_seasonality: bool,
    pub weekly_seasonality: bool,
    pub daily_seasonality: bool,
    /// Prior scale on trend changes; larger bends the trend more readily.
    pub changepoint_prior_scale: f64,
    pub seasonality_prior_scale: f64,
    pub seasonality_mode: SeasonalityMode,
    pub n_changepoints: usize,
    /// Share of history in which changepoints may be placed.
    pub changepoint_range: f64,
    pub seasonalities: Vec<CustomSeasonality>,
}

impl ModelConfig {
    pub fn temperature() -> Self {
        Self {
            yearly_seasonality: true,
            weekly_seasonality: false,
            daily_seasonality: false,
            changepoint_prior_scale: 0.05,
            seasonality_prior_scale: 10.0,
            seasonality_mode: SeasonalityMode::Additive,
            n_changepoints: 25,
            changepoint_range: 0.8,
            seasonalities: vec![CustomSeasonality {
                name: "monthly".to_string(),
                period: 30.5,
                fourier_order: 5,
                condition: None,
            }],
        }
    }

    pub fn rainfall() -> Self {
        Self {
            weekly_seasonality: true,
            changepoint_prior_scale: 0.1,
            seasonality_mode: SeasonalityMode::Multiplicative,
            seasonalities: vec![CustomSeasonality {
                name: "long_rains".to_string(),
                period: 365.25,
                fourier_order: 3,
                condition: Some(SeasonCondition {
                    name: "long_rains_season".to_string(),
                    months: vec![3, 4, 5],
                }),
            }],
            ..Self::temperature()
        }
    }
}

/// A `[models.*]` table as written in the file. Fields left out keep the
/// value of the model it is applied to.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ModelOverrides {
    yearly_seasonality: Option<bool>,
    weekly_seasonality: Option<bool>,
    daily_seasonality: Option<bool>,
    changepoint_prior_scale: Option<f64>,
    seasonality_prior_scale: Option<f64>,
    seasonality_mode: Option<SeasonalityMode>,
    n_changepoints: Option<usize>,
    changepoint_range: Option<f64>,
    seasonalities: Option<Vec<CustomSeasonality>>,
}

impl ModelOverrides {
    fn apply(self, base: ModelConfig) -> ModelConfig {
        ModelConfig {
            yearly_seasonality: self.yearly_seasonality.unwrap_or(base.yearly_seasonality),
            weekly_seasonality: self.weekly_seasonality.unwrap_or(base.weekly_seasonality),
            daily_seasonality: self.daily_seasonality.unwrap_or(base.daily_seasonality),
            changepoint_prior_scale: self
                .changepoint_prior_scale
                .unwrap_or(base.changepoint_prior_scale),
            seasonality_prior_scale: self
                .seasonality_prior_scale
                .unwrap_or(base.seasonality_prior_scale),
            seasonality_mode: self.seasonality_mode.unwrap_or(base.seasonality_mode),
            n_changepoints: self.n_changepoints.unwrap_or(base.n_changepoints),
            changepoint_range: self.changepoint_range.unwrap_or(base.changepoint_range),
            seasonalities: self.seasonalities.unwrap_or(base.seasonalities),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ModelSettingsFile {
    temperature: ModelOverrides,
    rainfall: ModelOverrides,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "ModelSettingsFile")]
pub struct ModelSettings {
    pub temperature: ModelConfig,
    pub rainfall: ModelConfig,
}

impl From<ModelSettingsFile> for ModelSettings {
    fn from(file: ModelSettingsFile) -> Self {
        Self {
            temperature: file.temperature.apply(ModelConfig::temperature()),
            rainfall: file.rainfall.apply(ModelConfig::rainfall()),
        }
    }
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            temperature: ModelConfig::temperature(),
            rainfall: ModelConfig::rainfall(),
        }
    }
}

/// Drought cuts on the 21-day rainfall sum (mm). `high < medium`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct DroughtThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for DroughtThresholds {
    fn default() -> Self {
        Self {
            high: 50.0,
            medium: 150.0,
        }
    }
}

/// Flood cuts on the 7-day rainfall sum (mm). `low < medium`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FloodThresholds {
    pub low: f64,
    pub medium: f64,
}

impl Default for FloodThresholds {
    fn default() -> Self {
        Self {
            low: 100.0,
            medium: 200.0,
        }
    }
}

/// Heat cuts on daily temperature (°C). `medium < high`.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct HeatThresholds {
    pub medium: f64,
    pub high: f64,
}

impl Default for HeatThresholds {
    fn default() -> Self {
        Self {
            medium: 30.0,
            high: 35.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Deserialize)]
#[serde(default)]
pub struct RiskThresholds {
    pub drought: DroughtThresholds,
    pub flood: FloodThresholds,
    pub extreme_heat: HeatThresholds,
}

/// Currency per day spent in each tier.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct RateTable {
    #[serde(alias = "High")]
    pub high: f64,
    #[serde(alias = "Medium")]
    pub medium: f64,
    #[serde(alias = "Low")]
    pub low: f64,
}

impl Default for RateTable {
    fn default() -> Self {
        Self {
            high: 50_000.0,
            medium: 15_000.0,
            low: 1_000.0,
        }
    }
}

impl RateTable {
    pub fn rate(&self, tier: RiskTier) -> f64 {
        match tier {
            RiskTier::High => self.high,
            RiskTier::Medium => self.medium,
            RiskTier::Low => self.low,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct AlertThresholds {
    /// °C
    pub extreme_heat: f64,
    /// mm per day
    pub heavy_rainfall: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self {
            extreme_heat: 35.0,
            heavy_rainfall: 50.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    pub directory: PathBuf,
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("results"),
        }
    }
}

impl Settings {
    /// Resolve settings from the environment, falling back to defaults.
    pub fn load() -> Self {
        let explicit = std::env::var_os(CONFIG_ENV).map(PathBuf::from);
        let path = explicit
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

        let settings = if path.exists() {
            match Self::from_file(&path) {
                Ok(s) => {
                    info!(path = %path.display(), "Loaded configuration file");
                    s
                }
                Err(e) => {
                    warn!("{e}; using default settings");
                    Self::default()
                }
            }
        } else {
            if explicit.is_some() {
                warn!(path = %path.display(), "Config file not found; using default settings");
            }
            Self::default()
        };

        let (settings, problems) = settings.validate();
        for p in &problems {
            warn!("{p}");
        }
        settings
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let unreadable = |reason: String| ConfigError::Unreadable {
            path: path.display().to_string(),
            reason,
        };
        let text = std::fs::read_to_string(path).map_err(|e| unreadable(e.to_string()))?;
        Self::from_toml(&text).map_err(unreadable)
    }

    pub fn from_toml(text: &str) -> Result<Self, String> {
        toml::from_str(text).map_err(|e| e.to_string())
    }

    /// Replace every invalid section with its default, returning what was
    /// replaced.
    pub fn validate(mut self) -> (Self, Vec<ConfigError>) {
        let mut problems = Vec::new();

        let d = DataSettings::default();
        if !(1..=MAX_HISTORICAL_YEARS).contains(&self.data.historical_years) {
            problems.push(out_of_range(
                "data.historical_years",
                self.data.historical_years,
                "1 to 200",
            ));
            self.data.historical_years = d.historical_years;
        }
        if !(0.0..=100.0).contains(&self.data.base_humidity) {
            problems.push(out_of_range(
                "data.base_humidity",
                self.data.base_humidity,
                "0 to 100",
            ));
            self.data.base_humidity = d.base_humidity;
        }
        for (field, value, default) in [
            (
                "data.temperature_base",
                &mut self.data.temperature_base,
                d.temperature_base,
            ),
            (
                "data.seasonal_variation",
                &mut self.data.seasonal_variation,
                d.seasonal_variation,
            ),
        ] {
            if !value.is_finite() {
                problems.push(out_of_range(field, *value, "a finite number"));
                *value = default;
            }
        }

        let defaults = ModelSettings::default();
        for (name, model, default) in [
            (
                "models.temperature",
                &mut self.models.temperature,
                defaults.temperature,
            ),
            ("models.rainfall", &mut self.models.rainfall, defaults.rainfall),
        ] {
            let valid = model.changepoint_prior_scale > 0.0
                && model.seasonality_prior_scale > 0.0
                && model.changepoint_range > 0.0
                && model.changepoint_range <= 1.0
                && model
                    .seasonalities
                    .iter()
                    .all(|s| s.period > 0.0 && s.fourier_order > 0);
            if !valid {
                problems.push(out_of_range(
                    name,
                    "<section>",
                    "positive prior scales and periods, changepoint_range in (0, 1]",
                ));
                *model = default;
            }
        }

        let t = &self.risk_thresholds;
        if !(t.drought.high >= 0.0 && t.drought.high < t.drought.medium) {
            problems.push(ConfigError::UnorderedCuts {
                section: "risk_thresholds.drought",
                detail: format!("high {} must be below medium {}", t.drought.high, t.drought.medium),
            });
            self.risk_thresholds.drought = DroughtThresholds::default();
        }
        let t = &self.risk_thresholds;
        if !(t.flood.low >= 0.0 && t.flood.low < t.flood.medium) {
            problems.push(ConfigError::UnorderedCuts {
                section: "risk_thresholds.flood",
                detail: format!("low {} must be below medium {}", t.flood.low, t.flood.medium),
            });
            self.risk_thresholds.flood = FloodThresholds::default();
        }
        let t = &self.risk_thresholds;
        if !(t.extreme_heat.medium < t.extreme_heat.high) {
            problems.push(ConfigError::UnorderedCuts {
                section: "risk_thresholds.extreme_heat",
                detail: format!(
                    "medium {} must be below high {}",
                    t.extreme_heat.medium, t.extreme_heat.high
                ),
            });
            self.risk_thresholds.extreme_heat = HeatThresholds::default();
        }

        let rates = RateTable::default();
        for (field, value, default) in [
            ("financial_impact.high", &mut self.financial_impact.high, rates.high),
            ("financial_impact.medium", &mut self.financial_impact.medium, rates.medium),
            ("financial_impact.low", &mut self.financial_impact.low, rates.low),
        ] {
            if !(value.is_finite() && *value >= 0.0) {
                problems.push(out_of_range(field, *value, "a non-negative amount"));
                *value = default;
            }
        }

        let alerts = AlertThresholds::default();
        for (field, value, default) in [
            (
                "alert_thresholds.extreme_heat",
                &mut self.alert_thresholds.extreme_heat,
                alerts.extreme_heat,
            ),
            (
                "alert_thresholds.heavy_rainfall",
                &mut self.alert_thresholds.heavy_rainfall,
                alerts.heavy_rainfall,
            ),
        ] {
            if !value.is_finite() {
                problems.push(out_of_range(field, *value, "a finite number"));
                *value = default;
            }
        }

        let base = Settings::default();
        if !(1..=MAX_FORECAST_DAYS).contains(&self.forecast_days) {
            problems.push(out_of_range(
                "forecast_days",
                self.forecast_days,
                "1 to 3650",
            ));
            self.forecast_days = base.forecast_days;
        }
        if !(self.train_test_split > 0.0 && self.train_test_split < 1.0) {
            problems.push(out_of_range(
                "train_test_split",
                self.train_test_split,
                "strictly between 0 and 1",
            ));
            self.train_test_split = base.train_test_split;
        }

        (self, problems)
    }
}

fn out_of_range(
    field: &'static str,
    value: impl std::fmt::Display,
    expected: &'static str,
) -> ConfigError {
    ConfigError::OutOfRange {
        field,
        value: value.to_string(),
        expected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let s = Settings::default();
        assert_eq!(s.data.historical_years, 10);
        assert_eq!(s.risk_thresholds.drought.high, 50.0);
        assert_eq!(s.risk_thresholds.flood.medium, 200.0);
        assert_eq!(s.risk_thresholds.extreme_heat.high, 35.0);
        assert_eq!(s.financial_impact.rate(RiskTier::Medium), 15_000.0);
        assert_eq!(s.alert_thresholds.heavy_rainfall, 50.0);
        assert_eq!(s.forecast_days, 30);
        assert_eq!(s.train_test_split, 0.9);
        assert_eq!(
            s.models.rainfall.seasonality_mode,
            SeasonalityMode::Multiplicative
        );
        let (validated, problems) = s.clone().validate();
        assert!(problems.is_empty());
        assert_eq!(validated, s);
    }

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let s = Settings::from_toml(
            r#"
            forecast_days = 14

            [risk_thresholds.flood]
            low = 80

            [financial_impact]
            High = 75000
            "#,
        )
        .unwrap();
        assert_eq!(s.forecast_days, 14);
        assert_eq!(s.risk_thresholds.flood.low, 80.0);
        assert_eq!(s.risk_thresholds.flood.medium, 200.0);
        assert_eq!(s.financial_impact.high, 75_000.0);
        assert_eq!(s.financial_impact.low, 1_000.0);
        assert_eq!(s.models, ModelSettings::default());
    }

    #[test]
    fn invalid_sections_fall_back_to_defaults() {
        let s = Settings::from_toml(
            r#"
            train_test_split = 1.5
            forecast_days = 0

            [risk_thresholds.drought]
            high = 200
            medium = 100

            [financial_impact]
            low = -5
            "#,
        )
        .unwrap();
        let (s, problems) = s.validate();
        assert_eq!(problems.len(), 4);
        assert_eq!(s.train_test_split, 0.9);
        assert_eq!(s.forecast_days, 30);
        assert_eq!(s.risk_thresholds.drought, DroughtThresholds::default());
        assert_eq!(s.financial_impact.low, 1_000.0);
    }

    #[test]
    fn partial_model_table_keeps_that_models_defaults() {
        let s = Settings::from_toml(
            r#"
            [models.rainfall]
            changepoint_prior_scale = 0.2
            "#,
        )
        .unwrap();
        let (s, problems) = s.validate();
        assert!(problems.is_empty());
        let rain = &s.models.rainfall;
        assert_eq!(rain.changepoint_prior_scale, 0.2);
        assert_eq!(rain.seasonality_mode, SeasonalityMode::Multiplicative);
        assert!(rain.weekly_seasonality);
        assert_eq!(rain.seasonalities, ModelConfig::rainfall().seasonalities);
        assert_eq!(s.models.temperature, ModelConfig::temperature());
    }

    #[test]
    fn oversized_horizons_fall_back_to_defaults() {
        let s = Settings::from_toml(
            r#"
            forecast_days = 100000

            [data]
            historical_years = 300000
            "#,
        )
        .unwrap();
        let (s, problems) = s.validate();
        assert_eq!(problems.len(), 2);
        assert_eq!(s.data.historical_years, 10);
        assert_eq!(s.forecast_days, 30);
    }

    #[test]
    fn custom_seasonality_with_condition_parses() {
        let s = Settings::from_toml(
            r#"
            [models.rainfall]
            seasonality_mode = "additive"

            [[models.rainfall.seasonalities]]
            name = "short_rains"
            period = 365.25
            fourier_order = 2
            condition = { name = "short_rains_season", months = [10, 11] }
            "#,
        )
        .unwrap();
        let rain = &s.models.rainfall;
        assert_eq!(rain.seasonality_mode, SeasonalityMode::Additive);
        assert_eq!(rain.seasonalities.len(), 1);
        let cond = rain.seasonalities[0].condition.as_ref().unwrap();
        assert!(cond.holds(10));
        assert!(!cond.holds(3));
    }

    #[test]
    fn unparsable_file_is_a_config_error() {
        let dir = std::env::temp_dir().join("climate_forecast_config_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.toml");
        std::fs::write(&path, "forecast_days = [").unwrap();
        let err = Settings::from_file(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Unreadable { .. }));
    }
}
