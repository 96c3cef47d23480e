// End-to-end run: data → models → accuracy → risk → impact → alerts.
//
// Every stage fully materializes its output before the next one starts, and
// any error aborts the run. Nothing here retries.
use crate::alerts::AlertSystem;
use crate::config::Settings;
use crate::error::{DataQualityError, Result};
use crate::features::add_features;
use crate::forecast::{evaluate_model, merge_forecasts, ClimateForecaster, Metric};
use crate::loader::{clean_data, load_csv, CleanReport, LoadReport};
use crate::risk::RiskAssessor;
use crate::synthetic::WeatherGenerator;
use crate::types::{
    AccuracyMetrics, AlertEvent, FeatureRow, ForecastPoint, Hazard, ImpactSummary,
    Observation, RawObservation, RiskRecord,
};
use chrono::NaiveDate;
use tracing::info;

#[derive(Debug)]
pub struct PipelineResults {
    /// Present when history came from a CSV feed.
    pub load_report: Option<LoadReport>,
    pub clean_report: CleanReport,
    pub observations: usize,
    pub features: Vec<FeatureRow>,
    pub training_days: usize,
    pub validation_days: usize,
    pub forecast_days: usize,
    pub temp_metrics: AccuracyMetrics,
    pub rain_metrics: AccuracyMetrics,
    pub temp_forecast: Vec<ForecastPoint>,
    pub rain_forecast: Vec<ForecastPoint>,
    pub drought_risk: Vec<RiskRecord>,
    pub flood_risk: Vec<RiskRecord>,
    pub heat_risk: Vec<RiskRecord>,
    pub drought_impact: ImpactSummary,
    pub flood_impact: ImpactSummary,
    pub heat_impact: ImpactSummary,
    pub alerts: Vec<AlertEvent>,
}

pub struct ClimateForecastingPipeline {
    settings: Settings,
    forecaster: ClimateForecaster,
    risk_assessor: RiskAssessor,
    alert_system: AlertSystem,
}

impl ClimateForecastingPipeline {
    pub fn new(settings: Settings) -> Self {
        let forecaster = ClimateForecaster::new(settings.models.clone());
        let risk_assessor = RiskAssessor::new(settings.risk_thresholds, settings.financial_impact);
        let alert_system =
            AlertSystem::new(settings.alert_thresholds, settings.risk_thresholds.drought);
        info!("ClimateForecastingPipeline initialized");
        Self {
            settings,
            forecaster,
            risk_assessor,
            alert_system,
        }
    }

    /// Run every stage. Synthetic history, when used, ends on `today`.
    pub fn run_complete_forecast(&mut self, today: NaiveDate) -> Result<PipelineResults> {
        let forecast_days = self.settings.forecast_days;
        info!("STARTING CLIMATE FORECASTING PIPELINE");

        info!("STEP 1: Data Collection");
        let (raw, load_report) = self.collect(today)?;
        let (clean, clean_report) = clean_data(raw)?;
        let features = add_features(&clean);

        info!("STEP 2: Model Training");
        let ratio = self.settings.train_test_split;
        let split_point = (clean.len() as f64 * ratio) as usize;
        if split_point == 0 {
            return Err(DataQualityError::EmptyTrainingSet(ratio).into());
        }
        let (train, test) = clean.split_at(split_point);
        info!(train = train.len(), validation = test.len(), "Split history");
        self.forecaster.train_temperature_model(train)?;
        self.forecaster.train_rainfall_model(train)?;

        info!("STEP 3: Generating Forecasts");
        let temp_forecast = self.forecaster.predict_temperature(forecast_days)?;
        let rain_forecast = self.forecaster.predict_rainfall(forecast_days)?;

        info!("STEP 4: Model Evaluation");
        let test_temp = self.forecaster.predict_temperature(test.len())?;
        let test_rain = self.forecaster.predict_rainfall(test.len())?;
        let temp_metrics = evaluate_model(test, &test_temp, Metric::Temperature)?;
        let rain_metrics = evaluate_model(test, &test_rain, Metric::Rainfall)?;

        info!("STEP 5: Risk Assessment");
        let drought_risk = self.risk_assessor.assess_drought_risk(&rain_forecast)?;
        let flood_risk = self.risk_assessor.assess_flood_risk(&rain_forecast)?;
        let heat_risk = self.risk_assessor.assess_extreme_heat(&temp_forecast);
        let drought_impact = self
            .risk_assessor
            .calculate_financial_impact(&drought_risk, Hazard::Drought);
        let flood_impact = self
            .risk_assessor
            .calculate_financial_impact(&flood_risk, Hazard::Flood);
        let heat_impact = self
            .risk_assessor
            .calculate_financial_impact(&heat_risk, Hazard::ExtremeHeat);

        info!("STEP 6: Alert Generation");
        let merged = merge_forecasts(&temp_forecast, &rain_forecast);
        let alerts = self.alert_system.check_thresholds(&merged, &drought_risk);

        info!("PIPELINE COMPLETED SUCCESSFULLY");
        Ok(PipelineResults {
            load_report,
            clean_report,
            observations: clean.len(),
            features,
            training_days: train.len(),
            validation_days: test.len(),
            forecast_days,
            temp_metrics,
            rain_metrics,
            temp_forecast,
            rain_forecast,
            drought_risk,
            flood_risk,
            heat_risk,
            drought_impact,
            flood_impact,
            heat_impact,
            alerts,
        })
    }

    fn collect(&self, today: NaiveDate) -> Result<(Vec<RawObservation>, Option<LoadReport>)> {
        match &self.settings.data.input_path {
            Some(path) => {
                let (rows, report) = load_csv(path)?;
                Ok((rows, Some(report)))
            }
            None => {
                let generated: Vec<Observation> =
                    WeatherGenerator::new(self.settings.data.clone()).generate(today)?;
                Ok((generated.into_iter().map(RawObservation::from).collect(), None))
            }
        }
    }
}
