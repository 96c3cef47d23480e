// Synthetic daily weather, standing in for a real observations feed.
use crate::config::DataSettings;
use crate::error::{DataQualityError, Result};
use crate::types::Observation;
use crate::util::round_to;
use chrono::{Datelike, Days, NaiveDate};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Exp, Gamma, Normal};
use std::f64::consts::PI;
use tracing::info;

/// Months with rainy-season rainfall.
const RAINY_MONTHS: [u32; 5] = [3, 4, 5, 10, 11];
const RAINY_MEAN_MM: f64 = 15.0;
const DRY_MEAN_MM: f64 = 2.0;

pub struct WeatherGenerator {
    settings: DataSettings,
}

impl WeatherGenerator {
    pub fn new(settings: DataSettings) -> Self {
        Self { settings }
    }

    /// Generate `historical_years` of daily observations ending on `end`
    /// (inclusive). The same seed and end date always yield the same series.
    pub fn generate(&self, end: NaiveDate) -> Result<Vec<Observation>> {
        let years = self.settings.historical_years;
        info!(years, %end, "Generating historical weather data");

        let mut rng = StdRng::seed_from_u64(self.settings.seed);
        // Parameters are compile-time valid, so construction cannot fail.
        let daily_noise = Normal::new(0.0, 2.0).expect("valid normal");
        let humidity_noise = Normal::new(0.0, 5.0).expect("valid normal");
        let rainy = Exp::new(1.0 / RAINY_MEAN_MM).expect("valid exponential");
        let dry = Exp::new(1.0 / DRY_MEAN_MM).expect("valid exponential");
        let wind = Gamma::new(2.0, 5.0).expect("valid gamma");

        let start = end
            .checked_sub_days(Days::new(365 * u64::from(years)))
            .ok_or(DataQualityError::DateOutOfRange("synthetic history start"))?;
        let mut data = Vec::with_capacity(365 * years as usize + 1);
        let mut date = start;
        loop {
            let seasonal = self.settings.seasonal_variation
                * (2.0 * PI * date.ordinal() as f64 / 365.0).sin();
            let temperature =
                self.settings.temperature_base + seasonal + daily_noise.sample(&mut rng);

            let rainfall: f64 = if RAINY_MONTHS.contains(&date.month()) {
                rainy.sample(&mut rng)
            } else {
                dry.sample(&mut rng)
            };

            let humidity = (self.settings.base_humidity
                + rainfall / 5.0
                + humidity_noise.sample(&mut rng))
            .clamp(30.0, 95.0);

            let wind_speed: f64 = wind.sample(&mut rng);

            data.push(Observation {
                date,
                temperature: round_to(temperature, 2),
                rainfall: round_to(rainfall.max(0.0), 2),
                humidity: round_to(humidity, 2),
                wind_speed: round_to(wind_speed.max(0.0), 2),
            });
            match date.succ_opt() {
                Some(next) if next <= end => date = next,
                _ => break,
            }
        }

        info!(records = data.len(), "Generated weather records");
        Ok(data)
    }
}
