// Calendar and trailing-window features for the historical series.
use crate::types::{FeatureRow, Observation, Season};
use crate::util::{rolling_mean, rolling_sum};
use chrono::Datelike;

/// Rain below this many mm counts as a dry day.
const DRY_DAY_MM: f64 = 5.0;
const DROUGHT_WINDOW: usize = 21;

pub fn add_features(data: &[Observation]) -> Vec<FeatureRow> {
    let temps: Vec<f64> = data.iter().map(|o| o.temperature).collect();
    let rain: Vec<f64> = data.iter().map(|o| o.rainfall).collect();
    let dry: Vec<f64> = rain
        .iter()
        .map(|r| if *r < DRY_DAY_MM { 1.0 } else { 0.0 })
        .collect();

    let t7 = rolling_mean(&temps, 7);
    let t14 = rolling_mean(&temps, 14);
    let t30 = rolling_mean(&temps, 30);
    let r7 = rolling_sum(&rain, 7);
    let r14 = rolling_sum(&rain, 14);
    let r30 = rolling_sum(&rain, 30);
    let drought = rolling_sum(&dry, DROUGHT_WINDOW);

    data.iter()
        .enumerate()
        .map(|(i, o)| {
            let month = o.date.month();
            FeatureRow {
                date: o.date,
                temperature: o.temperature,
                rainfall: o.rainfall,
                humidity: o.humidity,
                wind_speed: o.wind_speed,
                year: o.date.year(),
                month,
                day: o.date.day(),
                day_of_year: o.date.ordinal(),
                quarter: (month - 1) / 3 + 1,
                season: Season::from_month(month),
                temp_rolling_7d: t7[i],
                temp_rolling_14d: t14[i],
                temp_rolling_30d: t30[i],
                rain_rolling_7d: r7[i],
                rain_rolling_14d: r14[i],
                rain_rolling_30d: r30[i],
                heat_index: o.temperature + 0.5 * o.humidity,
                drought_days: drought[i].map(|d| d.round() as u32),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Days, NaiveDate};

    fn series(n: usize) -> Vec<Observation> {
        let start = NaiveDate::from_ymd_opt(2024, 2, 20).unwrap();
        (0..n)
            .map(|i| Observation {
                date: start + Days::new(i as u64),
                temperature: 20.0 + i as f64,
                rainfall: if i % 2 == 0 { 0.0 } else { 10.0 },
                humidity: 50.0,
                wind_speed: 5.0,
            })
            .collect()
    }

    #[test]
    fn calendar_fields() {
        let rows = add_features(&series(15));
        let march = &rows[10];
        assert_eq!(march.date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(march.month, 3);
        assert_eq!(march.quarter, 1);
        assert_eq!(march.day_of_year, 61);
        assert_eq!(march.season, Season::LongRains);
        assert_eq!(rows[0].season, Season::DrySeason);
        assert_eq!(march.heat_index, 30.0 + 25.0);
    }

    #[test]
    fn windows_fill_after_enough_days() {
        let rows = add_features(&series(30));
        assert_eq!(rows[5].temp_rolling_7d, None);
        assert_eq!(rows[6].temp_rolling_7d, Some(23.0));
        assert_eq!(rows[6].rain_rolling_7d, Some(30.0));
        assert_eq!(rows[19].drought_days, None);
        // 21 days starting at an even index: 11 dry, 10 wet.
        assert_eq!(rows[20].drought_days, Some(11));
        assert_eq!(rows[29].rain_rolling_30d, Some(150.0));
    }

    #[test]
    fn season_mapping() {
        assert_eq!(Season::from_month(4), Season::LongRains);
        assert_eq!(Season::from_month(11), Season::ShortRains);
        assert_eq!(Season::from_month(7), Season::DrySeason);
    }
}
