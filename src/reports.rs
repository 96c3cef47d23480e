use crate::pipeline::PipelineResults;
use crate::types::{
    FeatureRow, ForecastPoint, ForecastRow, ImpactRow, ImpactSummary, RiskRecord, RunSummary, Season,
    SeasonRow,
};
use crate::util::{average, format_currency, format_number};
use std::collections::HashMap;

pub fn forecast_rows(points: &[ForecastPoint], unit: &str) -> Vec<ForecastRow> {
    points
        .iter()
        .map(|p| ForecastRow {
            date: p.date.to_string(),
            forecast: format!("{}{}", format_number(p.point_estimate, 1), unit),
            lower: format!("{}{}", format_number(p.lower_bound, 1), unit),
            upper: format!("{}{}", format_number(p.upper_bound, 1), unit),
        })
        .collect()
}

pub fn impact_rows(impacts: &[&ImpactSummary]) -> Vec<ImpactRow> {
    impacts
        .iter()
        .map(|s| ImpactRow {
            hazard: s.hazard.to_string(),
            high_days: s.high_risk_days,
            medium_days: s.medium_risk_days,
            low_days: s.low_risk_days,
            unclassified_days: s.unclassified_days,
            total_impact: format_currency(s.total_impact),
        })
        .collect()
}

/// Per-season averages over the whole history, in calendar order of the
/// seasons' first months.
pub fn season_overview(features: &[FeatureRow]) -> Vec<SeasonRow> {
    #[derive(Default)]
    struct Acc {
        temps: Vec<f64>,
        rain: Vec<f64>,
        heat: Vec<f64>,
    }
    let mut map: HashMap<Season, Acc> = HashMap::new();
    for f in features {
        let e = map.entry(f.season).or_default();
        e.temps.push(f.temperature);
        e.rain.push(f.rainfall);
        e.heat.push(f.heat_index);
    }
    [Season::LongRains, Season::ShortRains, Season::DrySeason]
        .into_iter()
        .filter_map(|season| {
            map.remove(&season).map(|acc| SeasonRow {
                season: season.to_string(),
                days: acc.temps.len(),
                avg_temperature: format_number(average(&acc.temps), 2),
                avg_rainfall: format_number(average(&acc.rain), 2),
                avg_heat_index: format_number(average(&acc.heat), 2),
            })
        })
        .collect()
}

pub fn longest_hot_streak(heat_risk: &[RiskRecord]) -> u32 {
    heat_risk
        .iter()
        .filter_map(|r| r.consecutive_hot_days)
        .max()
        .unwrap_or(0)
}

/// Largest rolling aggregate among classified rows.
pub fn peak_aggregate(records: &[RiskRecord]) -> Option<f64> {
    records
        .iter()
        .filter_map(|r| r.rolling_aggregate)
        .reduce(f64::max)
}

/// Smallest rolling aggregate among classified rows.
pub fn lowest_aggregate(records: &[RiskRecord]) -> Option<f64> {
    records
        .iter()
        .filter_map(|r| r.rolling_aggregate)
        .reduce(f64::min)
}

pub struct ForecastStats {
    pub avg_temperature: f64,
    pub max_temperature: f64,
    pub total_rainfall: f64,
    pub max_daily_rainfall: f64,
}

pub fn forecast_stats(temp: &[ForecastPoint], rain: &[ForecastPoint]) -> ForecastStats {
    let temps: Vec<f64> = temp.iter().map(|p| p.point_estimate).collect();
    let rains: Vec<f64> = rain.iter().map(|p| p.point_estimate).collect();
    ForecastStats {
        avg_temperature: average(&temps),
        max_temperature: temps.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        total_rainfall: rains.iter().sum(),
        max_daily_rainfall: rains.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    }
}

pub fn run_summary(r: &PipelineResults) -> RunSummary {
    RunSummary {
        observations: r.observations,
        training_days: r.training_days,
        validation_days: r.validation_days,
        forecast_days: r.forecast_days,
        temperature_accuracy: r.temp_metrics.accuracy,
        rainfall_accuracy: r.rain_metrics.accuracy,
        impacts: vec![
            r.drought_impact.clone(),
            r.flood_impact.clone(),
            r.heat_impact.clone(),
        ],
        longest_hot_streak: longest_hot_streak(&r.heat_risk),
        peak_7d_rainfall: peak_aggregate(&r.flood_risk),
        alert_count: r.alerts.len(),
        alerts: r.alerts.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::add_features;
    use crate::types::{Hazard, Observation};
    use chrono::{Days, NaiveDate};

    fn point(i: u64, v: f64) -> ForecastPoint {
        ForecastPoint {
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap() + Days::new(i),
            point_estimate: v,
            lower_bound: v - 1.0,
            upper_bound: v + 1.0,
        }
    }

    #[test]
    fn forecast_rows_format_units() {
        let rows = forecast_rows(&[point(0, 1234.56)], "mm");
        assert_eq!(rows[0].date, "2025-01-01");
        assert_eq!(rows[0].forecast, "1,234.6mm");
        assert_eq!(rows[0].lower, "1,233.6mm");
    }

    #[test]
    fn stats_over_forecasts() {
        let s = forecast_stats(
            &[point(0, 30.0), point(1, 34.0)],
            &[point(0, 2.0), point(1, 10.0)],
        );
        assert_eq!(s.avg_temperature, 32.0);
        assert_eq!(s.max_temperature, 34.0);
        assert_eq!(s.total_rainfall, 12.0);
        assert_eq!(s.max_daily_rainfall, 10.0);
    }

    #[test]
    fn season_overview_orders_seasons() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let obs: Vec<Observation> = (0..366)
            .map(|i| Observation {
                date: start + Days::new(i),
                temperature: 20.0,
                rainfall: 1.0,
                humidity: 40.0,
                wind_speed: 3.0,
            })
            .collect();
        let rows = season_overview(&add_features(&obs));
        let names: Vec<&str> = rows.iter().map(|r| r.season.as_str()).collect();
        assert_eq!(names, vec!["Long Rains", "Short Rains", "Dry Season"]);
        assert_eq!(rows[0].days, 31 + 30 + 31);
        assert_eq!(rows[1].days, 31 + 30);
        assert_eq!(rows[2].avg_heat_index, "40.00");
    }

    #[test]
    fn aggregates_skip_unclassified_rows() {
        let rec = |agg: Option<f64>| RiskRecord {
            hazard: Hazard::Flood,
            point: point(0, 1.0),
            rolling_aggregate: agg,
            tier: None,
            score: None,
            consecutive_hot_days: None,
        };
        let records = vec![rec(None), rec(Some(120.0)), rec(Some(80.0))];
        assert_eq!(peak_aggregate(&records), Some(120.0));
        assert_eq!(lowest_aggregate(&records), Some(80.0));
        assert_eq!(peak_aggregate(&records[..1]), None);
    }

    #[test]
    fn impact_rows_format_currency() {
        let s = ImpactSummary {
            hazard: Hazard::Flood,
            total_impact: 45000.0,
            high_risk_days: 0,
            medium_risk_days: 3,
            low_risk_days: 0,
            unclassified_days: 6,
        };
        let rows = impact_rows(&[&s]);
        assert_eq!(rows[0].hazard, "flood");
        assert_eq!(rows[0].total_impact, "$45,000.00");
    }
}
