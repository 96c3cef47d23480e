// Hazard classification and financial impact.
//
// Each hazard bins a forecast series into ordered tiers:
//
// | Hazard | Aggregate | Low | Medium | High |
// |--------|-----------|-----|--------|------|
// | Drought | 21-day rain sum | `> medium` | `(high, medium]` | `<= high` |
// | Flood | 7-day rain sum | `<= low` | `(low, medium]` | `> medium` |
// | Extreme heat | daily °C | `<= medium` | `(medium, high]` | `> high` |
//
// Rolling hazards leave the first `window - 1` days unclassified (`None`).
// Those rows are kept in the output so dates stay aligned with the
// forecast, and are excluded from impact day counts.

use crate::config::{DroughtThresholds, FloodThresholds, HeatThresholds, RateTable, RiskThresholds};
use crate::error::{DataQualityError, Result};
use crate::types::{ForecastPoint, Hazard, ImpactSummary, RiskRecord, RiskTier};
use crate::util::rolling_sum;
use tracing::info;

pub const DROUGHT_WINDOW: usize = 21;
pub const FLOOD_WINDOW: usize = 7;

pub fn drought_tier(sum: f64, t: &DroughtThresholds) -> RiskTier {
    if sum <= t.high {
        RiskTier::High
    } else if sum <= t.medium {
        RiskTier::Medium
    } else {
        RiskTier::Low
    }
}

pub fn drought_score(sum: f64) -> f64 {
    (100.0 - sum / 3.0).clamp(0.0, 100.0)
}

pub fn flood_tier(sum: f64, t: &FloodThresholds) -> RiskTier {
    if sum <= t.low {
        RiskTier::Low
    } else if sum <= t.medium {
        RiskTier::Medium
    } else {
        RiskTier::High
    }
}

pub fn flood_score(sum: f64) -> f64 {
    (sum / 5.0).clamp(0.0, 100.0)
}

pub fn heat_tier(value: f64, t: &HeatThresholds) -> RiskTier {
    if value <= t.medium {
        RiskTier::Low
    } else if value <= t.high {
        RiskTier::Medium
    } else {
        RiskTier::High
    }
}

/// Linear in temperature: `medium - span` scores 0, `medium` one third,
/// `high` two thirds and `high + span` 100, where `span = high - medium`.
/// Each tier therefore owns one third of the scale.
pub fn heat_score(value: f64, t: &HeatThresholds) -> f64 {
    let span = t.high - t.medium;
    ((value - (t.medium - span)) / (3.0 * span) * 100.0).clamp(0.0, 100.0)
}

/// Run length of days strictly above `high`, restarting at 0 on any day at
/// or below it.
pub fn consecutive_hot_days(values: &[f64], high: f64) -> Vec<u32> {
    let mut streak = 0u32;
    values
        .iter()
        .map(|v| {
            streak = if *v > high { streak + 1 } else { 0 };
            streak
        })
        .collect()
}

/// Drought classification over the 21-day rain sum.
pub fn classify_drought(series: &[ForecastPoint], t: &DroughtThresholds) -> Result<Vec<RiskRecord>> {
    classify_rolling(series, Hazard::Drought, DROUGHT_WINDOW, |sum| {
        (drought_tier(sum, t), drought_score(sum))
    })
}

/// Flood classification over the 7-day rain sum.
pub fn classify_flood(series: &[ForecastPoint], t: &FloodThresholds) -> Result<Vec<RiskRecord>> {
    classify_rolling(series, Hazard::Flood, FLOOD_WINDOW, |sum| {
        (flood_tier(sum, t), flood_score(sum))
    })
}

/// Per-day heat classification with hot-streak tracking.
pub fn classify_extreme_heat(series: &[ForecastPoint], t: &HeatThresholds) -> Vec<RiskRecord> {
    let values: Vec<f64> = series.iter().map(|p| p.point_estimate).collect();
    let streaks = consecutive_hot_days(&values, t.high);
    series
        .iter()
        .zip(streaks)
        .map(|(p, streak)| RiskRecord {
            hazard: Hazard::ExtremeHeat,
            point: *p,
            rolling_aggregate: None,
            tier: Some(heat_tier(p.point_estimate, t)),
            score: Some(heat_score(p.point_estimate, t)),
            consecutive_hot_days: Some(streak),
        })
        .collect()
}

fn classify_rolling(
    series: &[ForecastPoint],
    hazard: Hazard,
    window: usize,
    classify: impl Fn(f64) -> (RiskTier, f64),
) -> Result<Vec<RiskRecord>> {
    if series.len() < window {
        return Err(DataQualityError::WindowNeverFilled {
            hazard: hazard.label(),
            window,
            len: series.len(),
        }
        .into());
    }
    let values: Vec<f64> = series.iter().map(|p| p.point_estimate).collect();
    let sums = rolling_sum(&values, window);
    Ok(series
        .iter()
        .zip(sums)
        .map(|(p, sum)| {
            let classified = sum.map(&classify);
            RiskRecord {
                hazard,
                point: *p,
                rolling_aggregate: sum,
                tier: classified.map(|(tier, _)| tier),
                score: classified.map(|(_, score)| score),
                consecutive_hot_days: None,
            }
        })
        .collect())
}

/// Sum of `rate[tier] * days(tier)` over the tiers present. Unclassified
/// rows are counted separately and never priced.
pub fn estimate_impact(records: &[RiskRecord], hazard: Hazard, rates: &RateTable) -> ImpactSummary {
    let count = |tier: RiskTier| records.iter().filter(|r| r.tier == Some(tier)).count();
    let (high, medium, low) = (
        count(RiskTier::High),
        count(RiskTier::Medium),
        count(RiskTier::Low),
    );
    let total_impact = RiskTier::ALL
        .iter()
        .zip([high, medium, low])
        .map(|(tier, days)| rates.rate(*tier) * days as f64)
        .sum();
    ImpactSummary {
        hazard,
        total_impact,
        high_risk_days: high,
        medium_risk_days: medium,
        low_risk_days: low,
        unclassified_days: records.iter().filter(|r| r.tier.is_none()).count(),
    }
}

/// Classifies forecasts for every hazard and prices the result, using the
/// thresholds and rates it was built with.
pub struct RiskAssessor {
    thresholds: RiskThresholds,
    rates: RateTable,
}

impl RiskAssessor {
    pub fn new(thresholds: RiskThresholds, rates: RateTable) -> Self {
        Self { thresholds, rates }
    }

    pub fn assess_drought_risk(&self, rain_forecast: &[ForecastPoint]) -> Result<Vec<RiskRecord>> {
        info!("Assessing drought risk");
        classify_drought(rain_forecast, &self.thresholds.drought)
    }

    pub fn assess_flood_risk(&self, rain_forecast: &[ForecastPoint]) -> Result<Vec<RiskRecord>> {
        info!("Assessing flood risk");
        classify_flood(rain_forecast, &self.thresholds.flood)
    }

    pub fn assess_extreme_heat(&self, temp_forecast: &[ForecastPoint]) -> Vec<RiskRecord> {
        info!("Assessing extreme heat risk");
        classify_extreme_heat(temp_forecast, &self.thresholds.extreme_heat)
    }

    pub fn calculate_financial_impact(&self, records: &[RiskRecord], hazard: Hazard) -> ImpactSummary {
        info!("Calculating financial impact of {hazard}");
        estimate_impact(records, hazard, &self.rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ClimateError;
    use chrono::{Days, NaiveDate};
    use proptest::prelude::*;

    fn series(values: &[f64]) -> Vec<ForecastPoint> {
        let start = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        values
            .iter()
            .enumerate()
            .map(|(i, v)| ForecastPoint {
                date: start + Days::new(i as u64),
                point_estimate: *v,
                lower_bound: v - 1.0,
                upper_bound: v + 1.0,
            })
            .collect()
    }

    fn record(tier: Option<RiskTier>) -> RiskRecord {
        RiskRecord {
            hazard: Hazard::Drought,
            point: series(&[0.0])[0],
            rolling_aggregate: None,
            tier,
            score: None,
            consecutive_hot_days: None,
        }
    }

    fn records(high: usize, medium: usize, low: usize, none: usize) -> Vec<RiskRecord> {
        std::iter::repeat(Some(RiskTier::High))
            .take(high)
            .chain(std::iter::repeat(Some(RiskTier::Medium)).take(medium))
            .chain(std::iter::repeat(Some(RiskTier::Low)).take(low))
            .chain(std::iter::repeat(None).take(none))
            .map(record)
            .collect()
    }

    #[test]
    fn drought_scenario_forty_mm() {
        // 21 days summing to 40 mm.
        let mut values = vec![2.0; 20];
        values.push(0.0);
        let out = classify_drought(&series(&values), &DroughtThresholds::default()).unwrap();
        let last = out.last().unwrap();
        assert_eq!(last.rolling_aggregate, Some(40.0));
        assert_eq!(last.tier, Some(RiskTier::High));
        let score = last.score.unwrap();
        assert!((score - 86.67).abs() < 0.01, "score {score}");
        assert!(out[..20].iter().all(|r| r.tier.is_none() && r.score.is_none()));
    }

    #[test]
    fn flood_scenario_two_hundred_fifty_mm() {
        let out = classify_flood(&series(&[50.0, 50.0, 50.0, 50.0, 25.0, 25.0, 0.0]), &FloodThresholds::default())
            .unwrap();
        let last = out.last().unwrap();
        assert_eq!(last.rolling_aggregate, Some(250.0));
        assert_eq!(last.tier, Some(RiskTier::High));
        assert_eq!(last.score, Some(50.0));
        assert_eq!(out.iter().filter(|r| r.tier.is_none()).count(), 6);
    }

    #[test]
    fn hot_streak_scenario() {
        assert_eq!(consecutive_hot_days(&[36.0, 37.0, 34.0, 38.0], 35.0), vec![1, 2, 0, 1]);
        // Exactly at the cut is not hot.
        assert_eq!(consecutive_hot_days(&[36.0, 35.0, 36.0], 35.0), vec![1, 0, 1]);
    }

    #[test]
    fn heat_tiers_and_streaks() {
        let out = classify_extreme_heat(&series(&[29.0, 30.0, 32.0, 35.0, 36.0, 37.0]), &HeatThresholds::default());
        let tiers: Vec<RiskTier> = out.iter().map(|r| r.tier.unwrap()).collect();
        assert_eq!(
            tiers,
            vec![
                RiskTier::Low,
                RiskTier::Low,
                RiskTier::Medium,
                RiskTier::Medium,
                RiskTier::High,
                RiskTier::High
            ]
        );
        let streaks: Vec<u32> = out.iter().map(|r| r.consecutive_hot_days.unwrap()).collect();
        assert_eq!(streaks, vec![0, 0, 0, 0, 1, 2]);
        assert!(out.iter().all(|r| r.rolling_aggregate.is_none()));
    }

    #[test]
    fn heat_score_splits_scale_by_tier() {
        let t = HeatThresholds::default();
        assert_eq!(heat_score(25.0, &t), 0.0);
        assert!((heat_score(30.0, &t) - 100.0 / 3.0).abs() < 1e-9);
        assert!((heat_score(35.0, &t) - 200.0 / 3.0).abs() < 1e-9);
        assert_eq!(heat_score(45.0, &t), 100.0);
    }

    #[test]
    fn tier_boundaries_are_right_inclusive() {
        let d = DroughtThresholds::default();
        assert_eq!(drought_tier(50.0, &d), RiskTier::High);
        assert_eq!(drought_tier(50.01, &d), RiskTier::Medium);
        assert_eq!(drought_tier(150.0, &d), RiskTier::Medium);
        assert_eq!(drought_tier(150.01, &d), RiskTier::Low);
        let f = FloodThresholds::default();
        assert_eq!(flood_tier(100.0, &f), RiskTier::Low);
        assert_eq!(flood_tier(200.0, &f), RiskTier::Medium);
        assert_eq!(flood_tier(200.5, &f), RiskTier::High);
    }

    #[test]
    fn short_series_never_fills_window() {
        let err = classify_drought(&series(&[1.0; 20]), &DroughtThresholds::default()).unwrap_err();
        assert!(matches!(
            err,
            ClimateError::DataQuality(DataQualityError::WindowNeverFilled { window: 21, len: 20, .. })
        ));
    }

    #[test]
    fn impact_scenario() {
        let summary = estimate_impact(&records(2, 3, 5, 0), Hazard::Drought, &RateTable::default());
        assert_eq!(summary.total_impact, 150_000.0);
        assert_eq!(
            (summary.high_risk_days, summary.medium_risk_days, summary.low_risk_days),
            (2, 3, 5)
        );
    }

    #[test]
    fn unclassified_rows_are_excluded() {
        let summary = estimate_impact(&records(0, 1, 0, 20), Hazard::Drought, &RateTable::default());
        assert_eq!(summary.total_impact, 15_000.0);
        assert_eq!(summary.unclassified_days, 20);
        assert_eq!(summary.days(RiskTier::High), 0);
        let empty = estimate_impact(&[], Hazard::Flood, &RateTable::default());
        assert_eq!(empty.total_impact, 0.0);
    }

    #[test]
    fn assessor_uses_configured_thresholds() {
        let thresholds = RiskThresholds {
            extreme_heat: HeatThresholds { medium: 20.0, high: 25.0 },
            ..RiskThresholds::default()
        };
        let assessor = RiskAssessor::new(thresholds, RateTable::default());
        let heat = assessor.assess_extreme_heat(&series(&[26.0, 26.0]));
        assert_eq!(heat[1].consecutive_hot_days, Some(2));
        let impact = assessor.calculate_financial_impact(&heat, Hazard::ExtremeHeat);
        assert_eq!(impact.total_impact, 100_000.0);
    }

    fn tier() -> impl Strategy<Value = Option<RiskTier>> {
        prop_oneof![
            Just(None),
            Just(Some(RiskTier::Low)),
            Just(Some(RiskTier::Medium)),
            Just(Some(RiskTier::High)),
        ]
    }

    proptest! {
        #[test]
        fn drought_tier_never_rises_with_more_rain(a in 0.0f64..500.0, b in 0.0f64..500.0) {
            let t = DroughtThresholds::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(drought_tier(hi, &t) <= drought_tier(lo, &t));
        }

        #[test]
        fn flood_tier_never_falls_with_more_rain(a in 0.0f64..500.0, b in 0.0f64..500.0) {
            let t = FloodThresholds::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(flood_tier(hi, &t) >= flood_tier(lo, &t));
            prop_assert!(flood_score(hi) >= flood_score(lo));
        }

        #[test]
        fn heat_tier_and_score_are_monotonic(a in -10.0f64..50.0, b in -10.0f64..50.0) {
            let t = HeatThresholds::default();
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(heat_tier(hi, &t) >= heat_tier(lo, &t));
            prop_assert!(heat_score(hi, &t) >= heat_score(lo, &t));
        }

        #[test]
        fn scores_stay_in_range(sum in -100.0f64..2000.0) {
            prop_assert!((0.0..=100.0).contains(&drought_score(sum)));
            prop_assert!((0.0..=100.0).contains(&flood_score(sum)));
        }

        #[test]
        fn impact_is_additive(
            a in proptest::collection::vec(tier(), 0..40),
            b in proptest::collection::vec(tier(), 0..40),
        ) {
            let rates = RateTable::default();
            let ra: Vec<RiskRecord> = a.iter().copied().map(record).collect();
            let rb: Vec<RiskRecord> = b.iter().copied().map(record).collect();
            let joined: Vec<RiskRecord> = ra.iter().chain(rb.iter()).cloned().collect();
            let whole = estimate_impact(&joined, Hazard::Drought, &rates).total_impact;
            let parts = estimate_impact(&ra, Hazard::Drought, &rates).total_impact
                + estimate_impact(&rb, Hazard::Drought, &rates).total_impact;
            prop_assert_eq!(whole, parts);
        }

        #[test]
        fn hot_streak_increments_or_resets(values in proptest::collection::vec(20.0f64..45.0, 1..60)) {
            let high = 35.0;
            let streaks = consecutive_hot_days(&values, high);
            for i in 0..values.len() {
                let prev = if i == 0 { 0 } else { streaks[i - 1] };
                if values[i] > high {
                    prop_assert_eq!(streaks[i], prev + 1);
                } else {
                    prop_assert_eq!(streaks[i], 0);
                }
            }
        }
    }
}
