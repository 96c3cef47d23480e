// Threshold alerts over the merged forecast.
//
// The scan is stateless: each day is judged on its own values, and several
// alerts may fire on the same day.
use crate::config::{AlertThresholds, DroughtThresholds};
use crate::types::{AlertEvent, AlertKind, MergedForecast, RiskRecord, RiskTier, Severity};
use crate::util::format_number;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fmt::Write;
use tracing::{info, warn};

/// Margin above a threshold at which an alert becomes critical.
const CRITICAL_HEAT_MARGIN_C: f64 = 3.0;
const CRITICAL_RAIN_FACTOR: f64 = 1.5;

pub struct AlertSystem {
    thresholds: AlertThresholds,
    drought: DroughtThresholds,
}

impl AlertSystem {
    pub fn new(thresholds: AlertThresholds, drought: DroughtThresholds) -> Self {
        Self { thresholds, drought }
    }

    /// Alerts in date order; within a day, heat then rainfall then drought.
    pub fn check_thresholds(
        &self,
        merged: &[MergedForecast],
        drought_risk: &[RiskRecord],
    ) -> Vec<AlertEvent> {
        info!("Checking forecast against alert thresholds");
        let drought_by_date: HashMap<NaiveDate, &RiskRecord> =
            drought_risk.iter().map(|r| (r.point.date, r)).collect();

        let mut alerts = Vec::new();
        for row in merged {
            let temp = row.temperature.point_estimate;
            if temp > self.thresholds.extreme_heat {
                let severity = if temp > self.thresholds.extreme_heat + CRITICAL_HEAT_MARGIN_C {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                alerts.push(AlertEvent {
                    date: row.date,
                    kind: AlertKind::ExtremeHeat,
                    observed_value: temp,
                    threshold_exceeded: self.thresholds.extreme_heat,
                    severity,
                    message: format!(
                        "Extreme heat: {}°C forecast (threshold {}°C)",
                        format_number(temp, 1),
                        format_number(self.thresholds.extreme_heat, 1)
                    ),
                });
            }

            let rain = row.rainfall.point_estimate;
            if rain > self.thresholds.heavy_rainfall {
                let severity = if rain > self.thresholds.heavy_rainfall * CRITICAL_RAIN_FACTOR {
                    Severity::Critical
                } else {
                    Severity::Warning
                };
                alerts.push(AlertEvent {
                    date: row.date,
                    kind: AlertKind::HeavyRainfall,
                    observed_value: rain,
                    threshold_exceeded: self.thresholds.heavy_rainfall,
                    severity,
                    message: format!(
                        "Heavy rainfall: {}mm forecast (threshold {}mm)",
                        format_number(rain, 1),
                        format_number(self.thresholds.heavy_rainfall, 1)
                    ),
                });
            }

            if let Some(r) = drought_by_date.get(&row.date) {
                if let (Some(RiskTier::High), Some(sum)) = (r.tier, r.rolling_aggregate) {
                    alerts.push(AlertEvent {
                        date: row.date,
                        kind: AlertKind::Drought,
                        observed_value: sum,
                        threshold_exceeded: self.drought.high,
                        severity: Severity::Warning,
                        message: format!(
                            "Drought: {}mm over 21 days (at or below {}mm)",
                            format_number(sum, 1),
                            format_number(self.drought.high, 1)
                        ),
                    });
                }
            }
        }

        if alerts.is_empty() {
            info!("No alerts raised");
        } else {
            warn!(count = alerts.len(), "Alerts raised");
        }
        alerts
    }
}

/// Plain-text report: total count, then one section per alert kind with its
/// alerts in date order.
pub fn generate_alert_report(alerts: &[AlertEvent]) -> String {
    if alerts.is_empty() {
        return "  No alerts for the forecast period.".to_string();
    }
    let mut out = String::new();
    let _ = writeln!(out, "  Total alerts: {}", alerts.len());
    for kind in AlertKind::ALL {
        let group: Vec<&AlertEvent> = alerts.iter().filter(|a| a.kind == kind).collect();
        if group.is_empty() {
            continue;
        }
        let critical = group.iter().filter(|a| a.severity == Severity::Critical).count();
        let _ = writeln!(
            out,
            "  {} ({} alerts, {} critical):",
            kind,
            group.len(),
            critical
        );
        for a in group {
            let marker = match a.severity {
                Severity::Critical => "!!",
                Severity::Warning => " -",
            };
            let _ = writeln!(out, "   {} {}  {}", marker, a.date, a.message);
        }
    }
    out.trim_end().to_string()
}
