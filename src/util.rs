// Parsing, statistics and number formatting helpers.
//
// Everything that deals with forgiving CSV cells, rolling windows or
// human-readable numbers lives here so the pipeline stages can work with
// clean typed values.
use chrono::NaiveDate;
use num_format::{Locale, ToFormattedString};

/// Parse a CSV cell into `f64`, tolerating thousands separators and padding.
///
/// - Trims whitespace.
/// - Rejects values that contain alphabetic characters.
/// - Returns `None` for anything that cannot be safely parsed, including NaN.
pub fn parse_f64_safe(s: Option<&str>) -> Option<f64> {
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    if s.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    let s = s.replace(",", "");
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date_safe(s: Option<&str>) -> Option<NaiveDate> {
    // Feed dates are `YYYY-MM-DD`, optionally followed by a time component.
    let s = s?.trim();
    if s.is_empty() {
        return None;
    }
    let day = s.split(|c| c == ' ' || c == 'T').next().unwrap_or(s);
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

pub fn average(v: &[f64]) -> f64 {
    // Arithmetic mean; 0 for an empty slice so callers never see NaN.
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().copied().sum();
    sum / v.len() as f64
}

/// Quantile with linear interpolation between closest ranks.
///
/// `q` is clamped to `[0, 1]`. Returns `None` for an empty input.
pub fn quantile(mut v: Vec<f64>, q: f64) -> Option<f64> {
    if v.is_empty() {
        return None;
    }
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let pos = q.clamp(0.0, 1.0) * (v.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    Some(v[lo] + (v[hi] - v[lo]) * frac)
}

/// Trailing-window sums. Positions before the window is full are `None`.
pub fn rolling_sum(values: &[f64], window: usize) -> Vec<Option<f64>> {
    if window == 0 {
        return vec![None; values.len()];
    }
    let mut out = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    for (i, v) in values.iter().enumerate() {
        acc += v;
        if i >= window {
            acc -= values[i - window];
        }
        out.push(if i + 1 >= window { Some(acc) } else { None });
    }
    out
}

pub fn rolling_mean(values: &[f64], window: usize) -> Vec<Option<f64>> {
    rolling_sum(values, window)
        .into_iter()
        .map(|s| s.map(|s| s / window as f64))
        .collect()
}

pub fn round_to(n: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (n * factor).round() / factor
}

pub fn format_number(n: f64, decimals: usize) -> String {
    // Fixed decimals plus locale-aware thousands separators (`1,234,567.89`).
    let s = format!("{:.*}", decimals, n.abs());
    // Values that round to zero print without a sign.
    let neg = n < 0.0 && s.bytes().any(|b| (b'1'..=b'9').contains(&b));
    let mut parts = s.split('.');
    let int_part = parts.next().unwrap_or("0");
    let frac_part = parts.next();
    let int_val: i64 = int_part.parse().unwrap_or(0);
    let mut res = int_val.to_formatted_string(&Locale::en);
    if let Some(frac) = frac_part {
        res.push('.');
        res.push_str(frac);
    }
    if neg {
        format!("-{}", res)
    } else {
        res
    }
}

pub fn format_currency(n: f64) -> String {
    format!("${}", format_number(n, 2))
}

pub fn format_int<T>(n: T) -> String
where
    T: ToFormattedString,
{
    n.to_formatted_string(&Locale::en)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_f64_rejects_text_and_strips_separators() {
        assert_eq!(parse_f64_safe(Some(" 1,234.5 ")), Some(1234.5));
        assert_eq!(parse_f64_safe(Some("n/a")), None);
        assert_eq!(parse_f64_safe(Some("")), None);
        assert_eq!(parse_f64_safe(None), None);
    }

    #[test]
    fn parse_date_accepts_timestamp_suffix() {
        let d = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date_safe(Some("2024-03-09")), Some(d));
        assert_eq!(parse_date_safe(Some("2024-03-09 13:45:00")), Some(d));
        assert_eq!(parse_date_safe(Some("09/03/2024")), None);
    }

    #[test]
    fn rolling_sum_leaves_leading_rows_empty() {
        let sums = rolling_sum(&[1.0, 2.0, 3.0, 4.0], 3);
        assert_eq!(sums, vec![None, None, Some(6.0), Some(9.0)]);
    }

    #[test]
    fn rolling_mean_divides_by_window() {
        let means = rolling_mean(&[2.0, 4.0, 6.0], 2);
        assert_eq!(means, vec![None, Some(3.0), Some(5.0)]);
    }

    #[test]
    fn quantile_interpolates() {
        let v = vec![1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(quantile(v.clone(), 0.5), Some(3.0));
        assert_eq!(quantile(v.clone(), 0.0), Some(1.0));
        assert!((quantile(v, 0.1).unwrap() - 1.4).abs() < 1e-12);
        assert_eq!(quantile(Vec::new(), 0.5), None);
    }

    #[test]
    fn format_number_groups_thousands() {
        assert_eq!(format_number(1234567.891, 2), "1,234,567.89");
        assert_eq!(format_number(-42.0, 1), "-42.0");
        assert_eq!(format_number(7.0, 0), "7");
        assert_eq!(format_currency(150000.0), "$150,000.00");
    }

    #[test]
    fn format_number_drops_sign_of_rounded_zero() {
        assert_eq!(format_number(-0.004, 2), "0.00");
        assert_eq!(format_number(-0.005001, 2), "-0.01");
        assert_eq!(format_number(-0.0, 1), "0.0");
    }
}
