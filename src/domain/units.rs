// Value display policy and the magnitude-aware scaling collaborator
use chrono::DateTime;

/// Magnitude-aware unit scaling. The crate owns the policy of when to scale
/// (see [`format_value`]); implementations own the scaling itself, so an
/// embedding UI can swap in its platform's formatter.
pub trait ValueScaler: Send + Sync {
    fn format_scaled(&self, value: f64, unit: &str, decimals: usize) -> String;
}

/// Format a value for axis labels and tooltips. Small values in the unitless
/// categories are rendered with 3 significant digits instead of unit scaling,
/// which would otherwise show fractional rates as "0".
pub fn format_value(value: f64, unit: Option<&str>, scaler: &dyn ValueScaler) -> String {
    let unit = unit.unwrap_or("none");
    if matches!(unit, "none" | "short") && value.abs() < 1.0 {
        return to_precision(value, 3);
    }
    scaler.format_scaled(value, unit, 2)
}

/// Fixed significant-digit rendering, e.g. `to_precision(0.5, 3)` -> "0.500".
fn to_precision(value: f64, significant: i32) -> String {
    if value == 0.0 {
        let decimals = (significant - 1).max(0) as usize;
        return format!("{value:.decimals$}");
    }
    let exponent = value.abs().log10().floor() as i32;
    let decimals = (significant - 1 - exponent).max(0) as usize;
    format!("{value:.decimals$}")
}

/// Default [`ValueScaler`] covering the unit categories the charts declare.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaledFormatter;

const SHORT_SUFFIXES: [&str; 5] = ["", "K", "M", "G", "T"];
const BYTE_SUFFIXES: [&str; 6] = [" B", " KiB", " MiB", " GiB", " TiB", " PiB"];

impl ValueScaler for ScaledFormatter {
    fn format_scaled(&self, value: f64, unit: &str, decimals: usize) -> String {
        if !value.is_finite() {
            return value.to_string();
        }
        match unit {
            "bytes" => scale(value, 1024.0, &BYTE_SUFFIXES, decimals),
            "percent" => format!("{}%", trim_decimals(value, decimals)),
            "percentunit" => format!("{}%", trim_decimals(value * 100.0, decimals)),
            "seconds" => format_seconds(value, decimals),
            "short" | "none" => scale(value, 1000.0, &SHORT_SUFFIXES, decimals),
            // Unknown category: plain number with the unit appended
            _ => format!("{} {unit}", trim_decimals(value, decimals)),
        }
    }
}

fn scale(value: f64, base: f64, suffixes: &[&str], decimals: usize) -> String {
    let mut scaled = value;
    let mut idx = 0;
    while scaled.abs() >= base && idx < suffixes.len() - 1 {
        scaled /= base;
        idx += 1;
    }
    format!("{}{}", trim_decimals(scaled, decimals), suffixes[idx])
}

fn format_seconds(value: f64, decimals: usize) -> String {
    let abs = value.abs();
    if abs >= 3600.0 {
        format!("{} h", trim_decimals(value / 3600.0, decimals))
    } else if abs >= 60.0 {
        format!("{} min", trim_decimals(value / 60.0, decimals))
    } else if abs >= 1.0 {
        format!("{} s", trim_decimals(value, decimals))
    } else if abs >= 0.001 {
        format!("{} ms", trim_decimals(value * 1_000.0, decimals))
    } else {
        format!("{} µs", trim_decimals(value * 1_000_000.0, decimals))
    }
}

fn trim_decimals(value: f64, decimals: usize) -> String {
    let mut formatted = format!("{value:.decimals$}");
    if formatted.contains('.') {
        while formatted.ends_with('0') {
            formatted.pop();
        }
        if formatted.ends_with('.') {
            formatted.pop();
        }
    }
    formatted
}

/// Axis and tooltip label for a millisecond timestamp.
pub fn format_timestamp(timestamp_ms: i64) -> String {
    DateTime::from_timestamp_millis(timestamp_ms)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}
