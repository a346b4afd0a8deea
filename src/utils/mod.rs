//! Utility functions for formatting and common operations
//!
//! This module provides centralized formatting utilities for consistent
//! display of metric values in tables, charts and CSV output.

/// Display style for a metric value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueStyle {
    /// Multiply by 100 and append "%" (returns, volatility, drawdowns)
    Percent,
    /// Plain number (ratios, normalized prices)
    Ratio,
}

/// Core formatting function with full control over output.
///
/// Values are shown with 2 decimals. Undefined values (NaN or infinite)
/// render as "n/a".
///
/// # Arguments
/// * `value` - The value to format
/// * `width` - Minimum width for padding (0 for no padding, right-aligned)
/// * `style` - Percent or plain ratio
///
/// # Examples
/// ```
/// use tracker::utils::{format_value_with_width, ValueStyle};
///
/// assert_eq!(format_value_with_width(0.1234, 0, ValueStyle::Percent), "12.34%");
/// assert_eq!(format_value_with_width(1.5, 8, ValueStyle::Ratio), "    1.50");
/// ```
pub fn format_value_with_width(value: f64, width: usize, style: ValueStyle) -> String {
    let result = if !value.is_finite() {
        "n/a".to_string()
    } else {
        match style {
            ValueStyle::Percent => format!("{:.2}%", clean_zero(value * 100.0)),
            ValueStyle::Ratio => format!("{:.2}", clean_zero(value)),
        }
    };

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// Values that round to zero print as "0.00" rather than "-0.00".
fn clean_zero(value: f64) -> f64 {
    if value.abs() < 0.005 {
        0.0
    } else {
        value
    }
}

// ============ Convenience functions ============

/// Format as a percentage: "12.34%"
///
/// # Examples
/// ```
/// use tracker::utils::format_percent;
///
/// assert_eq!(format_percent(-0.1), "-10.00%");
/// ```
pub fn format_percent(value: f64) -> String {
    format_value_with_width(value, 0, ValueStyle::Percent)
}

/// Format as a plain number with 2 decimals: "1.23"
pub fn format_ratio(value: f64) -> String {
    format_value_with_width(value, 0, ValueStyle::Ratio)
}

/// Full-precision representation for machine-readable output (CSV).
/// Undefined values become empty cells.
pub fn format_raw(value: f64) -> String {
    if value.is_finite() {
        value.to_string()
    } else {
        String::new()
    }
}
