//! Rendering snapshots for people and for other tools.

pub mod export;
pub mod generator;

pub use export::save_csv;
pub use generator::{generate_json_report, generate_markdown_report, render_summary, status_line};

/// Round to an integer and group digits in thousands: `1234567.4` -> `"1,234,567"`.
pub fn format_number(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if rounded < 0.0 {
        format!("-{}", grouped)
    } else {
        grouped
    }
}

/// Short form for dashboards: `1.2B`, `3.4M`, `5.6K`.
pub fn format_compact(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1e9 {
        format!("{:.1}B", value / 1e9)
    } else if abs >= 1e6 {
        format!("{:.1}M", value / 1e6)
    } else if abs >= 1e3 {
        format!("{:.1}K", value / 1e3)
    } else {
        format!("{:.0}", value)
    }
}

/// `"3.53%/yr"` or `"n/a"`.
pub fn format_rate(cagr: Option<f64>) -> String {
    cagr.map(|r| format!("{:.2}%/yr", r))
        .unwrap_or_else(|| "n/a".to_string())
}

/// `"12.3%"` or `"n/a"`.
pub fn format_share(share: Option<f64>) -> String {
    share
        .map(|s| format!("{:.1}%", s))
        .unwrap_or_else(|| "n/a".to_string())
}
