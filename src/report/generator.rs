//! Markdown, JSON and console renderings of a snapshot.

use super::{format_compact, format_number, format_rate, format_share};
use crate::models::{RefreshStatus, Snapshot, YearValue};
use anyhow::Result;

/// Generate a complete Markdown report.
pub fn generate_markdown_report(snapshot: &Snapshot) -> String {
    let mut output = String::new();

    output.push_str("# Population Indicators\n\n");
    output.push_str(&generate_status_section(snapshot));
    output.push_str(&generate_headline_section(snapshot));
    output.push_str(&generate_share_section(snapshot));
    output.push_str(&generate_yearly_table(snapshot));
    output.push_str(&generate_footer());

    output
}

fn generate_status_section(snapshot: &Snapshot) -> String {
    let mut section = String::new();

    section.push_str("## Status\n\n");
    section.push_str(&format!("- **Status:** {}\n", snapshot.status));
    section.push_str(&format!(
        "- **Years:** {} to {}\n",
        snapshot.year_index.start(),
        snapshot.year_index.end()
    ));
    match snapshot.last_updated {
        Some(at) => section.push_str(&format!(
            "- **Last Updated:** {}\n",
            at.format("%Y-%m-%d %H:%M:%S UTC")
        )),
        None => section.push_str("- **Last Updated:** never\n"),
    }
    section.push('\n');

    section
}

fn generate_headline_section(snapshot: &Snapshot) -> String {
    let mut section = String::new();

    section.push_str("## Headline Figures\n\n");
    if !snapshot.has_data() {
        section.push_str("No data available yet.\n\n");
        return section;
    }

    section.push_str(&format!(
        "| Series | Latest Year | Latest Value | Growth {}-{} |\n",
        snapshot.year_index.start(),
        snapshot.year_index.end()
    ));
    section.push_str("|--------|-------------|--------------|---------|\n");

    for series in &snapshot.aligned.series {
        let latest = snapshot
            .derived
            .latest_values
            .iter()
            .find(|v| v.label == series.label);
        let cagr = snapshot
            .derived
            .growth_for(&series.label)
            .and_then(|g| g.cagr);

        let (year, value) = match latest {
            Some(v) => (v.year.to_string(), format_number(v.value)),
            None => ("n/a".to_string(), "n/a".to_string()),
        };

        section.push_str(&format!(
            "| {} | {} | {} | {} |\n",
            series.label,
            year,
            value,
            format_rate(cagr)
        ));
    }
    section.push('\n');

    section
}

fn generate_share_section(snapshot: &Snapshot) -> String {
    let mut section = String::new();
    let derived = &snapshot.derived;

    section.push_str("## Workforce Share\n\n");
    section.push_str(&format!(
        "- **Latest:** {}\n",
        describe_point(derived.latest_share)
    ));
    section.push_str(&format!(
        "- **{}:** {}\n\n",
        snapshot.year_index.end(),
        format_share(derived.target_share.and_then(|p| p.value))
    ));

    section
}

fn generate_yearly_table(snapshot: &Snapshot) -> String {
    if !snapshot.has_data() {
        return String::new();
    }

    let mut table = String::new();
    let series = &snapshot.aligned.series;

    table.push_str("## Yearly Values\n\n");
    table.push_str("| Year |");
    for s in series {
        table.push_str(&format!(" {} |", s.label));
    }
    table.push_str(" Workforce Share |\n|------|");
    for _ in series {
        table.push_str("------|");
    }
    table.push_str("------|\n");

    for (i, year) in snapshot.year_index.years().enumerate() {
        table.push_str(&format!("| {} |", year));
        for s in series {
            let value = s.values.get(i).copied().flatten();
            table.push_str(&format!(
                " {} |",
                value.map(format_number).unwrap_or_default()
            ));
        }
        let share = snapshot
            .derived
            .workforce_share
            .get(i)
            .and_then(|p| p.value);
        table.push_str(&format!(
            " {} |\n",
            share.map(|s| format!("{:.2}%", s)).unwrap_or_default()
        ));
    }
    table.push('\n');

    table
}

fn generate_footer() -> String {
    "---\n\n*Source: World Bank World Development Indicators*\n".to_string()
}

/// Generate a JSON report of the whole snapshot.
pub fn generate_json_report(snapshot: &Snapshot) -> Result<String> {
    serde_json::to_string_pretty(snapshot).map_err(Into::into)
}

/// Multi-line summary printed to the terminal after a refresh.
pub fn render_summary(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    match snapshot.status {
        RefreshStatus::Ready => out.push_str("📊 Indicator Summary:\n"),
        RefreshStatus::Loading => out.push_str("⏳ Refreshing indicators...\n"),
        RefreshStatus::Error(ref message) => {
            out.push_str(&format!("⚠️  {}\n", message));
            if !snapshot.has_data() {
                return out;
            }
            out.push_str("   Showing last known figures:\n");
        }
    }

    for latest in &snapshot.derived.latest_values {
        let cagr = snapshot
            .derived
            .growth_for(&latest.label)
            .and_then(|g| g.cagr);
        out.push_str(&format!(
            "   {}: {} ({}), growth {}\n",
            latest.label,
            format_number(latest.value),
            latest.year,
            format_rate(cagr)
        ));
    }
    out.push_str(&format!(
        "   Workforce share: {} -> {} in {}\n",
        describe_point(snapshot.derived.latest_share),
        format_share(snapshot.derived.target_share.and_then(|p| p.value)),
        snapshot.year_index.end()
    ));
    if let Some(at) = snapshot.last_updated {
        out.push_str(&format!("   Updated: {}\n", at.format("%Y-%m-%d %H:%M:%S UTC")));
    }

    out
}

/// One-line ticker used in watch mode.
pub fn status_line(snapshot: &Snapshot) -> String {
    let mut parts = vec![format!("Live data [{}]", short_status(&snapshot.status))];

    if let Some(at) = snapshot.last_updated {
        parts.push(format!("Updated {}", at.format("%H:%M:%S")));
    }
    parts.push(format!(
        "Workforce share {}",
        describe_point(snapshot.derived.latest_share)
    ));
    parts.push(format!(
        "{} {}",
        snapshot.year_index.end(),
        format_share(snapshot.derived.target_share.and_then(|p| p.value))
    ));
    for latest in &snapshot.derived.latest_values {
        parts.push(format!("{} {}", latest.label, format_compact(latest.value)));
    }

    parts.join(" | ")
}

fn short_status(status: &RefreshStatus) -> &'static str {
    match status {
        RefreshStatus::Loading => "loading",
        RefreshStatus::Ready => "ready",
        RefreshStatus::Error(_) => "error",
    }
}

fn describe_point(point: Option<YearValue>) -> String {
    match point {
        Some(YearValue {
            year,
            value: Some(value),
        }) => format!("{} in {}", format_share(Some(value)), year),
        _ => "n/a".to_string(),
    }
}
