//! CSV export of the aligned dataset.

use crate::models::Snapshot;
use anyhow::{Context, Result};
use std::io;
use std::path::Path;

/// Write one row per year: `year`, one column per aligned label, then `workforce_share`.
///
/// Absent values are written as empty cells.
pub fn write_csv<W: io::Write>(snapshot: &Snapshot, writer: W) -> Result<()> {
    let mut csv = csv::Writer::from_writer(writer);

    let mut header = vec!["year".to_string()];
    header.extend(snapshot.aligned.series.iter().map(|s| s.label.clone()));
    header.push("workforce_share".to_string());
    csv.write_record(&header)?;

    for (i, year) in snapshot.year_index.years().enumerate() {
        let mut row = vec![year.to_string()];
        row.extend(
            snapshot
                .aligned
                .series
                .iter()
                .map(|s| cell(s.values.get(i).copied().flatten())),
        );
        row.push(cell(
            snapshot
                .derived
                .workforce_share
                .get(i)
                .and_then(|p| p.value),
        ));
        csv.write_record(&row)?;
    }

    csv.flush()?;
    Ok(())
}

/// Render the CSV export into a string.
#[cfg(test)]
pub fn generate_csv(snapshot: &Snapshot) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(snapshot, &mut buffer)?;
    String::from_utf8(buffer).context("CSV output is not valid UTF-8")
}

/// Write the CSV export to `path`.
pub fn save_csv(snapshot: &Snapshot, path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    write_csv(snapshot, file)
}

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
