//! Load profile CSV ingestion.
//!
//! Expected format, one row per sample:
//! ```csv
//! time (s),power (W)
//! 0,12000
//! 60,15500
//! ```
//! `t`/`P` and `time`/`power` headers are accepted too (case-insensitive).
//! Other columns are ignored.

use std::io::Read;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use hbess_core::LoadProfile;
use tracing::debug;

const TIME_HEADERS: &[&str] = &["time (s)", "time", "t", "time_s"];
const POWER_HEADERS: &[&str] = &["power (w)", "power", "p", "power_w"];

fn find_column(headers: &csv::StringRecord, aliases: &[&str]) -> Option<usize> {
    headers
        .iter()
        .position(|h| aliases.contains(&h.trim().to_lowercase().as_str()))
}

/// Parse a profile from any CSV source.
pub fn parse_profile_csv<R: Read>(name: &str, source: R) -> Result<LoadProfile> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(source);
    let headers = reader.headers().context("reading CSV header")?.clone();

    let time_col = find_column(&headers, TIME_HEADERS)
        .ok_or_else(|| anyhow!("no time column (expected one of {TIME_HEADERS:?})"))?;
    let power_col = find_column(&headers, POWER_HEADERS)
        .ok_or_else(|| anyhow!("no power column (expected one of {POWER_HEADERS:?})"))?;

    let mut times = Vec::new();
    let mut powers = Vec::new();
    for (row, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("reading row {}", row + 2))?;
        if record.iter().all(|f| f.is_empty()) {
            continue;
        }
        let field = |col: usize, what: &str| -> Result<f64> {
            record
                .get(col)
                .ok_or_else(|| anyhow!("row {}: missing {what}", row + 2))?
                .parse()
                .with_context(|| format!("row {}: parsing {what}", row + 2))
        };
        times.push(field(time_col, "time")?);
        powers.push(field(power_col, "power")?);
    }

    debug!(name, samples = times.len(), "parsed load profile");
    Ok(LoadProfile::from_columns(name, &times, &powers)?)
}

/// Read a profile file; the profile is named after the file stem.
pub fn read_profile_csv(path: &Path) -> Result<LoadProfile> {
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "profile".to_string());
    read_named_profile_csv(&name, path)
}

pub fn read_named_profile_csv(name: &str, path: &Path) -> Result<LoadProfile> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening load profile: {}", path.display()))?;
    parse_profile_csv(name, file).with_context(|| format!("parsing {}", path.display()))
}
