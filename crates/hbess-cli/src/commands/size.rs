use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use hbess_algo::{size_hybrid_pack, ProfileSeries, SizingOutcome, SolveControl, SolveProgress};
use tracing::{debug, info};

use crate::commands::report::outcome_table;
use hbess_cli::cli::OutputFormat;
use hbess_cli::scenario::Scenario;

pub fn handle(
    scenario_path: &Path,
    format: OutputFormat,
    out: Option<&Path>,
    series_dir: Option<&Path>,
) -> Result<()> {
    let scenario = Scenario::load(scenario_path)?;
    let base_dir = scenario_path.parent().unwrap_or_else(|| Path::new("."));
    let request = scenario.into_request(base_dir)?;
    info!(
        "Sizing {} profile(s) from {}",
        request.profiles.len(),
        scenario_path.display()
    );

    let control = SolveControl::new().with_progress(|p: &SolveProgress| {
        debug!(
            stage = %p.stage,
            outer = p.outer_iteration,
            violation = p.max_violation,
            objective = p.objective,
            "solver progress"
        );
    });

    let outcome = size_hybrid_pack(&request, &control)
        .with_context(|| format!("sizing run {} failed", scenario_path.display()))?;

    let rendered = match format {
        OutputFormat::Table => outcome_table(&outcome)?,
        OutputFormat::Json => {
            serde_json::to_string_pretty(&outcome).context("serializing sizing outcome")?
        }
    };
    match out {
        Some(path) => {
            fs::write(path, &rendered)
                .with_context(|| format!("writing report: {}", path.display()))?;
            info!("Report written to {}", path.display());
        }
        None => println!("{rendered}"),
    }

    if let Some(dir) = series_dir {
        write_series(&outcome, dir)?;
    }
    Ok(())
}

fn write_series(outcome: &SizingOutcome, dir: &Path) -> Result<()> {
    let Some(design) = outcome.final_design() else {
        info!("No final design; skipping series export");
        return Ok(());
    };
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    for (index, series) in design.series.iter().enumerate() {
        let path = dir.join(series_file_name(index, &series.profile));
        write_profile_series(series, &path)
            .with_context(|| format!("writing series: {}", path.display()))?;
    }
    Ok(())
}

/// `NN_<name>.csv`, with every character outside `[A-Za-z0-9_-]` replaced by
/// `_`. The index keeps names unique and the file inside the target directory.
fn series_file_name(index: usize, profile: &str) -> String {
    let stem: String = profile
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("{index:02}_{stem}.csv")
}

/// One row per SOC point; sample columns are empty on the trailing row.
fn write_profile_series(series: &ProfileSeries, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)?;
    let mut header = vec!["time (s)".to_string(), "demand (W)".to_string()];
    for chem in &series.chemistries {
        let label = chem.chemistry.label();
        header.push(format!("{label} power (W)"));
        header.push(format!("{label} current (A)"));
        header.push(format!("{label} soc"));
        header.push(format!("{label} voltage (V)"));
    }
    writer.write_record(&header)?;

    let sample = |values: &[f64], i: usize| values.get(i).map(|v| v.to_string()).unwrap_or_default();
    for (i, t) in series.soc_time_s.iter().enumerate() {
        let mut row = vec![t.to_string(), sample(&series.demand_w, i)];
        for chem in &series.chemistries {
            row.push(sample(&chem.power_w, i));
            row.push(sample(&chem.current_a, i));
            row.push(sample(&chem.soc, i));
            row.push(sample(&chem.voltage_v, i));
        }
        writer.write_record(&row)?;
    }
    writer.flush()?;
    Ok(())
}
