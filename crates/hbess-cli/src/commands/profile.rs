use std::io::Write;
use std::path::Path;

use anyhow::Result;
use hbess_cli::cli::{OutputFormat, ProfileCommands};
use hbess_core::LoadProfile;
use serde::Serialize;
use tabwriter::TabWriter;

pub fn handle(command: &ProfileCommands) -> Result<()> {
    match command {
        ProfileCommands::Inspect { csv, format } => handle_inspect(csv, *format),
    }
}

#[derive(Debug, Serialize)]
struct ProfileSummary {
    name: String,
    samples: usize,
    duration_s: f64,
    peak_power_w: f64,
    min_power_w: f64,
    required_energy_kwh: f64,
    held_energy_kwh: f64,
}

impl ProfileSummary {
    fn of(profile: &LoadProfile) -> Self {
        let powers = profile.powers();
        Self {
            name: profile.name().to_string(),
            samples: profile.len(),
            duration_s: profile.horizon(),
            peak_power_w: profile.peak_power(),
            min_power_w: powers.iter().copied().fold(f64::INFINITY, f64::min),
            required_energy_kwh: profile.required_energy_kwh(),
            held_energy_kwh: profile.held_energy_kwh(),
        }
    }
}

fn handle_inspect(path: &Path, format: OutputFormat) -> Result<()> {
    let profile = hbess_io::read_profile_csv(path)?;
    let summary = ProfileSummary::of(&profile);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary)?),
        OutputFormat::Table => {
            let mut writer = TabWriter::new(Vec::new()).padding(2);
            writeln!(writer, "Profile\t{}", summary.name)?;
            writeln!(writer, "Samples\t{}", summary.samples)?;
            writeln!(writer, "Duration\t{:.1} s", summary.duration_s)?;
            writeln!(writer, "Peak power\t{:.1} W", summary.peak_power_w)?;
            writeln!(writer, "Minimum power\t{:.1} W", summary.min_power_w)?;
            writeln!(writer, "Required energy\t{:.3} kWh", summary.required_energy_kwh)?;
            writeln!(writer, "Held energy\t{:.3} kWh", summary.held_energy_kwh)?;
            writer.flush()?;
            print!("{}", String::from_utf8(writer.into_inner()?)?);
        }
    }
    Ok(())
}
