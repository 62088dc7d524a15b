//! Text rendering of sizing results.

use std::io::Write;

use anyhow::Result;
use hbess_algo::{DesignReport, PackReport, Refinement, SizingOutcome};
use tabwriter::TabWriter;

fn pack_table(out: &mut String, pack: &PackReport) -> Result<()> {
    let mut writer = TabWriter::new(Vec::new()).padding(2);
    writeln!(writer, "Parameter\tValue")?;
    writeln!(writer, "Series cells\t{:.3}", pack.series)?;
    writeln!(writer, "Parallel strings\t{:.3}", pack.parallel)?;
    writeln!(writer, "Total energy\t{:.2} kWh", pack.energy_kwh)?;
    writeln!(writer, "Nominal voltage\t{:.1} V", pack.nominal_voltage_v)?;
    writeln!(writer, "Maximum current\t{:.1} A", pack.max_current_a)?;
    writeln!(writer, "Rated current\t{:.1} A", pack.rated_current_a)?;
    writeln!(writer, "Total cost\t{:.2}", pack.cost)?;
    writer.flush()?;
    out.push_str(&String::from_utf8(writer.into_inner()?)?);
    Ok(())
}

pub fn design_table(design: &DesignReport) -> Result<String> {
    let mut out = format!("== {} design ({}) ==\n", design.kind, design.status);
    for pack in &design.packs {
        out.push_str(&format!("\n{} pack\n", pack.chemistry.label()));
        pack_table(&mut out, pack)?;
    }
    out.push_str(&format!("\nTotal system cost: {:.2}\n", design.total_cost));
    Ok(out)
}

pub fn outcome_table(outcome: &SizingOutcome) -> Result<String> {
    let mut out = design_table(&outcome.relaxed)?;

    match &outcome.refinement {
        Some(Refinement::Integer { design, .. }) => {
            out.push('\n');
            out.push_str(&design_table(design)?);
        }
        Some(Refinement::Infeasible { reason }) => {
            out.push_str(&format!("\nDiscretization failed: {reason}\n"));
        }
        None => {}
    }

    if !outcome.baselines.is_empty() {
        let mut writer = TabWriter::new(Vec::new()).padding(2);
        writeln!(writer, "Baseline\tStatus\tTotal cost")?;
        for baseline in &outcome.baselines {
            let cost = baseline
                .design
                .as_ref()
                .map(|d| format!("{:.2}", d.total_cost))
                .unwrap_or_else(|| "-".to_string());
            writeln!(
                writer,
                "{} only\t{}\t{}",
                baseline.chemistry.label(),
                baseline.status,
                cost
            )?;
        }
        writer.flush()?;
        out.push('\n');
        out.push_str(&String::from_utf8(writer.into_inner()?)?);
    }
    Ok(out)
}
