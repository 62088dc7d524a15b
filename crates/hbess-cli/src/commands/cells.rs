use std::io::Write;
use std::path::Path;

use anyhow::Result;
use hbess_cli::cli::OutputFormat;
use hbess_core::{CellPair, Chemistry};
use tabwriter::TabWriter;

pub fn handle(file: Option<&Path>, format: OutputFormat) -> Result<()> {
    let cells = match file {
        Some(path) => hbess_io::load_cell_pair(path)?,
        None => CellPair::default(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&cells)?),
        OutputFormat::Table => print!("{}", cell_table(&cells)?),
    }
    Ok(())
}

fn cell_table(cells: &CellPair) -> Result<String> {
    let mut writer = TabWriter::new(Vec::new()).padding(2);
    writeln!(
        writer,
        "Chemistry\tName\tCapacity\tVoltage\tMax current\tEnergy\tUnit cost\tOCV range"
    )?;
    for chemistry in Chemistry::ALL {
        let cell = cells.get(chemistry);
        let ocv = cell.ocv.voltage_points();
        let (lo, hi) = (
            ocv.first().copied().unwrap_or_default(),
            ocv.last().copied().unwrap_or_default(),
        );
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{:.1} Wh\t{:.2}\t{:.3}-{:.3} V",
            chemistry.label(),
            cell.name,
            cell.rated_capacity,
            cell.nominal_voltage,
            cell.max_current,
            cell.energy_kwh() * 1000.0,
            cell.unit_cost,
            lo,
            hi
        )?;
    }
    writer.flush()?;
    Ok(String::from_utf8(writer.into_inner()?)?)
}
