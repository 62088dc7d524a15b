use clap::Parser;
use hbess_cli::cli::{Cli, Commands};
use tracing::error;
use tracing_subscriber::FmtSubscriber;

mod commands;

fn main() {
    let cli = Cli::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level)
        .with_writer(std::io::stderr)
        .finish();

    if let Err(err) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting default subscriber failed: {err}");
    }

    let result = match &cli.command {
        Commands::Size {
            scenario,
            format,
            out,
            series_dir,
        } => commands::size::handle(scenario, *format, out.as_deref(), series_dir.as_deref()),
        Commands::Profile { command } => commands::profile::handle(command),
        Commands::Cells { file, format } => commands::cells::handle(file.as_deref(), *format),
    };

    if let Err(err) = result {
        error!("{err:#}");
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
