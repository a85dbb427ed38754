//! `kicadimport` - import KiCad libraries into LibrePCB libraries

use anyhow::Result;
use clap::{Parser, Subcommand};

mod import;

#[derive(Parser, Debug)]
#[command(name = "kicadimport", version, about = "Import KiCad libraries into LibrePCB libraries")]
struct Cli {
    /// Print debug messages
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the libraries and elements found in KiCad libraries
    Scan(import::ScanArgs),
    /// Convert KiCad libraries and write them to a library directory
    Import(import::ImportArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .format_target(false)
        .init();

    match cli.command {
        Commands::Scan(args) => import::execute_scan(args),
        Commands::Import(args) => import::execute_import(args),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_import_args() {
        let cli = Cli::try_parse_from([
            "kicadimport",
            "import",
            "/libs",
            "--dest",
            "/out",
            "--exclude",
            "Device:R",
            "--exclude",
            "Device:C",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        let Commands::Import(args) = cli.command else {
            panic!("expected import command");
        };
        assert_eq!(args.exclude, vec!["Device:R", "Device:C"]);
        assert!(args.shapes3d.is_none());
    }
}
