//! CLI surface (spec §6 expansion), narrowed from
//! `stackable_operator::cli`'s `ProductOperatorRun`/`Command` shape: no
//! `Crd` subcommand, since this system defines no CRDs.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "fleet-controller", author, version, about = "Fleet control-plane engine")]
pub struct Opts {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Run the control plane: reconciliation engine, constraint monitor,
    /// and the request-driven quota/backup/installer services.
    Run(RunArgs),
}

#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the YAML configuration file (spec §6).
    #[arg(long, short = 'c', env = "FLEET_CONFIG", default_value = "fleet-controller.yaml")]
    pub config: PathBuf,

    /// Overrides `logging.level` from the config file.
    #[arg(long, env = "FLEET_LOG_LEVEL")]
    pub log_level: Option<String>,
}
