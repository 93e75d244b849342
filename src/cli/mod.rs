use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use mzaccess::identity::DetailLevel;

mod config;
mod info;
mod list;
mod open;

/// mzaccess - Lazy, vendor-neutral access to mass spectrometry runs
#[derive(Parser)]
#[command(name = "mzaccess")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Verbosity level (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

/// Options shared by every command that opens a run
#[derive(clap::Args)]
pub struct OpenArgs {
    /// Input file (.mgf, or a .json row dump)
    #[arg(value_name = "FILE")]
    file: PathBuf,

    /// Filter command applied after the config file's chain (repeatable)
    #[arg(short = 'f', long = "filter", value_name = "CMD")]
    filters: Vec<String>,

    /// Load reader settings and a filter chain from a TOML config file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Neither read nor write the on-disk index cache
    #[arg(long)]
    no_index_cache: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Summarize a run
    Info {
        #[command(flatten)]
        open: OpenArgs,
    },

    /// Print one line per spectrum
    List {
        #[command(flatten)]
        open: OpenArgs,

        /// Detail level to read spectra at (instant, fast, metadata, data)
        #[arg(short = 'd', long, default_value = "fast")]
        detail: DetailLevel,
    },

    /// Print the filter command language
    Filters,
}

impl Cli {
    pub fn verbosity(&self) -> u8 {
        self.verbose
    }
}

pub fn init_logging(verbosity: u8) {
    let log_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level)).init();
}

pub fn dispatch(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Info { open } => info::run(open),
        Commands::List { open, detail } => list::run(open, detail),
        Commands::Filters => {
            print!("{}", mzaccess::filter::FilterFactory::usage());
            Ok(())
        }
    }
}
