//! # mzaccess
//!
//! Command-line front end for inspecting mass spectrometry runs through the
//! `mzaccess` record lists.
//!
//! ## Usage
//!
//! ```bash
//! # Summarize an MGF file
//! mzaccess info run.mgf
//!
//! # List MS2 spectra between 10 and 20 minutes
//! mzaccess list run.mgf --filter "msLevel 2" --filter "scanTime [600,1200]"
//!
//! # Show the filter command language
//! mzaccess filters
//! ```

use anyhow::Result;
use clap::Parser;

mod cli;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_logging(cli.verbosity());
    cli::dispatch(cli)
}
