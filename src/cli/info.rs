use anyhow::{Context, Result};

use mzaccess::summary::ListSummary;

use super::open::open;
use super::OpenArgs;

pub fn run(args: OpenArgs) -> Result<()> {
    log::info!("Summarizing {}", args.file.display());
    let list = open(&args)?;
    let summary = ListSummary::from_list(list.as_ref()).context("Failed to summarize run")?;
    print!("{}", summary.format_colored());
    Ok(())
}
