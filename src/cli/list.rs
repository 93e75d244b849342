use anyhow::{Context, Result};
use std::io::{self, BufWriter, Write};

use mzaccess::identity::DetailLevel;
use mzaccess::list::iter_items;
use mzaccess::record::Spectrum;

use super::open::open;
use super::OpenArgs;

pub fn run(args: OpenArgs, detail: DetailLevel) -> Result<()> {
    let list = open(&args)?;
    log::info!("Listing {} at {:?}", list.describe(), detail);

    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    for spectrum in iter_items(list.as_ref(), detail)? {
        let spectrum = spectrum.context("Failed to read spectrum")?;
        writeln!(out, "{}", format_line(&spectrum))?;
    }
    out.flush()?;
    Ok(())
}

fn format_line(spectrum: &Spectrum) -> String {
    let level = spectrum
        .ms_level
        .map(|l| l.to_string())
        .unwrap_or_else(|| "-".to_string());
    let time = spectrum
        .scan_time
        .map(|t| format!("{:.3}", t))
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{}\t{}\t{}\t{}\t{}",
        spectrum.identity.index, spectrum.identity.id, level, time, spectrum.default_array_length
    )
}
