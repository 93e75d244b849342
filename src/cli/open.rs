use anyhow::{Context, Result};
use std::sync::Arc;

use mzaccess::filter::FilterFactory;
use mzaccess::list::SpectrumListPtr;
use mzaccess::mgf::MgfSpectrumList;
use mzaccess::source::{MemorySource, SourceSpectrumList};

use super::config::Config;
use super::OpenArgs;

/// Open the run named by `args` and stack the configured filters on it
pub fn open(args: &OpenArgs) -> Result<SpectrumListPtr> {
    if !args.file.exists() {
        anyhow::bail!("File does not exist: {}", args.file.display());
    }

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };
    let mut reader = config.reader;
    if args.no_index_cache {
        reader.use_index_cache = false;
    }

    let extension = args
        .file
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let list: SpectrumListPtr = match extension.as_str() {
        "mgf" => Arc::new(
            MgfSpectrumList::open(&args.file, reader)
                .with_context(|| format!("Failed to open {}", args.file.display()))?,
        ),
        "json" => Arc::new(
            SourceSpectrumList::<MemorySource>::open(&args.file, reader)
                .with_context(|| format!("Failed to open {}", args.file.display()))?,
        ),
        other => anyhow::bail!("Unsupported file type '{}': {}", other, args.file.display()),
    };

    let commands = config.filters.chain.iter().chain(&args.filters);
    FilterFactory::wrap_all(list, commands).context("Failed to build filter chain")
}
