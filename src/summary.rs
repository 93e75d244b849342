//! Run summaries over any spectrum list.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[cfg(feature = "colorized_output")]
use console::style;

use crate::identity::DetailLevel;
use crate::index::native_id;
use crate::list::{iter_items, ListError, RecordList};
use crate::record::Spectrum;

/// Counts and ranges gathered from one pass at `FastMetadata`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListSummary {
    /// Description of the summarized list
    pub source: String,
    /// Number of spectra
    pub spectra: usize,
    /// Spectra per MS level
    pub ms_levels: BTreeMap<u8, usize>,
    /// Spectra without an MS level
    pub unknown_ms_level: usize,
    /// Centroided spectra
    pub centroided: usize,
    /// Sum of the array lengths reported by the spectra
    pub total_points: usize,
    /// Earliest and latest scan time in seconds
    pub scan_time_range: Option<(f64, f64)>,
    /// Keys used by the id scheme of the list, e.g. `scan` or `frame`, `merged`
    pub id_keys: BTreeSet<String>,
    /// `Some(combined)` when the list carries ion mobility data
    pub ion_mobility: Option<bool>,
}

impl ListSummary {
    /// Summarize `list`
    pub fn from_list(list: &dyn RecordList<Record = Spectrum>) -> Result<Self, ListError> {
        let mut summary = ListSummary {
            source: list.describe(),
            ion_mobility: list.ion_mobility().map(|mobility| mobility.has_combined_ion_mobility()),
            ..Default::default()
        };
        for spectrum in iter_items(list, DetailLevel::FastMetadata)? {
            summary.add(&spectrum?);
        }
        log::debug!("summarized {} spectra of {}", summary.spectra, summary.source);
        Ok(summary)
    }

    fn add(&mut self, spectrum: &Spectrum) {
        self.spectra += 1;
        match spectrum.ms_level {
            Some(level) => *self.ms_levels.entry(level).or_default() += 1,
            None => self.unknown_ms_level += 1,
        }
        if spectrum.centroided {
            self.centroided += 1;
        }
        self.total_points += spectrum.default_array_length;
        if let Some(time) = spectrum.scan_time {
            self.scan_time_range = Some(match self.scan_time_range {
                Some((low, high)) => (low.min(time), high.max(time)),
                None => (time, time),
            });
        }
        for key in native_id::keys(&spectrum.identity.id) {
            if !self.id_keys.contains(key) {
                self.id_keys.insert(key.to_string());
            }
        }
    }

    fn id_scheme(&self) -> String {
        if self.id_keys.is_empty() {
            "-".to_string()
        } else {
            self.id_keys.iter().cloned().collect::<Vec<_>>().join(" ")
        }
    }

    fn levels(&self) -> String {
        let mut parts: Vec<String> = self
            .ms_levels
            .iter()
            .map(|(level, count)| format!("MS{}: {}", level, count))
            .collect();
        if self.unknown_ms_level > 0 {
            parts.push(format!("unknown: {}", self.unknown_ms_level));
        }
        if parts.is_empty() {
            "-".to_string()
        } else {
            parts.join(", ")
        }
    }

    fn time_range(&self) -> String {
        match self.scan_time_range {
            Some((low, high)) => format!("{:.2} - {:.2} s", low, high),
            None => "-".to_string(),
        }
    }

    fn mobility(&self) -> &'static str {
        match self.ion_mobility {
            Some(true) => "combined frames",
            Some(false) => "per drift bin",
            None => "none",
        }
    }

    /// Format the summary with colors (requires console feature)
    pub fn format_colored(&self) -> String {
        #[cfg(feature = "colorized_output")]
        {
            let mut output = String::new();
            output.push_str(&format!("{}\n", style("Run Summary").bold().cyan()));
            output.push_str(&format!("{}\n", style("===========").cyan()));
            output.push_str(&format!("{}: {}\n", style("Source").bold(), self.source));
            output.push_str(&format!("{}: {}\n", style("Spectra").bold(), style(self.spectra).green()));
            output.push_str(&format!("{}: {}\n", style("MS levels").bold(), self.levels()));
            output.push_str(&format!("{}: {}\n", style("Centroided").bold(), self.centroided));
            output.push_str(&format!("{}: {}\n", style("Points").bold(), self.total_points));
            output.push_str(&format!("{}: {}\n", style("Scan time").bold(), self.time_range()));
            output.push_str(&format!("{}: {}\n", style("Id scheme").bold(), style(self.id_scheme()).yellow()));
            output.push_str(&format!("{}: {}\n", style("Ion mobility").bold(), self.mobility()));
            output
        }

        #[cfg(not(feature = "colorized_output"))]
        {
            format!("{}", self)
        }
    }
}

impl fmt::Display for ListSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run Summary")?;
        writeln!(f, "===========")?;
        writeln!(f, "Source: {}", self.source)?;
        writeln!(f, "Spectra: {}", self.spectra)?;
        writeln!(f, "MS levels: {}", self.levels())?;
        writeln!(f, "Centroided: {}", self.centroided)?;
        writeln!(f, "Points: {}", self.total_points)?;
        writeln!(f, "Scan time: {}", self.time_range())?;
        writeln!(f, "Id scheme: {}", self.id_scheme())?;
        writeln!(f, "Ion mobility: {}", self.mobility())
    }
}
