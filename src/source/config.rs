use serde::{Deserialize, Serialize};

use crate::integer_set::IntegerSet;

/// Options recognized when constructing a source-backed list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListConfig {
    /// Merge the drift bins of an ion-mobility frame into one record with a drift time array
    pub combine_ion_mobility_spectra: bool,
    /// Only index spectra whose MS level is in this set
    pub accept_only_ms_level: Option<IntegerSet>,
    /// Drop redundant zero-intensity samples from dense profile payloads
    pub ignore_zero_intensity_points: bool,
    /// Build TIC and BPC from MS1 scans only
    pub global_chromatograms_are_ms1_only: bool,
    /// Ask the source for centroided payloads where it has both
    pub prefer_centroided: bool,
    /// Read and write an on-disk index cache where the format supports one
    pub use_index_cache: bool,
}

impl Default for ListConfig {
    fn default() -> Self {
        Self {
            combine_ion_mobility_spectra: false,
            accept_only_ms_level: None,
            ignore_zero_intensity_points: false,
            global_chromatograms_are_ms1_only: false,
            prefer_centroided: false,
            use_index_cache: true,
        }
    }
}

impl ListConfig {
    /// Whether rows of `ms_level` (unknown counts as 0) are indexed
    pub fn accepts_ms_level(&self, ms_level: Option<u8>) -> bool {
        match &self.accept_only_ms_level {
            Some(levels) => levels.contains(ms_level.map_or(0, i32::from)),
            None => true,
        }
    }
}
