//! Per-item identity and the detail-level ladder.
//!
//! Every record list addresses its items two ways: by a dense, 0-based
//! ordinal and by a stable string id whose scheme is chosen by the adapter
//! (`scan=12`, `frame=3 scan=7`, `index=0`, ...). [`Identity`] carries both.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Minimal per-item metadata available without touching the underlying source.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Identity {
    /// Dense ordinal within the owning list (`identity(i).index == i`)
    pub index: usize,

    /// Stable id, unique within the owning list
    pub id: String,

    /// Secondary, non-unique label (e.g. an MGF `TITLE` or a MALDI spot)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spot_id: Option<String>,

    /// Byte offset of the record in its source file, for offset-indexed adapters
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_position: Option<u64>,
}

impl Identity {
    /// Create an identity with an ordinal and id
    pub fn new(index: usize, id: impl Into<String>) -> Self {
        Self {
            index,
            id: id.into(),
            spot_id: None,
            source_position: None,
        }
    }

    /// Same identity with a different ordinal
    pub fn renumbered(&self, index: usize) -> Self {
        Self {
            index,
            ..self.clone()
        }
    }

    /// Native scan number encoded in the id, if the id scheme carries one
    pub fn scan_number(&self) -> Option<i64> {
        crate::index::native_id::scan_number(&self.id)
    }
}

/// How much of a record a caller needs.
///
/// Levels are ordered: anything available at a level is also available at every
/// higher level. Callers ask for the minimum they need and must tolerate
/// receiving more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetailLevel {
    /// Identity plus whatever the index already knows; never touches the source
    #[default]
    InstantMetadata,
    /// Cheap per-item metadata (MS level, scan time, polarity)
    FastMetadata,
    /// All metadata including precursors, but no binary arrays
    FullMetadata,
    /// Metadata plus binary arrays
    FullData,
}

impl DetailLevel {
    /// True when `self` satisfies a request for `required`
    pub fn at_least(self, required: DetailLevel) -> bool {
        self >= required
    }

    /// True when binary arrays must be populated
    pub fn wants_arrays(self) -> bool {
        self == DetailLevel::FullData
    }
}

impl fmt::Display for DetailLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DetailLevel::InstantMetadata => "instant",
            DetailLevel::FastMetadata => "fast",
            DetailLevel::FullMetadata => "metadata",
            DetailLevel::FullData => "data",
        };
        f.write_str(name)
    }
}

impl FromStr for DetailLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "instant" | "instant_metadata" => Ok(DetailLevel::InstantMetadata),
            "fast" | "fast_metadata" => Ok(DetailLevel::FastMetadata),
            "metadata" | "full_metadata" => Ok(DetailLevel::FullMetadata),
            "data" | "full_data" => Ok(DetailLevel::FullData),
            other => Err(format!(
                "unknown detail level '{}' (expected instant, fast, metadata or data)",
                other
            )),
        }
    }
}
