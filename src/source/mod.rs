//! # Source Boundary
//!
//! Vendor readers are black boxes behind the [`RowSource`] trait: a source
//! reports how many rows it holds, the cheap metadata of one row, and the
//! sample arrays of one row. Everything else (id schemes, ion-mobility
//! grouping, chromatogram extraction, compaction, the detail-level ladder)
//! is done here by [`SourceSpectrumList`] and [`SourceChromatogramList`],
//! which share one [`SharedSource`] handle.
//!
//! ```rust
//! use mzaccess::identity::DetailLevel;
//! use mzaccess::list::RecordList;
//! use mzaccess::source::{share, ListConfig, MemoryRow, MemorySource, SourceSpectrumList};
//!
//! let source = share(MemorySource::new(vec![
//!     MemoryRow::spectrum(1, 1, 10.0, vec![100.0, 200.0], vec![5.0, 7.0]),
//!     MemoryRow::spectrum(2, 2, 11.0, vec![150.0], vec![3.0]),
//! ]));
//! let spectra = SourceSpectrumList::new(source, ListConfig::default());
//! assert_eq!(spectra.size()?, 2);
//! assert_eq!(spectra.find("scan=2")?, 1);
//! let ms2 = spectra.item(1, DetailLevel::FullData)?;
//! assert_eq!(ms2.arrays.map(|a| a.mz), Some(vec![150.0]));
//! # Ok::<(), mzaccess::list::ListError>(())
//! ```

mod chromatograms;
mod config;
mod memory;
mod spectra;

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

pub use chromatograms::SourceChromatogramList;
pub use config::ListConfig;
pub use memory::{CallCounts, MemoryRow, MemorySource};
pub use spectra::SourceSpectrumList;

use crate::codec::{self, SampleGrid};
use crate::record::{Polarity, Precursor};

/// Errors reported by a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Row number past the end of the source
    #[error("row {row} out of range ({count} rows)")]
    RowOutOfRange {
        /// Requested row
        row: usize,
        /// Rows in the source
        count: usize,
    },

    /// The data could not be decoded
    #[error("corrupt data: {0}")]
    Corrupt(String),

    /// The source does not support the request
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// What a source row holds
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RowKind {
    /// A scan; becomes a spectrum
    #[default]
    Spectrum,
    /// One SRM transition reading; only contributes to a chromatogram
    Srm {
        /// Precursor m/z
        q1: f64,
        /// Product m/z
        q3: f64,
    },
    /// One SIM reading; only contributes to a chromatogram
    Sim {
        /// Selected m/z
        q1: f64,
    },
}

/// Cheap per-row metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RowMeta {
    /// Row kind
    pub kind: RowKind,
    /// MS level
    pub ms_level: Option<u8>,
    /// Vendor scan number
    pub scan_number: Option<i64>,
    /// Scan event / preset scan configuration
    pub scan_event: Option<i64>,
    /// Ion-mobility frame the row belongs to
    pub frame: Option<u32>,
    /// Drift bin within the frame
    pub drift_scan: Option<u32>,
    /// Drift time of the bin in ms
    pub drift_time: Option<f64>,
    /// Scan start time in seconds
    pub scan_time: Option<f64>,
    /// Polarity
    pub polarity: Polarity,
    /// Whether the stored payload is centroided
    pub centroided: bool,
    /// Precursor of an MSn scan
    pub precursor: Option<Precursor>,
    /// Total ion current
    pub total_ion_current: Option<f64>,
    /// Base peak m/z
    pub base_peak_mz: Option<f64>,
    /// Base peak intensity
    pub base_peak_intensity: Option<f64>,
    /// Number of stored samples
    pub point_count: usize,
    /// Collision energy in eV
    pub collision_energy: Option<f64>,
}

impl RowMeta {
    /// True for rows that only feed chromatograms
    pub fn is_chromatogram_only(&self) -> bool {
        !matches!(self.kind, RowKind::Spectrum)
    }
}

/// Sample arrays of one row, as stored by the source
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "encoding", rename_all = "lowercase")]
pub enum RowPayload {
    /// Explicit coordinates, possibly with every zero sample materialized
    Dense {
        /// m/z values
        coords: Vec<f64>,
        /// Intensities
        intensities: Vec<f64>,
    },
    /// Nonzero samples addressed by position on an implicit grid
    Sparse {
        /// Coordinate grid
        grid: SampleGrid,
        /// Grid positions of the samples
        indices: Vec<usize>,
        /// Intensities
        intensities: Vec<f64>,
    },
}

impl RowPayload {
    /// Explicit `(coords, intensities)` in boundary-zero form.
    ///
    /// Sparse payloads are always reconstructed; dense payloads are compacted
    /// only when `compact` is set.
    pub fn into_arrays(self, compact: bool) -> (Vec<f64>, Vec<f64>) {
        match self {
            RowPayload::Dense {
                mut coords,
                mut intensities,
            } => {
                if compact && coords.len() == intensities.len() {
                    codec::compact_in_place(&mut coords, &mut intensities);
                }
                (coords, intensities)
            }
            RowPayload::Sparse {
                grid,
                indices,
                intensities,
            } => codec::reconstruct(&indices, &intensities, grid.len).into_arrays(&grid),
        }
    }
}

/// Row-addressed access to a vendor file.
///
/// Implementations need not be thread-safe; lists serialize every call
/// through the mutex of a [`SharedSource`].
pub trait RowSource: Send + 'static {
    /// Number of rows
    fn row_count(&mut self) -> Result<usize, SourceError>;

    /// Metadata of `row`
    fn read_row_metadata(&mut self, row: usize) -> Result<RowMeta, SourceError>;

    /// Sample arrays of `row`, centroided if requested and available
    fn read_row_payload(&mut self, row: usize, want_centroided: bool) -> Result<RowPayload, SourceError>;

    /// Collisional cross-section for a drift time; `None` when uncalibrated
    fn drift_time_to_ccs(&mut self, _drift_time: f64, _mz: f64, _charge: i32) -> Result<Option<f64>, SourceError> {
        Ok(None)
    }
}

/// Sources that can be opened from a path
pub trait OpenSource: RowSource + Sized {
    /// Open `path`
    fn open(path: &Path) -> Result<Self, SourceError>;
}

/// Source handle shared by every list built on it; closed when the last holder drops
pub type SharedSource<S> = Arc<Mutex<S>>;

/// Wrap a source for sharing
pub fn share<S: RowSource>(source: S) -> SharedSource<S> {
    Arc::new(Mutex::new(source))
}

/// Open `path` and wrap it for sharing
pub fn open_shared<S: OpenSource>(path: impl AsRef<Path>) -> Result<SharedSource<S>, SourceError> {
    Ok(share(S::open(path.as_ref())?))
}

pub(crate) fn lock<S>(source: &SharedSource<S>) -> MutexGuard<'_, S> {
    source.lock().unwrap_or_else(PoisonError::into_inner)
}
