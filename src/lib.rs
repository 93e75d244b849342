//! # mzaccess - Lazy, Vendor-Neutral Access to Mass Spectrometry Runs
//!
//! `mzaccess` presents every source of spectra and chromatograms (vendor
//! readers, peak list files, in-memory runs) through one contract, the
//! [`RecordList`](list::RecordList):
//!
//! - `size()`, `identity(i)`, `find(id)`, `item(i, detail)`
//! - items are built on demand, populated only up to the requested
//!   [`DetailLevel`](identity::DetailLevel), so a pass over 500,000 spectra at
//!   `FastMetadata` never touches the binary arrays
//! - the index behind a list is built once, on first use, even when many
//!   threads ask at the same time
//!
//! ## Key Features
//!
//! - **Filter decorators**: [`FilterList`](filter::FilterList) wraps any list
//!   and keeps the items a tri-state [`Predicate`](filter::Predicate) accepts,
//!   re-numbered from zero. Decorators stack, and a small command language
//!   (`msLevel 2`, `scanTime [420,480]`, `mzWindow [100,2000]`) builds them
//!   from text via [`FilterFactory`](filter::FilterFactory).
//!
//! - **Source boundary**: vendor readers implement
//!   [`RowSource`](source::RowSource); the crate turns rows into spectra and
//!   chromatograms, groups ion-mobility drift bins, and normalizes sparse and
//!   dense arrays with the [`codec`].
//!
//! - **MGF peak lists**: [`MgfSpectrumList`](mgf::MgfSpectrumList) indexes a
//!   file by byte offset, caches the index next to it, and recovers when the
//!   cache no longer matches the file.
//!
//! ## Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use mzaccess::prelude::*;
//!
//! let source = share(MemorySource::new(vec![
//!     MemoryRow::spectrum(1, 1, 60.0, vec![400.0, 500.0], vec![1e4, 2e4]),
//!     MemoryRow::spectrum(2, 2, 61.0, vec![250.0], vec![3e3]),
//!     MemoryRow::spectrum(3, 2, 62.0, vec![300.0], vec![5e3]),
//! ]));
//! let run: SpectrumListPtr = Arc::new(SourceSpectrumList::new(source, ListConfig::default()));
//!
//! let ms2 = FilterFactory::wrap(run, "msLevel 2")?;
//! assert_eq!(ms2.size()?, 2);
//! assert_eq!(ms2.identity(1)?.id, "scan=3");
//!
//! let spectrum = ms2.item(0, DetailLevel::FullData)?;
//! assert_eq!(spectrum.base_peak_mz, Some(250.0));
//! # Ok::<(), ListError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`identity`]: item identity and the detail-level ladder
//! - [`record`]: spectra, chromatograms, precursors, arrays
//! - [`list`]: the list contract, errors, in-memory lists
//! - [`index`]: lazy one-shot index, id tables, native-id diagnostics
//! - [`filter`]: predicates, filter/transform/sort decorators, command factory
//! - [`integer_set`]: the `"[0,2] 5-7 10-"` integer set language
//! - [`codec`]: sparse/dense array normalization
//! - [`source`]: the row source boundary and source-backed lists
//! - [`mgf`]: MGF peak list adapter
//! - [`summary`]: run summaries

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![allow(clippy::too_many_arguments)]

pub mod codec;
pub mod filter;
pub mod identity;
pub mod index;
pub mod integer_set;
pub mod list;
pub mod mgf;
pub mod record;
pub mod source;
pub mod summary;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::filter::{FilterFactory, FilterList, FilterMode, Predicate, Tribool};
    pub use crate::identity::{DetailLevel, Identity};
    pub use crate::integer_set::IntegerSet;
    pub use crate::list::{
        ChromatogramListPtr, IonMobility, ListError, ListPtr, RecordList, SimpleList, SpectrumListPtr,
    };
    pub use crate::mgf::MgfSpectrumList;
    pub use crate::record::{Chromatogram, ChromatogramKind, Polarity, Precursor, Spectrum, SpectrumBuilder};
    pub use crate::source::{
        share, ListConfig, MemoryRow, MemorySource, RowSource, SourceChromatogramList, SourceError,
        SourceSpectrumList,
    };
    pub use crate::summary::ListSummary;
}
