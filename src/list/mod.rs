//! # Record List Contract
//!
//! [`RecordList`] is the interface every source adapter and every decorator
//! implements. Items are addressed by dense ordinal or by stable id and are
//! materialized on demand at a requested [`DetailLevel`]:
//!
//! ```rust
//! use mzaccess::identity::DetailLevel;
//! use mzaccess::list::{RecordList, SimpleList};
//! use mzaccess::record::SpectrumBuilder;
//!
//! let list = SimpleList::new(vec![
//!     SpectrumBuilder::new(0, "scan=1").arrays(vec![100.0], vec![5.0]).build(),
//!     SpectrumBuilder::new(1, "scan=2").ms_level(2).build(),
//! ])?;
//!
//! assert_eq!(list.size()?, 2);
//! assert_eq!(list.find("scan=2")?, 1);
//! assert_eq!(list.find("scan=99")?, list.size()?);
//!
//! // metadata-only access never carries arrays
//! let spectrum = list.item(0, DetailLevel::FastMetadata)?;
//! assert!(spectrum.arrays.is_none());
//! # Ok::<(), mzaccess::list::ListError>(())
//! ```
//!
//! The first call to any accessor of an adapter triggers its index build
//! (see [`crate::index::LazyIndex`]); later calls reuse it.

mod error;
mod simple;

use std::sync::Arc;

pub use error::ListError;
pub use simple::SimpleList;

use crate::identity::{DetailLevel, Identity};
use crate::record::{Chromatogram, Record, Spectrum};

/// Index-addressable, lazily materialized collection of records.
pub trait RecordList: Send + Sync {
    /// Item type
    type Record: Record;

    /// Number of items
    fn size(&self) -> Result<usize, ListError>;

    /// Identity of item `index`; `OutOfRange` past the end
    fn identity(&self, index: usize) -> Result<Identity, ListError>;

    /// Ordinal of the item with `id`, or `size()` when there is none
    fn find(&self, id: &str) -> Result<usize, ListError>;

    /// Item `index` populated to at least `detail`
    fn item(&self, index: usize, detail: DetailLevel) -> Result<Self::Record, ListError>;

    /// Short name used in error messages and logs
    fn describe(&self) -> String;

    /// True when the list has no items
    fn is_empty(&self) -> Result<bool, ListError> {
        Ok(self.size()? == 0)
    }

    /// Ion mobility capability, if the list (or the list it wraps) has one
    fn ion_mobility(&self) -> Option<&dyn IonMobility> {
        None
    }
}

/// Shared handle to any list of `R`
pub type ListPtr<R> = Arc<dyn RecordList<Record = R>>;

/// Shared handle to a spectrum list
pub type SpectrumListPtr = ListPtr<Spectrum>;

/// Shared handle to a chromatogram list
pub type ChromatogramListPtr = ListPtr<Chromatogram>;

/// Optional capability of lists backed by ion-mobility data.
///
/// Queried through [`RecordList::ion_mobility`]; decorators forward the query
/// to the list they wrap.
pub trait IonMobility: Send + Sync {
    /// True when spectra carry drift time information
    fn has_ion_mobility(&self) -> bool;

    /// True when drift bins are combined into one record with a drift time array
    fn has_combined_ion_mobility(&self) -> bool;

    /// Collisional cross-section for a drift time, if the source is calibrated
    fn drift_time_to_ccs(&self, drift_time: f64, mz: f64, charge: i32) -> Result<Option<f64>, ListError>;
}

/// Iterate over all items of a list at a fixed detail level
pub fn iter_items<'a, R: Record>(
    list: &'a dyn RecordList<Record = R>,
    detail: DetailLevel,
) -> Result<impl Iterator<Item = Result<R, ListError>> + 'a, ListError> {
    let size = list.size()?;
    Ok((0..size).map(move |index| list.item(index, detail)))
}
