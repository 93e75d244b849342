//! # Filter Decorators
//!
//! A [`FilterList`] wraps any record list and exposes the subset of items a
//! [`Predicate`] accepts, re-numbered densely from zero. The predicate is
//! asked about each item's identity first; only when the identity alone is
//! not enough ([`Tribool::Indeterminate`]) is the item materialized, at the
//! predicate's suggested detail level, and asked again.
//!
//! ```rust
//! use std::sync::Arc;
//! use mzaccess::filter::{FilterList, MsLevelSet};
//! use mzaccess::integer_set::IntegerSet;
//! use mzaccess::list::{RecordList, SimpleList, SpectrumListPtr};
//! use mzaccess::record::SpectrumBuilder;
//!
//! let run: SpectrumListPtr = Arc::new(SimpleList::new(vec![
//!     SpectrumBuilder::new(0, "scan=1").ms_level(1).build(),
//!     SpectrumBuilder::new(1, "scan=2").ms_level(2).build(),
//!     SpectrumBuilder::new(2, "scan=3").ms_level(2).build(),
//! ])?);
//!
//! let ms2 = FilterList::new(run, MsLevelSet::new(IntegerSet::parse("2")?));
//! assert_eq!(ms2.size()?, 2);
//! assert_eq!(ms2.identity(0)?.id, "scan=2");
//! assert_eq!(ms2.find("scan=3")?, 1);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Transforming decorators ([`ZeroSamplesFilter`], [`MzWindow`],
//! [`ThresholdFilter`], [`LockmassRefiner`]) keep the index unchanged and
//! rewrite arrays; [`ScanTimeSorter`] re-orders. [`FilterFactory`] builds any of them from
//! textual commands such as `msLevel 2-` or `scanTime [420,480]`.

mod factory;
mod predicates;
mod sort;
mod transform;

#[cfg(test)]
mod tests;

use std::sync::{Arc, Mutex, PoisonError};

pub use factory::FilterFactory;
pub use predicates::{
    ActivationFilter, ChargeStateSet, DefaultArrayLengthSet, IdSet, IndexSet, MsLevelSet, MzPresent,
    PolarityFilter, PrecursorMzSet, ScanEventSet, ScanNumberSet, ScanTimeRange, Tolerance,
};
pub use sort::ScanTimeSorter;
pub use transform::{
    LockmassRefiner, MzWindow, Orientation, SpectrumTransform, ThresholdFilter, ThresholdKind, TransformList,
    ZeroSamplesFilter,
};

use crate::identity::{DetailLevel, Identity};
use crate::index::native_id;
use crate::index::{DiagnosticSink, Diagnostics, IndexEntry, IndexTable, LazyIndex, LogSink};
use crate::list::{IonMobility, ListError, ListPtr, RecordList};
use crate::record::Record;

/// Three-valued predicate answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tribool {
    /// Accept
    True,
    /// Reject
    False,
    /// Cannot tell from what was seen; show me more
    Indeterminate,
}

impl From<bool> for Tribool {
    fn from(value: bool) -> Self {
        if value {
            Tribool::True
        } else {
            Tribool::False
        }
    }
}

/// Whether matching items are kept or dropped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FilterMode {
    /// Keep matching items
    #[default]
    Include,
    /// Drop matching items
    Exclude,
}

impl FilterMode {
    /// Verdict for an item whose match status is `matched`
    pub fn apply(self, matched: bool) -> Tribool {
        match self {
            FilterMode::Include => matched.into(),
            FilterMode::Exclude => (!matched).into(),
        }
    }
}

impl std::str::FromStr for FilterMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "include" => Ok(FilterMode::Include),
            "exclude" => Ok(FilterMode::Exclude),
            other => Err(format!("expected include or exclude, got '{}'", other)),
        }
    }
}

/// Item selection logic driven by a [`FilterList`].
///
/// Predicates are consulted in item order during the single index build and
/// may keep state between calls (e.g. to detect that no later item can match).
pub trait Predicate<R>: Send + Sync {
    /// Detail level to materialize items at when the identity is inconclusive
    fn suggested_detail_level(&self) -> DetailLevel {
        DetailLevel::InstantMetadata
    }

    /// Decide from the identity alone
    fn accept_identity(&mut self, identity: &Identity) -> Tribool;

    /// Decide from the materialized item; `Indeterminate` counts as rejection
    fn accept_record(&mut self, _record: &R) -> Tribool {
        Tribool::False
    }

    /// True once no later item can be accepted
    fn done(&self) -> bool {
        false
    }

    /// Short description for logs and error messages
    fn describe(&self) -> String;
}

#[derive(Debug, Clone)]
pub(crate) struct Mapped {
    pub(crate) identity: Identity,
    pub(crate) inner: usize,
}

impl IndexEntry for Mapped {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// List of the items of an inner list accepted by a [`Predicate`]
pub struct FilterList<R: Record> {
    inner: ListPtr<R>,
    predicate: Mutex<Box<dyn Predicate<R>>>,
    name: String,
    index: LazyIndex<IndexTable<Mapped>>,
    diagnostics: Diagnostics,
}

impl<R: Record> FilterList<R> {
    /// Filter `inner` with `predicate`
    pub fn new(inner: ListPtr<R>, predicate: impl Predicate<R> + 'static) -> Self {
        Self::boxed(inner, Box::new(predicate))
    }

    /// Filter `inner` with an already boxed predicate
    pub fn boxed(inner: ListPtr<R>, predicate: Box<dyn Predicate<R>>) -> Self {
        Self::with_diagnostics(inner, predicate, Arc::new(LogSink))
    }

    /// Filter with an explicit diagnostic sink
    pub fn with_diagnostics(
        inner: ListPtr<R>,
        predicate: Box<dyn Predicate<R>>,
        sink: Arc<dyn DiagnosticSink>,
    ) -> Self {
        let name = format!("FilterList({})", predicate.describe());
        Self {
            inner,
            predicate: Mutex::new(predicate),
            diagnostics: Diagnostics::new(name.clone(), sink),
            name,
            index: LazyIndex::new(),
        }
    }

    /// Ordinal in the wrapped list of item `index`
    pub fn inner_index(&self, index: usize) -> Result<usize, ListError> {
        Ok(self.index()?.entry(&self.name, index)?.inner)
    }

    fn index(&self) -> Result<Arc<IndexTable<Mapped>>, ListError> {
        self.index.get_or_build(&self.name, || self.build_index())
    }

    fn build_index(&self) -> Result<IndexTable<Mapped>, ListError> {
        let mut predicate = self.predicate.lock().unwrap_or_else(PoisonError::into_inner);
        let detail = predicate.suggested_detail_level();
        let size = self.inner.size()?;
        let mut table = IndexTable::new();
        let mut materialized = 0usize;

        for i in 0..size {
            if predicate.done() {
                log::debug!("[{}] predicate done after {} of {} items", self.name, i, size);
                break;
            }
            let identity = self.inner.identity(i)?;
            let verdict = match predicate.accept_identity(&identity) {
                Tribool::Indeterminate => {
                    materialized += 1;
                    let record = self.inner.item(i, detail)?;
                    predicate.accept_record(&record)
                }
                verdict => verdict,
            };
            if verdict == Tribool::True {
                let ordinal = table.next_ordinal();
                table.push(
                    &self.name,
                    Mapped {
                        identity: identity.renumbered(ordinal),
                        inner: i,
                    },
                )?;
            }
        }

        log::debug!(
            "[{}] accepted {} of {} items ({} materialized at {})",
            self.name,
            table.len(),
            size,
            materialized,
            detail
        );
        Ok(table)
    }
}

impl<R: Record> RecordList for FilterList<R> {
    type Record = R;

    fn size(&self) -> Result<usize, ListError> {
        Ok(self.index()?.len())
    }

    fn identity(&self, index: usize) -> Result<Identity, ListError> {
        Ok(self.index()?.entry(&self.name, index)?.identity.clone())
    }

    fn find(&self, id: &str) -> Result<usize, ListError> {
        let index = self.index()?;
        Ok(match index.position(id) {
            Some(position) => position,
            None => native_id::check_find_result(index.len(), index.first_id(), id, &self.diagnostics),
        })
    }

    fn item(&self, index: usize, detail: DetailLevel) -> Result<R, ListError> {
        let inner = self.inner_index(index)?;
        let mut record = self.inner.item(inner, detail)?;
        record.identity_mut().index = index;
        Ok(record)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }

    fn ion_mobility(&self) -> Option<&dyn IonMobility> {
        self.inner.ion_mobility()
    }
}
