use std::sync::Arc;

use super::Mapped;
use crate::identity::{DetailLevel, Identity};
use crate::index::native_id;
use crate::index::{Diagnostics, IndexTable, LazyIndex};
use crate::list::{IonMobility, ListError, RecordList, SpectrumListPtr};
use crate::record::Spectrum;

const COMPONENT: &str = "ScanTimeSorter";

/// Re-orders spectra by ascending scan time.
///
/// The sort is stable; spectra without a scan time go last in their
/// original order.
pub struct ScanTimeSorter {
    inner: SpectrumListPtr,
    index: LazyIndex<IndexTable<Mapped>>,
    diagnostics: Diagnostics,
}

impl ScanTimeSorter {
    /// Sort `inner`
    pub fn new(inner: SpectrumListPtr) -> Self {
        Self {
            inner,
            index: LazyIndex::new(),
            diagnostics: Diagnostics::logging(COMPONENT),
        }
    }

    fn index(&self) -> Result<Arc<IndexTable<Mapped>>, ListError> {
        self.index.get_or_build(COMPONENT, || self.build_index())
    }

    fn build_index(&self) -> Result<IndexTable<Mapped>, ListError> {
        let size = self.inner.size()?;
        let mut keyed = Vec::with_capacity(size);
        for i in 0..size {
            let spectrum = self.inner.item(i, DetailLevel::FastMetadata)?;
            keyed.push((spectrum.scan_time, i));
        }
        keyed.sort_by(|a, b| match (a.0, b.0) {
            (Some(x), Some(y)) => x.total_cmp(&y),
            (Some(_), None) => std::cmp::Ordering::Less,
            (None, Some(_)) => std::cmp::Ordering::Greater,
            (None, None) => std::cmp::Ordering::Equal,
        });

        let mut table = IndexTable::new();
        for (ordinal, (_, inner)) in keyed.into_iter().enumerate() {
            let identity = self.inner.identity(inner)?.renumbered(ordinal);
            table.push(COMPONENT, Mapped { identity, inner })?;
        }
        log::debug!("[{}] sorted {} spectra by scan time", COMPONENT, table.len());
        Ok(table)
    }
}

impl RecordList for ScanTimeSorter {
    type Record = Spectrum;

    fn size(&self) -> Result<usize, ListError> {
        Ok(self.index()?.len())
    }

    fn identity(&self, index: usize) -> Result<Identity, ListError> {
        Ok(self.index()?.entry(COMPONENT, index)?.identity.clone())
    }

    fn find(&self, id: &str) -> Result<usize, ListError> {
        let index = self.index()?;
        Ok(match index.position(id) {
            Some(position) => position,
            None => native_id::check_find_result(index.len(), index.first_id(), id, &self.diagnostics),
        })
    }

    fn item(&self, index: usize, detail: DetailLevel) -> Result<Spectrum, ListError> {
        let inner = self.index()?.entry(COMPONENT, index)?.inner;
        let mut spectrum = self.inner.item(inner, detail)?;
        spectrum.identity.index = index;
        Ok(spectrum)
    }

    fn describe(&self) -> String {
        COMPONENT.to_string()
    }

    fn ion_mobility(&self) -> Option<&dyn IonMobility> {
        self.inner.ion_mobility()
    }
}
