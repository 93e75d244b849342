use std::collections::HashMap;
use std::sync::Arc;

use super::{lock, ListConfig, RowKind, RowSource, SharedSource, SourceError};
use crate::identity::{DetailLevel, Identity};
use crate::index::native_id;
use crate::index::{DiagnosticSink, Diagnostics, IndexEntry, IndexTable, LazyIndex, LogSink};
use crate::list::{ListError, RecordList};
use crate::record::{Chromatogram, ChromatogramKind, Polarity};

const COMPONENT: &str = "SourceChromatogramList";

#[derive(Debug)]
struct ChromatogramEntry {
    identity: Identity,
    kind: ChromatogramKind,
    rows: Vec<usize>,
    polarity: Option<Polarity>,
}

impl ChromatogramEntry {
    fn new(kind: ChromatogramKind) -> Self {
        Self {
            identity: Identity::new(0, kind.native_id()),
            kind,
            rows: Vec::new(),
            polarity: None,
        }
    }

    fn add(&mut self, row: usize, polarity: Polarity) {
        self.rows.push(row);
        self.polarity = match self.polarity {
            None => Some(polarity),
            Some(seen) if seen == polarity => Some(seen),
            Some(_) => Some(Polarity::Unknown),
        };
    }
}

impl IndexEntry for ChromatogramEntry {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

/// Chromatograms of a [`RowSource`]: `TIC` and `BPC` over the scan rows,
/// then one trace per distinct SRM/SIM transition in first-seen order.
pub struct SourceChromatogramList<S: RowSource> {
    source: SharedSource<S>,
    config: ListConfig,
    index: LazyIndex<IndexTable<ChromatogramEntry>>,
    diagnostics: Diagnostics,
}

impl<S: RowSource> SourceChromatogramList<S> {
    /// List over a shared source
    pub fn new(source: SharedSource<S>, config: ListConfig) -> Self {
        Self::with_diagnostics(source, config, Arc::new(LogSink))
    }

    /// List whose warnings go to `sink`
    pub fn with_diagnostics(source: SharedSource<S>, config: ListConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            source,
            config,
            index: LazyIndex::new(),
            diagnostics: Diagnostics::new(COMPONENT, sink),
        }
    }

    fn index(&self) -> Result<Arc<IndexTable<ChromatogramEntry>>, ListError> {
        self.index.get_or_build(COMPONENT, || self.build_index())
    }

    fn build_index(&self) -> Result<IndexTable<ChromatogramEntry>, ListError> {
        let failed = |e: SourceError| ListError::source(COMPONENT, None, e);
        let mut source = lock(&self.source);
        let count = source.row_count().map_err(failed)?;

        let mut tic = ChromatogramEntry::new(ChromatogramKind::Tic);
        let mut transitions: Vec<ChromatogramEntry> = Vec::new();
        let mut by_key: HashMap<String, usize> = HashMap::new();

        for row in 0..count {
            let meta = source.read_row_metadata(row).map_err(failed)?;
            let kind = match meta.kind {
                RowKind::Spectrum => {
                    let ms1 = meta.ms_level == Some(1);
                    if ms1 || !self.config.global_chromatograms_are_ms1_only {
                        tic.add(row, meta.polarity);
                    }
                    continue;
                }
                RowKind::Srm { q1, q3 } => ChromatogramKind::Srm { q1, q3 },
                RowKind::Sim { q1 } => ChromatogramKind::Sim { q1 },
            };
            let key = kind.native_id();
            let slot = *by_key.entry(key).or_insert_with(|| {
                transitions.push(ChromatogramEntry::new(kind));
                transitions.len() - 1
            });
            transitions[slot].add(row, meta.polarity);
        }
        drop(source);

        let mut table = IndexTable::new();
        let mut entries = Vec::with_capacity(transitions.len() + 2);
        if !tic.rows.is_empty() {
            let mut bpc = ChromatogramEntry::new(ChromatogramKind::Bpc);
            bpc.rows = tic.rows.clone();
            bpc.polarity = tic.polarity;
            entries.push(tic);
            entries.push(bpc);
        }
        entries.extend(transitions);
        for mut entry in entries {
            entry.identity.index = table.next_ordinal();
            table.push(COMPONENT, entry)?;
        }
        log::debug!("[{}] indexed {} chromatograms from {} rows", COMPONENT, table.len(), count);
        Ok(table)
    }
}

impl<S: RowSource> RecordList for SourceChromatogramList<S> {
    type Record = Chromatogram;

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

    fn item(&self, index: usize, detail: DetailLevel) -> Result<Chromatogram, ListError> {
        let table = self.index()?;
        let entry = table.entry(COMPONENT, index)?;
        let mut chromatogram = Chromatogram::with_id(index, entry.identity.id.clone(), entry.kind);
        chromatogram.polarity = entry.polarity.unwrap_or_default();
        chromatogram.default_array_length = entry.rows.len();
        if !detail.wants_arrays() {
            chromatogram.detail = detail;
            return Ok(chromatogram);
        }

        let mut time = Vec::with_capacity(entry.rows.len());
        let mut intensity = Vec::with_capacity(entry.rows.len());
        let mut source = lock(&self.source);
        for &row in &entry.rows {
            let meta = source
                .read_row_metadata(row)
                .map_err(|e| ListError::source(COMPONENT, Some(index), e))?;
            time.push(meta.scan_time.unwrap_or(0.0));
            let value = match entry.kind {
                ChromatogramKind::Bpc => meta.base_peak_intensity,
                _ => meta.total_ion_current,
            };
            intensity.push(value.unwrap_or(0.0));
        }
        drop(source);
        chromatogram.set_arrays(time, intensity);
        Ok(chromatogram)
    }

    fn describe(&self) -> String {
        COMPONENT.to_string()
    }
}
