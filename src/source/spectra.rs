use std::sync::{Arc, MutexGuard};

use super::{lock, ListConfig, OpenSource, RowMeta, RowSource, SharedSource, SourceError};
use crate::identity::{DetailLevel, Identity};
use crate::index::native_id;
use crate::index::{DiagnosticSink, Diagnostics, IndexEntry, IndexTable, LazyIndex, LogSink};
use crate::list::{IonMobility, ListError, RecordList};
use crate::record::{PeakArrays, Spectrum};

const COMPONENT: &str = "SourceSpectrumList";

#[derive(Debug)]
struct SpectrumEntry {
    identity: Identity,
    rows: Vec<usize>,
    combined: bool,
}

impl IndexEntry for SpectrumEntry {
    fn identity(&self) -> &Identity {
        &self.identity
    }
}

#[derive(Debug, Default)]
struct SpectrumIndex {
    table: IndexTable<SpectrumEntry>,
    ion_mobility: bool,
    scan_ids: bool,
}

/// Drift bins of one frame waiting to become a combined record
struct PendingFrame {
    frame: u32,
    rows: Vec<usize>,
}

/// Spectra of a [`RowSource`].
///
/// Rows that only feed chromatograms (SRM/SIM readings) and rows whose MS
/// level is outside [`ListConfig::accept_only_ms_level`] are not indexed.
/// Ids are `scan=N` for ordinary rows, `frame=F scan=S` for single drift bins,
/// and `merged=K frame=F` for combined ion-mobility frames.
pub struct SourceSpectrumList<S: RowSource> {
    source: SharedSource<S>,
    config: ListConfig,
    index: LazyIndex<SpectrumIndex>,
    diagnostics: Diagnostics,
}

impl<S: RowSource> SourceSpectrumList<S> {
    /// List over a shared source
    pub fn new(source: SharedSource<S>, config: ListConfig) -> Self {
        Self::with_diagnostics(source, config, Arc::new(LogSink))
    }

    /// List with an explicit diagnostic sink
    pub fn with_diagnostics(source: SharedSource<S>, config: ListConfig, sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            source,
            config,
            index: LazyIndex::new(),
            diagnostics: Diagnostics::new(COMPONENT, sink),
        }
    }

    /// The shared source handle, e.g. to build a chromatogram list on the same file
    pub fn source(&self) -> SharedSource<S> {
        Arc::clone(&self.source)
    }

    /// Configuration the list was built with
    pub fn config(&self) -> &ListConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        lock(&self.source)
    }

    fn index(&self) -> Result<Arc<SpectrumIndex>, ListError> {
        self.index.get_or_build(COMPONENT, || self.build_index())
    }

    fn build_index(&self) -> Result<SpectrumIndex, ListError> {
        let failed = |e: SourceError| ListError::source(COMPONENT, None, e);
        let mut source = self.lock();
        let count = source.row_count().map_err(failed)?;
        let mut index = SpectrumIndex::default();
        let mut pending: Option<PendingFrame> = None;
        let mut skipped = 0usize;

        for row in 0..count {
            let meta = source.read_row_metadata(row).map_err(failed)?;
            if meta.is_chromatogram_only() || !self.config.accepts_ms_level(meta.ms_level) {
                skipped += 1;
                continue;
            }
            let Some(frame) = meta.frame else {
                flush_frame(&mut index.table, pending.take())?;
                let scan = meta.scan_number.unwrap_or(row as i64 + 1);
                push_row(&mut index.table, native_id::format([("scan", scan.to_string())]), row)?;
                index.scan_ids = true;
                continue;
            };

            index.ion_mobility = true;
            if !self.config.combine_ion_mobility_spectra {
                let drift_scan = meta.drift_scan.map_or(row as i64, i64::from);
                let id = native_id::format([("frame", frame.to_string()), ("scan", drift_scan.to_string())]);
                push_row(&mut index.table, id, row)?;
                continue;
            }
            match pending.as_mut() {
                Some(group) if group.frame == frame => group.rows.push(row),
                _ => {
                    flush_frame(&mut index.table, pending.take())?;
                    pending = Some(PendingFrame { frame, rows: vec![row] });
                }
            }
        }
        flush_frame(&mut index.table, pending)?;
        index.scan_ids = index.scan_ids && !index.ion_mobility;

        log::debug!(
            "[{}] indexed {} spectra from {} rows ({} skipped)",
            COMPONENT,
            index.table.len(),
            count,
            skipped
        );
        Ok(index)
    }

    fn read_metadata(&self, source: &mut S, entry: &SpectrumEntry, index: usize) -> Result<Vec<RowMeta>, ListError> {
        entry
            .rows
            .iter()
            .map(|&row| {
                source
                    .read_row_metadata(row)
                    .map_err(|e| ListError::source(COMPONENT, Some(index), e))
            })
            .collect()
    }

    fn read_arrays(
        &self,
        source: &mut S,
        entry: &SpectrumEntry,
        metas: &[RowMeta],
        index: usize,
    ) -> Result<PeakArrays, ListError> {
        let mut arrays = PeakArrays::default();
        let mut drift = Vec::new();
        for (&row, meta) in entry.rows.iter().zip(metas) {
            let payload = source
                .read_row_payload(row, self.config.prefer_centroided)
                .map_err(|e| ListError::source(COMPONENT, Some(index), e))?;
            let compact = self.config.ignore_zero_intensity_points && !meta.centroided;
            let (mz, intensity) = payload.into_arrays(compact);
            if mz.len() != intensity.len() {
                return Err(ListError::source(
                    COMPONENT,
                    Some(index),
                    SourceError::Corrupt(format!(
                        "row {} has {} m/z values but {} intensities",
                        row,
                        mz.len(),
                        intensity.len()
                    )),
                ));
            }
            if entry.combined {
                drift.extend(std::iter::repeat(meta.drift_time.unwrap_or(0.0)).take(mz.len()));
            }
            arrays.mz.extend(mz);
            arrays.intensity.extend(intensity);
        }
        if entry.combined {
            arrays.drift_time = Some(drift);
            arrays.sort_by_mz();
        }
        Ok(arrays)
    }
}

fn push_row(table: &mut IndexTable<SpectrumEntry>, id: String, row: usize) -> Result<usize, ListError> {
    let mut identity = Identity::new(table.next_ordinal(), id);
    identity.source_position = Some(row as u64);
    table.push(
        COMPONENT,
        SpectrumEntry {
            identity,
            rows: vec![row],
            combined: false,
        },
    )
}

fn flush_frame(table: &mut IndexTable<SpectrumEntry>, pending: Option<PendingFrame>) -> Result<(), ListError> {
    let Some(group) = pending else {
        return Ok(());
    };
    let ordinal = table.next_ordinal();
    let id = native_id::format([("merged", ordinal.to_string()), ("frame", group.frame.to_string())]);
    let mut identity = Identity::new(ordinal, id);
    identity.source_position = group.rows.first().map(|&row| row as u64);
    table.push(
        COMPONENT,
        SpectrumEntry {
            identity,
            rows: group.rows,
            combined: true,
        },
    )?;
    Ok(())
}

fn apply_metadata(spectrum: &mut Spectrum, metas: &[RowMeta], combined: bool) {
    let Some(first) = metas.first() else {
        return;
    };
    spectrum.ms_level = first.ms_level;
    spectrum.scan_time = first.scan_time;
    spectrum.scan_event = first.scan_event;
    spectrum.polarity = first.polarity;
    spectrum.centroided = first.centroided;
    if !combined {
        spectrum.drift_time = first.drift_time;
        spectrum.total_ion_current = first.total_ion_current;
        spectrum.base_peak_mz = first.base_peak_mz;
        spectrum.base_peak_intensity = first.base_peak_intensity;
        spectrum.default_array_length = first.point_count;
        return;
    }
    spectrum.default_array_length = metas.iter().map(|m| m.point_count).sum();
    spectrum.total_ion_current = metas.iter().map(|m| m.total_ion_current).sum();
    let base = metas
        .iter()
        .filter_map(|m| Some((m.base_peak_mz?, m.base_peak_intensity?)))
        .max_by(|a, b| a.1.total_cmp(&b.1));
    spectrum.base_peak_mz = base.map(|b| b.0);
    spectrum.base_peak_intensity = base.map(|b| b.1);
}

impl<S: RowSource> SourceSpectrumList<S> {
    /// Open `path` with the source type `S`
    pub fn open(path: impl AsRef<std::path::Path>, config: ListConfig) -> Result<Self, ListError>
    where
        S: OpenSource,
    {
        let source = super::open_shared::<S>(path).map_err(|e| ListError::source(COMPONENT, None, e))?;
        Ok(Self::new(source, config))
    }
}

impl<S: RowSource> RecordList for SourceSpectrumList<S> {
    type Record = Spectrum;

    fn size(&self) -> Result<usize, ListError> {
        Ok(self.index()?.table.len())
    }

    fn identity(&self, index: usize) -> Result<Identity, ListError> {
        Ok(self.index()?.table.entry(COMPONENT, index)?.identity.clone())
    }

    fn find(&self, id: &str) -> Result<usize, ListError> {
        let index = self.index()?;
        if let Some(position) = index.table.position(id) {
            return Ok(position);
        }
        if index.scan_ids {
            if let Ok(scan) = id.trim().parse::<i64>() {
                if let Some(position) = index.table.position(&format!("scan={}", scan)) {
                    return Ok(position);
                }
            }
        }
        Ok(native_id::check_find_result(
            index.table.len(),
            index.table.first_id(),
            id,
            &self.diagnostics,
        ))
    }

    fn item(&self, index: usize, detail: DetailLevel) -> Result<Spectrum, ListError> {
        let table = self.index()?;
        let entry = table.table.entry(COMPONENT, index)?;
        let mut spectrum = Spectrum {
            identity: entry.identity.clone(),
            detail: DetailLevel::InstantMetadata,
            ..Default::default()
        };
        if detail == DetailLevel::InstantMetadata {
            return Ok(spectrum);
        }

        let mut source = self.lock();
        let metas = self.read_metadata(&mut source, entry, index)?;
        apply_metadata(&mut spectrum, &metas, entry.combined);
        spectrum.detail = DetailLevel::FastMetadata;

        if detail.at_least(DetailLevel::FullMetadata) {
            if let Some(first) = metas.first() {
                spectrum.precursors.extend(first.precursor.clone());
                spectrum.collision_energy = first.collision_energy;
            }
            spectrum.detail = DetailLevel::FullMetadata;
        }

        if detail.wants_arrays() {
            let arrays = self.read_arrays(&mut source, entry, &metas, index)?;
            drop(source);
            spectrum.arrays = Some(arrays);
            spectrum.update_summary_from_arrays();
            spectrum.detail = DetailLevel::FullData;
        }
        Ok(spectrum)
    }

    fn describe(&self) -> String {
        COMPONENT.to_string()
    }

    fn ion_mobility(&self) -> Option<&dyn IonMobility> {
        if self.has_ion_mobility() {
            Some(self)
        } else {
            None
        }
    }
}

impl<S: RowSource> IonMobility for SourceSpectrumList<S> {
    fn has_ion_mobility(&self) -> bool {
        match self.index() {
            Ok(index) => index.ion_mobility,
            Err(e) => {
                log::debug!("[{}] ion mobility unknown: {}", COMPONENT, e);
                false
            }
        }
    }

    fn has_combined_ion_mobility(&self) -> bool {
        self.config.combine_ion_mobility_spectra && self.has_ion_mobility()
    }

    fn drift_time_to_ccs(&self, drift_time: f64, mz: f64, charge: i32) -> Result<Option<f64>, ListError> {
        self.lock()
            .drift_time_to_ccs(drift_time, mz, charge)
            .map_err(|e| ListError::source(COMPONENT, None, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::integer_set::IntegerSet;
    use crate::record::Precursor;
    use crate::source::{share, MemoryRow, MemorySource, RowKind, RowPayload};
    use crate::codec::SampleGrid;

    fn rows() -> Vec<MemoryRow> {
        vec![
            MemoryRow::spectrum(1, 1, 1.0, vec![100.0, 200.0], vec![1.0, 2.0]),
            MemoryRow::transition(RowKind::Srm { q1: 500.0, q3: 250.0 }, 1.5, 40.0),
            MemoryRow::spectrum(2, 2, 2.0, vec![150.0], vec![3.0]).with_precursor(Precursor::at_mz(200.0)),
            MemoryRow::spectrum(3, 1, 3.0, vec![100.0, 200.0, 300.0], vec![0.0, 5.0, 0.0]),
        ]
    }

    #[test]
    fn test_skips_chromatogram_rows() {
        let list = SourceSpectrumList::new(share(MemorySource::new(rows())), ListConfig::default());
        assert_eq!(list.size().unwrap(), 3);
        let ids: Vec<String> = (0..3).map(|i| list.identity(i).unwrap().id).collect();
        assert_eq!(ids, vec!["scan=1", "scan=2", "scan=3"]);
        assert_eq!(list.identity(1).unwrap().source_position, Some(2));
        assert!(list.ion_mobility().is_none());
    }

    #[test]
    fn test_accept_only_ms_level() {
        let config = ListConfig {
            accept_only_ms_level: Some(IntegerSet::parse("2").unwrap()),
            ..Default::default()
        };
        let list = SourceSpectrumList::new(share(MemorySource::new(rows())), config);
        assert_eq!(list.size().unwrap(), 1);
        assert_eq!(list.identity(0).unwrap().id, "scan=2");
    }

    #[test]
    fn test_detail_ladder() {
        let source = MemorySource::new(rows());
        let calls = source.calls();
        let list = SourceSpectrumList::new(share(source), ListConfig::default());

        let instant = list.item(1, DetailLevel::InstantMetadata).unwrap();
        assert_eq!(instant.ms_level, None);
        let metadata_after_build = calls.metadata();

        let fast = list.item(1, DetailLevel::FastMetadata).unwrap();
        assert_eq!(calls.metadata(), metadata_after_build + 1);
        assert_eq!(fast.ms_level, Some(2));
        assert!(fast.precursors.is_empty());

        let full = list.item(1, DetailLevel::FullMetadata).unwrap();
        assert_eq!(full.precursors[0].mz(), Some(200.0));
        assert!(full.arrays.is_none());
        assert_eq!(calls.payload(), 0);

        let data = list.item(1, DetailLevel::FullData).unwrap();
        assert_eq!(data.detail, DetailLevel::FullData);
        assert_eq!(data.arrays.unwrap().mz, vec![150.0]);
        assert_eq!(calls.payload(), 1);
    }

    #[test]
    fn test_bare_scan_number_lookup() {
        let list = SourceSpectrumList::new(share(MemorySource::new(rows())), ListConfig::default());
        assert_eq!(list.find("3").unwrap(), 2);
        assert_eq!(list.find("scan=2").unwrap(), 1);
        assert_eq!(list.find("scan=9").unwrap(), 3);
    }

    #[test]
    fn test_zero_compaction_and_sparse_payloads() {
        let mut rows = rows();
        rows.push(
            MemoryRow::spectrum(4, 1, 4.0, Vec::new(), Vec::new()).with_payload(RowPayload::Sparse {
                grid: SampleGrid {
                    start: 0.0,
                    step: 1.0,
                    len: 100,
                },
                indices: vec![10, 50],
                intensities: vec![1.0, 2.0],
            }),
        );
        let config = ListConfig {
            ignore_zero_intensity_points: true,
            ..Default::default()
        };
        let list = SourceSpectrumList::new(share(MemorySource::new(rows)), config);
        let dense = list.item(2, DetailLevel::FullData).unwrap();
        assert_eq!(dense.arrays.unwrap().mz, vec![100.0, 200.0, 300.0]);

        let sparse = list.item(3, DetailLevel::FullData).unwrap();
        let arrays = sparse.arrays.unwrap();
        assert_eq!(arrays.mz, vec![9.0, 10.0, 11.0, 49.0, 50.0, 51.0]);
        assert_eq!(sparse.default_array_length, 6);
    }

    fn frames() -> Vec<MemoryRow> {
        vec![
            MemoryRow::spectrum(1, 1, 1.0, vec![300.0, 100.0], vec![1.0, 2.0]).in_frame(1, 0, 0.5),
            MemoryRow::spectrum(2, 1, 1.0, vec![200.0], vec![4.0]).in_frame(1, 1, 0.75),
            MemoryRow::spectrum(3, 1, 2.0, vec![150.0], vec![3.0]).in_frame(2, 0, 0.5),
        ]
    }

    #[test]
    fn test_drift_bins_as_separate_spectra() {
        let list = SourceSpectrumList::new(share(MemorySource::new(frames())), ListConfig::default());
        assert_eq!(list.size().unwrap(), 3);
        assert_eq!(list.identity(1).unwrap().id, "frame=1 scan=1");
        assert_eq!(list.item(1, DetailLevel::FastMetadata).unwrap().drift_time, Some(0.75));
        let mobility = list.ion_mobility().unwrap();
        assert!(mobility.has_ion_mobility());
        assert!(!mobility.has_combined_ion_mobility());
        assert_eq!(mobility.drift_time_to_ccs(0.5, 100.0, 1).unwrap(), None);
    }

    #[test]
    fn test_combined_frames() {
        let config = ListConfig {
            combine_ion_mobility_spectra: true,
            ..Default::default()
        };
        let source = MemorySource::new(frames()).with_ccs_calibration(|drift, _, charge| drift * 100.0 / charge as f64);
        let list = SourceSpectrumList::new(share(source), config);
        assert_eq!(list.size().unwrap(), 2);
        assert_eq!(list.identity(0).unwrap().id, "merged=0 frame=1");
        assert_eq!(list.identity(1).unwrap().id, "merged=1 frame=2");

        let fast = list.item(0, DetailLevel::FastMetadata).unwrap();
        assert_eq!(fast.default_array_length, 3);
        assert_eq!(fast.total_ion_current, Some(7.0));
        assert_eq!(fast.base_peak_mz, Some(200.0));

        let arrays = list.item(0, DetailLevel::FullData).unwrap().arrays.unwrap();
        assert_eq!(arrays.mz, vec![100.0, 200.0, 300.0]);
        assert_eq!(arrays.intensity, vec![2.0, 4.0, 1.0]);
        assert_eq!(arrays.drift_time, Some(vec![0.5, 0.75, 0.5]));

        let mobility = list.ion_mobility().unwrap();
        assert!(mobility.has_combined_ion_mobility());
        assert_eq!(mobility.drift_time_to_ccs(0.5, 100.0, 2).unwrap(), Some(25.0));
    }

    #[test]
    fn test_payload_failure_is_local() {
        let source = MemorySource::new(rows()).with_failing_payload(2);
        let list = SourceSpectrumList::new(share(source), ListConfig::default());
        let err = list.item(1, DetailLevel::FullData).unwrap_err();
        assert!(matches!(err, ListError::Source { item: Some(1), .. }));
        assert!(err.to_string().contains(COMPONENT));
        assert!(list.item(0, DetailLevel::FullData).is_ok());
        assert_eq!(list.size().unwrap(), 3);
    }

    #[test]
    fn test_misaligned_profile_payload_is_corrupt() {
        let rows = vec![MemoryRow::spectrum(1, 1, 1.0, vec![100.0, 200.0, 300.0], vec![0.0, 5.0])];
        let config = ListConfig {
            ignore_zero_intensity_points: true,
            ..Default::default()
        };
        let list = SourceSpectrumList::new(share(MemorySource::new(rows)), config);
        let err = list.item(0, DetailLevel::FullData).unwrap_err();
        assert!(matches!(err, ListError::Source { item: Some(0), .. }));
        assert!(err.to_string().contains("3 m/z values but 2 intensities"));
    }

    #[test]
    fn test_duplicate_scan_numbers_fail_the_build() {
        let rows = vec![
            MemoryRow::spectrum(5, 1, 1.0, vec![1.0], vec![1.0]),
            MemoryRow::spectrum(5, 1, 2.0, vec![1.0], vec![1.0]),
        ];
        let list = SourceSpectrumList::new(share(MemorySource::new(rows)), ListConfig::default());
        assert!(matches!(list.size(), Err(ListError::DuplicateId { .. })));
        assert!(matches!(list.size(), Err(ListError::IndexBuildFailed { .. })));
    }
}
