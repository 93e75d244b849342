use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{OpenSource, RowKind, RowMeta, RowPayload, RowSource, SourceError};
use crate::record::Precursor;

/// One row of a [`MemorySource`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryRow {
    /// Row metadata
    pub meta: RowMeta,
    /// Row samples
    pub payload: RowPayload,
}

impl MemoryRow {
    /// Scan row with dense arrays; summary values are derived from the arrays
    pub fn spectrum(scan_number: i64, ms_level: u8, scan_time: f64, mz: Vec<f64>, intensity: Vec<f64>) -> Self {
        let mut meta = RowMeta {
            ms_level: Some(ms_level),
            scan_number: Some(scan_number),
            scan_time: Some(scan_time),
            ..Default::default()
        };
        summarize(&mut meta, &mz, &intensity);
        Self {
            meta,
            payload: RowPayload::Dense {
                coords: mz,
                intensities: intensity,
            },
        }
    }

    /// Chromatogram-only row holding a single SRM/SIM reading
    pub fn transition(kind: RowKind, scan_time: f64, intensity: f64) -> Self {
        Self {
            meta: RowMeta {
                kind,
                ms_level: Some(2),
                scan_time: Some(scan_time),
                total_ion_current: Some(intensity),
                base_peak_intensity: Some(intensity),
                point_count: 1,
                ..Default::default()
            },
            payload: RowPayload::Dense {
                coords: Vec::new(),
                intensities: Vec::new(),
            },
        }
    }

    /// Attach a precursor
    pub fn with_precursor(mut self, precursor: Precursor) -> Self {
        self.meta.precursor = Some(precursor);
        self
    }

    /// Place the row in drift bin `drift_scan` of ion-mobility frame `frame`
    pub fn in_frame(mut self, frame: u32, drift_scan: u32, drift_time: f64) -> Self {
        self.meta.frame = Some(frame);
        self.meta.drift_scan = Some(drift_scan);
        self.meta.drift_time = Some(drift_time);
        self
    }

    /// Replace the payload
    pub fn with_payload(mut self, payload: RowPayload) -> Self {
        self.meta.point_count = match &payload {
            RowPayload::Dense { coords, .. } => coords.len(),
            RowPayload::Sparse { indices, .. } => indices.len(),
        };
        self.payload = payload;
        self
    }
}

fn summarize(meta: &mut RowMeta, mz: &[f64], intensity: &[f64]) {
    meta.point_count = mz.len();
    meta.total_ion_current = Some(intensity.iter().sum());
    if let Some((&m, &y)) = mz.iter().zip(intensity).max_by(|a, b| a.1.total_cmp(b.1)) {
        meta.base_peak_mz = Some(m);
        meta.base_peak_intensity = Some(y);
    }
}

/// Number of calls a [`MemorySource`] has served, per entry point
#[derive(Debug, Default)]
pub struct CallCounts {
    row_count: AtomicUsize,
    metadata: AtomicUsize,
    payload: AtomicUsize,
}

impl CallCounts {
    /// Calls to `row_count`
    pub fn row_count(&self) -> usize {
        self.row_count.load(Ordering::SeqCst)
    }

    /// Calls to `read_row_metadata`
    pub fn metadata(&self) -> usize {
        self.metadata.load(Ordering::SeqCst)
    }

    /// Calls to `read_row_payload`
    pub fn payload(&self) -> usize {
        self.payload.load(Ordering::SeqCst)
    }
}

/// Rows held in memory, optionally loaded from a JSON file
#[derive(Debug, Default)]
pub struct MemorySource {
    rows: Vec<MemoryRow>,
    calls: Arc<CallCounts>,
    failing: HashSet<usize>,
    ccs: Option<fn(f64, f64, i32) -> f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RowFile {
    Rows(Vec<MemoryRow>),
    Wrapped { rows: Vec<MemoryRow> },
}

impl MemorySource {
    /// Source over `rows`
    pub fn new(rows: Vec<MemoryRow>) -> Self {
        Self {
            rows,
            ..Default::default()
        }
    }

    /// Parse rows from JSON: either an array of rows or `{"rows": [...]}`
    pub fn from_json(reader: impl Read) -> Result<Self, SourceError> {
        let rows = match serde_json::from_reader(reader)? {
            RowFile::Rows(rows) | RowFile::Wrapped { rows } => rows,
        };
        Ok(Self::new(rows))
    }

    /// Shared call counters, readable after the source is moved into a list
    pub fn calls(&self) -> Arc<CallCounts> {
        Arc::clone(&self.calls)
    }

    /// Make payload reads of `row` fail with [`SourceError::Corrupt`]
    pub fn with_failing_payload(mut self, row: usize) -> Self {
        self.failing.insert(row);
        self
    }

    /// Install a drift time calibration `(drift_time, mz, charge) -> ccs`
    pub fn with_ccs_calibration(mut self, calibration: fn(f64, f64, i32) -> f64) -> Self {
        self.ccs = Some(calibration);
        self
    }

    fn row(&self, row: usize) -> Result<&MemoryRow, SourceError> {
        self.rows.get(row).ok_or(SourceError::RowOutOfRange {
            row,
            count: self.rows.len(),
        })
    }
}

impl RowSource for MemorySource {
    fn row_count(&mut self) -> Result<usize, SourceError> {
        self.calls.row_count.fetch_add(1, Ordering::SeqCst);
        Ok(self.rows.len())
    }

    fn read_row_metadata(&mut self, row: usize) -> Result<RowMeta, SourceError> {
        self.calls.metadata.fetch_add(1, Ordering::SeqCst);
        Ok(self.row(row)?.meta.clone())
    }

    fn read_row_payload(&mut self, row: usize, _want_centroided: bool) -> Result<RowPayload, SourceError> {
        self.calls.payload.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(&row) {
            return Err(SourceError::Corrupt(format!("unreadable payload in row {}", row)));
        }
        Ok(self.row(row)?.payload.clone())
    }

    fn drift_time_to_ccs(&mut self, drift_time: f64, mz: f64, charge: i32) -> Result<Option<f64>, SourceError> {
        Ok(self.ccs.map(|calibrate| calibrate(drift_time, mz, charge)))
    }
}

impl OpenSource for MemorySource {
    fn open(path: &Path) -> Result<Self, SourceError> {
        let source = Self::from_json(BufReader::new(File::open(path)?))?;
        log::debug!("loaded {} rows from {}", source.rows.len(), path.display());
        Ok(source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_calls() {
        let mut source = MemorySource::new(vec![MemoryRow::spectrum(1, 1, 0.0, vec![1.0], vec![2.0])]);
        let calls = source.calls();
        source.row_count().unwrap();
        source.read_row_metadata(0).unwrap();
        source.read_row_payload(0, false).unwrap();
        source.read_row_payload(0, true).unwrap();
        assert_eq!((calls.row_count(), calls.metadata(), calls.payload()), (1, 1, 2));
        assert!(matches!(
            source.read_row_metadata(3),
            Err(SourceError::RowOutOfRange { row: 3, count: 1 })
        ));
    }

    #[test]
    fn test_spectrum_row_summary() {
        let row = MemoryRow::spectrum(7, 1, 1.0, vec![100.0, 200.0, 300.0], vec![1.0, 9.0, 2.0]);
        assert_eq!(row.meta.point_count, 3);
        assert_eq!(row.meta.total_ion_current, Some(12.0));
        assert_eq!(row.meta.base_peak_mz, Some(200.0));
    }

    #[test]
    fn test_from_json_accepts_both_layouts() {
        let row = MemoryRow::spectrum(1, 1, 0.0, vec![1.0], vec![2.0]);
        let plain = serde_json::to_string(&vec![row.clone()]).unwrap();
        let wrapped = format!(r#"{{"rows": {}}}"#, plain);
        for text in [plain, wrapped] {
            let mut source = MemorySource::from_json(text.as_bytes()).unwrap();
            assert_eq!(source.row_count().unwrap(), 1);
            assert_eq!(source.read_row_metadata(0).unwrap(), row.meta);
        }
    }

    #[test]
    fn test_failing_payload() {
        let mut source = MemorySource::new(vec![MemoryRow::spectrum(1, 1, 0.0, vec![1.0], vec![2.0])])
            .with_failing_payload(0);
        assert!(matches!(source.read_row_payload(0, false), Err(SourceError::Corrupt(_))));
        assert!(source.read_row_metadata(0).is_ok());
    }
}
