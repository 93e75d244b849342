//! Parsing of one `BEGIN IONS` ... `END IONS` block.

use std::io::BufRead;

use crate::identity::DetailLevel;
use crate::record::{PeakArrays, Polarity, Precursor, Spectrum};
use crate::source::SourceError;

/// Header fields of an MGF block
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Header {
    pub(crate) title: Option<String>,
    pub(crate) precursor: Option<Precursor>,
    pub(crate) rt_seconds: Option<f64>,
    pub(crate) title_rt_seconds: Option<f64>,
    pub(crate) scans: Option<String>,
    pub(crate) raw_scans: Option<String>,
    pub(crate) negative: bool,
}

impl Header {
    fn scan_time(&self) -> Option<f64> {
        self.rt_seconds.or(self.title_rt_seconds)
    }

    fn peak_list_scans(&mut self) -> Option<String> {
        self.scans.take().or_else(|| self.raw_scans.take())
    }
}

#[derive(Debug, Default)]
struct PeakStats {
    count: usize,
    tic: f64,
    base: Option<(f64, f64)>,
    low: Option<f64>,
    high: Option<f64>,
}

impl PeakStats {
    fn add(&mut self, mz: f64, intensity: f64) {
        self.count += 1;
        self.tic += intensity;
        if self.base.map_or(true, |(_, y)| intensity > y) {
            self.base = Some((mz, intensity));
        }
        self.low = Some(self.low.map_or(mz, |low| low.min(mz)));
        self.high = Some(self.high.map_or(mz, |high| high.max(mz)));
    }
}

/// Reads lines and tracks the byte offset of the line just read.
///
/// Bytes that are not UTF-8 are replaced rather than failing the block.
struct Lines<'a, R> {
    reader: &'a mut R,
    offset: u64,
    bytes: Vec<u8>,
    line: String,
}

impl<'a, R: BufRead> Lines<'a, R> {
    fn new(reader: &'a mut R, offset: u64) -> Self {
        Self {
            reader,
            offset,
            bytes: Vec::new(),
            line: String::new(),
        }
    }

    fn next(&mut self) -> Result<Option<(u64, &str)>, SourceError> {
        self.bytes.clear();
        self.line.clear();
        let start = self.offset;
        let read = self.reader.read_until(b'\n', &mut self.bytes)?;
        if read == 0 {
            return Ok(None);
        }
        self.offset += read as u64;
        self.line.push_str(&String::from_utf8_lossy(&self.bytes));
        Ok(Some((start, self.line.trim())))
    }
}

fn corrupt(offset: u64, line: &str) -> SourceError {
    SourceError::Corrupt(format!("error parsing line at offset {}: {}", offset, line))
}

/// Parse the block starting at `offset` (the `BEGIN IONS` line) into `spectrum`.
///
/// Header fields are applied from `FastMetadata`, the precursor and peak
/// statistics from `FullMetadata`, and arrays only at `FullData`. Parsing
/// stops at the first peak line when `detail` is `FastMetadata`. A block cut
/// off by the end of the file ends there.
pub(crate) fn parse_block<R: BufRead>(
    reader: &mut R,
    offset: u64,
    detail: DetailLevel,
    spectrum: &mut Spectrum,
) -> Result<(), SourceError> {
    let mut lines = Lines::new(reader, offset);
    let mut header = Header::default();
    let mut stats = PeakStats::default();
    let mut arrays = PeakArrays::default();
    let mut in_block = false;
    let mut in_peaks = false;

    while let Some((at, line)) = lines.next()? {
        if line.is_empty() {
            continue;
        }
        if !in_block && line.starts_with(['#', ';', '!', '/']) {
            continue;
        }
        if line.starts_with("BEGIN IONS") {
            if in_block {
                return Err(SourceError::Corrupt(format!(
                    "BEGIN IONS at offset {} without closing the previous block",
                    at
                )));
            }
            in_block = true;
            continue;
        }
        if line.starts_with("END IONS") {
            if !in_block {
                return Err(SourceError::Corrupt(format!(
                    "END IONS at offset {} without an opening BEGIN IONS",
                    at
                )));
            }
            break;
        }
        if !in_peaks {
            match line.split_once('=') {
                Some((key, value)) => {
                    parse_header_field(&mut header, key, value).ok_or_else(|| corrupt(at, line))?;
                    continue;
                }
                None => in_peaks = true,
            }
        }
        if detail < DetailLevel::FullMetadata {
            break;
        }
        let mut fields = line.split_whitespace();
        let (Some(mz), Some(intensity)) = (fields.next(), fields.next()) else {
            continue;
        };
        let mz: f64 = mz.parse().map_err(|_| corrupt(at, line))?;
        let intensity: f64 = intensity.parse().map_err(|_| corrupt(at, line))?;
        stats.add(mz, intensity);
        if detail.wants_arrays() {
            arrays.mz.push(mz);
            arrays.intensity.push(intensity);
        }
    }

    apply(spectrum, header, stats, arrays, detail);
    Ok(())
}

fn apply(spectrum: &mut Spectrum, mut header: Header, stats: PeakStats, arrays: PeakArrays, detail: DetailLevel) {
    spectrum.ms_level = Some(2);
    spectrum.centroided = true;
    spectrum.polarity = if header.negative {
        Polarity::Negative
    } else {
        Polarity::Positive
    };
    spectrum.scan_time = header.scan_time();
    spectrum.peak_list_scans = header.peak_list_scans();
    spectrum.title = header.title;
    spectrum.detail = DetailLevel::FastMetadata;
    if detail < DetailLevel::FullMetadata {
        return;
    }

    spectrum.precursors.extend(header.precursor);
    spectrum.default_array_length = stats.count;
    spectrum.total_ion_current = Some(stats.tic);
    spectrum.base_peak_mz = stats.base.map(|b| b.0);
    spectrum.base_peak_intensity = stats.base.map(|b| b.1);
    spectrum.lowest_mz = stats.low;
    spectrum.highest_mz = stats.high;
    spectrum.detail = DetailLevel::FullMetadata;
    if detail.wants_arrays() {
        spectrum.arrays = Some(arrays);
        spectrum.detail = DetailLevel::FullData;
    }
}

fn parse_header_field(header: &mut Header, key: &str, value: &str) -> Option<()> {
    let value = value.trim();
    match key {
        "TITLE" => {
            header.title_rt_seconds = retention_time_from_title(value).map(|minutes| minutes * 60.0);
            header.title = Some(value.to_string());
        }
        "PEPMASS" => {
            let mut parts = value.split_whitespace();
            let precursor = header.precursor.get_or_insert_with(Precursor::default);
            if let Some(mz) = parts.next() {
                precursor.selected_mz = Some(mz.parse().ok()?);
            }
            if let Some(intensity) = parts.next() {
                precursor.intensity = Some(intensity.parse().ok()?);
            }
        }
        "CHARGE" => {
            let (charges, negative) = parse_charges(value)?;
            header.negative = negative;
            header.precursor.get_or_insert_with(Precursor::default).charges = charges;
        }
        "RTINSECONDS" => header.rt_seconds = Some(value.parse().ok()?),
        "SCANS" => header.scans = Some(value.to_string()),
        "RAWSCANS" => header.raw_scans = Some(value.to_string()),
        _ => {}
    }
    Some(())
}

/// Parse `2+`, `3-`, `2+ and 3+`; returns the charge magnitudes and whether they are negative
pub(crate) fn parse_charges(value: &str) -> Option<(Vec<i32>, bool)> {
    let value = value.trim();
    let negative = value.ends_with('-');
    let charges = value
        .split_whitespace()
        .filter(|token| *token != "and")
        .map(|token| token.trim_matches(['+', '-']).parse::<i32>().ok())
        .collect::<Option<Vec<_>>>()?;
    if charges.is_empty() {
        return None;
    }
    Some((charges, negative))
}

/// Retention time in minutes from titles such as `Elution: 12.5 min`,
/// `Elution: 10 to 11 min` (center of the range) or `RT:12.5min`
pub(crate) fn retention_time_from_title(title: &str) -> Option<f64> {
    if let Some(span) = between(title, "Elution:", "min") {
        let time = match span.split_once("to") {
            Some((first, second)) => positive(first)
                .zip(positive(second))
                .map(|(first, second)| (first + second) / 2.0),
            None => positive(span),
        };
        if time.is_some() {
            return time;
        }
    }
    between(title, "RT:", "min").and_then(positive)
}

fn between<'a>(text: &'a str, start_tag: &str, end_tag: &str) -> Option<&'a str> {
    let start = text.find(start_tag)? + start_tag.len();
    let rest = &text[start..];
    Some(&rest[..rest.find(end_tag).unwrap_or(rest.len())])
}

fn positive(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|time| *time > 0.0)
}
