use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::str::FromStr;

use super::{FilterMode, Predicate, Tribool};
use crate::identity::{DetailLevel, Identity};
use crate::integer_set::IntegerSet;
use crate::record::{Activation, Polarity, Record, Spectrum};

/// Keeps items whose ordinal is in a set; stops after the set's upper bound
#[derive(Debug, Clone)]
pub struct IndexSet {
    set: IntegerSet,
    eos: bool,
}

impl IndexSet {
    /// Keep ordinals in `set`
    pub fn new(set: IntegerSet) -> Self {
        Self { set, eos: false }
    }
}

impl<R: Record> Predicate<R> for IndexSet {
    fn accept_identity(&mut self, identity: &Identity) -> Tribool {
        if self.set.has_upper_bound_usize(identity.index) {
            self.eos = true;
        }
        self.set.contains_usize(identity.index).into()
    }

    fn done(&self) -> bool {
        self.eos
    }

    fn describe(&self) -> String {
        format!("index {}", self.set)
    }
}

/// Keeps items whose id scan number is in a set.
///
/// Scan numbers are assumed to increase with ordinal, so the scan stops once
/// the set's upper bound has been reached.
#[derive(Debug, Clone)]
pub struct ScanNumberSet {
    set: IntegerSet,
    eos: bool,
}

impl ScanNumberSet {
    /// Keep scan numbers in `set`
    pub fn new(set: IntegerSet) -> Self {
        Self { set, eos: false }
    }
}

impl<R: Record> Predicate<R> for ScanNumberSet {
    fn accept_identity(&mut self, identity: &Identity) -> Tribool {
        let Some(scan) = identity.scan_number().and_then(|n| i32::try_from(n).ok()) else {
            return Tribool::False;
        };
        if self.set.has_upper_bound(scan) {
            self.eos = true;
        }
        self.set.contains(scan).into()
    }

    fn done(&self) -> bool {
        self.eos
    }

    fn describe(&self) -> String {
        format!("scanNumber {}", self.set)
    }
}

/// Keeps items with one of the given ids; stops once all were seen
#[derive(Debug, Clone)]
pub struct IdSet {
    ids: HashSet<String>,
    remaining: usize,
}

impl IdSet {
    /// Keep the given ids
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let ids: HashSet<String> = ids.into_iter().map(Into::into).collect();
        let remaining = ids.len();
        Self { ids, remaining }
    }
}

impl<R: Record> Predicate<R> for IdSet {
    fn accept_identity(&mut self, identity: &Identity) -> Tribool {
        let found = self.ids.contains(&identity.id);
        if found {
            self.remaining = self.remaining.saturating_sub(1);
        }
        found.into()
    }

    fn done(&self) -> bool {
        self.remaining == 0
    }

    fn describe(&self) -> String {
        format!("id ({} ids)", self.ids.len())
    }
}

/// Keeps spectra whose scan event is in a set
#[derive(Debug, Clone)]
pub struct ScanEventSet {
    set: IntegerSet,
}

impl ScanEventSet {
    /// Keep scan events in `set`
    pub fn new(set: IntegerSet) -> Self {
        Self { set }
    }
}

impl Predicate<Spectrum> for ScanEventSet {
    fn suggested_detail_level(&self) -> DetailLevel {
        DetailLevel::FastMetadata
    }

    fn accept_identity(&mut self, _identity: &Identity) -> Tribool {
        Tribool::Indeterminate
    }

    fn accept_record(&mut self, spectrum: &Spectrum) -> Tribool {
        spectrum
            .scan_event
            .and_then(|e| i32::try_from(e).ok())
            .is_some_and(|e| self.set.contains(e))
            .into()
    }

    fn describe(&self) -> String {
        format!("scanEvent {}", self.set)
    }
}

/// Keeps spectra with scan time in `[low, high]` seconds.
///
/// With `assume_sorted` (the default) the scan stops at the first spectrum
/// past `high`.
#[derive(Debug, Clone)]
pub struct ScanTimeRange {
    low: f64,
    high: f64,
    assume_sorted: bool,
    eos: bool,
}

impl ScanTimeRange {
    /// Keep scan times in `[low, high]`, assuming time-sorted input
    pub fn new(low: f64, high: f64) -> Self {
        Self {
            low,
            high,
            assume_sorted: true,
            eos: false,
        }
    }

    /// Disable early termination for unsorted input
    pub fn unsorted(mut self) -> Self {
        self.assume_sorted = false;
        self
    }
}

impl Predicate<Spectrum> for ScanTimeRange {
    fn suggested_detail_level(&self) -> DetailLevel {
        DetailLevel::FastMetadata
    }

    fn accept_identity(&mut self, _identity: &Identity) -> Tribool {
        Tribool::Indeterminate
    }

    fn accept_record(&mut self, spectrum: &Spectrum) -> Tribool {
        let Some(time) = spectrum.scan_time else {
            return Tribool::False;
        };
        if self.assume_sorted && time > self.high {
            self.eos = true;
        }
        (self.low <= time && time <= self.high).into()
    }

    fn done(&self) -> bool {
        self.eos
    }

    fn describe(&self) -> String {
        format!("scanTime [{},{}]", self.low, self.high)
    }
}

/// Keeps spectra whose MS level is in a set
#[derive(Debug, Clone)]
pub struct MsLevelSet {
    set: IntegerSet,
}

impl MsLevelSet {
    /// Keep MS levels in `set`
    pub fn new(set: IntegerSet) -> Self {
        Self { set }
    }
}

impl Predicate<Spectrum> for MsLevelSet {
    fn suggested_detail_level(&self) -> DetailLevel {
        DetailLevel::FastMetadata
    }

    fn accept_identity(&mut self, _identity: &Identity) -> Tribool {
        Tribool::Indeterminate
    }

    fn accept_record(&mut self, spectrum: &Spectrum) -> Tribool {
        spectrum
            .ms_level
            .is_some_and(|level| self.set.contains(i32::from(level)))
            .into()
    }

    fn describe(&self) -> String {
        format!("msLevel {}", self.set)
    }
}

/// Keeps MSn spectra with a precursor charge in a set.
///
/// MS1 spectra never match; MSn spectra with no known charge count as charge 0.
#[derive(Debug, Clone)]
pub struct ChargeStateSet {
    set: IntegerSet,
}

impl ChargeStateSet {
    /// Keep charges in `set`
    pub fn new(set: IntegerSet) -> Self {
        Self { set }
    }
}

impl Predicate<Spectrum> for ChargeStateSet {
    fn suggested_detail_level(&self) -> DetailLevel {
        DetailLevel::FullMetadata
    }

    fn accept_identity(&mut self, _identity: &Identity) -> Tribool {
        Tribool::Indeterminate
    }

    fn accept_record(&mut self, spectrum: &Spectrum) -> Tribool {
        if spectrum.ms_level.unwrap_or(1) < 2 {
            return Tribool::False;
        }
        let charges = spectrum.charges();
        if charges.is_empty() {
            return self.set.contains(0).into();
        }
        charges.iter().any(|&z| self.set.contains(z)).into()
    }

    fn describe(&self) -> String {
        format!("chargeState {}", self.set)
    }
}

/// m/z matching tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Tolerance {
    /// Absolute, in m/z units
    Mz(f64),
    /// Relative, in parts per million of the reference m/z
    Ppm(f64),
}

impl Tolerance {
    /// True when `observed` is within tolerance of `reference`
    pub fn matches(&self, reference: f64, observed: f64) -> bool {
        let delta = (observed - reference).abs();
        match *self {
            Tolerance::Mz(tol) => delta <= tol,
            Tolerance::Ppm(ppm) => delta <= reference.abs() * ppm * 1e-6,
        }
    }

    /// Tolerance value
    pub fn value(&self) -> f64 {
        match *self {
            Tolerance::Mz(v) | Tolerance::Ppm(v) => v,
        }
    }
}

impl Default for Tolerance {
    fn default() -> Self {
        Tolerance::Ppm(10.0)
    }
}

impl fmt::Display for Tolerance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tolerance::Mz(v) => write!(f, "{}mz", v),
            Tolerance::Ppm(v) => write!(f, "{}ppm", v),
        }
    }
}

impl FromStr for Tolerance {
    type Err = String;

    /// `10ppm`, `0.5mz`, or a bare number (m/z)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (number, ppm) = if let Some(n) = lower.strip_suffix("ppm") {
            (n, true)
        } else if let Some(n) = lower.strip_suffix("mz") {
            (n, false)
        } else {
            (lower.as_str(), false)
        };
        let value: f64 = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid tolerance '{}'", s))?;
        if value.is_nan() || value < 0.0 {
            return Err(format!("tolerance must be non-negative, got '{}'", s));
        }
        Ok(if ppm { Tolerance::Ppm(value) } else { Tolerance::Mz(value) })
    }
}

/// Keeps (or drops) spectra whose precursor m/z matches one of a set.
///
/// Spectra without a precursor are treated as having precursor m/z 0, so a
/// `0` in the set matches them.
#[derive(Debug, Clone)]
pub struct PrecursorMzSet {
    mzs: Vec<f64>,
    tolerance: Tolerance,
    mode: FilterMode,
}

impl PrecursorMzSet {
    /// Match precursor m/z values against `mzs`
    pub fn new(mzs: Vec<f64>, tolerance: Tolerance, mode: FilterMode) -> Self {
        Self { mzs, tolerance, mode }
    }

    fn matches(&self, mz: f64) -> bool {
        self.mzs.iter().any(|&target| {
            if target == 0.0 {
                mz == 0.0
            } else {
                self.tolerance.matches(target, mz)
            }
        })
    }
}

impl Predicate<Spectrum> for PrecursorMzSet {
    fn suggested_detail_level(&self) -> DetailLevel {
        DetailLevel::FullMetadata
    }

    fn accept_identity(&mut self, _identity: &Identity) -> Tribool {
        Tribool::Indeterminate
    }

    fn accept_record(&mut self, spectrum: &Spectrum) -> Tribool {
        let mz = spectrum.precursors.first().and_then(|p| p.mz()).unwrap_or(0.0);
        self.mode.apply(self.matches(mz))
    }

    fn describe(&self) -> String {
        format!("mzPrecursors ({} m/z, {})", self.mzs.len(), self.tolerance)
    }
}

/// Keeps spectra whose point count is in a set
#[derive(Debug, Clone)]
pub struct DefaultArrayLengthSet {
    set: IntegerSet,
}

impl DefaultArrayLengthSet {
    /// Keep point counts in `set`
    pub fn new(set: IntegerSet) -> Self {
        Self { set }
    }
}

impl Predicate<Spectrum> for DefaultArrayLengthSet {
    fn suggested_detail_level(&self) -> DetailLevel {
        DetailLevel::FullMetadata
    }

    fn accept_identity(&mut self, _identity: &Identity) -> Tribool {
        Tribool::Indeterminate
    }

    fn accept_record(&mut self, spectrum: &Spectrum) -> Tribool {
        self.set.contains_usize(spectrum.default_array_length).into()
    }

    fn describe(&self) -> String {
        format!("defaultArrayLength {}", self.set)
    }
}

/// Keeps spectra of one polarity
#[derive(Debug, Clone)]
pub struct PolarityFilter {
    polarity: Polarity,
}

impl PolarityFilter {
    /// Keep spectra acquired with `polarity`
    pub fn new(polarity: Polarity) -> Self {
        Self { polarity }
    }
}

impl Predicate<Spectrum> for PolarityFilter {
    fn suggested_detail_level(&self) -> DetailLevel {
        DetailLevel::FastMetadata
    }

    fn accept_identity(&mut self, _identity: &Identity) -> Tribool {
        Tribool::Indeterminate
    }

    fn accept_record(&mut self, spectrum: &Spectrum) -> Tribool {
        (spectrum.polarity == self.polarity).into()
    }

    fn describe(&self) -> String {
        format!("polarity {:?}", self.polarity).to_lowercase()
    }
}

/// Keeps MSn spectra by the dissociation methods of their first precursor.
///
/// Either every listed method must have been applied, or (for plain CID,
/// which vendors rarely flag explicitly) none of the listed methods may have
/// been. Spectra without a precursor never match.
#[derive(Debug, Clone)]
pub struct ActivationFilter {
    methods: BTreeSet<Activation>,
    none_of: bool,
}

impl ActivationFilter {
    /// Keep spectra activated by all of `methods`
    pub fn all_of(methods: impl IntoIterator<Item = Activation>) -> Self {
        Self {
            methods: methods.into_iter().collect(),
            none_of: false,
        }
    }

    /// Keep spectra activated by none of `methods`
    pub fn none_of(methods: impl IntoIterator<Item = Activation>) -> Self {
        Self {
            methods: methods.into_iter().collect(),
            none_of: true,
        }
    }

    /// Filter for an activation name: `CID` (no other method applied), `SA`
    /// (ETD with supplemental CID) or any single method such as `HCD`
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "CID" => Some(Self::none_of(
                Activation::ALL.into_iter().filter(|&a| a != Activation::Cid),
            )),
            "SA" => Some(Self::all_of([Activation::Etd, Activation::Cid])),
            other => Activation::parse(other).map(|a| Self::all_of([a])),
        }
    }
}

impl Predicate<Spectrum> for ActivationFilter {
    fn suggested_detail_level(&self) -> DetailLevel {
        DetailLevel::FullMetadata
    }

    fn accept_identity(&mut self, _identity: &Identity) -> Tribool {
        Tribool::Indeterminate
    }

    fn accept_record(&mut self, spectrum: &Spectrum) -> Tribool {
        let Some(precursor) = spectrum.precursors.first() else {
            return Tribool::False;
        };
        let applied = |method: &Activation| precursor.activation.contains(method);
        if self.none_of {
            (!self.methods.iter().any(applied)).into()
        } else {
            self.methods.iter().all(applied).into()
        }
    }

    fn describe(&self) -> String {
        let names: Vec<_> = self.methods.iter().map(|a| a.abbreviation()).collect();
        let quantifier = if self.none_of { "none of" } else { "all of" };
        format!("activation {} [{}]", quantifier, names.join(","))
    }
}

/// Keeps (or drops) spectra with a peak near any of a set of m/z values.
///
/// With `most_intense` only the N most intense peaks are considered.
#[derive(Debug, Clone)]
pub struct MzPresent {
    mzs: Vec<f64>,
    tolerance: Tolerance,
    most_intense: Option<usize>,
    mode: FilterMode,
}

impl MzPresent {
    /// Look for peaks at `mzs`
    pub fn new(mzs: Vec<f64>, tolerance: Tolerance, most_intense: Option<usize>, mode: FilterMode) -> Self {
        Self {
            mzs,
            tolerance,
            most_intense,
            mode,
        }
    }

    fn present(&self, spectrum: &Spectrum) -> bool {
        let Some(arrays) = spectrum.arrays.as_ref() else {
            return false;
        };
        let mut peaks: Vec<(f64, f64)> = arrays
            .mz
            .iter()
            .copied()
            .zip(arrays.intensity.iter().copied())
            .collect();
        if let Some(n) = self.most_intense {
            peaks.sort_by(|a, b| b.1.total_cmp(&a.1));
            peaks.truncate(n);
        }
        peaks
            .iter()
            .any(|&(mz, _)| self.mzs.iter().any(|&target| self.tolerance.matches(target, mz)))
    }
}

impl Predicate<Spectrum> for MzPresent {
    fn suggested_detail_level(&self) -> DetailLevel {
        DetailLevel::FullData
    }

    fn accept_identity(&mut self, _identity: &Identity) -> Tribool {
        Tribool::Indeterminate
    }

    fn accept_record(&mut self, spectrum: &Spectrum) -> Tribool {
        self.mode.apply(self.present(spectrum))
    }

    fn describe(&self) -> String {
        format!("mzPresent ({} m/z, {})", self.mzs.len(), self.tolerance)
    }
}
