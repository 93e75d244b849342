//! Spectrum and chromatogram records.
//!
//! Records are constructed fresh on every access and populated up to the
//! detail level the caller asked for. Cheap metadata lives in plain fields;
//! binary arrays are only present at [`DetailLevel::FullData`].

use serde::{Deserialize, Serialize};

use crate::identity::{DetailLevel, Identity};

/// Common behaviour of the items a record list hands out
pub trait Record: Clone + Send + Sync + 'static {
    /// Identity of the record
    fn identity(&self) -> &Identity;

    /// Mutable identity, used by decorators that re-number ordinals
    fn identity_mut(&mut self) -> &mut Identity;

    /// Detail level the record was actually populated at
    fn detail(&self) -> DetailLevel;

    /// Drop anything above `detail` (arrays below `FullData`)
    fn trim_to(&mut self, detail: DetailLevel);
}

/// Scan polarity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Polarity {
    /// Positive ion mode
    Positive,
    /// Negative ion mode
    Negative,
    /// Not recorded
    #[default]
    Unknown,
}

impl Polarity {
    /// Parse `positive`/`+` or `negative`/`-`
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "positive" | "+" => Some(Polarity::Positive),
            "negative" | "-" => Some(Polarity::Negative),
            _ => None,
        }
    }
}

/// Precursor dissociation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Activation {
    /// Collision-induced dissociation
    Cid,
    /// Higher-energy collisional dissociation
    Hcd,
    /// Electron-transfer dissociation
    Etd,
    /// Electron-capture dissociation
    Ecd,
    /// Blackbody infrared radiative dissociation
    Bird,
    /// Infrared multiphoton dissociation
    Irmpd,
    /// Photodissociation
    Pd,
    /// Post-source decay
    Psd,
    /// Pulsed-Q dissociation
    Pqd,
    /// Surface-induced dissociation
    Sid,
    /// Sustained off-resonance irradiation
    Sori,
}

impl Activation {
    /// Every method, in declaration order
    pub const ALL: [Activation; 11] = [
        Activation::Cid,
        Activation::Hcd,
        Activation::Etd,
        Activation::Ecd,
        Activation::Bird,
        Activation::Irmpd,
        Activation::Pd,
        Activation::Psd,
        Activation::Pqd,
        Activation::Sid,
        Activation::Sori,
    ];

    /// Parse an abbreviation such as `HCD` (case-insensitive)
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        Self::ALL.into_iter().find(|a| a.abbreviation().eq_ignore_ascii_case(text))
    }

    /// Conventional abbreviation
    pub fn abbreviation(self) -> &'static str {
        match self {
            Activation::Cid => "CID",
            Activation::Hcd => "HCD",
            Activation::Etd => "ETD",
            Activation::Ecd => "ECD",
            Activation::Bird => "BIRD",
            Activation::Irmpd => "IRMPD",
            Activation::Pd => "PD",
            Activation::Psd => "PSD",
            Activation::Pqd => "PQD",
            Activation::Sid => "SID",
            Activation::Sori => "SORI",
        }
    }
}

/// Precursor ion of an MSn spectrum
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Precursor {
    /// Id of the spectrum the precursor was selected from
    pub spectrum_ref: Option<String>,
    /// Isolation window target m/z
    pub isolation_target: Option<f64>,
    /// Isolation window lower offset
    pub isolation_lower_offset: Option<f64>,
    /// Isolation window upper offset
    pub isolation_upper_offset: Option<f64>,
    /// Selected ion m/z
    pub selected_mz: Option<f64>,
    /// Charge state; several when the charge is ambiguous
    pub charges: Vec<i32>,
    /// Selected ion intensity
    pub intensity: Option<f64>,
    /// Dissociation methods applied; ETD with supplemental CID lists both
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activation: Vec<Activation>,
}

impl Precursor {
    /// Precursor with a selected m/z and nothing else
    pub fn at_mz(mz: f64) -> Self {
        Self {
            selected_mz: Some(mz),
            ..Default::default()
        }
    }

    /// Selected m/z, falling back to the isolation target
    pub fn mz(&self) -> Option<f64> {
        self.selected_mz.or(self.isolation_target)
    }

    /// Isolation window as `(low, high)` when target and offsets are known
    pub fn isolation_window(&self) -> Option<(f64, f64)> {
        let target = self.isolation_target?;
        Some((
            target - self.isolation_lower_offset.unwrap_or(0.0),
            target + self.isolation_upper_offset.unwrap_or(0.0),
        ))
    }
}

/// m/z and intensity arrays, with an optional per-sample drift time array
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PeakArrays {
    /// Mass-to-charge ratios
    pub mz: Vec<f64>,
    /// Intensities
    pub intensity: Vec<f64>,
    /// Ion mobility drift times (ms), present for combined ion-mobility records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drift_time: Option<Vec<f64>>,
}

impl PeakArrays {
    /// Create from parallel m/z and intensity arrays
    pub fn new(mz: Vec<f64>, intensity: Vec<f64>) -> Self {
        Self {
            mz,
            intensity,
            drift_time: None,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.mz.len()
    }

    /// True when empty
    pub fn is_empty(&self) -> bool {
        self.mz.is_empty()
    }

    /// Keep samples whose m/z satisfies `keep`
    pub fn retain_mz(&mut self, mut keep: impl FnMut(f64) -> bool) {
        let kept: Vec<bool> = self.mz.iter().map(|&mz| keep(mz)).collect();
        self.retain_flagged(&kept);
    }

    /// Keep the samples whose flag in `kept` is set
    pub fn retain_flagged(&mut self, kept: &[bool]) {
        let pick = |values: &[f64]| {
            values
                .iter()
                .zip(kept)
                .filter_map(|(&value, &keep)| keep.then_some(value))
                .collect::<Vec<_>>()
        };
        self.mz = pick(&self.mz);
        self.intensity = pick(&self.intensity);
        if let Some(drift) = self.drift_time.as_mut() {
            *drift = pick(drift);
        }
    }

    /// Stable sort of all arrays by m/z
    pub fn sort_by_mz(&mut self) {
        let mut order: Vec<usize> = (0..self.mz.len()).collect();
        order.sort_by(|&a, &b| self.mz[a].total_cmp(&self.mz[b]));
        let pick = |values: &[f64]| order.iter().map(|&i| values[i]).collect::<Vec<_>>();
        self.mz = pick(&self.mz);
        self.intensity = pick(&self.intensity);
        if let Some(drift) = self.drift_time.as_mut() {
            *drift = pick(drift);
        }
    }
}

/// A mass spectrum
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Spectrum {
    /// Position and id within the owning list
    pub identity: Identity,
    /// MS level (1 for MS1, 2 for MS/MS, ...)
    pub ms_level: Option<u8>,
    /// Scan polarity
    pub polarity: Polarity,
    /// Centroided (true) or profile (false)
    pub centroided: bool,
    /// Scan start time in seconds
    pub scan_time: Option<f64>,
    /// Preset scan configuration / scan event number
    pub scan_event: Option<i64>,
    /// Free-text title
    pub title: Option<String>,
    /// Scan numbers a peak list was derived from, as written by the producer
    pub peak_list_scans: Option<String>,
    /// Precursors (populated at `FullMetadata` and above)
    pub precursors: Vec<Precursor>,
    /// Number of samples in the arrays (possibly an estimate below `FullData`)
    pub default_array_length: usize,
    /// Total ion current
    pub total_ion_current: Option<f64>,
    /// Base peak m/z
    pub base_peak_mz: Option<f64>,
    /// Base peak intensity
    pub base_peak_intensity: Option<f64>,
    /// Lowest observed m/z
    pub lowest_mz: Option<f64>,
    /// Highest observed m/z
    pub highest_mz: Option<f64>,
    /// Collision energy in eV
    pub collision_energy: Option<f64>,
    /// Ion mobility drift time in ms, for per-bin ion-mobility spectra
    pub drift_time: Option<f64>,
    /// Binary arrays (populated at `FullData`)
    pub arrays: Option<PeakArrays>,
    /// Detail level this record was populated at
    pub detail: DetailLevel,
}

impl Spectrum {
    /// Spectrum carrying only an identity
    pub fn new(index: usize, id: impl Into<String>) -> Self {
        Self {
            identity: Identity::new(index, id),
            ..Default::default()
        }
    }

    /// Charge states of the first precursor
    pub fn charges(&self) -> &[i32] {
        self.precursors
            .first()
            .map_or(&[][..], |p| p.charges.as_slice())
    }

    /// Recompute TIC, base peak and observed m/z range from the arrays
    pub fn update_summary_from_arrays(&mut self) {
        let Some(arrays) = self.arrays.as_ref() else {
            return;
        };
        self.default_array_length = arrays.len();
        if arrays.is_empty() {
            self.lowest_mz = None;
            self.highest_mz = None;
            return;
        }
        let mut tic = 0.0;
        let mut base = (arrays.mz[0], f64::MIN);
        for (&mz, &y) in arrays.mz.iter().zip(&arrays.intensity) {
            tic += y;
            if y > base.1 {
                base = (mz, y);
            }
        }
        self.total_ion_current = Some(tic);
        self.base_peak_mz = Some(base.0);
        self.base_peak_intensity = Some(base.1);
        self.lowest_mz = arrays.mz.iter().copied().reduce(f64::min);
        self.highest_mz = arrays.mz.iter().copied().reduce(f64::max);
    }
}

impl Record for Spectrum {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }

    fn detail(&self) -> DetailLevel {
        self.detail
    }

    fn trim_to(&mut self, detail: DetailLevel) {
        if detail < DetailLevel::FullData {
            self.arrays = None;
        }
        self.detail = self.detail.min(detail);
    }
}

/// Builder for [`Spectrum`], mostly used by in-memory sources and tests
#[derive(Debug, Clone)]
pub struct SpectrumBuilder {
    spectrum: Spectrum,
}

impl SpectrumBuilder {
    /// Start a spectrum with an ordinal and id
    pub fn new(index: usize, id: impl Into<String>) -> Self {
        let mut spectrum = Spectrum::new(index, id);
        spectrum.ms_level = Some(1);
        spectrum.detail = DetailLevel::FullData;
        Self { spectrum }
    }

    /// Set the MS level
    pub fn ms_level(mut self, level: u8) -> Self {
        self.spectrum.ms_level = Some(level);
        self
    }

    /// Set the scan start time in seconds
    pub fn scan_time(mut self, seconds: f64) -> Self {
        self.spectrum.scan_time = Some(seconds);
        self
    }

    /// Set the polarity
    pub fn polarity(mut self, polarity: Polarity) -> Self {
        self.spectrum.polarity = polarity;
        self
    }

    /// Set the scan event
    pub fn scan_event(mut self, event: i64) -> Self {
        self.spectrum.scan_event = Some(event);
        self
    }

    /// Add a precursor with selected m/z and optional charge
    pub fn precursor(mut self, mz: f64, charge: Option<i32>) -> Self {
        let mut precursor = Precursor::at_mz(mz);
        precursor.charges.extend(charge);
        self.spectrum.precursors.push(precursor);
        self
    }

    /// Record `activation` on the most recently added precursor
    pub fn activation(mut self, activation: Activation) -> Self {
        if let Some(precursor) = self.spectrum.precursors.last_mut() {
            precursor.activation.push(activation);
        }
        self
    }

    /// Set the centroid flag
    pub fn centroided(mut self, centroided: bool) -> Self {
        self.spectrum.centroided = centroided;
        self
    }

    /// Set the arrays and derived summary values
    pub fn arrays(mut self, mz: Vec<f64>, intensity: Vec<f64>) -> Self {
        self.spectrum.arrays = Some(PeakArrays::new(mz, intensity));
        self.spectrum.update_summary_from_arrays();
        self
    }

    /// Finish
    pub fn build(self) -> Spectrum {
        self.spectrum
    }
}

/// What a chromatogram traces
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ChromatogramKind {
    /// Total ion current
    Tic,
    /// Base peak
    Bpc,
    /// Selected reaction monitoring transition
    Srm {
        /// Precursor m/z
        q1: f64,
        /// Product m/z
        q3: f64,
    },
    /// Selected ion monitoring
    Sim {
        /// Selected m/z
        q1: f64,
    },
}

impl ChromatogramKind {
    /// Canonical id string for the trace
    pub fn native_id(&self) -> String {
        match self {
            ChromatogramKind::Tic => "TIC".to_string(),
            ChromatogramKind::Bpc => "BPC".to_string(),
            ChromatogramKind::Srm { q1, q3 } => format!("SRM Q1={:.2} Q3={:.2}", q1, q3),
            ChromatogramKind::Sim { q1 } => format!("SIM Q1={:.2}", q1),
        }
    }
}

/// Time and intensity arrays of a chromatogram
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeIntensityArrays {
    /// Times in seconds
    pub time: Vec<f64>,
    /// Intensities
    pub intensity: Vec<f64>,
}

/// A chromatogram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chromatogram {
    /// Position and id within the owning list
    pub identity: Identity,
    /// What the trace represents
    pub kind: ChromatogramKind,
    /// Polarity of the contributing scans
    pub polarity: Polarity,
    /// Number of points
    pub default_array_length: usize,
    /// Binary arrays (populated at `FullData`)
    pub arrays: Option<TimeIntensityArrays>,
    /// Detail level this record was populated at
    pub detail: DetailLevel,
}

impl Chromatogram {
    /// Chromatogram with an ordinal and kind; the id is derived from the kind
    pub fn new(index: usize, kind: ChromatogramKind) -> Self {
        Self {
            identity: Identity::new(index, kind.native_id()),
            kind,
            polarity: Polarity::Unknown,
            default_array_length: 0,
            arrays: None,
            detail: DetailLevel::InstantMetadata,
        }
    }

    /// Chromatogram with an explicit id
    pub fn with_id(index: usize, id: impl Into<String>, kind: ChromatogramKind) -> Self {
        let mut chromatogram = Self::new(index, kind);
        chromatogram.identity.id = id.into();
        chromatogram
    }

    /// Attach arrays
    pub fn set_arrays(&mut self, time: Vec<f64>, intensity: Vec<f64>) {
        self.default_array_length = time.len();
        self.arrays = Some(TimeIntensityArrays { time, intensity });
        self.detail = DetailLevel::FullData;
    }
}

impl Record for Chromatogram {
    fn identity(&self) -> &Identity {
        &self.identity
    }

    fn identity_mut(&mut self) -> &mut Identity {
        &mut self.identity
    }

    fn detail(&self) -> DetailLevel {
        self.detail
    }

    fn trim_to(&mut self, detail: DetailLevel) {
        if detail < DetailLevel::FullData {
            self.arrays = None;
        }
        self.detail = self.detail.min(detail);
    }
}
