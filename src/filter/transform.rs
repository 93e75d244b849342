use std::str::FromStr;

use crate::codec;
use crate::identity::{DetailLevel, Identity};
use crate::integer_set::IntegerSet;
use crate::list::{IonMobility, ListError, SpectrumListPtr, RecordList};
use crate::record::Spectrum;

/// Rewrites the arrays of spectra handed out by a [`TransformList`]
pub trait SpectrumTransform: Send + Sync {
    /// Short description for logs and error messages
    fn describe(&self) -> String;

    /// Rewrite `spectrum`, which carries arrays
    fn apply(&self, spectrum: &mut Spectrum);
}

/// Decorator applying a [`SpectrumTransform`] to every spectrum read at
/// `FullData`. Ordinals and ids are those of the wrapped list.
pub struct TransformList<T: SpectrumTransform> {
    inner: SpectrumListPtr,
    transform: T,
    name: String,
}

impl<T: SpectrumTransform> TransformList<T> {
    /// Wrap `inner`
    pub fn new(inner: SpectrumListPtr, transform: T) -> Self {
        let name = transform.describe();
        Self { inner, transform, name }
    }
}

impl<T: SpectrumTransform> RecordList for TransformList<T> {
    type Record = Spectrum;

    fn size(&self) -> Result<usize, ListError> {
        self.inner.size()
    }

    fn identity(&self, index: usize) -> Result<Identity, ListError> {
        self.inner.identity(index)
    }

    fn find(&self, id: &str) -> Result<usize, ListError> {
        self.inner.find(id)
    }

    fn item(&self, index: usize, detail: DetailLevel) -> Result<Spectrum, ListError> {
        let mut spectrum = self.inner.item(index, detail)?;
        if detail.wants_arrays() && spectrum.arrays.is_some() {
            self.transform.apply(&mut spectrum);
        }
        Ok(spectrum)
    }

    fn describe(&self) -> String {
        self.name.clone()
    }

    fn ion_mobility(&self) -> Option<&dyn IonMobility> {
        self.inner.ion_mobility()
    }
}

/// Removes redundant zero-intensity samples from profile spectra,
/// keeping one flanking zero around every signal run
#[derive(Debug, Clone)]
pub struct ZeroSamplesFilter {
    ms_levels: IntegerSet,
}

impl ZeroSamplesFilter {
    /// Compact spectra whose MS level is in `ms_levels`
    pub fn new(ms_levels: IntegerSet) -> Self {
        Self { ms_levels }
    }
}

impl SpectrumTransform for ZeroSamplesFilter {
    fn describe(&self) -> String {
        format!("ZeroSamplesFilter({})", self.ms_levels)
    }

    fn apply(&self, spectrum: &mut Spectrum) {
        let level = spectrum.ms_level.map_or(0, i32::from);
        if !self.ms_levels.contains(level) {
            return;
        }
        if let Some(arrays) = spectrum.arrays.as_mut() {
            codec::compact_with_extra(&mut arrays.mz, &mut arrays.intensity, arrays.drift_time.as_mut());
        }
        spectrum.update_summary_from_arrays();
    }
}

/// How a [`ThresholdFilter`] turns its threshold into a set of kept peaks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdKind {
    /// Keep the N most extreme peaks; a tie straddling the cut drops the whole tie
    Count,
    /// Keep the N most extreme peaks plus any peaks tied with the Nth
    CountAfterTies,
    /// Compare intensities to the threshold directly
    Absolute,
    /// Threshold is a fraction of the base peak intensity
    BasePeakRelative,
    /// Threshold is a fraction of the total ion current
    TicRelative,
    /// Keep peaks, most extreme first, until their summed intensity reaches
    /// the threshold fraction of the total ion current
    TicCutoff,
}

impl ThresholdKind {
    fn name(self) -> &'static str {
        match self {
            ThresholdKind::Count => "count",
            ThresholdKind::CountAfterTies => "count-after-ties",
            ThresholdKind::Absolute => "absolute",
            ThresholdKind::BasePeakRelative => "bpi-relative",
            ThresholdKind::TicRelative => "tic-relative",
            ThresholdKind::TicCutoff => "tic-cutoff",
        }
    }

    fn is_fraction(self) -> bool {
        matches!(
            self,
            ThresholdKind::BasePeakRelative | ThresholdKind::TicRelative | ThresholdKind::TicCutoff
        )
    }
}

impl FromStr for ThresholdKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ThresholdKind::Count,
            ThresholdKind::CountAfterTies,
            ThresholdKind::Absolute,
            ThresholdKind::BasePeakRelative,
            ThresholdKind::TicRelative,
            ThresholdKind::TicCutoff,
        ]
        .into_iter()
        .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
        .ok_or_else(|| format!("unknown threshold type '{}'", s))
    }
}

/// Which end of the intensity range a [`ThresholdFilter`] keeps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Orientation {
    /// Keep the most intense peaks
    MostIntense,
    /// Keep the least intense peaks
    LeastIntense,
}

impl Orientation {
    fn name(self) -> &'static str {
        match self {
            Orientation::MostIntense => "most-intense",
            Orientation::LeastIntense => "least-intense",
        }
    }

    /// `y` is at least as far toward the kept end as `cut`
    fn reaches(self, y: f64, cut: f64) -> bool {
        match self {
            Orientation::MostIntense => y >= cut,
            Orientation::LeastIntense => y <= cut,
        }
    }
}

impl FromStr for Orientation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "most-intense" => Ok(Orientation::MostIntense),
            "least-intense" => Ok(Orientation::LeastIntense),
            other => Err(format!(
                "unknown orientation '{}' (expected most-intense or least-intense)",
                other
            )),
        }
    }
}

/// Drops peaks on one side of an intensity threshold, in spectra whose MS
/// level is in a set. Kept peaks stay in their original m/z order.
#[derive(Debug, Clone)]
pub struct ThresholdFilter {
    kind: ThresholdKind,
    threshold: f64,
    orientation: Orientation,
    ms_levels: IntegerSet,
}

impl ThresholdFilter {
    /// Fractional kinds take a threshold in `[0, 1]`; the others any
    /// non-negative value (counts are truncated)
    pub fn new(
        kind: ThresholdKind,
        threshold: f64,
        orientation: Orientation,
        ms_levels: IntegerSet,
    ) -> Result<Self, ListError> {
        let valid = if kind.is_fraction() {
            (0.0..=1.0).contains(&threshold)
        } else {
            threshold >= 0.0
        };
        if !valid {
            return Err(ListError::rejected(
                "ThresholdFilter",
                format!("invalid {} threshold {}", kind.name(), threshold),
            ));
        }
        Ok(Self {
            kind,
            threshold,
            orientation,
            ms_levels,
        })
    }

    /// Which of `intensity` survive
    fn kept(&self, intensity: &[f64]) -> Vec<bool> {
        let mut order: Vec<usize> = (0..intensity.len()).collect();
        match self.orientation {
            Orientation::MostIntense => order.sort_by(|&a, &b| intensity[b].total_cmp(&intensity[a])),
            Orientation::LeastIntense => order.sort_by(|&a, &b| intensity[a].total_cmp(&intensity[b])),
        }
        let above = |cut: f64| -> Vec<bool> {
            intensity
                .iter()
                .map(|&y| self.orientation.reaches(y, cut))
                .collect()
        };

        match self.kind {
            ThresholdKind::Count | ThresholdKind::CountAfterTies => {
                let n = self.threshold as usize;
                if n >= intensity.len() {
                    return vec![true; intensity.len()];
                }
                if n == 0 {
                    return vec![false; intensity.len()];
                }
                let cut = intensity[order[n - 1]];
                let straddles = intensity[order[n]] == cut;
                if self.kind == ThresholdKind::Count && straddles {
                    intensity
                        .iter()
                        .map(|&y| y != cut && self.orientation.reaches(y, cut))
                        .collect()
                } else {
                    above(cut)
                }
            }
            ThresholdKind::Absolute => above(self.threshold),
            ThresholdKind::BasePeakRelative => {
                let base = intensity.iter().copied().fold(0.0, f64::max);
                above(self.threshold * base)
            }
            ThresholdKind::TicRelative => above(self.threshold * intensity.iter().sum::<f64>()),
            ThresholdKind::TicCutoff => {
                let target = self.threshold * intensity.iter().sum::<f64>();
                let mut kept = vec![false; intensity.len()];
                let mut sum = 0.0;
                for &i in &order {
                    if sum >= target {
                        break;
                    }
                    kept[i] = true;
                    sum += intensity[i];
                }
                kept
            }
        }
    }
}

impl SpectrumTransform for ThresholdFilter {
    fn describe(&self) -> String {
        format!(
            "ThresholdFilter({} {} {} ms={})",
            self.kind.name(),
            self.threshold,
            self.orientation.name(),
            self.ms_levels
        )
    }

    fn apply(&self, spectrum: &mut Spectrum) {
        let level = spectrum.ms_level.map_or(0, i32::from);
        if !self.ms_levels.contains(level) {
            return;
        }
        if let Some(arrays) = spectrum.arrays.as_mut() {
            let kept = self.kept(&arrays.intensity);
            arrays.retain_flagged(&kept);
        }
        spectrum.update_summary_from_arrays();
    }
}

/// Keeps only samples with m/z in `[low, high]`
#[derive(Debug, Clone)]
pub struct MzWindow {
    low: f64,
    high: f64,
}

impl MzWindow {
    /// Window `[low, high]`; rejects an inverted window
    pub fn new(low: f64, high: f64) -> Result<Self, ListError> {
        if low.is_nan() || high.is_nan() || low > high {
            return Err(ListError::rejected(
                "MzWindow",
                format!("invalid m/z window [{},{}]", low, high),
            ));
        }
        Ok(Self { low, high })
    }
}

impl SpectrumTransform for MzWindow {
    fn describe(&self) -> String {
        format!("MzWindow([{},{}])", self.low, self.high)
    }

    fn apply(&self, spectrum: &mut Spectrum) {
        if let Some(arrays) = spectrum.arrays.as_mut() {
            arrays.retain_mz(|mz| self.low <= mz && mz <= self.high);
        }
        spectrum.update_summary_from_arrays();
    }
}

/// Recalibrates m/z against a known reference ("lock mass") peak.
///
/// The most intense peak within `tolerance` of the reference m/z is taken as
/// the observed lock mass, and every m/z in the spectrum is scaled by
/// `reference / observed`. Spectra without such a peak are left unchanged.
#[derive(Debug, Clone)]
pub struct LockmassRefiner {
    reference_mz: f64,
    tolerance: f64,
}

impl LockmassRefiner {
    /// Refine against `reference_mz` with an absolute m/z `tolerance`
    pub fn new(reference_mz: f64, tolerance: f64) -> Result<Self, ListError> {
        if reference_mz.is_nan() || reference_mz <= 0.0 {
            return Err(ListError::rejected(
                "LockmassRefiner",
                format!("lock mass m/z must be positive, got {}", reference_mz),
            ));
        }
        if tolerance.is_nan() || tolerance <= 0.0 {
            return Err(ListError::rejected(
                "LockmassRefiner",
                format!("lock mass tolerance must be positive, got {}", tolerance),
            ));
        }
        Ok(Self {
            reference_mz,
            tolerance,
        })
    }

    fn observed(&self, mz: &[f64], intensity: &[f64]) -> Option<f64> {
        mz.iter()
            .zip(intensity)
            .filter(|&(&m, &y)| y > 0.0 && (m - self.reference_mz).abs() <= self.tolerance)
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(&m, _)| m)
    }
}

impl SpectrumTransform for LockmassRefiner {
    fn describe(&self) -> String {
        format!("LockmassRefiner(mz={} tol={})", self.reference_mz, self.tolerance)
    }

    fn apply(&self, spectrum: &mut Spectrum) {
        let Some(arrays) = spectrum.arrays.as_mut() else {
            return;
        };
        let Some(observed) = self.observed(&arrays.mz, &arrays.intensity) else {
            return;
        };
        let factor = self.reference_mz / observed;
        for mz in arrays.mz.iter_mut() {
            *mz *= factor;
        }
        spectrum.update_summary_from_arrays();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SpectrumBuilder;

    #[test]
    fn test_zero_samples_respects_ms_levels() {
        let filter = ZeroSamplesFilter::new(IntegerSet::parse("2").unwrap());
        let mut ms1 = SpectrumBuilder::new(0, "scan=1")
            .arrays(vec![1.0, 2.0, 3.0, 4.0], vec![0.0, 0.0, 5.0, 0.0])
            .build();
        filter.apply(&mut ms1);
        assert_eq!(ms1.default_array_length, 4);

        let mut ms2 = ms1.clone();
        ms2.ms_level = Some(2);
        filter.apply(&mut ms2);
        let arrays = ms2.arrays.unwrap();
        assert_eq!(arrays.mz, vec![2.0, 3.0, 4.0]);
        assert_eq!(ms2.default_array_length, 3);
    }

    #[test]
    fn test_mz_window() {
        assert!(MzWindow::new(10.0, 5.0).is_err());
        let window = MzWindow::new(150.0, 250.0).unwrap();
        let mut spectrum = SpectrumBuilder::new(0, "scan=1")
            .arrays(vec![100.0, 150.0, 200.0, 300.0], vec![1.0, 2.0, 3.0, 4.0])
            .build();
        window.apply(&mut spectrum);
        assert_eq!(spectrum.arrays.unwrap().mz, vec![150.0, 200.0]);
        assert_eq!(spectrum.highest_mz, Some(200.0));
    }

    #[test]
    fn test_lockmass_scales_by_most_intense_reference_peak() {
        assert!(LockmassRefiner::new(0.0, 0.1).is_err());
        assert!(LockmassRefiner::new(556.2771, -1.0).is_err());

        let refiner = LockmassRefiner::new(500.0, 0.5).unwrap();
        let mut spectrum = SpectrumBuilder::new(0, "scan=1")
            .arrays(vec![250.0, 499.8, 500.25, 1000.0], vec![10.0, 3.0, 40.0, 7.0])
            .build();
        refiner.apply(&mut spectrum);
        let mz = spectrum.arrays.unwrap().mz;
        let factor = 500.0 / 500.25;
        assert!((mz[0] - 250.0 * factor).abs() < 1e-9);
        assert!((mz[2] - 500.0).abs() < 1e-9);

        let mut far = SpectrumBuilder::new(1, "scan=2")
            .arrays(vec![100.0, 200.0], vec![1.0, 2.0])
            .build();
        refiner.apply(&mut far);
        assert_eq!(far.arrays.unwrap().mz, vec![100.0, 200.0]);
    }

    fn thresholded(kind: ThresholdKind, threshold: f64, orientation: Orientation, intensity: Vec<f64>) -> Vec<f64> {
        let filter = ThresholdFilter::new(kind, threshold, orientation, IntegerSet::parse("1-").unwrap()).unwrap();
        let mz = (0..intensity.len()).map(|i| 100.0 + i as f64).collect();
        let mut spectrum = SpectrumBuilder::new(0, "scan=1").arrays(mz, intensity).build();
        filter.apply(&mut spectrum);
        spectrum.arrays.unwrap().intensity
    }

    #[test]
    fn test_threshold_counts_and_ties() {
        let peaks = vec![5.0, 9.0, 7.0, 7.0, 1.0];
        let most = Orientation::MostIntense;
        assert_eq!(thresholded(ThresholdKind::Count, 2.0, most, peaks.clone()), vec![9.0]);
        assert_eq!(
            thresholded(ThresholdKind::CountAfterTies, 2.0, most, peaks.clone()),
            vec![9.0, 7.0, 7.0]
        );
        assert_eq!(
            thresholded(ThresholdKind::Count, 3.0, most, peaks.clone()),
            vec![9.0, 7.0, 7.0]
        );
        assert_eq!(thresholded(ThresholdKind::Count, 10.0, most, peaks.clone()).len(), 5);
        assert!(thresholded(ThresholdKind::Count, 0.0, most, peaks.clone()).is_empty());
        assert_eq!(
            thresholded(ThresholdKind::Count, 2.0, Orientation::LeastIntense, peaks),
            vec![5.0, 1.0]
        );
    }

    #[test]
    fn test_threshold_intensity_cuts() {
        let peaks = vec![10.0, 40.0, 20.0, 30.0];
        let most = Orientation::MostIntense;
        assert_eq!(
            thresholded(ThresholdKind::Absolute, 20.0, most, peaks.clone()),
            vec![40.0, 20.0, 30.0]
        );
        assert_eq!(
            thresholded(ThresholdKind::Absolute, 20.0, Orientation::LeastIntense, peaks.clone()),
            vec![10.0, 20.0]
        );
        assert_eq!(
            thresholded(ThresholdKind::BasePeakRelative, 0.5, most, peaks.clone()),
            vec![40.0, 20.0, 30.0]
        );
        assert_eq!(
            thresholded(ThresholdKind::TicRelative, 0.25, most, peaks.clone()),
            vec![40.0, 30.0]
        );
        assert_eq!(
            thresholded(ThresholdKind::TicCutoff, 0.6, most, peaks.clone()),
            vec![40.0, 30.0]
        );
        assert_eq!(
            thresholded(ThresholdKind::TicCutoff, 0.2, Orientation::LeastIntense, peaks),
            vec![10.0, 20.0]
        );
    }

    #[test]
    fn test_threshold_validation_and_ms_levels() {
        let all = IntegerSet::parse("1-").unwrap();
        assert!(ThresholdFilter::new(ThresholdKind::TicCutoff, 1.5, Orientation::MostIntense, all.clone()).is_err());
        assert!(ThresholdFilter::new(ThresholdKind::Count, -1.0, Orientation::MostIntense, all).is_err());
        assert!("tic-relative".parse::<ThresholdKind>().is_ok());
        assert!("median".parse::<ThresholdKind>().is_err());
        assert!("middle".parse::<Orientation>().is_err());

        let ms2_only = ThresholdFilter::new(
            ThresholdKind::Count,
            1.0,
            Orientation::MostIntense,
            IntegerSet::parse("2").unwrap(),
        )
        .unwrap();
        let mut ms1 = SpectrumBuilder::new(0, "scan=1")
            .arrays(vec![100.0, 200.0], vec![1.0, 2.0])
            .build();
        ms2_only.apply(&mut ms1);
        assert_eq!(ms1.default_array_length, 2);
        let mut ms2 = ms1.clone();
        ms2.ms_level = Some(2);
        ms2_only.apply(&mut ms2);
        assert_eq!(ms2.arrays.unwrap().mz, vec![200.0]);
        assert_eq!(ms2.default_array_length, 1);
    }
}
