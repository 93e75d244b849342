//! Sparse/dense conversion for intensity-vs-coordinate arrays.
//!
//! Some sources materialize every zero-intensity sample of a profile scan,
//! others hand back only the nonzero samples on an implicit coordinate grid.
//! Both are normalized to the same "boundary zero" form: every nonzero run is
//! flanked by exactly one zero sample on each side (where the array has room),
//! and interior zero runs are collapsed to those flanking zeros.
//!
//! - [`compact_indices`] / [`compact_in_place`]: dense -> boundary-zero form
//! - [`reconstruct`]: nonzero samples -> boundary-zero form on a bounded grid
//!
//! For data already in boundary-zero form both operations are idempotent.

use serde::{Deserialize, Serialize};

/// Positions of `intensities` to keep when compacting.
///
/// Sample `i` is kept iff it is nonzero or one of its immediate neighbours is
/// nonzero. All-zero input yields nothing.
pub fn compact_indices(intensities: &[f64]) -> Vec<usize> {
    let n = intensities.len();
    let mut kept = Vec::with_capacity(n);
    for i in 0..n {
        if keep_sample(intensities, i) {
            kept.push(i);
        }
    }
    kept
}

/// Number of samples [`compact_indices`] would keep, without allocating
pub fn compacted_len(intensities: &[f64]) -> usize {
    (0..intensities.len())
        .filter(|&i| keep_sample(intensities, i))
        .count()
}

#[inline]
fn keep_sample(y: &[f64], i: usize) -> bool {
    y[i] != 0.0 || (i > 0 && y[i - 1] != 0.0) || (i + 1 < y.len() && y[i + 1] != 0.0)
}

/// Compact parallel coordinate/intensity arrays in place
pub fn compact_in_place(coords: &mut Vec<f64>, intensities: &mut Vec<f64>) {
    compact_with_extra(coords, intensities, None);
}

/// Compact coordinate/intensity arrays plus an optional third parallel array
/// (e.g. drift time), keeping all three aligned.
pub fn compact_with_extra(
    coords: &mut Vec<f64>,
    intensities: &mut Vec<f64>,
    extra: Option<&mut Vec<f64>>,
) {
    debug_assert_eq!(coords.len(), intensities.len());
    let kept = compact_indices(intensities);
    if kept.len() == intensities.len() {
        return;
    }
    retain_positions(coords, &kept);
    if let Some(extra) = extra {
        debug_assert_eq!(extra.len(), intensities.len());
        retain_positions(extra, &kept);
    }
    retain_positions(intensities, &kept);
}

fn retain_positions(values: &mut Vec<f64>, kept: &[usize]) {
    for (dst, &src) in kept.iter().enumerate() {
        if src < values.len() {
            values[dst] = values[src];
        }
    }
    values.truncate(kept.len().min(values.len()));
}

/// Samples addressed by their position on a coordinate grid
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SparseSamples {
    /// Grid positions, strictly increasing
    pub indices: Vec<usize>,
    /// Intensity at each position
    pub intensities: Vec<f64>,
}

impl SparseSamples {
    /// Create from parallel arrays
    pub fn new(indices: Vec<usize>, intensities: Vec<f64>) -> Self {
        Self {
            indices,
            intensities,
        }
    }

    /// Gather the samples of a dense intensity array at `indices`.
    ///
    /// Positions past the end of `dense` are skipped.
    pub fn gather(dense: &[f64], indices: Vec<usize>) -> Self {
        let (indices, intensities) = indices
            .into_iter()
            .filter_map(|i| dense.get(i).map(|&y| (i, y)))
            .unzip();
        Self {
            indices,
            intensities,
        }
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    /// True when there are no samples
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    /// Resolve grid positions to explicit coordinates
    pub fn into_arrays(self, grid: &SampleGrid) -> (Vec<f64>, Vec<f64>) {
        let coords = self.indices.iter().map(|&i| grid.coordinate(i)).collect();
        (coords, self.intensities)
    }
}

/// Implicit, evenly spaced coordinate grid used by sparse sources
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SampleGrid {
    /// Coordinate of position 0
    pub start: f64,
    /// Spacing between adjacent positions
    pub step: f64,
    /// Number of positions on the grid
    pub len: usize,
}

impl SampleGrid {
    /// Coordinate of grid position `index`
    pub fn coordinate(&self, index: usize) -> f64 {
        self.start + self.step * index as f64
    }
}

/// Rebuild boundary-zero form from nonzero samples on a grid of `len` positions.
///
/// Zero-valued input samples are ignored. Each maximal run of contiguous
/// positions gets one explicit zero before and after it (when inside the
/// grid); a gap between runs is represented by at most two zeros no matter
/// how wide it is. Positions at or beyond `len` are dropped.
pub fn reconstruct(indices: &[usize], intensities: &[f64], len: usize) -> SparseSamples {
    let mut out = SparseSamples {
        indices: Vec::with_capacity(indices.len() + 2),
        intensities: Vec::with_capacity(indices.len() + 2),
    };

    let push_zero = |out: &mut SparseSamples, position: usize| {
        if position < len && out.indices.last().map_or(true, |&last| last < position) {
            out.indices.push(position);
            out.intensities.push(0.0);
        }
    };

    let mut previous: Option<usize> = None;
    for (&index, &intensity) in indices.iter().zip(intensities) {
        if intensity == 0.0 || index >= len {
            continue;
        }
        let starts_run = previous.map_or(true, |p| index > p + 1);
        if starts_run {
            if let Some(p) = previous {
                push_zero(&mut out, p + 1);
            }
            if index > 0 {
                push_zero(&mut out, index - 1);
            }
        }
        if out.indices.last().map_or(true, |&last| last < index) {
            out.indices.push(index);
            out.intensities.push(intensity);
        }
        previous = Some(index);
    }
    if let Some(p) = previous {
        push_zero(&mut out, p + 1);
    }
    out
}

/// Expand samples into a dense array of `len` intensities (zeros elsewhere)
pub fn materialize(samples: &SparseSamples, len: usize) -> Vec<f64> {
    let mut dense = vec![0.0; len];
    for (&i, &y) in samples.indices.iter().zip(&samples.intensities) {
        if i < len {
            dense[i] = y;
        }
    }
    dense
}
