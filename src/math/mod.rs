// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Some helper mathematics.


/// The `q`th percentile (0 to 100) of `values`, linearly interpolating between
/// the two closest ranks. NaNs are ignored. Returns NaN if there's nothing to
/// take a percentile of.
pub(crate) fn percentile<'a, I>(values: I, q: f64) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut sorted: Vec<f64> = values.into_iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_unstable_by(|a, b| a.total_cmp(b));

    let rank = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * frac
}

/// The index of the unit-width histogram bin that `v` falls into, for bins
/// with edges `0, 1, ..., n`. The last bin is closed on the right. Values
/// outside the edges (by more than `tolerance`) and NaNs land nowhere.
pub(crate) fn bin_index(v: f64, n: usize, tolerance: f64) -> Option<usize> {
    if n == 0 || v.is_nan() {
        return None;
    }
    let upper = n as f64;
    if v < -tolerance || v > upper + tolerance {
        return None;
    }
    let i = v.max(0.0).floor() as usize;
    Some(i.min(n - 1))
}

/// Minimum, maximum and mean of the finite values. `None` if there are none.
pub(crate) fn min_max_mean<'a, I>(values: I) -> Option<(f64, f64, f64)>
where
    I: IntoIterator<Item = &'a f64>,
{
    let mut count = 0_usize;
    let mut sum = 0.0;
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values.into_iter().filter(|v| v.is_finite()) {
        count += 1;
        sum += v;
        min = min.min(v);
        max = max.max(v);
    }
    if count == 0 {
        None
    } else {
        Some((min, max, sum / count as f64))
    }
}

/// The span (max - min) of the finite values; 0 if there are none.
pub(crate) fn span<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    min_max_mean(values).map_or(0.0, |(min, max, _)| max - min)
}
