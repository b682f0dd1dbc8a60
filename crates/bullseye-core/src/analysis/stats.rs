use ndarray::ArrayView2;

/// Percentile (0..=100) of all values, with linear interpolation between
/// the two nearest ranks. Empty input yields 0.
pub fn percentile(data: ArrayView2<f64>, pct: f64) -> f64 {
    let mut values: Vec<f64> = data.iter().copied().collect();
    percentile_mut(&mut values, pct)
}

/// Same as [`percentile`] but reorders `values` in place.
pub fn percentile_mut(values: &mut [f64], pct: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let rank = (pct.clamp(0.0, 100.0) / 100.0) * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;

    let (_, lo_val, upper) = values.select_nth_unstable_by(lo, f64::total_cmp);
    let lo_val = *lo_val;
    if hi == lo {
        return lo_val;
    }
    // Next rank is the minimum of the upper partition.
    let hi_val = upper.iter().copied().fold(f64::INFINITY, f64::min);
    lo_val + (hi_val - lo_val) * (rank - lo as f64)
}
