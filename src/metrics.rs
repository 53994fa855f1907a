//! Metrics.
//!
//! Classification helpers shared by evaluation and prediction. They never participate in
//! backprop and never allocate.

/// Round `value` up to `places` decimal places.
///
/// Used for reporting only: `ceil_to(0.0123451, 6) == 0.012346`.
pub fn ceil_to(value: f64, places: u32) -> f64 {
    let scale = 10f64.powi(places as i32);
    (value * scale).ceil() / scale
}

/// Index of the largest strictly positive output.
///
/// Ties resolve to the lowest index. Returns `None` when no output is `> 0`.
pub fn positive_argmax(outputs: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in outputs.iter().enumerate() {
        if v > 0.0 && best.is_none_or(|(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Index of the largest output, with ties resolving to the lowest index.
///
/// NaN entries never win. An empty slice yields `0`.
pub fn argmax(outputs: &[f32]) -> usize {
    let mut best_idx = 0usize;
    let mut best = f32::NEG_INFINITY;
    for (i, &v) in outputs.iter().enumerate() {
        if v > best {
            best = v;
            best_idx = i;
        }
    }
    best_idx
}

/// Position of the entry equal to `1.0` in a one-hot vector.
pub fn one_hot_index(ideal: &[f32]) -> Option<usize> {
    ideal.iter().position(|&v| v == 1.0)
}

/// Percentage of correct answers, rounded up to two decimals.
///
/// Integer arithmetic keeps exact ratios exact: `3 / 4` is `75.0`, `1 / 3` is `33.34`.
pub fn accuracy_percent(correct: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let scaled = (correct as u128 * 10_000).div_ceil(total as u128);
    scaled as f64 / 100.0
}
