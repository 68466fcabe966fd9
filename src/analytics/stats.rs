//! Descriptive statistics over timing samples
//!
//! All functions are total: empty input yields zero-valued results.

/// Default gap (ms) that separates two typing bursts
pub const DEFAULT_BURST_THRESHOLD_MS: f64 = 700.0;

fn sorted(data: &[f64]) -> Vec<f64> {
    let mut values = data.to_vec();
    values.sort_by(f64::total_cmp);
    values
}

/// Median of `data`; the mean of the two middle values for even lengths.
pub fn median(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let values = sorted(data);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

/// Linear-interpolation percentile, `p` in `[0, 1]`.
///
/// With `k = (n - 1) * p`, the result interpolates between the order
/// statistics at `floor(k)` and `min(floor(k) + 1, n - 1)`.
pub fn percentile(data: &[f64], p: f64) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let values = sorted(data);
    let last = values.len() - 1;
    let k = last as f64 * p.clamp(0.0, 1.0);
    let f = k.floor() as usize;
    let c = (f + 1).min(last);
    if f == c {
        return values[f];
    }
    values[f] + (values[c] - values[f]) * (k - f as f64)
}

/// Group ascending press timestamps into bursts.
///
/// Consecutive presses less than `threshold_ms` apart belong to the same
/// burst. Returns `(burst_count, average_burst_length)`.
pub fn compute_bursts(timestamps_ms: &[f64], threshold_ms: f64) -> (u32, f64) {
    if timestamps_ms.is_empty() {
        return (0, 0.0);
    }

    let mut bursts: Vec<u32> = Vec::new();
    let mut current_len = 1;
    for pair in timestamps_ms.windows(2) {
        if pair[1] - pair[0] < threshold_ms {
            current_len += 1;
        } else {
            bursts.push(current_len);
            current_len = 1;
        }
    }
    bursts.push(current_len);

    let total: u32 = bursts.iter().sum();
    let count = bursts.len() as u32;
    (count, total as f64 / count as f64)
}
