//! Ranking with tie averaging.

use std::cmp::Ordering;

/// Tolerance under which two values share a rank.
const TIE_EPSILON: f64 = 1e-10;

/// Ascending 1-based ranks of `values` in input order; ties get the mean of
/// the ranks they span.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && (values[order[j + 1]] - values[order[j]]).abs() < TIE_EPSILON {
            j += 1;
        }
        let avg = (i + j + 2) as f64 / 2.0;
        for &idx in &order[i..=j] {
            ranks[idx] = avg;
        }
        i = j + 1;
    }
    ranks
}
