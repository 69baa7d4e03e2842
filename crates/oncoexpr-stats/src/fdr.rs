//! Benjamini-Hochberg false discovery rate control.

use std::cmp::Ordering;

/// BH-adjusted p-values, in input order. Non-finite inputs are excluded
/// from the test count and come back as NaN.
pub fn benjamini_hochberg(pvalues: &[f64]) -> Vec<f64> {
    let n = pvalues.len();
    let mut order: Vec<usize> = (0..n).filter(|&i| pvalues[i].is_finite()).collect();
    let m = order.len();
    let mut adjusted = vec![f64::NAN; n];
    if m == 0 {
        return adjusted;
    }

    order.sort_by(|&a, &b| pvalues[a].partial_cmp(&pvalues[b]).unwrap_or(Ordering::Equal));

    // Walk from the largest p-value down, carrying the running minimum.
    let mut running = f64::INFINITY;
    for (pos, &i) in order.iter().enumerate().rev() {
        let rank = (pos + 1) as f64;
        let adj = (pvalues[i] * m as f64 / rank).min(1.0);
        running = running.min(adj);
        adjusted[i] = running;
    }
    adjusted
}
