//! P-values from test statistics.

use statrs::distribution::{ContinuousCDF, StudentsT};

/// Two-sided p-value of a t statistic with `df` degrees of freedom.
/// `None` when the statistic or df is unusable.
pub fn two_sided_t(stat: f64, df: f64) -> Option<f64> {
    if stat.is_nan() || df.is_nan() || df <= 0.0 || df.is_infinite() {
        return None;
    }
    if stat.is_infinite() {
        return Some(0.0);
    }
    let dist = StudentsT::new(0.0, 1.0, df).ok()?;
    Some((2.0 * dist.cdf(-stat.abs())).clamp(0.0, 1.0))
}

/// Significance of a correlation coefficient `r` over `n` paired
/// observations: t = r·sqrt((n−2)/(1−r²)) on n−2 degrees of freedom.
/// Requires at least three observations.
pub fn correlation_pvalue(r: f64, n: usize) -> Option<f64> {
    if n < 3 || !r.is_finite() {
        return None;
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= 0.0 {
        return Some(0.0);
    }
    two_sided_t(r * (df / denom).sqrt(), df)
}

/// Welch's unequal-variance t-test of `a` against `b`.
///
/// Returns `(t, df, p)`. `None` when either group has fewer than two values
/// or both groups have zero variance.
pub fn welch_t_test(a: &[f64], b: &[f64]) -> Option<(f64, f64, f64)> {
    let (na, nb) = (a.len() as f64, b.len() as f64);
    if a.len() < 2 || b.len() < 2 {
        return None;
    }
    let (ma, va) = mean_var(a);
    let (mb, vb) = mean_var(b);
    let (sa, sb) = (va / na, vb / nb);
    let se2 = sa + sb;
    if se2 <= 0.0 {
        return None;
    }
    let t = (ma - mb) / se2.sqrt();
    let df = se2 * se2 / (sa * sa / (na - 1.0) + sb * sb / (nb - 1.0));
    let p = two_sided_t(t, df)?;
    Some((t, df, p))
}

/// Mean and unbiased (n−1) variance. Variance is 0 for fewer than two values.
pub fn mean_var(values: &[f64]) -> (f64, f64) {
    let n = values.len();
    if n == 0 {
        return (f64::NAN, 0.0);
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    if n < 2 {
        return (mean, 0.0);
    }
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    (mean, ss / (n - 1) as f64)
}
