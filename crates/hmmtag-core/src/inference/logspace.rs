//! Log-space helpers shared by the forward, backward and Viterbi passes.

/// Numerically stable `log(Σ exp(x))` over an iterator.
///
/// Returns `-inf` for an empty input or when every term is `-inf`, so an
/// unreachable cell never produces NaN through `-inf - -inf`.
pub fn log_sum_exp<I>(xs: I) -> f64
where
    I: IntoIterator<Item = f64>,
    I::IntoIter: Clone,
{
    let iter = xs.into_iter();
    let max = iter.clone().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return f64::NEG_INFINITY;
    }
    let sum: f64 = iter.map(|x| (x - max).exp()).sum();
    max + sum.ln()
}

/// Largest finite value of a row, or `None` if every entry is `-inf`.
pub fn finite_max(row: &[f64]) -> Option<f64> {
    let max = row.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    (max > f64::NEG_INFINITY).then_some(max)
}

/// `exp(x)` with an explicit zero for `-inf`.
#[inline]
pub fn exp_or_zero(x: f64) -> f64 {
    if x == f64::NEG_INFINITY { 0.0 } else { x.exp() }
}
