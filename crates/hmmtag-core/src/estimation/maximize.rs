//! # Maximization Step
//!
//! Re-estimates `A` and `B` from accumulated expected counts with add-λ
//! smoothing. λ only lands on structurally possible cells of ordinary rows,
//! so every ordinary row sums to exactly 1 after normalization and the
//! structural zeros survive untouched. The BOS row of a bigram model is
//! estimated from its raw counts.

use tracing::{debug, info};

use crate::error::{HmmError, Result};
use crate::estimation::ExpectedCounts;
use crate::model::{HiddenMarkovModel, Matrix};

/// Row-sum tolerance checked after every maximization in debug builds.
const POSTCONDITION_TOLERANCE: f64 = 1e-5;

impl HiddenMarkovModel {
    /// Replace the parameters with smoothed relative frequencies of `counts`.
    ///
    /// In unigram mode the transition counts are pooled across source tags and
    /// the resulting single distribution is broadcast to every source row.
    ///
    /// # Errors
    /// - [`HmmError::NegativeSmoothing`] if `lambda` is negative or NaN
    /// - [`HmmError::NoExpectedCounts`] if no sentence was accumulated
    /// - [`HmmError::ShapeMismatch`] if `counts` belongs to another model
    pub fn maximize(&mut self, counts: &ExpectedCounts, lambda: f64) -> Result<()> {
        if lambda.is_nan() || lambda < 0.0 {
            return Err(HmmError::NegativeSmoothing(lambda));
        }
        if counts.sentences() == 0 {
            return Err(HmmError::NoExpectedCounts);
        }
        counts.check_shape(self.k(), self.v())?;
        debug_assert!(counts.respects_structural_zeros(self.bos_t(), self.eos_t()));

        let (k, v) = (self.k(), self.v());
        let (bos_t, eos_t) = (self.bos_t(), self.eos_t());

        let mut a = Matrix::zeros(k, k);
        if self.is_unigram() {
            let mut pooled = vec![0.0; k];
            for s in 0..k {
                for (total, c) in pooled.iter_mut().zip(counts.a().row(s)) {
                    *total += c;
                }
            }
            let row = smoothed_row(&pooled, lambda, |t| t != bos_t);
            for s in (0..k).filter(|&s| s != eos_t) {
                a.row_mut(s).copy_from_slice(&row);
            }
        } else {
            for s in self.params().ordinary_tags() {
                let row = smoothed_row(counts.a().row(s), lambda, |t| t != bos_t);
                a.row_mut(s).copy_from_slice(&row);
            }
            // The BOS row is a sentinel row: relative frequencies, no pseudocounts.
            let row = smoothed_row(counts.a().row(bos_t), 0.0, |t| t != bos_t);
            a.row_mut(bos_t).copy_from_slice(&row);
        }

        let mut b = Matrix::zeros(k, v);
        for t in self.params().ordinary_tags() {
            let row = smoothed_row(counts.b().row(t), lambda, |_| true);
            b.row_mut(t).copy_from_slice(&row);
        }

        self.params_mut().replace(a, b);
        debug_assert!(self.rows_are_normalized());
        info!(
            generation = self.params().generation(),
            sentences = counts.sentences(),
            lambda,
            "re-estimated parameters"
        );
        Ok(())
    }

    /// Every row that carries mass sums to 1 within tolerance.
    fn rows_are_normalized(&self) -> bool {
        let close = |row: &[f64]| {
            let sum: f64 = row.iter().sum();
            sum == 0.0 || (sum - 1.0).abs() <= POSTCONDITION_TOLERANCE
        };
        (0..self.k()).all(|s| close(self.a().row(s)) && close(self.b().row(s)))
    }
}

/// `(count + λ) / (row total + λ·|open cells|)` over the cells `open` admits;
/// closed cells stay at zero. A row with no mass at all stays all-zero rather
/// than dividing by zero.
fn smoothed_row(counts: &[f64], lambda: f64, open: impl Fn(usize) -> bool) -> Vec<f64> {
    let mut row: Vec<f64> = counts
        .iter()
        .enumerate()
        .map(|(i, &c)| if open(i) { c + lambda } else { 0.0 })
        .collect();
    let mut total: f64 = row.iter().sum();
    if total == 0.0 {
        debug!("row with no expected mass left unnormalized");
        total = 1.0;
    }
    row.iter_mut().for_each(|p| *p /= total);
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::fixtures::*;
    use crate::types::{BOS_TAG, BOS_WORD, EOS_TAG, EOS_WORD};

    #[test]
    fn maximize_before_expectation_fails() {
        let mut model = ice_cream();
        let counts = model.zero_counts();
        assert!(matches!(
            model.maximize(&counts, 1.0),
            Err(HmmError::NoExpectedCounts)
        ));
    }

    #[test]
    fn negative_or_nan_lambda_fails() {
        let mut model = ice_cream();
        let mut counts = model.zero_counts();
        model.e_step(&untagged(&model, &[0]), 1.0, &mut counts).unwrap();
        assert!(matches!(
            model.maximize(&counts, -0.5),
            Err(HmmError::NegativeSmoothing(_))
        ));
        assert!(model.maximize(&counts, f64::NAN).is_err());
        assert_eq!(model.params().generation(), 0);
    }

    #[test]
    fn wrong_shape_fails() {
        let mut model = ice_cream();
        let mut counts = ExpectedCounts::new(3, 3);
        counts.record_sentence(0.0);
        assert!(matches!(
            model.maximize(&counts, 0.0),
            Err(HmmError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn smoothing_alone_yields_uniform_rows() {
        let mut model = ice_cream();
        let mut counts = model.zero_counts();
        model.e_step(&untagged(&model, &[2, 0]), 0.0, &mut counts).unwrap();
        model.maximize(&counts, 1.0).unwrap();

        let third = 1.0 / 3.0;
        for s in [0, 1] {
            for t in [0, 1, model.eos_t()] {
                assert!((model.a().get(s, t) - third).abs() < 1e-12);
            }
            assert_eq!(model.a().get(s, model.bos_t()), 0.0);
        }
        for t in [0, 1] {
            assert!(model.b().row(t).iter().all(|&p| (p - third).abs() < 1e-12));
        }
        // No sentence start was counted, so the unsmoothed BOS row has no mass.
        assert!(model.a().row(model.bos_t()).iter().all(|&p| p == 0.0));
    }

    #[test]
    fn bos_row_is_not_smoothed() {
        let tagset = alphabet(&["N", "V", EOS_TAG, BOS_TAG]);
        let vocab = alphabet(&["dog", "runs", EOS_WORD, BOS_WORD]);
        let mut model = HiddenMarkovModel::new(tagset, vocab, false, 4).unwrap();
        let mut counts = model.zero_counts();
        let s = sentence(&model, &[(0, Some(0)), (1, Some(1))]);
        model.e_step(&s, 1.0, &mut counts).unwrap();
        model.maximize(&counts, 1.0).unwrap();

        let bos = model.bos_t();
        assert_eq!(model.a().row(bos), &[1.0, 0.0, 0.0, 0.0]);
        // Ordinary rows still get λ: N saw N->V once, over 3 open cells.
        assert!((model.a().get(0, 1) - 0.5).abs() < 1e-12);
        assert!((model.a().get(0, 0) - 0.25).abs() < 1e-12);
        assert_eq!(model.logprob(&untagged(&model, &[])).unwrap(), f64::NEG_INFINITY);
        model.check_invariants(1e-9).unwrap();
    }

    #[test]
    fn supervised_counts_give_relative_frequencies() {
        let mut model = ice_cream();
        let mut counts = model.zero_counts();
        // H H C and C
        let s1 = sentence(&model, &[(2, Some(0)), (1, Some(0)), (0, Some(1))]);
        let s2 = sentence(&model, &[(0, Some(1))]);
        model.e_step(&s1, 1.0, &mut counts).unwrap();
        model.e_step(&s2, 1.0, &mut counts).unwrap();
        model.maximize(&counts, 0.0).unwrap();

        let (h, c, eos, bos) = (0, 1, model.eos_t(), model.bos_t());
        assert_eq!(model.a().get(bos, h), 0.5);
        assert_eq!(model.a().get(bos, c), 0.5);
        assert_eq!(model.a().get(h, h), 0.5);
        assert_eq!(model.a().get(h, c), 0.5);
        assert_eq!(model.a().get(c, eos), 1.0);
        assert_eq!(model.b().get(h, 2), 0.5);
        assert_eq!(model.b().get(h, 1), 0.5);
        assert_eq!(model.b().get(c, 0), 1.0);
        model.check_invariants(1e-9).unwrap();
    }

    #[test]
    fn smoothing_preserves_structural_zeros() {
        let mut model = ice_cream();
        let mut counts = model.zero_counts();
        model.e_step(&untagged(&model, &[2, 0, 2]), 1.0, &mut counts).unwrap();
        model.maximize(&counts, 0.5).unwrap();

        let (bos, eos) = (model.bos_t(), model.eos_t());
        assert!(model.a().column(bos).iter().all(|&p| p == 0.0));
        assert!(model.a().row(eos).iter().all(|&p| p == 0.0));
        assert!(model.b().row(bos).iter().all(|&p| p == 0.0));
        assert!(model.b().row(eos).iter().all(|&p| p == 0.0));
        model.check_invariants(1e-9).unwrap();
    }

    #[test]
    fn unigram_pools_transition_counts() {
        let tagset = alphabet(&["N", "V", EOS_TAG, BOS_TAG]);
        let vocab = alphabet(&["dog", "runs", EOS_WORD, BOS_WORD]);
        let mut model = HiddenMarkovModel::new(tagset, vocab, true, 9).unwrap();
        let mut counts = model.zero_counts();
        // N V: BOS->N, N->V, V->EOS pooled into one row.
        let s = sentence(&model, &[(0, Some(0)), (1, Some(1))]);
        model.e_step(&s, 1.0, &mut counts).unwrap();
        model.maximize(&counts, 0.0).unwrap();

        let expected = [1.0 / 3.0, 1.0 / 3.0, 1.0 / 3.0, 0.0];
        for row in [0, 1, 3] {
            for (p, e) in model.a().row(row).iter().zip(expected) {
                assert!((p - e).abs() < 1e-12);
            }
        }
        assert!(model.a().row(2).iter().all(|&p| p == 0.0));
    }

    #[test]
    fn maximize_bumps_generation() {
        let mut model = ice_cream();
        let mut counts = model.zero_counts();
        model.e_step(&untagged(&model, &[1]), 1.0, &mut counts).unwrap();
        model.maximize(&counts, 0.1).unwrap();
        let (a, b) = (model.a().clone(), model.b().clone());
        model.maximize(&counts, 0.1).unwrap();
        assert_eq!(model.params().generation(), 2);
        assert_eq!(model.a(), &a);
        assert_eq!(model.b(), &b);
    }
}
