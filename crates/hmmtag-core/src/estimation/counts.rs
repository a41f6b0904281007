use crate::error::{HmmError, Result};
use crate::model::Matrix;

/// Expected transition and emission counts for one training epoch.
///
/// Created by [`crate::HiddenMarkovModel::zero_counts`], filled by the
/// expectation pass and drained by the maximization step. Partial counts from
/// independent passes can be combined with [`ExpectedCounts::merge`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedCounts {
    a: Matrix,
    b: Matrix,
    sentences: usize,
    log_likelihood: f64,
}

impl ExpectedCounts {
    /// Zeroed counts for `k` tags and `v` emittable words.
    pub fn new(k: usize, v: usize) -> Self {
        Self {
            a: Matrix::zeros(k, k),
            b: Matrix::zeros(k, v),
            sentences: 0,
            log_likelihood: 0.0,
        }
    }

    /// Expected transition counts (k×k).
    pub fn a(&self) -> &Matrix {
        &self.a
    }

    /// Expected emission counts (k×V).
    pub fn b(&self) -> &Matrix {
        &self.b
    }

    /// Number of sentences accumulated since creation or the last clear.
    pub fn sentences(&self) -> usize {
        self.sentences
    }

    /// Multiplier-weighted sum of sentence log-probabilities.
    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Reset to zero for a new epoch.
    pub fn clear(&mut self) {
        self.a.fill_zero();
        self.b.fill_zero();
        self.sentences = 0;
        self.log_likelihood = 0.0;
    }

    /// Add another accumulator of the same shape into this one.
    pub fn merge(&mut self, other: &ExpectedCounts) -> Result<()> {
        self.check_shape(other.a.rows(), other.b.cols())?;
        for r in 0..self.a.rows() {
            for (x, y) in self.a.row_mut(r).iter_mut().zip(other.a.row(r)) {
                *x += y;
            }
            for (x, y) in self.b.row_mut(r).iter_mut().zip(other.b.row(r)) {
                *x += y;
            }
        }
        self.sentences += other.sentences;
        self.log_likelihood += other.log_likelihood;
        Ok(())
    }

    /// Whether no count has leaked into a structurally impossible cell.
    pub fn respects_structural_zeros(&self, bos_t: usize, eos_t: usize) -> bool {
        self.a.column(bos_t).iter().all(|&c| c == 0.0)
            && self.a.row(eos_t).iter().all(|&c| c == 0.0)
            && self.b.row(bos_t).iter().all(|&c| c == 0.0)
            && self.b.row(eos_t).iter().all(|&c| c == 0.0)
    }

    pub(crate) fn check_shape(&self, k: usize, v: usize) -> Result<()> {
        if self.a.shape() != (k, k) {
            return Err(HmmError::ShapeMismatch {
                what: "transition counts",
                expected: (k, k),
                actual: self.a.shape(),
            });
        }
        if self.b.shape() != (k, v) {
            return Err(HmmError::ShapeMismatch {
                what: "emission counts",
                expected: (k, v),
                actual: self.b.shape(),
            });
        }
        Ok(())
    }

    #[inline]
    pub(crate) fn add_transition(&mut self, s: usize, t: usize, weight: f64) {
        self.a.add(s, t, weight);
    }

    #[inline]
    pub(crate) fn add_emission(&mut self, t: usize, w: usize, weight: f64) {
        self.b.add(t, w, weight);
    }

    pub(crate) fn record_sentence(&mut self, weighted_log_z: f64) {
        self.sentences += 1;
        self.log_likelihood += weighted_log_z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_resets_everything() {
        let mut counts = ExpectedCounts::new(3, 2);
        counts.add_transition(2, 0, 1.0);
        counts.add_emission(0, 1, 0.5);
        counts.record_sentence(-3.0);
        assert_eq!(counts.sentences(), 1);

        counts.clear();
        assert_eq!(counts, ExpectedCounts::new(3, 2));
    }

    #[test]
    fn merge_adds_partial_counts() {
        let mut left = ExpectedCounts::new(3, 2);
        left.add_transition(2, 0, 1.0);
        left.record_sentence(-1.0);
        let mut right = ExpectedCounts::new(3, 2);
        right.add_transition(2, 0, 0.25);
        right.add_emission(0, 1, 2.0);
        right.record_sentence(-2.0);

        left.merge(&right).unwrap();
        assert_eq!(left.a().get(2, 0), 1.25);
        assert_eq!(left.b().get(0, 1), 2.0);
        assert_eq!(left.sentences(), 2);
        assert_eq!(left.log_likelihood(), -3.0);

        let wrong = ExpectedCounts::new(4, 2);
        assert!(matches!(left.merge(&wrong), Err(HmmError::ShapeMismatch { .. })));
    }

    #[test]
    fn structural_zero_detection() {
        // tags: 0 ordinary, 1 = EOS, 2 = BOS
        let mut counts = ExpectedCounts::new(3, 2);
        counts.add_transition(2, 0, 1.0);
        counts.add_transition(0, 1, 1.0);
        assert!(counts.respects_structural_zeros(2, 1));

        counts.add_transition(0, 2, 1e-30);
        assert!(!counts.respects_structural_zeros(2, 1));
    }
}
