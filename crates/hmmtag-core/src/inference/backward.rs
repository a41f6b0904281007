//! # Backward Algorithm
//!
//! Recomputes `log Z` from the end of the sentence and, combined with the
//! forward trellis, yields posterior (expected) counts.
//!
//! Rows are scaled with the forward offsets: the stored row is
//! `beta_true[j] - (c_{j+1} + ... + c_n)`, so that
//! `alpha[j] + beta[j] - scaled_log_z` is the exact log-posterior at `j`.

use tracing::{debug, trace, warn};

use crate::error::{HmmError, Result};
use crate::estimation::ExpectedCounts;
use crate::inference::forward::ForwardTrellis;
use crate::inference::logspace::{exp_or_zero, log_sum_exp};
use crate::model::HiddenMarkovModel;
use crate::types::IntegerizedSentence;

/// Relative tolerance for forward/backward `log Z` agreement.
pub const LOG_Z_TOLERANCE: f64 = 1e-4;

/// Scaled log-backward values for one sentence.
#[derive(Debug, Clone)]
pub struct BackwardTrellis {
    pub(crate) beta: Vec<Vec<f64>>,
    pub(crate) log_z: f64,
}

impl BackwardTrellis {
    /// Scaled backward row at position `j`.
    pub fn beta(&self, j: usize) -> &[f64] {
        &self.beta[j]
    }

    /// `log Z` as re-derived from the backward direction.
    pub fn log_z(&self) -> f64 {
        self.log_z
    }
}

impl HiddenMarkovModel {
    /// Run the backward pass over the sentence just processed by
    /// [`forward`](Self::forward) and add its expected counts, weighted by
    /// `mult`, into `counts`. Returns the backward `log Z`.
    ///
    /// # Errors
    /// - [`HmmError::TrellisMismatch`] if `trellis` was built for another sentence
    /// - [`HmmError::StaleTrellis`] if the parameters changed since the forward pass
    /// - [`HmmError::ImpossibleSentence`] if the sentence has probability zero
    /// - [`HmmError::LogZMismatch`] if the two directions disagree; counts are
    ///   left untouched in that case
    pub fn backward(
        &self,
        isent: &IntegerizedSentence,
        trellis: &ForwardTrellis,
        mult: f64,
        counts: &mut ExpectedCounts,
    ) -> Result<f64> {
        if trellis.sentence != *isent {
            return Err(HmmError::TrellisMismatch);
        }
        counts.check_shape(self.k(), self.v())?;
        if !(mult.is_finite() && mult >= 0.0) {
            return Err(HmmError::InvalidParameters(format!(
                "sentence multiplier must be finite and non-negative, got {mult}"
            )));
        }

        let backward = self.backward_trellis(trellis)?;
        let (forward_z, backward_z) = (trellis.log_z, backward.log_z);
        if (forward_z - backward_z).abs() > LOG_Z_TOLERANCE * forward_z.abs().max(1.0) {
            warn!(
                forward = forward_z,
                backward = backward_z,
                "log Z from forward and backward passes do not match"
            );
            return Err(HmmError::LogZMismatch {
                forward: forward_z,
                backward: backward_z,
            });
        }

        self.accumulate(trellis, &backward, mult, counts);
        Ok(backward_z)
    }

    /// Compute the scaled backward table for a forward trellis.
    pub fn backward_trellis(&self, trellis: &ForwardTrellis) -> Result<BackwardTrellis> {
        let generation = self.params().generation();
        if trellis.generation != generation {
            return Err(HmmError::StaleTrellis {
                trellis: trellis.generation,
                model: generation,
            });
        }
        if !trellis.is_possible() {
            return Err(HmmError::ImpossibleSentence);
        }

        let params = self.params();
        let (log_a, log_b) = (params.log_a(), params.log_b());
        let eos_t = params.eos_t();
        let isent = &trellis.sentence;
        let allowed = &trellis.allowed;
        let n = isent.interior_len();

        let mut beta = vec![vec![f64::NEG_INFINITY; params.num_tags()]; n + 2];
        beta[n + 1][eos_t] = 0.0;

        // EOS emits nothing: only the transition term.
        for &s in &allowed[n] {
            beta[n][s] = log_a.get(s, eos_t);
        }

        for j in (0..n).rev() {
            let word = isent.word(j + 1);
            let scale = trellis.scales[j + 1];
            let (head, tail) = beta.split_at_mut(j + 1);
            let (row, next) = (&mut head[j], &tail[0]);
            for &s in &allowed[j] {
                let out = log_sum_exp(
                    allowed[j + 1]
                        .iter()
                        .map(|&t| log_a.get(s, t) + log_b.get(t, word) + next[t]),
                );
                row[s] = out - scale;
            }
            trace!(position = j, beta = ?row, "backward row");
        }

        let log_z = log_sum_exp(beta[0].iter().copied()) + trellis.total_scale();
        debug!(n, log_z, "backward pass");
        Ok(BackwardTrellis { beta, log_z })
    }

    /// Posterior tag marginals `p(tag_j = t | sentence)` for every position,
    /// as a `(n + 2) × k` table.
    pub fn posterior_marginals(&self, isent: &IntegerizedSentence) -> Result<Vec<Vec<f64>>> {
        let forward = self.forward(isent)?;
        let backward = self.backward_trellis(&forward)?;
        let scaled_log_z = forward.scaled_log_z();
        Ok((0..isent.len())
            .map(|j| {
                forward
                    .alpha(j)
                    .iter()
                    .zip(backward.beta(j))
                    .map(|(a, b)| exp_or_zero(a + b - scaled_log_z))
                    .collect()
            })
            .collect())
    }
}
