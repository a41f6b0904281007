//! # Forward Algorithm
//!
//! Computes scaled log-forward values `alpha` and the sentence log-probability
//! `log Z`, marginalizing over every unknown tag.
//!
//! After each position the row maximum `c_j` is subtracted from `alpha[j]`
//! and recorded, so the stored row is `alpha_true[j] - (c_1 + ... + c_j)`.
//! The backward pass reuses the same offsets, which makes
//! `alpha[j][t] + beta[j][t] - scaled_log_z` the unscaled log-posterior.

use tracing::{debug, trace};

use crate::error::Result;
use crate::inference::logspace::{finite_max, log_sum_exp};
use crate::model::HiddenMarkovModel;
use crate::types::IntegerizedSentence;

/// Sentence-scoped result of a forward pass, consumed by the backward pass.
#[derive(Debug, Clone)]
pub struct ForwardTrellis {
    pub(crate) sentence: IntegerizedSentence,
    pub(crate) allowed: Vec<Vec<usize>>,
    pub(crate) alpha: Vec<Vec<f64>>,
    pub(crate) scales: Vec<f64>,
    pub(crate) log_z: f64,
    pub(crate) generation: u64,
}

impl ForwardTrellis {
    /// Total log-probability of the sentence.
    pub fn log_z(&self) -> f64 {
        self.log_z
    }

    /// Scaled forward row at position `j`.
    pub fn alpha(&self, j: usize) -> &[f64] {
        &self.alpha[j]
    }

    /// Offset subtracted from row `j` (zero at both sentinels).
    pub fn scale(&self, j: usize) -> f64 {
        self.scales[j]
    }

    /// Sum of every per-position offset.
    pub fn total_scale(&self) -> f64 {
        self.scales.iter().sum()
    }

    /// `log Z` minus the accumulated offsets.
    pub fn scaled_log_z(&self) -> f64 {
        self.log_z - self.total_scale()
    }

    /// Whether the sentence has non-zero probability.
    pub fn is_possible(&self) -> bool {
        self.log_z > f64::NEG_INFINITY
    }

    pub fn sentence(&self) -> &IntegerizedSentence {
        &self.sentence
    }

    /// Parameter generation the trellis was computed under.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

impl HiddenMarkovModel {
    /// Run the forward algorithm on a tagged, untagged, or partially tagged
    /// sentence.
    ///
    /// Supervised positions only admit their known tag, so a fully tagged
    /// sentence scores exactly its single path.
    ///
    /// # Errors
    /// Returns [`crate::HmmError::InvalidSentence`] for malformed input.
    pub fn forward(&self, isent: &IntegerizedSentence) -> Result<ForwardTrellis> {
        self.validate_sentence(isent)?;

        let params = self.params();
        let (log_a, log_b) = (params.log_a(), params.log_b());
        let (bos_t, eos_t) = (params.bos_t(), params.eos_t());
        let k = params.num_tags();
        let n = isent.interior_len();
        let allowed = self.allowed_tags(isent);

        let mut alpha = vec![vec![f64::NEG_INFINITY; k]; n + 2];
        let mut scales = vec![0.0; n + 2];
        alpha[0][bos_t] = 0.0;

        for j in 1..=n {
            let word = isent.word(j);
            let (done, rest) = alpha.split_at_mut(j);
            let prev = &done[j - 1];
            let row = &mut rest[0];

            // `allowed[j]` never contains BOS, so transitions into BOS are
            // excluded regardless of what A holds.
            for &t in &allowed[j] {
                let into = log_sum_exp(allowed[j - 1].iter().map(|&s| prev[s] + log_a.get(s, t)));
                row[t] = into + log_b.get(t, word);
            }

            if let Some(max) = finite_max(row) {
                row.iter_mut().for_each(|x| *x -= max);
                scales[j] = max;
            }
            trace!(position = j, alpha = ?row, scale = scales[j], "forward row");
        }

        let end = log_sum_exp(allowed[n].iter().map(|&s| alpha[n][s] + log_a.get(s, eos_t)));
        alpha[n + 1][eos_t] = end;
        let log_z = end + scales.iter().sum::<f64>();
        debug!(n, log_z, "forward pass");

        Ok(ForwardTrellis {
            sentence: isent.clone(),
            allowed,
            alpha,
            scales,
            log_z,
            generation: params.generation(),
        })
    }

    /// Log-probability of a sentence under the current parameters,
    /// marginalizing over every tag the sentence does not fix.
    pub fn logprob(&self, isent: &IntegerizedSentence) -> Result<f64> {
        Ok(self.forward(isent)?.log_z)
    }
}
