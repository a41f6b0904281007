//! # Expectation Accumulator
//!
//! Folds one sentence's expected transition and emission counts into an
//! [`ExpectedCounts`] accumulator.
//!
//! A count is hard (exactly `mult`) where every endpoint it touches is known,
//! and posterior-weighted otherwise. Position 0 always carries BOS and the
//! last position always carries EOS, so boundary transitions follow the same
//! rule as interior ones.

use tracing::trace;

use crate::error::Result;
use crate::estimation::ExpectedCounts;
use crate::inference::logspace::exp_or_zero;
use crate::inference::{BackwardTrellis, ForwardTrellis};
use crate::model::HiddenMarkovModel;
use crate::types::{IntegerizedSentence, TagSlot};

impl HiddenMarkovModel {
    /// Fresh, zeroed accumulators shaped for this model.
    pub fn zero_counts(&self) -> ExpectedCounts {
        ExpectedCounts::new(self.k(), self.v())
    }

    /// Forward-backward on one sentence, adding its expected counts
    /// (weighted by `mult`) into `counts`. Returns `log Z`.
    pub fn e_step(
        &self,
        isent: &IntegerizedSentence,
        mult: f64,
        counts: &mut ExpectedCounts,
    ) -> Result<f64> {
        let trellis = self.forward(isent)?;
        self.backward(isent, &trellis, mult, counts)?;
        Ok(trellis.log_z())
    }

    pub(crate) fn accumulate(
        &self,
        forward: &ForwardTrellis,
        backward: &BackwardTrellis,
        mult: f64,
        counts: &mut ExpectedCounts,
    ) {
        let params = self.params();
        let log_a = params.log_a();
        let log_b = params.log_b();
        let isent = &forward.sentence;
        let allowed = &forward.allowed;
        let n = isent.interior_len();
        let last = n + 1;
        let scaled_log_z = forward.scaled_log_z();

        let known = |j: usize| -> Option<usize> {
            match j {
                0 => Some(params.bos_t()),
                j if j == last => Some(params.eos_t()),
                j => isent.tag(j).known(),
            }
        };

        // Emissions at interior positions.
        for j in 1..=n {
            let word = isent.word(j);
            match isent.tag(j) {
                TagSlot::Known(t) => counts.add_emission(t, word, mult),
                TagSlot::Unknown => {
                    for &t in &allowed[j] {
                        let log_post = forward.alpha[j][t] + backward.beta[j][t] - scaled_log_z;
                        counts.add_emission(t, word, mult * exp_or_zero(log_post));
                    }
                }
            }
        }

        // Transitions j -> j+1, including BOS -> first and last -> EOS.
        for j in 0..=n {
            if let (Some(s), Some(t)) = (known(j), known(j + 1)) {
                counts.add_transition(s, t, mult);
                continue;
            }
            let next = j + 1;
            let (emit_word, scale) = if next <= n {
                (Some(isent.word(next)), forward.scales[next])
            } else {
                (None, 0.0)
            };
            for &s in &allowed[j] {
                let from = forward.alpha[j][s];
                if from == f64::NEG_INFINITY {
                    continue;
                }
                for &t in &allowed[next] {
                    let emit = emit_word.map_or(0.0, |w| log_b.get(t, w));
                    let log_post = from + log_a.get(s, t) + emit + backward.beta[next][t]
                        - scaled_log_z
                        - scale;
                    counts.add_transition(s, t, mult * exp_or_zero(log_post));
                }
            }
        }

        counts.record_sentence(mult * forward.log_z());
        trace!(n, mult, "accumulated expected counts");
    }
}
