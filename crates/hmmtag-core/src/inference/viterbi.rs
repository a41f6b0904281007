//! # Viterbi Decoding
//!
//! Finds the most probable tag sequence for a sentence, keeping every tag the
//! sentence already fixes.

use tracing::debug;

use crate::error::{HmmError, Result};
use crate::model::HiddenMarkovModel;
use crate::types::{IntegerizedSentence, Position, TagSlot};

/// Best-scoring tagging of a sentence.
#[derive(Debug, Clone, PartialEq)]
pub struct TaggedPath {
    /// The input sentence with every position's tag known.
    pub sentence: IntegerizedSentence,
    /// Log-probability of the sentence jointly with this tagging.
    pub log_prob: f64,
}

/// Path score and backpointer for one `(position, tag)` cell.
#[derive(Debug, Clone, Copy)]
struct PathState {
    score: f64,
    prev_tag: Option<usize>,
}

impl PathState {
    const UNREACHABLE: Self = Self {
        score: f64::NEG_INFINITY,
        prev_tag: None,
    };
}

impl HiddenMarkovModel {
    /// Decode the highest-probability tag sequence.
    ///
    /// Cells whose transition or emission probability is zero are skipped
    /// outright rather than scored through `log(0)`.
    ///
    /// # Errors
    /// - [`HmmError::InvalidSentence`] for malformed input
    /// - [`HmmError::NoViablePath`] if no path reaches EOS with finite score
    pub fn viterbi(&self, isent: &IntegerizedSentence) -> Result<TaggedPath> {
        self.validate_sentence(isent)?;

        let params = self.params();
        let (a, b) = (params.a(), params.b());
        let (log_a, log_b) = (params.log_a(), params.log_b());
        let (bos_t, eos_t) = (params.bos_t(), params.eos_t());
        let len = isent.len();
        let last = len - 1;
        let allowed = self.allowed_tags(isent);

        let mut dp = vec![vec![PathState::UNREACHABLE; params.num_tags()]; len];
        dp[0][bos_t].score = 0.0;

        for pos in 1..len {
            let mut reachable = false;
            for &curr_tag in &allowed[pos] {
                // EOS emits nothing.
                let emission = if pos == last {
                    0.0
                } else {
                    let word = isent.word(pos);
                    if b.get(curr_tag, word) <= 0.0 {
                        continue;
                    }
                    log_b.get(curr_tag, word)
                };

                let mut best_score = f64::NEG_INFINITY;
                let mut best_prev = None;
                for &prev_tag in &allowed[pos - 1] {
                    let prev = dp[pos - 1][prev_tag].score;
                    if prev == f64::NEG_INFINITY || a.get(prev_tag, curr_tag) <= 0.0 {
                        continue;
                    }
                    let score = prev + log_a.get(prev_tag, curr_tag) + emission;
                    if score > best_score {
                        best_score = score;
                        best_prev = Some(prev_tag);
                    }
                }

                if best_prev.is_some() {
                    dp[pos][curr_tag] = PathState {
                        score: best_score,
                        prev_tag: best_prev,
                    };
                    reachable = true;
                }
            }
            if !reachable {
                debug!(position = pos, "no viable Viterbi path");
                return Err(HmmError::NoViablePath { position: pos });
            }
        }

        // Backtrack from EOS.
        let log_prob = dp[last][eos_t].score;
        let mut path = Vec::with_capacity(len);
        let mut curr_tag = eos_t;
        path.push(curr_tag);
        for pos in (1..len).rev() {
            curr_tag = dp[pos][curr_tag]
                .prev_tag
                .ok_or(HmmError::NoViablePath { position: pos })?;
            path.push(curr_tag);
        }
        path.reverse();

        let sentence = isent
            .positions()
            .iter()
            .zip(path)
            .map(|(p, t)| Position::new(p.word, TagSlot::Known(t)))
            .collect();
        debug!(n = isent.interior_len(), log_prob, "viterbi decode");
        Ok(TaggedPath { sentence, log_prob })
    }

    /// Fill in every unknown interior tag with its Viterbi assignment.
    pub fn viterbi_tag(&self, isent: &IntegerizedSentence) -> Result<IntegerizedSentence> {
        Ok(self.viterbi(isent)?.sentence)
    }
}
