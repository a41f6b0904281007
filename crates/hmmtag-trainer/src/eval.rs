//! Loss functions over a corpus, usable as the early-stopping loss of
//! [`HiddenMarkovModel::train`].

use std::collections::HashSet;
use std::fmt;

use hmmtag_core::{HiddenMarkovModel, HmmError};
use tracing::{info, warn};

use crate::data::TaggedCorpus;

/// Per-token cross-entropy of `corpus` in nats.
///
/// Each sentence contributes its word tokens plus EOS (BOS is given, not
/// predicted). Unsupervised tokens are marginalized over.
pub fn cross_entropy(model: &HiddenMarkovModel, corpus: &TaggedCorpus) -> anyhow::Result<f64> {
    let mut log_prob = 0.0;
    let mut tokens = 0usize;
    for sentence in corpus.sentences() {
        let isent = corpus.integerize(sentence)?;
        log_prob += model.logprob(&isent)?;
        tokens += sentence.len() + 1;
    }
    if tokens == 0 {
        anyhow::bail!("cannot compute cross-entropy of an empty corpus");
    }
    let cross_entropy = -log_prob / tokens as f64;
    info!(
        cross_entropy,
        perplexity = cross_entropy.exp(),
        tokens,
        "cross-entropy"
    );
    Ok(cross_entropy)
}

/// Correct / total counts for one class of tokens.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub correct: usize,
    pub total: usize,
}

impl Tally {
    fn record(&mut self, correct: bool) {
        self.total += 1;
        if correct {
            self.correct += 1;
        }
    }

    /// Fraction correct, or `None` if no token was counted.
    pub fn accuracy(&self) -> Option<f64> {
        (self.total > 0).then(|| self.correct as f64 / self.total as f64)
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.accuracy() {
            Some(acc) => write!(f, "{:.3}%", acc * 100.0),
            None => f.write_str("n/a"),
        }
    }
}

/// Viterbi tagging accuracy, split by whether the word was seen with a tag
/// in the supervised training data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TaggingAccuracy {
    pub all: Tally,
    pub known: Tally,
    pub novel: Tally,
}

impl fmt::Display for TaggingAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "all: {}, known: {}, novel: {}",
            self.all, self.known, self.novel
        )
    }
}

/// Tag each sentence with its tags removed and score against the gold tags.
///
/// Only gold-tagged tokens are scored. A sentence with no viable path counts
/// every one of its scored tokens as wrong.
pub fn tagging_accuracy(
    model: &HiddenMarkovModel,
    corpus: &TaggedCorpus,
    known_vocab: &HashSet<String>,
) -> anyhow::Result<TaggingAccuracy> {
    let mut accuracy = TaggingAccuracy::default();
    for (i, sentence) in corpus.sentences().iter().enumerate() {
        let gold = corpus.integerize(sentence)?;
        let predicted = match model.viterbi_tag(&gold.desupervised()) {
            Ok(tagged) => Some(tagged),
            Err(HmmError::NoViablePath { position }) => {
                warn!(sentence = i, position, "no viable tagging; scoring as errors");
                None
            }
            Err(e) => return Err(e.into()),
        };

        for (j, token) in sentence.tokens().iter().enumerate() {
            let Some(gold_tag) = gold.tag(j + 1).known() else {
                continue;
            };
            let correct = predicted
                .as_ref()
                .is_some_and(|p| p.tag(j + 1).known() == Some(gold_tag));
            accuracy.all.record(correct);
            if known_vocab.contains(&token.word) {
                accuracy.known.record(correct);
            } else {
                accuracy.novel.record(correct);
            }
        }
    }
    info!("tagging accuracy: {accuracy}");
    Ok(accuracy)
}

/// `1 - accuracy` over every gold-tagged token.
pub fn viterbi_error_rate(
    model: &HiddenMarkovModel,
    corpus: &TaggedCorpus,
    known_vocab: &HashSet<String>,
) -> anyhow::Result<f64> {
    let accuracy = tagging_accuracy(model, corpus, known_vocab)?;
    Ok(1.0 - accuracy.all.accuracy().unwrap_or(0.0))
}
