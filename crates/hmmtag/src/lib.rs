//! # hmmtag
//!
//! Hidden Markov model tagging: the inference and estimation engine from
//! [`hmmtag_core`] together with corpus handling, evaluation and persistence
//! from [`hmmtag_trainer`].
//!
//! ```rust
//! use hmmtag::{CorpusOptions, Sentence, TaggedCorpus, TrainConfig, Trainer};
//!
//! let sentences = ["the/D dog/N runs/V", "a/D cat/N sleeps/V"]
//!     .iter()
//!     .map(|line| Sentence::parse(line))
//!     .collect::<anyhow::Result<Vec<_>>>()?;
//! let corpus = TaggedCorpus::from_sentences(sentences, &CorpusOptions::new());
//!
//! let mut trainer = Trainer::from_corpus(corpus, false, 42)?;
//! trainer.train(None, &TrainConfig::new())?;
//!
//! let raw = Sentence::parse("the cat runs")?;
//! let isent = trainer.corpus().integerize(&raw)?;
//! let tags = trainer.model().viterbi_tag(&isent)?.tags().unwrap_or_default();
//! assert_eq!(tags.len(), 5);
//! # Ok::<(), anyhow::Error>(())
//! ```

pub use hmmtag_core::*;
pub use hmmtag_trainer::*;
