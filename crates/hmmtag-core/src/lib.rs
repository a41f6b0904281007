//! # hmmtag Core
//!
//! The engine behind hmmtag: a first-order (optionally unigram) hidden Markov
//! model tagger with log-space forward-backward, add-λ smoothed EM with early
//! stopping, and Viterbi decoding. Sentences may be fully tagged, untagged,
//! or anything in between.
//!
//! ## Quick Start
//!
//! ```rust
//! use hmmtag_core::{
//!     BOS_TAG, BOS_WORD, EOS_TAG, EOS_WORD, HiddenMarkovModel, HmmError, IntegerizedSentence,
//!     Integerizer, Position, TagSlot, TrainConfig,
//! };
//!
//! let tagset: Integerizer<String> = ["N", "V", EOS_TAG, BOS_TAG].iter().map(|s| s.to_string()).collect();
//! let vocab: Integerizer<String> = ["dog", "runs", EOS_WORD, BOS_WORD].iter().map(|s| s.to_string()).collect();
//! let mut model = HiddenMarkovModel::new(tagset, vocab, false, 42).unwrap();
//!
//! // "dog/N runs/V", bracketed by the sentinels.
//! let sentence = IntegerizedSentence::new(vec![
//!     Position::new(model.bos_w(), TagSlot::Known(model.bos_t())),
//!     Position::new(0, TagSlot::Known(0)),
//!     Position::new(1, TagSlot::Known(1)),
//!     Position::new(model.eos_w(), TagSlot::Known(model.eos_t())),
//! ]);
//! let corpus = vec![sentence.clone()];
//!
//! let report = model
//!     .train(&corpus, |m| m.logprob(&sentence).map(|lp| -lp), &TrainConfig::new())
//!     .unwrap();
//! assert!(report.final_loss < report.initial_loss);
//!
//! let tagged = model.viterbi_tag(&sentence.desupervised()).unwrap();
//! assert_eq!(tagged.tags().unwrap()[1..3], [0, 1]);
//! # Ok::<(), HmmError>(())
//! ```
pub mod error;
pub mod estimation;
pub mod inference;
pub mod model;
pub mod types;

// Re-export primary API
pub use error::{HmmError, Result};
pub use estimation::{ExpectedCounts, MIN_LAMBDA, StopReason, TrainConfig, TrainReport};
pub use inference::{BackwardTrellis, ForwardTrellis, LOG_Z_TOLERANCE, TaggedPath};
pub use model::{HiddenMarkovModel, Matrix, ModelSnapshot, ParameterStore};
pub use types::{
    BOS_TAG, BOS_WORD, EOS_TAG, EOS_WORD, IntegerizedSentence, Integerizer, OOV_WORD, Position,
    TagSlot,
};
