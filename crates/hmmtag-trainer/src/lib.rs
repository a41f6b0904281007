//! # hmmtag Trainer
//!
//! Everything around the core engine that touches the outside world: corpus
//! files and their alphabets, evaluation losses, model persistence,
//! diagnostic printing, and the training workflow behind the `hmmtag` CLI.

pub mod data;
pub mod display;
pub mod eval;
pub mod persist;
pub mod trainer;

pub use data::{CorpusOptions, Sentence, TaggedCorpus, Token, read_corpus_file};
pub use display::{format_parameters, write_tagging};
pub use eval::{Tally, TaggingAccuracy, cross_entropy, tagging_accuracy, viterbi_error_rate};
pub use persist::{load_model, save_model};
pub use trainer::Trainer;
