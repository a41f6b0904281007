//! # Inference
//!
//! Log-space dynamic programs over a single sentence: the forward and
//! backward passes and Viterbi decoding.

pub mod backward;
pub mod forward;
pub mod logspace;
pub mod viterbi;

pub use backward::{BackwardTrellis, LOG_Z_TOLERANCE};
pub use forward::ForwardTrellis;
pub use viterbi::TaggedPath;
