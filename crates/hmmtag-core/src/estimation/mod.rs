//! # Estimation
//!
//! Expected-count accumulation, the smoothed maximization step and the EM
//! training loop built on them.

pub mod counts;
pub mod expectation;
pub mod maximize;
pub mod train;

pub use counts::ExpectedCounts;
pub use train::{MIN_LAMBDA, StopReason, TrainConfig, TrainReport};
