use thiserror::Error;

/// Errors that can occur during hmmtag core operations.
#[derive(Debug, Error)]
pub enum HmmError {
    /// The word alphabet does not end with the EOS and BOS sentinel words.
    #[error("final two types of vocab should be {eos:?}, {bos:?}")]
    InvalidVocabulary {
        /// Expected second-to-last entry.
        eos: &'static str,
        /// Expected last entry.
        bos: &'static str,
    },

    /// The tag alphabet lacks one of the sentinel tags.
    #[error("tagset should contain both BOS and EOS tags (missing {0:?})")]
    MissingSentinelTag(&'static str),

    /// A sentence does not fit the model's alphabets or sentinel layout.
    #[error("invalid sentence at position {position}: {reason}")]
    InvalidSentence {
        /// Offending position (0 is BOS).
        position: usize,
        /// Human readable description.
        reason: String,
    },

    /// Add-λ smoothing was requested with a negative constant.
    #[error("smoothing constant must be non-negative, got {0}")]
    NegativeSmoothing(f64),

    /// The maximization step was invoked before any expectation pass.
    #[error("no expected counts accumulated; run an expectation pass first")]
    NoExpectedCounts,

    /// A matrix or count table does not have the shape the model expects.
    #[error("{what} shape mismatch: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        /// Which table was mismatched.
        what: &'static str,
        /// Expected `(rows, cols)`.
        expected: (usize, usize),
        /// Actual `(rows, cols)`.
        actual: (usize, usize),
    },

    /// The backward pass was handed a trellis built for another sentence.
    #[error("backward pass requires a forward pass over the same sentence")]
    TrellisMismatch,

    /// The parameters changed between the forward and the backward pass.
    #[error("forward trellis is stale: computed at generation {trellis}, model is at {model}")]
    StaleTrellis {
        /// Generation recorded by the forward pass.
        trellis: u64,
        /// Current generation of the parameters.
        model: u64,
    },

    /// Forward and backward passes disagree on the sentence probability.
    #[error("log Z mismatch: forward {forward}, backward {backward}")]
    LogZMismatch {
        /// log Z from the forward pass.
        forward: f64,
        /// log Z re-derived by the backward pass.
        backward: f64,
    },

    /// The sentence has probability zero under the current parameters.
    #[error("sentence has zero probability under the current model")]
    ImpossibleSentence,

    /// No tag sequence reaches EOS with finite score.
    #[error("no viable tag path (blocked at position {position})")]
    NoViablePath {
        /// First position at which every cell was unreachable.
        position: usize,
    },

    /// Training was asked to run over an empty corpus.
    #[error("training corpus is empty")]
    EmptyCorpus,

    /// Explicit parameters violate a structural invariant.
    #[error("invalid parameters: {0}")]
    InvalidParameters(String),

    /// The external loss callback failed.
    #[error("loss evaluation failed: {0}")]
    Loss(String),
}

/// Result type alias for hmmtag operations.
pub type Result<T> = std::result::Result<T, HmmError>;
