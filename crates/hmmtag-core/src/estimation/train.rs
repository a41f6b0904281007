//! # Training Loop
//!
//! Expectation-maximization with early stopping on an external loss.

use std::fmt::Display;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{HmmError, Result};
use crate::model::HiddenMarkovModel;
use crate::types::IntegerizedSentence;

/// Smoothing used in place of λ = 0 so that no row normalization divides
/// zero by zero.
pub const MIN_LAMBDA: f64 = 1e-20;

/// Configuration for [`HiddenMarkovModel::train`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrainConfig {
    /// Add-λ smoothing constant applied at every maximization step
    pub lambda: f64,
    /// Relative improvement the loss must make for training to continue
    pub tolerance: f64,
    /// Upper bound on the number of epochs
    pub max_epochs: usize,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            lambda: 0.0,
            tolerance: 0.001,
            max_epochs: 50,
        }
    }
}

impl TrainConfig {
    /// Create a training configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the smoothing constant.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = lambda;
        self
    }

    /// Set the early-stopping tolerance.
    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance.clamp(0.0, 1.0);
        self
    }

    /// Set the epoch budget.
    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }
}

/// Why training stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The loss failed to improve by the configured tolerance.
    Converged,
    /// `max_epochs` epochs ran without convergence.
    EpochBudget,
}

/// Summary of a finished training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainReport {
    pub epochs: usize,
    pub initial_loss: f64,
    pub final_loss: f64,
    pub stop: StopReason,
    /// Zero-probability sentences skipped, summed over all epochs.
    pub skipped_sentences: usize,
}

impl HiddenMarkovModel {
    /// Train on `corpus` by EM until `loss` stops improving or the epoch
    /// budget runs out. The model is updated in place and keeps the
    /// parameters of the last epoch run.
    ///
    /// `loss` is evaluated once before training and once after every
    /// maximization step; lower is better. Sentences with probability zero
    /// under the current parameters are skipped for that epoch.
    ///
    /// # Errors
    /// - [`HmmError::NegativeSmoothing`] for λ < 0
    /// - [`HmmError::EmptyCorpus`] if there is nothing to train on
    /// - [`HmmError::Loss`] if the loss callback fails
    /// - any per-epoch failure of the expectation or maximization step
    pub fn train<F, E>(
        &mut self,
        corpus: &[IntegerizedSentence],
        mut loss: F,
        config: &TrainConfig,
    ) -> Result<TrainReport>
    where
        F: FnMut(&HiddenMarkovModel) -> std::result::Result<f64, E>,
        E: Display,
    {
        if config.lambda.is_nan() || config.lambda < 0.0 {
            return Err(HmmError::NegativeSmoothing(config.lambda));
        }
        if corpus.is_empty() {
            return Err(HmmError::EmptyCorpus);
        }
        let lambda = if config.lambda == 0.0 {
            MIN_LAMBDA
        } else {
            config.lambda
        };

        let mut evaluate = |model: &HiddenMarkovModel| {
            loss(model).map_err(|e| HmmError::Loss(e.to_string()))
        };

        let initial_loss = evaluate(self)?;
        info!(loss = initial_loss, sentences = corpus.len(), "starting training");

        let mut counts = self.zero_counts();
        let mut previous = initial_loss;
        let mut skipped_sentences = 0;

        for epoch in 1..=config.max_epochs {
            counts.clear();
            for (i, isent) in corpus.iter().enumerate() {
                match self.e_step(isent, 1.0, &mut counts) {
                    Ok(_) => {}
                    Err(HmmError::ImpossibleSentence) => {
                        warn!(epoch, sentence = i, "skipping zero-probability sentence");
                        skipped_sentences += 1;
                    }
                    Err(e) => return Err(e),
                }
            }
            self.maximize(&counts, lambda)?;

            let current = evaluate(self)?;
            info!(
                epoch,
                loss = current,
                log_likelihood = counts.log_likelihood(),
                improvement = previous - current,
                "epoch complete"
            );

            if current >= previous * (1.0 - config.tolerance) {
                return Ok(TrainReport {
                    epochs: epoch,
                    initial_loss,
                    final_loss: current,
                    stop: StopReason::Converged,
                    skipped_sentences,
                });
            }
            previous = current;
        }

        info!(epochs = config.max_epochs, "epoch budget exhausted");
        Ok(TrainReport {
            epochs: config.max_epochs,
            initial_loss,
            final_loss: previous,
            stop: StopReason::EpochBudget,
            skipped_sentences,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Matrix;
    use crate::model::fixtures::*;
    use crate::types::{BOS_TAG, BOS_WORD, EOS_TAG, EOS_WORD};

    fn neg_log_likelihood(
        corpus: &[IntegerizedSentence],
    ) -> impl Fn(&HiddenMarkovModel) -> Result<f64> + '_ {
        move |model| {
            let mut total = 0.0;
            for s in corpus {
                total -= model.logprob(s)?;
            }
            Ok(total)
        }
    }

    #[test]
    fn config_builder_clamps_tolerance() {
        let config = TrainConfig::new()
            .with_lambda(0.5)
            .with_tolerance(7.0)
            .with_max_epochs(3);
        assert_eq!(config.lambda, 0.5);
        assert_eq!(config.tolerance, 1.0);
        assert_eq!(config.max_epochs, 3);
        assert_eq!(TrainConfig::new().with_tolerance(-1.0).tolerance, 0.0);
        assert_eq!(TrainConfig::default().max_epochs, 50);
    }

    #[test]
    fn rejects_empty_corpus_and_negative_lambda() {
        let mut model = ice_cream();
        let err = model
            .train(&[], |_| Ok::<_, HmmError>(0.0), &TrainConfig::new())
            .unwrap_err();
        assert!(matches!(err, HmmError::EmptyCorpus));

        let corpus = vec![untagged(&model, &[2])];
        let err = model
            .train(&corpus, |_| Ok::<_, HmmError>(0.0), &TrainConfig::new().with_lambda(-1.0))
            .unwrap_err();
        assert!(matches!(err, HmmError::NegativeSmoothing(_)));
    }

    #[test]
    fn supervised_training_converges_after_one_step() {
        let mut model = ice_cream();
        let corpus = vec![
            sentence(&model, &[(2, Some(0)), (2, Some(0)), (0, Some(1))]),
            sentence(&model, &[(0, Some(1)), (1, Some(0))]),
        ];
        let report = model
            .train(&corpus, neg_log_likelihood(&corpus), &TrainConfig::new())
            .unwrap();

        // Epoch 1 reaches the relative frequencies; epoch 2 cannot improve.
        assert_eq!(report.stop, StopReason::Converged);
        assert_eq!(report.epochs, 2);
        assert!(report.final_loss < report.initial_loss);

        let (h, c, eos, bos) = (0, 1, model.eos_t(), model.bos_t());
        let close = |x: f64, y: f64| (x - y).abs() < 1e-12;
        assert!(close(model.a().get(bos, h), 0.5));
        assert!(close(model.a().get(bos, c), 0.5));
        assert!(close(model.a().get(h, h), 1.0 / 3.0));
        assert!(close(model.a().get(h, c), 1.0 / 3.0));
        assert!(close(model.a().get(h, eos), 1.0 / 3.0));
        assert!(close(model.a().get(c, h), 0.5));
        assert!(close(model.a().get(c, eos), 0.5));
        assert!(close(model.b().get(h, 2), 2.0 / 3.0));
        assert!(close(model.b().get(h, 1), 1.0 / 3.0));
        assert!(close(model.b().get(c, 0), 1.0));
        model.check_invariants(1e-9).unwrap();
    }

    #[test]
    fn unsupervised_loss_never_increases() {
        let tagset = alphabet(&["H", "C", EOS_TAG, BOS_TAG]);
        let vocab = alphabet(&["1", "2", "3", EOS_WORD, BOS_WORD]);
        let mut model = HiddenMarkovModel::new(tagset, vocab, false, 2024).unwrap();
        let corpus = vec![
            untagged(&model, &[2, 2, 2, 0, 0, 1, 2, 0]),
            untagged(&model, &[0, 0, 1, 2, 2, 2]),
            untagged(&model, &[2, 1, 0, 0]),
        ];

        let mut history = Vec::new();
        let nll = neg_log_likelihood(&corpus);
        let config = TrainConfig::new().with_tolerance(0.0).with_max_epochs(8);
        let report = model
            .train(
                &corpus,
                |m| {
                    let loss = nll(m)?;
                    history.push(loss);
                    Ok::<_, HmmError>(loss)
                },
                &config,
            )
            .unwrap();

        assert!(report.epochs <= 8);
        for pair in history.windows(2) {
            assert!(pair[1] <= pair[0] + 1e-9, "{pair:?}");
        }
        let bos = model.bos_t();
        let eos = model.eos_t();
        assert_eq!(model.a().get(bos, bos), 0.0);
        assert!(model.a().row(eos).iter().all(|&p| p == 0.0));
        assert!(model.b().row(bos).iter().all(|&p| p == 0.0));
        assert!(model.b().row(eos).iter().all(|&p| p == 0.0));
        model.check_invariants(1e-5).unwrap();
    }

    #[test]
    fn zero_epoch_budget_leaves_model_untouched() {
        let mut model = ice_cream();
        let corpus = vec![untagged(&model, &[2, 0])];
        let report = model
            .train(&corpus, |_| Ok::<_, HmmError>(4.0), &TrainConfig::new().with_max_epochs(0))
            .unwrap();
        assert_eq!(report.stop, StopReason::EpochBudget);
        assert_eq!(report.epochs, 0);
        assert_eq!(report.final_loss, 4.0);
        assert_eq!(model.params().generation(), 0);
    }

    #[test]
    fn epoch_budget_stops_improving_run() {
        let mut model = ice_cream();
        let corpus = vec![untagged(&model, &[2, 0])];
        let mut next = 100.0;
        let report = model
            .train(
                &corpus,
                |_| {
                    next /= 2.0;
                    Ok::<_, HmmError>(next)
                },
                &TrainConfig::new().with_max_epochs(3),
            )
            .unwrap();
        assert_eq!(report.stop, StopReason::EpochBudget);
        assert_eq!(report.epochs, 3);
        assert_eq!(report.initial_loss, 50.0);
        assert_eq!(report.final_loss, 6.25);
    }

    #[test]
    fn worse_loss_stops_on_first_epoch() {
        let mut model = ice_cream();
        let corpus = vec![untagged(&model, &[2, 0])];
        let mut calls = 0.0;
        let report = model
            .train(
                &corpus,
                |_| {
                    calls += 1.0;
                    Ok::<_, HmmError>(calls)
                },
                &TrainConfig::new(),
            )
            .unwrap();
        assert_eq!(report.stop, StopReason::Converged);
        assert_eq!(report.epochs, 1);
    }

    #[test]
    fn loss_errors_abort_training() {
        let mut model = ice_cream();
        let corpus = vec![untagged(&model, &[2])];
        let err = model
            .train(&corpus, |_| Err("dev set missing"), &TrainConfig::new())
            .unwrap_err();
        assert!(matches!(err, HmmError::Loss(ref msg) if msg == "dev set missing"));
    }

    #[test]
    fn impossible_sentences_are_skipped() {
        let tagset = alphabet(&["N", "V", EOS_TAG, BOS_TAG]);
        let vocab = alphabet(&["dog", "runs", EOS_WORD, BOS_WORD]);
        let a = Matrix::from_rows(vec![
            vec![0.0, 0.5, 0.5, 0.0],
            vec![0.5, 0.0, 0.5, 0.0],
            vec![0.0, 0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0, 0.0],
        ])
        .unwrap();
        let b = Matrix::from_rows(vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
        ])
        .unwrap();
        let mut model = HiddenMarkovModel::with_parameters(tagset, vocab, false, a, b).unwrap();
        let corpus = vec![untagged(&model, &[0, 1]), untagged(&model, &[1, 0])];

        let report = model
            .train(&corpus, |_| Ok::<_, HmmError>(1.0), &TrainConfig::new())
            .unwrap();
        assert_eq!(report.epochs, 1);
        assert_eq!(report.skipped_sentences, 1);
        model.check_invariants(1e-9).unwrap();
    }

    #[test]
    fn all_impossible_corpus_fails_maximization() {
        let tagset = alphabet(&["N", EOS_TAG, BOS_TAG]);
        let vocab = alphabet(&["a", "b", EOS_WORD, BOS_WORD]);
        let a = Matrix::from_rows(vec![
            vec![0.5, 0.5, 0.0],
            vec![0.0, 0.0, 0.0],
            vec![1.0, 0.0, 0.0],
        ])
        .unwrap();
        let b = Matrix::from_rows(vec![vec![1.0, 0.0], vec![0.0, 0.0], vec![0.0, 0.0]]).unwrap();
        let mut model = HiddenMarkovModel::with_parameters(tagset, vocab, false, a, b).unwrap();
        let corpus = vec![untagged(&model, &[1])];
        let err = model
            .train(&corpus, |_| Ok::<_, HmmError>(1.0), &TrainConfig::new())
            .unwrap_err();
        assert!(matches!(err, HmmError::NoExpectedCounts));
    }
}
