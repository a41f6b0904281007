//! Training workflow: corpus in, trained model out.

use std::path::Path;

use hmmtag_core::{HiddenMarkovModel, TrainConfig, TrainReport};
use tracing::info;

use crate::data::{CorpusOptions, TaggedCorpus};
use crate::eval::cross_entropy;
use crate::persist;

pub struct Trainer {
    model: HiddenMarkovModel,
    corpus: TaggedCorpus,
}

impl Trainer {
    /// Read the training files, build alphabets from them and initialize a
    /// fresh model with `seed`.
    pub fn new<P: AsRef<Path>>(
        train_paths: &[P],
        options: &CorpusOptions,
        unigram: bool,
        seed: u64,
    ) -> anyhow::Result<Self> {
        let corpus = TaggedCorpus::from_files(train_paths, options)?;
        Self::from_corpus(corpus, unigram, seed)
    }

    pub fn from_corpus(corpus: TaggedCorpus, unigram: bool, seed: u64) -> anyhow::Result<Self> {
        let model =
            HiddenMarkovModel::new(corpus.tagset().clone(), corpus.vocab().clone(), unigram, seed)?;
        info!(
            sentences = corpus.len(),
            tokens = corpus.num_tokens(),
            tags = model.k(),
            words = model.v(),
            unigram,
            "initialized model"
        );
        Ok(Self { model, corpus })
    }

    /// Continue training an existing model; the training files are read
    /// against its alphabets.
    pub fn with_model<P: AsRef<Path>>(
        model: HiddenMarkovModel,
        train_paths: &[P],
    ) -> anyhow::Result<Self> {
        let corpus =
            TaggedCorpus::with_alphabets(train_paths, model.tagset().clone(), model.vocab().clone())?;
        Ok(Self { model, corpus })
    }

    /// A dev corpus sharing this model's alphabets.
    pub fn load_dev<P: AsRef<Path>>(&self, paths: &[P]) -> anyhow::Result<TaggedCorpus> {
        TaggedCorpus::with_alphabets(
            paths,
            self.model.tagset().clone(),
            self.model.vocab().clone(),
        )
    }

    /// Run EM with early stopping on the cross-entropy of `dev`, or of the
    /// training corpus when no dev corpus is given.
    pub fn train(
        &mut self,
        dev: Option<&TaggedCorpus>,
        config: &TrainConfig,
    ) -> anyhow::Result<TrainReport> {
        let isents = self.corpus.integerize_all()?;
        let held_out = dev.unwrap_or(&self.corpus);
        let report = self
            .model
            .train(&isents, |m| cross_entropy(m, held_out), config)?;
        info!(
            epochs = report.epochs,
            initial_loss = report.initial_loss,
            final_loss = report.final_loss,
            stop = ?report.stop,
            skipped = report.skipped_sentences,
            "training finished"
        );
        Ok(report)
    }

    pub fn save_model<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        persist::save_model(&self.model, path.as_ref())
    }

    pub fn model(&self) -> &HiddenMarkovModel {
        &self.model
    }

    pub fn corpus(&self) -> &TaggedCorpus {
        &self.corpus
    }

    pub fn into_model(self) -> HiddenMarkovModel {
        self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Sentence;
    use hmmtag_core::StopReason;

    fn corpus(lines: &[&str]) -> TaggedCorpus {
        let sentences = lines.iter().map(|l| Sentence::parse(l).unwrap()).collect();
        TaggedCorpus::from_sentences(sentences, &CorpusOptions::new())
    }

    #[test]
    fn supervised_training_reaches_relative_frequencies() {
        let train = corpus(&["the/D dog/N runs/V", "the/D cat/N", "a/D dog/N sleeps/V"]);
        let mut trainer = Trainer::from_corpus(train, false, 1).unwrap();
        let report = trainer.train(None, &TrainConfig::new()).unwrap();
        assert_eq!(report.stop, StopReason::Converged);
        assert!(report.final_loss < report.initial_loss);

        let model = trainer.model();
        let tag = |s: &str| model.tagset().index(s).unwrap();
        let word = |s: &str| model.vocab().index(s).unwrap();
        let close = |x: f64, y: f64| (x - y).abs() < 1e-9;
        assert!(close(model.a().get(tag("D"), tag("N")), 1.0));
        assert!(close(model.a().get(tag("N"), tag("V")), 2.0 / 3.0));
        assert!(close(model.b().get(tag("N"), word("dog")), 2.0 / 3.0));
        assert!(close(model.b().get(tag("D"), word("the")), 2.0 / 3.0));
        model.check_invariants(1e-9).unwrap();
    }

    #[test]
    fn dev_corpus_shares_alphabets() {
        let train = corpus(&["the/D dog/N"]);
        let trainer = Trainer::from_corpus(train, false, 1).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dev.txt");
        std::fs::write(&path, "the/D zebra/N\n").unwrap();

        let dev = trainer.load_dev(&[&path]).unwrap();
        assert_eq!(dev.vocab(), trainer.model().vocab());
        let isent = dev.integerize(&dev.sentences()[0]).unwrap();
        assert_eq!(isent.word(2), dev.vocab().index(hmmtag_core::OOV_WORD).unwrap());
    }
}
