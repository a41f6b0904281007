//! # Hidden Markov Model
//!
//! The model couples the tag and word alphabets with the [`ParameterStore`].
//! Inference lives in [`crate::inference`] and estimation in
//! [`crate::estimation`]; both extend [`HiddenMarkovModel`] with further
//! `impl` blocks.

pub mod matrix;
pub mod params;

use serde::{Deserialize, Serialize};

use crate::error::{HmmError, Result};
use crate::types::{
    BOS_TAG, BOS_WORD, EOS_TAG, EOS_WORD, IntegerizedSentence, Integerizer, TagSlot,
};

pub use matrix::Matrix;
pub use params::ParameterStore;

/// A first-order (or, in unigram mode, zeroth-order) HMM tagger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "ModelSnapshot", into = "ModelSnapshot")]
pub struct HiddenMarkovModel {
    tagset: Integerizer<String>,
    vocab: Integerizer<String>,
    params: ParameterStore,
}

/// Serialized form of a model: alphabets plus probabilities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub tagset: Integerizer<String>,
    pub vocab: Integerizer<String>,
    pub unigram: bool,
    pub transition: Matrix,
    pub emission: Matrix,
}

impl HiddenMarkovModel {
    /// Create a model with small random parameters.
    ///
    /// # Errors
    /// - [`HmmError::InvalidVocabulary`] unless the vocab ends with
    ///   `[EOS_WORD, BOS_WORD]`
    /// - [`HmmError::MissingSentinelTag`] if the tagset lacks BOS or EOS
    pub fn new(
        tagset: Integerizer<String>,
        vocab: Integerizer<String>,
        unigram: bool,
        seed: u64,
    ) -> Result<Self> {
        let (bos_t, eos_t) = check_alphabets(&tagset, &vocab)?;
        let params = ParameterStore::random(
            tagset.len(),
            vocab.len() - 2,
            bos_t,
            eos_t,
            unigram,
            seed,
        );
        Ok(Self {
            tagset,
            vocab,
            params,
        })
    }

    /// Create a model from explicit transition (k×k) and emission (k×V)
    /// matrices. Structural zeros are imposed, then row sums validated.
    pub fn with_parameters(
        tagset: Integerizer<String>,
        vocab: Integerizer<String>,
        unigram: bool,
        transition: Matrix,
        emission: Matrix,
    ) -> Result<Self> {
        let (bos_t, eos_t) = check_alphabets(&tagset, &vocab)?;
        let (k, v) = (tagset.len(), vocab.len() - 2);
        if transition.shape() != (k, k) {
            return Err(HmmError::ShapeMismatch {
                what: "transition matrix",
                expected: (k, k),
                actual: transition.shape(),
            });
        }
        if emission.shape() != (k, v) {
            return Err(HmmError::ShapeMismatch {
                what: "emission matrix",
                expected: (k, v),
                actual: emission.shape(),
            });
        }
        let params = ParameterStore::from_matrices(transition, emission, bos_t, eos_t, unigram)?;
        Ok(Self {
            tagset,
            vocab,
            params,
        })
    }

    pub fn tagset(&self) -> &Integerizer<String> {
        &self.tagset
    }

    pub fn vocab(&self) -> &Integerizer<String> {
        &self.vocab
    }

    pub fn params(&self) -> &ParameterStore {
        &self.params
    }

    pub(crate) fn params_mut(&mut self) -> &mut ParameterStore {
        &mut self.params
    }

    /// Transition matrix `A`, read-only.
    pub fn a(&self) -> &Matrix {
        self.params.a()
    }

    /// Emission matrix `B`, read-only.
    pub fn b(&self) -> &Matrix {
        self.params.b()
    }

    /// Number of tags `k`, sentinels included.
    pub fn k(&self) -> usize {
        self.params.num_tags()
    }

    /// Number of emittable words `V`, sentinels excluded.
    pub fn v(&self) -> usize {
        self.params.num_words()
    }

    pub fn bos_t(&self) -> usize {
        self.params.bos_t()
    }

    pub fn eos_t(&self) -> usize {
        self.params.eos_t()
    }

    /// Word id of `BOS_WORD` (always `V + 1`).
    pub fn bos_w(&self) -> usize {
        self.v() + 1
    }

    /// Word id of `EOS_WORD` (always `V`).
    pub fn eos_w(&self) -> usize {
        self.v()
    }

    pub fn is_unigram(&self) -> bool {
        self.params.is_unigram()
    }

    pub fn check_invariants(&self, tolerance: f64) -> Result<()> {
        self.params.check_invariants(tolerance)
    }

    /// Check that `isent` is bracketed by the sentinels and that every
    /// interior word and known tag is in range.
    pub fn validate_sentence(&self, isent: &IntegerizedSentence) -> Result<()> {
        let len = isent.len();
        if len < 2 {
            return Err(HmmError::InvalidSentence {
                position: 0,
                reason: format!("length {len} cannot hold BOS and EOS"),
            });
        }

        let boundary = |j: usize, word: usize, tag: usize, name: &str| -> Result<()> {
            let p = isent.positions()[j];
            if p.word != word {
                return Err(HmmError::InvalidSentence {
                    position: j,
                    reason: format!("expected {name} word {word}, found {}", p.word),
                });
            }
            match p.tag {
                TagSlot::Known(t) if t != tag => Err(HmmError::InvalidSentence {
                    position: j,
                    reason: format!("expected {name} tag {tag}, found {t}"),
                }),
                _ => Ok(()),
            }
        };
        boundary(0, self.bos_w(), self.bos_t(), "BOS")?;
        boundary(len - 1, self.eos_w(), self.eos_t(), "EOS")?;

        for j in 1..len - 1 {
            let p = isent.positions()[j];
            if p.word >= self.v() {
                return Err(HmmError::InvalidSentence {
                    position: j,
                    reason: format!("word id {} is not an emittable word (V = {})", p.word, self.v()),
                });
            }
            if let TagSlot::Known(t) = p.tag {
                if t >= self.k() || !self.params.is_ordinary(t) {
                    return Err(HmmError::InvalidSentence {
                        position: j,
                        reason: format!("tag id {t} is not an ordinary tag"),
                    });
                }
            }
        }
        Ok(())
    }

    /// Tags admissible at every position: the sentinel at each end, the
    /// known tag where supervised, every ordinary tag elsewhere.
    pub(crate) fn allowed_tags(&self, isent: &IntegerizedSentence) -> Vec<Vec<usize>> {
        let last = isent.len() - 1;
        let ordinary: Vec<usize> = self.params.ordinary_tags().collect();
        (0..isent.len())
            .map(|j| match (j, isent.tag(j)) {
                (0, _) => vec![self.bos_t()],
                (j, _) if j == last => vec![self.eos_t()],
                (_, TagSlot::Known(t)) => vec![t],
                (_, TagSlot::Unknown) => ordinary.clone(),
            })
            .collect()
    }

    /// Persistable copy of the alphabets and parameters.
    pub fn snapshot(&self) -> ModelSnapshot {
        self.clone().into()
    }
}

impl From<HiddenMarkovModel> for ModelSnapshot {
    fn from(model: HiddenMarkovModel) -> Self {
        Self {
            unigram: model.params.is_unigram(),
            transition: model.params.a().clone(),
            emission: model.params.b().clone(),
            tagset: model.tagset,
            vocab: model.vocab,
        }
    }
}

impl TryFrom<ModelSnapshot> for HiddenMarkovModel {
    type Error = HmmError;

    fn try_from(snapshot: ModelSnapshot) -> Result<Self> {
        Self::with_parameters(
            snapshot.tagset,
            snapshot.vocab,
            snapshot.unigram,
            snapshot.transition,
            snapshot.emission,
        )
    }
}

/// Validate the sentinel layout and return `(bos_t, eos_t)`.
fn check_alphabets(
    tagset: &Integerizer<String>,
    vocab: &Integerizer<String>,
) -> Result<(usize, usize)> {
    let ends_with_sentinels = vocab
        .last_two()
        .is_some_and(|(eos, bos)| eos == EOS_WORD && bos == BOS_WORD);
    if !ends_with_sentinels {
        return Err(HmmError::InvalidVocabulary {
            eos: EOS_WORD,
            bos: BOS_WORD,
        });
    }
    let bos_t = tagset
        .index(BOS_TAG)
        .ok_or(HmmError::MissingSentinelTag(BOS_TAG))?;
    let eos_t = tagset
        .index(EOS_TAG)
        .ok_or(HmmError::MissingSentinelTag(EOS_TAG))?;
    Ok((bos_t, eos_t))
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::types::Position;

    #[test]
    fn construction_requires_vocab_sentinels_in_order() {
        let tagset = alphabet(&["N", EOS_TAG, BOS_TAG]);

        let swapped = alphabet(&["a", BOS_WORD, EOS_WORD]);
        let err = HiddenMarkovModel::new(tagset.clone(), swapped, false, 0).unwrap_err();
        assert!(matches!(err, HmmError::InvalidVocabulary { .. }));

        let missing = alphabet(&["a", "b"]);
        assert!(HiddenMarkovModel::new(tagset.clone(), missing, false, 0).is_err());

        let ok = alphabet(&["a", EOS_WORD, BOS_WORD]);
        let model = HiddenMarkovModel::new(tagset, ok, false, 0).unwrap();
        assert_eq!(model.v(), 1);
        assert_eq!(model.eos_w(), 1);
        assert_eq!(model.bos_w(), 2);
    }

    #[test]
    fn construction_requires_sentinel_tags() {
        let vocab = alphabet(&["a", EOS_WORD, BOS_WORD]);
        let err = HiddenMarkovModel::new(alphabet(&["N", EOS_TAG]), vocab.clone(), false, 0)
            .unwrap_err();
        assert!(matches!(err, HmmError::MissingSentinelTag(BOS_TAG)));

        let err = HiddenMarkovModel::new(alphabet(&["N", BOS_TAG]), vocab, false, 0).unwrap_err();
        assert!(matches!(err, HmmError::MissingSentinelTag(EOS_TAG)));
    }

    #[test]
    fn sentinel_tags_need_not_be_last() {
        let tagset = alphabet(&[BOS_TAG, "N", EOS_TAG, "V"]);
        let vocab = alphabet(&["a", "b", EOS_WORD, BOS_WORD]);
        let model = HiddenMarkovModel::new(tagset, vocab, false, 3).unwrap();
        assert_eq!(model.bos_t(), 0);
        assert_eq!(model.eos_t(), 2);
        model.check_invariants(1e-9).unwrap();
    }

    #[test]
    fn validate_sentence_rejects_bad_layout() {
        let model = ice_cream();
        assert!(model.validate_sentence(&untagged(&model, &[2, 0, 2])).is_ok());

        let too_short = IntegerizedSentence::new(vec![Position::new(model.bos_w(), TagSlot::Unknown)]);
        assert!(model.validate_sentence(&too_short).is_err());

        let bos_inside = untagged(&model, &[model.bos_w()]);
        let err = model.validate_sentence(&bos_inside).unwrap_err();
        assert!(matches!(err, HmmError::InvalidSentence { position: 1, .. }));

        let sentinel_tag = sentence(&model, &[(0, Some(model.eos_t()))]);
        assert!(model.validate_sentence(&sentinel_tag).is_err());

        let mut positions = untagged(&model, &[0]).positions().to_vec();
        positions[0] = Position::new(model.eos_w(), TagSlot::Unknown);
        assert!(model.validate_sentence(&IntegerizedSentence::new(positions)).is_err());
    }

    #[test]
    fn allowed_tags_follow_supervision() {
        let model = ice_cream();
        let s = sentence(&model, &[(2, Some(0)), (0, None)]);
        let allowed = model.allowed_tags(&s);
        assert_eq!(allowed[0], vec![model.bos_t()]);
        assert_eq!(allowed[1], vec![0]);
        assert_eq!(allowed[2], vec![0, 1]);
        assert_eq!(allowed[3], vec![model.eos_t()]);
    }

    #[test]
    fn serde_roundtrip_revalidates() {
        let model = ice_cream();
        let json = serde_json::to_string(&model).unwrap();
        let back: HiddenMarkovModel = serde_json::from_str(&json).unwrap();
        assert_eq!(back.a(), model.a());
        assert_eq!(back.b(), model.b());
        assert_eq!(back.tagset(), model.tagset());

        let mut snapshot = model.snapshot();
        snapshot.transition.set(0, 0, 0.9);
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(serde_json::from_str::<HiddenMarkovModel>(&json).is_err());
    }
}
