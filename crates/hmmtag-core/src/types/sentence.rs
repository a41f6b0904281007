use serde::{Deserialize, Serialize};

/// The tag at one sentence position: supervised or to be inferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TagSlot {
    /// The tag id is given by the corpus.
    Known(usize),
    /// The tag is hidden and will be marginalized or decoded.
    Unknown,
}

impl TagSlot {
    /// The known tag id, if any.
    pub fn known(self) -> Option<usize> {
        match self {
            Self::Known(t) => Some(t),
            Self::Unknown => None,
        }
    }

    pub fn is_known(self) -> bool {
        matches!(self, Self::Known(_))
    }
}

impl From<Option<usize>> for TagSlot {
    fn from(tag: Option<usize>) -> Self {
        tag.map_or(Self::Unknown, Self::Known)
    }
}

/// One `(word, tag)` position of an integerized sentence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub word: usize,
    pub tag: TagSlot,
}

impl Position {
    pub fn new(word: usize, tag: TagSlot) -> Self {
        Self { word, tag }
    }
}

/// A sentence as dense ids, bracketed by BOS at position 0 and EOS at
/// position `n + 1`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct IntegerizedSentence {
    positions: Vec<Position>,
}

impl IntegerizedSentence {
    pub fn new(positions: Vec<Position>) -> Self {
        Self { positions }
    }

    /// Total length including both sentinels.
    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of ordinary words `n` between the sentinels.
    pub fn interior_len(&self) -> usize {
        self.positions.len().saturating_sub(2)
    }

    pub fn positions(&self) -> &[Position] {
        &self.positions
    }

    pub fn word(&self, j: usize) -> usize {
        self.positions[j].word
    }

    pub fn tag(&self, j: usize) -> TagSlot {
        self.positions[j].tag
    }

    /// Whether every interior position carries a known tag.
    pub fn is_fully_tagged(&self) -> bool {
        self.interior().iter().all(|p| p.tag.is_known())
    }

    /// All tags including sentinels, if every position is known.
    pub fn tags(&self) -> Option<Vec<usize>> {
        self.positions.iter().map(|p| p.tag.known()).collect()
    }

    /// Copy of the sentence with every interior tag made unknown.
    pub fn desupervised(&self) -> Self {
        let last = self.positions.len().saturating_sub(1);
        let positions = self
            .positions
            .iter()
            .enumerate()
            .map(|(j, p)| {
                if j == 0 || j == last {
                    *p
                } else {
                    Position::new(p.word, TagSlot::Unknown)
                }
            })
            .collect();
        Self { positions }
    }

    fn interior(&self) -> &[Position] {
        if self.positions.len() < 2 {
            return &[];
        }
        &self.positions[1..self.positions.len() - 1]
    }
}

impl FromIterator<Position> for IntegerizedSentence {
    fn from_iter<I: IntoIterator<Item = Position>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}
