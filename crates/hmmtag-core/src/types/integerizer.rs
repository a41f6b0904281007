use std::collections::HashMap;
use std::hash::Hash;

use serde::{Deserialize, Serialize};

/// Reserved word marking the start of a sentence.
pub const BOS_WORD: &str = "_BOS_WORD_";
/// Reserved word marking the end of a sentence.
pub const EOS_WORD: &str = "_EOS_WORD_";
/// Reserved tag of the start position.
pub const BOS_TAG: &str = "_BOS_TAG_";
/// Reserved tag of the end position.
pub const EOS_TAG: &str = "_EOS_TAG_";
/// Stand-in for words outside the vocabulary.
pub const OOV_WORD: &str = "_OOV_";

/// A bijection between symbols and dense integer ids `0..len`.
///
/// Ids are assigned in insertion order and never change. Serialized as the
/// plain symbol list; the reverse index is rebuilt on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(from = "Vec<T>", into = "Vec<T>")]
#[serde(bound(
    serialize = "T: Clone + Serialize",
    deserialize = "T: Eq + Hash + Clone + Deserialize<'de>"
))]
pub struct Integerizer<T: Eq + Hash + Clone> {
    symbols: Vec<T>,
    index: HashMap<T, usize>,
}

impl<T: Eq + Hash + Clone> Integerizer<T> {
    /// Create an empty integerizer.
    pub fn new() -> Self {
        Self {
            symbols: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a symbol if absent and return its id.
    pub fn add(&mut self, symbol: T) -> usize {
        if let Some(&id) = self.index.get(&symbol) {
            return id;
        }
        let id = self.symbols.len();
        self.index.insert(symbol.clone(), id);
        self.symbols.push(symbol);
        id
    }

    /// Id of `symbol`, if present.
    pub fn index<Q>(&self, symbol: &Q) -> Option<usize>
    where
        T: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.get(symbol).copied()
    }

    /// Symbol with the given id.
    pub fn get(&self, id: usize) -> Option<&T> {
        self.symbols.get(id)
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.symbols.iter()
    }

    /// The last two symbols, in order.
    pub fn last_two(&self) -> Option<(&T, &T)> {
        match self.symbols.as_slice() {
            [.., a, b] => Some((a, b)),
            _ => None,
        }
    }
}

impl<T: Eq + Hash + Clone> Default for Integerizer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for Integerizer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut integerizer = Self::new();
        for symbol in iter {
            integerizer.add(symbol);
        }
        integerizer
    }
}

impl<T: Eq + Hash + Clone> From<Vec<T>> for Integerizer<T> {
    fn from(symbols: Vec<T>) -> Self {
        symbols.into_iter().collect()
    }
}

impl<T: Eq + Hash + Clone> From<Integerizer<T>> for Vec<T> {
    fn from(integerizer: Integerizer<T>) -> Self {
        integerizer.symbols
    }
}

impl<T: Eq + Hash + Clone> PartialEq for Integerizer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.symbols == other.symbols
    }
}

impl<T: Eq + Hash + Clone> Eq for Integerizer<T> {}
