pub mod integerizer;
pub mod sentence;

pub use integerizer::{BOS_TAG, BOS_WORD, EOS_TAG, EOS_WORD, Integerizer, OOV_WORD};
pub use sentence::{IntegerizedSentence, Position, TagSlot};
