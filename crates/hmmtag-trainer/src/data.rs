//! Corpus loading and integerization.
//!
//! Corpus files hold one sentence per line. Tokens are separated by
//! whitespace and are either `word/tag` (supervised) or a bare `word`. The
//! split happens at the last `/`, so words may themselves contain slashes.
//! Blank lines and lines starting with `#` are skipped.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use hmmtag_core::{
    BOS_TAG, BOS_WORD, EOS_TAG, EOS_WORD, IntegerizedSentence, Integerizer, OOV_WORD, Position,
    TagSlot,
};
use tracing::{debug, info};

/// One corpus token: a word and, if supervised, its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub word: String,
    pub tag: Option<String>,
}

impl Token {
    pub fn new(word: impl Into<String>, tag: Option<String>) -> Self {
        Self {
            word: word.into(),
            tag,
        }
    }

    /// Parse `word/tag` or `word`.
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let token = match raw.rsplit_once('/') {
            Some((word, tag)) if !tag.is_empty() => Self::new(word, Some(tag.to_string())),
            _ => Self::new(raw, None),
        };
        if token.word.is_empty() {
            bail!("token {raw:?} has an empty word");
        }
        Ok(token)
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.tag {
            Some(tag) => write!(f, "{}/{}", self.word, tag),
            None => f.write_str(&self.word),
        }
    }
}

/// A sentence of tokens, without sentinels.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sentence {
    tokens: Vec<Token>,
}

impl Sentence {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens }
    }

    /// Parse one corpus line.
    pub fn parse(line: &str) -> anyhow::Result<Self> {
        line.split_whitespace()
            .map(Token::parse)
            .collect::<anyhow::Result<Vec<_>>>()
            .map(Self::new)
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Copy of the sentence with every tag removed.
    pub fn desupervise(&self) -> Self {
        self.tokens
            .iter()
            .map(|t| Token::new(t.word.clone(), None))
            .collect::<Vec<_>>()
            .into()
    }

    pub fn is_supervised(&self) -> bool {
        self.tokens.iter().all(|t| t.tag.is_some())
    }
}

impl From<Vec<Token>> for Sentence {
    fn from(tokens: Vec<Token>) -> Self {
        Self::new(tokens)
    }
}

impl fmt::Display for Sentence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, token) in self.tokens.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{token}")?;
        }
        Ok(())
    }
}

/// Vocabulary construction options.
#[derive(Debug, Clone)]
pub struct CorpusOptions {
    /// Words seen fewer times than this are folded into `_OOV_`.
    pub oov_threshold: usize,
    /// Whether to reserve an `_OOV_` entry in the vocabulary.
    pub add_oov: bool,
}

impl Default for CorpusOptions {
    fn default() -> Self {
        Self {
            oov_threshold: 1,
            add_oov: true,
        }
    }
}

impl CorpusOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_oov_threshold(mut self, threshold: usize) -> Self {
        self.oov_threshold = threshold;
        self
    }

    pub fn with_oov(mut self, enabled: bool) -> Self {
        self.add_oov = enabled;
        self
    }
}

/// Sentences read from one or more files, together with the tag and word
/// alphabets used to integerize them.
#[derive(Debug, Clone)]
pub struct TaggedCorpus {
    files: Vec<PathBuf>,
    sentences: Vec<Sentence>,
    tagset: Integerizer<String>,
    vocab: Integerizer<String>,
}

impl TaggedCorpus {
    /// Read `paths` and build fresh alphabets from them.
    ///
    /// Vocabulary order: words meeting the OOV threshold in first-seen order,
    /// then `_OOV_` (if enabled), `_EOS_WORD_`, `_BOS_WORD_`. Tagset order:
    /// tags in first-seen order, then `_EOS_TAG_`, `_BOS_TAG_`.
    pub fn from_files<P: AsRef<Path>>(paths: &[P], options: &CorpusOptions) -> anyhow::Result<Self> {
        let (files, sentences) = read_files(paths)?;
        let (tagset, vocab) = build_alphabets(&sentences, options);
        info!(
            sentences = sentences.len(),
            tags = tagset.len(),
            words = vocab.len(),
            "built alphabets from corpus"
        );
        Ok(Self {
            files,
            sentences,
            tagset,
            vocab,
        })
    }

    /// Read `paths` against existing alphabets, as for dev and test data
    /// that must share the training model's ids.
    pub fn with_alphabets<P: AsRef<Path>>(
        paths: &[P],
        tagset: Integerizer<String>,
        vocab: Integerizer<String>,
    ) -> anyhow::Result<Self> {
        let (files, sentences) = read_files(paths)?;
        Ok(Self {
            files,
            ..Self::with_sentences(sentences, tagset, vocab)
        })
    }

    /// In-memory corpus over existing alphabets.
    pub fn with_sentences(
        sentences: Vec<Sentence>,
        tagset: Integerizer<String>,
        vocab: Integerizer<String>,
    ) -> Self {
        Self {
            files: Vec::new(),
            sentences,
            tagset,
            vocab,
        }
    }

    /// In-memory corpus with fresh alphabets.
    pub fn from_sentences(sentences: Vec<Sentence>, options: &CorpusOptions) -> Self {
        let (tagset, vocab) = build_alphabets(&sentences, options);
        Self::with_sentences(sentences, tagset, vocab)
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn sentences(&self) -> &[Sentence] {
        &self.sentences
    }

    pub fn len(&self) -> usize {
        self.sentences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sentences.is_empty()
    }

    pub fn tagset(&self) -> &Integerizer<String> {
        &self.tagset
    }

    pub fn vocab(&self) -> &Integerizer<String> {
        &self.vocab
    }

    /// Total number of word tokens.
    pub fn num_tokens(&self) -> usize {
        self.sentences.iter().map(Sentence::len).sum()
    }

    /// Words that occur with a tag somewhere in the corpus.
    pub fn supervised_words(&self) -> HashSet<String> {
        self.sentences
            .iter()
            .flat_map(Sentence::tokens)
            .filter(|t| t.tag.is_some())
            .map(|t| t.word.clone())
            .collect()
    }

    /// Convert a sentence to ids, bracketed by the BOS and EOS sentinels.
    /// Unknown words map to `_OOV_`; an unknown tag is an error.
    pub fn integerize(&self, sentence: &Sentence) -> anyhow::Result<IntegerizedSentence> {
        let sentinel = |alphabet: &Integerizer<String>, symbol: &str| {
            alphabet
                .index(symbol)
                .with_context(|| format!("alphabet lacks the {symbol} sentinel"))
        };
        let bos = Position::new(
            sentinel(&self.vocab, BOS_WORD)?,
            TagSlot::Known(sentinel(&self.tagset, BOS_TAG)?),
        );
        let eos = Position::new(
            sentinel(&self.vocab, EOS_WORD)?,
            TagSlot::Known(sentinel(&self.tagset, EOS_TAG)?),
        );
        let oov = self.vocab.index(OOV_WORD);

        let mut positions = Vec::with_capacity(sentence.len() + 2);
        positions.push(bos);
        for token in sentence.tokens() {
            let word = match self.vocab.index(token.word.as_str()).or(oov) {
                Some(w) => w,
                None => bail!("word {:?} is not in the vocabulary and there is no {OOV_WORD}", token.word),
            };
            let tag = match &token.tag {
                Some(tag) => match self.tagset.index(tag.as_str()) {
                    Some(t) => TagSlot::Known(t),
                    None => bail!("tag {tag:?} is not in the tagset"),
                },
                None => TagSlot::Unknown,
            };
            positions.push(Position::new(word, tag));
        }
        positions.push(eos);
        Ok(IntegerizedSentence::new(positions))
    }

    /// Integerize every sentence.
    pub fn integerize_all(&self) -> anyhow::Result<Vec<IntegerizedSentence>> {
        self.sentences
            .iter()
            .enumerate()
            .map(|(i, s)| {
                self.integerize(s)
                    .with_context(|| format!("integerizing sentence {i}"))
            })
            .collect()
    }
}

fn read_files<P: AsRef<Path>>(paths: &[P]) -> anyhow::Result<(Vec<PathBuf>, Vec<Sentence>)> {
    let mut files = Vec::with_capacity(paths.len());
    let mut sentences = Vec::new();
    for path in paths {
        let path = path.as_ref();
        let loaded = read_corpus_file(path)?;
        debug!(path = %path.display(), sentences = loaded.len(), "read corpus file");
        sentences.extend(loaded);
        files.push(path.to_path_buf());
    }
    Ok((files, sentences))
}

/// Read one corpus file.
pub fn read_corpus_file(path: &Path) -> anyhow::Result<Vec<Sentence>> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut sentences = Vec::new();
    for (n, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("reading {}", path.display()))?;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let sentence = Sentence::parse(line)
            .with_context(|| format!("{}:{}", path.display(), n + 1))?;
        sentences.push(sentence);
    }
    Ok(sentences)
}

fn build_alphabets(
    sentences: &[Sentence],
    options: &CorpusOptions,
) -> (Integerizer<String>, Integerizer<String>) {
    let mut word_counts: HashMap<&str, usize> = HashMap::new();
    let mut seen_words: Integerizer<String> = Integerizer::new();
    let mut tagset: Integerizer<String> = Integerizer::new();
    for token in sentences.iter().flat_map(Sentence::tokens) {
        *word_counts.entry(token.word.as_str()).or_default() += 1;
        seen_words.add(token.word.clone());
        if let Some(tag) = &token.tag {
            tagset.add(tag.clone());
        }
    }
    tagset.add(EOS_TAG.to_string());
    tagset.add(BOS_TAG.to_string());

    let mut vocab: Integerizer<String> = seen_words
        .iter()
        .filter(|w| word_counts.get(w.as_str()).copied().unwrap_or(0) >= options.oov_threshold)
        .cloned()
        .collect();
    if options.add_oov {
        vocab.add(OOV_WORD.to_string());
    }
    vocab.add(EOS_WORD.to_string());
    vocab.add(BOS_WORD.to_string());
    (tagset, vocab)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn corpus(lines: &[&str], options: &CorpusOptions) -> TaggedCorpus {
        let sentences = lines.iter().map(|l| Sentence::parse(l).unwrap()).collect();
        TaggedCorpus::from_sentences(sentences, options)
    }

    #[test]
    fn token_splits_on_last_slash() {
        assert_eq!(Token::parse("dog/N").unwrap(), Token::new("dog", Some("N".into())));
        assert_eq!(Token::parse("1/2/CD").unwrap(), Token::new("1/2", Some("CD".into())));
        assert_eq!(Token::parse("dog").unwrap(), Token::new("dog", None));
        assert_eq!(Token::parse("and/").unwrap(), Token::new("and/", None));
        assert!(Token::parse("/N").is_err());
    }

    #[test]
    fn sentence_display_round_trips() {
        let line = "the/D 1/2/CD dog";
        let sentence = Sentence::parse(line).unwrap();
        assert_eq!(sentence.to_string(), line);
        assert!(!sentence.is_supervised());
        assert_eq!(sentence.desupervise().to_string(), "the 1/2 dog");
    }

    #[test]
    fn alphabets_end_with_sentinels() {
        let c = corpus(&["the/D dog/N", "a/D cat/N runs/V"], &CorpusOptions::new());
        let tags: Vec<&str> = c.tagset().iter().map(String::as_str).collect();
        assert_eq!(tags, ["D", "N", "V", EOS_TAG, BOS_TAG]);
        let words: Vec<&str> = c.vocab().iter().map(String::as_str).collect();
        assert_eq!(words, ["the", "dog", "a", "cat", "runs", OOV_WORD, EOS_WORD, BOS_WORD]);
    }

    #[test]
    fn rare_words_fold_into_oov() {
        let options = CorpusOptions::new().with_oov_threshold(2);
        let c = corpus(&["the/D dog/N", "the/D cat/N"], &options);
        let words: Vec<&str> = c.vocab().iter().map(String::as_str).collect();
        assert_eq!(words, ["the", OOV_WORD, EOS_WORD, BOS_WORD]);

        let isent = c.integerize(&c.sentences()[0]).unwrap();
        assert_eq!(isent.word(1), 0);
        assert_eq!(isent.word(2), 1);
    }

    #[test]
    fn integerize_brackets_with_sentinels() {
        let c = corpus(&["the/D dog"], &CorpusOptions::new());
        let isent = c.integerize(&c.sentences()[0]).unwrap();
        assert_eq!(isent.len(), 4);
        assert_eq!(isent.word(0), c.vocab().index(BOS_WORD).unwrap());
        assert_eq!(isent.tag(0), TagSlot::Known(c.tagset().index(BOS_TAG).unwrap()));
        assert_eq!(isent.tag(1), TagSlot::Known(0));
        assert_eq!(isent.tag(2), TagSlot::Unknown);
        assert_eq!(isent.word(3), c.vocab().index(EOS_WORD).unwrap());
    }

    #[test]
    fn integerize_rejects_unknown_tags_and_oov_without_entry() {
        let c = corpus(&["the/D dog/N"], &CorpusOptions::new().with_oov(false));
        let unseen_tag = Sentence::parse("the/X").unwrap();
        assert!(c.integerize(&unseen_tag).is_err());
        let unseen_word = Sentence::parse("cat").unwrap();
        assert!(c.integerize(&unseen_word).is_err());
    }

    #[test]
    fn supervised_words_ignore_untagged_tokens() {
        let c = corpus(&["the/D dog", "cat/N"], &CorpusOptions::new());
        let words = c.supervised_words();
        assert!(words.contains("the"));
        assert!(words.contains("cat"));
        assert!(!words.contains("dog"));
    }
}
