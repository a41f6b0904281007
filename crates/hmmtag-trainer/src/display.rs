//! Human-readable output: parameter tables and tagged corpora.

use std::fmt::Write as _;
use std::io::Write;

use hmmtag_core::{HiddenMarkovModel, HmmError};
use tracing::warn;

use crate::data::{Sentence, TaggedCorpus, Token};

/// Render `A` and `B` as tab-separated tables with three decimals, rows and
/// columns labeled by their tag and word strings.
pub fn format_parameters(model: &HiddenMarkovModel) -> String {
    let tag = |t: usize| model.tagset().get(t).map_or("?", String::as_str);
    let word = |w: usize| model.vocab().get(w).map_or("?", String::as_str);
    let mut out = String::new();

    out.push_str("Transition matrix A:\n");
    let header: Vec<&str> = (0..model.k()).map(tag).collect();
    let _ = writeln!(out, "\t{}", header.join("\t"));
    for s in 0..model.k() {
        let cells: Vec<String> = model.a().row(s).iter().map(|p| format!("{p:.3}")).collect();
        let _ = writeln!(out, "{}\t{}", tag(s), cells.join("\t"));
    }

    out.push_str("\nEmission matrix B:\n");
    let header: Vec<&str> = (0..model.v()).map(word).collect();
    let _ = writeln!(out, "\t{}", header.join("\t"));
    for t in 0..model.k() {
        let cells: Vec<String> = model.b().row(t).iter().map(|p| format!("{p:.3}")).collect();
        let _ = writeln!(out, "{}\t{}", tag(t), cells.join("\t"));
    }
    out
}

/// Viterbi-tag every sentence of `corpus` and write it back in corpus
/// format. Gold tags are ignored; the original word strings are kept even
/// where the model saw `_OOV_`. Sentences without a viable path are written
/// untagged. Returns the number of sentences written.
pub fn write_tagging<W: Write>(
    model: &HiddenMarkovModel,
    corpus: &TaggedCorpus,
    mut out: W,
) -> anyhow::Result<usize> {
    for (i, sentence) in corpus.sentences().iter().enumerate() {
        let input = sentence.desupervise();
        let isent = corpus.integerize(&input)?;
        let line = match model.viterbi_tag(&isent) {
            Ok(tagged) => Sentence::new(
                input
                    .tokens()
                    .iter()
                    .enumerate()
                    .map(|(j, token)| {
                        let tag = tagged
                            .tag(j + 1)
                            .known()
                            .and_then(|t| model.tagset().get(t))
                            .cloned();
                        Token::new(token.word.clone(), tag)
                    })
                    .collect(),
            ),
            Err(HmmError::NoViablePath { position }) => {
                warn!(sentence = i, position, "no viable tagging; writing words only");
                input
            }
            Err(e) => return Err(e.into()),
        };
        writeln!(out, "{line}")?;
    }
    out.flush()?;
    Ok(corpus.len())
}
