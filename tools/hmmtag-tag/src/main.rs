use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use hmmtag_core::HiddenMarkovModel;
use hmmtag_trainer::{Sentence, TaggedCorpus, load_model};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Tag whitespace-separated sentences from stdin, one JSON object per line.
#[derive(Parser)]
#[command(name = "hmmtag-tag")]
#[command(version)]
struct Args {
    /// Saved model (JSON)
    #[arg(short, long, env = "HMMTAG_MODEL")]
    model: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TagOutput {
    pub input: String,
    pub words: Vec<String>,
    pub tags: Option<Vec<String>>,
    pub log_prob: Option<f64>,
    pub error: Option<String>,
}

fn tag_line(model: &HiddenMarkovModel, corpus: &TaggedCorpus, line: &str) -> TagOutput {
    let mut output = TagOutput {
        input: line.to_string(),
        words: Vec::new(),
        tags: None,
        log_prob: None,
        error: None,
    };

    let result = Sentence::parse(line).and_then(|sentence| {
        let input = sentence.desupervise();
        output.words = input.tokens().iter().map(|t| t.word.clone()).collect();
        let isent = corpus.integerize(&input)?;
        Ok(model.viterbi(&isent)?)
    });

    match result {
        Ok(path) => {
            let tags = (1..=output.words.len())
                .map(|j| {
                    path.sentence
                        .tag(j)
                        .known()
                        .and_then(|t| model.tagset().get(t))
                        .cloned()
                        .unwrap_or_default()
                })
                .collect();
            output.tags = Some(tags);
            output.log_prob = Some(path.log_prob);
        }
        Err(e) => output.error = Some(format!("{e:#}")),
    }
    output
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_writer(io::stderr).init();

    let args = Args::parse();
    let model = load_model(&args.model)?;
    // Empty corpus carrying the model's alphabets, used for integerizing.
    let corpus =
        TaggedCorpus::with_sentences(Vec::new(), model.tagset().clone(), model.vocab().clone());

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();
    let mut tagged = 0usize;
    for line in stdin.lock().lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let output = tag_line(&model, &corpus, line);
        writeln!(stdout, "{}", serde_json::to_string(&output)?)?;
        tagged += 1;
    }

    info!(sentences = tagged, "tagging complete");
    Ok(())
}
