//! hmmtag command line
//!
//! Trains HMM taggers from `word/tag` corpora, tags new text, evaluates
//! saved models and prints their parameters.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use hmmtag_core::TrainConfig;
use hmmtag_trainer::{
    CorpusOptions, TaggedCorpus, Trainer, cross_entropy, format_parameters, load_model,
    tagging_accuracy, write_tagging,
};
use tracing::info;

/// CLI arguments
#[derive(Parser)]
#[command(name = "hmmtag")]
#[command(about = "Train and apply hidden Markov model taggers")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model with EM and early stopping
    Train {
        /// Training corpus files
        #[arg(short, long = "train", required = true, num_args = 1..)]
        train: Vec<PathBuf>,

        /// Held-out corpus for early stopping (defaults to the training data)
        #[arg(short, long)]
        dev: Option<PathBuf>,

        /// Add-λ smoothing constant
        #[arg(short, long, default_value_t = 0.0)]
        lambda: f64,

        /// Relative improvement required to keep training
        #[arg(long, default_value_t = 0.001)]
        tolerance: f64,

        /// Maximum number of epochs
        #[arg(long, default_value_t = 50)]
        max_epochs: usize,

        /// Train a unigram (zeroth-order) transition model
        #[arg(long)]
        unigram: bool,

        /// Seed for parameter initialization
        #[arg(long, env = "HMMTAG_SEED", default_value_t = 1337)]
        seed: u64,

        /// Words seen fewer times than this become _OOV_
        #[arg(long, default_value_t = 1)]
        oov_threshold: usize,

        /// Continue training from a saved model instead of a fresh one
        #[arg(long)]
        init: Option<PathBuf>,

        /// Where to write the trained model
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Viterbi-tag a corpus with a saved model
    Tag {
        #[arg(short, long)]
        model: PathBuf,

        #[arg(short, long)]
        input: PathBuf,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Report cross-entropy and tagging accuracy on a corpus
    Eval {
        #[arg(short, long)]
        model: PathBuf,

        #[arg(short, long)]
        input: PathBuf,

        /// Corpus whose tagged words count as known (defaults to the input)
        #[arg(long)]
        known: Option<PathBuf>,
    },
    /// Print the transition and emission tables of a saved model
    Show {
        #[arg(short, long)]
        model: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Train {
            train,
            dev,
            lambda,
            tolerance,
            max_epochs,
            unigram,
            seed,
            oov_threshold,
            init,
            output,
        } => {
            let mut trainer = match init {
                Some(path) => Trainer::with_model(load_model(&path)?, train.as_slice())?,
                None => {
                    let options = CorpusOptions::new().with_oov_threshold(oov_threshold);
                    Trainer::new(train.as_slice(), &options, unigram, seed)?
                }
            };
            let dev = dev.map(|path| trainer.load_dev(&[path])).transpose()?;
            let config = TrainConfig::new()
                .with_lambda(lambda)
                .with_tolerance(tolerance)
                .with_max_epochs(max_epochs);

            let report = trainer.train(dev.as_ref(), &config)?;
            trainer.save_model(&output)?;
            println!(
                "Trained for {} epoch(s) ({:?}): loss {:.4} -> {:.4}",
                report.epochs, report.stop, report.initial_loss, report.final_loss
            );
        }
        Commands::Tag {
            model,
            input,
            output,
        } => {
            let model = load_model(&model)?;
            let corpus =
                TaggedCorpus::with_alphabets(&[input], model.tagset().clone(), model.vocab().clone())?;
            let written = match output {
                Some(path) => {
                    let file = File::create(&path)
                        .with_context(|| format!("creating {}", path.display()))?;
                    write_tagging(&model, &corpus, BufWriter::new(file))?
                }
                None => write_tagging(&model, &corpus, io::stdout().lock())?,
            };
            info!(sentences = written, "tagging complete");
        }
        Commands::Eval {
            model,
            input,
            known,
        } => {
            let model = load_model(&model)?;
            let load = |path: PathBuf| {
                TaggedCorpus::with_alphabets(&[path], model.tagset().clone(), model.vocab().clone())
            };
            let corpus = load(input)?;
            let known_vocab = match known {
                Some(path) => load(path)?.supervised_words(),
                None => corpus.supervised_words(),
            };

            let ce = cross_entropy(&model, &corpus)?;
            let accuracy = tagging_accuracy(&model, &corpus, &known_vocab)?;
            println!("Cross-entropy: {ce:.4} nats per token (perplexity {:.3})", ce.exp());
            println!("Tagging accuracy: {accuracy}");
        }
        Commands::Show { model } => {
            let model = load_model(&model)?;
            let mut stdout = io::stdout().lock();
            stdout.write_all(format_parameters(&model).as_bytes())?;
        }
    }

    Ok(())
}
