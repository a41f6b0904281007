//! Model persistence as pretty-printed JSON.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::Context;
use hmmtag_core::HiddenMarkovModel;
use tracing::info;

/// Write the model's alphabets and parameters to `path`.
pub fn save_model(model: &HiddenMarkovModel, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, model)
        .with_context(|| format!("serializing model to {}", path.display()))?;
    writer.flush()?;
    info!(path = %path.display(), "saved model");
    Ok(())
}

/// Read a model written by [`save_model`]. Structural zeros and row sums are
/// re-validated on load.
pub fn load_model(path: &Path) -> anyhow::Result<HiddenMarkovModel> {
    let file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
    let model: HiddenMarkovModel = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("loading model from {}", path.display()))?;
    info!(
        path = %path.display(),
        tags = model.k(),
        words = model.v(),
        "loaded model"
    );
    Ok(model)
}
