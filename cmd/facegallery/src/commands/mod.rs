//! CLI commands module.

mod gallery;
mod inspect;

use std::path::Path;

use anyhow::Context as _;
use opensight_gallery::{FileStorage, Gallery};

use crate::config::{Config, Settings};
use crate::output::OutputFormat;
use crate::Cli;

pub use gallery::{EnrollCommand, ListCommand, RecognizeCommand, RemoveCommand};
pub use inspect::InspectCommand;

/// Resolves settings from the config file and global flags.
pub(crate) fn settings(cli: &Cli) -> anyhow::Result<Settings> {
    Config::load(cli.config.as_deref())?.resolve(cli.database.as_deref(), cli.threshold)
}

pub(crate) fn output_format(cli: &Cli) -> OutputFormat {
    OutputFormat::from_json_flag(cli.json)
}

/// Opens and loads the gallery file. Refuses to continue on a corrupt file
/// so a later save cannot overwrite it.
pub(crate) fn open_gallery(settings: &Settings) -> anyhow::Result<Gallery> {
    let storage = FileStorage::new(&settings.database, settings.gallery.dim);
    let (gallery, err) = Gallery::open(settings.gallery, Box::new(storage));
    if let Some(e) = err {
        return Err(e).with_context(|| {
            format!(
                "cannot load {}; fix or move the file away",
                settings.database.display()
            )
        });
    }
    Ok(gallery)
}

/// Reads a raw embedding stored as a JSON array of numbers.
pub(crate) fn read_embedding(path: &Path) -> anyhow::Result<Vec<f32>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("read embedding {}", path.display()))?;
    parse_embedding(&content).with_context(|| format!("parse embedding {}", path.display()))
}

fn parse_embedding(content: &str) -> anyhow::Result<Vec<f32>> {
    let values: Vec<f32> = serde_json::from_str(content)?;
    if values.is_empty() {
        anyhow::bail!("embedding is empty");
    }
    if let Some(i) = values.iter().position(|v| !v.is_finite()) {
        anyhow::bail!("embedding value {i} is not finite");
    }
    Ok(values)
}
