//! Gallery editing and matching commands.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use super::{open_gallery, output_format, read_embedding, settings};
use crate::output::print;
use crate::Cli;

/// List enrolled names.
#[derive(Args)]
pub struct ListCommand {}

/// Enroll a face embedding under a name, replacing any previous one.
#[derive(Args)]
pub struct EnrollCommand {
    /// Person name (case-sensitive)
    name: String,

    /// JSON file holding the raw embedding as an array of numbers
    #[arg(short = 'e', long)]
    embedding: PathBuf,
}

/// Remove an enrolled name.
#[derive(Args)]
pub struct RemoveCommand {
    /// Person name (case-sensitive)
    name: String,
}

/// Match an embedding against the gallery.
#[derive(Args)]
pub struct RecognizeCommand {
    /// JSON file holding the raw embedding as an array of numbers
    #[arg(short = 'e', long)]
    embedding: PathBuf,
}

#[derive(Serialize)]
struct ListOutput {
    count: usize,
    names: Vec<String>,
}

#[derive(Serialize)]
struct RecognizeOutput {
    name: String,
    matched: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    score: Option<f32>,
    threshold: f32,
}

impl ListCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let gallery = open_gallery(&settings(cli)?)?;
        let names = gallery.list();
        print(
            output_format(cli),
            &ListOutput {
                count: names.len(),
                names,
            },
        )
    }
}

impl EnrollCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let settings = settings(cli)?;
        let raw = read_embedding(&self.embedding)?;
        let gallery = open_gallery(&settings)?;
        let replaced = gallery.contains(&self.name);
        gallery.enroll(&self.name, &raw)?;
        tracing::info!(name = %self.name, replaced, "enrolled");
        eprintln!("Saved {}", self.name);
        Ok(())
    }
}

impl RemoveCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let gallery = open_gallery(&settings(cli)?)?;
        if !gallery.remove(&self.name)? {
            anyhow::bail!("{:?} is not enrolled", self.name);
        }
        eprintln!("Removed {}", self.name);
        Ok(())
    }
}

impl RecognizeCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let settings = settings(cli)?;
        let raw = read_embedding(&self.embedding)?;
        let gallery = open_gallery(&settings)?;
        let threshold = gallery.config().threshold;

        let out = match gallery.identify(&raw, threshold)? {
            Some(m) => RecognizeOutput {
                name: m.name,
                matched: true,
                score: Some(m.score),
                threshold,
            },
            None => RecognizeOutput {
                name: opensight_gallery::UNKNOWN.to_string(),
                matched: false,
                score: None,
                threshold,
            },
        };
        print(output_format(cli), &out)
    }
}
