//! Gallery file inspection.

use clap::Args;
use opensight_gallery::codec;
use serde::Serialize;

use super::{output_format, settings};
use crate::output::print;
use crate::Cli;

/// Show the gallery file header and contents without loading it into a
/// gallery. Works on files whose dimension differs from the configured one.
#[derive(Args)]
pub struct InspectCommand {}

#[derive(Serialize)]
struct InspectOutput {
    path: String,
    exists: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    size_bytes: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dim: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    count: Option<usize>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    names: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl InspectCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let settings = settings(cli)?;
        let path = &settings.database;
        let mut out = InspectOutput {
            path: path.display().to_string(),
            exists: path.exists(),
            size_bytes: None,
            version: None,
            dim: None,
            count: None,
            names: Vec::new(),
            error: None,
        };

        if out.exists {
            let data = std::fs::read(path)?;
            out.size_bytes = Some(data.len() as u64);
            match codec::read_header(&mut data.as_slice()) {
                Ok(h) => {
                    out.version = Some(h.version);
                    out.dim = Some(h.dim);
                    out.count = Some(h.count);
                }
                Err(e) => out.error = Some(e.to_string()),
            }
            if out.error.is_none() {
                match codec::decode_slice(&data, None) {
                    Ok((_, records)) => out.names = records.keys().cloned().collect(),
                    Err(e) => out.error = Some(e.to_string()),
                }
            }
        }

        print(output_format(cli), &out)
    }
}
