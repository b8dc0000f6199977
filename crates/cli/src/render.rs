//! Output encodings for the rendered graph

use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{bail, Context};
use clap::ValueEnum;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Format {
    /// Graphviz DOT source
    Dot,
    /// PNG image rendered by the `dot` executable
    Png,
    /// JSON object with `DOT` and `Error` fields
    Json,
}

/// JSON envelope; field names match what existing consumers read
#[derive(Debug, Serialize)]
pub struct Response {
    #[serde(rename = "DOT")]
    pub dot: String,
    #[serde(rename = "Error")]
    pub error: String,
}

impl Response {
    pub fn from_result(result: &gograph_core::Result<Vec<u8>>) -> Self {
        match result {
            Ok(dot) => Self {
                dot: String::from_utf8_lossy(dot).into_owned(),
                error: String::new(),
            },
            Err(e) => Self {
                dot: String::new(),
                error: e.to_string(),
            },
        }
    }
}

/// Pipe DOT source through `dot -Tpng`
pub fn to_png(dot: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut child = Command::new("dot")
        .arg("-Tpng")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("failed to run `dot`; is Graphviz installed?")?;

    // Dropping stdin closes the pipe so `dot` sees EOF
    {
        let mut stdin = child.stdin.take().context("`dot` stdin unavailable")?;
        stdin.write_all(dot).context("failed to write DOT to `dot`")?;
    }

    let output = child.wait_with_output().context("`dot` did not finish")?;
    if !output.status.success() {
        bail!(
            "`dot` exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        );
    }
    Ok(output.stdout)
}
