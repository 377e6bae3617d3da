// SPDX-FileCopyrightText: 2026 Snare Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `snare extract` command implementation.

use std::io::Read;

use serde_json::{Value, json};
use snare_core::SnareError;
use snare_intel::{Analysis, IntelligencePipeline};

/// Runs the rule-based pipeline over `text` (or stdin) and prints the
/// result as JSON.
pub async fn run_extract(text: Option<String>) -> Result<(), SnareError> {
    let text = match text {
        Some(text) => text,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .map_err(|e| SnareError::InvalidInput(format!("cannot read stdin: {e}")))?;
            buf
        }
    };

    let analysis = IntelligencePipeline::new().analyze(&text);
    let rendered = serde_json::to_string_pretty(&render(&analysis))
        .map_err(|e| SnareError::Internal(format!("cannot render extraction: {e}")))?;
    println!("{rendered}");
    Ok(())
}

fn render(analysis: &Analysis) -> Value {
    json!({
        "threat_level": analysis.threat_level,
        "tactics": analysis.tactics,
        "keywords": analysis.keywords,
        "entities": analysis.candidates,
    })
}
