//! Input loader (spec §4.5). Discovers files through [`crate::storage::Storage`]
//! using `input.file_pattern` and decodes each match into one or more
//! `Document` records with a content-derived stable id.

pub mod csv_input;
pub mod json_input;
pub mod text;

use regex::Regex;
use std::collections::HashMap;

use crate::config::{InputConfig, InputFileType};
use crate::error::{GraphRagError, Result};
use crate::model::Document;
use crate::pipeline::Cancellation;
use crate::storage::Storage;

/// Only UTF-8 is supported; any other declared encoding fails fast
/// (spec §4.5, §7 Configuration errors fail before I/O).
fn check_encoding(encoding: &str) -> Result<()> {
    if encoding.eq_ignore_ascii_case("utf-8") || encoding.eq_ignore_ascii_case("utf8") {
        Ok(())
    } else {
        Err(GraphRagError::Configuration(format!(
            "unsupported input encoding: {encoding}"
        )))
    }
}

pub async fn load_documents(
    storage: &dyn Storage,
    config: &InputConfig,
    cancellation: &Cancellation,
) -> Result<Vec<Document>> {
    check_encoding(&config.encoding)?;

    let pattern = Regex::new(&config.file_pattern)
        .map_err(|e| GraphRagError::Configuration(format!("invalid file_pattern: {e}")))?;

    let matches = storage
        .find(&pattern, None, config.file_filter.as_ref(), None, cancellation)
        .await?;

    let mut documents = Vec::new();
    for m in matches {
        cancellation.check()?;
        let bytes = storage
            .get(&m.path)
            .await?
            .ok_or_else(|| GraphRagError::NotFound(m.path.clone()))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| GraphRagError::Configuration(format!("invalid utf-8 in {}: {e}", m.path)))?;

        let docs = match config.file_type {
            InputFileType::Text => vec![text::load(&m.path, &text)],
            InputFileType::Csv => csv_input::load(&m.path, &text, config)?,
            InputFileType::Json => json_input::load(&m.path, &text, config)?,
        };
        documents.extend(docs);
    }

    Ok(documents)
}

/// Render the basename of a `/`-normalized path (spec §4.5, `title = basename`).
pub(crate) fn basename(path: &str) -> String {
    path.rsplit('/').next().unwrap_or(path).to_string()
}

/// Filter `metadata` columns down to the subset requested by `input.metadata`,
/// preserving that configured order.
pub(crate) fn select_metadata(
    columns: &HashMap<String, String>,
    requested: &[String],
) -> indexmap::IndexMap<String, serde_json::Value> {
    let mut out = indexmap::IndexMap::new();
    for key in requested {
        if let Some(value) = columns.get(key) {
            out.insert(key.clone(), serde_json::Value::String(value.clone()));
        }
    }
    out
}
