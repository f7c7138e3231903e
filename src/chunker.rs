//! Token-accurate chunking with overlap and metadata prepending (spec §4.6).

use serde_json::Value;

use crate::config::ChunksConfig;
use crate::error::{GraphRagError, Result};
use crate::hash::hash;
use crate::model::{Document, TextUnit};
use crate::tokenizer::{get_tokenizer, Tokenizer};

/// Render a document's metadata as `key: value.\n` per entry in insertion
/// order, skipping null values (spec §4.6).
fn render_metadata_block(document: &Document) -> String {
    let mut block = String::new();
    for (key, value) in document.metadata.iter() {
        if value.is_null() {
            continue;
        }
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        block.push_str(&format!("{key}: {rendered}.\n"));
    }
    block
}

/// Start/end token index pairs covering `0..total` with a sliding window of
/// `window` tokens and `overlap` tokens shared between consecutive windows.
fn sliding_windows(total: usize, window: usize, overlap: usize) -> Vec<(usize, usize)> {
    if total == 0 || window == 0 {
        return Vec::new();
    }
    let step = window.saturating_sub(overlap).max(1);
    let mut windows = Vec::new();
    let mut start = 0usize;
    loop {
        let end = (start + window).min(total);
        windows.push((start, end));
        if end >= total {
            break;
        }
        start += step;
    }
    windows
}

fn chunk_one_document(document: &Document, config: &ChunksConfig, tokenizer: &Tokenizer) -> Result<Vec<TextUnit>> {
    let tokens = tokenizer.encode(&document.text);

    let metadata_block = if config.prepend_metadata {
        render_metadata_block(document)
    } else {
        String::new()
    };

    let body_budget = if config.prepend_metadata && config.chunk_size_includes_metadata {
        let metadata_tokens = tokenizer.count(&metadata_block);
        if metadata_tokens >= config.size {
            return Err(GraphRagError::Configuration(format!(
                "metadata block ({metadata_tokens} tokens) is not smaller than chunks.size ({})",
                config.size
            )));
        }
        config.size - metadata_tokens
    } else {
        config.size
    };

    let windows = sliding_windows(tokens.len(), body_budget, config.overlap);

    let mut units = Vec::with_capacity(windows.len());
    for (start, end) in windows {
        let body = tokenizer.decode(&tokens[start..end]);
        let chunk_text = if config.prepend_metadata {
            format!("{metadata_block}{body}")
        } else {
            body
        };

        if chunk_text.trim().is_empty() {
            continue;
        }

        let id = hash([("document", document.id.as_str()), ("text", chunk_text.as_str())]);
        let token_count = tokenizer.count(&chunk_text);
        units.push(TextUnit {
            id,
            text: chunk_text,
            token_count,
            document_ids: vec![document.id.clone()],
            entity_ids: None,
            relationship_ids: None,
            covariate_ids: None,
        });
    }

    Ok(units)
}

pub fn chunk_documents(documents: &[Document], config: &ChunksConfig) -> Result<Vec<TextUnit>> {
    let tokenizer = get_tokenizer(&config.encoding_model)?;
    let mut all = Vec::new();
    for document in documents {
        all.extend(chunk_one_document(document, config, &tokenizer)?);
    }
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn doc(text: &str) -> Document {
        Document {
            id: "doc-1".to_string(),
            title: "a.txt".to_string(),
            text: text.to_string(),
            creation_date: None,
            metadata: IndexMap::new(),
            text_unit_ids: Vec::new(),
            human_readable_id: None,
        }
    }

    #[test]
    fn single_short_document_yields_one_chunk() {
        let config = ChunksConfig {
            size: 100,
            overlap: 20,
            ..ChunksConfig::default()
        };
        let units = chunk_documents(&[doc("Alice met Bob at the conference.")], &config).unwrap();
        assert_eq!(units.len(), 1);
        assert_eq!(units[0].text, "Alice met Bob at the conference.");
        assert_eq!(units[0].id.len(), 128);
    }

    #[test]
    fn overlap_reconstructs_full_token_sequence() {
        let text = "one two three four five six seven eight nine ten eleven twelve";
        let config = ChunksConfig {
            size: 5,
            overlap: 2,
            ..ChunksConfig::default()
        };
        let units = chunk_documents(&[doc(text)], &config).unwrap();
        let tokenizer = get_tokenizer(&config.encoding_model).unwrap();
        let full = tokenizer.encode(text);

        let mut reconstructed: Vec<u32> = Vec::new();
        for unit in &units {
            let tokens = tokenizer.encode(&unit.text);
            if reconstructed.is_empty() {
                reconstructed.extend(tokens);
            } else {
                reconstructed.extend(&tokens[config.overlap.min(tokens.len())..]);
            }
        }
        assert_eq!(reconstructed, full);
    }

    #[test]
    fn metadata_prepend_excludes_budget() {
        let mut metadata = IndexMap::new();
        metadata.insert("title".to_string(), Value::String("Hello World".to_string()));
        metadata.insert("tag".to_string(), Value::String("tutorial".to_string()));
        let document = Document {
            metadata,
            ..doc("My first program")
        };
        let config = ChunksConfig {
            size: 100,
            overlap: 20,
            prepend_metadata: true,
            chunk_size_includes_metadata: false,
            ..ChunksConfig::default()
        };
        let units = chunk_documents(&[document], &config).unwrap();
        assert_eq!(units.len(), 1);
        assert!(units[0].text.starts_with("title: Hello World.\ntag: tutorial.\n"));
    }

    #[test]
    fn metadata_included_budget_bounds_chunk_size() {
        let mut metadata = IndexMap::new();
        metadata.insert("title".to_string(), Value::String("x".repeat(5)));
        let text = (0..50).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let document = Document { metadata, ..doc(&text) };
        let config = ChunksConfig {
            size: 20,
            overlap: 0,
            prepend_metadata: true,
            chunk_size_includes_metadata: true,
            ..ChunksConfig::default()
        };
        let units = chunk_documents(&[document], &config).unwrap();
        let tokenizer = get_tokenizer(&config.encoding_model).unwrap();
        for unit in &units {
            assert!(tokenizer.count(&unit.text) <= config.size);
        }
    }

    #[test]
    fn metadata_ge_size_fails_configuration() {
        let mut metadata = IndexMap::new();
        metadata.insert("title".to_string(), Value::String("x".repeat(500)));
        let document = Document { metadata, ..doc("short text") };
        let config = ChunksConfig {
            size: 3,
            overlap: 0,
            prepend_metadata: true,
            chunk_size_includes_metadata: true,
            ..ChunksConfig::default()
        };
        let result = chunk_documents(&[document], &config);
        assert!(matches!(result, Err(GraphRagError::Configuration(_))));
    }

    #[test]
    fn empty_document_yields_no_chunks() {
        let config = ChunksConfig::default();
        let units = chunk_documents(&[doc("")], &config).unwrap();
        assert!(units.is_empty());
    }
}
