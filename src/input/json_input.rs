//! JSON / JSON-lines loader (spec §4.5 "JSON").

use serde_json::Value;
use std::collections::HashMap;

use super::{basename, select_metadata};
use crate::config::InputConfig;
use crate::error::{GraphRagError, Result};
use crate::hash::hash;
use crate::model::Document;

/// Array → one Document per element; object → a single Document; on parse
/// failure, falls back to JSON-lines (one object per non-empty line).
pub fn load(path: &str, contents: &str, config: &InputConfig) -> Result<Vec<Document>> {
    match serde_json::from_str::<Value>(contents) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .map(|item| document_from_object(path, item, config))
            .collect(),
        Ok(value @ Value::Object(_)) => Ok(vec![document_from_object(path, value, config)?]),
        Ok(_) => Err(GraphRagError::Configuration(format!(
            "{path}: JSON root must be an object or array"
        ))),
        Err(_) => load_jsonl(path, contents, config),
    }
}

fn load_jsonl(path: &str, contents: &str, config: &InputConfig) -> Result<Vec<Document>> {
    let mut documents = Vec::new();
    for line in contents.lines() {
        if line.trim().is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .map_err(|e| GraphRagError::Configuration(format!("invalid JSON line in {path}: {e}")))?;
        documents.push(document_from_object(path, value, config)?);
    }
    Ok(documents)
}

fn document_from_object(path: &str, value: Value, config: &InputConfig) -> Result<Document> {
    let object = value.as_object().ok_or_else(|| {
        GraphRagError::Configuration(format!("{path}: expected a JSON object per document"))
    })?;

    let mut columns: HashMap<String, String> = HashMap::new();
    let mut ordered_pairs: Vec<(String, String)> = Vec::new();
    for (key, value) in object.iter() {
        let rendered = value_to_string(value);
        columns.insert(key.clone(), rendered.clone());
        ordered_pairs.push((key.clone(), rendered));
    }

    let text = object
        .get(&config.text_column)
        .map(value_to_string)
        .unwrap_or_default();

    let title = config
        .title_column
        .as_ref()
        .and_then(|col| object.get(col))
        .map(value_to_string)
        .unwrap_or_else(|| basename(path));

    let mut components: Vec<(&str, &str)> = ordered_pairs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    components.push(("text", text.as_str()));
    let id = hash(components);

    Ok(Document {
        id,
        title,
        text,
        creation_date: None,
        metadata: select_metadata(&columns, &config.metadata),
        text_unit_ids: Vec::new(),
        human_readable_id: None,
    })
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> InputConfig {
        InputConfig {
            metadata: vec!["tag".to_string()],
            ..InputConfig::default()
        }
    }

    #[test]
    fn parses_json_array() {
        let json = r#"[{"text":"hello","title":"a","tag":"x"},{"text":"world","title":"b","tag":"y"}]"#;
        let docs = load("data.json", json, &config()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].text, "hello");
        assert_eq!(docs[0].metadata.get("tag").unwrap(), "x");
    }

    #[test]
    fn parses_single_object() {
        let json = r#"{"text":"hello","title":"a"}"#;
        let docs = load("data.json", json, &InputConfig::default()).unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].title, "a");
    }

    #[test]
    fn falls_back_to_json_lines() {
        let jsonl = "{\"text\":\"one\"}\n{\"text\":\"two\"}\n";
        let docs = load("data.jsonl", jsonl, &InputConfig::default()).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs[1].text, "two");
    }

    #[test]
    fn id_is_deterministic() {
        let json = r#"{"text":"hello","title":"a"}"#;
        let a = load("data.json", json, &InputConfig::default()).unwrap();
        let b = load("data.json", json, &InputConfig::default()).unwrap();
        assert_eq!(a[0].id, b[0].id);
    }
}
