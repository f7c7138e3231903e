//! Delimited CSV loader (spec §4.5 "CSV").

use super::{basename, select_metadata};
use crate::config::InputConfig;
use crate::error::{GraphRagError, Result};
use crate::hash::hash;
use crate::model::Document;

/// One Document per data row. `text = row[text_column] ?? row joined by
/// space`; `title = row[title_column] ?? basename`. Hash components are
/// every header/value pair in row order, then `("text", text)`.
pub fn load(path: &str, contents: &str, config: &InputConfig) -> Result<Vec<Document>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(contents.as_bytes());

    let headers = reader
        .headers()
        .map_err(|e| GraphRagError::Configuration(format!("invalid CSV header in {path}: {e}")))?
        .clone();

    let mut documents = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| GraphRagError::Configuration(format!("invalid CSV row in {path}: {e}")))?;

        let mut columns: std::collections::HashMap<String, String> = std::collections::HashMap::new();
        let mut ordered_pairs: Vec<(String, String)> = Vec::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            columns.insert(header.to_string(), value.to_string());
            ordered_pairs.push((header.to_string(), value.to_string()));
        }

        let text = columns
            .get(&config.text_column)
            .cloned()
            .unwrap_or_else(|| record.iter().collect::<Vec<_>>().join(" "));

        let title = config
            .title_column
            .as_ref()
            .and_then(|col| columns.get(col))
            .cloned()
            .unwrap_or_else(|| basename(path));

        let mut components: Vec<(&str, &str)> = ordered_pairs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();
        components.push(("text", text.as_str()));
        let id = hash(components);

        documents.push(Document {
            id,
            title,
            text,
            creation_date: None,
            metadata: select_metadata(&columns, &config.metadata),
            text_unit_ids: Vec::new(),
            human_readable_id: None,
        });
    }

    Ok(documents)
}
