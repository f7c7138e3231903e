//! Final documents (spec §4.12): back-link documents to the text units
//! that cover them and assign a dense 0-based `human_readable_id`.

use std::collections::HashMap;

use crate::model::{Document, TextUnit};

pub fn link_final_documents(documents: Vec<Document>, text_units: &[TextUnit]) -> Vec<Document> {
    let mut backlinks: HashMap<String, Vec<String>> = HashMap::new();
    for unit in text_units {
        for doc_id in &unit.document_ids {
            backlinks.entry(doc_id.clone()).or_default().push(unit.id.clone());
        }
    }

    documents
        .into_iter()
        .enumerate()
        .map(|(i, mut document)| {
            document.text_unit_ids = backlinks.get(&document.id).cloned().unwrap_or_default();
            document.human_readable_id = Some(i);
            document
        })
        .collect()
}
