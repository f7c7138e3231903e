//! Whole-file text loader (spec §4.5 "Text").

use super::basename;
use crate::hash::hash;
use crate::model::Document;

/// `title = basename`, `id = hash(("path", path), ("text", text))` — plain
/// text carries no column-derived metadata, so no further components apply.
pub fn load(path: &str, text: &str) -> Document {
    let id = hash([("path", path), ("text", text)]);
    Document {
        id,
        title: basename(path),
        text: text.to_string(),
        creation_date: None,
        metadata: indexmap::IndexMap::new(),
        text_unit_ids: Vec::new(),
        human_readable_id: None,
    }
}
