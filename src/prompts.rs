//! Prompt-template loader (spec §6). Resolution order: (1) an explicit
//! config-supplied path resolved against `root_dir`, (2) a file in
//! `prompts/` by convention, (3) a built-in default string. A missing file
//! with an explicit path fails with `NotFound`.

use std::path::Path;

use crate::error::{GraphRagError, Result};

pub async fn load_template(
    root_dir: &str,
    explicit_path: Option<&str>,
    key: &str,
    default: &str,
) -> Result<String> {
    if let Some(path) = explicit_path {
        let resolved = Path::new(root_dir).join(path);
        return tokio::fs::read_to_string(&resolved).await.map_err(|_| {
            GraphRagError::NotFound(format!("prompt template not found: {}", resolved.display()))
        });
    }

    let conventional = Path::new(root_dir).join("prompts").join(key);
    if let Ok(text) = tokio::fs::read_to_string(&conventional).await {
        return Ok(text);
    }

    Ok(default.to_string())
}

pub const EXTRACT_GRAPH_SYSTEM_PROMPT: &str = "You are a knowledge-graph extraction system. \
Extract entities and relationships from the given text as strict JSON with the shape \
{\"entities\": [{\"title\", \"type\", \"description\", \"confidence\"}], \
\"relationships\": [{\"source\", \"target\", \"type\", \"description\", \"weight\", \"bidirectional\"}]}.";

pub fn extract_graph_user_prompt(text: &str, entity_types: &[String], max_entities: usize) -> String {
    format!(
        "Entity types to extract: {}.\nExtract at most {} entities.\nText:\n{}",
        entity_types.join(", "),
        max_entities,
        text
    )
}

/// Gleaning follow-up turn (spec §4.3's `max_gleanings`): re-asks the same
/// conversation whether the first pass missed anything, up to
/// `ExtractGraphConfig::max_gleanings` additional rounds per text unit.
pub const GLEANING_USER_PROMPT: &str = "MANY entities and relationships were missed in the \
last extraction. Looking back at the text, find any additional entities and relationships \
not already listed above, using the same JSON schema. If nothing was missed, return \
{\"entities\": [], \"relationships\": []}.";

pub const COMMUNITY_REPORT_SYSTEM_PROMPT: &str = "You are a knowledge-graph community analyst. \
Given a set of entities and their descriptions that form one connected community, write a \
concise summary of the community's shared context.";

pub fn community_report_user_prompt(
    titles_and_descriptions: &[(String, String)],
    max_length: usize,
) -> String {
    let body = titles_and_descriptions
        .iter()
        .map(|(title, desc)| format!("- {title}: {desc}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!("Summarize the following entities in at most {max_length} characters:\n{body}")
}
