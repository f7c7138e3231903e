//! Per-text-unit LLM-driven entity/relationship extraction (spec §4.8).
//! Chat dispatch may fan out (spec §5), but folding into the aggregators
//! always happens in text-unit input order so the aggregators' tie-breaks
//! stay deterministic. Each unit's own extraction may run up to
//! `max_gleanings` additional follow-up rounds (spec §4.3) before it is
//! folded in; gleaning rounds are sequential per unit and only ever add to
//! that unit's own result.

use futures::stream::{self, StreamExt};
use serde::Deserialize;

use super::aggregator::{EntityAggregator, RelationshipAggregator};
use crate::config::ExtractGraphConfig;
use crate::llm::{ChatClient, ChatMessage};
use crate::model::{EntitySeed, RelationshipSeed, TextUnit};
use crate::pipeline::Cancellation;
use crate::prompts;

const MAX_IN_FLIGHT: usize = 8;

#[derive(Debug, Deserialize)]
struct RawEntity {
    title: String,
    #[serde(rename = "type", default)]
    entity_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    confidence: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawRelationship {
    source: String,
    target: String,
    #[serde(rename = "type", default)]
    rel_type: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    weight: Option<f64>,
    #[serde(default)]
    bidirectional: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RawExtraction {
    #[serde(default)]
    entities: Vec<RawEntity>,
    #[serde(default)]
    relationships: Vec<RawRelationship>,
}

async fn build_user_prompt(
    root_dir: &str,
    config: &ExtractGraphConfig,
    text: &str,
) -> crate::error::Result<String> {
    const SENTINEL: &str = "__GRAPHRAG_BUILTIN_USER_PROMPT__";
    let max_entities = (config.entity_types.len() + 5).max(1);
    let template = prompts::load_template(
        root_dir,
        config.user_prompt.as_deref(),
        "extract_graph_user.txt",
        SENTINEL,
    )
    .await?;

    if template == SENTINEL {
        Ok(prompts::extract_graph_user_prompt(text, &config.entity_types, max_entities))
    } else {
        Ok(template
            .replace("{text}", text)
            .replace("{entity_types}", &config.entity_types.join(", "))
            .replace("{max_entities}", &max_entities.to_string()))
    }
}

fn parse_extraction(text: &str, structured: Option<&serde_json::Value>) -> Option<RawExtraction> {
    if let Some(value) = structured {
        if let Ok(parsed) = serde_json::from_value::<RawExtraction>(value.clone()) {
            return Some(parsed);
        }
    }
    serde_json::from_str::<RawExtraction>(text).ok()
}

fn merge_extraction(target: &mut RawExtraction, mut more: RawExtraction) -> bool {
    let added = !more.entities.is_empty() || !more.relationships.is_empty();
    target.entities.append(&mut more.entities);
    target.relationships.append(&mut more.relationships);
    added
}

/// Runs the first extraction pass, then up to `max_gleanings` follow-up
/// rounds over the same conversation (spec §4.3's `max_gleanings`), each
/// asking whether the prior round missed anything and folding any
/// additional entities/relationships into the running result. Gleaning
/// stops early once a round reports nothing new, or on the first model/
/// parse failure in a gleaning round (the first-pass result is kept as-is
/// rather than discarded).
async fn call_one(
    chat_client: &dyn ChatClient,
    system_prompt: &str,
    user_prompt: String,
    max_gleanings: usize,
    cancellation: &Cancellation,
) -> Option<RawExtraction> {
    if cancellation.check().is_err() {
        return None;
    }
    let mut messages = vec![ChatMessage::system(system_prompt), ChatMessage::user(user_prompt)];
    let response = match chat_client.chat(&messages, cancellation).await {
        Ok(response) => response,
        Err(e) => {
            tracing::warn!(error = %e, "extraction chat call failed; skipping text unit");
            return None;
        }
    };
    let mut extraction = match parse_extraction(&response.text, response.structured.as_ref()) {
        Some(extraction) => extraction,
        None => {
            tracing::warn!("failed to parse extraction response as JSON");
            return None;
        }
    };

    let mut last_response_text = response.text;
    for round in 0..max_gleanings {
        if cancellation.check().is_err() {
            break;
        }
        messages.push(ChatMessage::assistant(last_response_text.clone()));
        messages.push(ChatMessage::user(prompts::GLEANING_USER_PROMPT));

        let response = match chat_client.chat(&messages, cancellation).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(error = %e, round, "gleaning chat call failed; keeping prior extraction");
                break;
            }
        };
        let Some(glean) = parse_extraction(&response.text, response.structured.as_ref()) else {
            tracing::warn!(round, "failed to parse gleaning response as JSON; stopping gleaning");
            break;
        };
        last_response_text = response.text;
        if !merge_extraction(&mut extraction, glean) {
            break;
        }
    }

    Some(extraction)
}

pub async fn extract_graph(
    text_units: &[TextUnit],
    config: &ExtractGraphConfig,
    chat_client: &dyn ChatClient,
    root_dir: &str,
    cancellation: &Cancellation,
) -> crate::error::Result<(Vec<EntitySeed>, Vec<RelationshipSeed>)> {
    let system_prompt = prompts::load_template(
        root_dir,
        config.system_prompt.as_deref(),
        "extract_graph_system.txt",
        prompts::EXTRACT_GRAPH_SYSTEM_PROMPT,
    )
    .await?;

    let mut user_prompts = Vec::with_capacity(text_units.len());
    for unit in text_units {
        user_prompts.push(build_user_prompt(root_dir, config, &unit.text).await?);
    }

    // `buffered` runs up to MAX_IN_FLIGHT chat calls concurrently but yields
    // results in the original input order, so the fold below sees text-unit
    // order regardless of completion order (spec §5, §9).
    let responses: Vec<Option<RawExtraction>> = stream::iter(user_prompts.into_iter())
        .map(|prompt| {
            let system_prompt = system_prompt.clone();
            async move {
                call_one(chat_client, &system_prompt, prompt, config.max_gleanings, cancellation).await
            }
        })
        .buffered(MAX_IN_FLIGHT)
        .collect::<Vec<_>>()
        .await;

    let mut entity_agg = EntityAggregator::new();
    let mut relationship_agg = RelationshipAggregator::new();

    let entity_types_lower: Vec<String> = config
        .entity_types
        .iter()
        .map(|t| t.to_lowercase())
        .collect();

    for (unit, extraction) in text_units.iter().zip(responses.into_iter()) {
        let Some(extraction) = extraction else {
            continue;
        };

        for entity in extraction.entities {
            if entity.title.trim().is_empty() {
                continue;
            }
            let entity_type = entity.entity_type.unwrap_or_default();
            if !entity_type.is_empty()
                && !entity_types_lower.is_empty()
                && !entity_types_lower.contains(&entity_type.to_lowercase())
            {
                continue;
            }
            entity_agg.add(
                &entity.title,
                &entity_type,
                entity.description.as_deref().unwrap_or(""),
                entity.confidence,
                &unit.id,
            );
        }

        for rel in extraction.relationships {
            if rel.source.trim().is_empty() || rel.target.trim().is_empty() {
                continue;
            }
            let discriminant = rel
                .rel_type
                .clone()
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| rel.description.clone().unwrap_or_default());
            relationship_agg.add(
                &rel.source,
                &rel.target,
                &discriminant,
                rel.rel_type.as_deref(),
                rel.description.as_deref(),
                rel.weight,
                rel.bidirectional.unwrap_or(false),
                &unit.id,
            );
        }
    }

    Ok((entity_agg.finish(), relationship_agg.finish()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::ScriptedChatClient;

    fn unit(id: &str, text: &str) -> TextUnit {
        TextUnit {
            id: id.to_string(),
            text: text.to_string(),
            token_count: 10,
            document_ids: vec!["doc-1".to_string()],
            entity_ids: None,
            relationship_ids: None,
            covariate_ids: None,
        }
    }

    #[tokio::test]
    async fn aggregates_entities_and_relationships_across_units() {
        let units = vec![
            unit("u1", "Alice met Bob"),
            unit("u2", "Alice met Charlie"),
        ];
        let client = ScriptedChatClient::from_text(vec![
            r#"{"entities":[{"title":"Alice","type":"person","description":"","confidence":0.9},{"title":"Bob","type":"person","description":"","confidence":0.6}],"relationships":[{"source":"Alice","target":"Bob","type":"related_to","weight":0.1}]}"#,
            r#"{"entities":[{"title":"Alice","type":"person","description":"","confidence":0.8},{"title":"Charlie","type":"person","description":"","confidence":0.7}],"relationships":[]}"#,
        ]);
        let config = ExtractGraphConfig::default();
        let (entities, relationships) = extract_graph(&units, &config, &client, ".", &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(entities.len(), 3);
        assert_eq!(relationships.len(), 1);
        assert_eq!(relationships[0].text_unit_ids, vec!["u1".to_string()]);
    }

    #[tokio::test]
    async fn model_failure_skips_unit_without_failing_workflow() {
        let units = vec![unit("u1", "text")];
        let client = ScriptedChatClient::from_text(vec!["not json"]).fail_at(0);
        let config = ExtractGraphConfig::default();
        let (entities, relationships) = extract_graph(&units, &config, &client, ".", &Cancellation::new())
            .await
            .unwrap();
        assert!(entities.is_empty());
        assert!(relationships.is_empty());
    }

    #[tokio::test]
    async fn malformed_json_is_skipped() {
        let units = vec![unit("u1", "text")];
        let client = ScriptedChatClient::from_text(vec!["not json at all"]);
        let config = ExtractGraphConfig::default();
        let (entities, _relationships) = extract_graph(&units, &config, &client, ".", &Cancellation::new())
            .await
            .unwrap();
        assert!(entities.is_empty());
    }

    #[tokio::test]
    async fn entity_type_outside_allowlist_is_dropped() {
        let units = vec![unit("u1", "text")];
        let client = ScriptedChatClient::from_text(vec![
            r#"{"entities":[{"title":"Skynet","type":"ai","description":""}],"relationships":[]}"#,
        ]);
        let config = ExtractGraphConfig {
            entity_types: vec!["person".to_string()],
            ..ExtractGraphConfig::default()
        };
        let (entities, _) = extract_graph(&units, &config, &client, ".", &Cancellation::new())
            .await
            .unwrap();
        assert!(entities.is_empty());
    }

    #[tokio::test]
    async fn gleaning_folds_additional_rounds_into_the_same_unit() {
        let units = vec![unit("u1", "Alice met Bob, who introduced her to Charlie")];
        let client = ScriptedChatClient::from_text(vec![
            r#"{"entities":[{"title":"Alice","type":"person","description":""}],"relationships":[]}"#,
            r#"{"entities":[{"title":"Bob","type":"person","description":""}],"relationships":[]}"#,
            r#"{"entities":[],"relationships":[]}"#,
        ]);
        let config = ExtractGraphConfig {
            max_gleanings: 2,
            ..ExtractGraphConfig::default()
        };
        let (entities, _) = extract_graph(&units, &config, &client, ".", &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(entities.len(), 2);
    }

    #[tokio::test]
    async fn gleaning_stops_early_once_a_round_reports_nothing_new() {
        let units = vec![unit("u1", "Alice met Bob")];
        let client = ScriptedChatClient::from_text(vec![
            r#"{"entities":[{"title":"Alice","type":"person","description":""}],"relationships":[]}"#,
            r#"{"entities":[],"relationships":[]}"#,
            r#"{"entities":[{"title":"Bob","type":"person","description":""}],"relationships":[]}"#,
        ]);
        let config = ExtractGraphConfig {
            max_gleanings: 2,
            ..ExtractGraphConfig::default()
        };
        let (entities, _) = extract_graph(&units, &config, &client, ".", &Cancellation::new())
            .await
            .unwrap();
        // the second scripted response (empty) stops gleaning before the third
        // (Bob) is ever requested.
        assert_eq!(entities.len(), 1);
    }

    #[tokio::test]
    async fn zero_gleanings_is_unchanged_single_call_behavior() {
        let units = vec![unit("u1", "Alice met Bob")];
        let client = ScriptedChatClient::from_text(vec![
            r#"{"entities":[{"title":"Alice","type":"person","description":""}],"relationships":[]}"#,
        ]);
        let config = ExtractGraphConfig::default();
        assert_eq!(config.max_gleanings, 0);
        let (entities, _) = extract_graph(&units, &config, &client, ".", &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(entities.len(), 1);
    }
}
