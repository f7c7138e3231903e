//! Community summarization (spec §4.11): an LLM-generated report per
//! community with a deterministic fallback, plus keyword extraction.

use std::collections::HashMap;

use crate::config::CommunityReportsConfig;
use crate::error::Result;
use crate::llm::{ChatClient, ChatMessage};
use crate::model::{Community, CommunityReport, Entity};
use crate::pipeline::Cancellation;
use crate::prompts;

fn fallback_summary(titles: &[String]) -> String {
    format!(
        "Community containing: {}. Relationships indicate shared context across the documents.",
        titles.join(", ")
    )
}

/// Splits on non-alphanumeric boundaries (which also strips surrounding
/// quote/bracket/hash/asterisk/backtick characters, since those aren't
/// alphanumeric), keeps tokens longer than 2 chars, and ranks by
/// `(count desc, token asc)` (spec §4.11).
fn extract_keywords(summary: &str) -> Vec<String> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for token in summary.split(|c: char| !c.is_alphanumeric()) {
        if token.len() <= 2 {
            continue;
        }
        *counts.entry(token.to_lowercase()).or_insert(0) += 1;
    }
    let mut ranked: Vec<(String, usize)> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked.into_iter().take(10).map(|(token, _)| token).collect()
}

pub async fn summarize_communities(
    communities: &[Community],
    entities: &[Entity],
    config: &CommunityReportsConfig,
    chat_client: Option<&dyn ChatClient>,
    root_dir: &str,
    cancellation: &Cancellation,
) -> Result<Vec<CommunityReport>> {
    let entity_by_id: HashMap<&str, &Entity> = entities.iter().map(|e| (e.id.as_str(), e)).collect();

    let system_prompt = prompts::load_template(
        root_dir,
        None,
        "community_report_system.txt",
        prompts::COMMUNITY_REPORT_SYSTEM_PROMPT,
    )
    .await?;

    let mut reports = Vec::with_capacity(communities.len());

    for community in communities {
        cancellation.check()?;

        let members: Vec<&Entity> = community
            .entity_ids
            .iter()
            .filter_map(|id| entity_by_id.get(id.as_str()).copied())
            .collect();
        let titles: Vec<String> = members.iter().map(|e| e.title.clone()).collect();

        let summary = match chat_client {
            Some(client) => {
                let pairs: Vec<(String, String)> = members
                    .iter()
                    .map(|e| (e.title.clone(), e.description.clone()))
                    .collect();
                let mut user_prompt = prompts::community_report_user_prompt(&pairs, config.max_length);
                user_prompt.truncate(config.max_input_length.min(user_prompt.len()));
                let messages = [ChatMessage::system(&system_prompt), ChatMessage::user(user_prompt)];
                match client.chat(&messages, cancellation).await {
                    Ok(response) if !response.text.trim().is_empty() => response.text,
                    Ok(_) => fallback_summary(&titles),
                    Err(e) => {
                        tracing::warn!(error = %e, community = %community.id, "summarization chat call failed");
                        fallback_summary(&titles)
                    }
                }
            }
            None => fallback_summary(&titles),
        };

        let keywords = extract_keywords(&summary);

        reports.push(CommunityReport {
            community_id: community.id.clone(),
            level: community.level,
            entity_titles: titles,
            summary,
            keywords,
        });
    }

    Ok(reports)
}
