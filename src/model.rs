//! Data model (spec §3). All records are plain, immutable-by-convention
//! value types owned by the storage handle between workflows.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,
    pub title: String,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creation_date: Option<String>,
    #[serde(default)]
    pub metadata: IndexMap<String, Value>,
    #[serde(default)]
    pub text_unit_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub human_readable_id: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TextUnit {
    pub id: String,
    pub text: String,
    pub token_count: usize,
    pub document_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship_ids: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub covariate_ids: Option<Vec<String>>,
}

/// Pre-finalization entity produced by extraction aggregation (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntitySeed {
    pub title: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub description: String,
    pub text_unit_ids: Vec<String>,
    pub frequency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Entity {
    pub id: String,
    pub title: String,
    #[serde(rename = "type")]
    pub entity_type: String,
    pub description: String,
    pub text_unit_ids: Vec<String>,
    pub frequency: usize,
    pub human_readable_id: usize,
    pub degree: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
}

/// Pre-finalization relationship produced by extraction aggregation (§4.8).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelationshipSeed {
    pub source: String,
    pub target: String,
    pub description: String,
    pub weight: f64,
    pub text_unit_ids: Vec<String>,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub bidirectional: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Relationship {
    pub id: String,
    pub source: String,
    pub target: String,
    pub description: String,
    pub weight: f64,
    pub text_unit_ids: Vec<String>,
    #[serde(rename = "type")]
    pub rel_type: String,
    pub bidirectional: bool,
    pub human_readable_id: usize,
    pub combined_degree: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Community {
    pub id: String,
    pub human_readable_id: usize,
    pub level: usize,
    pub parent_id: i64,
    pub children: Vec<String>,
    pub title: String,
    pub entity_ids: Vec<String>,
    pub relationship_ids: Vec<String>,
    pub text_unit_ids: Vec<String>,
    pub period: String,
    pub size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CommunityReport {
    pub community_id: String,
    pub level: usize,
    pub entity_titles: Vec<String>,
    pub summary: String,
    pub keywords: Vec<String>,
}

/// Case-insensitive, trimmed normalization applied consistently to entity
/// titles and relationship endpoints (spec §9 — "aggregators currently
/// using case-insensitive dictionaries").
pub fn normalize_key(s: &str) -> String {
    s.trim().to_lowercase()
}
