//! Configuration model (spec §4.3). Every sub-config has defaults so the
//! pipeline is runnable with only `input.storage.base_dir` set.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ChunkStrategy {
    Tokens,
    Sentence,
}

impl Default for ChunkStrategy {
    fn default() -> Self {
        Self::Tokens
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunksConfig {
    pub size: usize,
    pub overlap: usize,
    pub group_by_columns: Vec<String>,
    pub strategy: ChunkStrategy,
    pub encoding_model: String,
    pub prepend_metadata: bool,
    pub chunk_size_includes_metadata: bool,
}

impl Default for ChunksConfig {
    fn default() -> Self {
        Self {
            size: 300,
            overlap: 100,
            group_by_columns: vec!["id".to_string()],
            strategy: ChunkStrategy::Tokens,
            encoding_model: "cl100k_base".to_string(),
            prepend_metadata: false,
            chunk_size_includes_metadata: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ClusterAlgorithm {
    FastLabelPropagation,
    ConnectedComponents,
}

impl Default for ClusterAlgorithm {
    fn default() -> Self {
        Self::FastLabelPropagation
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterGraphConfig {
    pub max_cluster_size: usize,
    pub use_largest_connected_component: bool,
    pub seed: u64,
    pub max_iterations: usize,
    pub algorithm: ClusterAlgorithm,
}

impl Default for ClusterGraphConfig {
    fn default() -> Self {
        Self {
            max_cluster_size: 10,
            use_largest_connected_component: false,
            seed: 0xDE7A,
            max_iterations: 10,
            algorithm: ClusterAlgorithm::FastLabelPropagation,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeuristicsConfig {
    pub enable_semantic_deduplication: bool,
    pub semantic_deduplication_threshold: f64,
    pub max_tokens_per_text_unit: usize,
    pub max_document_token_budget: usize,
    pub max_text_units_per_relationship: usize,
    pub orphan_link_minimum_overlap: f64,
    pub orphan_link_weight: f64,
    pub enhance_relationships: bool,
    pub relationship_confidence_floor: f64,
    pub minimum_chunk_overlap: usize,
    pub embedding_model_id: String,
    pub link_orphan_entities: bool,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            enable_semantic_deduplication: false,
            semantic_deduplication_threshold: 0.9,
            max_tokens_per_text_unit: 1_200,
            max_document_token_budget: 0,
            max_text_units_per_relationship: usize::MAX,
            orphan_link_minimum_overlap: 0.5,
            orphan_link_weight: 0.5,
            enhance_relationships: false,
            relationship_confidence_floor: 0.0,
            minimum_chunk_overlap: 0,
            embedding_model_id: "default".to_string(),
            link_orphan_entities: false,
        }
    }
}

impl HeuristicsConfig {
    /// §4.7 — C7 runs only when this config is non-default: compared
    /// field-by-field against `Self::default()` rather than a sentinel, so
    /// a truly-default config (including its non-`usize::MAX`
    /// `max_tokens_per_text_unit`) is correctly inactive.
    pub fn is_active(&self) -> bool {
        let default = Self::default();
        self.enable_semantic_deduplication != default.enable_semantic_deduplication
            || self.max_document_token_budget != default.max_document_token_budget
            || self.max_tokens_per_text_unit != default.max_tokens_per_text_unit
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractGraphConfig {
    pub model_id: String,
    pub system_prompt: Option<String>,
    pub user_prompt: Option<String>,
    pub entity_types: Vec<String>,
    pub max_gleanings: usize,
}

impl Default for ExtractGraphConfig {
    fn default() -> Self {
        Self {
            model_id: "default".to_string(),
            system_prompt: None,
            user_prompt: None,
            entity_types: vec![
                "person".to_string(),
                "organization".to_string(),
                "location".to_string(),
                "event".to_string(),
            ],
            max_gleanings: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommunityReportsConfig {
    pub model_id: String,
    pub max_length: usize,
    pub max_input_length: usize,
}

impl Default for CommunityReportsConfig {
    fn default() -> Self {
        Self {
            model_id: "default".to_string(),
            max_length: 1_500,
            max_input_length: 8_000,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum InputFileType {
    Text,
    Csv,
    Json,
}

impl Default for InputFileType {
    fn default() -> Self {
        Self::Text
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputStorageConfig {
    pub base_dir: String,
}

impl Default for InputStorageConfig {
    fn default() -> Self {
        Self {
            base_dir: ".".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InputConfig {
    pub storage: InputStorageConfig,
    pub file_type: InputFileType,
    pub encoding: String,
    pub file_pattern: String,
    pub file_filter: Option<std::collections::HashMap<String, String>>,
    pub text_column: String,
    pub title_column: Option<String>,
    pub metadata: Vec<String>,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            storage: InputStorageConfig::default(),
            file_type: InputFileType::Text,
            encoding: "utf-8".to_string(),
            file_pattern: r".*\.txt$".to_string(),
            file_filter: None,
            text_column: "text".to_string(),
            title_column: None,
            metadata: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct GraphRagConfig {
    pub input: InputConfig,
    pub chunks: ChunksConfig,
    pub heuristics: HeuristicsConfig,
    pub extract_graph: ExtractGraphConfig,
    pub cluster_graph: ClusterGraphConfig,
    pub community_reports: CommunityReportsConfig,
    pub root_dir: String,
}

impl GraphRagConfig {
    pub fn load_yaml(text: &str) -> crate::error::Result<Self> {
        serde_yaml::from_str(text)
            .map_err(|e| crate::error::GraphRagError::Configuration(format!("invalid config: {e}")))
    }
}
