//! Heuristic text-unit maintenance (spec §4.7). Three passes in fixed
//! order: per-unit token cap, per-document token budget, semantic dedup.

use std::collections::{BTreeSet, HashMap};

use rayon::prelude::*;

use crate::config::HeuristicsConfig;
use crate::error::Result;
use crate::llm::{cosine_similarity, EmbeddingGenerator};
use crate::model::TextUnit;
use crate::pipeline::Cancellation;

fn cap_pass(units: Vec<TextUnit>, max_tokens: usize) -> Vec<TextUnit> {
    units
        .into_iter()
        .filter(|u| u.token_count <= max_tokens)
        .collect()
}

fn budget_pass(units: Vec<TextUnit>, budget: usize) -> Vec<TextUnit> {
    if budget == 0 {
        return units;
    }
    let mut running: HashMap<String, usize> = HashMap::new();
    let mut kept = Vec::with_capacity(units.len());
    for unit in units {
        let fits = unit
            .document_ids
            .iter()
            .any(|doc| running.get(doc).copied().unwrap_or(0) + unit.token_count <= budget);
        if !fits {
            continue;
        }
        for doc in &unit.document_ids {
            *running.entry(doc.clone()).or_insert(0) += unit.token_count;
        }
        kept.push(unit);
    }
    kept
}

struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..n).collect(),
        }
    }

    fn find(&mut self, x: usize) -> usize {
        if self.parent[x] != x {
            self.parent[x] = self.find(self.parent[x]);
        }
        self.parent[x]
    }

    fn union(&mut self, a: usize, b: usize) {
        let ra = self.find(a);
        let rb = self.find(b);
        if ra != rb {
            self.parent[ra] = rb;
        }
    }
}

/// Greedy nearest-pair merging via cosine similarity: any pair at or above
/// the threshold joins the same cluster (transitively), the survivor is the
/// lexicographically smallest id, and original relative order is preserved.
async fn dedup_pass(
    units: Vec<TextUnit>,
    threshold: f64,
    embedder: &dyn EmbeddingGenerator,
    cancellation: &Cancellation,
) -> Result<Vec<TextUnit>> {
    if units.len() < 2 {
        return Ok(units);
    }

    let texts: Vec<String> = units.iter().map(|u| u.text.clone()).collect();
    let embeddings = embedder.embed(&texts, cancellation).await?;

    // The O(n^2) pairwise similarity scan is the hot path for large batches,
    // so it runs across Rayon's pool; unioning stays sequential afterwards
    // so the resulting clustering does not depend on thread scheduling.
    let pairs: Vec<(usize, usize)> = (0..units.len())
        .into_par_iter()
        .flat_map_iter(|i| {
            let embeddings = &embeddings;
            ((i + 1)..units.len())
                .filter(move |&j| cosine_similarity(&embeddings[i], &embeddings[j]) >= threshold)
                .map(move |j| (i, j))
        })
        .collect();

    let mut dsu = DisjointSet::new(units.len());
    for (i, j) in pairs {
        dsu.union(i, j);
    }

    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for i in 0..units.len() {
        let root = dsu.find(i);
        groups.entry(root).or_default().push(i);
    }

    let mut survivor_of_index: HashMap<usize, usize> = HashMap::new();
    let mut merged_docs: HashMap<usize, BTreeSet<String>> = HashMap::new();
    for members in groups.values() {
        let survivor = *members
            .iter()
            .min_by_key(|&&i| units[i].id.clone())
            .unwrap();
        let mut doc_ids: BTreeSet<String> = BTreeSet::new();
        for &i in members {
            doc_ids.extend(units[i].document_ids.iter().cloned());
            survivor_of_index.insert(i, survivor);
        }
        merged_docs.insert(survivor, doc_ids);
    }

    let mut seen_survivors: BTreeSet<usize> = BTreeSet::new();
    let mut output = Vec::new();
    for (idx, unit) in units.into_iter().enumerate() {
        let survivor = survivor_of_index[&idx];
        if survivor != idx {
            continue;
        }
        if !seen_survivors.insert(survivor) {
            continue;
        }
        let mut unit = unit;
        if let Some(docs) = merged_docs.remove(&survivor) {
            unit.document_ids = docs.into_iter().collect();
        }
        output.push(unit);
    }
    Ok(output)
}

pub async fn maintain_text_units(
    units: Vec<TextUnit>,
    config: &HeuristicsConfig,
    embedder: Option<&dyn EmbeddingGenerator>,
    cancellation: &Cancellation,
) -> Result<Vec<TextUnit>> {
    if !config.is_active() {
        return Ok(units);
    }

    let units = cap_pass(units, config.max_tokens_per_text_unit);
    cancellation.check()?;
    let units = budget_pass(units, config.max_document_token_budget);
    cancellation.check()?;

    if config.enable_semantic_deduplication {
        if let Some(embedder) = embedder {
            return dedup_pass(units, config.semantic_deduplication_threshold, embedder, cancellation).await;
        }
    }

    Ok(units)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::HashingEmbedder;

    fn unit(id: &str, text: &str, token_count: usize, docs: &[&str]) -> TextUnit {
        TextUnit {
            id: id.to_string(),
            text: text.to_string(),
            token_count,
            document_ids: docs.iter().map(|s| s.to_string()).collect(),
            entity_ids: None,
            relationship_ids: None,
            covariate_ids: None,
        }
    }

    #[tokio::test]
    async fn token_cap_drops_oversized_units() {
        let units = vec![unit("a", "short", 10, &["doc-1"]), unit("b", "long", 999, &["doc-1"])];
        let config = HeuristicsConfig {
            max_tokens_per_text_unit: 50,
            ..HeuristicsConfig::default()
        };
        let result = maintain_text_units(units, &config, None, &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, "a");
    }

    #[tokio::test]
    async fn budget_pass_respects_per_document_cap() {
        let units = vec![
            unit("a", "t", 40, &["doc-1"]),
            unit("b", "t", 30, &["doc-1"]),
            unit("c", "t", 30, &["doc-1"]),
        ];
        let config = HeuristicsConfig {
            max_tokens_per_text_unit: usize::MAX,
            max_document_token_budget: 80,
            ..HeuristicsConfig::default()
        };
        let result = maintain_text_units(units, &config, None, &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
    }

    #[tokio::test]
    async fn budget_disabled_when_zero() {
        let units = vec![unit("a", "t", 1000, &["doc-1"])];
        let config = HeuristicsConfig {
            max_tokens_per_text_unit: usize::MAX,
            max_document_token_budget: 0,
            ..HeuristicsConfig::default()
        };
        let result = maintain_text_units(units, &config, None, &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(result.len(), 1);
    }

    #[tokio::test]
    async fn semantic_dedup_merges_similar_units() {
        let units = vec![
            unit("b", "Alpha Beta", 40, &["doc-1"]),
            unit("a", "Alpha Beta", 35, &["doc-2"]),
            unit("c", "Completely different content", 30, &["doc-1"]),
        ];
        let config = HeuristicsConfig {
            enable_semantic_deduplication: true,
            semantic_deduplication_threshold: 0.99,
            max_tokens_per_text_unit: usize::MAX,
            ..HeuristicsConfig::default()
        };
        let embedder = HashingEmbedder::default();
        let result = maintain_text_units(units, &config, Some(&embedder), &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(result.len(), 2);
        let survivor = result.iter().find(|u| u.id == "a").unwrap();
        assert_eq!(survivor.document_ids, vec!["doc-1".to_string(), "doc-2".to_string()]);
    }

    #[test]
    fn inactive_config_is_a_no_op_marker() {
        let config = HeuristicsConfig::default();
        assert!(!config.is_active());
    }

    #[tokio::test]
    async fn default_config_leaves_units_untouched() {
        let units = vec![unit("a", "t", 5_000, &["doc-1"])];
        let config = HeuristicsConfig::default();
        let result = maintain_text_units(units.clone(), &config, None, &Cancellation::new())
            .await
            .unwrap();
        assert_eq!(result, units);
    }
}
