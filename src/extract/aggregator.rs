//! Order-preserving aggregation across text units (spec §4.8). Both
//! aggregators are keyed by a case-insensitive normalized key and depend on
//! being folded in input order of text units, because their tie-breaks
//! (shortest description, first-seen description/type) are defined over
//! that order (spec §5).

use std::collections::BTreeSet;

use indexmap::IndexMap;

use crate::model::{normalize_key, EntitySeed, RelationshipSeed};

struct EntityAgg {
    title: String,
    entity_type: String,
    text_unit_ids: Vec<String>,
    seen_text_units: BTreeSet<String>,
    confidence_sum: f64,
    occurrences: usize,
    shortest_description: Option<String>,
}

#[derive(Default)]
pub struct EntityAggregator {
    entries: IndexMap<String, EntityAgg>,
}

impl EntityAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(
        &mut self,
        title: &str,
        entity_type: &str,
        description: &str,
        confidence: Option<f64>,
        text_unit_id: &str,
    ) {
        let key = normalize_key(title);
        let entry = self.entries.entry(key).or_insert_with(|| EntityAgg {
            title: title.to_string(),
            entity_type: entity_type.to_string(),
            text_unit_ids: Vec::new(),
            seen_text_units: BTreeSet::new(),
            confidence_sum: 0.0,
            occurrences: 0,
            shortest_description: None,
        });

        if entry.seen_text_units.insert(text_unit_id.to_string()) {
            entry.text_unit_ids.push(text_unit_id.to_string());
        }
        entry.occurrences += 1;
        entry.confidence_sum += confidence.unwrap_or(1.0);
        if entry.entity_type.is_empty() && !entity_type.is_empty() {
            entry.entity_type = entity_type.to_string();
        }
        if !description.is_empty() {
            entry.shortest_description = match entry.shortest_description.take() {
                Some(existing) if existing.len() <= description.len() => Some(existing),
                _ => Some(description.to_string()),
            };
        }
    }

    pub fn finish(self) -> Vec<EntitySeed> {
        self.entries
            .into_values()
            .map(|entry| EntitySeed {
                title: entry.title.clone(),
                entity_type: entry.entity_type,
                description: entry
                    .shortest_description
                    .unwrap_or_else(|| format!("Entity {}", entry.title)),
                text_unit_ids: entry.text_unit_ids,
                frequency: entry.occurrences.max(1),
            })
            .collect()
    }
}

struct RelationshipAgg {
    source: String,
    target: String,
    rel_type: String,
    description: Option<String>,
    bidirectional: bool,
    text_unit_ids: Vec<String>,
    seen_text_units: BTreeSet<String>,
    weight_sum: f64,
    weight_count: usize,
}

#[derive(Default)]
pub struct RelationshipAggregator {
    entries: IndexMap<String, RelationshipAgg>,
}

impl RelationshipAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// `discriminant` is the raw extracted `type`, or the raw extracted
    /// `description` when `type` is absent — the `type∥description` key
    /// component from spec §4.8.
    #[allow(clippy::too_many_arguments)]
    pub fn add(
        &mut self,
        source: &str,
        target: &str,
        discriminant: &str,
        rel_type: Option<&str>,
        description: Option<&str>,
        weight: Option<f64>,
        bidirectional: bool,
        text_unit_id: &str,
    ) {
        let key = format!(
            "{}|{}|{}",
            normalize_key(source),
            normalize_key(target),
            normalize_key(discriminant)
        );
        let entry = self.entries.entry(key).or_insert_with(|| RelationshipAgg {
            source: source.to_string(),
            target: target.to_string(),
            rel_type: rel_type.filter(|t| !t.is_empty()).unwrap_or("related_to").to_string(),
            description: description.filter(|d| !d.is_empty()).map(str::to_string),
            bidirectional,
            text_unit_ids: Vec::new(),
            seen_text_units: BTreeSet::new(),
            weight_sum: 0.0,
            weight_count: 0,
        });

        if entry.seen_text_units.insert(text_unit_id.to_string()) {
            entry.text_unit_ids.push(text_unit_id.to_string());
        }
        if let Some(w) = weight {
            entry.weight_sum += w;
            entry.weight_count += 1;
        }
    }

    pub fn finish(self) -> Vec<RelationshipSeed> {
        self.entries
            .into_values()
            .map(|entry| {
                let weight = if entry.weight_count > 0 {
                    (entry.weight_sum / entry.weight_count as f64).clamp(0.0, 1.0)
                } else {
                    0.5
                };
                RelationshipSeed {
                    description: entry
                        .description
                        .unwrap_or_else(|| format!("{} relates to {}", entry.source, entry.target)),
                    source: entry.source,
                    target: entry.target,
                    weight,
                    text_unit_ids: entry.text_unit_ids,
                    rel_type: entry.rel_type,
                    bidirectional: entry.bidirectional,
                }
            })
            .collect()
    }
}
