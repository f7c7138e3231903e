//! Graph heuristics applied before finalization (spec §4.9): relationship
//! enhancement (weight floor, text-unit truncation, type normalization) and
//! orphan-entity linking via text-unit overlap.

use std::collections::BTreeSet;

use crate::config::HeuristicsConfig;
use crate::model::{normalize_key, EntitySeed, RelationshipSeed};

fn enhance(relationships: Vec<RelationshipSeed>, config: &HeuristicsConfig) -> Vec<RelationshipSeed> {
    relationships
        .into_iter()
        .map(|mut rel| {
            rel.weight = rel.weight.clamp(config.relationship_confidence_floor, 1.0);
            if rel.text_unit_ids.len() > config.max_text_units_per_relationship {
                rel.text_unit_ids.truncate(config.max_text_units_per_relationship);
            }
            rel.rel_type = rel.rel_type.trim().to_lowercase();
            rel
        })
        .collect()
}

/// Entities not referenced as source or target by any relationship, then
/// linked to every non-orphan whose text-unit overlap ratio clears the
/// configured threshold (spec §4.9). A single pass: re-running against
/// already-linked output finds no orphans left, satisfying idempotence
/// (spec §8 property 7).
fn link_orphans(entities: &[EntitySeed], relationships: &[RelationshipSeed], config: &HeuristicsConfig) -> Vec<RelationshipSeed> {
    let mut referenced: BTreeSet<String> = BTreeSet::new();
    for rel in relationships {
        referenced.insert(normalize_key(&rel.source));
        referenced.insert(normalize_key(&rel.target));
    }

    let orphans: Vec<&EntitySeed> = entities
        .iter()
        .filter(|e| !referenced.contains(&normalize_key(&e.title)))
        .collect();
    let non_orphans: Vec<&EntitySeed> = entities
        .iter()
        .filter(|e| referenced.contains(&normalize_key(&e.title)))
        .collect();

    let mut synthetic = Vec::new();
    for orphan in &orphans {
        let a: BTreeSet<&String> = orphan.text_unit_ids.iter().collect();
        if a.is_empty() {
            continue;
        }
        for other in &non_orphans {
            let b: BTreeSet<&String> = other.text_unit_ids.iter().collect();
            if b.is_empty() {
                continue;
            }
            let intersection: Vec<String> = a.intersection(&b).map(|s| (*s).clone()).collect();
            let ratio = intersection.len() as f64 / a.len().min(b.len()) as f64;
            if ratio >= config.orphan_link_minimum_overlap {
                synthetic.push(RelationshipSeed {
                    source: orphan.title.clone(),
                    target: other.title.clone(),
                    description: format!("{} relates to {}", orphan.title, other.title),
                    weight: config.orphan_link_weight,
                    text_unit_ids: intersection,
                    rel_type: "co_occurs_with".to_string(),
                    bidirectional: true,
                });
            }
        }
    }
    synthetic
}

pub fn apply_heuristics(
    entities: Vec<EntitySeed>,
    mut relationships: Vec<RelationshipSeed>,
    config: &HeuristicsConfig,
) -> (Vec<EntitySeed>, Vec<RelationshipSeed>) {
    if config.enhance_relationships {
        relationships = enhance(relationships, config);
    }
    if config.link_orphan_entities {
        let synthetic = link_orphans(&entities, &relationships, config);
        relationships.extend(synthetic);
    }
    (entities, relationships)
}
