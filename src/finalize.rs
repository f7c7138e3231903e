//! Graph finalization (spec §4.9): deterministic id assignment, degree
//! computation, human_readable_id ranking, and the endpoint-existence
//! validation guard.

use std::collections::{HashMap, HashSet};

use crate::error::{GraphRagError, Result};
use crate::hash::hash;
use crate::model::{normalize_key, Entity, EntitySeed, Relationship, RelationshipSeed};

pub fn finalize_graph(
    entities: Vec<EntitySeed>,
    relationships: Vec<RelationshipSeed>,
) -> Result<(Vec<Entity>, Vec<Relationship>)> {
    let mut entities: Vec<Entity> = entities
        .into_iter()
        .map(|seed| {
            let id = hash([("title", seed.title.to_lowercase().as_str())]);
            Entity {
                id,
                title: seed.title,
                entity_type: seed.entity_type,
                description: seed.description,
                text_unit_ids: seed.text_unit_ids,
                frequency: seed.frequency,
                human_readable_id: 0,
                degree: 0,
                x: None,
                y: None,
            }
        })
        .collect();

    let mut relationships: Vec<Relationship> = relationships
        .into_iter()
        .map(|seed| {
            let id = hash([
                ("source", seed.source.to_lowercase().as_str()),
                ("target", seed.target.to_lowercase().as_str()),
                ("type", seed.rel_type.as_str()),
            ]);
            Relationship {
                id,
                source: seed.source,
                target: seed.target,
                description: seed.description,
                weight: seed.weight,
                text_unit_ids: seed.text_unit_ids,
                rel_type: seed.rel_type,
                bidirectional: seed.bidirectional,
                human_readable_id: 0,
                combined_degree: 0,
            }
        })
        .collect();

    let mut degree: HashMap<String, usize> = HashMap::new();
    for rel in &relationships {
        *degree.entry(normalize_key(&rel.source)).or_insert(0) += 1;
        *degree.entry(normalize_key(&rel.target)).or_insert(0) += 1;
    }
    for entity in &mut entities {
        entity.degree = degree.get(&normalize_key(&entity.title)).copied().unwrap_or(0);
    }
    for rel in &mut relationships {
        let source_degree = degree.get(&normalize_key(&rel.source)).copied().unwrap_or(0);
        let target_degree = degree.get(&normalize_key(&rel.target)).copied().unwrap_or(0);
        rel.combined_degree = source_degree + target_degree;
    }

    entities.sort_by(|a, b| b.frequency.cmp(&a.frequency).then_with(|| a.title.cmp(&b.title)));
    for (i, entity) in entities.iter_mut().enumerate() {
        entity.human_readable_id = i;
    }

    relationships.sort_by(|a, b| {
        b.combined_degree
            .cmp(&a.combined_degree)
            .then_with(|| a.source.cmp(&b.source))
            .then_with(|| a.target.cmp(&b.target))
    });

    let entity_titles: HashSet<String> = entities.iter().map(|e| normalize_key(&e.title)).collect();
    let before = relationships.len();
    relationships.retain(|r| {
        entity_titles.contains(&normalize_key(&r.source)) && entity_titles.contains(&normalize_key(&r.target))
    });
    let dropped = before - relationships.len();
    if before > 0 && dropped * 2 >= before {
        return Err(GraphRagError::Validation(format!(
            "relationship validation dropped {dropped} of {before} relationships"
        )));
    }

    for (i, rel) in relationships.iter_mut().enumerate() {
        rel.human_readable_id = i;
    }

    Ok((entities, relationships))
}
