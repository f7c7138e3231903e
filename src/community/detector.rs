//! Community detection (spec §4.10): undirected weighted adjacency over
//! finalized entities/relationships, Fast Label Propagation as the default
//! algorithm with a connected-components fallback, optional
//! largest-component filtering, and BFS-order cluster splitting.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};

use chrono::Utc;
use petgraph::graph::{NodeIndex, UnGraph};
use petgraph::visit::EdgeRef;

use super::rng::LcgRng;
use crate::config::{ClusterAlgorithm, ClusterGraphConfig};
use crate::error::Result;
use crate::model::{normalize_key, Community, Entity, Relationship};
use crate::pipeline::Cancellation;

/// A flattened neighbor-list view over a [`petgraph::graph::UnGraph`], built
/// once per run. The rest of the module only reads `neighbors`, so the
/// underlying graph representation can change without touching the
/// propagation/BFS logic below.
struct Adjacency {
    neighbors: Vec<Vec<(usize, f64)>>,
}

fn build_adjacency(entities: &[Entity], relationships: &[Relationship]) -> (Adjacency, HashMap<String, usize>) {
    let index_of: HashMap<String, usize> = entities
        .iter()
        .enumerate()
        .map(|(i, e)| (normalize_key(&e.title), i))
        .collect();

    let mut weights: BTreeMap<(usize, usize), f64> = BTreeMap::new();
    for rel in relationships {
        let (Some(&a), Some(&b)) = (
            index_of.get(&normalize_key(&rel.source)),
            index_of.get(&normalize_key(&rel.target)),
        ) else {
            continue;
        };
        if a == b {
            continue;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        *weights.entry(key).or_insert(0.0) += rel.weight;
    }

    let mut graph: UnGraph<(), f64> = UnGraph::with_capacity(entities.len(), weights.len());
    for _ in 0..entities.len() {
        graph.add_node(());
    }
    for (&(a, b), &w) in &weights {
        graph.add_edge(NodeIndex::new(a), NodeIndex::new(b), w);
    }

    let mut neighbors = vec![Vec::new(); entities.len()];
    for node in graph.node_indices() {
        for edge in graph.edges(node) {
            neighbors[node.index()].push((edge.target().index(), *edge.weight()));
        }
    }

    (Adjacency { neighbors }, index_of)
}

/// Each node starts as its own label; every iteration it adopts the
/// weighted-most-common label among its neighbors, breaking ties with the
/// seeded RNG. Isolated nodes are skipped and remain singleton labels.
fn fast_label_propagation(
    adjacency: &Adjacency,
    seed: u64,
    max_iterations: usize,
    cancellation: &Cancellation,
) -> Result<Vec<usize>> {
    let n = adjacency.neighbors.len();
    let mut labels: Vec<usize> = (0..n).collect();
    let mut rng = LcgRng::new(seed);

    for _ in 0..max_iterations {
        cancellation.check()?;
        let mut order: Vec<usize> = (0..n).collect();
        rng.shuffle(&mut order);
        let mut changed = false;

        for node in order {
            let edges = &adjacency.neighbors[node];
            if edges.is_empty() {
                continue;
            }
            let mut support: HashMap<usize, f64> = HashMap::new();
            for &(nbr, w) in edges {
                *support.entry(labels[nbr]).or_insert(0.0) += w;
            }
            let max_support = support.values().cloned().fold(f64::MIN, f64::max);
            let mut candidates: Vec<usize> = support
                .iter()
                .filter(|(_, &v)| (v - max_support).abs() < 1e-9)
                .map(|(&label, _)| label)
                .collect();
            candidates.sort_unstable();
            let chosen = if candidates.len() == 1 {
                candidates[0]
            } else {
                candidates[rng.next_below(candidates.len())]
            };
            if chosen != labels[node] {
                labels[node] = chosen;
                changed = true;
            }
        }

        if !changed {
            break;
        }
    }

    Ok(labels)
}

/// Seed-shuffled BFS flood-fill; the label value is the discovery order of
/// the component's root, so it is not contiguous across multiple roots.
fn connected_components(adjacency: &Adjacency, seed: u64) -> Vec<usize> {
    let n = adjacency.neighbors.len();
    let mut rng = LcgRng::new(seed);
    let mut order: Vec<usize> = (0..n).collect();
    rng.shuffle(&mut order);

    let mut visited = vec![false; n];
    let mut labels = vec![0usize; n];
    let mut next_label = 0usize;

    for start in order {
        if visited[start] {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited[start] = true;
        while let Some(u) = queue.pop_front() {
            labels[u] = next_label;
            for &(v, _) in &adjacency.neighbors[u] {
                if !visited[v] {
                    visited[v] = true;
                    queue.push_back(v);
                }
            }
        }
        next_label += 1;
    }

    labels
}

fn group_by_label(labels: &[usize]) -> Vec<Vec<usize>> {
    let mut groups: HashMap<usize, Vec<usize>> = HashMap::new();
    for (node, &label) in labels.iter().enumerate() {
        groups.entry(label).or_default().push(node);
    }
    let mut groups: Vec<Vec<usize>> = groups.into_values().collect();
    groups.sort_by_key(|g| *g.iter().min().unwrap());
    groups
}

/// Deterministic discovery order over a subset of nodes: BFS from the
/// smallest-index member, restarting from the smallest unvisited member
/// until the whole group is covered.
fn bfs_order(group: &[usize], adjacency: &Adjacency) -> Vec<usize> {
    let members: HashSet<usize> = group.iter().copied().collect();
    let mut sorted_group = group.to_vec();
    sorted_group.sort_unstable();

    let mut visited: HashSet<usize> = HashSet::new();
    let mut order = Vec::with_capacity(group.len());

    for &start in &sorted_group {
        if visited.contains(&start) {
            continue;
        }
        let mut queue = VecDeque::new();
        queue.push_back(start);
        visited.insert(start);
        while let Some(u) = queue.pop_front() {
            order.push(u);
            let mut neighbors: Vec<usize> = adjacency.neighbors[u]
                .iter()
                .map(|&(v, _)| v)
                .filter(|v| members.contains(v) && !visited.contains(v))
                .collect();
            neighbors.sort_unstable();
            for v in neighbors {
                visited.insert(v);
                queue.push_back(v);
            }
        }
    }

    order
}

fn split_group(group: Vec<usize>, max_cluster_size: usize, adjacency: &Adjacency) -> Vec<Vec<usize>> {
    if max_cluster_size == 0 || group.len() <= max_cluster_size {
        return vec![group];
    }
    let ordered = bfs_order(&group, adjacency);
    ordered
        .chunks(max_cluster_size)
        .map(|chunk| chunk.to_vec())
        .collect()
}

fn relationships_within(
    members: &HashSet<String>,
    relationships: &[Relationship],
) -> Vec<Relationship> {
    let mut matched: Vec<Relationship> = relationships
        .iter()
        .filter(|r| members.contains(&normalize_key(&r.source)) && members.contains(&normalize_key(&r.target)))
        .cloned()
        .collect();
    matched.sort_by(|a, b| a.id.cmp(&b.id));
    matched
}

pub fn detect_communities(
    entities: &[Entity],
    relationships: &[Relationship],
    config: &ClusterGraphConfig,
    cancellation: &Cancellation,
) -> Result<Vec<Community>> {
    if entities.is_empty() {
        return Ok(Vec::new());
    }

    let (adjacency, _index_of) = build_adjacency(entities, relationships);

    let labels = match config.algorithm {
        ClusterAlgorithm::FastLabelPropagation => {
            fast_label_propagation(&adjacency, config.seed, config.max_iterations, cancellation)?
        }
        ClusterAlgorithm::ConnectedComponents => connected_components(&adjacency, config.seed),
    };

    let mut groups = group_by_label(&labels);

    if config.use_largest_connected_component {
        let max_size = groups.iter().map(Vec::len).max().unwrap_or(0);
        groups.retain(|g| g.len() == max_size);
    }

    let mut clusters: Vec<Vec<usize>> = Vec::new();
    for group in groups {
        clusters.extend(split_group(group, config.max_cluster_size, &adjacency));
    }

    let period = Utc::now().date_naive().to_string();
    let mut communities = Vec::with_capacity(clusters.len());

    for (i, cluster) in clusters.into_iter().enumerate() {
        let human_readable_id = i + 1;
        let member_entities: Vec<&Entity> = cluster.iter().map(|&idx| &entities[idx]).collect();
        let member_titles: HashSet<String> = member_entities.iter().map(|e| normalize_key(&e.title)).collect();

        let relationship_rows = relationships_within(&member_titles, relationships);
        let relationship_ids: Vec<String> = relationship_rows.iter().map(|r| r.id.clone()).collect();

        let mut text_unit_ids: HashSet<String> = HashSet::new();
        for rel in &relationship_rows {
            text_unit_ids.extend(rel.text_unit_ids.iter().cloned());
        }
        if text_unit_ids.is_empty() {
            for entity in &member_entities {
                text_unit_ids.extend(entity.text_unit_ids.iter().cloned());
            }
        }
        let mut text_unit_ids: Vec<String> = text_unit_ids.into_iter().collect();
        text_unit_ids.sort();

        communities.push(Community {
            id: format!("community_{human_readable_id}"),
            human_readable_id,
            level: 0,
            parent_id: -1,
            children: Vec::new(),
            title: format!("Community {human_readable_id}"),
            entity_ids: member_entities.iter().map(|e| e.id.clone()).collect(),
            relationship_ids,
            text_unit_ids,
            period: period.clone(),
            size: cluster.len(),
        });
    }

    Ok(communities)
}
