//! LLM-driven graph extraction (spec §4.8): per-text-unit chat dispatch,
//! JSON parsing, and order-preserving entity/relationship aggregation.

pub mod aggregator;
pub mod extractor;

pub use extractor::extract_graph;
