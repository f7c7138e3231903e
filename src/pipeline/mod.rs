//! Pipeline runtime (spec §4.4). A workflow is a function
//! `(config, context) -> result`; the registry is an ordered list of named
//! workflows driven by [`run_pipeline`]. Downstream workflows depend only
//! on table names written to `context.output_storage`, so any prefix can be
//! resumed from previously written artifacts.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::Value;

use crate::config::GraphRagConfig;
use crate::error::{GraphRagError, Result};
use crate::llm::{ChatClient, EmbeddingGenerator};
use crate::storage::Storage;

/// The built-in pipeline order (spec §4.4).
pub const BUILTIN_ORDER: &[&str] = &[
    "load_input_documents",
    "create_base_text_units",
    "heuristic_maintenance",
    "extract_graph",
    "create_communities",
    "community_summaries",
    "create_final_documents",
];

/// Cooperative cancellation token, checked between suspension points
/// (spec §5): before each LLM dispatch, between label-propagation
/// iterations, between storage enumerations, between summarization calls.
#[derive(Clone, Default)]
pub struct Cancellation {
    flag: Arc<AtomicBool>,
}

impl Cancellation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(GraphRagError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Single-writer run statistics; workflow code reports through the
/// runtime rather than mutating this directly (spec §4.4 point 4).
#[derive(Debug, Default, Clone)]
pub struct RunStats {
    pub num_documents: usize,
    pub num_text_units: usize,
    pub workflow_durations: HashMap<String, Duration>,
    pub workflow_token_costs: HashMap<String, u64>,
}

/// Callbacks invoked around each workflow's execution.
pub trait WorkflowCallbacks: Send + Sync {
    fn workflow_started(&self, _name: &str) {}
    fn workflow_completed(&self, _name: &str, _error: Option<&str>) {}
}

/// Default callbacks implementation that logs via `tracing`.
#[derive(Default)]
pub struct TracingCallbacks;

impl WorkflowCallbacks for TracingCallbacks {
    fn workflow_started(&self, name: &str) {
        tracing::info!(workflow = name, "workflow started");
    }

    fn workflow_completed(&self, name: &str, error: Option<&str>) {
        match error {
            Some(e) => tracing::warn!(workflow = name, error = e, "workflow failed"),
            None => tracing::info!(workflow = name, "workflow completed"),
        }
    }
}

/// Keyed service resolution (spec §9): model-id → chat client, embedding
/// model-id → embedding generator. The core only sees the resolved traits.
#[derive(Clone, Default)]
pub struct Services {
    pub chat_clients: HashMap<String, Arc<dyn ChatClient>>,
    pub embedding_generators: HashMap<String, Arc<dyn EmbeddingGenerator>>,
}

impl Services {
    pub fn resolve_chat(&self, model_id: &str) -> Option<Arc<dyn ChatClient>> {
        self.chat_clients
            .get(model_id)
            .or_else(|| self.chat_clients.get("default"))
            .cloned()
    }

    pub fn resolve_embedder(&self, model_id: &str) -> Option<Arc<dyn EmbeddingGenerator>> {
        self.embedding_generators
            .get(model_id)
            .or_else(|| self.embedding_generators.get("default"))
            .cloned()
    }
}

/// Per-run context passed to every workflow (spec §4.4 point 3).
pub struct RunContext {
    pub input_storage: Box<dyn Storage>,
    pub output_storage: Box<dyn Storage>,
    pub previous_storage: Option<Box<dyn Storage>>,
    pub cache: Option<Box<dyn Storage>>,
    pub callbacks: Arc<dyn WorkflowCallbacks>,
    pub cancellation: Cancellation,
    pub stats: Mutex<RunStats>,
    pub state: Mutex<HashMap<String, Value>>,
    pub services: Services,
    pub items: Mutex<HashMap<String, Value>>,
}

impl RunContext {
    pub fn new(output_storage: Box<dyn Storage>) -> Self {
        let input_storage = output_storage.create_child("input_mirror");
        Self {
            input_storage,
            output_storage,
            previous_storage: None,
            cache: None,
            callbacks: Arc::new(TracingCallbacks),
            cancellation: Cancellation::new(),
            stats: Mutex::new(RunStats::default()),
            state: Mutex::new(HashMap::new()),
            services: Services::default(),
            items: Mutex::new(HashMap::new()),
        }
    }

    fn record(&self, name: &str, elapsed: Duration, token_cost: Option<u64>) {
        let mut stats = self.stats.lock().unwrap();
        stats
            .workflow_durations
            .insert(name.to_string(), elapsed);
        if let Some(cost) = token_cost {
            *stats
                .workflow_token_costs
                .entry(name.to_string())
                .or_insert(0) += cost;
        }
    }
}

/// A named, registered pipeline stage.
#[async_trait]
pub trait Workflow: Send + Sync {
    fn name(&self) -> &'static str;
    async fn run(&self, config: &GraphRagConfig, context: &RunContext) -> Result<Option<u64>>;
}

/// Run each workflow in declared order. On error the run stops and the
/// error is surfaced; prior workflow outputs remain on `output_storage`
/// (spec §4.4 point 5).
pub async fn run_pipeline(
    workflows: &[Box<dyn Workflow>],
    config: &GraphRagConfig,
    context: &RunContext,
) -> Result<()> {
    for workflow in workflows {
        context.cancellation.check()?;
        context.callbacks.workflow_started(workflow.name());
        let start = Instant::now();
        let result = workflow.run(config, context).await;
        let elapsed = start.elapsed();

        match &result {
            Ok(token_cost) => {
                context.record(workflow.name(), elapsed, *token_cost);
                context.callbacks.workflow_completed(workflow.name(), None);
            }
            Err(e) => {
                context.record(workflow.name(), elapsed, None);
                context
                    .callbacks
                    .workflow_completed(workflow.name(), Some(&e.to_string()));
            }
        }

        result?;
    }
    Ok(())
}

/// A resume run skips workflows whose output table already exists
/// (spec §4.4 point 5 / Open Question 1 — presence-based, not hash-based).
pub async fn output_table_exists(storage: &dyn Storage, table_name: &str) -> bool {
    storage
        .has(&format!("{table_name}.json"))
        .await
        .unwrap_or(false)
}
