use async_trait::async_trait;

use crate::config::GraphRagConfig;
use crate::error::Result;
use crate::heuristics;
use crate::model::TextUnit;
use crate::pipeline::{RunContext, Workflow};
use crate::storage::{load_table, write_table};

pub struct HeuristicMaintenance;

#[async_trait]
impl Workflow for HeuristicMaintenance {
    fn name(&self) -> &'static str {
        "heuristic_maintenance"
    }

    async fn run(&self, config: &GraphRagConfig, context: &RunContext) -> Result<Option<u64>> {
        let units: Vec<TextUnit> = load_table(context.output_storage.as_ref(), "text_units").await?;

        let embedder = context
            .services
            .resolve_embedder(&config.heuristics.embedding_model_id);
        let survivors = heuristics::maintain_text_units(
            units,
            &config.heuristics,
            embedder.as_deref(),
            &context.cancellation,
        )
        .await?;

        context.stats.lock().unwrap().num_text_units = survivors.len();
        write_table(context.output_storage.as_ref(), "text_units", &survivors).await?;
        Ok(None)
    }
}
