use async_trait::async_trait;

use crate::config::GraphRagConfig;
use crate::error::{GraphRagError, Result};
use crate::extract;
use crate::finalize;
use crate::graph_heuristics;
use crate::model::TextUnit;
use crate::pipeline::{RunContext, Workflow};
use crate::storage::{load_table, write_table};

pub struct ExtractGraph;

#[async_trait]
impl Workflow for ExtractGraph {
    fn name(&self) -> &'static str {
        "extract_graph"
    }

    async fn run(&self, config: &GraphRagConfig, context: &RunContext) -> Result<Option<u64>> {
        let units: Vec<TextUnit> = load_table(context.output_storage.as_ref(), "text_units").await?;

        let chat_client = context
            .services
            .resolve_chat(&config.extract_graph.model_id)
            .ok_or_else(|| {
                GraphRagError::Configuration(format!(
                    "no chat client resolved for model_id '{}'",
                    config.extract_graph.model_id
                ))
            })?;

        let (entity_seeds, relationship_seeds) = extract::extract_graph(
            &units,
            &config.extract_graph,
            chat_client.as_ref(),
            &config.root_dir,
            &context.cancellation,
        )
        .await?;

        let (entity_seeds, relationship_seeds) =
            graph_heuristics::apply_heuristics(entity_seeds, relationship_seeds, &config.heuristics);

        let (entities, relationships) = finalize::finalize_graph(entity_seeds, relationship_seeds)?;

        write_table(context.output_storage.as_ref(), "entities", &entities).await?;
        write_table(context.output_storage.as_ref(), "relationships", &relationships).await?;
        Ok(None)
    }
}
