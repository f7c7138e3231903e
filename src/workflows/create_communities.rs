use async_trait::async_trait;

use crate::community;
use crate::config::GraphRagConfig;
use crate::error::Result;
use crate::model::{Entity, Relationship};
use crate::pipeline::{RunContext, Workflow};
use crate::storage::{load_table, write_table};

pub struct CreateCommunities;

#[async_trait]
impl Workflow for CreateCommunities {
    fn name(&self) -> &'static str {
        "create_communities"
    }

    async fn run(&self, config: &GraphRagConfig, context: &RunContext) -> Result<Option<u64>> {
        let entities: Vec<Entity> = load_table(context.output_storage.as_ref(), "entities").await?;
        let relationships: Vec<Relationship> =
            load_table(context.output_storage.as_ref(), "relationships").await?;

        let communities = community::detect_communities(
            &entities,
            &relationships,
            &config.cluster_graph,
            &context.cancellation,
        )?;

        write_table(context.output_storage.as_ref(), "communities", &communities).await?;
        Ok(None)
    }
}
