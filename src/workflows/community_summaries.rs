use async_trait::async_trait;

use crate::community;
use crate::config::GraphRagConfig;
use crate::error::Result;
use crate::model::{Community, Entity};
use crate::pipeline::{RunContext, Workflow};
use crate::storage::{load_table, write_table};

pub struct CommunitySummaries;

#[async_trait]
impl Workflow for CommunitySummaries {
    fn name(&self) -> &'static str {
        "community_summaries"
    }

    async fn run(&self, config: &GraphRagConfig, context: &RunContext) -> Result<Option<u64>> {
        let communities: Vec<Community> = load_table(context.output_storage.as_ref(), "communities").await?;
        let entities: Vec<Entity> = load_table(context.output_storage.as_ref(), "entities").await?;

        let chat_client = context.services.resolve_chat(&config.community_reports.model_id);

        let reports = community::summarize_communities(
            &communities,
            &entities,
            &config.community_reports,
            chat_client.as_deref(),
            &config.root_dir,
            &context.cancellation,
        )
        .await?;

        write_table(context.output_storage.as_ref(), "community_reports", &reports).await?;
        Ok(None)
    }
}
