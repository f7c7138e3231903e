use async_trait::async_trait;

use crate::chunker;
use crate::config::GraphRagConfig;
use crate::error::Result;
use crate::model::Document;
use crate::pipeline::{RunContext, Workflow};
use crate::storage::{load_table, write_table};

pub struct CreateBaseTextUnits;

#[async_trait]
impl Workflow for CreateBaseTextUnits {
    fn name(&self) -> &'static str {
        "create_base_text_units"
    }

    async fn run(&self, config: &GraphRagConfig, context: &RunContext) -> Result<Option<u64>> {
        let documents: Vec<Document> = load_table(context.output_storage.as_ref(), "documents").await?;
        let units = chunker::chunk_documents(&documents, &config.chunks)?;

        context.stats.lock().unwrap().num_text_units = units.len();
        write_table(context.output_storage.as_ref(), "text_units", &units).await?;
        Ok(None)
    }
}
