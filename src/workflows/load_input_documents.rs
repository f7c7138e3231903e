use async_trait::async_trait;

use crate::config::GraphRagConfig;
use crate::error::Result;
use crate::input;
use crate::pipeline::{RunContext, Workflow};
use crate::storage::write_table;

pub struct LoadInputDocuments;

#[async_trait]
impl Workflow for LoadInputDocuments {
    fn name(&self) -> &'static str {
        "load_input_documents"
    }

    async fn run(&self, config: &GraphRagConfig, context: &RunContext) -> Result<Option<u64>> {
        let documents = input::load_documents(
            context.input_storage.as_ref(),
            &config.input,
            &context.cancellation,
        )
        .await?;

        context.stats.lock().unwrap().num_documents = documents.len();
        write_table(context.output_storage.as_ref(), "documents", &documents).await?;
        Ok(None)
    }
}
