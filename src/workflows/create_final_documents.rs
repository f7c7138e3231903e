use async_trait::async_trait;

use crate::config::GraphRagConfig;
use crate::error::Result;
use crate::final_documents;
use crate::model::{Document, TextUnit};
use crate::pipeline::{RunContext, Workflow};
use crate::storage::{load_table, write_table};

pub struct CreateFinalDocuments;

#[async_trait]
impl Workflow for CreateFinalDocuments {
    fn name(&self) -> &'static str {
        "create_final_documents"
    }

    async fn run(&self, _config: &GraphRagConfig, context: &RunContext) -> Result<Option<u64>> {
        let documents: Vec<Document> = load_table(context.output_storage.as_ref(), "documents").await?;
        let text_units: Vec<TextUnit> = load_table(context.output_storage.as_ref(), "text_units").await?;

        let linked = final_documents::link_final_documents(documents, &text_units);

        write_table(context.output_storage.as_ref(), "documents", &linked).await?;
        Ok(None)
    }
}
