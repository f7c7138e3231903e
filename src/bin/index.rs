//! `graphrag-index` — CLI front end (collaborator; spec §6/§9). The core
//! only ever sees the parsed [`GraphRagConfig`]; everything in this file is
//! wiring: argument parsing, logging setup, and constructing the storage
//! and service collaborators the library needs to run.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use graphrag_index::config::GraphRagConfig;
use graphrag_index::llm::{HashingEmbedder, NullChatClient};
use graphrag_index::pipeline::{RunContext, Services};
use graphrag_index::storage::fs::FsStorage;
use graphrag_index::storage::Storage;
use graphrag_index::workflows::{default_workflows, resumable_workflows};
use graphrag_index::{run_pipeline, GraphRagError};

#[derive(Parser, Debug)]
#[command(name = "graphrag-index", about = "Offline knowledge-graph indexing pipeline")]
struct Args {
    /// Root directory the run is scoped to: config, cache and output all
    /// live underneath it unless overridden.
    #[arg(long)]
    root: PathBuf,

    /// Path to a YAML config file (default settings otherwise).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Resume a previous run: skip the longest already-completed prefix
    /// of workflows found on disk. The timestamp is accepted for
    /// compatibility with multi-run layouts but a single `output/`
    /// directory is used regardless of its value.
    #[arg(long)]
    resume: Option<String>,

    /// Table formats to emit alongside the native JSON tables.
    #[arg(long, value_delimiter = ',', default_value = "json")]
    emit: Vec<String>,

    /// Disable the on-disk LLM response cache.
    #[arg(long)]
    no_cache: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let text = std::fs::read_to_string(path)?;
            GraphRagConfig::load_yaml(&text)?
        }
        None => GraphRagConfig::default(),
    };

    if let Some(resume) = &args.resume {
        tracing::info!(resume, "resuming run");
    }

    let output_storage: Box<dyn Storage> = Box::new(FsStorage::new(args.root.join("output")));

    let mut context = RunContext::new(output_storage);
    context.input_storage = Box::new(FsStorage::new(args.root.join(&config.input.storage.base_dir)));
    context.cache = if args.no_cache {
        None
    } else {
        Some(Box::new(FsStorage::new(args.root.join("cache"))))
    };

    let mut services = Services::default();
    services
        .embedding_generators
        .insert("default".to_string(), Arc::new(HashingEmbedder::default()));
    services
        .chat_clients
        .insert("default".to_string(), Arc::new(NullChatClient));
    context.services = services;

    let workflows = if args.resume.is_some() {
        resumable_workflows(context.output_storage.as_ref()).await
    } else {
        default_workflows()
    };

    run_pipeline(&workflows, &config, &context).await?;

    emit_tables(context.output_storage.as_ref(), &args.emit).await?;

    let stats = context.stats.lock().unwrap();
    tracing::info!(
        documents = stats.num_documents,
        text_units = stats.num_text_units,
        "run complete"
    );

    Ok(())
}

const TABLES: &[&str] = &[
    "documents",
    "text_units",
    "entities",
    "relationships",
    "communities",
    "community_reports",
];

/// JSON tables are always the source of truth (written by each workflow);
/// `--emit csv` additionally flattens each table to a sibling `.csv` file.
/// `parquet` is accepted but not yet produced — no Arrow/Parquet crate is
/// part of the dependency stack, so we log rather than fabricate one.
async fn emit_tables(storage: &dyn Storage, formats: &[String]) -> anyhow::Result<()> {
    for format in formats {
        match format.as_str() {
            "json" => {}
            "csv" => {
                for table in TABLES {
                    if let Some(bytes) = storage.get(&format!("{table}.json")).await? {
                        let rows: Vec<serde_json::Value> = serde_json::from_slice(&bytes)?;
                        let csv_bytes = rows_to_csv(&rows)?;
                        storage.set(&format!("{table}.csv"), csv_bytes).await?;
                    }
                }
            }
            "parquet" => {
                tracing::warn!("--emit parquet is not supported; JSON tables remain authoritative");
            }
            other => {
                return Err(GraphRagError::Configuration(format!("unknown --emit format '{other}'")).into());
            }
        }
    }
    Ok(())
}

fn rows_to_csv(rows: &[serde_json::Value]) -> anyhow::Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    let Some(first) = rows.first() else {
        return Ok(writer.into_inner()?);
    };
    let Some(obj) = first.as_object() else {
        return Ok(writer.into_inner()?);
    };
    let headers: Vec<&String> = obj.keys().collect();
    writer.write_record(headers.iter().map(|h| h.as_str()))?;
    for row in rows {
        let obj = row.as_object().cloned().unwrap_or_default();
        let record: Vec<String> = headers
            .iter()
            .map(|h| obj.get(*h).map(flatten_value).unwrap_or_default())
            .collect();
        writer.write_record(&record)?;
    }
    Ok(writer.into_inner()?)
}

fn flatten_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => String::new(),
        serde_json::Value::Array(items) => items
            .iter()
            .map(flatten_value)
            .collect::<Vec<_>>()
            .join(";"),
        other => other.to_string(),
    }
}
