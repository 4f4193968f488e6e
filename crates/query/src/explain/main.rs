//! Query Explain
//!
//! Loads a resource catalog, builds the query plan of one operation and
//! prints it together with the SQL it compiles to. With `--data`, the plan is
//! also executed against an in-memory store seeded from a JSON file.
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `QUERY_CATALOG` | | Catalog file (JSON) |
//! | `QUERY_DATA` | | Documents file: `{"Book": [{...}, ...]}` |
//! | `QUERY_LOG_LEVEL` | warn | Log level |

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde_json::Value;
use tracing::info;

use tessera_query::backends::{MemoryBackend, SqlQueryBuilder};
use tessera_query::core::{Operation, OperationKind, PlannedQuery, QueryPipeline, RequestContext};
use tessera_query::metadata::QueryConfig;

/// Command line options.
#[derive(Debug, Clone, Parser)]
#[command(name = "query-explain")]
#[command(about = "Prints the query plan and SQL of a catalog operation")]
struct ExplainConfig {
    /// Catalog file (JSON).
    #[arg(short, long, env = "QUERY_CATALOG")]
    catalog: PathBuf,

    /// Resource name.
    #[arg(short, long)]
    resource: String,

    /// Operation name.
    #[arg(short, long)]
    operation: String,

    /// Raw identifier, required for item operations.
    #[arg(long)]
    id: Option<String>,

    /// Query string, without the leading '?'.
    #[arg(short, long, default_value = "")]
    query: String,

    /// Documents file to execute the plan against.
    #[arg(long, env = "QUERY_DATA")]
    data: Option<PathBuf>,

    /// SQL table holding the documents.
    #[arg(long, default_value = SqlQueryBuilder::DEFAULT_TABLE)]
    table: String,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long, env = "QUERY_LOG_LEVEL", default_value = "warn")]
    log_level: String,
}

fn init_logging(level: &str) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tessera_query={},query_explain={}", level, level)));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_documents(path: &Path, backend: &MemoryBackend) -> anyhow::Result<()> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading documents from {}", path.display()))?;
    let documents: HashMap<String, Vec<Value>> =
        serde_json::from_str(&json).context("documents file must map resources to arrays")?;
    for (resource, docs) in documents {
        info!(resource = %resource, count = docs.len(), "Seeding documents");
        backend.extend(resource, docs);
    }
    Ok(())
}

fn print_plan(planned: &PlannedQuery, builder: &SqlQueryBuilder) -> anyhow::Result<()> {
    if let Some(identifier) = &planned.identifier {
        println!("identifier: {}", identifier);
    }
    println!("extensions: {}", planned.applied.join(", "));
    println!("plan:       {}", planned.plan);
    println!(
        "result:     {}",
        planned.result_owner().unwrap_or("executor")
    );

    let select = builder.build_select(&planned.plan)?;
    println!("sql:        {}", select.sql);
    for (i, param) in select.params.iter().enumerate() {
        println!("  ?{} = {:?}", i + 1, param);
    }
    if planned.result_owner().is_some() {
        let count = builder.build_count(&planned.plan.for_count())?;
        println!("count sql:  {}", count.sql);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ExplainConfig::parse();
    init_logging(&config.log_level);

    let catalog = QueryConfig::from_path(&config.catalog)?;
    let backend = Arc::new(MemoryBackend::new());
    if let Some(data) = &config.data {
        load_documents(data, &backend)?;
    }
    let pipeline = QueryPipeline::from_config(catalog, backend.clone())?;

    let resource = pipeline.metadata().get(&config.resource)?;
    let kind = resource
        .operation(&config.operation)
        .map(|op| op.kind())
        .with_context(|| {
            format!(
                "resource '{}' has no operation '{}'",
                config.resource, config.operation
            )
        })?;
    let operation = Operation::new(&config.resource, &config.operation, kind);
    let context = RequestContext::from_query(&config.query);
    let builder = SqlQueryBuilder::new(&config.table);

    for violation in pipeline.validate_parameters(&operation, &context)? {
        eprintln!("parameter {}: {}", violation.parameter, violation.message);
    }

    let output = match kind {
        OperationKind::Collection => {
            print_plan(&pipeline.plan_collection(&operation, &context)?, &builder)?;
            match &config.data {
                Some(_) => Some(pipeline.collection(&operation, &context).await?),
                None => None,
            }
        }
        OperationKind::Item => {
            let id = config
                .id
                .as_deref()
                .context("item operations need --id")?;
            print_plan(&pipeline.plan_item(&operation, id, &context)?, &builder)?;
            match &config.data {
                Some(_) => Some(pipeline.item(&operation, id, &context).await?),
                None => None,
            }
        }
    };

    if let Some(output) = output {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }

    Ok(())
}
