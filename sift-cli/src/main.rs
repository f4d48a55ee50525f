use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sift::{Config, HttpSearchClient, ResultContext, SearchFacade};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(about = "Sift CLI - run and preview grouped Elasticsearch queries")]
#[command(version)]
struct Cli {
    /// Config file
    #[arg(short, long, default_value = "sift.toml", global = true)]
    config: PathBuf,

    /// Index name or pattern, comma-separated; all indices when omitted
    #[arg(short, long, global = true)]
    index: Option<String>,

    /// Print the request that would be sent instead of running it
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// One page of documents from a search body
    List {
        /// JSON search body
        #[arg(short, long)]
        body: PathBuf,
    },

    /// Document counts per bucket of one aggregation
    GroupBy {
        /// JSON query
        #[arg(short, long)]
        query: Option<PathBuf>,

        /// Aggregation as <name>=<json file>
        #[arg(short, long, value_parser = commands::parse_key_val)]
        aggregation: (String, String),
    },

    /// Document counts per distinct combination of fields
    GroupAll {
        /// JSON query
        #[arg(short, long)]
        query: Option<PathBuf>,

        /// Composite source as <name>=<field>, repeatable
        #[arg(short, long = "source", value_parser = commands::parse_key_val, required = true)]
        sources: Vec<(String, String)>,
    },

    /// Top documents per value of a field
    TopN {
        /// JSON query
        #[arg(short, long)]
        query: Option<PathBuf>,

        /// Field to group on
        #[arg(short, long)]
        field: String,

        /// Number of groups
        #[arg(long, default_value = "10")]
        groups: usize,

        /// Documents per group
        #[arg(long, default_value = "3")]
        per_group: usize,
    },

    /// Top documents per collapse key from a search body with `collapse`
    Collapse {
        /// JSON search body
        #[arg(short, long)]
        body: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config from {:?}", cli.config))?;

    let log_format = std::env::var("LOG_FORMAT")
        .unwrap_or_else(|_| config.observability.log_format.clone());
    let json_logs = log_format == "json";
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| config.observability.log_level.clone()),
        ))
        .with(json_logs.then(|| tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr)))
        .with((!json_logs).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr)))
        .init();

    if let Err(err) = run(cli, config).await {
        match err.downcast_ref::<sift::Error>() {
            Some(e) => tracing::error!(kind = %e.kind(), "{}", e),
            None => tracing::error!("{:#}", err),
        }
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli, config: Config) -> Result<()> {
    let client = HttpSearchClient::new(config.engine.clone())?;
    tracing::debug!(url = %client.base_url(), "engine client ready");
    let facade = SearchFacade::new(Arc::new(client), config.search.clone());

    let mut ctx = if cli.dry_run {
        ResultContext::debug()
    } else {
        ResultContext::new()
    };
    let index = cli.index.as_deref();

    let output = match cli.command {
        Commands::List { body } => commands::run_list(&facade, index, &body, &mut ctx).await?,
        Commands::GroupBy { query, aggregation } => {
            commands::run_group_by(&facade, index, query.as_deref(), aggregation, &mut ctx).await?
        }
        Commands::GroupAll { query, sources } => {
            commands::run_group_all(&facade, index, query.as_deref(), sources, &mut ctx).await?
        }
        Commands::TopN {
            query,
            field,
            groups,
            per_group,
        } => {
            commands::run_top_n(&facade, index, query.as_deref(), &field, groups, per_group, &mut ctx)
                .await?
        }
        Commands::Collapse { body } => {
            commands::run_collapse(&facade, index, &body, &mut ctx).await?
        }
    };

    let printed = match ctx.into_captured() {
        Some(request) => request,
        None => output,
    };
    println!("{}", serde_json::to_string_pretty(&printed)?);

    Ok(())
}
