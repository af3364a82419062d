use anyhow::Context;
use std::path::{Path, PathBuf};
use tenant_rag::cli::{Cli, Commands, ConfigAction};
use tenant_rag::config::Config;
use tenant_rag::error::{RagError, Result};
use tenant_rag::IndexStore;

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Query {
            query,
            docs,
            tenant,
            limit,
            scores,
            json,
        } => {
            cmd_query(cli.config, &query, &docs, tenant, limit, scores, json)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose {
        "tenant_rag=debug"
    } else {
        "tenant_rag=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn cmd_query(
    config_path: Option<PathBuf>,
    query: &str,
    docs: &Path,
    tenant: i64,
    limit: Option<usize>,
    scores: bool,
    json: bool,
) -> Result<()> {
    let config = Config::load_or_default(config_path)?;
    let documents = read_documents(docs)?;
    tracing::info!("Loaded {} documents from {}", documents.len(), docs.display());

    let store = IndexStore::from_config(&config)?;
    store.build(tenant, documents)?;

    let top_k = limit.unwrap_or_else(|| store.default_top_k());
    let results = store.query_with_scores(tenant, query, top_k)?;

    if json {
        let output = serde_json::to_string_pretty(&results).map_err(|e| RagError::Json {
            source: e,
            context: "Failed to serialize results".to_string(),
        })?;
        println!("{}", output);
        return Ok(());
    }

    if results.is_empty() {
        println!("No matching documents");
        return Ok(());
    }

    for (rank, doc) in results.iter().enumerate() {
        if scores {
            println!("{:>2}. [{:.4}] {}", rank + 1, doc.score, doc.preview(200));
        } else {
            println!("{:>2}. {}", rank + 1, doc.preview(200));
        }
    }

    Ok(())
}

fn read_documents(path: &Path) -> anyhow::Result<Vec<String>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read documents file: {:?}", path))?;

    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load_or_default(config_path)?;
            let json = serde_json::to_string_pretty(&config).map_err(|e| RagError::Json {
                source: e,
                context: "Failed to serialize config".to_string(),
            })?;
            println!("{}", json);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| RagError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", Config::default_path()?.display());
        }
    }

    Ok(())
}
