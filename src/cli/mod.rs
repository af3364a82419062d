//! CLI command definitions and parsing
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tenant-rag",
    version,
    about = "Per-tenant hybrid keyword + vector retrieval",
    long_about = "tenant-rag indexes short documentation snippets per tenant, fusing BM25 keyword \
                  scores with embedding similarity, and answers ranked queries against them."
)]
pub struct Cli {
    /// Global config file path (defaults to ~/.config/tenant-rag/config.toml)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a document file for a tenant and run a hybrid query against it
    Query {
        /// Search query text
        query: String,

        /// File with one document per line (blank lines are skipped)
        #[arg(short, long, value_name = "FILE")]
        docs: PathBuf,

        /// Tenant to index the documents under
        #[arg(short, long, default_value = "1")]
        tenant: i64,

        /// Maximum number of results to return (defaults to retrieval.default_top_k)
        #[arg(short, long)]
        limit: Option<usize>,

        /// Print combined scores next to each result
        #[arg(long)]
        scores: bool,

        /// Show results in JSON format
        #[arg(long)]
        json: bool,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Validate configuration file
    Validate {
        /// Path to config file (defaults to standard location)
        #[arg(short, long)]
        file: Option<PathBuf>,
    },

    /// Initialize default configuration
    Init {
        /// Force overwrite existing config
        #[arg(short, long)]
        force: bool,
    },

    /// Print the default configuration path
    Path,
}

impl Cli {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_cli() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from([
            "tenant-rag",
            "query",
            "--docs",
            "docs.txt",
            "--tenant",
            "7",
            "-l",
            "3",
            "region amount",
        ])
        .unwrap();

        match cli.command {
            Commands::Query {
                query,
                tenant,
                limit,
                scores,
                ..
            } => {
                assert_eq!(query, "region amount");
                assert_eq!(tenant, 7);
                assert_eq!(limit, Some(3));
                assert!(!scores);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
