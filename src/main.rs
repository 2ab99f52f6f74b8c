//! clark - research-answering service
//!
//! Searches the web, reads the pages it finds and streams a cited answer
//! from the configured language model.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clark::api::{build_http_client, run_server};
use clark::extract::PageExtractor;
use clark::router::ModelRouter;
use clark::search::SearchRouter;
use clark::Config;

#[derive(Parser)]
#[command(name = "clark")]
#[command(about = "Research answers with web search and citations")]
#[command(version)]
struct Cli {
    /// Path to configuration file (environment-only when omitted)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Override listen address
        #[arg(short, long)]
        listen: Option<String>,
    },

    /// Validate configuration and show what is configured
    Check,

    /// Run a web search and print the results as JSON
    Search {
        query: String,

        #[arg(short, long)]
        max_results: Option<usize>,
    },

    /// Fetch a page and print the extracted article as JSON
    Scrape { url: String },
}

fn load_config(path: Option<&str>) -> anyhow::Result<Config> {
    let config = match path {
        Some(path) => Config::from_file_with_env(path)?,
        None => Config::from_env()?,
    };
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref())?;

    // Initialize tracing
    let default_filter = format!("clark={},tower_http=info", config.logging.level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if let Some(path) = &cli.config {
        tracing::info!(config = %path, "Loaded configuration file");
    }

    match cli.command {
        Commands::Serve { listen } => {
            if let Some(addr) = listen {
                tracing::info!(listen = %addr, "Override listen address");
                config.server.listen = addr;
            }
            run_server(config).await
        }

        Commands::Check => {
            let config = Arc::new(config);
            let router = ModelRouter::new(config.clone());
            let selection = router.resolve(None);

            println!("Configuration OK");
            println!("  deployment:    {}", config.deployment);
            println!("  listen:        {}", config.server.listen);
            println!(
                "  default model: {} ({} at {})",
                selection.model(),
                selection.provider(),
                selection.base_url()
            );
            println!(
                "  web search:    {}",
                if config.credentials.tavily_api_key.is_some() {
                    "tavily, duckduckgo fallback"
                } else {
                    "duckduckgo"
                }
            );
            println!("  credentials:");
            for (name, present) in config.credentials.presence() {
                println!("    {:<20} {}", name, if present { "set" } else { "unset" });
            }
            if config.deployment.is_production() && !config.credentials.has_model_provider() {
                println!("  warning: no model credentials; /api/chat will return setup guidance");
            }
            Ok(())
        }

        Commands::Search { query, max_results } => {
            let router = SearchRouter::new(&config, build_http_client()?);
            let response = router.search(&query, max_results).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }

        Commands::Scrape { url } => {
            let extractor = PageExtractor::new(
                build_http_client()?,
                Duration::from_secs(config.search.timeout_secs),
            );
            let page = extractor.extract(&url).await?;
            println!("{}", serde_json::to_string_pretty(&page)?);
            Ok(())
        }
    }
}
