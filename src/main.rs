use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::warn;

use sevy_core::cache::CounterCache;
use sevy_core::config::Config;
use sevy_core::engine::ChatEngine;
use sevy_core::provider::openai::OpenAiProvider;
use sevy_core::service::http::{serve, AppState};
use sevy_core::store::memory::MemoryCounterStore;
use sevy_core::store::mongo::MongoCounterStore;
use sevy_core::store::CounterStore;

#[derive(Parser)]
#[command(
    name = "sevy-gateway",
    about = "SEVY AI chat gateway",
    version = sevy_core::VERSION,
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP gateway
    Serve {
        /// Bind address
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Bind port
        #[arg(short, long, default_value_t = 5000)]
        port: u16,
    },
    /// Print the current counter values and exit
    Counters,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sevy_core=info".parse()?)
                .add_directive("sevy_gateway=info".parse()?),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        Commands::Serve { host, port } => {
            let api_key = config.openai_api_key.clone().ok_or_else(|| {
                anyhow::anyhow!("No API key configured. Set OPENAI_API_KEY in .env")
            })?;
            let provider = Arc::new(OpenAiProvider::new(
                api_key,
                config.api_base.clone(),
                config.model.clone(),
            ));

            let store = build_store(&config).await;
            let engine = ChatEngine::new(provider, store.clone(), &config);
            let state = Arc::new(AppState {
                engine,
                store,
                cache: CounterCache::new(Duration::from_secs(config.cache_ttl_secs)),
                history_limit: config.history_limit,
            });

            serve(&format!("{host}:{port}"), state).await
        }
        Commands::Counters => {
            let store = build_store(&config).await;
            let cache = CounterCache::new(Duration::ZERO);
            let snapshot = cache.snapshot(store.as_ref()).await;
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
    }
}

/// Use MongoDB when credentials are present, otherwise fall back to the
/// in-memory store so local development works without a cluster.
async fn build_store(config: &Config) -> Arc<dyn CounterStore> {
    if config.mongo.is_configured() {
        match MongoCounterStore::connect(&config.mongo).await {
            Ok(store) => return Arc::new(store),
            Err(e) => warn!("MongoDB unavailable, counters served in-memory: {e}"),
        }
    } else {
        warn!("MongoDB credentials not set, counters served in-memory");
    }
    Arc::new(MemoryCounterStore::new())
}
