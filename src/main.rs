use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hero_meta::api::{build_router, state::AppState};
use hero_meta::chart::Metric;
use hero_meta::config::AppConfig;
use hero_meta::dashboard::{DashboardController, HttpStatsApi, QueryState};
use hero_meta::fetch::Fetcher;
use hero_meta::models::{HeroDirectory, HeroId, RankFilter, Tier};
use hero_meta::parse_duration;
use hero_meta::storage::{DocumentStore, JsonFileStore, JsonlDocumentStore};
use hero_meta::sync::HeroSync;

#[derive(Parser)]
#[command(name = "hero-meta")]
#[command(about = "Hero statistics sync and search dashboard")]
#[command(version)]
struct Cli {
    /// Path to configuration file
    #[arg(long, default_value = "./config.toml")]
    config: PathBuf,

    /// Data directory path (overrides the config file)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Overwrite the hero collection from the upstream dataset
    Sync {
        /// Run sync once and exit
        #[arg(long)]
        once: bool,

        /// Run continuously at interval
        #[arg(long)]
        watch: bool,

        /// Interval for watch mode (e.g., "6h", "30m")
        #[arg(long)]
        interval: Option<String>,
    },

    /// Start the API server
    Serve {
        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u16>,
    },

    /// Look up a hero and print the dashboard view
    Search {
        /// Hero id, name (or part of one), or URL fragment such as "#Yi-Sun%2Dshin"
        hero: String,

        /// Rank tier, by level (1-8) or name
        #[arg(long)]
        tier: Option<Tier>,

        /// Graph metric: win, ban or pick
        #[arg(long, default_value = "win")]
        metric: Metric,
    },

    /// Print the leaderboard for a rank
    Leaderboard {
        /// "Overall" or a tier name
        #[arg(long, default_value = "Overall")]
        rank: RankFilter,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load_or_default(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if let Some(level) = cli.log_level {
        config.log_level = level;
    }

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(cli.json_logs.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!cli.json_logs).then(tracing_subscriber::fmt::layer))
        .init();

    tracing::info!("Starting hero-meta v{}", env!("CARGO_PKG_VERSION"));

    let storage = config.storage();

    match cli.command {
        Commands::Sync {
            once,
            watch,
            interval,
        } => {
            let mut sync_config = config.sync_config()?;
            if let Some(s) = interval {
                sync_config.interval =
                    parse_duration(&s).with_context(|| format!("invalid interval: {}", s))?;
            }

            let fetcher = Fetcher::new(config.fetcher_config()?)?;
            let store: Arc<dyn DocumentStore> = Arc::new(JsonlDocumentStore::new(storage));
            let sync = Arc::new(HeroSync::new(sync_config, fetcher, store));

            if watch {
                tokio::select! {
                    _ = sync.clone().run_periodic() => {}
                    _ = tokio::signal::ctrl_c() => {
                        tracing::info!("Interrupted, stopping sync");
                        sync.cancel().await;
                    }
                }
            } else {
                if !once {
                    tracing::info!("No mode given, running once");
                }
                let response = sync.run_once().await;
                println!("{}", serde_json::to_string_pretty(&response)?);
                if !response.success {
                    bail!(response.message);
                }
            }
        }
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);

            let fetcher = Fetcher::new(config.fetcher_config()?)?;
            let store: Arc<dyn DocumentStore> = Arc::new(JsonlDocumentStore::new(storage));
            let sync = Arc::new(HeroSync::new(config.sync_config()?, fetcher, store));

            let app = build_router(AppState::new(sync), &config.server.cors_origin);
            let addr = format!("{}:{}", host, port);
            let listener = tokio::net::TcpListener::bind(&addr).await?;
            tracing::info!("API: http://{}", addr);
            axum::serve(listener, app).await?;
        }
        Commands::Search { hero, tier, metric } => {
            let store = JsonlDocumentStore::new(storage.clone());
            let directory =
                HeroDirectory::load(&config.heroes_path(), &store, &config.sync.collection).await?;
            let api = Arc::new(HttpStatsApi::new(Fetcher::new(config.fetcher_config()?)?));
            let local = Arc::new(JsonFileStore::new(storage.local_store_path()));
            let tier = tier.unwrap_or(config.dashboard.default_tier);

            let mut dashboard = DashboardController::new(api, local, directory, tier)?;

            if hero.starts_with('#') {
                if dashboard.load_from_fragment(&hero).is_none() {
                    bail!("No hero matches fragment {}", hero);
                }
            } else {
                let id = match hero.parse::<HeroId>() {
                    Ok(id) => id,
                    Err(_) => resolve_name(dashboard.directory(), &hero)?,
                };
                dashboard.select_hero(id)?;
            }

            let status = dashboard.refresh().await;
            if let Some(err) = &status.error {
                tracing::warn!("{}", err);
            }

            if let Some(fragment) = dashboard.fragment() {
                tracing::info!("Fragment: {}", fragment);
            }
            println!("{}", serde_json::to_string_pretty(&dashboard.view(metric))?);
        }
        Commands::Leaderboard { rank } => {
            let api = Arc::new(HttpStatsApi::new(Fetcher::new(config.fetcher_config()?)?));
            let local = Arc::new(JsonFileStore::new(storage.local_store_path()));
            let mut dashboard = DashboardController::new(
                api,
                local,
                HeroDirectory::default(),
                config.dashboard.default_tier,
            )?;

            match dashboard.leaderboard(rank).await {
                QueryState::Ready(data) => println!("{}", serde_json::to_string_pretty(&data)?),
                QueryState::Failed(e) => bail!(e),
                QueryState::Loading => bail!("Leaderboard did not complete"),
            }
        }
    }

    Ok(())
}

/// Exact name first, then a unique substring match.
fn resolve_name(directory: &HeroDirectory, query: &str) -> Result<HeroId> {
    if let Some(id) = directory.id_by_name(query) {
        return Ok(id);
    }
    match directory.search(query).as_slice() {
        [] => bail!("unknown hero: {}", query),
        [hero] => Ok(hero.id),
        hits => {
            let names: Vec<&str> = hits.iter().map(|h| h.name.as_str()).collect();
            bail!("'{}' matches several heroes: {}", query, names.join(", "))
        }
    }
}
