use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use pokedex_core::http::PokeApiClient;
use pokedex_core::session::SEARCH_DEBOUNCE;
use pokedex_core::{
    DetailLookup, FailureCategory, ItemStore, LoadResult, PageStore, Pager, PagingConfig, Pokemon,
    PokemonDetail, SearchLookup, SearchSession, SearchState,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

mod backend;
mod config;

use backend::{BackendKind, Resolved};
use config::Settings;

#[derive(Parser)]
#[command(name = "pokedex", version, about = "Offline-first Pokédex catalog cache")]
struct Cli {
    /// Path to the SQLite cache (implies --store sqlite)
    #[arg(long, global = true)]
    db: Option<PathBuf>,
    /// Cache backend, overriding settings.toml
    #[arg(long, global = true, value_enum)]
    store: Option<BackendKind>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the cache database and apply migrations
    InitDb,
    /// Drop the cache and reload the first page from the catalog
    Refresh {
        #[arg(long)]
        json: bool,
    },
    /// Load the page after the last cached one
    Next,
    /// Load the page before the first cached one
    Prev,
    /// List cached entries in catalog order
    List {
        #[arg(long)]
        limit: Option<usize>,
        #[arg(long)]
        json: bool,
    },
    /// Find one entry: cached substring match first, catalog lookup otherwise
    Search {
        query: String,
        #[arg(long)]
        json: bool,
    },
    /// Read query edits from stdin, one per line, and print the debounced result
    Live,
    /// Show the full catalog record for one entry
    Show {
        name: String,
        #[arg(long)]
        json: bool,
    },
    /// Remove every cached entry and paging cursor
    Clear,
    /// Print effective settings and paths
    Config {
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (settings, invalid) = match config::load_settings() {
        Ok(s) => (s, None),
        Err(e) => (Settings::default(), Some(e)),
    };
    init_tracing(settings.log_level.as_deref());
    if let Some(e) = invalid {
        tracing::warn!(path = %config::settings_path().display(), error = %e, "ignoring invalid settings file");
    }

    let resolved = backend::resolve(&settings, cli.db, cli.store);
    tracing::debug!(?resolved, "storage resolved");

    match cli.command {
        Commands::Config { json } => return print_config(&settings, &resolved, json),
        Commands::InitDb => return init_db(&resolved),
        _ => {}
    }

    let client = Arc::new(PokeApiClient::new(
        &settings.api.base_url,
        settings.api.timeout(),
    )?);
    match (&resolved.backend, &resolved.db_path) {
        (BackendKind::Sqlite, Some(path)) => {
            let store = Arc::new(backend::open_sqlite(path)?);
            run(cli.command, store, client, &settings).await
        }
        _ => run(cli.command, Arc::new(backend::open_memory()), client, &settings).await,
    }
}

fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("warn")));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

async fn run<S: PageStore + 'static>(
    command: Commands,
    store: Arc<S>,
    client: Arc<PokeApiClient>,
    settings: &Settings,
) -> Result<()> {
    let image_base = settings.api.image_base_url.as_str();
    match command {
        Commands::Refresh { json } => {
            let mut pager = Pager::new(store.clone(), client, PagingConfig::default());
            finish(pager.refresh().await)?;
            let rows: Vec<Pokemon> = pager
                .items()
                .map(|it| Pokemon::from_item(it, image_base))
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                println!("refreshed: {} entries cached", rows.len());
            }
        }
        Commands::Next => {
            let mut pager = Pager::new(store.clone(), client, PagingConfig::default());
            let before = pager.restore()?;
            let end = finish(pager.load_next().await)?;
            report_load(before, store.count()?, end, "end of catalog reached");
        }
        Commands::Prev => {
            let mut pager = Pager::new(store.clone(), client, PagingConfig::default());
            let before = pager.restore()?;
            let start = finish(pager.load_previous().await)?;
            report_load(before, store.count()?, start, "start of catalog reached");
        }
        Commands::List { limit, json } => {
            let total = store.count()?;
            let rows: Vec<Pokemon> = store
                .query_page(0, limit.unwrap_or(total))?
                .iter()
                .map(|it| Pokemon::from_item(it, image_base))
                .collect();
            if json {
                println!("{}", serde_json::to_string_pretty(&rows)?);
            } else {
                for p in rows {
                    println!("{:>4}\t{}", p.id, p.name);
                }
            }
        }
        Commands::Search { query, json } => {
            let lookup = SearchLookup::new(store, client, settings.api.base_url.as_str())
                .with_image_base_url(image_base);
            match lookup.search(&query).await {
                Ok(p) if json => println!("{}", serde_json::to_string_pretty(&p)?),
                Ok(p) => println!("{:>4}\t{}\t{}", p.id, p.name, p.image_url),
                Err(e) => {
                    let category = FailureCategory::classify(&e.to_string());
                    tracing::debug!(error = %e, ?category, "search failed");
                    bail!(category.user_message(query.trim()));
                }
            }
        }
        Commands::Live => live(store, client, settings).await?,
        Commands::Show { name, json } => {
            let detail = DetailLookup::new(client, image_base).detail(&name).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&detail)?);
            } else {
                print_detail(&detail);
            }
        }
        Commands::Clear => {
            store.clear()?;
            println!("cleared");
        }
        // Both run before a store is opened.
        Commands::InitDb | Commands::Config { .. } => {}
    }
    Ok(())
}

/// The end-of-pagination flag, or the load failure as an error.
fn finish(res: LoadResult) -> Result<bool> {
    match res {
        LoadResult::Success {
            end_of_pagination_reached,
        } => Ok(end_of_pagination_reached),
        LoadResult::Error(e) => Err(e.into()),
    }
}

fn report_load(before: usize, after: usize, edge: bool, edge_msg: &str) {
    println!(
        "loaded {} entries ({} cached)",
        after.saturating_sub(before),
        after
    );
    if edge {
        println!("{edge_msg}");
    }
}

async fn live<S: PageStore + 'static>(
    store: Arc<S>,
    client: Arc<PokeApiClient>,
    settings: &Settings,
) -> Result<()> {
    let lookup = SearchLookup::new(store, client, settings.api.base_url.as_str())
        .with_image_base_url(settings.api.image_base_url.as_str());
    let session = SearchSession::new(Arc::new(lookup));
    let mut rx = session.subscribe();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        session.on_query_change(line);
    }
    if session.query().trim().is_empty() {
        println!("idle");
        return Ok(());
    }

    // Let the last edit clear the debounce window, then wait for its result.
    tokio::time::sleep(SEARCH_DEBOUNCE + Duration::from_millis(50)).await;
    let settled = tokio::time::timeout(
        settings.api.timeout() + Duration::from_secs(1),
        rx.wait_for(|s| matches!(s, SearchState::Success(_) | SearchState::Error(_))),
    )
    .await;
    let state = match settled {
        Ok(Ok(state)) => state.clone(),
        Ok(Err(_)) => bail!("search session stopped"),
        Err(_) => bail!(FailureCategory::Timeout.user_message(&session.query())),
    };
    match state {
        SearchState::Success(p) => println!("{:>4}\t{}", p.id, p.name),
        SearchState::Error(msg) => bail!(msg),
        SearchState::Idle | SearchState::Loading => println!("idle"),
    }
    Ok(())
}

fn init_db(resolved: &Resolved) -> Result<()> {
    match &resolved.db_path {
        Some(path) => {
            let store = backend::open_sqlite(path)?;
            let status = store.migration_status()?;
            println!(
                "database initialized at {} (schema version {})",
                path.display(),
                status.current
            );
        }
        None => {
            backend::open_memory().init()?;
            println!("in-memory cache needs no initialization");
        }
    }
    Ok(())
}

#[derive(Serialize)]
struct ConfigView<'a> {
    config_dir: String,
    settings_path: String,
    storage: &'a Resolved,
    api: &'a config::Api,
    log_level: Option<&'a str>,
}

fn print_config(settings: &Settings, resolved: &Resolved, json: bool) -> Result<()> {
    let view = ConfigView {
        config_dir: config::config_dir().display().to_string(),
        settings_path: config::settings_path().display().to_string(),
        storage: resolved,
        api: &settings.api,
        log_level: settings.log_level.as_deref(),
    };
    if json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        println!("config_dir: {}", view.config_dir);
        println!("settings: {}", view.settings_path);
        match &resolved.db_path {
            Some(p) => println!("storage: sqlite ({})", p.display()),
            None => println!("storage: memory"),
        }
        println!("api: {} (timeout {} ms)", settings.api.base_url, settings.api.timeout_ms);
    }
    Ok(())
}

fn print_detail(d: &PokemonDetail) {
    println!("#{} {}", d.id, d.name);
    println!("height: {}  weight: {}  base xp: {}", d.height, d.weight, d.base_experience);
    println!("types: {}", d.types.join(", "));
    println!("abilities: {}", d.abilities.join(", "));
    for s in &d.stats {
        println!("  {:<16} {:>3}", s.name, s.base_stat);
    }
    println!("image: {}", d.image_url);
}
