// Binary entry point: parse the CLI, wire config + session + client,
// and dispatch one subcommand.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lookbook::analysis::{AnalysisController, AnalysisEvent, ControllerConfig, PhaseStatus};
use lookbook::api::{ApiClient, ApiError};
use lookbook::cli::{Cli, Commands, ConnectorArg};
use lookbook::config::{self, Config};
use lookbook::filters::{BoardOutfits, Connector, TrendsExplorer};
use lookbook::session::{FileTokenStore, MemoryTokenStore, SessionStore};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Ensure config template exists (helps users discover options)
    Config::ensure_config_exists();
    let config = Config::load();

    // Precedence: RUST_LOG env var > config file > default "info".
    let default_filter = format!("lookbook={}", config.logging.level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    // File logging is optional; the guard must stay alive so buffered
    // log lines flush on exit.
    let _file_guard: Option<tracing_appender::non_blocking::WorkerGuard> =
        if config.logging.file_enabled {
            if let Err(e) = std::fs::create_dir_all(&config.logging.file_dir) {
                eprintln!(
                    "Warning: could not create log directory {:?}: {}",
                    config.logging.file_dir, e
                );
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer())
                    .init();
                None
            } else {
                let file_appender = tracing_appender::rolling::daily(
                    &config.logging.file_dir,
                    &config.logging.file_prefix,
                );
                let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
                tracing_subscriber::registry()
                    .with(filter)
                    .with(tracing_subscriber::fmt::layer())
                    .with(
                        tracing_subscriber::fmt::layer()
                            .json()
                            .with_writer(non_blocking)
                            .with_ansi(false),
                    )
                    .init();
                Some(guard)
            }
        } else {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
            None
        };

    // Token subcommand manages the token file directly, before any
    // client exists.
    if let Commands::Token { value, clear } = &cli.command {
        return handle_token(value.as_deref(), *clear);
    }
    if let Commands::Config { show, reset, path } = &cli.command {
        return handle_config(&config, *show, *reset, *path);
    }

    // An env-provided token wins over the token file.
    let session: Arc<dyn SessionStore> = match &config.token {
        Some(token) => Arc::new(MemoryTokenStore::new(Some(token.clone()))),
        None => Arc::new(FileTokenStore::new(config::token_path())),
    };
    let api = Arc::new(ApiClient::new(config.api_url.clone(), session));

    let result = match cli.command {
        Commands::Import { url, name } => {
            let board = api
                .create_board(&url, name.as_deref())
                .await
                .map_err(auth_hint)?;
            println!("Imported board {} ({})", board.name, board.id);
            watch_analysis(&api, &config, &board.id).await
        }
        Commands::Analyze { board_id } => watch_analysis(&api, &config, &board_id).await,
        Commands::Boards => handle_boards(&api).await,
        Commands::Delete { board_id } => {
            api.delete_board(&board_id).await.map_err(auth_hint)?;
            println!("Board {} deleted.", board_id);
            Ok(())
        }
        Commands::Outfit { outfit_id } => handle_outfit(&api, &outfit_id).await,
        Commands::Garment { garment_id } => handle_garment(&api, &garment_id).await,
        Commands::Outfits {
            board_id,
            seasons,
            styles,
        } => handle_outfits(&api, &board_id, &seasons, &styles).await,
        Commands::Trends {
            board_id,
            garments,
            connectors,
            all_and,
            colors,
        } => handle_trends(&api, &board_id, &garments, &connectors, all_and, &colors).await,
        Commands::Products { garment_id, search } => {
            handle_products(&api, &garment_id, search).await
        }
        Commands::Token { .. } | Commands::Config { .. } => unreachable!("handled above"),
    };

    result
}

/// Rewrite a 401 into an actionable message.
fn auth_hint(e: ApiError) -> anyhow::Error {
    if e.is_unauthorized() {
        anyhow::anyhow!("{} (store a token with `lookbook token <value>`)", e)
    } else {
        anyhow::Error::new(e)
    }
}

/// Drive one analysis session to its terminal state, rendering progress
/// events as they arrive.
async fn watch_analysis(api: &Arc<ApiClient>, config: &Config, board_id: &str) -> Result<()> {
    let controller = AnalysisController::new(
        Arc::clone(api),
        board_id,
        ControllerConfig {
            poll_interval: config.poll_interval,
            completion_delay: config.completion_delay,
        },
    );
    let Some(mut session) = controller.start() else {
        bail!("analysis session already running for board {}", board_id);
    };

    while let Some(event) = session.events.recv().await {
        match event {
            AnalysisEvent::Progress { percent, phases } => {
                let active = phases
                    .iter()
                    .find(|p| p.status == PhaseStatus::Active)
                    .map(|p| format!("{}: {}", p.title, p.subtitle))
                    .unwrap_or_default();
                println!("  {:>3}%  {}", percent, active);
            }
            AnalysisEvent::Completed {
                outfits_created,
                garments_created,
            } => {
                println!(
                    "Analysis complete: {} outfits, {} garments",
                    outfits_created, garments_created
                );
            }
            AnalysisEvent::NavigateToBoard { board_id } => {
                let board = api.get_board(&board_id).await.map_err(auth_hint)?;
                println!(
                    "Board {} ready: {} pins, {} outfits",
                    board.name,
                    board.pins_count,
                    board.outfits_count.unwrap_or_default()
                );
                break;
            }
            AnalysisEvent::Failed { message } => {
                bail!("analysis failed: {}", message);
            }
        }
    }
    Ok(())
}

async fn handle_boards(api: &Arc<ApiClient>) -> Result<()> {
    let boards = api.list_boards().await.map_err(auth_hint)?;
    if boards.is_empty() {
        println!("No boards imported yet. Try `lookbook import <url>`.");
        return Ok(());
    }
    for board in boards {
        println!(
            "{}  {:<30} {:>4} pins  {:?}",
            board.id, board.name, board.pins_count, board.status
        );
    }
    Ok(())
}

async fn handle_outfits(
    api: &Arc<ApiClient>,
    board_id: &str,
    seasons: &[String],
    styles: &[String],
) -> Result<()> {
    let mut view = BoardOutfits::new(Arc::clone(api), board_id);
    view.load().await;
    if !seasons.is_empty() || !styles.is_empty() {
        for season in seasons {
            view.toggle_season(season);
        }
        for style in styles {
            view.toggle_style(style);
        }
        view.refresh().await;
    }
    if let Some(error) = view.error() {
        bail!("{}", error);
    }

    let facets = view.facets();
    if !facets.seasons.is_empty() || !facets.styles.is_empty() {
        let describe = |facets: &[lookbook::api::Facet]| {
            facets
                .iter()
                .map(|f| format!("{} ({})", f.name, f.count))
                .collect::<Vec<_>>()
                .join(", ")
        };
        println!("Seasons: {}", describe(&facets.seasons));
        println!("Styles:  {}", describe(&facets.styles));
        println!();
    }
    print_outfits(view.outfits());
    Ok(())
}

async fn handle_trends(
    api: &Arc<ApiClient>,
    board_id: &str,
    garments: &[String],
    connectors: &[ConnectorArg],
    all_and: bool,
    colors: &[String],
) -> Result<()> {
    let mut view = TrendsExplorer::new(Arc::clone(api), board_id);
    view.load().await;

    let has_filter = !garments.is_empty() || !colors.is_empty();
    if has_filter {
        for garment in garments {
            view.toggle_garment(garment);
        }
        // Connectors default to OR; only AND positions need a flip.
        for (index, connector) in connectors.iter().enumerate() {
            if Connector::from(*connector) == Connector::And {
                view.toggle_connector(index);
            }
        }
        if all_and {
            view.set_all_connectors(Connector::And);
        }
        for color in colors {
            view.toggle_color(color);
        }
        view.refresh().await;
    }
    if let Some(error) = view.error() {
        bail!("{}", error);
    }

    if !view.type_ranks().is_empty() {
        println!("Garment trends:");
        for rank in view.type_ranks() {
            println!("  {:<16} {:>4}", rank.garment_type, rank.count);
            for garment in &rank.garments {
                println!("    {:<16} {:>4}", garment.name, garment.count);
            }
        }
        println!();
    }
    if !view.color_facets().is_empty() {
        let palette = view
            .color_facets()
            .iter()
            .map(|c| format!("{} ({})", c.color, c.count))
            .collect::<Vec<_>>()
            .join(", ");
        println!("Colors: {}", palette);
        println!();
    }
    if has_filter {
        print_outfits(view.outfits());
    }
    Ok(())
}

async fn handle_outfit(api: &Arc<ApiClient>, outfit_id: &str) -> Result<()> {
    let outfit = api.get_outfit(outfit_id).await.map_err(auth_hint)?;
    println!(
        "Outfit {}  {:<10} {:<10} {}",
        outfit.id,
        outfit.season.as_deref().unwrap_or("-"),
        outfit.style.as_deref().unwrap_or("-"),
        outfit.image_url
    );
    match outfit.garments.as_deref() {
        Some(garments) if !garments.is_empty() => {
            for garment in garments {
                println!(
                    "  {}  {:<16} {:<12} {}",
                    garment.id,
                    garment.name,
                    garment.garment_type,
                    garment.color.as_deref().unwrap_or("-")
                );
            }
        }
        _ => println!("  (no garments detected)"),
    }
    Ok(())
}

async fn handle_garment(api: &Arc<ApiClient>, garment_id: &str) -> Result<()> {
    let garment = api.get_garment(garment_id).await.map_err(auth_hint)?;
    println!("{} ({})", garment.name, garment.garment_type);
    println!("  color:      {}", garment.color.as_deref().unwrap_or("-"));
    println!("  material:   {}", garment.material.as_deref().unwrap_or("-"));
    println!("  style:      {}", garment.style.as_deref().unwrap_or("-"));
    println!("  season:     {}", garment.season.as_deref().unwrap_or("-"));
    if let Some(confidence) = garment.confidence {
        println!("  confidence: {:.2}", confidence);
    }
    if let Some(products) = &garment.products {
        if !products.is_empty() {
            println!("  {} saved product(s); see `lookbook products {}`", products.len(), garment.id);
        }
    }
    Ok(())
}

async fn handle_products(api: &Arc<ApiClient>, garment_id: &str, search: bool) -> Result<()> {
    let products = if search {
        println!("Searching similar products...");
        api.search_products(garment_id).await.map_err(auth_hint)?
    } else {
        api.garment_products(garment_id).await.map_err(auth_hint)?
    };
    if products.is_empty() {
        println!("No products found. Try `--search` to run a fresh lookup.");
        return Ok(());
    }
    for product in products {
        println!(
            "{:<40} {:>8}  {:<12} {}",
            product.name,
            product.price.as_deref().unwrap_or("-"),
            product.store.as_deref().unwrap_or("-"),
            product.url.as_deref().unwrap_or("")
        );
    }
    Ok(())
}

fn handle_token(value: Option<&str>, clear: bool) -> Result<()> {
    let store = FileTokenStore::new(config::token_path());
    if clear {
        store.invalidate();
        println!("Token cleared.");
        return Ok(());
    }
    match value {
        Some(token) => {
            store
                .save(token)
                .with_context(|| format!("could not write token file {:?}", store.path()))?;
            println!("Token stored at {:?}", store.path());
        }
        None => match store.token() {
            Some(_) => println!("A token is stored at {:?}", store.path()),
            None => println!("No token stored. Use `lookbook token <value>`."),
        },
    }
    Ok(())
}

fn handle_config(config: &Config, show: bool, reset: bool, path: bool) -> Result<()> {
    if path {
        println!("{}", config::config_path().display());
        return Ok(());
    }
    if reset {
        let target = config::config_path();
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("could not create {:?}", parent))?;
        }
        std::fs::write(&target, config::CONFIG_TEMPLATE)
            .with_context(|| format!("could not write {:?}", target))?;
        println!("Config reset to defaults at {}", target.display());
        return Ok(());
    }
    if show {
        println!("api_url              = {}", config.api_url);
        println!("token (env)          = {}", config.token.is_some());
        println!("poll_interval        = {:?}", config.poll_interval);
        println!("completion_delay     = {:?}", config.completion_delay);
        println!("logging.level        = {}", config.logging.level);
        println!("logging.file_enabled = {}", config.logging.file_enabled);
        println!("logging.file_dir     = {}", config.logging.file_dir.display());
        return Ok(());
    }
    println!("Use --show, --reset, or --path.");
    Ok(())
}

fn print_outfits(outfits: &[lookbook::api::Outfit]) {
    if outfits.is_empty() {
        println!("No outfits match the active filters.");
        return;
    }
    println!("{} outfit(s):", outfits.len());
    for outfit in outfits {
        println!(
            "  {}  {:<10} {:<10} {:>2} garments  {}",
            outfit.id,
            outfit.season.as_deref().unwrap_or("-"),
            outfit.style.as_deref().unwrap_or("-"),
            outfit.garment_count(),
            outfit.image_url
        );
    }
}
