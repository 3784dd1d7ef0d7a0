use anyhow::{Context, Result};
use axum::{body::Body, http::Request, routing::get, Router};
use clap::{Parser, Subcommand};
use kanban_board::{config::KanbanBoardConfig, KanbanBoard};
use mimalloc::MiMalloc;
use runtime::{AppConfig, CliArgs};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

const MODULE_NAME: &str = "kanban_board";

/// Kanban server - live-synchronized task boards
#[derive(Parser)]
#[command(name = "kanban-server")]
#[command(about = "Kanban server - live-synchronized task boards")]
#[command(version = "0.1.0")]
struct Cli {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port for HTTP server (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Print current configuration and exit
    #[arg(long)]
    print_config: bool,

    /// Log verbosity level (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the server
    Run,
    /// Check configuration
    Check,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let args = CliArgs {
        config: cli.config.as_ref().map(|p| p.to_string_lossy().to_string()),
        port: cli.port,
        print_config: cli.print_config,
        verbose: cli.verbose,
    };

    // Load configuration (normalized home_dir is applied inside)
    let mut config = AppConfig::load_or_default(cli.config.as_deref())?;
    config.apply_cli_overrides(&args);

    let logging_config = config.logging.clone().unwrap_or_default();
    runtime::logging::init_logging_from_config(&logging_config, Path::new(&config.server.home_dir));
    tracing::info!("Kanban server starting");

    if args.print_config {
        println!("{}", config.to_yaml()?);
        return Ok(());
    }

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_server(config).await,
        Commands::Check => check_config(config),
    }
}

fn board_config(config: &AppConfig) -> Result<KanbanBoardConfig> {
    config.module_config::<KanbanBoardConfig>(MODULE_NAME)
}

fn bind_addr(config: &AppConfig) -> Result<SocketAddr> {
    let raw = format!("{}:{}", config.server.host, config.server.port);
    raw.parse()
        .with_context(|| format!("Invalid bind address '{raw}'"))
}

/// Board routes plus the HTTP middleware stack.
fn build_router(config: &AppConfig, board: &KanbanBoard) -> Result<Router> {
    let mut router = board
        .register_rest(Router::new())?
        .route("/health", get(|| async { "ok" }));

    if config.server.timeout_sec > 0 {
        // bounds time-to-headers only, so SSE bodies keep streaming
        router = router.layer(TimeoutLayer::new(Duration::from_secs(
            config.server.timeout_sec,
        )));
    }
    if config.server.cors_enabled {
        router = router.layer(CorsLayer::permissive());
    }

    Ok(router
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let rid = req
                    .headers()
                    .get("x-request-id")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    request_id = %rid,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid)))
}

async fn run_server(config: AppConfig) -> Result<()> {
    tracing::info!("Initializing modules...");
    let board = Arc::new(KanbanBoard::new(board_config(&config)?));
    let router = build_router(&config, &board)?;

    let addr = bind_addr(&config)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");

    let closing = Arc::clone(&board);
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            if let Err(e) = runtime::shutdown::wait_for_shutdown().await {
                tracing::error!(error = %e, "Signal handler failed, shutting down");
            }
            // ending the sessions ends their event streams, which lets connections drain
            closing.shutdown().await;
        })
        .await
        .context("HTTP server failed")?;

    tracing::info!("Kanban server stopped");
    Ok(())
}

fn check_config(config: AppConfig) -> Result<()> {
    tracing::info!("Checking configuration...");

    bind_addr(&config)?;
    let board = KanbanBoard::new(board_config(&config)?);
    build_router(&config, &board)?;

    tracing::info!("Configuration is valid");
    println!("Configuration check passed");
    println!("{}", config.to_yaml()?);
    Ok(())
}
