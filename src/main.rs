#![cfg_attr(not(test), deny(clippy::panic))]

use std::net::SocketAddr;
use std::sync::Arc;

use clap::Parser;
use shove_server::config;
use shove_server::logging;
use shove_server::server::LobbyManager;
use shove_server::websocket;

/// Shove -- in-memory WebSocket server for a simultaneous-turn grid push game
#[derive(Parser, Debug)]
#[command(name = "shove-server")]
#[command(about = "An in-memory WebSocket game server for a simultaneous-turn grid push game")]
#[command(version)]
struct Cli {
    /// Validate configuration and exit without starting the server.
    /// Useful for CI/CD pipelines and pre-deployment checks.
    #[arg(long, short = 'c', conflicts_with = "print_config")]
    validate_config: bool,

    /// Print the loaded configuration to stdout (as JSON) and exit.
    /// Useful for debugging configuration loading.
    #[arg(long, conflicts_with = "validate_config")]
    print_config: bool,

    /// Port to listen on (overrides the config file).
    #[arg(long, env = "SHOVE_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration from config.json if present; otherwise use code defaults.
    let mut cfg = config::load();
    if let Some(port) = cli.port {
        cfg.port = port;
    }
    let cfg = Arc::new(cfg);

    if cli.print_config {
        let json = serde_json::to_string_pretty(&*cfg)
            .map_err(|e| anyhow::anyhow!("Failed to serialize config: {e}"))?;
        println!("{json}");
        return Ok(());
    }

    if cli.validate_config {
        println!("Configuration validation passed");
        println!();
        println!("Configuration summary:");
        println!("  Port: {}", cfg.port);
        println!("  Round duration: {}s", cfg.game.round_duration_secs);
        println!("  Pieces per player: {}", cfg.game.pieces_per_player);
        println!("  Lobby GC interval: {}s", cfg.server.gc_interval_secs);
        println!("  Max lobby lifespan: {}s", cfg.server.max_lobby_lifespan_secs);
        return Ok(());
    }

    // Initialize logging from config.
    logging::init_with_config(&cfg.logging);

    let addr = SocketAddr::from(([0, 0, 0, 0], cfg.port));
    tracing::info!(%addr, "Starting Shove server");

    let manager = LobbyManager::new(cfg.clone());

    // Start the lobby garbage collector
    let gc_manager = manager.clone();
    tokio::spawn(async move {
        gc_manager.run_gc().await;
    });

    let app = websocket::create_router(&cfg.cors_origins).with_state(manager);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(
        %addr,
        cors_origins = %cfg.cors_origins,
        "Server started - create a lobby with POST /lobby, join over /lobby/{{id_or_code}}/join"
    );

    axum::serve(listener, app).await?;

    Ok(())
}
