use std::net::SocketAddr;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use scribe::config::{Cli, Config};
use scribe::state::AppState;
use scribe::{db, routes};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Parse CLI args and load config
    let cli = Cli::parse();
    let data_dir = Config::data_dir(&cli)?;
    std::fs::create_dir_all(&data_dir)?;
    tracing::info!("Data directory: {}", data_dir.display());

    let config = Config::load(&cli)?;

    // Initialize database
    let pool = db::create_pool(&config.db_path())?;
    db::run_migrations(&pool)?;

    if cli.seed {
        let report = db::seed::run(&pool)?;
        tracing::info!(
            "Seeded {} users, {} posts, {} comments",
            report.users,
            report.posts,
            report.comments
        );
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let app = routes::app(AppState { db: pool, config });

    tracing::info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
