use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use clap::Parser;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use coursepay_core::cli::{Cli, Commands, DbCommands, TxCommands};
use coursepay_core::config::Config;
use coursepay_core::{build_state, create_app};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;

    match cli.command {
        None | Some(Commands::Serve) => serve(config).await,
        Some(Commands::Db(DbCommands::Migrate)) => {
            let pool = connect(&config).await?;
            run_migrations(&pool).await
        }
        Some(Commands::Tx(command)) => {
            let pool = connect(&config).await?;
            let (_state, sweep) = build_state(&config, pool);
            match command {
                TxCommands::Repair => {
                    let repaired = sweep.repair_unfinalized().await?;
                    tracing::info!(repaired, "enrollment repair finished");
                }
                TxCommands::ExpirePending { hours } => {
                    let cutoff = chrono::Utc::now()
                        - chrono::Duration::hours(hours.unwrap_or(config.pending_max_age_hours));
                    let expired = sweep.expire_before(cutoff).await?;
                    tracing::info!(expired, "pending expiry finished");
                }
            }
            Ok(())
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<sqlx::PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database_url)
        .await?;
    Ok(pool)
}

async fn run_migrations(pool: &sqlx::PgPool) -> anyhow::Result<()> {
    let migrator = Migrator::new(Path::new("./migrations")).await?;
    migrator.run(pool).await?;
    tracing::info!("database migrations completed");
    Ok(())
}

async fn serve(config: Config) -> anyhow::Result<()> {
    let pool = connect(&config).await?;
    run_migrations(&pool).await?;

    let (state, sweep) = build_state(&config, pool);
    let _sweep_task = sweep.spawn(Duration::from_secs(config.sweep_interval_secs));

    let app = create_app(state, &config);
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    tracing::info!("listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
