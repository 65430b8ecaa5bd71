mod ingest;
mod scheduler;

use clap::{CommandFactory, Parser, Subcommand};
use scholdb_core::Environment;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "scholdb-cli")]
#[command(about = "Scholarship ingestion and store maintenance")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Run one ingest pass over every enabled source, then exit
    Ingest,
    /// Run as a daemon, ingesting on the configured cron schedule
    Schedule {
        /// Also run one ingest immediately at startup
        #[arg(long)]
        run_on_start: bool,
    },
    /// Database operations
    Db {
        #[command(subcommand)]
        command: DbCommands,
    },
    /// Inspect stored scholarships
    Scholarships {
        #[command(subcommand)]
        command: ScholarshipCommands,
    },
}

#[derive(Debug, Subcommand)]
enum DbCommands {
    /// Check database connectivity
    Ping,
    /// Apply pending migrations
    Migrate,
}

#[derive(Debug, Subcommand)]
enum ScholarshipCommands {
    /// List active scholarships, newest first
    List {
        #[arg(long, default_value_t = 20)]
        limit: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = scholdb_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_ansi(ansi_logs(&config.env))
        .init();
    tracing::debug!(env = %config.env, "configuration loaded");

    let pool_config = scholdb_db::PoolConfig::from_app_config(&config);
    let pool = scholdb_db::connect_pool(&config.database_url, pool_config).await?;

    match command {
        Commands::Ingest => ingest::run_ingest(pool, &config).await?,
        Commands::Schedule { run_on_start } => {
            scheduler::run_daemon(pool, &config, run_on_start).await?;
        }
        Commands::Db { command } => match command {
            DbCommands::Ping => {
                scholdb_db::health_check(&pool).await?;
                println!("database reachable");
            }
            DbCommands::Migrate => {
                let applied = scholdb_db::run_migrations(&pool).await?;
                println!("applied {applied} migration(s)");
            }
        },
        Commands::Scholarships { command } => match command {
            ScholarshipCommands::List { limit } => list_scholarships(&pool, limit).await?,
        },
    }

    Ok(())
}

/// Color codes are off in production.
fn ansi_logs(env: &Environment) -> bool {
    !matches!(env, Environment::Production)
}

async fn list_scholarships(pool: &sqlx::PgPool, limit: i64) -> anyhow::Result<()> {
    let rows = scholdb_db::list_active_scholarships(pool, limit).await?;
    if rows.is_empty() {
        println!("no active scholarships");
        return Ok(());
    }
    for row in rows {
        println!(
            "{}\t{}\t{}\t{}",
            row.application_deadline, row.degree_level, row.name, row.apply_link
        );
    }
    Ok(())
}

/// Resolves on ctrl-c or SIGTERM.
pub(crate) async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
