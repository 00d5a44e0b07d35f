use clap::{Parser, Subcommand};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use coop_energy_api::{config, db, migrator::Migrator};

/// Schema management for the energy cooperative database.
#[derive(Debug, Parser)]
#[command(name = "migration", version, about)]
struct Cli {
    /// Overrides the configured database URL
    #[arg(long)]
    database_url: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Apply pending migrations (default)
    Up {
        /// Number of migrations to apply
        #[arg(short, long)]
        steps: Option<u32>,
    },
    /// Roll back applied migrations
    Down {
        /// Number of migrations to roll back
        #[arg(short, long, default_value_t = 1)]
        steps: u32,
    },
    /// Show which migrations have been applied
    Status,
    /// Drop every table and reapply all migrations
    Fresh,
    /// Roll back every migration and reapply them
    Refresh,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut cfg = config::load_config()?;
    config::init_tracing(cfg.log_level(), cfg.log_json);
    if let Some(url) = cli.database_url {
        cfg.database_url = url;
    }

    let pool = db::establish_connection_from_app_config(&cfg).await?;

    match cli.command.unwrap_or(Command::Up { steps: None }) {
        Command::Up { steps } => {
            info!(?steps, "applying migrations");
            Migrator::up(&pool, steps).await?;
        }
        Command::Down { steps } => {
            info!(steps, "rolling back migrations");
            Migrator::down(&pool, Some(steps)).await?;
        }
        Command::Status => Migrator::status(&pool).await?,
        Command::Fresh => {
            info!("recreating schema from scratch");
            Migrator::fresh(&pool).await?;
        }
        Command::Refresh => {
            info!("rolling back and reapplying every migration");
            Migrator::refresh(&pool).await?;
        }
    }

    db::close_pool(pool).await?;
    info!("migration command completed");
    Ok(())
}
