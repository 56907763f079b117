use activity_pricing::{config, db, migrator::Migrator};
use anyhow::{Context, Result};
use sea_orm_migration::MigratorTrait;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config().context("failed to load application config")?;
    config::init_tracing(config.log_level(), config.log_json);

    info!("Starting database migration");

    let pool = db::establish_connection_from_app_config(&config)
        .await
        .context("failed to connect to database")?;
    db::check_connection(&pool)
        .await
        .context("database is not reachable")?;

    db::run_migrations(&pool)
        .await
        .context("failed to apply migrations")?;

    let applied = Migrator::get_applied_migrations(&pool)
        .await
        .context("failed to list applied migrations")?;
    for migration in applied {
        info!(migration = migration.name(), "applied");
    }

    db::close_pool(pool).await?;
    info!("Migration completed successfully");
    Ok(())
}
