use std::collections::HashSet;

use anyhow::Context;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use cms_scopes::authz::permissions;
use cms_scopes::db::{self, MIGRATOR};
use cms_scopes::errors::AppError;
use cms_scopes::jwt::JwtConfig;
use cms_scopes::store::{ScopeAdmin, SqliteStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "cms-scopes admin tool", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply pending migrations
    MigrateRun,
    /// Show migration status against the current database
    MigrateStatus,
    /// Register the built-in permission codes
    SeedPermissions,
    /// Create an active superuser account
    CreateSuperuser { name: String },
    /// Print a bearer token for an existing user
    IssueToken { user_id: Uuid },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if dotenv().is_err() {
        let crate_env = std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join(".env");
        let _ = dotenvy::from_path(crate_env);
    }

    let cli = Cli::parse();
    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL not set")?;

    match cli.command {
        Commands::MigrateRun => {
            let pool = db::open(&database_url).await?;
            MIGRATOR.run(&pool).await?;
            println!("Migrations applied");
        }
        Commands::MigrateStatus => {
            let pool = db::open(&database_url).await?;
            print_status(&pool).await?;
        }
        Commands::SeedPermissions => {
            let store = SqliteStore::new(db::connect(&database_url).await?);
            let created = seed_permissions(&store).await?;
            println!("Registered {} new permission(s)", created);
        }
        Commands::CreateSuperuser { name } => {
            let store = SqliteStore::new(db::connect(&database_url).await?);
            seed_permissions(&store).await?;
            let user = store.create_user(&name, true, true).await?;
            println!("Created superuser {} ({})", user.name, user.id);
        }
        Commands::IssueToken { user_id } => {
            let jwt = JwtConfig::from_env()?;
            let store = SqliteStore::new(db::connect(&database_url).await?);
            let user = store.get_user(user_id).await?;
            if !user.is_active {
                anyhow::bail!("user {} is inactive", user.id);
            }
            println!("{}", jwt.encode(user.id)?);
        }
    }

    Ok(())
}

async fn seed_permissions(store: &SqliteStore) -> anyhow::Result<usize> {
    let mut created = 0;
    for code in permissions::ALL.iter() {
        match store.create_permission(code, None).await {
            Ok(_) => created += 1,
            Err(AppError::Conflict(_)) => {}
            Err(err) => return Err(err.into()),
        }
    }
    Ok(created)
}

async fn print_status(pool: &SqlitePool) -> anyhow::Result<()> {
    // If the migrations table doesn't exist, nothing is applied yet
    let has_table = sqlx::query("SELECT name FROM sqlite_master WHERE type='table' AND name='_sqlx_migrations'")
        .fetch_optional(pool)
        .await?
        .is_some();
    let applied_versions: HashSet<i64> = if has_table {
        let rows = sqlx::query("SELECT version FROM _sqlx_migrations WHERE success = 1")
            .fetch_all(pool)
            .await?;
        rows.iter().filter_map(|row| row.try_get::<i64, _>("version").ok()).collect()
    } else {
        HashSet::new()
    };

    println!("{:<8} {:<20} {}", "Status", "Version", "Name");
    for migration in MIGRATOR.iter() {
        let status = if applied_versions.contains(&migration.version) { "applied" } else { "pending" };
        let desc = migration.description.trim();
        let name = if desc.is_empty() { "unknown" } else { desc };
        println!("{:<8} {:<20} {}", status, migration.version, name);
    }

    Ok(())
}
