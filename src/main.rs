use anyhow::Result;
use clap::{Parser, Subcommand};
use kintree::db::{migrate, Db};
use kintree::http::HttpServer;
use kintree::Config;
use std::path::Path;

#[derive(Parser)]
#[command(name = "kintree", version, about = "Genealogy record service")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve,
    /// Apply pending database migrations and exit
    Migrate,
    /// Verify the database schema and exit
    Verify,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config::load()?;

    env_logger::Builder::from_env(
        env_logger::Env::default().filter_or("RUST_LOG", config.kintree.log_level.clone()),
    )
    .init();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => run_server(config).await,
        Command::Migrate => run_migrations(config).await,
        Command::Verify => run_schema_verification(config).await,
    }
}

async fn run_server(config: Config) -> Result<()> {
    log::info!("Starting kintree v{}", env!("CARGO_PKG_VERSION"));
    log::info!("Database path: {}", config.db_path().display());

    let db = Db::new(config.db_path());

    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;
    log::info!("Database initialized successfully");

    let server = HttpServer::new(db, config);
    server.run().await?;

    Ok(())
}

async fn run_migrations(config: Config) -> Result<()> {
    let db = Db::new(config.db_path());
    let migrations_dir = Path::new("migrations");
    let applied = db
        .with_connection(|conn| {
            migrate::run_migrations(conn, migrations_dir)?;
            migrate::get_applied_migrations(conn)
        })
        .await?;
    log::info!("{} migrations applied", applied.len());
    Ok(())
}

async fn run_schema_verification(config: Config) -> Result<()> {
    use kintree::error::KintreeError;

    let db = Db::new(config.db_path());
    let migrations_dir = Path::new("migrations");
    db.with_connection(|conn| migrate::run_migrations(conn, migrations_dir))
        .await?;

    db.with_connection(|conn| {
        let mut stmt =
            conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")?;
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;

        let expected_tables = [
            "branch_members",
            "branches",
            "event_persons",
            "events",
            "media",
            "persons",
            "relationships",
            "schema_migrations",
            "users",
        ];
        for table in &expected_tables {
            if !tables.iter().any(|t| t == table) {
                return Err(KintreeError::Config(format!("Missing table: {}", table)));
            }
            log::debug!("table exists: {}", table);
        }

        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='index' AND name LIKE 'idx_%'")?;
        let indexes: Vec<String> = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<std::result::Result<Vec<_>, rusqlite::Error>>()?;
        for index_name in ["idx_relationships_from_type", "idx_relationships_to_type"] {
            if !indexes.iter().any(|i| i == index_name) {
                log::warn!("traversal index not found: {}", index_name);
            }
        }

        let journal_mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0))?;
        if journal_mode.to_uppercase() != "WAL" {
            return Err(KintreeError::Config(format!(
                "Journal mode is not WAL: {}",
                journal_mode
            )));
        }

        let integrity: String = conn.query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        if integrity != "ok" {
            return Err(KintreeError::Config(format!(
                "Database integrity check failed: {}",
                integrity
            )));
        }

        Ok(())
    })
    .await?;

    log::info!("Database schema verification complete");
    Ok(())
}
