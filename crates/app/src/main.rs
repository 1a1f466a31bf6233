use std::net::SocketAddr;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use learnmetrics_core::placement::{
    DEFAULT_INTERMEDIATE_FLOOR, DEFAULT_UNLOCK_THRESHOLD, PlacementPolicy,
};
use services::{AppServices, Clock};
use tracing::info;
use tracing_subscriber::EnvFilter;

mod seed;

#[derive(Parser)]
#[command(name = "learnmetrics")]
#[command(about = "Learning effectiveness tracker: placement, gated materials, and results")]
#[command(version)]
struct Cli {
    /// SQLite database URL or path
    #[arg(
        long = "db",
        env = "LEARN_DB_URL",
        default_value = "sqlite://learnmetrics.sqlite3",
        global = true
    )]
    db_url: String,

    /// Pre-test score (inclusive) that unlocks advanced content
    #[arg(
        long,
        env = "LEARN_UNLOCK_THRESHOLD",
        default_value_t = DEFAULT_UNLOCK_THRESHOLD,
        global = true
    )]
    unlock_threshold: i32,

    /// Lowest score labelled intermediate on results pages
    #[arg(
        long,
        env = "LEARN_INTERMEDIATE_FLOOR",
        default_value_t = DEFAULT_INTERMEDIATE_FLOOR,
        global = true
    )]
    intermediate_floor: i32,

    /// Address the HTTP API binds to
    #[arg(
        long,
        env = "LEARN_BIND_ADDR",
        default_value = "127.0.0.1:5000",
        global = true
    )]
    bind: SocketAddr,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP API (default)
    Serve,
    /// Load demo users and courses
    Seed {
        /// Delete existing courses first
        #[arg(long)]
        reset: bool,
    },
}

fn normalize_sqlite_url(raw: &str) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw.to_owned();
    }

    let trimmed = raw.trim();
    let path_str = trimmed.strip_prefix("sqlite:").unwrap_or(trimmed);
    let path = std::path::Path::new(path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> anyhow::Result<()> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let Some(path) = db_url.strip_prefix("sqlite://") else {
        bail!("invalid --db value: {db_url}");
    };
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        bail!("invalid --db value: {db_url}");
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .with_context(|| format!("creating {}", path.display()))?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let policy = PlacementPolicy::new(cli.unlock_threshold, cli.intermediate_floor)?;
    let db_url = normalize_sqlite_url(&cli.db_url);
    prepare_sqlite_file(&db_url)?;
    let services = AppServices::new_sqlite(&db_url, Clock::system(), policy)
        .await
        .with_context(|| format!("opening {db_url}"))?;
    info!(db = %db_url, "storage ready");

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            api::serve(api::ServerConfig { addr: cli.bind }, services).await?;
        }
        Command::Seed { reset } => {
            let report = seed::run(&services, reset).await?;
            info!(
                users = report.users,
                courses = report.courses,
                "seeded demo data"
            );
        }
    }
    Ok(())
}
