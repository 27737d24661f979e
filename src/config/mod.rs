use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use dotenvy::dotenv;
use serde::Deserialize;

use crate::routes::Route;

/// Command line options. Values given here win over the environment.
#[derive(Debug, Parser)]
#[command(name = "client_manager", about = "Terminal client directory with role-gated views")]
pub struct Cli {
    /// Run against an in-process backend seeded with demo accounts
    #[arg(long)]
    pub in_memory: bool,

    /// Apply database migrations before starting
    #[arg(long)]
    pub migrate: bool,

    /// PostgreSQL connection URL (overrides DATABASE_URL)
    #[arg(long)]
    pub database_url: Option<String>,

    /// Log file path (overrides LOG_FILE)
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Route to open on startup
    #[arg(long, default_value = "/dashboard")]
    pub start: String,
}

/// Environment-driven settings.
#[derive(Debug, Deserialize)]
struct EnvSettings {
    database_url: Option<String>,
    #[serde(default = "default_max_connections")]
    database_max_connections: u32,
    #[serde(default = "default_log_file")]
    log_file: PathBuf,
    #[serde(default = "default_log_level")]
    log_level: String,
}

fn default_max_connections() -> u32 {
    5
}

fn default_log_file() -> PathBuf {
    PathBuf::from("client_manager.log")
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Configuration for the application
#[derive(Debug)]
pub struct Config {
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    pub log_file: PathBuf,
    pub log_level: String,
    pub in_memory: bool,
    pub run_migrations: bool,
    pub start_route: Route,
}

impl Config {
    /// Load configuration from environment variables, then apply CLI overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        Self::from_vars(std::env::vars(), cli)
    }

    fn from_vars<I>(vars: I, cli: &Cli) -> Result<Self>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env = envy::from_iter::<_, EnvSettings>(vars)?;
        Self::merge(env, cli)
    }

    fn merge(env: EnvSettings, cli: &Cli) -> Result<Self> {
        let start_route = Route::from_path(&cli.start)
            .ok_or_else(|| anyhow!("unknown start route '{}'", cli.start))?;

        let config = Self {
            database_url: cli.database_url.clone().or(env.database_url),
            database_max_connections: env.database_max_connections,
            log_file: cli.log_file.clone().unwrap_or(env.log_file),
            log_level: env.log_level,
            in_memory: cli.in_memory,
            run_migrations: cli.migrate,
            start_route,
        };

        if !config.in_memory && config.database_url.is_none() {
            return Err(anyhow!(
                "DATABASE_URL is not set; pass --database-url or run with --in-memory"
            ));
        }

        Ok(config)
    }

    pub fn database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| anyhow!("no database URL configured"))
    }
}

/// Load `.env`, parse the command line and build the configuration.
pub fn init() -> Result<Config> {
    dotenv().ok();
    let cli = Cli::parse();
    Config::load(&cli)
}
