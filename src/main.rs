use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use steadfast::cli::{AdminCommands, UserCommands, run_init, run_levels, run_user_add, run_user_list};
use steadfast::coach::CoachClient;
use steadfast::config::ServerConfig;
use steadfast::progression::LevelTable;
use steadfast::server::{AppState, create_router};
use steadfast::store::{SqliteStore, Store};

#[derive(Parser)]
#[command(name = "steadfast")]
#[command(about = "A habit-recovery server with streaks, levels and coaching", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Administrative commands
    Admin {
        #[command(subcommand)]
        command: AdminCommands,
    },

    /// Start the server
    Serve {
        /// TOML config file; flags below override its values
        #[arg(long, short)]
        config: Option<PathBuf>,

        /// Host to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to bind to
        #[arg(long, short)]
        port: Option<u16>,

        /// Data directory for the database
        #[arg(long)]
        data_dir: Option<PathBuf>,

        /// TOML level table replacing the built-in one
        #[arg(long)]
        levels_path: Option<PathBuf>,

        /// OpenAI-compatible chat-completions URL for the coach
        #[arg(long)]
        coach_endpoint: Option<String>,

        /// Model name sent to the coach provider
        #[arg(long)]
        coach_model: Option<String>,

        /// API key for the coach provider
        #[arg(long, env = "STEADFAST_COACH_API_KEY", hide_env_values = true)]
        coach_api_key: Option<String>,

        /// Shared secret for billing webhook signatures
        #[arg(long, env = "STEADFAST_BILLING_SECRET", hide_env_values = true)]
        billing_secret: Option<String>,
    },

    /// Show the level table
    Levels {
        /// TOML level table to validate and show instead of the built-in one
        #[arg(long)]
        levels_path: Option<PathBuf>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

struct ServeArgs {
    config: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    data_dir: Option<PathBuf>,
    levels_path: Option<PathBuf>,
    coach_endpoint: Option<String>,
    coach_model: Option<String>,
    coach_api_key: Option<String>,
    billing_secret: Option<String>,
}

impl ServeArgs {
    fn into_config(self) -> anyhow::Result<ServerConfig> {
        let mut config = match &self.config {
            Some(path) => ServerConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => ServerConfig::default(),
        };

        if let Some(host) = self.host {
            config.host = host;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(data_dir) = self.data_dir {
            config.data_dir = data_dir;
        }
        if self.levels_path.is_some() {
            config.levels_path = self.levels_path;
        }
        if self.coach_endpoint.is_some() {
            config.coach.endpoint = self.coach_endpoint;
        }
        if self.coach_model.is_some() {
            config.coach.model = self.coach_model;
        }
        if self.coach_api_key.is_some() {
            config.coach.api_key = self.coach_api_key;
        }
        if self.billing_secret.is_some() {
            config.billing.webhook_secret = self.billing_secret;
        }

        Ok(config)
    }
}

async fn run_serve(config: ServerConfig) -> anyhow::Result<()> {
    let token_file = config.admin_token_path();
    if !token_file.exists() {
        bail!(
            "Server not initialized. Run 'steadfast admin init' first to create the database and admin token."
        );
    }

    let store = SqliteStore::new(config.db_path())?;
    store.initialize()?;
    if !store.has_admin_token()? {
        bail!(
            "Server not initialized. Run 'steadfast admin init' first to create the database and admin token."
        );
    }

    info!("Admin token available at {}", token_file.display());

    let levels = match &config.levels_path {
        Some(path) => {
            let table = LevelTable::load(path)
                .with_context(|| format!("failed to load level table {}", path.display()))?;
            info!(
                "Loaded level table v{} with {} tiers from {}",
                table.version(),
                table.tiers().len(),
                path.display()
            );
            table
        }
        None => LevelTable::builtin().clone(),
    };

    let coach = CoachClient::new(&config.coach)?;
    if !coach.is_enabled() {
        info!("No coach endpoint configured; coach replies will use the fallback message");
    }
    if config.billing.webhook_secret.is_none() {
        info!("No billing secret configured; billing webhooks are disabled");
    }

    let state = Arc::new(AppState::new(
        Arc::new(store),
        Arc::new(levels),
        coach,
        config.billing.webhook_secret.clone(),
    ));

    let app = create_router(state);
    let addr = config.socket_addr()?;

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("steadfast=info".parse()?))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Admin { command } => match command {
            AdminCommands::Init {
                data_dir,
                non_interactive,
            } => run_init(data_dir, non_interactive)?,
            AdminCommands::User { command } => match command {
                UserCommands::Add {
                    data_dir,
                    name,
                    token,
                    non_interactive,
                } => run_user_add(data_dir, name, token, non_interactive)?,
                UserCommands::List { data_dir, json } => run_user_list(data_dir, json)?,
            },
        },
        Commands::Serve {
            config,
            host,
            port,
            data_dir,
            levels_path,
            coach_endpoint,
            coach_model,
            coach_api_key,
            billing_secret,
        } => {
            let config = ServeArgs {
                config,
                host,
                port,
                data_dir,
                levels_path,
                coach_endpoint,
                coach_model,
                coach_api_key,
                billing_secret,
            }
            .into_config()?;
            run_serve(config).await?;
        }
        Commands::Levels { levels_path, json } => run_levels(levels_path, json)?,
    }

    Ok(())
}
