use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use tokio::net::TcpListener;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use smarteam::api::{self, AppState};
use smarteam::auth::{AuthState, PasswordHasher};
use smarteam::config::{self, APP_NAME, AppConfig, LogFormat, LoggingConfig};
use smarteam::db::Database;
use smarteam::seed::{self, AdminSeedConfig, SeedOutcome};
use smarteam::user::{UserRepository, UserService};

#[derive(Debug, Parser)]
#[command(name = "smarteam")]
#[command(about = "Smarteam authentication server")]
#[command(version, propagate_version = true)]
struct Cli {
    /// Config file or directory (defaults to the user config dir)
    #[arg(short, long, env = "SMARTEAM_CONFIG", global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the HTTP API server
    Serve(ServeArgs),
    /// Create the admin account if no admin exists
    SeedAdmin(DatabaseArgs),
    /// Write a default config file
    Init {
        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },
    /// Inspect the configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions {
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Debug, Args)]
struct ServeArgs {
    /// Address to bind to (defaults to server.host)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (defaults to server.port)
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    #[command(flatten)]
    database: DatabaseArgs,
}

#[derive(Debug, Args)]
struct DatabaseArgs {
    /// Database URL (defaults to database.url)
    #[arg(long, env = "DATABASE_URL", value_name = "URL")]
    database_url: Option<String>,
}

#[derive(Debug, Subcommand)]
enum ConfigCommand {
    /// Print the effective configuration
    Show {
        #[arg(long, value_enum, default_value_t = OutputFormat::Toml)]
        format: OutputFormat,
    },
    /// Print the config file path
    Path,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Toml,
    Json,
    Yaml,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config_path = config::resolve_config_path(cli.config.as_deref())?;

    match cli.command {
        Command::Serve(args) => {
            let config = load_config(&config_path, cli.verbose)?;
            serve(config, args).await
        }
        Command::SeedAdmin(args) => {
            let config = load_config(&config_path, cli.verbose)?;
            seed_admin(config, args).await
        }
        Command::Init { force } => init(&config_path, force),
        Command::Config(ConfigCommand::Show { format }) => {
            show_config(&AppConfig::load(&config_path)?, format)
        }
        Command::Config(ConfigCommand::Path) => {
            println!("{}", config_path.display());
            Ok(())
        }
        Command::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), APP_NAME, &mut io::stdout());
            Ok(())
        }
    }
}

fn load_config(path: &Path, verbose: u8) -> Result<AppConfig> {
    let config = AppConfig::load_or_init(path)?;
    init_tracing(&config.logging, verbose);
    info!("Using config {}", path.display());
    Ok(config)
}

/// Install the global subscriber. `RUST_LOG` wins over the config level.
///
/// `log` records from dependencies are bridged by the subscriber.
fn init_tracing(logging: &LoggingConfig, verbose: u8) {
    let level = match verbose {
        0 => logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{APP_NAME}={level},tower_http={level}")));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match logging.format {
        LogFormat::Json => registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).try_init(),
    };

    if let Err(e) = result {
        eprintln!("failed to initialize logging: {e}");
    }
}

fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "config already exists at {} (use --force to overwrite)",
            path.display()
        );
    }

    AppConfig::write_default(path)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn show_config(config: &AppConfig, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Toml => toml::to_string_pretty(config).context("serializing config")?,
        OutputFormat::Json => serde_json::to_string_pretty(config).context("serializing config")?,
        OutputFormat::Yaml => serde_yaml::to_string(config).context("serializing config")?,
    };
    println!("{rendered}");
    Ok(())
}

async fn open_database(config: &AppConfig, args: &DatabaseArgs) -> Result<Database> {
    let url = config.database_url(args.database_url.as_deref())?;
    info!("Database: {}", url);
    Database::connect(&url).await
}

async fn seed_admin(config: AppConfig, args: DatabaseArgs) -> Result<()> {
    let database = open_database(&config, &args).await?;
    let users = UserService::new(
        UserRepository::new(database.pool().clone()),
        PasswordHasher::new(config.auth.bcrypt_cost),
    );

    // An explicit run seeds even when startup seeding is switched off.
    let admin = AdminSeedConfig {
        enabled: true,
        ..config.admin
    };

    match seed::seed_admin(&users, &admin).await? {
        SeedOutcome::Created(user) => println!("Created admin {} ({})", user.email, user.id),
        SeedOutcome::AlreadyPresent | SeedOutcome::Disabled => {
            println!("Admin already exists, nothing to do")
        }
    }
    Ok(())
}

async fn serve(config: AppConfig, args: ServeArgs) -> Result<()> {
    let auth = AuthState::new(config.auth.clone()).context("invalid auth configuration")?;
    let addr = config.listen_addr(args.host.as_deref(), args.port)?;

    let database = open_database(&config, &args.database).await?;
    let users = UserService::new(
        UserRepository::new(database.pool().clone()),
        auth.password_hasher(),
    );

    seed::run_startup_seed(&users, &config.admin).await;

    let app = api::create_router(AppState::new(users, auth));

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding to {addr}"))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("running server")?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
