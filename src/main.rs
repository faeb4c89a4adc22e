//! Command-line entry point for the RADIUS server.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use radius_core::auth::{NullExternalAuthenticator, StaticCredentialStore, StaticSecretTable};
use radius_core::config::Config;
use radius_core::dictionary::Dictionary;
use radius_core::server::ServerBuilder;
use radius_core::Result;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    #[arg(short, long, default_value = "config/radius.toml")]
    config: PathBuf,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a minimal, valid configuration file to get started.
    Init {
        #[arg(short, long, default_value = "config/radius.toml")]
        output: PathBuf,

        /// Shared secret for the example NAS entry. A random one is generated if omitted.
        #[arg(short, long)]
        secret: Option<String>,
    },
    /// Load and validate a configuration file without starting the server.
    Test {
        #[arg(short, long, default_value = "config/radius.toml")]
        config: PathBuf,
    },
    /// Start the RADIUS server.
    Start {
        #[arg(short, long, default_value = "config/radius.toml")]
        config: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    match args.command {
        Some(Commands::Init { output, secret }) => run_init(output, secret)?,
        Some(Commands::Test { config }) => run_test(config)?,
        Some(Commands::Start { config }) => run_start(config).await?,
        None => run_start(args.config).await?,
    }

    Ok(())
}

fn run_init(output: PathBuf, secret: Option<String>) -> Result<()> {
    let secret = secret.unwrap_or_else(|| {
        thread_rng().sample_iter(&Alphanumeric).take(32).map(char::from).collect()
    });
    let config = Config::template(secret);

    if let Some(parent) = output.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&output, config.export()?)?;
    tracing::info!(path = ?output, "wrote configuration template");
    Ok(())
}

fn run_test(config_path: PathBuf) -> Result<()> {
    let config = Config::from_file(&config_path)?;
    tracing::info!(
        nas_count = config.nas_settings.len(),
        bind_auth = %config.server.bind_auth,
        bind_acct = %config.server.bind_acct,
        "configuration is valid"
    );
    let _ = config;
    Ok(())
}

async fn run_start(config_path: PathBuf) -> Result<()> {
    let config = Config::from_file(&config_path)?;
    let dict = Arc::new(Dictionary::with_defaults());

    let mut builder = ServerBuilder::from_config(dict, &config)
        .secret_resolver(Arc::new(StaticSecretTable::new(config.secret_table())))
        .external_authenticator(Arc::new(NullExternalAuthenticator));

    if config.auth.validate_by_credential_store {
        builder = builder.credential_store(Arc::new(StaticCredentialStore::new(config.credential_map())));
    }

    let server = Arc::new(builder.build().await?);
    tracing::info!(
        bind_auth = %config.server.bind_auth,
        bind_acct = %config.server.bind_acct,
        "starting RADIUS server"
    );
    server.run().await?;
    Ok(())
}
