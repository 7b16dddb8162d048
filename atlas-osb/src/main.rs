use std::process;

use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod config;
use config::Config;

/// Open Service Broker for MongoDB Atlas
#[derive(Parser)]
#[command(version)]
struct Cli {}

#[derive(thiserror::Error, Debug)]
enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] config::ConfigError),
    #[error("could not load whitelist: {0}")]
    Whitelist(#[from] broker::WhitelistError),
    #[error("server error: {0}")]
    Io(#[from] std::io::Error),
}

fn main() {
    Cli::parse();
    init_tracing();

    if let Err(err) = run() {
        tracing::error!(error = %err, "startup error");
        process::exit(1);
    }
}

fn run() -> Result<(), StartupError> {
    let config = Config::from_env()?;

    // Administrators control which providers and sizes are advertised;
    // with no whitelist the broker exposes an empty catalog.
    let whitelist = config
        .whitelist_file
        .as_deref()
        .map(broker::Whitelist::from_file)
        .transpose()?;

    let broker = broker::Broker::new(whitelist);
    let app = broker::api::router(config.atlas_base_url.clone(), broker);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let address = format!("{}:{}", config.host, config.port);
        let listener = tokio::net::TcpListener::bind(&address).await?;

        tracing::info!(
            address = %address,
            atlas_base_url = %config.atlas_base_url,
            whitelist_file = ?config.whitelist_file,
            "starting API server"
        );

        axum::serve(listener, app).await
    })?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_env("BROKER_LOG_LEVEL")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
