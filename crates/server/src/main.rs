use gatehouse::AppResources;
use gatehouse::api::start_webserver;
use gatehouse::config::load_config;
use gatehouse::mail::smtp_transport;
use gatehouse::session::spawn_cleanup_task;
use rustls::crypto;
use rustls::crypto::CryptoProvider;
use sea_orm::Database;
use std::sync::Arc;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

fn initialize_tracing() {
    let default_directives = "gatehouse=info,tower_http=info,sea_orm=warn";
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives));

    let layer = fmt::layer().with_target(true).with_level(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layer)
        .init();
}

#[tokio::main]
async fn main() -> color_eyre::eyre::Result<()> {
    color_eyre::install()?;

    // A missing .env is fine; real deployments set the environment directly
    let _ = dotenvy::dotenv();

    initialize_tracing();

    let config = Arc::new(load_config()?);

    CryptoProvider::install_default(crypto::ring::default_provider())
        .map_err(|_| color_eyre::eyre::eyre!("Failed to install crypto provider"))?;

    let db = Arc::new(Database::connect(&config.database_url).await?);

    let mailer = Arc::new(smtp_transport(&config.smtp)?);

    let http = reqwest::Client::builder()
        .user_agent(concat!("gatehouse/", env!("CARGO_PKG_VERSION")))
        .timeout(std::time::Duration::from_secs(10))
        .build()?;

    tracing::info!(
        captcha = config.captcha.enabled,
        google = config.google.enabled,
        public_url = %config.public_url,
        "Configuration loaded"
    );

    let resources = AppResources {
        db,
        mailer,
        config,
        http,
    };

    spawn_cleanup_task(resources.clone());

    start_webserver(resources).await
}
