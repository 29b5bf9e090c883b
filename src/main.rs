use etherxword::config::Config;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("etherxword=info")))
        .init();

    let config = Config::from_env()?;
    if !config.production {
        tracing::info!(database = %config.database_path.display(), "running in development mode");
    }

    etherxword::run(config).await
}
