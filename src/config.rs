use anyhow::{bail, Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

const DEV_JWT_SECRET: &str = "etherxword-dev-secret-change-me";

#[derive(Clone, Debug)]
pub struct Config {
    pub bind_addr: SocketAddr,
    pub database_path: PathBuf,
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    /// How long a trashed document survives before the sweeper removes it
    pub trash_retention: Duration,
    pub sweep_interval: Duration,
    pub mail_webhook_url: Option<String>,
    pub production: bool,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // Load .env if present

        let production = env::var("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let jwt_secret = match env::var("JWT_SECRET") {
            Ok(secret) if !secret.is_empty() => secret,
            _ if production => bail!("JWT_SECRET must be set when APP_ENV=production"),
            _ => {
                tracing::warn!("JWT_SECRET not set, using the development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let database_path = match env::var("DATABASE_PATH") {
            Ok(path) => PathBuf::from(path),
            Err(_) => dirs::data_dir()
                .context("could not determine a data directory, set DATABASE_PATH")?
                .join("etherxword")
                .join("etherxword.db"),
        };

        Ok(Config {
            bind_addr: env::var("ETHERXWORD_ADDR")
                .unwrap_or_else(|_| "0.0.0.0:5000".to_string())
                .parse()
                .context("ETHERXWORD_ADDR must be a socket address")?,
            database_path,
            jwt_secret,
            access_token_ttl: secs_var("ACCESS_TOKEN_TTL_SECS", 15 * 60)?,
            refresh_token_ttl: secs_var("REFRESH_TOKEN_TTL_SECS", 7 * 24 * 60 * 60)?,
            trash_retention: secs_var("TRASH_RETENTION_SECS", 60 * 60)?,
            sweep_interval: non_zero("TRASH_SWEEP_INTERVAL_SECS", secs_var("TRASH_SWEEP_INTERVAL_SECS", 10 * 60)?)?,
            mail_webhook_url: env::var("MAIL_WEBHOOK_URL").ok().filter(|u| !u.is_empty()),
            production,
        })
    }
}

fn secs_var(name: &str, default: u64) -> Result<Duration> {
    parse_secs(name, env::var(name).ok(), default)
}

fn parse_secs(name: &str, raw: Option<String>, default: u64) -> Result<Duration> {
    match raw {
        Some(raw) => {
            let secs: u64 = raw
                .trim()
                .parse()
                .with_context(|| format!("{} must be a number of seconds", name))?;
            Ok(Duration::from_secs(secs))
        }
        None => Ok(Duration::from_secs(default)),
    }
}

/// Periods fed to `tokio::time::interval` must be non-zero
fn non_zero(name: &str, value: Duration) -> Result<Duration> {
    if value.is_zero() {
        bail!("{} must be greater than zero", name);
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_secs() {
        assert_eq!(parse_secs("X", None, 600).unwrap(), Duration::from_secs(600));
        assert_eq!(parse_secs("X", Some(" 30 ".into()), 600).unwrap(), Duration::from_secs(30));
        assert!(parse_secs("X", Some("ten".into()), 600).is_err());
    }

    #[test]
    fn test_zero_sweep_interval_is_rejected() {
        let zero = parse_secs("TRASH_SWEEP_INTERVAL_SECS", Some("0".into()), 600).unwrap();
        let err = non_zero("TRASH_SWEEP_INTERVAL_SECS", zero).unwrap_err();
        assert!(err.to_string().contains("TRASH_SWEEP_INTERVAL_SECS"));

        assert!(non_zero("TRASH_SWEEP_INTERVAL_SECS", Duration::from_secs(1)).is_ok());
    }
}
