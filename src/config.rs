use std::{env, fmt::Display, str::FromStr};

use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub secret: String,
    pub bind_addr: String,
    /// Public URL of the web front-end, used for links in e-mails.
    pub app_url: String,
    pub cors_origin: Option<String>,
    pub admin: Option<AdminBootstrap>,
}

#[derive(Clone, Debug)]
pub struct AdminBootstrap {
    pub email: String,
    pub password: String,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("Invalid {key} value: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap { email, password }),
            (None, None) => None,
            _ => {
                warn!("ADMIN_EMAIL and ADMIN_PASSWORD must be set together, skipping admin bootstrap");
                None
            }
        };

        let secret = required("SECRET")?;
        if secret.len() < 16 {
            return Err(ConfigError::Invalid {
                key: "SECRET",
                reason: "must be at least 16 characters".into(),
            });
        }

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            secret,
            bind_addr: try_load("BIND_ADDR", "0.0.0.0:3000")?,
            app_url: try_load::<String>("APP_URL", "http://localhost:3000")?
                .trim_end_matches('/')
                .to_owned(),
            cors_origin: var("CORS_ORIGIN"),
            admin,
        })
    }
}

fn var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    var(key).ok_or(ConfigError::Missing(key))
}

fn try_load<T: FromStr>(key: &'static str, default: &str) -> Result<T, ConfigError>
where
    T::Err: Display,
{
    var(key)
        .unwrap_or_else(|| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
        })
}
