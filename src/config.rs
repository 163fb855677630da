use serde::Deserialize;
use sqlx::postgres::PgConnectOptions;

use crate::error::{AdminError, Result};

#[derive(Debug, Clone, Deserialize)]
pub enum DatabaseConfig {
    Url(String),
    Parts {
        host: String,
        port: u16,
        name: String,
        user: String,
        password: String,
    },
}

/// Argon2 work factor. `None` fields fall back to the argon2 crate defaults.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HashConfig {
    pub memory_kib: Option<u32>,
    pub iterations: Option<u32>,
    pub parallelism: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub hash: HashConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_source(|key| std::env::var(key).ok())
    }

    pub fn from_source<F>(get: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database = match get("DATABASE_URL").filter(|v| !v.is_empty()) {
            Some(url) => DatabaseConfig::Url(url),
            None => DatabaseConfig::Parts {
                host: get("DB_HOST").unwrap_or_else(|| "localhost".into()),
                port: match get("DB_PORT") {
                    Some(v) => v
                        .parse::<u16>()
                        .map_err(|_| AdminError::Config(format!("DB_PORT is not a port: {v}")))?,
                    None => 5432,
                },
                name: required(&get, "DB_NAME")?,
                user: required(&get, "DB_USER")?,
                password: get("DB_PASSWORD").unwrap_or_default(),
            },
        };

        let hash = HashConfig {
            memory_kib: optional_u32(&get, "HASH_MEMORY_KIB")?,
            iterations: optional_u32(&get, "HASH_ITERATIONS")?,
            parallelism: optional_u32(&get, "HASH_PARALLELISM")?,
        };

        Ok(Self { database, hash })
    }
}

impl DatabaseConfig {
    pub fn connect_options(&self) -> Result<PgConnectOptions> {
        match self {
            DatabaseConfig::Url(url) => url
                .parse::<PgConnectOptions>()
                .map_err(|e| AdminError::Config(format!("DATABASE_URL: {e}"))),
            DatabaseConfig::Parts {
                host,
                port,
                name,
                user,
                password,
            } => Ok(PgConnectOptions::new()
                .host(host)
                .port(*port)
                .database(name)
                .username(user)
                .password(password)),
        }
    }
}

fn required<F>(get: &F, key: &str) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| AdminError::Config(format!("{key} must be set when DATABASE_URL is not")))
}

fn optional_u32<F>(get: &F, key: &str) -> Result<Option<u32>>
where
    F: Fn(&str) -> Option<String>,
{
    get(key)
        .map(|v| {
            v.parse::<u32>()
                .map_err(|_| AdminError::Config(format!("{key} is not a number: {v}")))
        })
        .transpose()
}
