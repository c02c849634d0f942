use std::str::FromStr;

use crate::error::Error;

pub const DEFAULT_LOG_FILTER: &str = "info,actix_web=info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl FromStr for StoreKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreKind::Postgres),
            "memory" => Ok(StoreKind::Memory),
            other => Err(Error::ServerError(format!("unknown STORE '{}', expected 'postgres' or 'memory'", other))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub bind_address: String,
    pub port: u16,
    pub max_connections: u32,
}

fn parse_var<T: FromStr>(name: &str, default: T) -> Result<T, Error> {
    match dotenv::var(name) {
        Ok(value) => value.trim().parse().map_err(|_| Error::ServerError(format!("environment variable {} has an invalid value '{}'", name, value))),
        Err(_) => Ok(default),
    }
}

impl Config {
    /// Reads the process environment, after `.env` has been loaded.
    pub fn from_env() -> Result<Self, Error> {
        let store = match dotenv::var("STORE") {
            Ok(value) => value.parse()?,
            Err(_) => StoreKind::Postgres,
        };
        let database_url = match store {
            StoreKind::Postgres => Some(dotenv::var("DATABASE_URL")?),
            StoreKind::Memory => dotenv::var("DATABASE_URL").ok(),
        };
        Ok(Config {
            store,
            database_url,
            bind_address: dotenv::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0".into()),
            port: parse_var("PORT", 8000)?,
            max_connections: parse_var("MAX_CONNECTIONS", 5)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_is_case_insensitive() {
        assert_eq!("Memory".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert_eq!(" postgres ".parse::<StoreKind>().unwrap(), StoreKind::Postgres);
        assert!("redis".parse::<StoreKind>().is_err());
    }
}
