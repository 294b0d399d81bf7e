use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub server: ServerConfig,
    /// Longest date range (inclusive, in days) a shopping list may cover.
    pub max_plan_range_days: i64,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
        let server = ServerConfig {
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT").unwrap_or(8080),
        };
        Ok(Self {
            database_url,
            db_max_connections: env_parse("DB_MAX_CONNECTIONS").unwrap_or(10),
            server,
            max_plan_range_days: env_parse("MAX_PLAN_RANGE_DAYS").unwrap_or(366),
        })
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    parse_setting(std::env::var(key).ok())
}

/// Unset or unparsable values fall back to the caller's default.
fn parse_setting<T: std::str::FromStr>(raw: Option<String>) -> Option<T> {
    raw.and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listen_addr_joins_host_and_port() {
        let cfg = AppConfig {
            database_url: "postgres://localhost/mealplan".into(),
            db_max_connections: 5,
            server: ServerConfig {
                host: "127.0.0.1".into(),
                port: 3000,
            },
            max_plan_range_days: 366,
        };
        assert_eq!(cfg.listen_addr(), "127.0.0.1:3000");
    }

    #[test]
    fn settings_ignore_garbage() {
        assert_eq!(parse_setting::<u32>(Some("ten".into())), None);
        assert_eq!(parse_setting::<u32>(Some(" 42 ".into())), Some(42));
        assert_eq!(parse_setting::<u32>(Some(String::new())), None);
        assert_eq!(parse_setting::<u32>(None), None);
    }
}
