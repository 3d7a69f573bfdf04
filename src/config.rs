use std::env;

use thiserror::Error;

const DEFAULT_EMAIL_API_URL: &str = "https://api.resend.com/emails";
const DEFAULT_IMPORT_MAX_BYTES: usize = 5 * 1024 * 1024;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set in environment")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}'")]
    Invalid { name: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub email_api_url: String,
    pub email_api_key: Option<String>,
    pub notify_from: String,
    pub notify_to: Vec<String>,
    pub import_max_bytes: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let port_raw = var("PORT").unwrap_or_else(|| "8082".to_string());
        let port = port_raw.parse().map_err(|_| ConfigError::Invalid {
            name: "PORT",
            value: port_raw.clone(),
        })?;

        let import_max_bytes = match var("IMPORT_MAX_BYTES") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                name: "IMPORT_MAX_BYTES",
                value: raw.clone(),
            })?,
            None => DEFAULT_IMPORT_MAX_BYTES,
        };

        Ok(Self {
            host: var("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port,
            database_url: var("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?,
            email_api_url: var("EMAIL_API_URL").unwrap_or_else(|| DEFAULT_EMAIL_API_URL.to_string()),
            email_api_key: var("EMAIL_API_KEY"),
            notify_from: var("NOTIFY_FROM")
                .unwrap_or_else(|| "Antigua Directory <noreply@antiguadirectory.com>".to_string()),
            notify_to: var("NOTIFY_TO")
                .map(|raw| {
                    raw.split(',')
                        .map(str::trim)
                        .filter(|addr| !addr.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default(),
            import_max_bytes,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn defaults_apply_when_only_database_url_set() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "postgres://localhost/dir")]))
            .expect("config should load");
        assert_eq!(config.bind_address(), "127.0.0.1:8082");
        assert_eq!(config.email_api_url, DEFAULT_EMAIL_API_URL);
        assert_eq!(config.email_api_key, None);
        assert!(config.notify_to.is_empty());
        assert_eq!(config.import_max_bytes, DEFAULT_IMPORT_MAX_BYTES);
    }

    #[test]
    fn missing_database_url_is_an_error() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "9000")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("DATABASE_URL"));
    }

    #[test]
    fn invalid_port_is_reported() {
        let err = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/dir"),
            ("PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { name: "PORT", .. }));
    }

    #[test]
    fn notify_to_splits_on_commas() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/dir"),
            ("NOTIFY_TO", "a@example.com, b@example.com,,"),
        ]))
        .expect("config should load");
        assert_eq!(config.notify_to, vec!["a@example.com", "b@example.com"]);
    }
}
