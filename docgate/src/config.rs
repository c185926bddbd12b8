//! Environment-sourced gateway configuration.
//!
//! Everything is read once at startup. [`GatewayConfig::from_env`] collects the
//! process environment (after `.env` has been loaded) and hands it to
//! [`GatewayConfig::from_kv`], which does the actual parsing and can be driven
//! from a plain map in tests.

use std::{collections::HashMap, fmt};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_MEMORY_DATABASE: &str = "test";
pub const DEFAULT_RESEND_API_URL: &str = "https://api.resend.com/emails";
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 587;
pub const DEFAULT_SENDER_NAME: &str = "LMS";
pub const DEFAULT_SENDER_ADDRESS: &str = "onboarding@resend.dev";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// A credential that never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(****)")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayConfig {
    pub port: u16,
    pub store: StoreConfig,
    pub email: EmailConfig,
}

/// Which backend serves the document operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    MongoDb { uri: Secret, database: String },
    Memory { database: String },
}

impl StoreConfig {
    pub fn database(&self) -> &str {
        match self {
            StoreConfig::MongoDb { database, .. } | StoreConfig::Memory { database } => database,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self {
            StoreConfig::MongoDb { .. } => "mongodb",
            StoreConfig::Memory { .. } => "memory",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailConfig {
    /// `None` when no transport credentials are configured.
    pub transport: Option<TransportConfig>,
    pub sender_name: String,
    pub sender_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportConfig {
    Resend {
        api_key: Secret,
        api_url: String,
    },
    Smtp {
        host: String,
        port: u16,
        username: String,
        password: Secret,
    },
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let kv = std::env::vars().collect::<HashMap<_, _>>();
        Self::from_kv(&kv)
    }

    pub fn from_kv(kv: &HashMap<String, String>) -> Result<Self, ConfigError> {
        Ok(Self {
            port: parse_u16(kv, "PORT", DEFAULT_PORT)?,
            store: parse_store(kv)?,
            email: parse_email(kv)?,
        })
    }
}

/// Returns the trimmed value of `key`, treating blank values as unset.
fn get<'a>(kv: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    kv.get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn require<'a>(kv: &'a HashMap<String, String>, key: &'static str) -> Result<&'a str, ConfigError> {
    get(kv, key).ok_or(ConfigError::Missing(key))
}

fn parse_u16(kv: &HashMap<String, String>, key: &'static str, default: u16) -> Result<u16, ConfigError> {
    match get(kv, key) {
        None => Ok(default),
        Some(raw) => raw.parse::<u16>().map_err(|e| ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn parse_store(kv: &HashMap<String, String>) -> Result<StoreConfig, ConfigError> {
    match get(kv, "STORE_BACKEND").map(str::to_ascii_lowercase).as_deref() {
        None | Some("mongodb") | Some("mongo") => {
            let database = require(kv, "DATABASE_NAME")?.to_string();
            let uri = match get(kv, "MONGODB_URI") {
                Some(uri) => uri.to_string(),
                None => format!(
                    "mongodb+srv://{}:{}@{}/{}?retryWrites=true&w=majority",
                    require(kv, "MONGODB_USERNAME")?,
                    require(kv, "MONGODB_PASSWORD")?,
                    require(kv, "MONGODB_CLUSTER")?,
                    database,
                ),
            };

            Ok(StoreConfig::MongoDb { uri: Secret::new(uri), database })
        },
        Some("memory") => Ok(StoreConfig::Memory {
            database: get(kv, "DATABASE_NAME")
                .unwrap_or(DEFAULT_MEMORY_DATABASE)
                .to_string(),
        }),
        Some(other) => Err(ConfigError::Invalid {
            key: "STORE_BACKEND",
            value: other.to_string(),
            reason: "expected 'mongodb' or 'memory'".to_string(),
        }),
    }
}

fn parse_email(kv: &HashMap<String, String>) -> Result<EmailConfig, ConfigError> {
    let transport = match get(kv, "EMAIL_TRANSPORT").map(str::to_ascii_lowercase).as_deref() {
        Some("resend") => Some(resend_transport(kv, require(kv, "RESEND_API_KEY")?)),
        Some("smtp") => Some(smtp_transport(
            kv,
            require(kv, "SMTP_USERNAME")?,
            require(kv, "SMTP_PASSWORD")?,
        )?),
        Some("none") | Some("disabled") => None,
        Some(other) => {
            return Err(ConfigError::Invalid {
                key: "EMAIL_TRANSPORT",
                value: other.to_string(),
                reason: "expected 'resend', 'smtp' or 'none'".to_string(),
            });
        },
        None => match (
            get(kv, "RESEND_API_KEY"),
            get(kv, "SMTP_USERNAME"),
            get(kv, "SMTP_PASSWORD"),
        ) {
            (Some(api_key), _, _) => Some(resend_transport(kv, api_key)),
            (None, Some(username), Some(password)) => Some(smtp_transport(kv, username, password)?),
            _ => None,
        },
    };

    Ok(EmailConfig {
        transport,
        sender_name: get(kv, "EMAIL_SENDER_NAME")
            .unwrap_or(DEFAULT_SENDER_NAME)
            .to_string(),
        sender_address: get(kv, "EMAIL_FROM")
            .unwrap_or(DEFAULT_SENDER_ADDRESS)
            .to_string(),
    })
}

fn resend_transport(kv: &HashMap<String, String>, api_key: &str) -> TransportConfig {
    TransportConfig::Resend {
        api_key: Secret::new(api_key),
        api_url: get(kv, "RESEND_API_URL")
            .unwrap_or(DEFAULT_RESEND_API_URL)
            .to_string(),
    }
}

fn smtp_transport(
    kv: &HashMap<String, String>,
    username: &str,
    password: &str,
) -> Result<TransportConfig, ConfigError> {
    Ok(TransportConfig::Smtp {
        host: get(kv, "SMTP_HOST")
            .unwrap_or(DEFAULT_SMTP_HOST)
            .to_string(),
        port: parse_u16(kv, "SMTP_PORT", DEFAULT_SMTP_PORT)?,
        username: username.to_string(),
        password: Secret::new(password),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kv(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn memory_store_needs_nothing_else() {
        let config = GatewayConfig::from_kv(&kv(&[("STORE_BACKEND", "memory")])).unwrap();

        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.store, StoreConfig::Memory { database: "test".into() });
        assert_eq!(config.email.transport, None);
        assert_eq!(config.email.sender_name, "LMS");
        assert_eq!(config.email.sender_address, "onboarding@resend.dev");
    }

    #[test]
    fn atlas_credentials_build_an_srv_uri() {
        let config = GatewayConfig::from_kv(&kv(&[
            ("MONGODB_USERNAME", "app"),
            ("MONGODB_PASSWORD", "pw"),
            ("MONGODB_CLUSTER", "cluster0.abcde.mongodb.net"),
            ("DATABASE_NAME", "lms"),
            ("PORT", "9000"),
        ]))
        .unwrap();

        assert_eq!(config.port, 9000);
        assert_eq!(
            config.store,
            StoreConfig::MongoDb {
                uri: Secret::new("mongodb+srv://app:pw@cluster0.abcde.mongodb.net/lms?retryWrites=true&w=majority"),
                database: "lms".into(),
            }
        );
    }

    #[test]
    fn explicit_uri_wins_over_parts() {
        let config = GatewayConfig::from_kv(&kv(&[
            ("MONGODB_URI", "mongodb://localhost:27017"),
            ("MONGODB_USERNAME", "ignored"),
            ("DATABASE_NAME", "lms"),
        ]))
        .unwrap();

        match config.store {
            StoreConfig::MongoDb { uri, .. } => assert_eq!(uri.expose(), "mongodb://localhost:27017"),
            other => panic!("unexpected store: {other:?}"),
        }
    }

    #[test]
    fn mongodb_requires_a_database_and_credentials() {
        assert_eq!(
            GatewayConfig::from_kv(&kv(&[("MONGODB_URI", "mongodb://localhost")])).unwrap_err(),
            ConfigError::Missing("DATABASE_NAME")
        );
        assert_eq!(
            GatewayConfig::from_kv(&kv(&[("DATABASE_NAME", "lms"), ("MONGODB_USERNAME", "app")])).unwrap_err(),
            ConfigError::Missing("MONGODB_PASSWORD")
        );
    }

    #[test]
    fn invalid_values_are_reported() {
        let err = GatewayConfig::from_kv(&kv(&[("STORE_BACKEND", "memory"), ("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "PORT", .. }));

        let err = GatewayConfig::from_kv(&kv(&[("STORE_BACKEND", "postgres")])).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { key: "STORE_BACKEND", .. }));
    }

    #[test]
    fn email_transport_is_inferred_from_credentials() {
        let resend = GatewayConfig::from_kv(&kv(&[
            ("STORE_BACKEND", "memory"),
            ("RESEND_API_KEY", "re_123"),
            ("SMTP_USERNAME", "u"),
            ("SMTP_PASSWORD", "p"),
        ]))
        .unwrap();
        assert_eq!(
            resend.email.transport,
            Some(TransportConfig::Resend {
                api_key: Secret::new("re_123"),
                api_url: DEFAULT_RESEND_API_URL.into(),
            })
        );

        let smtp = GatewayConfig::from_kv(&kv(&[
            ("STORE_BACKEND", "memory"),
            ("SMTP_USERNAME", "u"),
            ("SMTP_PASSWORD", "p"),
            ("SMTP_PORT", "465"),
        ]))
        .unwrap();
        assert_eq!(
            smtp.email.transport,
            Some(TransportConfig::Smtp {
                host: DEFAULT_SMTP_HOST.into(),
                port: 465,
                username: "u".into(),
                password: Secret::new("p"),
            })
        );
    }

    #[test]
    fn explicit_transport_requires_its_credentials() {
        let err = GatewayConfig::from_kv(&kv(&[("STORE_BACKEND", "memory"), ("EMAIL_TRANSPORT", "smtp")])).unwrap_err();
        assert_eq!(err, ConfigError::Missing("SMTP_USERNAME"));

        let none = GatewayConfig::from_kv(&kv(&[
            ("STORE_BACKEND", "memory"),
            ("EMAIL_TRANSPORT", "none"),
            ("RESEND_API_KEY", "re_123"),
        ]))
        .unwrap();
        assert_eq!(none.email.transport, None);
    }

    #[test]
    fn blank_values_count_as_unset() {
        let config = GatewayConfig::from_kv(&kv(&[
            ("STORE_BACKEND", "memory"),
            ("RESEND_API_KEY", "   "),
            ("EMAIL_SENDER_NAME", ""),
        ]))
        .unwrap();

        assert_eq!(config.email.transport, None);
        assert_eq!(config.email.sender_name, DEFAULT_SENDER_NAME);
    }

    #[test]
    fn secrets_are_not_debug_printed() {
        let secret = Secret::new("hunter2");
        assert!(!format!("{secret:?}").contains("hunter2"));
    }
}
