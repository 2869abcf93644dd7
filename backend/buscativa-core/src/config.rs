// src/config.rs
use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::warn;

use crate::error::AppError;

pub const DEFAULT_SECRET_KEY: &str = "troque-essa-chave-por-uma-segura";
pub const DEFAULT_SMTP_PORT: u16 = 587;

fn default_smtp_port() -> u16 {
    DEFAULT_SMTP_PORT
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_monitors_file() -> PathBuf {
    PathBuf::from("monitores.csv")
}

fn default_session_ttl_hours() -> u64 {
    12
}

/// Command-line overrides. Anything given here wins over the environment.
#[derive(Parser, Debug, Default)]
#[command(name = "buscativa-core", about = "Registro de faltas da busca ativa")]
pub struct Cli {
    /// HTTP listen port
    #[arg(long)]
    pub port: Option<u16>,
    /// Directory holding the monthly ledgers
    #[arg(long)]
    pub data_dir: Option<PathBuf>,
    /// Semicolon-delimited monitor credentials file
    #[arg(long)]
    pub monitors_file: Option<PathBuf>,
}

/// Process-wide configuration, resolved once at startup and shared by reference.
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub secret_key: Option<String>,

    // SMTP relay
    #[serde(default)]
    pub smtp_server: Option<String>,
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
    #[serde(default)]
    pub smtp_user: Option<String>,
    #[serde(default)]
    pub smtp_pass: Option<String>,
    #[serde(default)]
    pub recipient_email: Option<String>,

    // Server
    #[serde(default = "default_bind_host")]
    pub bind_host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cert_path: Option<String>,
    #[serde(default)]
    pub key_path: Option<String>,

    // Storage
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_monitors_file")]
    pub monitores_file: PathBuf,

    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            smtp_server: None,
            smtp_port: DEFAULT_SMTP_PORT,
            smtp_user: None,
            smtp_pass: None,
            recipient_email: None,
            bind_host: default_bind_host(),
            port: default_port(),
            cert_path: None,
            key_path: None,
            data_dir: default_data_dir(),
            monitores_file: default_monitors_file(),
            session_ttl_hours: default_session_ttl_hours(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        // Load .env file if it exists
        dotenv::dotenv().ok();
        Self::from_vars(std::env::vars())
    }

    /// Reads the config from `NAME=value` pairs named like the environment.
    pub fn from_vars<I>(vars: I) -> Result<Self, AppError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        Ok(envy::from_iter::<_, AppConfig>(vars)?)
    }

    pub fn apply_cli(mut self, cli: Cli) -> Self {
        if let Some(port) = cli.port {
            self.port = port;
        }
        if let Some(dir) = cli.data_dir {
            self.data_dir = dir;
        }
        if let Some(file) = cli.monitors_file {
            self.monitores_file = file;
        }
        self
    }

    pub fn secret_key(&self) -> &str {
        match non_empty(&self.secret_key) {
            Some(key) => key,
            None => {
                warn!("SECRET_KEY not set, using the built-in default. Set it in production.");
                DEFAULT_SECRET_KEY
            }
        }
    }

    pub fn smtp_settings(&self) -> SmtpSettings {
        SmtpSettings {
            host: non_empty(&self.smtp_server).map(str::to_string),
            port: self.smtp_port,
            username: non_empty(&self.smtp_user).map(str::to_string),
            password: non_empty(&self.smtp_pass).map(str::to_string),
            recipient: non_empty(&self.recipient_email).map(str::to_string),
        }
    }

    /// Both paths must be present for TLS; one alone is ignored with a warning.
    pub fn tls_paths(&self) -> Option<(PathBuf, PathBuf)> {
        match (non_empty(&self.cert_path), non_empty(&self.key_path)) {
            (Some(cert), Some(key)) => Some((PathBuf::from(cert), PathBuf::from(key))),
            (None, None) => None,
            _ => {
                warn!("Only one of CERT_PATH/KEY_PATH is set. Serving plain HTTP.");
                None
            }
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// SMTP relay settings as read from the environment. Any field may be missing.
#[derive(Debug, Clone, Default)]
pub struct SmtpSettings {
    pub host: Option<String>,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub recipient: Option<String>,
}

/// The subset of [`SmtpSettings`] needed to actually send mail.
#[derive(Debug, Clone, PartialEq)]
pub struct SmtpRelay {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub recipient: String,
}

impl SmtpSettings {
    /// `None` when host, username, password or recipient is missing.
    pub fn relay(&self) -> Option<SmtpRelay> {
        Some(SmtpRelay {
            host: self.host.clone()?,
            port: self.port,
            username: self.username.clone()?,
            password: self.password.clone()?,
            recipient: self.recipient.clone()?,
        })
    }

    pub fn is_complete(&self) -> bool {
        self.relay().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_smtp_values_count_as_missing() {
        let config = AppConfig {
            smtp_server: Some("smtp.example.com".to_string()),
            smtp_user: Some("   ".to_string()),
            smtp_pass: Some("secret".to_string()),
            recipient_email: Some("coord@example.com".to_string()),
            ..AppConfig::default()
        };
        let smtp = config.smtp_settings();
        assert_eq!(smtp.username, None);
        assert!(!smtp.is_complete());
    }

    #[test]
    fn test_complete_smtp_settings_yield_relay() {
        let config = AppConfig {
            smtp_server: Some("smtp.example.com".to_string()),
            smtp_user: Some("monitor@example.com".to_string()),
            smtp_pass: Some("secret".to_string()),
            recipient_email: Some("coord@example.com".to_string()),
            ..AppConfig::default()
        };
        let relay = config.smtp_settings().relay().expect("relay should be complete");
        assert_eq!(relay.host, "smtp.example.com");
        assert_eq!(relay.port, DEFAULT_SMTP_PORT);
        assert_eq!(relay.recipient, "coord@example.com");
    }

    #[test]
    fn test_cli_overrides_environment() {
        let cli = Cli {
            port: Some(8080),
            data_dir: Some(PathBuf::from("/tmp/faltas")),
            monitors_file: None,
        };
        let config = AppConfig::default().apply_cli(cli);
        assert_eq!(config.port, 8080);
        assert_eq!(config.data_dir, PathBuf::from("/tmp/faltas"));
        assert_eq!(config.monitores_file, PathBuf::from("monitores.csv"));
    }

    #[test]
    fn test_secret_key_falls_back_to_default() {
        let config = AppConfig::default();
        assert_eq!(config.secret_key(), DEFAULT_SECRET_KEY);
    }

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_environment_names_map_to_fields() {
        let config = AppConfig::from_vars(vars(&[
            ("SECRET_KEY", "chave"),
            ("SMTP_SERVER", "smtp.example.com"),
            ("SMTP_PORT", "2525"),
            ("SMTP_USER", "monitor@example.com"),
            ("SMTP_PASS", "secret"),
            ("RECIPIENT_EMAIL", "coord@example.com"),
            ("BIND_HOST", "127.0.0.1"),
            ("PORT", "8443"),
            ("CERT_PATH", "cert.pem"),
            ("KEY_PATH", "key.pem"),
            ("DATA_DIR", "/srv/faltas"),
            ("MONITORES_FILE", "/srv/monitores.csv"),
            ("SESSION_TTL_HOURS", "4"),
        ]))
        .unwrap();

        assert_eq!(config.secret_key(), "chave");
        let relay = config.smtp_settings().relay().expect("relay should be complete");
        assert_eq!(relay.host, "smtp.example.com");
        assert_eq!(relay.port, 2525);
        assert_eq!(relay.username, "monitor@example.com");
        assert_eq!(relay.password, "secret");
        assert_eq!(relay.recipient, "coord@example.com");
        assert_eq!(config.bind_host, "127.0.0.1");
        assert_eq!(config.port, 8443);
        assert!(config.tls_paths().is_some());
        assert_eq!(config.data_dir, PathBuf::from("/srv/faltas"));
        assert_eq!(config.monitores_file, PathBuf::from("/srv/monitores.csv"));
        assert_eq!(config.session_ttl_hours, 4);
    }

    #[test]
    fn test_empty_environment_uses_defaults() {
        let config = AppConfig::from_vars(Vec::<(String, String)>::new()).unwrap();
        assert_eq!(config.smtp_port, DEFAULT_SMTP_PORT);
        assert_eq!(config.bind_host, "0.0.0.0");
        assert_eq!(config.port, 5000);
        assert_eq!(config.data_dir, PathBuf::from("data"));
        assert_eq!(config.monitores_file, PathBuf::from("monitores.csv"));
        assert_eq!(config.session_ttl_hours, 12);
        assert!(!config.smtp_settings().is_complete());
    }

    #[test]
    fn test_unparsable_smtp_port_is_a_config_error() {
        let result = AppConfig::from_vars(vars(&[("SMTP_PORT", "quinhentos")]));
        assert!(
            matches!(result, Err(AppError::Config(_))),
            "Expected config error but got {:?}",
            result
        );
    }

    #[test]
    fn test_tls_requires_both_paths() {
        let config = AppConfig {
            cert_path: Some("cert.pem".to_string()),
            ..AppConfig::default()
        };
        assert!(config.tls_paths().is_none());
    }
}
