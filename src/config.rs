// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names, default values and the
//! typed configuration loaded from them at startup. Invalid values are
//! rejected with a [`ConfigError`] before the server binds.
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory of the database file | `./data` |
//! | `WALLET_AUTH_NETWORK` | `mainnet`, `sepolia`, `polygon`, `bsc`, `arbitrum`, `optimism` | `mainnet` |
//! | `WALLET_AUTH_NONCE_LIFETIME` | Nonce lifetime in seconds (60-3600) | `300` |
//! | `WALLET_AUTH_ENABLE_AUTO_CONNECT` | Reconnect a known wallet on page load | `true` |
//! | `WALLET_AUTH_REDIRECT_ON_SUCCESS` | Where the connector navigates after sign-in | `/user` |
//! | `WALLET_AUTH_DOMAIN` | Required EIP-4361 domain (`host[:port]`) | Not enforced |
//! | `WALLET_AUTH_ENFORCE_CHAIN_ID` | Require the message chain id to match the network | `false` |
//! | `WALLET_AUTH_ADMIN_TOKEN` | Bearer token for the admin endpoints | Admin disabled |
//! | `SESSION_TTL_SECS` | Session lifetime in seconds (60-31536000) | `86400` |
//! | `NONCE_SWEEP_INTERVAL_SECS` | Expired nonce collector interval, `0` disables | `60` |
//! | `CORS_ALLOWED_ORIGINS` | Comma separated origins allowed with credentials | Permissive |
//! | `TLS_CERT_PATH` / `TLS_KEY_PATH` | PEM certificate chain and key; enables HTTPS | HTTP |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;
use url::Url;
use utoipa::ToSchema;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// The database file `wallet-auth.redb` is created inside it.
pub const DATA_DIR_ENV: &str = "DATA_DIR";

pub const NETWORK_ENV: &str = "WALLET_AUTH_NETWORK";
pub const NONCE_LIFETIME_ENV: &str = "WALLET_AUTH_NONCE_LIFETIME";
pub const ENABLE_AUTO_CONNECT_ENV: &str = "WALLET_AUTH_ENABLE_AUTO_CONNECT";
pub const REDIRECT_ON_SUCCESS_ENV: &str = "WALLET_AUTH_REDIRECT_ON_SUCCESS";
pub const DOMAIN_ENV: &str = "WALLET_AUTH_DOMAIN";
pub const ENFORCE_CHAIN_ID_ENV: &str = "WALLET_AUTH_ENFORCE_CHAIN_ID";
pub const ADMIN_TOKEN_ENV: &str = "WALLET_AUTH_ADMIN_TOKEN";
pub const SESSION_TTL_ENV: &str = "SESSION_TTL_SECS";
pub const NONCE_SWEEP_INTERVAL_ENV: &str = "NONCE_SWEEP_INTERVAL_SECS";
pub const CORS_ALLOWED_ORIGINS_ENV: &str = "CORS_ALLOWED_ORIGINS";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_REDIRECT_ON_SUCCESS: &str = "/user";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Database file name inside `DATA_DIR`.
pub const DATABASE_FILE: &str = "wallet-auth.redb";

pub const DEFAULT_NONCE_LIFETIME_SECS: u64 = 300;
pub const MIN_NONCE_LIFETIME_SECS: u64 = 60;
pub const MAX_NONCE_LIFETIME_SECS: u64 = 3600;

pub const DEFAULT_SESSION_TTL_SECS: u64 = 86_400;
pub const MIN_SESSION_TTL_SECS: u64 = 60;
pub const MAX_SESSION_TTL_SECS: u64 = 31_536_000;

pub const DEFAULT_NONCE_SWEEP_INTERVAL_SECS: u64 = 60;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

fn invalid(var: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue(var.to_string(), reason.into())
}

// =============================================================================
// Network
// =============================================================================

/// Chains a wallet can sign in from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Mainnet,
    Sepolia,
    Polygon,
    Bsc,
    Arbitrum,
    Optimism,
}

impl Network {
    pub const ALL: [Network; 6] = [
        Network::Mainnet,
        Network::Sepolia,
        Network::Polygon,
        Network::Bsc,
        Network::Arbitrum,
        Network::Optimism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Sepolia => "sepolia",
            Network::Polygon => "polygon",
            Network::Bsc => "bsc",
            Network::Arbitrum => "arbitrum",
            Network::Optimism => "optimism",
        }
    }

    /// EIP-155 chain id.
    pub fn chain_id(&self) -> u64 {
        match self {
            Network::Mainnet => 1,
            Network::Sepolia => 11_155_111,
            Network::Polygon => 137,
            Network::Bsc => 56,
            Network::Arbitrum => 42_161,
            Network::Optimism => 10,
        }
    }
}

impl FromStr for Network {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .into_iter()
            .find(|n| n.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| invalid(NETWORK_ENV, format!("unknown network '{s}'")))
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Logging
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

impl FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" | "" => Ok(LogFormat::Pretty),
            other => Err(invalid(LOG_FORMAT_ENV, format!("expected json or pretty, got '{other}'"))),
        }
    }
}

// =============================================================================
// Settings
// =============================================================================

/// Wallet authentication settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthSettings {
    pub network: Network,
    pub nonce_lifetime: Duration,
    pub enable_auto_connect: bool,
    pub redirect_on_success: String,
    /// Expected EIP-4361 domain, if enforced.
    pub domain: Option<String>,
    pub enforce_chain_id: bool,
    pub session_ttl: Duration,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            network: Network::default(),
            nonce_lifetime: Duration::from_secs(DEFAULT_NONCE_LIFETIME_SECS),
            enable_auto_connect: true,
            redirect_on_success: DEFAULT_REDIRECT_ON_SUCCESS.to_string(),
            domain: None,
            enforce_chain_id: false,
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

/// PEM files for HTTPS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Complete server configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub data_dir: PathBuf,
    pub auth: AuthSettings,
    /// `None` disables the expired nonce collector.
    pub nonce_sweep_interval: Option<Duration>,
    /// Empty means permissive CORS without credentials.
    pub cors_allowed_origins: Vec<String>,
    pub admin_token: Option<String>,
    pub tls: Option<TlsPaths>,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("bind_addr", &self.bind_addr)
            .field("data_dir", &self.data_dir)
            .field("auth", &self.auth)
            .field("nonce_sweep_interval", &self.nonce_sweep_interval)
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("admin_token", &self.admin_token.as_ref().map(|_| "[REDACTED]"))
            .field("tls", &self.tls)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl ServerConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let host = get(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match get(PORT_ENV) {
            Some(raw) => raw
                .parse::<u16>()
                .map_err(|e| invalid(PORT_ENV, e.to_string()))?,
            None => DEFAULT_PORT,
        };
        let bind_addr: SocketAddr = format!("{host}:{port}")
            .parse()
            .map_err(|_| invalid(HOST_ENV, format!("'{host}' is not an IP address")))?;

        let data_dir = PathBuf::from(get(DATA_DIR_ENV).unwrap_or_else(|| DEFAULT_DATA_DIR.to_string()));

        let network = match get(NETWORK_ENV) {
            Some(raw) => raw.parse()?,
            None => Network::default(),
        };

        let nonce_lifetime = parse_u64(&get, NONCE_LIFETIME_ENV, DEFAULT_NONCE_LIFETIME_SECS)?;
        if !(MIN_NONCE_LIFETIME_SECS..=MAX_NONCE_LIFETIME_SECS).contains(&nonce_lifetime) {
            return Err(invalid(
                NONCE_LIFETIME_ENV,
                format!(
                    "{nonce_lifetime} is outside {MIN_NONCE_LIFETIME_SECS}-{MAX_NONCE_LIFETIME_SECS} seconds"
                ),
            ));
        }

        let session_ttl = parse_u64(&get, SESSION_TTL_ENV, DEFAULT_SESSION_TTL_SECS)?;
        if !(MIN_SESSION_TTL_SECS..=MAX_SESSION_TTL_SECS).contains(&session_ttl) {
            return Err(invalid(
                SESSION_TTL_ENV,
                format!(
                    "{session_ttl} is outside {MIN_SESSION_TTL_SECS}-{MAX_SESSION_TTL_SECS} seconds"
                ),
            ));
        }

        let redirect_on_success = get(REDIRECT_ON_SUCCESS_ENV)
            .unwrap_or_else(|| DEFAULT_REDIRECT_ON_SUCCESS.to_string());
        validate_redirect(&redirect_on_success)?;

        let auth = AuthSettings {
            network,
            nonce_lifetime: Duration::from_secs(nonce_lifetime),
            enable_auto_connect: parse_bool(&get, ENABLE_AUTO_CONNECT_ENV, true)?,
            redirect_on_success,
            domain: get(DOMAIN_ENV).map(|d| d.to_ascii_lowercase()),
            enforce_chain_id: parse_bool(&get, ENFORCE_CHAIN_ID_ENV, false)?,
            session_ttl: Duration::from_secs(session_ttl),
        };

        let sweep_secs = parse_u64(&get, NONCE_SWEEP_INTERVAL_ENV, DEFAULT_NONCE_SWEEP_INTERVAL_SECS)?;
        let nonce_sweep_interval = (sweep_secs > 0).then(|| Duration::from_secs(sweep_secs));

        let cors_allowed_origins = match get(CORS_ALLOWED_ORIGINS_ENV) {
            Some(raw) => parse_origins(&raw)?,
            None => Vec::new(),
        };

        let tls = match (get(TLS_CERT_PATH_ENV), get(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::MissingVar(TLS_KEY_PATH_ENV.to_string())),
            (None, Some(_)) => return Err(ConfigError::MissingVar(TLS_CERT_PATH_ENV.to_string())),
        };

        let log_format = match get(LOG_FORMAT_ENV) {
            Some(raw) => raw.parse()?,
            None => LogFormat::default(),
        };

        Ok(Self {
            bind_addr,
            data_dir,
            auth,
            nonce_sweep_interval,
            cors_allowed_origins,
            admin_token: get(ADMIN_TOKEN_ENV),
            tls,
            log_format,
        })
    }

    /// Path of the database file.
    pub fn database_path(&self) -> PathBuf {
        self.data_dir.join(DATABASE_FILE)
    }
}

fn parse_u64(
    get: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: u64,
) -> Result<u64, ConfigError> {
    match get(var) {
        Some(raw) => raw.parse().map_err(|_| invalid(var, format!("'{raw}' is not a number"))),
        None => Ok(default),
    }
}

fn parse_bool(
    get: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: bool,
) -> Result<bool, ConfigError> {
    let Some(raw) = get(var) else {
        return Ok(default);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(var, format!("'{raw}' is not a boolean"))),
    }
}

/// A site-relative path or an absolute http(s) URL.
fn validate_redirect(raw: &str) -> Result<(), ConfigError> {
    if raw.starts_with('/') && !raw.starts_with("//") {
        return Ok(());
    }
    match Url::parse(raw) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(invalid(
            REDIRECT_ON_SUCCESS_ENV,
            "must be a path starting with '/' or an http(s) URL",
        )),
    }
}

/// Comma separated origins, normalized to `scheme://host[:port]`.
fn parse_origins(raw: &str) -> Result<Vec<String>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            let url = Url::parse(s)
                .map_err(|e| invalid(CORS_ALLOWED_ORIGINS_ENV, format!("'{s}': {e}")))?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(invalid(
                    CORS_ALLOWED_ORIGINS_ENV,
                    format!("'{s}' is not an http(s) origin"),
                ));
            }
            Ok(url.origin().ascii_serialization())
        })
        .collect()
}
