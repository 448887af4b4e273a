//! Service configuration sourced from environment variables.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};

use diagate_auth::claims::DEFAULT_EXPIRES_IN;
use diagate_auth::duration::parse_expires_in;
use diagate_infra::Environment;
use diagate_observability::LogFormat;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    // HTTP listener bind address.
    pub bind: SocketAddr,
    // Selects the key pair under `keys_dir`.
    pub environment: Environment,
    pub keys_dir: PathBuf,
    // Optional `kid` header value.
    pub key_id: Option<String>,
    // Default token lifetime (`expiresIn` grammar).
    pub token_ttl: String,
    pub token_issuer: Option<String>,
    pub token_audience: Option<String>,
    // JSON permission records; built-in role defaults when unset.
    pub permissions_file: Option<PathBuf>,
    pub log_format: LogFormat,
}

impl ApiConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup (used by tests).
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind = var("DIAGATE_BIND")
            .unwrap_or_else(|| "0.0.0.0:8080".to_string())
            .parse()
            .with_context(|| "parse DIAGATE_BIND")?;
        let environment = var("DIAGATE_ENV")
            .unwrap_or_else(|| "development".to_string())
            .parse()
            .with_context(|| "parse DIAGATE_ENV")?;
        let keys_dir = PathBuf::from(var("DIAGATE_KEYS_DIR").unwrap_or_else(|| "keys".to_string()));
        let token_ttl = var("DIAGATE_TOKEN_TTL").unwrap_or_else(|| DEFAULT_EXPIRES_IN.to_string());
        parse_expires_in(&token_ttl).with_context(|| "parse DIAGATE_TOKEN_TTL")?;
        let log_format = var("DIAGATE_LOG_FORMAT")
            .map(|v| v.parse::<LogFormat>())
            .transpose()
            .map_err(anyhow::Error::msg)
            .with_context(|| "parse DIAGATE_LOG_FORMAT")?
            .unwrap_or_default();

        Ok(Self {
            bind,
            environment,
            keys_dir,
            key_id: var("DIAGATE_KEY_ID"),
            token_ttl,
            token_issuer: var("DIAGATE_TOKEN_ISSUER"),
            token_audience: var("DIAGATE_TOKEN_AUDIENCE"),
            permissions_file: var("DIAGATE_PERMISSIONS_FILE").map(PathBuf::from),
            log_format,
        })
    }
}
