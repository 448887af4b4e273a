//! File-backed key material, one key pair per deployment environment.
//!
//! Layout: `<keys_dir>/<environment>/private.pem` and `public.pem`. The private
//! key may be absent on verify-only hosts.

use std::path::{Path, PathBuf};

use diagate_auth::{AuthResult, KeyProvider, PemKeyPair, SigningKey, VerificationKey};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl core::fmt::Display for Environment {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Environment {
    type Err = KeyLoadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(KeyLoadError::UnknownEnvironment(other.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum KeyLoadError {
    #[error("unknown environment '{0}' (expected development, staging or production)")]
    UnknownEnvironment(String),

    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid key material in {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}

/// Key pair loaded once from disk at startup.
#[derive(Debug, Clone)]
pub struct FileKeyProvider {
    environment: Environment,
    pair: PemKeyPair,
}

impl FileKeyProvider {
    pub fn load(
        keys_dir: impl AsRef<Path>,
        environment: Environment,
        kid: Option<String>,
    ) -> Result<Self, KeyLoadError> {
        let dir = keys_dir.as_ref().join(environment.as_str());
        let public_path = dir.join("public.pem");
        let private_path = dir.join("private.pem");

        let public_pem = read(&public_path)?;
        let pair = if private_path.exists() {
            let private_pem = read(&private_path)?;
            PemKeyPair::from_pem(&private_pem, &public_pem).map_err(|e| KeyLoadError::Invalid {
                path: dir.clone(),
                reason: e.to_string(),
            })?
        } else {
            tracing::warn!(environment = %environment, "no private key found; running verify-only");
            PemKeyPair::verify_only(&public_pem).map_err(|e| KeyLoadError::Invalid {
                path: public_path.clone(),
                reason: e.to_string(),
            })?
        };

        let pair = match kid {
            Some(kid) => pair.with_kid(kid),
            None => pair,
        };

        tracing::info!(environment = %environment, can_sign = pair.can_sign(), "key pair loaded");
        Ok(Self { environment, pair })
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn can_sign(&self) -> bool {
        self.pair.can_sign()
    }
}

impl KeyProvider for FileKeyProvider {
    fn signing_key(&self) -> AuthResult<SigningKey> {
        self.pair.signing_key()
    }

    fn verification_key(&self) -> AuthResult<VerificationKey> {
        self.pair.verification_key()
    }
}

fn read(path: &Path) -> Result<Vec<u8>, KeyLoadError> {
    std::fs::read(path).map_err(|source| KeyLoadError::Read {
        path: path.to_path_buf(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRIVATE_PEM: &str = include_str!("../../../auth/fixtures/private.pem");
    const PUBLIC_PEM: &str = include_str!("../../../auth/fixtures/public.pem");

    fn keys_dir(with_private: bool) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let env_dir = dir.path().join("staging");
        std::fs::create_dir_all(&env_dir).unwrap();
        std::fs::write(env_dir.join("public.pem"), PUBLIC_PEM).unwrap();
        if with_private {
            std::fs::write(env_dir.join("private.pem"), PRIVATE_PEM).unwrap();
        }
        dir
    }

    #[test]
    fn parses_environment_names() {
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert_eq!("Development".parse::<Environment>().unwrap(), Environment::Development);
        assert!("qa".parse::<Environment>().is_err());
    }

    #[test]
    fn loads_full_pair_for_environment() {
        let dir = keys_dir(true);
        let provider =
            FileKeyProvider::load(dir.path(), Environment::Staging, Some("stg-1".to_string()))
                .unwrap();
        assert!(provider.can_sign());
        assert_eq!(provider.environment(), Environment::Staging);
        assert_eq!(provider.signing_key().unwrap().kid.as_deref(), Some("stg-1"));
    }

    #[test]
    fn missing_private_key_means_verify_only() {
        let dir = keys_dir(false);
        let provider = FileKeyProvider::load(dir.path(), Environment::Staging, None).unwrap();
        assert!(!provider.can_sign());
        assert!(provider.verification_key().is_ok());
        assert!(provider.signing_key().is_err());
    }

    #[test]
    fn missing_environment_dir_is_read_error() {
        let dir = keys_dir(true);
        let err = FileKeyProvider::load(dir.path(), Environment::Production, None).unwrap_err();
        assert!(matches!(err, KeyLoadError::Read { .. }));
    }

    #[test]
    fn garbage_public_key_is_invalid() {
        let dir = tempfile::tempdir().unwrap();
        let env_dir = dir.path().join("development");
        std::fs::create_dir_all(&env_dir).unwrap();
        std::fs::write(env_dir.join("public.pem"), "nope").unwrap();
        let err = FileKeyProvider::load(dir.path(), Environment::Development, None).unwrap_err();
        assert!(matches!(err, KeyLoadError::Invalid { .. }));
    }
}
