//! Key material supplied per deployment environment.

use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey};

use crate::{AuthError, AuthResult};

/// Signature algorithm used for every token this service issues or accepts.
pub const TOKEN_ALGORITHM: Algorithm = Algorithm::RS256;

pub struct SigningKey {
    pub kid: Option<String>,
    pub alg: Algorithm,
    pub encoding_key: EncodingKey,
}

pub struct VerificationKey {
    pub kid: Option<String>,
    pub alg: Algorithm,
    pub decoding_key: DecodingKey,
}

/// Source of the environment's asymmetric key pair.
///
/// Implementations are read-only from the core's point of view.
pub trait KeyProvider: Send + Sync {
    fn signing_key(&self) -> AuthResult<SigningKey>;
    fn verification_key(&self) -> AuthResult<VerificationKey>;
}

impl<K> KeyProvider for std::sync::Arc<K>
where
    K: KeyProvider + ?Sized,
{
    fn signing_key(&self) -> AuthResult<SigningKey> {
        (**self).signing_key()
    }

    fn verification_key(&self) -> AuthResult<VerificationKey> {
        (**self).verification_key()
    }
}

/// RSA key pair parsed from PEM.
///
/// The private half is optional so verify-only deployments never hold it.
#[derive(Clone)]
pub struct PemKeyPair {
    kid: Option<String>,
    encoding_key: Option<EncodingKey>,
    decoding_key: DecodingKey,
}

impl PemKeyPair {
    pub fn from_pem(private_pem: &[u8], public_pem: &[u8]) -> AuthResult<Self> {
        let encoding_key = EncodingKey::from_rsa_pem(private_pem)
            .map_err(|_| AuthError::key_unavailable("private key is not a valid RSA PEM"))?;
        let mut pair = Self::verify_only(public_pem)?;
        pair.encoding_key = Some(encoding_key);
        Ok(pair)
    }

    pub fn verify_only(public_pem: &[u8]) -> AuthResult<Self> {
        let decoding_key = DecodingKey::from_rsa_pem(public_pem)
            .map_err(|_| AuthError::key_unavailable("public key is not a valid RSA PEM"))?;
        Ok(Self {
            kid: None,
            encoding_key: None,
            decoding_key,
        })
    }

    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = Some(kid.into());
        self
    }

    pub fn can_sign(&self) -> bool {
        self.encoding_key.is_some()
    }
}

impl core::fmt::Debug for PemKeyPair {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PemKeyPair")
            .field("kid", &self.kid)
            .field("can_sign", &self.can_sign())
            .finish_non_exhaustive()
    }
}

impl KeyProvider for PemKeyPair {
    fn signing_key(&self) -> AuthResult<SigningKey> {
        let encoding_key = self
            .encoding_key
            .clone()
            .ok_or_else(|| AuthError::key_unavailable("no private key configured"))?;
        Ok(SigningKey {
            kid: self.kid.clone(),
            alg: TOKEN_ALGORITHM,
            encoding_key,
        })
    }

    fn verification_key(&self) -> AuthResult<VerificationKey> {
        Ok(VerificationKey {
            kid: self.kid.clone(),
            alg: TOKEN_ALGORITHM,
            decoding_key: self.decoding_key.clone(),
        })
    }
}
