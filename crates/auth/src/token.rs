//! Token issuance, structural parsing and cryptographic verification.
//!
//! Wire format is the compact three-segment form `header.payload.signature`,
//! each segment base64url without padding, signed with RS256.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, SecondsFormat, Utc};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{Algorithm, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::claims::{ClaimsRequest, IssueOptions, TokenPayload, validate_claims};
use crate::duration::parse_expires_in;
use crate::keys::{KeyProvider, TOKEN_ALGORITHM};
use crate::{AuthError, AuthResult};

/// Result of a successful issuance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuedToken {
    pub token: String,
    pub payload: TokenPayload,
    /// RFC 3339 rendering of `payload.exp`.
    pub expires_at: String,
}

/// Builds and signs tokens with the environment's private key.
pub struct TokenIssuer {
    keys: Arc<dyn KeyProvider>,
}

impl TokenIssuer {
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self { keys }
    }

    /// Issue a token for `request`.
    ///
    /// Pure apart from `now` and a fresh random `jti`.
    pub fn issue(
        &self,
        request: ClaimsRequest,
        options: &IssueOptions,
        now: DateTime<Utc>,
    ) -> AuthResult<IssuedToken> {
        let claims = validate_claims(request)?;
        let lifetime = parse_expires_in(&options.expires_in)?;

        let iat = now.timestamp();
        let exp = iat
            .checked_add(lifetime.num_seconds())
            .ok_or_else(|| AuthError::InvalidExpiresIn(options.expires_in.clone()))?;
        let expires_at = DateTime::<Utc>::from_timestamp(exp, 0)
            .ok_or_else(|| AuthError::InvalidExpiresIn(options.expires_in.clone()))?
            .to_rfc3339_opts(SecondsFormat::Millis, true);

        let payload = TokenPayload {
            user_id: claims.user_id,
            email: claims.email,
            role: claims.role,
            oid: claims.oid,
            permissions: claims.permissions,
            deny_permissions: claims.deny_permissions,
            scope: claims.scope,
            client_id: claims.client_id,
            jti: Uuid::new_v4().to_string(),
            iat,
            exp,
            iss: options.issuer.clone(),
            aud: options.audience.clone(),
        };

        let signing_key = self.keys.signing_key()?;
        let mut header = Header::new(signing_key.alg);
        header.kid = signing_key.kid;
        let token = jsonwebtoken::encode(&header, &payload, &signing_key.encoding_key)
            .map_err(|_| AuthError::key_unavailable("signing failed"))?;

        tracing::info!(
            jti = %payload.jti,
            user_id = %payload.user_id,
            role = %payload.role,
            exp = payload.exp,
            "token issued"
        );

        Ok(IssuedToken {
            token,
            payload,
            expires_at,
        })
    }
}

/// Decodes and verifies tokens.
///
/// `parse` is for inspection only and never authenticates anything; request
/// handling must go through `verify`.
pub struct TokenCodec {
    keys: Arc<dyn KeyProvider>,
    expected_issuer: Option<String>,
    expected_audience: Option<String>,
}

impl TokenCodec {
    pub fn new(keys: Arc<dyn KeyProvider>) -> Self {
        Self {
            keys,
            expected_issuer: None,
            expected_audience: None,
        }
    }

    pub fn with_issuer(mut self, issuer: impl Into<String>) -> Self {
        self.expected_issuer = Some(issuer.into());
        self
    }

    pub fn with_audience(mut self, audience: impl Into<String>) -> Self {
        self.expected_audience = Some(audience.into());
        self
    }

    /// Structural decode without signature verification.
    ///
    /// Returns `None` for anything malformed; never errors.
    pub fn parse(&self, token: &str) -> Option<TokenPayload> {
        decode_unverified(token).ok().map(|(_, payload)| payload)
    }

    /// Full verification against the environment public key at time `now`.
    ///
    /// Segments are decoded before the signature is checked: a signature
    /// segment that is not valid base64url is `invalid_token`, while any
    /// decodable signature that does not match is `signature_invalid`.
    pub fn verify(&self, token: &str, now: DateTime<Utc>) -> AuthResult<TokenPayload> {
        let result = self.verify_inner(token, now);
        if let Err(err) = &result {
            tracing::warn!(error = %err.kind(), "token verification failed");
        }
        result
    }

    fn verify_inner(&self, token: &str, now: DateTime<Utc>) -> AuthResult<TokenPayload> {
        let token = token.trim();
        let [header, payload, signature] = split_token(token)?;
        let header: RawHeader = decode_segment(header, "header")?;
        decode_bytes(payload, "payload")?;
        decode_bytes(signature, "signature")?;
        match header.alg.parse::<Algorithm>() {
            Ok(alg) if alg == TOKEN_ALGORITHM => {}
            _ => return Err(AuthError::SignatureInvalid),
        }

        let key = self.keys.verification_key()?;

        // Expiry and audience are checked below with our own semantics.
        let mut validation = Validation::new(key.alg);
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let payload = jsonwebtoken::decode::<TokenPayload>(token, &key.decoding_key, &validation)
            .map_err(map_jwt_error)?
            .claims;

        payload.validate_time_window()?;
        if payload.exp <= now.timestamp() {
            return Err(AuthError::TokenExpired { exp: payload.exp });
        }
        check_bound_claim("iss", payload.iss.as_deref(), self.expected_issuer.as_deref())?;
        check_bound_claim("aud", payload.aud.as_deref(), self.expected_audience.as_deref())?;

        Ok(payload)
    }
}

/// A claim bound at issuance must equal the verifier's expectation.
fn check_bound_claim(
    claim: &'static str,
    actual: Option<&str>,
    expected: Option<&str>,
) -> AuthResult<()> {
    match (actual, expected) {
        (Some(actual), Some(expected)) if actual != expected => {
            Err(AuthError::ClaimMismatch { claim })
        }
        _ => Ok(()),
    }
}

fn map_jwt_error(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        JwtErrorKind::InvalidSignature | JwtErrorKind::InvalidAlgorithm => {
            AuthError::SignatureInvalid
        }
        JwtErrorKind::Base64(_) => AuthError::invalid_token("segment is not valid base64url"),
        JwtErrorKind::Json(_) | JwtErrorKind::Utf8(_) => {
            AuthError::invalid_token("payload is not a valid claim structure")
        }
        JwtErrorKind::InvalidRsaKey(_) | JwtErrorKind::InvalidKeyFormat => {
            AuthError::key_unavailable("verification key rejected")
        }
        _ => AuthError::SignatureInvalid,
    }
}

fn split_token(token: &str) -> AuthResult<[&str; 3]> {
    let segments: Vec<&str> = token.split('.').collect();
    match segments.as_slice() {
        [header, payload, signature] => Ok([*header, *payload, *signature]),
        _ => Err(AuthError::invalid_token(format!(
            "expected 3 segments, found {}",
            segments.len()
        ))),
    }
}

/// Header as written on the wire. `alg` stays a string so that names
/// jsonwebtoken does not know still reach the algorithm check.
#[derive(Debug, Deserialize)]
struct RawHeader {
    alg: String,
}

fn decode_unverified(token: &str) -> AuthResult<(RawHeader, TokenPayload)> {
    let [header, payload, _] = split_token(token.trim())?;
    let header: RawHeader = decode_segment(header, "header")?;
    let payload: TokenPayload = decode_segment(payload, "payload")?;
    Ok((header, payload))
}

fn decode_bytes(segment: &str, name: &str) -> AuthResult<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| AuthError::invalid_token(format!("{name} is not valid base64url")))
}

fn decode_segment<T: serde::de::DeserializeOwned>(segment: &str, name: &str) -> AuthResult<T> {
    let bytes = decode_bytes(segment, name)?;
    serde_json::from_slice(&bytes)
        .map_err(|_| AuthError::invalid_token(format!("{name} is not a valid claim structure")))
}
