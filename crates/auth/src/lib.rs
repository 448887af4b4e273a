//! Token lifecycle and permission evaluation for the diagnostics API gate.
//!
//! No HTTP and no file IO here: key material and role-default records come in
//! through the [`KeyProvider`] and [`PermissionStore`] traits, and every
//! operation takes the current time as an argument.

pub mod authorize;
pub mod claims;
pub mod duration;
pub mod errors;
pub mod keys;
pub mod permissions;
pub mod policy;
pub mod roles;
pub mod store;
pub mod token;

pub use authorize::{
    AccessRequest, ConflictPolicy, DecisionSource, PermissionCheckResult, PermissionEvaluator,
};
pub use claims::{ClaimsRequest, IdentityClaims, IssueOptions, TokenPayload, validate_claims};
pub use errors::{AuthError, AuthResult, ErrorKind};
pub use keys::{KeyProvider, PemKeyPair, SigningKey, VerificationKey};
pub use permissions::{Access, PatternError, PermissionPattern, PermissionRecord, split_segments};
pub use policy::{PolicyFacade, PolicyVerdict};
pub use roles::Role;
pub use store::{PermissionStore, StoreError};
pub use token::{IssuedToken, TokenCodec, TokenIssuer};
