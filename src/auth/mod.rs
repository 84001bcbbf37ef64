/// Authentication module
///
/// Token construction and validation, typed payloads, credential hashing
/// and the single-session auth protocol.

mod claims;
mod password;
mod service;
mod token;

pub use claims::{AccessPayload, Payload, PayloadKind, RefreshPayload, Role, TokenHeader};
pub use claims::{ACCESS_TTL_SECONDS, ALGORITHM, PROTOCOL, REFRESH_TTL_SECONDS};
pub use password::{hash_password, Credentials};
pub use service::{AccessToken, AuthService, TokenPair};
pub use token::{extract_bearer, TokenEngine, TokenParts, VerifiedToken, BEARER_SCHEME};
