/// Token header and payload model
///
/// Refresh and access payloads are distinct shapes with overlapping fields.
/// `Payload` tags them for the issuing side; the wire form carries no tag.

use serde::{Deserialize, Serialize};

use crate::error::TokenError;

pub const ALGORITHM: &str = "HS256";
pub const PROTOCOL: &str = "JWT";

/// Refresh token lifetime: 31 days
pub const REFRESH_TTL_SECONDS: i64 = 60 * 60 * 24 * 31;
/// Access token lifetime: 24 hours
pub const ACCESS_TTL_SECONDS: i64 = 60 * 60 * 24;

/// Fixed header, serialised as `{"alg":"HS256","typ":"JWT"}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenHeader {
    pub alg: String,
    pub typ: String,
}

impl Default for TokenHeader {
    fn default() -> Self {
        Self {
            alg: ALGORITHM.to_string(),
            typ: PROTOCOL.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Admin => "admin",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "user" => Some(Role::User),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Payload of a refresh token
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshPayload {
    pub user_id: i64,
    pub exp: i64,
}

/// Payload of an access token
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccessPayload {
    pub user_id: i64,
    pub exp: i64,
    pub email: String,
    pub role: Role,
}

impl RefreshPayload {
    pub fn new(user_id: i64) -> Self {
        Self::issued_at(user_id, chrono::Utc::now().timestamp())
    }

    pub fn issued_at(user_id: i64, now: i64) -> Self {
        Self {
            user_id,
            exp: now + REFRESH_TTL_SECONDS,
        }
    }

    /// Decode a refresh payload from its JSON text.
    ///
    /// `"{}"` yields the zero payload; callers check `user_id` before
    /// trusting identity.
    ///
    /// # Errors
    /// `InvalidPayload` for empty or unparsable input, or when both
    /// `user_id` and `exp` are zero.
    pub fn decode(json: &str) -> Result<Self, TokenError> {
        let payload: Self = decode_payload(json)?;
        if payload.user_id == 0 && payload.exp == 0 && json != "{}" {
            return Err(TokenError::InvalidPayload("zero user_id and exp".to_string()));
        }
        Ok(payload)
    }
}

impl AccessPayload {
    pub fn new(user_id: i64, email: impl Into<String>, role: Role) -> Self {
        Self::issued_at(user_id, email, role, chrono::Utc::now().timestamp())
    }

    pub fn issued_at(user_id: i64, email: impl Into<String>, role: Role, now: i64) -> Self {
        Self {
            user_id,
            exp: now + ACCESS_TTL_SECONDS,
            email: email.into(),
            role,
        }
    }

    /// Decode an access payload; same rules as [`RefreshPayload::decode`].
    pub fn decode(json: &str) -> Result<Self, TokenError> {
        let payload: Self = decode_payload(json)?;
        if payload.user_id == 0 && payload.exp == 0 && json != "{}" {
            return Err(TokenError::InvalidPayload("zero user_id and exp".to_string()));
        }
        Ok(payload)
    }
}

fn decode_payload<T>(json: &str) -> Result<T, TokenError>
where
    T: for<'de> Deserialize<'de> + Default,
{
    if json.is_empty() {
        return Err(TokenError::InvalidPayload("empty payload".to_string()));
    }
    if json == "{}" {
        return Ok(T::default());
    }

    serde_json::from_str(json).map_err(|e| TokenError::InvalidPayload(e.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PayloadKind {
    Refresh,
    Access,
}

/// Either payload variant, ready to be signed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    Refresh(RefreshPayload),
    Access(AccessPayload),
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        match self {
            Payload::Refresh(_) => PayloadKind::Refresh,
            Payload::Access(_) => PayloadKind::Access,
        }
    }

    pub fn user_id(&self) -> i64 {
        match self {
            Payload::Refresh(p) => p.user_id,
            Payload::Access(p) => p.user_id,
        }
    }

    pub fn exp(&self) -> i64 {
        match self {
            Payload::Refresh(p) => p.exp,
            Payload::Access(p) => p.exp,
        }
    }

    /// JSON text of the inner payload, without any variant tag
    pub fn to_json(&self) -> Result<String, TokenError> {
        let encoded = match self {
            Payload::Refresh(p) => serde_json::to_string(p),
            Payload::Access(p) => serde_json::to_string(p),
        };
        encoded.map_err(|e| TokenError::Encode(e.to_string()))
    }
}

impl From<RefreshPayload> for Payload {
    fn from(payload: RefreshPayload) -> Self {
        Payload::Refresh(payload)
    }
}

impl From<AccessPayload> for Payload {
    fn from(payload: AccessPayload) -> Self {
        Payload::Access(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_serialisation_is_byte_exact() {
        let header = serde_json::to_string(&TokenHeader::default()).unwrap();
        assert_eq!(header, r#"{"alg":"HS256","typ":"JWT"}"#);
    }

    #[test]
    fn test_refresh_payload_lifetime() {
        let payload = RefreshPayload::issued_at(7, 1_000);
        assert_eq!(payload.user_id, 7);
        assert_eq!(payload.exp, 1_000 + 31 * 24 * 3600);
    }

    #[test]
    fn test_access_payload_lifetime_and_shape() {
        let payload = AccessPayload::issued_at(7, "a@b.com", Role::Admin, 1_000);
        assert_eq!(payload.exp, 1_000 + 24 * 3600);

        let json = Payload::from(payload).to_json().unwrap();
        assert_eq!(
            json,
            r#"{"user_id":7,"exp":87400,"email":"a@b.com","role":"admin"}"#
        );
    }

    #[test]
    fn test_refresh_payload_wire_shape() {
        let json = Payload::from(RefreshPayload::issued_at(3, 0)).to_json().unwrap();
        assert_eq!(json, r#"{"user_id":3,"exp":2678400}"#);
    }

    #[test]
    fn test_decode_valid_refresh_payload() {
        let payload = RefreshPayload::decode(r#"{"user_id": 0, "exp": 1692485627}"#).unwrap();
        assert_eq!(
            payload,
            RefreshPayload {
                user_id: 0,
                exp: 1692485627
            }
        );
    }

    #[test]
    fn test_decode_unrelated_object_is_invalid() {
        let result = RefreshPayload::decode(r#"{"name": "John", "age": "thirty", "foo": "bar"}"#);
        assert!(matches!(result, Err(TokenError::InvalidPayload(_))));
    }

    #[test]
    fn test_decode_empty_object_is_zero_payload() {
        assert_eq!(RefreshPayload::decode("{}").unwrap(), RefreshPayload::default());
        assert_eq!(AccessPayload::decode("{}").unwrap(), AccessPayload::default());
    }

    #[test]
    fn test_decode_empty_string_fails() {
        assert!(matches!(RefreshPayload::decode(""), Err(TokenError::InvalidPayload(_))));
        assert!(matches!(AccessPayload::decode(""), Err(TokenError::InvalidPayload(_))));
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(RefreshPayload::decode("not json").is_err());
        assert!(RefreshPayload::decode(r#"{"user_id":"one","exp":5}"#).is_err());
    }

    #[test]
    fn test_decode_access_payload() {
        let payload =
            AccessPayload::decode(r#"{"user_id":2,"exp":10,"email":"x@y.io","role":"admin"}"#)
                .unwrap();
        assert_eq!(payload.role, Role::Admin);
        assert_eq!(payload.email, "x@y.io");
    }

    #[test]
    fn test_decode_access_payload_unknown_role_fails() {
        let result = AccessPayload::decode(r#"{"user_id":2,"exp":10,"role":"root"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_payload_kind() {
        assert_eq!(Payload::from(RefreshPayload::new(1)).kind(), PayloadKind::Refresh);
        let access = Payload::from(AccessPayload::new(1, "a@b.com", Role::User));
        assert_eq!(access.kind(), PayloadKind::Access);
        assert_eq!(access.user_id(), 1);
        assert!(access.exp() > 0);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("admin"), Some(Role::Admin));
        assert_eq!(Role::parse("user"), Some(Role::User));
        assert_eq!(Role::parse("root"), None);
        assert_eq!(Role::Admin.as_str(), "admin");
    }
}
