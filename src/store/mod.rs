/// Persistence adapters
///
/// The auth protocol and the URL handlers only talk to storage through the
/// `UserStore` and `UrlStore` traits. Implementations must make each call
/// atomic per row: the single-live-refresh-token invariant depends on it.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::Role;
use crate::error::StoreError;

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// A user row. `fingerprint` is the hash of the live refresh token, or
/// empty when no session is open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub fingerprint: String,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub role: Role,
}

/// A shortened URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Url {
    pub id: i64,
    pub original_url: String,
    pub short_url: String,
    pub created_at: DateTime<Utc>,
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// The user whose stored fingerprint equals `fingerprint`
    async fn find_by_id_and_fingerprint(&self, id: i64, fingerprint: &str) -> Result<User, StoreError>;

    async fn find_by_email_and_password(&self, email: &str, password_hash: &str) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError>;

    /// Insert a user with an empty fingerprint.
    /// `UniqueViolation` when the email is taken.
    async fn create_user(&self, user: NewUser) -> Result<User, StoreError>;

    /// Overwrite the fingerprint unconditionally (session rotation).
    /// Other columns are left untouched.
    async fn set_fingerprint(&self, id: i64, fingerprint: &str) -> Result<(), StoreError>;

    async fn set_role(&self, id: i64, role: Role) -> Result<(), StoreError>;

    /// Replace the fingerprint only if it still equals `expected`;
    /// `NotFound` otherwise.
    async fn swap_fingerprint(&self, id: i64, expected: &str, replacement: &str) -> Result<(), StoreError>;

    async fn delete_user(&self, id: i64) -> Result<(), StoreError>;
}

#[async_trait]
pub trait UrlStore: Send + Sync {
    /// Live (not soft-deleted) URL by short code
    async fn find_by_short(&self, short_url: &str) -> Result<Url, StoreError>;

    /// Store `original_url` and assign its short code. An already stored
    /// original is returned as is (and revived if it was soft-deleted).
    async fn create_url(&self, original_url: &str) -> Result<Url, StoreError>;

    async fn update_original(&self, short_url: &str, original_url: &str) -> Result<Url, StoreError>;

    async fn soft_delete(&self, short_url: &str) -> Result<(), StoreError>;
}
