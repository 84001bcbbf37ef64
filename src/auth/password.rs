/// Credential hashing
///
/// Passwords are stored as `short_hash(email + password)`: the email acts as
/// the only salt, so the same password hashes differently per account.

use crate::codec::short_hash;
use crate::error::ValidationError;
use crate::validators::{is_valid_email, require_field};

/// Validated login / registration input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password_hash: String,
}

impl Credentials {
    /// Validate the raw fields and derive the stored hash
    ///
    /// # Errors
    /// Returns a validation error for a malformed email or empty password
    pub fn parse(email: &str, password: &str) -> Result<Self, ValidationError> {
        let email = is_valid_email(email)?;
        let password = require_field("password", password)?;
        let password_hash = hash_password(&email, password);

        Ok(Self {
            email,
            password_hash,
        })
    }
}

pub fn hash_password(email: &str, password: &str) -> String {
    short_hash(format!("{}{}", email, password))
}
