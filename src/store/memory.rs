/// In-memory store
///
/// Tables behind `std::sync::Mutex`; each trait call holds the lock for its
/// whole read-modify-write, which gives the per-row atomicity the auth
/// protocol relies on.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::auth::Role;
use crate::codec::to_base32;
use crate::error::StoreError;
use crate::store::{NewUser, Url, UrlStore, User, UserStore};

#[derive(Default)]
struct UserTable {
    next_id: i64,
    rows: HashMap<i64, User>,
}

struct UrlRow {
    url: Url,
    deleted_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct UrlTable {
    next_id: i64,
    rows: HashMap<i64, UrlRow>,
}

#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<UserTable>,
    urls: Mutex<UrlTable>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn users(&self) -> Result<MutexGuard<'_, UserTable>, StoreError> {
        self.users
            .lock()
            .map_err(|_| StoreError::Storage("user table lock poisoned".to_string()))
    }

    fn urls(&self) -> Result<MutexGuard<'_, UrlTable>, StoreError> {
        self.urls
            .lock()
            .map_err(|_| StoreError::Storage("url table lock poisoned".to_string()))
    }
}

impl UrlTable {
    fn live_mut(&mut self, short_url: &str) -> Option<&mut UrlRow> {
        self.rows
            .values_mut()
            .find(|row| row.deleted_at.is_none() && row.url.short_url == short_url)
    }
}

#[async_trait]
impl UserStore for InMemoryStore {
    async fn find_by_id_and_fingerprint(&self, id: i64, fingerprint: &str) -> Result<User, StoreError> {
        self.users()?
            .rows
            .get(&id)
            .filter(|user| user.fingerprint == fingerprint)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_email_and_password(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        self.users()?
            .rows
            .values()
            .find(|user| user.email == email && user.password_hash == password_hash)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        self.users()?.rows.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let mut table = self.users()?;
        if table.rows.values().any(|existing| existing.email == user.email) {
            return Err(StoreError::UniqueViolation(format!("email {}", user.email)));
        }

        table.next_id += 1;
        let created = User {
            id: table.next_id,
            email: user.email,
            password_hash: user.password_hash,
            fingerprint: String::new(),
            role: user.role,
        };
        table.rows.insert(created.id, created.clone());

        Ok(created)
    }

    async fn set_fingerprint(&self, id: i64, fingerprint: &str) -> Result<(), StoreError> {
        let mut table = self.users()?;
        let stored = table.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        stored.fingerprint = fingerprint.to_string();
        Ok(())
    }

    async fn set_role(&self, id: i64, role: Role) -> Result<(), StoreError> {
        let mut table = self.users()?;
        let stored = table.rows.get_mut(&id).ok_or(StoreError::NotFound)?;
        stored.role = role;
        Ok(())
    }

    async fn swap_fingerprint(&self, id: i64, expected: &str, replacement: &str) -> Result<(), StoreError> {
        let mut table = self.users()?;
        match table.rows.get_mut(&id) {
            Some(user) if user.fingerprint == expected => {
                user.fingerprint = replacement.to_string();
                Ok(())
            }
            _ => Err(StoreError::NotFound),
        }
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        self.users()?
            .rows
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl UrlStore for InMemoryStore {
    async fn find_by_short(&self, short_url: &str) -> Result<Url, StoreError> {
        self.urls()?
            .live_mut(short_url)
            .map(|row| row.url.clone())
            .ok_or(StoreError::NotFound)
    }

    async fn create_url(&self, original_url: &str) -> Result<Url, StoreError> {
        let mut table = self.urls()?;

        if let Some(row) = table
            .rows
            .values_mut()
            .find(|row| row.url.original_url == original_url)
        {
            row.deleted_at = None;
            return Ok(row.url.clone());
        }

        table.next_id += 1;
        let url = Url {
            id: table.next_id,
            original_url: original_url.to_string(),
            short_url: to_base32(table.next_id),
            created_at: Utc::now(),
        };
        table.rows.insert(
            url.id,
            UrlRow {
                url: url.clone(),
                deleted_at: None,
            },
        );

        Ok(url)
    }

    async fn update_original(&self, short_url: &str, original_url: &str) -> Result<Url, StoreError> {
        let mut table = self.urls()?;
        if table
            .rows
            .values()
            .any(|row| row.url.original_url == original_url && row.url.short_url != short_url)
        {
            return Err(StoreError::UniqueViolation(format!("original_url {}", original_url)));
        }

        let row = table.live_mut(short_url).ok_or(StoreError::NotFound)?;
        row.url.original_url = original_url.to_string();
        Ok(row.url.clone())
    }

    async fn soft_delete(&self, short_url: &str) -> Result<(), StoreError> {
        let mut table = self.urls()?;
        let row = table.live_mut(short_url).ok_or(StoreError::NotFound)?;
        row.deleted_at = Some(Utc::now());
        Ok(())
    }
}
