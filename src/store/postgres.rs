/// Postgres store
///
/// Every fingerprint change is a single conditional `UPDATE`, so the row lock
/// Postgres takes for it is the serialisation point between concurrent
/// login / logout requests of one user.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::auth::Role;
use crate::codec::{short_hash, to_base32};
use crate::configuration::DatabaseSettings;
use crate::error::StoreError;
use crate::store::{NewUser, Url, UrlStore, User, UserStore};

type UserRow = (i64, String, String, String, String);
type UrlRow = (i64, String, String, DateTime<Utc>);

const USER_COLUMNS: &str = "id, email, password, refresh_token, role";

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect and bring the schema up to date
    pub async fn connect(settings: &DatabaseSettings) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(settings.max_connections)
            .connect(&settings.connection_string())
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StoreError::Storage(e.to_string()))?;

        Ok(Self::new(pool))
    }
}

fn into_user((id, email, password_hash, fingerprint, role): UserRow) -> Result<User, StoreError> {
    let role = Role::parse(&role).ok_or_else(|| StoreError::Storage(format!("unknown role {}", role)))?;

    Ok(User {
        id,
        email,
        password_hash,
        fingerprint,
        role,
    })
}

fn into_url((id, original_url, short_url, created_at): UrlRow) -> Url {
    Url {
        id,
        original_url,
        short_url,
        created_at,
    }
}

fn expect_one_row(rows_affected: u64) -> Result<(), StoreError> {
    if rows_affected == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_by_id_and_fingerprint(&self, id: i64, fingerprint: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE id = $1 AND refresh_token = $2",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(fingerprint)
        .fetch_one(&self.pool)
        .await?;

        into_user(row)
    }

    async fn find_by_email_and_password(&self, email: &str, password_hash: &str) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {} FROM users WHERE email = $1 AND password = $2",
            USER_COLUMNS
        ))
        .bind(email)
        .bind(password_hash)
        .fetch_one(&self.pool)
        .await?;

        into_user(row)
    }

    async fn find_by_id(&self, id: i64) -> Result<User, StoreError> {
        let row = sqlx::query_as::<_, UserRow>(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        into_user(row)
    }

    async fn create_user(&self, user: NewUser) -> Result<User, StoreError> {
        let now = Utc::now();
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r#"
            INSERT INTO users (email, password, refresh_token, role, created_at, updated_at)
            VALUES ($1, $2, '', $3, $4, $4)
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.as_str())
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        into_user(row)
    }

    async fn set_fingerprint(&self, id: i64, fingerprint: &str) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET refresh_token = $1, updated_at = $2 WHERE id = $3")
            .bind(fingerprint)
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one_row(result.rows_affected())
    }

    async fn set_role(&self, id: i64, role: Role) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE users SET role = $1, updated_at = $2 WHERE id = $3")
            .bind(role.as_str())
            .bind(Utc::now())
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one_row(result.rows_affected())
    }

    async fn swap_fingerprint(&self, id: i64, expected: &str, replacement: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET refresh_token = $1, updated_at = $2 WHERE id = $3 AND refresh_token = $4",
        )
        .bind(replacement)
        .bind(Utc::now())
        .bind(id)
        .bind(expected)
        .execute(&self.pool)
        .await?;

        expect_one_row(result.rows_affected())
    }

    async fn delete_user(&self, id: i64) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_one_row(result.rows_affected())
    }
}

#[async_trait]
impl UrlStore for PgStore {
    async fn find_by_short(&self, short_url: &str) -> Result<Url, StoreError> {
        let row = sqlx::query_as::<_, UrlRow>(
            "SELECT id, original_url, short_url, created_at FROM urls WHERE short_url = $1 AND deleted_at IS NULL",
        )
        .bind(short_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(into_url(row))
    }

    async fn create_url(&self, original_url: &str) -> Result<Url, StoreError> {
        let mut transaction = self.pool.begin().await?;

        // The provisional code only has to be unique until the id is known.
        let inserted = sqlx::query_as::<_, (i64, DateTime<Utc>)>(
            r#"
            INSERT INTO urls (original_url, short_url, created_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (original_url) DO NOTHING
            RETURNING id, created_at
            "#,
        )
        .bind(original_url)
        .bind(short_hash(original_url))
        .bind(Utc::now())
        .fetch_optional(&mut transaction)
        .await?;

        let url = match inserted {
            Some((id, created_at)) => {
                let short_url = to_base32(id);
                sqlx::query("UPDATE urls SET short_url = $1 WHERE id = $2")
                    .bind(&short_url)
                    .bind(id)
                    .execute(&mut transaction)
                    .await?;

                Url {
                    id,
                    original_url: original_url.to_string(),
                    short_url,
                    created_at,
                }
            }
            None => {
                let row = sqlx::query_as::<_, UrlRow>(
                    r#"
                    UPDATE urls SET deleted_at = NULL
                    WHERE original_url = $1
                    RETURNING id, original_url, short_url, created_at
                    "#,
                )
                .bind(original_url)
                .fetch_one(&mut transaction)
                .await?;

                into_url(row)
            }
        };

        transaction.commit().await?;
        Ok(url)
    }

    async fn update_original(&self, short_url: &str, original_url: &str) -> Result<Url, StoreError> {
        let row = sqlx::query_as::<_, UrlRow>(
            r#"
            UPDATE urls SET original_url = $1
            WHERE short_url = $2 AND deleted_at IS NULL
            RETURNING id, original_url, short_url, created_at
            "#,
        )
        .bind(original_url)
        .bind(short_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(into_url(row))
    }

    async fn soft_delete(&self, short_url: &str) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE urls SET deleted_at = $1 WHERE short_url = $2 AND deleted_at IS NULL",
        )
        .bind(Utc::now())
        .bind(short_url)
        .execute(&self.pool)
        .await?;

        expect_one_row(result.rows_affected())
    }
}
