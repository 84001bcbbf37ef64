/// URL Routes
///
/// Public create and lookup; update and soft delete require an admin
/// access token.

use actix_web::{web, HttpRequest, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::AuthService;
use crate::error::{ApiError, ErrorResponse, StoreError};
use crate::routes::jwt::{admin_error, authorization};
use crate::store::{Url, UrlStore};
use crate::validators::require_field;

#[derive(Deserialize)]
pub struct UrlJson {
    #[serde(default)]
    pub original_url: String,
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UrlResponse {
    pub id: i64,
    pub original_url: String,
    pub short_url: String,
    pub created_at: DateTime<Utc>,
}

impl From<Url> for UrlResponse {
    fn from(url: Url) -> Self {
        Self {
            id: url.id,
            original_url: url.original_url,
            short_url: url.short_url,
            created_at: url.created_at,
        }
    }
}

/// POST /api/urls/
///
/// Storing an already known URL returns its existing short code.
pub async fn create_url(
    body: web::Json<UrlJson>,
    urls: web::Data<dyn UrlStore>,
) -> Result<HttpResponse, ApiError> {
    let original = require_field("original_url", &body.original_url).map_err(ApiError::bad_request)?;
    let url = urls.create_url(original).await.map_err(ApiError::bad_request)?;

    tracing::info!(url_id = url.id, short_url = %url.short_url, "Short URL created");
    Ok(HttpResponse::Ok().json(UrlResponse::from(url)))
}

/// GET /api/urls/{short_url}
pub async fn get_url(
    path: web::Path<String>,
    urls: web::Data<dyn UrlStore>,
) -> Result<HttpResponse, ApiError> {
    let url = urls.find_by_short(&path).await.map_err(url_error)?;
    Ok(HttpResponse::Ok().json(UrlResponse::from(url)))
}

/// PATCH /api/urls/{short_url}
///
/// # Errors
/// - 400: empty `original_url`, caller is not an admin, URL already stored
/// - 401: missing or invalid bearer
/// - 404: caller or short URL not found
pub async fn update_url(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<UrlJson>,
    auth: web::Data<AuthService>,
    urls: web::Data<dyn UrlStore>,
) -> Result<HttpResponse, ApiError> {
    let token = auth
        .engine()
        .verify_bearer(authorization(&req))
        .map_err(ApiError::unauthorized)?;
    let caller = auth.authorize_admin(&token).await.map_err(admin_error)?;

    let original = require_field("original_url", &body.original_url).map_err(ApiError::bad_request)?;
    urls.update_original(&path, original).await.map_err(url_error)?;

    tracing::info!(user_id = caller.id, short_url = %path, "Short URL updated");
    Ok(HttpResponse::Ok().json(ErrorResponse::success()))
}

/// DELETE /api/urls/{short_url}
pub async fn delete_url(
    req: HttpRequest,
    path: web::Path<String>,
    auth: web::Data<AuthService>,
    urls: web::Data<dyn UrlStore>,
) -> Result<HttpResponse, ApiError> {
    let token = auth
        .engine()
        .verify_bearer(authorization(&req))
        .map_err(ApiError::unauthorized)?;
    let caller = auth.authorize_admin(&token).await.map_err(admin_error)?;

    urls.soft_delete(&path).await.map_err(url_error)?;

    tracing::info!(user_id = caller.id, short_url = %path, "Short URL deleted");
    Ok(HttpResponse::Ok().json(ErrorResponse::success()))
}

fn url_error(error: StoreError) -> ApiError {
    match error {
        StoreError::NotFound => ApiError::not_found(error),
        _ => ApiError::bad_request(error),
    }
}
