/// Token Routes
///
/// Register, login, refresh, logout, check and admin user deletion.
/// Each endpoint maps auth failures to its own status codes.

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use serde::Deserialize;

use crate::auth::{AuthService, VerifiedToken};
use crate::error::{ApiError, AuthError, StoreError, TokenError};

#[derive(Deserialize)]
pub struct UserJson {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct CheckTokenJson {
    pub token: String,
}

#[derive(Deserialize)]
pub struct UserDelete {
    #[serde(default)]
    pub user_id: i64,
}

/// Raw `Authorization` header value, empty when absent or not visible ASCII
pub fn authorization(req: &HttpRequest) -> &str {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
}

fn bearer(req: &HttpRequest, auth: &AuthService) -> Result<VerifiedToken, TokenError> {
    auth.engine().verify_bearer(authorization(req))
}

/// POST /api/jwt/register
///
/// # Errors
/// - 400: invalid email or password, email taken, token issuance failed
pub async fn register(
    body: web::Json<UserJson>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ApiError> {
    let tokens = auth
        .register(&body.email, &body.password)
        .await
        .map_err(credentials_error)?;

    Ok(HttpResponse::Ok().json(tokens))
}

/// POST /api/jwt/login
///
/// # Errors
/// - 400: invalid input, session could not be stored
/// - 401: unknown email or wrong password
pub async fn login(
    body: web::Json<UserJson>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ApiError> {
    let tokens = auth
        .login(&body.email, &body.password)
        .await
        .map_err(credentials_error)?;

    Ok(HttpResponse::Ok().json(tokens))
}

/// GET /api/jwt/refresh with `Authorization: Bearer <refresh>`
///
/// # Errors
/// - 400: missing or invalid bearer, bad payload
/// - 401: storage failure
/// - 404: no live session for this token
pub async fn refresh(req: HttpRequest, auth: web::Data<AuthService>) -> Result<HttpResponse, ApiError> {
    let token = bearer(&req, &auth).map_err(ApiError::bad_request)?;
    let access = auth.refresh(&token).await.map_err(session_error)?;

    Ok(HttpResponse::Ok().json(access))
}

/// GET /api/jwt/logout with `Authorization: Bearer <refresh>`
pub async fn logout(req: HttpRequest, auth: web::Data<AuthService>) -> Result<HttpResponse, ApiError> {
    let token = bearer(&req, &auth).map_err(ApiError::bad_request)?;
    let cleared = auth.logout(&token).await.map_err(session_error)?;

    Ok(HttpResponse::Ok().json(cleared))
}

/// POST /api/jwt/check
pub async fn check(
    body: web::Json<CheckTokenJson>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ApiError> {
    auth.check(&body.token).map_err(ApiError::bad_request)?;
    Ok(HttpResponse::Ok().finish())
}

/// DELETE /api/jwt/delete with `Authorization: Bearer <access>` of an admin
///
/// # Errors
/// - 400: missing `user_id`, bad payload, caller is not an admin
/// - 401: missing or invalid bearer, storage failure
/// - 404: caller or target not found
pub async fn delete_user(
    req: HttpRequest,
    body: web::Json<UserDelete>,
    auth: web::Data<AuthService>,
) -> Result<HttpResponse, ApiError> {
    if body.user_id == 0 {
        return Err(ApiError::bad_request("user_id is required"));
    }

    let token = bearer(&req, &auth).map_err(ApiError::unauthorized)?;
    auth.delete(&token, body.user_id).await.map_err(admin_error)?;

    Ok(HttpResponse::Ok().finish())
}

/// register and login: a failed credential lookup is 401, anything else 400
fn credentials_error(error: AuthError) -> ApiError {
    match error {
        AuthError::Lookup(_) => ApiError::unauthorized(error),
        _ => ApiError::bad_request(error),
    }
}

/// refresh and logout
fn session_error(error: AuthError) -> ApiError {
    match error {
        AuthError::Lookup(StoreError::NotFound) | AuthError::Persist(StoreError::NotFound) => {
            ApiError::not_found(error)
        }
        AuthError::Lookup(_) => ApiError::unauthorized(error),
        _ => ApiError::bad_request(error),
    }
}

/// Admin-guarded operations, shared with the URL routes
pub fn admin_error(error: AuthError) -> ApiError {
    match error {
        AuthError::Lookup(StoreError::NotFound) => ApiError::not_found(error),
        AuthError::Lookup(_) => ApiError::unauthorized(error),
        _ => ApiError::bad_request(error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::{http::StatusCode, test::TestRequest, ResponseError};

    #[test]
    fn test_authorization_header() {
        let req = TestRequest::default()
            .insert_header((header::AUTHORIZATION, "Bearer abc"))
            .to_http_request();
        assert_eq!(authorization(&req), "Bearer abc");

        let req = TestRequest::default().to_http_request();
        assert_eq!(authorization(&req), "");
    }

    #[test]
    fn test_credentials_error_mapping() {
        let status = |e| credentials_error(e).status_code();
        assert_eq!(status(AuthError::Lookup(StoreError::NotFound)), StatusCode::UNAUTHORIZED);
        assert_eq!(
            status(AuthError::Persist(StoreError::UniqueViolation("email".into()))),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status(AuthError::Token(TokenError::Expired)), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_session_error_mapping() {
        let status = |e| session_error(e).status_code();
        assert_eq!(status(AuthError::Lookup(StoreError::NotFound)), StatusCode::NOT_FOUND);
        assert_eq!(status(AuthError::Persist(StoreError::NotFound)), StatusCode::NOT_FOUND);
        assert_eq!(
            status(AuthError::Lookup(StoreError::Storage("down".into()))),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(AuthError::Token(TokenError::InvalidPayload("{}".into()))),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_admin_error_mapping() {
        let status = |e| admin_error(e).status_code();
        assert_eq!(status(AuthError::Forbidden), StatusCode::BAD_REQUEST);
        assert_eq!(status(AuthError::Lookup(StoreError::NotFound)), StatusCode::NOT_FOUND);
        assert_eq!(
            status(AuthError::Lookup(StoreError::Storage("down".into()))),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status(AuthError::Persist(StoreError::NotFound)),
            StatusCode::BAD_REQUEST
        );
    }
}
