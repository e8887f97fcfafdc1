use axum::{
    Json,
    extract::{Path, Request, State},
    http::{HeaderMap, StatusCode, header},
    middleware::Next,
    response::{AppendHeaders, IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ApiError, ApiResponse};
use crate::db::PublicUser;
use crate::entities::users;
use crate::models::user::{Role, SignupInput, validate_password_pair};
use crate::models::{Validate, join_errors};
use crate::services::password;
use crate::state::AppState;

/// Clock skew allowed between hashing a new password and signing a token
/// in the same request.
const PASSWORD_CHANGE_MARGIN_SECONDS: i64 = 2;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Deserialize)]
pub struct ForgotPasswordRequest {
    #[serde(default)]
    pub email: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub current_password: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub confirm_password: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// The authenticated caller, attached by the middleware as an extension.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: Role,
}

// ============================================================================
// Middleware
// ============================================================================

/// Authentication middleware that accepts either:
/// 1. `Authorization: Bearer <jwt>` header
/// 2. `jwt` cookie (from login)
pub async fn protect(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(token) = extract_token(request.headers()) else {
        return Err(ApiError::unauthorized(
            "You are not logged in! Please log in to get access",
        ));
    };

    let claims = state
        .tokens
        .verify(&token)
        .map_err(|e| ApiError::unauthorized(e.to_string()))?;

    let user = state
        .store()
        .users()
        .get_model(claims.sub)
        .await?
        .filter(|u| u.active)
        .ok_or_else(|| {
            ApiError::unauthorized("The user belonging to this token does no longer exist")
        })?;

    if password_changed_after(&user, claims.iat) {
        return Err(ApiError::unauthorized(
            "User recently changed password! Please log in again",
        ));
    }

    let role = user
        .role
        .parse::<Role>()
        .map_err(|e| ApiError::internal(format!("Corrupt role column: {e}")))?;

    request.extensions_mut().insert(CurrentUser {
        id: user.id,
        name: user.name,
        email: user.email,
        role,
    });

    Ok(next.run(request).await)
}

/// Extract the JWT from the Authorization header or the `jwt` cookie
fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(auth_header) = headers.get(header::AUTHORIZATION)
        && let Ok(auth_str) = auth_header.to_str()
        && let Some(token) = auth_str.strip_prefix("Bearer ")
    {
        return Some(token.trim().to_string());
    }

    if let Some(cookies) = headers.get(header::COOKIE)
        && let Ok(cookie_str) = cookies.to_str()
    {
        for pair in cookie_str.split(';') {
            if let Some((name, value)) = pair.trim().split_once('=')
                && name == "jwt"
            {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Whether the password changed after the token was issued. A small margin
/// absorbs the hash-then-sign ordering within a single request.
fn password_changed_after(user: &users::Model, token_iat: i64) -> bool {
    let Some(changed_at) = &user.password_changed_at else {
        return false;
    };
    let Ok(changed_at) = DateTime::parse_from_rfc3339(changed_at) else {
        return false;
    };
    changed_at.timestamp() > token_iat + PASSWORD_CHANGE_MARGIN_SECONDS
}

/// Role gate for handlers behind [`protect`].
pub fn restrict_to(user: &CurrentUser, roles: &[Role]) -> Result<(), ApiError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You do not have permission to perform this action".to_string(),
        ))
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Issues a token and mirrors it into an HttpOnly `jwt` cookie.
fn send_token(
    state: &AppState,
    status: StatusCode,
    user_id: i32,
    user: Option<PublicUser>,
) -> Result<Response, ApiError> {
    let (token, _claims) = state
        .tokens
        .issue(user_id)
        .map_err(|e| ApiError::internal(format!("Token signing failed: {e}")))?;

    let cookie = format!(
        "jwt={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        state.config.auth.cookie_expiry_seconds
    );
    let headers = AppendHeaders([(header::SET_COOKIE, cookie)]);

    if let Some(user) = user {
        let body = ApiResponse::success_with_token(token, user);
        return Ok((status, headers, Json(body)).into_response());
    }
    Ok((status, headers, Json(ApiResponse::token_only(token))).into_response())
}

/// POST /api/v1/users/signup
pub async fn signup(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SignupInput>,
) -> Result<Response, ApiError> {
    payload.validate().map_err(|e| ApiError::validation(join_errors(&e)))?;

    let user = state.store().users().signup(payload).await?;
    send_token(&state, StatusCode::CREATED, user.id, Some(user))
}

/// POST /api/v1/users/login
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ApiError> {
    if payload.email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Please provide email and password!"));
    }

    let Some(user) = state.store().users().get_by_email(&payload.email).await? else {
        return Err(ApiError::unauthorized("Incorrect email or password"));
    };

    if !password::verify(&payload.password, &user.password_hash).await? {
        return Err(ApiError::unauthorized("Incorrect email or password"));
    }

    let id = user.id;
    send_token(&state, StatusCode::OK, id, Some(PublicUser::from(user)))
}

/// GET /api/v1/users/logout
///
/// Stateless tokens cannot be revoked; this overwrites the cookie with a
/// short-lived dummy so browser sessions end.
pub async fn logout() -> impl IntoResponse {
    let headers = AppendHeaders([(
        header::SET_COOKIE,
        "jwt=loggedout; Path=/; HttpOnly; Max-Age=10".to_string(),
    )]);
    (headers, Json(ApiResponse::success(MessageResponse {
        message: "Logged out".to_string(),
    })))
}

/// POST /api/v1/users/forgotPassword
pub async fn forgot_password(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let Some(user) = state.store().users().get_by_email(&payload.email).await? else {
        return Err(ApiError::NotFound(
            "There is no user with that email address".to_string(),
        ));
    };

    let token = password::generate_reset_token();
    let token_hash = password::hash_reset_token(&token);
    let expires_at =
        (Utc::now() + Duration::minutes(password::RESET_TOKEN_TTL_MINUTES)).to_rfc3339();

    state
        .store()
        .users()
        .set_reset_token(user.id, &token_hash, &expires_at)
        .await?;

    let reset_url = format!("/api/v1/users/resetPassword/{token}");
    let mail = crate::services::Mail {
        to: user.email.clone(),
        subject: "Your password reset token (valid for 10 minutes)".to_string(),
        body: format!(
            "Forgot your password? Submit a PATCH request with your new password \
             and confirmPassword to: {reset_url}.\nIf you didn't forget your \
             password, please ignore this email!"
        ),
    };

    if let Err(e) = state.mailer.send(mail).await {
        // The stored token is useless if the mail never went out.
        state.store().users().clear_reset_token(user.id).await?;
        tracing::error!("Reset mail delivery failed: {e}");
        return Err(ApiError::internal(
            "There was an error sending the email. Try again later!",
        ));
    }

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Token sent to email!".to_string(),
    })))
}

/// PATCH /api/v1/users/resetPassword/{token}
pub async fn reset_password(
    State(state): State<Arc<AppState>>,
    Path(token): Path<String>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Response, ApiError> {
    let mut errors = Vec::new();
    validate_password_pair(&payload.password, &payload.confirm_password, &mut errors);
    if !errors.is_empty() {
        return Err(errors.into());
    }

    let token_hash = password::hash_reset_token(&token);
    let user = state
        .store()
        .users()
        .get_by_reset_token(&token_hash)
        .await?
        .filter(|u| {
            u.password_reset_expires
                .as_deref()
                .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
                .is_some_and(|expires| expires > Utc::now())
        })
        .ok_or_else(|| ApiError::validation("Token is invalid or has expired"))?;

    state
        .store()
        .users()
        .update_password(user.id, &payload.password)
        .await?;

    send_token(&state, StatusCode::OK, user.id, None)
}

/// PATCH /api/v1/users/updatePassword (token via [`protect`])
pub async fn update_password(
    State(state): State<Arc<AppState>>,
    axum::Extension(current): axum::Extension<CurrentUser>,
    Json(payload): Json<UpdatePasswordRequest>,
) -> Result<Response, ApiError> {
    let user = state
        .store()
        .users()
        .get_model(current.id)
        .await?
        .ok_or_else(|| {
            ApiError::unauthorized("The user belonging to this token does no longer exist")
        })?;

    if !password::verify(&payload.current_password, &user.password_hash).await? {
        return Err(ApiError::unauthorized("Your current password is wrong"));
    }

    let mut errors = Vec::new();
    validate_password_pair(&payload.password, &payload.confirm_password, &mut errors);
    if !errors.is_empty() {
        return Err(errors.into());
    }

    state
        .store()
        .users()
        .update_password(user.id, &payload.password)
        .await?;

    send_token(&state, StatusCode::OK, user.id, None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn model(changed_at: Option<String>) -> users::Model {
        users::Model {
            id: 1,
            name: "Jonas".to_string(),
            email: "jonas@example.com".to_string(),
            photo: None,
            role: "user".to_string(),
            password_hash: "$argon2id$stub".to_string(),
            password_changed_at: changed_at,
            password_reset_token: None,
            password_reset_expires: None,
            active: true,
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn tokens_issued_before_a_password_change_are_stale() {
        let changed = Utc::now();
        let user = model(Some(changed.to_rfc3339()));

        let before = changed.timestamp() - 60;
        assert!(password_changed_after(&user, before));

        let after = changed.timestamp() + 60;
        assert!(!password_changed_after(&user, after));
    }

    #[test]
    fn the_skew_margin_spares_same_request_tokens() {
        let changed = Utc::now();
        let user = model(Some(changed.to_rfc3339()));

        // Issued one second before the change: inside the margin
        assert!(!password_changed_after(&user, changed.timestamp() - 1));
        // Well outside it
        assert!(password_changed_after(&user, changed.timestamp() - 10));
    }

    #[test]
    fn users_without_a_change_timestamp_never_invalidate() {
        assert!(!password_changed_after(&model(None), 0));
    }

    #[test]
    fn token_extraction_prefers_the_bearer_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_token(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; jwt=cookie-token"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("cookie-token"));

        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_static("Bearer header-token"),
        );
        assert_eq!(extract_token(&headers).as_deref(), Some("header-token"));
    }
}
