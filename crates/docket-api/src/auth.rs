use std::sync::Arc;

use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::{State, rejection::JsonRejection}};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use tracing::info;

use docket_db::Database;
use docket_db::models::UserRow;
use docket_types::Claims;
use docket_types::api::{LoginRequest, RefreshRequest, RegisterRequest, RegisterResponse, TokenResponse};

use crate::error::{ApiError, ApiResult};
use crate::notify::Notifier;
use crate::run_blocking;
use crate::validation;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt: JwtSettings,
    pub notifier: Notifier,
}

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    /// Lifetime of a single token.
    pub ttl: Duration,
    /// How long after the first login a token chain may still be refreshed.
    pub refresh_window: Duration,
}

const BAD_CREDENTIALS: &str = "Unable to log in with provided credentials.";

pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(req) = payload?;

    let username = req.username.clone();
    let user = run_blocking(&state, move |db| db.get_user_by_username(&username))
        .await?
        .ok_or_else(|| ApiError::BadRequest(BAD_CREDENTIALS.to_string()))?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow::anyhow!("Stored password hash is invalid: {}", e))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::BadRequest(BAD_CREDENTIALS.to_string()))?;

    let token = create_token(&state.jwt, &user, Utc::now().timestamp())?;
    Ok(Json(TokenResponse { token }))
}

/// Exchange a still-valid token for a fresh one, as long as the chain started
/// within the refresh window.
pub async fn refresh(
    State(state): State<AppState>,
    payload: Result<Json<RefreshRequest>, JsonRejection>,
) -> ApiResult<Json<TokenResponse>> {
    let Json(req) = payload?;

    let claims = decode_token(&state.jwt.secret, &req.token)
        .map_err(|_| ApiError::BadRequest("Signature has expired or is invalid.".to_string()))?;

    let refresh_deadline = claims.orig_iat + state.jwt.refresh_window.num_seconds();
    if Utc::now().timestamp() > refresh_deadline {
        return Err(ApiError::BadRequest("Refresh has expired.".to_string()));
    }

    let user_id = claims.user_id;
    let user = run_blocking(&state, move |db| db.get_user_by_id(user_id))
        .await?
        .ok_or_else(|| ApiError::BadRequest("User doesn't exist.".to_string()))?;

    let token = create_token(&state.jwt, &user, claims.orig_iat)?;
    Ok(Json(TokenResponse { token }))
}

pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> ApiResult<Json<RegisterResponse>> {
    let Json(req) = payload?;

    validation::validate_username(&req.username).map_err(ApiError::BadRequest)?;
    validation::validate_email(&req.email).map_err(ApiError::BadRequest)?;
    validation::validate_password(&req.password).map_err(ApiError::BadRequest)?;

    // Check if username is taken
    let username = req.username.clone();
    if run_blocking(&state, move |db| db.get_user_by_username(&username))
        .await?
        .is_some()
    {
        return Err(ApiError::BadRequest(
            "A user with that username already exists.".to_string(),
        ));
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Password hashing failed: {}", e))?
        .to_string();

    let username = req.username.clone();
    let email = req.email.clone();
    let user_id =
        run_blocking(&state, move |db| db.create_user(&username, &email, &password_hash)).await?;

    info!(user_id, username = %req.username, "User registered");

    Ok(Json(RegisterResponse {
        username: req.username,
    }))
}

pub fn create_token(settings: &JwtSettings, user: &UserRow, orig_iat: i64) -> anyhow::Result<String> {
    let claims = Claims {
        user_id: user.id,
        username: user.username.clone(),
        is_staff: user.is_staff,
        exp: (Utc::now() + settings.ttl).timestamp() as usize,
        orig_iat,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(settings.secret.as_bytes()),
    )?;

    Ok(token)
}

/// Verify signature and expiry.
pub fn decode_token(secret: &str, token: &str) -> anyhow::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> JwtSettings {
        JwtSettings {
            secret: "test-secret".into(),
            ttl: Duration::hours(1),
            refresh_window: Duration::days(7),
        }
    }

    fn user() -> UserRow {
        UserRow {
            id: 4,
            username: "support".into(),
            email: "support@example.com".into(),
            password: String::new(),
            is_staff: true,
        }
    }

    #[test]
    fn token_carries_identity_and_staff_flag() {
        let token = create_token(&settings(), &user(), 1_700_000_000).unwrap();
        let claims = decode_token("test-secret", &token).unwrap();

        assert_eq!(claims.user_id, 4);
        assert_eq!(claims.username, "support");
        assert!(claims.is_staff);
        assert_eq!(claims.orig_iat, 1_700_000_000);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_token(&settings(), &user(), 0).unwrap();
        assert!(decode_token("other-secret", &token).is_err());
    }

    #[test]
    fn expired_token_is_rejected() {
        let expired = JwtSettings {
            ttl: Duration::hours(-2),
            ..settings()
        };
        let token = create_token(&expired, &user(), 0).unwrap();
        assert!(decode_token("test-secret", &token).is_err());
    }
}
