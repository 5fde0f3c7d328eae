use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use docket_types::AuthUser;

use crate::auth::{AppState, decode_token};
use crate::error::ApiError;
use crate::run_blocking;

/// Accept `Bearer <token>` and the older `JWT <token>` form.
fn token_from_header(value: &str) -> Option<&str> {
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("JWT "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Extract and validate JWT from Authorization header, then resolve the
/// user it names. Deleted users are rejected even with a valid token.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(token_from_header)
        .ok_or(ApiError::Unauthorized)?;

    let claims = decode_token(&state.jwt.secret, token).map_err(|_| ApiError::Unauthorized)?;

    let user_id = claims.user_id;
    let user = run_blocking(&state, move |db| db.get_user_by_id(user_id))
        .await?
        .ok_or(ApiError::Unauthorized)?;

    req.extensions_mut().insert(AuthUser {
        id: user.id,
        username: user.username,
        is_staff: user.is_staff,
    });
    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::token_from_header;

    #[test]
    fn header_prefixes() {
        assert_eq!(token_from_header("Bearer abc"), Some("abc"));
        assert_eq!(token_from_header("JWT abc"), Some("abc"));
        assert_eq!(token_from_header("Basic abc"), None);
        assert_eq!(token_from_header("Bearer "), None);
    }
}
