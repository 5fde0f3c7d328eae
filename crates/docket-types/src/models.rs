use serde::{Deserialize, Serialize};

/// JWT payload shared by the REST middleware and the token endpoints.
///
/// Field names stay snake_case: clients decode the token directly and read
/// `is_staff` to decide which views to show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: i64,
    pub username: String,
    pub is_staff: bool,
    pub exp: usize,
    /// Issue time of the first token in a refresh chain.
    pub orig_iat: i64,
}

/// The caller as resolved by the auth middleware. Staff status is read from
/// the database on every request, not trusted from the token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthUser {
    pub id: i64,
    pub username: String,
    pub is_staff: bool,
}
