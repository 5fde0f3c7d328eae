/// Database row types, mapped directly from SQLite rows.
/// Distinct from docket-types API models to keep the DB layer independent.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub is_staff: bool,
}

/// A complaint joined with its owner's username and email.
pub struct ComplaintRow {
    pub id: i64,
    pub owner_id: i64,
    pub owner_username: String,
    pub owner_email: String,
    pub subject: String,
    pub created_at: String,
}

/// A message joined with its sender's username.
pub struct MessageRow {
    pub id: i64,
    pub sender_id: i64,
    pub sender_username: String,
    pub text: String,
    pub created_at: String,
}
