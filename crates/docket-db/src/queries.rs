use crate::models::{ComplaintRow, MessageRow, UserRow};
use crate::Database;
use anyhow::Result;
use chrono::SecondsFormat;
use rusqlite::{Connection, OptionalExtension, Row};

const COMPLAINT_COLUMNS: &str =
    "c.id, c.owner_id, u.username, u.email, c.subject, c.created_at
     FROM complaints c
     JOIN users u ON c.owner_id = u.id";

/// Microsecond RFC 3339 so that lexical order matches creation order.
fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

impl Database {
    // -- Users --

    pub fn create_user(&self, username: &str, email: &str, password_hash: &str) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (username, email, password, created_at) VALUES (?1, ?2, ?3, ?4)",
                (username, email, password_hash, now_timestamp()),
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    /// Grant or revoke staff. Returns false if no such user exists.
    pub fn set_staff(&self, username: &str, is_staff: bool) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE users SET is_staff = ?1 WHERE username = ?2",
                (is_staff, username),
            )?;
            Ok(changed > 0)
        })
    }

    /// Delete a user together with their complaints and messages.
    pub fn delete_user(&self, id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute("DELETE FROM users WHERE id = ?1", [id])?;
            Ok(changed > 0)
        })
    }

    /// Addresses of every staff member, blank ones skipped.
    pub fn staff_emails(&self) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT email FROM users WHERE is_staff = 1 AND email <> '' ORDER BY id",
            )?;
            let emails = stmt
                .query_map([], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(emails)
        })
    }

    // -- Complaints --

    /// Insert a complaint and, if given, its opening message in one
    /// transaction. Returns the complaint id and the message id.
    pub fn create_complaint(
        &self,
        owner_id: i64,
        subject: &str,
        first_text: Option<&str>,
    ) -> Result<(i64, Option<i64>)> {
        self.with_conn_mut(|conn| {
            let tx = conn.transaction()?;
            tx.execute(
                "INSERT INTO complaints (owner_id, subject, created_at) VALUES (?1, ?2, ?3)",
                (owner_id, subject, now_timestamp()),
            )?;
            let complaint_id = tx.last_insert_rowid();

            let message_id = match first_text {
                Some(text) => Some(insert_message_row(&tx, complaint_id, owner_id, text)?.0),
                None => None,
            };

            tx.commit()?;
            Ok((complaint_id, message_id))
        })
    }

    pub fn get_complaint(&self, id: i64) -> Result<Option<ComplaintRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {COMPLAINT_COLUMNS} WHERE c.id = ?1");
            let row = conn.query_row(&sql, [id], complaint_from_row).optional()?;
            Ok(row)
        })
    }

    /// Complaints visible to a user, newest first. Staff see everything;
    /// everyone else sees complaints they own or have written in.
    pub fn list_complaints(&self, user_id: i64, is_staff: bool) -> Result<Vec<ComplaintRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {COMPLAINT_COLUMNS}
                 WHERE ?2 = 1
                    OR c.owner_id = ?1
                    OR EXISTS (SELECT 1 FROM messages m WHERE m.complaint_id = c.id AND m.sender_id = ?1)
                 ORDER BY c.created_at DESC, c.id DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map((user_id, is_staff), complaint_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn has_participated(&self, complaint_id: i64, user_id: i64) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row(
                    "SELECT 1 FROM messages WHERE complaint_id = ?1 AND sender_id = ?2 LIMIT 1",
                    (complaint_id, user_id),
                    |_| Ok(()),
                )
                .optional()?;
            Ok(found.is_some())
        })
    }

    // -- Messages --

    /// Returns the new message id and its stored timestamp.
    pub fn insert_message(&self, complaint_id: i64, sender_id: i64, text: &str) -> Result<(i64, String)> {
        self.with_conn(|conn| insert_message_row(conn, complaint_id, sender_id, text))
    }

    /// Full conversation of a complaint, oldest first.
    pub fn get_thread(&self, complaint_id: i64) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT m.id, m.sender_id, u.username, m.text, m.created_at
                 FROM messages m
                 JOIN users u ON m.sender_id = u.id
                 WHERE m.complaint_id = ?1
                 ORDER BY m.created_at ASC, m.id ASC",
            )?;

            let rows = stmt
                .query_map([complaint_id], |row| {
                    Ok(MessageRow {
                        id: row.get(0)?,
                        sender_id: row.get(1)?,
                        sender_username: row.get(2)?,
                        text: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(rows)
        })
    }
}

fn insert_message_row(
    conn: &Connection,
    complaint_id: i64,
    sender_id: i64,
    text: &str,
) -> Result<(i64, String)> {
    let created_at = now_timestamp();
    conn.execute(
        "INSERT INTO messages (complaint_id, sender_id, text, created_at) VALUES (?1, ?2, ?3, ?4)",
        (complaint_id, sender_id, text, &created_at),
    )?;
    Ok((conn.last_insert_rowid(), created_at))
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, filter: &str, param: P) -> Result<Option<UserRow>> {
    let sql = format!(
        "SELECT id, username, email, password, is_staff FROM users WHERE {filter}"
    );

    let row = conn
        .query_row(&sql, [param], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                is_staff: row.get(4)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn complaint_from_row(row: &Row<'_>) -> rusqlite::Result<ComplaintRow> {
    Ok(ComplaintRow {
        id: row.get(0)?,
        owner_id: row.get(1)?,
        owner_username: row.get(2)?,
        owner_email: row.get(3)?,
        subject: row.get(4)?,
        created_at: row.get(5)?,
    })
}
