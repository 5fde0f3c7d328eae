//! Email notifications for new complaint activity.
//!
//! When the owner writes, every staff member with an address is told; when
//! anyone else writes, the owner is told. The email carries the whole
//! conversation, newest message first, as plain text and as HTML.

use std::sync::Arc;

use chrono_tz::Tz;
use lettre::message::Mailbox;
use tracing::{debug, warn};

use docket_db::models::{ComplaintRow, MessageRow};

use crate::auth::AppState;
use crate::mailer::{MailTransport, OutgoingEmail};
use crate::timestamps;

const TEXT_RULE: &str = "----------------------------------------";

pub struct Notifier {
    transport: Arc<dyn MailTransport>,
    from: Mailbox,
    tz: Tz,
}

impl Notifier {
    pub fn new(transport: Arc<dyn MailTransport>, from: Mailbox, tz: Tz) -> Self {
        Self { transport, from, tz }
    }

    /// Zone used for every user-facing timestamp.
    pub fn tz(&self) -> Tz {
        self.tz
    }
}

/// Addresses to notify about a message written by `sender_id`.
pub fn recipients(complaint: &ComplaintRow, sender_id: i64, staff_emails: &[String]) -> Vec<String> {
    if sender_id == complaint.owner_id {
        staff_emails
            .iter()
            .filter(|e| !e.trim().is_empty())
            .cloned()
            .collect()
    } else if complaint.owner_email.trim().is_empty() {
        vec![]
    } else {
        vec![complaint.owner_email.clone()]
    }
}

pub fn subject_line(complaint: &ComplaintRow) -> String {
    format!("Complaint #{}: {}", complaint.id, complaint.subject)
}

/// Plain-text digest, newest message first.
pub fn render_text(thread: &[MessageRow], tz: Tz) -> String {
    thread
        .iter()
        .rev()
        .map(|m| {
            format!(
                "{} ({}):\n{}",
                m.sender_username,
                timestamps::localized(timestamps::parse_stored(&m.created_at), tz),
                m.text
            )
        })
        .collect::<Vec<_>>()
        .join(&format!("\n{TEXT_RULE}\n"))
}

/// HTML digest with the same order and structure as [`render_text`].
pub fn render_html(thread: &[MessageRow], tz: Tz) -> String {
    let entries = thread
        .iter()
        .rev()
        .map(|m| {
            format!(
                "<p><b>{}</b> ({}):</p>\n<p>{}</p>",
                html_escape(&m.sender_username),
                timestamps::localized(timestamps::parse_stored(&m.created_at), tz),
                html_escape(&m.text).replace('\n', "<br>\n")
            )
        })
        .collect::<Vec<_>>()
        .join("\n<hr>\n");

    format!("<html>\n<body>\n{entries}\n</body>\n</html>\n")
}

/// Assemble the email for `new_message_id`, or `None` when nobody is to be told.
pub fn build_notification(
    complaint: &ComplaintRow,
    thread: &[MessageRow],
    new_message_id: i64,
    staff_emails: &[String],
    from: &Mailbox,
    tz: Tz,
) -> Option<OutgoingEmail> {
    let new_message = thread.iter().find(|m| m.id == new_message_id)?;
    let to = recipients(complaint, new_message.sender_id, staff_emails);
    if to.is_empty() {
        return None;
    }

    Some(OutgoingEmail {
        from: from.clone(),
        to,
        subject: subject_line(complaint),
        text_body: render_text(thread, tz),
        html_body: render_html(thread, tz),
    })
}

/// Deliver the notification for a freshly stored message. Never fails:
/// problems are logged and dropped so the originating request is unaffected.
pub async fn notify_new_message(state: AppState, complaint_id: i64, message_id: i64) {
    if let Err(e) = try_notify(&state, complaint_id, message_id).await {
        warn!(complaint_id, message_id, "Notification failed: {:#}", e);
    }
}

async fn try_notify(state: &AppState, complaint_id: i64, message_id: i64) -> anyhow::Result<()> {
    let db = state.clone();
    let loaded = tokio::task::spawn_blocking(move || {
        let Some(complaint) = db.db.get_complaint(complaint_id)? else {
            return Ok(None);
        };
        let thread = db.db.get_thread(complaint_id)?;
        let staff_emails = db.db.staff_emails()?;
        Ok::<_, anyhow::Error>(Some((complaint, thread, staff_emails)))
    })
    .await??;

    let Some((complaint, thread, staff_emails)) = loaded else {
        debug!(complaint_id, "Complaint vanished before notification");
        return Ok(());
    };

    let notifier = &state.notifier;
    let Some(email) = build_notification(
        &complaint,
        &thread,
        message_id,
        &staff_emails,
        &notifier.from,
        notifier.tz,
    ) else {
        debug!(complaint_id, message_id, "No recipients for notification");
        return Ok(());
    };

    notifier.transport.send(email).await
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

#[cfg(test)]
mod tests {
    use super::*;

    const OWNER: i64 = 1;
    const STAFF: i64 = 2;

    fn tz() -> Tz {
        "Europe/Budapest".parse().unwrap()
    }

    fn complaint(owner_email: &str) -> ComplaintRow {
        ComplaintRow {
            id: 7,
            owner_id: OWNER,
            owner_username: "anna".into(),
            owner_email: owner_email.into(),
            subject: "Broken heater".into(),
            created_at: "2026-01-10T10:00:00.000000Z".into(),
        }
    }

    fn message(id: i64, sender_id: i64, sender: &str, text: &str, at: &str) -> MessageRow {
        MessageRow {
            id,
            sender_id,
            sender_username: sender.into(),
            text: text.into(),
            created_at: at.into(),
        }
    }

    fn thread() -> Vec<MessageRow> {
        vec![
            message(1, OWNER, "anna", "It is cold", "2026-01-10T10:00:00.000000Z"),
            message(2, STAFF, "support", "Sending <someone>", "2026-01-10T11:00:00.000000Z"),
            message(3, OWNER, "anna", "Thanks\nfor the help", "2026-01-10T12:00:00.000000Z"),
        ]
    }

    fn staff() -> Vec<String> {
        vec!["support@example.com".into(), "boss@example.com".into(), " ".into()]
    }

    #[test]
    fn owner_reply_goes_to_all_staff() {
        let to = recipients(&complaint("anna@example.com"), OWNER, &staff());
        assert_eq!(to, vec!["support@example.com", "boss@example.com"]);
    }

    #[test]
    fn staff_reply_goes_to_owner() {
        let to = recipients(&complaint("anna@example.com"), STAFF, &staff());
        assert_eq!(to, vec!["anna@example.com"]);
    }

    #[test]
    fn owner_without_address_gets_nothing() {
        assert!(recipients(&complaint(""), STAFF, &staff()).is_empty());

        let from: Mailbox = "Complaints <noreply@example.com>".parse().unwrap();
        assert!(build_notification(&complaint(""), &thread(), 2, &staff(), &from, tz()).is_none());
    }

    #[test]
    fn text_digest_is_newest_first() {
        let text = render_text(&thread(), tz());
        let sections: Vec<&str> = text.split(&format!("\n{TEXT_RULE}\n")).collect();

        assert_eq!(sections.len(), 3);
        assert!(sections[0].starts_with("anna (2026. jan. 10. 13:00:00):"));
        assert!(sections[0].contains(" 10. 13:00:00):\nThanks\nfor the help"));
        assert!(sections[1].starts_with("support ("));
        assert!(sections[1].ends_with("Sending <someone>"));
        assert!(sections[2].ends_with("It is cold"));
    }

    #[test]
    fn html_digest_escapes_and_separates() {
        let html = render_html(&thread(), tz());

        assert_eq!(html.matches("<hr>").count(), 2);
        assert!(html.contains("Sending &lt;someone&gt;"));
        assert!(html.contains("Thanks<br>\nfor the help"));
        let newest = html.find("Thanks").unwrap();
        let oldest = html.find("It is cold").unwrap();
        assert!(newest < oldest);
    }

    #[test]
    fn notification_for_owner_message() {
        let from: Mailbox = "Complaints <noreply@example.com>".parse().unwrap();
        let email =
            build_notification(&complaint("anna@example.com"), &thread(), 3, &staff(), &from, tz())
                .unwrap();

        assert_eq!(email.to.len(), 2);
        assert_eq!(email.subject, "Complaint #7: Broken heater");
        assert!(email.text_body.starts_with("anna ("));
        assert!(email.html_body.starts_with("<html>"));
    }

    #[test]
    fn unknown_message_yields_nothing() {
        let from: Mailbox = "noreply@example.com".parse().unwrap();
        assert!(
            build_notification(&complaint("anna@example.com"), &thread(), 99, &staff(), &from, tz())
                .is_none()
        );
    }
}
