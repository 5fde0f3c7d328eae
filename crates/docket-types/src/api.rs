use serde::{Deserialize, Serialize};

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: String,
    pub password: String,
}

/// Email and password are write-only, so only the username comes back.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    pub username: String,
}

// -- Complaints --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComplaintRequest {
    pub subject: String,
    /// Opening message. When present it is stored together with the
    /// complaint and staff are notified.
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintResponse {
    pub id: i64,
    pub subject: String,
    /// Owner's username.
    pub owner: String,
    pub created: chrono::DateTime<chrono::Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComplaintResponse {
    pub complaint: ComplaintResponse,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageResponse {
    pub id: i64,
    pub text: String,
    /// Sender's username.
    pub sender: String,
    /// Localized display timestamp.
    pub created: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub message: MessageResponse,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationResponse {
    pub complaint: ComplaintResponse,
    pub messages: Vec<MessageResponse>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_request_email_is_optional() {
        let req: RegisterRequest =
            serde_json::from_str(r#"{"username":"anna","password":"pw"}"#).unwrap();
        assert_eq!(req.email, "");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        // Older clients send the complaint id alongside the text.
        let req: SendMessageRequest =
            serde_json::from_str(r#"{"text":"hi","complaint":3}"#).unwrap();
        assert_eq!(req.text, "hi");

        let req: NewComplaintRequest =
            serde_json::from_str(r#"{"subject":"ok","text":"hi","extra":1}"#).unwrap();
        assert_eq!(req.subject, "ok");
        assert_eq!(req.text.as_deref(), Some("hi"));
    }

    #[test]
    fn conversation_nests_complaint_and_messages() {
        let body = serde_json::to_value(ConversationResponse {
            complaint: ComplaintResponse {
                id: 1,
                subject: "Broken heater".into(),
                owner: "anna".into(),
                created: chrono::DateTime::default(),
            },
            messages: vec![],
        })
        .unwrap();
        assert_eq!(body["complaint"]["owner"], "anna");
        assert!(body["messages"].as_array().unwrap().is_empty());
    }
}
