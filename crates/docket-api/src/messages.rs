use axum::{
    Extension, Json,
    extract::{Path, State, rejection::JsonRejection},
};
use chrono_tz::Tz;
use tracing::debug;

use docket_db::models::{ComplaintRow, MessageRow};
use docket_types::AuthUser;
use docket_types::api::{ConversationResponse, MessageResponse, SendMessageRequest, SendMessageResponse};

use crate::auth::AppState;
use crate::complaints::complaint_response;
use crate::error::{ApiError, ApiResult};
use crate::notify::notify_new_message;
use crate::run_blocking;
use crate::timestamps;
use crate::validation::{self, TEXT_MAX_CHARS};

fn message_response(row: MessageRow, tz: Tz) -> MessageResponse {
    MessageResponse {
        id: row.id,
        sender: row.sender_username,
        created: timestamps::localized(timestamps::parse_stored(&row.created_at), tz),
        text: row.text,
    }
}

/// Load a complaint the caller may see: staff see all, others only what
/// they own or have written in.
async fn visible_complaint(state: &AppState, user: &AuthUser, complaint_id: i64) -> ApiResult<ComplaintRow> {
    let user_id = user.id;
    let (complaint, participated) = run_blocking(state, move |db| {
        let Some(complaint) = db.get_complaint(complaint_id)? else {
            return Ok((None, false));
        };
        let participated = db.has_participated(complaint_id, user_id)?;
        Ok((Some(complaint), participated))
    })
    .await?;

    let complaint = complaint.ok_or(ApiError::NotFound)?;
    if user.is_staff || complaint.owner_id == user.id || participated {
        Ok(complaint)
    } else {
        debug!(complaint_id, user = %user.username, "Complaint hidden from user");
        Err(ApiError::Forbidden)
    }
}

pub async fn get_conversation(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<ConversationResponse>> {
    let complaint = visible_complaint(&state, &user, conversation_id).await?;

    let thread = run_blocking(&state, move |db| db.get_thread(conversation_id)).await?;
    let tz = state.notifier.tz();

    Ok(Json(ConversationResponse {
        complaint: complaint_response(complaint),
        messages: thread.into_iter().map(|m| message_response(m, tz)).collect(),
    }))
}

pub async fn send_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<SendMessageRequest>, JsonRejection>,
) -> ApiResult<Json<SendMessageResponse>> {
    let Json(req) = payload?;
    let text = validation::bounded_text("Text", &req.text, TEXT_MAX_CHARS).map_err(ApiError::BadRequest)?;

    let complaint = visible_complaint(&state, &user, conversation_id).await?;

    let sender_id = user.id;
    let stored_text = text.clone();
    let (message_id, created_at) =
        run_blocking(&state, move |db| db.insert_message(complaint.id, sender_id, &stored_text)).await?;

    tokio::spawn(notify_new_message(state.clone(), conversation_id, message_id));

    let row = MessageRow {
        id: message_id,
        sender_id,
        sender_username: user.username,
        text,
        created_at,
    };

    Ok(Json(SendMessageResponse {
        message: message_response(row, state.notifier.tz()),
    }))
}
