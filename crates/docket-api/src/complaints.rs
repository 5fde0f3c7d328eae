use axum::{
    Extension, Json,
    extract::{State, rejection::JsonRejection},
};
use tracing::info;

use docket_db::models::ComplaintRow;
use docket_types::AuthUser;
use docket_types::api::{ComplaintResponse, NewComplaintRequest, NewComplaintResponse};

use crate::auth::AppState;
use crate::error::{ApiError, ApiResult};
use crate::notify::notify_new_message;
use crate::run_blocking;
use crate::timestamps;
use crate::validation::{self, SUBJECT_MAX_CHARS, TEXT_MAX_CHARS};

pub(crate) fn complaint_response(row: ComplaintRow) -> ComplaintResponse {
    ComplaintResponse {
        id: row.id,
        subject: row.subject,
        owner: row.owner_username,
        created: timestamps::parse_stored(&row.created_at),
    }
}

/// Open a complaint. An opening `text` is stored as the first message and
/// staff are notified about it.
pub async fn create_complaint(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    payload: Result<Json<NewComplaintRequest>, JsonRejection>,
) -> ApiResult<Json<NewComplaintResponse>> {
    let Json(req) = payload?;

    let subject = validation::bounded_text("Subject", &req.subject, SUBJECT_MAX_CHARS)
        .map_err(ApiError::BadRequest)?;
    let text = req
        .text
        .as_deref()
        .map(|t| validation::bounded_text("Text", t, TEXT_MAX_CHARS))
        .transpose()
        .map_err(ApiError::BadRequest)?;

    let owner_id = user.id;
    let (row, message_id) = run_blocking(&state, move |db| {
        let (complaint_id, message_id) = db.create_complaint(owner_id, &subject, text.as_deref())?;
        let row = db
            .get_complaint(complaint_id)?
            .ok_or_else(|| anyhow::anyhow!("Complaint {} missing after insert", complaint_id))?;
        Ok((row, message_id))
    })
    .await?;

    info!(complaint_id = row.id, owner = %user.username, "Complaint created");

    if let Some(message_id) = message_id {
        tokio::spawn(notify_new_message(state.clone(), row.id, message_id));
    }

    Ok(Json(NewComplaintResponse {
        complaint: complaint_response(row),
    }))
}

/// Complaints visible to the caller, newest first.
pub async fn list_complaints(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> ApiResult<Json<Vec<ComplaintResponse>>> {
    let rows = run_blocking(&state, move |db| db.list_complaints(user.id, user.is_staff)).await?;

    Ok(Json(rows.into_iter().map(complaint_response).collect()))
}
