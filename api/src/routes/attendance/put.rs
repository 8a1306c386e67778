//! Attendance session status updates.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use db::attendance::AttendanceError;
use db::models::attendance_session::{Entity as SessionEntity, SessionStatus};
use sea_orm::EntityTrait;
use std::str::FromStr;
use tracing::info;
use util::state::AppState;

use crate::response::ApiResponse;
use crate::routes::attendance::common::{SessionResponse, SetStatusRequest};
use crate::routes::common::error_response;

/// PUT /api/attendance/{session_id}/status
///
/// Moves an active session to a terminal state, normally `completed` when a
/// teacher closes attendance early. Terminal sessions cannot change again
/// and nothing can be moved back to `active`.
///
/// ### Request Body
/// ```json
/// { "status": "completed" }
/// ```
pub async fn set_status(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(req): Json<SetStatusRequest>,
) -> Response {
    let Some(raw_status) = req.status else {
        return error_response(AttendanceError::Validation(
            "status is required".to_string(),
        ));
    };

    let Ok(target) = SessionStatus::from_str(&raw_status) else {
        return error_response(AttendanceError::Validation(format!(
            "Invalid status '{raw_status}'. Expected one of: active, expired, completed"
        )));
    };

    let session = match SessionEntity::find_by_id(session_id).one(state.db()).await {
        Ok(Some(session)) => session,
        Ok(None) => return error_response(AttendanceError::SessionNotFound),
        Err(err) => return error_response(err.into()),
    };

    if session.status != SessionStatus::Active {
        return error_response(AttendanceError::Validation(format!(
            "Session is already {} and cannot change status",
            session.status
        )));
    }
    if target == SessionStatus::Active {
        return error_response(AttendanceError::Validation(
            "Sessions cannot be reactivated".to_string(),
        ));
    }

    match session.set_status(state.db(), target).await {
        Ok(updated) => {
            info!(session_id, status = %target, "session status updated");
            Json(ApiResponse::success(
                SessionResponse::from_session(&updated, Utc::now()),
                "Session status updated successfully",
            ))
            .into_response()
        }
        Err(err) => error_response(err.into()),
    }
}
