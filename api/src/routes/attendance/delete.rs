//! Attendance session deletion.

use axum::Json;
use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use db::attendance::AttendanceError;
use db::models::attendance_session::Model as Session;
use tracing::info;
use util::state::AppState;

use crate::response::ApiResponse;
use crate::routes::common::error_response;

/// DELETE /api/attendance/{session_id}
///
/// Removes a session along with its OTPs and attendance records (cascade).
pub async fn remove(State(state): State<AppState>, Path(session_id): Path<i64>) -> Response {
    match Session::delete_by_id(state.db(), session_id).await {
        Ok(true) => {
            info!(session_id, "attendance session deleted");
            Json(ApiResponse::success((), "Session deleted successfully")).into_response()
        }
        Ok(false) => error_response(AttendanceError::SessionNotFound),
        Err(err) => error_response(err.into()),
    }
}
