//! Attendance session creation.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use db::attendance::AttendanceError;
use db::models::attendance_session::Model as Session;
use tracing::info;
use util::{config, state::AppState};

use crate::response::ApiResponse;
use crate::routes::attendance::common::{CreateSessionRequest, SessionResponse};
use crate::routes::common::error_response;

/// POST /api/attendance
///
/// Opens a new attendance session for a (teacher, class, subject) assignment
/// and returns the join code students will enter.
///
/// ### Request Body
/// ```json
/// {
///   "teacher_id": 1,
///   "class_id": 2,
///   "subject_id": 3,
///   "duration_minutes": 5
/// }
/// ```
///
/// `duration_minutes` is optional and falls back to the configured default.
///
/// ### Responses
/// - `201 Created` with the session payload including `session_code`
/// - `400 Bad Request` on missing fields or a non-positive duration
/// - `403 Forbidden` when the teacher does not hold the assignment
/// - `500 Internal Server Error` when no unique code could be generated
pub async fn create(
    State(state): State<AppState>,
    Json(req): Json<CreateSessionRequest>,
) -> Response {
    let (Some(teacher_id), Some(class_id), Some(subject_id)) =
        (req.teacher_id, req.class_id, req.subject_id)
    else {
        return error_response(AttendanceError::Validation(
            "teacher_id, class_id and subject_id are required".to_string(),
        ));
    };

    let duration = req
        .duration_minutes
        .unwrap_or_else(config::session_duration_minutes);
    if duration <= 0 {
        return error_response(AttendanceError::Validation(
            "duration_minutes must be a positive number".to_string(),
        ));
    }

    match Session::create(state.db(), teacher_id, class_id, subject_id, duration).await {
        Ok(session) => {
            info!(
                session_id = session.id,
                teacher_id,
                code = %session.session_code,
                "attendance session opened"
            );
            (
                StatusCode::CREATED,
                Json(ApiResponse::success(
                    SessionResponse::from_session(&session, Utc::now()),
                    "Attendance session created successfully",
                )),
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}
