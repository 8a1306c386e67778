//! Shared response plumbing for the attendance and check-in route groups.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use db::attendance::AttendanceError;
use serde::Serialize;
use tracing::error;

use crate::response::ApiResponse;

/// Payload attached to a class-mismatch rejection so the client can show the
/// student which class the session belongs to.
#[derive(Debug, Serialize, Default)]
pub struct ClassMismatchData {
    pub student_class: String,
    pub session_class: String,
}

/// Maps a domain error onto the wire: status code plus the standard envelope.
/// Every variant keeps its student-facing message; only the class mismatch
/// carries extra data.
pub fn error_response(err: AttendanceError) -> Response {
    let message = err.to_string();
    let status = match &err {
        AttendanceError::Validation(_)
        | AttendanceError::OtpNotFound
        | AttendanceError::OtpExpired
        | AttendanceError::OtpMismatch
        | AttendanceError::AlreadyMarked => StatusCode::BAD_REQUEST,
        AttendanceError::NotAuthorized(_) | AttendanceError::ClassMismatch { .. } => {
            StatusCode::FORBIDDEN
        }
        AttendanceError::SessionNotFound | AttendanceError::StudentNotFound => {
            StatusCode::NOT_FOUND
        }
        AttendanceError::SessionExpired => StatusCode::GONE,
        AttendanceError::CodeGenerationExhausted | AttendanceError::Db(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };

    if let AttendanceError::Db(db_err) = &err {
        error!(error = %db_err, "database error while handling request");
    }

    match err {
        AttendanceError::ClassMismatch {
            student_class,
            session_class,
        } => (
            status,
            Json(ApiResponse::error_with_data(
                ClassMismatchData {
                    student_class,
                    session_class,
                },
                message,
            )),
        )
            .into_response(),
        _ => (
            status,
            Json(ApiResponse::<()>::error(message)),
        )
            .into_response(),
    }
}
