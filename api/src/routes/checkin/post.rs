//! Check-in flow handlers.

use axum::Json;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use db::attendance::AttendanceError;
use db::checkin::{self, CheckinPolicy};
use tracing::warn;
use util::{config, state::AppState};
use validator::Validate;

use crate::response::ApiResponse;
use crate::routes::attendance::common::SessionDetailResponse;
use crate::routes::checkin::common::{
    MarkRequest, MarkResponse, OtpResponse, RequestOtpRequest, VerifySessionRequest,
};
use crate::routes::common::error_response;
use crate::services::email::EmailService;

/// POST /api/checkin/verify-session
///
/// Resolves a join code typed by a student. A code that never existed is a
/// `404`; a code whose session already ended is a `410`, so the client can
/// word the two failures differently.
///
/// ### Request Body
/// ```json
/// { "session_code": "A3F8K2Q9" }
/// ```
pub async fn verify_session(
    State(state): State<AppState>,
    Json(req): Json<VerifySessionRequest>,
) -> Response {
    let Some(session_code) = req.session_code.filter(|c| !c.trim().is_empty()) else {
        return error_response(AttendanceError::Validation(
            "session_code is required".to_string(),
        ));
    };

    let session = match checkin::resolve_session(state.db(), &session_code).await {
        Ok(session) => session,
        Err(err) => return error_response(err),
    };

    let details = match session.details(state.db()).await {
        Ok(details) => details,
        Err(err) => return error_response(err.into()),
    };
    let present_count = match session.present_count(state.db()).await {
        Ok(count) => count,
        Err(err) => return error_response(err.into()),
    };

    Json(ApiResponse::success(
        SessionDetailResponse::from_details(&details, present_count, Utc::now()),
        "Session verified successfully",
    ))
    .into_response()
}

/// POST /api/checkin/request-otp
///
/// Issues a one-time code for (email, session) and emails it to the student.
/// A repeat request replaces the previous code. The session and the
/// student's class membership are checked up front so a doomed check-in
/// never consumes an email.
///
/// ### Request Body
/// ```json
/// { "email": "21bcs042@kprcas.ac.in", "session_code": "A3F8K2Q9" }
/// ```
///
/// Outside production the response echoes the code in `data.otp`.
pub async fn request_otp(
    State(state): State<AppState>,
    Json(req): Json<RequestOtpRequest>,
) -> Response {
    if let Err(errors) = req.validate() {
        let message = errors
            .field_errors()
            .values()
            .flat_map(|errs| errs.iter())
            .filter_map(|e| e.message.as_ref().map(|m| m.to_string()))
            .collect::<Vec<_>>()
            .join("; ");
        return error_response(AttendanceError::Validation(message));
    }

    let Some(email) = req.email.filter(|e| !e.trim().is_empty()) else {
        return error_response(AttendanceError::Validation("Email is required".to_string()));
    };
    let Some(session_code) = req.session_code.filter(|c| !c.trim().is_empty()) else {
        return error_response(AttendanceError::Validation(
            "Session information is required".to_string(),
        ));
    };

    let policy = CheckinPolicy::from_config();
    let issued = match checkin::request_otp(state.db(), &policy, &email, &session_code).await {
        Ok(issued) => issued,
        Err(err) => return error_response(err),
    };

    let email_sent = match EmailService::send_otp_email(
        &email,
        &issued.code,
        policy.otp_expiry_minutes,
    )
    .await
    {
        Ok(()) => true,
        Err(err) => {
            // The code is already stored; the student can still check in if
            // it reaches them another way.
            warn!(error = %err, "failed to send OTP email");
            false
        }
    };

    let dev_echo = (config::env().to_lowercase() != "production").then_some(issued.code);

    Json(ApiResponse::success(
        OtpResponse {
            session_id: issued.session_id,
            expires_at: issued.expires_at,
            email_sent,
            otp: dev_echo,
        },
        "OTP sent successfully",
    ))
    .into_response()
}

/// POST /api/checkin/mark
///
/// Verifies the one-time code and writes the attendance record. The record
/// insert is keyed on (session, student), so a double submit can only ever
/// produce one row.
///
/// ### Request Body
/// ```json
/// { "email": "21bcs042@kprcas.ac.in", "session_id": 7, "otp": "482913" }
/// ```
pub async fn mark(State(state): State<AppState>, Json(req): Json<MarkRequest>) -> Response {
    let (Some(email), Some(session_id), Some(otp)) = (
        req.email.filter(|e| !e.trim().is_empty()),
        req.session_id,
        req.otp.filter(|o| !o.trim().is_empty()),
    ) else {
        return error_response(AttendanceError::Validation(
            "Email, session ID, and OTP are required".to_string(),
        ));
    };

    let policy = CheckinPolicy::from_config();
    match checkin::verify_and_mark(state.db(), &policy, &email, session_id, &otp).await {
        Ok(confirmation) => Json(ApiResponse::success(
            MarkResponse {
                session_id: confirmation.session_id,
                student_id: confirmation.student_id,
                student_name: confirmation.student_name,
                marked_at: confirmation.marked_at,
            },
            "Attendance marked successfully",
        ))
        .into_response(),
        Err(err) => error_response(err),
    }
}
