use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Debug, Deserialize)]
pub struct VerifySessionRequest {
    pub session_code: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct RequestOtpRequest {
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: Option<String>,
    pub session_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MarkRequest {
    pub email: Option<String>,
    pub session_id: Option<i64>,
    pub otp: Option<String>,
}

/// Body returned by `request-otp`. Outside production the code itself is
/// echoed so the flow can be exercised without a mail account.
#[derive(Debug, Serialize)]
pub struct OtpResponse {
    pub session_id: i64,
    pub expires_at: DateTime<Utc>,
    pub email_sent: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MarkResponse {
    pub session_id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub marked_at: DateTime<Utc>,
}
