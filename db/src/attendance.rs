use sea_orm::DbErr;
use thiserror::Error;

/// Failures surfaced by the attendance session lifecycle and the check-in
/// flow. Message text is shown to students as-is, so it stays friendly.
#[derive(Debug, Error)]
pub enum AttendanceError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotAuthorized(String),

    #[error("Invalid or inactive session code. Please check with your teacher.")]
    SessionNotFound,

    #[error("This session has expired. Please ask your teacher to start a new session.")]
    SessionExpired,

    #[error("Unable to generate a unique session code. Please try again.")]
    CodeGenerationExhausted,

    #[error("Student not found")]
    StudentNotFound,

    #[error("No OTP found. Please request a new one.")]
    OtpNotFound,

    #[error("OTP has expired. Please request a new one.")]
    OtpExpired,

    #[error("Invalid OTP. Please check and try again.")]
    OtpMismatch,

    #[error("Attendance already marked for this session")]
    AlreadyMarked,

    #[error(
        "You cannot mark attendance for this session. This session is for {session_class}, but you belong to {student_class}."
    )]
    ClassMismatch {
        student_class: String,
        session_class: String,
    },

    #[error("Database error: {0}")]
    Db(#[from] DbErr),
}

/// Matches the SQLite and Postgres phrasings of a unique-constraint failure.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    let msg = err.to_string();
    msg.contains("UNIQUE constraint failed") || msg.contains("duplicate key value")
}
