//! Student check-in flow: resolve a session code, issue an email OTP, then
//! verify the OTP and write the attendance record exactly once.

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, EntityTrait};
use serde::Serialize;
use tracing::info;
use util::config;

use crate::attendance::{AttendanceError, is_unique_violation};
use crate::models::{attendance_otp, attendance_record, attendance_session, class, student};

/// Knobs the coordinator reads once per request rather than reaching into the
/// global config mid-flow.
#[derive(Debug, Clone)]
pub struct CheckinPolicy {
    pub otp_expiry_minutes: i64,
    pub allowed_email_domains: Vec<String>,
    pub allow_implicit_student_registration: bool,
}

impl CheckinPolicy {
    pub fn from_config() -> Self {
        Self {
            otp_expiry_minutes: config::otp_expiry_minutes(),
            allowed_email_domains: config::allowed_email_domains(),
            allow_implicit_student_registration: config::allow_implicit_student_registration(),
        }
    }

    fn domain_allowed(&self, email: &str) -> bool {
        match email.rsplit_once('@') {
            Some((local, domain)) if !local.is_empty() => self
                .allowed_email_domains
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(domain)),
            _ => false,
        }
    }

    fn domain_error(&self) -> AttendanceError {
        let listed = self
            .allowed_email_domains
            .iter()
            .map(|d| format!("@{d}"))
            .collect::<Vec<_>>()
            .join(" and ");
        AttendanceError::Validation(format!("Only {listed} emails are allowed"))
    }
}

/// Outcome of a successful OTP request. The code is returned to the caller so
/// the delivery channel stays out of this crate.
#[derive(Debug, Clone, Serialize)]
pub struct OtpIssued {
    pub session_id: i64,
    #[serde(skip_serializing)]
    pub code: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CheckinConfirmation {
    pub session_id: i64,
    pub student_id: i64,
    pub student_name: String,
    pub marked_at: DateTime<Utc>,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Class-membership guard shared by both phases. A student with no class yet
/// passes; enrollment happens later, at mark time.
async fn check_class_membership(
    db: &DatabaseConnection,
    student: &student::Model,
    session: &attendance_session::Model,
) -> Result<(), AttendanceError> {
    let Some(student_class_id) = student.class_id else {
        return Ok(());
    };
    if student_class_id == session.class_id {
        return Ok(());
    }

    let student_class = class::Entity::find_by_id(student_class_id).one(db).await?;
    let session_class = class::Entity::find_by_id(session.class_id).one(db).await?;
    Err(AttendanceError::ClassMismatch {
        student_class: class::Model::label_or_unknown(student_class.as_ref()),
        session_class: class::Model::label_or_unknown(session_class.as_ref()),
    })
}

/// Resolves a session code for the student check-in page. Distinguishes a
/// code that never existed from one whose session is no longer usable.
pub async fn resolve_session(
    db: &DatabaseConnection,
    session_code: &str,
) -> Result<attendance_session::Model, AttendanceError> {
    let session = attendance_session::Model::find_by_code(db, session_code)
        .await?
        .ok_or(AttendanceError::SessionNotFound)?;
    session.ensure_usable(db, Utc::now()).await
}

/// Issues (or reissues) the OTP challenge for `email` against the session
/// behind `session_code`. Failing fast here keeps students from burning an
/// OTP on a check-in that can never succeed.
pub async fn request_otp(
    db: &DatabaseConnection,
    policy: &CheckinPolicy,
    email: &str,
    session_code: &str,
) -> Result<OtpIssued, AttendanceError> {
    let email = normalize_email(email);
    if !policy.domain_allowed(&email) {
        return Err(policy.domain_error());
    }

    let session = resolve_session(db, session_code).await?;

    if let Some(existing) = student::Model::find_by_email(db, &email).await? {
        check_class_membership(db, &existing, &session).await?;
        if attendance_record::Model::exists(db, session.id, existing.id).await? {
            return Err(AttendanceError::AlreadyMarked);
        }
    }

    let otp = attendance_otp::Model::issue(db, &email, session.id, policy.otp_expiry_minutes).await?;
    info!(session_id = session.id, email = %email, "issued check-in OTP");

    Ok(OtpIssued {
        session_id: session.id,
        code: otp.code,
        expires_at: otp.expires_at,
    })
}

/// Verifies the OTP and writes the attendance record. Order matters: the
/// challenge is checked before any student row is created, the class CAS
/// runs before the record insert, and the insert's primary key is the final
/// arbiter of at-most-once.
pub async fn verify_and_mark(
    db: &DatabaseConnection,
    policy: &CheckinPolicy,
    email: &str,
    session_id: i64,
    otp_code: &str,
) -> Result<CheckinConfirmation, AttendanceError> {
    let email = normalize_email(email);

    let otp = attendance_otp::Model::find_live(db, &email, session_id)
        .await?
        .ok_or(AttendanceError::OtpNotFound)?;
    if otp.is_expired(Utc::now()) {
        return Err(AttendanceError::OtpExpired);
    }
    if otp.code != otp_code.trim() {
        // Wrong guess does not consume the challenge.
        return Err(AttendanceError::OtpMismatch);
    }
    otp.mark_verified(db).await?;

    let student = match student::Model::find_by_email(db, &email).await? {
        Some(existing) => existing,
        None if policy.allow_implicit_student_registration => {
            match student::Model::create_from_email(db, &email).await {
                Ok(created) => created,
                // Lost a concurrent registration race; the winner's row works.
                Err(e) if is_unique_violation(&e) => student::Model::find_by_email(db, &email)
                    .await?
                    .ok_or(AttendanceError::StudentNotFound)?,
                Err(e) => return Err(e.into()),
            }
        }
        None => return Err(AttendanceError::StudentNotFound),
    };

    let session = attendance_session::Entity::find_by_id(session_id)
        .one(db)
        .await?
        .ok_or(AttendanceError::SessionNotFound)?;

    let student = if student.class_id.is_none() {
        if student.enroll_if_unassigned(db, session.class_id).await? {
            info!(
                student_id = student.id,
                class_id = session.class_id,
                "auto-enrolled student on first check-in"
            );
        }
        // Reload either way; a concurrent enrollment may have set a class.
        student::Model::find_by_email(db, &email)
            .await?
            .ok_or(AttendanceError::StudentNotFound)?
    } else {
        student
    };
    check_class_membership(db, &student, &session).await?;

    if attendance_record::Model::exists(db, session.id, student.id).await? {
        return Err(AttendanceError::AlreadyMarked);
    }

    // Deadline may have passed while the student typed the OTP.
    let session = session.ensure_usable(db, Utc::now()).await?;

    let record = match attendance_record::Model::mark(db, session.id, student.id).await {
        Ok(record) => record,
        Err(e) if is_unique_violation(&e) => return Err(AttendanceError::AlreadyMarked),
        Err(e) => return Err(e.into()),
    };

    info!(
        session_id = session.id,
        student_id = student.id,
        "attendance marked"
    );

    Ok(CheckinConfirmation {
        session_id: session.id,
        student_id: student.id,
        student_name: student.name,
        marked_at: record.marked_at,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::attendance_session::SessionStatus;
    use crate::test_utils::{seed_assignment, setup_test_db};
    use chrono::Duration;
    use sea_orm::ActiveValue::Set;
    use sea_orm::{ActiveModelTrait, IntoActiveModel};

    fn test_policy() -> CheckinPolicy {
        CheckinPolicy {
            otp_expiry_minutes: 10,
            allowed_email_domains: vec!["kprcas.ac.in".to_string(), "gmail.com".to_string()],
            allow_implicit_student_registration: true,
        }
    }

    async fn active_session(db: &DatabaseConnection) -> attendance_session::Model {
        let (teacher, class, subject) = seed_assignment(db).await;
        attendance_session::Model::create(db, teacher.id, class.id, subject.id, 5)
            .await
            .unwrap()
    }

    async fn backdate_otp(db: &DatabaseConnection, email: &str, session_id: i64) {
        let otp = attendance_otp::Model::find_live(db, email, session_id)
            .await
            .unwrap()
            .unwrap();
        let mut active = otp.into_active_model();
        active.expires_at = Set(Utc::now() - Duration::minutes(1));
        active.update(db).await.unwrap();
    }

    #[tokio::test]
    async fn rejects_unlisted_email_domain() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;

        let err = request_otp(&db, &test_policy(), "eve@evil.example", &session.session_code).await;
        assert!(matches!(err, Err(AttendanceError::Validation(_))));
    }

    #[tokio::test]
    async fn unknown_code_vs_expired_session() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;

        let err = request_otp(&db, &test_policy(), "a@gmail.com", "ZZZZ9999").await;
        assert!(matches!(err, Err(AttendanceError::SessionNotFound)));

        session
            .set_status(&db, SessionStatus::Expired)
            .await
            .unwrap();
        let err = request_otp(&db, &test_policy(), "a@gmail.com", &session.session_code).await;
        assert!(matches!(err, Err(AttendanceError::SessionExpired)));
    }

    #[tokio::test]
    async fn full_checkin_happy_path_auto_registers_and_enrolls() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;
        let policy = test_policy();

        let issued = request_otp(&db, &policy, "21bcs042@kprcas.ac.in", &session.session_code)
            .await
            .unwrap();
        let confirmation = verify_and_mark(
            &db,
            &policy,
            "21bcs042@kprcas.ac.in",
            issued.session_id,
            &issued.code,
        )
        .await
        .unwrap();

        assert_eq!(confirmation.session_id, session.id);
        assert_eq!(confirmation.student_name, "21bcs042");

        let s = student::Model::find_by_email(&db, "21bcs042@kprcas.ac.in")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(s.class_id, Some(session.class_id));
        assert!(
            attendance_record::Model::exists(&db, session.id, s.id)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn email_is_normalized_before_matching() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;
        let policy = test_policy();

        let issued = request_otp(&db, &policy, "  Mixed.Case@GMAIL.com ", &session.session_code)
            .await
            .unwrap();
        verify_and_mark(
            &db,
            &policy,
            "mixed.case@gmail.com",
            issued.session_id,
            &issued.code,
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn second_mark_is_rejected_at_both_phases() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;
        let policy = test_policy();

        let issued = request_otp(&db, &policy, "a@gmail.com", &session.session_code)
            .await
            .unwrap();
        verify_and_mark(&db, &policy, "a@gmail.com", issued.session_id, &issued.code)
            .await
            .unwrap();

        // Requesting a new OTP after marking is refused outright.
        let err = request_otp(&db, &policy, "a@gmail.com", &session.session_code).await;
        assert!(matches!(err, Err(AttendanceError::AlreadyMarked)));
    }

    #[tokio::test]
    async fn wrong_otp_does_not_consume_the_challenge() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;
        let policy = test_policy();

        let issued = request_otp(&db, &policy, "a@gmail.com", &session.session_code)
            .await
            .unwrap();

        let err = verify_and_mark(&db, &policy, "a@gmail.com", issued.session_id, "000000").await;
        assert!(matches!(err, Err(AttendanceError::OtpMismatch)));

        // Correct code still works afterwards.
        verify_and_mark(&db, &policy, "a@gmail.com", issued.session_id, &issued.code)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_otp_is_terminal() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;
        let policy = test_policy();

        let issued = request_otp(&db, &policy, "a@gmail.com", &session.session_code)
            .await
            .unwrap();
        backdate_otp(&db, "a@gmail.com", session.id).await;

        let err = verify_and_mark(&db, &policy, "a@gmail.com", issued.session_id, &issued.code).await;
        assert!(matches!(err, Err(AttendanceError::OtpExpired)));
    }

    #[tokio::test]
    async fn verified_otp_cannot_be_replayed() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;
        let policy = test_policy();

        let issued = request_otp(&db, &policy, "a@gmail.com", &session.session_code)
            .await
            .unwrap();
        verify_and_mark(&db, &policy, "a@gmail.com", issued.session_id, &issued.code)
            .await
            .unwrap();

        let err = verify_and_mark(&db, &policy, "a@gmail.com", issued.session_id, &issued.code).await;
        assert!(matches!(err, Err(AttendanceError::OtpNotFound)));
    }

    #[tokio::test]
    async fn new_request_supersedes_old_code() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;
        let policy = test_policy();

        let first = request_otp(&db, &policy, "a@gmail.com", &session.session_code)
            .await
            .unwrap();
        let second = request_otp(&db, &policy, "a@gmail.com", &session.session_code)
            .await
            .unwrap();

        if first.code != second.code {
            let err =
                verify_and_mark(&db, &policy, "a@gmail.com", session.id, &first.code).await;
            assert!(matches!(err, Err(AttendanceError::OtpMismatch)));
        }
        verify_and_mark(&db, &policy, "a@gmail.com", session.id, &second.code)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn class_mismatch_carries_both_labels() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;
        let policy = test_policy();

        let other_class = class::ActiveModel {
            class_name: Set("BSC CS".to_string()),
            section: Set("B".to_string()),
            year: Set(2026),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();
        let s = student::Model::create_from_email(&db, "b@gmail.com").await.unwrap();
        assert!(s.enroll_if_unassigned(&db, other_class.id).await.unwrap());

        let err = request_otp(&db, &policy, "b@gmail.com", &session.session_code).await;
        match err {
            Err(AttendanceError::ClassMismatch {
                student_class,
                session_class,
            }) => {
                assert_eq!(student_class, "BSC CS B");
                assert_eq!(session_class, "BSC CS A");
            }
            other => panic!("expected class mismatch, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn implicit_registration_can_be_disabled() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;
        let policy = CheckinPolicy {
            allow_implicit_student_registration: false,
            ..test_policy()
        };

        let issued = request_otp(&db, &policy, "ghost@gmail.com", &session.session_code)
            .await
            .unwrap();
        let err =
            verify_and_mark(&db, &policy, "ghost@gmail.com", issued.session_id, &issued.code).await;
        assert!(matches!(err, Err(AttendanceError::StudentNotFound)));
    }

    #[tokio::test]
    async fn mark_rechecks_session_deadline() {
        let db = setup_test_db().await;
        let session = active_session(&db).await;
        let policy = test_policy();

        let issued = request_otp(&db, &policy, "a@gmail.com", &session.session_code)
            .await
            .unwrap();

        // Session deadline passes while the OTP is still valid.
        let mut active = session.clone().into_active_model();
        active.expires_at = Set(Utc::now() - Duration::seconds(1));
        active.update(&db).await.unwrap();

        let err = verify_and_mark(&db, &policy, "a@gmail.com", issued.session_id, &issued.code).await;
        assert!(matches!(err, Err(AttendanceError::SessionExpired)));
    }
}
