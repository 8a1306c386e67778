use chrono::{DateTime, Utc};
use rand::Rng;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::QueryOrder;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use tracing::warn;

use crate::attendance::{AttendanceError, is_unique_violation};
use crate::models::{class, subject, teacher_subject, user};

const CODE_LEN: usize = 8;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_GEN_ATTEMPTS: usize = 10;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_sessions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub teacher_id: i64,
    pub class_id: i64,
    pub subject_id: i64,
    #[sea_orm(unique)]
    pub session_code: String,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle of a session. `Expired` is reached lazily, whenever a read
/// notices the deadline has passed; `Completed` only by explicit teacher
/// action. Both are terminal.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum SessionStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "expired")]
    Expired,
    #[sea_orm(string_value = "completed")]
    Completed,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::TeacherId",
        to = "super::user::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Teacher,
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Class,
    #[sea_orm(
        belongs_to = "super::subject::Entity",
        from = "Column::SubjectId",
        to = "super::subject::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Subject,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
    #[sea_orm(has_many = "super::attendance_otp::Entity")]
    Otps,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Teacher.def()
    }
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::subject::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Subject.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// A session joined with the rows its foreign keys point at, for display.
#[derive(Debug, Clone, Serialize)]
pub struct SessionDetails {
    pub session: Model,
    pub class: Option<class::Model>,
    pub subject: Option<subject::Model>,
    pub teacher: Option<user::Model>,
}

impl Model {
    /// Random 8-character code over A-Z0-9. Uniqueness is enforced by the
    /// database; callers retry on collision.
    pub fn generate_code() -> String {
        let mut rng = rand::thread_rng();
        (0..CODE_LEN)
            .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
            .collect()
    }

    /// Opens a new session for a (teacher, class, subject) assignment the
    /// teacher actually holds. Retries code generation a bounded number of
    /// times, treating a unique violation on `session_code` as a collision.
    pub async fn create(
        db: &DatabaseConnection,
        teacher_id: i64,
        class_id: i64,
        subject_id: i64,
        duration_minutes: i64,
    ) -> Result<Self, AttendanceError> {
        let assigned = teacher_subject::Model::exists_for(db, teacher_id, class_id, subject_id).await?;
        if !assigned {
            return Err(AttendanceError::NotAuthorized(
                "You are not assigned to this class and subject".to_string(),
            ));
        }

        let now = Utc::now();
        let expires_at = now + chrono::Duration::minutes(duration_minutes);

        for _ in 0..CODE_GEN_ATTEMPTS {
            let code = Self::generate_code();
            let attempt = ActiveModel {
                teacher_id: Set(teacher_id),
                class_id: Set(class_id),
                subject_id: Set(subject_id),
                session_code: Set(code),
                status: Set(SessionStatus::Active),
                created_at: Set(now),
                expires_at: Set(expires_at),
                updated_at: Set(now),
                ..Default::default()
            }
            .insert(db)
            .await;

            match attempt {
                Ok(session) => return Ok(session),
                Err(e) if is_unique_violation(&e) => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Err(AttendanceError::CodeGenerationExhausted)
    }

    /// Case-insensitive lookup by session code.
    pub async fn find_by_code(
        db: &DatabaseConnection,
        code: &str,
    ) -> Result<Option<Self>, DbErr> {
        let normalized = code.trim().to_uppercase();
        Entity::find()
            .filter(Column::SessionCode.eq(normalized))
            .one(db)
            .await
    }

    /// Check-and-flip expiry guard shared by every read path, student and
    /// staff alike. An active session past its deadline comes back as
    /// expired; the flip failing to persist only logs, the returned status
    /// is expired either way.
    pub async fn healed(self, db: &DatabaseConnection, now: DateTime<Utc>) -> Self {
        if self.status != SessionStatus::Active || now < self.expires_at {
            return self;
        }
        match self.set_status(db, SessionStatus::Expired).await {
            Ok(updated) => updated,
            Err(e) => {
                warn!(session_id = self.id, error = %e, "failed to persist lazy expiry");
                Self {
                    status: SessionStatus::Expired,
                    ..self
                }
            }
        }
    }

    /// Gate every student-facing read through the status machine: heal the
    /// row, then accept only a still-active session.
    pub async fn ensure_usable(
        self,
        db: &DatabaseConnection,
        now: DateTime<Utc>,
    ) -> Result<Self, AttendanceError> {
        let session = self.healed(db, now).await;
        match session.status {
            SessionStatus::Active => Ok(session),
            SessionStatus::Expired | SessionStatus::Completed => {
                Err(AttendanceError::SessionExpired)
            }
        }
    }

    pub async fn set_status(
        &self,
        db: &DatabaseConnection,
        status: SessionStatus,
    ) -> Result<Self, DbErr> {
        let mut active: ActiveModel = self.clone().into();
        active.status = Set(status);
        active.updated_at = Set(Utc::now());
        active.update(db).await
    }

    pub async fn delete_by_id(db: &DatabaseConnection, id: i64) -> Result<bool, DbErr> {
        let res = Entity::delete_by_id(id).exec(db).await?;
        Ok(res.rows_affected > 0)
    }

    pub async fn list_for_teacher(
        db: &DatabaseConnection,
        teacher_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::TeacherId.eq(teacher_id))
            .order_by_desc(Column::CreatedAt)
            .all(db)
            .await
    }

    pub async fn present_count(&self, db: &DatabaseConnection) -> Result<u64, DbErr> {
        super::attendance_record::Model::count_for_session(db, self.id).await
    }

    /// Seconds until expiry, clamped at zero.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }

    pub async fn details(&self, db: &DatabaseConnection) -> Result<SessionDetails, DbErr> {
        let class = class::Entity::find_by_id(self.class_id).one(db).await?;
        let subject = subject::Entity::find_by_id(self.subject_id).one(db).await?;
        let teacher = user::Entity::find_by_id(self.teacher_id).one(db).await?;
        Ok(SessionDetails {
            session: self.clone(),
            class,
            subject,
            teacher,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{attendance_record, student};
    use crate::test_utils::{seed_assignment, setup_test_db};

    #[test]
    fn generated_codes_are_eight_upper_alnum() {
        for _ in 0..50 {
            let code = Model::generate_code();
            assert_eq!(code.len(), 8);
            assert!(
                code.chars()
                    .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
            );
        }
    }

    #[tokio::test]
    async fn create_requires_assignment() {
        let db = setup_test_db().await;
        let (teacher, class, subject) = seed_assignment(&db).await;

        let session = Model::create(&db, teacher.id, class.id, subject.id, 5)
            .await
            .unwrap();
        assert_eq!(session.status, SessionStatus::Active);
        assert_eq!(session.remaining_seconds(session.created_at), 5 * 60);

        let err = Model::create(&db, teacher.id, class.id, subject.id + 999, 5).await;
        assert!(matches!(err, Err(AttendanceError::NotAuthorized(_))));
    }

    #[tokio::test]
    async fn find_by_code_is_case_insensitive() {
        let db = setup_test_db().await;
        let (teacher, class, subject) = seed_assignment(&db).await;
        let session = Model::create(&db, teacher.id, class.id, subject.id, 5)
            .await
            .unwrap();

        let found = Model::find_by_code(&db, &session.session_code.to_lowercase())
            .await
            .unwrap();
        assert_eq!(found.map(|s| s.id), Some(session.id));

        assert!(Model::find_by_code(&db, "NOPE1234").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ensure_usable_flips_and_persists_expiry() {
        let db = setup_test_db().await;
        let (teacher, class, subject) = seed_assignment(&db).await;
        let session = Model::create(&db, teacher.id, class.id, subject.id, 5)
            .await
            .unwrap();

        let past_deadline = session.expires_at + chrono::Duration::seconds(1);
        let err = session.clone().ensure_usable(&db, past_deadline).await;
        assert!(matches!(err, Err(AttendanceError::SessionExpired)));

        // The flip is durable: a later in-window read still sees expired.
        let fresh = Entity::find_by_id(session.id).one(&db).await.unwrap().unwrap();
        assert_eq!(fresh.status, SessionStatus::Expired);
        let err = fresh.ensure_usable(&db, Utc::now()).await;
        assert!(matches!(err, Err(AttendanceError::SessionExpired)));
    }

    #[tokio::test]
    async fn healed_flips_stale_active_rows_and_leaves_live_ones() {
        let db = setup_test_db().await;
        let (teacher, class, subject) = seed_assignment(&db).await;
        let session = Model::create(&db, teacher.id, class.id, subject.id, 5)
            .await
            .unwrap();

        let within_window = session.clone().healed(&db, Utc::now()).await;
        assert_eq!(within_window.status, SessionStatus::Active);

        let past_deadline = session.expires_at + chrono::Duration::seconds(1);
        let healed = session.clone().healed(&db, past_deadline).await;
        assert_eq!(healed.status, SessionStatus::Expired);

        let fresh = Entity::find_by_id(session.id).one(&db).await.unwrap().unwrap();
        assert_eq!(fresh.status, SessionStatus::Expired);
    }

    #[tokio::test]
    async fn completed_sessions_are_not_usable() {
        let db = setup_test_db().await;
        let (teacher, class, subject) = seed_assignment(&db).await;
        let session = Model::create(&db, teacher.id, class.id, subject.id, 5)
            .await
            .unwrap();
        let session = session
            .set_status(&db, SessionStatus::Completed)
            .await
            .unwrap();

        let err = session.ensure_usable(&db, Utc::now()).await;
        assert!(matches!(err, Err(AttendanceError::SessionExpired)));
    }

    #[tokio::test]
    async fn present_count_tracks_records() {
        let db = setup_test_db().await;
        let (teacher, class, subject) = seed_assignment(&db).await;
        let session = Model::create(&db, teacher.id, class.id, subject.id, 5)
            .await
            .unwrap();
        assert_eq!(session.present_count(&db).await.unwrap(), 0);

        let s = student::Model::create_from_email(&db, "21bcs001@kprcas.ac.in")
            .await
            .unwrap();
        attendance_record::Model::mark(&db, session.id, s.id)
            .await
            .unwrap();
        assert_eq!(session.present_count(&db).await.unwrap(), 1);
    }
}
