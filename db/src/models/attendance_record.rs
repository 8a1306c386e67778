use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use sea_orm::PaginatorTrait;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// One row per (session, student). The composite primary key is the
/// at-most-once guarantee; there is no surrogate id to race on.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub student_id: i64,

    pub status: RecordStatus,
    pub otp_verified: bool,
    pub marked_at: DateTime<Utc>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Display, EnumString, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum RecordStatus {
    #[sea_orm(string_value = "present")]
    Present,
    #[sea_orm(string_value = "absent")]
    Absent,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::attendance_session::Entity",
        from = "Column::SessionId",
        to = "super::attendance_session::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Session,
    #[sea_orm(
        belongs_to = "super::student::Entity",
        from = "Column::StudentId",
        to = "super::student::Column::Id",
        on_update = "Cascade",
        on_delete = "Cascade"
    )]
    Student,
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl Related<super::student::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Student.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn exists(
        db: &DatabaseConnection,
        session_id: i64,
        student_id: i64,
    ) -> Result<bool, DbErr> {
        let found = Entity::find_by_id((session_id, student_id)).one(db).await?;
        Ok(found.is_some())
    }

    /// Inserts the present record. A primary-key violation here means another
    /// request won; callers translate it to an already-marked answer.
    pub async fn mark(
        db: &DatabaseConnection,
        session_id: i64,
        student_id: i64,
    ) -> Result<Self, DbErr> {
        ActiveModel {
            session_id: Set(session_id),
            student_id: Set(student_id),
            status: Set(RecordStatus::Present),
            otp_verified: Set(true),
            marked_at: Set(Utc::now()),
        }
        .insert(db)
        .await
    }

    pub async fn list_for_session(
        db: &DatabaseConnection,
        session_id: i64,
    ) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .all(db)
            .await
    }

    pub async fn count_for_session(db: &DatabaseConnection, session_id: i64) -> Result<u64, DbErr> {
        Entity::find()
            .filter(Column::SessionId.eq(session_id))
            .count(db)
            .await
    }
}
