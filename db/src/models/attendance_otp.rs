use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sea_orm::ActiveValue::Set;
use sea_orm::entity::prelude::*;
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "attendance_otps")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub email: String,
    pub session_id: i64,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
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
}

impl Related<super::attendance_session::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Session.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Six decimal digits, never with a leading zero dropped.
    pub fn generate_code() -> String {
        rand::thread_rng().gen_range(100_000..1_000_000).to_string()
    }

    /// Issues a fresh challenge for (email, session), superseding any earlier
    /// one for the same pair: old rows are deleted, so only the newest code
    /// can ever verify.
    pub async fn issue(
        db: &DatabaseConnection,
        email: &str,
        session_id: i64,
        expiry_minutes: i64,
    ) -> Result<Self, DbErr> {
        Entity::delete_many()
            .filter(Column::Email.eq(email))
            .filter(Column::SessionId.eq(session_id))
            .exec(db)
            .await?;

        ActiveModel {
            email: Set(email.to_string()),
            session_id: Set(session_id),
            code: Set(Self::generate_code()),
            expires_at: Set(Utc::now() + Duration::minutes(expiry_minutes)),
            verified: Set(false),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
    }

    /// The one challenge still open for this (email, session) pair, if any.
    /// Verified rows are spent and never come back.
    pub async fn find_live(
        db: &DatabaseConnection,
        email: &str,
        session_id: i64,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find()
            .filter(Column::Email.eq(email))
            .filter(Column::SessionId.eq(session_id))
            .filter(Column::Verified.eq(false))
            .one(db)
            .await
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    pub async fn mark_verified(&self, db: &DatabaseConnection) -> Result<(), DbErr> {
        let mut active: ActiveModel = self.clone().into();
        active.verified = Set(true);
        active.update(db).await?;
        Ok(())
    }
}
