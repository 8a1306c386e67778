use chrono::{DateTime, Utc};
use sea_orm::ActiveValue::{NotSet, Set};
use sea_orm::entity::prelude::*;
use sea_orm::{IntoActiveModel, QueryOrder};
use serde::Serialize;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize)]
#[sea_orm(table_name = "students")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    #[sea_orm(unique)]
    pub student_id: String,
    pub name: String,
    #[sea_orm(unique)]
    pub email: String,
    /// Null until the student is enrolled in a class.
    pub class_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::class::Entity",
        from = "Column::ClassId",
        to = "super::class::Column::Id",
        on_update = "Cascade",
        on_delete = "SetNull"
    )]
    Class,
    #[sea_orm(has_many = "super::attendance_record::Entity")]
    Records,
}

impl Related<super::class::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Class.def()
    }
}

impl Related<super::attendance_record::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Records.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub async fn find_by_email(
        db: &DatabaseConnection,
        email: &str,
    ) -> Result<Option<Self>, DbErr> {
        Entity::find().filter(Column::Email.eq(email)).one(db).await
    }

    /// Class roster ordered by roll number.
    pub async fn list_for_class(db: &DatabaseConnection, class_id: i64) -> Result<Vec<Self>, DbErr> {
        Entity::find()
            .filter(Column::ClassId.eq(class_id))
            .order_by_asc(Column::StudentId)
            .all(db)
            .await
    }

    /// Registers a student from nothing but an email address. The local part
    /// doubles as the roll number and display name until an administrator
    /// fills in real details.
    pub async fn create_from_email(db: &DatabaseConnection, email: &str) -> Result<Self, DbErr> {
        let local = email.split('@').next().unwrap_or(email);
        let model = Self {
            id: 0,
            student_id: local.to_uppercase(),
            name: local.to_string(),
            email: email.to_string(),
            class_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let mut active = model.into_active_model();
        active.id = NotSet;
        active.insert(db).await
    }

    /// Compare-and-set enrollment: assigns `class_id` only if the student has
    /// no class yet. Returns true when this call performed the assignment.
    pub async fn enroll_if_unassigned(
        &self,
        db: &DatabaseConnection,
        class_id: i64,
    ) -> Result<bool, DbErr> {
        let res = Entity::update_many()
            .col_expr(Column::ClassId, Expr::value(class_id))
            .col_expr(Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(Column::Id.eq(self.id))
            .filter(Column::ClassId.is_null())
            .exec(db)
            .await?;
        Ok(res.rows_affected == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::class;
    use crate::test_utils::setup_test_db;

    async fn seed_class(db: &DatabaseConnection) -> class::Model {
        class::ActiveModel {
            class_name: Set("BSC CS".to_string()),
            section: Set("A".to_string()),
            year: Set(2026),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn create_from_email_uses_local_part() {
        let db = setup_test_db().await;
        let s = Model::create_from_email(&db, "21bcs042@kprcas.ac.in")
            .await
            .unwrap();
        assert_eq!(s.student_id, "21BCS042");
        assert_eq!(s.name, "21bcs042");
        assert!(s.class_id.is_none());
    }

    #[tokio::test]
    async fn enroll_if_unassigned_only_fires_once() {
        let db = setup_test_db().await;
        let class_a = seed_class(&db).await;
        let class_b = class::ActiveModel {
            class_name: Set("BSC CS".to_string()),
            section: Set("B".to_string()),
            year: Set(2026),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&db)
        .await
        .unwrap();

        let s = Model::create_from_email(&db, "jo@gmail.com").await.unwrap();
        assert!(s.enroll_if_unassigned(&db, class_a.id).await.unwrap());
        // Second attempt loses the race: class_id is no longer null.
        assert!(!s.enroll_if_unassigned(&db, class_b.id).await.unwrap());

        let fresh = Entity::find_by_id(s.id).one(&db).await.unwrap().unwrap();
        assert_eq!(fresh.class_id, Some(class_a.id));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let db = setup_test_db().await;
        Model::create_from_email(&db, "dup@gmail.com").await.unwrap();
        let err = Model::create_from_email(&db, "dup@gmail.com").await;
        assert!(err.is_err());
    }
}
