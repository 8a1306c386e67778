use chrono::Utc;
use migration::Migrator;
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use crate::models::{class, subject, teacher_subject, user};

pub async fn setup_test_db() -> DatabaseConnection {
    let db = Database::connect("sqlite::memory:")
        .await
        .expect("Failed to connect to in-memory db");

    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");

    db
}

/// Seeds a teacher with a (class, subject) assignment, the minimum fixture
/// needed to open an attendance session.
pub async fn seed_assignment(
    db: &DatabaseConnection,
) -> (user::Model, class::Model, subject::Model) {
    let teacher = user::ActiveModel {
        name: Set("Asha".to_string()),
        email: Set("asha@kprcas.ac.in".to_string()),
        role: Set(user::Role::Teacher),
        created_at: Set(Utc::now()),
        updated_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed teacher");

    let class = class::ActiveModel {
        class_name: Set("BSC CS".to_string()),
        section: Set("A".to_string()),
        year: Set(2026),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed class");

    let subject = subject::ActiveModel {
        subject_name: Set("Operating Systems".to_string()),
        subject_code: Set("CS301".to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed subject");

    teacher_subject::ActiveModel {
        teacher_id: Set(teacher.id),
        class_id: Set(class.id),
        subject_id: Set(subject.id),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("Failed to seed teaching assignment");

    (teacher, class, subject)
}
