mod helpers;

use axum::http::StatusCode;
use chrono::{Duration, Utc};
use db::models::{attendance_otp, attendance_record, attendance_session, student};
use helpers::{get_json, make_test_app, post_json, seed_assignment, send_json};
use sea_orm::ActiveValue::Set;
use sea_orm::{ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, QueryFilter};
use serde_json::json;
use serial_test::serial;

#[tokio::test]
#[serial]
async fn create_session_returns_join_code() {
    let (app, state) = make_test_app().await;
    let (teacher, class, subject) = seed_assignment(state.db()).await;

    let (status, body) = post_json(
        &app,
        "/api/attendance",
        json!({
            "teacher_id": teacher.id,
            "class_id": class.id,
            "subject_id": subject.id,
            "duration_minutes": 5
        }),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    let code = body["data"]["session_code"].as_str().unwrap();
    assert_eq!(code.len(), 8);
    assert!(
        code.chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    );
    assert_eq!(body["data"]["status"], "active");
    let remaining = body["data"]["remaining_seconds"].as_i64().unwrap();
    assert!(remaining > 0 && remaining <= 5 * 60);
}

#[tokio::test]
#[serial]
async fn create_session_requires_all_ids() {
    let (app, _state) = make_test_app().await;

    let (status, body) = post_json(&app, "/api/attendance", json!({ "teacher_id": 1 })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[serial]
async fn create_session_rejects_unassigned_teacher() {
    let (app, state) = make_test_app().await;
    let (teacher, class, subject) = seed_assignment(state.db()).await;

    let (status, body) = post_json(
        &app,
        "/api/attendance",
        json!({
            "teacher_id": teacher.id,
            "class_id": class.id,
            "subject_id": subject.id + 999
        }),
    )
    .await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[serial]
async fn create_session_rejects_non_positive_duration() {
    let (app, state) = make_test_app().await;
    let (teacher, class, subject) = seed_assignment(state.db()).await;

    let (status, _body) = post_json(
        &app,
        "/api/attendance",
        json!({
            "teacher_id": teacher.id,
            "class_id": class.id,
            "subject_id": subject.id,
            "duration_minutes": 0
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn list_sessions_returns_teachers_sessions_with_counts() {
    let (app, state) = make_test_app().await;
    let (teacher, class, subject) = seed_assignment(state.db()).await;

    for _ in 0..2 {
        let (status, _) = post_json(
            &app,
            "/api/attendance",
            json!({
                "teacher_id": teacher.id,
                "class_id": class.id,
                "subject_id": subject.id
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = get_json(
        &app,
        &format!("/api/attendance?teacher_id={}", teacher.id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let items = body["data"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["present_count"], 0);

    let (status, body) = get_json(&app, "/api/attendance?teacher_id=9999").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
#[serial]
async fn list_sessions_supports_status_filter() {
    let (app, state) = make_test_app().await;
    let (teacher, class, subject) = seed_assignment(state.db()).await;

    let mut first_id = 0;
    for _ in 0..2 {
        let (_, body) = post_json(
            &app,
            "/api/attendance",
            json!({
                "teacher_id": teacher.id,
                "class_id": class.id,
                "subject_id": subject.id
            }),
        )
        .await;
        first_id = body["data"]["id"].as_i64().unwrap();
    }
    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/attendance/{first_id}/status"),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = get_json(
        &app,
        &format!("/api/attendance?teacher_id={}&status=completed", teacher.id),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let (status, _) = get_json(
        &app,
        &format!("/api/attendance?teacher_id={}&status=paused", teacher.id),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn session_details_include_joined_names() {
    let (app, state) = make_test_app().await;
    let (teacher, class, subject) = seed_assignment(state.db()).await;

    let (_, created) = post_json(
        &app,
        "/api/attendance",
        json!({
            "teacher_id": teacher.id,
            "class_id": class.id,
            "subject_id": subject.id
        }),
    )
    .await;
    let session_id = created["data"]["id"].as_i64().unwrap();

    let (status, body) = get_json(&app, &format!("/api/attendance/{session_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["class_name"], "BSC CS");
    assert_eq!(body["data"]["section"], "A");
    assert_eq!(body["data"]["subject_code"], "CS301");
    assert_eq!(body["data"]["teacher_name"], "Asha");
    assert_eq!(body["data"]["present_count"], 0);
}

#[tokio::test]
#[serial]
async fn session_details_report_stale_sessions_as_expired() {
    let (app, state) = make_test_app().await;
    let (teacher, class, subject) = seed_assignment(state.db()).await;

    let (_, created) = post_json(
        &app,
        "/api/attendance",
        json!({
            "teacher_id": teacher.id,
            "class_id": class.id,
            "subject_id": subject.id
        }),
    )
    .await;
    let session_id = created["data"]["id"].as_i64().unwrap();

    let row = attendance_session::Entity::find_by_id(session_id)
        .one(state.db())
        .await
        .unwrap()
        .unwrap();
    let mut active = row.into_active_model();
    active.expires_at = Set(Utc::now() - Duration::seconds(1));
    active.update(state.db()).await.unwrap();

    let (status, body) = get_json(&app, &format!("/api/attendance/{session_id}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "expired");

    // The staff read persisted the flip.
    let fresh = attendance_session::Entity::find_by_id(session_id)
        .one(state.db())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(fresh.status, attendance_session::SessionStatus::Expired);
}

#[tokio::test]
#[serial]
async fn session_records_list_the_class_roster() {
    let (app, state) = make_test_app().await;
    let (teacher, class, subject) = seed_assignment(state.db()).await;

    let (_, created) = post_json(
        &app,
        "/api/attendance",
        json!({
            "teacher_id": teacher.id,
            "class_id": class.id,
            "subject_id": subject.id
        }),
    )
    .await;
    let session_id = created["data"]["id"].as_i64().unwrap();

    let present = student::Model::create_from_email(state.db(), "21bcs001@kprcas.ac.in")
        .await
        .unwrap();
    present
        .enroll_if_unassigned(state.db(), class.id)
        .await
        .unwrap();
    let absent = student::Model::create_from_email(state.db(), "21bcs002@kprcas.ac.in")
        .await
        .unwrap();
    absent
        .enroll_if_unassigned(state.db(), class.id)
        .await
        .unwrap();
    attendance_record::Model::mark(state.db(), session_id, present.id)
        .await
        .unwrap();

    let (status, body) = get_json(&app, &format!("/api/attendance/{session_id}/records")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["session"]["id"].as_i64(), Some(session_id));

    let records = body["data"]["records"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["roll_number"], "21BCS001");
    assert_eq!(records[0]["name"], "21bcs001");
    assert_eq!(records[0]["status"], "present");
    assert_eq!(records[0]["otp_verified"], true);
    assert!(records[0]["marked_at"].is_string());
    assert_eq!(records[1]["roll_number"], "21BCS002");
    assert_eq!(records[1]["status"], "absent");
    assert!(records[1]["marked_at"].is_null());

    let stats = &body["data"]["statistics"];
    assert_eq!(stats["total_records"], 2);
    assert_eq!(stats["total_present"], 1);
    assert_eq!(stats["total_absent"], 1);
    assert_eq!(stats["attendance_percentage"], "50.00");
}

#[tokio::test]
#[serial]
async fn session_records_unknown_id_is_404() {
    let (app, _state) = make_test_app().await;
    let (status, body) = get_json(&app, "/api/attendance/424242/records").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[serial]
async fn session_details_unknown_id_is_404() {
    let (app, _state) = make_test_app().await;
    let (status, body) = get_json(&app, "/api/attendance/424242").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], false);
}

#[tokio::test]
#[serial]
async fn status_update_completes_a_session_once() {
    let (app, state) = make_test_app().await;
    let (teacher, class, subject) = seed_assignment(state.db()).await;

    let (_, created) = post_json(
        &app,
        "/api/attendance",
        json!({
            "teacher_id": teacher.id,
            "class_id": class.id,
            "subject_id": subject.id
        }),
    )
    .await;
    let session_id = created["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/attendance/{session_id}/status");

    let (status, body) =
        send_json(&app, "PUT", &uri, Some(json!({ "status": "completed" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "completed");

    // Terminal states never change again.
    let (status, _) = send_json(&app, "PUT", &uri, Some(json!({ "status": "active" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn status_update_rejects_unknown_value() {
    let (app, state) = make_test_app().await;
    let (teacher, class, subject) = seed_assignment(state.db()).await;

    let (_, created) = post_json(
        &app,
        "/api/attendance",
        json!({
            "teacher_id": teacher.id,
            "class_id": class.id,
            "subject_id": subject.id
        }),
    )
    .await;
    let session_id = created["data"]["id"].as_i64().unwrap();

    let (status, _) = send_json(
        &app,
        "PUT",
        &format!("/api/attendance/{session_id}/status"),
        Some(json!({ "status": "paused" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
#[serial]
async fn delete_session_removes_it() {
    let (app, state) = make_test_app().await;
    let (teacher, class, subject) = seed_assignment(state.db()).await;

    let (_, created) = post_json(
        &app,
        "/api/attendance",
        json!({
            "teacher_id": teacher.id,
            "class_id": class.id,
            "subject_id": subject.id
        }),
    )
    .await;
    let session_id = created["data"]["id"].as_i64().unwrap();

    let s = student::Model::create_from_email(state.db(), "21bcs009@kprcas.ac.in")
        .await
        .unwrap();
    attendance_otp::Model::issue(state.db(), &s.email, session_id, 10)
        .await
        .unwrap();
    attendance_record::Model::mark(state.db(), session_id, s.id)
        .await
        .unwrap();

    let uri = format!("/api/attendance/{session_id}");
    let (status, _) = send_json(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = get_json(&app, &uri).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send_json(&app, "DELETE", &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    // Deleting the session cascades to its challenges and records.
    let otps = attendance_otp::Entity::find()
        .filter(attendance_otp::Column::SessionId.eq(session_id))
        .all(state.db())
        .await
        .unwrap();
    assert!(otps.is_empty());
    let records = attendance_record::Entity::find()
        .filter(attendance_record::Column::SessionId.eq(session_id))
        .all(state.db())
        .await
        .unwrap();
    assert!(records.is_empty());
}
