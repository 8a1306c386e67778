//! Attendance session retrieval.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use db::attendance::AttendanceError;
use db::models::attendance_record::Model as Record;
use db::models::attendance_session::{Entity as SessionEntity, Model as Session, SessionStatus};
use db::models::student::Model as Student;
use sea_orm::EntityTrait;
use std::collections::HashMap;
use std::str::FromStr;
use util::state::AppState;

use crate::response::ApiResponse;
use crate::routes::attendance::common::{
    ListSessionsQuery, RosterEntry, RosterStatistics, SessionDetailResponse, SessionListItem,
    SessionRecordsResponse, SessionResponse,
};
use crate::routes::common::error_response;

/// GET /api/attendance?teacher_id=1&status=active
///
/// Lists a teacher's sessions, newest first, with their present counts.
/// The optional `status` filter is applied after expiry healing, so a stale
/// `active` row past its deadline shows up as `expired`.
pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListSessionsQuery>,
) -> Response {
    let Some(teacher_id) = query.teacher_id else {
        return error_response(AttendanceError::Validation(
            "teacher_id query parameter is required".to_string(),
        ));
    };

    let status_filter = match query.status.as_deref() {
        Some(raw) => match SessionStatus::from_str(raw) {
            Ok(status) => Some(status),
            Err(_) => {
                return error_response(AttendanceError::Validation(format!(
                    "Invalid status '{raw}'. Expected one of: active, expired, completed"
                )));
            }
        },
        None => None,
    };

    let sessions = match Session::list_for_teacher(state.db(), teacher_id).await {
        Ok(sessions) => sessions,
        Err(err) => return error_response(err.into()),
    };

    let now = Utc::now();
    let mut items = Vec::with_capacity(sessions.len());
    for session in sessions {
        let session = session.healed(state.db(), now).await;
        if status_filter.is_some_and(|wanted| session.status != wanted) {
            continue;
        }
        let present_count = match session.present_count(state.db()).await {
            Ok(count) => count,
            Err(err) => return error_response(err.into()),
        };
        items.push(SessionListItem {
            session: SessionResponse::from_session(&session, now),
            present_count,
        });
    }

    Json(ApiResponse::success(
        items,
        "Sessions retrieved successfully",
    ))
    .into_response()
}

/// GET /api/attendance/{session_id}
///
/// Full session details: joined class, subject and teacher rows plus the
/// number of students already marked present.
pub async fn details(State(state): State<AppState>, Path(session_id): Path<i64>) -> Response {
    let session = match SessionEntity::find_by_id(session_id).one(state.db()).await {
        Ok(Some(session)) => session,
        Ok(None) => return error_response(AttendanceError::SessionNotFound),
        Err(err) => return error_response(err.into()),
    };
    let session = session.healed(state.db(), Utc::now()).await;

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
        "Session retrieved successfully",
    ))
    .into_response()
}

/// GET /api/attendance/{session_id}/records
///
/// The session's roster: every student in its class, merged with their
/// attendance record where one exists, plus present/absent totals.
pub async fn records(State(state): State<AppState>, Path(session_id): Path<i64>) -> Response {
    let session = match SessionEntity::find_by_id(session_id).one(state.db()).await {
        Ok(Some(session)) => session,
        Ok(None) => return error_response(AttendanceError::SessionNotFound),
        Err(err) => return error_response(err.into()),
    };
    let session = session.healed(state.db(), Utc::now()).await;

    let roster = match Student::list_for_class(state.db(), session.class_id).await {
        Ok(roster) => roster,
        Err(err) => return error_response(err.into()),
    };
    let marked = match Record::list_for_session(state.db(), session_id).await {
        Ok(marked) => marked,
        Err(err) => return error_response(err.into()),
    };
    let by_student: HashMap<i64, Record> =
        marked.into_iter().map(|r| (r.student_id, r)).collect();

    let entries: Vec<RosterEntry> = roster
        .iter()
        .map(|student| RosterEntry::from_student(student, by_student.get(&student.id)))
        .collect();
    let statistics = RosterStatistics::from_entries(&entries);

    let details = match session.details(state.db()).await {
        Ok(details) => details,
        Err(err) => return error_response(err.into()),
    };
    let present_count = statistics.total_present as u64;

    Json(ApiResponse::success(
        SessionRecordsResponse {
            session: SessionDetailResponse::from_details(&details, present_count, Utc::now()),
            records: entries,
            statistics,
        },
        "Attendance records retrieved successfully",
    ))
    .into_response()
}
