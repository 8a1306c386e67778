use chrono::{DateTime, Utc};
use db::models::attendance_record::{Model as Record, RecordStatus};
use db::models::attendance_session::{Model as Session, SessionDetails, SessionStatus};
use db::models::student::Model as Student;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct CreateSessionRequest {
    pub teacher_id: Option<i64>,
    pub class_id: Option<i64>,
    pub subject_id: Option<i64>,
    pub duration_minutes: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ListSessionsQuery {
    pub teacher_id: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SetStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub id: i64,
    pub teacher_id: i64,
    pub class_id: i64,
    pub subject_id: i64,
    pub session_code: String,
    pub status: SessionStatus,
    pub created_at: String,
    pub expires_at: String,
    pub remaining_seconds: i64,
}

impl SessionResponse {
    pub fn from_session(session: &Session, now: DateTime<Utc>) -> Self {
        Self {
            id: session.id,
            teacher_id: session.teacher_id,
            class_id: session.class_id,
            subject_id: session.subject_id,
            session_code: session.session_code.clone(),
            status: session.status,
            created_at: session.created_at.to_rfc3339(),
            expires_at: session.expires_at.to_rfc3339(),
            remaining_seconds: session.remaining_seconds(now),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionListItem {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub present_count: u64,
}

#[derive(Debug, Serialize)]
pub struct SessionDetailResponse {
    #[serde(flatten)]
    pub session: SessionResponse,
    pub class_name: Option<String>,
    pub section: Option<String>,
    pub subject_name: Option<String>,
    pub subject_code: Option<String>,
    pub teacher_name: Option<String>,
    pub present_count: u64,
}

impl SessionDetailResponse {
    pub fn from_details(details: &SessionDetails, present_count: u64, now: DateTime<Utc>) -> Self {
        Self {
            session: SessionResponse::from_session(&details.session, now),
            class_name: details.class.as_ref().map(|c| c.class_name.clone()),
            section: details.class.as_ref().map(|c| c.section.clone()),
            subject_name: details.subject.as_ref().map(|s| s.subject_name.clone()),
            subject_code: details.subject.as_ref().map(|s| s.subject_code.clone()),
            teacher_name: details.teacher.as_ref().map(|t| t.name.clone()),
            present_count,
        }
    }
}

/// One roster line: a class member and whatever attendance they have for the
/// session. Students with no record show up as absent.
#[derive(Debug, Serialize)]
pub struct RosterEntry {
    pub student_id: i64,
    pub roll_number: String,
    pub name: String,
    pub email: String,
    pub status: RecordStatus,
    pub otp_verified: bool,
    pub marked_at: Option<String>,
}

impl RosterEntry {
    pub fn from_student(student: &Student, record: Option<&Record>) -> Self {
        Self {
            student_id: student.id,
            roll_number: student.student_id.clone(),
            name: student.name.clone(),
            email: student.email.clone(),
            status: record.map_or(RecordStatus::Absent, |r| r.status),
            otp_verified: record.is_some_and(|r| r.otp_verified),
            marked_at: record.map(|r| r.marked_at.to_rfc3339()),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RosterStatistics {
    pub total_records: usize,
    pub total_present: usize,
    pub total_absent: usize,
    pub attendance_percentage: String,
}

impl RosterStatistics {
    pub fn from_entries(entries: &[RosterEntry]) -> Self {
        let total_records = entries.len();
        let total_present = entries
            .iter()
            .filter(|e| e.status == RecordStatus::Present)
            .count();
        let percentage = if total_records > 0 {
            format!("{:.2}", total_present as f64 / total_records as f64 * 100.0)
        } else {
            "0.00".to_string()
        };
        Self {
            total_records,
            total_present,
            total_absent: total_records - total_present,
            attendance_percentage: percentage,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SessionRecordsResponse {
    pub session: SessionDetailResponse,
    pub records: Vec<RosterEntry>,
    pub statistics: RosterStatistics,
}
