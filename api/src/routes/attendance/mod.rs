//! Teacher-facing attendance session management.
//!
//! - `POST /attendance` → open a session with a fresh join code
//! - `GET /attendance?teacher_id=` → list a teacher's sessions
//! - `GET /attendance/{session_id}` → session details with live counts
//! - `GET /attendance/{session_id}/records` → class roster with attendance
//! - `PUT /attendance/{session_id}/status` → complete a session early
//! - `DELETE /attendance/{session_id}` → remove a session and its records

use axum::Router;
use axum::routing::{get as get_method, post as post_method, put as put_method};
use util::state::AppState;

pub mod common;
pub mod delete;
pub mod get;
pub mod post;
pub mod put;

pub fn attendance_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            post_method(post::create).get(get::list),
        )
        .route(
            "/{session_id}",
            get_method(get::details).delete(delete::remove),
        )
        .route("/{session_id}/records", get_method(get::records))
        .route("/{session_id}/status", put_method(put::set_status))
}
