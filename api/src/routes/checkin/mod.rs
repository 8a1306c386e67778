//! Student-facing check-in flow.
//!
//! - `POST /checkin/verify-session` → resolve a join code before asking for email
//! - `POST /checkin/request-otp` → email a one-time code to the student
//! - `POST /checkin/mark` → verify the code and record attendance

use axum::Router;
use axum::routing::post as post_method;
use util::state::AppState;

pub mod common;
pub mod post;

pub fn checkin_routes() -> Router<AppState> {
    Router::new()
        .route("/verify-session", post_method(post::verify_session))
        .route("/request-otp", post_method(post::request_otp))
        .route("/mark", post_method(post::mark))
}
