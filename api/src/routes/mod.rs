//! HTTP route entry point for `/api/...`.
//!
//! Route groups include:
//! - `/health` → Health check endpoint (public)
//! - `/attendance` → Session lifecycle management for teachers
//! - `/checkin` → Student-facing check-in flow (session lookup, OTP, mark)

use crate::routes::{
    attendance::attendance_routes, checkin::checkin_routes, health::health_routes,
};
use axum::Router;
use util::state::AppState;

pub mod attendance;
pub mod checkin;
pub mod common;
pub mod health;

/// Builds the complete application router for all HTTP endpoints.
///
/// All route registration lives here so `main` stays focused on startup and
/// the `Router` type never changes after construction.
pub fn routes(app_state: AppState) -> Router {
    Router::new()
        .nest("/health", health_routes())
        .nest("/attendance", attendance_routes())
        .nest("/checkin", checkin_routes())
        .with_state(app_state)
}
