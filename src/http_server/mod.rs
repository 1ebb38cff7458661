//! # HTTP Server Module
//!
//! JSON API consumed by the admin, teacher and student dashboards.
//!
//! # Endpoints
//!
//! - `/health` - Health check
//! - `/api/auth/*` - Registration, login, own account
//! - `/api/users`, `/api/invites` - Account administration
//! - `/api/sections`, `/api/jobs` - Classes and postings
//! - `/api/submissions` - Documents, AI feedback and teacher review
//! - `/api/checklists` - Per-student job-search checklist
//! - `/api/stats` - Dashboard aggregates

pub mod auth_routes;
pub mod checklist_routes;
pub mod errors;
pub mod extract;
pub mod guards;
pub mod health_routes;
pub mod invite_routes;
pub mod job_routes;
pub mod middleware;
pub mod section_routes;
pub mod server;
pub mod state;
pub mod stats_routes;
pub mod submission_routes;
pub mod user_routes;

pub use errors::{ApiError, ApiResult, ErrorResponse};
pub use server::{build_router, HttpServer};
pub use state::AppState;
