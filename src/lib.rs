//! careerhub - role-based career services API
//!
//! Admins invite teachers and manage sections, teachers post jobs and review
//! student work, students submit resumes and cover letters for AI-assisted
//! grading and track their job-search checklist.

pub mod auth;
pub mod cli;
pub mod config;
pub mod grading;
pub mod http_server;
pub mod model;
pub mod stats;
pub mod store;

pub use config::AppConfig;
pub use store::Database;
