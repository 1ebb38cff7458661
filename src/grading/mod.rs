//! # AI Grading
//!
//! Grading itself is done by an external chat-completion model. This module
//! builds the prompt, optionally calls the model, and coerces whatever comes
//! back into a [`Feedback`](crate::model::Feedback).

pub mod client;
pub mod normalize;
pub mod prompt;

use thiserror::Error;

pub use client::{GradingClient, GradingConfig};
pub use normalize::normalize_reply;
pub use prompt::build_prompt;

pub type GradingResult<T> = Result<T, GradingError>;

#[derive(Debug, Error)]
pub enum GradingError {
    /// No model endpoint configured on this server
    #[error("AI grading is not configured on this server")]
    NotConfigured,

    #[error("Grading request failed: {0}")]
    Request(String),

    #[error("Grading service returned HTTP {status}: {body}")]
    UpstreamStatus { status: u16, body: String },

    #[error("Grading service returned no content")]
    EmptyReply,
}

impl GradingError {
    pub fn status_code(&self) -> u16 {
        match self {
            GradingError::NotConfigured => 503,
            GradingError::Request(_) => 502,
            GradingError::UpstreamStatus { .. } => 502,
            GradingError::EmptyReply => 502,
        }
    }
}

impl From<reqwest::Error> for GradingError {
    fn from(err: reqwest::Error) -> Self {
        GradingError::Request(err.to_string())
    }
}
