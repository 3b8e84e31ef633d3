//! vital-api: Domain types and HTTP client for the Vital Talk service
//!
//! This crate holds the types shared by every part of the client (transcript
//! messages, emotional states, audio clips, feedback reports) and the REST
//! client used for the scenario catalog, conversation bootstrap, feedback,
//! and the speech conversion endpoints.

pub mod client;
pub mod error;
pub mod feedback;
pub mod speech;
pub mod types;

pub use client::{ApiClient, DEFAULT_BASE_URL};
pub use error::{Error, Result};
pub use feedback::{FeedbackReport, ScoreBand, SuggestedResponse};
pub use speech::SpeechService;
pub use types::*;
