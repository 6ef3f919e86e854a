//! Rostrum Core Library
//!
//! Transport-agnostic debate engine: models, the phase controller,
//! prompts, verdict parsing, and configuration for Rostrum.

pub mod analyst;
pub mod config;
pub mod debate;
pub mod error;
pub mod invariants;
pub mod models;
pub mod notices;
pub mod prompts;
pub mod secret;
pub mod verdict;

pub use analyst::Analyst;
pub use config::Config;
pub use debate::{AnalysisKind, AnalysisRequest, Debate, Outbound, ENGAGE_TOKEN};
pub use error::{Error, Result};
pub use models::*;
pub use secret::ChannelSecret;
pub use verdict::parse_verdict;
