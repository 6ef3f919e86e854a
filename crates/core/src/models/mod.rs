//! Data models for Rostrum

mod channel;
mod client;
mod message;
mod phase;
mod report;

pub use channel::*;
pub use client::*;
pub use message::*;
pub use phase::*;
pub use report::*;
