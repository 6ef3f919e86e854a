//! Connected client record

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Connection-scoped client identity
pub type ClientId = Uuid;

/// Name given to clients that join without one
pub const GUEST_NAME: &str = "Guest";

/// One connected party, participant or observer
///
/// Created when a connection is accepted and dropped on disconnect;
/// ids are never reused.
#[derive(Debug, Clone)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Granted only by presenting the channel secret at join time
    pub can_send: bool,
    /// Lobby readiness, only meaningful before the debate starts
    pub ready: bool,
    pub joined_at: DateTime<Utc>,
}

impl Client {
    pub fn new(name: impl Into<String>, can_send: bool) -> Self {
        let name = name.into();
        let name = match name.trim() {
            "" => GUEST_NAME.to_string(),
            trimmed => trimmed.to_string(),
        };
        Self {
            id: Uuid::new_v4(),
            name,
            can_send,
            ready: false,
            joined_at: Utc::now(),
        }
    }

    pub fn participant(name: impl Into<String>) -> Self {
        Self::new(name, true)
    }

    pub fn observer(name: impl Into<String>) -> Self {
        Self::new(name, false)
    }
}
