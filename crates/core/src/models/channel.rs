//! Channel identity - a named, isolated debate session

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::PhaseId;
use crate::error::{Error, Result};
use crate::secret::ChannelSecret;

/// Immutable identity of a channel
#[derive(Debug, Clone)]
pub struct ChannelInfo {
    pub id: Uuid,
    pub name: String,
    pub secret: ChannelSecret,
    pub created_at: DateTime<Utc>,
}

impl ChannelInfo {
    pub fn new(name: impl Into<String>, secret: &str) -> Result<Self> {
        Ok(Self {
            id: Uuid::new_v4(),
            name: name.into(),
            secret: ChannelSecret::new(secret)?,
            created_at: Utc::now(),
        })
    }

    /// Decide the send capability for a join attempt.
    ///
    /// No secret means a read-only observer. A wrong secret rejects the
    /// join outright instead of falling back to read-only.
    pub fn authorize(&self, secret: Option<&str>) -> Result<bool> {
        match secret {
            None | Some("") => Ok(false),
            Some(candidate) if self.secret.verify(candidate) => Ok(true),
            Some(_) => Err(Error::InvalidSecret(self.name.clone())),
        }
    }
}

/// Public view of a channel for listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelSummary {
    pub id: Uuid,
    pub name: String,
    pub occupancy: usize,
    pub phase: PhaseId,
}
