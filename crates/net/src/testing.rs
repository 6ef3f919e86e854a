//! Test doubles shared by the session, registry and server tests

use std::time::Duration;

use async_trait::async_trait;
use rostrum_core::{Analyst, ChatMessage, Error, Result};

use crate::session::Session;

/// Analyst with a fixed behaviour
pub enum ScriptedAnalyst {
    Reply(String),
    Fail,
    Hang,
}

impl ScriptedAnalyst {
    pub fn replying(text: &str) -> Self {
        Self::Reply(text.to_string())
    }

    pub fn failing() -> Self {
        Self::Fail
    }

    pub fn hanging() -> Self {
        Self::Hang
    }
}

#[async_trait]
impl Analyst for ScriptedAnalyst {
    async fn analyze(&self, _system_prompt: &str, _context: &str) -> Result<String> {
        match self {
            Self::Reply(text) => Ok(text.clone()),
            Self::Fail => Err(Error::AiUnavailable("scripted failure".into())),
            Self::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok(String::new())
            }
        }
    }
}

/// Receive until `done` matches, returning everything seen including the match
pub async fn collect_until(
    session: &mut Session,
    done: impl Fn(&ChatMessage) -> bool,
) -> Vec<ChatMessage> {
    let mut seen = Vec::new();
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), session.recv())
            .await
            .expect("timed out waiting for message")
            .expect("channel closed");
        let stop = done(&msg);
        seen.push(msg);
        if stop {
            return seen;
        }
    }
}
