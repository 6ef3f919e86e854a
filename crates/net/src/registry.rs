//! Channel registry
//!
//! Process-wide map from channel name to its running session. Channels
//! are independent: each has its own task, state and clients.

use std::collections::HashMap;
use std::sync::Arc;

use rostrum_core::config::Config;
use rostrum_core::{Analyst, ChannelInfo, ChannelSummary};
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::session::{ChannelHandle, ChannelSettings, Session};

pub struct Registry {
    channels: RwLock<HashMap<String, ChannelHandle>>,
    analyst: Arc<dyn Analyst>,
    settings: ChannelSettings,
    shutdown_tx: broadcast::Sender<()>,
}

impl Registry {
    pub fn new(analyst: Arc<dyn Analyst>, settings: ChannelSettings) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            channels: RwLock::new(HashMap::new()),
            analyst,
            settings,
            shutdown_tx,
        }
    }

    /// Build a registry and create every channel listed in `config`
    pub async fn from_config(config: &Config, analyst: Arc<dyn Analyst>) -> Result<Self> {
        let registry = Self::new(analyst, ChannelSettings::from(config));
        for seed in &config.channels {
            registry.create(&seed.name, &seed.secret).await?;
        }
        Ok(registry)
    }

    /// Create a channel. Names are unique and compared without surrounding
    /// whitespace; an empty secret makes every joiner read-only.
    pub async fn create(&self, name: &str, secret: &str) -> Result<ChannelHandle> {
        let name = name.trim();
        if name.is_empty() {
            return Err(Error::Rejected("Channel name must not be empty".into()));
        }
        if self.channels.read().await.contains_key(name) {
            return Err(rostrum_core::Error::DuplicateChannel(name.to_string()).into());
        }

        // Hashing is slow and CPU-bound; keep it off the lock and the runtime
        let info = {
            let (name, secret) = (name.to_string(), secret.to_string());
            tokio::task::spawn_blocking(move || ChannelInfo::new(name, &secret)).await??
        };

        let mut channels = self.channels.write().await;
        if channels.contains_key(name) {
            return Err(rostrum_core::Error::DuplicateChannel(name.to_string()).into());
        }
        let handle = ChannelHandle::spawn(
            info,
            self.settings.clone(),
            self.analyst.clone(),
            self.shutdown_tx.subscribe(),
        );
        channels.insert(name.to_string(), handle.clone());

        info!(channel = %name, channel_id = %handle.id(), "Channel created");
        Ok(handle)
    }

    pub async fn get(&self, name: &str) -> Option<ChannelHandle> {
        self.channels.read().await.get(name.trim()).cloned()
    }

    /// Join `channel` by name
    pub async fn join(&self, channel: &str, name: &str, secret: Option<&str>) -> Result<Session> {
        let handle = self
            .get(channel)
            .await
            .ok_or_else(|| rostrum_core::Error::ChannelNotFound(channel.to_string()))?;
        handle.join(name, secret).await
    }

    /// Summaries of every live channel, sorted by name
    pub async fn list(&self) -> Vec<ChannelSummary> {
        let handles: Vec<ChannelHandle> = self.channels.read().await.values().cloned().collect();

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            match handle.summary().await {
                Ok(summary) => summaries.push(summary),
                Err(e) => debug!(channel = %handle.name(), error = %e, "Skipping closed channel"),
            }
        }
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        summaries
    }

    /// Dispose of a channel. Its clients see their queues close.
    pub async fn remove(&self, name: &str) -> bool {
        match self.channels.write().await.remove(name.trim()) {
            Some(handle) => {
                handle.close();
                info!(channel = %name, "Channel removed");
                true
            }
            None => false,
        }
    }

    pub async fn len(&self) -> usize {
        self.channels.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.channels.read().await.is_empty()
    }

    /// Stop every channel
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
        self.channels.write().await.clear();
        info!("Registry shut down");
    }
}
