//! Broadcaster
//!
//! Holds the outbound queue of every client in one channel. Each queue
//! has a single consumer that owns the connection, so enqueueing is the
//! only way anything reaches a client. Delivery is best-effort: a full or
//! closed queue only affects that client.

use std::collections::HashMap;

use rostrum_core::{ChatMessage, ClientId};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

pub struct Fanout {
    channel: String,
    outboxes: HashMap<ClientId, mpsc::Sender<ChatMessage>>,
}

impl Fanout {
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            outboxes: HashMap::new(),
        }
    }

    pub fn attach(&mut self, client_id: ClientId, outbox: mpsc::Sender<ChatMessage>) {
        self.outboxes.insert(client_id, outbox);
    }

    pub fn detach(&mut self, client_id: ClientId) -> bool {
        self.outboxes.remove(&client_id).is_some()
    }

    pub fn len(&self) -> usize {
        self.outboxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outboxes.is_empty()
    }

    /// Deliver to every attached client
    pub fn broadcast(&self, msg: &ChatMessage) {
        info!(channel = %self.channel, sender = %msg.sender, text = %msg.text, "Broadcast");
        for (client_id, outbox) in &self.outboxes {
            self.deliver(*client_id, outbox, msg.clone());
        }
    }

    /// Deliver to one client only
    pub fn send_to(&self, client_id: ClientId, msg: ChatMessage) {
        match self.outboxes.get(&client_id) {
            Some(outbox) => self.deliver(client_id, outbox, msg),
            None => debug!(channel = %self.channel, client_id = %client_id, "No outbox for client"),
        }
    }

    /// Drop every queue; consumers observe the channel closing
    pub fn close_all(&mut self) {
        self.outboxes.clear();
    }

    fn deliver(&self, client_id: ClientId, outbox: &mpsc::Sender<ChatMessage>, msg: ChatMessage) {
        match outbox.try_send(msg) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                warn!(channel = %self.channel, client_id = %client_id, "Outbound queue full, message dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(channel = %self.channel, client_id = %client_id, "Outbound queue closed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_broadcast_reaches_every_client_in_order() {
        let mut fanout = Fanout::new("test");
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        fanout.attach(Uuid::new_v4(), tx_a);
        fanout.attach(Uuid::new_v4(), tx_b);

        fanout.broadcast(&ChatMessage::system("one"));
        fanout.broadcast(&ChatMessage::system("two"));

        for rx in [&mut rx_a, &mut rx_b] {
            assert_eq!(rx.recv().await.unwrap().text, "one");
            assert_eq!(rx.recv().await.unwrap().text, "two");
        }
    }

    #[tokio::test]
    async fn test_private_delivery() {
        let mut fanout = Fanout::new("test");
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        let (tx_a, mut rx_a) = mpsc::channel(8);
        let (tx_b, mut rx_b) = mpsc::channel(8);
        fanout.attach(a, tx_a);
        fanout.attach(b, tx_b);

        fanout.send_to(a, ChatMessage::system("just you"));

        assert_eq!(rx_a.recv().await.unwrap().text, "just you");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_client_does_not_affect_others() {
        let mut fanout = Fanout::new("test");
        let (tx_full, _rx_full) = mpsc::channel(1);
        let (tx_gone, rx_gone) = mpsc::channel(8);
        let (tx_ok, mut rx_ok) = mpsc::channel(8);
        fanout.attach(Uuid::new_v4(), tx_full);
        fanout.attach(Uuid::new_v4(), tx_gone);
        fanout.attach(Uuid::new_v4(), tx_ok);
        drop(rx_gone);

        fanout.broadcast(&ChatMessage::system("one"));
        fanout.broadcast(&ChatMessage::system("two"));

        assert_eq!(rx_ok.recv().await.unwrap().text, "one");
        assert_eq!(rx_ok.recv().await.unwrap().text, "two");
        assert_eq!(fanout.len(), 3);
    }
}
