//! In-process telemetry transport over a bounded tokio mpsc channel.
//!
//! The station owns the receiving end. Connecting fails once the receiver is
//! gone, and so does sending on an existing link, so the drone's reconnect
//! loop behaves as it would over a network socket.

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::transport::{LinkConnector, TelemetryLink};
use crate::error::{DroneGuardError, Result};

/// Creates a connector and the station-side receiver.
#[must_use]
pub fn channel(buffer: usize, endpoint: &str) -> (ChannelConnector, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(buffer.max(1));
    (
        ChannelConnector {
            tx,
            endpoint: endpoint.to_string(),
        },
        rx,
    )
}

#[derive(Debug, Clone)]
pub struct ChannelConnector {
    tx: mpsc::Sender<String>,
    endpoint: String,
}

#[derive(Debug)]
pub struct ChannelLink {
    tx: mpsc::Sender<String>,
}

#[async_trait]
impl LinkConnector for ChannelConnector {
    type Link = ChannelLink;

    async fn connect(&self) -> Result<ChannelLink> {
        if self.tx.is_closed() {
            return Err(DroneGuardError::Transport(format!(
                "{} is not accepting connections",
                self.endpoint
            )));
        }
        Ok(ChannelLink { tx: self.tx.clone() })
    }

    fn endpoint(&self) -> String {
        self.endpoint.clone()
    }
}

#[async_trait]
impl TelemetryLink for ChannelLink {
    async fn send(&mut self, frame: String) -> Result<()> {
        self.tx
            .send(frame)
            .await
            .map_err(|_| DroneGuardError::Transport("station closed the link".to_string()))
    }
}
