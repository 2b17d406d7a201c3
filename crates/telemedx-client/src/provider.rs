//! Seam between the call session and a real-time room provider.
//!
//! A provider joins a room on a signaling server, publishes the local
//! camera/microphone/screen tracks and relays data packets. When no
//! provider is installed the session runs in simulated mode instead.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::broadcast;

use telemedx_media::TrackKind;
use telemedx_shared::{ConnectionQuality, ParticipantInfo};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("No room provider is installed")]
    Unavailable,

    #[error("Failed to connect to room: {0}")]
    Connect(String),

    #[error("Not connected to a room")]
    NotConnected,

    #[error("Failed to publish: {0}")]
    Publish(String),

    #[error("Device error: {0}")]
    Device(String),
}

/// Room events pushed by the provider.
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    ParticipantConnected(ParticipantInfo),
    ParticipantDisconnected(String),
    DataReceived {
        payload: Vec<u8>,
        /// Identity of the publishing participant, if known.
        from: Option<String>,
    },
    TrackSubscribed {
        kind: TrackKind,
        participant: String,
    },
    TrackUnsubscribed {
        kind: TrackKind,
        participant: String,
    },
    ConnectionQualityChanged {
        identity: String,
        quality: ConnectionQuality,
    },
    Reconnecting,
    Reconnected,
    Disconnected,
}

#[async_trait]
pub trait RoomProvider: Send + Sync {
    /// Whether a real provider backs this handle.
    fn is_available(&self) -> bool;

    async fn connect(&self, server_url: &str, token: &str) -> Result<(), ProviderError>;

    async fn disconnect(&self);

    fn is_connected(&self) -> bool;

    async fn set_camera_enabled(&self, enabled: bool) -> Result<(), ProviderError>;

    async fn set_microphone_enabled(&self, enabled: bool) -> Result<(), ProviderError>;

    async fn set_screen_share_enabled(&self, enabled: bool) -> Result<(), ProviderError>;

    /// Publish on the reliable data channel.
    async fn publish_data(&self, payload: Vec<u8>) -> Result<(), ProviderError>;

    /// Remote participants currently in the room.
    fn participants(&self) -> Vec<ParticipantInfo>;

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent>;
}

/// The provider used when no real-time SDK is installed.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProvider;

#[async_trait]
impl RoomProvider for NoProvider {
    fn is_available(&self) -> bool {
        false
    }

    async fn connect(&self, _server_url: &str, _token: &str) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn disconnect(&self) {}

    fn is_connected(&self) -> bool {
        false
    }

    async fn set_camera_enabled(&self, _enabled: bool) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn set_microphone_enabled(&self, _enabled: bool) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn set_screen_share_enabled(&self, _enabled: bool) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable)
    }

    async fn publish_data(&self, _payload: Vec<u8>) -> Result<(), ProviderError> {
        Err(ProviderError::Unavailable)
    }

    fn participants(&self) -> Vec<ParticipantInfo> {
        Vec::new()
    }

    fn subscribe(&self) -> broadcast::Receiver<ProviderEvent> {
        // Sender dropped immediately: the receiver reports Closed.
        broadcast::channel(1).1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_no_provider_refuses_everything() {
        let provider = NoProvider;
        assert!(!provider.is_available());
        assert!(!provider.is_connected());
        assert_eq!(
            provider.connect("ws://localhost:7880", "t").await,
            Err(ProviderError::Unavailable)
        );
        assert_eq!(
            provider.publish_data(b"{}".to_vec()).await,
            Err(ProviderError::Unavailable)
        );
        assert!(provider.participants().is_empty());

        let mut rx = provider.subscribe();
        assert!(matches!(
            rx.try_recv(),
            Err(broadcast::error::TryRecvError::Closed)
        ));
    }
}
