//! Device-to-device channel port.
//!
//! Implementations: `famefit-relay` crate (`LoopbackChannel`)

use async_trait::async_trait;

use crate::error::CoreError;

/// Key/value message exchanged with the paired device
pub type ChannelPayload = serde_json::Map<String, serde_json::Value>;

/// Message channel to the paired device.
///
/// The relay never opens or closes the channel; it only polls
/// reachability and sends.
#[async_trait]
pub trait DeviceChannel: Send + Sync {
    /// Whether the paired device can currently receive messages
    fn is_reachable(&self) -> bool;

    /// Send a message and wait for the peer's reply
    async fn send_message(&self, payload: ChannelPayload) -> Result<ChannelPayload, CoreError>;
}
