//! In-process `DeviceChannel` adapter.
//!
//! [`loopback_pair`] returns the watch-side [`LoopbackChannel`] and the
//! phone-side [`LoopbackPeer`]. Each send travels over an mpsc channel with
//! a oneshot reply slot, so `send_message` resolves only once the peer
//! answers. Reachability can be toggled and failures injected to exercise
//! the relay's degraded paths.

use async_trait::async_trait;
use famefit_core::error::CoreError;
use famefit_core::ports::device_channel::{ChannelPayload, DeviceChannel};
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Peer reply; `Err` carries the rejection reason
pub type PeerReply = Result<ChannelPayload, String>;

/// Message delivered to the peer, awaiting its reply
#[derive(Debug)]
pub struct PeerRequest {
    pub payload: ChannelPayload,
    reply_tx: oneshot::Sender<PeerReply>,
}

impl PeerRequest {
    /// Answer the sender. Ignored if the sender gave up.
    pub fn respond(self, reply: PeerReply) {
        let _ = self.reply_tx.send(reply);
    }
}

/// Phone-side end of a loopback pair
#[derive(Debug)]
pub struct LoopbackPeer {
    inbound: mpsc::Receiver<PeerRequest>,
}

impl LoopbackPeer {
    /// Next request; `None` once the channel side is dropped
    pub async fn recv(&mut self) -> Option<PeerRequest> {
        self.inbound.recv().await
    }

    /// Non-blocking receive
    pub fn try_recv(&mut self) -> Option<PeerRequest> {
        self.inbound.try_recv().ok()
    }
}

/// Watch-side end of a loopback pair
#[derive(Debug)]
pub struct LoopbackChannel {
    outbound: mpsc::Sender<PeerRequest>,
    reachable: AtomicBool,
    fail_next: AtomicU32,
    sent: AtomicU64,
}

/// Create a connected channel/peer pair; `buffer` bounds in-flight requests.
pub fn loopback_pair(buffer: usize) -> (LoopbackChannel, LoopbackPeer) {
    let (outbound, inbound) = mpsc::channel(buffer.max(1));
    let channel = LoopbackChannel {
        outbound,
        reachable: AtomicBool::new(true),
        fail_next: AtomicU32::new(0),
        sent: AtomicU64::new(0),
    };
    (channel, LoopbackPeer { inbound })
}

impl LoopbackChannel {
    /// Simulate the peer going out of (or back into) range
    pub fn set_reachable(&self, reachable: bool) {
        debug!("loopback reachability -> {reachable}");
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    /// Fail the next `count` sends before they reach the peer
    pub fn fail_next(&self, count: u32) {
        self.fail_next.fetch_add(count, Ordering::SeqCst);
    }

    /// Messages answered successfully by the peer
    pub fn sent_count(&self) -> u64 {
        self.sent.load(Ordering::SeqCst)
    }

    fn take_injected_failure(&self) -> bool {
        self.fail_next
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl DeviceChannel for LoopbackChannel {
    fn is_reachable(&self) -> bool {
        self.reachable.load(Ordering::SeqCst) && !self.outbound.is_closed()
    }

    async fn send_message(&self, payload: ChannelPayload) -> Result<ChannelPayload, CoreError> {
        if !self.is_reachable() {
            return Err(CoreError::Unreachable);
        }
        if self.take_injected_failure() {
            return Err(CoreError::Channel("injected send failure".to_string()));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.outbound
            .send(PeerRequest { payload, reply_tx })
            .await
            .map_err(|_| CoreError::Channel("peer endpoint closed".to_string()))?;

        let reply = reply_rx
            .await
            .map_err(|_| CoreError::Channel("peer dropped the request".to_string()))?
            .map_err(CoreError::Channel)?;

        self.sent.fetch_add(1, Ordering::SeqCst);
        Ok(reply)
    }
}
