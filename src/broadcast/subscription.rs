//! Subscription Send Loop
//!
//! One live viewer's channel into the hub. The hub writes frames into the
//! subscription's bounded buffer; the subscription drains it, announcing
//! itself first and filling idle gaps with keep-alive comments.

use axum::body::Bytes;
use futures_util::stream::{self, Stream};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Instant};

use super::hub::{BroadcastHub, SubscriptionId};
use super::messages::Frame;

/// Lifecycle of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// Registered, connected frame not yet emitted
    Connecting,
    /// Delivering telemetry and keep-alives
    Active,
    /// Terminal; removed from the registry
    Closed,
}

/// Removes the subscription from the hub when dropped
struct RegistryGuard {
    hub: Arc<BroadcastHub>,
    id: SubscriptionId,
}

impl Drop for RegistryGuard {
    fn drop(&mut self) {
        self.hub.unsubscribe(self.id);
    }
}

/// A single viewer's subscription
///
/// Obtained from [`BroadcastHub::subscribe`]. However the subscription ends
/// (the viewer disconnects and the stream is dropped, the hub evicts it, or
/// the hub shuts down) it is released from the registry exactly once.
pub struct Subscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<Frame>,
    state: SubscriptionState,
    keep_alive: Duration,
    last_sent: Instant,
    guard: Option<RegistryGuard>,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        receiver: mpsc::Receiver<Frame>,
        keep_alive: Duration,
        hub: Arc<BroadcastHub>,
    ) -> Self {
        Self {
            id,
            receiver,
            state: SubscriptionState::Connecting,
            keep_alive,
            last_sent: Instant::now(),
            guard: Some(RegistryGuard { hub, id }),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn state(&self) -> SubscriptionState {
        self.state
    }

    /// Wait for the next frame to send
    ///
    /// Yields the connected frame first, then buffered telemetry in publish
    /// order. If nothing arrives within the keep-alive interval since the last
    /// frame, yields a keep-alive instead. Returns `None` once the hub has
    /// dropped this subscription and its buffer is drained.
    pub async fn next_frame(&mut self) -> Option<Frame> {
        match self.state {
            SubscriptionState::Closed => None,
            SubscriptionState::Connecting => {
                self.state = SubscriptionState::Active;
                self.last_sent = Instant::now();
                Some(Frame::Connected)
            }
            SubscriptionState::Active => {
                let deadline = self.last_sent + self.keep_alive;
                let frame = match time::timeout_at(deadline, self.receiver.recv()).await {
                    Ok(Some(frame)) => frame,
                    Ok(None) => {
                        tracing::debug!(subscription_id = %self.id, "Subscription dropped by hub");
                        self.close();
                        return None;
                    }
                    Err(_) => Frame::KeepAlive,
                };
                self.last_sent = Instant::now();
                Some(frame)
            }
        }
    }

    /// Stop delivery and leave the registry
    ///
    /// Safe to call more than once and safe to race with an eviction.
    pub fn close(&mut self) {
        self.state = SubscriptionState::Closed;
        self.receiver.close();
        // Dropping the guard unsubscribes
        self.guard.take();
    }

    /// Turn the subscription into a response body stream of encoded frames
    ///
    /// When the transport goes away the body, and with it the subscription,
    /// is dropped, which releases it from the registry.
    pub fn into_stream(self) -> impl Stream<Item = Result<Bytes, Infallible>> + Send + 'static {
        stream::unfold(self, |mut subscription| async move {
            let frame = subscription.next_frame().await?;
            Some((Ok(frame.into_bytes()), subscription))
        })
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if self.state != SubscriptionState::Closed {
            tracing::debug!(subscription_id = %self.id, "Subscriber disconnected");
        }
    }
}
