//! Channel transport
//!
//! Wraps a named pub/sub topic per session. Delivery is best-effort,
//! at-most-once, in-order per sender within a live connection; nothing is
//! retained across a reconnect boundary. The supervisor exclusively owns
//! the live subscription handle.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::{broadcast, watch};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::events::BoardEvent;

/// Reported health of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    /// Live and delivering
    Subscribed,
    /// Torn down cleanly
    Closed,
    /// Failed; delivery has stopped
    Errored,
}

/// A live per-session subscription handle.
///
/// Dropping or closing the handle ends delivery; the transport retains
/// nothing for it.
#[async_trait]
pub trait Subscription: Send {
    /// Publish an event to the session topic. Degenerate draw batches are
    /// dropped before they reach the wire.
    async fn send(&mut self, event: &BoardEvent) -> Result<()>;

    /// Receive the next event from peers. `None` means the subscription is
    /// dead and the caller must reconnect.
    async fn recv(&mut self) -> Option<BoardEvent>;

    /// Current transport-reported state, inspected by health checks.
    fn state(&self) -> TransportState;

    /// Tear the subscription down.
    async fn close(&mut self);
}

/// Factory for per-session subscriptions.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Subscribe to a session topic.
    ///
    /// Connecting twice to the same session is idempotent: the previous
    /// subscription is torn down before the new one is created, so a
    /// session never receives duplicate delivery through one transport.
    async fn connect(&self, session_id: Uuid) -> Result<Box<dyn Subscription>>;
}

#[derive(Debug, Clone)]
struct Envelope {
    origin: Uuid,
    event: BoardEvent,
}

/// Shared in-process topic registry, one `tokio::broadcast` channel per
/// session.
#[derive(Clone, Default)]
pub struct BroadcastHub {
    topics: Arc<Mutex<HashMap<Uuid, broadcast::Sender<Envelope>>>>,
}

impl BroadcastHub {
    /// Create an empty hub.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn topic(&self, session_id: Uuid) -> broadcast::Sender<Envelope> {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics
            .entry(session_id)
            .or_insert_with(|| broadcast::channel(256).0)
            .clone()
    }
}

/// In-process transport over a [`BroadcastHub`], used by tests and
/// single-node deployments.
pub struct BroadcastTransport {
    hub: BroadcastHub,
    active: Mutex<HashMap<Uuid, watch::Sender<bool>>>,
}

impl BroadcastTransport {
    /// Create a transport over the given hub.
    #[must_use]
    pub fn new(hub: BroadcastHub) -> Self {
        Self {
            hub,
            active: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl Transport for BroadcastTransport {
    async fn connect(&self, session_id: Uuid) -> Result<Box<dyn Subscription>> {
        let (cancel_tx, cancel_rx) = watch::channel(false);
        {
            let mut active = self.active.lock().unwrap_or_else(|e| e.into_inner());
            // a dropped subscription drops its cancel receiver; sweep those
            // entries so the registry tracks live subscriptions only
            active.retain(|_, cancel| !cancel.is_closed());
            if let Some(previous) = active.insert(session_id, cancel_tx) {
                // teardown before resubscribe keeps delivery at-most-once
                debug!(%session_id, "replacing existing subscription");
                let _ = previous.send(true);
            }
        }

        let topic = self.hub.topic(session_id);
        let rx = topic.subscribe();
        Ok(Box::new(BroadcastSubscription {
            session_id,
            conn_id: Uuid::new_v4(),
            tx: topic,
            rx,
            cancel: cancel_rx,
            state: TransportState::Subscribed,
        }))
    }
}

struct BroadcastSubscription {
    session_id: Uuid,
    conn_id: Uuid,
    tx: broadcast::Sender<Envelope>,
    rx: broadcast::Receiver<Envelope>,
    cancel: watch::Receiver<bool>,
    state: TransportState,
}

#[async_trait]
impl Subscription for BroadcastSubscription {
    async fn send(&mut self, event: &BoardEvent) -> Result<()> {
        if self.state != TransportState::Subscribed {
            return Err(Error::NotSubscribed);
        }
        let event = match event {
            BoardEvent::DrawBatch { strokes } => match BoardEvent::draw_batch(strokes.clone()) {
                Some(filtered) => filtered,
                // nothing drawable: not an error, just nothing to publish
                None => return Ok(()),
            },
            BoardEvent::Nuke { .. } => event.clone(),
        };
        self.tx
            .send(Envelope {
                origin: self.conn_id,
                event,
            })
            .map(|_| ())
            .map_err(|_| Error::Closed)
    }

    async fn recv(&mut self) -> Option<BoardEvent> {
        loop {
            if self.state != TransportState::Subscribed {
                return None;
            }
            tokio::select! {
                changed = self.cancel.changed() => {
                    if changed.is_err() || *self.cancel.borrow() {
                        self.state = TransportState::Closed;
                        return None;
                    }
                }
                received = self.rx.recv() => match received {
                    Ok(envelope) => {
                        if envelope.origin != self.conn_id {
                            return Some(envelope.event);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // best-effort channel: missed messages are recovered
                        // by the durable-store resync, not redelivered
                        warn!(session_id = %self.session_id, skipped, "subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        self.state = TransportState::Errored;
                        return None;
                    }
                },
            }
        }
    }

    fn state(&self) -> TransportState {
        if self.state == TransportState::Subscribed && *self.cancel.borrow() {
            TransportState::Closed
        } else {
            self.state
        }
    }

    async fn close(&mut self) {
        self.state = TransportState::Closed;
    }
}
