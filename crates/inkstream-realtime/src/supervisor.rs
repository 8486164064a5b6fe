//! Reconnection supervisor
//!
//! Owns the channel lifecycle for one session view. The status machine is
//! `Connected -> (error|closed|timeout|offline) -> Reconnecting ->
//! (subscribed) -> Connected`, with browser offline forcing `Disconnected`
//! immediately and online scheduling a reconnect regardless of any backoff
//! timer. Reconnect delays follow `min(30s, 1s * 2^(attempt-1))` with
//! unbounded attempts and no jitter; the attempt counter resets to zero the
//! moment a subscription succeeds.
//!
//! A periodic health check inspects the transport's reported state and
//! forces `Reconnecting` when it finds a silently-dead connection. After any
//! disruption the supervisor emits a resync notification: the session view
//! must re-fetch authoritative strokes from the durable store, since
//! broadcast messages sent while disconnected are lost. Connection status
//! drives UI only; it never gates local drawing.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use inkstream_core::BackoffPolicy;

use crate::error::{Error, Result};
use crate::events::BoardEvent;
use crate::transport::{Subscription, Transport, TransportState};

/// Interval between transport health checks.
pub const HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(15);

/// Connection status exposed to the UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Live subscription
    Connected,
    /// Subscription lost; backoff-driven reattempts in flight
    Reconnecting,
    /// Browser offline; no reconnect until the online signal
    Disconnected,
}

enum Command {
    Send(BoardEvent),
    SetOnline(bool),
    Shutdown,
}

enum DriveExit {
    Failure(String),
    Offline,
    Shutdown,
}

enum Wakeup {
    Command(Option<Command>),
    Received(Option<BoardEvent>),
    HealthTick,
}

/// Supervises a transport subscription for one session.
pub struct ReconnectSupervisor {
    transport: Arc<dyn Transport>,
    policy: BackoffPolicy,
    health_interval: Duration,
}

impl ReconnectSupervisor {
    /// Create a supervisor over the given transport.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            policy: BackoffPolicy::default(),
            health_interval: HEALTH_CHECK_INTERVAL,
        }
    }

    /// Override the backoff schedule.
    #[must_use]
    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Override the health-check interval.
    #[must_use]
    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    /// Spawn the supervision loop for a session.
    #[must_use]
    pub fn spawn(self, session_id: Uuid) -> SupervisorHandle {
        let (status_tx, status_rx) = watch::channel(ConnectionStatus::Reconnecting);
        let (event_tx, event_rx) = mpsc::channel(256);
        let (resync_tx, resync_rx) = mpsc::channel(8);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);

        let task = tokio::spawn(self.run(session_id, status_tx, event_tx, resync_tx, cmd_rx));

        SupervisorHandle {
            status: status_rx,
            events: event_rx,
            resync: resync_rx,
            cmd: cmd_tx,
            task,
        }
    }

    async fn run(
        self,
        session_id: Uuid,
        status_tx: watch::Sender<ConnectionStatus>,
        event_tx: mpsc::Sender<BoardEvent>,
        resync_tx: mpsc::Sender<()>,
        mut cmd_rx: mpsc::Receiver<Command>,
    ) {
        let mut attempt: u32 = 0;
        let mut online = true;
        // set after any period without a live subscription; cleared once the
        // resync notification is emitted
        let mut disrupted = false;

        loop {
            if !online {
                let _ = status_tx.send(ConnectionStatus::Disconnected);
                if !wait_for_online(&mut cmd_rx).await {
                    break;
                }
                online = true;
                info!(%session_id, "back online, reconnecting immediately");
                continue;
            }

            match self.transport.connect(session_id).await {
                Ok(mut subscription) => {
                    attempt = 0;
                    let _ = status_tx.send(ConnectionStatus::Connected);
                    if disrupted {
                        // contract with the session view: broadcast-missed
                        // messages are compensated by a durable-store refetch
                        let _ = resync_tx.try_send(());
                        disrupted = false;
                    }
                    info!(%session_id, "subscribed");

                    let exit = self
                        .drive(&mut *subscription, &mut cmd_rx, &event_tx)
                        .await;
                    subscription.close().await;
                    disrupted = true;

                    match exit {
                        DriveExit::Failure(reason) => {
                            attempt += 1;
                            warn!(%session_id, attempt, %reason, "subscription lost");
                            let _ = status_tx.send(ConnectionStatus::Reconnecting);
                            match self.backoff_wait(attempt, &mut cmd_rx, &mut online).await {
                                true => {}
                                false => break,
                            }
                        }
                        DriveExit::Offline => {
                            online = false;
                        }
                        DriveExit::Shutdown => break,
                    }
                }
                Err(e) => {
                    disrupted = true;
                    attempt += 1;
                    warn!(%session_id, attempt, error = %e, "subscribe failed");
                    let _ = status_tx.send(ConnectionStatus::Reconnecting);
                    if !self.backoff_wait(attempt, &mut cmd_rx, &mut online).await {
                        break;
                    }
                }
            }
        }

        let _ = status_tx.send(ConnectionStatus::Disconnected);
        debug!(%session_id, "supervisor stopped");
    }

    async fn drive(
        &self,
        subscription: &mut dyn Subscription,
        cmd_rx: &mut mpsc::Receiver<Command>,
        event_tx: &mpsc::Sender<BoardEvent>,
    ) -> DriveExit {
        let mut health = tokio::time::interval(self.health_interval);
        health.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // the first interval tick fires immediately
        health.tick().await;

        loop {
            let wakeup = tokio::select! {
                command = cmd_rx.recv() => Wakeup::Command(command),
                received = subscription.recv() => Wakeup::Received(received),
                _ = health.tick() => Wakeup::HealthTick,
            };

            match wakeup {
                Wakeup::Command(Some(Command::Send(event))) => {
                    if let Err(e) = subscription.send(&event).await {
                        return DriveExit::Failure(format!("send failed: {e}"));
                    }
                }
                Wakeup::Command(Some(Command::SetOnline(false))) => return DriveExit::Offline,
                Wakeup::Command(Some(Command::SetOnline(true))) => {}
                Wakeup::Command(Some(Command::Shutdown) | None) => return DriveExit::Shutdown,
                Wakeup::Received(Some(event)) => {
                    let _ = event_tx.send(event).await;
                }
                Wakeup::Received(None) => {
                    return DriveExit::Failure("subscription closed".into());
                }
                Wakeup::HealthTick => match subscription.state() {
                    TransportState::Subscribed => {}
                    dead => {
                        // the transport died without signalling; force a
                        // reconnect cycle
                        return DriveExit::Failure(format!("health check found {dead:?}"));
                    }
                },
            }
        }
    }

    /// Wait out the backoff delay. Returns `false` on shutdown. Going
    /// offline or coming online short-circuits the timer; the outer loop
    /// reacts to the updated `online` flag immediately.
    async fn backoff_wait(
        &self,
        attempt: u32,
        cmd_rx: &mut mpsc::Receiver<Command>,
        online: &mut bool,
    ) -> bool {
        let delay = self.policy.delay(attempt);
        debug!(attempt, delay_ms = delay.as_millis() as u64, "reconnect scheduled");
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                () = &mut sleep => return true,
                command = cmd_rx.recv() => match command {
                    Some(Command::SetOnline(false)) => {
                        *online = false;
                        return true;
                    }
                    Some(Command::SetOnline(true)) => return true,
                    Some(Command::Send(event)) => {
                        // best-effort channel: events sent while not
                        // subscribed are lost, resync compensates
                        debug!(kind = event.kind(), "dropping event while reconnecting");
                    }
                    Some(Command::Shutdown) | None => return false,
                },
            }
        }
    }
}

/// Waits for the online signal. Returns `false` on shutdown.
async fn wait_for_online(cmd_rx: &mut mpsc::Receiver<Command>) -> bool {
    loop {
        match cmd_rx.recv().await {
            Some(Command::SetOnline(true)) => return true,
            Some(Command::SetOnline(false)) => {}
            Some(Command::Send(event)) => {
                debug!(kind = event.kind(), "dropping event while offline");
            }
            Some(Command::Shutdown) | None => return false,
        }
    }
}

/// Handle to a spawned supervisor.
pub struct SupervisorHandle {
    status: watch::Receiver<ConnectionStatus>,
    events: mpsc::Receiver<BoardEvent>,
    resync: mpsc::Receiver<()>,
    cmd: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

impl SupervisorHandle {
    /// Current connection status.
    #[must_use]
    pub fn status(&self) -> ConnectionStatus {
        *self.status.borrow()
    }

    /// Watch receiver for status transitions.
    #[must_use]
    pub fn status_watch(&self) -> watch::Receiver<ConnectionStatus> {
        self.status.clone()
    }

    /// Receive the next peer event.
    pub async fn recv_event(&mut self) -> Option<BoardEvent> {
        self.events.recv().await
    }

    /// Wait for the next resync notification. The caller must re-fetch
    /// authoritative state from the durable store when this fires.
    pub async fn resync_needed(&mut self) -> Option<()> {
        self.resync.recv().await
    }

    /// Broadcast an event. Best-effort: events queued while the supervisor
    /// is not connected are dropped, never retried.
    pub async fn send(&self, event: BoardEvent) -> Result<()> {
        self.cmd
            .send(Command::Send(event))
            .await
            .map_err(|_| Error::SupervisorGone)
    }

    /// Feed the browser online/offline signal.
    pub async fn set_online(&self, online: bool) -> Result<()> {
        self.cmd
            .send(Command::SetOnline(online))
            .await
            .map_err(|_| Error::SupervisorGone)
    }

    /// Stop the supervisor and wait for the loop to exit.
    pub async fn shutdown(self) {
        let _ = self.cmd.send(Command::Shutdown).await;
        let _ = self.task.await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use tokio::time::Instant;

    /// Transport that fails the first N connects, then hands out
    /// subscriptions whose death is scripted through a kill switch.
    struct ScriptedTransport {
        fail_first: u32,
        attempts: AtomicU32,
        kill: Mutex<Option<watch::Sender<TransportState>>>,
    }

    impl ScriptedTransport {
        fn new(fail_first: u32) -> Self {
            Self {
                fail_first,
                attempts: AtomicU32::new(0),
                kill: Mutex::new(None),
            }
        }

        fn attempts(&self) -> u32 {
            self.attempts.load(Ordering::SeqCst)
        }

        /// Kill the live subscription. A non-silent subscription observes
        /// this in `recv`; a silent one exposes it only through `state()`.
        fn kill_current(&self) {
            if let Some(tx) = self.kill.lock().unwrap().as_ref() {
                let _ = tx.send(TransportState::Errored);
            }
        }
    }

    struct ScriptedSubscription {
        state: watch::Receiver<TransportState>,
        silent: bool,
    }

    #[async_trait]
    impl Subscription for ScriptedSubscription {
        async fn send(&mut self, _event: &BoardEvent) -> Result<()> {
            Ok(())
        }

        async fn recv(&mut self) -> Option<BoardEvent> {
            if self.silent {
                // silent death: recv never observes the kill switch
                std::future::pending::<()>().await;
                return None;
            }
            let mut state = self.state.clone();
            loop {
                if *state.borrow() != TransportState::Subscribed {
                    return None;
                }
                if state.changed().await.is_err() {
                    return None;
                }
            }
        }

        fn state(&self) -> TransportState {
            *self.state.borrow()
        }

        async fn close(&mut self) {}
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn connect(&self, _session_id: Uuid) -> Result<Box<dyn Subscription>> {
            let attempt = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= self.fail_first {
                return Err(Error::transport("scripted connect failure"));
            }
            let (tx, rx) = watch::channel(TransportState::Subscribed);
            *self.kill.lock().unwrap() = Some(tx);
            Ok(Box::new(ScriptedSubscription {
                state: rx,
                silent: false,
            }))
        }
    }

    /// Variant whose subscriptions die silently: `recv` hangs forever, only
    /// `state()` exposes the failure.
    struct SilentTransport(ScriptedTransport);

    #[async_trait]
    impl Transport for SilentTransport {
        async fn connect(&self, _session_id: Uuid) -> Result<Box<dyn Subscription>> {
            self.0.attempts.fetch_add(1, Ordering::SeqCst);
            let (tx, rx) = watch::channel(TransportState::Subscribed);
            *self.0.kill.lock().unwrap() = Some(tx);
            Ok(Box::new(ScriptedSubscription {
                state: rx,
                silent: true,
            }))
        }
    }

    async fn wait_for_status(handle: &SupervisorHandle, wanted: ConnectionStatus) {
        let mut watch = handle.status_watch();
        loop {
            if *watch.borrow() == wanted {
                return;
            }
            watch.changed().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_first_try() {
        let transport = Arc::new(ScriptedTransport::new(0));
        let handle = ReconnectSupervisor::new(transport.clone()).spawn(Uuid::new_v4());

        wait_for_status(&handle, ConnectionStatus::Connected).await;
        assert_eq!(transport.attempts(), 1);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_schedule_across_failures() {
        let transport = Arc::new(ScriptedTransport::new(3));
        let start = Instant::now();
        let handle = ReconnectSupervisor::new(transport.clone()).spawn(Uuid::new_v4());

        wait_for_status(&handle, ConnectionStatus::Connected).await;
        // three failures: 1s + 2s + 4s of scheduled delay
        assert_eq!(start.elapsed(), Duration::from_secs(7));
        assert_eq!(transport.attempts(), 4);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_counter_resets_after_subscribe() {
        let transport = Arc::new(ScriptedTransport::new(2));
        let mut handle = ReconnectSupervisor::new(transport.clone()).spawn(Uuid::new_v4());

        // 1s + 2s of backoff, then connected
        wait_for_status(&handle, ConnectionStatus::Connected).await;
        handle.resync_needed().await.unwrap();

        // kill the live subscription: the next delay must be back to 1s,
        // proving the counter reset on subscribe
        let start = Instant::now();
        transport.kill_current();
        wait_for_status(&handle, ConnectionStatus::Reconnecting).await;
        wait_for_status(&handle, ConnectionStatus::Connected).await;
        assert_eq!(start.elapsed(), Duration::from_secs(1));

        // reconnection after a disruption requires a durable-store refetch
        handle.resync_needed().await.unwrap();
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_offline_forces_disconnected_and_online_reconnects_immediately() {
        let transport = Arc::new(ScriptedTransport::new(0));
        let handle = ReconnectSupervisor::new(transport.clone()).spawn(Uuid::new_v4());
        wait_for_status(&handle, ConnectionStatus::Connected).await;

        handle.set_online(false).await.unwrap();
        wait_for_status(&handle, ConnectionStatus::Disconnected).await;

        let start = Instant::now();
        handle.set_online(true).await.unwrap();
        wait_for_status(&handle, ConnectionStatus::Connected).await;
        // online short-circuits any backoff: reconnect is immediate
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(transport.attempts(), 2);
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_detects_silent_death() {
        let inner = ScriptedTransport::new(0);
        let transport = Arc::new(SilentTransport(inner));
        let handle = ReconnectSupervisor::new(transport.clone()).spawn(Uuid::new_v4());
        wait_for_status(&handle, ConnectionStatus::Connected).await;

        let start = Instant::now();
        transport.0.kill_current();
        wait_for_status(&handle, ConnectionStatus::Reconnecting).await;
        // only the 15s health tick can have noticed
        assert!(start.elapsed() <= HEALTH_CHECK_INTERVAL);
        assert!(start.elapsed() > Duration::ZERO);

        wait_for_status(&handle, ConnectionStatus::Connected).await;
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_while_reconnecting_is_dropped_not_queued() {
        let transport = Arc::new(ScriptedTransport::new(u32::MAX));
        let handle = ReconnectSupervisor::new(transport).spawn(Uuid::new_v4());
        wait_for_status(&handle, ConnectionStatus::Reconnecting).await;

        // accepted but dropped; the supervisor stays alive
        handle
            .send(BoardEvent::nuke(inkstream_canvas::NukeEvent::new(None, "laser")))
            .await
            .unwrap();
        assert_eq!(handle.status(), ConnectionStatus::Reconnecting);
        handle.shutdown().await;
    }
}
