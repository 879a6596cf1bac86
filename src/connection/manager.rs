// ConnectionManager - owns the single logical connection to the tap stream
//
// State machine:
//   Disconnected -> Connecting -> Connected
//   Connected --(abnormal close / transport error)--> Reconnecting -> Connecting
//   Connecting --(handshake failed)--> Reconnecting | Failed
//   any --(caller disconnect)--> Disconnected
//   Connected --(server close 1000)--> Disconnected
//
// Everything runs inside one ScheduledTask: the handshake, the frame pump,
// the throughput ticker and the backoff timer all race the task's cancel
// token, so `disconnect().await` returning means no callback fires again.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use super::backoff::ReconnectPolicy;
use super::schedule::{sleep_or_cancel, CancelToken, ScheduledTask, TimerOutcome};
use super::throughput::ThroughputWindow;
use super::transport::{Frame, FrameStream, Transport, NORMAL_CLOSURE};
use super::ConnectionState;
use crate::config::{ReconnectConfig, ThroughputConfig};
use crate::error::{log_connection_error, ConnectionError, ErrorCode};
use crate::protocol::{classify, classify_bytes, dispatch, Classification, TapHandler};
use crate::telemetry::TelemetryHub;

/// Callbacks from the connection manager
///
/// Decoded messages arrive through the [`TapHandler`] supertrait, strictly
/// serialized and in arrival order. All callbacks run on the manager task
/// and must not block.
pub trait ConnectionEvents: TapHandler + Send + Sync {
    /// A handshake completed; once per established connection.
    fn on_connect(&self) {}

    /// An established connection ended; once per `on_connect`.
    fn on_disconnect(&self) {}

    /// Decoded messages per second, once per throughput tick while connected.
    fn on_throughput(&self, messages_per_sec: f64);

    fn on_state_change(&self, _state: &ConnectionState) {}

    /// The retry budget is spent and the manager has stopped.
    fn on_retries_exhausted(&self, _attempts: u32) {}
}

/// How one connected session ended
#[derive(Debug)]
enum SessionEnd {
    /// Caller asked to stop; close frame already sent
    Cancelled,
    /// Server closed with 1000
    ClosedNormally,
    /// Anything else; triggers the reconnect path
    Lost(String),
}

/// Shared context of the session task
struct SessionContext {
    transport: Arc<dyn Transport>,
    events: Arc<dyn ConnectionEvents>,
    telemetry: Arc<TelemetryHub>,
    state: Arc<watch::Sender<ConnectionState>>,
    reconnect: ReconnectConfig,
    tick: Duration,
}

impl SessionContext {
    fn set_state(&self, next: ConnectionState) {
        let changed = self.state.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                *current = next.clone();
                true
            }
        });
        if changed {
            debug!("[ConnectionManager] State -> {}", next);
            self.telemetry.record_state(next.clone());
            self.events.on_state_change(&next);
        }
    }

    async fn run(self, token: CancelToken) {
        let mut policy = ReconnectPolicy::from_config(&self.reconnect);
        let endpoint = self.transport.endpoint();

        loop {
            self.set_state(ConnectionState::Connecting);
            let connected = tokio::select! {
                biased;
                _ = token.cancelled() => {
                    self.set_state(ConnectionState::Disconnected);
                    return;
                }
                result = self.transport.connect() => result,
            };

            match connected {
                Ok(mut stream) => {
                    policy.reset();
                    info!("[ConnectionManager] Connected to {}", endpoint);
                    self.set_state(ConnectionState::Connected);
                    self.events.on_connect();

                    let end = self.pump(stream.as_mut(), &token).await;
                    self.events.on_disconnect();

                    match end {
                        SessionEnd::Cancelled => {
                            info!("[ConnectionManager] Disconnected by caller");
                            self.set_state(ConnectionState::Disconnected);
                            return;
                        }
                        SessionEnd::ClosedNormally => {
                            info!("[ConnectionManager] Server closed the connection normally");
                            self.set_state(ConnectionState::Disconnected);
                            return;
                        }
                        SessionEnd::Lost(reason) => {
                            warn!("[ConnectionManager] Connection lost: {}", reason);
                        }
                    }
                }
                Err(err) => log_connection_error(&err, "connect"),
            }

            match policy.next_retry() {
                Some((attempt, delay)) => {
                    let delay_ms = delay.as_millis() as u64;
                    info!(
                        "[ConnectionManager] Reconnecting in {}ms (attempt {}/{})",
                        delay_ms,
                        attempt,
                        policy.max_attempts()
                    );
                    self.set_state(ConnectionState::Reconnecting { attempt, delay_ms });
                    self.telemetry.record_reconnect_scheduled(attempt, delay_ms);

                    if sleep_or_cancel(delay, &token).await == TimerOutcome::Cancelled {
                        self.set_state(ConnectionState::Disconnected);
                        return;
                    }
                }
                None => {
                    let attempts = policy.attempt();
                    log_connection_error(
                        &ConnectionError::RetriesExhausted { attempts },
                        "reconnect",
                    );
                    self.set_state(ConnectionState::Failed { attempts });
                    self.telemetry.record_reconnect_exhausted(attempts);
                    self.events.on_retries_exhausted(attempts);
                    return;
                }
            }
        }
    }

    /// Pump frames until the session ends. The throughput ticker is local, so
    /// it restarts with every connection.
    async fn pump(&self, stream: &mut dyn FrameStream, token: &CancelToken) -> SessionEnd {
        let opened = Instant::now();
        let mut window = ThroughputWindow::new(opened);
        let mut ticker = interval_at(opened + self.tick, self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    if let Err(err) = stream.close(NORMAL_CLOSURE).await {
                        debug!("[ConnectionManager] Close frame not delivered: {}", err.message());
                    }
                    return SessionEnd::Cancelled;
                }
                now = ticker.tick() => {
                    let rate = window.take_rate(now);
                    self.telemetry.record_throughput(rate);
                    self.events.on_throughput(rate);
                }
                frame = stream.next_frame() => match frame {
                    Some(Ok(Frame::Text(text))) => self.deliver(classify(&text), &mut window),
                    Some(Ok(Frame::Binary(bytes))) => {
                        self.deliver(classify_bytes(&bytes), &mut window)
                    }
                    Some(Ok(Frame::Close { code: Some(NORMAL_CLOSURE), .. })) => {
                        return SessionEnd::ClosedNormally;
                    }
                    Some(Ok(Frame::Close { code, reason })) => {
                        let code = code.map_or_else(|| "none".to_string(), |c| c.to_string());
                        return SessionEnd::Lost(format!("closed with code {} '{}'", code, reason));
                    }
                    Some(Err(err)) => {
                        log_connection_error(&err, "session");
                        return SessionEnd::Lost(err.message());
                    }
                    None => return SessionEnd::Lost("stream ended without close frame".to_string()),
                },
            }
        }
    }

    fn deliver(&self, classification: Classification, window: &mut ThroughputWindow) {
        match &classification {
            Classification::Decoded(_) => window.record(),
            Classification::SchemaInvalid { reason } => {
                debug!("[ConnectionManager] Dropping undecodable frame: {}", reason)
            }
            Classification::UnknownTopic { topic } => {
                warn!("[ConnectionManager] Dropping frame with unknown topic '{}'", topic)
            }
        }
        self.telemetry.record_classification(&classification);
        dispatch(classification, self.events.as_ref());
    }
}

/// Owner of the connection lifecycle
///
/// Must be started from within a tokio runtime.
pub struct ConnectionManager {
    transport: Arc<dyn Transport>,
    events: Arc<dyn ConnectionEvents>,
    telemetry: Arc<TelemetryHub>,
    reconnect: ReconnectConfig,
    throughput: ThroughputConfig,
    state: Arc<watch::Sender<ConnectionState>>,
    task: Mutex<Option<ScheduledTask>>,
}

impl ConnectionManager {
    pub fn new(
        transport: Arc<dyn Transport>,
        events: Arc<dyn ConnectionEvents>,
        telemetry: Arc<TelemetryHub>,
    ) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            transport,
            events,
            telemetry,
            reconnect: ReconnectConfig::default(),
            throughput: ThroughputConfig::default(),
            state: Arc::new(state),
            task: Mutex::new(None),
        }
    }

    pub fn with_reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = reconnect;
        self
    }

    pub fn with_throughput(mut self, throughput: ThroughputConfig) -> Self {
        self.throughput = throughput;
        self
    }

    /// Spawn the session task. A manager that ended in `Failed` or
    /// `Disconnected` can be started again; the retry budget starts fresh.
    pub fn start(&self) -> Result<(), ConnectionError> {
        let mut task = self.lock_task();
        if task.as_ref().is_some_and(|running| !running.is_finished()) {
            return Err(ConnectionError::AlreadyRunning);
        }

        info!(
            "[ConnectionManager] Starting session with {}",
            self.transport.endpoint()
        );
        let context = SessionContext {
            transport: Arc::clone(&self.transport),
            events: Arc::clone(&self.events),
            telemetry: Arc::clone(&self.telemetry),
            state: Arc::clone(&self.state),
            reconnect: self.reconnect.clone(),
            tick: self.throughput.tick(),
        };
        *task = Some(ScheduledTask::spawn(move |token| context.run(token)));
        Ok(())
    }

    /// Close the connection with code 1000 and cancel every pending timer.
    ///
    /// Resolves after the session task has exited; no callback fires after.
    pub async fn disconnect(&self) -> Result<(), ConnectionError> {
        let task = self.lock_task().take().ok_or(ConnectionError::NotRunning)?;
        task.cancel_and_wait().await;

        // a task that had already ended in Failed still leaves the caller disconnected
        let changed = self.state.send_if_modified(|current| {
            if *current == ConnectionState::Disconnected {
                false
            } else {
                *current = ConnectionState::Disconnected;
                true
            }
        });
        if changed {
            self.telemetry.record_state(ConnectionState::Disconnected);
            self.events.on_state_change(&ConnectionState::Disconnected);
        }
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// True while the session task is alive (connected, connecting or backing off)
    pub fn is_running(&self) -> bool {
        self.lock_task()
            .as_ref()
            .is_some_and(|running| !running.is_finished())
    }

    fn lock_task(&self) -> MutexGuard<'_, Option<ScheduledTask>> {
        self.task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        // best effort; callers wanting a guarantee await disconnect()
        if let Some(task) = self.lock_task().take() {
            task.cancel();
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
