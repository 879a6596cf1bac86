//! In-memory transport replaying scripted connection attempts.
//!
//! Each call to `connect` consumes the next [`ConnectScript`]; once the queue
//! is empty every further attempt is refused. Delays use tokio's clock, so
//! tests on a paused runtime advance through them instantly.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;

use crate::connection::{Frame, FrameStream, Transport};
use crate::error::ConnectionError;

/// One step of a scripted session
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Text(String),
    Binary(Vec<u8>),
    /// Server-initiated close with the given code
    Close(u16),
    /// Fail the established stream
    Error(String),
    /// Wait before the next step
    Delay(Duration),
    /// Stay open until the client closes
    Hold,
}

/// Outcome of one connection attempt
#[derive(Debug, Clone)]
pub enum ConnectScript {
    Refuse(String),
    /// Steps replayed in order; running out ends the stream without a close frame
    Session(Vec<ScriptStep>),
}

#[derive(Debug, Default)]
pub struct ScriptedTransport {
    scripts: Mutex<VecDeque<ConnectScript>>,
    connects: AtomicUsize,
    sent_closes: Arc<Mutex<Vec<u16>>>,
}

impl ScriptedTransport {
    pub fn new(scripts: Vec<ConnectScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            ..Self::default()
        }
    }

    /// Transport that refuses every attempt
    pub fn refusing() -> Self {
        Self::default()
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    /// Close codes sent by the client, across all sessions
    pub fn sent_closes(&self) -> Vec<u16> {
        self.sent_closes.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self) -> Result<Box<dyn FrameStream>, ConnectionError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let script = self
            .scripts
            .lock()
            .ok()
            .and_then(|mut scripts| scripts.pop_front());

        match script {
            Some(ConnectScript::Session(steps)) => Ok(Box::new(ScriptedStream {
                steps: steps.into(),
                deadline: None,
                closed: false,
                sent_closes: Arc::clone(&self.sent_closes),
            })),
            Some(ConnectScript::Refuse(reason)) => Err(ConnectionError::ConnectFailed { reason }),
            None => Err(ConnectionError::ConnectFailed {
                reason: "script exhausted".to_string(),
            }),
        }
    }

    fn endpoint(&self) -> String {
        "scripted://tap".to_string()
    }
}

struct ScriptedStream {
    steps: VecDeque<ScriptStep>,
    /// Deadline of the delay in progress, kept across cancelled polls
    deadline: Option<Instant>,
    closed: bool,
    sent_closes: Arc<Mutex<Vec<u16>>>,
}

#[async_trait]
impl FrameStream for ScriptedStream {
    async fn next_frame(&mut self) -> Option<Result<Frame, ConnectionError>> {
        loop {
            if self.closed {
                return None;
            }

            let delay = match self.steps.front() {
                None => return None,
                Some(ScriptStep::Hold) => {
                    std::future::pending::<()>().await;
                    continue;
                }
                Some(ScriptStep::Delay(delay)) => Some(*delay),
                Some(_) => None,
            };

            if let Some(delay) = delay {
                let deadline = *self.deadline.get_or_insert_with(|| Instant::now() + delay);
                tokio::time::sleep_until(deadline).await;
                self.deadline = None;
                self.steps.pop_front();
                continue;
            }

            let frame = match self.steps.pop_front()? {
                ScriptStep::Text(text) => Ok(Frame::Text(text)),
                ScriptStep::Binary(bytes) => Ok(Frame::Binary(bytes)),
                ScriptStep::Close(code) => Ok(Frame::Close {
                    code: Some(code),
                    reason: String::new(),
                }),
                ScriptStep::Error(details) => Err(ConnectionError::Transport { details }),
                ScriptStep::Delay(_) | ScriptStep::Hold => continue,
            };
            return Some(frame);
        }
    }

    async fn close(&mut self, code: u16) -> Result<(), ConnectionError> {
        self.closed = true;
        if let Ok(mut closes) = self.sent_closes.lock() {
            closes.push(code);
        }
        Ok(())
    }
}
