//! Request/response correlation.
//!
//! The caller registers a single-use slot for a request id *before* sending
//! the request; the background reader delivers the matching response into that
//! slot and removes it. Responses for ids nobody waits on are dropped.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::{Mutex, oneshot};
use tracing::debug;

use crate::error::LspError;

use super::LspResult;
use super::message::Response;

type Delivery = LspResult<Response>;

#[derive(Debug, Default)]
struct State {
    pending: HashMap<u64, oneshot::Sender<Delivery>>,
    /// Set once the reader has stopped; no response can arrive after this.
    closed: Option<String>,
}

/// Table of in-flight requests keyed by id.
#[derive(Debug)]
pub struct Correlator {
    next_id: AtomicU64,
    state: Mutex<State>,
}

impl Default for Correlator {
    fn default() -> Self {
        Self::new()
    }
}

impl Correlator {
    /// Creates an empty table. The first id handed out is 1.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            state: Mutex::new(State::default()),
        }
    }

    /// Returns a fresh id. Never returns the same id twice.
    pub fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Registers a waiter for `id`.
    ///
    /// # Errors
    ///
    /// Returns [`LspError::ServerExited`] if the reader has already stopped,
    /// and [`LspError::RequestFailed`] if `id` already has a waiter.
    pub async fn register(&self, id: u64) -> LspResult<PendingResponse> {
        let mut state = self.state.lock().await;
        if let Some(reason) = &state.closed {
            return Err(LspError::ServerExited(reason.clone()));
        }
        if state.pending.contains_key(&id) {
            return Err(LspError::RequestFailed(format!(
                "request id {id} is already in flight"
            )));
        }

        let (sender, receiver) = oneshot::channel();
        state.pending.insert(id, sender);
        Ok(PendingResponse { id, receiver })
    }

    /// Routes a response to its waiter and frees the slot.
    ///
    /// Returns `false` if no waiter was registered for the response's id.
    pub async fn deliver(&self, response: Response) -> bool {
        let Some(id) = response.numeric_id() else {
            debug!(id = %response.id, "dropping response with foreign id");
            return false;
        };

        let sender = self.state.lock().await.pending.remove(&id);
        match sender {
            Some(sender) => {
                if sender.send(Ok(response)).is_err() {
                    debug!(id, "waiter went away before delivery");
                }
                true
            }
            None => {
                debug!(id, "dropping response for unknown request");
                false
            }
        }
    }

    /// Forgets the waiter for `id`, e.g. after a timeout.
    pub async fn cancel(&self, id: u64) {
        self.state.lock().await.pending.remove(&id);
    }

    /// Wakes every waiter with [`LspError::ServerExited`] and refuses new ones.
    pub async fn fail_all(&self, reason: &str) {
        let mut state = self.state.lock().await;
        if state.closed.is_none() {
            state.closed = Some(reason.to_string());
        }
        for (id, sender) in state.pending.drain() {
            debug!(id, reason, "failing pending request");
            let _ = sender.send(Err(LspError::ServerExited(reason.to_string())));
        }
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending.len()
    }
}

/// Single-use handle for one response.
#[derive(Debug)]
pub struct PendingResponse {
    id: u64,
    receiver: oneshot::Receiver<Delivery>,
}

impl PendingResponse {
    /// The request id this handle waits on.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits until the response is delivered. No timeout is applied here.
    ///
    /// # Errors
    ///
    /// Returns [`LspError::ServerExited`] if the reader stopped first.
    pub async fn wait(self) -> LspResult<Response> {
        self.receiver.await.unwrap_or_else(|_| {
            Err(LspError::ServerExited(
                "response channel dropped".to_string(),
            ))
        })
    }
}
