//! In-process message broker
//!
//! Queues deliver in peek-lock mode:
//!
//! ```text
//! send ──► ready ──receive──► locked ──complete──► (gone)
//!            ▲                  │
//!            └──lock expiry─────┤
//!            └──abandon─────────┘
//!                               └──dead_letter / too many deliveries──► dead letters
//! ```
//!
//! A message whose delivery count would exceed `max_delivery_count` is moved
//! to the dead-letter sub-queue instead of being delivered again. Messages
//! older than `default_ttl` are dropped before delivery. Bodies larger than
//! [`BrokerLimits::max_message_bytes`] are rejected at send time, as a hosted
//! broker would.
//!
//! `receive` blocks on a condition variable until a message is sent, a lock
//! expires, or the wait elapses. No polling loop is involved.

use chrono::{DateTime, Utc};
use cirrus_core::{
    BrokerNamespace, BrokerQueue, Error, LockToken, QueueOptions, ReceivedMessage, Result,
};
use dashmap::DashMap;
use parking_lot::{Condvar, Mutex};
use rustc_hash::FxHashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

/// Hard limits enforced by the broker
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrokerLimits {
    /// Largest accepted message body
    pub max_message_bytes: usize,
}

impl BrokerLimits {
    /// Standard-tier message size limit (256 KiB)
    pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 256 * 1024;
}

impl Default for BrokerLimits {
    fn default() -> Self {
        Self {
            max_message_bytes: Self::DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredMessage {
    message_id: Uuid,
    body: Vec<u8>,
    enqueued_at: DateTime<Utc>,
    enqueued_instant: Instant,
    delivery_count: u32,
}

#[derive(Debug)]
struct LockedMessage {
    message: StoredMessage,
    locked_until: Instant,
}

#[derive(Debug)]
struct DeadLetter {
    message: StoredMessage,
    reason: String,
}

/// Snapshot of a message parked in a queue's dead-letter list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeadLetteredMessage {
    pub message_id: Uuid,
    pub body: Vec<u8>,
    pub enqueued_at: DateTime<Utc>,
    pub delivery_count: u32,
    pub reason: String,
}

impl From<&DeadLetter> for DeadLetteredMessage {
    fn from(d: &DeadLetter) -> Self {
        Self {
            message_id: d.message.message_id,
            body: d.message.body.clone(),
            enqueued_at: d.message.enqueued_at,
            delivery_count: d.message.delivery_count,
            reason: d.reason.clone(),
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    ready: VecDeque<StoredMessage>,
    locked: FxHashMap<LockToken, LockedMessage>,
    dead_letters: Vec<DeadLetter>,
}

/// One broker queue
#[derive(Debug)]
pub struct MemoryQueue {
    name: String,
    options: QueueOptions,
    state: Mutex<QueueState>,
    available: Condvar,
}

impl MemoryQueue {
    fn new(name: &str, options: QueueOptions) -> Self {
        Self {
            name: name.to_string(),
            options,
            state: Mutex::new(QueueState::default()),
            available: Condvar::new(),
        }
    }

    /// Options the queue was created with
    pub fn options(&self) -> &QueueOptions {
        &self.options
    }

    /// Return expired locks to the front of the queue and drop expired messages.
    fn reclaim(&self, state: &mut QueueState, now: Instant) {
        let expired: Vec<LockToken> = state
            .locked
            .iter()
            .filter(|(_, locked)| locked.locked_until <= now)
            .map(|(token, _)| *token)
            .collect();
        for token in expired {
            if let Some(locked) = state.locked.remove(&token) {
                tracing::debug!(
                    queue = %self.name,
                    message_id = %locked.message.message_id,
                    delivery_count = locked.message.delivery_count,
                    "message lock expired, redelivering"
                );
                state.ready.push_front(locked.message);
            }
        }

        if let Some(ttl) = self.options.default_ttl {
            let before = state.ready.len();
            state
                .ready
                .retain(|m| now.duration_since(m.enqueued_instant) < ttl);
            let dropped = before - state.ready.len();
            if dropped > 0 {
                tracing::debug!(queue = %self.name, dropped, "expired messages dropped");
            }
        }
    }

    fn send(&self, body: Vec<u8>) {
        let message = StoredMessage {
            message_id: Uuid::new_v4(),
            body,
            enqueued_at: Utc::now(),
            enqueued_instant: Instant::now(),
            delivery_count: 0,
        };
        self.state.lock().ready.push_back(message);
        self.available.notify_one();
    }

    fn receive(&self, wait: Duration) -> Option<ReceivedMessage> {
        let start = Instant::now();
        let deadline = start
            .checked_add(wait)
            .unwrap_or_else(|| start + Duration::from_secs(365 * 24 * 3600));
        let mut state = self.state.lock();
        loop {
            let now = Instant::now();
            self.reclaim(&mut state, now);

            while let Some(mut message) = state.ready.pop_front() {
                message.delivery_count += 1;
                if message.delivery_count > self.options.max_delivery_count {
                    tracing::warn!(
                        queue = %self.name,
                        message_id = %message.message_id,
                        deliveries = message.delivery_count - 1,
                        "max delivery count exceeded, dead-lettering"
                    );
                    state.dead_letters.push(DeadLetter {
                        message,
                        reason: "MaxDeliveryCountExceeded".to_string(),
                    });
                    continue;
                }

                let lock_token = LockToken::new();
                let received = ReceivedMessage {
                    message_id: message.message_id,
                    body: message.body.clone(),
                    lock_token,
                    delivery_count: message.delivery_count,
                    enqueued_at: message.enqueued_at,
                };
                state.locked.insert(
                    lock_token,
                    LockedMessage {
                        message,
                        locked_until: now + self.options.lock_duration,
                    },
                );
                return Some(received);
            }

            if now >= deadline {
                return None;
            }

            let wake = state
                .locked
                .values()
                .map(|l| l.locked_until)
                .min()
                .map_or(deadline, |expiry| expiry.min(deadline));
            self.available.wait_until(&mut state, wake);
        }
    }

    fn take_locked(&self, state: &mut QueueState, lock: &LockToken) -> Result<StoredMessage> {
        state
            .locked
            .remove(lock)
            .map(|l| l.message)
            .ok_or_else(|| {
                Error::Transport(format!(
                    "message lock {} lost on queue {}",
                    lock, self.name
                ))
            })
    }

    fn complete(&self, lock: &LockToken) -> Result<()> {
        let mut state = self.state.lock();
        self.reclaim(&mut state, Instant::now());
        self.take_locked(&mut state, lock).map(|_| ())
    }

    fn abandon(&self, lock: &LockToken) -> Result<()> {
        let mut state = self.state.lock();
        self.reclaim(&mut state, Instant::now());
        let message = self.take_locked(&mut state, lock)?;
        state.ready.push_front(message);
        drop(state);
        self.available.notify_one();
        Ok(())
    }

    fn dead_letter(&self, lock: &LockToken, reason: &str) -> Result<()> {
        let mut state = self.state.lock();
        self.reclaim(&mut state, Instant::now());
        let message = self.take_locked(&mut state, lock)?;
        state.dead_letters.push(DeadLetter {
            message,
            reason: reason.to_string(),
        });
        Ok(())
    }

    fn message_count(&self) -> u64 {
        let mut state = self.state.lock();
        self.reclaim(&mut state, Instant::now());
        (state.ready.len() + state.locked.len()) as u64
    }

    fn dead_letter_count(&self) -> u64 {
        self.state.lock().dead_letters.len() as u64
    }

    /// Reasons recorded for each dead-lettered message, oldest first
    pub fn dead_letter_reasons(&self) -> Vec<String> {
        self.state
            .lock()
            .dead_letters
            .iter()
            .map(|d| d.reason.clone())
            .collect()
    }

    /// Copies of every dead-lettered message, oldest first
    pub fn dead_letters(&self) -> Vec<DeadLetteredMessage> {
        self.state
            .lock()
            .dead_letters
            .iter()
            .map(DeadLetteredMessage::from)
            .collect()
    }
}

type QueueMap = DashMap<String, Arc<MemoryQueue>>;

/// Broker namespace held in process memory
#[derive(Debug, Default)]
pub struct MemoryNamespace {
    queues: Arc<QueueMap>,
    limits: BrokerLimits,
}

impl MemoryNamespace {
    /// Create an empty namespace with default limits
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty namespace with explicit limits
    pub fn with_limits(limits: BrokerLimits) -> Self {
        Self {
            queues: Arc::new(DashMap::new()),
            limits,
        }
    }

    /// Limits enforced on every queue
    pub fn limits(&self) -> BrokerLimits {
        self.limits
    }

    /// Direct access to a queue, for inspection
    pub fn queue(&self, name: &str) -> Option<Arc<MemoryQueue>> {
        self.queues.get(name).map(|q| Arc::clone(q.value()))
    }

    /// Number of queues
    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }
}

impl BrokerNamespace for MemoryNamespace {
    fn queue_exists(&self, name: &str) -> Result<bool> {
        Ok(self.queues.contains_key(name))
    }

    fn create_queue(&self, name: &str, options: &QueueOptions) -> Result<()> {
        use dashmap::mapref::entry::Entry;

        match self.queues.entry(name.to_string()) {
            Entry::Occupied(_) => Err(Error::Conflict(format!("queue {} already exists", name))),
            Entry::Vacant(slot) => {
                slot.insert(Arc::new(MemoryQueue::new(name, options.clone())));
                tracing::debug!(queue = name, ttl = ?options.default_ttl, "queue created");
                Ok(())
            }
        }
    }

    fn delete_queue(&self, name: &str) -> Result<bool> {
        Ok(self.queues.remove(name).is_some())
    }

    fn queue_client(&self, name: &str) -> Result<Arc<dyn BrokerQueue>> {
        Ok(Arc::new(MemoryQueueClient {
            name: name.to_string(),
            queues: Arc::clone(&self.queues),
            limits: self.limits,
        }))
    }
}

/// Client for one queue of a [`MemoryNamespace`]
///
/// Resolves the queue on every call, so a client opened before the queue
/// exists starts working once it is created.
pub struct MemoryQueueClient {
    name: String,
    queues: Arc<QueueMap>,
    limits: BrokerLimits,
}

impl MemoryQueueClient {
    fn resolve(&self) -> Result<Arc<MemoryQueue>> {
        self.queues
            .get(&self.name)
            .map(|q| Arc::clone(q.value()))
            .ok_or_else(|| Error::NotFound(format!("queue {}", self.name)))
    }
}

impl BrokerQueue for MemoryQueueClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, body: Vec<u8>) -> Result<()> {
        if body.len() > self.limits.max_message_bytes {
            return Err(Error::Transport(format!(
                "message of {} bytes exceeds the {} byte limit of queue {}",
                body.len(),
                self.limits.max_message_bytes,
                self.name
            )));
        }
        self.resolve()?.send(body);
        Ok(())
    }

    fn receive(&self, wait: Duration) -> Result<Option<ReceivedMessage>> {
        Ok(self.resolve()?.receive(wait))
    }

    fn complete(&self, lock: &LockToken) -> Result<()> {
        self.resolve()?.complete(lock)
    }

    fn abandon(&self, lock: &LockToken) -> Result<()> {
        self.resolve()?.abandon(lock)
    }

    fn dead_letter(&self, lock: &LockToken, reason: &str) -> Result<()> {
        self.resolve()?.dead_letter(lock, reason)
    }

    fn message_count(&self) -> Result<u64> {
        Ok(self.resolve()?.message_count())
    }

    fn dead_letter_count(&self) -> Result<u64> {
        Ok(self.resolve()?.dead_letter_count())
    }
}
