use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use castwire_frame::{CastMessage, BROADCAST_DESTINATION};
use serde::Serialize;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::connection::Connection;
use crate::error::{ChannelError, Result};
use crate::payload::{stamp_request_id, PayloadHeaders};

/// Listener callback. Runs on the dispatch path and must not block.
pub type Callback = Arc<dyn Fn(&CastMessage) + Send + Sync>;

/// Handle returned by [`Channel::on_message`], used to remove the listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// One namespace between a fixed sender and destination on a [`Connection`].
///
/// A channel sends JSON payloads, correlates request/reply pairs through the
/// `requestId` header, and fans inbound messages out to listeners keyed by
/// `type` or `responseType`. Clones share the same state.
#[derive(Clone)]
pub struct Channel {
    inner: Arc<ChannelInner>,
}

/// Non-owning handle to a [`Channel`], for callbacks that must not keep it alive.
#[derive(Clone)]
pub struct WeakChannel {
    inner: Weak<ChannelInner>,
}

struct ChannelInner {
    connection: Connection,
    source_id: String,
    destination_id: String,
    namespace: String,
    next_request_id: AtomicI64,
    next_listener_id: AtomicU64,
    in_flight: Mutex<InFlight>,
    listeners: Mutex<Vec<Listener>>,
}

#[derive(Default)]
struct InFlight {
    closed: Option<String>,
    waiters: HashMap<i64, oneshot::Sender<CastMessage>>,
}

struct Listener {
    id: ListenerId,
    key: String,
    callback: Callback,
}

impl Channel {
    /// Create a channel and bind it to `connection`'s dispatch list.
    pub fn new(
        connection: &Connection,
        source_id: impl Into<String>,
        destination_id: impl Into<String>,
        namespace: impl Into<String>,
    ) -> Self {
        let channel = Self {
            inner: Arc::new(ChannelInner {
                connection: connection.clone(),
                source_id: source_id.into(),
                destination_id: destination_id.into(),
                namespace: namespace.into(),
                next_request_id: AtomicI64::new(1),
                next_listener_id: AtomicU64::new(1),
                in_flight: Mutex::new(InFlight::default()),
                listeners: Mutex::new(Vec::new()),
            }),
        };
        connection.bind(&channel);
        channel
    }

    /// Serialize `payload` as JSON and send it. No reply is tracked.
    pub async fn send<T: Serialize + ?Sized>(&self, payload: &T) -> Result<()> {
        let text = serde_json::to_string(payload)?;
        self.send_text(text).await
    }

    /// Send `payload` with a fresh `requestId` and wait for the reply carrying it.
    pub async fn request<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        timeout: Duration,
    ) -> Result<CastMessage> {
        self.request_with_cancel(payload, timeout, &CancellationToken::new())
            .await
    }

    /// Like [`request`](Self::request), also giving up when `cancel` fires.
    ///
    /// The in-flight entry is removed exactly once: by the dispatcher when the
    /// reply arrives, or here on timeout, cancellation, send failure, or when
    /// the returned future is dropped. A reply arriving after that is dropped.
    pub async fn request_with_cancel<T: Serialize + ?Sized>(
        &self,
        payload: &T,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<CastMessage> {
        let deadline = tokio::time::Instant::now() + timeout;
        let mut document = serde_json::to_value(payload)?;
        let request_id = self.inner.next_request_id.fetch_add(1, Ordering::Relaxed);
        stamp_request_id(&mut document, request_id)?;
        let text = serde_json::to_string(&document)?;

        let mut pending = self.inner.register(request_id)?;
        // The deadline and cancellation also bound the write, which can wait
        // on other senders or on a peer that stopped reading.
        let sent = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ChannelError::Cancelled),
            _ = tokio::time::sleep_until(deadline) => Err(ChannelError::Timeout(timeout)),
            sent = self.send_text(text) => sent,
        };
        if let Err(e) = sent {
            debug!(namespace = %self.inner.namespace, request_id, error = %e, "request not sent");
            return Err(e);
        }
        debug!(namespace = %self.inner.namespace, request_id, "request sent");

        let failure = tokio::select! {
            reply = &mut pending.reply => {
                return reply.map_err(|_| self.inner.disconnected());
            }
            _ = tokio::time::sleep_until(deadline) => ChannelError::Timeout(timeout),
            _ = cancel.cancelled() => ChannelError::Cancelled,
        };

        if self.inner.forget(request_id) {
            debug!(namespace = %self.inner.namespace, request_id, error = %failure, "request abandoned");
            return Err(failure);
        }
        // The dispatcher or a close removed the entry first, and both act
        // under the table lock, so the outcome is already in the slot.
        pending
            .reply
            .try_recv()
            .map_err(|_| self.inner.disconnected())
    }

    /// Register `callback` for messages whose `type` or `responseType` is `key`.
    ///
    /// Listeners run in registration order on the dispatch path.
    pub fn on_message<F>(&self, key: impl Into<String>, callback: F) -> ListenerId
    where
        F: Fn(&CastMessage) + Send + Sync + 'static,
    {
        let id = ListenerId(self.inner.next_listener_id.fetch_add(1, Ordering::Relaxed));
        self.inner.lock_listeners().push(Listener {
            id,
            key: key.into(),
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.lock_listeners();
        let before = listeners.len();
        listeners.retain(|l| l.id != id);
        listeners.len() != before
    }

    /// Route one inbound message through this channel.
    ///
    /// Messages not addressed to this channel are ignored, as are payloads
    /// with neither `type` nor `responseType`. A nonzero `requestId` completes
    /// the matching request; matching listeners fire either way.
    pub fn dispatch(&self, message: &CastMessage, headers: &PayloadHeaders) {
        if !self.accepts(message) {
            trace!(
                namespace = %message.namespace,
                source = %message.source_id,
                destination = %message.destination_id,
                "not addressed to channel"
            );
            return;
        }

        if !headers.is_routable() {
            warn!(
                namespace = %message.namespace,
                source = %message.source_id,
                "dropping payload without type or responseType"
            );
            return;
        }

        if let Some(request_id) = headers.correlation_id() {
            let mut in_flight = self.inner.lock_in_flight();
            match in_flight.waiters.remove(&request_id) {
                Some(waiter) => {
                    let _ = waiter.send(message.clone());
                }
                None => {
                    debug!(namespace = %self.inner.namespace, request_id, "no waiter for reply");
                }
            }
        }

        let matched: Vec<Callback> = self
            .inner
            .lock_listeners()
            .iter()
            .filter(|l| headers.matches(&l.key))
            .map(|l| Arc::clone(&l.callback))
            .collect();
        for callback in matched {
            callback(message);
        }
    }

    /// Fail every pending request and reject new ones.
    pub(crate) fn close(&self, reason: &str) {
        let waiters = {
            let mut in_flight = self.inner.lock_in_flight();
            if in_flight.closed.is_some() {
                return;
            }
            in_flight.closed = Some(reason.to_string());
            std::mem::take(&mut in_flight.waiters)
        };
        if !waiters.is_empty() {
            debug!(
                namespace = %self.inner.namespace,
                pending = waiters.len(),
                "failing pending requests"
            );
        }
    }

    fn accepts(&self, message: &CastMessage) -> bool {
        message.destination_id == BROADCAST_DESTINATION
            || (message.source_id == self.inner.destination_id
                && message.destination_id == self.inner.source_id
                && message.namespace == self.inner.namespace)
    }

    async fn send_text(&self, text: String) -> Result<()> {
        let message = CastMessage::new_text(
            self.inner.source_id.as_str(),
            self.inner.destination_id.as_str(),
            self.inner.namespace.as_str(),
            text,
        );
        self.inner.connection.send(&message).await
    }

    pub fn downgrade(&self) -> WeakChannel {
        WeakChannel {
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    pub fn namespace(&self) -> &str {
        &self.inner.namespace
    }

    pub fn source_id(&self) -> &str {
        &self.inner.source_id
    }

    pub fn destination_id(&self) -> &str {
        &self.inner.destination_id
    }

    /// Requests waiting for a reply.
    pub fn pending_requests(&self) -> usize {
        self.inner.lock_in_flight().waiters.len()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock_listeners().len()
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("source_id", &self.inner.source_id)
            .field("destination_id", &self.inner.destination_id)
            .field("namespace", &self.inner.namespace)
            .finish()
    }
}

impl WeakChannel {
    pub fn upgrade(&self) -> Option<Channel> {
        self.inner.upgrade().map(|inner| Channel { inner })
    }
}

impl ChannelInner {
    fn lock_in_flight(&self) -> MutexGuard<'_, InFlight> {
        self.in_flight.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_listeners(&self) -> MutexGuard<'_, Vec<Listener>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn register(&self, request_id: i64) -> Result<PendingReply<'_>> {
        let (tx, rx) = oneshot::channel();
        let mut in_flight = self.lock_in_flight();
        if let Some(reason) = &in_flight.closed {
            return Err(ChannelError::Disconnected(reason.clone()));
        }
        in_flight.waiters.insert(request_id, tx);
        Ok(PendingReply {
            channel: self,
            request_id,
            reply: rx,
        })
    }

    /// Remove the waiter for `request_id`. Returns true if it was still there.
    fn forget(&self, request_id: i64) -> bool {
        self.lock_in_flight().waiters.remove(&request_id).is_some()
    }

    fn disconnected(&self) -> ChannelError {
        let reason = self
            .lock_in_flight()
            .closed
            .clone()
            .unwrap_or_else(|| "channel closed".to_string());
        ChannelError::Disconnected(reason)
    }
}

/// Removes its in-flight entry when dropped, whatever ended the request.
struct PendingReply<'a> {
    channel: &'a ChannelInner,
    request_id: i64,
    reply: oneshot::Receiver<CastMessage>,
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        self.channel.forget(self.request_id);
    }
}
