//! Request/response and streaming calls over a shared channel namespace.
//!
//! [`IpcSender`] turns the fire-and-forget [`Transport`] into call semantics.
//! Every call gets its own reply address, `<prefix>-<channel>-response-<id>`,
//! so concurrent calls on the same logical channel never consume each
//! other's replies. The address travels with the request in the `replyTo`
//! field; the backend answers on it exactly once.
//!
//! Subscriptions work the same way with a persistent listener on
//! `<prefix>-<channel>-stream-<id>`. The [`Subscription`] handle returned by
//! [`IpcSender::subscribe`] is the only key [`IpcSender::unsubscribe`]
//! accepts, so removal always targets the listener that was installed.
//!
//! # Example
//!
//! ```ignore
//! let sender = IpcSender::new("lnd", transport, IpcSettings::default());
//! let info = sender.send("get-info", json!({ "node": node })).await?;
//! ```

use crate::config::IpcSettings;
use crate::ipc::error::{IpcError, IpcResult};
use crate::ipc::transport::{Listener, ListenerId, Transport};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;

/// Payload field carrying the reply address.
pub const REPLY_TO_FIELD: &str = "replyTo";

/// Reply field signalling a remote error.
pub const ERROR_FIELD: &str = "err";

/// Marker written in place of elided payload fields in the log.
const ELIDED: &str = "[elided]";

static NEXT_CORRELATION: AtomicU64 = AtomicU64::new(1);

/// Unique-enough suffix for a reply address: millisecond timestamp plus a
/// process-wide sequence number.
pub fn correlation_id() -> String {
    let seq = NEXT_CORRELATION.fetch_add(1, Ordering::Relaxed);
    format!("{}-{}", chrono::Utc::now().timestamp_millis(), seq)
}

/// Request channel for a logical channel.
pub fn request_channel(prefix: &str, channel: &str) -> String {
    format!("{}-{}-request", prefix, channel)
}

/// Base response channel for a logical channel.
pub fn response_channel(prefix: &str, channel: &str) -> String {
    format!("{}-{}-response", prefix, channel)
}

/// Base stream channel for a logical channel.
pub fn stream_channel(prefix: &str, channel: &str) -> String {
    format!("{}-{}-stream", prefix, channel)
}

/// Extract the remote error message from a reply, if it signals one.
pub fn reply_error(reply: &Value) -> Option<String> {
    match reply.get(ERROR_FIELD)? {
        Value::Null | Value::Bool(false) => None,
        Value::String(s) if s.is_empty() => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// An active streaming subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    /// Logical channel name
    pub channel: String,
    /// Unique address the remote side pushes to
    pub address: String,
    listener: ListenerId,
}

/// Removes a reply listener when the pending call goes away without a reply.
struct PendingReply<'a> {
    transport: &'a dyn Transport,
    address: &'a str,
    id: ListenerId,
}

impl Drop for PendingReply<'_> {
    fn drop(&mut self) {
        // Already gone if the one-shot listener fired.
        self.transport.remove_listener(self.address, self.id);
    }
}

/// UI-side IPC client for one backend service.
pub struct IpcSender {
    service: String,
    transport: Arc<dyn Transport>,
    settings: IpcSettings,
}

impl IpcSender {
    /// Create a sender. `service` only labels log lines.
    pub fn new(
        service: impl Into<String>,
        transport: Arc<dyn Transport>,
        settings: IpcSettings,
    ) -> Self {
        Self {
            service: service.into(),
            transport,
            settings,
        }
    }

    pub fn settings(&self) -> &IpcSettings {
        &self.settings
    }

    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Issue a request and wait for its reply.
    ///
    /// Resolves with the reply verbatim unless it carries an `err` field, in
    /// which case the call fails with [`IpcError::Remote`]. With a configured
    /// timeout the call fails with [`IpcError::Timeout`] and its listener is
    /// removed; without one it waits as long as the future is polled.
    pub async fn send(&self, channel: &str, payload: Value) -> IpcResult<Value> {
        let request = request_channel(&self.settings.prefix, channel);
        let reply_to = format!(
            "{}-{}",
            response_channel(&self.settings.prefix, channel),
            correlation_id()
        );
        let message = with_reply_to(payload, &reply_to)?;

        let (tx, rx) = oneshot::channel::<Value>();
        let tx = Mutex::new(Some(tx));
        let listener: Listener = Arc::new(move |reply: &Value| {
            let pending = tx.lock().ok().and_then(|mut slot| slot.take());
            if let Some(tx) = pending {
                let _ = tx.send(reply.clone());
            }
        });
        let id = self.transport.once(&reply_to, listener);
        let _guard = PendingReply {
            transport: self.transport.as_ref(),
            address: &reply_to,
            id,
        };

        tracing::debug!(
            "{}: send {} {}",
            self.service,
            request,
            self.elide(&message)
        );
        self.transport.send(&request, message)?;

        let reply = match self.settings.timeout() {
            Some(timeout) => match tokio::time::timeout(timeout, rx).await {
                Ok(reply) => reply,
                Err(_) => {
                    tracing::warn!("{}: no reply on {} after {:?}", self.service, reply_to, timeout);
                    return Err(IpcError::Timeout {
                        address: reply_to.clone(),
                        timeout,
                    });
                }
            },
            None => rx.await,
        }
        .map_err(|_| IpcError::Closed(reply_to.clone()))?;

        tracing::debug!(
            "{}: received {} {}",
            self.service,
            reply_to,
            self.elide(&reply)
        );

        match reply_error(&reply) {
            Some(message) => Err(IpcError::Remote(message)),
            None => Ok(reply),
        }
    }

    /// Typed wrapper around [`send`](Self::send).
    pub async fn call<P, R>(&self, channel: &str, payload: &P) -> IpcResult<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let payload = serde_json::to_value(payload)?;
        let reply = self.send(channel, payload).await?;
        Ok(serde_json::from_value(reply)?)
    }

    /// Open a streaming subscription.
    ///
    /// `on_message` runs for every message the backend pushes to the
    /// subscription's address until [`unsubscribe`](Self::unsubscribe).
    pub fn subscribe<F>(&self, channel: &str, payload: Value, on_message: F) -> IpcResult<Subscription>
    where
        F: Fn(Value) + Send + Sync + 'static,
    {
        let request = request_channel(&self.settings.prefix, channel);
        let address = format!(
            "{}-{}",
            stream_channel(&self.settings.prefix, channel),
            correlation_id()
        );
        let message = with_reply_to(payload, &address)?;

        let service = self.service.clone();
        let listener: Listener = Arc::new(move |msg: &Value| {
            tracing::trace!("{}: stream message {}", service, msg);
            on_message(msg.clone());
        });
        let listener = self.transport.on(&address, listener);

        tracing::debug!(
            "{}: subscribe {} {}",
            self.service,
            request,
            self.elide(&message)
        );
        if let Err(e) = self.transport.send(&request, message) {
            self.transport.remove_listener(&address, listener);
            return Err(e);
        }

        Ok(Subscription {
            channel: channel.to_string(),
            address,
            listener,
        })
    }

    /// Close a subscription. Returns false if it was already closed.
    pub fn unsubscribe(&self, subscription: &Subscription) -> bool {
        tracing::debug!("{}: unsubscribe {}", self.service, subscription.address);
        self.transport
            .remove_listener(&subscription.address, subscription.listener)
    }

    /// Copy of `value` with the configured fields replaced for logging.
    fn elide(&self, value: &Value) -> Value {
        let mut value = value.clone();
        if let Value::Object(map) = &mut value {
            for field in &self.settings.elided_fields {
                if let Some(v) = map.get_mut(field) {
                    *v = Value::String(ELIDED.to_string());
                }
            }
        }
        value
    }
}

/// Merge the reply address into an object payload. `null` counts as `{}`.
fn with_reply_to(payload: Value, reply_to: &str) -> IpcResult<Value> {
    let mut map = match payload {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        other => {
            return Err(IpcError::Serialization(format!(
                "payload must be a JSON object, got {}",
                other
            )))
        }
    };
    map.insert(REPLY_TO_FIELD.to_string(), Value::String(reply_to.to_string()));
    Ok(Value::Object(map))
}
