//! Backend side of the correlator.
//!
//! [`IpcDispatcher`] listens on `<prefix>-<channel>-request` channels, runs an
//! async handler for each request on the tokio runtime and answers on the
//! address the request carried in `replyTo`. Handler errors are answered
//! as `{ "err": message }`, which the sender turns into
//! [`IpcError::Remote`](crate::ipc::IpcError::Remote).

use crate::ipc::correlator::{request_channel, ERROR_FIELD, REPLY_TO_FIELD};
use crate::ipc::error::{IpcError, IpcResult};
use crate::ipc::transport::{Listener, ListenerId, Transport};
use serde_json::Value;
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;

/// Push handle for one streaming subscription.
#[derive(Clone)]
pub struct StreamSink {
    transport: Arc<dyn Transport>,
    address: String,
}

impl StreamSink {
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Push a message to the subscriber.
    pub fn send(&self, message: Value) -> IpcResult<()> {
        self.transport.send(&self.address, message)
    }

    /// Whether the subscriber still listens on this address.
    pub fn is_open(&self) -> bool {
        self.transport.listener_count(&self.address) > 0
    }
}

/// Serves request channels for the backend process.
pub struct IpcDispatcher {
    transport: Arc<dyn Transport>,
    prefix: String,
    runtime: Handle,
    registrations: Mutex<Vec<(String, ListenerId)>>,
}

impl IpcDispatcher {
    /// Create a dispatcher that spawns handlers on the current tokio runtime.
    pub fn new(transport: Arc<dyn Transport>, prefix: impl Into<String>) -> IpcResult<Self> {
        let runtime = Handle::try_current()
            .map_err(|e| IpcError::Transport(format!("dispatcher needs a tokio runtime: {}", e)))?;
        Ok(Self::with_runtime(transport, prefix, runtime))
    }

    pub fn with_runtime(
        transport: Arc<dyn Transport>,
        prefix: impl Into<String>,
        runtime: Handle,
    ) -> Self {
        Self {
            transport,
            prefix: prefix.into(),
            runtime,
            registrations: Mutex::new(Vec::new()),
        }
    }

    /// Serve request/response calls on `channel`.
    pub fn handle<F, Fut, E>(&self, channel: &str, handler: F)
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let handler = Arc::new(handler);
        let transport = self.transport.clone();
        let runtime = self.runtime.clone();
        let name = request_channel(&self.prefix, channel);
        let log_name = name.clone();

        let listener: Listener = Arc::new(move |message: &Value| {
            let Some((reply_to, payload)) = split_request(message) else {
                tracing::warn!("Request on {} without {}, ignored", log_name, REPLY_TO_FIELD);
                return;
            };
            let handler = handler.clone();
            let transport = transport.clone();
            runtime.spawn(async move {
                let reply = match handler(payload).await {
                    Ok(value) => value,
                    Err(e) => error_reply(e.to_string()),
                };
                if let Err(e) = transport.send(&reply_to, reply) {
                    tracing::warn!("Failed to reply on {}: {}", reply_to, e);
                }
            });
        });

        self.register(name, listener);
    }

    /// Serve streaming subscriptions on `channel`.
    ///
    /// The handler receives the request payload and a [`StreamSink`] bound to
    /// the subscriber's address, and may push to it for as long as it likes.
    pub fn handle_stream<F, Fut>(&self, channel: &str, handler: F)
    where
        F: Fn(Value, StreamSink) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handler = Arc::new(handler);
        let transport = self.transport.clone();
        let runtime = self.runtime.clone();
        let name = request_channel(&self.prefix, channel);
        let log_name = name.clone();

        let listener: Listener = Arc::new(move |message: &Value| {
            let Some((address, payload)) = split_request(message) else {
                tracing::warn!("Subscribe on {} without {}, ignored", log_name, REPLY_TO_FIELD);
                return;
            };
            let sink = StreamSink {
                transport: transport.clone(),
                address,
            };
            runtime.spawn(handler(payload, sink));
        });

        self.register(name, listener);
    }

    /// Stop serving every registered channel.
    pub fn shutdown(&self) {
        let registrations = std::mem::take(
            &mut *self
                .registrations
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        );
        for (channel, id) in registrations {
            self.transport.remove_listener(&channel, id);
        }
    }

    fn register(&self, channel: String, listener: Listener) {
        tracing::debug!("Serving {}", channel);
        let id = self.transport.on(&channel, listener);
        self.registrations
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((channel, id));
    }
}

impl Drop for IpcDispatcher {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn error_reply(message: String) -> Value {
    let mut map = serde_json::Map::new();
    map.insert(ERROR_FIELD.to_string(), Value::String(message));
    Value::Object(map)
}

/// Split a request into its reply address and the caller's payload.
fn split_request(message: &Value) -> Option<(String, Value)> {
    let mut map = message.as_object()?.clone();
    let reply_to = match map.remove(REPLY_TO_FIELD)? {
        Value::String(s) => s,
        _ => return None,
    };
    Some((reply_to, Value::Object(map)))
}
