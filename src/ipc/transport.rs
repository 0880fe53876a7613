//! Named-channel message transport.
//!
//! The correlator only needs a fire-and-forget facility with a shared
//! namespace of named channels: emit a message to everyone listening on a
//! name, and register or remove listeners on a name. [`Transport`] captures
//! that contract; [`MemoryTransport`] implements it in-process.

use crate::ipc::error::{IpcError, IpcResult};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Callback invoked with every message delivered to a channel.
pub type Listener = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle identifying one registered listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(pub u64);

/// Asynchronous, at-most-once, named-channel messaging.
pub trait Transport: Send + Sync {
    /// Deliver `message` to every listener currently registered on `channel`.
    ///
    /// Delivery to a channel nobody listens on silently drops the message.
    fn send(&self, channel: &str, message: Value) -> IpcResult<()>;

    /// Register a persistent listener.
    fn on(&self, channel: &str, listener: Listener) -> ListenerId;

    /// Register a listener that is removed after its first delivery.
    fn once(&self, channel: &str, listener: Listener) -> ListenerId;

    /// Remove a listener. Returns false if it was not registered on `channel`.
    fn remove_listener(&self, channel: &str, id: ListenerId) -> bool;

    /// Number of listeners registered on `channel`.
    fn listener_count(&self, channel: &str) -> usize;
}

struct Registration {
    id: ListenerId,
    once: bool,
    listener: Listener,
}

/// In-process [`Transport`] backed by a listener registry.
///
/// Listeners are invoked on the sending thread after the registry lock is
/// released, so a listener may itself send or (un)register.
#[derive(Default)]
pub struct MemoryTransport {
    channels: Mutex<HashMap<String, Vec<Registration>>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport already wrapped for sharing.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Simulate the peer process going away: every later `send` fails.
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Total number of listeners across all channels.
    pub fn total_listeners(&self) -> usize {
        self.registry().values().map(Vec::len).sum()
    }

    fn registry(&self) -> MutexGuard<'_, HashMap<String, Vec<Registration>>> {
        // A panicking listener never runs under the lock, so poisoning only
        // happens on a bug in this module; keep serving.
        self.channels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn register(&self, channel: &str, listener: Listener, once: bool) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.registry()
            .entry(channel.to_string())
            .or_default()
            .push(Registration { id, once, listener });
        id
    }
}

impl Transport for MemoryTransport {
    fn send(&self, channel: &str, message: Value) -> IpcResult<()> {
        if self.is_closed() {
            return Err(IpcError::Transport(format!(
                "transport closed, cannot send on {}",
                channel
            )));
        }

        let listeners: Vec<Listener> = {
            let mut registry = self.registry();
            let Some(regs) = registry.get_mut(channel) else {
                tracing::trace!("No listeners on {}, message dropped", channel);
                return Ok(());
            };
            let listeners = regs.iter().map(|r| r.listener.clone()).collect();
            regs.retain(|r| !r.once);
            if regs.is_empty() {
                registry.remove(channel);
            }
            listeners
        };

        for listener in listeners {
            listener(&message);
        }
        Ok(())
    }

    fn on(&self, channel: &str, listener: Listener) -> ListenerId {
        self.register(channel, listener, false)
    }

    fn once(&self, channel: &str, listener: Listener) -> ListenerId {
        self.register(channel, listener, true)
    }

    fn remove_listener(&self, channel: &str, id: ListenerId) -> bool {
        let mut registry = self.registry();
        let Some(regs) = registry.get_mut(channel) else {
            return false;
        };
        let before = regs.len();
        regs.retain(|r| r.id != id);
        let removed = regs.len() != before;
        if regs.is_empty() {
            registry.remove(channel);
        }
        removed
    }

    fn listener_count(&self, channel: &str) -> usize {
        self.registry().get(channel).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn recorder() -> (Listener, Arc<Mutex<Vec<Value>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let listener: Listener = Arc::new(move |v: &Value| sink.lock().unwrap().push(v.clone()));
        (listener, seen)
    }

    #[test]
    fn test_on_receives_every_message() {
        let transport = MemoryTransport::new();
        let (listener, seen) = recorder();
        transport.on("chan", listener);

        transport.send("chan", json!(1)).unwrap();
        transport.send("chan", json!(2)).unwrap();
        transport.send("other", json!(3)).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![json!(1), json!(2)]);
    }

    #[test]
    fn test_once_is_removed_after_delivery() {
        let transport = MemoryTransport::new();
        let (listener, seen) = recorder();
        transport.once("chan", listener);
        assert_eq!(transport.listener_count("chan"), 1);

        transport.send("chan", json!("a")).unwrap();
        transport.send("chan", json!("b")).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec![json!("a")]);
        assert_eq!(transport.listener_count("chan"), 0);
    }

    #[test]
    fn test_remove_listener() {
        let transport = MemoryTransport::new();
        let (listener, seen) = recorder();
        let id = transport.on("chan", listener);

        assert!(!transport.remove_listener("elsewhere", id));
        assert!(transport.remove_listener("chan", id));
        assert!(!transport.remove_listener("chan", id));

        transport.send("chan", json!(1)).unwrap();
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(transport.total_listeners(), 0);
    }

    #[test]
    fn test_listener_can_send_reentrantly() {
        let transport = MemoryTransport::shared();
        let (listener, seen) = recorder();
        transport.on("pong", listener);

        let inner = transport.clone();
        transport.on(
            "ping",
            Arc::new(move |v: &Value| {
                inner.send("pong", v.clone()).unwrap();
            }),
        );

        transport.send("ping", json!({"n": 1})).unwrap();
        assert_eq!(*seen.lock().unwrap(), vec![json!({"n": 1})]);
    }

    #[test]
    fn test_closed_transport_rejects_send() {
        let transport = MemoryTransport::new();
        transport.close();
        let err = transport.send("chan", json!(null)).unwrap_err();
        assert!(matches!(err, IpcError::Transport(_)));
    }
}
