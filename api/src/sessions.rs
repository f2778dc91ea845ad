use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};

use serde_json::Value;

/// One live MCP connection the registry can deliver messages to.
pub trait Transport: Send + Sync + 'static {
    fn session_id(&self) -> &str;

    /// Deliver one inbound JSON-RPC message. Returns `TransportError::Closed`
    /// when the connection went away before or during delivery.
    fn handle_message(&self, message: Value)
    -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Mark the transport closed. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,
    #[error("{0}")]
    Failed(String),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("No active session '{0}'")]
    NotFound(String),
    #[error("Session id '{0}' is already registered")]
    Duplicate(String),
    #[error("Session '{id}' failed to handle message: {message}")]
    Transport { id: String, message: String },
}

/// Live sessions keyed by id.
///
/// The lock is only held for map operations; delivery happens on a cloned
/// `Arc` after the guard is dropped.
pub struct SessionRegistry<T: Transport> {
    sessions: Mutex<HashMap<String, Arc<T>>>,
}

impl<T: Transport> Default for SessionRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Transport> SessionRegistry<T> {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn open(&self, transport: T) -> Result<Arc<T>, SessionError> {
        let session_id = transport.session_id().to_string();
        let transport = Arc::new(transport);
        {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            if sessions.contains_key(&session_id) {
                tracing::error!(
                    event = "session_id_collision",
                    session_id = %session_id,
                    "refusing to replace a live session"
                );
                return Err(SessionError::Duplicate(session_id));
            }
            sessions.insert(session_id.clone(), transport.clone());
        }
        tracing::info!(event = "session_opened", session_id = %session_id, "MCP session opened");
        Ok(transport)
    }

    fn lookup(&self, session_id: &str) -> Option<Arc<T>> {
        let sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
        sessions.get(session_id).cloned()
    }

    pub async fn route(&self, session_id: &str, message: Value) -> Result<(), SessionError> {
        let not_found = || SessionError::NotFound(session_id.to_string());
        let transport = self.lookup(session_id).ok_or_else(not_found)?;
        if transport.is_closed() {
            return Err(not_found());
        }
        match transport.handle_message(message).await {
            Ok(()) => Ok(()),
            Err(TransportError::Closed) => {
                tracing::debug!(session_id = %session_id, "session closed during delivery");
                Err(not_found())
            }
            Err(TransportError::Failed(message)) => Err(SessionError::Transport {
                id: session_id.to_string(),
                message,
            }),
        }
    }

    /// Remove and close a session. Returns false if it was already gone.
    pub fn close(&self, session_id: &str) -> bool {
        let removed = {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.remove(session_id)
        };
        match removed {
            Some(transport) => {
                transport.close();
                tracing::info!(event = "session_closed", session_id = %session_id, "MCP session closed");
                true
            }
            None => false,
        }
    }

    /// Close every session; returns how many were open.
    pub fn close_all(&self) -> usize {
        let drained: Vec<Arc<T>> = {
            let mut sessions = self.sessions.lock().unwrap_or_else(|e| e.into_inner());
            sessions.drain().map(|(_, transport)| transport).collect()
        };
        for transport in &drained {
            transport.close();
        }
        drained.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Closes its session when dropped. Owned by the SSE stream so a client
/// disconnect removes the registry entry.
pub struct SessionGuard<T: Transport> {
    registry: Arc<SessionRegistry<T>>,
    session_id: String,
}

impl<T: Transport> SessionGuard<T> {
    pub fn new(registry: Arc<SessionRegistry<T>>, session_id: impl Into<String>) -> Self {
        Self {
            registry,
            session_id: session_id.into(),
        }
    }
}

impl<T: Transport> Drop for SessionGuard<T> {
    fn drop(&mut self) {
        self.registry.close(&self.session_id);
    }
}
