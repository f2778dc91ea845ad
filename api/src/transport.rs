use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;
use wp_mcp_runtime::McpServer;
use wp_mcp_runtime::wordpress::WpClient;

use crate::sessions::{Transport, TransportError};

/// Server half of one SSE connection. Responses are queued on `outbound`
/// and written to the event stream by the GET /sse handler. Closing drops
/// the sender, which ends that stream.
pub struct SseTransport {
    session_id: String,
    outbound: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    server: McpServer,
    closed: AtomicBool,
}

impl SseTransport {
    pub fn new(client: Option<Arc<WpClient>>) -> (Self, mpsc::UnboundedReceiver<Value>) {
        let session_id = Uuid::now_v7().to_string();
        let (outbound, receiver) = mpsc::unbounded_channel();
        let transport = Self {
            server: McpServer::new(client, session_id.clone()),
            session_id,
            outbound: Mutex::new(Some(outbound)),
            closed: AtomicBool::new(false),
        };
        (transport, receiver)
    }

    pub fn endpoint(&self) -> String {
        format!("/messages?sessionId={}", self.session_id)
    }

    fn sender(&self) -> Option<mpsc::UnboundedSender<Value>> {
        self.outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

impl Transport for SseTransport {
    fn session_id(&self) -> &str {
        &self.session_id
    }

    async fn handle_message(&self, message: Value) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        for response in self.server.handle_incoming_message(message).await {
            let sender = self.sender().ok_or(TransportError::Closed)?;
            sender.send(response).map_err(|_| TransportError::Closed)?;
        }
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.outbound
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
            || self
                .outbound
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .as_ref()
                .is_none_or(|sender| sender.is_closed())
    }
}
