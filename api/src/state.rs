use std::sync::Arc;

use wp_mcp_runtime::wordpress::WpClient;

use crate::gate::AccessGate;
use crate::sessions::SessionRegistry;
use crate::transport::SseTransport;

#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionRegistry<SseTransport>>,
    pub gate: AccessGate,
    /// `None` when credentials were not configured; tools then report it.
    pub wordpress: Option<Arc<WpClient>>,
}

impl AppState {
    pub fn new(gate: AccessGate, wordpress: Option<WpClient>) -> Self {
        Self {
            sessions: Arc::new(SessionRegistry::new()),
            gate,
            wordpress: wordpress.map(Arc::new),
        }
    }
}
