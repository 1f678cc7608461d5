use crate::config::settings::AppConfig;
use crate::modules::session::store::SessionStore;
use crate::transport::ChatTransport;
use crate::transport::ws::PeerMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: AppConfig,
    pub sessions: SessionStore,
    /// Live socket registry, used by the upgrade handler.
    pub peers: PeerMap,
    /// Outbound chat seam; dyn so tests can substitute a recording transport.
    pub transport: Arc<dyn ChatTransport>,
}

impl AppState {
    pub fn new(config: AppConfig, transport: Arc<dyn ChatTransport>, peers: PeerMap) -> Self {
        Self {
            config,
            sessions: SessionStore::new(),
            peers,
            transport,
        }
    }
}
