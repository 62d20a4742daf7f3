// Per-agent bookkeeping: the registered public port and the control
// channel's shared write half. See SPEC_FULL.md §3 ("Agent session").
//
// This registry exists for bulk shutdown and observability, not for
// reconnect/replay — there is no cross-session state to recover (Non-goals,
// SPEC_FULL.md §1).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::Result;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

use shared::{log, protocol, system::trigger::Trigger};

pub type SessionId = u64;

pub struct AgentSession {
    id: SessionId,
    public_port: u16,
    peer_addr: SocketAddr,
    control_writer: Mutex<OwnedWriteHalf>,
    stop: Trigger,
}

impl AgentSession {
    pub fn id(&self) -> SessionId {
        self.id
    }

    pub fn public_port(&self) -> u16 {
        self.public_port
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn stop_trigger(&self) -> Trigger {
        self.stop.clone()
    }

    /// Sends one bridge-port notification. Serialized against every other
    /// concurrent broker for this session via the control writer's mutex,
    /// so two 2-byte messages can never interleave on the wire.
    pub async fn send_bridge_port(&self, bridge_port: u16) -> Result<()> {
        let mut writer = self.control_writer.lock().await;
        protocol::write_port(&mut *writer, bridge_port).await
    }
}

#[derive(Default)]
pub struct SessionManager {
    sessions: RwLock<HashMap<SessionId, Arc<AgentSession>>>,
    next_id: AtomicU64,
}

impl SessionManager {
    fn new() -> Self {
        SessionManager::default()
    }

    pub fn get_instance() -> &'static SessionManager {
        static SESSION_MANAGER: OnceLock<SessionManager> = OnceLock::new();
        SESSION_MANAGER.get_or_init(SessionManager::new)
    }

    pub fn register(
        &self,
        public_port: u16,
        peer_addr: SocketAddr,
        control_writer: OwnedWriteHalf,
        stop: Trigger,
    ) -> Arc<AgentSession> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let session = Arc::new(AgentSession {
            id,
            public_port,
            peer_addr,
            control_writer: Mutex::new(control_writer),
            stop,
        });
        self.sessions.write().unwrap().insert(id, session.clone());
        session
    }

    pub fn remove(&self, id: SessionId) {
        self.sessions.write().unwrap().remove(&id);
    }

    pub fn count(&self) -> usize {
        self.sessions.read().unwrap().len()
    }

    /// Triggers every live session's stop and drops them all, closing every
    /// public listener and control channel. Used on process shutdown.
    pub fn shutdown_all(&self) {
        let sessions = std::mem::take(&mut *self.sessions.write().unwrap());
        log::info!("shutting down {} agent session(s)", sessions.len());
        for session in sessions.values() {
            session.stop.trigger();
        }
    }
}
