// Bridge broker: SPEC_FULL.md §4.3.

use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use shared::{errors::BridgeTimeout, log, pump};

use crate::consts::BRIDGE_TIMEOUT_SECS;
use crate::session::AgentSession;

pub async fn broker_bridge(public_client: TcpStream, session: Arc<AgentSession>) {
    broker_bridge_with_timeout(
        public_client,
        session,
        Duration::from_secs(BRIDGE_TIMEOUT_SECS),
    )
    .await
}

/// Split out of `broker_bridge` so tests can use a short timeout instead of
/// waiting out the real 5-second constant.
async fn broker_bridge_with_timeout(
    public_client: TcpStream,
    session: Arc<AgentSession>,
    timeout: Duration,
) {
    let ephemeral = match TcpListener::bind(("0.0.0.0", 0)).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("failed to open ephemeral bridge acceptor: {:?}", e);
            return;
        }
    };
    let bridge_port = match ephemeral.local_addr() {
        Ok(addr) => addr.port(),
        Err(e) => {
            log::error!("failed to read ephemeral bridge acceptor's port: {:?}", e);
            return;
        }
    };

    if let Err(e) = session.send_bridge_port(bridge_port).await {
        log::warn!(
            "failed to notify agent {} of bridge port {}: {:?}",
            session.peer_addr(),
            bridge_port,
            e
        );
        return;
    }

    match tokio::time::timeout(timeout, ephemeral.accept()).await {
        Ok(Ok((agent_socket, agent_addr))) => {
            log::debug!(
                "bridge port {} matched agent socket {}",
                bridge_port,
                agent_addr
            );
            pump::depipe(public_client, agent_socket, session.stop_trigger()).await;
        }
        Ok(Err(e)) => {
            log::warn!("ephemeral acceptor for bridge port {} failed: {:?}", bridge_port, e);
        }
        Err(_) => {
            let timeout = BridgeTimeout { bridge_port };
            log::warn!(
                "{} for agent {}, closing control channel",
                timeout,
                session.peer_addr()
            );
            // The agent is presumed stuck or dead: force a full re-handshake.
            session.stop_trigger().trigger();
        }
    }
}
