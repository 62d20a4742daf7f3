// Server-side control channel contract: SPEC_FULL.md §4.1.

use std::net::SocketAddr;

use anyhow::Result;
use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::net::tcp::OwnedReadHalf;

use shared::{log, protocol, system::trigger::Trigger};

use crate::listener;
use crate::session::SessionManager;

/// Handles one accepted control connection end to end: handshake, public
/// listener setup, session registration, and the control-liveness reader.
/// Returns once the handshake fails; a successful handshake spawns its own
/// tasks and returns immediately, since the session now outlives this call.
pub async fn handle_control_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    global_stop: Trigger,
) -> Result<()> {
    stream.set_nodelay(true).ok();
    let (mut reader, writer) = stream.into_split();

    let public_port = match protocol::read_port(&mut reader).await? {
        Some(port) => port,
        None => {
            log::debug!("control connection from {} closed before handshake", peer_addr);
            return Ok(());
        }
    };

    let public_listener = match TcpListener::bind(("0.0.0.0", public_port)).await {
        Ok(listener) => listener,
        Err(e) => {
            log::warn!(
                "agent {} requested public port {} which could not be bound: {:?}",
                peer_addr,
                public_port,
                e
            );
            // Closing the control channel (dropping reader/writer) is the
            // contract here: the agent will back off and re-request.
            return Ok(());
        }
    };

    let session_stop = Trigger::new();
    // Global shutdown also tears this session down.
    tokio::spawn({
        let session_stop = session_stop.clone();
        async move {
            global_stop.wait_async().await;
            session_stop.trigger();
        }
    });

    let session = SessionManager::get_instance().register(
        public_port,
        peer_addr,
        writer,
        session_stop.clone(),
    );
    log::info!(
        "agent {} registered, public port {} now open",
        peer_addr,
        public_port
    );

    tokio::spawn(listener::run_public_listener(public_listener, session.clone()));
    tokio::spawn(run_liveness_reader(reader, session.clone()));

    Ok(())
}

/// Agents never write after the handshake (§4.1). Any completed read
/// (including a zero-length EOF) or a read error therefore means the agent
/// is gone.
///
/// Raced against the session's stop trigger: this task holds the read half
/// and, once it returns, the last `Arc<AgentSession>` clone may go with it,
/// so a plain unconditional read would block forever on an idle-but-open
/// agent socket and never let a server-initiated teardown (bridge timeout,
/// shutdown, restart) actually close the control channel.
async fn run_liveness_reader(mut reader: OwnedReadHalf, session: std::sync::Arc<crate::session::AgentSession>) {
    let stop = session.stop_trigger();
    let mut probe = [0u8; 1];
    tokio::select! {
        _ = stop.wait_async() => {
            log::debug!(
                "agent {} session stopped, closing control-liveness reader",
                session.peer_addr()
            );
        }
        result = reader.read(&mut probe) => {
            match result {
                Ok(0) => log::info!("agent {} disconnected", session.peer_addr()),
                Ok(_) => log::warn!(
                    "agent {} sent unexpected data after handshake, treating as dead",
                    session.peer_addr()
                ),
                Err(e) => log::info!("agent {} control read failed: {:?}", session.peer_addr(), e),
            }
            stop.trigger();
        }
    }
    SessionManager::get_instance().remove(session.id());
}
