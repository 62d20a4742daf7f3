// The public listener accept loop: SPEC_FULL.md §4.2.

use std::sync::Arc;

use tokio::net::TcpListener;

use shared::log;

use crate::broker;
use crate::session::{AgentSession, SessionManager};

pub async fn run_public_listener(listener: TcpListener, session: Arc<AgentSession>) {
    let stop = session.stop_trigger();
    loop {
        tokio::select! {
            _ = stop.wait_async() => {
                log::debug!("public listener on port {} stopping", session.public_port());
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((socket, addr)) => {
                        log::debug!(
                            "accepted public client {} on port {}",
                            addr,
                            session.public_port()
                        );
                        tokio::spawn(broker::broker_bridge(socket, session.clone()));
                    }
                    Err(e) => {
                        log::error!(
                            "public listener on port {} accept error: {:?}",
                            session.public_port(),
                            e
                        );
                        break;
                    }
                }
            }
        }
    }
    stop.trigger();
    SessionManager::get_instance().remove(session.id());
}
