// Agent-side control channel contract: SPEC_FULL.md §4.1.

use anyhow::{Context, Result};
use tokio::net::TcpStream;

use shared::{log, protocol, system::trigger::Trigger};

use crate::cli::server_host;
use crate::dialer;

/// Connects, performs the handshake, then serves bridge-port notifications
/// until the channel closes or `stop` fires. Each iteration of the
/// supervisor (§4.6) calls this once.
pub async fn run_control_session(
    proxy_host: &str,
    proxy_port: u16,
    target_host: &str,
    target_port: u16,
    stop: Trigger,
) -> Result<()> {
    let stream = TcpStream::connect(proxy_host)
        .await
        .with_context(|| format!("connecting to proxy server at {}", proxy_host))?;
    stream.set_nodelay(true).ok();
    let (mut reader, mut writer) = stream.into_split();

    protocol::write_port(&mut writer, proxy_port)
        .await
        .context("sending handshake port")?;
    log::info!(
        "control channel established with {}, requested public port {}",
        proxy_host,
        proxy_port
    );

    let bridge_host = server_host(proxy_host)?.to_string();

    loop {
        tokio::select! {
            _ = stop.wait_async() => {
                log::info!("stop signal received, closing control channel");
                return Ok(());
            }
            port = protocol::read_port(&mut reader) => {
                match port.context("reading bridge port notification")? {
                    Some(bridge_port) => {
                        log::debug!("received bridge port {}", bridge_port);
                        tokio::spawn(dialer::dial_and_pump(
                            bridge_host.clone(),
                            bridge_port,
                            target_host.to_string(),
                            target_port,
                            stop.clone(),
                        ));
                    }
                    None => {
                        log::info!("control channel closed by server");
                        return Ok(());
                    }
                }
            }
        }
    }
}
