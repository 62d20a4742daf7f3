// Agent dialer: SPEC_FULL.md §4.5.

use tokio::net::TcpStream;

use shared::{log, pump, system::trigger::Trigger};

/// Dials the server's ephemeral bridge port and the private target, then
/// hands both sockets to the byte pump. Failures abandon this single
/// request without affecting the control channel or any other bridge.
pub async fn dial_and_pump(
    server_host: String,
    bridge_port: u16,
    target_host: String,
    target_port: u16,
    stop: Trigger,
) {
    let server_socket = match TcpStream::connect((server_host.as_str(), bridge_port)).await {
        Ok(socket) => socket,
        Err(e) => {
            log::warn!(
                "failed to dial bridge port {} on {}: {:?}",
                bridge_port,
                server_host,
                e
            );
            return;
        }
    };

    let target_socket = match TcpStream::connect((target_host.as_str(), target_port)).await {
        Ok(socket) => socket,
        Err(e) => {
            log::warn!(
                "failed to dial target {}:{}: {:?}",
                target_host,
                target_port,
                e
            );
            return;
        }
    };

    log::debug!(
        "bridge port {} matched to target {}:{}",
        bridge_port,
        target_host,
        target_port
    );
    pump::depipe(server_socket, target_socket, stop).await;
}
