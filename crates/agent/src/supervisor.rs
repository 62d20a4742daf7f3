// Agent supervisor state machine: SPEC_FULL.md §4.6.
//
// DIALING_CONTROL -> HANDSHAKING -> SERVING -> (any error) -> BACKOFF -> DIALING_CONTROL.
// `run_control_session` covers DIALING_CONTROL/HANDSHAKING/SERVING as one
// call; BACKOFF is the fixed delay below. In-flight byte pumps spawned by a
// previous SERVING session are not affected by a new attempt starting.

use std::time::Duration;

use shared::{log, system::trigger::Trigger};

use crate::consts::RECONNECT_BACKOFF_SECS;
use crate::control;

pub async fn run(
    proxy_host: String,
    proxy_port: u16,
    target_host: String,
    target_port: u16,
    stop: Trigger,
) {
    while !stop.is_triggered() {
        log::info!("dialing control channel at {}", proxy_host);
        match control::run_control_session(&proxy_host, proxy_port, &target_host, target_port, stop.clone())
            .await
        {
            Ok(()) => log::info!("control session ended"),
            Err(e) => log::warn!("control session failed: {:?}", e),
        }

        if stop.is_triggered() {
            break;
        }

        log::info!("backing off {}s before reconnecting", RECONNECT_BACKOFF_SECS);
        tokio::select! {
            _ = stop.wait_async() => break,
            _ = tokio::time::sleep(Duration::from_secs(RECONNECT_BACKOFF_SECS)) => {}
        }
    }
    log::info!("supervisor stopping");
}
