//! The byte pump ("depipe"): bidirectional, unbuffered relay between two
//! TCP sockets. See SPEC_FULL.md §4.4.
//!
//! Each socket is split into an owned read half and an owned write half;
//! each half is handed to exactly one of the two direction tasks. That
//! ownership split *is* the per-socket serialization the spec requires —
//! a half is never reachable from more than one task, so there is never a
//! concurrent read and write racing on the same half.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};

use crate::log;
use crate::protocol::consts::PUMP_CHUNK_SIZE;
use crate::system::trigger::Trigger;

/// Relays `a` and `b` bidirectionally until either direction sees EOF or an
/// error, then closes both sockets. Resolves once both directions have
/// stopped. `stop`, if triggered externally, also tears the pair down.
pub async fn depipe(a: TcpStream, b: TcpStream, stop: Trigger) {
    let (a_read, a_write) = a.into_split();
    let (b_read, b_write) = b.into_split();

    // local_stop is distinct from the caller's `stop`: either direction
    // failing must stop the other direction too, without requiring the
    // caller's trigger to fire for every unrelated pumped pair.
    let local_stop = Trigger::new();

    let a_to_b = tokio::spawn(pump_direction(a_read, b_write, local_stop.clone()));
    let b_to_a = tokio::spawn(pump_direction(b_read, a_write, local_stop.clone()));

    tokio::select! {
        _ = stop.wait_async() => {
            local_stop.trigger();
        }
        _ = local_stop.wait_async() => {}
    }

    let _ = a_to_b.await;
    let _ = b_to_a.await;
}

async fn pump_direction(mut src: OwnedReadHalf, mut dst: OwnedWriteHalf, stop: Trigger) {
    let mut buf = [0u8; PUMP_CHUNK_SIZE];
    loop {
        tokio::select! {
            _ = stop.wait_async() => break,
            result = src.read(&mut buf) => {
                match result {
                    Ok(0) => {
                        log::debug!("pump direction reached EOF");
                        break;
                    }
                    Ok(n) => {
                        if let Err(e) = dst.write_all(&buf[..n]).await {
                            log::debug!("pump direction write error: {:?}", e);
                            break;
                        }
                    }
                    Err(e) => {
                        log::debug!("pump direction read error: {:?}", e);
                        break;
                    }
                }
            }
        }
    }
    stop.trigger();
}
