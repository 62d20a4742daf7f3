// Manual test fixture, not a tunnel component: a plain TCP echo server, to
// sit behind an `expose` agent while exercising the tunnel by hand.

use anyhow::{Context, Result, bail};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use shared::log;

#[tokio::main]
async fn main() -> Result<()> {
    log::setup_default_logging();

    let port: u16 = match std::env::args().nth(1) {
        Some(arg) => arg.parse().context("invalid port")?,
        None => bail!("usage: echo <port>"),
    };

    let listener = TcpListener::bind(("127.0.0.1", port)).await?;
    log::info!("echo fixture listening on 127.0.0.1:{}", port);

    loop {
        let (mut socket, addr) = listener.accept().await?;
        tokio::spawn(async move {
            let mut buf = [0u8; 4096];
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if socket.write_all(&buf[..n]).await.is_err() {
                            break;
                        }
                    }
                }
            }
            log::debug!("echo connection from {} closed", addr);
        });
    }
}
