pub mod broker;
pub mod cli;
pub mod consts;
pub mod control;
pub mod listener;
pub mod session;

use tokio::net::TcpListener;

use shared::{log, system::trigger::Trigger};

/// Binds the control listener and serves control connections until `stop`
/// fires. Used by `main` and by integration tests that need a real,
/// addressable server without going through a subprocess.
pub async fn serve(control_port: u16, stop: Trigger) -> anyhow::Result<()> {
    let control_listener = TcpListener::bind(("0.0.0.0", control_port)).await?;
    log::info!("listening for control connections on 0.0.0.0:{}", control_port);
    serve_on(control_listener, stop).await;
    Ok(())
}

pub async fn serve_on(control_listener: TcpListener, stop: Trigger) {
    loop {
        tokio::select! {
            _ = stop.wait_async() => {
                log::info!("shutdown signal received, stopping control listener");
                break;
            }
            accepted = control_listener.accept() => {
                match accepted {
                    Ok((socket, addr)) => {
                        log::info!("accepted control connection from {}", addr);
                        let stop = stop.clone();
                        tokio::spawn(async move {
                            if let Err(e) = control::handle_control_connection(socket, addr, stop).await {
                                log::error!("error handling control connection from {}: {:?}", addr, e);
                            }
                        });
                    }
                    Err(e) => {
                        log::error!("failed to accept control connection: {:?}", e);
                    }
                }
            }
        }
    }
}
