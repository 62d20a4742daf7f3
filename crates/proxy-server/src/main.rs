#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio::signal;

use shared::{log, system::trigger::Trigger};

use proxy_server::{cli, serve, session::SessionManager};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    log::setup_default_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let control_port = match cli::parse_invocation(&args) {
        Ok(port) => port,
        Err(e) => {
            eprintln!("usage: proxy_server <control_port>\nerror: {:?}", e);
            std::process::exit(1);
        }
    };

    let stop = Trigger::new();

    tokio::spawn({
        let stop = stop.clone();
        async move {
            let ctrl_c = signal::ctrl_c();
            #[cfg(unix)]
            let mut terminate =
                unix_signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

            #[cfg(unix)]
            tokio::select! {
                _ = ctrl_c => {
                    log::info!("received Ctrl-C, shutting down");
                }
                _ = terminate.recv() => {
                    log::info!("received SIGTERM, shutting down");
                }
            }
            #[cfg(not(unix))]
            {
                ctrl_c.await.expect("failed to listen for Ctrl-C");
                log::info!("received Ctrl-C, shutting down");
            }

            SessionManager::get_instance().shutdown_all();
            stop.trigger();
        }
    });

    if let Err(e) = proxy_server::serve(control_port, stop).await {
        eprintln!("failed to bind control port {}: {:?}", control_port, e);
        std::process::exit(1);
    }
}
