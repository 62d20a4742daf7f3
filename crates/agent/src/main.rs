#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal as unix_signal};
use tokio::signal;

use shared::{log, system::trigger::Trigger};

use agent::{cli, supervisor};

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    log::setup_default_logging();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let proxy_host_env = std::env::var("PROXY_HOST").ok();

    let invocation = match cli::parse_invocation(&args, proxy_host_env) {
        Ok(invocation) => invocation,
        Err(e) => {
            eprintln!(
                "usage: expose <proxy_port>[:<target_host>]:<target_port>\nerror: {:?}",
                e
            );
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

            stop.trigger();
        }
    });

    supervisor::run(
        invocation.proxy_host,
        invocation.proxy_port,
        invocation.target_host,
        invocation.target_port,
        stop,
    )
    .await;
}
