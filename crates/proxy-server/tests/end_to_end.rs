// End-to-end tests spanning both the server and agent crates together.
// Each test wires up a real server control listener, a real agent, and a
// real loopback "target" socket, then drives traffic through the whole
// tunnel exactly as a public client would. Ports are always OS-assigned
// (bind to :0, read back local_addr().port()) so tests never collide.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use shared::system::trigger::Trigger;

async fn spawn_server() -> (u16, Trigger) {
    let control_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let control_port = control_listener.local_addr().unwrap().port();
    let stop = Trigger::new();
    tokio::spawn(proxy_server::serve_on(control_listener, stop.clone()));
    (control_port, stop)
}

async fn spawn_agent(control_port: u16, public_port: u16, target_port: u16) -> Trigger {
    let stop = Trigger::new();
    tokio::spawn(agent::supervisor::run(
        format!("127.0.0.1:{}", control_port),
        public_port,
        "127.0.0.1".to_string(),
        target_port,
        stop.clone(),
    ));
    stop
}

/// Waits for a public port to start accepting connections, since the agent's
/// handshake and the server's `bind` both happen asynchronously after the
/// control channel connects.
async fn wait_for_public_port(public_port: u16) -> TcpStream {
    for _ in 0..200 {
        if let Ok(stream) = TcpStream::connect(("127.0.0.1", public_port)).await {
            return stream;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("public port {} never started accepting", public_port);
}

#[tokio::test]
async fn happy_path_forwards_client_bytes_to_the_target() {
    let (control_port, _server_stop) = spawn_server().await;

    let target_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_port = target_listener.local_addr().unwrap().port();

    let public_port = {
        // Reserve a free port up front so the agent has something concrete
        // to request; the listener is dropped before the agent binds it.
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        port
    };

    let _agent_stop = spawn_agent(control_port, public_port, target_port).await;

    let mut client = wait_for_public_port(public_port).await;
    let (mut target_socket, _) = target_listener.accept().await.unwrap();

    client.write_all(b"HELLO\n").await.unwrap();
    let mut got = [0u8; 6];
    target_socket.read_exact(&mut got).await.unwrap();
    assert_eq!(&got, b"HELLO\n");
}

#[tokio::test]
async fn reverse_traffic_returns_target_bytes_to_the_client() {
    let (control_port, _server_stop) = spawn_server().await;

    let target_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_port = target_listener.local_addr().unwrap().port();

    let public_port = {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        port
    };

    let _agent_stop = spawn_agent(control_port, public_port, target_port).await;

    let mut client = wait_for_public_port(public_port).await;
    let (mut target_socket, _) = target_listener.accept().await.unwrap();

    target_socket.write_all(b"WORLD\n").await.unwrap();
    let mut got = [0u8; 6];
    client.read_exact(&mut got).await.unwrap();
    assert_eq!(&got, b"WORLD\n");
}

#[tokio::test]
async fn sixteen_concurrent_clients_each_get_a_byte_identical_echo() {
    let (control_port, _server_stop) = spawn_server().await;

    // The target itself is a plain echo loop, standing in for the fixture
    // under demos/echo without spawning a subprocess.
    let target_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_port = target_listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        loop {
            let (mut socket, _) = match target_listener.accept().await {
                Ok(pair) => pair,
                Err(_) => break,
            };
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
            });
        }
    });

    let public_port = {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        port
    };

    let _agent_stop = spawn_agent(control_port, public_port, target_port).await;
    wait_for_public_port(public_port).await;

    let mut handles = Vec::new();
    for i in 0..16u8 {
        handles.push(tokio::spawn(async move {
            let payload: Vec<u8> = (0..65536u32).map(|n| (n as u8).wrapping_add(i)).collect();
            let mut client = wait_for_public_port(public_port).await;
            client.write_all(&payload).await.unwrap();

            // Read the full echo back before doing anything that could
            // half-close the socket: the pump's close semantics are
            // deliberately coarse (first EOF in either direction tears down
            // both, SPEC_FULL.md §4.4), so shutting down the write side
            // first would race the tail of the return traffic.
            let mut got = vec![0u8; payload.len()];
            client.read_exact(&mut got).await.unwrap();
            assert_eq!(got, payload, "client {} did not get a byte-identical echo", i);
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }
}

#[tokio::test]
async fn bridge_timeout_closes_the_client_and_the_control_channel() {
    let (control_port, _server_stop) = spawn_server().await;

    let target_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_port = target_listener.local_addr().unwrap().port();

    let public_port = {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        port
    };

    // A bare control connection that completes the handshake but never
    // dials a bridge port, standing in for an agent stuck after handshake.
    let control = TcpStream::connect(("127.0.0.1", control_port)).await.unwrap();
    let (mut control_read, mut control_write) = control.into_split();
    shared::protocol::write_port(&mut control_write, public_port)
        .await
        .unwrap();

    let mut client = wait_for_public_port(public_port).await;

    let mut buf = [0u8; 1];
    let n = tokio::time::timeout(Duration::from_secs(7), client.read(&mut buf))
        .await
        .expect("client must observe a close within the bridge timeout")
        .unwrap();
    assert_eq!(n, 0, "client socket must be closed once the bridge slot expires");

    // The control channel is torn down too: the next read observes EOF.
    let mut probe = [0u8; 1];
    let n = tokio::time::timeout(Duration::from_secs(1), control_read.read(&mut probe))
        .await
        .expect("control channel must also close")
        .unwrap();
    assert_eq!(n, 0);

    let _ = target_listener;
}

#[tokio::test]
async fn agent_reconnects_after_the_server_restarts() {
    let control_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let control_port = control_listener.local_addr().unwrap().port();
    let server_stop = Trigger::new();
    tokio::spawn(proxy_server::serve_on(control_listener, server_stop.clone()));

    let target_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let target_port = target_listener.local_addr().unwrap().port();

    let public_port = {
        let probe = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = probe.local_addr().unwrap().port();
        drop(probe);
        port
    };

    let _agent_stop = spawn_agent(control_port, public_port, target_port).await;
    wait_for_public_port(public_port).await;

    // Kill the server side; the agent's liveness read fails and it starts
    // backing off. Bring a fresh server up on the very same control port.
    server_stop.trigger();
    tokio::time::sleep(Duration::from_millis(200)).await;

    let control_listener = TcpListener::bind(("127.0.0.1", control_port)).await.unwrap();
    let server_stop = Trigger::new();
    tokio::spawn(proxy_server::serve_on(control_listener, server_stop));

    let mut client = tokio::time::timeout(
        Duration::from_secs(8),
        async { wait_for_public_port(public_port).await },
    )
    .await
    .expect("agent must re-handshake and reopen the public port");

    let (mut target_socket, _) = target_listener.accept().await.unwrap();
    client.write_all(b"HELLO\n").await.unwrap();
    let mut got = [0u8; 6];
    target_socket.read_exact(&mut got).await.unwrap();
    assert_eq!(&got, b"HELLO\n");
}
