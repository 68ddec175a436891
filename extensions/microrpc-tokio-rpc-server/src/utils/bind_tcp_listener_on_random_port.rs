use std::io::Result;
use tokio::net::TcpListener;

/// Binds a `TcpListener` to an OS-assigned port on the loopback address
/// (`127.0.0.1`) and returns it together with the port number.
///
/// Tests and demos use this to start a server without picking a port by
/// hand; the returned port is what a client dials.
pub async fn bind_tcp_listener_on_random_port() -> Result<(TcpListener, u16)> {
    // Port 0 asks the OS for any free ephemeral port.
    let listener = TcpListener::bind("127.0.0.1:0").await?;

    // The listener's local address carries the port actually assigned.
    let port = listener.local_addr()?.port();

    Ok((listener, port))
}
