use std::io::Result;
use std::net::{IpAddr, SocketAddr};
use tokio::net::TcpListener;

/// Returns the local IP and port a listener is bound to, e.g. to build the
/// `host:port` string a client dials after binding port 0.
pub fn tcp_listener_to_host_port(listener: &TcpListener) -> Result<(IpAddr, u16)> {
    let local_addr: SocketAddr = listener.local_addr()?;
    Ok((local_addr.ip(), local_addr.port()))
}
