// MIT License - Copyright (c) 2026 Peter Wright
// TCP connection to the module

use std::io;
use std::time::Duration;

use tokio::net::{lookup_host, TcpSocket, TcpStream};
use tokio::time::timeout;
use tracing::{debug, error};

use crate::config::ConnectionConfig;
use crate::error::{Result, WiflyError};

/// Open a socket to the module configured in `config`.
///
/// The socket has `SO_REUSEADDR` and `TCP_NODELAY` set. Connecting is
/// bounded by `connect_timeout` so an unreachable module fails the attempt
/// instead of stalling it.
pub async fn connect(config: &ConnectionConfig, connect_timeout: Duration) -> Result<TcpStream> {
    let port = config.port_number()?;
    let resolve_error = || WiflyError::Resolve {
        host: config.host.clone(),
        port,
    };

    let addr = lookup_host((config.host.as_str(), port))
        .await
        .map_err(|e| {
            error!("DNS lookup for {} failed: {}", config.host, e);
            resolve_error()
        })?
        .next()
        .ok_or_else(resolve_error)?;

    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()?
    } else {
        TcpSocket::new_v6()?
    };
    socket.set_reuseaddr(true)?;

    let stream = match timeout(connect_timeout, socket.connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(source)) => return Err(WiflyError::Connect { addr, source }),
        Err(_) => {
            return Err(WiflyError::Connect {
                addr,
                source: io::Error::new(io::ErrorKind::TimedOut, "connect timed out"),
            });
        }
    };
    stream.set_nodelay(true)?;

    debug!("TCP socket connected to {}", addr);
    Ok(stream)
}
