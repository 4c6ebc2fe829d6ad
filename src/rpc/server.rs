//! Accept loop for the binary RPC server.
//!
//! The RPC wire format has no router to dispatch through: each connection is
//! read and handled by hand, one request at a time, then closed.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tracing::{info, warn};

use crate::error::{Error, Result, RpcError};
use crate::{Config, UsenetDownloader};

use super::handlers;
use super::protocol::{self, ProtocolError};

/// Start the binary RPC server, binding to `config.server.rpc.bind_address`
/// and serving connections until the process shuts down.
///
/// # Example
///
/// ```no_run
/// use usenet_dl::{UsenetDownloader, Config};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let downloader = Arc::new(UsenetDownloader::new((*config).clone()).await?);
///
/// usenet_dl::rpc::start_rpc_server(downloader, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_rpc_server(downloader: Arc<UsenetDownloader>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.server.rpc.bind_address;

    info!(address = %bind_address, "Starting RPC server");

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(Error::Io)?;

    info!(address = %bind_address, "RPC server listening");

    loop {
        let (socket, peer_addr) = match listener.accept().await {
            Ok(pair) => pair,
            Err(e) => {
                warn!(error = %e, "RPC server failed to accept connection");
                continue;
            }
        };

        let downloader = downloader.clone();
        let config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = handle_connection(socket, peer_addr, &downloader, &config).await {
                warn!(client = %peer_addr, error = %e, "RPC connection rejected, closing socket");
            }
        });
    }
}

/// Handle exactly one request on `socket`, then close it.
///
/// Per the protocol's error-handling design: a bad signature, bad password,
/// unknown request type, or struct-size mismatch is logged (with the client's
/// address) and the socket is closed without any attempt at recovery — there
/// is no retry or resynchronization within a connection.
async fn handle_connection(
    mut socket: TcpStream,
    peer_addr: SocketAddr,
    downloader: &Arc<UsenetDownloader>,
    config: &Arc<Config>,
) -> Result<()> {
    let header = match protocol::read_header(&mut socket).await {
        Ok(header) => header,
        Err(ProtocolError::ConnectionClosed) => return Ok(()),
        Err(ProtocolError::BadSignature { .. }) => {
            return Err(Error::Rpc(RpcError::BadSignature));
        }
        Err(ProtocolError::Io(e)) => return Err(Error::Io(e)),
        Err(ProtocolError::UnknownType(t)) => return Err(Error::Rpc(RpcError::UnknownType(t))),
    };

    if !password_matches(&config.server.rpc.password, &header.password) {
        return Err(Error::Rpc(RpcError::BadPassword));
    }

    let Some(request_type) = protocol::RequestType::from_u32(header.msg_type) else {
        return Err(Error::Rpc(RpcError::UnknownType(header.msg_type)));
    };

    let expected_size = handlers::expected_request_size(request_type);
    if header.struct_size as usize != expected_size {
        return Err(Error::Rpc(RpcError::SizeMismatch {
            expected: expected_size as u32,
            actual: header.struct_size,
        }));
    }

    handlers::dispatch(request_type, &mut socket, downloader).await
}

/// Compare the configured RPC password against the header's null-padded field.
/// An empty configured password means "accept anything" (no authentication configured).
fn password_matches(configured: &str, presented: &[u8; protocol::PASSWORD_LEN]) -> bool {
    if configured.is_empty() {
        return true;
    }
    let presented_str = presented
        .split(|&b| b == 0)
        .next()
        .map(|bytes| String::from_utf8_lossy(bytes))
        .unwrap_or_default();
    presented_str == configured
}
