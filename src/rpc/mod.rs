//! Binary RPC server: a length-prefixed, big-endian control protocol.
//!
//! Clients open a TCP connection, send one request, read one response, and
//! close. See [`protocol`] for the wire format and [`server::start_rpc_server`]
//! for the accept loop.

pub(crate) mod handlers;
pub(crate) mod protocol;
mod server;

pub use server::start_rpc_server;
