//! Line-delimited JSON-RPC 2.0 transport.
//!
//! A [`Server`] keeps a table of named [`Handler`]s and serves requests read
//! one per line from an input stream, writing one response per line to an
//! output stream. The [`Transport`] trait is the seam plugin controllers
//! program against.

mod error;
pub mod protocol;
pub mod server;

pub use error::ServerError;
pub use protocol::{Request, Response, RpcError, JSONRPC_VERSION};
pub use server::{Handler, Server, Transport};
