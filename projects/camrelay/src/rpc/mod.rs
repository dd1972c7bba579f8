//! Line-delimited JSON-RPC 2.0 over Unix domain sockets.

pub mod client;
pub mod protocol;
pub mod server;
pub mod wire;

pub use client::{RpcClient, RpcClientError};
pub use protocol::{
    ErrorCode, Handler, HandlerError, HandlerResult, MethodTable, Params, Response,
};
pub use server::{BoundRpcServer, RpcServer};
