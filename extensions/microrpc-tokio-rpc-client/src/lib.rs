mod client_config;
pub use client_config::*;

mod connection;
pub use connection::*;

mod pool;
pub use pool::*;

mod rpc_client;
pub use rpc_client::*;

pub use microrpc_service::CallOptions;
pub use microrpc_service_caller::{RpcCallerError, RpcServiceCallerInterface, call_method};
