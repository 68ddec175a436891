mod call_context;
pub use call_context::*;

mod endpoint;
pub use endpoint::*;

pub mod error;
pub use error::{BoxError, RpcHandlerError, RpcServiceEndpointError};

mod registration;
pub use registration::*;
