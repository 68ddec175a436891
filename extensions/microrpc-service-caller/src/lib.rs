mod call_method;
pub use call_method::*;

mod caller_interface;
pub use caller_interface::*;

pub mod error;
pub use error::{RemoteError, RpcCallerError};

mod macros;

mod method_stub;
pub use method_stub::*;
