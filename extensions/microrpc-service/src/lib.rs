mod call_options;
pub use call_options::*;

pub mod constants;

mod request_metadata;
pub use request_metadata::*;

mod result_status;
pub use result_status::*;

mod rpc_method;
pub use rpc_method::*;
