pub mod constants;
pub mod frame;
pub mod serializer;
pub mod utils;
