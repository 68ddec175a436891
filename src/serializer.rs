mod json_serializer;
mod serializer_error;
mod serializer_registry;
mod serializer_trait;

pub use json_serializer::{JSON_SERIALIZER_CODE, JsonSerializer};
pub use serializer_error::SerializerError;
pub use serializer_registry::{DuplicateSerializerCode, SerializerRegistry};
pub use serializer_trait::{Serializer, SerializerExt};
