use crate::serializer::SerializerError;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

/// A pluggable payload codec, identified on the wire by a one-byte code.
///
/// Implementations work on the dynamic `serde_json::Value` model so a single
/// object-safe trait can serve every method signature. Typed access goes
/// through [`SerializerExt`].
pub trait Serializer: Send + Sync + 'static {
    /// The code stamped into the `serializerCode` byte of every frame this
    /// serializer produces.
    fn code(&self) -> u8;

    fn encode(&self, value: &Value) -> Result<Vec<u8>, SerializerError>;

    fn decode(&self, bytes: &[u8]) -> Result<Value, SerializerError>;
}

/// Typed helpers layered over any [`Serializer`].
pub trait SerializerExt: Serializer {
    fn encode_typed<T: Serialize + ?Sized>(&self, value: &T) -> Result<Vec<u8>, SerializerError> {
        let value =
            serde_json::to_value(value).map_err(|e| SerializerError::Encode(e.to_string()))?;
        self.encode(&value)
    }

    /// Decodes `bytes` into `T`. An empty byte sequence decodes as `null`, so
    /// unit and optional results survive an empty payload.
    fn decode_typed<T: DeserializeOwned>(&self, bytes: &[u8]) -> Result<T, SerializerError> {
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            self.decode(bytes)?
        };
        serde_json::from_value(value).map_err(|e| SerializerError::Decode(e.to_string()))
    }
}

impl<S: Serializer + ?Sized> SerializerExt for S {}
