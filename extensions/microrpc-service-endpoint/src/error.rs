use microrpc::serializer::{DuplicateSerializerCode, SerializerError};
use microrpc_service::RpcResultStatus;
use thiserror::Error;

/// The error type handlers return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Setup errors raised while registering services, methods and serializers.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RpcServiceEndpointError {
    #[error("service {0:?} is already registered")]
    DuplicateService(String),

    #[error("method {service}.{method} is already registered")]
    DuplicateMethod { service: String, method: String },

    #[error("method {method} belongs to service {expected:?}, not {actual:?}")]
    ServiceMismatch {
        method: String,
        expected: String,
        actual: String,
    },

    #[error(transparent)]
    DuplicateSerializer(#[from] DuplicateSerializerCode),
}

/// Ways a single invocation can fail once its handler has been resolved.
#[derive(Debug, Error)]
pub enum RpcHandlerError {
    #[error("{0}")]
    Decode(SerializerError),

    #[error("{0}")]
    Encode(SerializerError),

    #[error("deadline passed before the handler finished")]
    DeadlineExceeded,

    #[error("{0}")]
    Application(BoxError),
}

impl RpcHandlerError {
    /// Renders the error message carried in the response frame.
    pub fn to_wire_message(&self) -> String {
        match self {
            RpcHandlerError::Decode(e) => RpcResultStatus::DecodeFailed.message(&e.to_string()),
            RpcHandlerError::Encode(e) => RpcResultStatus::EncodeFailed.message(&e.to_string()),
            RpcHandlerError::DeadlineExceeded => RpcResultStatus::DeadlineExceeded.message(""),
            RpcHandlerError::Application(e) => {
                let message = e.to_string();
                // An empty message would read as a successful nil result.
                if message.is_empty() {
                    "handler returned an error".to_owned()
                } else {
                    RpcResultStatus::Application.message(&message)
                }
            }
        }
    }
}
