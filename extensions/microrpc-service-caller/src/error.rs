use microrpc::frame::{FrameDecodeError, FrameEncodeError};
use microrpc::serializer::SerializerError;
use microrpc_service::{ContextError, RpcResultStatus};
use std::io;
use thiserror::Error;

/// An error message returned by the server, classified by its prefix.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub status: RpcResultStatus,
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        let message = message.into();
        let status = RpcResultStatus::classify(&message);
        let message = match status {
            RpcResultStatus::Application => {
                RpcResultStatus::application_detail(&message).to_owned()
            }
            _ => message,
        };
        Self { status, message }
    }

    /// `true` when the handler itself failed, as opposed to the server
    /// rejecting the request (unknown service, unsupported serializer, ...).
    pub fn is_application(&self) -> bool {
        self.status == RpcResultStatus::Application
    }
}

/// Represents errors that can occur during an RPC call from the perspective of the caller.
#[derive(Debug, Error)]
pub enum RpcCallerError {
    /// The argument could not be serialized. Nothing was sent.
    #[error("failed to encode argument: {0}")]
    Encode(#[source] SerializerError),

    /// The response payload could not be deserialized into the result type.
    #[error("failed to decode result: {0}")]
    Decode(#[source] SerializerError),

    /// The request could not be framed (reserved delimiter in a name or meta
    /// entry). Nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] FrameEncodeError),

    /// The response bytes were not a valid frame.
    #[error("malformed response frame: {0}")]
    MalformedFrame(#[from] FrameDecodeError),

    /// The response answered a different request than the one sent.
    #[error("response for request {actual} received while awaiting {expected}")]
    MismatchedResponse { expected: u32, actual: u32 },

    /// Dialing, writing or reading failed.
    #[error("network error: {0}")]
    Network(#[from] io::Error),

    /// The call was cancelled or its deadline passed before the network step
    /// finished.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The server answered with an error message.
    #[error("remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Returned by every one-way call once the request has been sent.
    #[error("this is a oneway call, no result will be returned")]
    OneWayNotAwaitable,

    /// The network task ended without producing a result.
    #[error("rpc call aborted")]
    Aborted,
}

impl RpcCallerError {
    pub fn remote_status(&self) -> Option<RpcResultStatus> {
        match self {
            RpcCallerError::Remote(remote) => Some(remote.status),
            _ => None,
        }
    }
}
