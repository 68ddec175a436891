use crate::RpcCallerError;
use microrpc::frame::Response;
use microrpc::serializer::Serializer;
use microrpc_service::CallOptions;
use std::sync::Arc;

/// Defines the transport a client uses to reach a server.
///
/// Implementors provide the serializer they stamp on requests and a single
/// network round trip for an already-encoded request frame. Everything else
/// (argument encoding, meta, racing the deadline, result decoding) is done
/// once in [`call_method`](crate::call_method) on top of this trait, so a
/// wrapper that adds traffic policy only has to implement these two methods.
#[async_trait::async_trait]
pub trait RpcServiceCallerInterface: Send + Sync + 'static {
    /// The serializer used to encode arguments and decode results.
    fn serializer(&self) -> Arc<dyn Serializer>;

    /// Sends `frame` and, unless `oneway`, reads back the response.
    ///
    /// Runs on its own task and may outlive the caller's interest in the
    /// result; `options` is provided so implementations can stop waiting for
    /// resources (such as a pooled connection) once the call is abandoned.
    /// One-way calls return `Ok(None)` as soon as the frame is written.
    async fn round_trip(
        &self,
        options: CallOptions,
        frame: Vec<u8>,
        oneway: bool,
    ) -> Result<Option<Response>, RpcCallerError>;
}
