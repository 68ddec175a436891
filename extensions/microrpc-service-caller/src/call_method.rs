use crate::{RemoteError, RpcCallerError, RpcServiceCallerInterface};
use microrpc::frame::{FrameCodec, Request};
use microrpc::serializer::SerializerExt;
use microrpc::utils::increment_u32_id;
use microrpc_service::{CallOptions, RequestMetadata, RpcMethod};
use std::sync::Arc;

/// Performs one typed call of method `M` through `caller`.
///
/// The argument is serialized and framed locally; failures there never touch
/// the network. The network step runs on its own task and is raced against
/// the options' cancellation token and deadline. When the context wins, the
/// call returns immediately and the network task is left to finish in the
/// background so its connection is released rather than leaked.
///
/// One-way calls return [`RpcCallerError::OneWayNotAwaitable`] once the
/// request has been written.
pub async fn call_method<M, C>(
    caller: &Arc<C>,
    options: &CallOptions,
    input: &M::Input,
) -> Result<M::Output, RpcCallerError>
where
    M: RpcMethod,
    C: RpcServiceCallerInterface + ?Sized,
{
    let serializer = caller.serializer();
    let payload = serializer
        .encode_typed(input)
        .map_err(RpcCallerError::Encode)?;

    let mut request = Request::new(
        increment_u32_id(),
        serializer.code(),
        M::SERVICE_NAME,
        M::METHOD_NAME,
        payload,
    );
    request.meta = RequestMetadata::from_call_options(options).to_meta();

    let frame = FrameCodec::encode_request(&request)?;

    options.check()?;

    let oneway = options.is_oneway();
    let network = tokio::spawn({
        let caller = Arc::clone(caller);
        let options = options.clone();
        async move { caller.round_trip(options, frame, oneway).await }
    });

    let outcome = tokio::select! {
        biased;

        joined = network => joined.map_err(|_| RpcCallerError::Aborted)?,
        reason = options.done() => {
            tracing::debug!(
                "{}.{} (request {}) stopped waiting: {}",
                M::SERVICE_NAME,
                M::METHOD_NAME,
                request.request_id,
                reason
            );
            return Err(RpcCallerError::Context(reason));
        }
    };

    let Some(response) = outcome? else {
        return Err(RpcCallerError::OneWayNotAwaitable);
    };

    if let Some(message) = response.error_text() {
        return Err(RemoteError::new(message).into());
    }

    serializer
        .decode_typed(&response.payload)
        .map_err(RpcCallerError::Decode)
}
