use crate::{RpcCallContext, RpcHandlerError, RpcServiceEndpointError, RpcServiceRegistration};
use microrpc::frame::{Request, Response};
use microrpc::serializer::{Serializer, SerializerRegistry};
use microrpc_service::{RequestMetadata, RpcResultStatus};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::future::Future;
use std::sync::Arc;

/// Resolves decoded requests to registered services and invokes them.
///
/// Services and serializers are registered through `&mut self` during setup.
/// Once the endpoint is shared (typically behind the server's `Arc`) both
/// tables are read without locking.
pub struct RpcServiceEndpoint {
    services: HashMap<String, RpcServiceRegistration>,
    serializers: SerializerRegistry,
}

impl Default for RpcServiceEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

impl RpcServiceEndpoint {
    /// Creates an endpoint that understands the default JSON serializer.
    pub fn new() -> Self {
        Self::with_serializers(SerializerRegistry::default())
    }

    pub fn with_serializers(serializers: SerializerRegistry) -> Self {
        Self {
            services: HashMap::new(),
            serializers,
        }
    }

    pub fn register_service(
        &mut self,
        registration: RpcServiceRegistration,
    ) -> Result<(), RpcServiceEndpointError> {
        match self.services.entry(registration.name().to_owned()) {
            Entry::Occupied(entry) => Err(RpcServiceEndpointError::DuplicateService(
                entry.key().clone(),
            )),
            Entry::Vacant(entry) => {
                tracing::debug!(
                    "Registered service {} ({} methods)",
                    registration.name(),
                    registration.method_names().count()
                );
                entry.insert(registration);
                Ok(())
            }
        }
    }

    pub fn register_serializer(
        &mut self,
        serializer: Arc<dyn Serializer>,
    ) -> Result<(), RpcServiceEndpointError> {
        Ok(self.serializers.register(serializer)?)
    }

    pub fn has_service(&self, service_name: &str) -> bool {
        self.services.contains_key(service_name)
    }

    pub fn serializers(&self) -> &SerializerRegistry {
        &self.serializers
    }

    /// Serves one request and returns the response to send back.
    ///
    /// Lookup failures, undecodable arguments and handler errors all become
    /// error responses; none of them affect the connection. One-way requests
    /// are spawned onto their own task and answered at once with the
    /// [`RpcResultStatus::OneWayAccepted`] marker, which transports do not
    /// need to deliver.
    pub async fn invoke(&self, request: Request) -> Response {
        let response = Response::for_request(&request);

        let Some(service) = self.services.get(&request.service_name) else {
            tracing::debug!("Request {} for unknown service {}", request.request_id, request.service_name);
            return response
                .with_error(RpcResultStatus::ServiceNotFound.message(&request.service_name));
        };

        let metadata = RequestMetadata::from_meta(&request.meta);
        let context = RpcCallContext::from_request(&request, metadata);
        let oneway = context.oneway;

        let invocation = match self.prepare(service, context, request.serializer_code, request.payload) {
            Ok(invocation) => invocation,
            Err(message) => {
                tracing::debug!("Request {} rejected: {}", request.request_id, message);
                return response.with_error(message);
            }
        };

        if oneway {
            let request_id = request.request_id;
            tokio::spawn(async move {
                if let Err(message) = invocation.await {
                    tracing::warn!("Oneway request {} failed: {}", request_id, message);
                }
            });
            return response.with_error(RpcResultStatus::OneWayAccepted.message(""));
        }

        match invocation.await {
            Ok(payload) => response.with_payload(payload),
            Err(message) => response.with_error(message),
        }
    }

    /// Resolves the method and serializer and builds the invocation future,
    /// bounded by the propagated deadline.
    fn prepare(
        &self,
        service: &RpcServiceRegistration,
        context: RpcCallContext,
        serializer_code: u8,
        payload: Vec<u8>,
    ) -> Result<impl Future<Output = Result<Vec<u8>, String>> + Send + 'static, String> {
        let Some(handler) = service.method(&context.method_name) else {
            return Err(RpcResultStatus::MethodNotFound
                .message(&format!("{}.{}", context.service_name, context.method_name)));
        };

        let Some(serializer) = self.serializers.get(serializer_code) else {
            return Err(
                RpcResultStatus::UnsupportedSerializer.message(&format!("code {serializer_code}"))
            );
        };

        let remaining = context.remaining();
        if remaining == Some(std::time::Duration::ZERO) {
            return Err(RpcHandlerError::DeadlineExceeded.to_wire_message());
        }

        let call = handler(context, serializer, payload);

        Ok(async move {
            let outcome = match remaining {
                Some(remaining) => tokio::time::timeout(remaining, call)
                    .await
                    .unwrap_or(Err(RpcHandlerError::DeadlineExceeded)),
                None => call.await,
            };
            outcome.map_err(|e| e.to_wire_message())
        })
    }
}
