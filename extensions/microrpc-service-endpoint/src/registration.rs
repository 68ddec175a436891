use crate::{BoxError, RpcCallContext, RpcHandlerError, RpcServiceEndpointError};
use futures::future::BoxFuture;
use microrpc::serializer::{Serializer, SerializerExt};
use microrpc_service::RpcMethod;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

/// A type-erased method handler: decodes the argument with the request's
/// serializer, runs the typed handler and encodes its result.
pub type RpcMethodHandler = Arc<
    dyn Fn(
            RpcCallContext,
            Arc<dyn Serializer>,
            Vec<u8>,
        ) -> BoxFuture<'static, Result<Vec<u8>, RpcHandlerError>>
        + Send
        + Sync,
>;

/// One service's dispatch table: method name to handler.
///
/// Built during setup and handed to the endpoint, after which it is never
/// mutated.
pub struct RpcServiceRegistration {
    name: String,
    methods: HashMap<String, RpcMethodHandler>,
}

impl RpcServiceRegistration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: HashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method_names(&self) -> impl Iterator<Item = &str> {
        self.methods.keys().map(String::as_str)
    }

    pub fn method(&self, method_name: &str) -> Option<&RpcMethodHandler> {
        self.methods.get(method_name)
    }

    /// Registers a typed handler for method `M`.
    ///
    /// `M::SERVICE_NAME` must match this registration's name.
    pub fn register_method<M, F, Fut>(
        &mut self,
        handler: F,
    ) -> Result<&mut Self, RpcServiceEndpointError>
    where
        M: RpcMethod,
        F: Fn(RpcCallContext, M::Input) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<M::Output, BoxError>> + Send + 'static,
    {
        if M::SERVICE_NAME != self.name {
            return Err(RpcServiceEndpointError::ServiceMismatch {
                method: M::METHOD_NAME.to_owned(),
                expected: M::SERVICE_NAME.to_owned(),
                actual: self.name.clone(),
            });
        }

        let handler = Arc::new(handler);
        let erased: RpcMethodHandler = Arc::new(
            move |context: RpcCallContext, serializer: Arc<dyn Serializer>, payload: Vec<u8>| {
                let handler = Arc::clone(&handler);
                Box::pin(async move {
                    let input: M::Input = serializer
                        .decode_typed(&payload)
                        .map_err(RpcHandlerError::Decode)?;
                    let output = handler(context, input)
                        .await
                        .map_err(RpcHandlerError::Application)?;
                    serializer
                        .encode_typed(&output)
                        .map_err(RpcHandlerError::Encode)
                }) as BoxFuture<'static, Result<Vec<u8>, RpcHandlerError>>
            },
        );

        self.register_raw(M::METHOD_NAME, erased)
    }

    /// Registers an already type-erased handler under `method_name`.
    pub fn register_raw(
        &mut self,
        method_name: impl Into<String>,
        handler: RpcMethodHandler,
    ) -> Result<&mut Self, RpcServiceEndpointError> {
        let method_name = method_name.into();
        if self.methods.contains_key(&method_name) {
            return Err(RpcServiceEndpointError::DuplicateMethod {
                service: self.name.clone(),
                method: method_name,
            });
        }

        self.methods.insert(method_name, handler);
        Ok(self)
    }
}
