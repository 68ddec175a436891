use crate::{RpcCallerError, RpcServiceCallerInterface, call_method};
use microrpc_service::{CallOptions, RpcMethod};
use std::marker::PhantomData;
use std::sync::Arc;

/// A remote method bound to a caller, callable like a local async function.
pub struct MethodStub<M, C: ?Sized> {
    caller: Arc<C>,
    _method: PhantomData<fn() -> M>,
}

impl<M, C: ?Sized> Clone for MethodStub<M, C> {
    fn clone(&self) -> Self {
        Self {
            caller: Arc::clone(&self.caller),
            _method: PhantomData,
        }
    }
}

impl<M, C> MethodStub<M, C>
where
    M: RpcMethod,
    C: RpcServiceCallerInterface + ?Sized,
{
    pub fn new(caller: Arc<C>) -> Self {
        Self {
            caller,
            _method: PhantomData,
        }
    }

    pub async fn call(
        &self,
        options: &CallOptions,
        input: &M::Input,
    ) -> Result<M::Output, RpcCallerError> {
        call_method::<M, C>(&self.caller, options, input).await
    }

    pub fn caller(&self) -> &Arc<C> {
        &self.caller
    }

    pub fn service_name(&self) -> &'static str {
        M::SERVICE_NAME
    }

    pub fn method_name(&self) -> &'static str {
        M::METHOD_NAME
    }
}

/// A client-side service descriptor whose method fields are filled in once,
/// from a single caller.
///
/// Usually generated with [`rpc_service_stub!`](crate::rpc_service_stub).
pub trait BindService<C: ?Sized>: Sized {
    fn bind(caller: &Arc<C>) -> Self;
}
