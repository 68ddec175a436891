mod get_by_id;
pub use get_by_id::*;

mod record_visit;
pub use record_visit::*;

mod slow_echo;
pub use slow_echo::*;

use microrpc_service_caller::rpc_service_stub;
use microrpc_service_endpoint::{
    BoxError, RpcCallContext, RpcServiceEndpointError, RpcServiceRegistration,
};
use std::sync::Arc;

pub const USER_SERVICE_NAME: &str = "UserService";

rpc_service_stub! {
    /// Client handle for `UserService`.
    pub struct UserServiceClient {
        get_by_id: GetById,
        slow_echo: SlowEcho,
        record_visit: RecordVisit,
    }
}

/// Server-side contract for `UserService`.
#[async_trait::async_trait]
pub trait UserService: Send + Sync + 'static {
    async fn get_by_id(
        &self,
        ctx: RpcCallContext,
        request: GetByIdRequest,
    ) -> Result<GetByIdResponse, BoxError>;

    async fn slow_echo(
        &self,
        ctx: RpcCallContext,
        request: SlowEchoRequest,
    ) -> Result<String, BoxError>;

    async fn record_visit(
        &self,
        ctx: RpcCallContext,
        request: RecordVisitRequest,
    ) -> Result<(), BoxError>;
}

/// Builds the dispatch table routing every `UserService` method to `service`.
pub fn user_service_registration<S: UserService>(
    service: Arc<S>,
) -> Result<RpcServiceRegistration, RpcServiceEndpointError> {
    let mut registration = RpcServiceRegistration::new(USER_SERVICE_NAME);

    registration
        .register_method::<GetById, _, _>({
            let service = Arc::clone(&service);
            move |ctx, request| {
                let service = Arc::clone(&service);
                async move { service.get_by_id(ctx, request).await }
            }
        })?
        .register_method::<SlowEcho, _, _>({
            let service = Arc::clone(&service);
            move |ctx, request| {
                let service = Arc::clone(&service);
                async move { service.slow_echo(ctx, request).await }
            }
        })?
        .register_method::<RecordVisit, _, _>(move |ctx, request| {
            let service = Arc::clone(&service);
            async move { service.record_visit(ctx, request).await }
        })?;

    Ok(registration)
}
