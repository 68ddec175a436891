use example_microrpc_service_definition::{
    GetByIdRequest, GetByIdResponse, RecordVisitRequest, SlowEchoRequest, UserService,
    user_service_registration,
};
use microrpc_service_endpoint::{BoxError, RpcCallContext};
use microrpc_tokio_rpc_server::RpcServer;
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpListener;

/// An in-memory `UserService` backing the demo and the benchmarks.
pub struct DemoUserService {
    names: HashMap<u64, String>,
    visits: AtomicU64,
}

impl DemoUserService {
    pub fn new() -> Self {
        Self {
            names: HashMap::from([(123, "hello, world".to_owned())]),
            visits: AtomicU64::new(0),
        }
    }

    pub fn visits(&self) -> u64 {
        self.visits.load(Ordering::Relaxed)
    }
}

impl Default for DemoUserService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl UserService for DemoUserService {
    async fn get_by_id(
        &self,
        _ctx: RpcCallContext,
        request: GetByIdRequest,
    ) -> Result<GetByIdResponse, BoxError> {
        match self.names.get(&request.id) {
            Some(name) => Ok(GetByIdResponse { name: name.clone() }),
            None => Err(format!("user {} not found", request.id).into()),
        }
    }

    async fn slow_echo(
        &self,
        _ctx: RpcCallContext,
        request: SlowEchoRequest,
    ) -> Result<String, BoxError> {
        tokio::time::sleep(Duration::from_millis(request.delay_ms)).await;
        Ok(request.message)
    }

    async fn record_visit(
        &self,
        ctx: RpcCallContext,
        request: RecordVisitRequest,
    ) -> Result<(), BoxError> {
        let total = self.visits.fetch_add(1, Ordering::Relaxed) + 1;
        tracing::info!(
            "Visit from user {} (request {}, {} total)",
            request.user_id,
            ctx.request_id,
            total
        );
        Ok(())
    }
}

/// Serves `service` on `listener` in a background task.
pub fn spawn_demo_server(
    listener: TcpListener,
    service: Arc<DemoUserService>,
) -> io::Result<tokio::task::JoinHandle<io::Result<std::net::SocketAddr>>> {
    let mut server = RpcServer::new();
    server
        .register_service(user_service_registration(service).map_err(io::Error::other)?)
        .map_err(io::Error::other)?;

    Ok(tokio::spawn(Arc::new(server).serve_with_listener(listener)))
}
