use example_microrpc_service_definition::{
    GetByIdRequest, RecordVisitRequest, SlowEchoRequest, UserServiceClient,
};
use example_microrpc_tcp_rpc_app::{DemoUserService, spawn_demo_server};
use microrpc_service::CallOptions;
use microrpc_service_caller::BindService;
use microrpc_tokio_rpc_client::RpcClient;
use microrpc_tokio_rpc_server::utils::bind_tcp_listener_on_random_port;
use std::sync::Arc;
use std::time::Duration;
use tokio::join;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .try_init();

    // Bind to a random available port
    let (listener, port) = bind_tcp_listener_on_random_port().await?;
    let service = Arc::new(DemoUserService::new());
    let _server_task = spawn_demo_server(listener, service.clone())?;

    let client = RpcClient::new(&format!("127.0.0.1:{port}")).await?;
    let users = UserServiceClient::bind(&client);
    let options = CallOptions::new().with_timeout(Duration::from_secs(5));

    let slow_echo_request = SlowEchoRequest {
        message: "ping".into(),
        delay_ms: 100,
    };

    // `join!` will await all responses before proceeding
    let (found, missing, echoed) = join!(
        users.get_by_id.call(&options, &GetByIdRequest { id: 123 }),
        users.get_by_id.call(&options, &GetByIdRequest { id: 7 }),
        users.slow_echo.call(&options, &slow_echo_request),
    );

    println!("Result from get_by_id(123): {:?}", found);
    println!("Result from get_by_id(7): {:?}", missing);
    println!("Result from slow_echo(): {:?}", echoed);

    let timed_out = users
        .slow_echo
        .call(
            &CallOptions::new().with_timeout(Duration::from_millis(50)),
            &SlowEchoRequest {
                message: "too slow".into(),
                delay_ms: 1_000,
            },
        )
        .await;
    println!("Result from slow_echo() with a 50ms deadline: {:?}", timed_out);

    let oneway = users
        .record_visit
        .call(&CallOptions::new().oneway(), &RecordVisitRequest { user_id: 123 })
        .await;
    println!("Result from oneway record_visit(): {:?}", oneway);

    // Give the one-way handler a moment to run.
    tokio::time::sleep(Duration::from_millis(100)).await;
    println!("Visits recorded: {}", service.visits());
    println!("Pool status: {:?}", client.pool_status());

    Ok(())
}
