use example_microrpc_service_definition::{
    GetById, GetByIdRequest, GetByIdResponse, RecordVisit, RecordVisitRequest,
    USER_SERVICE_NAME,
};
use microrpc::frame::{FrameCodec, FrameStreamDecoder, Request, Response};
use microrpc::serializer::{JsonSerializer, Serializer, SerializerExt};
use microrpc_service::{RequestMetadata, RpcResultStatus};
use microrpc_tokio_rpc_server::utils::{
    bind_tcp_listener_on_random_port, tcp_listener_to_host_port,
};
use microrpc_tokio_rpc_server::{RpcServer, RpcServerConfig, RpcServiceRegistration};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_util::sync::CancellationToken;

fn registration(visits: Arc<AtomicUsize>) -> RpcServiceRegistration {
    let mut service = RpcServiceRegistration::new(USER_SERVICE_NAME);
    service
        .register_method::<GetById, _, _>(|_ctx, request| async move {
            Ok(GetByIdResponse {
                name: format!("user {}", request.id),
            })
        })
        .unwrap()
        .register_method::<RecordVisit, _, _>(move |_ctx, _request| {
            let visits = visits.clone();
            async move {
                visits.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })
        .unwrap();
    service
}

struct TestServer {
    address: String,
    visits: Arc<AtomicUsize>,
    shutdown: CancellationToken,
    task: tokio::task::JoinHandle<std::io::Result<std::net::SocketAddr>>,
}

async fn start(config: RpcServerConfig) -> TestServer {
    let (listener, _) = bind_tcp_listener_on_random_port().await.unwrap();
    let (ip, port) = tcp_listener_to_host_port(&listener).unwrap();

    let visits = Arc::new(AtomicUsize::new(0));
    let mut server = RpcServer::with_config(config);
    server
        .endpoint_mut()
        .register_service(registration(visits.clone()))
        .unwrap();
    assert!(server.endpoint().has_service(USER_SERVICE_NAME));
    assert_eq!(server.config().max_frame_size, config.max_frame_size);

    let shutdown = CancellationToken::new();
    let task = tokio::spawn(Arc::new(server).serve_with_shutdown(listener, shutdown.clone()));

    TestServer {
        address: format!("{ip}:{port}"),
        visits,
        shutdown,
        task,
    }
}

fn get_by_id(request_id: u32, id: u64) -> Vec<u8> {
    let payload = JsonSerializer.encode_typed(&GetByIdRequest { id }).unwrap();
    let request = Request::new(request_id, JsonSerializer.code(), USER_SERVICE_NAME, "GetByID", payload);
    FrameCodec::encode_request(&request).unwrap()
}

/// Reads exactly one response frame, or `None` if the server closed the
/// connection first.
async fn read_response(stream: &mut TcpStream, decoder: &mut FrameStreamDecoder) -> Option<Response> {
    let mut buf = [0u8; 4096];
    loop {
        let n = tokio::time::timeout(Duration::from_secs(5), stream.read(&mut buf))
            .await
            .expect("server did not answer in time")
            .unwrap_or(0);
        if n == 0 {
            return None;
        }
        if let Some(frame) = decoder.read_bytes(&buf[..n]).next() {
            return Some(FrameCodec::decode_response(&frame.unwrap()).unwrap());
        }
    }
}

fn user_name(response: &Response) -> String {
    let output: GetByIdResponse = JsonSerializer.decode_typed(&response.payload).unwrap();
    output.name
}

#[tokio::test]
async fn answers_a_request() {
    let server = start(RpcServerConfig::default()).await;
    let mut stream = TcpStream::connect(&server.address).await.unwrap();
    let mut decoder = FrameStreamDecoder::new();

    stream.write_all(&get_by_id(41, 123)).await.unwrap();
    let response = read_response(&mut stream, &mut decoder).await.unwrap();

    assert_eq!(response.request_id, 41);
    assert!(!response.is_error());
    assert_eq!(user_name(&response), "user 123");
}

#[tokio::test]
async fn answers_back_to_back_requests_in_order() {
    // A read buffer smaller than one frame forces reassembly across reads.
    let server = start(RpcServerConfig::default().with_read_buffer_size(7)).await;
    let mut stream = TcpStream::connect(&server.address).await.unwrap();
    let mut decoder = FrameStreamDecoder::new();

    let mut bytes = get_by_id(1, 10);
    bytes.extend(get_by_id(2, 20));
    stream.write_all(&bytes).await.unwrap();

    let mut responses = Vec::new();
    let mut buf = [0u8; 4096];
    while responses.len() < 2 {
        let n = stream.read(&mut buf).await.unwrap();
        assert!(n > 0, "connection closed early");
        for frame in decoder.read_bytes(&buf[..n]) {
            responses.push(FrameCodec::decode_response(&frame.unwrap()).unwrap());
        }
    }

    assert_eq!(responses[0].request_id, 1);
    assert_eq!(user_name(&responses[0]), "user 10");
    assert_eq!(responses[1].request_id, 2);
    assert_eq!(user_name(&responses[1]), "user 20");
}

#[tokio::test]
async fn unsupported_serializer_keeps_the_connection_open() {
    let server = start(RpcServerConfig::default()).await;
    let mut stream = TcpStream::connect(&server.address).await.unwrap();
    let mut decoder = FrameStreamDecoder::new();

    let mut request = Request::new(5, 99, USER_SERVICE_NAME, "GetByID", b"{\"id\":1}".to_vec());
    request.meta.insert("tenant".into(), "blue".into());
    stream
        .write_all(&FrameCodec::encode_request(&request).unwrap())
        .await
        .unwrap();

    let response = read_response(&mut stream, &mut decoder).await.unwrap();
    assert_eq!(response.request_id, 5);
    assert_eq!(response.serializer_code, 99);
    assert_eq!(
        RpcResultStatus::classify(&response.error_text().unwrap()),
        RpcResultStatus::UnsupportedSerializer
    );

    stream.write_all(&get_by_id(6, 7)).await.unwrap();
    let response = read_response(&mut stream, &mut decoder).await.unwrap();
    assert_eq!(response.request_id, 6);
    assert_eq!(user_name(&response), "user 7");
}

#[tokio::test]
async fn malformed_frame_closes_the_connection() {
    let server = start(RpcServerConfig::default()).await;
    let mut stream = TcpStream::connect(&server.address).await.unwrap();
    let mut decoder = FrameStreamDecoder::new();

    // A header segment without its trailing delimiter.
    let mut frame = Vec::new();
    frame.extend_from_slice(&3u32.to_be_bytes());
    frame.extend_from_slice(&0u32.to_be_bytes());
    frame.extend_from_slice(&1u32.to_be_bytes());
    frame.extend_from_slice(&[0, 0, JsonSerializer.code()]);
    frame.extend_from_slice(b"abc");
    stream.write_all(&frame).await.unwrap();

    assert!(read_response(&mut stream, &mut decoder).await.is_none());

    // Other connections are unaffected.
    let mut other = TcpStream::connect(&server.address).await.unwrap();
    let mut other_decoder = FrameStreamDecoder::new();
    other.write_all(&get_by_id(2, 2)).await.unwrap();
    assert!(read_response(&mut other, &mut other_decoder).await.is_some());
}

#[tokio::test]
async fn oversized_frame_closes_the_connection() {
    let server = start(RpcServerConfig::default().with_max_frame_size(64)).await;
    let mut stream = TcpStream::connect(&server.address).await.unwrap();
    let mut decoder = FrameStreamDecoder::new();

    let payload = JsonSerializer.encode_typed(&"x".repeat(256)).unwrap();
    let request = Request::new(3, JsonSerializer.code(), USER_SERVICE_NAME, "GetByID", payload);
    stream
        .write_all(&FrameCodec::encode_request(&request).unwrap())
        .await
        .unwrap();

    assert!(read_response(&mut stream, &mut decoder).await.is_none());
}

#[tokio::test]
async fn oneway_request_gets_no_response() {
    let server = start(RpcServerConfig::default()).await;
    let mut stream = TcpStream::connect(&server.address).await.unwrap();
    let mut decoder = FrameStreamDecoder::new();

    let mut request = Request::new(
        8,
        JsonSerializer.code(),
        USER_SERVICE_NAME,
        "RecordVisit",
        JsonSerializer.encode_typed(&RecordVisitRequest { user_id: 1 }).unwrap(),
    );
    request.meta = RequestMetadata {
        oneway: true,
        ..Default::default()
    }
    .to_meta();
    stream
        .write_all(&FrameCodec::encode_request(&request).unwrap())
        .await
        .unwrap();

    // The next response on the wire belongs to the follow-up request.
    stream.write_all(&get_by_id(9, 3)).await.unwrap();
    let response = read_response(&mut stream, &mut decoder).await.unwrap();
    assert_eq!(response.request_id, 9);

    for _ in 0..100 {
        if server.visits.load(Ordering::SeqCst) == 1 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("oneway handler never ran");
}

#[tokio::test]
async fn shutdown_stops_the_server() {
    let server = start(RpcServerConfig::default()).await;
    let mut stream = TcpStream::connect(&server.address).await.unwrap();
    let mut decoder = FrameStreamDecoder::new();

    stream.write_all(&get_by_id(1, 1)).await.unwrap();
    assert!(read_response(&mut stream, &mut decoder).await.is_some());

    server.shutdown.cancel();
    let bound = tokio::time::timeout(Duration::from_secs(5), server.task)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(bound.to_string(), server.address);

    // Open connections are closed as well.
    assert!(read_response(&mut stream, &mut decoder).await.is_none());
    assert!(TcpStream::connect(&server.address).await.is_err());
}
