use microrpc::frame::{FrameCodec, Request, Response};
use microrpc::serializer::{JsonSerializer, Serializer, SerializerExt};
use microrpc_service::{CallOptions, ContextError, RpcMethod, RpcResultStatus};
use microrpc_service_caller::{
    BindService, RpcCallerError, RpcServiceCallerInterface, call_method, rpc_service_stub,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GetByIdRequest {
    id: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GetByIdResponse {
    name: String,
}

struct GetById;

impl RpcMethod for GetById {
    const SERVICE_NAME: &'static str = "UserService";
    const METHOD_NAME: &'static str = "GetByID";
    type Input = GetByIdRequest;
    type Output = GetByIdResponse;
}

struct Forget;

impl RpcMethod for Forget {
    const SERVICE_NAME: &'static str = "UserService";
    const METHOD_NAME: &'static str = "Forget";
    type Input = GetByIdRequest;
    type Output = ();
}

rpc_service_stub! {
    /// Client handle for the test user service.
    pub struct UserServiceClient {
        get_by_id: GetById,
        forget: Forget,
    }
}

type Responder = dyn Fn(&Request) -> Response + Send + Sync;

/// In-memory transport: decodes the request frame and answers via `respond`.
struct MockCaller {
    respond: Box<Responder>,
    delay: Duration,
    sent: Mutex<Vec<Request>>,
    finished: AtomicUsize,
}

impl MockCaller {
    fn new(respond: impl Fn(&Request) -> Response + Send + Sync + 'static) -> Arc<Self> {
        Self::with_delay(Duration::ZERO, respond)
    }

    fn with_delay(
        delay: Duration,
        respond: impl Fn(&Request) -> Response + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            delay,
            sent: Mutex::new(Vec::new()),
            finished: AtomicUsize::new(0),
        })
    }

    fn sent(&self) -> Vec<Request> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RpcServiceCallerInterface for MockCaller {
    fn serializer(&self) -> Arc<dyn Serializer> {
        Arc::new(JsonSerializer)
    }

    async fn round_trip(
        &self,
        _options: CallOptions,
        frame: Vec<u8>,
        oneway: bool,
    ) -> Result<Option<Response>, RpcCallerError> {
        let request = FrameCodec::decode_request(&frame)?;
        self.sent.lock().unwrap().push(request.clone());

        tokio::time::sleep(self.delay).await;
        self.finished.fetch_add(1, Ordering::SeqCst);

        if oneway {
            return Ok(None);
        }

        // Exercise the response codec as well.
        let response = (self.respond)(&request);
        Ok(Some(FrameCodec::decode_response(&FrameCodec::encode_response(
            &response,
        )?)?))
    }
}

fn hello_world(request: &Request) -> Response {
    let input: GetByIdRequest = JsonSerializer.decode_typed(&request.payload).unwrap();
    assert_eq!(input.id, 123);
    let output = GetByIdResponse {
        name: "hello, world".into(),
    };
    Response::for_request(request).with_payload(JsonSerializer.encode_typed(&output).unwrap())
}

#[tokio::test]
async fn typed_call_roundtrip() {
    let caller = MockCaller::new(hello_world);

    let result = call_method::<GetById, _>(&caller, &CallOptions::new(), &GetByIdRequest { id: 123 })
        .await
        .unwrap();

    assert_eq!(
        result,
        GetByIdResponse {
            name: "hello, world".into()
        }
    );

    let sent = caller.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].service_name, "UserService");
    assert_eq!(sent[0].method_name, "GetByID");
    assert_eq!(sent[0].serializer_code, JsonSerializer.code());
    assert!(sent[0].meta.is_empty());
}

#[tokio::test]
async fn bound_stub_dispatches_by_field() {
    let caller = MockCaller::new(hello_world);
    let users = UserServiceClient::bind(&caller);

    assert_eq!(users.get_by_id.service_name(), "UserService");
    assert_eq!(users.get_by_id.method_name(), "GetByID");
    assert!(Arc::ptr_eq(users.get_by_id.caller(), &caller));
    assert!(Arc::ptr_eq(users.forget.caller(), &caller));

    let copy = users.clone();
    let options = CallOptions::new();
    let input = GetByIdRequest { id: 123 };
    let (a, b) = tokio::join!(
        users.get_by_id.call(&options, &input),
        copy.get_by_id.call(&options, &input),
    );
    assert_eq!(a.unwrap().name, "hello, world");
    assert_eq!(b.unwrap().name, "hello, world");
    assert_eq!(caller.sent().len(), 2);
}

#[tokio::test]
async fn deadline_and_extra_meta_are_propagated() {
    let caller = MockCaller::new(hello_world);
    let options = CallOptions::new()
        .with_timeout(Duration::from_secs(30))
        .with_meta("tenant", "blue");

    call_method::<GetById, _>(&caller, &options, &GetByIdRequest { id: 123 })
        .await
        .unwrap();

    let sent = caller.sent();
    let deadline: i64 = sent[0].meta["deadline"].parse().unwrap();
    assert_eq!(deadline, options.deadline().unwrap().timestamp_millis());
    assert_eq!(sent[0].meta["tenant"], "blue");
    assert!(!sent[0].meta.contains_key("oneway"));
}

#[tokio::test]
async fn remote_errors_are_classified() {
    let caller = MockCaller::new(|request| {
        let message = if request.payload == br#"{"id":1}"# {
            RpcResultStatus::ServiceNotFound.message("GhostService")
        } else {
            "user 2 is archived".to_string()
        };
        Response::for_request(request).with_error(message)
    });

    let err = call_method::<GetById, _>(&caller, &CallOptions::new(), &GetByIdRequest { id: 1 })
        .await
        .unwrap_err();
    match err {
        RpcCallerError::Remote(remote) => {
            assert_eq!(remote.status, RpcResultStatus::ServiceNotFound);
            assert!(!remote.is_application());
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let err = call_method::<GetById, _>(&caller, &CallOptions::new(), &GetByIdRequest { id: 2 })
        .await
        .unwrap_err();
    assert_eq!(err.remote_status(), Some(RpcResultStatus::Application));
    assert_eq!(err.to_string(), "remote error: user 2 is archived");
}

#[tokio::test]
async fn empty_response_decodes_unit_result() {
    let caller = MockCaller::new(|request| Response::for_request(request));

    call_method::<Forget, _>(&caller, &CallOptions::new(), &GetByIdRequest { id: 5 })
        .await
        .unwrap();
}

#[tokio::test]
async fn oneway_call_is_not_awaitable() {
    let caller = MockCaller::new(|_| panic!("one-way calls must not read a response"));
    let users = UserServiceClient::bind(&caller);

    let err = users
        .forget
        .call(&CallOptions::new().oneway(), &GetByIdRequest { id: 5 })
        .await
        .unwrap_err();

    assert!(matches!(err, RpcCallerError::OneWayNotAwaitable));
    let sent = caller.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].meta["oneway"], "true");
}

#[tokio::test]
async fn undecodable_result_is_a_decode_error() {
    let caller =
        MockCaller::new(|request| Response::for_request(request).with_payload(b"[1,2]".to_vec()));

    let err = call_method::<GetById, _>(&caller, &CallOptions::new(), &GetByIdRequest { id: 123 })
        .await
        .unwrap_err();
    assert!(matches!(err, RpcCallerError::Decode(_)));
}

#[tokio::test]
async fn invalid_meta_fails_before_network() {
    let caller = MockCaller::new(hello_world);
    let options = CallOptions::new().with_meta("bad", "line\nbreak");

    let err = call_method::<GetById, _>(&caller, &options, &GetByIdRequest { id: 123 })
        .await
        .unwrap_err();

    assert!(matches!(err, RpcCallerError::InvalidRequest(_)));
    assert!(caller.sent().is_empty());
}

#[derive(Debug, Serialize, Deserialize)]
struct Unserializable {
    by_pair: HashMap<(u8, u8), u8>,
}

struct Broken;

impl RpcMethod for Broken {
    const SERVICE_NAME: &'static str = "UserService";
    const METHOD_NAME: &'static str = "Broken";
    type Input = Unserializable;
    type Output = ();
}

#[tokio::test]
async fn unserializable_argument_fails_before_network() {
    let caller = MockCaller::new(hello_world);
    let input = Unserializable {
        by_pair: HashMap::from([((1, 2), 3)]),
    };

    let err = call_method::<Broken, _>(&caller, &CallOptions::new(), &input)
        .await
        .unwrap_err();

    assert!(matches!(err, RpcCallerError::Encode(_)));
    assert!(caller.sent().is_empty());
}

#[tokio::test]
async fn deadline_returns_promptly_while_network_step_finishes() {
    let caller = MockCaller::with_delay(Duration::from_millis(300), hello_world);
    let options = CallOptions::new().with_timeout(Duration::from_millis(50));

    let started = Instant::now();
    let err = call_method::<GetById, _>(&caller, &options, &GetByIdRequest { id: 123 })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RpcCallerError::Context(ContextError::DeadlineExceeded)
    ));
    assert!(started.elapsed() < Duration::from_millis(250));
    assert_eq!(caller.finished.load(Ordering::SeqCst), 0);

    // The detached network task still runs to completion.
    tokio::time::sleep(Duration::from_millis(400)).await;
    assert_eq!(caller.finished.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn cancellation_returns_promptly() {
    let caller = MockCaller::with_delay(Duration::from_millis(300), hello_world);
    let token = tokio_util::sync::CancellationToken::new();
    let options = CallOptions::new().with_cancellation(token.clone());

    let call = call_method::<GetById, _>(&caller, &options, &GetByIdRequest { id: 123 });
    let cancel = async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        token.cancel();
    };
    let (result, _) = tokio::join!(call, cancel);

    assert!(matches!(
        result,
        Err(RpcCallerError::Context(ContextError::Cancelled))
    ));
}

#[tokio::test]
async fn expired_options_fail_without_sending() {
    let caller = MockCaller::new(hello_world);
    let options = CallOptions::new().with_deadline(chrono::Utc::now() - chrono::Duration::seconds(5));

    let err = call_method::<GetById, _>(&caller, &options, &GetByIdRequest { id: 123 })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        RpcCallerError::Context(ContextError::DeadlineExceeded)
    ));
    assert!(caller.sent().is_empty());
}

#[tokio::test]
async fn concurrent_calls_through_join_all() {
    let caller = MockCaller::new(hello_world);
    let users = UserServiceClient::bind(&caller);
    let options = CallOptions::new();
    let input = GetByIdRequest { id: 123 };

    let calls = (0..8).map(|_| users.get_by_id.call(&options, &input));
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(|r| r.as_ref().is_ok_and(|r| r.name == "hello, world")));

    let mut ids: Vec<u32> = caller.sent().iter().map(|r| r.request_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}
