use super::USER_SERVICE_NAME;
use microrpc_service::RpcMethod;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlowEchoRequest {
    pub message: String,
    pub delay_ms: u64,
}

/// Echoes `message` back after `delay_ms` milliseconds.
pub struct SlowEcho;

impl RpcMethod for SlowEcho {
    const SERVICE_NAME: &'static str = USER_SERVICE_NAME;
    const METHOD_NAME: &'static str = "SlowEcho";
    type Input = SlowEchoRequest;
    type Output = String;
}
