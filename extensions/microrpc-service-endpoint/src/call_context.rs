use chrono::{DateTime, Utc};
use microrpc::frame::Request;
use microrpc_service::RequestMetadata;
use std::collections::BTreeMap;
use std::time::Duration;

/// What a handler knows about the call it is serving.
#[derive(Debug, Clone)]
pub struct RpcCallContext {
    pub request_id: u32,
    pub service_name: String,
    pub method_name: String,
    /// The caller's deadline, if one was propagated.
    pub deadline: Option<DateTime<Utc>>,
    pub oneway: bool,
    /// Meta entries other than the reserved ones.
    pub meta: BTreeMap<String, String>,
}

impl RpcCallContext {
    pub fn from_request(request: &Request, metadata: RequestMetadata) -> Self {
        Self {
            request_id: request.request_id,
            service_name: request.service_name.clone(),
            method_name: request.method_name.clone(),
            deadline: metadata.deadline,
            oneway: metadata.oneway,
            meta: metadata.extra,
        }
    }

    /// Time left until the propagated deadline, clamped at zero.
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|deadline| (deadline - Utc::now()).to_std().unwrap_or(Duration::ZERO))
    }
}
