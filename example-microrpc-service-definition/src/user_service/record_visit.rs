use super::USER_SERVICE_NAME;
use microrpc_service::RpcMethod;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordVisitRequest {
    pub user_id: u64,
}

/// Records a visit. Usually sent as a one-way call.
pub struct RecordVisit;

impl RpcMethod for RecordVisit {
    const SERVICE_NAME: &'static str = USER_SERVICE_NAME;
    const METHOD_NAME: &'static str = "RecordVisit";
    type Input = RecordVisitRequest;
    type Output = ();
}
