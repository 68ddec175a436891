use super::USER_SERVICE_NAME;
use microrpc_service::RpcMethod;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetByIdRequest {
    pub id: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetByIdResponse {
    pub name: String,
}

/// Looks up a user's display name.
pub struct GetById;

impl RpcMethod for GetById {
    const SERVICE_NAME: &'static str = USER_SERVICE_NAME;
    const METHOD_NAME: &'static str = "GetByID";
    type Input = GetByIdRequest;
    type Output = GetByIdResponse;
}
