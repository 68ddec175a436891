pub mod user_service;
pub use user_service::{
    GetById, GetByIdRequest, GetByIdResponse, RecordVisit, RecordVisitRequest, SlowEcho,
    SlowEchoRequest, USER_SERVICE_NAME, UserService, UserServiceClient, user_service_registration,
};
