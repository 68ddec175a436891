use serde::{Serialize, de::DeserializeOwned};

/// A single remotely callable method.
///
/// Implemented on a unit struct per method; clients use it to build stubs and
/// servers use it to register typed handlers. Both sides agree on the method
/// purely through `SERVICE_NAME`, `METHOD_NAME` and the payload shapes.
///
/// ```
/// use microrpc_service::RpcMethod;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Serialize, Deserialize)]
/// pub struct PingRequest;
///
/// pub struct Ping;
///
/// impl RpcMethod for Ping {
///     const SERVICE_NAME: &'static str = "HealthService";
///     const METHOD_NAME: &'static str = "Ping";
///     type Input = PingRequest;
///     type Output = ();
/// }
/// ```
pub trait RpcMethod: Send + Sync + 'static {
    /// Name of the service the method belongs to.
    const SERVICE_NAME: &'static str;

    /// Name the method is dispatched under.
    const METHOD_NAME: &'static str;

    /// The argument sent with every call.
    type Input: Serialize + DeserializeOwned + Send + Sync + 'static;

    /// The value a successful call returns.
    type Output: Serialize + DeserializeOwned + Send + Sync + 'static;
}
