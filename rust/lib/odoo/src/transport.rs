//! The remote-procedure seam.
//!
//! The client knows nothing about HTTP or XML. Everything it needs from the
//! server goes through this trait; [`XmlRpcTransport`](crate::XmlRpcTransport)
//! is the production implementation, tests plug in scripted fakes.

use serde_json::{Map, Value};

use crate::error::RpcError;

/// One `execute_kw` invocation on the object endpoint.
#[derive(Debug, Clone)]
pub struct Call<'a> {
    pub database: &'a str,
    pub uid: i64,
    pub password: &'a str,
    pub model: &'a str,
    pub method: &'a str,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

/// Pluggable remote endpoint.
///
/// Implementations own connection handling, timeouts and TLS. Errors are
/// returned as-is to the caller of the client; nothing is retried.
pub trait Transport: Send + Sync + 'static {
    /// Server build information (`version` on the common endpoint).
    fn server_version(&self) -> Result<Value, RpcError>;

    /// Check credentials. Returns the user id, or `false` when rejected.
    fn authenticate(
        &self,
        database: &str,
        login: &str,
        password: &str,
        context: &Map<String, Value>,
    ) -> Result<Value, RpcError>;

    /// Invoke `call.method` on `call.model`.
    fn execute_kw(&self, call: &Call<'_>) -> Result<Value, RpcError>;
}
