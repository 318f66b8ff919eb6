//! Blocking XML-RPC transport over HTTP(S).

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde_json::{Map, Value};
use tracing::debug;

use crate::codec;
use crate::error::RpcError;
use crate::transport::{Call, Transport};

/// Connection options for [`XmlRpcTransport`].
#[derive(Debug, Clone, Default)]
pub struct TransportOptions {
    /// Accept invalid or self-signed server certificates.
    pub skip_tls: bool,
    /// Per-request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
}

/// Talks to `{url}/xmlrpc/2/common` and `{url}/xmlrpc/2/object`.
pub struct XmlRpcTransport {
    http: reqwest::blocking::Client,
    common_url: String,
    object_url: String,
}

impl XmlRpcTransport {
    pub fn new(url: impl Into<String>) -> Result<Self, RpcError> {
        Self::with_options(url, TransportOptions::default())
    }

    pub fn with_options(url: impl Into<String>, options: TransportOptions) -> Result<Self, RpcError> {
        let base_url = url.into().trim_end_matches('/').to_string();
        let http = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(options.skip_tls)
            .timeout(options.timeout)
            .build()?;
        Ok(Self {
            http,
            common_url: format!("{}/xmlrpc/2/common", base_url),
            object_url: format!("{}/xmlrpc/2/object", base_url),
        })
    }

    fn invoke(&self, url: &str, method: &str, params: &[Value]) -> Result<Value, RpcError> {
        let body = codec::encode_call(method, params)?;
        debug!(url, method, "xml-rpc request");

        let resp = self
            .http
            .post(url)
            .header(CONTENT_TYPE, "text/xml")
            .body(body)
            .send()?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().unwrap_or_default();
            return Err(RpcError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let text = resp.text()?;
        codec::decode_response(&text)
    }
}

impl Transport for XmlRpcTransport {
    fn server_version(&self) -> Result<Value, RpcError> {
        self.invoke(&self.common_url, "version", &[])
    }

    fn authenticate(
        &self,
        database: &str,
        login: &str,
        password: &str,
        context: &Map<String, Value>,
    ) -> Result<Value, RpcError> {
        self.invoke(
            &self.common_url,
            "authenticate",
            &[
                Value::from(database),
                Value::from(login),
                Value::from(password),
                Value::Object(context.clone()),
            ],
        )
    }

    fn execute_kw(&self, call: &Call<'_>) -> Result<Value, RpcError> {
        self.invoke(
            &self.object_url,
            "execute_kw",
            &[
                Value::from(call.database),
                Value::from(call.uid),
                Value::from(call.password),
                Value::from(call.model),
                Value::from(call.method),
                Value::Array(call.args.clone()),
                Value::Object(call.kwargs.clone()),
            ],
        )
    }
}
