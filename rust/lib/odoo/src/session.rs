//! Authenticated session and the model operations built on `execute_kw`.

use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, info};

use crate::domain::Domain;
use crate::error::{Error, Result, RpcError};
use crate::params::Params;
use crate::record::Record;
use crate::transport::{Call, Transport};

/// Attributes requested by [`Session::model_attributes`] when the caller has
/// no preference.
pub const DEFAULT_MODEL_ATTRIBUTES: [&str; 3] = ["string", "help", "type"];

/// An authenticated connection to one database.
///
/// Every operation blocks until the transport answers. The identity only
/// changes through [`reauthenticate`](Self::reauthenticate).
pub struct Session {
    transport: Arc<dyn Transport>,
    database: String,
    uid: i64,
    username: String,
    password: String,
    default_context: Map<String, Value>,
}

impl Session {
    /// Probe the server and authenticate.
    ///
    /// Fails with [`Error::Authentication`] when the server answers with a
    /// false identity.
    pub fn connect(
        transport: Arc<dyn Transport>,
        database: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let database = database.into();
        let username = username.into();
        let password = password.into();

        let info = transport.server_version()?;
        let server_version = info
            .get("server_version")
            .and_then(Value::as_str)
            .unwrap_or("?");
        debug!(server_version, "server reachable");

        let uid = authenticate(transport.as_ref(), &database, &username, &password)?;
        info!(database = %database, username = %username, uid, "authenticated");

        Ok(Self {
            transport,
            database,
            uid,
            username,
            password,
            default_context: Map::new(),
        })
    }

    /// Replace the identity. On failure the previous identity is kept.
    pub fn reauthenticate(
        &mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<()> {
        let username = username.into();
        let password = password.into();
        let uid = authenticate(self.transport.as_ref(), &self.database, &username, &password)?;
        info!(database = %self.database, username = %username, uid, "re-authenticated");
        self.uid = uid;
        self.username = username;
        self.password = password;
        Ok(())
    }

    /// Set the context merged under every call's own `context`.
    pub fn with_default_context(mut self, context: Map<String, Value>) -> Self {
        self.default_context = context;
        self
    }

    pub fn set_default_context(&mut self, context: Map<String, Value>) {
        self.default_context = context;
    }

    pub fn default_context(&self) -> &Map<String, Value> {
        &self.default_context
    }

    /// Authenticated user id.
    pub fn uid(&self) -> i64 {
        self.uid
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    /// The server's `server_version` string.
    pub fn version(&self) -> Result<String> {
        let info = self.transport.server_version()?;
        info.get("server_version")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| RpcError::Decode("version response without server_version".into()).into())
    }

    /// Invoke an arbitrary model method.
    pub fn call(&self, model: &str, method: &str, args: Vec<Value>, params: Params) -> Result<Value> {
        debug!(model, method, "execute_kw");
        let call = Call {
            database: &self.database,
            uid: self.uid,
            password: &self.password,
            model,
            method,
            args,
            kwargs: params.into_kwargs(&self.default_context)?,
        };
        Ok(self.transport.execute_kw(&call)?)
    }

    /// Number of records matching `domain`.
    pub fn count(&self, model: &str, domain: impl Into<Domain>) -> Result<u64> {
        let domain: Value = domain.into().into();
        let n = self.call(model, "search_count", vec![domain], Params::new())?;
        n.as_u64()
            .ok_or_else(|| RpcError::Decode(format!("search_count returned {}", n)).into())
    }

    /// Ids of the records matching `domain`.
    pub fn search(&self, model: &str, domain: impl Into<Domain>, params: Params) -> Result<Value> {
        let domain: Value = domain.into().into();
        self.call(model, "search", vec![domain], params)
    }

    /// `read` with a normalized domain (or a plain id list).
    pub fn read(&self, model: &str, domain: impl Into<Domain>, params: Params) -> Result<Value> {
        let domain: Value = domain.into().into();
        self.call(model, "read", vec![domain], params)
    }

    pub fn search_read(&self, model: &str, domain: impl Into<Domain>, params: Params) -> Result<Value> {
        let domain: Value = domain.into().into();
        self.call(model, "search_read", vec![domain], params)
    }

    /// Create one record (or several, when `values` is a list). Returns the
    /// new id(s) as sent by the server.
    pub fn create(&self, model: &str, values: Value, params: Params) -> Result<Value> {
        self.call(model, "create", vec![values], params)
    }

    /// Write `values` to every record in `ids`.
    pub fn update(&self, model: &str, ids: &[i64], values: Value, params: Params) -> Result<Value> {
        self.call(model, "write", vec![Value::from(ids), values], params)
    }

    pub fn delete(&self, model: &str, ids: &[i64]) -> Result<Value> {
        self.call(model, "unlink", vec![Value::from(ids)], Params::new())
    }

    /// Field descriptors of `model` (`fields_get`).
    pub fn model_attributes(&self, model: &str, attributes: &[&str]) -> Result<Value> {
        self.call(
            model,
            "fields_get",
            Vec::new(),
            Params::new().with("attributes", attributes),
        )
    }

    /// The record with the given id, if it exists and is visible.
    pub fn find(&self, model: &str, id: i64, fields: &[&str]) -> Result<Option<Value>> {
        let domain = Domain::new().filter("id", "=", id);
        let params = Params::new().fields(fields.iter().copied());
        match self.search_read(model, domain, params)? {
            Value::Array(mut rows) if !rows.is_empty() => Ok(Some(rows.swap_remove(0))),
            _ => Ok(None),
        }
    }

    /// `search_read` wrapped in a navigable [`Record`] view.
    pub fn browse(&self, model: &str, domain: impl Into<Domain>, params: Params) -> Result<Record<'_>> {
        let data = self.search_read(model, domain, params.clone())?;
        Ok(Record::new(self, model, data, params))
    }
}

fn authenticate(transport: &dyn Transport, database: &str, username: &str, password: &str) -> Result<i64> {
    let identity = transport.authenticate(database, username, password, &Map::new())?;
    identity.as_i64().ok_or_else(|| Error::Authentication {
        database: database.to_string(),
        username: username.to_string(),
    })
}
