#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use odoo_client::{Call, RpcError, Session, Transport};
use serde_json::{json, Map, Value};

/// One `execute_kw` seen by [`FakeTransport`].
#[derive(Debug, Clone)]
pub struct Recorded {
    pub model: String,
    pub method: String,
    pub args: Vec<Value>,
    pub kwargs: Map<String, Value>,
}

type Handler = dyn Fn(&Recorded) -> Result<Value, RpcError> + Send + Sync;

/// Scripted transport. Every `execute_kw` is recorded, then answered by the
/// handler.
pub struct FakeTransport {
    identity: Mutex<Value>,
    handler: Box<Handler>,
    calls: Mutex<Vec<Recorded>>,
    logins: Mutex<Vec<String>>,
}

impl FakeTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(&Recorded) -> Result<Value, RpcError> + Send + Sync + 'static,
    {
        Arc::new(Self {
            identity: Mutex::new(json!(2)),
            handler: Box::new(handler),
            calls: Mutex::new(Vec::new()),
            logins: Mutex::new(Vec::new()),
        })
    }

    /// What the next `authenticate` returns.
    pub fn set_identity(&self, identity: Value) {
        *self.identity.lock().unwrap() = identity;
    }

    pub fn calls(&self) -> Vec<Recorded> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn logins(&self) -> Vec<String> {
        self.logins.lock().unwrap().clone()
    }

    pub fn last_call(&self) -> Recorded {
        self.calls.lock().unwrap().last().cloned().expect("no calls recorded")
    }
}

impl Transport for FakeTransport {
    fn server_version(&self) -> Result<Value, RpcError> {
        Ok(json!({"server_version": "17.0", "protocol_version": 1}))
    }

    fn authenticate(
        &self,
        _database: &str,
        login: &str,
        _password: &str,
        _context: &Map<String, Value>,
    ) -> Result<Value, RpcError> {
        self.logins.lock().unwrap().push(login.to_string());
        Ok(self.identity.lock().unwrap().clone())
    }

    fn execute_kw(&self, call: &Call<'_>) -> Result<Value, RpcError> {
        let recorded = Recorded {
            model: call.model.to_string(),
            method: call.method.to_string(),
            args: call.args.clone(),
            kwargs: call.kwargs.clone(),
        };
        self.calls.lock().unwrap().push(recorded.clone());
        (self.handler)(&recorded)
    }
}

pub fn connect(transport: &Arc<FakeTransport>) -> Session {
    Session::connect(transport.clone(), "test-db", "admin", "admin").expect("connect")
}

// ── A small sales dataset ───────────────────────────────────────────

pub fn order(id: i64, partner: i64) -> Value {
    json!({
        "id": id,
        "name": format!("SO{:03}", id),
        "partner_id": [partner, "Azure Interior"],
        "tag_ids": [3, 5],
        "user_id": false,
        "company_id": [1, "My Company"],
        "origin": null,
    })
}

fn ids_in(domain: &Value) -> Vec<i64> {
    let term = &domain[0];
    match &term[2] {
        Value::Array(ids) => ids.iter().filter_map(Value::as_i64).collect(),
        v => v.as_i64().into_iter().collect(),
    }
}

/// Answers `fields_get` and `search_read` for sale.order, res.partner,
/// res.country and crm.tag.
pub fn sales_handler(call: &Recorded) -> Result<Value, RpcError> {
    match (call.model.as_str(), call.method.as_str()) {
        ("sale.order", "fields_get") => Ok(json!({
            "name": {"type": "char", "required": true},
            "partner_id": {"type": "many2one", "relation": "res.partner", "required": true},
            "tag_ids": {"type": "many2many", "relation": "crm.tag"},
            "user_id": {"type": "many2one", "relation": "res.users"},
            // no relation target reported
            "company_id": {"type": "many2one", "relation": false},
        })),
        ("sale.order", "search_read") => Ok(json!([order(1, 7), order(2, 7)])),
        ("res.partner", "fields_get") => Ok(json!({
            "name": {"type": "char"},
            "country_id": {"type": "many2one", "relation": "res.country"},
        })),
        ("res.partner", "search_read") => {
            let rows: Vec<Value> = ids_in(&call.args[0])
                .into_iter()
                .filter(|id| *id == 7)
                .map(|id| json!({"id": id, "name": "Azure Interior", "country_id": [21, "Belgium"]}))
                .collect();
            Ok(Value::Array(rows))
        }
        ("res.country", "search_read") => Ok(json!([{"id": 21, "name": "Belgium", "code": "BE"}])),
        ("crm.tag", "search_read") => {
            let rows: Vec<Value> = ids_in(&call.args[0])
                .into_iter()
                .map(|id| json!({"id": id, "name": format!("tag-{}", id)}))
                .collect();
            Ok(Value::Array(rows))
        }
        (model, method) => Err(RpcError::Fault {
            code: 2,
            message: format!("unexpected {}.{}", model, method),
        }),
    }
}
