//! Search domains.
//!
//! A domain is a list of `[field, operator, value]` triplets, optionally
//! interleaved with the prefix operators `&`, `|` and `!`. Callers may hand
//! the client a bare triplet; [`normalize`] wraps it so the server always
//! receives a list of lists. Triplet shape is not validated locally, the
//! server rejects malformed domains with a fault.

use serde_json::Value;

const LOGICAL_OPERATORS: [&str; 3] = ["&", "|", "!"];

/// Canonicalize a caller-supplied filter.
///
/// - A single triplet (`["name", "=", "x"]`) becomes `[["name", "=", "x"]]`.
/// - Any other scalar is wrapped the same way.
/// - `null` is the empty domain.
/// - Everything else that is already a list passes through unchanged:
///   nested domains, prefix-operator domains, id lists, `[]`.
pub fn normalize(filter: Value) -> Value {
    let wrap = match &filter {
        Value::Null => return Value::Array(Vec::new()),
        Value::Array(items) => is_triplet(items),
        _ => true,
    };
    if wrap {
        Value::Array(vec![filter])
    } else {
        filter
    }
}

fn is_triplet(items: &[Value]) -> bool {
    match items.first() {
        Some(Value::String(head)) => !LOGICAL_OPERATORS.contains(&head.as_str()),
        _ => false,
    }
}

/// An already-normalized search domain.
///
/// ```
/// use odoo_client::Domain;
/// use serde_json::json;
///
/// let domain = Domain::new()
///     .or()
///     .filter("customer_rank", ">", 0)
///     .filter("supplier_rank", ">", 0);
/// assert_eq!(
///     serde_json::Value::from(domain),
///     json!(["|", ["customer_rank", ">", 0], ["supplier_rank", ">", 0]])
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Domain(Vec<Value>);

impl Domain {
    /// The empty domain, matching every record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a `[field, operator, value]` triplet.
    pub fn filter(mut self, field: &str, operator: &str, value: impl Into<Value>) -> Self {
        self.0.push(Value::Array(vec![
            Value::from(field),
            Value::from(operator),
            value.into(),
        ]));
        self
    }

    pub fn and(self) -> Self {
        self.operator("&")
    }

    pub fn or(self) -> Self {
        self.operator("|")
    }

    pub fn not(self) -> Self {
        self.operator("!")
    }

    fn operator(mut self, op: &str) -> Self {
        self.0.push(Value::from(op));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Value> for Domain {
    fn from(filter: Value) -> Self {
        match normalize(filter) {
            Value::Array(items) => Domain(items),
            // normalize always yields a list
            other => Domain(vec![other]),
        }
    }
}

impl From<Vec<Value>> for Domain {
    fn from(items: Vec<Value>) -> Self {
        Domain::from(Value::Array(items))
    }
}

/// A plain id list, as accepted by `read`.
impl From<&[i64]> for Domain {
    fn from(ids: &[i64]) -> Self {
        Domain(ids.iter().copied().map(Value::from).collect())
    }
}

impl From<Domain> for Value {
    fn from(domain: Domain) -> Self {
        Value::Array(domain.0)
    }
}
