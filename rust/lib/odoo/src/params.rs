//! Optional keyword parameters for `execute_kw`.

use serde_json::{Map, Value};

use crate::error::Error;

/// Keyword parameters (`fields`, `offset`, `limit`, `context`, ...).
///
/// Keys are stored in canonical form: trimmed, ASCII lower-case, with `-`
/// and spaces turned into `_`. `"Limit"`, `" limit "` and `"LIMIT"` all
/// address the same entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Params(Map<String, Value>);

/// Canonical form of a parameter key.
pub fn normalize_key(key: &str) -> String {
    key.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_lowercase(),
        })
        .collect()
}

/// Recursively merge `overlay` into `base`; `overlay` wins on conflicts.
///
/// Objects are merged key by key, any other value replaces what is in
/// `base` (including `null`, which is kept rather than treated as removal).
pub fn deep_merge(base: &mut Value, overlay: &Value) {
    if let (Some(base_obj), Some(overlay_obj)) = (base.as_object_mut(), overlay.as_object()) {
        for (key, value) in overlay_obj {
            match base_obj.get_mut(key) {
                Some(existing) if existing.is_object() && value.is_object() => {
                    deep_merge(existing, value);
                }
                _ => {
                    base_obj.insert(key.clone(), value.clone());
                }
            }
        }
    } else {
        *base = overlay.clone();
    }
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a parameter under its canonical key.
    pub fn insert(&mut self, key: &str, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(normalize_key(key), value.into())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(&normalize_key(key))
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(&normalize_key(key))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Restrict the returned columns.
    pub fn fields<I, S>(self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list: Vec<Value> = fields.into_iter().map(|f| Value::String(f.into())).collect();
        self.with("fields", list)
    }

    pub fn offset(self, offset: usize) -> Self {
        self.with("offset", offset)
    }

    pub fn limit(self, limit: usize) -> Self {
        self.with("limit", limit)
    }

    pub fn order(self, order: &str) -> Self {
        self.with("order", order)
    }

    pub fn context(self, context: Value) -> Self {
        self.with("context", context)
    }

    /// Overlay every entry of `other` onto `self`.
    pub fn merge(&mut self, other: &Params) {
        for (key, value) in &other.0 {
            self.0.insert(key.clone(), value.clone());
        }
    }

    /// Produce the `execute_kw` keyword map.
    ///
    /// A non-empty `default_context` is always transmitted; the caller's
    /// `context` (if any) is deep-merged on top of it. A `null` caller
    /// context overrides nothing; any other non-object is rejected.
    pub(crate) fn into_kwargs(self, default_context: &Map<String, Value>) -> Result<Map<String, Value>, Error> {
        let mut kwargs = self.0;
        let mut context = Value::Object(default_context.clone());
        match kwargs.remove("context") {
            None | Some(Value::Null) => {
                if default_context.is_empty() {
                    return Ok(kwargs);
                }
            }
            Some(caller @ Value::Object(_)) => deep_merge(&mut context, &caller),
            Some(other) => {
                return Err(Error::InvalidArgument(format!(
                    "context must be an object, got {}",
                    other
                )));
            }
        }
        kwargs.insert("context".to_string(), context);
        Ok(kwargs)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        let mut params = Params::new();
        for (key, value) in map {
            params.insert(&key, value);
        }
        params
    }
}

impl TryFrom<Value> for Params {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Error> {
        match value {
            Value::Object(map) => Ok(Params::from(map)),
            Value::Null => Ok(Params::new()),
            other => Err(Error::InvalidArgument(format!(
                "optional parameters must be an object, got {}",
                other
            ))),
        }
    }
}
