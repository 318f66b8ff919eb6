//! Model field metadata, as returned by `fields_get`.

use std::collections::HashMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::error::{Result, RpcError};

/// Attributes requested when a record view needs relation targets.
pub const FIELD_METADATA_ATTRIBUTES: [&str; 4] = ["field_name", "type", "required", "relation"];

/// Metadata for a single field.
///
/// The server sends `false` for attributes that do not apply; those are
/// read as `None`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FieldDescriptor {
    #[serde(rename = "type", default)]
    pub kind: String,

    #[serde(default, deserialize_with = "truthy")]
    pub required: bool,

    /// Target model of a relational field.
    #[serde(default, deserialize_with = "string_or_false")]
    pub relation: Option<String>,

    /// Owning model; some servers report relation targets here instead.
    #[serde(default, deserialize_with = "string_or_false")]
    pub model: Option<String>,

    /// Human-readable label.
    #[serde(default, deserialize_with = "string_or_false")]
    pub string: Option<String>,
}

impl FieldDescriptor {
    /// Target model for relation resolution: `relation`, else `model`.
    pub fn target_model(&self) -> Option<&str> {
        self.relation.as_deref().or(self.model.as_deref())
    }

    pub fn is_relational(&self) -> bool {
        matches!(self.kind.as_str(), "many2one" | "one2many" | "many2many")
    }
}

fn string_or_false<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::String(s) if !s.is_empty() => Some(s),
        _ => None,
    })
}

fn truthy<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_i64().unwrap_or_default() != 0,
        _ => false,
    })
}

/// Field descriptors of one model, keyed by field name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldSet(HashMap<String, FieldDescriptor>);

impl FieldSet {
    pub fn from_value(value: Value) -> Result<Self> {
        let fields: HashMap<String, FieldDescriptor> = serde_json::from_value(value)
            .map_err(|e| RpcError::Decode(format!("fields_get response: {}", e)))?;
        Ok(Self(fields))
    }

    pub fn get(&self, name: &str) -> Option<&FieldDescriptor> {
        self.0.get(name)
    }

    /// Target model of `field_key` (e.g. `"partner_id"`), if it is relational.
    pub fn relation_of(&self, field_key: &str) -> Option<&str> {
        self.get(field_key).and_then(FieldDescriptor::target_model)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Field names in sorted order.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.0.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}
