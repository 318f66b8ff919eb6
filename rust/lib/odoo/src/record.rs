//! Navigable views over `search_read` results.
//!
//! A [`Record`] wraps one record (a JSON object) or a list of them, together
//! with the model they came from. Fields present in the data are returned
//! as-is. A name that is not in the data is tried as a relation: `partner`
//! resolves through `partner_id`, `tag` through `tag_ids`. The related
//! records are fetched with one `search_read`, wrapped in a nested view and
//! kept for the lifetime of the parent view.

use std::cell::OnceCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use serde_json::Value;
use tracing::debug;

use crate::domain::Domain;
use crate::error::{Error, Result};
use crate::fields::{FieldSet, FIELD_METADATA_ATTRIBUTES};
use crate::params::Params;
use crate::session::Session;

/// Outcome of a relation lookup that reached the server.
enum Relation<'s> {
    Resolved(Record<'s>),
    Absent,
}

/// A field read through [`Record::get`].
#[derive(Debug)]
pub enum Field<'a, 's> {
    /// Stored in the record data (including `false` and `null`).
    Value(&'a Value),
    /// A resolved relation.
    Record(&'a mut Record<'s>),
}

impl<'a, 's> Field<'a, 's> {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(v) => Some(*v),
            Field::Record(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn into_record(self) -> Option<&'a mut Record<'s>> {
        match self {
            Field::Record(r) => Some(r),
            Field::Value(_) => None,
        }
    }
}

/// Position or field name for [`Record::set`].
#[derive(Debug, Clone, PartialEq)]
pub enum Key {
    Index(usize),
    Name(String),
}

impl From<usize> for Key {
    fn from(i: usize) -> Self {
        Key::Index(i)
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Name(s.to_string())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Name(s)
    }
}

/// A record, or list of records, of one model.
pub struct Record<'s> {
    session: Option<&'s Session>,
    model: Option<String>,
    data: Value,
    params: Params,
    /// Shared with sibling views split out of the same list.
    fields: Rc<OnceCell<FieldSet>>,
    relations: HashMap<String, Relation<'s>>,
}

impl<'s> Record<'s> {
    pub fn new(session: &'s Session, model: impl Into<String>, data: Value, params: Params) -> Self {
        Self {
            session: Some(session),
            model: Some(model.into()),
            data,
            params,
            fields: Rc::new(OnceCell::new()),
            relations: HashMap::new(),
        }
    }

    /// A view without a session. Relations never resolve.
    pub fn detached(data: Value) -> Record<'static> {
        Record {
            session: None,
            model: None,
            data,
            params: Params::new(),
            fields: Rc::new(OnceCell::new()),
            relations: HashMap::new(),
        }
    }

    fn sibling(&self, data: Value) -> Self {
        Self {
            session: self.session,
            model: self.model.clone(),
            data,
            params: self.params.clone(),
            fields: Rc::clone(&self.fields),
            relations: HashMap::new(),
        }
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn session(&self) -> Option<&'s Session> {
        self.session
    }

    /// Parameters of the query that produced this view.
    pub fn params(&self) -> &Params {
        &self.params
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn into_data(self) -> Value {
        self.data
    }

    /// `id` of a single-record view.
    pub fn id(&self) -> Option<i64> {
        self.field("id").and_then(Value::as_i64)
    }

    /// Raw field of a single-record view, without relation resolution.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.data.as_object().and_then(|obj| obj.get(name))
    }

    // ── Field access ────────────────────────────────────────────────

    /// Read a field, resolving relations on first access.
    pub fn get(&mut self, name: &str) -> Result<Option<Field<'_, 's>>> {
        self.get_with(name, &Params::new())
    }

    /// [`get`](Self::get) with parameters for the relation query
    /// (e.g. `fields` to restrict the related columns).
    pub fn get_with(&mut self, name: &str, params: &Params) -> Result<Option<Field<'_, 's>>> {
        if name.is_empty() {
            return Ok(None);
        }

        if self.field(name).is_none() && !self.relations.contains_key(name) {
            if let Some(relation) = self.resolve(name, params)? {
                self.relations.insert(name.to_string(), relation);
            }
        }

        if self.field(name).is_some() {
            return Ok(self.field(name).map(Field::Value));
        }
        match self.relations.get_mut(name) {
            Some(Relation::Resolved(record)) => Ok(Some(Field::Record(record))),
            Some(Relation::Absent) | None => Ok(None),
        }
    }

    /// Follow a path of field names. Relation steps go through
    /// [`get`](Self::get); steps into plain values index objects by name
    /// and lists by position. The walk stops at the first absent step.
    pub fn dig(&mut self, path: &[&str]) -> Result<Option<Field<'_, 's>>> {
        let Some((first, rest)) = path.split_first() else {
            return Ok(Some(Field::Record(self)));
        };

        let mut current = match self.get(first)? {
            Some(field) => field,
            None => return Ok(None),
        };
        for step in rest {
            current = match current {
                Field::Record(record) => match record.get(step)? {
                    Some(field) => field,
                    None => return Ok(None),
                },
                Field::Value(value) => match index_value(value, step) {
                    Some(v) => Field::Value(v),
                    None => return Ok(None),
                },
            };
        }
        Ok(Some(current))
    }

    /// Try `name` as a relation. `None` means there was nothing to look up
    /// locally; `Some(Absent)` means the server was consulted and had no
    /// answer, which is cached like a hit.
    fn resolve(&self, name: &str, params: &Params) -> Result<Option<Relation<'s>>> {
        let Some(session) = self.session else {
            return Ok(None);
        };

        let single_key = format!("{}_id", name);
        if let Some(id) = self.field(&single_key).and_then(foreign_key) {
            let Some(target) = self.get_model_name(&single_key)?.map(str::to_string) else {
                return Ok(Some(Relation::Absent));
            };
            debug!(field = name, model = %target, id, "resolving many2one");
            let rows = session.search_read(&target, Domain::new().filter("id", "=", id), params.clone())?;
            let relation = match rows {
                Value::Array(mut rows) if !rows.is_empty() => Relation::Resolved(Record::new(
                    session,
                    target,
                    rows.swap_remove(0),
                    params.clone(),
                )),
                _ => Relation::Absent,
            };
            return Ok(Some(relation));
        }

        let multi_key = format!("{}_ids", name);
        if let Some(ids) = self.field(&multi_key).and_then(foreign_keys) {
            let Some(target) = self.get_model_name(&multi_key)?.map(str::to_string) else {
                return Ok(Some(Relation::Absent));
            };
            debug!(field = name, model = %target, count = ids.len(), "resolving x2many");
            let rows = session.search_read(&target, Domain::new().filter("id", "in", ids), params.clone())?;
            return Ok(Some(Relation::Resolved(Record::new(session, target, rows, params.clone()))));
        }

        Ok(None)
    }

    // ── Field metadata ──────────────────────────────────────────────

    /// Field descriptors of this view's model, fetched on first use.
    ///
    /// `None` when the view has no session or no model.
    pub fn fields(&self) -> Result<Option<&FieldSet>> {
        let (Some(session), Some(model)) = (self.session, self.model.as_deref()) else {
            return Ok(None);
        };
        if let Some(fields) = self.fields.get() {
            return Ok(Some(fields));
        }

        debug!(model, "fetching field metadata");
        let raw = session.model_attributes(model, &FIELD_METADATA_ATTRIBUTES)?;
        let parsed = FieldSet::from_value(raw)?;
        // Views are !Sync, so the cell is still empty here.
        let _ = self.fields.set(parsed);
        Ok(self.fields.get())
    }

    /// Relation target of `field_key` (e.g. `"partner_id"`).
    pub fn get_model_name(&self, field_key: &str) -> Result<Option<&str>> {
        if field_key.is_empty() {
            return Ok(None);
        }
        Ok(self.fields()?.and_then(|fields| fields.relation_of(field_key)))
    }

    // ── Local mutation ──────────────────────────────────────────────

    /// Change the local data. Lists take a position (numeric strings are
    /// accepted, `len` appends); single records take a field name.
    /// Nothing is sent to the server.
    pub fn set(&mut self, key: impl Into<Key>, value: impl Into<Value>) -> Result<()> {
        let key = key.into();
        let value = value.into();
        match &mut self.data {
            Value::Array(items) => {
                let index = match key {
                    Key::Index(i) => i,
                    Key::Name(name) => name.trim().parse::<usize>().map_err(|_| {
                        Error::InvalidArgument(format!("list index expected, got {:?}", name))
                    })?,
                };
                if index < items.len() {
                    items[index] = value;
                } else if index == items.len() {
                    items.push(value);
                } else {
                    return Err(Error::InvalidArgument(format!(
                        "index {} out of bounds for {} records",
                        index,
                        items.len()
                    )));
                }
                Ok(())
            }
            Value::Object(obj) => {
                let name = match key {
                    Key::Name(name) => name,
                    Key::Index(i) => i.to_string(),
                };
                obj.insert(name, value);
                Ok(())
            }
            other => Err(Error::Unsupported {
                op: "set",
                kind: kind_of(other),
            }),
        }
    }

    // ── Container access ────────────────────────────────────────────

    /// Records in a list view, or fields in a single-record view.
    pub fn len(&self) -> Result<usize> {
        match &self.data {
            Value::Array(items) => Ok(items.len()),
            Value::Object(obj) => Ok(obj.len()),
            other => Err(Error::Unsupported {
                op: "len",
                kind: kind_of(other),
            }),
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        self.len().map(|n| n == 0)
    }

    /// Raw element of a list view.
    pub fn at(&self, index: usize) -> Result<Option<&Value>> {
        match &self.data {
            Value::Array(items) => Ok(items.get(index)),
            other => Err(Error::Unsupported {
                op: "at",
                kind: kind_of(other),
            }),
        }
    }

    /// Raw elements of a list view.
    pub fn iter(&self) -> Result<std::slice::Iter<'_, Value>> {
        match &self.data {
            Value::Array(items) => Ok(items.iter()),
            other => Err(Error::Unsupported {
                op: "iter",
                kind: kind_of(other),
            }),
        }
    }

    /// Split a list view into one view per record. The views share this
    /// view's field metadata, so it is fetched at most once for all of them.
    pub fn records(&self) -> Result<Vec<Record<'s>>> {
        match &self.data {
            Value::Array(items) => Ok(items.iter().map(|row| self.sibling(row.clone())).collect()),
            other => Err(Error::Unsupported {
                op: "records",
                kind: kind_of(other),
            }),
        }
    }

    /// Owning form of [`records`](Self::records).
    pub fn into_records(mut self) -> Result<Vec<Record<'s>>> {
        match std::mem::take(&mut self.data) {
            Value::Array(items) => Ok(items.into_iter().map(|row| self.sibling(row)).collect()),
            other => Err(Error::Unsupported {
                op: "into_records",
                kind: kind_of(&other),
            }),
        }
    }
}

impl fmt::Debug for Record<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut resolved: Vec<&str> = self.relations.keys().map(String::as_str).collect();
        resolved.sort_unstable();
        f.debug_struct("Record")
            .field("model", &self.model)
            .field("data", &self.data)
            .field("relations", &resolved)
            .finish()
    }
}

/// Id carried by a many2one value: `[id, "display name"]` or a bare id.
/// `false`, `null` and empty values carry none.
fn foreign_key(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::Array(pair) => pair.first().and_then(Value::as_i64),
        _ => None,
    }
}

/// Ids carried by an x2many value; `None` unless it is a non-empty list.
fn foreign_keys(value: &Value) -> Option<Vec<i64>> {
    let ids: Vec<i64> = value.as_array()?.iter().filter_map(Value::as_i64).collect();
    if ids.is_empty() {
        None
    } else {
        Some(ids)
    }
}

fn index_value<'v>(value: &'v Value, step: &str) -> Option<&'v Value> {
    match value {
        Value::Object(obj) => obj.get(step),
        Value::Array(items) => step.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "record",
    }
}
