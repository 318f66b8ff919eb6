//! Model operations against the current context.
//!
//! `odoo get res.partner --domain '["is_company","=",true]'`, etc.

use std::ops::ControlFlow;
use std::path::Path;

use anyhow::Result;
use clap::Args;
use odoo_client::{Domain, Field, Params, Session, DEFAULT_MODEL_ATTRIBUTES};
use serde_json::Value;

use crate::config::ClientConfig;

/// Filter and window shared by `search` and `get`.
#[derive(Args, Debug, Default)]
pub struct QueryArgs {
    /// Domain as JSON. A single `[field, op, value]` triplet is accepted.
    #[arg(long)]
    pub domain: Option<String>,
    /// Limit results.
    #[arg(long)]
    pub limit: Option<usize>,
    /// Offset for pagination.
    #[arg(long)]
    pub offset: Option<usize>,
    /// Sort order (e.g. "name desc").
    #[arg(long)]
    pub order: Option<String>,
}

#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Model name.
    pub model: String,
    /// Record id.
    pub id: i64,
    /// Dotted relation path to follow (e.g. partner.country.code).
    #[arg(long)]
    pub path: Option<String>,
    /// Comma-separated field names to read.
    #[arg(long)]
    pub fields: Option<String>,
}

/// Parse a JSON domain. Absent means "everything".
pub fn parse_domain(raw: Option<&str>) -> Result<Domain> {
    let Some(raw) = raw else {
        return Ok(Domain::new());
    };
    let value: Value =
        serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("Invalid domain JSON: {}", e))?;
    Ok(Domain::from(value))
}

/// Split a comma-separated list, dropping blanks.
pub fn parse_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

pub fn parse_ids(raw: &str) -> Result<Vec<i64>> {
    let ids = parse_list(raw)
        .iter()
        .map(|s| {
            s.parse::<i64>()
                .map_err(|_| anyhow::anyhow!("Invalid record id: {}", s))
        })
        .collect::<Result<Vec<_>>>()?;
    if ids.is_empty() {
        anyhow::bail!("No record ids given.");
    }
    Ok(ids)
}

fn parse_json(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).map_err(|e| anyhow::anyhow!("Invalid JSON: {}", e))
}

fn query_params(query: &QueryArgs, fields: &[String]) -> Params {
    let mut params = Params::new();
    if !fields.is_empty() {
        params = params.fields(fields.iter().cloned());
    }
    if let Some(limit) = query.limit {
        params = params.limit(limit);
    }
    if let Some(offset) = query.offset {
        params = params.offset(offset);
    }
    if let Some(order) = &query.order {
        params = params.order(order);
    }
    params
}

fn session(client_config_path: &Path) -> Result<Session> {
    let config = ClientConfig::load(client_config_path)?;
    config.current()?.connect()
}

fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn count(model: &str, domain: Option<&str>, client_config_path: &Path) -> Result<()> {
    let domain = parse_domain(domain)?;
    let session = session(client_config_path)?;
    println!("{}", session.count(model, domain)?);
    Ok(())
}

pub fn search(model: &str, query: &QueryArgs, client_config_path: &Path) -> Result<()> {
    let domain = parse_domain(query.domain.as_deref())?;
    let session = session(client_config_path)?;
    let ids = session.search(model, domain, query_params(query, &[]))?;
    print_json(&ids)
}

/// One `search_read` call.
pub fn get(model: &str, query: &QueryArgs, fields: &[String], client_config_path: &Path) -> Result<()> {
    let domain = parse_domain(query.domain.as_deref())?;
    let session = session(client_config_path)?;
    let rows = session.search_read(model, domain, query_params(query, fields))?;
    print_json(&rows)
}

/// Every matching record, fetched page by page. `--limit` is replaced by
/// the page size; `--offset` is the starting point.
pub fn get_all(
    model: &str,
    query: &QueryArgs,
    fields: &[String],
    page_size: usize,
    client_config_path: &Path,
) -> Result<()> {
    let domain = parse_domain(query.domain.as_deref())?;
    let session = session(client_config_path)?;

    let mut rows = Vec::new();
    let total = session.search_read_all(model, domain, query_params(query, fields), page_size, |page| {
        if let Value::Array(page_rows) = page.into_data() {
            rows.extend(page_rows);
        }
        ControlFlow::Continue(())
    })?;
    tracing::debug!(model, total, "fetched all pages");

    print_json(&Value::Array(rows))
}

/// Read one record and optionally walk a dotted relation path from it.
pub fn show(args: &ShowArgs, client_config_path: &Path) -> Result<()> {
    let session = session(client_config_path)?;

    let mut params = Params::new();
    if let Some(fields) = &args.fields {
        params = params.fields(parse_list(fields));
    }
    let view = session.browse(&args.model, Domain::new().filter("id", "=", args.id), params)?;
    let Some(mut record) = view.into_records()?.into_iter().next() else {
        anyhow::bail!("{} {} not found.", args.model, args.id);
    };

    let Some(path) = &args.path else {
        return print_json(record.data());
    };
    let steps: Vec<&str> = path.split('.').filter(|s| !s.is_empty()).collect();
    match record.dig(&steps)? {
        Some(Field::Value(value)) => print_json(value),
        Some(Field::Record(related)) => print_json(related.data()),
        None => print_json(&Value::Null),
    }
}

pub fn fields(model: &str, attributes: Option<&[String]>, client_config_path: &Path) -> Result<()> {
    let session = session(client_config_path)?;
    let attributes: Vec<&str> = match attributes {
        Some(list) if !list.is_empty() => list.iter().map(String::as_str).collect(),
        _ => DEFAULT_MODEL_ATTRIBUTES.to_vec(),
    };
    print_json(&session.model_attributes(model, &attributes)?)
}

pub fn create(model: &str, json_body: &str, client_config_path: &Path) -> Result<()> {
    let values = parse_json(json_body)?;
    let session = session(client_config_path)?;
    let id = session.create(model, values, Params::new())?;
    println!("{} created.", model);
    print_json(&id)
}

pub fn update(model: &str, ids: &str, json_body: &str, client_config_path: &Path) -> Result<()> {
    let ids = parse_ids(ids)?;
    let values = parse_json(json_body)?;
    let session = session(client_config_path)?;
    session.update(model, &ids, values, Params::new())?;
    println!("{} {:?} updated.", model, ids);
    Ok(())
}

pub fn delete(model: &str, ids: &str, client_config_path: &Path) -> Result<()> {
    let ids = parse_ids(ids)?;
    let session = session(client_config_path)?;
    session.delete(model, &ids)?;
    println!("{} {:?} deleted.", model, ids);
    Ok(())
}

/// Call any model method with JSON positional and keyword arguments.
pub fn call(
    model: &str,
    method: &str,
    args: Option<&str>,
    kwargs: Option<&str>,
    client_config_path: &Path,
) -> Result<()> {
    let args = match args.map(parse_json).transpose()? {
        None => Vec::new(),
        Some(Value::Array(items)) => items,
        Some(other) => vec![other],
    };
    let params = match kwargs.map(parse_json).transpose()? {
        None => Params::new(),
        Some(value) => Params::try_from(value)?,
    };

    let session = session(client_config_path)?;
    print_json(&session.call(model, method, args, params)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_domain() {
        assert!(parse_domain(None).unwrap().is_empty());

        let single: Value = parse_domain(Some(r#"["name","ilike","azure"]"#)).unwrap().into();
        assert_eq!(single, json!([["name", "ilike", "azure"]]));

        let full: Value = parse_domain(Some(r#"["|",["a","=",1],["b","=",2]]"#)).unwrap().into();
        assert_eq!(full, json!(["|", ["a", "=", 1], ["b", "=", 2]]));

        assert!(parse_domain(Some("[not json")).is_err());
    }

    #[test]
    fn test_parse_list_and_ids() {
        assert_eq!(parse_list("name, email,,"), vec!["name", "email"]);
        assert_eq!(parse_ids("1,2, 3").unwrap(), vec![1, 2, 3]);
        assert!(parse_ids("1,x").is_err());
        assert!(parse_ids(" ").is_err());
    }

    #[test]
    fn test_query_params() {
        let query = QueryArgs {
            limit: Some(5),
            order: Some("name desc".to_string()),
            ..Default::default()
        };
        let params = query_params(&query, &["name".to_string()]);
        assert_eq!(params.get("limit"), Some(&json!(5)));
        assert_eq!(params.get("order"), Some(&json!("name desc")));
        assert_eq!(params.get("fields"), Some(&json!(["name"])));
        assert_eq!(params.get("offset"), None);

        assert!(query_params(&QueryArgs::default(), &[]).is_empty());
    }
}
