//! XML-RPC wire format.
//!
//! Values are carried as `serde_json::Value`. Encoding maps JSON onto the
//! XML-RPC scalar types; decoding maps every XML-RPC type back onto JSON,
//! with `dateTime.iso8601` and `base64` kept as their textual form.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use serde_json::{Map, Number, Value};

use crate::error::RpcError;

// ── Encoding ────────────────────────────────────────────────────────

/// Serialize a `<methodCall>` document.
pub fn encode_call(method: &str, params: &[Value]) -> Result<Vec<u8>, RpcError> {
    let mut w = Writer::new(Vec::new());
    w.write_event(Event::Decl(BytesDecl::new("1.0", None, None)))
        .map_err(encode_err)?;
    start(&mut w, "methodCall")?;
    text_element(&mut w, "methodName", method)?;
    start(&mut w, "params")?;
    for param in params {
        start(&mut w, "param")?;
        write_value(&mut w, param)?;
        end(&mut w, "param")?;
    }
    end(&mut w, "params")?;
    end(&mut w, "methodCall")?;
    Ok(w.into_inner())
}

fn write_value(w: &mut Writer<Vec<u8>>, value: &Value) -> Result<(), RpcError> {
    start(w, "value")?;
    match value {
        Value::Null => {
            w.write_event(Event::Empty(BytesStart::new("nil")))
                .map_err(encode_err)?;
        }
        Value::Bool(b) => text_element(w, "boolean", if *b { "1" } else { "0" })?,
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                let tag = if i32::try_from(i).is_ok() { "int" } else { "i8" };
                text_element(w, tag, &i.to_string())?;
            } else {
                let f = n.as_f64().unwrap_or_default();
                text_element(w, "double", &f.to_string())?;
            }
        }
        Value::String(s) => text_element(w, "string", s)?,
        Value::Array(items) => {
            start(w, "array")?;
            start(w, "data")?;
            for item in items {
                write_value(w, item)?;
            }
            end(w, "data")?;
            end(w, "array")?;
        }
        Value::Object(members) => {
            start(w, "struct")?;
            for (name, member) in members {
                start(w, "member")?;
                text_element(w, "name", name)?;
                write_value(w, member)?;
                end(w, "member")?;
            }
            end(w, "struct")?;
        }
    }
    end(w, "value")
}

fn start(w: &mut Writer<Vec<u8>>, name: &str) -> Result<(), RpcError> {
    w.write_event(Event::Start(BytesStart::new(name)))
        .map_err(encode_err)
}

fn end(w: &mut Writer<Vec<u8>>, name: &str) -> Result<(), RpcError> {
    w.write_event(Event::End(BytesEnd::new(name)))
        .map_err(encode_err)
}

fn text_element(w: &mut Writer<Vec<u8>>, name: &str, text: &str) -> Result<(), RpcError> {
    start(w, name)?;
    w.write_event(Event::Text(BytesText::new(text)))
        .map_err(encode_err)?;
    end(w, name)
}

fn encode_err(e: impl std::fmt::Display) -> RpcError {
    RpcError::Decode(format!("encode request: {}", e))
}

// ── Decoding ────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct Element {
    name: String,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn named(name: String) -> Self {
        Self {
            name,
            ..Default::default()
        }
    }

    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn require(&self, name: &str) -> Result<&Element, RpcError> {
        self.child(name)
            .ok_or_else(|| decode_err(format!("<{}> without <{}>", self.name, name)))
    }
}

fn parse_tree(xml: &str) -> Result<Element, RpcError> {
    let mut reader = Reader::from_str(xml);
    let mut stack = vec![Element::named("#document".to_string())];

    loop {
        match reader.read_event().map_err(decode_err)? {
            Event::Start(e) => {
                let name = std::str::from_utf8(e.name().as_ref())
                    .map_err(decode_err)?
                    .to_string();
                stack.push(Element::named(name));
            }
            Event::Empty(e) => {
                let name = std::str::from_utf8(e.name().as_ref())
                    .map_err(decode_err)?
                    .to_string();
                let parent = stack.last_mut().ok_or_else(|| decode_err("unbalanced document"))?;
                parent.children.push(Element::named(name));
            }
            Event::End(_) => {
                let done = stack.pop().ok_or_else(|| decode_err("unbalanced document"))?;
                let parent = stack.last_mut().ok_or_else(|| decode_err("unbalanced document"))?;
                parent.children.push(done);
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(decode_err)?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(&text);
                }
            }
            Event::CData(e) => {
                let bytes = e.into_inner();
                let text = std::str::from_utf8(&bytes).map_err(decode_err)?;
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(decode_err("unterminated document"));
    }
    let document = stack.pop().unwrap_or_default();
    document
        .children
        .into_iter()
        .next()
        .ok_or_else(|| decode_err("empty document"))
}

/// Decode a `<methodResponse>`, turning `<fault>` into [`RpcError::Fault`].
pub fn decode_response(xml: &str) -> Result<Value, RpcError> {
    let root = parse_tree(xml)?;
    if root.name != "methodResponse" {
        return Err(decode_err(format!("unexpected root <{}>", root.name)));
    }

    if let Some(fault) = root.child("fault") {
        let detail = decode_value(fault.require("value")?)?;
        let code = match detail.get("faultCode") {
            Some(Value::Number(n)) => n.as_i64().unwrap_or_default(),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(1),
            _ => 1,
        };
        let message = detail
            .get("faultString")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        return Err(RpcError::Fault { code, message });
    }

    let param = root.require("params")?.require("param")?;
    decode_value(param.require("value")?)
}

fn decode_value(value: &Element) -> Result<Value, RpcError> {
    let Some(typed) = value.children.first() else {
        // Untyped <value>text</value> is a string.
        return Ok(Value::String(value.text.clone()));
    };

    let text = typed.text.as_str();
    match typed.name.as_str() {
        "int" | "i4" | "i8" => text
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .map_err(|e| decode_err(format!("<{}> {:?}: {}", typed.name, text, e))),
        "boolean" => match text.trim() {
            "1" | "true" => Ok(Value::Bool(true)),
            "0" | "false" => Ok(Value::Bool(false)),
            other => Err(decode_err(format!("<boolean> {:?}", other))),
        },
        "double" => {
            let f: f64 = text
                .trim()
                .parse()
                .map_err(|e| decode_err(format!("<double> {:?}: {}", text, e)))?;
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| decode_err(format!("<double> {} is not finite", f)))
        }
        "string" => Ok(Value::String(text.to_string())),
        "dateTime.iso8601" | "base64" => Ok(Value::String(text.trim().to_string())),
        "nil" => Ok(Value::Null),
        "array" => {
            let data = typed.require("data")?;
            data.children
                .iter()
                .filter(|c| c.name == "value")
                .map(decode_value)
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array)
        }
        "struct" => {
            let mut members = Map::new();
            for member in typed.children.iter().filter(|c| c.name == "member") {
                let name = member.require("name")?.text.clone();
                members.insert(name, decode_value(member.require("value")?)?);
            }
            Ok(Value::Object(members))
        }
        other => Err(decode_err(format!("unknown value type <{}>", other))),
    }
}

fn decode_err(e: impl std::fmt::Display) -> RpcError {
    RpcError::Decode(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn wrap(value_xml: &str) -> String {
        format!(
            "<?xml version='1.0'?><methodResponse><params><param>{}</param></params></methodResponse>",
            value_xml
        )
    }

    #[test]
    fn encodes_scalars_and_containers() {
        let xml = encode_call(
            "execute_kw",
            &[json!("db"), json!(2), json!({"a": [true, null, 1.5]}), json!("x<y")],
        )
        .unwrap();
        let xml = String::from_utf8(xml).unwrap();
        assert!(xml.contains("<methodName>execute_kw</methodName>"));
        assert!(xml.contains("<value><string>db</string></value>"));
        assert!(xml.contains("<value><int>2</int></value>"));
        assert!(xml.contains("<member><name>a</name><value><array><data>"));
        assert!(xml.contains("<value><boolean>1</boolean></value>"));
        assert!(xml.contains("<value><nil/></value>"));
        assert!(xml.contains("<value><double>1.5</double></value>"));
        assert!(xml.contains("<string>x&lt;y</string>"));
    }

    #[test]
    fn large_integers_use_i8() {
        let xml = String::from_utf8(encode_call("m", &[json!(5_000_000_000i64)]).unwrap()).unwrap();
        assert!(xml.contains("<i8>5000000000</i8>"));
    }

    #[test]
    fn encoded_call_decodes_back_through_the_tree() {
        let params = vec![json!({"name": "Acme & Co", "ids": [1, 2], "active": false})];
        let xml = String::from_utf8(encode_call("write", &params).unwrap()).unwrap();
        let root = parse_tree(&xml).unwrap();
        assert_eq!(root.name, "methodCall");
        let value = root
            .require("params")
            .and_then(|p| p.require("param"))
            .and_then(|p| p.require("value"))
            .unwrap();
        assert_eq!(decode_value(value).unwrap(), params[0]);
    }

    #[test]
    fn decodes_search_read_result() {
        let xml = wrap(
            "<value><array><data>\
               <value><struct>\
                 <member><name>id</name><value><int>7</int></value></member>\
                 <member><name>name</name><value><string>Azure Interior</string></value></member>\
                 <member><name>parent_id</name><value><boolean>0</boolean></value></member>\
                 <member><name>country_id</name><value><array><data>\
                   <value><i4>21</i4></value><value>Belgium</value>\
                 </data></array></value></member>\
                 <member><name>credit</name><value><double>12.5</double></value></member>\
                 <member><name>write_date</name><value><dateTime.iso8601>20240101T10:00:00</dateTime.iso8601></value></member>\
                 <member><name>comment</name><value><nil/></value></member>\
               </struct></value>\
             </data></array></value>",
        );
        assert_eq!(
            decode_response(&xml).unwrap(),
            json!([{
                "id": 7,
                "name": "Azure Interior",
                "parent_id": false,
                "country_id": [21, "Belgium"],
                "credit": 12.5,
                "write_date": "20240101T10:00:00",
                "comment": null,
            }])
        );
    }

    #[test]
    fn string_whitespace_and_entities_are_kept() {
        let xml = wrap("<value><string>  a &amp; b </string></value>");
        assert_eq!(decode_response(&xml).unwrap(), json!("  a & b "));
    }

    #[test]
    fn fault_becomes_error() {
        let xml = "<?xml version='1.0'?><methodResponse><fault><value><struct>\
            <member><name>faultCode</name><value><int>3</int></value></member>\
            <member><name>faultString</name><value><string>Access Denied</string></value></member>\
            </struct></value></fault></methodResponse>";
        match decode_response(xml) {
            Err(RpcError::Fault { code, message }) => {
                assert_eq!(code, 3);
                assert_eq!(message, "Access Denied");
            }
            other => panic!("expected fault, got {:?}", other),
        }
    }

    #[test]
    fn malformed_documents_are_decode_errors() {
        assert!(matches!(decode_response("<methodResponse><params>"), Err(RpcError::Decode(_))));
        assert!(matches!(decode_response("<foo/>"), Err(RpcError::Decode(_))));
        assert!(matches!(
            decode_response(&wrap("<value><int>abc</int></value>")),
            Err(RpcError::Decode(_))
        ));
    }
}
