//! SOAP transport for the Ad Manager API
//!
//! Envelopes are assembled as strings and responses parsed into
//! `serde_json::Value` trees (elements become objects, repeated siblings
//! become arrays, leaves stay strings) so the normalization layer sees the
//! same loosely-typed shapes the vendor SDK would hand out.

use std::path::PathBuf;
use std::time::Duration;

use quick_xml::events::Event;
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::auth;
use crate::error::CoreError;

pub const API_VERSION: &str = "v202511";
const ENDPOINT_BASE: &str = "https://ads.google.com/apis/ads/publisher";
const API_NAMESPACE: &str = "https://www.google.com/apis/ads/publisher";

/// Thin SOAP client shared by all Ad Manager services.
pub struct SoapClient {
    http: reqwest::Client,
    network_code: String,
    application_name: String,
    credentials_file: Option<PathBuf>,
}

impl SoapClient {
    pub fn new(
        network_code: String,
        application_name: String,
        credentials_file: Option<PathBuf>,
    ) -> Result<Self, CoreError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| CoreError::Http {
                endpoint: ENDPOINT_BASE.to_string(),
                source: e,
            })?;
        Ok(Self {
            http,
            network_code,
            application_name,
            credentials_file,
        })
    }

    /// Invoke one service method. `payload` is the already-serialized child
    /// elements of the method element (may be empty).
    pub async fn call(
        &self,
        service: &str,
        method: &str,
        payload: &str,
    ) -> Result<Value, CoreError> {
        let endpoint = format!("{}/{}/{}", ENDPOINT_BASE, API_VERSION, service);
        let token = auth::access_token_for(&self.http, self.credentials_file.as_deref()).await?;
        let envelope = self.envelope(method, payload);

        tracing::debug!(service, method, "Calling Ad Manager SOAP service");

        let response = self
            .http
            .post(&endpoint)
            .header("Content-Type", "text/xml; charset=utf-8")
            .header("SOAPAction", "")
            .bearer_auth(token)
            .body(envelope)
            .send()
            .await
            .map_err(|e| CoreError::Http {
                endpoint: endpoint.clone(),
                source: e,
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CoreError::Http {
            endpoint,
            source: e,
        })?;

        // Faults arrive with a 500 status but still as SOAP XML; parse first
        // so the faultstring is surfaced instead of raw markup.
        let doc = match xml_to_value(&body) {
            Ok(doc) => doc,
            Err(_) if !status.is_success() => {
                return Err(CoreError::HttpStatus {
                    service: service.to_string(),
                    status: status.as_u16(),
                    body: body.chars().take(200).collect(),
                })
            }
            Err(e) => return Err(e),
        };

        if let Some(fault) = find_key(&doc, "faultstring") {
            return Err(CoreError::SoapFault {
                service: service.to_string(),
                fault: value_text(fault),
            });
        }
        if !status.is_success() {
            return Err(CoreError::HttpStatus {
                service: service.to_string(),
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let response_key = format!("{}Response", method);
        let rval = find_key(&doc, &response_key)
            .and_then(|r| r.field_value("rval"))
            .cloned()
            .ok_or_else(|| CoreError::MalformedResponse {
                service: service.to_string(),
                message: format!("no {}/rval element", response_key),
            })?;

        Ok(rval)
    }

    fn envelope(&self, method: &str, payload: &str) -> String {
        let ns = format!("{}/{}", API_NAMESPACE, API_VERSION);
        format!(
            concat!(
                "<?xml version=\"1.0\" encoding=\"UTF-8\"?>",
                "<soapenv:Envelope xmlns:soapenv=\"http://schemas.xmlsoap.org/soap/envelope/\">",
                "<soapenv:Header>",
                "<RequestHeader xmlns=\"{ns}\">",
                "<networkCode>{code}</networkCode>",
                "<applicationName>{app}</applicationName>",
                "</RequestHeader>",
                "</soapenv:Header>",
                "<soapenv:Body>",
                "<{method} xmlns=\"{ns}\">{payload}</{method}>",
                "</soapenv:Body>",
                "</soapenv:Envelope>"
            ),
            ns = ns,
            code = xml_escape(&self.network_code),
            app = xml_escape(&self.application_name),
            method = method,
            payload = payload,
        )
    }
}

trait FieldValue {
    fn field_value(&self, key: &str) -> Option<&Value>;
}

impl FieldValue for Value {
    fn field_value(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|m| m.get(key))
    }
}

/// Escape text content for inclusion in an XML document.
pub fn xml_escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// Serialize a value tree into XML elements named `name`.
///
/// Objects become nested elements, arrays repeat the element per item
/// (SOAP's list convention), scalars become text leaves, and nulls are
/// skipped entirely.
pub fn value_to_xml(name: &str, value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Object(map) => {
            let inner: String = map
                .iter()
                .map(|(k, v)| value_to_xml(k, v))
                .collect();
            format!("<{}>{}</{}>", name, inner, name)
        }
        Value::Array(items) => items.iter().map(|item| value_to_xml(name, item)).collect(),
        Value::String(s) => format!("<{}>{}</{}>", name, xml_escape(s), name),
        other => format!("<{}>{}</{}>", name, other, name),
    }
}

/// Parse an XML document into a value tree.
///
/// Namespace prefixes are dropped; attributes are ignored. Repeated sibling
/// elements collapse into an array under the shared name. Text-only
/// elements become strings, empty elements become null.
pub fn xml_to_value(xml: &str) -> Result<Value, CoreError> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    // Stack frame per open element: (name, children, accumulated text)
    let mut stack: Vec<(String, Map<String, Value>, String)> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    let malformed = |message: String| CoreError::MalformedResponse {
        service: "soap".to_string(),
        message,
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                stack.push((name, Map::new(), String::new()));
            }
            Ok(Event::Empty(e)) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                match stack.last_mut() {
                    Some((_, children, _)) => insert_child(children, name, Value::Null),
                    None => root = Some((name, Value::Null)),
                }
            }
            Ok(Event::Text(t)) => {
                let text = t
                    .unescape()
                    .map_err(|e| malformed(format!("bad text node: {}", e)))?;
                if let Some((_, _, buf)) = stack.last_mut() {
                    buf.push_str(&text);
                }
            }
            Ok(Event::CData(t)) => {
                if let Some((_, _, buf)) = stack.last_mut() {
                    buf.push_str(&String::from_utf8_lossy(&t));
                }
            }
            Ok(Event::End(_)) => {
                let (name, children, text) = stack
                    .pop()
                    .ok_or_else(|| malformed("unbalanced end tag".to_string()))?;
                let node = if children.is_empty() {
                    if text.is_empty() {
                        Value::Null
                    } else {
                        Value::String(text)
                    }
                } else {
                    Value::Object(children)
                };
                match stack.last_mut() {
                    Some((_, parent, _)) => insert_child(parent, name, node),
                    None => root = Some((name, node)),
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => return Err(malformed(format!("XML parse error: {}", e))),
        }
    }

    let (name, value) = root.ok_or_else(|| malformed("empty document".to_string()))?;
    let mut doc = Map::new();
    doc.insert(name, value);
    Ok(Value::Object(doc))
}

fn insert_child(parent: &mut Map<String, Value>, name: String, node: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(items)) => items.push(node),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, node]);
        }
        None => {
            parent.insert(name, node);
        }
    }
}

/// Depth-first search for the first element with the given name.
pub fn find_key<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    match value {
        Value::Object(map) => {
            if let Some(found) = map.get(key) {
                return Some(found);
            }
            map.values().find_map(|v| find_key(v, key))
        }
        Value::Array(items) => items.iter().find_map(|v| find_key(v, key)),
        _ => None,
    }
}

/// Items of a page's `results` field, tolerating the XML single-item
/// ambiguity (one result parses as an object, several as an array).
pub fn results_array(page: &Value) -> Vec<Value> {
    match page.field_value("results") {
        Some(Value::Array(items)) => items.clone(),
        Some(Value::Null) | None => Vec::new(),
        Some(single) => vec![single.clone()],
    }
}

/// Same single-vs-many tolerance for a bare rval.
pub fn as_items(rval: &Value) -> Vec<Value> {
    match rval {
        Value::Array(items) => items.clone(),
        Value::Null => Vec::new(),
        single => vec![single.clone()],
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
