//! Round-trip between HTTP messages and [`CloudEvent`], across the three
//! CloudEvents 1.0 HTTP protocol binding modes.

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Request, Uri};
use serde_json::{Map, Value};
use thiserror::Error;

use super::model::{CloudEvent, ExtensionValue};

const CONTENT_TYPE: &str = "content-type";
const STRUCTURED_CONTENT_TYPE: &str = "application/cloudevents+json";
const BATCH_CONTENT_TYPE: &str = "application/cloudevents-batch+json";
const CE_PREFIX: &str = "ce-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Binary,
    Structured,
    Batch,
}

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("missing required attribute '{0}'")]
    MissingAttribute(&'static str),

    #[error("invalid JSON body: {0}")]
    InvalidJson(String),

    #[error("event body is not a JSON object")]
    NotAnObject,

    #[error("batch body is not a JSON array")]
    NotAnArray,

    #[error("unsupported content type for a CloudEvents request")]
    UnsupportedContentType,

    #[error("failed to build outbound request: {0}")]
    RequestBuild(String),
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

fn content_type_base(headers: &HeaderMap) -> Option<String> {
    header_str(headers, CONTENT_TYPE).map(|v| v.split(';').next().unwrap_or(v).trim().to_ascii_lowercase())
}

/// Determine which CloudEvents HTTP binding mode a request is using.
#[must_use]
pub fn detect_mode(headers: &HeaderMap) -> Mode {
    match content_type_base(headers).as_deref() {
        Some(STRUCTURED_CONTENT_TYPE) => Mode::Structured,
        Some(BATCH_CONTENT_TYPE) => Mode::Batch,
        _ => Mode::Binary,
    }
}

fn decode_binary(headers: &HeaderMap, body: Bytes) -> Result<CloudEvent, CodecError> {
    let specversion = header_str(headers, "ce-specversion").ok_or(CodecError::MissingAttribute("specversion"))?;
    let event_type = header_str(headers, "ce-type").ok_or(CodecError::MissingAttribute("type"))?;
    let source = header_str(headers, "ce-source").ok_or(CodecError::MissingAttribute("source"))?;
    let id = header_str(headers, "ce-id").ok_or(CodecError::MissingAttribute("id"))?;

    let mut event = CloudEvent::new(specversion, event_type, source, id);
    event.time = header_str(headers, "ce-time").map(str::to_owned);
    event.subject = header_str(headers, "ce-subject").map(str::to_owned);
    event.dataschema = header_str(headers, "ce-dataschema").map(str::to_owned);
    event.datacontenttype = header_str(headers, CONTENT_TYPE).map(str::to_owned);

    for (name, value) in headers {
        let name = name.as_str();
        if !name.starts_with(CE_PREFIX) {
            continue;
        }
        let attr = &name[CE_PREFIX.len()..];
        if matches!(attr, "specversion" | "type" | "source" | "id" | "time" | "subject" | "dataschema") {
            continue;
        }
        if let Ok(raw) = value.to_str() {
            event.extensions.insert(attr.to_owned(), ExtensionValue::infer(raw));
        }
    }

    if !body.is_empty() {
        event.data = Some(body);
    }

    Ok(event)
}

fn event_from_json_object(obj: &Map<String, Value>) -> Result<CloudEvent, CodecError> {
    let get_str = |key: &'static str| -> Result<String, CodecError> {
        obj.get(key)
            .and_then(Value::as_str)
            .map(str::to_owned)
            .ok_or(CodecError::MissingAttribute(key))
    };

    let mut event = CloudEvent::new(get_str("specversion")?, get_str("type")?, get_str("source")?, get_str("id")?);

    event.time = obj.get("time").and_then(Value::as_str).map(str::to_owned);
    event.subject = obj.get("subject").and_then(Value::as_str).map(str::to_owned);
    event.dataschema = obj.get("dataschema").and_then(Value::as_str).map(str::to_owned);
    event.datacontenttype = obj.get("datacontenttype").and_then(Value::as_str).map(str::to_owned);

    if let Some(data) = obj.get("data") {
        event.data = Some(Bytes::from(serde_json::to_vec(data).map_err(|e| CodecError::InvalidJson(e.to_string()))?));
    }

    const KNOWN: &[&str] = &[
        "specversion",
        "type",
        "source",
        "id",
        "time",
        "subject",
        "dataschema",
        "datacontenttype",
        "data",
        "data_base64",
    ];

    for (key, value) in obj {
        if KNOWN.contains(&key.as_str()) {
            continue;
        }
        if let Some(ext) = ExtensionValue::from_json(value) {
            event.extensions.insert(key.clone(), ext);
        }
    }

    Ok(event)
}

fn decode_structured(body: Bytes) -> Result<CloudEvent, CodecError> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| CodecError::InvalidJson(e.to_string()))?;
    let obj = value.as_object().ok_or(CodecError::NotAnObject)?;
    event_from_json_object(obj)
}

fn decode_batch(body: Bytes) -> Result<Vec<Result<CloudEvent, CodecError>>, CodecError> {
    let value: Value = serde_json::from_slice(&body).map_err(|e| CodecError::InvalidJson(e.to_string()))?;
    let arr = value.as_array().ok_or(CodecError::NotAnArray)?;
    Ok(arr
        .iter()
        .map(|v| v.as_object().ok_or(CodecError::NotAnObject).and_then(event_from_json_object))
        .collect())
}

/// Decode an inbound request into one or more events and the mode it used.
///
/// Batch mode validates each entry independently: a malformed entry in the
/// array fails only that entry (returned as an `Err` in the batch result),
/// not the whole request.
pub fn decode_request(headers: &HeaderMap, body: Bytes) -> Result<(Vec<Result<CloudEvent, CodecError>>, Mode), CodecError> {
    match detect_mode(headers) {
        Mode::Binary => decode_binary(headers, body).map(|e| (vec![Ok(e)], Mode::Binary)),
        Mode::Structured => decode_structured(body).map(|e| (vec![Ok(e)], Mode::Structured)),
        Mode::Batch => decode_batch(body).map(|events| (events, Mode::Batch)),
    }
}

fn event_to_json_object(event: &CloudEvent) -> Map<String, Value> {
    let mut obj = Map::new();
    obj.insert("specversion".to_owned(), Value::from(event.specversion.clone()));
    obj.insert("type".to_owned(), Value::from(event.event_type.clone()));
    obj.insert("source".to_owned(), Value::from(event.source.clone()));
    obj.insert("id".to_owned(), Value::from(event.id.clone()));
    if let Some(time) = &event.time {
        obj.insert("time".to_owned(), Value::from(time.clone()));
    }
    if let Some(subject) = &event.subject {
        obj.insert("subject".to_owned(), Value::from(subject.clone()));
    }
    if let Some(dataschema) = &event.dataschema {
        obj.insert("dataschema".to_owned(), Value::from(dataschema.clone()));
    }
    if let Some(dct) = &event.datacontenttype {
        obj.insert("datacontenttype".to_owned(), Value::from(dct.clone()));
    }
    if let Some(data) = &event.data {
        if let Ok(parsed) = serde_json::from_slice::<Value>(data) {
            obj.insert("data".to_owned(), parsed);
        }
    }
    for (name, value) in &event.extensions {
        obj.insert(name.clone(), value.to_json());
    }
    obj
}

fn encode_binary(event: &CloudEvent) -> Result<(HeaderMap, Bytes), CodecError> {
    let mut headers = HeaderMap::new();
    let put = |headers: &mut HeaderMap, name: &str, value: &str| -> Result<(), CodecError> {
        let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| CodecError::RequestBuild(e.to_string()))?;
        let header_value = HeaderValue::from_str(value).map_err(|e| CodecError::RequestBuild(e.to_string()))?;
        headers.insert(header_name, header_value);
        Ok(())
    };

    put(&mut headers, "ce-specversion", &event.specversion)?;
    put(&mut headers, "ce-type", &event.event_type)?;
    put(&mut headers, "ce-source", &event.source)?;
    put(&mut headers, "ce-id", &event.id)?;
    if let Some(time) = &event.time {
        put(&mut headers, "ce-time", time)?;
    }
    if let Some(subject) = &event.subject {
        put(&mut headers, "ce-subject", subject)?;
    }
    if let Some(dataschema) = &event.dataschema {
        put(&mut headers, "ce-dataschema", dataschema)?;
    }
    for (name, value) in &event.extensions {
        put(&mut headers, &format!("{CE_PREFIX}{name}"), &value.as_wire_string())?;
    }

    let content_type = event.datacontenttype.clone().unwrap_or_else(|| "application/json".to_owned());
    put(&mut headers, CONTENT_TYPE, &content_type)?;

    let body = event.data.clone().unwrap_or_default();
    Ok((headers, body))
}

/// Build an outbound request for `event`, mirroring the HTTP binding mode
/// the inbound caller used.
pub fn encode_request(uri: &Uri, event: &CloudEvent, mode: Mode) -> Result<Request<Bytes>, CodecError> {
    let mut builder = Request::builder().method(http::Method::POST).uri(uri.clone());

    let body = match mode {
        Mode::Binary => {
            let (headers, body) = encode_binary(event)?;
            for (name, value) in &headers {
                builder = builder.header(name, value);
            }
            body
        }
        Mode::Structured | Mode::Batch => {
            let obj = event_to_json_object(event);
            let content_type = if mode == Mode::Batch { BATCH_CONTENT_TYPE } else { STRUCTURED_CONTENT_TYPE };
            builder = builder.header(CONTENT_TYPE, content_type);
            let payload = if mode == Mode::Batch { Value::Array(vec![Value::Object(obj)]) } else { Value::Object(obj) };
            Bytes::from(serde_json::to_vec(&payload).map_err(|e| CodecError::RequestBuild(e.to_string()))?)
        }
    };

    builder.body(body).map_err(|e| CodecError::RequestBuild(e.to_string()))
}

/// Build an outbound batched request carrying every event in `events`,
/// for the (rarer) case where an inbound batch request decoded to more
/// than one event and the forward must preserve that shape.
pub fn encode_batch_request(uri: &Uri, events: &[CloudEvent]) -> Result<Request<Bytes>, CodecError> {
    let array = Value::Array(events.iter().map(|e| Value::Object(event_to_json_object(e))).collect());
    let body = Bytes::from(serde_json::to_vec(&array).map_err(|e| CodecError::RequestBuild(e.to_string()))?);

    Request::builder()
        .method(http::Method::POST)
        .uri(uri.clone())
        .header(CONTENT_TYPE, BATCH_CONTENT_TYPE)
        .body(body)
        .map_err(|e| CodecError::RequestBuild(e.to_string()))
}
