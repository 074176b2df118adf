//! Response decoding
//!
//! Turns an ok response into a [`ResolvedResponse`], choosing the body
//! representation from the declared content type.

use std::collections::BTreeMap;
use std::fmt;
use bytes::Bytes;
use futures_util::stream::BoxStream;
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::StatusCode;
use serde_json::Value;
use crate::http::transport::TransportError;
use crate::Result;

/// Raw body chunks of a streamed response
pub type ByteStream = BoxStream<'static, std::result::Result<Bytes, reqwest::Error>>;

/// Opaque binary payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blob {
    /// Media type the server declared, parameters stripped
    pub content_type: Option<String>,
    pub data: Bytes,
}

impl Blob {
    /// Size of the payload in bytes
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// Decoded payload of a successful response
pub enum ResponseBody {
    /// `application/json` payload
    Json(Value),
    /// `text/*` payload
    Text(String),
    /// Any other payload
    Blob(Blob),
    /// Unconsumed body, returned in streaming mode
    Stream(ByteStream),
    /// `204 No Content`
    Null,
}

impl ResponseBody {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseBody::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_blob(&self) -> Option<&Blob> {
        match self {
            ResponseBody::Blob(blob) => Some(blob),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, ResponseBody::Null)
    }

    /// Take the byte stream out of a streamed body
    pub fn into_stream(self) -> Option<ByteStream> {
        match self {
            ResponseBody::Stream(stream) => Some(stream),
            _ => None,
        }
    }
}

impl fmt::Debug for ResponseBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResponseBody::Json(value) => f.debug_tuple("Json").field(value).finish(),
            ResponseBody::Text(text) => f.debug_tuple("Text").field(text).finish(),
            ResponseBody::Blob(blob) => f.debug_tuple("Blob").field(blob).finish(),
            ResponseBody::Stream(_) => f.write_str("Stream(..)"),
            ResponseBody::Null => f.write_str("Null"),
        }
    }
}

/// Result of a successful call
#[derive(Debug)]
pub struct ResolvedResponse {
    pub body: ResponseBody,
    /// Header names are lowercase; repeated headers are joined with `", "`
    pub headers: BTreeMap<String, String>,
    pub status: u16,
}

impl ResolvedResponse {
    /// Look up a header by name, case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }
}

/// Media type of a content-type header value: parameters stripped, trimmed, lowercase
pub fn media_type(content_type: Option<&str>) -> String {
    content_type
        .and_then(|value| value.split(';').next())
        .map(|value| value.trim().to_ascii_lowercase())
        .unwrap_or_default()
}

/// Flatten a header map into name/value pairs
pub fn header_map(headers: &HeaderMap) -> BTreeMap<String, String> {
    let mut flattened: BTreeMap<String, String> = BTreeMap::new();

    for (name, value) in headers {
        let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
        flattened
            .entry(name.as_str().to_string())
            .and_modify(|existing| {
                existing.push_str(", ");
                existing.push_str(&value);
            })
            .or_insert(value);
    }

    flattened
}

/// Decode a fully read body according to its content type
pub fn decode_body(content_type: Option<&str>, body: Bytes) -> Result<ResponseBody> {
    let media_type = media_type(content_type);

    if media_type == "application/json" {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(ResponseBody::Json(Value::Object(Default::default())));
        }

        let value: Value = serde_json::from_slice(&body).map_err(|e| crate::Error::Json {
            message: format!("Failed to parse response as JSON: {}", e),
            source: e,
        })?;

        return Ok(ResponseBody::Json(match value {
            Value::Null => Value::Object(Default::default()),
            value => value,
        }));
    }

    if media_type.starts_with("text/") {
        return Ok(ResponseBody::Text(String::from_utf8_lossy(&body).into_owned()));
    }

    Ok(ResponseBody::Blob(Blob {
        content_type: Some(media_type).filter(|m| !m.is_empty()),
        data: body,
    }))
}

/// Turn an ok response into a [`ResolvedResponse`]
pub async fn parse_response(response: reqwest::Response, as_stream: bool) -> Result<ResolvedResponse> {
    let status = response.status();
    let headers = header_map(response.headers());

    let body = if as_stream {
        ResponseBody::Stream(response.bytes_stream().boxed())
    } else if status == StatusCode::NO_CONTENT {
        ResponseBody::Null
    } else {
        let content_type = headers.get(CONTENT_TYPE.as_str()).cloned();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| crate::Error::from(TransportError::from(e)))?;
        decode_body(content_type.as_deref(), bytes)?
    };

    Ok(ResolvedResponse {
        body,
        headers,
        status: status.as_u16(),
    })
}
