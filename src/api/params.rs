use reqwest::multipart::{Form, Part};
use serde_json::Value;

use crate::error::{Result, TransportError};

/// A file parameter: either raw content to upload or something the server
/// already knows how to fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum InputFile {
    /// Binary content sent as its own multipart part.
    Upload {
        file_name: String,
        mime: Option<String>,
        bytes: Vec<u8>,
    },
    /// A `file_id` from an earlier message, or an HTTP URL.
    Remote(String),
}

impl InputFile {
    pub fn upload(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        InputFile::Upload {
            file_name: file_name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    pub fn remote(id_or_url: impl Into<String>) -> Self {
        InputFile::Remote(id_or_url.into())
    }
}

/// One typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    /// Structured record (reply markup, entity lists, ...), sent as JSON text.
    Json(Value),
    File(InputFile),
}

impl ParamValue {
    /// True for values that carry raw bytes and force multipart encoding.
    pub fn is_attachment(&self) -> bool {
        matches!(self, ParamValue::File(InputFile::Upload { .. }))
    }

    /// Textual wire form. `None` for uploads, which are never sent as text.
    fn as_text(&self) -> Option<String> {
        match self {
            ParamValue::Text(s) => Some(s.clone()),
            ParamValue::Integer(n) => Some(n.to_string()),
            ParamValue::Bool(b) => Some(b.to_string()),
            ParamValue::Json(Value::String(s)) => Some(s.clone()),
            ParamValue::Json(v) => Some(v.to_string()),
            ParamValue::File(InputFile::Remote(id)) => Some(id.clone()),
            ParamValue::File(InputFile::Upload { .. }) => None,
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        ParamValue::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        ParamValue::Text(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        ParamValue::Integer(value)
    }
}

impl From<i32> for ParamValue {
    fn from(value: i32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<u32> for ParamValue {
    fn from(value: u32) -> Self {
        ParamValue::Integer(value.into())
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        ParamValue::Bool(value)
    }
}

impl From<Value> for ParamValue {
    fn from(value: Value) -> Self {
        ParamValue::Json(value)
    }
}

impl From<InputFile> for ParamValue {
    fn from(value: InputFile) -> Self {
        ParamValue::File(value)
    }
}

/// Body encoding for a whole request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    FormUrlEncoded,
    Multipart,
}

/// Ordered, key-unique parameter set for one API call.
///
/// Absent values are kept so that `set_opt(key, None)` clears an earlier
/// value, but they never reach the wire.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Parameters {
    entries: Vec<(String, Option<ParamValue>)>,
}

impl Parameters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`Parameters::set`].
    pub fn with(mut self, key: &str, value: impl Into<ParamValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Builder form of [`Parameters::set_opt`].
    pub fn with_opt<V: Into<ParamValue>>(mut self, key: &str, value: Option<V>) -> Self {
        self.set_opt(key, value);
        self
    }

    pub fn set(&mut self, key: &str, value: impl Into<ParamValue>) {
        self.set_opt(key, Some(value));
    }

    /// Insert or replace `key`, keeping its original position.
    pub fn set_opt<V: Into<ParamValue>>(&mut self, key: &str, value: Option<V>) {
        let value = value.map(Into::into);
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&ParamValue> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .and_then(|(_, v)| v.as_ref())
    }

    /// Present values in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.entries
            .iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.as_str(), v)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Any upload anywhere in the set switches the whole request to multipart.
    pub fn encoding(&self) -> Encoding {
        if self.iter().any(|(_, v)| v.is_attachment()) {
            Encoding::Multipart
        } else {
            Encoding::FormUrlEncoded
        }
    }

    /// Text fields for form-url-encoding. Uploads are skipped.
    pub fn form_fields(&self) -> Vec<(String, String)> {
        self.iter()
            .filter_map(|(k, v)| v.as_text().map(|text| (k.to_string(), text)))
            .collect()
    }

    /// Build the multipart body; text values become plain fields and uploads
    /// become named file parts.
    pub fn to_multipart(&self) -> Result<Form> {
        let mut form = Form::new();
        for (key, value) in self.iter() {
            form = match value {
                ParamValue::File(InputFile::Upload {
                    file_name,
                    mime,
                    bytes,
                }) => {
                    let mut part = Part::bytes(bytes.clone()).file_name(file_name.clone());
                    if let Some(mime) = mime {
                        part = part.mime_str(mime).map_err(|e| {
                            TransportError::InvalidRequest(format!(
                                "invalid mime `{}` for `{}`: {}",
                                mime, key, e
                            ))
                        })?;
                    }
                    form.part(key.to_string(), part)
                }
                other => match other.as_text() {
                    Some(text) => form.text(key.to_string(), text),
                    None => form,
                },
            };
        }
        Ok(form)
    }

    /// Human-readable payload for the request log. Uploads are summarised.
    pub fn log_payload(&self) -> String {
        self.iter()
            .map(|(k, v)| match v {
                ParamValue::File(InputFile::Upload {
                    file_name, bytes, ..
                }) => format!("{}=<{} ({} bytes)>", k, file_name, bytes.len()),
                other => format!("{}={}", k, other.as_text().unwrap_or_default()),
            })
            .collect::<Vec<_>>()
            .join("&")
    }
}
