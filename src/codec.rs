//! Structured-document codec used for import and export.
//!
//! Every document is wrapped in an envelope naming the shape it carries, so a
//! professionals file handed to a patients import is reported as a shape
//! mismatch instead of being half-read. XML goes through `quick-xml`'s serde
//! support and JSON through `serde_json`; callers only pick a `Format`.

use crate::error::CodecError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

const XML_ROOT: &str = "document";
const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

/// Document syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Xml,
    Json,
}

impl Format {
    /// Pick the format from a file extension (`.xml` / `.json`, any case).
    pub fn from_path(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_lowercase();
        match extension.as_str() {
            "xml" => Some(Format::Xml),
            "json" => Some(Format::Json),
            _ => None,
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Xml => f.write_str("xml"),
            Format::Json => f.write_str("json"),
        }
    }
}

/// A value that can travel as a document body.
pub trait Shape: Serialize + DeserializeOwned {
    /// Name written into the envelope and checked on decode.
    const NAME: &'static str;
}

/// A plain list of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster<T> {
    #[serde(rename = "item", default = "Vec::new")]
    pub items: Vec<T>,
}

impl<T> Roster<T> {
    pub fn new(items: Vec<T>) -> Self {
        Roster { items }
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a, T> {
    shape: &'a str,
    body: &'a T,
}

#[derive(Deserialize)]
struct Envelope<T> {
    shape: String,
    body: T,
}

#[derive(Deserialize)]
struct Header {
    shape: String,
}

/// Encode `value` as a complete document.
pub fn encode<T: Shape>(value: &T, format: Format) -> Result<Vec<u8>, CodecError> {
    let envelope = EnvelopeRef {
        shape: T::NAME,
        body: value,
    };

    let encode_error = |message: String| CodecError::Encode {
        shape: T::NAME,
        message,
    };

    match format {
        Format::Json => {
            serde_json::to_vec_pretty(&envelope).map_err(|e| encode_error(e.to_string()))
        }
        Format::Xml => {
            let body = quick_xml::se::to_string_with_root(XML_ROOT, &envelope)
                .map_err(|e| encode_error(e.to_string()))?;
            Ok(format!("{}{}", XML_DECLARATION, body).into_bytes())
        }
    }
}

/// Decode a document, checking that it carries a `T`.
pub fn decode<T: Shape>(bytes: &[u8], format: Format) -> Result<T, CodecError> {
    let header: Header = parse(bytes, format)?;
    if header.shape != T::NAME {
        return Err(CodecError::ShapeMismatch {
            expected: T::NAME,
            found: header.shape,
        });
    }

    let envelope: Envelope<T> = parse(bytes, format).map_err(|e| match e {
        CodecError::Malformed(message) => CodecError::ShapeMismatch {
            expected: T::NAME,
            found: format!("unreadable {} body ({})", header.shape, message),
        },
        other => other,
    })?;
    debug_assert_eq!(envelope.shape, T::NAME);
    Ok(envelope.body)
}

fn parse<D: DeserializeOwned>(bytes: &[u8], format: Format) -> Result<D, CodecError> {
    match format {
        Format::Json => {
            serde_json::from_slice(bytes).map_err(|e| CodecError::Malformed(e.to_string()))
        }
        Format::Xml => {
            let text =
                std::str::from_utf8(bytes).map_err(|e| CodecError::Malformed(e.to_string()))?;
            quick_xml::de::from_str(text).map_err(|e| CodecError::Malformed(e.to_string()))
        }
    }
}
