//! Streaming request decoder.

use std::io::Read;

use serde_json::{Deserializer, Value};

use crate::body::BodyStream;
use crate::errors::ProtocolError;
use crate::metadata::Metadata;

/// Decodes one request from the readable half of a connection.
///
/// Bytes are fed to an incremental JSON parser that reports each
/// top-level value as soon as its closing delimiter is seen; no
/// separator between values is required. The first value must be the
/// metadata object, and every later value must be a string whose
/// content is appended to the body. The reader is consumed to
/// end-of-input, and the body stream comes back rewound to its start.
///
/// # Errors
///
/// Fails when the stream closes before any value arrives, when the
/// first value is not an object, when a later value is not a string,
/// when the bytes are not valid JSON, or when reading from the
/// underlying stream fails.
pub fn read_request<R: Read>(reader: R) -> Result<(Metadata, BodyStream), ProtocolError> {
    let mut values = Deserializer::from_reader(reader).into_iter::<Value>();

    let first = values.next().ok_or(ProtocolError::EmptyRequest)??;
    let metadata = match first {
        Value::Object(fields) => Metadata::new(fields),
        other => {
            return Err(ProtocolError::MetadataNotObject {
                found: json_type_name(&other),
            });
        }
    };

    let mut body = Vec::new();
    for value in values {
        match value? {
            Value::String(chunk) => body.extend_from_slice(chunk.as_bytes()),
            other => {
                return Err(ProtocolError::BodyFrameNotString {
                    found: json_type_name(&other),
                });
            }
        }
    }

    Ok((metadata, BodyStream::new(body)))
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
