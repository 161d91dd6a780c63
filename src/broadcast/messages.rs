//! Broadcast Message Types
//!
//! Defines the telemetry event accepted from producers and the
//! Server-Sent Events frames written to dashboard viewers.

use axum::body::Bytes;
use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use serde_json::{Map, Value};
use std::io;
use thiserror::Error;

/// First frame of every stream, lets viewers tell "no data yet" from "not connected"
const CONNECTED_FRAME: &[u8] =
    b"data: {\"type\":\"connected\",\"message\":\"SSE connection established\"}\n\n";

/// Comment frame sent when a subscription has been idle for the keep-alive interval
const KEEP_ALIVE_FRAME: &[u8] = b": keep-alive\n\n";

/// A single telemetry sample from a field device
///
/// Schema-free: any JSON object is accepted and forwarded as-is. Key order
/// is kept as the producer supplied it.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryEvent(Map<String, Value>);

impl TelemetryEvent {
    /// Parse an ingestion request body
    ///
    /// An empty body and a literal `null` both count as "no data"; anything
    /// else that is not a JSON object is rejected.
    pub fn from_slice(body: &[u8]) -> Result<Self, PayloadError> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Err(PayloadError::Empty);
        }

        match serde_json::from_slice::<Value>(body)? {
            Value::Object(fields) => Ok(Self(fields)),
            Value::Null => Err(PayloadError::Empty),
            other => Err(PayloadError::NotAnObject(json_kind(&other))),
        }
    }

    /// Number of top-level fields
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for TelemetryEvent {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

impl Serialize for TelemetryEvent {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.0.serialize(serializer)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Why an ingestion body was rejected
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Request body is empty")]
    Empty,

    #[error("Malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("Expected a JSON object, got {0}")]
    NotAnObject(&'static str),
}

/// One unit written to a viewer's event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Synthetic first frame of every subscription
    Connected,
    /// Fully encoded `data:` frame for a published event
    Telemetry(Bytes),
    /// Content-free comment that keeps intermediaries from reaping the connection
    KeepAlive,
}

impl Frame {
    /// Encode a telemetry event into its wire frame
    ///
    /// Done once per publish; the resulting bytes are shared by every subscriber.
    pub fn telemetry(event: &TelemetryEvent) -> Result<Self, serde_json::Error> {
        Ok(Self::Telemetry(data_frame(event)?))
    }

    /// Wire bytes for this frame
    pub fn into_bytes(self) -> Bytes {
        match self {
            Frame::Connected => Bytes::from_static(CONNECTED_FRAME),
            Frame::Telemetry(bytes) => bytes,
            Frame::KeepAlive => Bytes::from_static(KEEP_ALIVE_FRAME),
        }
    }
}

/// Single-line JSON with `", "` between items and `": "` after keys
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn data_frame<T: Serialize>(value: &T) -> Result<Bytes, serde_json::Error> {
    let mut frame = Vec::with_capacity(128);
    frame.extend_from_slice(b"data: ");

    let mut serializer = Serializer::with_formatter(&mut frame, SpacedFormatter);
    value.serialize(&mut serializer)?;

    frame.extend_from_slice(b"\n\n");
    Ok(Bytes::from(frame))
}
