//! Wire shapes exchanged with the coordinator.
//!
//! Push messages are JSON text frames. Pull requests and responses are JSON
//! bodies over HTTP.

use serde::{Deserialize, Deserializer, Serialize, de};
use serde_json::{Map, Value};

use crate::{
    op::{JOB_ID_FIELDS, Operation, TRACE_ID_FIELDS, first_field},
    types::{JobId, TraceId},
};

use super::TransportError;

/// Type tag of a pushed batch.
pub const BLOCK_TYPE: &str = "addin.block";
/// Type tag of the coordinator's greeting.
pub const HELLO_TYPE: &str = "hello";
/// Maximum accepted push frame (8MB).
pub const MAX_MESSAGE_SIZE: usize = 8 * 1024 * 1024;

/// A parsed push message.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// Greeting sent after the socket opens.
    Hello {
        /// Delivery group the coordinator put us in.
        group: Option<String>,
    },
    /// A batch of operations.
    Block(BlockMessage),
    /// A bare `paragraph`/`heading` message from older coordinators.
    Primitive(Operation),
    /// Anything else; only the top-level keys are kept for logging.
    Unknown {
        /// Top-level keys of the message.
        keys: Vec<String>,
    },
}

/// Payload of an `addin.block` message.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockMessage {
    /// Owning job, from `jobId` or `job_id`.
    pub job_id: Option<JobId>,
    /// Correlation id, from `traceId` or `trace_id`.
    pub trace_id: Option<TraceId>,
    /// Raw operations in arrival order.
    pub ops: Vec<Value>,
}

impl Inbound {
    /// Parses one text frame.
    pub fn parse(raw: &str) -> Result<Self, TransportError> {
        let value: Value = serde_json::from_str(raw)?;
        let obj = value
            .as_object()
            .ok_or_else(|| TransportError::Malformed("message is not an object".to_string()))?;

        let msg_type = obj.get("type").and_then(Value::as_str).unwrap_or("");
        match msg_type {
            HELLO_TYPE => Ok(Self::Hello {
                group: first_field(obj, &["group"]),
            }),
            BLOCK_TYPE => Ok(Self::Block(BlockMessage::from_object(obj, &value))),
            "paragraph" | "heading" => Operation::from_value(&value)
                .map(Self::Primitive)
                .map_err(|err| TransportError::Malformed(err.to_string())),
            _ => Ok(Self::Unknown {
                keys: obj.keys().cloned().collect(),
            }),
        }
    }
}

impl BlockMessage {
    /// Extracts the batch from `blocks`, `ops`, `block`, or the message itself
    /// when it is operation-shaped.
    fn from_object(obj: &Map<String, Value>, whole: &Value) -> Self {
        let ops = if let Some(Value::Array(items)) = obj.get("blocks") {
            items.clone()
        } else if let Some(Value::Array(items)) = obj.get("ops") {
            items.clone()
        } else if let Some(block) = obj.get("block").filter(|b| !b.is_null()) {
            vec![block.clone()]
        } else if obj.contains_key("op") || obj.contains_key("kind") {
            vec![whole.clone()]
        } else {
            Vec::new()
        };

        Self {
            job_id: first_field(obj, JOB_ID_FIELDS),
            trace_id: first_field(obj, TRACE_ID_FIELDS),
            ops,
        }
    }
}

/// `POST /api/docs/next` body.
#[derive(Debug, Serialize)]
pub struct ClaimRequest<'a> {
    /// Identity of the claiming document.
    pub url: &'a str,
}

/// `POST /api/docs/next` response.
#[derive(Debug, Deserialize)]
pub struct ClaimResponse {
    /// Claimed job, if any was queued for this document.
    #[serde(default)]
    pub job: Option<ClaimedJob>,
}

/// A job handed out by the coordinator.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ClaimedJob {
    /// Job identity.
    #[serde(deserialize_with = "id_string")]
    pub id: JobId,
    /// Raw operation, `{ block }`, `{ blocks }`, or an array.
    #[serde(default)]
    pub payload: Value,
}

/// `POST /api/jobs/{id}/complete` body.
#[derive(Debug, Serialize)]
pub struct CompleteRequest<'a> {
    /// Whether the job applied.
    pub ok: bool,
    /// Short outcome or error text.
    pub message: &'a str,
}

fn id_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(de::Error::custom(format!("unsupported job id: {other}"))),
    }
}
