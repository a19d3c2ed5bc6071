//! Canonical operation model and the legacy field-synonym table.
//!
//! Coordinators in the field emit the same operation under several field
//! spellings. Every inbound shape is mapped onto [`Operation`] here, before
//! any other component sees it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::types::{JobId, OpId, TraceId};

/// Discriminant fields, highest priority first.
pub const KIND_FIELDS: &[&str] = &["op", "kind", "type"];
/// Text payload fields.
pub const TEXT_FIELDS: &[&str] = &["text"];
/// Style hint fields, highest priority first.
pub const STYLE_FIELDS: &[&str] = &["style", "styleBuiltIn", "styleName", "styleNameHint"];
/// Operation id fields.
pub const OP_ID_FIELDS: &[&str] = &["opId", "op_id", "id"];
/// Job id fields (canonical and legacy snake case).
pub const JOB_ID_FIELDS: &[&str] = &["jobId", "job_id"];
/// Trace id fields (canonical and legacy snake case).
pub const TRACE_ID_FIELDS: &[&str] = &["traceId", "trace_id"];

/// Operation normalization failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OpError {
    /// The value is not a JSON object.
    #[error("operation is not an object")]
    NotAnObject,
    /// None of the discriminant fields carried a usable value.
    #[error("operation has no discriminant (expected one of op/kind/type)")]
    MissingDiscriminant,
}

/// Effective operation discriminant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OpKind {
    /// `paragraph.insert`
    ParagraphInsert,
    /// `paragraph`, the primitive form used by older coordinators.
    Paragraph,
    /// `heading`
    Heading,
    /// `list.start`
    ListStart,
    /// `list.item`
    ListItem,
    /// `list.end`
    ListEnd,
    /// Anything else, lowercased.
    Unknown(String),
}

impl OpKind {
    /// Parses a raw discriminant, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        let lowered = raw.trim().to_lowercase();
        match lowered.as_str() {
            "paragraph.insert" => Self::ParagraphInsert,
            "paragraph" => Self::Paragraph,
            "heading" => Self::Heading,
            "list.start" => Self::ListStart,
            "list.item" => Self::ListItem,
            "list.end" => Self::ListEnd,
            _ => Self::Unknown(lowered),
        }
    }

    /// Lowercase wire name.
    pub fn as_str(&self) -> &str {
        match self {
            Self::ParagraphInsert => "paragraph.insert",
            Self::Paragraph => "paragraph",
            Self::Heading => "heading",
            Self::ListStart => "list.start",
            Self::ListItem => "list.item",
            Self::ListEnd => "list.end",
            Self::Unknown(raw) => raw,
        }
    }

    /// True for any `list.*` discriminant.
    pub fn is_list(&self) -> bool {
        matches!(self, Self::ListStart | Self::ListItem | Self::ListEnd)
    }

    /// True for `list.start` and `list.end`, which carry no content.
    pub fn is_list_structure(&self) -> bool {
        matches!(self, Self::ListStart | Self::ListEnd)
    }

    /// True for kinds that insert a plain paragraph.
    pub fn is_paragraph(&self) -> bool {
        matches!(self, Self::ParagraphInsert | Self::Paragraph)
    }
}

/// One instruction to mutate the document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Operation {
    /// Effective discriminant.
    pub kind: OpKind,
    /// Text payload.
    pub text: Option<String>,
    /// Formatting hint.
    pub style: Option<String>,
    /// Client-assigned id.
    pub op_id: Option<OpId>,
    /// Owning job.
    pub job_id: Option<JobId>,
    /// Correlation id.
    pub trace_id: Option<TraceId>,
}

impl Operation {
    /// Creates an operation with no payload.
    pub fn new(kind: OpKind) -> Self {
        Self {
            kind,
            text: None,
            style: None,
            op_id: None,
            job_id: None,
            trace_id: None,
        }
    }

    /// Shorthand for a `paragraph.insert` carrying `text`.
    pub fn paragraph(text: impl Into<String>) -> Self {
        Self::new(OpKind::ParagraphInsert).with_text(text)
    }

    /// Sets the text payload.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Sets the style hint.
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Normalizes one JSON value through the synonym table.
    pub fn from_value(value: &Value) -> Result<Self, OpError> {
        let obj = value.as_object().ok_or(OpError::NotAnObject)?;
        let kind = first_field(obj, KIND_FIELDS).ok_or(OpError::MissingDiscriminant)?;
        Ok(Self {
            kind: OpKind::parse(&kind),
            text: first_field(obj, TEXT_FIELDS),
            style: first_field(obj, STYLE_FIELDS),
            op_id: first_field(obj, OP_ID_FIELDS),
            job_id: first_field(obj, JOB_ID_FIELDS),
            trace_id: first_field(obj, TRACE_ID_FIELDS),
        })
    }

    /// Text payload or the empty string.
    pub fn text(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }

    /// True for paragraph inserts whose text is an anchor marker.
    pub fn is_anchor(&self) -> bool {
        self.kind.is_paragraph() && is_anchor_text(self.text())
    }
}

/// Anchor markers are tag-like: the trimmed text opens with `<`.
pub fn is_anchor_text(text: &str) -> bool {
    text.trim_start().starts_with('<')
}

/// First non-empty scalar among `fields`, in table order.
pub fn first_field(obj: &Map<String, Value>, fields: &[&str]) -> Option<String> {
    fields.iter().find_map(|field| match obj.get(*field)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// Flattens a job payload into raw operation values.
///
/// Accepts an array, `{ blocks: [...] }`, `{ blocks: {...} }`, `{ block }`, or
/// a bare operation.
pub fn payload_values(payload: &Value) -> Vec<Value> {
    match payload {
        Value::Null => Vec::new(),
        Value::Array(items) => items.clone(),
        Value::Object(obj) => {
            if let Some(blocks) = obj.get("blocks") {
                match blocks {
                    Value::Array(items) => items.clone(),
                    other => vec![other.clone()],
                }
            } else if let Some(block) = obj.get("block") {
                vec![block.clone()]
            } else {
                vec![payload.clone()]
            }
        }
        other => vec![other.clone()],
    }
}

/// Normalizes a list of raw values, dropping (and logging) malformed ones.
pub fn normalize_batch(values: &[Value]) -> Vec<Operation> {
    values
        .iter()
        .enumerate()
        .filter_map(|(idx, value)| match Operation::from_value(value) {
            Ok(op) => Some(op),
            Err(err) => {
                warn!(index = idx, error = %err, "dropping malformed operation");
                None
            }
        })
        .collect()
}
