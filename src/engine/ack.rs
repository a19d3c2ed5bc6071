//! Batch acknowledgments.

use serde::{Deserialize, Serialize};

use crate::{
    op::Operation,
    types::{JobId, TraceId},
};

use super::mutator::BatchReport;

/// Wire type tag of an acknowledgment.
pub const ACK_TYPE: &str = "addin.ack";

/// Outcome of one pushed batch, as sent back to the coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ack {
    /// Always [`ACK_TYPE`].
    #[serde(rename = "type")]
    pub msg_type: String,
    /// Job the batch belonged to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,
    /// Correlation id of the batch.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<TraceId>,
    /// Content operations in the batch.
    pub applied_ops: usize,
    /// An anchor resolved during the batch.
    pub anchor_found: bool,
    /// The selection moved during the batch.
    pub selection_moved: bool,
}

impl Ack {
    /// Builds the acknowledgment for `ops` given what the mutator reported.
    pub fn for_batch(
        job_id: Option<JobId>,
        trace_id: Option<TraceId>,
        ops: &[Operation],
        report: &BatchReport,
    ) -> Self {
        Self {
            msg_type: ACK_TYPE.to_string(),
            job_id,
            trace_id,
            applied_ops: count_applied_ops(ops),
            anchor_found: report.anchor_found,
            selection_moved: report.selection_moved(),
        }
    }
}

/// Operations that count as content: anchors and `list.start`/`list.end`
/// are navigation and structure.
pub fn count_applied_ops(ops: &[Operation]) -> usize {
    ops.iter()
        .filter(|op| !op.is_anchor() && !op.kind.is_list_structure())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::OpKind;

    #[test]
    fn structure_and_anchors_are_not_counted() {
        let ops = vec![
            Operation::paragraph("<BLOCK:1>"),
            Operation::new(OpKind::ListStart),
            Operation::new(OpKind::ListItem).with_text("a"),
            Operation::new(OpKind::ListEnd),
            Operation::new(OpKind::Heading).with_text("h"),
            Operation::new(OpKind::Unknown("table.insert".into())),
        ];
        assert_eq!(count_applied_ops(&ops), 3);
    }

    #[test]
    fn serializes_with_wire_names_and_omits_missing_ids() {
        let ack = Ack::for_batch(None, Some("t".into()), &[Operation::paragraph("x")], &BatchReport::default());
        let value = serde_json::to_value(&ack).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "type": "addin.ack",
                "traceId": "t",
                "appliedOps": 1,
                "anchorFound": false,
                "selectionMoved": false,
            })
        );
    }
}
