//! Applies planned mutations to the document host.
//!
//! [`DocumentMutator`] is the resource owned by the serializer. It holds the
//! host plus the cursor state that anchors move: the insert target for the
//! current batch and the session-wide "selection moved" flag.

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    core::{
        list::{DEFAULT_LIST_STYLE, Mutation},
        marker,
    },
    document::{DocumentHost, HostResult},
    op::{OpKind, Operation},
    runtime::events::DocEvent,
    types::{BuiltInStyle, InsertLocation, ParagraphId, StyleRef},
};

/// What a batch did to the cursor and how many mutations failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BatchReport {
    /// Selection flag before the batch.
    pub selection_before: bool,
    /// Selection flag after the batch.
    pub selection_after: bool,
    /// An anchor resolved during the batch.
    pub anchor_found: bool,
    /// Mutations that applied.
    pub applied: usize,
    /// Mutations that failed and were skipped.
    pub failed: usize,
}

impl BatchReport {
    /// The selection went from "not moved" to "moved" during the batch.
    pub fn selection_moved(&self) -> bool {
        !self.selection_before && self.selection_after
    }
}

/// Sole owner of the document host.
pub struct DocumentMutator {
    host: Box<dyn DocumentHost>,
    target: Option<ParagraphId>,
    selection_moved: bool,
    report: BatchReport,
    events_tx: broadcast::Sender<DocEvent>,
}

impl DocumentMutator {
    /// Wraps `host`; events go to `events_tx`.
    pub fn new(host: Box<dyn DocumentHost>, events_tx: broadcast::Sender<DocEvent>) -> Self {
        Self {
            host,
            target: None,
            selection_moved: false,
            report: BatchReport::default(),
            events_tx,
        }
    }

    /// Read access to the host.
    pub fn host(&self) -> &dyn DocumentHost {
        self.host.as_ref()
    }

    /// Session-wide selection flag.
    pub fn selection_moved(&self) -> bool {
        self.selection_moved
    }

    /// Applies a planned batch, isolating failures per mutation.
    pub fn apply_batch(&mut self, plan: &[Mutation]) -> BatchReport {
        self.begin_batch();
        for mutation in plan {
            if let Err(err) = self.apply(mutation) {
                warn!(error = %err, "mutation failed, continuing with the batch");
                self.report.failed += 1;
            }
        }
        self.end_batch()
    }

    /// Inserts a bare `paragraph` or `heading` message as literal text.
    ///
    /// Anchor markers are not interpreted here, and the cursor is neither
    /// read nor moved.
    pub fn apply_primitive(&mut self, op: &Operation) -> BatchReport {
        self.begin_batch();
        let style = match op.kind {
            OpKind::Heading => StyleRef::BuiltIn(BuiltInStyle::Heading2),
            _ => op
                .style
                .as_deref()
                .map(StyleRef::from_hint)
                .unwrap_or(StyleRef::BuiltIn(BuiltInStyle::Normal)),
        };
        match self.insert_lines(op.text(), &style, BuiltInStyle::Normal) {
            Ok(()) => self.report.applied += 1,
            Err(err) => {
                warn!(error = %err, "primitive insert failed");
                self.report.failed += 1;
            }
        }
        self.end_batch()
    }

    /// Applies a job's batch, stamps its marker and saves, all or nothing
    /// from the caller's point of view: the first failure aborts the job.
    pub fn apply_job(&mut self, job_id: &str, plan: &[Mutation]) -> HostResult<BatchReport> {
        self.begin_batch();
        let res = self.apply_job_inner(job_id, plan);
        let report = self.end_batch();
        res.map(|_| report)
    }

    fn apply_job_inner(&mut self, job_id: &str, plan: &[Mutation]) -> HostResult<()> {
        for mutation in plan {
            self.apply(mutation)?;
        }
        self.stamp_marker(job_id)?;
        self.save()
    }

    /// True when the body already carries the marker for `job_id`.
    pub fn has_marker(&self, job_id: &str) -> bool {
        marker::has_marker(self.host.as_ref(), job_id)
    }

    /// Appends the completion marker for `job_id`.
    pub fn stamp_marker(&mut self, job_id: &str) -> HostResult<ParagraphId> {
        let id = marker::stamp(self.host.as_mut(), job_id)?;
        let _ = self.events_tx.send(DocEvent::MarkerWritten {
            job_id: job_id.to_string(),
        });
        Ok(id)
    }

    /// Commits the document.
    pub fn save(&mut self) -> HostResult<()> {
        self.host.save()?;
        let _ = self.events_tx.send(DocEvent::Saved);
        Ok(())
    }

    /// Applies one mutation at the current target.
    pub fn apply(&mut self, mutation: &Mutation) -> HostResult<()> {
        match mutation {
            Mutation::Apply(op) => self.apply_op(op)?,
            Mutation::InsertList { items, style } => {
                self.insert_list(items, &StyleRef::from_hint(style))?
            }
        }
        self.report.applied += 1;
        Ok(())
    }

    fn begin_batch(&mut self) {
        self.target = None;
        self.report = BatchReport {
            selection_before: self.selection_moved,
            ..BatchReport::default()
        };
    }

    fn end_batch(&mut self) -> BatchReport {
        self.target = None;
        self.report.selection_after = self.selection_moved;
        self.report
    }

    fn apply_op(&mut self, op: &Operation) -> HostResult<()> {
        if op.is_anchor() {
            self.navigate_to_anchor(op.text());
            return Ok(());
        }

        match &op.kind {
            OpKind::ParagraphInsert | OpKind::Paragraph => {
                let style = op
                    .style
                    .as_deref()
                    .map(StyleRef::from_hint)
                    .unwrap_or(StyleRef::BuiltIn(BuiltInStyle::Normal));
                self.insert_lines(op.text(), &style, BuiltInStyle::Normal)
            }
            OpKind::Heading => self.insert_lines(
                op.text(),
                &StyleRef::BuiltIn(BuiltInStyle::Heading2),
                BuiltInStyle::Normal,
            ),
            OpKind::ListItem => {
                let style = StyleRef::from_hint(op.style.as_deref().unwrap_or(DEFAULT_LIST_STYLE));
                self.insert_list(&[op.text().trim().to_string()], &style)
            }
            OpKind::ListStart | OpKind::ListEnd => Ok(()),
            OpKind::Unknown(kind) => {
                debug!(kind = %kind, "skipping unknown operation");
                Ok(())
            }
        }
    }

    /// One paragraph per non-empty line, in order.
    fn insert_lines(&mut self, text: &str, style: &StyleRef, fallback: BuiltInStyle) -> HostResult<()> {
        for line in text.lines().filter(|l| !l.is_empty()) {
            let at = self.location();
            let id = self.host.insert_paragraph(line, at)?;
            self.advance(id);
            self.apply_style(id, style, fallback);
            let _ = self.events_tx.send(DocEvent::ParagraphInserted { id });
        }
        Ok(())
    }

    /// First item starts a list, each later item goes right after the previous one.
    fn insert_list(&mut self, items: &[String], style: &StyleRef) -> HostResult<()> {
        let Some((head, rest)) = items.split_first() else {
            return Ok(());
        };

        let at = self.location();
        let first = self.host.insert_paragraph(head, at)?;
        self.host.start_new_list(first)?;
        self.apply_style(first, style, BuiltInStyle::ListBullet);

        let mut prev = first;
        for item in rest {
            let id = self.host.insert_paragraph(item, InsertLocation::After(prev))?;
            self.apply_style(id, style, BuiltInStyle::ListBullet);
            prev = id;
        }
        self.advance(prev);

        let _ = self.events_tx.send(DocEvent::ListInserted {
            first,
            items: items.len(),
        });
        Ok(())
    }

    fn navigate_to_anchor(&mut self, text: &str) {
        match self.host.find_paragraph(text.trim()) {
            Some(id) => {
                info!(anchor = %text.trim(), paragraph = id, "anchor resolved");
                self.target = Some(id);
                self.selection_moved = true;
                self.report.anchor_found = true;
                let _ = self.events_tx.send(DocEvent::AnchorResolved { id });
            }
            None => {
                warn!(anchor = %text.trim(), "anchor not found, inserting at document end");
                self.target = None;
                self.selection_moved = false;
                let _ = self.events_tx.send(DocEvent::AnchorMissed);
            }
        }
    }

    fn apply_style(&mut self, id: ParagraphId, preferred: &StyleRef, fallback: BuiltInStyle) {
        if let Err(err) = self.host.set_style(id, preferred) {
            debug!(paragraph = id, error = %err, fallback = fallback.name(), "style rejected, using built-in");
            if let Err(err) = self.host.set_style(id, &StyleRef::BuiltIn(fallback)) {
                warn!(paragraph = id, error = %err, "fallback style rejected");
            }
        }
    }

    fn location(&self) -> InsertLocation {
        match self.target {
            Some(id) => InsertLocation::After(id),
            None => InsertLocation::End,
        }
    }

    /// Keeps anchored inserts chained after the last inserted paragraph.
    fn advance(&mut self, id: ParagraphId) {
        if self.target.is_some() {
            self.target = Some(id);
        }
    }
}
