//! In-document completion markers.
//!
//! A finished job leaves one paragraph `DOCOPS_DONE: <job id>` at the end of
//! the body. Finding that paragraph anywhere in the body means the job's
//! effects are already in the document.

use crate::{
    document::{DocumentHost, HostResult},
    types::{InsertLocation, ParagraphId},
};

/// Literal prefix of every marker paragraph.
pub const MARKER_PREFIX: &str = "DOCOPS_DONE:";

/// Marker paragraph text for `job_id`.
pub fn marker_text(job_id: &str) -> String {
    format!("{MARKER_PREFIX} {job_id}")
}

/// Whole-body scan for the marker of `job_id`.
///
/// Lines are compared whole so that job `1` never matches the marker of job `12`.
pub fn has_marker(host: &dyn DocumentHost, job_id: &str) -> bool {
    let wanted = marker_text(job_id);
    host.body_text().lines().any(|line| line.trim() == wanted)
}

/// Appends the marker for `job_id` at the end of the body.
pub fn stamp(host: &mut dyn DocumentHost, job_id: &str) -> HostResult<ParagraphId> {
    host.insert_paragraph(&marker_text(job_id), InsertLocation::End)
}

/// Job ids of every marker present in the body, in document order.
pub fn completed_jobs(host: &dyn DocumentHost) -> Vec<String> {
    host.body_text()
        .lines()
        .filter_map(|line| line.trim().strip_prefix(MARKER_PREFIX))
        .map(|rest| rest.trim().to_string())
        .filter(|id| !id.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::MemoryDocument;

    #[test]
    fn stamp_then_detect() {
        let mut doc = MemoryDocument::new("doc://m");
        assert!(!has_marker(&doc, "job-1"));
        stamp(&mut doc, "job-1").unwrap();
        assert!(has_marker(&doc, "job-1"));
        assert_eq!(doc.body_text(), "DOCOPS_DONE: job-1");
    }

    #[test]
    fn prefix_ids_do_not_collide() {
        let mut doc = MemoryDocument::new("doc://m");
        stamp(&mut doc, "12").unwrap();
        assert!(!has_marker(&doc, "1"));
        assert!(has_marker(&doc, "12"));
    }

    #[test]
    fn completed_jobs_lists_markers_in_order() {
        let mut doc = MemoryDocument::new("doc://m");
        doc.insert_paragraph("content", InsertLocation::End).unwrap();
        stamp(&mut doc, "a").unwrap();
        stamp(&mut doc, "b").unwrap();
        assert_eq!(completed_jobs(&doc), vec!["a".to_string(), "b".to_string()]);
    }
}
