use tempfile::TempDir;

use docops::{
    core::{
        dedup::DedupFilter,
        marker::{completed_jobs, has_marker},
    },
    document::{DocumentHost, MemoryDocument},
    persist::{DocumentSink, sqlite::SqliteDocumentSink},
    transport::session::{Dispatch, Session},
    types::InsertLocation,
};

#[test]
fn saved_document_reloads_with_body_lists_and_ids() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("doc.db");

    let sink = SqliteDocumentSink::open(&db_path).expect("open sqlite");
    let mut doc = MemoryDocument::open("doc://saved", Box::new(sink)).expect("open doc");
    let first = doc.insert_paragraph("one", InsertLocation::End).expect("insert");
    doc.start_new_list(first).expect("list");
    doc.insert_paragraph("two", InsertLocation::After(first)).expect("insert");
    doc.insert_paragraph("DOCOPS_DONE: job-1", InsertLocation::End).expect("marker");
    doc.save().expect("save");
    let saved = doc.snapshot();
    drop(doc);

    let sink = SqliteDocumentSink::open(&db_path).expect("reopen sqlite");
    let mut reopened = MemoryDocument::open("doc://saved", Box::new(sink)).expect("reopen doc");
    assert_eq!(reopened.snapshot(), saved);
    assert!(has_marker(&reopened, "job-1"));
    assert_eq!(completed_jobs(&reopened), vec!["job-1"]);

    // Ids keep counting from where the saved document stopped.
    let next = reopened.insert_paragraph("three", InsertLocation::End).expect("insert");
    assert!(saved.paragraphs.iter().all(|p| p.id < next));
}

#[test]
fn url_mismatch_starts_empty() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("doc.db");

    let sink = SqliteDocumentSink::open(&db_path).expect("open");
    let mut doc = MemoryDocument::open("doc://a", Box::new(sink)).expect("doc");
    doc.insert_paragraph("a", InsertLocation::End).expect("insert");
    doc.save().expect("save");
    drop(doc);

    let sink = SqliteDocumentSink::open(&db_path).expect("reopen");
    let other = MemoryDocument::open("doc://b", Box::new(sink)).expect("doc");
    assert!(other.paragraphs().is_empty());
}

#[test]
fn retention_keeps_only_newest_snapshots() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("doc.db");

    let mut doc = MemoryDocument::new("doc://r");
    let mut sink = SqliteDocumentSink::open(&db_path).expect("open").with_retention(2);
    for i in 0..5 {
        doc.insert_paragraph(&format!("p{i}"), InsertLocation::End).expect("insert");
        sink.save(&doc.snapshot()).expect("save");
    }
    assert_eq!(sink.snapshot_count().expect("count"), 2);

    let latest = sink.load_latest().expect("load").expect("snapshot");
    assert_eq!(latest.paragraphs.len(), 5);
    assert_eq!(latest.revision, 5);
}

#[test]
fn empty_database_has_no_snapshot() {
    let sink = SqliteDocumentSink::open_in_memory().expect("open");
    assert!(sink.load_latest().expect("load").is_none());
    assert_eq!(sink.snapshot_count().expect("count"), 0);
}

#[tokio::test]
async fn pushed_batches_survive_a_restart_after_save() {
    let tmp = TempDir::new().expect("tmp");
    let db_path = tmp.path().join("doc.db");

    let sink = SqliteDocumentSink::open(&db_path).expect("open");
    let doc = MemoryDocument::open("doc://push", Box::new(sink)).expect("doc");
    let mut session = Session::new(Box::new(doc), DedupFilter::default());

    let raw = r#"{"type":"addin.block","jobId":"p1","blocks":[{"op":"paragraph.insert","text":"kept"}]}"#;
    assert!(matches!(session.dispatch(raw).await, Dispatch::Applied { .. }));
    session
        .document()
        .submit("save", |m| m.save())
        .wait()
        .await
        .expect("save");
    drop(session.document().shutdown().await.expect("shutdown"));

    let sink = SqliteDocumentSink::open(&db_path).expect("reopen");
    let doc = MemoryDocument::open("doc://push", Box::new(sink)).expect("doc");
    assert_eq!(doc.body_text(), "kept");
}
