//! In-memory document host with optional durable saves.

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::{
    persist::{DocumentSink, PersistResult},
    types::{BuiltInStyle, InsertLocation, ParagraphId, StyleRef},
};

use super::{DocumentHost, HostError, HostResult};

/// One paragraph of the body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    /// Stable id.
    pub id: ParagraphId,
    /// Paragraph text.
    pub text: String,
    /// Applied style.
    pub style: StyleRef,
    /// List membership, if any.
    pub list_id: Option<u64>,
}

/// Serializable document state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    /// Document identity.
    pub url: String,
    /// Body in order.
    pub paragraphs: Vec<Paragraph>,
    /// Document-defined style names.
    pub styles: Vec<String>,
    /// Next paragraph id to hand out.
    pub next_paragraph_id: ParagraphId,
    /// Next list id to hand out.
    pub next_list_id: u64,
    /// Mutation counter at snapshot time.
    pub revision: u64,
}

/// Document kept in memory; `save` writes a snapshot to the sink, if any.
pub struct MemoryDocument {
    url: String,
    paragraphs: Vec<Paragraph>,
    styles: HashSet<String>,
    next_paragraph_id: ParagraphId,
    next_list_id: u64,
    revision: u64,
    saves: u64,
    sink: Option<Box<dyn DocumentSink>>,
}

impl std::fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("url", &self.url)
            .field("paragraphs", &self.paragraphs.len())
            .field("revision", &self.revision)
            .field("saves", &self.saves)
            .finish()
    }
}

impl MemoryDocument {
    /// Creates an empty, unsaved document.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            paragraphs: Vec::new(),
            styles: HashSet::new(),
            next_paragraph_id: 1,
            next_list_id: 1,
            revision: 0,
            saves: 0,
            sink: None,
        }
    }

    /// Restores a document from a snapshot.
    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Self {
        Self {
            url: snapshot.url,
            paragraphs: snapshot.paragraphs,
            styles: snapshot.styles.into_iter().collect(),
            next_paragraph_id: snapshot.next_paragraph_id,
            next_list_id: snapshot.next_list_id,
            revision: snapshot.revision,
            saves: 0,
            sink: None,
        }
    }

    /// Loads the latest snapshot from `sink`, or starts empty, and saves back to it.
    pub fn open(url: impl Into<String>, sink: Box<dyn DocumentSink>) -> PersistResult<Self> {
        let url = url.into();
        let mut doc = match sink.load_latest()? {
            Some(snapshot) if snapshot.url == url => Self::from_snapshot(snapshot),
            Some(snapshot) => {
                tracing::warn!(stored = %snapshot.url, requested = %url, "snapshot url mismatch, starting empty");
                Self::new(url)
            }
            None => Self::new(url),
        };
        doc.sink = Some(sink);
        Ok(doc)
    }

    /// Registers a document-defined style name.
    pub fn with_style(mut self, name: impl Into<String>) -> Self {
        self.styles.insert(name.into());
        self
    }

    /// Captures the current state.
    pub fn snapshot(&self) -> DocumentSnapshot {
        let mut styles: Vec<String> = self.styles.iter().cloned().collect();
        styles.sort();
        DocumentSnapshot {
            url: self.url.clone(),
            paragraphs: self.paragraphs.clone(),
            styles,
            next_paragraph_id: self.next_paragraph_id,
            next_list_id: self.next_list_id,
            revision: self.revision,
        }
    }

    /// Body paragraphs in order.
    pub fn paragraphs(&self) -> &[Paragraph] {
        &self.paragraphs
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> u64 {
        self.saves
    }

    fn position(&self, id: ParagraphId) -> HostResult<usize> {
        self.paragraphs
            .iter()
            .position(|p| p.id == id)
            .ok_or(HostError::MissingParagraph(id))
    }

    fn paragraph_mut(&mut self, id: ParagraphId) -> HostResult<&mut Paragraph> {
        self.paragraphs
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(HostError::MissingParagraph(id))
    }
}

impl DocumentHost for MemoryDocument {
    fn url(&self) -> &str {
        &self.url
    }

    fn insert_paragraph(&mut self, text: &str, at: InsertLocation) -> HostResult<ParagraphId> {
        let (index, list_id) = match at {
            InsertLocation::End => (self.paragraphs.len(), None),
            InsertLocation::After(prev) => {
                let pos = self.position(prev)?;
                (pos + 1, self.paragraphs[pos].list_id)
            }
        };

        let id = self.next_paragraph_id;
        self.next_paragraph_id += 1;
        self.paragraphs.insert(
            index,
            Paragraph {
                id,
                text: text.to_string(),
                style: StyleRef::BuiltIn(BuiltInStyle::Normal),
                list_id,
            },
        );
        self.revision += 1;
        Ok(id)
    }

    fn set_style(&mut self, id: ParagraphId, style: &StyleRef) -> HostResult<()> {
        if let StyleRef::Named(name) = style {
            if !self.styles.contains(name) {
                return Err(HostError::UnknownStyle(name.clone()));
            }
        }
        self.paragraph_mut(id)?.style = style.clone();
        self.revision += 1;
        Ok(())
    }

    fn start_new_list(&mut self, id: ParagraphId) -> HostResult<()> {
        let list_id = self.next_list_id;
        self.paragraph_mut(id)?.list_id = Some(list_id);
        self.next_list_id += 1;
        self.revision += 1;
        Ok(())
    }

    fn find_paragraph(&self, needle: &str) -> Option<ParagraphId> {
        if needle.is_empty() {
            return None;
        }
        self.paragraphs
            .iter()
            .find(|p| p.text.contains(needle))
            .map(|p| p.id)
    }

    fn body_text(&self) -> String {
        self.paragraphs
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn save(&mut self) -> HostResult<()> {
        if self.sink.is_some() {
            let snapshot = self.snapshot();
            if let Some(sink) = self.sink.as_mut() {
                sink.save(&snapshot)?;
            }
        }
        self.saves += 1;
        Ok(())
    }

    fn revision(&self) -> u64 {
        self.revision
    }
}
