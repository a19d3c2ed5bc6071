//! Shared primitive IDs and document-formatting enums.

use serde::{Deserialize, Serialize};

/// Coordinator-assigned job identifier.
pub type JobId = String;
/// Correlation id carried through logs and acknowledgments.
pub type TraceId = String;
/// Client-assigned operation identifier.
pub type OpId = String;
/// Stable paragraph identifier inside one document.
pub type ParagraphId = u64;

/// Built-in paragraph styles every host is expected to recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BuiltInStyle {
    /// Body text.
    Normal,
    /// Second-level heading.
    Heading2,
    /// Bulleted list item.
    ListBullet,
}

impl BuiltInStyle {
    /// Host-facing style name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Heading2 => "Heading2",
            Self::ListBullet => "ListBullet",
        }
    }

    /// Resolves a built-in by its host-facing name, ignoring case and spaces.
    pub fn from_name(name: &str) -> Option<Self> {
        let folded: String = name
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_lowercase)
            .collect();
        match folded.as_str() {
            "normal" => Some(Self::Normal),
            "heading2" => Some(Self::Heading2),
            "listbullet" => Some(Self::ListBullet),
            _ => None,
        }
    }
}

/// Style request passed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StyleRef {
    /// A built-in style; never rejected by the host.
    BuiltIn(BuiltInStyle),
    /// A document-defined style name; the host may not know it.
    Named(String),
}

impl StyleRef {
    /// Maps a free-form style hint to a [`StyleRef`], preferring built-ins.
    pub fn from_hint(hint: &str) -> Self {
        match BuiltInStyle::from_name(hint) {
            Some(builtin) => Self::BuiltIn(builtin),
            None => Self::Named(hint.to_string()),
        }
    }
}

/// Where the host should place a new paragraph.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertLocation {
    /// Append at the end of the body.
    End,
    /// Immediately after an existing paragraph.
    After(ParagraphId),
}
