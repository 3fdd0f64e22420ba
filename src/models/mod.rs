//! Core data models for the paper cache.
//!
//! This module contains the data structures shared by the provider, storage,
//! citation and server layers: the cached paper record and the citation bundle
//! returned to clients.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Metadata cached for a single paper.
///
/// On disk the record lives under its identifier inside a topic document, so
/// the `id` field is not serialized. Stored entries are read back leniently
/// with [`PaperRecord::from_stored`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PaperRecord {
    /// Canonical short identifier (e.g. `2301.00001v2`)
    #[serde(skip)]
    pub id: String,

    /// Paper title
    pub title: String,

    /// Author names in publication order
    pub authors: Vec<String>,

    /// Abstract text
    pub summary: String,

    /// Link to the PDF
    pub pdf_url: String,

    /// Publication date, `YYYY-MM-DD`
    pub published: String,
}

impl PaperRecord {
    /// Publication year: the first four characters of `published`.
    ///
    /// Shorter dates are returned whole.
    pub fn year(&self) -> &str {
        match self.published.char_indices().nth(4) {
            Some((idx, _)) => &self.published[..idx],
            None => &self.published,
        }
    }

    /// Attach an identifier, consuming the record.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    /// Read a stored entry, tolerating missing, `null` or mistyped fields.
    ///
    /// Fields that are absent or not strings come back empty. A bare string
    /// under `authors` counts as a single author.
    pub fn from_stored(id: &str, value: &Value) -> Self {
        let text = |key: &str| {
            value
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        let authors = match value.get("authors") {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(name)) => vec![name.clone()],
            _ => Vec::new(),
        };

        Self {
            id: id.to_string(),
            title: text("title"),
            authors,
            summary: text("summary"),
            pdf_url: text("pdf_url"),
            published: text("published"),
        }
    }
}

/// The JSON document stored per topic: identifier → entry.
///
/// Entries are kept as raw JSON so fields this crate does not model, and
/// values it would not produce (such as a `null` PDF link), survive a merge
/// untouched. Key order is preserved.
pub type TopicDocument = Map<String, Value>;

/// A cached entry together with the identifier it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPaper {
    pub id: String,

    /// The entry exactly as found on disk
    pub value: Value,
}

impl StoredPaper {
    /// Typed view of the entry.
    pub fn record(&self) -> PaperRecord {
        PaperRecord::from_stored(&self.id, &self.value)
    }
}

/// Citation strings in the three supported formats.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Citations {
    #[serde(rename = "APA")]
    pub apa: String,

    #[serde(rename = "MLA")]
    pub mla: String,

    #[serde(rename = "BibTeX")]
    pub bibtex: String,
}

/// Citation response for one paper.
///
/// Serializes to the document returned by the `get_paper_citations` tool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CitationBundle {
    pub paper_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub published: String,
    pub citations: Citations,
}
