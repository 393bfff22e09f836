//! Data types for documents, chunks, and search results.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The record section a document was rendered from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    BasicInfo,
    Skills,
    Experience,
    Project,
    Education,
    Certifications,
    Interests,
    CareerGoals,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::BasicInfo => "basic_info",
            Category::Skills => "skills",
            Category::Experience => "experience",
            Category::Project => "project",
            Category::Education => "education",
            Category::Certifications => "certifications",
            Category::Interests => "interests",
            Category::CareerGoals => "career_goals",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provenance of a document or chunk.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Metadata {
    /// The section tag, serialized as `type`.
    #[serde(rename = "type")]
    pub category: Category,
    /// Zero-based position in the source list, for repeated sections only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<usize>,
}

impl Metadata {
    pub fn new(category: Category) -> Self {
        Self { category, index: None }
    }

    pub fn indexed(category: Category, index: usize) -> Self {
        Self { category, index: Some(index) }
    }
}

/// A source document containing text content and metadata.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// Unique identifier for the document, e.g. `experience_0`.
    pub id: String,
    /// The text content of the document.
    pub text: String,
    /// Section provenance.
    pub metadata: Metadata,
}

impl Document {
    /// Create a document whose id is derived from its metadata.
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        let id = match metadata.index {
            Some(index) => format!("{}_{index}", metadata.category),
            None => metadata.category.to_string(),
        };
        Self { id, text: text.into(), metadata }
    }
}

/// A segment of a [`Document`] with its vector embedding.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// Unique identifier for the chunk, `{document_id}_{n}`.
    pub id: String,
    /// The text content of the chunk.
    pub text: String,
    /// The vector embedding for this chunk's text. Empty until indexed.
    pub embedding: Vec<f32>,
    /// Metadata inherited unmodified from the parent document.
    pub metadata: Metadata,
    /// The ID of the parent [`Document`].
    pub document_id: String,
}

/// A retrieved [`Chunk`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved chunk.
    pub chunk: Chunk,
    /// The similarity score (higher is more relevant).
    pub score: f32,
    /// 1-based position in the result list, nearest first.
    pub rank: usize,
}
