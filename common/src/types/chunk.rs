use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One of the five content categories the corpus is tagged with. Unrecognized
/// strings from a backend hydration step default to `Wellness` per §4.5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Yoga,
    Wellness,
    Meditation,
    Nutrition,
    Exercise,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Yoga => "yoga",
            Category::Wellness => "wellness",
            Category::Meditation => "meditation",
            Category::Nutrition => "nutrition",
            Category::Exercise => "exercise",
        }
    }

    /// Defaulting parse used when hydrating index metadata of unknown
    /// provenance: any string that doesn't exactly match a known category
    /// becomes `Wellness` rather than failing hydration.
    pub fn from_str_defaulted(value: &str) -> Self {
        match value {
            "yoga" => Category::Yoga,
            "meditation" => Category::Meditation,
            "nutrition" => Category::Nutrition,
            "exercise" => Category::Exercise,
            _ => Category::Wellness,
        }
    }
}

impl Default for Category {
    fn default() -> Self {
        Category::Wellness
    }
}

/// An immutable, token-bounded unit of indexable text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub id: String,
    pub document_id: String,
    pub chunk_index: usize,
    pub content: String,
    pub tokens: usize,
    pub category: Category,
    pub source_label: String,
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    pub fn id_for(document_id: &str, chunk_index: usize) -> String {
        format!("{document_id}_chunk_{chunk_index}")
    }

    pub fn new(
        document_id: impl Into<String>,
        chunk_index: usize,
        content: impl Into<String>,
        tokens: usize,
        category: Category,
        source_label: impl Into<String>,
    ) -> Self {
        let document_id = document_id.into();
        let id = Self::id_for(&document_id, chunk_index);
        Self {
            id,
            document_id,
            chunk_index,
            content: content.into(),
            tokens,
            category,
            source_label: source_label.into(),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unrecognized_category_string_defaults_to_wellness() {
        assert_eq!(Category::from_str_defaulted("bogus"), Category::Wellness);
        assert_eq!(Category::from_str_defaulted("yoga"), Category::Yoga);
    }

    #[test]
    fn chunk_id_follows_document_id_chunk_index_convention() {
        let chunk = Chunk::new("doc1", 3, "content", 10, Category::Yoga, "source");
        assert_eq!(chunk.id, "doc1_chunk_3");
    }
}
