use serde::{Deserialize, Serialize};

use super::chunk::Category;

/// The full text of a source file, as it enters the ingestion path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    pub category: Category,
    pub source_label: String,
}

impl Document {
    pub fn new(
        id: impl Into<String>,
        content: impl Into<String>,
        category: Category,
        source_label: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            category,
            source_label: source_label.into(),
        }
    }
}
