use serde::{Deserialize, Serialize};

/// Positional and scoring weights.
///
/// A token's weight depends on where it appeared in the source document;
/// REAL and STEM weigh the exact-form and stem-shared occurrence counts
/// when a posting score is computed.
pub mod weight {
    pub const DEFAULT: f64 = 1.0;
    pub const TITLE: f64 = 3.0;
    pub const H_TITLE: f64 = 2.0;
    pub const KEYWORDS: f64 = 2.5;
    pub const DESCRIPTION: f64 = 2.5;
    pub const REAL: f64 = 0.3;
    pub const STEM: f64 = 1.0;
}

/// How a file's content gets interpreted during extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocType {
    Text,
    Html,
}

impl DocType {
    /// Detect the document type from a file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_ascii_lowercase().as_str() {
            "html" | "htm" => DocType::Html,
            _ => DocType::Text,
        }
    }
}

/// An indexed file. Identity is the filename; `id == 0` means the record has
/// not been persisted yet (storage assigns ids starting at 1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    pub filename: String,
    pub doc_type: DocType,
    pub hash: String,
    /// Last modification time, unix seconds.
    pub date: i64,
    /// Total term count of the document, set at finalization.
    pub length: u64,
}

impl Document {
    pub fn new(filename: String, doc_type: DocType, hash: String, date: i64) -> Self {
        Self {
            id: 0,
            filename,
            doc_type,
            hash,
            date,
            length: 0,
        }
    }

    pub fn is_persisted(&self) -> bool {
        self.id != 0
    }
}

/// A distinct surface form encountered during indexing. `real_term` is
/// lower-case and unique; `stem_term` is computed once, when the term is
/// first created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Term {
    pub id: u64,
    pub real_term: String,
    pub stem_term: String,
}

/// A posting: one (document, term) pair with its frequency, positional
/// weight and score. Composite key is (document_id, term_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Word {
    pub document_id: u64,
    pub term_id: u64,
    /// Running average of the positional weights of all occurrences.
    pub weight: f64,
    pub real_count: u64,
    /// Summed real_count of the *other* terms of this document sharing the
    /// same stem.
    pub stem_count: u64,
    pub score: f64,
}

impl Word {
    pub fn new(document_id: u64, term_id: u64, weight: f64) -> Self {
        let mut word = Self {
            document_id,
            term_id,
            weight,
            real_count: 1,
            stem_count: 0,
            score: 0.0,
        };
        word.recompute_score();
        word
    }

    /// Record one more occurrence at the given positional weight. The weight
    /// becomes the running average over all occurrences.
    pub fn add_occurrence(&mut self, new_weight: f64) {
        self.weight =
            (self.weight * self.real_count as f64 + new_weight) / (self.real_count as f64 + 1.0);
        self.real_count += 1;
        self.recompute_score();
    }

    /// Score is never set independently; it always derives from the weight
    /// and the two counts.
    pub fn recompute_score(&mut self) {
        self.score = self.weight
            * (self.real_count as f64 * weight::REAL + self.stem_count as f64 * weight::STEM);
    }
}

/// Read-only projection of a document plus its rank for one query. Produced
/// by the evaluator, persisted only through the search cache.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    pub id: u64,
    pub filename: String,
    pub doc_type: DocType,
    pub hash: String,
    pub date: i64,
    pub length: u64,
    pub rank: f64,
}

impl DocumentResult {
    pub fn from_document(doc: Document, rank: f64) -> Self {
        Self {
            id: doc.id,
            filename: doc.filename,
            doc_type: doc.doc_type,
            hash: doc.hash,
            date: doc.date,
            length: doc.length,
            rank,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_doc_type_from_extension() {
        assert_eq!(DocType::from_extension("html"), DocType::Html);
        assert_eq!(DocType::from_extension("HTM"), DocType::Html);
        assert_eq!(DocType::from_extension("txt"), DocType::Text);
        assert_eq!(DocType::from_extension(""), DocType::Text);
    }

    #[test]
    fn test_word_running_average_weight() {
        let mut word = Word::new(1, 1, 3.0);
        assert_eq!(word.real_count, 1);
        assert!((word.score - 3.0 * weight::REAL).abs() < 1e-9);

        // (3.0 * 1 + 1.0) / 2 = 2.0
        word.add_occurrence(1.0);
        assert_eq!(word.real_count, 2);
        assert!((word.weight - 2.0).abs() < 1e-9);
        assert!((word.score - 2.0 * (2.0 * weight::REAL)).abs() < 1e-9);
    }

    #[test]
    fn test_score_includes_stem_credit() {
        let mut word = Word::new(1, 1, 1.0);
        word.stem_count = 2;
        word.recompute_score();
        assert!((word.score - (1.0 * weight::REAL + 2.0 * weight::STEM)).abs() < 1e-9);
    }
}
