// Re-export main components
pub mod api;
pub mod config;
pub mod date;
pub mod engine;
pub mod extract;
pub mod indexer;
pub mod model;
pub mod query;
pub mod searcher;
pub mod stemmer;
pub mod storage;
pub mod tokenizer;

// Re-export commonly used types
pub use config::Config;
pub use engine::{Engine, EngineStats};
pub use indexer::{IndexReport, Indexer};
pub use model::{DocType, Document, DocumentResult, Term, Word};
pub use query::{ParseError, QueryNode};
pub use searcher::{SearchResponse, Searcher};
pub use stemmer::{Stem, StemmerKind};
pub use storage::Storage;
pub use tokenizer::Tokenizer;

// Re-export error types
pub use anyhow::{Error, Result};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_basic_workflow() -> Result<()> {
        let engine = Engine::in_memory(Config::default())?;

        let dir = TempDir::new()?;
        let mut file = File::create(dir.path().join("journal.txt"))?;
        write!(file, "les chevaux galopent dans la plaine")?;

        let report = engine.index_path(dir.path())?;
        assert_eq!(report.indexed, 1);

        // The exact surface form matches, same-stem credit included.
        let response = engine.search("chevaux")?;
        assert_eq!(response.results.len(), 1);
        assert!(response.results[0].rank > 0.0);

        Ok(())
    }
}
