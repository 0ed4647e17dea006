use crate::config::Config;
use crate::indexer::{IndexReport, Indexer};
use crate::searcher::{SearchResponse, Searcher};
use crate::storage::Storage;
use crate::tokenizer::Tokenizer;
use anyhow::Result;
use serde::Serialize;
use std::path::Path;

/// Index-wide counters, mostly for the stats endpoint.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct EngineStats {
    pub documents: usize,
    pub terms: usize,
    pub cached_searches: usize,
}

/// Main entry point tying storage, indexing and search together. One engine
/// owns one database; it is cheap to share behind an `Arc`.
pub struct Engine {
    storage: Storage,
    config: Config,
}

impl Engine {
    /// Open the engine over the database named in the configuration.
    pub fn open(config: Config) -> Result<Self> {
        let storage = Storage::open(&config.database_path)?;
        Ok(Self { storage, config })
    }

    /// In-memory engine (for testing).
    pub fn in_memory(config: Config) -> Result<Self> {
        let storage = Storage::in_memory()?;
        Ok(Self { storage, config })
    }

    fn tokenizer(&self) -> Result<Tokenizer> {
        match &self.config.stopwords_file {
            Some(path) => Tokenizer::with_stopwords_file(path),
            None => Ok(Tokenizer::new()),
        }
    }

    /// Crawl a file tree and bring the index up to date with it.
    pub fn index_path<P: AsRef<Path>>(&self, path: P) -> Result<IndexReport> {
        let indexer = Indexer::new(
            &self.storage,
            self.tokenizer()?,
            self.config.stemmer.create(),
        )?;
        indexer.index_directory(path)
    }

    /// Parse, evaluate and cache a query.
    pub fn search(&self, query: &str) -> Result<SearchResponse> {
        Searcher::new(&self.storage).search(query)
    }

    pub fn stats(&self) -> Result<EngineStats> {
        Ok(EngineStats {
            documents: self.storage.count_documents()?,
            terms: self.storage.count_terms()?,
            cached_searches: self.storage.count_searches()?,
        })
    }

    pub fn flush(&self) -> Result<()> {
        self.storage.flush()
    }
}
