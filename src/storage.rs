use crate::model::{Document, DocumentResult, Term, Word};
use anyhow::{Context, Result};
use sled::Db;
use std::cmp::Ordering;
use std::path::Path;

const DOCS_TREE: &str = "documents";
const DOC_NAMES_TREE: &str = "doc_names";
const TERMS_TREE: &str = "terms";
const TERM_NAMES_TREE: &str = "term_names";
const WORDS_TREE: &str = "words";
const TERM_WORDS_TREE: &str = "term_words";
const SEARCHES_TREE: &str = "searches";
const META_TREE: &str = "meta";

const NEXT_DOCUMENT_ID: &str = "next_document_id";
const NEXT_TERM_ID: &str = "next_term_id";
const ALLOW_PATTERNS: &str = "allow_patterns";
const DENY_PATTERNS: &str = "deny_patterns";

/// Extensions indexed out of the box; everything else needs an explicit
/// allow pattern.
const DEFAULT_ALLOW: &[&str] = &[r".*\.txt$", r".*\.htm$", r".*\.html$"];
const DEFAULT_DENY: &[&str] = &[r".*\.php$"];

fn be(id: u64) -> [u8; 8] {
    id.to_be_bytes()
}

/// Composite key for the postings tree: document id then term id, both
/// big-endian so prefix scans walk one document's postings in term order.
fn word_key(document_id: u64, term_id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&be(document_id));
    key[8..].copy_from_slice(&be(term_id));
    key
}

/// Mirror key for the term-first secondary index.
fn term_word_key(term_id: u64, document_id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&be(term_id));
    key[8..].copy_from_slice(&be(document_id));
    key
}

pub struct Storage {
    db: Db,
}

impl Storage {
    /// Open or create the index database.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(path).context("Failed to open database")?;
        let storage = Self { db };
        storage.seed_patterns()?;
        Ok(storage)
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open().context("Failed to create in-memory database")?;
        let storage = Self { db };
        storage.seed_patterns()?;
        Ok(storage)
    }

    fn seed_patterns(&self) -> Result<()> {
        let tree = self.db.open_tree(META_TREE)?;
        if tree.get(ALLOW_PATTERNS.as_bytes())?.is_none() {
            let allow: Vec<String> = DEFAULT_ALLOW.iter().map(|s| s.to_string()).collect();
            tree.insert(ALLOW_PATTERNS.as_bytes(), bincode::serialize(&allow)?)?;
        }
        if tree.get(DENY_PATTERNS.as_bytes())?.is_none() {
            let deny: Vec<String> = DEFAULT_DENY.iter().map(|s| s.to_string()).collect();
            tree.insert(DENY_PATTERNS.as_bytes(), bincode::serialize(&deny)?)?;
        }
        Ok(())
    }

    /// Next value of a monotonic id counter. Ids start at 1; 0 marks an
    /// unpersisted record.
    fn next_id(&self, counter: &str) -> Result<u64> {
        let tree = self.db.open_tree(META_TREE)?;
        let next = match tree.get(counter.as_bytes())? {
            Some(data) => {
                u64::from_be_bytes(data.as_ref().try_into().context("Corrupt id counter")?)
            }
            None => 1,
        };
        tree.insert(counter.as_bytes(), be(next + 1).to_vec())?;
        Ok(next)
    }

    // ========== Document Operations ==========

    /// Save a document, assigning an id if it has none yet. Both the primary
    /// tree and the filename index are updated.
    pub fn upsert_document(&self, doc: &mut Document) -> Result<()> {
        if !doc.is_persisted() {
            doc.id = self.next_id(NEXT_DOCUMENT_ID)?;
        }
        let tree = self.db.open_tree(DOCS_TREE)?;
        tree.insert(&be(doc.id), bincode::serialize(doc)?)?;
        let names = self.db.open_tree(DOC_NAMES_TREE)?;
        names.insert(doc.filename.as_bytes(), be(doc.id).to_vec())?;
        Ok(())
    }

    pub fn document_by_id(&self, id: u64) -> Result<Option<Document>> {
        let tree = self.db.open_tree(DOCS_TREE)?;
        if let Some(data) = tree.get(be(id))? {
            let doc: Document = bincode::deserialize(&data)?;
            Ok(Some(doc))
        } else {
            Ok(None)
        }
    }

    pub fn document_by_filename(&self, filename: &str) -> Result<Option<Document>> {
        let names = self.db.open_tree(DOC_NAMES_TREE)?;
        match names.get(filename.as_bytes())? {
            Some(data) => {
                let id = u64::from_be_bytes(
                    data.as_ref()
                        .try_into()
                        .context("Corrupt document name index")?,
                );
                self.document_by_id(id)
            }
            None => Ok(None),
        }
    }

    /// Delete a document together with all its postings.
    pub fn delete_document(&self, doc: &Document) -> Result<()> {
        self.delete_postings(doc.id)?;
        let tree = self.db.open_tree(DOCS_TREE)?;
        tree.remove(be(doc.id))?;
        let names = self.db.open_tree(DOC_NAMES_TREE)?;
        names.remove(doc.filename.as_bytes())?;
        Ok(())
    }

    pub fn all_documents(&self) -> Result<Vec<Document>> {
        let tree = self.db.open_tree(DOCS_TREE)?;
        let mut docs = Vec::new();

        for item in tree.iter() {
            let (_, value) = item?;
            let doc: Document = bincode::deserialize(&value)?;
            docs.push(doc);
        }

        Ok(docs)
    }

    pub fn count_documents(&self) -> Result<usize> {
        let tree = self.db.open_tree(DOCS_TREE)?;
        Ok(tree.len())
    }

    // ========== Term Operations ==========

    /// Insert a term, or return the existing record when the surface form is
    /// already known. `real_term` is unique.
    pub fn insert_term(&self, real_term: &str, stem_term: &str) -> Result<Term> {
        if let Some(existing) = self.term_by_name(real_term)? {
            return Ok(existing);
        }
        let term = Term {
            id: self.next_id(NEXT_TERM_ID)?,
            real_term: real_term.to_string(),
            stem_term: stem_term.to_string(),
        };
        let tree = self.db.open_tree(TERMS_TREE)?;
        tree.insert(&be(term.id), bincode::serialize(&term)?)?;
        let names = self.db.open_tree(TERM_NAMES_TREE)?;
        names.insert(real_term.as_bytes(), be(term.id).to_vec())?;
        Ok(term)
    }

    pub fn term_by_id(&self, id: u64) -> Result<Option<Term>> {
        let tree = self.db.open_tree(TERMS_TREE)?;
        if let Some(data) = tree.get(be(id))? {
            let term: Term = bincode::deserialize(&data)?;
            Ok(Some(term))
        } else {
            Ok(None)
        }
    }

    pub fn term_by_name(&self, real_term: &str) -> Result<Option<Term>> {
        let names = self.db.open_tree(TERM_NAMES_TREE)?;
        match names.get(real_term.as_bytes())? {
            Some(data) => {
                let id = u64::from_be_bytes(
                    data.as_ref()
                        .try_into()
                        .context("Corrupt term name index")?,
                );
                self.term_by_id(id)
            }
            None => Ok(None),
        }
    }

    pub fn count_terms(&self) -> Result<usize> {
        let tree = self.db.open_tree(TERMS_TREE)?;
        Ok(tree.len())
    }

    // ========== Posting Operations ==========

    /// Replace every posting of a document in one batch per tree.
    pub fn replace_postings(&self, document_id: u64, words: &[Word]) -> Result<()> {
        self.delete_postings(document_id)?;

        let words_tree = self.db.open_tree(WORDS_TREE)?;
        let term_words_tree = self.db.open_tree(TERM_WORDS_TREE)?;
        let mut word_batch = sled::Batch::default();
        let mut mirror_batch = sled::Batch::default();

        for word in words {
            let serialized = bincode::serialize(word)?;
            word_batch.insert(word_key(document_id, word.term_id).to_vec(), serialized);
            mirror_batch.insert(term_word_key(word.term_id, document_id).to_vec(), Vec::new());
        }

        words_tree.apply_batch(word_batch)?;
        term_words_tree.apply_batch(mirror_batch)?;
        Ok(())
    }

    /// Remove every posting of a document, keeping the document row itself.
    pub fn delete_postings(&self, document_id: u64) -> Result<()> {
        let words_tree = self.db.open_tree(WORDS_TREE)?;
        let term_words_tree = self.db.open_tree(TERM_WORDS_TREE)?;
        let mut word_batch = sled::Batch::default();
        let mut mirror_batch = sled::Batch::default();

        for item in words_tree.scan_prefix(be(document_id)) {
            let (key, value) = item?;
            let word: Word = bincode::deserialize(&value)?;
            word_batch.remove(key);
            mirror_batch.remove(term_word_key(word.term_id, document_id).to_vec());
        }

        words_tree.apply_batch(word_batch)?;
        term_words_tree.apply_batch(mirror_batch)?;
        Ok(())
    }

    pub fn postings_for_document(&self, document_id: u64) -> Result<Vec<Word>> {
        let tree = self.db.open_tree(WORDS_TREE)?;
        let mut words = Vec::new();

        for item in tree.scan_prefix(be(document_id)) {
            let (_, value) = item?;
            let word: Word = bincode::deserialize(&value)?;
            words.push(word);
        }

        Ok(words)
    }

    /// All postings of one term, resolved through the term-first index.
    pub fn postings_for_term(&self, term_id: u64) -> Result<Vec<Word>> {
        let mirror = self.db.open_tree(TERM_WORDS_TREE)?;
        let words_tree = self.db.open_tree(WORDS_TREE)?;
        let mut words = Vec::new();

        for item in mirror.scan_prefix(be(term_id)) {
            let (key, _) = item?;
            let document_id = u64::from_be_bytes(
                key[8..16].try_into().context("Corrupt term word index")?,
            );
            if let Some(data) = words_tree.get(word_key(document_id, term_id))? {
                let word: Word = bincode::deserialize(&data)?;
                words.push(word);
            }
        }

        Ok(words)
    }

    /// The document/word/term join behind a term leaf of a query: every
    /// document containing the exact surface form, ranked by posting score,
    /// best first.
    pub fn documents_matching_term(&self, real_term: &str) -> Result<Vec<DocumentResult>> {
        let Some(term) = self.term_by_name(real_term)? else {
            return Ok(Vec::new());
        };

        let mut results = Vec::new();
        for word in self.postings_for_term(term.id)? {
            if let Some(doc) = self.document_by_id(word.document_id)? {
                results.push(DocumentResult::from_document(doc, word.score));
            }
        }

        results.sort_by(|a, b| b.rank.partial_cmp(&a.rank).unwrap_or(Ordering::Equal));
        Ok(results)
    }

    // ========== Search Cache Operations ==========

    /// Cached results for a canonical query string, if present.
    pub fn cached_search(&self, query: &str) -> Result<Option<Vec<DocumentResult>>> {
        let tree = self.db.open_tree(SEARCHES_TREE)?;
        if let Some(data) = tree.get(query.as_bytes())? {
            let results: Vec<DocumentResult> = bincode::deserialize(&data)?;
            Ok(Some(results))
        } else {
            Ok(None)
        }
    }

    pub fn save_search(&self, query: &str, results: &[DocumentResult]) -> Result<()> {
        let tree = self.db.open_tree(SEARCHES_TREE)?;
        tree.insert(query.as_bytes(), bincode::serialize(&results.to_vec())?)?;
        Ok(())
    }

    pub fn count_searches(&self) -> Result<usize> {
        let tree = self.db.open_tree(SEARCHES_TREE)?;
        Ok(tree.len())
    }

    /// Drop every cached search. Called whenever the index is about to
    /// change, since any cached ranking may become stale.
    pub fn clear_search_cache(&self) -> Result<()> {
        self.db.drop_tree(SEARCHES_TREE)?;
        Ok(())
    }

    // ========== Pattern Operations ==========

    pub fn allow_patterns(&self) -> Result<Vec<String>> {
        self.patterns(ALLOW_PATTERNS)
    }

    pub fn deny_patterns(&self) -> Result<Vec<String>> {
        self.patterns(DENY_PATTERNS)
    }

    fn patterns(&self, key: &str) -> Result<Vec<String>> {
        let tree = self.db.open_tree(META_TREE)?;
        match tree.get(key.as_bytes())? {
            Some(data) => Ok(bincode::deserialize(&data)?),
            None => Ok(Vec::new()),
        }
    }

    pub fn set_allow_patterns(&self, patterns: &[String]) -> Result<()> {
        self.set_patterns(ALLOW_PATTERNS, patterns)
    }

    pub fn set_deny_patterns(&self, patterns: &[String]) -> Result<()> {
        self.set_patterns(DENY_PATTERNS, patterns)
    }

    fn set_patterns(&self, key: &str, patterns: &[String]) -> Result<()> {
        let tree = self.db.open_tree(META_TREE)?;
        tree.insert(key.as_bytes(), bincode::serialize(&patterns.to_vec())?)?;
        Ok(())
    }

    /// Flush all changes to disk.
    pub fn flush(&self) -> Result<()> {
        self.db.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::DocType;

    fn sample_document(filename: &str) -> Document {
        Document::new(filename.to_string(), DocType::Text, "abc".to_string(), 0)
    }

    #[test]
    fn test_document_round_trip() -> Result<()> {
        let storage = Storage::in_memory()?;
        let mut doc = sample_document("/tmp/a.txt");

        storage.upsert_document(&mut doc)?;
        assert_eq!(doc.id, 1);

        let by_name = storage.document_by_filename("/tmp/a.txt")?;
        assert_eq!(by_name.map(|d| d.id), Some(1));

        Ok(())
    }

    #[test]
    fn test_ids_are_monotonic() -> Result<()> {
        let storage = Storage::in_memory()?;
        let mut a = sample_document("/tmp/a.txt");
        let mut b = sample_document("/tmp/b.txt");

        storage.upsert_document(&mut a)?;
        storage.upsert_document(&mut b)?;
        assert_eq!((a.id, b.id), (1, 2));

        // Re-saving keeps the id.
        storage.upsert_document(&mut a)?;
        assert_eq!(a.id, 1);
        assert_eq!(storage.count_documents()?, 2);

        Ok(())
    }

    #[test]
    fn test_insert_term_is_idempotent() -> Result<()> {
        let storage = Storage::in_memory()?;

        let first = storage.insert_term("chevaux", "cheval")?;
        let second = storage.insert_term("chevaux", "cheval")?;
        assert_eq!(first.id, second.id);
        assert_eq!(storage.count_terms()?, 1);

        Ok(())
    }

    #[test]
    fn test_postings_and_term_join() -> Result<()> {
        let storage = Storage::in_memory()?;
        let mut doc_a = sample_document("/tmp/a.txt");
        let mut doc_b = sample_document("/tmp/b.txt");
        storage.upsert_document(&mut doc_a)?;
        storage.upsert_document(&mut doc_b)?;
        let term = storage.insert_term("chat", "chat")?;

        let mut word_a = Word::new(doc_a.id, term.id, 1.0);
        word_a.score = 2.0;
        let mut word_b = Word::new(doc_b.id, term.id, 1.0);
        word_b.score = 5.0;
        storage.replace_postings(doc_a.id, &[word_a])?;
        storage.replace_postings(doc_b.id, &[word_b])?;

        let results = storage.documents_matching_term("chat")?;
        assert_eq!(results.len(), 2);
        // Best score first.
        assert_eq!(results[0].filename, "/tmp/b.txt");
        assert!(results[0].rank > results[1].rank);

        assert!(storage.documents_matching_term("chien")?.is_empty());

        Ok(())
    }

    #[test]
    fn test_delete_postings_keeps_document() -> Result<()> {
        let storage = Storage::in_memory()?;
        let mut doc = sample_document("/tmp/a.txt");
        storage.upsert_document(&mut doc)?;
        let term = storage.insert_term("chat", "chat")?;
        storage.replace_postings(doc.id, &[Word::new(doc.id, term.id, 1.0)])?;

        storage.delete_postings(doc.id)?;
        assert!(storage.postings_for_document(doc.id)?.is_empty());
        assert!(storage.postings_for_term(term.id)?.is_empty());
        assert!(storage.document_by_id(doc.id)?.is_some());

        Ok(())
    }

    #[test]
    fn test_delete_document_removes_everything() -> Result<()> {
        let storage = Storage::in_memory()?;
        let mut doc = sample_document("/tmp/a.txt");
        storage.upsert_document(&mut doc)?;
        let term = storage.insert_term("chat", "chat")?;
        storage.replace_postings(doc.id, &[Word::new(doc.id, term.id, 1.0)])?;

        storage.delete_document(&doc)?;
        assert!(storage.document_by_filename("/tmp/a.txt")?.is_none());
        assert!(storage.postings_for_term(term.id)?.is_empty());

        Ok(())
    }

    #[test]
    fn test_search_cache() -> Result<()> {
        let storage = Storage::in_memory()?;
        let results = vec![DocumentResult::from_document(
            sample_document("/tmp/a.txt"),
            42.0,
        )];

        assert!(storage.cached_search("(a & b)")?.is_none());
        storage.save_search("(a & b)", &results)?;
        let cached = storage.cached_search("(a & b)")?.unwrap();
        assert_eq!(cached.len(), 1);
        assert_eq!(cached[0].rank, 42.0);

        storage.clear_search_cache()?;
        assert!(storage.cached_search("(a & b)")?.is_none());

        Ok(())
    }

    #[test]
    fn test_default_patterns_seeded() -> Result<()> {
        let storage = Storage::in_memory()?;
        let allow = storage.allow_patterns()?;
        assert!(allow.iter().any(|p| p.contains("txt")));
        assert!(allow.iter().any(|p| p.contains("html")));
        let deny = storage.deny_patterns()?;
        assert!(deny.iter().any(|p| p.contains("php")));
        Ok(())
    }
}
