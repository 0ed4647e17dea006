use crate::extract::extract_terms;
use crate::model::{DocType, Document, Word};
use crate::stemmer::Stem;
use crate::storage::Storage;
use crate::tokenizer::Tokenizer;
use anyhow::{Context, Result};
use regex::Regex;
use sha1::{Digest, Sha1};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::time::UNIX_EPOCH;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Counters for one indexing run.
#[derive(Debug, Default, Clone, Copy)]
pub struct IndexReport {
    /// Files extracted and committed.
    pub indexed: usize,
    /// Files whose content hash was unchanged.
    pub skipped: usize,
    /// Documents pruned because their file vanished or stopped matching.
    pub deleted: usize,
    /// Files that could not be read or committed.
    pub failed: usize,
}

enum Outcome {
    Indexed,
    Skipped,
}

/// Walks a file tree and keeps the index in sync with it.
pub struct Indexer<'a> {
    storage: &'a Storage,
    tokenizer: Tokenizer,
    stemmer: Box<dyn Stem>,
    allow: Vec<Regex>,
    deny: Vec<Regex>,
}

impl<'a> Indexer<'a> {
    /// Build an indexer; the allow and deny lists are compiled once from
    /// storage for the whole run.
    pub fn new(storage: &'a Storage, tokenizer: Tokenizer, stemmer: Box<dyn Stem>) -> Result<Self> {
        let allow = compile_patterns(&storage.allow_patterns()?)?;
        let deny = compile_patterns(&storage.deny_patterns()?)?;
        Ok(Self {
            storage,
            tokenizer,
            stemmer,
            allow,
            deny,
        })
    }

    /// Index every accepted file under `root`, then prune documents whose
    /// file disappeared. The search cache is dropped first since rankings
    /// are about to change.
    pub fn index_directory<P: AsRef<Path>>(&self, root: P) -> Result<IndexReport> {
        let root = root.as_ref();
        let mut report = IndexReport::default();

        self.storage.clear_search_cache()?;

        for entry in WalkDir::new(root)
            .into_iter()
            .filter_entry(|e| !is_hidden(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!("Skipping unreadable entry: {err}");
                    report.failed += 1;
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                if !entry.file_type().is_dir() {
                    warn!("Ignoring non-regular entry {}", entry.path().display());
                }
                continue;
            }

            let filename = entry.path().to_string_lossy().to_string();
            if !self.accepts(&filename) {
                continue;
            }

            match self.process_file(entry.path(), &filename) {
                Ok(Outcome::Indexed) => report.indexed += 1,
                Ok(Outcome::Skipped) => report.skipped += 1,
                Err(err) => {
                    warn!("Failed to index {filename}: {err:#}");
                    report.failed += 1;
                }
            }
        }

        report.deleted = self.prune(root)?;
        self.storage.flush()?;
        Ok(report)
    }

    /// Does the filename pass the allow list without hitting the deny list?
    fn accepts(&self, filename: &str) -> bool {
        self.allow.iter().any(|re| re.is_match(filename))
            && !self.deny.iter().any(|re| re.is_match(filename))
    }

    fn process_file(&self, path: &Path, filename: &str) -> Result<Outcome> {
        let bytes = fs::read(path).with_context(|| format!("Failed to read {filename}"))?;
        let content = String::from_utf8_lossy(&bytes);

        let mut hasher = Sha1::new();
        hasher.update(&bytes);
        let hash = format!("{:x}", hasher.finalize());

        let existing = self.storage.document_by_filename(filename)?;
        let mut doc = match existing {
            Some(existing) if existing.hash == hash => {
                debug!("Unchanged, skipping {filename}");
                return Ok(Outcome::Skipped);
            }
            Some(existing) => {
                // Content changed: stale postings go, the row is reused. The
                // row keeps its old hash until the new postings are written,
                // so an interrupted run is re-indexed instead of skipped.
                self.storage.delete_postings(existing.id)?;
                existing
            }
            None => Document::new(filename.to_string(), DocType::Text, String::new(), 0),
        };

        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default();
        doc.doc_type = DocType::from_extension(ext);
        doc.date = file_mtime(path)?;
        self.storage.upsert_document(&mut doc)?;

        let terms = extract_terms(&content, doc.doc_type, &self.tokenizer);
        let length = self.commit_terms(&mut doc, &terms, hash)?;
        debug!("Indexed {filename} ({length} terms)");
        Ok(Outcome::Indexed)
    }

    /// Accumulate postings for one document, reconcile stem-sharing counts,
    /// normalize scores by document length and persist the result.
    fn commit_terms(&self, doc: &mut Document, terms: &[(String, f64)], hash: String) -> Result<u64> {
        let mut postings: HashMap<u64, Word> = HashMap::new();
        let mut term_ids: HashMap<String, u64> = HashMap::new();
        let mut stem_groups: HashMap<String, Vec<u64>> = HashMap::new();

        for (token, token_weight) in terms {
            let lowered = token.to_lowercase();
            let term_id = match term_ids.get(&lowered) {
                Some(id) => *id,
                None => {
                    let stem = self.stemmer.stem(&lowered);
                    let term = self.storage.insert_term(&lowered, &stem)?;
                    term_ids.insert(lowered.clone(), term.id);
                    let group = stem_groups.entry(term.stem_term).or_default();
                    if !group.contains(&term.id) {
                        group.push(term.id);
                    }
                    term.id
                }
            };

            postings
                .entry(term_id)
                .and_modify(|word| word.add_occurrence(*token_weight))
                .or_insert_with(|| Word::new(doc.id, term_id, *token_weight));
        }

        // A term earns stem credit from the occurrences of the *other*
        // same-stem terms of this document.
        for group in stem_groups.values() {
            let total: u64 = group
                .iter()
                .filter_map(|id| postings.get(id))
                .map(|word| word.real_count)
                .sum();
            for id in group {
                if let Some(word) = postings.get_mut(id) {
                    word.stem_count = total - word.real_count;
                    word.recompute_score();
                }
            }
        }

        let length: u64 = postings.values().map(|word| word.real_count).sum();
        let mut words: Vec<Word> = postings.into_values().collect();
        if length > 0 {
            for word in &mut words {
                word.score = 100.0 * word.score / length as f64;
            }
        }

        self.storage.replace_postings(doc.id, &words)?;

        // The hash goes in last; it marks the document fully committed.
        doc.length = length;
        doc.hash = hash;
        self.storage.upsert_document(doc)?;
        Ok(length)
    }

    /// Remove documents under `root` whose file vanished or no longer
    /// passes the filters.
    fn prune(&self, root: &Path) -> Result<usize> {
        let mut deleted = 0;

        for doc in self.storage.all_documents()? {
            // Component-wise match; `/data/docs-old` is not under `/data/docs`.
            if !Path::new(&doc.filename).starts_with(root) {
                continue;
            }
            if Path::new(&doc.filename).is_file() && self.accepts(&doc.filename) {
                continue;
            }
            debug!("Pruning {}", doc.filename);
            self.storage.delete_document(&doc)?;
            deleted += 1;
        }

        Ok(deleted)
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| Regex::new(p).with_context(|| format!("Invalid filename pattern {p:?}")))
        .collect()
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with('.'))
}

fn file_mtime(path: &Path) -> Result<i64> {
    let metadata = fs::metadata(path)
        .with_context(|| format!("Failed to stat {}", path.display()))?;
    let modified = metadata
        .modified()
        .context("Filesystem does not report modification times")?;
    Ok(match modified.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => elapsed.as_secs() as i64,
        Err(before_epoch) => -(before_epoch.duration().as_secs() as i64),
    })
}
