use crate::model::DocumentResult;
use crate::query::{self, QueryNode};
use crate::storage::Storage;
use anyhow::Result;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Outcome of one search: the canonical form of the query, the ranked
/// matches and whether they came from the cache.
#[derive(Debug, Clone, Serialize)]
pub struct SearchResponse {
    pub query: String,
    pub results: Vec<DocumentResult>,
    pub from_cache: bool,
}

/// Evaluates query ASTs against the index, with a canonical-query cache in
/// front. Equivalent spellings of a query (`a b`, `a & b`, `a&b`) share one
/// cache entry.
pub struct Searcher<'a> {
    storage: &'a Storage,
}

impl<'a> Searcher<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        Self { storage }
    }

    pub fn search(&self, raw_query: &str) -> Result<SearchResponse> {
        let ast = query::parse(raw_query)?;
        let canonical = ast.to_string();

        if let Some(results) = self.storage.cached_search(&canonical)? {
            debug!("Cache hit for {canonical}");
            return Ok(SearchResponse {
                query: canonical,
                results,
                from_cache: true,
            });
        }

        let mut results = self.evaluate(&ast)?;
        results.sort_by(|a, b| b.rank.partial_cmp(&a.rank).unwrap_or(Ordering::Equal));
        self.storage.save_search(&canonical, &results)?;

        Ok(SearchResponse {
            query: canonical,
            results,
            from_cache: false,
        })
    }

    fn evaluate(&self, node: &QueryNode) -> Result<Vec<DocumentResult>> {
        match node {
            QueryNode::Term(term) => self.storage.documents_matching_term(term),
            // A phrase matches as one literal term.
            QueryNode::Phrase(content) => self.storage.documents_matching_term(content),
            QueryNode::Must(inner) | QueryNode::Not(inner) => self.evaluate(inner),
            QueryNode::And(left, right) => {
                Ok(intersect(self.evaluate(left)?, self.evaluate(right)?))
            }
            QueryNode::Or(left, right) => Ok(union(self.evaluate(left)?, self.evaluate(right)?)),
            QueryNode::Date(pred) => {
                // Matching documents at rank zero, so an AND with a date
                // clause filters without disturbing the other side's ranks.
                let mut results = Vec::new();
                for doc in self.storage.all_documents()? {
                    if pred.matches(doc.date) {
                        results.push(DocumentResult::from_document(doc, 0.0));
                    }
                }
                Ok(results)
            }
        }
    }
}

/// Documents present on both sides, identified by filename; ranks add up.
fn intersect(left: Vec<DocumentResult>, right: Vec<DocumentResult>) -> Vec<DocumentResult> {
    let right_ranks: HashMap<String, f64> = right
        .into_iter()
        .map(|result| (result.filename.clone(), result.rank))
        .collect();

    left.into_iter()
        .filter_map(|mut result| {
            right_ranks.get(&result.filename).map(|rank| {
                result.rank += rank;
                result
            })
        })
        .collect()
}

/// Documents present on either side; on a duplicate filename the first
/// occurrence keeps its rank.
fn union(left: Vec<DocumentResult>, right: Vec<DocumentResult>) -> Vec<DocumentResult> {
    let mut seen: HashSet<String> = HashSet::new();
    left.into_iter()
        .chain(right)
        .filter(|result| seen.insert(result.filename.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{DocType, Document, Word};

    /// One document per entry; each `(term, score)` becomes a posting.
    fn seed(storage: &Storage, docs: &[(&str, i64, &[(&str, f64)])]) {
        for (filename, date, terms) in docs {
            let mut doc = Document::new(filename.to_string(), DocType::Text, String::new(), *date);
            storage.upsert_document(&mut doc).unwrap();

            let mut words = Vec::new();
            for (term, score) in terms.iter() {
                let term = storage.insert_term(term, term).unwrap();
                let mut word = Word::new(doc.id, term.id, 1.0);
                word.score = *score;
                words.push(word);
            }
            storage.replace_postings(doc.id, &words).unwrap();
        }
    }

    fn filenames(response: &SearchResponse) -> Vec<&str> {
        response
            .results
            .iter()
            .map(|r| r.filename.as_str())
            .collect()
    }

    fn demo_storage() -> Storage {
        let storage = Storage::in_memory().unwrap();
        seed(
            &storage,
            &[
                ("a.txt", 1_000_000, &[("cat", 10.0)]),
                ("b.txt", 2_000_000, &[("dog", 20.0)]),
                ("c.txt", 3_000_000, &[("cat", 5.0), ("dog", 5.0)]),
            ],
        );
        storage
    }

    #[test]
    fn test_single_term_ranked() -> Result<()> {
        let storage = demo_storage();
        let response = Searcher::new(&storage).search("cat")?;
        assert_eq!(filenames(&response), vec!["a.txt", "c.txt"]);
        assert!(!response.from_cache);
        Ok(())
    }

    #[test]
    fn test_and_intersects() -> Result<()> {
        let storage = demo_storage();
        let searcher = Searcher::new(&storage);

        let response = searcher.search("cat & dog")?;
        assert_eq!(filenames(&response), vec!["c.txt"]);
        // Ranks add up across the intersection.
        assert!((response.results[0].rank - 10.0).abs() < 1e-9);

        Ok(())
    }

    #[test]
    fn test_or_unions_without_duplicates() -> Result<()> {
        let storage = demo_storage();
        let searcher = Searcher::new(&storage);

        let response = searcher.search("cat | dog")?;
        let mut names = filenames(&response);
        names.sort();
        assert_eq!(names, vec!["a.txt", "b.txt", "c.txt"]);

        let twice = searcher.search("cat | cat")?;
        assert_eq!(twice.results.len(), 2);

        Ok(())
    }

    #[test]
    fn test_response_serializes_to_json() -> Result<()> {
        let storage = demo_storage();
        let searcher = Searcher::new(&storage);

        let response = searcher.search("cat")?;
        let value = serde_json::to_value(&response)?;
        assert_eq!(value["query"], "cat");
        assert_eq!(value["from_cache"], false);
        assert_eq!(value["results"][0]["filename"], "a.txt");

        Ok(())
    }

    #[test]
    fn test_or_is_commutative_as_a_set() -> Result<()> {
        let storage = demo_storage();
        let searcher = Searcher::new(&storage);

        let mut ab = filenames(&searcher.search("cat | dog")?)
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        let mut ba = filenames(&searcher.search("dog | cat")?)
            .into_iter()
            .map(String::from)
            .collect::<Vec<_>>();
        ab.sort();
        ba.sort();
        assert_eq!(ab, ba);

        Ok(())
    }

    #[test]
    fn test_and_result_is_subset_of_operands() -> Result<()> {
        let storage = demo_storage();
        let searcher = Searcher::new(&storage);

        let both = searcher.search("cat & dog")?;
        let cat_only: Vec<String> = filenames(&searcher.search("cat")?)
            .into_iter()
            .map(String::from)
            .collect();
        for result in &both.results {
            assert!(cat_only.contains(&result.filename));
        }

        Ok(())
    }

    #[test]
    fn test_unary_operators_pass_through() -> Result<()> {
        let storage = demo_storage();
        let searcher = Searcher::new(&storage);

        assert_eq!(
            filenames(&searcher.search("-cat")?),
            filenames(&searcher.search("cat")?)
        );
        assert_eq!(
            filenames(&searcher.search("+dog")?),
            filenames(&searcher.search("dog")?)
        );

        Ok(())
    }

    #[test]
    fn test_date_clause_filters_an_and() -> Result<()> {
        let storage = demo_storage();
        let searcher = Searcher::new(&storage);

        // 2_000_000s is 24/1/1970; keep only documents before that day.
        let response = searcher.search("cat & :date(<24/1/1970)")?;
        assert_eq!(filenames(&response), vec!["a.txt"]);
        // The date side contributes rank zero.
        assert!((response.results[0].rank - 10.0).abs() < 1e-9);

        Ok(())
    }

    #[test]
    fn test_standalone_date_query() -> Result<()> {
        let storage = demo_storage();
        let response = Searcher::new(&storage).search(":date(>1/1/1970)")?;
        assert_eq!(response.results.len(), 3);
        assert!(response.results.iter().all(|r| r.rank == 0.0));
        Ok(())
    }

    #[test]
    fn test_unknown_term_yields_nothing() -> Result<()> {
        let storage = demo_storage();
        let response = Searcher::new(&storage).search("licorne")?;
        assert!(response.results.is_empty());
        Ok(())
    }

    #[test]
    fn test_cache_hits_on_equivalent_spellings() -> Result<()> {
        let storage = demo_storage();
        let searcher = Searcher::new(&storage);

        let first = searcher.search("cat & dog")?;
        assert!(!first.from_cache);

        let second = searcher.search("cat dog")?;
        assert!(second.from_cache);
        assert_eq!(second.query, first.query);
        assert_eq!(filenames(&second), filenames(&first));

        Ok(())
    }

    #[test]
    fn test_phrase_matches_literal_term() -> Result<()> {
        let storage = demo_storage();
        let response = Searcher::new(&storage).search("\"cat\"")?;
        assert_eq!(filenames(&response), vec!["a.txt", "c.txt"]);
        Ok(())
    }

    #[test]
    fn test_invalid_query_is_an_error() {
        let storage = demo_storage();
        assert!(Searcher::new(&storage).search("cat &").is_err());
    }
}
