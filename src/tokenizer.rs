use anyhow::{Context, Result};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use unicode_segmentation::UnicodeSegmentation;

lazy_static::lazy_static! {
    /// Built-in French stopword list, used when no stopwords file is
    /// configured.
    static ref STOPWORDS: HashSet<&'static str> = {
        [
            "au", "aux", "avec", "ce", "ces", "cet", "cette", "dans", "de",
            "des", "du", "elle", "elles", "en", "et", "eux", "il", "ils",
            "je", "la", "le", "les", "leur", "leurs", "lui", "ma", "mais",
            "me", "mes", "moi", "mon", "ne", "nos", "notre", "nous", "on",
            "ou", "où", "par", "pas", "pour", "qu", "que", "qui", "sa",
            "se", "ses", "son", "sur", "ta", "te", "tes", "toi", "ton",
            "tu", "un", "une", "vos", "votre", "vous", "c", "d", "j", "l",
            "m", "n", "s", "t", "y", "à", "été", "étée", "étées", "étés",
            "étant", "suis", "es", "est", "sommes", "êtes", "sont", "serai",
            "sera", "seront", "serait", "étais", "était", "étions", "étiez",
            "étaient", "fus", "fut", "soit", "soient", "ai", "as", "avons",
            "avez", "ont", "aura", "auront", "aurait", "avais", "avait",
            "avions", "aviez", "avaient", "eut", "ayant",
        ]
        .iter()
        .copied()
        .collect()
    };
}

/// Splits text into candidate terms and filters out the noise before
/// anything reaches the index.
pub struct Tokenizer {
    /// Loaded from a stopwords file; when `None` the built-in list applies.
    stopwords: Option<HashSet<String>>,
}

impl Tokenizer {
    pub fn new() -> Self {
        Self { stopwords: None }
    }

    /// Load stopwords from a file, one word per line. Blank lines and lines
    /// starting with `#` are skipped.
    pub fn with_stopwords_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("Failed to read stopwords file {}", path.as_ref().display())
        })?;
        let stopwords = content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| line.to_lowercase())
            .collect();
        Ok(Self {
            stopwords: Some(stopwords),
        })
    }

    /// Split on Unicode word boundaries and keep only indexable tokens.
    /// Tokens keep their original spelling and case.
    pub fn tokenize<'a>(&self, text: &'a str) -> Vec<&'a str> {
        text.unicode_words()
            .filter(|token| self.is_indexable(token))
            .collect()
    }

    fn is_indexable(&self, token: &str) -> bool {
        if token.chars().count() <= 1 {
            return false;
        }
        if token.chars().next().is_some_and(|c| !c.is_alphanumeric()) {
            return false;
        }
        !self.is_stopword(&token.to_lowercase())
    }

    fn is_stopword(&self, lowered: &str) -> bool {
        match &self.stopwords {
            Some(custom) => custom.contains(lowered),
            None => STOPWORDS.contains(lowered),
        }
    }
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_tokenize_splits_on_word_boundaries() {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("Bonjour, monde! Voici l'index.");
        assert!(tokens.contains(&"Bonjour"));
        assert!(tokens.contains(&"monde"));
        assert!(tokens.contains(&"index"));
    }

    #[test]
    fn test_short_tokens_dropped() {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("a b chat");
        assert_eq!(tokens, vec!["chat"]);
    }

    #[test]
    fn test_stopwords_filtered_case_insensitively() {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("Les chats et LES chiens");
        assert_eq!(tokens, vec!["chats", "chiens"]);
    }

    #[test]
    fn test_case_preserved_for_kept_tokens() {
        let tokenizer = Tokenizer::new();
        assert_eq!(tokenizer.tokenize("Paris"), vec!["Paris"]);
    }

    #[test]
    fn test_custom_stopwords_file() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        writeln!(file, "# comment")?;
        writeln!(file, "chat")?;

        let tokenizer = Tokenizer::with_stopwords_file(file.path())?;
        let tokens = tokenizer.tokenize("le chat dort");
        // Only the custom list applies, so "le" passes through.
        assert_eq!(tokens, vec!["le", "dort"]);

        Ok(())
    }

    #[test]
    fn test_accented_words_survive() {
        let tokenizer = Tokenizer::new();
        let tokens = tokenizer.tokenize("général élève");
        assert_eq!(tokens, vec!["général", "élève"]);
    }
}
