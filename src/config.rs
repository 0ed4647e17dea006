use crate::stemmer::StemmerKind;
use std::path::PathBuf;

/// Runtime settings shared by the CLI and the HTTP server. Everything is
/// explicit; there is no global state to configure.
#[derive(Debug, Clone)]
pub struct Config {
    /// Location of the index database.
    pub database_path: PathBuf,
    /// Which stemming algorithm new terms go through.
    pub stemmer: StemmerKind,
    /// Optional stopwords file overriding the built-in list.
    pub stopwords_file: Option<PathBuf>,
    pub verbose: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from("index.db"),
            stemmer: StemmerKind::French,
            stopwords_file: None,
            verbose: false,
        }
    }
}
