//! Content extraction: turns a file's raw text into weighted tokens.
//!
//! Plain text yields every token at the default weight. HTML is harvested
//! section by section (title, headings, meta keywords and description) so
//! that tokens from prominent positions carry a higher weight, then the
//! remaining markup is stripped and the residue indexed at the default
//! weight.

use crate::model::{weight, DocType};
use crate::tokenizer::Tokenizer;
use regex::Regex;

lazy_static::lazy_static! {
    static ref COMMENT_RE: Regex = Regex::new(r"(?s)<!--.*?-->").unwrap();
    static ref SCRIPT_RE: Regex =
        Regex::new(r"(?is)<\s*script[^>]*>.*?<\s*/\s*script\s*>").unwrap();
    static ref TITLE_RE: Regex =
        Regex::new(r"(?is)<\s*title[^>]*>\s*([^<]*?)\s*<\s*/\s*title\s*>").unwrap();
    static ref HEADING_RE: Regex =
        Regex::new(r"(?is)<\s*h[1-6][^>]*>\s*([^<]*?)\s*<\s*/\s*h[1-6]\s*>").unwrap();
    static ref KEYWORDS_RE: Regex = Regex::new(
        r#"(?is)<\s*meta\s+name\s*=\s*"keywords"\s+content\s*=\s*"([^"]*)"[^>]*>"#
    )
    .unwrap();
    static ref DESCRIPTION_RE: Regex = Regex::new(
        r#"(?is)<\s*meta\s+name\s*=\s*"description"\s+content\s*=\s*"([^"]*)"[^>]*>"#
    )
    .unwrap();
    static ref IMG_ALT_RE: Regex =
        Regex::new(r#"(?is)<\s*img[^>]*\balt\s*=\s*"([^"]*)"[^>]*>"#).unwrap();
    static ref TAG_RE: Regex = Regex::new(r"<[^>]*>").unwrap();

    /// Named entities common in French text, applied in order; the last
    /// pattern wipes anything still entity-shaped.
    static ref ENTITIES: Vec<(Regex, &'static str)> = vec![
        (Regex::new(r"(?i)&quot;").unwrap(), "\""),
        (Regex::new(r"(?i)&amp;").unwrap(), "&"),
        (Regex::new(r"(?i)&oelig;").unwrap(), "oe"),
        (Regex::new(r"(?i)&aelig;").unwrap(), "ae"),
        (Regex::new(r"(?i)&agrave;").unwrap(), "à"),
        (Regex::new(r"(?i)&acirc;").unwrap(), "â"),
        (Regex::new(r"(?i)&ccedil;").unwrap(), "ç"),
        (Regex::new(r"(?i)&egrave;").unwrap(), "è"),
        (Regex::new(r"(?i)&eacute;").unwrap(), "é"),
        (Regex::new(r"(?i)&ecirc;").unwrap(), "ê"),
        (Regex::new(r"(?i)&euml;").unwrap(), "ë"),
        (Regex::new(r"(?i)&icirc;").unwrap(), "î"),
        (Regex::new(r"(?i)&iuml;").unwrap(), "ï"),
        (Regex::new(r"(?i)&ocirc;").unwrap(), "ô"),
        (Regex::new(r"(?i)&ugrave;").unwrap(), "ù"),
        (Regex::new(r"(?i)&ucirc;").unwrap(), "û"),
        (Regex::new(r"(?i)&nbsp;").unwrap(), " "),
        (Regex::new(r"&[^&;]*;").unwrap(), ""),
    ];
}

/// Tokenize a file's content into `(token, weight)` pairs in occurrence
/// order. Tokens keep their surface spelling; weighting and lowercasing are
/// the caller's concern.
pub fn extract_terms(
    content: &str,
    doc_type: DocType,
    tokenizer: &Tokenizer,
) -> Vec<(String, f64)> {
    match doc_type {
        DocType::Text => tokenizer
            .tokenize(content)
            .into_iter()
            .map(|t| (t.to_string(), weight::DEFAULT))
            .collect(),
        DocType::Html => extract_html(content, tokenizer),
    }
}

fn extract_html(content: &str, tokenizer: &Tokenizer) -> Vec<(String, f64)> {
    let mut text = COMMENT_RE.replace_all(content, "").into_owned();
    text = SCRIPT_RE.replace_all(&text, "").into_owned();

    let mut terms = Vec::new();

    let title = harvest(&mut text, &TITLE_RE);
    push_tokens(&mut terms, tokenizer, &title, weight::TITLE);

    let headings = harvest(&mut text, &HEADING_RE);
    push_tokens(&mut terms, tokenizer, &headings, weight::H_TITLE);

    let keywords = harvest(&mut text, &KEYWORDS_RE);
    push_tokens(&mut terms, tokenizer, &keywords, weight::KEYWORDS);

    let description = harvest(&mut text, &DESCRIPTION_RE);
    push_tokens(&mut terms, tokenizer, &description, weight::DESCRIPTION);

    // Images contribute their alt text to the body.
    text = IMG_ALT_RE.replace_all(&text, " $1 ").into_owned();
    text = TAG_RE.replace_all(&text, " ").into_owned();
    push_tokens(&mut terms, tokenizer, &text, weight::DEFAULT);

    terms
}

/// Collect every first capture of the pattern, then erase the matched
/// regions so later passes never see them again.
fn harvest(text: &mut String, re: &Regex) -> String {
    let mut collected = String::new();
    for caps in re.captures_iter(text) {
        if let Some(m) = caps.get(1) {
            collected.push(' ');
            collected.push_str(m.as_str());
        }
    }
    *text = re.replace_all(text, " ").into_owned();
    collected
}

fn push_tokens(terms: &mut Vec<(String, f64)>, tokenizer: &Tokenizer, text: &str, weight: f64) {
    let decoded = decode_entities(text);
    for token in tokenizer.tokenize(&decoded) {
        terms.push((token.to_string(), weight));
    }
}

fn decode_entities(text: &str) -> String {
    let mut decoded = text.to_string();
    for (re, replacement) in ENTITIES.iter() {
        decoded = re.replace_all(&decoded, *replacement).into_owned();
    }
    decoded
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights_of<'a>(terms: &'a [(String, f64)], token: &str) -> Vec<f64> {
        terms
            .iter()
            .filter(|(t, _)| t == token)
            .map(|(_, w)| *w)
            .collect()
    }

    #[test]
    fn test_text_extraction_uses_default_weight() {
        let tokenizer = Tokenizer::new();
        let terms = extract_terms("chat chien\nchat", DocType::Text, &tokenizer);
        assert_eq!(terms.len(), 3);
        assert!(terms.iter().all(|(_, w)| *w == weight::DEFAULT));
    }

    #[test]
    fn test_html_title_and_headings_weighted() {
        let tokenizer = Tokenizer::new();
        let html = "<html><head><title>Rapport annuel</title></head>\
                    <body><h2>Chiffres</h2><p>rapport complet</p></body></html>";
        let terms = extract_terms(html, DocType::Html, &tokenizer);

        assert_eq!(weights_of(&terms, "Rapport"), vec![weight::TITLE]);
        assert_eq!(weights_of(&terms, "Chiffres"), vec![weight::H_TITLE]);
        assert_eq!(weights_of(&terms, "rapport"), vec![weight::DEFAULT]);
        assert_eq!(weights_of(&terms, "complet"), vec![weight::DEFAULT]);
    }

    #[test]
    fn test_html_meta_tags() {
        let tokenizer = Tokenizer::new();
        let html = r#"<meta name="keywords" content="moteur recherche">
                      <meta name="description" content="indexation rapide">corps"#;
        let terms = extract_terms(html, DocType::Html, &tokenizer);

        assert_eq!(weights_of(&terms, "moteur"), vec![weight::KEYWORDS]);
        assert_eq!(weights_of(&terms, "rapide"), vec![weight::DESCRIPTION]);
        assert_eq!(weights_of(&terms, "corps"), vec![weight::DEFAULT]);
    }

    #[test]
    fn test_comments_and_scripts_dropped() {
        let tokenizer = Tokenizer::new();
        let html = "<!-- caché --><script>var invisible = 1;</script>visible";
        let terms = extract_terms(html, DocType::Html, &tokenizer);

        assert!(weights_of(&terms, "caché").is_empty());
        assert!(weights_of(&terms, "invisible").is_empty());
        assert_eq!(weights_of(&terms, "visible"), vec![weight::DEFAULT]);
    }

    #[test]
    fn test_img_alt_text_indexed() {
        let tokenizer = Tokenizer::new();
        let html = r#"<p>avant <img src="x.png" alt="paysage montagne"> après</p>"#;
        let terms = extract_terms(html, DocType::Html, &tokenizer);

        assert_eq!(weights_of(&terms, "paysage"), vec![weight::DEFAULT]);
        assert_eq!(weights_of(&terms, "montagne"), vec![weight::DEFAULT]);
    }

    #[test]
    fn test_entities_decoded() {
        let tokenizer = Tokenizer::new();
        let html = "g&eacute;n&eacute;ral&nbsp;armée &unknown; fin";
        let terms = extract_terms(html, DocType::Html, &tokenizer);

        assert_eq!(weights_of(&terms, "général"), vec![weight::DEFAULT]);
        assert_eq!(weights_of(&terms, "armée"), vec![weight::DEFAULT]);
        assert_eq!(weights_of(&terms, "fin"), vec![weight::DEFAULT]);
        assert!(!terms.iter().any(|(t, _)| t.contains("unknown")));
    }

    #[test]
    fn test_extraction_order_is_stable() {
        let tokenizer = Tokenizer::new();
        let html = "<title>premier</title><p>second</p>";
        let terms = extract_terms(html, DocType::Html, &tokenizer);
        let tokens: Vec<&str> = terms.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(tokens, vec!["premier", "second"]);
    }
}
