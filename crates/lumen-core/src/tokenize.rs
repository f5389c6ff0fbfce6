//! Turns raw text into index-worthy terms.
//!
//! Lower-cases, replaces anything outside letters (accented Latin included),
//! digits and whitespace with a space, then drops one-char tokens and stop words.

use std::collections::HashSet;

/// English and French function words plus common programming keywords.
const STOP_WORDS: &[&str] = &[
    // English
    "the", "and", "or", "but", "is", "are", "was", "were", "be", "been", "being", "have",
    "has", "had", "do", "does", "did", "will", "would", "could", "should", "may", "might",
    "must", "shall", "can", "to", "of", "in", "on", "at", "by", "for", "with", "from", "as",
    "into", "about", "up", "out", "so", "if", "then", "than", "this", "that", "these",
    "those", "it", "its", "an", "not", "no", "yes", "you", "your", "we", "our", "they",
    "them", "their", "he", "she", "his", "her", "my", "me", "what", "which", "who", "whom",
    "whose", "when", "where", "why", "how", "all", "any", "each", "there", "here", "also",
    "just", "only", "very", "too", "some", "such", "more", "most", "other",
    // French
    "le", "la", "les", "un", "une", "des", "du", "de", "et", "ou", "mais", "donc", "car",
    "ni", "est", "sont", "était", "être", "avoir", "ai", "as", "avons", "avez", "ont", "je",
    "tu", "il", "elle", "nous", "vous", "ils", "elles", "on", "ce", "cet", "cette", "ces",
    "mon", "ton", "son", "ma", "ta", "sa", "mes", "tes", "ses", "notre", "votre", "leur",
    "leurs", "au", "aux", "en", "dans", "par", "pour", "sur", "avec", "sans", "sous", "qui",
    "que", "quoi", "dont", "où", "ne", "pas", "plus", "se", "lui", "très", "tout", "tous",
    "toute", "toutes", "comme", "aussi", "fait", "faire", "été",
    // programming keywords
    "fn", "let", "const", "var", "function", "return", "import", "export", "from", "class",
    "def", "self", "this", "new", "null", "undefined", "true", "false", "if", "else",
    "for", "while", "async", "await", "pub", "use", "mut", "impl", "struct", "enum",
];

/// Splits `text` into normalized terms, in order of appearance (duplicates kept).
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized: String = text
        .to_lowercase()
        .chars()
        .map(|c| if is_term_char(c) || c.is_whitespace() { c } else { ' ' })
        .collect();

    normalized
        .split_whitespace()
        .filter(|t| t.chars().count() > 1)
        .filter(|t| !is_stop_word(t))
        .map(str::to_string)
        .collect()
}

/// Distinct terms of `text`. Used for document-frequency bookkeeping.
pub fn term_set(text: &str) -> HashSet<String> {
    tokenize(text).into_iter().collect()
}

pub fn is_stop_word(term: &str) -> bool {
    STOP_WORDS.contains(&term)
}

/// ASCII letters and digits, plus the Latin-1 Supplement and Latin Extended-A/B letters.
fn is_term_char(c: char) -> bool {
    if c.is_ascii_alphanumeric() {
        return true;
    }
    matches!(c, '\u{00C0}'..='\u{024F}') && c != '\u{00D7}' && c != '\u{00F7}'
}
