//! Keyword-based content classification.
//!
//! The engine only ever consumes booleans; this default classifier is a
//! replaceable heuristic over keyword and emoji families, not content
//! understanding. Processing stays local.

use once_cell::sync::Lazy;
use regex::Regex;

/// Verdict source for observed content units.
pub trait ContentClassifier {
    /// True when the content unit looks like low-value feed filler.
    fn classify(&self, content: &str) -> bool;
}

static BRAINROT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)\b(viral|trending|drama|beef|roast|controversial)\b",
        r"(?i)\b(influencer|tiktoker|youtuber|streamer)\b",
        r"(?i)\b(cringe|sus|no cap|fr fr|periodt|rizz)\b",
        r"(?i)\b(exposed|cancelled|reaction|clapback)\b",
        r"[🔥💯😂😭🤡]",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// Default pattern-matching classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

impl KeywordClassifier {
    pub fn new() -> Self {
        Self
    }
}

impl ContentClassifier for KeywordClassifier {
    fn classify(&self, content: &str) -> bool {
        BRAINROT_PATTERNS.iter().any(|p| p.is_match(content))
    }
}
