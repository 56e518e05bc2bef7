//! Heuristic extraction of a speaker name and a brainstorming topic.
//!
//! Extraction is pure: the same text always yields the same result, and an
//! empty result simply means nothing confident was found.

use regex::Regex;
use std::sync::LazyLock;

use brainstorm_core::types::ExtractionResult;

/// Strategy for turning free text into structured session facts.
pub trait TranscriptExtractor: Send + Sync {
    fn extract(&self, text: &str) -> ExtractionResult;
}

// =============================================================================
// Compiled patterns
// =============================================================================

// Cue phrases are case-insensitive; the captured name must be capitalized.
static NAME_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\b(?i:my\s+name\s+is|i'm|i’m|i\s+am|call\s+me|this\s+is)\s+([A-Z][a-z]+(?:\s+[A-Z][a-z]+)?)",
        r"^\s*([A-Z][a-z]+)\s+(?i:here|speaking)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("Invalid name regex"))
    .collect()
});

static SENTENCE_SPLIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]+").expect("Invalid sentence regex"));

/// Phrases that mark a sentence as describing an idea or problem.
const TOPIC_CUES: &[&str] = &["idea", "problem", "want to", "trying to", "thinking about"];

/// Segments this short (in characters) are never topics.
const MIN_SEGMENT_CHARS: usize = 10;
/// A cue-bearing segment must be longer than this to be preferred.
const MIN_CUED_TOPIC_CHARS: usize = 20;
/// The longest-segment fallback must be longer than this.
const MIN_FALLBACK_TOPIC_CHARS: usize = 15;

// =============================================================================
// HeuristicExtractor
// =============================================================================

/// Default rule-based extractor.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicExtractor;

impl HeuristicExtractor {
    pub fn new() -> Self {
        Self
    }

    /// First name pattern match, trimmed.
    pub fn extract_name(&self, text: &str) -> Option<String> {
        NAME_PATTERNS.iter().find_map(|re| {
            re.captures(text)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        })
    }

    /// Best topic sentence, trimmed.
    pub fn extract_topic(&self, text: &str) -> Option<String> {
        let segments: Vec<&str> = SENTENCE_SPLIT_RE
            .split(text)
            .map(str::trim)
            .filter(|s| s.chars().count() > MIN_SEGMENT_CHARS)
            .collect();

        let cued = segments.iter().find(|s| {
            if s.chars().count() <= MIN_CUED_TOPIC_CHARS {
                return false;
            }
            let lower = s.to_lowercase();
            TOPIC_CUES.iter().any(|cue| lower.contains(cue))
        });
        if let Some(segment) = cued {
            return Some(segment.to_string());
        }

        // max_by_key keeps the last of equal maxima.
        segments
            .iter()
            .max_by_key(|s| s.chars().count())
            .filter(|s| s.chars().count() > MIN_FALLBACK_TOPIC_CHARS)
            .map(|s| s.to_string())
    }
}

impl TranscriptExtractor for HeuristicExtractor {
    fn extract(&self, text: &str) -> ExtractionResult {
        ExtractionResult {
            name: self.extract_name(text),
            topic: self.extract_topic(text),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> ExtractionResult {
        HeuristicExtractor::new().extract(text)
    }

    // -----------------------------------------------------------------
    // Names
    // -----------------------------------------------------------------

    #[test]
    fn test_name_my_name_is() {
        assert_eq!(extract("Hi, my name is Alice").name.as_deref(), Some("Alice"));
    }

    #[test]
    fn test_name_cue_is_case_insensitive() {
        assert_eq!(extract("MY NAME IS Bob").name.as_deref(), Some("Bob"));
        assert_eq!(extract("call me Jordan please").name.as_deref(), Some("Jordan"));
        assert_eq!(extract("I am Maria Lopez").name.as_deref(), Some("Maria Lopez"));
        assert_eq!(extract("Hey, this is Sam.").name.as_deref(), Some("Sam"));
    }

    #[test]
    fn test_name_curly_apostrophe() {
        assert_eq!(extract("I’m Priya").name.as_deref(), Some("Priya"));
    }

    #[test]
    fn test_name_leading_here_or_speaking() {
        assert_eq!(extract("Dana here, quick question").name.as_deref(), Some("Dana"));
        assert_eq!(extract("Chris speaking").name.as_deref(), Some("Chris"));
    }

    #[test]
    fn test_name_requires_capitalized_word() {
        assert_eq!(extract("just talking").name, None);
        assert_eq!(
            extract("I'm thinking about reducing food waste").name,
            None
        );
        assert_eq!(extract("i am tired").name, None);
    }

    #[test]
    fn test_first_pattern_wins() {
        assert_eq!(
            extract("My name is Ada. Call me Countess.").name.as_deref(),
            Some("Ada")
        );
    }

    // -----------------------------------------------------------------
    // Topics
    // -----------------------------------------------------------------

    #[test]
    fn test_topic_cued_sentence() {
        let topic = extract("I want to build a community garden app").topic.unwrap();
        assert!(topic.contains("build a community garden app"));
    }

    #[test]
    fn test_topic_prefers_first_cued_segment() {
        let text = "Good morning everyone. My idea is a shared tool library! \
                    Another idea is a repair cafe for the neighborhood.";
        assert_eq!(
            extract(text).topic.as_deref(),
            Some("My idea is a shared tool library")
        );
    }

    #[test]
    fn test_topic_longest_fallback() {
        let text = "Sounds nice. Bicycles for every student on campus. Short one here";
        assert_eq!(
            extract(text).topic.as_deref(),
            Some("Bicycles for every student on campus")
        );
    }

    #[test]
    fn test_topic_fallback_tie_takes_later_segment() {
        let text = "Alpha beta gamma delta. Omega sigma kappa zeta.";
        assert_eq!(
            extract(text).topic.as_deref(),
            Some("Omega sigma kappa zeta")
        );
    }

    #[test]
    fn test_short_fragments_never_topics() {
        assert_eq!(extract("Hello").topic, None);
        assert_eq!(extract("Yes. Sure. Okay!").topic, None);
        // Longer than 10 but not longer than 15 and no cue.
        assert_eq!(extract("Quite a thing").topic, None);
    }

    #[test]
    fn test_short_cued_segment_falls_through() {
        // Cued but only ten characters long.
        assert_eq!(extract("A big idea!!").topic, None);
    }

    #[test]
    fn test_topic_trimmed() {
        let topic = extract("   I'm trying to fix late buses in town   ").topic.unwrap();
        assert_eq!(topic, "I'm trying to fix late buses in town");
    }

    #[test]
    fn test_extract_is_deterministic() {
        let text = "Hi, my name is Alice. I have an idea about urban beekeeping.";
        let first = extract(text);
        let second = extract(text);
        assert_eq!(first, second);
        assert_eq!(first.name.as_deref(), Some("Alice"));
        assert_eq!(
            first.topic.as_deref(),
            Some("I have an idea about urban beekeeping")
        );
    }

    #[test]
    fn test_empty_text() {
        assert!(extract("").is_empty());
        assert!(extract("   ").is_empty());
    }
}
