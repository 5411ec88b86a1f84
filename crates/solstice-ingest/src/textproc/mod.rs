//! Text post-processing pipeline.
//!
//! Extracted PDF text arrives with ligatures, missing spaces, words
//! truncated at bbox boundaries, and run-together tokens. A fixed sequence
//! of stateless processors repairs what it can:
//!
//! 1. [`ArtifactCleanup`]: ligatures, truncations, spacing, gibberish runs;
//! 2. [`DictionaryCorrector`]: frequency-dictionary spelling and compound
//!    segmentation (seeded with a medical-terms list);
//! 3. [`FallbackSplitter`]: frequency-based word segmentation for anything
//!    still concatenated.
//!
//! A failing processor is logged and skipped; the chain never turns
//! non-empty input into empty output. Processors that modified the text are
//! recorded so block metadata can carry the tags.

mod cleanup;
mod dictionary;
mod splitter;
mod wordlist;

pub use cleanup::ArtifactCleanup;
pub use dictionary::DictionaryCorrector;
pub use splitter::FallbackSplitter;

use log::warn;
use std::time::Instant;

/// Inputs shorter than this pass through untouched.
const MIN_PROCESSABLE_LEN: usize = 3;

/// Invocations slower than this are logged.
const SLOW_PROCESSOR_MS: u128 = 100;

/// Uppercase fraction at which a string is treated as a header and
/// processed conservatively.
const HEADER_UPPERCASE_FRACTION: f32 = 0.70;

/// One stage of the post-processing chain.
pub trait TextProcessor: Send + Sync {
    /// Tag recorded in block metadata when this processor modifies text.
    fn name(&self) -> &'static str;

    /// Transform `text`, returning `Some(new)` when modified and `None`
    /// when the input is already clean.
    ///
    /// # Errors
    ///
    /// A processor may fail on pathological input; the pipeline logs the
    /// message and continues with the remaining stages.
    fn process(&self, text: &str) -> std::result::Result<Option<String>, String>;
}

/// Output of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedText {
    /// Final text (never empty for non-empty input)
    pub text: String,
    /// Names of the processors that modified the text, in order
    pub modified_by: Vec<&'static str>,
}

/// The fixed post-processing chain.
///
/// Construct once at startup and share by reference; per-word memoization
/// inside the dictionary stage is concurrency-safe.
pub struct TextPipeline {
    processors: Vec<Box<dyn TextProcessor>>,
}

impl std::fmt::Debug for TextPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextPipeline")
            .field(
                "processors",
                &self.processors.iter().map(|p| p.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for TextPipeline {
    fn default() -> Self {
        Self::standard()
    }
}

impl TextPipeline {
    /// The production chain: cleanup → dictionary → fallback splitter.
    #[must_use = "returns the constructed pipeline"]
    pub fn standard() -> Self {
        Self {
            processors: vec![
                Box::new(ArtifactCleanup::new()),
                Box::new(DictionaryCorrector::new()),
                Box::new(FallbackSplitter::new()),
            ],
        }
    }

    /// Build a pipeline from explicit stages (used by tests).
    #[must_use = "returns the constructed pipeline"]
    pub fn with_processors(processors: Vec<Box<dyn TextProcessor>>) -> Self {
        Self { processors }
    }

    /// Run the chain over one text block.
    ///
    /// Inputs shorter than three characters pass through untouched. Slow
    /// invocations (> 100 ms) are logged with the processor name. If the
    /// chain somehow empties the text, the original input is returned.
    #[must_use = "returns the processed text"]
    pub fn process(&self, text: &str) -> ProcessedText {
        if text.len() < MIN_PROCESSABLE_LEN {
            return ProcessedText {
                text: text.to_string(),
                modified_by: Vec::new(),
            };
        }

        let mut current = text.to_string();
        let mut modified_by = Vec::new();

        for processor in &self.processors {
            let start = Instant::now();
            match processor.process(&current) {
                Ok(Some(new_text)) => {
                    modified_by.push(processor.name());
                    current = new_text;
                }
                Ok(None) => {}
                Err(message) => {
                    warn!("text processor '{}' failed: {message}", processor.name());
                }
            }
            let elapsed = start.elapsed().as_millis();
            if elapsed > SLOW_PROCESSOR_MS {
                warn!(
                    "text processor '{}' took {elapsed} ms on {} chars",
                    processor.name(),
                    text.len()
                );
            }
        }

        if current.trim().is_empty() {
            warn!("post-processing emptied a non-empty block, restoring input");
            return ProcessedText {
                text: text.to_string(),
                modified_by: Vec::new(),
            };
        }

        ProcessedText {
            text: current,
            modified_by,
        }
    }
}

/// Headers (mostly-uppercase strings) are corrected conservatively: only
/// explicit truncation fixes, no dictionary rewriting.
#[must_use = "returns whether the text is a header"]
pub fn is_header(text: &str) -> bool {
    let letters: Vec<char> = text.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return false;
    }
    let upper = letters.iter().filter(|c| c.is_uppercase()).count();
    upper as f32 / letters.len() as f32 >= HEADER_UPPERCASE_FRACTION
}

/// Case pattern of a word, used to restore case after correction or
/// segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CasePattern {
    Upper,
    Title,
    Lower,
    Mixed,
}

pub(crate) fn case_pattern(word: &str) -> CasePattern {
    let letters: Vec<char> = word.chars().filter(|c| c.is_alphabetic()).collect();
    if letters.is_empty() {
        return CasePattern::Lower;
    }
    if letters.iter().all(|c| c.is_uppercase()) {
        CasePattern::Upper
    } else if letters.iter().all(|c| c.is_lowercase()) {
        CasePattern::Lower
    } else if letters[0].is_uppercase() && letters[1..].iter().all(|c| c.is_lowercase()) {
        CasePattern::Title
    } else {
        CasePattern::Mixed
    }
}

/// Re-apply a case pattern to a lowercase replacement.
pub(crate) fn restore_case(lower: &str, pattern: CasePattern) -> String {
    match pattern {
        CasePattern::Upper => lower.to_uppercase(),
        CasePattern::Title => {
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
        CasePattern::Lower | CasePattern::Mixed => lower.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_input_untouched() {
        let pipeline = TextPipeline::standard();
        assert_eq!(pipeline.process("ab").text, "ab");
        assert_eq!(pipeline.process("").text, "");
    }

    #[test]
    fn test_never_empties_input() {
        struct Eraser;
        impl TextProcessor for Eraser {
            fn name(&self) -> &'static str {
                "eraser"
            }
            fn process(&self, _: &str) -> std::result::Result<Option<String>, String> {
                Ok(Some(String::new()))
            }
        }
        let pipeline = TextPipeline::with_processors(vec![Box::new(Eraser)]);
        let out = pipeline.process("some text");
        assert_eq!(out.text, "some text");
        assert!(out.modified_by.is_empty());
    }

    #[test]
    fn test_failing_processor_is_skipped() {
        struct Broken;
        impl TextProcessor for Broken {
            fn name(&self) -> &'static str {
                "broken"
            }
            fn process(&self, _: &str) -> std::result::Result<Option<String>, String> {
                Err("boom".to_string())
            }
        }
        struct Appender;
        impl TextProcessor for Appender {
            fn name(&self) -> &'static str {
                "appender"
            }
            fn process(&self, t: &str) -> std::result::Result<Option<String>, String> {
                Ok(Some(format!("{t}!")))
            }
        }
        let pipeline = TextPipeline::with_processors(vec![Box::new(Broken), Box::new(Appender)]);
        let out = pipeline.process("hello");
        assert_eq!(out.text, "hello!");
        assert_eq!(out.modified_by, vec!["appender"]);
    }

    #[test]
    fn test_is_header() {
        assert!(is_header("SAFETY AND IMMUNOGENICITY"));
        assert!(is_header("METHODS: STUDY DESIGN"));
        assert!(!is_header("Ordinary sentence text"));
        assert!(!is_header("1234 5678"));
    }

    #[test]
    fn test_case_round_trip() {
        assert_eq!(restore_case("vaccine", case_pattern("VACCINE")), "VACCINE");
        assert_eq!(restore_case("vaccine", case_pattern("Vaccine")), "Vaccine");
        assert_eq!(restore_case("vaccine", case_pattern("vaccine")), "vaccine");
    }
}
