//! PDF artifact cleanup.

use once_cell::sync::Lazy;
use regex::Regex;

use super::TextProcessor;

/// Ligature codepoints pdfium passes through from embedded fonts.
const LIGATURES: &[(char, &str)] = &[
    ('\u{FB00}', "ff"),
    ('\u{FB01}', "fi"),
    ('\u{FB02}', "fl"),
    ('\u{FB03}', "ffi"),
    ('\u{FB04}', "ffl"),
];

/// Known word truncations at bbox boundaries in the document corpus.
static TRUNCATION_FIXES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\b([Ii]nfluenz)\b", "${1}a"),
        (r"\b([Vv]accin)\b", "${1}e"),
        (r"\b([Ii]mmunogenicit)\b", "${1}y"),
        (r"\b([Qq]uadrivalen)\b", "${1}t"),
        (r"\b([Hh]emagglutini)\b", "${1}n"),
        (r"\b([Ss]eroconversio)\b", "${1}n"),
    ]
    .iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("valid truncation pattern"),
            *replacement,
        )
    })
    .collect()
});

/// Sentence punctuation glued to the next word: `end.Next` → `end. Next`.
static MISSING_SPACE_SENTENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z][.!?])([A-Z])").expect("valid sentence-space regex"));

/// Commas, colons, semicolons, closing parens glued to a letter.
static MISSING_SPACE_CLAUSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([,;:\)])([A-Za-z])").expect("valid clause-space regex"));

/// Runs of ≥ 5 space-separated single letters (vertical-text debris).
static GIBBERISH_RUN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\b[A-Za-z] ){4,}\b[A-Za-z]\b").expect("valid gibberish regex"));

/// Collapse doubled spaces left by removals.
static MULTI_SPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"  +").expect("valid space-collapse regex"));

/// Case boundary inside an over-long concatenation.
static CASE_BOUNDARY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"([a-z])([A-Z])").expect("valid case-boundary regex"));

/// Alphabetic run length beyond which a token counts as an extreme
/// concatenation.
const EXTREME_CONCAT_LEN: usize = 30;

/// First stage: ligatures, truncations, spacing, gibberish, extreme
/// concatenations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArtifactCleanup;

impl ArtifactCleanup {
    /// Construct the cleanup stage.
    #[must_use = "returns the cleanup processor"]
    pub fn new() -> Self {
        Self
    }

    fn clean(text: &str) -> String {
        let mut out = text.to_string();

        for (ligature, replacement) in LIGATURES {
            if out.contains(*ligature) {
                out = out.replace(*ligature, replacement);
            }
        }

        for (pattern, replacement) in TRUNCATION_FIXES.iter() {
            out = pattern.replace_all(&out, *replacement).into_owned();
        }

        out = MISSING_SPACE_SENTENCE.replace_all(&out, "$1 $2").into_owned();
        out = MISSING_SPACE_CLAUSE.replace_all(&out, "$1 $2").into_owned();

        out = GIBBERISH_RUN.replace_all(&out, "").into_owned();

        // Split tokens with absurd alphabetic runs at case boundaries;
        // the dictionary stages handle what remains.
        out = out
            .split(' ')
            .map(|token| {
                let alpha_len = token.chars().filter(|c| c.is_alphabetic()).count();
                if alpha_len > EXTREME_CONCAT_LEN {
                    CASE_BOUNDARY.replace_all(token, "$1 $2").into_owned()
                } else {
                    token.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");

        out = MULTI_SPACE.replace_all(&out, " ").into_owned();
        out.trim().to_string()
    }
}

impl TextProcessor for ArtifactCleanup {
    fn name(&self) -> &'static str {
        "artifact_cleanup"
    }

    fn process(&self, text: &str) -> Result<Option<String>, String> {
        let cleaned = Self::clean(text);
        if cleaned == text {
            Ok(None)
        } else {
            Ok(Some(cleaned))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(text: &str) -> String {
        ArtifactCleanup::clean(text)
    }

    #[test]
    fn test_ligatures_replaced() {
        assert_eq!(clean("e\u{FB03}cacy and in\u{FB02}uenza"), "efficacy and influenza");
    }

    #[test]
    fn test_truncation_fixes() {
        assert_eq!(clean("the influenz season"), "the influenza season");
        assert_eq!(clean("Vaccin efficacy"), "Vaccine efficacy");
        // Full words untouched
        assert_eq!(clean("influenza vaccine"), "influenza vaccine");
    }

    #[test]
    fn test_missing_space_after_sentence() {
        assert_eq!(clean("was reported.Subjects were"), "was reported. Subjects were");
        // Abbreviations with capital-letter periods stay intact
        assert_eq!(clean("the U.S. population"), "the U.S. population");
    }

    #[test]
    fn test_missing_space_after_clause_punctuation() {
        assert_eq!(clean("fever,chills and pain"), "fever, chills and pain");
        assert_eq!(clean("(see Table 2)and further"), "(see Table 2) and further");
    }

    #[test]
    fn test_decimal_numbers_untouched() {
        assert_eq!(clean("a titer of 1:40 in 87.5% of subjects"), "a titer of 1:40 in 87.5% of subjects");
        assert_eq!(clean("doses of 0.5 mL"), "doses of 0.5 mL");
    }

    #[test]
    fn test_gibberish_run_removed() {
        assert_eq!(clean("results a b c d e f shown"), "results shown");
        // Four letters is below the threshold
        assert_eq!(clean("groups a b c d only"), "groups a b c d only");
    }

    #[test]
    fn test_extreme_concatenation_split_at_case_boundaries() {
        let input = "notes SafetyAndImmunogenicityOfQuadrivalentVaccine end";
        let out = clean(input);
        assert!(out.contains("Safety And Immunogenicity Of Quadrivalent Vaccine"));
    }

    #[test]
    fn test_clean_text_unchanged_returns_none() {
        let p = ArtifactCleanup::new();
        assert_eq!(p.process("Already clean text.").unwrap(), None);
    }
}
