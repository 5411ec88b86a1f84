//! Frequency-dictionary spelling correction and compound segmentation.

use log::debug;
use rustc_hash::FxHashMap;
use std::sync::Mutex;
use strsim::{jaro_winkler, levenshtein};

use super::wordlist;
use super::{case_pattern, is_header, restore_case, CasePattern, TextProcessor};

/// Maximum edit distance for a spelling suggestion.
const MAX_EDIT_DISTANCE: usize = 2;

/// Jaro-Winkler floor that keeps edit-distance suggestions from rewriting
/// short words into unrelated dictionary entries.
const MIN_SIMILARITY: f64 = 0.80;

/// Word length above which unresolved words get a segmentation attempt.
const SEGMENT_MIN_LEN: usize = 11;

/// Maximum parts an accepted segmentation may produce.
const MAX_SEGMENT_PARTS: usize = 5;

/// Second stage: dictionary lookups, edit-distance suggestions, and
/// compound segmentation over a frequency dictionary seeded with general
/// English plus medical terms.
///
/// Correction results are memoized per word; the memo is behind a mutex so
/// a shared pipeline stays safe under concurrent extraction.
pub struct DictionaryCorrector {
    /// word → frequency
    frequencies: FxHashMap<&'static str, u64>,
    /// Entries sorted by (length, word) for banded suggestion scans
    by_length: Vec<(&'static str, u64)>,
    /// word → correction (None = leave unchanged)
    memo: Mutex<FxHashMap<String, Option<String>>>,
}

impl std::fmt::Debug for DictionaryCorrector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DictionaryCorrector")
            .field("entries", &self.frequencies.len())
            .finish_non_exhaustive()
    }
}

impl Default for DictionaryCorrector {
    fn default() -> Self {
        Self::new()
    }
}

impl DictionaryCorrector {
    /// Build the corrector from the embedded word list.
    #[must_use = "returns the constructed corrector"]
    pub fn new() -> Self {
        let entries = wordlist::entries();
        let frequencies: FxHashMap<&'static str, u64> = entries.iter().copied().collect();
        let mut by_length = entries;
        by_length.sort_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| a.0.cmp(b.0)));

        Self {
            frequencies,
            by_length,
            memo: Mutex::new(FxHashMap::default()),
        }
    }

    /// Whether a lowercase word is a known dictionary entry.
    #[inline]
    fn is_known(&self, lower: &str) -> bool {
        self.frequencies.contains_key(lower)
    }

    /// Correct one word, or `None` to leave it unchanged. Memoized.
    fn correct_word(&self, word: &str) -> Option<String> {
        if let Some(cached) = self.memo.lock().ok().and_then(|m| m.get(word).cloned()) {
            return cached;
        }
        let result = self.correct_word_uncached(word);
        if let Ok(mut memo) = self.memo.lock() {
            memo.insert(word.to_string(), result.clone());
        }
        result
    }

    fn correct_word_uncached(&self, word: &str) -> Option<String> {
        if word.len() < 3 || !word.chars().all(|c| c.is_ascii_alphabetic()) {
            return None;
        }

        let lower = word.to_lowercase();
        // Edit distance 0: exact-case or lowercased hit
        if self.is_known(&lower) {
            return None;
        }

        let pattern = case_pattern(word);

        if let Some(suggestion) = self.best_suggestion(&lower) {
            debug!("spelling: '{word}' -> '{suggestion}'");
            return Some(restore_case(suggestion, pattern));
        }

        if word.len() >= SEGMENT_MIN_LEN && pattern != CasePattern::Mixed {
            if let Some(parts) = self.segment(&lower) {
                let joined = join_with_case(&parts, pattern);
                debug!("segmentation: '{word}' -> '{joined}'");
                return Some(joined);
            }
        }

        None
    }

    /// Best suggestion at edit distance ≤ 2: minimum distance, then highest
    /// frequency, then alphabetical for determinism.
    fn best_suggestion(&self, lower: &str) -> Option<&'static str> {
        let len = lower.len();
        let mut best: Option<(usize, u64, &'static str)> = None;

        for &(candidate, freq) in &self.by_length {
            if candidate.len() + MAX_EDIT_DISTANCE < len {
                continue;
            }
            if candidate.len() > len + MAX_EDIT_DISTANCE {
                break;
            }
            let distance = levenshtein(lower, candidate);
            if distance == 0 || distance > MAX_EDIT_DISTANCE {
                continue;
            }
            if jaro_winkler(lower, candidate) < MIN_SIMILARITY {
                continue;
            }
            let better = match &best {
                None => true,
                Some((bd, bf, bw)) => {
                    (distance, std::cmp::Reverse(freq), candidate)
                        < (*bd, std::cmp::Reverse(*bf), *bw)
                }
            };
            if better {
                best = Some((distance, freq, candidate));
            }
        }

        best.map(|(_, _, w)| w)
    }

    /// Segment a lowercase compound into dictionary words.
    ///
    /// Accepts a split iff it covers the whole word with ≤ 5 parts, every
    /// part is in the dictionary, and every part has length ≥ 2 except the
    /// words `a` and `i`. Among valid splits the highest total
    /// log-frequency wins, with fewer parts breaking ties.
    fn segment(&self, lower: &str) -> Option<Vec<&'static str>> {
        if !lower.is_ascii() {
            return None;
        }
        let n = lower.len();
        // best[i]: (score, parts, split) for the prefix of length i
        let mut best: Vec<Option<(f64, usize, Vec<&'static str>)>> = vec![None; n + 1];
        best[0] = Some((0.0, 0, Vec::new()));

        for i in 1..=n {
            for j in 0..i {
                let Some((score, parts, split)) = best[j].clone() else {
                    continue;
                };
                if parts == MAX_SEGMENT_PARTS {
                    continue;
                }
                let piece = &lower[j..i];
                if piece.len() < 2 && piece != "a" && piece != "i" {
                    continue;
                }
                let Some(&freq) = self.frequencies.get(piece) else {
                    continue;
                };
                let candidate_score = score + (freq as f64).ln();
                let candidate_parts = parts + 1;
                let better = match &best[i] {
                    None => true,
                    Some((s, p, _)) => {
                        candidate_score > *s || (candidate_score == *s && candidate_parts < *p)
                    }
                };
                if better {
                    let mut new_split = split;
                    new_split.push(self.canonical(piece));
                    best[i] = Some((candidate_score, candidate_parts, new_split));
                }
            }
        }

        best[n]
            .take()
            .filter(|(_, parts, _)| *parts >= 2)
            .map(|(_, _, split)| split)
    }

    /// Static reference for a piece known to be in the dictionary.
    fn canonical(&self, piece: &str) -> &'static str {
        self.frequencies
            .get_key_value(piece)
            .map(|(k, _)| *k)
            .unwrap_or("")
    }
}

/// Join segmentation parts, applying the source word's case pattern.
fn join_with_case(parts: &[&str], pattern: CasePattern) -> String {
    match pattern {
        CasePattern::Upper => parts
            .iter()
            .map(|p| p.to_uppercase())
            .collect::<Vec<_>>()
            .join(" "),
        CasePattern::Title => {
            let mut out = Vec::with_capacity(parts.len());
            for (i, p) in parts.iter().enumerate() {
                if i == 0 {
                    out.push(restore_case(p, CasePattern::Title));
                } else {
                    out.push((*p).to_string());
                }
            }
            out.join(" ")
        }
        CasePattern::Lower | CasePattern::Mixed => parts.join(" "),
    }
}

impl TextProcessor for DictionaryCorrector {
    fn name(&self) -> &'static str {
        "dictionary_correction"
    }

    fn process(&self, text: &str) -> Result<Option<String>, String> {
        // Headers get only the explicit truncation fixes from stage 1.
        if is_header(text) {
            return Ok(None);
        }

        let mut result = String::with_capacity(text.len());
        let mut word = String::new();
        let mut changed = false;

        for ch in text.chars() {
            if ch.is_alphanumeric() {
                word.push(ch);
            } else {
                flush_word(self, &mut word, &mut result, &mut changed);
                result.push(ch);
            }
        }
        flush_word(self, &mut word, &mut result, &mut changed);

        Ok(changed.then_some(result))
    }
}

fn flush_word(
    corrector: &DictionaryCorrector,
    word: &mut String,
    result: &mut String,
    changed: &mut bool,
) {
    if word.is_empty() {
        return;
    }
    match corrector.correct_word(word) {
        Some(corrected) => {
            result.push_str(&corrected);
            *changed = true;
        }
        None => result.push_str(word),
    }
    word.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_words_untouched() {
        let c = DictionaryCorrector::new();
        assert_eq!(c.process("the influenza vaccine dose").unwrap(), None);
        // Case variants are edit distance 0 via lowercasing
        assert_eq!(c.process("The Influenza Vaccine").unwrap(), None);
    }

    #[test]
    fn test_misspelling_corrected_with_case() {
        let c = DictionaryCorrector::new();
        let out = c.process("the vacine dose").unwrap().unwrap();
        assert_eq!(out, "the vaccine dose");

        let out = c.process("Vacine efficacy").unwrap().unwrap();
        assert_eq!(out, "Vaccine efficacy");
    }

    #[test]
    fn test_medical_term_preferred() {
        let c = DictionaryCorrector::new();
        // "immunogenicty" is distance 1 from the medical term
        let out = c.process("strong immunogenicty data").unwrap().unwrap();
        assert_eq!(out, "strong immunogenicity data");
    }

    #[test]
    fn test_compound_segmentation() {
        let c = DictionaryCorrector::new();
        let out = c.process("see vaccinedose records").unwrap().unwrap();
        assert_eq!(out, "see vaccine dose records");
    }

    #[test]
    fn test_segmentation_preserves_title_case() {
        let c = DictionaryCorrector::new();
        let out = c.process("xx Vaccinedose xx").unwrap().unwrap();
        assert_eq!(out, "xx Vaccine dose xx");
    }

    #[test]
    fn test_segmentation_rejects_too_many_parts() {
        let c = DictionaryCorrector::new();
        // 6+ dictionary words concatenated: split must be rejected
        let glued = "theofandtoinis";
        let out = c.correct_word(glued);
        assert_eq!(out, None);
    }

    #[test]
    fn test_headers_skipped() {
        let c = DictionaryCorrector::new();
        assert_eq!(c.process("VACINE SAFETY DATA").unwrap(), None);
    }

    #[test]
    fn test_short_and_nonalpha_untouched() {
        let c = DictionaryCorrector::new();
        assert_eq!(c.process("pH 7.4 at 25C").unwrap(), None);
    }

    #[test]
    fn test_memo_is_stable() {
        let c = DictionaryCorrector::new();
        let first = c.correct_word("vacine");
        let second = c.correct_word("vacine");
        assert_eq!(first, second);
        assert_eq!(first.as_deref(), Some("vaccine"));
    }
}
