//! Incremental transcript reconciliation.
//!
//! Successive transcription passes cover overlapping audio windows, so the
//! same words come back more than once. The reconciler turns each pass into
//! the delta that has not been emitted yet:
//!
//! - Timestamp extraction (preferred): keep segments starting at or past the
//!   watermark, minus a tolerance for jittery utterance boundaries.
//! - Fuzzy word-overlap fallback (no timestamps): normalize both texts and
//!   find the longest previous-suffix / new-prefix word overlap.
//!
//! The fallback can still duplicate words when no overlap is found; that is
//! a documented imprecision of text-only matching.

use crate::defaults;
use crate::stt::transcriber::Transcription;

/// Minimum word overlap accepted by the fuzzy fallback.
const MIN_OVERLAP_WORDS: usize = 3;

/// How far back into the previous word sequence the fallback scans.
const OVERLAP_SCAN_WORDS: usize = 20;

/// Widest window for the narrower boundary-alignment check.
const BOUNDARY_CHECK_WORDS: usize = 5;

/// Containment short-circuit: a new text at most this fraction of the
/// previous one, contained within it, is a pure re-transcription.
const CONTAINMENT_RATIO: f64 = 0.8;

/// Reconciler state carried between transcription passes.
#[derive(Debug, Default)]
pub struct Reconciler {
    /// End timestamp of the last emitted segment; never moves backward.
    watermark: f64,
    /// Full text of the previous pass, for the fuzzy fallback.
    last_text: String,
    /// Tolerance when comparing segment starts against the watermark.
    tolerance: f64,
}

impl Reconciler {
    /// Creates a reconciler with the default timestamp tolerance.
    pub fn new() -> Self {
        Self::with_tolerance(defaults::TIMESTAMP_TOLERANCE_SECS)
    }

    /// Creates a reconciler with a custom timestamp tolerance.
    pub fn with_tolerance(tolerance: f64) -> Self {
        Self {
            watermark: 0.0,
            last_text: String::new(),
            tolerance,
        }
    }

    /// Current watermark (end time of the last emitted segment).
    pub fn watermark(&self) -> f64 {
        self.watermark
    }

    /// Clears all state. Called after a hard silence reset so a new
    /// utterance is never compared against a stale one.
    pub fn reset(&mut self) {
        self.watermark = 0.0;
        self.last_text.clear();
    }

    /// Reconciles one transcription pass into the not-yet-emitted delta.
    ///
    /// Returns `None` when the pass contains nothing new.
    pub fn reconcile(&mut self, transcription: &Transcription) -> Option<String> {
        let delta = if transcription.segments.is_empty() {
            self.reconcile_by_text(&transcription.text)
        } else {
            self.reconcile_by_timestamps(transcription)
        };

        self.last_text = transcription.text.trim().to_string();

        delta.filter(|d| !d.is_empty())
    }

    /// Keeps segments starting at or past `watermark - tolerance` and
    /// advances the watermark to the furthest kept end time.
    fn reconcile_by_timestamps(&mut self, transcription: &Transcription) -> Option<String> {
        let cutoff = self.watermark - self.tolerance;
        let mut parts = Vec::new();
        let mut max_end = self.watermark;

        for segment in &transcription.segments {
            if segment.start >= cutoff {
                let text = segment.text.trim();
                if !text.is_empty() {
                    parts.push(text);
                }
                if segment.end > max_end {
                    max_end = segment.end;
                }
            }
        }

        if parts.is_empty() {
            return None;
        }

        self.watermark = max_end;
        Some(parts.join(" "))
    }

    /// Fuzzy fallback for engines without per-segment timestamps.
    fn reconcile_by_text(&mut self, new_text: &str) -> Option<String> {
        let new_text = new_text.trim();
        if new_text.is_empty() {
            return None;
        }
        if self.last_text.is_empty() {
            return Some(new_text.to_string());
        }

        let prev_words = normalize_words(&self.last_text);
        let new_tokens = tokenize(new_text);
        let new_words: Vec<&str> = new_tokens.iter().map(|t| t.normalized.as_str()).collect();

        if prev_words.is_empty() {
            return Some(new_text.to_string());
        }
        if new_words.is_empty() {
            return None;
        }

        // Short-circuit: a shorter new text fully contained in the previous
        // one is a pure re-transcription of already-sent content. Matched on
        // whole-word windows so the check cannot straddle word boundaries.
        if new_words.len() as f64 <= prev_words.len() as f64 * CONTAINMENT_RATIO
            && prev_words
                .windows(new_words.len())
                .any(|window| window == new_words.as_slice())
        {
            return None;
        }

        // Longest suffix-of-previous == prefix-of-new, scanning the last
        // OVERLAP_SCAN_WORDS words.
        let max_overlap = OVERLAP_SCAN_WORDS
            .min(prev_words.len())
            .min(new_words.len());
        for overlap in (MIN_OVERLAP_WORDS..=max_overlap).rev() {
            let prev_suffix = &prev_words[prev_words.len() - overlap..];
            let new_prefix = &new_words[..overlap];
            if prev_suffix == new_prefix {
                return Some(emit_after(new_text, &new_tokens, overlap));
            }
        }

        // Narrower boundary alignment: the first 5..=3 new words appearing
        // anywhere near the end of the previous text.
        let scan_start = prev_words.len().saturating_sub(OVERLAP_SCAN_WORDS);
        let prev_tail = &prev_words[scan_start..];
        let max_boundary = BOUNDARY_CHECK_WORDS.min(new_words.len());
        for k in (MIN_OVERLAP_WORDS..=max_boundary).rev() {
            let new_prefix = &new_words[..k];
            if prev_tail.windows(k).any(|w| w == new_prefix) {
                return Some(emit_after(new_text, &new_tokens, k));
            }
        }

        // No overlap found: emit everything, accepting possible duplication.
        Some(new_text.to_string())
    }
}

/// A raw word paired with its normalized form.
#[derive(Debug)]
struct Token {
    /// Byte offset of the raw word within the original text.
    raw_start: usize,
    normalized: String,
}

/// Splits text into whitespace-delimited tokens, dropping tokens that
/// normalize to nothing (pure punctuation).
fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut offset = 0;
    for raw in text.split_whitespace() {
        // split_whitespace yields substrings of `text`, so the offset can
        // be recovered by searching forward from the previous position.
        let raw_start = match text[offset..].find(raw) {
            Some(pos) => offset + pos,
            None => continue,
        };
        offset = raw_start + raw.len();

        let normalized = normalize_word(raw);
        if !normalized.is_empty() {
            tokens.push(Token {
                raw_start,
                normalized,
            });
        }
    }
    tokens
}

/// Emits the raw text starting after the first `skip` normalized tokens.
fn emit_after(text: &str, tokens: &[Token], skip: usize) -> String {
    match tokens.get(skip) {
        Some(token) => text[token.raw_start..].trim().to_string(),
        None => String::new(),
    }
}

/// Normalizes a full text into comparison words.
fn normalize_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(normalize_word)
        .filter(|w| !w.is_empty())
        .collect()
}

/// Lowercases, strips punctuation, and maps small numerals to words so that
/// transcription jitter on numbers or punctuation does not defeat matching.
fn normalize_word(word: &str) -> String {
    let cleaned: String = word
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_lowercase();

    numeral_to_word(&cleaned)
        .map(str::to_string)
        .unwrap_or(cleaned)
}

/// Maps single and double digit numerals 0-20 to their spoken words.
/// Larger numbers are compared as literal digits.
fn numeral_to_word(word: &str) -> Option<&'static str> {
    let value = match word.parse::<u8>() {
        Ok(v) if v <= 20 => v,
        _ => return None,
    };
    const WORDS: [&str; 21] = [
        "zero", "one", "two", "three", "four", "five", "six", "seven", "eight", "nine", "ten",
        "eleven", "twelve", "thirteen", "fourteen", "fifteen", "sixteen", "seventeen", "eighteen",
        "nineteen", "twenty",
    ];
    Some(WORDS[value as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stt::transcriber::TranscriptSegment;

    fn with_segments(segments: Vec<TranscriptSegment>) -> Transcription {
        let text = segments
            .iter()
            .map(|s| s.text.trim())
            .collect::<Vec<_>>()
            .join(" ");
        Transcription { text, segments }
    }

    fn text_only(text: &str) -> Transcription {
        Transcription {
            text: text.to_string(),
            segments: Vec::new(),
        }
    }

    fn segment(start: f64, end: f64, text: &str) -> TranscriptSegment {
        TranscriptSegment {
            start,
            end,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_first_pass_emits_everything() {
        let mut reconciler = Reconciler::new();
        let delta = reconciler.reconcile(&with_segments(vec![
            segment(0.0, 1.0, "hello"),
            segment(1.0, 2.0, "world"),
        ]));
        assert_eq!(delta.as_deref(), Some("hello world"));
        assert_eq!(reconciler.watermark(), 2.0);
    }

    #[test]
    fn test_timestamp_extraction_emits_tail_past_watermark() {
        // prevEndTime = 2.0, tolerance 0.3: 1.8 >= 1.7 keeps both segments.
        let mut reconciler = Reconciler::with_tolerance(0.3);
        reconciler.watermark = 2.0;

        let delta = reconciler.reconcile(&with_segments(vec![
            segment(1.8, 2.5, "world"),
            segment(2.5, 3.0, "today"),
        ]));
        assert_eq!(delta.as_deref(), Some("world today"));
        assert_eq!(reconciler.watermark(), 3.0);
    }

    #[test]
    fn test_pure_overlap_emits_nothing() {
        let mut reconciler = Reconciler::with_tolerance(0.3);
        reconciler.watermark = 5.0;

        let delta = reconciler.reconcile(&with_segments(vec![
            segment(1.0, 2.0, "already"),
            segment(2.0, 4.0, "emitted"),
        ]));
        assert!(delta.is_none());
        assert_eq!(reconciler.watermark(), 5.0, "watermark must not move");
    }

    #[test]
    fn test_watermark_never_moves_backward() {
        let mut reconciler = Reconciler::with_tolerance(0.3);
        reconciler.watermark = 4.0;

        // Segment within tolerance but ending before the watermark.
        let delta = reconciler.reconcile(&with_segments(vec![segment(3.8, 3.9, "tail")]));
        assert_eq!(delta.as_deref(), Some("tail"));
        assert_eq!(reconciler.watermark(), 4.0);
    }

    #[test]
    fn test_empty_segment_text_is_skipped() {
        let mut reconciler = Reconciler::new();
        let delta = reconciler.reconcile(&with_segments(vec![
            segment(0.0, 1.0, "  "),
            segment(1.0, 2.0, "words"),
        ]));
        assert_eq!(delta.as_deref(), Some("words"));
    }

    #[test]
    fn test_fallback_first_pass() {
        let mut reconciler = Reconciler::new();
        let delta = reconciler.reconcile(&text_only("the quick brown fox"));
        assert_eq!(delta.as_deref(), Some("the quick brown fox"));
    }

    #[test]
    fn test_fallback_emits_only_words_past_overlap() {
        // Previous "the five dogs ran fast", new "five dogs ran fast and
        // jumped": a 4-word suffix/prefix overlap leaves "and jumped".
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&text_only("the five dogs ran fast"));

        let delta = reconciler.reconcile(&text_only("five dogs ran fast and jumped"));
        assert_eq!(delta.as_deref(), Some("and jumped"));
    }

    #[test]
    fn test_fallback_numeral_normalization() {
        // "5" and "five" must match across passes.
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&text_only("the 5 dogs ran fast"));

        let delta = reconciler.reconcile(&text_only("five dogs ran fast and jumped"));
        assert_eq!(delta.as_deref(), Some("and jumped"));
    }

    #[test]
    fn test_fallback_punctuation_jitter() {
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&text_only("Hello, world. How are"));

        let delta = reconciler.reconcile(&text_only("hello world how are you today"));
        assert_eq!(delta.as_deref(), Some("you today"));
    }

    #[test]
    fn test_fallback_containment_short_circuit() {
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&text_only("one two three four five"));

        let delta = reconciler.reconcile(&text_only("two three"));
        assert!(delta.is_none());
    }

    #[test]
    fn test_fallback_containment_respects_word_boundaries() {
        // "c d" appears inside "bc d" as a substring but not as whole
        // words, so it must be emitted, not suppressed.
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&text_only("a bc d"));

        let delta = reconciler.reconcile(&text_only("c d"));
        assert_eq!(delta.as_deref(), Some("c d"));
    }

    #[test]
    fn test_fallback_containment_requires_shorter_text() {
        // Same length is not a containment candidate; overlap search runs.
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&text_only("one two three four five"));

        let delta = reconciler.reconcile(&text_only("one two three four five"));
        // Full 5-word overlap leaves nothing to emit.
        assert!(delta.is_none());
    }

    #[test]
    fn test_fallback_no_overlap_emits_all() {
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&text_only("completely different sentence here"));

        let delta = reconciler.reconcile(&text_only("nothing matches at all friends"));
        assert_eq!(delta.as_deref(), Some("nothing matches at all friends"));
    }

    #[test]
    fn test_fallback_two_word_overlap_is_too_short() {
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&text_only("alpha beta gamma delta"));

        // Only a 2-word overlap: below the 3-word minimum, emit everything.
        let delta = reconciler.reconcile(&text_only("gamma delta epsilon zeta"));
        assert_eq!(delta.as_deref(), Some("gamma delta epsilon zeta"));
    }

    #[test]
    fn test_fallback_boundary_alignment() {
        // The new prefix appears inside the previous tail but not as a
        // strict suffix; the narrower check still finds it.
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&text_only("we saw red green blue and then"));

        let delta = reconciler.reconcile(&text_only("red green blue again today"));
        assert_eq!(delta.as_deref(), Some("again today"));
    }

    #[test]
    fn test_fallback_preserves_original_casing() {
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&text_only("we went to New York City"));

        let delta = reconciler.reconcile(&text_only("new york city was Amazing Today"));
        assert_eq!(delta.as_deref(), Some("was Amazing Today"));
    }

    #[test]
    fn test_reset_clears_state() {
        let mut reconciler = Reconciler::new();
        reconciler.reconcile(&with_segments(vec![segment(0.0, 3.0, "hello world")]));
        assert_eq!(reconciler.watermark(), 3.0);

        reconciler.reset();
        assert_eq!(reconciler.watermark(), 0.0);

        // After reset the same text is new again.
        let delta = reconciler.reconcile(&text_only("hello world"));
        assert_eq!(delta.as_deref(), Some("hello world"));
    }

    #[test]
    fn test_empty_transcription_emits_nothing() {
        let mut reconciler = Reconciler::new();
        assert!(reconciler.reconcile(&text_only("")).is_none());
        assert!(reconciler.reconcile(&text_only("   ")).is_none());
    }

    #[test]
    fn test_numeral_mapping_bounds() {
        assert_eq!(numeral_to_word("0"), Some("zero"));
        assert_eq!(numeral_to_word("20"), Some("twenty"));
        // Above 20: compared as literal digits, deliberately unmapped.
        assert_eq!(numeral_to_word("21"), None);
        assert_eq!(numeral_to_word("100"), None);
        assert_eq!(numeral_to_word("abc"), None);
    }

    #[test]
    fn test_normalize_word() {
        assert_eq!(normalize_word("Hello,"), "hello");
        assert_eq!(normalize_word("don't"), "dont");
        assert_eq!(normalize_word("5"), "five");
        assert_eq!(normalize_word("42"), "42");
        assert_eq!(normalize_word("—"), "");
    }
}
