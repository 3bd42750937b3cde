use crate::models::Citation;
use crate::normalize::{char_prefix, normalize};
use aho_corasick::AhoCorasickBuilder;

// ============================================================================
// Citation Reconciliation Engine
// ============================================================================

/// Expected text shorter than this never goes through the normalized-probe
/// relocation; the bounded window scan still runs.
const FUZZY_MIN_EXPECTED_CHARS: usize = 20;
/// Normalized prefix of the expected text used to locate the citation.
const PROBE_CHARS: usize = 100;
/// Raw-text chars searched either side of an estimated location.
const WINDOW_CHARS: usize = 500;
/// Literal needle length for the window scan.
const NEEDLE_CHARS: usize = 50;

/// Result of validating or repairing one citation span. All offsets are
/// character indices into the supplied document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileOutcome {
    pub start_char: usize,
    pub end_char: usize,
    pub valid: bool,
}

impl ReconcileOutcome {
    fn valid(start_char: usize, end_char: usize) -> Self {
        Self {
            start_char,
            end_char,
            valid: true,
        }
    }

    fn invalid(start_char: usize, end_char: usize) -> Self {
        Self {
            start_char,
            end_char,
            valid: false,
        }
    }
}

/// Validate a citation's recorded character span against the live document
/// text, repairing it when the offsets have drifted.
///
/// Deterministic and side-effect free; identical inputs always produce the
/// identical outcome. Never panics: every failure path returns
/// `valid = false` so the caller can fall back to unhighlighted text.
pub fn reconcile(full_text: &str, citation: &Citation) -> ReconcileOutcome {
    let expected = citation.text.as_str();
    let start = citation.source.start_char;
    let end = citation.source.end_char;

    let chars: Vec<char> = full_text.chars().collect();
    if start >= end || end > chars.len() {
        return ReconcileOutcome::invalid(start, end);
    }

    let candidate: String = chars[start..end].iter().collect();
    if spans_match(&candidate, expected) {
        return ReconcileOutcome::valid(start, end);
    }

    // Small drift: the exact text often sits within a few hundred characters
    // of where it was recorded.
    if let Some(found) = relocate_in_window(&chars, start, expected, expected) {
        return found;
    }

    // Larger drift: estimate the location from the normalized text, then
    // confirm with a literal scan around the estimate.
    if expected.chars().count() > FUZZY_MIN_EXPECTED_CHARS {
        if let Some(found) = fuzzy_relocate(full_text, &chars, expected) {
            return found;
        }
    }

    ReconcileOutcome::invalid(start, end)
}

/// Normalized equality, tolerating minor truncation or expansion on either
/// side via a 50-character containment check.
fn spans_match(candidate: &str, expected: &str) -> bool {
    let norm_candidate = normalize(candidate);
    let norm_expected = normalize(expected);
    if norm_candidate == norm_expected {
        return true;
    }
    let candidate_prefix = char_prefix(&norm_candidate, NEEDLE_CHARS);
    let expected_prefix = char_prefix(&norm_expected, NEEDLE_CHARS);
    (!expected_prefix.is_empty() && norm_candidate.contains(&expected_prefix))
        || (!candidate_prefix.is_empty() && norm_expected.contains(&candidate_prefix))
}

fn fuzzy_relocate(full_text: &str, chars: &[char], expected: &str) -> Option<ReconcileOutcome> {
    let probe = normalize(&char_prefix(expected, PROBE_CHARS));
    if probe.is_empty() {
        return None;
    }

    let norm_full = normalize(full_text);
    let probe_byte_idx = norm_full.find(&probe)?;
    let probe_char_idx = norm_full[..probe_byte_idx].chars().count();
    let norm_len = norm_full.chars().count();
    if norm_len == 0 {
        return None;
    }

    // Normalization only removes characters, so scaling the normalized index
    // by the length ratio gives a usable raw-text estimate.
    let estimate = probe_char_idx * chars.len() / norm_len;
    let needle = char_prefix(expected, NEEDLE_CHARS);
    relocate_in_window(chars, estimate, &needle, expected)
}

/// Case-insensitive literal scan for `needle` within ±`WINDOW_CHARS` of
/// `center`; on a hit, the span is recomputed from the match position and the
/// expected text's length.
fn relocate_in_window(
    chars: &[char],
    center: usize,
    needle: &str,
    expected: &str,
) -> Option<ReconcileOutcome> {
    if needle.is_empty() {
        return None;
    }
    let win_start = center.saturating_sub(WINDOW_CHARS);
    let win_end = (center + WINDOW_CHARS).min(chars.len());
    if win_start >= win_end {
        return None;
    }
    let window: String = chars[win_start..win_end].iter().collect();

    let finder = AhoCorasickBuilder::new()
        .ascii_case_insensitive(true)
        .build([needle])
        .ok()?;
    let hit = finder.find(&window)?;

    let hit_char_offset = window[..hit.start()].chars().count();
    let start = win_start + hit_char_offset;
    let end = (start + expected.chars().count()).min(chars.len());
    if start >= end {
        return None;
    }
    Some(ReconcileOutcome::valid(start, end))
}

// ============================================================================
// Highlight-aware Paragraph Segmentation
// ============================================================================

/// Split text into paragraph segments at blank lines, except that a boundary
/// falling strictly inside the highlight span is suppressed and the straddled
/// paragraphs are merged, so a highlight marker is never split across two
/// rendered blocks.
pub fn segment_paragraphs(text: &str, highlight: Option<(usize, usize)>) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '\n' && i + 1 < chars.len() && chars[i + 1] == '\n' {
            let suppressed = matches!(highlight, Some((start, end)) if i > start && i < end);
            if suppressed {
                current.push_str("\n\n");
            } else {
                segments.push(std::mem::take(&mut current));
            }
            i += 2;
        } else {
            current.push(chars[i]);
            i += 1;
        }
    }

    if !current.is_empty() {
        segments.push(current);
    }
    segments
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CitationSource;

    fn citation(text: &str, start: usize, end: usize) -> Citation {
        Citation {
            id: "c1".to_string(),
            text: text.to_string(),
            source: CitationSource {
                document_id: "doc-1".to_string(),
                title: "Handbook".to_string(),
                page_number: None,
                coordinates: None,
                start_char: start,
                end_char: end,
            },
        }
    }

    #[test]
    fn test_round_trip_when_offsets_are_correct() {
        let full = "Operators must file Form 7 within thirty days of any change.";
        let expected: String = full.chars().skip(10).take(20).collect();
        let outcome = reconcile(full, &citation(&expected, 10, 30));
        assert_eq!(outcome, ReconcileOutcome::valid(10, 30));
    }

    #[test]
    fn test_bounds_failure_is_invalid() {
        let full = "short text";
        assert!(!reconcile(full, &citation("short", 5, 3)).valid);
        assert!(!reconcile(full, &citation("short", 3, 3)).valid);
        assert!(!reconcile(full, &citation("short", 0, 999)).valid);
    }

    #[test]
    fn test_whitespace_and_case_drift_still_valid() {
        let full = "The   Operator\nMUST retain records.";
        // Same span, differently normalized recording.
        let outcome = reconcile(full, &citation("the operator must", 0, 19));
        assert!(outcome.valid);
        assert_eq!((outcome.start_char, outcome.end_char), (0, 19));
    }

    #[test]
    fn test_minor_truncation_tolerated() {
        let full = "A licensee shall notify the commission before transfer of control.";
        // Recorded span is a little wider than the expected text.
        let outcome = reconcile(full, &citation("licensee shall notify the commission", 2, 45));
        assert!(outcome.valid);
    }

    #[test]
    fn test_shifted_offsets_relocated() {
        // Scenario: recorded span [10, 20) but the true text sits at [15, 25).
        let full = "0123456789abcdeThe rule applies statewide from January.";
        let expected: String = full.chars().skip(15).take(10).collect();
        let outcome = reconcile(full, &citation(&expected, 10, 20));
        assert_eq!(outcome, ReconcileOutcome::valid(15, 25));
        let relocated: String = full
            .chars()
            .skip(outcome.start_char)
            .take(outcome.end_char - outcome.start_char)
            .collect();
        assert_eq!(normalize(&relocated), normalize(&expected));
    }

    #[test]
    fn test_fuzzy_recovery_after_large_shift() {
        // Unrelated padding inserted before the citation shifts the true
        // location far outside the recorded offsets and the nearby window.
        let padding = "lorem ipsum filler text. ".repeat(100);
        let expected = "The operator shall maintain continuous records of emissions.";
        let full = format!("{}{}And further provisions follow here.", padding, expected);

        let outcome = reconcile(&full, &citation(expected, 5, 5 + expected.chars().count()));
        assert!(outcome.valid);
        let relocated: String = full
            .chars()
            .skip(outcome.start_char)
            .take(outcome.end_char - outcome.start_char)
            .collect();
        assert_eq!(normalize(&relocated), normalize(expected));
    }

    #[test]
    fn test_unfindable_text_fails_closed() {
        let full = "Completely unrelated document text with no overlap whatsoever here.";
        let expected = "This sentence appears nowhere in the supplied document body.";
        let outcome = reconcile(full, &citation(expected, 0, 10));
        assert!(!outcome.valid);
        // Original offsets are echoed back for the caller's plain rendering.
        assert_eq!((outcome.start_char, outcome.end_char), (0, 10));
    }

    #[test]
    fn test_determinism() {
        let full = "Repeatable inputs produce repeatable outputs, every single time.";
        let cite = citation("repeatable outputs", 19, 37);
        let first = reconcile(full, &cite);
        let second = reconcile(full, &cite);
        assert_eq!(first, second);
    }

    #[test]
    fn test_segment_paragraphs_plain() {
        let text = "first paragraph\n\nsecond paragraph\n\nthird";
        assert_eq!(
            segment_paragraphs(text, None),
            vec!["first paragraph", "second paragraph", "third"]
        );
    }

    #[test]
    fn test_segment_boundary_inside_highlight_suppressed() {
        let text = "first paragraph\n\nsecond paragraph\n\nthird";
        // Highlight spans chars 10..20, straddling the first boundary at 15.
        let segments = segment_paragraphs(text, Some((10, 20)));
        assert_eq!(
            segments,
            vec!["first paragraph\n\nsecond paragraph", "third"]
        );
    }

    #[test]
    fn test_segment_boundary_outside_highlight_kept() {
        let text = "first paragraph\n\nsecond paragraph";
        // Highlight entirely within the first paragraph.
        let segments = segment_paragraphs(text, Some((0, 5)));
        assert_eq!(segments, vec!["first paragraph", "second paragraph"]);
    }

    #[test]
    fn test_segment_empty_text() {
        assert!(segment_paragraphs("", None).is_empty());
    }
}
