use crate::models::Citation;

// ============================================================================
// Citation Reference Linker
// ============================================================================

const CITATION_PREFIX: &str = "Citation ";

/// One piece of answer prose after reference linking. Concatenating the
/// segments (references rendered as their display labels) reproduces the
/// input text exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerSegment {
    Text(String),
    Reference {
        /// Zero-based index into the citation list.
        citation_index: usize,
        /// The full original token text, e.g. "2(3)(a)", not just the
        /// leading integer.
        display_label: String,
    },
}

impl AnswerSegment {
    pub fn rendered(&self) -> &str {
        match self {
            AnswerSegment::Text(text) => text,
            AnswerSegment::Reference { display_label, .. } => display_label,
        }
    }
}

/// Resolve inline bracket references like `[1]`, `[1, 2]`, `[Citation 3]`,
/// or legal-style `[2(3)(a), 4]` against the citation list.
///
/// Tokens whose leading integer falls outside the citation list degrade to
/// plain text; the surrounding prose is never altered or dropped.
pub fn linkify(answer_text: &str, citations: &[Citation]) -> Vec<AnswerSegment> {
    let mut segments = Vec::new();
    let mut plain = String::new();
    let chars: Vec<char> = answer_text.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        if chars[i] == '[' {
            if let Some(close) = find_close(&chars, i) {
                let inner: String = chars[i + 1..close].iter().collect();
                if let Some(group) = parse_group(&inner) {
                    flush(&mut segments, &mut plain);
                    emit_group(&mut segments, group, citations);
                    i = close + 1;
                    continue;
                }
            }
        }
        plain.push(chars[i]);
        i += 1;
    }

    flush(&mut segments, &mut plain);
    segments
}

fn flush(segments: &mut Vec<AnswerSegment>, plain: &mut String) {
    if !plain.is_empty() {
        segments.push(AnswerSegment::Text(std::mem::take(plain)));
    }
}

fn find_close(chars: &[char], open: usize) -> Option<usize> {
    chars[open + 1..]
        .iter()
        .position(|&c| c == ']')
        .map(|off| open + 1 + off)
}

struct ReferenceGroup {
    prefixed: bool,
    /// Raw comma-separated pieces, whitespace intact, so the original text
    /// can be reproduced exactly.
    pieces: Vec<String>,
}

/// Accept the bracket interior only when every comma-separated token starts
/// with an integer, optionally followed by a parenthesized sub-reference
/// suffix like `(3)(a)`. Anything else is left as prose.
fn parse_group(inner: &str) -> Option<ReferenceGroup> {
    let (prefixed, body) = match inner.strip_prefix(CITATION_PREFIX) {
        Some(rest) => (true, rest),
        None => (false, inner),
    };

    let pieces: Vec<String> = body.split(',').map(str::to_string).collect();
    if pieces.iter().any(|p| !is_reference_token(p.trim())) {
        return None;
    }
    Some(ReferenceGroup { prefixed, pieces })
}

fn is_reference_token(token: &str) -> bool {
    let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
    if digits.is_empty() {
        return false;
    }
    let suffix = &token[digits.len()..];
    suffix.is_empty() || is_sub_reference(suffix)
}

/// One or more `(...)` groups, non-empty, no nesting.
fn is_sub_reference(suffix: &str) -> bool {
    let mut rest = suffix;
    while !rest.is_empty() {
        let Some(inner) = rest.strip_prefix('(') else {
            return false;
        };
        let Some(close) = inner.find(')') else {
            return false;
        };
        if close == 0 || inner[..close].contains('(') {
            return false;
        }
        rest = &inner[close + 1..];
    }
    true
}

fn leading_integer(token: &str) -> Option<usize> {
    let digits: String = token.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn emit_group(segments: &mut Vec<AnswerSegment>, group: ReferenceGroup, citations: &[Citation]) {
    let mut plain = String::from("[");
    if group.prefixed {
        plain.push_str(CITATION_PREFIX);
    }

    for (pos, piece) in group.pieces.iter().enumerate() {
        if pos > 0 {
            plain.push(',');
        }
        let token = piece.trim();
        let leading_ws = &piece[..piece.len() - piece.trim_start().len()];
        let trailing_ws = &piece[piece.trim_end().len()..];
        plain.push_str(leading_ws);

        let index = leading_integer(token).and_then(|n| n.checked_sub(1));
        match index {
            Some(idx) if idx < citations.len() => {
                flush(segments, &mut plain);
                segments.push(AnswerSegment::Reference {
                    citation_index: idx,
                    display_label: token.to_string(),
                });
            }
            _ => {
                // Out of range: the token stays verbatim, never a link.
                plain.push_str(token);
            }
        }
        plain.push_str(trailing_ws);
    }

    plain.push(']');
    flush(segments, &mut plain);
}

// ============================================================================
// Markup Tree Transform
// ============================================================================

/// Minimal rendered-markup tree. Reference linking is a pure transform over
/// this shape, shared by every rendering context instead of being
/// re-implemented per view.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Text(String),
    Element { tag: String, children: Vec<Node> },
    Reference {
        citation_index: usize,
        display_label: String,
    },
}

/// Replace citation tokens found in `Text` nodes with typed reference nodes,
/// preserving the tree shape everywhere else.
pub fn link_tree(node: Node, citations: &[Citation]) -> Node {
    match node {
        Node::Text(text) => {
            let segments = linkify(&text, citations);
            let mut nodes: Vec<Node> = segments
                .into_iter()
                .map(|segment| match segment {
                    AnswerSegment::Text(t) => Node::Text(t),
                    AnswerSegment::Reference {
                        citation_index,
                        display_label,
                    } => Node::Reference {
                        citation_index,
                        display_label,
                    },
                })
                .collect();
            match nodes.pop() {
                Some(only) if nodes.is_empty() => only,
                Some(last) => {
                    nodes.push(last);
                    Node::Element {
                        tag: "span".to_string(),
                        children: nodes,
                    }
                }
                None => Node::Text(String::new()),
            }
        }
        Node::Element { tag, children } => Node::Element {
            tag,
            children: children
                .into_iter()
                .map(|child| link_tree(child, citations))
                .collect(),
        },
        reference @ Node::Reference { .. } => reference,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CitationSource;

    fn citations(n: usize) -> Vec<Citation> {
        (0..n)
            .map(|i| Citation {
                id: format!("c{}", i + 1),
                text: format!("citation text {}", i + 1),
                source: CitationSource {
                    document_id: "doc-1".to_string(),
                    title: "Handbook".to_string(),
                    page_number: None,
                    coordinates: None,
                    start_char: 0,
                    end_char: 10,
                },
            })
            .collect()
    }

    fn rendered(segments: &[AnswerSegment]) -> String {
        segments.iter().map(|s| s.rendered()).collect()
    }

    #[test]
    fn test_empty_inputs_pass_through() {
        assert!(linkify("", &citations(2)).is_empty());

        let segments = linkify("The rule requires X [1].", &[]);
        assert_eq!(rendered(&segments), "The rule requires X [1].");
        assert!(segments
            .iter()
            .all(|s| matches!(s, AnswerSegment::Text(_))));
    }

    #[test]
    fn test_single_reference_resolves() {
        let segments = linkify("The rule requires X [1].", &citations(2));
        assert_eq!(rendered(&segments), "The rule requires X [1].");
        let reference = segments
            .iter()
            .find(|s| matches!(s, AnswerSegment::Reference { .. }))
            .unwrap();
        assert_eq!(
            reference,
            &AnswerSegment::Reference {
                citation_index: 0,
                display_label: "1".to_string()
            }
        );
    }

    #[test]
    fn test_multi_token_group() {
        let segments = linkify("See [1, 2] for details.", &citations(3));
        assert_eq!(rendered(&segments), "See [1, 2] for details.");
        let indices: Vec<usize> = segments
            .iter()
            .filter_map(|s| match s {
                AnswerSegment::Reference { citation_index, .. } => Some(*citation_index),
                _ => None,
            })
            .collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn test_citation_prefixed_group() {
        let segments = linkify("As held in [Citation 3].", &citations(3));
        assert_eq!(rendered(&segments), "As held in [Citation 3].");
        assert!(segments.contains(&AnswerSegment::Reference {
            citation_index: 2,
            display_label: "3".to_string()
        }));
    }

    #[test]
    fn test_legal_sub_reference_suffix() {
        let segments = linkify("Under [2(3)(a), 4] this applies.", &citations(4));
        assert_eq!(rendered(&segments), "Under [2(3)(a), 4] this applies.");
        // The display label keeps the full token, the index only the leading
        // integer.
        assert!(segments.contains(&AnswerSegment::Reference {
            citation_index: 1,
            display_label: "2(3)(a)".to_string()
        }));
        assert!(segments.contains(&AnswerSegment::Reference {
            citation_index: 3,
            display_label: "4".to_string()
        }));
    }

    #[test]
    fn test_out_of_range_token_stays_plain() {
        let segments = linkify("See [1, 7].", &citations(2));
        assert_eq!(rendered(&segments), "See [1, 7].");
        let references: Vec<_> = segments
            .iter()
            .filter(|s| matches!(s, AnswerSegment::Reference { .. }))
            .collect();
        assert_eq!(references.len(), 1);
        // The out-of-range token is reproduced inside plain text.
        assert!(segments
            .iter()
            .any(|s| matches!(s, AnswerSegment::Text(t) if t.contains('7'))));
    }

    #[test]
    fn test_zero_is_out_of_range() {
        let segments = linkify("Bad [0].", &citations(2));
        assert_eq!(rendered(&segments), "Bad [0].");
        assert!(segments
            .iter()
            .all(|s| matches!(s, AnswerSegment::Text(_))));
    }

    #[test]
    fn test_non_reference_brackets_untouched() {
        for text in ["array[i] access", "see [below]", "empty [] brackets", "[1a]"] {
            let segments = linkify(text, &citations(5));
            assert_eq!(rendered(&segments), text);
            assert!(
                segments.iter().all(|s| matches!(s, AnswerSegment::Text(_))),
                "unexpected reference in {:?}",
                text
            );
        }
    }

    #[test]
    fn test_unclosed_bracket_untouched() {
        let segments = linkify("dangling [1", &citations(2));
        assert_eq!(rendered(&segments), "dangling [1");
    }

    #[test]
    fn test_concatenation_equals_input() {
        let text = "Intro [1] middle [Citation 2] tail [9] end [2(3)(a)].";
        assert_eq!(rendered(&linkify(text, &citations(3))), text);
    }

    #[test]
    fn test_link_tree_preserves_shape() {
        let tree = Node::Element {
            tag: "p".to_string(),
            children: vec![
                Node::Text("See [1] here.".to_string()),
                Node::Element {
                    tag: "em".to_string(),
                    children: vec![Node::Text("and [2] there".to_string())],
                },
            ],
        };

        let linked = link_tree(tree, &citations(2));
        let Node::Element { tag, children } = linked else {
            panic!("expected element root");
        };
        assert_eq!(tag, "p");
        assert_eq!(children.len(), 2);

        // First child expands into a span wrapping text + reference nodes.
        let Node::Element { ref children, .. } = children[0] else {
            panic!("expected expanded span");
        };
        assert!(children
            .iter()
            .any(|n| matches!(n, Node::Reference { citation_index: 0, .. })));
    }

    #[test]
    fn test_link_tree_plain_text_stays_text() {
        let linked = link_tree(Node::Text("no references here".to_string()), &citations(1));
        assert_eq!(linked, Node::Text("no references here".to_string()));
    }
}
