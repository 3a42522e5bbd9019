// Message content formatting: **bold** spans and leading "* " bullets.

use std::borrow::Cow;

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Anchored at column 0: an indented bullet is left untouched.
    static ref BULLET_MARKER: Regex = Regex::new(r"^\*\s").unwrap();
    static ref BOLD_SPAN: Regex = Regex::new(r"\*\*(.*?)\*\*").unwrap();
}

/// One atomic unit of formatted output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplaySegment {
    Text(String),
    Emphasis(String),
    LineBreak,
}

/// Turn raw message content into display segments.
///
/// Per line: a leading `* ` bullet marker becomes `-> `, then every
/// non-greedy `**...**` span becomes an `Emphasis` segment with the
/// delimiters stripped. Unterminated `**` stays literal text. Lines are
/// joined by `LineBreak` segments; the last line gets no trailing break.
pub fn format_content(content: &str) -> Vec<DisplaySegment> {
    let lines: Vec<&str> = content.split('\n').collect();
    let mut segments = Vec::new();

    for (i, raw) in lines.iter().enumerate() {
        let line: Cow<'_, str> = if raw.trim().starts_with("* ") {
            BULLET_MARKER.replace(raw, "-> ")
        } else {
            Cow::Borrowed(raw)
        };

        push_line_segments(&line, &mut segments);

        if i + 1 < lines.len() {
            segments.push(DisplaySegment::LineBreak);
        }
    }

    segments
}

fn push_line_segments(line: &str, out: &mut Vec<DisplaySegment>) {
    let mut cursor = 0;
    let mut matched = false;

    for caps in BOLD_SPAN.captures_iter(line) {
        matched = true;
        let span = caps.get(0).unwrap();
        // Gap segments are kept even when empty so adjacent spans stay
        // distinguishable from a single merged one.
        out.push(DisplaySegment::Text(line[cursor..span.start()].to_string()));
        out.push(DisplaySegment::Emphasis(caps[1].to_string()));
        cursor = span.end();
    }

    if matched {
        out.push(DisplaySegment::Text(line[cursor..].to_string()));
    } else if !line.is_empty() {
        out.push(DisplaySegment::Text(line.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DisplaySegment::{Emphasis, LineBreak, Text};

    fn text(s: &str) -> DisplaySegment {
        Text(s.to_string())
    }

    fn emphasis(s: &str) -> DisplaySegment {
        Emphasis(s.to_string())
    }

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(format_content("hello world"), vec![text("hello world")]);
    }

    #[test]
    fn bold_span_becomes_emphasis() {
        let segments = format_content("**bold**");
        assert_eq!(segments, vec![text(""), emphasis("bold"), text("")]);
        assert!(segments
            .iter()
            .all(|s| !matches!(s, Text(t) if !t.is_empty())));
    }

    #[test]
    fn bold_span_interleaves_with_text() {
        assert_eq!(
            format_content("say **hi** now"),
            vec![text("say "), emphasis("hi"), text(" now")]
        );
    }

    #[test]
    fn adjacent_spans_keep_empty_gaps() {
        assert_eq!(
            format_content("**a****b**"),
            vec![text(""), emphasis("a"), text(""), emphasis("b"), text("")]
        );
    }

    #[test]
    fn unterminated_delimiter_stays_literal() {
        assert_eq!(format_content("**a"), vec![text("**a")]);
        // Odd delimiter count: the last ** has no partner.
        assert_eq!(
            format_content("**a** and **b"),
            vec![text(""), emphasis("a"), text(" and **b")]
        );
    }

    #[test]
    fn leading_bullet_becomes_arrow() {
        assert_eq!(format_content("* item"), vec![text("-> item")]);
    }

    #[test]
    fn only_first_marker_is_replaced() {
        assert_eq!(format_content("* a * b"), vec![text("-> a * b")]);
    }

    #[test]
    fn indented_bullet_is_untouched() {
        // The trimmed check passes but the anchored replacement does not fire.
        assert_eq!(format_content("  * item"), vec![text("  * item")]);
    }

    #[test]
    fn bullet_line_still_formats_bold() {
        assert_eq!(
            format_content("* **key** point"),
            vec![text("-> "), emphasis("key"), text(" point")]
        );
    }

    #[test]
    fn lines_are_joined_by_breaks_without_trailing_break() {
        assert_eq!(
            format_content("a\nb"),
            vec![text("a"), LineBreak, text("b")]
        );
    }

    #[test]
    fn trailing_newline_emits_break_but_no_segment() {
        assert_eq!(format_content("a\n"), vec![text("a"), LineBreak]);
    }

    #[test]
    fn blank_interior_line_emits_only_breaks() {
        assert_eq!(
            format_content("a\n\nb"),
            vec![text("a"), LineBreak, LineBreak, text("b")]
        );
    }

    #[test]
    fn empty_input_yields_no_segments() {
        assert_eq!(format_content(""), Vec::<DisplaySegment>::new());
    }

    #[test]
    fn formatting_is_deterministic() {
        let input = "* **a**\ntext **b** more\n**c";
        assert_eq!(format_content(input), format_content(input));
    }
}
