//! Inline color directive markup: `[colorname]text[-]`.
//!
//! A directive is `[` name `]` where the name is `-` (reset) or a color known to
//! [`crate::colors`]. Bracketed text that is not a directive is literal. A
//! directive-shaped literal is escaped by adding one `[` before the closing
//! bracket: `[red[]` renders as `[red]`, `[red[[]` as `[red[]`, and so on.

use std::borrow::Cow;

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span, Text};

use crate::colors::{canonical_color_name, terminal_color};

pub const RESET: &str = "[-]";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Text(Cow<'a, str>),
    /// `None` resets to the default color.
    Directive(Option<&'static str>),
}

/// Splits `[name[[[` into the name and the number of trailing `[`, when the
/// name is a directive name.
fn directive_inner(inner: &str) -> Option<(&str, usize)> {
    let name = inner.trim_end_matches('[');
    let extra = inner.len() - name.len();
    if name == "-" {
        return Some((name, extra));
    }
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphabetic() || b == b'_') {
        return None;
    }
    canonical_color_name(name).map(|_| (name, extra))
}

fn tokenize(markup: &str) -> Vec<Token<'_>> {
    let bytes = markup.as_bytes();
    let mut out = Vec::new();
    let mut text_start = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        let Some(close) = markup[i + 1..].find(']').map(|offset| i + 1 + offset) else {
            break;
        };
        let Some((name, extra)) = directive_inner(&markup[i + 1..close]) else {
            i += 1;
            continue;
        };

        if text_start < i {
            out.push(Token::Text(Cow::Borrowed(&markup[text_start..i])));
        }
        if extra == 0 {
            let color = if name == "-" { None } else { canonical_color_name(name) };
            out.push(Token::Directive(color));
        } else {
            let mut literal = String::with_capacity(name.len() + extra + 1);
            literal.push('[');
            literal.push_str(name);
            literal.extend(std::iter::repeat('[').take(extra - 1));
            literal.push(']');
            out.push(Token::Text(Cow::Owned(literal)));
        }
        i = close + 1;
        text_start = i;
    }

    if text_start < markup.len() {
        out.push(Token::Text(Cow::Borrowed(&markup[text_start..])));
    }
    out
}

/// Escape text so that it renders verbatim.
pub fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains('[') {
        return Cow::Borrowed(text);
    }
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len() + 8);
    let mut copied = 0usize;
    let mut i = 0usize;

    while i < bytes.len() {
        if bytes[i] != b'[' {
            i += 1;
            continue;
        }
        let Some(close) = text[i + 1..].find(']').map(|offset| i + 1 + offset) else {
            break;
        };
        if directive_inner(&text[i + 1..close]).is_none() {
            i += 1;
            continue;
        }
        out.push_str(&text[copied..close]);
        out.push_str("[]");
        i = close + 1;
        copied = i;
    }

    if copied == 0 {
        return Cow::Borrowed(text);
    }
    out.push_str(&text[copied..]);
    Cow::Owned(out)
}

/// Wrap `text` in a color directive; `text` is escaped.
pub fn wrap(color: &str, text: &str, out: &mut String) {
    out.push('[');
    out.push_str(color);
    out.push(']');
    out.push_str(&escape(text));
    out.push_str(RESET);
}

/// The visible text of `markup`, with every directive removed.
pub fn strip_directives(markup: &str) -> String {
    let mut out = String::with_capacity(markup.len());
    for token in tokenize(markup) {
        if let Token::Text(text) = token {
            out.push_str(&text);
        }
    }
    out
}

/// A run of visible text with one color.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub color: Option<Color>,
}

/// Parse markup into visible lines of colored segments.
pub fn parse_lines(markup: &str) -> Vec<Vec<Segment>> {
    let mut lines: Vec<Vec<Segment>> = vec![Vec::new()];
    let mut color: Option<Color> = None;

    for token in tokenize(markup) {
        match token {
            Token::Directive(name) => color = name.and_then(terminal_color),
            Token::Text(text) => {
                for (idx, part) in text.split('\n').enumerate() {
                    if idx > 0 {
                        lines.push(Vec::new());
                    }
                    if part.is_empty() {
                        continue;
                    }
                    if let Some(line) = lines.last_mut() {
                        match line.last_mut() {
                            Some(last) if last.color == color => last.text.push_str(part),
                            _ => line.push(Segment { text: part.to_string(), color }),
                        }
                    }
                }
            }
        }
    }

    lines
}

/// Byte range within one visible line to emphasize.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlight {
    pub line: usize,
    pub start: usize,
    pub end: usize,
}

/// Build ratatui text from parsed lines, applying an optional highlight.
///
/// The highlighted line is bold; the highlighted range is also reversed.
pub fn to_text(lines: &[Vec<Segment>], base: Style, highlight: Option<Highlight>) -> Text<'static> {
    let text_lines = lines
        .iter()
        .enumerate()
        .map(|(idx, segments)| match highlight {
            Some(highlight) if highlight.line == idx => highlighted_line(segments, base, highlight),
            _ => Line::from(
                segments
                    .iter()
                    .map(|segment| Span::styled(segment.text.clone(), segment_style(segment, base)))
                    .collect::<Vec<_>>(),
            ),
        })
        .collect::<Vec<_>>();
    Text::from(text_lines)
}

fn segment_style(segment: &Segment, base: Style) -> Style {
    match segment.color {
        Some(color) => base.fg(color),
        None => base,
    }
}

fn highlighted_line(segments: &[Segment], base: Style, highlight: Highlight) -> Line<'static> {
    let line_style = base.add_modifier(Modifier::BOLD);
    let match_style = line_style.add_modifier(Modifier::REVERSED);
    let mut spans = Vec::new();
    let mut offset = 0usize;

    for segment in segments {
        let style = segment_style(segment, line_style);
        let seg_start = offset;
        let seg_end = offset + segment.text.len();
        offset = seg_end;

        let hl_start = highlight.start.clamp(seg_start, seg_end) - seg_start;
        let hl_end = highlight.end.clamp(seg_start, seg_end) - seg_start;
        let text = segment.text.as_str();
        if hl_start >= hl_end || !text.is_char_boundary(hl_start) || !text.is_char_boundary(hl_end)
        {
            spans.push(Span::styled(text.to_string(), style));
            continue;
        }
        if hl_start > 0 {
            spans.push(Span::styled(text[..hl_start].to_string(), style));
        }
        spans.push(Span::styled(text[hl_start..hl_end].to_string(), style.patch(match_style)));
        if hl_end < text.len() {
            spans.push(Span::styled(text[hl_end..].to_string(), style));
        }
    }

    Line::from(spans)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn strips_color_and_reset_directives() {
        assert_eq!(strip_directives("[blue]\"a\"[-]: [yellow]1[-]"), "\"a\": 1");
    }

    #[rstest]
    #[case("[not a tag]")]
    #[case("[]")]
    #[case("[red")]
    #[case("x]y[")]
    #[case("[chartreuse]")]
    fn non_directive_brackets_are_literal(#[case] input: &str) {
        assert_eq!(strip_directives(input), input);
    }

    #[rstest]
    #[case("[red]")]
    #[case("[-]")]
    #[case("[red[]")]
    #[case("[[blue]]")]
    #[case("see [Light_Green] and [-] here")]
    #[case("no brackets")]
    fn escape_then_strip_is_identity(#[case] input: &str) {
        let escaped = escape(input);
        assert_eq!(strip_directives(&escaped), input, "escaped form: {escaped}");
    }

    #[test]
    fn escape_borrows_when_nothing_to_do() {
        assert!(matches!(escape("plain [text]"), Cow::Borrowed(_)));
        assert!(matches!(escape("[red]"), Cow::Owned(_)));
        assert_eq!(escape("[red]"), "[red[]");
    }

    #[test]
    fn parse_lines_tracks_color_across_segments() {
        let lines = parse_lines("{\n  [blue]\"k\"[-]: [red]null[-]\n}");
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1][0], Segment { text: "  ".to_string(), color: None });
        assert_eq!(lines[1][1], Segment { text: "\"k\"".to_string(), color: Some(Color::Blue) });
        assert_eq!(lines[1][2], Segment { text: ": ".to_string(), color: None });
        assert_eq!(lines[1][3], Segment { text: "null".to_string(), color: Some(Color::Red) });
    }

    #[test]
    fn to_text_splits_highlighted_range() {
        let lines = parse_lines("[green]abcdef[-]");
        let text = to_text(&lines, Style::default(), Some(Highlight { line: 0, start: 2, end: 4 }));
        let spans = &text.lines[0].spans;
        assert_eq!(spans.len(), 3);
        assert_eq!(spans[0].content, "ab");
        assert_eq!(spans[1].content, "cd");
        assert!(spans[1].style.add_modifier.contains(Modifier::REVERSED));
        assert_eq!(spans[1].style.fg, Some(Color::Green));
        assert_eq!(spans[2].content, "ef");
        assert!(!spans[2].style.add_modifier.contains(Modifier::REVERSED));
    }

    #[test]
    fn highlight_spanning_segments() {
        let lines = parse_lines("[blue]\"k\"[-]: 1");
        let text = to_text(&lines, Style::default(), Some(Highlight { line: 0, start: 1, end: 4 }));
        let reversed: String = text.lines[0]
            .spans
            .iter()
            .filter(|span| span.style.add_modifier.contains(Modifier::REVERSED))
            .map(|span| span.content.as_ref())
            .collect();
        assert_eq!(reversed, "k\":");
    }
}
