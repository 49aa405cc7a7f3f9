//! JSON syntax colorizer.
//!
//! A single left-to-right scan classifies every token by its syntactic position
//! (object key, object value, array element) and writes it wrapped in a color
//! directive. Punctuation and whitespace are copied uncolored. The visible text
//! of the output is always identical to the input, so
//! `markup::strip_directives(&colorize(x)) == x`.

use crate::colors::ColorTheme;
use crate::markup;

/// Token categories that receive a color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Key,
    String,
    ArrayString,
    Number,
    ArrayNumber,
    Bool,
    Null,
    Other,
}

impl Category {
    fn color(self, theme: &ColorTheme) -> Option<&'static str> {
        match self {
            Self::Key => Some(theme.key),
            Self::String => Some(theme.string),
            Self::ArrayString => Some(theme.array_string),
            Self::Number => Some(theme.number),
            Self::ArrayNumber => Some(theme.array_number),
            Self::Bool => Some(theme.boolean),
            Self::Null => Some(theme.null),
            Self::Other => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ObjectPhase {
    KeyOrEnd,
    Colon,
    Value,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ArrayPhase {
    ValueOrEnd,
    CommaOrEnd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Object(ObjectPhase),
    Array(ArrayPhase),
}

fn after_value(context: &mut [Context]) {
    match context.last_mut() {
        Some(Context::Object(phase)) if *phase == ObjectPhase::Value => {
            *phase = ObjectPhase::CommaOrEnd;
        }
        Some(Context::Array(phase)) if *phase == ArrayPhase::ValueOrEnd => {
            *phase = ArrayPhase::CommaOrEnd;
        }
        _ => {}
    }
}

fn in_array(context: &[Context]) -> bool {
    matches!(context.last(), Some(Context::Array(_)))
}

/// Length of a number starting at `start`: optional sign, integer or decimal
/// mantissa, optional exponent.
fn number_len(bytes: &[u8], start: usize) -> Option<usize> {
    let mut i = start;
    if i < bytes.len() && matches!(bytes[i], b'-' | b'+') {
        i += 1;
    }
    let int_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let mut digits = i - int_start;
    if i < bytes.len() && bytes[i] == b'.' {
        let frac_start = i + 1;
        let mut j = frac_start;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > frac_start {
            digits += j - frac_start;
            i = j;
        }
    }
    if digits == 0 {
        return None;
    }
    if i < bytes.len() && matches!(bytes[i], b'e' | b'E') {
        let mut j = i + 1;
        if j < bytes.len() && matches!(bytes[j], b'+' | b'-') {
            j += 1;
        }
        let exp_start = j;
        while j < bytes.len() && bytes[j].is_ascii_digit() {
            j += 1;
        }
        if j > exp_start {
            i = j;
        }
    }
    Some(i - start)
}

fn is_word_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}

/// Matches a bare word (`true`, `false`, `null`) with word boundaries.
fn word_at(bytes: &[u8], i: usize, word: &[u8]) -> bool {
    if !bytes[i..].starts_with(word) {
        return false;
    }
    let before_ok = i == 0 || !is_word_byte(bytes[i - 1]);
    let after_ok = bytes.get(i + word.len()).map_or(true, |b| !is_word_byte(*b));
    before_ok && after_ok
}

fn string_end(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    let mut escaped = false;
    while i < bytes.len() {
        let byte = bytes[i];
        if escaped {
            escaped = false;
            i += 1;
            continue;
        }
        match byte {
            b'\\' => {
                escaped = true;
                i += 1;
            }
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    i
}

/// Split `input` into classified segments covering every byte in order.
pub fn segments(input: &str) -> Vec<(Category, &str)> {
    let bytes = input.as_bytes();
    let mut i = 0usize;
    let mut out = Vec::new();
    let mut context: Vec<Context> = Vec::new();

    while i < bytes.len() {
        let start = i;
        match bytes[i] {
            b'"' => {
                i = string_end(bytes, i);
                let kind = match context.last_mut() {
                    Some(Context::Object(phase)) if *phase == ObjectPhase::KeyOrEnd => {
                        *phase = ObjectPhase::Colon;
                        Category::Key
                    }
                    _ => {
                        let kind =
                            if in_array(&context) { Category::ArrayString } else { Category::String };
                        after_value(&mut context);
                        kind
                    }
                };
                out.push((kind, &input[start..i]));
            }
            b'{' => {
                i += 1;
                out.push((Category::Other, &input[start..i]));
                context.push(Context::Object(ObjectPhase::KeyOrEnd));
            }
            b'}' => {
                i += 1;
                out.push((Category::Other, &input[start..i]));
                if matches!(context.last(), Some(Context::Object(_))) {
                    context.pop();
                    after_value(&mut context);
                }
            }
            b'[' => {
                i += 1;
                out.push((Category::Other, &input[start..i]));
                context.push(Context::Array(ArrayPhase::ValueOrEnd));
            }
            b']' => {
                i += 1;
                out.push((Category::Other, &input[start..i]));
                if matches!(context.last(), Some(Context::Array(_))) {
                    context.pop();
                    after_value(&mut context);
                }
            }
            b':' => {
                i += 1;
                out.push((Category::Other, &input[start..i]));
                if let Some(Context::Object(phase)) = context.last_mut() {
                    if *phase == ObjectPhase::Colon {
                        *phase = ObjectPhase::Value;
                    }
                }
            }
            b',' => {
                i += 1;
                out.push((Category::Other, &input[start..i]));
                match context.last_mut() {
                    Some(Context::Object(phase)) if *phase == ObjectPhase::CommaOrEnd => {
                        *phase = ObjectPhase::KeyOrEnd;
                    }
                    Some(Context::Array(phase)) if *phase == ArrayPhase::CommaOrEnd => {
                        *phase = ArrayPhase::ValueOrEnd;
                    }
                    _ => {}
                }
            }
            b'-' | b'+' | b'.' | b'0'..=b'9' if number_len(bytes, i).is_some() => {
                i += number_len(bytes, i).unwrap_or(1);
                let kind = if in_array(&context) { Category::ArrayNumber } else { Category::Number };
                out.push((kind, &input[start..i]));
                after_value(&mut context);
            }
            b't' if word_at(bytes, i, b"true") => {
                i += 4;
                out.push((Category::Bool, &input[start..i]));
                after_value(&mut context);
            }
            b'f' if word_at(bytes, i, b"false") => {
                i += 5;
                out.push((Category::Bool, &input[start..i]));
                after_value(&mut context);
            }
            b'n' if word_at(bytes, i, b"null") => {
                i += 4;
                out.push((Category::Null, &input[start..i]));
                after_value(&mut context);
            }
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                while i < bytes.len() && matches!(bytes[i], b' ' | b'\t' | b'\r' | b'\n') {
                    i += 1;
                }
                out.push((Category::Other, &input[start..i]));
            }
            _ => {
                i += input[i..].chars().next().map_or(1, char::len_utf8);
                out.push((Category::Other, &input[start..i]));
            }
        }
    }

    out
}

/// Colorize pretty-printed JSON with the default theme.
pub fn colorize(input: &str) -> String {
    colorize_with(input, &ColorTheme::default())
}

/// Colorize pretty-printed JSON. Never fails; unrecognized text is copied
/// through uncolored.
pub fn colorize_with(input: &str, theme: &ColorTheme) -> String {
    let mut out = String::with_capacity(input.len() + input.len() / 2);
    let mut plain_start: Option<usize> = None;
    let mut offset = 0usize;

    // Uncolored runs are escaped as a whole so bracket sequences split across
    // segments cannot form a directive.
    let flush = |out: &mut String, from: Option<usize>, to: usize| {
        if let Some(from) = from {
            out.push_str(&markup::escape(&input[from..to]));
        }
    };

    for (category, segment) in segments(input) {
        let start = offset;
        offset += segment.len();
        match category.color(theme) {
            Some(color) => {
                flush(&mut out, plain_start.take(), start);
                markup::wrap(color, segment, &mut out);
            }
            None => {
                plain_start.get_or_insert(start);
            }
        }
    }
    flush(&mut out, plain_start, input.len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::strip_directives;
    use rstest::rstest;

    fn sample() -> String {
        let value = serde_json::json!({
            "a": "b",
            "n": 1,
            "t": true,
            "z": null,
            "arr": ["x", "y"],
            "nums": [1, 2, 3]
        });
        serde_json::to_string_pretty(&value).expect("pretty")
    }

    #[test]
    fn wraps_each_category_in_sample_document() {
        let colored = colorize(&sample());
        for key in ["a", "n", "t", "z", "arr", "nums"] {
            assert!(colored.contains(&format!("[blue]\"{key}\"[-]: ")), "key {key}: {colored}");
        }
        assert!(colored.contains("[lightgreen]\"b\"[-]"));
        assert!(colored.contains(": [yellow]1[-]"));
        assert!(colored.contains("[lightblue]true[-]"));
        assert!(colored.contains("[red]null[-]"));
        assert!(colored.contains("[green]\"x\"[-]"));
        assert!(colored.contains("[green]\"y\"[-]"));
        for digit in ["1", "2", "3"] {
            assert!(colored.contains(&format!("    [yellow]{digit}[-]")), "{digit}: {colored}");
        }
    }

    #[test]
    fn segments_classify_keys_values_and_array_elements() {
        let json = r#"{"foo":"bar","n":1,"b":true,"z":null,"arr":["x",2],"obj":{"k":"v"}}"#;
        let segments = segments(json);
        let kind_for = |token: &str| {
            segments.iter().find(|(_, segment)| *segment == token).map(|(kind, _)| *kind)
        };

        assert_eq!(kind_for(r#""foo""#), Some(Category::Key));
        assert_eq!(kind_for(r#""bar""#), Some(Category::String));
        assert_eq!(kind_for("1"), Some(Category::Number));
        assert_eq!(kind_for("true"), Some(Category::Bool));
        assert_eq!(kind_for("null"), Some(Category::Null));
        assert_eq!(kind_for(r#""x""#), Some(Category::ArrayString));
        assert_eq!(kind_for("2"), Some(Category::ArrayNumber));
        assert_eq!(kind_for(r#""k""#), Some(Category::Key));
        assert_eq!(kind_for(r#""v""#), Some(Category::String));
    }

    #[test]
    fn string_containing_key_syntax_stays_a_value() {
        let colored = colorize("{\n  \"a\": \"\\\"b\\\": 1\"\n}");
        assert!(colored.contains("[lightgreen]\"\\\"b\\\": 1\"[-]"), "{colored}");
        assert_eq!(colored.matches("[blue]").count(), 1);
    }

    #[rstest]
    #[case("-1.5e+10", 8)]
    #[case("+3", 2)]
    #[case(".5", 2)]
    #[case("42,", 2)]
    #[case("1e", 1)]
    fn number_grammar(#[case] input: &str, #[case] expected: usize) {
        assert_eq!(number_len(input.as_bytes(), 0), Some(expected));
    }

    #[rstest]
    #[case("-")]
    #[case(".")]
    #[case("+x")]
    fn number_grammar_rejects(#[case] input: &str) {
        assert_eq!(number_len(input.as_bytes(), 0), None);
    }

    #[test]
    fn booleans_need_word_boundaries() {
        let colored = colorize("[true, falsey, null]");
        assert!(colored.contains("[lightblue]true[-]"));
        assert!(!colored.contains("[lightblue]false[-]"));
        assert!(colored.contains("[red]null[-]"));
    }

    #[rstest]
    #[case(sample())]
    #[case("{\n  \"tag\": \"[red]\",\n  \"[blue]\": [\n    \"[-]\"\n  ]\n}".to_string())]
    #[case("[\n  [],\n  {},\n  [\n    null\n  ]\n]".to_string())]
    #[case("not json [red] at all ü".to_string())]
    #[case("{\"unterminated\": \"abc[".to_string())]
    #[case(String::new())]
    fn stripping_directives_restores_input(#[case] input: String) {
        assert_eq!(strip_directives(&colorize(&input)), input);
    }

    #[test]
    fn theme_controls_directive_names() {
        let theme = ColorTheme { key: "purple", null: "gray", ..ColorTheme::default() };
        let colored = colorize_with("{\"k\": null}", &theme);
        assert_eq!(colored, "{[purple]\"k\"[-]: [gray]null[-]}");
    }
}
