//! Canonical color names used in markup directives.
//!
//! Directives look like `[lightgreen]` and are resolved here to terminal colors.
//! Incoming names are normalized to lowercase with `_` removed, so `light_green`
//! and `LightGreen` both map to `lightgreen`. Unknown names return `None`.

use ratatui::style::Color;
use serde::Deserialize;

/// Directive color names (all lowercase).
pub const OFFICIAL_COLORS: [&str; 16] = [
    "black",
    "red",
    "green",
    "yellow",
    "blue",
    "purple",
    "cyan",
    "white",
    "gray",
    "darkgray",
    "lightred",
    "lightgreen",
    "lightyellow",
    "lightblue",
    "lightpurple",
    "lightcyan",
];

/// Convert a color name into its canonical directive name.
pub fn canonical_color_name(value: &str) -> Option<&'static str> {
    let normalized: String =
        value.trim().chars().filter(|ch| *ch != '_').map(|ch| ch.to_ascii_lowercase()).collect();
    match normalized.as_str() {
        "black" => Some("black"),
        "red" => Some("red"),
        "green" => Some("green"),
        "yellow" | "orange" => Some("yellow"),
        "blue" => Some("blue"),
        "purple" | "magenta" => Some("purple"),
        "cyan" => Some("cyan"),
        "white" => Some("white"),
        "gray" | "grey" => Some("gray"),
        "darkgray" | "darkgrey" => Some("darkgray"),
        "lightred" | "brightred" => Some("lightred"),
        "lightgreen" | "brightgreen" => Some("lightgreen"),
        "lightyellow" | "brightyellow" => Some("lightyellow"),
        "lightblue" | "brightblue" => Some("lightblue"),
        "lightpurple" | "lightmagenta" | "brightmagenta" => Some("lightpurple"),
        "lightcyan" | "brightcyan" => Some("lightcyan"),
        _ => None,
    }
}

/// Terminal color for a directive name.
pub fn terminal_color(value: &str) -> Option<Color> {
    let color = match canonical_color_name(value)? {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "purple" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" => Color::Gray,
        "darkgray" => Color::DarkGray,
        "lightred" => Color::LightRed,
        "lightgreen" => Color::LightGreen,
        "lightyellow" => Color::LightYellow,
        "lightblue" => Color::LightBlue,
        "lightpurple" => Color::LightMagenta,
        "lightcyan" => Color::LightCyan,
        _ => return None,
    };
    Some(color)
}

/// Directive color per JSON token category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColorTheme {
    pub key: &'static str,
    pub string: &'static str,
    pub array_string: &'static str,
    pub number: &'static str,
    pub array_number: &'static str,
    pub boolean: &'static str,
    pub null: &'static str,
}

impl Default for ColorTheme {
    fn default() -> Self {
        Self {
            key: "blue",
            string: "lightgreen",
            array_string: "green",
            number: "yellow",
            array_number: "yellow",
            boolean: "lightblue",
            null: "red",
        }
    }
}

/// Theme overrides as they appear in the config file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ThemeOverrides {
    pub key: Option<String>,
    pub string: Option<String>,
    pub array_string: Option<String>,
    pub number: Option<String>,
    pub array_number: Option<String>,
    pub boolean: Option<String>,
    pub null: Option<String>,
}

impl ThemeOverrides {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Later values win field by field.
    pub fn merge(&mut self, other: ThemeOverrides) {
        let pairs = [
            (&mut self.key, other.key),
            (&mut self.string, other.string),
            (&mut self.array_string, other.array_string),
            (&mut self.number, other.number),
            (&mut self.array_number, other.array_number),
            (&mut self.boolean, other.boolean),
            (&mut self.null, other.null),
        ];
        for (slot, value) in pairs {
            if value.is_some() {
                *slot = value;
            }
        }
    }

    /// Apply on top of the default theme; unknown names are rejected.
    pub fn resolve(&self) -> Result<ColorTheme, String> {
        let mut theme = ColorTheme::default();
        let slots = [
            (&mut theme.key, &self.key, "key"),
            (&mut theme.string, &self.string, "string"),
            (&mut theme.array_string, &self.array_string, "array_string"),
            (&mut theme.number, &self.number, "number"),
            (&mut theme.array_number, &self.array_number, "array_number"),
            (&mut theme.boolean, &self.boolean, "boolean"),
            (&mut theme.null, &self.null, "null"),
        ];
        for (slot, value, field) in slots {
            if let Some(name) = value {
                *slot = canonical_color_name(name)
                    .ok_or_else(|| format!("unknown color {name:?} for theme.{field}"))?;
            }
        }
        Ok(theme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("LightGreen", Some("lightgreen"))]
    #[case("light_green", Some("lightgreen"))]
    #[case("grey", Some("gray"))]
    #[case("magenta", Some("purple"))]
    #[case(" blue ", Some("blue"))]
    #[case("-", None)]
    #[case("chartreuse", None)]
    fn canonical_names(#[case] input: &str, #[case] expected: Option<&str>) {
        assert_eq!(canonical_color_name(input), expected);
    }

    #[test]
    fn every_official_color_resolves() {
        for name in OFFICIAL_COLORS {
            assert_eq!(canonical_color_name(name), Some(name));
            assert!(terminal_color(name).is_some(), "{name} has no terminal color");
        }
    }

    #[test]
    fn theme_overrides_resolve_and_reject_unknown() {
        let overrides =
            ThemeOverrides { key: Some("Cyan".to_string()), ..ThemeOverrides::default() };
        let theme = overrides.resolve().unwrap();
        assert_eq!(theme.key, "cyan");
        assert_eq!(theme.null, "red");

        let bad = ThemeOverrides { null: Some("nope".to_string()), ..ThemeOverrides::default() };
        let err = bad.resolve().unwrap_err();
        assert!(err.contains("theme.null"));
    }

    #[test]
    fn theme_overrides_merge_field_by_field() {
        let mut base = ThemeOverrides {
            key: Some("red".to_string()),
            string: Some("blue".to_string()),
            ..ThemeOverrides::default()
        };
        base.merge(ThemeOverrides { key: Some("green".to_string()), ..ThemeOverrides::default() });
        assert_eq!(base.key.as_deref(), Some("green"));
        assert_eq!(base.string.as_deref(), Some("blue"));
        assert!(!base.is_empty());
    }
}
