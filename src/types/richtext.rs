//! Rich text spans and inline annotations shared by blocks and properties.

use super::Color;
use serde::{Deserialize, Serialize};

/// One span of rich text as returned by the Notion API: plain text plus
/// optional link target and inline style annotations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RichTextSpan {
    pub plain_text: String,
    pub href: Option<String>,
    #[serde(default)]
    pub annotations: Annotations,
}

impl RichTextSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            plain_text: text.into(),
            href: None,
            annotations: Annotations::default(),
        }
    }
}

/// Inline style annotations. Order here is cosmetic; the markdown converter
/// owns the wrapping order independently (code, bold, italic, strikethrough,
/// underline, innermost to outermost).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Annotations {
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub code: bool,
}

/// Concatenate the plain text of a span sequence, ignoring annotations.
pub fn plain_text_of(spans: &[RichTextSpan]) -> String {
    spans.iter().map(|s| s.plain_text.as_str()).collect()
}

/// An option value for a `select`/`multi_select`/`status` property schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub color: Color,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_concatenates_spans() {
        let spans = vec![RichTextSpan::plain("Hello "), RichTextSpan::plain("World")];
        assert_eq!(plain_text_of(&spans), "Hello World");
    }
}
