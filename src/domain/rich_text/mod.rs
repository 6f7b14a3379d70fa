//! Markdown and HTML to structured rich text.
//!
//! Article bodies arrive from the content webhook as Markdown or HTML. They are
//! normalised into a [`RichDocument`] which can then be emitted as Portable
//! Text JSON, escaped HTML or plain text. Everything here is synchronous and
//! free of I/O.

mod blocks;
mod html;
mod inline;
mod render;

pub use blocks::{LineKind, classify_line, parse_markdown};
pub use html::html_to_markdown;
pub use inline::tokenize_inline;

use serde::Serialize;

pub const WORDS_PER_MINUTE: usize = 200;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RichDocument {
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Heading {
        level: u8,
        spans: Vec<Span>,
    },
    Paragraph {
        spans: Vec<Span>,
    },
    Quote {
        spans: Vec<Span>,
    },
    List {
        kind: ListKind,
        items: Vec<ListItem>,
    },
    Table {
        header: Option<Vec<Vec<Span>>>,
        rows: Vec<Vec<Vec<Span>>>,
    },
    Code {
        language: Option<String>,
        code: String,
    },
    Rule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ListKind {
    Bullet,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListItem {
    pub level: u8,
    pub spans: Vec<Span>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Span {
    pub text: String,
    pub marks: Vec<Mark>,
}

impl Span {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Self {
            text: text.into(),
            marks,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Mark {
    Strong,
    Emphasis,
    Code,
    Link { href: String },
}

impl RichDocument {
    pub fn from_markdown(markdown: &str) -> Self {
        parse_markdown(markdown)
    }

    pub fn from_html(html: &str) -> Self {
        parse_markdown(&html_to_markdown(html))
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn to_portable_text(&self) -> serde_json::Value {
        render::portable_text(self)
    }

    pub fn render_html(&self) -> String {
        render::html(self)
    }

    pub fn plain_text(&self) -> String {
        render::plain_text(self)
    }

    /// Whitespace-separated tokens containing at least one alphanumeric char.
    pub fn word_count(&self) -> usize {
        self.plain_text()
            .split_whitespace()
            .filter(|token| token.chars().any(char::is_alphanumeric))
            .count()
    }

    pub fn reading_time_minutes(&self) -> usize {
        let words = self.word_count();
        if words == 0 {
            0
        } else {
            words.div_ceil(WORDS_PER_MINUTE).max(1)
        }
    }

    /// Text of the first paragraph, cut on a word boundary when longer than
    /// `max_chars` characters (ellipsis included).
    pub fn excerpt(&self, max_chars: usize) -> Option<String> {
        let text = self.blocks.iter().find_map(|block| match block {
            Block::Paragraph { spans } => Some(render::spans_text(spans)),
            _ => None,
        })?;
        Some(truncate_on_word(&text, max_chars))
    }
}

fn truncate_on_word(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    if max_chars == 0 {
        return String::new();
    }

    let budget: String = text.chars().take(max_chars - 1).collect();
    let at_boundary = text
        .chars()
        .nth(max_chars - 1)
        .is_some_and(char::is_whitespace);
    let cut = match budget.rfind(char::is_whitespace) {
        _ if at_boundary => budget.as_str(),
        Some(index) if index > 0 => &budget[..index],
        _ => budget.as_str(),
    };
    let mut excerpt = cut.trim_end().to_string();
    excerpt.push('…');
    excerpt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn word_count_ignores_symbol_tokens() {
        let doc = RichDocument::from_markdown("Hello **there** - world\n\n| a | b |");
        assert_eq!(doc.word_count(), 5);
    }

    #[test]
    fn reading_time_rounds_up() {
        let words = vec!["word"; 201].join(" ");
        let doc = RichDocument::from_markdown(&words);
        assert_eq!(doc.reading_time_minutes(), 2);

        let short = RichDocument::from_markdown("one");
        assert_eq!(short.reading_time_minutes(), 1);

        assert_eq!(RichDocument::default().reading_time_minutes(), 0);
    }

    #[test]
    fn excerpt_uses_first_paragraph_and_word_boundary() {
        let doc = RichDocument::from_markdown(
            "# Title\n\nThe quick brown fox jumps over the lazy dog.\n\nSecond.",
        );
        assert_eq!(doc.excerpt(100).as_deref(), Some("The quick brown fox jumps over the lazy dog."));
        assert_eq!(doc.excerpt(16).as_deref(), Some("The quick brown…"));
        assert!(doc.excerpt(16).unwrap().chars().count() <= 16);
    }

    #[test]
    fn excerpt_without_paragraph_is_none() {
        let doc = RichDocument::from_markdown("# Only a heading");
        assert_eq!(doc.excerpt(20), None);
    }

    #[test]
    fn from_html_round_trips_structure() {
        let doc = RichDocument::from_html("<h2>Hi</h2><p>Some <strong>bold</strong> text</p>");
        assert_eq!(
            doc.blocks,
            vec![
                Block::Heading {
                    level: 2,
                    spans: vec![Span::plain("Hi")],
                },
                Block::Paragraph {
                    spans: vec![
                        Span::plain("Some "),
                        Span::marked("bold", vec![Mark::Strong]),
                        Span::plain(" text"),
                    ],
                },
            ]
        );
    }
}
