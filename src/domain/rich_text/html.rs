use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

static SANITIZER: Lazy<ammonia::Builder<'static>> = Lazy::new(build_sanitizer);

macro_rules! pattern {
    ($name:ident, $re:literal) => {
        static $name: Lazy<Regex> = Lazy::new(|| Regex::new($re).expect("valid regex"));
    };
}

pattern!(PRE, r#"(?is)<pre>\s*(?:<code(?: class="([^"]*)")?>)?(.*?)(?:</code>)?\s*</pre>"#);
pattern!(TOKEN, r"<[^>]*>|[^<]+");
pattern!(WHITESPACE, r"\s+");
pattern!(BR, r"(?i)<br\s*/?>");
pattern!(HR, r"(?i)<hr\s*/?>");
pattern!(STRONG, r"(?is)<(?:strong|b)>(.*?)</(?:strong|b)>");
pattern!(EMPHASIS, r"(?is)<(?:em|i)>(.*?)</(?:em|i)>");
pattern!(CODE, r"(?is)<code[^>]*>(.*?)</code>");
pattern!(LINK, r#"(?is)<a href="([^"]*)"[^>]*>(.*?)</a>"#);
pattern!(HEADING, r"(?is)<h([1-6])>(.*?)</h[1-6]>");
pattern!(PARAGRAPH, r"(?is)<p>(.*?)</p>");
pattern!(TABLE, r"(?is)<table>(.*?)</table>");
pattern!(ROW, r"(?is)<tr>(.*?)</tr>");
pattern!(CELL, r"(?is)<(th|td)>(.*?)</t[hd]>");
pattern!(LIST_OPEN, r"(?i)<(ul|ol)>");
pattern!(LIST_CLOSE, r"(?i)</(?:ul|ol)>");
pattern!(ITEM, r"(?is)<li>(.*?)</li>");
pattern!(QUOTE_OPEN, r"(?i)<blockquote>");
pattern!(QUOTE_CLOSE, r"(?i)</blockquote>");
pattern!(ANY_TAG, r"<[^>]*>");
pattern!(NUMERIC_ENTITY, r"&#(?:x([0-9a-fA-F]+)|([0-9]+));");
pattern!(UNESCAPE, r"\\(.)");
pattern!(BLANK_RUN, r"\n{3,}");
pattern!(SLOT, r"\x00(\d+)\x00");

const PRE_SLOT: char = '\u{0}';
const INDENT: char = '\u{1}';

fn build_sanitizer() -> ammonia::Builder<'static> {
    let mut builder = ammonia::Builder::default();
    let tags: HashSet<&'static str> = HashSet::from([
        "h1", "h2", "h3", "h4", "h5", "h6", "p", "br", "hr", "strong", "b", "em", "i", "code",
        "pre", "a", "ul", "ol", "li", "blockquote", "table", "thead", "tbody", "tr", "th", "td",
    ]);
    builder.tags(tags);
    builder.generic_attributes(HashSet::new());
    builder.tag_attributes(Default::default());
    builder.add_tag_attributes("a", &["href"]);
    builder.add_tag_attributes("code", &["class"]);
    builder.link_rel(None);
    builder
}

/// Convert an HTML fragment into the Markdown dialect understood by
/// [`super::parse_markdown`].
pub fn html_to_markdown(html: &str) -> String {
    let sanitized = SANITIZER.clean(html).to_string();

    let mut preformatted = Vec::new();
    let text = PRE.replace_all(&sanitized, |caps: &Captures| {
        let language = caps
            .get(1)
            .and_then(|class| language_from_class(class.as_str()));
        let body = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
        preformatted.push(fenced(language, &decode_entities(&strip_tags(body))));
        format!("{PRE_SLOT}{}{PRE_SLOT}", preformatted.len() - 1)
    });

    let text = escape_text_nodes(&text);
    let text = WHITESPACE.replace_all(&text, " ");
    let text = SLOT.replace_all(&text, "\n\n\x00$1\x00\n\n");
    let text = BR.replace_all(&text, "\n");
    let text = HR.replace_all(&text, "\n\n---\n\n");
    let text = CODE.replace_all(&text, |caps: &Captures| {
        let inner = strip_tags(&caps[1]);
        format!("`{}`", UNESCAPE.replace_all(&inner, "$1"))
    });
    let text = STRONG.replace_all(&text, "**$1**");
    let text = EMPHASIS.replace_all(&text, "*$1*");
    let text = LINK.replace_all(&text, |caps: &Captures| {
        format!("[{}]({})", &caps[2], caps[1].replace(')', "%29"))
    });
    let text = HEADING.replace_all(&text, |caps: &Captures| {
        let level: usize = caps[1].parse().unwrap_or(1);
        format!("\n\n{} {}\n\n", "#".repeat(level), caps[2].trim())
    });
    let text = PARAGRAPH.replace_all(&text, "\n\n$1\n\n");
    let text = TABLE.replace_all(&text, |caps: &Captures| table_to_markdown(&caps[1]));
    let text = rewrite_lists(&text);
    let text = rewrite_quotes(&text);
    let text = ANY_TAG.replace_all(&text, "");
    let text = decode_entities(&text);

    finish(&text, &preformatted)
}

fn language_from_class(class: &str) -> Option<String> {
    class.split_whitespace().find_map(|name| {
        name.strip_prefix("language-")
            .or_else(|| name.strip_prefix("lang-"))
            .filter(|language| !language.is_empty())
            .map(str::to_string)
    })
}

fn fenced(language: Option<String>, code: &str) -> String {
    let fence = if code.contains("```") { "~~~" } else { "```" };
    let code = code.trim_matches('\n');
    format!(
        "{fence}{}\n{code}\n{fence}",
        language.unwrap_or_default()
    )
}

/// Escape Markdown control characters inside text nodes so literal text is
/// not re-read as markup.
fn escape_text_nodes(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    for token in TOKEN.find_iter(html) {
        let token = token.as_str();
        if token.starts_with('<') {
            out.push_str(token);
            continue;
        }
        let token = NUMERIC_ENTITY.replace_all(token, |caps: &Captures| {
            match decode_numeric(caps) {
                Some(ch) if is_markdown_control(ch) => ch.to_string(),
                _ => caps[0].to_string(),
            }
        });
        for ch in token.chars() {
            if is_markdown_control(ch) {
                out.push('\\');
            }
            out.push(ch);
        }
    }
    out
}

fn table_to_markdown(inner: &str) -> String {
    let mut lines = Vec::new();

    for (index, row) in ROW.captures_iter(inner).enumerate() {
        let mut cells = Vec::new();
        let mut all_header = true;
        for cell in CELL.captures_iter(&row[1]) {
            all_header &= cell[1].eq_ignore_ascii_case("th");
            let text = strip_tags(&cell[2]).replace('|', "\\|");
            cells.push(text.trim().to_string());
        }
        if cells.is_empty() {
            continue;
        }

        lines.push(format!("| {} |", cells.join(" | ")));
        if index == 0 && all_header {
            let separator = vec!["---"; cells.len()].join(" | ");
            lines.push(format!("| {separator} |"));
        }
    }

    format!("\n\n{}\n\n", lines.join("\n"))
}

/// Innermost lists are rewritten first so nested items pick up indentation.
fn rewrite_lists(html: &str) -> String {
    let mut text = html.to_string();

    while let Some(open) = LIST_OPEN.find_iter(&text).last() {
        let Some(close) = LIST_CLOSE.find_at(&text, open.end()) else {
            break;
        };
        let range = open.start()..close.end();
        let ordered = open.as_str().eq_ignore_ascii_case("<ol>");
        let body = &text[open.end()..close.start()];

        let mut lines = Vec::new();
        for (position, item) in ITEM.captures_iter(body).enumerate() {
            let marker = if ordered {
                format!("{}.", position + 1)
            } else {
                "-".to_string()
            };
            let mut item_lines = item[1]
                .split('\n')
                .map(str::trim)
                .filter(|line| !line.is_empty());
            let first = item_lines.next().unwrap_or_default();
            lines.push(format!("{marker} {first}"));
            for rest in item_lines {
                lines.push(format!("{INDENT}{rest}"));
            }
        }

        let replacement = format!("\n\n{}\n\n", lines.join("\n"));
        text.replace_range(range, &replacement);
    }

    text
}

fn rewrite_quotes(html: &str) -> String {
    let mut text = html.to_string();

    while let Some(open) = QUOTE_OPEN.find_iter(&text).last() {
        let Some(close) = QUOTE_CLOSE.find_at(&text, open.end()) else {
            break;
        };
        let range = open.start()..close.end();
        let quoted: Vec<String> = text[open.end()..close.start()]
            .split('\n')
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| format!("> {line}"))
            .collect();

        let replacement = format!("\n\n{}\n\n", quoted.join("\n"));
        text.replace_range(range, &replacement);
    }

    text
}

fn strip_tags(fragment: &str) -> String {
    ANY_TAG.replace_all(fragment, "").into_owned()
}

fn is_markdown_control(ch: char) -> bool {
    matches!(ch, '\\' | '*' | '_' | '`' | '[')
}

fn decode_numeric(caps: &Captures) -> Option<char> {
    let code = match (caps.get(1), caps.get(2)) {
        (Some(hex), _) => u32::from_str_radix(hex.as_str(), 16).ok(),
        (_, Some(dec)) => dec.as_str().parse().ok(),
        _ => None,
    };
    code.and_then(char::from_u32)
}

fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY.replace_all(text, |caps: &Captures| {
        decode_numeric(caps)
            .map(String::from)
            .unwrap_or_else(|| caps[0].to_string())
    });

    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

fn finish(text: &str, preformatted: &[String]) -> String {
    let lines: Vec<String> = text
        .split('\n')
        .map(|line| {
            let line = line.trim();
            let depth = line.chars().take_while(|ch| *ch == INDENT).count();
            if depth == 0 {
                return restore_pre(line, preformatted);
            }
            format!(
                "{}{}",
                "  ".repeat(depth),
                line.trim_start_matches(INDENT).trim_start()
            )
        })
        .collect();

    BLANK_RUN
        .replace_all(&lines.join("\n"), "\n\n")
        .trim()
        .to_string()
}

fn restore_pre(line: &str, preformatted: &[String]) -> String {
    line.strip_prefix(PRE_SLOT)
        .and_then(|rest| rest.strip_suffix(PRE_SLOT))
        .and_then(|index| index.parse::<usize>().ok())
        .and_then(|index| preformatted.get(index))
        .cloned()
        .unwrap_or_else(|| line.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rich_text::RichDocument;

    #[test]
    fn headings_paragraphs_and_inline_marks() {
        let markdown = html_to_markdown(
            "<h1>Title</h1>\n<p>Hello <strong>bold</strong> and <em>soft</em> with <code>a_b</code>.</p>",
        );
        assert_eq!(
            markdown,
            "# Title\n\nHello **bold** and *soft* with `a_b`."
        );
    }

    #[test]
    fn scripts_and_attributes_are_removed() {
        let markdown = html_to_markdown(
            r#"<p onclick="x()">Safe<script>alert(1)</script> <a href="https://a.test/?q=1&amp;r=2" target="_blank">link</a></p>"#,
        );
        assert_eq!(markdown, "Safe [link](https://a.test/?q=1&r=2)");
    }

    #[test]
    fn nested_lists_are_indented() {
        let markdown = html_to_markdown(
            "<ul><li>one<ul><li>inner</li></ul></li><li>two</li></ul><ol><li>first</li><li>second</li></ol>",
        );
        assert_eq!(markdown, "- one\n  - inner\n- two\n\n1. first\n2. second");
    }

    #[test]
    fn tables_get_header_separator() {
        let markdown = html_to_markdown(
            "<table><thead><tr><th>Name</th><th>Fee</th></tr></thead><tbody><tr><td>A|B</td><td>10</td></tr></tbody></table>",
        );
        assert_eq!(markdown, "| Name | Fee |\n| --- | --- |\n| A\\|B | 10 |");
    }

    #[test]
    fn preformatted_code_keeps_language_and_whitespace() {
        let markdown = html_to_markdown(
            "<pre><code class=\"language-rust\">fn main() {\n    let x = 1 &lt; 2;\n}\n</code></pre><p>after</p>",
        );
        assert_eq!(
            markdown,
            "```rust\nfn main() {\n    let x = 1 < 2;\n}\n```\n\nafter"
        );
    }

    #[test]
    fn quotes_breaks_rules_and_entities() {
        let markdown = html_to_markdown(
            "<blockquote><p>Said &quot;hi&quot;</p></blockquote><hr><p>a<br>b&nbsp;&#169;</p>",
        );
        assert_eq!(markdown, "> Said \"hi\"\n\n---\n\na\nb ©");
    }

    #[test]
    fn link_targets_keep_their_closing_parens() {
        let markdown = html_to_markdown(r#"<p>See <a href="/wiki/a_(b)">the entry</a>.</p>"#);
        assert_eq!(markdown, "See [the entry](/wiki/a_(b%29).");

        let doc = RichDocument::from_markdown(&markdown);
        assert_eq!(
            doc.render_html(),
            "<p>See <a href=\"/wiki/a_(b%29\">the entry</a>.</p>"
        );
    }

    #[test]
    fn encoded_markdown_characters_stay_literal() {
        let markdown = html_to_markdown("<p>&#42;x&#42; and &#x5F;y&#x5F; and &amp;#42;</p>");
        assert_eq!(markdown, r"\*x\* and \_y\_ and &#42;");

        let doc = RichDocument::from_markdown(&markdown);
        assert_eq!(doc.render_html(), "<p>*x* and _y_ and &amp;#42;</p>");
    }

    #[test]
    fn literal_markdown_characters_are_escaped() {
        assert_eq!(html_to_markdown("<p>2 * 3 = 6_x</p>"), r"2 \* 3 = 6\_x");
    }
}
