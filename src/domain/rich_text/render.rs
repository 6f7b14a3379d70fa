use std::fmt::Write as _;

use serde_json::{Map, Value, json};

use super::{Block, ListItem, ListKind, Mark, RichDocument, Span};

pub(super) fn portable_text(doc: &RichDocument) -> Value {
    let mut nodes = Vec::new();

    for block in &doc.blocks {
        match block {
            Block::Heading { level, spans } => {
                let key = format!("b{}", nodes.len());
                nodes.push(text_block(&key, &format!("h{level}"), spans, None));
            }
            Block::Paragraph { spans } => {
                let key = format!("b{}", nodes.len());
                nodes.push(text_block(&key, "normal", spans, None));
            }
            Block::Quote { spans } => {
                let key = format!("b{}", nodes.len());
                nodes.push(text_block(&key, "blockquote", spans, None));
            }
            Block::List { kind, items } => {
                for item in items {
                    let key = format!("b{}", nodes.len());
                    nodes.push(text_block(&key, "normal", &item.spans, Some((*kind, item))));
                }
            }
            Block::Table { header, rows } => {
                let key = format!("b{}", nodes.len());
                let all_rows = header.iter().chain(rows.iter());
                let rows: Vec<Value> = all_rows
                    .enumerate()
                    .map(|(index, cells)| {
                        json!({
                            "_key": format!("{key}r{index}"),
                            "cells": cells.iter().map(|cell| spans_text(cell)).collect::<Vec<_>>(),
                        })
                    })
                    .collect();
                nodes.push(json!({
                    "_type": "table",
                    "_key": key,
                    "headerRow": header.is_some(),
                    "rows": rows,
                }));
            }
            Block::Code { language, code } => {
                let key = format!("b{}", nodes.len());
                let mut node = Map::new();
                node.insert("_type".into(), json!("code"));
                node.insert("_key".into(), json!(key));
                if let Some(language) = language {
                    node.insert("language".into(), json!(language));
                }
                node.insert("code".into(), json!(code));
                nodes.push(Value::Object(node));
            }
            Block::Rule => {
                let key = format!("b{}", nodes.len());
                nodes.push(json!({ "_type": "break", "_key": key, "style": "lineBreak" }));
            }
        }
    }

    Value::Array(nodes)
}

fn text_block(key: &str, style: &str, spans: &[Span], list: Option<(ListKind, &ListItem)>) -> Value {
    let mut mark_defs: Vec<(String, String)> = Vec::new();

    let children: Vec<Value> = spans
        .iter()
        .enumerate()
        .map(|(index, span)| {
            let marks: Vec<String> = span
                .marks
                .iter()
                .map(|mark| match mark {
                    Mark::Strong => "strong".to_string(),
                    Mark::Emphasis => "em".to_string(),
                    Mark::Code => "code".to_string(),
                    Mark::Link { href } => {
                        match mark_defs.iter().find(|(_, existing)| existing == href) {
                            Some((def_key, _)) => def_key.clone(),
                            None => {
                                let def_key = format!("{key}l{}", mark_defs.len());
                                mark_defs.push((def_key.clone(), href.clone()));
                                def_key
                            }
                        }
                    }
                })
                .collect();
            json!({
                "_type": "span",
                "_key": format!("{key}s{index}"),
                "text": span.text,
                "marks": marks,
            })
        })
        .collect();

    let defs: Vec<Value> = mark_defs
        .into_iter()
        .map(|(def_key, href)| json!({ "_type": "link", "_key": def_key, "href": href }))
        .collect();

    let mut node = Map::new();
    node.insert("_type".into(), json!("block"));
    node.insert("_key".into(), json!(key));
    node.insert("style".into(), json!(style));
    node.insert("children".into(), Value::Array(children));
    node.insert("markDefs".into(), Value::Array(defs));
    if let Some((kind, item)) = list {
        let list_item = match kind {
            ListKind::Bullet => "bullet",
            ListKind::Number => "number",
        };
        node.insert("listItem".into(), json!(list_item));
        node.insert("level".into(), json!(item.level));
    }
    Value::Object(node)
}

pub(super) fn html(doc: &RichDocument) -> String {
    let mut out = String::new();

    for block in &doc.blocks {
        if !out.is_empty() {
            out.push('\n');
        }
        match block {
            Block::Heading { level, spans } => {
                let _ = write!(out, "<h{level}>{}</h{level}>", spans_html(spans));
            }
            Block::Paragraph { spans } => {
                let _ = write!(out, "<p>{}</p>", spans_html(spans));
            }
            Block::Quote { spans } => {
                let _ = write!(out, "<blockquote><p>{}</p></blockquote>", spans_html(spans));
            }
            Block::List { kind, items } => list_html(&mut out, *kind, items),
            Block::Table { header, rows } => {
                out.push_str("<table>");
                if let Some(header) = header {
                    out.push_str("<thead><tr>");
                    for cell in header {
                        let _ = write!(out, "<th>{}</th>", spans_html(cell));
                    }
                    out.push_str("</tr></thead>");
                }
                out.push_str("<tbody>");
                for row in rows {
                    out.push_str("<tr>");
                    for cell in row {
                        let _ = write!(out, "<td>{}</td>", spans_html(cell));
                    }
                    out.push_str("</tr>");
                }
                out.push_str("</tbody></table>");
            }
            Block::Code { language, code } => match language {
                Some(language) => {
                    let _ = write!(
                        out,
                        "<pre><code class=\"language-{}\">{}</code></pre>",
                        escape_html(language),
                        escape_html(code)
                    );
                }
                None => {
                    let _ = write!(out, "<pre><code>{}</code></pre>", escape_html(code));
                }
            },
            Block::Rule => out.push_str("<hr>"),
        }
    }

    out
}

/// Nested `<ul>`/`<ol>` from item levels; a level may only deepen by one.
fn list_html(out: &mut String, kind: ListKind, items: &[ListItem]) {
    let (open, close) = match kind {
        ListKind::Bullet => ("<ul>", "</ul>"),
        ListKind::Number => ("<ol>", "</ol>"),
    };
    let mut depth: u8 = 0;

    for item in items {
        let target = item.level.clamp(1, depth + 1);
        if target > depth {
            out.push_str(open);
            depth = target;
        } else {
            out.push_str("</li>");
            while depth > target {
                out.push_str(close);
                out.push_str("</li>");
                depth -= 1;
            }
        }
        let _ = write!(out, "<li>{}", spans_html(&item.spans));
    }

    if depth > 0 {
        out.push_str("</li>");
        while depth > 1 {
            out.push_str(close);
            out.push_str("</li>");
            depth -= 1;
        }
        out.push_str(close);
    }
}

fn spans_html(spans: &[Span]) -> String {
    let mut out = String::new();
    for span in spans {
        let mut opened = Vec::new();
        for mark in &span.marks {
            match mark {
                Mark::Strong => {
                    out.push_str("<strong>");
                    opened.push("</strong>");
                }
                Mark::Emphasis => {
                    out.push_str("<em>");
                    opened.push("</em>");
                }
                Mark::Code => {
                    out.push_str("<code>");
                    opened.push("</code>");
                }
                Mark::Link { href } => {
                    if let Some(href) = safe_href(href) {
                        let _ = write!(out, "<a href=\"{}\">", escape_html(href));
                        opened.push("</a>");
                    }
                }
            }
        }
        out.push_str(&escape_html(&span.text));
        for closing in opened.iter().rev() {
            out.push_str(closing);
        }
    }
    out
}

/// Only web, mail and relative targets become anchors.
fn safe_href(href: &str) -> Option<&str> {
    let lowered = href.trim().to_ascii_lowercase();
    let has_scheme = lowered
        .split_once(':')
        .is_some_and(|(scheme, _)| !scheme.contains(['/', '?', '#']));
    let allowed = ["http:", "https:", "mailto:"]
        .iter()
        .any(|prefix| lowered.starts_with(prefix));
    (allowed || !has_scheme).then_some(href.trim())
}

pub(super) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

pub(super) fn spans_text(spans: &[Span]) -> String {
    spans.iter().map(|span| span.text.as_str()).collect()
}

pub(super) fn plain_text(doc: &RichDocument) -> String {
    let parts: Vec<String> = doc
        .blocks
        .iter()
        .filter_map(|block| match block {
            Block::Heading { spans, .. } | Block::Paragraph { spans } | Block::Quote { spans } => {
                Some(spans_text(spans))
            }
            Block::List { items, .. } => Some(
                items
                    .iter()
                    .map(|item| spans_text(&item.spans))
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Block::Table { header, rows } => Some(
                header
                    .iter()
                    .chain(rows.iter())
                    .map(|row| {
                        row.iter()
                            .map(|cell| spans_text(cell))
                            .collect::<Vec<_>>()
                            .join(" | ")
                    })
                    .collect::<Vec<_>>()
                    .join("\n"),
            ),
            Block::Code { code, .. } => Some(code.clone()),
            Block::Rule => None,
        })
        .collect();

    parts.join("\n\n")
}
