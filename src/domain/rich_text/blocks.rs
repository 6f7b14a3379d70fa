use super::{Block, ListItem, ListKind, RichDocument, Span, inline::tokenize_inline};

const MAX_LIST_LEVEL: u8 = 6;

/// Classification of a single Markdown line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineKind<'a> {
    Fence { marker: char, language: Option<&'a str> },
    Blank,
    Rule,
    Heading { level: u8, text: &'a str },
    TableSeparator,
    TableRow(Vec<String>),
    Quote(&'a str),
    Unordered { level: u8, text: &'a str },
    Ordered { level: u8, text: &'a str },
    Text(&'a str),
}

pub fn classify_line(line: &str) -> LineKind<'_> {
    let trimmed = line.trim();

    if let Some(fence) = fence_marker(trimmed) {
        let info = trimmed.trim_start_matches(fence).trim();
        return LineKind::Fence {
            marker: fence,
            language: info.split_whitespace().next(),
        };
    }

    if trimmed.is_empty() {
        return LineKind::Blank;
    }

    if is_rule(trimmed) {
        return LineKind::Rule;
    }

    if let Some((level, text)) = heading(trimmed) {
        return LineKind::Heading { level, text };
    }

    if trimmed.starts_with('|') {
        let cells = split_cells(trimmed);
        if !cells.is_empty() && cells.iter().all(|cell| is_separator_cell(cell)) {
            return LineKind::TableSeparator;
        }
        return LineKind::TableRow(cells);
    }

    if let Some(rest) = trimmed.strip_prefix('>') {
        return LineKind::Quote(rest.trim());
    }

    let (indent, body) = split_indent(line);
    let level = list_level(indent);

    if let Some(text) = unordered_item(body) {
        return LineKind::Unordered { level, text };
    }

    if let Some(text) = ordered_item(body) {
        return LineKind::Ordered { level, text };
    }

    LineKind::Text(trimmed)
}

enum Run {
    Paragraph(Vec<String>),
    Quote(Vec<String>),
    List {
        kind: ListKind,
        items: Vec<(u8, String)>,
    },
    Table(Vec<TableLine>),
}

enum TableLine {
    Row(Vec<String>),
    Separator,
}

struct CodeBlock {
    marker: char,
    language: Option<String>,
    lines: Vec<String>,
}

#[derive(Default)]
struct Builder {
    blocks: Vec<Block>,
    run: Option<Run>,
}

impl Builder {
    fn close(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };

        match run {
            Run::Paragraph(lines) => {
                let spans = tokenize_inline(&lines.join(" "));
                if !spans.is_empty() {
                    self.blocks.push(Block::Paragraph { spans });
                }
            }
            Run::Quote(lines) => {
                let spans = tokenize_inline(&lines.join(" "));
                if !spans.is_empty() {
                    self.blocks.push(Block::Quote { spans });
                }
            }
            Run::List { kind, items } => {
                let items = items
                    .into_iter()
                    .map(|(level, text)| ListItem {
                        level,
                        spans: tokenize_inline(&text),
                    })
                    .collect();
                self.blocks.push(Block::List { kind, items });
            }
            Run::Table(lines) => {
                if let Some(table) = build_table(lines) {
                    self.blocks.push(table);
                }
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        self.close();
        self.blocks.push(block);
    }

    fn push_paragraph_line(&mut self, text: &str) {
        match self.run.as_mut() {
            Some(Run::Paragraph(lines)) => lines.push(text.to_string()),
            _ => {
                self.close();
                self.run = Some(Run::Paragraph(vec![text.to_string()]));
            }
        }
    }

    fn push_quote_line(&mut self, text: &str) {
        match self.run.as_mut() {
            Some(Run::Quote(lines)) => lines.push(text.to_string()),
            _ => {
                self.close();
                self.run = Some(Run::Quote(vec![text.to_string()]));
            }
        }
    }

    fn push_list_item(&mut self, kind: ListKind, level: u8, text: &str) {
        match self.run.as_mut() {
            Some(Run::List {
                kind: open_kind,
                items,
            }) if *open_kind == kind => items.push((level, text.to_string())),
            _ => {
                self.close();
                self.run = Some(Run::List {
                    kind,
                    items: vec![(level, text.to_string())],
                });
            }
        }
    }

    fn push_table_line(&mut self, line: TableLine) {
        match self.run.as_mut() {
            Some(Run::Table(lines)) => lines.push(line),
            _ => {
                self.close();
                self.run = Some(Run::Table(vec![line]));
            }
        }
    }

    /// Lazy continuation: indented text directly under a list item extends it.
    fn continue_list_item(&mut self, text: &str) -> bool {
        match self.run.as_mut() {
            Some(Run::List { items, .. }) => match items.last_mut() {
                Some((_, last)) => {
                    if !last.is_empty() {
                        last.push(' ');
                    }
                    last.push_str(text);
                    true
                }
                None => false,
            },
            _ => false,
        }
    }

    fn finish(mut self) -> RichDocument {
        self.close();
        RichDocument {
            blocks: self.blocks,
        }
    }
}

/// Parse Markdown into a [`RichDocument`] in a single forward pass.
pub fn parse_markdown(input: &str) -> RichDocument {
    let normalized = input.replace("\r\n", "\n").replace('\r', "\n");
    let mut builder = Builder::default();
    let mut code: Option<CodeBlock> = None;

    for line in normalized.split('\n') {
        if let Some(block) = code.as_mut() {
            if fence_marker(line.trim()) == Some(block.marker) {
                if let Some(done) = code.take() {
                    builder.push_block(Block::Code {
                        language: done.language,
                        code: done.lines.join("\n"),
                    });
                }
            } else {
                block.lines.push(line.to_string());
            }
            continue;
        }

        match classify_line(line) {
            LineKind::Fence { marker, language } => {
                builder.close();
                code = Some(CodeBlock {
                    marker,
                    language: language.map(str::to_string),
                    lines: Vec::new(),
                });
            }
            LineKind::Blank => builder.close(),
            LineKind::Rule => builder.push_block(Block::Rule),
            LineKind::Heading { level, text } => {
                let spans = tokenize_inline(text);
                if spans.is_empty() {
                    builder.close();
                } else {
                    builder.push_block(Block::Heading { level, spans });
                }
            }
            LineKind::TableSeparator => builder.push_table_line(TableLine::Separator),
            LineKind::TableRow(cells) => builder.push_table_line(TableLine::Row(cells)),
            LineKind::Quote(text) => builder.push_quote_line(text),
            LineKind::Unordered { level, text } => {
                builder.push_list_item(ListKind::Bullet, level, text)
            }
            LineKind::Ordered { level, text } => {
                builder.push_list_item(ListKind::Number, level, text)
            }
            LineKind::Text(text) => {
                let indented = line.starts_with([' ', '\t']);
                if !(indented && builder.continue_list_item(text)) {
                    builder.push_paragraph_line(text);
                }
            }
        }
    }

    if let Some(open) = code.take() {
        builder.push_block(Block::Code {
            language: open.language,
            code: open.lines.join("\n"),
        });
    }

    builder.finish()
}

fn build_table(lines: Vec<TableLine>) -> Option<Block> {
    let header_follows = matches!(lines.get(1), Some(TableLine::Separator));
    let mut rows: Vec<Vec<Vec<Span>>> = lines
        .into_iter()
        .filter_map(|line| match line {
            TableLine::Row(cells) => Some(cells.iter().map(|cell| tokenize_inline(cell)).collect()),
            TableLine::Separator => None,
        })
        .collect();

    if rows.is_empty() {
        return None;
    }

    let header = if header_follows {
        Some(rows.remove(0))
    } else {
        None
    };

    Some(Block::Table { header, rows })
}

fn fence_marker(trimmed: &str) -> Option<char> {
    if trimmed.starts_with("```") {
        Some('`')
    } else if trimmed.starts_with("~~~") {
        Some('~')
    } else {
        None
    }
}

fn is_rule(trimmed: &str) -> bool {
    let compact: Vec<char> = trimmed.chars().filter(|ch| *ch != ' ' && *ch != '\t').collect();
    match compact.first() {
        Some(first @ ('-' | '*' | '_')) => {
            compact.len() >= 3 && compact.iter().all(|ch| ch == first)
        }
        _ => false,
    }
}

fn heading(trimmed: &str) -> Option<(u8, &str)> {
    let hashes = trimmed.chars().take_while(|ch| *ch == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }

    let rest = &trimmed[hashes..];
    if !(rest.is_empty() || rest.starts_with([' ', '\t'])) {
        return None;
    }

    let text = rest.trim();
    let without_closing = text.trim_end_matches('#');
    let text = if without_closing.is_empty() {
        without_closing
    } else if without_closing.ends_with([' ', '\t']) {
        without_closing.trim_end()
    } else {
        text
    };

    Some((hashes as u8, text))
}

fn split_cells(trimmed: &str) -> Vec<String> {
    let inner = trimmed.strip_prefix('|').unwrap_or(trimmed);
    let inner = match inner.strip_suffix('|') {
        Some(stripped) if !stripped.ends_with('\\') => stripped,
        _ => inner,
    };

    let mut cells = Vec::new();
    let mut current = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' if chars.peek() == Some(&'|') => {
                current.push('|');
                chars.next();
            }
            '|' => cells.push(std::mem::take(&mut current).trim().to_string()),
            other => current.push(other),
        }
    }
    cells.push(current.trim().to_string());
    cells
}

fn is_separator_cell(cell: &str) -> bool {
    let body = cell.strip_prefix(':').unwrap_or(cell);
    let body = body.strip_suffix(':').unwrap_or(body);
    !body.is_empty() && body.chars().all(|ch| ch == '-')
}

fn split_indent(line: &str) -> (usize, &str) {
    let mut width = 0;
    for (index, ch) in line.char_indices() {
        match ch {
            ' ' => width += 1,
            '\t' => width += 4,
            _ => return (width, &line[index..]),
        }
    }
    (width, "")
}

fn list_level(indent: usize) -> u8 {
    let level = indent / 2 + 1;
    level.min(usize::from(MAX_LIST_LEVEL)) as u8
}

fn unordered_item(body: &str) -> Option<&str> {
    let mut chars = body.chars();
    match (chars.next(), chars.next()) {
        (Some('-' | '*' | '+'), Some(' ' | '\t')) => Some(body[2..].trim()),
        _ => None,
    }
}

fn ordered_item(body: &str) -> Option<&str> {
    let digits = body.chars().take_while(char::is_ascii_digit).count();
    if !(1..=9).contains(&digits) {
        return None;
    }

    let rest = &body[digits..];
    let mut chars = rest.chars();
    match (chars.next(), chars.next()) {
        (Some('.' | ')'), Some(' ' | '\t')) => Some(rest[2..].trim()),
        _ => None,
    }
}
