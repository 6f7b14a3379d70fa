use super::{Mark, Span};

const ESCAPABLE: [char; 5] = ['*', '_', '`', '[', '\\'];

/// Split a run of inline Markdown into marked spans.
pub fn tokenize_inline(text: &str) -> Vec<Span> {
    let chars: Vec<char> = text.chars().collect();
    let mut spans = Vec::new();
    tokenize_into(&chars, &[], &mut spans);
    spans
}

fn tokenize_into(chars: &[char], inherited: &[Mark], out: &mut Vec<Span>) {
    let mut plain = String::new();
    let mut index = 0;

    while index < chars.len() {
        let ch = chars[index];

        if ch == '\\' {
            match chars.get(index + 1) {
                Some(next) if ESCAPABLE.contains(next) => {
                    plain.push(*next);
                    index += 2;
                }
                _ => {
                    plain.push(ch);
                    index += 1;
                }
            }
            continue;
        }

        let Some(opener) = Opener::at(chars, index) else {
            plain.push(ch);
            index += 1;
            continue;
        };

        match opener.resolve(chars, index) {
            Some(found) => {
                flush(&mut plain, inherited, out);
                let mut marks = inherited.to_vec();
                marks.push(found.mark);
                if found.literal {
                    push_span(out, found.inner.iter().collect(), marks);
                } else {
                    tokenize_into(found.inner, &marks, out);
                }
                index = found.next;
            }
            None => {
                plain.extend(&chars[index..index + opener.width()]);
                index += opener.width();
            }
        }
    }

    flush(&mut plain, inherited, out);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Opener {
    Code,
    Link,
    Strong(char),
    Emphasis(char),
}

struct Resolved<'a> {
    mark: Mark,
    inner: &'a [char],
    literal: bool,
    next: usize,
}

impl Opener {
    /// Pick the marker starting at `index`, preferring code, link, strong,
    /// then emphasis.
    fn at(chars: &[char], index: usize) -> Option<Self> {
        match chars[index] {
            '`' => Some(Opener::Code),
            '[' => Some(Opener::Link),
            delim @ ('*' | '_') => {
                if delim == '_' && index > 0 && chars[index - 1].is_alphanumeric() {
                    return None;
                }
                if chars.get(index + 1) == Some(&delim) {
                    Some(Opener::Strong(delim))
                } else {
                    Some(Opener::Emphasis(delim))
                }
            }
            _ => None,
        }
    }

    fn width(self) -> usize {
        match self {
            Opener::Strong(_) => 2,
            _ => 1,
        }
    }

    fn resolve(self, chars: &[char], index: usize) -> Option<Resolved<'_>> {
        match self {
            Opener::Code => {
                let close = find_char(chars, index + 1, '`')?;
                if close == index + 1 {
                    return None;
                }
                Some(Resolved {
                    mark: Mark::Code,
                    inner: &chars[index + 1..close],
                    literal: true,
                    next: close + 1,
                })
            }
            Opener::Link => resolve_link(chars, index),
            Opener::Strong(delim) => {
                let start = index + 2;
                let close = find_closer(chars, start, delim, 2)?;
                Some(Resolved {
                    mark: Mark::Strong,
                    inner: &chars[start..close],
                    literal: false,
                    next: close + 2,
                })
            }
            Opener::Emphasis(delim) => {
                let start = index + 1;
                let close = find_closer(chars, start, delim, 1)?;
                Some(Resolved {
                    mark: Mark::Emphasis,
                    inner: &chars[start..close],
                    literal: false,
                    next: close + 1,
                })
            }
        }
    }
}

fn resolve_link(chars: &[char], index: usize) -> Option<Resolved<'_>> {
    let label_end = find_char(chars, index + 1, ']')?;
    if chars.get(label_end + 1) != Some(&'(') {
        return None;
    }
    let href_end = find_char(chars, label_end + 2, ')')?;
    let href: String = chars[label_end + 2..href_end].iter().collect();
    let href = href.trim();
    if href.is_empty() {
        return None;
    }

    let label = &chars[index + 1..label_end];
    let literal = label.iter().all(|ch| ch.is_whitespace());
    Some(Resolved {
        mark: Mark::Link {
            href: href.to_string(),
        },
        inner: if literal {
            &chars[label_end + 2..href_end]
        } else {
            label
        },
        literal,
        next: href_end + 1,
    })
}

/// First unescaped `target` at or after `from`.
fn find_char(chars: &[char], from: usize, target: char) -> Option<usize> {
    let mut index = from;
    while index < chars.len() {
        match chars[index] {
            '\\' if target != '`' => index += 2,
            ch if ch == target => return Some(index),
            _ => index += 1,
        }
    }
    None
}

/// Locate the closing delimiter run of `width` copies of `delim`.
///
/// Content may not start or end with whitespace, runs of a different width are
/// skipped so nested markers stay balanced, and underscore closers may not be
/// followed by a word character.
fn find_closer(chars: &[char], start: usize, delim: char, width: usize) -> Option<usize> {
    if chars.get(start).is_none_or(|ch| ch.is_whitespace()) {
        return None;
    }

    let mut index = start + 1;
    while index < chars.len() {
        let ch = chars[index];
        if ch == '\\' {
            index += 2;
            continue;
        }
        if ch != delim {
            index += 1;
            continue;
        }

        let run = chars[index..].iter().take_while(|c| **c == delim).count();
        let preceded_by_space = chars[index - 1].is_whitespace();

        if run >= width && !preceded_by_space {
            // rightmost `width` of the run, so inner markers keep their closers
            let close = index + run - width;
            let after = chars.get(close + width);
            let intraword = delim == '_' && after.is_some_and(|c| c.is_alphanumeric());
            let uneven = width == 1 && run == 2;
            if !intraword && !uneven {
                return Some(close);
            }
        }
        index += run;
    }
    None
}

fn flush(plain: &mut String, marks: &[Mark], out: &mut Vec<Span>) {
    if !plain.is_empty() {
        push_span(out, std::mem::take(plain), marks.to_vec());
    }
}

fn push_span(out: &mut Vec<Span>, text: String, marks: Vec<Mark>) {
    if text.is_empty() {
        return;
    }
    if let Some(last) = out.last_mut()
        && last.marks == marks
    {
        last.text.push_str(&text);
        return;
    }
    out.push(Span { text, marks });
}
