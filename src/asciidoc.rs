use once_cell::sync::Lazy;
use regex::Regex;

use crate::block::{column_count, Block, Document, Inline, List, ListItem, Row};
use crate::config::AsciidocConfig;
use crate::markdown::ENTITY;

/// Characters that carry inline meaning and are passed through verbatim
const SPECIAL: &[char] = &['*', '_', '`', '#', '^', '~', '{', '}', '[', ']', '\\'];

/// Typographic replacements applied to normal text
const REPLACEMENTS: &[&str] = &["(TM)", "(C)", "(R)", "...", "--", "->", "<-", "=>", "<=", "<<"];

/// Line openings that would be read as block syntax
static BLOCK_GUARD: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[=\-./:|'>]|[0-9]+\.|(?:NOTE|TIP|IMPORTANT|WARNING|CAUTION):)")
        .expect("valid regex")
});

/// Convert a document to AsciiDoc
pub fn render(document: &Document, config: &AsciidocConfig) -> String {
    let body = blocks_to_asciidoc(&document.blocks, Nesting::default(), config);
    if body.is_empty() {
        return body;
    }
    body + "\n"
}

#[derive(Debug, Clone, Copy, Default)]
struct Nesting {
    list: usize,
    quote: usize,
}

impl Nesting {
    fn is_nested(self) -> bool {
        self.list > 0 || self.quote > 0
    }
}

fn blocks_to_asciidoc(blocks: &[Block], nesting: Nesting, config: &AsciidocConfig) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut previous_list = false;
    for block in blocks {
        let rendered = block_to_asciidoc(block, nesting, config);
        if rendered.is_empty() {
            continue;
        }
        let is_list = matches!(block, Block::List(_));
        if is_list && previous_list {
            // Comment line so adjacent lists are not merged
            parts.push("//-".to_string());
        }
        previous_list = is_list;
        parts.push(rendered);
    }
    parts.join("\n\n")
}

fn block_to_asciidoc(block: &Block, nesting: Nesting, config: &AsciidocConfig) -> String {
    match block {
        Block::Heading { level, content } => {
            let mut out = String::new();
            if nesting.is_nested() {
                out.push_str("[discrete]\n");
            }
            // Seven or more `=` is paragraph text
            let depth = (usize::from(*level) + usize::from(config.heading_offset)).min(6);
            out.push_str(&"=".repeat(depth));
            let title = inlines_to_asciidoc(content, Context::Heading);
            if !title.is_empty() {
                out.push(' ');
                out.push_str(&title);
            }
            out
        }
        Block::Paragraph { content } => inlines_to_asciidoc(content, Context::Paragraph),
        Block::CodeBlock { language, content } => code_block_to_asciidoc(language.as_deref(), content),
        Block::List(list) => list_to_asciidoc(list, nesting, config),
        Block::Table { header, rows } => table_to_asciidoc(header.as_ref(), rows),
        Block::BlockQuote { blocks } => {
            let delimiter = "_".repeat(4 + nesting.quote);
            let inner = Nesting {
                list: 0,
                quote: nesting.quote + 1,
            };
            let body = blocks_to_asciidoc(blocks, inner, config);
            if body.is_empty() {
                format!("{delimiter}\n{delimiter}")
            } else {
                format!("{delimiter}\n{body}\n{delimiter}")
            }
        }
        Block::ThematicBreak => "'''".to_string(),
    }
}

fn code_block_to_asciidoc(language: Option<&str>, content: &str) -> String {
    let mut out = String::new();
    if let Some(language) = language {
        out.push_str(&format!("[source,{language}]\n"));
    }

    // A content line made only of dashes would close a delimiter of equal length
    let longest_dashes = content
        .lines()
        .filter(|line| !line.is_empty() && line.chars().all(|c| c == '-'))
        .map(str::len)
        .max()
        .unwrap_or(0);
    let delimiter = "-".repeat((longest_dashes + 1).max(4));

    out.push_str(&delimiter);
    out.push('\n');
    out.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&delimiter);
    out
}

fn list_to_asciidoc(list: &List, nesting: Nesting, config: &AsciidocConfig) -> String {
    let marker = if list.ordered { "." } else { "*" }.repeat(nesting.list + 1);
    list.items
        .iter()
        .map(|item| item_to_asciidoc(item, &marker, nesting, config))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The first paragraph follows the marker. Nested lists follow directly,
/// other blocks are attached with a `+` continuation line.
fn item_to_asciidoc(item: &ListItem, marker: &str, nesting: Nesting, config: &AsciidocConfig) -> String {
    let mut out = format!("{marker} ");
    let rest = match item.blocks.split_first() {
        Some((Block::Paragraph { content }, rest)) => {
            out.push_str(&inlines_to_asciidoc(content, Context::Paragraph));
            rest
        }
        _ => {
            out.push_str("{empty}");
            item.blocks.as_slice()
        }
    };

    let inner = Nesting {
        list: nesting.list + 1,
        ..nesting
    };
    for block in rest {
        let rendered = block_to_asciidoc(block, inner, config);
        if rendered.is_empty() {
            continue;
        }
        if matches!(block, Block::List(_)) {
            out.push('\n');
        } else {
            out.push_str("\n+\n");
        }
        out.push_str(&rendered);
    }
    out
}

fn table_to_asciidoc(header: Option<&Row>, rows: &[Row]) -> String {
    let width = column_count(header, rows);
    if width == 0 {
        return String::new();
    }

    let mut out = match header {
        Some(_) => format!("[%header,cols=\"{width}*\"]\n"),
        None => format!("[cols=\"{width}*\"]\n"),
    };
    out.push_str("|===\n");
    if let Some(header) = header {
        out.push_str(&row_to_asciidoc(header, width));
        out.push_str("\n\n");
    }
    for row in rows {
        out.push_str(&row_to_asciidoc(row, width));
        out.push('\n');
    }
    out.push_str("|===");
    out
}

fn row_to_asciidoc(row: &[Vec<Inline>], width: usize) -> String {
    (0..width)
        .map(|i| {
            let cell = row
                .get(i)
                .map(|cell| inlines_to_asciidoc(cell, Context::Cell))
                .unwrap_or_default();
            if cell.is_empty() {
                "|".to_string()
            } else {
                format!("| {cell}")
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Paragraph,
    Heading,
    Cell,
    /// Inside a `link:` macro's brackets
    Label,
}

fn inlines_to_asciidoc(inlines: &[Inline], context: Context) -> String {
    let mut out = String::new();
    let mut writer = InlineWriter {
        out: &mut out,
        context,
        line_start: context == Context::Paragraph,
    };
    writer.inlines(inlines);
    out
}

struct InlineWriter<'a> {
    out: &'a mut String,
    context: Context,
    line_start: bool,
}

impl InlineWriter<'_> {
    fn inlines(&mut self, inlines: &[Inline]) {
        for (i, inline) in inlines.iter().enumerate() {
            let next = inlines.get(i + 1).and_then(Inline::first_char);
            self.inline(inline, next);
        }
    }

    fn inline(&mut self, inline: &Inline, next: Option<char>) {
        match inline {
            Inline::Text(text) => self.text(text),
            Inline::Strong(inner) => self.formatted('*', inner, next),
            Inline::Emphasis(inner) => self.formatted('_', inner, next),
            Inline::Code(code) => self.code(code, next),
            Inline::Link { url, content } => self.link(url, content),
            Inline::LineBreak => {
                if self.context == Context::Paragraph {
                    self.out.push_str(" +\n");
                    self.line_start = true;
                } else {
                    self.out.push(' ');
                }
            }
        }
    }

    /// Constrained markers need a non-word character on the outside.
    fn touches_word(&self, next: Option<char>) -> bool {
        self.out.chars().next_back().is_some_and(is_word_char) || next.is_some_and(is_word_char)
    }

    fn formatted(&mut self, marker: char, inner: &[Inline], next: Option<char>) {
        self.line_start = false;
        let padded = |c: Option<char>| c.is_none_or(char::is_whitespace);
        let unconstrained = self.touches_word(next)
            || padded(inner.first().and_then(Inline::first_char))
            || padded(inner.last().and_then(Inline::last_char));
        let count = if unconstrained { 2 } else { 1 };

        self.push_marker(marker, count);
        self.inlines(inner);
        self.push_marker(marker, count);
    }

    fn push_marker(&mut self, marker: char, count: usize) {
        for _ in 0..count {
            self.out.push(marker);
        }
    }

    fn code(&mut self, code: &str, next: Option<char>) {
        self.line_start = false;
        let tick = if self.touches_word(next) { "``" } else { "`" };
        let literal = code.contains("+`")
            || code.ends_with('+')
            || code.is_empty()
            || code.starts_with(char::is_whitespace)
            || code.ends_with(char::is_whitespace);
        let mut body = if literal {
            format!("pass:c[{}]", code.replace(']', "\\]"))
        } else {
            format!("+{code}+")
        };
        if self.context == Context::Cell {
            body = body.replace('|', "\\|");
        }
        self.out.push_str(tick);
        self.out.push_str(&body);
        self.out.push_str(tick);
    }

    fn link(&mut self, url: &str, content: &[Inline]) {
        self.line_start = false;
        self.out.push_str("link:");
        if url.contains([' ', '[', ']', '_', '*', '`', '#', '^', '~']) {
            self.out.push_str("++");
            self.out.push_str(url);
            self.out.push_str("++");
        } else {
            self.out.push_str(url);
        }

        let label = inlines_to_asciidoc(content, Context::Label);
        self.out.push('[');
        if label.contains([',', '=']) {
            self.out.push('"');
            self.out.push_str(&label.replace('"', "\\\""));
            self.out.push('"');
        } else {
            self.out.push_str(&label);
        }
        self.out.push(']');
    }

    fn text(&mut self, text: &str) {
        if std::mem::replace(&mut self.line_start, false) && BLOCK_GUARD.is_match(text) {
            self.out.push_str("{empty}");
        }

        let mut passthrough = String::new();
        let mut rest = text;
        while let Some(ch) = rest.chars().next() {
            if let Some(sequence) = REPLACEMENTS.iter().find(|s| rest.starts_with(**s)) {
                passthrough.push_str(sequence);
                rest = &rest[sequence.len()..];
                continue;
            }
            if SPECIAL.contains(&ch) || (ch == '&' && ENTITY.is_match(rest)) {
                passthrough.push(ch);
                rest = &rest[ch.len_utf8()..];
                continue;
            }

            self.flush_passthrough(&mut passthrough);
            rest = &rest[ch.len_utf8()..];
            match ch {
                '+' => self.out.push_str("{plus}"),
                // A blank line would end the paragraph
                '\n' | '\r' => self.out.push(' '),
                '|' if self.context == Context::Cell => self.out.push_str("\\|"),
                // `term::` and `term;;` open a description list
                ':' | ';' if rest.starts_with(ch) => {
                    self.out.push(ch);
                    self.out.push_str("{empty}");
                }
                _ => self.out.push(ch),
            }
        }
        self.flush_passthrough(&mut passthrough);
    }

    fn flush_passthrough(&mut self, passthrough: &mut String) {
        if !passthrough.is_empty() {
            self.out.push_str("++");
            self.out.push_str(passthrough);
            self.out.push_str("++");
            passthrough.clear();
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}
