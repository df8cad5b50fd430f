use once_cell::sync::Lazy;
use regex::Regex;

use crate::block::{column_count, Block, Document, Inline, List, ListItem, Row};
use crate::config::{MarkdownConfig, StrongMarker};

pub(crate) static ENTITY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^&(#[0-9]+|#[xX][0-9a-fA-F]+|[A-Za-z][A-Za-z0-9]*);").expect("valid regex")
});

static SCHEME_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]{1,31}:[^\s<>]*$").expect("valid regex")
});

/// Convert a document to canonical Markdown
pub fn render(document: &Document, config: &MarkdownConfig) -> String {
    let body = blocks_to_markdown(&document.blocks, config, false);
    if body.is_empty() {
        return body;
    }
    body + "\n"
}

/// Render a run of blocks separated by blank lines. With `tight`, a
/// paragraph directly followed by a list is joined by a single newline.
fn blocks_to_markdown(blocks: &[Block], config: &MarkdownConfig, tight: bool) -> String {
    let mut out = String::new();
    let mut previous: Option<&Block> = None;
    // (ordered, alternated) of the list rendered just before, if any
    let mut previous_list: Option<(bool, bool)> = None;

    for block in blocks {
        let alternate = match (block, previous_list) {
            (Block::List(list), Some((ordered, alternated))) if list.ordered == ordered => {
                !alternated
            }
            _ => false,
        };
        let rendered = block_to_markdown(block, config, alternate);
        if rendered.is_empty() {
            continue;
        }

        if let Some(previous) = previous {
            let join_tight = tight
                && matches!(previous, Block::Paragraph { .. })
                && matches!(block, Block::List(list) if starts_with_content(list));
            out.push_str(if join_tight { "\n" } else { "\n\n" });
        }
        out.push_str(&rendered);

        previous = Some(block);
        previous_list = match block {
            Block::List(list) => Some((list.ordered, alternate)),
            _ => None,
        };
    }

    out
}

/// An empty first item cannot interrupt a paragraph.
fn starts_with_content(list: &List) -> bool {
    list.items.first().is_some_and(|item| !item.blocks.is_empty())
}

fn block_to_markdown(block: &Block, config: &MarkdownConfig, alternate: bool) -> String {
    match block {
        Block::Heading { level, content } => {
            let mut out = "#".repeat(usize::from(*level));
            if !content.is_empty() {
                out.push(' ');
                InlineWriter::new(&mut out, config, Context::Heading).inlines(content, None);
            }
            out
        }
        Block::Paragraph { content } => {
            let mut out = String::new();
            let mut writer = InlineWriter::new(&mut out, config, Context::Paragraph);
            // A pipe on a continuation line could turn the paragraph into a table
            writer.escape_pipes = contains_line_break(content);
            writer.inlines(content, None);
            out
        }
        Block::CodeBlock { language, content } => code_block_to_markdown(language.as_deref(), content),
        Block::List(list) => list_to_markdown(list, config, alternate),
        Block::Table { header, rows } => table_to_markdown(header.as_ref(), rows, config),
        Block::BlockQuote { blocks } => {
            let body = blocks_to_markdown(blocks, config, false);
            if body.is_empty() {
                return ">".to_string();
            }
            body.lines()
                .map(|line| {
                    if line.is_empty() {
                        ">".to_string()
                    } else {
                        format!("> {line}")
                    }
                })
                .collect::<Vec<_>>()
                .join("\n")
        }
        Block::ThematicBreak => "---".to_string(),
    }
}

fn code_block_to_markdown(language: Option<&str>, content: &str) -> String {
    let language = language.unwrap_or("");
    let fence_char = if language.contains('`') { '~' } else { '`' };
    let fence = fence_char
        .to_string()
        .repeat((longest_run(content, fence_char) + 1).max(3));

    let mut out = format!("{fence}{language}\n");
    out.push_str(content);
    if !content.is_empty() && !content.ends_with('\n') {
        out.push('\n');
    }
    out.push_str(&fence);
    out
}

fn list_to_markdown(list: &List, config: &MarkdownConfig, alternate: bool) -> String {
    let mut items = Vec::with_capacity(list.items.len());
    for (i, item) in list.items.iter().enumerate() {
        let marker = if list.ordered {
            let delimiter = if alternate { ')' } else { '.' };
            format!("{}{}", i + 1, delimiter)
        } else {
            let bullet = if alternate {
                config.bullet.alternate()
            } else {
                config.bullet
            };
            bullet.as_char().to_string()
        };
        items.push(item_to_markdown(item, &marker, config));
    }
    items.join("\n")
}

/// Render the item's blocks, then hang them off the marker: the first line
/// follows the marker, later lines are indented to the content column.
fn item_to_markdown(item: &ListItem, marker: &str, config: &MarkdownConfig) -> String {
    let body = blocks_to_markdown(&item.blocks, config, true);
    if body.is_empty() {
        return marker.to_string();
    }
    let width = config.list_indent.width().max(marker.len() + 1);

    let mut out = String::new();
    for (i, line) in body.lines().enumerate() {
        if i == 0 {
            out.push_str(marker);
            out.push_str(&" ".repeat(width - marker.len()));
            // `- ---` would read as a thematic break
            out.push_str(if marker == "-" && line == "---" { "***" } else { line });
        } else {
            out.push('\n');
            if !line.is_empty() {
                out.push_str(&" ".repeat(width));
                out.push_str(line);
            }
        }
    }
    out
}

/// Pipe tables always have a header row, so a headerless table gets an
/// empty one.
fn table_to_markdown(header: Option<&Row>, rows: &[Row], config: &MarkdownConfig) -> String {
    let header = header.filter(|header| !header.is_empty());
    let width = match header {
        Some(header) => header.len(),
        None => column_count(None, rows),
    };
    if width == 0 {
        return String::new();
    }

    let mut lines = vec![
        row_to_markdown(header.map_or(&[][..], Vec::as_slice), width, config),
        format!("|{}", " --- |".repeat(width)),
    ];
    for row in rows {
        lines.push(row_to_markdown(row, width, config));
    }
    lines.join("\n")
}

fn row_to_markdown(row: &[Vec<Inline>], width: usize, config: &MarkdownConfig) -> String {
    let mut out = String::from("|");
    for i in 0..width {
        out.push(' ');
        if let Some(cell) = row.get(i) {
            let mut writer = InlineWriter::new(&mut out, config, Context::Cell);
            writer.escape_pipes = true;
            writer.inlines(cell, None);
        }
        out.push_str(" |");
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Paragraph,
    Heading,
    Cell,
}

struct InlineWriter<'a> {
    out: &'a mut String,
    config: &'a MarkdownConfig,
    context: Context,
    /// Nothing has been written on the current line yet
    line_start: bool,
    escape_pipes: bool,
}

impl<'a> InlineWriter<'a> {
    fn new(out: &'a mut String, config: &'a MarkdownConfig, context: Context) -> Self {
        Self {
            out,
            config,
            context,
            line_start: context != Context::Heading,
            escape_pipes: false,
        }
    }

    /// `outer` is the delimiter character of the enclosing emphasis, passed
    /// to the first and last child, which touch it.
    fn inlines(&mut self, inlines: &[Inline], outer: Option<char>) {
        for (i, inline) in inlines.iter().enumerate() {
            let at_edge = i == 0 || i + 1 == inlines.len();
            self.inline(inline, outer.filter(|_| at_edge), inlines.get(i + 1));
        }
    }

    fn inline(&mut self, inline: &Inline, outer: Option<char>, next: Option<&Inline>) {
        match inline {
            Inline::Text(text) => self.text(text, matches!(next, Some(Inline::Link { .. }))),
            Inline::Strong(inner) => {
                let marker = self.strong_marker(inner, outer, next.and_then(Inline::first_char));
                self.delimited(marker, inner);
            }
            Inline::Emphasis(inner) => self.delimited("_", inner),
            Inline::Code(code) => self.code(code),
            Inline::Link { url, content } => self.link(url, content),
            Inline::LineBreak => {
                if self.context == Context::Paragraph {
                    self.out.push_str("\\\n");
                    self.line_start = true;
                } else {
                    self.out.push(' ');
                }
            }
        }
    }

    fn delimited(&mut self, marker: &str, inner: &[Inline]) {
        self.line_start = false;
        self.out.push_str(marker);
        self.inlines(inner, marker.chars().next());
        self.out.push_str(marker);
    }

    /// The configured strong marker, swapped for the other character when it
    /// would merge with an adjacent delimiter or sit inside a word.
    fn strong_marker(&self, inner: &[Inline], outer: Option<char>, next: Option<char>) -> &'static str {
        let edge_emphasis = matches!(inner.first(), Some(Inline::Emphasis(_)))
            || matches!(inner.last(), Some(Inline::Emphasis(_)));
        let in_word = self.out.chars().next_back().is_some_and(char::is_alphanumeric)
            || next.is_some_and(char::is_alphanumeric);

        match self.config.strong_marker {
            StrongMarker::DoubleUnderscore if edge_emphasis || in_word || outer == Some('_') => "**",
            StrongMarker::Asterisk | StrongMarker::DoubleAsterisk
                if outer == Some('*') && !edge_emphasis && !in_word =>
            {
                "__"
            }
            marker => marker.as_str(),
        }
    }

    /// `before_link`: a trailing `!` would turn the following link into an
    /// image.
    fn text(&mut self, text: &str, before_link: bool) {
        let mut chars = text.char_indices().peekable();
        while let Some((i, ch)) = chars.next() {
            let line_start = std::mem::replace(&mut self.line_start, false);
            let escape = match ch {
                '\\' | '*' | '_' | '`' | '[' | ']' | '<' => true,
                '&' => ENTITY.is_match(&text[i..]),
                // Raw line endings would end the line or the whole block
                '\n' => {
                    self.out.push_str("&#10;");
                    continue;
                }
                '\r' => {
                    self.out.push_str("&#13;");
                    continue;
                }
                '!' => before_link && chars.peek().is_none(),
                '#' => line_start || self.context == Context::Heading,
                '|' => line_start || self.escape_pipes,
                '-' => line_start && self.context != Context::Heading,
                ':' => line_start && self.context == Context::Cell,
                '+' | '=' | '~' | '>' => line_start && self.context == Context::Paragraph,
                '0'..='9' if line_start && self.context == Context::Paragraph => {
                    // `1.` or `1)` at line start would open an ordered list
                    self.out.push(ch);
                    while let Some(&(_, digit)) = chars.peek().filter(|(_, c)| c.is_ascii_digit()) {
                        self.out.push(digit);
                        chars.next();
                    }
                    if let Some(&(_, delimiter @ ('.' | ')'))) = chars.peek() {
                        self.out.push('\\');
                        self.out.push(delimiter);
                        chars.next();
                    }
                    continue;
                }
                _ => false,
            };
            if escape {
                self.out.push('\\');
            }
            self.out.push(ch);
        }
    }

    fn code(&mut self, code: &str) {
        self.line_start = false;
        let fence = "`".repeat(longest_run(code, '`') + 1);
        let pad = code.is_empty()
            || code.starts_with('`')
            || code.ends_with('`')
            || (code.starts_with(' ') && code.ends_with(' ') && !code.trim().is_empty());

        self.out.push_str(&fence);
        if pad {
            self.out.push(' ');
        }
        if self.context == Context::Cell {
            self.out.push_str(&code.replace('|', "\\|"));
        } else {
            self.out.push_str(code);
        }
        if pad && !code.is_empty() {
            self.out.push(' ');
        }
        self.out.push_str(&fence);
    }

    fn link(&mut self, url: &str, content: &[Inline]) {
        self.line_start = false;
        if matches!(content, [Inline::Text(text)] if text == url) && SCHEME_URL.is_match(url) {
            self.out.push('<');
            self.out.push_str(url);
            self.out.push('>');
            return;
        }

        self.out.push('[');
        self.inlines(content, None);
        self.out.push_str("](");
        if url.contains(|c: char| c.is_whitespace() || matches!(c, '(' | ')' | '<' | '>')) {
            self.out.push('<');
            for ch in url.chars() {
                if matches!(ch, '\\' | '<' | '>') {
                    self.out.push('\\');
                }
                self.out.push(ch);
            }
            self.out.push('>');
        } else {
            self.out.push_str(&url.replace('\\', "\\\\"));
        }
        self.out.push(')');
    }
}

fn contains_line_break(inlines: &[Inline]) -> bool {
    inlines.iter().any(|inline| match inline {
        Inline::LineBreak => true,
        Inline::Strong(inner) | Inline::Emphasis(inner) | Inline::Link { content: inner, .. } => {
            contains_line_break(inner)
        }
        Inline::Text(_) | Inline::Code(_) => false,
    })
}

/// Length of the longest run of `ch` in `text`.
pub(crate) fn longest_run(text: &str, ch: char) -> usize {
    let mut longest = 0;
    let mut current = 0;
    for c in text.chars() {
        if c == ch {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 0;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Bullet, ListIndent};
    use crate::parser::parse;

    fn md(input: &str) -> String {
        render(&parse(input), &MarkdownConfig::default())
    }

    fn text(s: &str) -> Inline {
        Inline::text(s)
    }

    fn para(content: Vec<Inline>) -> Document {
        Document::new(vec![Block::Paragraph { content }])
    }

    fn render_default(document: &Document) -> String {
        render(document, &MarkdownConfig::default())
    }

    #[test]
    fn heading_and_strong() {
        assert_eq!(md("# Title\n\nSome *bold* text."), "# Title\n\nSome *bold* text.\n");
    }

    #[test]
    fn double_asterisks_normalize_to_configured_marker() {
        assert_eq!(md("**bold** and __strong__"), "*bold* and *strong*\n");

        let config = MarkdownConfig {
            strong_marker: StrongMarker::DoubleAsterisk,
            ..MarkdownConfig::default()
        };
        assert_eq!(render(&parse("*bold*"), &config), "**bold**\n");
    }

    #[test]
    fn emphasis_uses_underscore() {
        assert_eq!(md("_it_ and *_both_*"), "_it_ and *_both_*\n");
    }

    #[test]
    fn empty_document_is_empty_string() {
        assert_eq!(render_default(&Document::default()), "");
    }

    #[test]
    fn escapes_markup_characters_in_text() {
        let doc = para(vec![text(r"2 * 3 = 6_x [a] <b> `c` \ &amp; & done")]);
        assert_eq!(
            render_default(&doc),
            "2 \\* 3 = 6\\_x \\[a\\] \\<b> \\`c\\` \\\\ \\&amp; & done\n"
        );
    }

    #[test]
    fn escapes_block_syntax_at_line_start() {
        for (input, expected) in [
            ("# not a heading", "\\# not a heading\n"),
            ("- not a list", "\\- not a list\n"),
            ("+ plus", "\\+ plus\n"),
            ("> quote", "\\> quote\n"),
            ("~~~", "\\~~~\n"),
            ("2019. a year", "2019\\. a year\n"),
            ("3) three", "3\\) three\n"),
            ("| pipe", "\\| pipe\n"),
        ] {
            assert_eq!(render_default(&para(vec![text(input)])), expected, "{input}");
        }
    }

    #[test]
    fn newlines_in_text_are_character_references() {
        let doc = para(vec![text("a\n# b\n\nc")]);
        let rendered = render_default(&doc);
        assert_eq!(rendered, "a&#10;# b&#10;&#10;c\n");
        assert_eq!(parse(&rendered), doc);
    }

    #[test]
    fn bang_before_a_link_is_escaped() {
        let doc = para(vec![
            text("wow!"),
            Inline::Link {
                url: "u".to_string(),
                content: vec![text("x")],
            },
            text(" yes!"),
        ]);
        let rendered = render_default(&doc);
        assert_eq!(rendered, "wow\\![x](u) yes!\n");
        assert_eq!(parse(&rendered), doc);
        assert_eq!(md("![logo](l.png)"), "\\![logo](l.png)\n");
    }

    #[test]
    fn line_start_after_hard_break() {
        let doc = para(vec![text("a"), Inline::LineBreak, text("- b | c")]);
        assert_eq!(render_default(&doc), "a\\\n\\- b \\| c\n");
    }

    #[test]
    fn hash_escaped_anywhere_in_heading() {
        let doc = Document::new(vec![Block::heading(2, vec![text("C# - #1")])]);
        assert_eq!(render_default(&doc), "## C\\# - \\#1\n");
    }

    #[test]
    fn inline_code_fences() {
        assert_eq!(md("`a`"), "`a`\n");
        assert_eq!(md("`` a`b ``"), "``a`b``\n");
        assert_eq!(md("`` `tick` ``"), "`` `tick` ``\n");
        assert_eq!(render_default(&para(vec![Inline::Code("  x  ".into())])), "`   x   `\n");
    }

    #[test]
    fn code_block_fence_outgrows_content() {
        let doc = Document::new(vec![Block::CodeBlock {
            language: Some("md".into()),
            content: "```\ninner\n````\n".into(),
        }]);
        assert_eq!(render_default(&doc), "`````md\n```\ninner\n````\n`````\n");
    }

    #[test]
    fn code_block_without_trailing_newline() {
        let doc = Document::new(vec![Block::CodeBlock {
            language: None,
            content: "x".into(),
        }]);
        assert_eq!(render_default(&doc), "```\nx\n```\n");
    }

    #[test]
    fn tilde_fence_when_language_has_backtick() {
        let doc = Document::new(vec![Block::CodeBlock {
            language: Some("a`b".into()),
            content: "x\n".into(),
        }]);
        assert_eq!(render_default(&doc), "~~~a`b\nx\n~~~\n");
    }

    #[test]
    fn links() {
        assert_eq!(md("[the *docs*](https://x.org \"t\")"), "[the *docs*](https://x.org)\n");
        assert_eq!(md("<https://x.org>"), "<https://x.org>\n");
        assert_eq!(md("[a](<b c>) [d](e(f))"), "[a](<b c>) [d](<e(f)>)\n");
    }

    #[test]
    fn nested_lists() {
        assert_eq!(
            md("- one\n  - two\n    - three\n- four"),
            "- one\n  - two\n    - three\n- four\n"
        );
        assert_eq!(md("1. a\n2. b\n   - c"), "1. a\n2. b\n   - c\n");
    }

    #[test]
    fn list_indent_from_config() {
        let config = MarkdownConfig {
            list_indent: ListIndent::Four,
            bullet: Bullet::Asterisk,
            ..MarkdownConfig::default()
        };
        assert_eq!(
            render(&parse("- a\n  - b"), &config),
            "*   a\n    *   b\n"
        );
    }

    #[test]
    fn loose_item_blocks() {
        assert_eq!(
            md("- a\n\n  more\n\n  ```\n  code\n  ```\n- b"),
            "- a\n\n  more\n\n  ```\n  code\n  ```\n- b\n"
        );
    }

    #[test]
    fn consecutive_lists_alternate_markers() {
        let list = |ordered| {
            Block::List(List {
                ordered,
                items: vec![ListItem {
                    blocks: vec![Block::Paragraph { content: vec![text("x")] }],
                }],
            })
        };
        let doc = Document::new(vec![list(false), list(false), list(false), list(true), list(true)]);
        assert_eq!(
            render_default(&doc),
            "- x\n\n* x\n\n- x\n\n1. x\n\n1) x\n"
        );
    }

    #[test]
    fn empty_item_and_thematic_break_item() {
        let doc = Document::new(vec![Block::List(List {
            ordered: false,
            items: vec![
                ListItem::default(),
                ListItem {
                    blocks: vec![Block::ThematicBreak],
                },
            ],
        })]);
        assert_eq!(render_default(&doc), "-\n- ***\n");
    }

    #[test]
    fn tables_pad_and_truncate_to_header() {
        assert_eq!(
            md("| A | B |\n|---|---|\n| 1 |\n| 2 | 3 | 4 |"),
            "| A | B |\n| --- | --- |\n| 1 |  |\n| 2 | 3 |\n"
        );
    }

    #[test]
    fn headerless_table_gets_an_empty_header_and_cell_escapes() {
        let doc = Document::new(vec![Block::Table {
            header: None,
            rows: vec![
                vec![vec![text("a | b")], vec![Inline::Code("x|y".into())]],
                vec![vec![text("c")]],
            ],
        }]);
        let rendered = render_default(&doc);
        assert_eq!(rendered, "|  |  |\n| --- | --- |\n| a \\| b | `x\\|y` |\n| c |  |\n");
        assert_eq!(
            parse(&rendered),
            Document::new(vec![Block::Table {
                header: Some(vec![vec![], vec![]]),
                rows: vec![
                    vec![vec![text("a | b")], vec![Inline::Code("x|y".into())]],
                    vec![vec![text("c")], vec![]],
                ],
            }])
        );
    }

    #[test]
    fn separator_like_cells_are_escaped() {
        let doc = Document::new(vec![Block::Table {
            header: Some(vec![vec![text("h")]]),
            rows: vec![vec![vec![text("a")]], vec![vec![text(":--")]], vec![vec![text("---")]]],
        }]);
        let rendered = render_default(&doc);
        assert_eq!(rendered, "| h |\n| --- |\n| a |\n| \\:-- |\n| \\--- |\n");
        assert_eq!(parse(&rendered), doc);
    }

    #[test]
    fn block_quotes() {
        assert_eq!(md("> # Q\n>\n> > inner"), "> # Q\n>\n> > inner\n");
    }

    #[test]
    fn strong_inside_strong_uses_other_marker() {
        let doc = para(vec![Inline::Strong(vec![Inline::Strong(vec![text("x")])])]);
        let rendered = render_default(&doc);
        assert_eq!(rendered, "*__x__*\n");
        assert_eq!(parse(&rendered), doc);
    }

    #[test]
    fn parsed_documents_survive_a_round_trip() {
        let sources = [
            "# Title\n\nSome *bold* and _em_ with `code` and [a link](http://x.y).",
            "1. first\n\n   second para\n2. next\n   - nested\n\n     deep",
            "> quote with 2019. text\n>\n> - item",
            "| h1 | h2 |\n|----|----|\n| *a* | b |",
            "a  \n- b\n\n````\n```\n````",
            "***\n\nsnake_case and 5 * 3 and a\\*b",
        ];
        for source in sources {
            let document = parse(source);
            assert_eq!(parse(&render_default(&document)), document, "{source}");
        }
    }
}
