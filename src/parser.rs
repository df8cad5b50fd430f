//! Folds pulldown-cmark events into a [`Document`].
//!
//! The source dialect is CommonMark with pipe tables, plus one twist: a
//! single `*` run marks strong text, so `*x*` and `**x**` are both
//! [`Inline::Strong`] while `_x_` stays [`Inline::Emphasis`]. Raw HTML and
//! other syntax without a node of its own is kept as literal text.

use std::ops::Range;

use pulldown_cmark::{CodeBlockKind, Event, HeadingLevel, LinkType, Options, Parser, Tag, TagEnd};

use crate::block::{Block, Document, Inline, List, ListItem, Row};

/// Quotes and list items nested deeper than this are flattened into their
/// enclosing container.
pub const MAX_BLOCK_DEPTH: usize = 32;

/// Formatting nested deeper than this keeps its markup as literal text.
/// A leaf counts as one level.
pub const MAX_INLINE_DEPTH: usize = 32;

/// Parse canonical markup into a document tree.
pub fn parse(markup: &str) -> Document {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    let parser = Parser::new_ext(markup, options);
    let mut state = ParseState::new(markup);

    for (event, range) in parser.into_offset_iter() {
        state.process_event(event, range);
    }

    state.finish()
}

enum Container {
    Quote(Vec<Block>),
    List { ordered: bool, items: Vec<ListItem> },
    Item(Vec<Block>),
}

enum Frame {
    /// Formatting being collected, holding the content that precedes it
    Open { kind: FrameKind, before: Vec<Inline> },
    /// Formatting past the depth cap: its closing markup, emitted as text
    Literal(String),
}

enum FrameKind {
    Emphasis,
    Strong,
    Link(String),
}

#[derive(Default)]
struct TableBuilder {
    header: Option<Row>,
    rows: Vec<Row>,
    row: Row,
}

struct ParseState<'a> {
    source: &'a str,
    blocks: Vec<Block>,

    // Open quotes, lists and items, innermost last
    containers: Vec<Container>,
    // Containers opened past the depth cap; their content goes to the
    // innermost real container
    flattened: usize,

    // Inline content of the current leaf block
    inlines: Vec<Inline>,
    frames: Vec<Frame>,
    inline_depth: usize,

    code: Option<(Option<String>, String)>,
    html: Option<String>,
    table: Option<TableBuilder>,
}

impl<'a> ParseState<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            blocks: Vec::new(),
            containers: Vec::new(),
            flattened: 0,
            inlines: Vec::new(),
            frames: Vec::new(),
            inline_depth: 0,
            code: None,
            html: None,
            table: None,
        }
    }

    fn finish(mut self) -> Document {
        self.flush_paragraph();
        while let Some(container) = self.containers.pop() {
            self.close_container(container);
        }
        Document::new(self.blocks)
    }

    fn process_event(&mut self, event: Event<'_>, range: Range<usize>) {
        match event {
            // Leaf blocks
            Event::Start(Tag::Paragraph) => self.flush_paragraph(),
            Event::End(TagEnd::Paragraph) => self.flush_paragraph(),

            Event::Start(Tag::Heading { .. }) => self.flush_paragraph(),
            Event::End(TagEnd::Heading(level)) => {
                let content = self.take_inlines();
                self.push_block(Block::heading(heading_level(level), content));
            }

            Event::Start(Tag::CodeBlock(kind)) => {
                self.flush_paragraph();
                let language = match kind {
                    CodeBlockKind::Fenced(info) => {
                        info.split_whitespace().next().map(str::to_string)
                    }
                    CodeBlockKind::Indented => None,
                };
                self.code = Some((language, String::new()));
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some((language, content)) = self.code.take() {
                    self.push_block(Block::CodeBlock { language, content });
                }
            }

            Event::Start(Tag::HtmlBlock) => {
                self.flush_paragraph();
                self.html = Some(String::new());
            }
            Event::End(TagEnd::HtmlBlock) => {
                let html = self.html.take().unwrap_or_default();
                let text = html.split_whitespace().collect::<Vec<_>>().join(" ");
                if !text.is_empty() {
                    self.push_block(Block::Paragraph {
                        content: vec![Inline::Text(text)],
                    });
                }
            }

            Event::Rule => {
                self.flush_paragraph();
                self.push_block(Block::ThematicBreak);
            }

            // Containers
            Event::Start(Tag::BlockQuote(_)) => self.open_container(Container::Quote(Vec::new())),
            Event::Start(Tag::List(first_number)) => self.open_container(Container::List {
                ordered: first_number.is_some(),
                items: Vec::new(),
            }),
            Event::Start(Tag::Item) => self.open_container(Container::Item(Vec::new())),
            Event::End(TagEnd::BlockQuote(_) | TagEnd::List(_) | TagEnd::Item) => {
                self.flush_paragraph();
                if self.flattened > 0 {
                    self.flattened -= 1;
                } else if let Some(container) = self.containers.pop() {
                    self.close_container(container);
                }
            }

            // Tables
            Event::Start(Tag::Table(_)) => {
                self.flush_paragraph();
                self.table = Some(TableBuilder::default());
            }
            Event::End(TagEnd::Table) => {
                if let Some(table) = self.table.take() {
                    self.push_block(Block::Table {
                        header: table.header,
                        rows: table.rows,
                    });
                }
            }
            Event::End(TagEnd::TableHead) => {
                if let Some(table) = &mut self.table {
                    table.header = Some(std::mem::take(&mut table.row));
                }
            }
            Event::End(TagEnd::TableRow) => {
                if let Some(table) = &mut self.table {
                    let row = std::mem::take(&mut table.row);
                    table.rows.push(row);
                }
            }
            Event::End(TagEnd::TableCell) => {
                let cell = self.take_inlines();
                if let Some(table) = &mut self.table {
                    table.row.push(cell);
                }
            }

            // Text content
            Event::Text(text) => {
                if let Some((_, content)) = &mut self.code {
                    content.push_str(&text);
                } else {
                    self.push_text(&text);
                }
            }
            Event::Html(html) => match &mut self.html {
                Some(buffer) => buffer.push_str(&html),
                None => self.push_text(&html),
            },
            Event::InlineHtml(html) => self.push_text(&html),
            Event::Code(code) => self.inlines.push(Inline::Code(code.into_string())),
            Event::SoftBreak => self.push_text(" "),
            Event::HardBreak => self.inlines.push(Inline::LineBreak),

            // Inline formatting
            Event::Start(Tag::Emphasis) => {
                let marker = self.marker_at(range.start);
                let kind = if marker == '*' {
                    FrameKind::Strong
                } else {
                    FrameKind::Emphasis
                };
                let delimiter = marker.to_string();
                self.open_inline(kind, delimiter.clone(), delimiter);
            }
            Event::Start(Tag::Strong) => {
                let delimiter = self.marker_at(range.start).to_string().repeat(2);
                self.open_inline(FrameKind::Strong, delimiter.clone(), delimiter);
            }
            Event::Start(Tag::Link {
                link_type,
                dest_url,
                ..
            }) => self.open_link(link_type, dest_url.into_string()),
            // Images have no node of their own: the `!` stays as text
            Event::Start(Tag::Image {
                link_type,
                dest_url,
                ..
            }) => {
                self.push_text("!");
                self.open_link(link_type, dest_url.into_string());
            }
            Event::End(TagEnd::Emphasis | TagEnd::Strong | TagEnd::Link | TagEnd::Image) => {
                self.close_inline();
            }

            _ => {}
        }
    }

    /// The delimiter character an emphasis span starts with.
    fn marker_at(&self, offset: usize) -> char {
        match self.source.as_bytes().get(offset) {
            Some(b'_') => '_',
            _ => '*',
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(Inline::Text(last)) = self.inlines.last_mut() {
            last.push_str(text);
        } else {
            self.inlines.push(Inline::Text(text.to_string()));
        }
    }

    fn open_link(&mut self, link_type: LinkType, url: String) {
        let (open, close) = match link_type {
            LinkType::Autolink | LinkType::Email => ("<".to_string(), ">".to_string()),
            _ => ("[".to_string(), format!("]({url})")),
        };
        self.open_inline(FrameKind::Link(url), open, close);
    }

    fn open_inline(&mut self, kind: FrameKind, open: String, close: String) {
        if self.inline_depth + 1 >= MAX_INLINE_DEPTH {
            self.push_text(&open);
            self.frames.push(Frame::Literal(close));
            return;
        }
        self.inline_depth += 1;
        let before = std::mem::take(&mut self.inlines);
        self.frames.push(Frame::Open { kind, before });
    }

    fn close_inline(&mut self) {
        match self.frames.pop() {
            Some(Frame::Open { kind, before }) => {
                self.inline_depth -= 1;
                let content = std::mem::replace(&mut self.inlines, before);
                self.inlines.push(match kind {
                    FrameKind::Emphasis => Inline::Emphasis(content),
                    FrameKind::Strong => Inline::Strong(content),
                    FrameKind::Link(url) => Inline::Link { url, content },
                });
            }
            Some(Frame::Literal(close)) => self.push_text(&close),
            None => {}
        }
    }

    fn take_inlines(&mut self) -> Vec<Inline> {
        std::mem::take(&mut self.inlines)
    }

    /// Turn loose inline content into a paragraph. Tight list items carry
    /// their text without paragraph events.
    fn flush_paragraph(&mut self) {
        if !self.inlines.is_empty() && self.table.is_none() {
            let content = self.take_inlines();
            self.push_block(Block::Paragraph { content });
        }
    }

    fn depth(&self) -> usize {
        self.containers
            .iter()
            .filter(|container| !matches!(container, Container::List { .. }))
            .count()
    }

    fn open_container(&mut self, container: Container) {
        self.flush_paragraph();
        let nests = !matches!(container, Container::Item(_));
        if self.flattened > 0 || (nests && self.depth() >= MAX_BLOCK_DEPTH) {
            self.flattened += 1;
        } else {
            self.containers.push(container);
        }
    }

    fn close_container(&mut self, container: Container) {
        match container {
            Container::Quote(blocks) => self.push_block(Block::BlockQuote { blocks }),
            Container::List { ordered, items } => self.push_block(Block::List(List { ordered, items })),
            Container::Item(blocks) => {
                if let Some(Container::List { items, .. }) = self.containers.last_mut() {
                    items.push(ListItem { blocks });
                }
            }
        }
    }

    fn push_block(&mut self, block: Block) {
        log::trace!("depth {}: {}", self.containers.len(), kind_name(&block));
        match self.containers.last_mut() {
            Some(Container::Quote(blocks) | Container::Item(blocks)) => blocks.push(block),
            // Lists only hold items
            Some(Container::List { .. }) => {}
            None => self.blocks.push(block),
        }
    }
}

fn kind_name(block: &Block) -> &'static str {
    match block {
        Block::Heading { .. } => "heading",
        Block::Paragraph { .. } => "paragraph",
        Block::CodeBlock { .. } => "code block",
        Block::List(_) => "list",
        Block::Table { .. } => "table",
        Block::BlockQuote { .. } => "block quote",
        Block::ThematicBreak => "thematic break",
    }
}

fn heading_level(level: HeadingLevel) -> usize {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}
