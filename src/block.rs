/// Inline content with formatting
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inline {
    /// Literal text, no markup semantics
    Text(String),
    /// Italic
    Emphasis(Vec<Inline>),
    /// Bold
    Strong(Vec<Inline>),
    /// Inline code span, never re-parsed or escaped
    Code(String),
    Link {
        url: String,
        content: Vec<Inline>,
    },
    /// Hard break within a paragraph
    LineBreak,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text(text.into())
    }

    /// The first character this inline would display, looking through
    /// formatting. `None` for line breaks and empty containers.
    pub fn first_char(&self) -> Option<char> {
        match self {
            Inline::Text(text) | Inline::Code(text) => text.chars().next(),
            Inline::Emphasis(inner) | Inline::Strong(inner) | Inline::Link { content: inner, .. } => {
                inner.first().and_then(Inline::first_char)
            }
            Inline::LineBreak => None,
        }
    }

    /// The last character this inline would display.
    pub fn last_char(&self) -> Option<char> {
        match self {
            Inline::Text(text) | Inline::Code(text) => text.chars().next_back(),
            Inline::Emphasis(inner) | Inline::Strong(inner) | Inline::Link { content: inner, .. } => {
                inner.last().and_then(Inline::last_char)
            }
            Inline::LineBreak => None,
        }
    }

    /// Nesting depth, counting leaves as 1.
    pub fn depth(&self) -> usize {
        match self {
            Inline::Emphasis(inner) | Inline::Strong(inner) | Inline::Link { content: inner, .. } => {
                1 + inner.iter().map(Inline::depth).max().unwrap_or(0)
            }
            Inline::Text(_) | Inline::Code(_) | Inline::LineBreak => 1,
        }
    }
}

/// Concatenated display text of a run of inlines.
pub fn plain_text(inlines: &[Inline]) -> String {
    let mut out = String::new();
    for inline in inlines {
        match inline {
            Inline::Text(text) | Inline::Code(text) => out.push_str(text),
            Inline::Emphasis(inner) | Inline::Strong(inner) | Inline::Link { content: inner, .. } => {
                out.push_str(&plain_text(inner));
            }
            Inline::LineBreak => out.push(' '),
        }
    }
    out
}

/// One table row: a sequence of cells, each owning inline content
pub type Row = Vec<Vec<Inline>>;

/// A single list item, which can contain nested blocks (including lists)
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListItem {
    pub blocks: Vec<Block>,
}

/// A list (ordered or unordered)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct List {
    pub ordered: bool,
    pub items: Vec<ListItem>,
}

/// Block-level elements
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    Heading {
        level: u8,
        content: Vec<Inline>,
    },
    Paragraph {
        content: Vec<Inline>,
    },
    CodeBlock {
        language: Option<String>,
        content: String,
    },
    List(List),
    Table {
        header: Option<Row>,
        rows: Vec<Row>,
    },
    BlockQuote {
        blocks: Vec<Block>,
    },
    ThematicBreak,
}

impl Block {
    /// Build a heading, clamping the level into 1..=6.
    pub fn heading(level: usize, content: Vec<Inline>) -> Self {
        Block::Heading {
            level: level.clamp(1, 6) as u8,
            content,
        }
    }
}

/// A parsed document: the dialect-neutral tree every renderer consumes
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}

/// Number of columns a table renders with: the widest row, header included.
pub(crate) fn column_count(header: Option<&Row>, rows: &[Row]) -> usize {
    header
        .into_iter()
        .chain(rows)
        .map(Vec::len)
        .max()
        .unwrap_or(0)
}
