use crate::block::{column_count, Block, Document, Inline, List, Row};
use crate::config::{CodeEnvironment, LatexConfig};

/// `\verb` delimiters, tried in order
const VERB_DELIMITERS: [char; 11] = ['|', '!', '+', '@', '=', ':', ';', '/', '"', '\'', '?'];

const THEMATIC_BREAK: &str = "\\begin{center}\\rule{0.5\\linewidth}{0.5pt}\\end{center}";

/// List environments (quotes included) that stock LaTeX can nest
const PLAIN_LIST_DEPTH: usize = 4;

/// Convert a document to LaTeX
pub fn render(document: &Document, config: &LatexConfig) -> String {
    let mut writer = LatexWriter::new(config);
    let body = writer.blocks(&document.blocks);
    if body.is_empty() {
        return body;
    }
    if config.standalone {
        writer.standalone(&body)
    } else {
        body + "\n"
    }
}

/// Verbatim environments in fallback order, with the package each needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Listing {
    Verbatim,
    Lstlisting,
    FancyVerbatim,
}

impl Listing {
    fn name(self) -> &'static str {
        match self {
            Listing::Verbatim => "verbatim",
            Listing::Lstlisting => "lstlisting",
            Listing::FancyVerbatim => "Verbatim",
        }
    }
}

impl From<CodeEnvironment> for Listing {
    fn from(environment: CodeEnvironment) -> Self {
        match environment {
            CodeEnvironment::Verbatim => Listing::Verbatim,
            CodeEnvironment::Lstlisting => Listing::Lstlisting,
        }
    }
}

struct LatexWriter<'a> {
    config: &'a LatexConfig,
    uses_listings: bool,
    uses_fancyvrb: bool,
    uses_hyperref: bool,
    /// Open `itemize`/`enumerate`/`quote` environments
    list_depth: usize,
    deepest_list: usize,
}

impl<'a> LatexWriter<'a> {
    fn new(config: &'a LatexConfig) -> Self {
        Self {
            config,
            uses_listings: false,
            uses_fancyvrb: false,
            uses_hyperref: false,
            list_depth: 0,
            deepest_list: 0,
        }
    }

    fn standalone(&self, body: &str) -> String {
        let mut out = String::from("\\documentclass{article}\n");
        out.push_str("\\usepackage[T1]{fontenc}\n");
        out.push_str("\\usepackage[utf8]{inputenc}\n");
        if self.uses_listings {
            out.push_str("\\usepackage{listings}\n");
        }
        if self.uses_fancyvrb {
            out.push_str("\\usepackage{fancyvrb}\n");
        }
        if self.uses_hyperref {
            out.push_str("\\usepackage{hyperref}\n");
        }
        if self.deepest_list > PLAIN_LIST_DEPTH {
            let depth = self.deepest_list;
            out.push_str("\\usepackage{enumitem}\n");
            out.push_str(&format!("\\setlistdepth{{{depth}}}\n"));
            out.push_str(&format!("\\renewlist{{itemize}}{{itemize}}{{{depth}}}\n"));
            out.push_str(&format!("\\renewlist{{enumerate}}{{enumerate}}{{{depth}}}\n"));
            out.push_str("\\setlist[itemize]{label=\\textbullet}\n");
            out.push_str("\\setlist[enumerate]{label=\\arabic*.}\n");
        }
        out.push_str("\\begin{document}\n\n");
        out.push_str(body);
        out.push_str("\n\n\\end{document}\n");
        out
    }

    fn blocks(&mut self, blocks: &[Block]) -> String {
        let mut parts = Vec::with_capacity(blocks.len());
        for block in blocks {
            let rendered = self.block(block);
            if !rendered.is_empty() {
                parts.push(rendered);
            }
        }
        parts.join("\n\n")
    }

    fn block(&mut self, block: &Block) -> String {
        match block {
            Block::Heading { level, content } => {
                let commands = self.config.top_level_division.commands();
                let index = usize::from(*level).saturating_sub(1).min(commands.len() - 1);
                let star = if self.config.numbered_sections { "" } else { "*" };
                let title = self.inlines(content, Context::Argument);
                format!("\\{}{}{{{}}}", commands[index], star, title)
            }
            Block::Paragraph { content } => self.inlines(content, Context::Paragraph),
            Block::CodeBlock { content, .. } => self.code_block(content),
            Block::List(list) => self.list(list),
            Block::Table { header, rows } => self.table(header.as_ref(), rows),
            Block::BlockQuote { blocks } => {
                if !self.enter_list() {
                    return self.blocks(blocks);
                }
                let body = self.blocks(blocks);
                self.list_depth -= 1;
                if body.is_empty() {
                    "\\begin{quote}\n\\end{quote}".to_string()
                } else {
                    format!("\\begin{{quote}}\n{body}\n\\end{{quote}}")
                }
            }
            Block::ThematicBreak => THEMATIC_BREAK.to_string(),
        }
    }

    /// The configured environment unless the content would end it early,
    /// then the next one whose terminator does not occur.
    fn code_block(&mut self, content: &str) -> String {
        let preferred = Listing::from(self.config.code_environment);
        let candidates = [preferred, Listing::Verbatim, Listing::Lstlisting, Listing::FancyVerbatim];
        let chosen = candidates
            .into_iter()
            .find(|listing| !content.contains(&format!("\\end{{{}}}", listing.name())));

        let Some(listing) = chosen else {
            return content
                .lines()
                .map(|line| format!("\\texttt{{{}}}\\\\", escape_text(line)))
                .collect::<Vec<_>>()
                .join("\n");
        };
        match listing {
            Listing::Lstlisting => self.uses_listings = true,
            Listing::FancyVerbatim => self.uses_fancyvrb = true,
            Listing::Verbatim => {}
        }

        let name = listing.name();
        let mut out = format!("\\begin{{{name}}}\n");
        out.push_str(content);
        if !content.is_empty() && !content.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(&format!("\\end{{{name}}}"));
        out
    }

    /// Open one more list environment. Past the stock nesting limit this
    /// only succeeds in standalone mode, where enumitem raises the limit.
    fn enter_list(&mut self) -> bool {
        if self.list_depth >= PLAIN_LIST_DEPTH && !self.config.standalone {
            return false;
        }
        self.list_depth += 1;
        self.deepest_list = self.deepest_list.max(self.list_depth);
        true
    }

    /// A list nested past the limit keeps its `\item`s in the enclosing
    /// environment.
    fn list(&mut self, list: &List) -> String {
        if list.items.is_empty() {
            return String::new();
        }
        let wrapped = self.enter_list();
        let mut items = Vec::with_capacity(list.items.len());
        for item in &list.items {
            let body = self.blocks(&item.blocks);
            if body.is_empty() {
                items.push("\\item".to_string());
            } else {
                items.push(format!("\\item {body}"));
            }
        }
        let items = items.join("\n");
        if !wrapped {
            return items;
        }
        self.list_depth -= 1;

        let environment = if list.ordered { "enumerate" } else { "itemize" };
        format!("\\begin{{{environment}}}\n{items}\n\\end{{{environment}}}")
    }

    fn table(&mut self, header: Option<&Row>, rows: &[Row]) -> String {
        let width = column_count(header, rows);
        if width == 0 {
            return String::new();
        }

        let mut out = format!("\\begin{{tabular}}{{{}}}\n\\hline\n", "l".repeat(width));
        if let Some(header) = header {
            out.push_str(&self.row(header, width));
            out.push_str("\\hline\n");
        }
        for row in rows {
            out.push_str(&self.row(row, width));
        }
        out.push_str("\\hline\n\\end{tabular}");
        out
    }

    fn row(&mut self, row: &[Vec<Inline>], width: usize) -> String {
        let cells: Vec<String> = (0..width)
            .map(|i| match row.get(i) {
                Some(cell) => self.inlines(cell, Context::Cell),
                None => String::new(),
            })
            .collect();
        format!("{} \\\\\n", cells.join(" & "))
    }

    fn inlines(&mut self, inlines: &[Inline], context: Context) -> String {
        let mut out = String::new();
        for inline in inlines {
            self.inline(inline, context, &mut out);
        }
        out
    }

    fn inline(&mut self, inline: &Inline, context: Context, out: &mut String) {
        match inline {
            Inline::Text(text) => out.push_str(&escape_text(text)),
            Inline::Strong(inner) => {
                out.push_str("\\textbf{");
                out.push_str(&self.inlines(inner, context.argument()));
                out.push('}');
            }
            Inline::Emphasis(inner) => {
                out.push_str("\\emph{");
                out.push_str(&self.inlines(inner, context.argument()));
                out.push('}');
            }
            Inline::Code(code) => out.push_str(&inline_code(code, context)),
            Inline::Link { url, content } => {
                self.uses_hyperref = true;
                let url_arg = escape_url(url);
                if matches!(content.as_slice(), [Inline::Text(text)] if text == url) {
                    out.push_str(&format!("\\url{{{url_arg}}}"));
                } else {
                    let label = self.inlines(content, context.argument());
                    out.push_str(&format!("\\href{{{url_arg}}}{{{label}}}"));
                }
            }
            Inline::LineBreak => match context {
                Context::Paragraph | Context::Nested => out.push_str("\\newline\n"),
                Context::Argument | Context::Cell => out.push(' '),
            },
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Paragraph,
    /// Inside `\textbf`/`\emph`/`\href` within a paragraph
    Nested,
    /// A heading argument, where `\verb` and line breaks are not allowed
    Argument,
    Cell,
}

impl Context {
    fn argument(self) -> Context {
        match self {
            Context::Paragraph | Context::Nested => Context::Nested,
            Context::Argument | Context::Cell => Context::Argument,
        }
    }

    fn allows_verb(self) -> bool {
        matches!(self, Context::Paragraph | Context::Cell)
    }
}

fn inline_code(code: &str, context: Context) -> String {
    let delimiter = VERB_DELIMITERS.iter().find(|&&d| !code.contains(d));
    match delimiter {
        Some(&d) if context.allows_verb() && !code.contains('\n') => format!("\\verb{d}{code}{d}"),
        _ => format!("\\texttt{{{}}}", escape_text(code)),
    }
}

/// Escape text so LaTeX typesets every character literally.
pub(crate) fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => out.push_str("\\textbackslash{}"),
            '{' | '}' | '$' | '&' | '#' | '_' | '%' => {
                out.push('\\');
                out.push(ch);
            }
            '~' => out.push_str("\\textasciitilde{}"),
            '^' => out.push_str("\\textasciicircum{}"),
            '<' => out.push_str("\\textless{}"),
            '>' => out.push_str("\\textgreater{}"),
            '|' => out.push_str("\\textbar{}"),
            '[' => out.push_str("{[}"),
            ']' => out.push_str("{]}"),
            '`' => out.push_str("\\textasciigrave{}"),
            // Source line breaks would end the paragraph on a blank line
            '\n' | '\r' => out.push(' '),
            // Break the `--`, `''` and `,,` ligatures
            '-' | '\'' | ',' if chars.peek() == Some(&ch) => {
                out.push(ch);
                out.push_str("{}");
            }
            _ => out.push(ch),
        }
    }
    out
}

fn escape_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        if matches!(ch, '\\' | '#' | '%' | '{' | '}') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
