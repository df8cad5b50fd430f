mod asciidoc;
mod block;
mod config;
mod error;
mod format;
mod latex;
mod markdown;
mod parser;

pub use block::{plain_text, Block, Document, Inline, List, ListItem, Row};
pub use config::{
    AsciidocConfig, Bullet, CodeEnvironment, Config, LatexConfig, ListIndent, MarkdownConfig,
    StrongMarker, TopLevelDivision,
};
pub use error::{ConfigError, ConvertError};
pub use format::Format;
pub use parser::{MAX_BLOCK_DEPTH, MAX_INLINE_DEPTH};

/// Parse canonical markup into a document tree. Never fails.
pub fn parse(text: &str) -> Document {
    parser::parse(&normalize_newlines(text))
}

/// Render a document in the given format.
pub fn render(format: Format, document: &Document, config: &Config) -> String {
    match format {
        Format::Markdown => markdown::render(document, &config.markdown),
        Format::AsciiDoc => asciidoc::render(document, &config.asciidoc),
        Format::Latex => latex::render(document, &config.latex),
    }
}

/// Convert canonical markup to the format named `format`, using the
/// compiled-in default configuration.
pub fn convert(format: &str, input: &str) -> Result<String, ConvertError> {
    let format: Format = format.parse()?;
    Ok(convert_with_config(format, input, &Config::compiled_default()))
}

/// Convert canonical markup with an explicit configuration.
pub fn convert_with_config(format: Format, input: &str, config: &Config) -> String {
    log::debug!("converting {} bytes to {}", input.len(), format);
    let document = parse(input);
    render(format, &document, config)
}

/// Turn `\r\n` and lone `\r` into `\n`.
pub fn normalize_newlines(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}
