use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::ConfigError;

static DEFAULT_CONFIG: &str = include_str!("default_config.toml");

/// Rendering options for every target dialect.
#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub markdown: MarkdownConfig,
    pub asciidoc: AsciidocConfig,
    pub latex: LatexConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum StrongMarker {
    #[serde(rename = "*")]
    Asterisk,
    #[serde(rename = "**")]
    DoubleAsterisk,
    #[serde(rename = "__")]
    DoubleUnderscore,
}

impl StrongMarker {
    pub fn as_str(self) -> &'static str {
        match self {
            StrongMarker::Asterisk => "*",
            StrongMarker::DoubleAsterisk => "**",
            StrongMarker::DoubleUnderscore => "__",
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
pub enum Bullet {
    #[serde(rename = "-")]
    Dash,
    #[serde(rename = "*")]
    Asterisk,
    #[serde(rename = "+")]
    Plus,
}

impl Bullet {
    pub fn as_char(self) -> char {
        match self {
            Bullet::Dash => '-',
            Bullet::Asterisk => '*',
            Bullet::Plus => '+',
        }
    }

    /// The bullet used for a list that directly follows another one, so the
    /// two do not merge when read back.
    pub fn alternate(self) -> Bullet {
        match self {
            Bullet::Dash => Bullet::Asterisk,
            Bullet::Asterisk | Bullet::Plus => Bullet::Dash,
        }
    }
}

/// Indentation of nested list content. Wider indents would turn item
/// content into indented code.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(try_from = "u8")]
pub enum ListIndent {
    Two,
    Four,
}

impl ListIndent {
    pub fn width(self) -> usize {
        match self {
            ListIndent::Two => 2,
            ListIndent::Four => 4,
        }
    }
}

impl TryFrom<u8> for ListIndent {
    type Error = String;

    fn try_from(width: u8) -> Result<Self, Self::Error> {
        match width {
            2 => Ok(ListIndent::Two),
            4 => Ok(ListIndent::Four),
            other => Err(format!("list_indent must be 2 or 4, got {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct MarkdownConfig {
    pub strong_marker: StrongMarker,
    pub bullet: Bullet,
    pub list_indent: ListIndent,
}

impl Default for MarkdownConfig {
    fn default() -> Self {
        Self {
            strong_marker: StrongMarker::Asterisk,
            bullet: Bullet::Dash,
            list_indent: ListIndent::Two,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct AsciidocConfig {
    pub heading_offset: u8,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CodeEnvironment {
    Verbatim,
    Lstlisting,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TopLevelDivision {
    Part,
    Chapter,
    Section,
}

impl TopLevelDivision {
    /// Sectioning commands available below this division, outermost first.
    pub fn commands(self) -> &'static [&'static str] {
        const ALL: [&str; 7] = [
            "part",
            "chapter",
            "section",
            "subsection",
            "subsubsection",
            "paragraph",
            "subparagraph",
        ];
        match self {
            TopLevelDivision::Part => &ALL,
            TopLevelDivision::Chapter => &ALL[1..],
            TopLevelDivision::Section => &ALL[2..],
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LatexConfig {
    pub code_environment: CodeEnvironment,
    pub top_level_division: TopLevelDivision,
    pub numbered_sections: bool,
    pub standalone: bool,
}

impl Default for LatexConfig {
    fn default() -> Self {
        Self {
            code_environment: CodeEnvironment::Verbatim,
            top_level_division: TopLevelDivision::Section,
            numbered_sections: true,
            standalone: false,
        }
    }
}

impl Config {
    /// The defaults shipped in `default_config.toml`.
    pub fn compiled_default() -> Self {
        // build.rs has already rejected a malformed file
        toml::from_str(DEFAULT_CONFIG).unwrap_or_default()
    }

    /// Parse a config from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load config from a TOML file, or return defaults if not found.
    pub fn load(path: &Path) -> Self {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Self::compiled_default(),
        };
        match Self::from_toml_str(&content) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ignoring {}: {}", path.display(), e);
                Self::compiled_default()
            }
        }
    }

    /// Like [`Config::load`], but surfaces read and parse failures.
    pub fn try_load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }
}
