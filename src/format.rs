use std::fmt;
use std::str::FromStr;

use crate::error::ConvertError;

/// A target dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Format {
    Markdown,
    AsciiDoc,
    Latex,
}

impl Format {
    /// Every registered format, in the order they are listed to users.
    pub const ALL: [Format; 3] = [Format::Markdown, Format::AsciiDoc, Format::Latex];

    /// The name accepted by [`crate::convert`].
    pub fn name(self) -> &'static str {
        match self {
            Format::Markdown => "markdown",
            Format::AsciiDoc => "asciidoc",
            Format::Latex => "latex",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Format {
    type Err = ConvertError;

    /// Names are matched exactly; `Markdown` or ` latex` are unknown.
    fn from_str(name: &str) -> Result<Self, Self::Err> {
        Format::ALL
            .into_iter()
            .find(|format| format.name() == name)
            .ok_or_else(|| ConvertError::UnknownFormat(name.to_string()))
    }
}
