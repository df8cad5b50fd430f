use polymark::{convert, ConvertError};
use rstest::rstest;

#[rstest]
#[case::markdown("markdown", "# Title\n\nSome *bold* text.\n")]
#[case::asciidoc("asciidoc", "= Title\n\nSome *bold* text.\n")]
#[case::latex("latex", "\\section{Title}\n\nSome \\textbf{bold} text.\n")]
fn title_and_bold(#[case] format: &str, #[case] expected: &str) {
    similar_asserts::assert_eq!(convert(format, "# Title\n\nSome *bold* text.").unwrap(), expected);
}

#[rstest]
#[case::markdown("markdown", "a \\* b \\_ c # d \\\\ e & f %\n")]
#[case::asciidoc("asciidoc", "a ++*++ b ++_++ c ++#++ d ++\\++ e & f %\n")]
#[case::latex("latex", "a * b \\_ c \\# d \\textbackslash{} e \\& f \\%\n")]
fn reserved_characters_stay_literal(#[case] format: &str, #[case] expected: &str) {
    let input = r"a \* b \_ c \# d \\ e & f %";
    similar_asserts::assert_eq!(convert(format, input).unwrap(), expected);
}

#[test]
fn latex_escapes_percent_and_ampersand() {
    assert_eq!(convert("latex", "50% off & more").unwrap(), "50\\% off \\& more\n");
}

#[rstest]
#[case::markdown("markdown", "````\n```\ninside\n```\n````\n")]
#[case::asciidoc("asciidoc", "----\n```\ninside\n```\n----\n")]
#[case::latex("latex", "\\begin{verbatim}\n```\ninside\n```\n\\end{verbatim}\n")]
fn code_containing_a_fence(#[case] format: &str, #[case] expected: &str) {
    let input = "````\n```\ninside\n```\n````";
    similar_asserts::assert_eq!(convert(format, input).unwrap(), expected);
}

#[rstest]
#[case::markdown("markdown", "| a | b |\n| --- | --- |\n| 1 |  |\n")]
#[case::asciidoc("asciidoc", "[%header,cols=\"2*\"]\n|===\n| a | b\n\n| 1 |\n|===\n")]
#[case::latex(
    "latex",
    "\\begin{tabular}{ll}\n\\hline\na & b \\\\\n\\hline\n1 &  \\\\\n\\hline\n\\end{tabular}\n"
)]
fn short_table_rows_are_padded(#[case] format: &str, #[case] expected: &str) {
    let input = "| a | b |\n|---|---|\n| 1 |";
    similar_asserts::assert_eq!(convert(format, input).unwrap(), expected);
}

#[rstest]
#[case::markdown("markdown", "- one\n  1. a\n- two\n")]
#[case::asciidoc("asciidoc", "* one\n.. a\n* two\n")]
#[case::latex(
    "latex",
    "\\begin{itemize}\n\\item one\n\n\\begin{enumerate}\n\\item a\n\\end{enumerate}\n\\item two\n\\end{itemize}\n"
)]
fn nested_lists(#[case] format: &str, #[case] expected: &str) {
    similar_asserts::assert_eq!(convert(format, "- one\n  1. a\n- two").unwrap(), expected);
}

#[rstest]
#[case("yaml")]
#[case("Markdown")]
#[case("tex")]
#[case("")]
fn unknown_formats_are_rejected(#[case] name: &str) {
    assert_eq!(
        convert(name, "anything"),
        Err(ConvertError::UnknownFormat(name.to_string()))
    );
}
