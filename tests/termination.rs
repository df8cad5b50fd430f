//! Adversarial inputs must convert in bounded time and never panic.

use std::time::{Duration, Instant};

use polymark::{convert, Block, Format, Inline};
use rstest::rstest;

const LIMIT: Duration = Duration::from_secs(10);

fn converts_quickly(input: &str) {
    let _ = env_logger::builder().is_test(true).try_init();
    let start = Instant::now();
    for format in Format::ALL {
        let output = convert(format.name(), input).unwrap();
        assert!(output.is_empty() || output.ends_with('\n'));
    }
    let elapsed = start.elapsed();
    assert!(elapsed < LIMIT, "took {elapsed:?} for {} bytes", input.len());
}

#[rstest]
#[case::unmatched_asterisks("*a ".repeat(20_000))]
#[case::unmatched_closers("a* ".repeat(20_000))]
#[case::mixed_openers(format!("{}{}", "_a *b ".repeat(10_000), "c* d_ ".repeat(10_000)))]
#[case::nested_emphasis(format!("{}x{}", "*_".repeat(5_000), "_*".repeat(5_000)))]
#[case::open_brackets("[".repeat(50_000))]
#[case::bracket_pairs(format!("{}{}", "[".repeat(20_000), "]".repeat(20_000)))]
#[case::unclosed_destinations("[a](".repeat(10_000))]
#[case::unclosed_titles("[a](b (".repeat(10_000))]
#[case::nested_links(format!("{}x{}", "[".repeat(5_000), "](u)".repeat(5_000)))]
#[case::backtick_runs((1..200).map(|n| "`".repeat(n)).collect::<Vec<_>>().join(" "))]
#[case::unterminated_fences("```\n".repeat(5_000))]
#[case::alternating_fences("```\n~~~\n".repeat(5_000))]
#[case::deep_quotes(">".repeat(20_000))]
#[case::deep_quote_lines((0..300).map(|n| format!("{} x", ">".repeat(n))).collect::<Vec<_>>().join("\n"))]
#[case::deep_lists("- ".repeat(10_000) + "x")]
#[case::staircase_lists((0..300).map(|n| format!("{}- item", "  ".repeat(n))).collect::<Vec<_>>().join("\n"))]
#[case::pipes("|".repeat(20_000))]
#[case::autolink_openers("<ab:".repeat(10_000))]
#[case::entities("&a".repeat(20_000))]
fn pathological_inputs_terminate(#[case] input: String) {
    converts_quickly(&input);
}

#[test]
fn emphasis_nesting_is_capped() {
    let input = format!("{}x{}", "*".repeat(200), "*".repeat(200));
    converts_quickly(&input);
    let document = polymark::parse(&input);
    let Some(Block::Paragraph { content }) = document.blocks.first() else {
        panic!("expected a paragraph, got {document:?}");
    };
    let depth = content.iter().map(Inline::depth).max().unwrap_or(0);
    assert_eq!(depth, polymark::MAX_INLINE_DEPTH);
    assert_eq!(polymark::plain_text(content).matches('*').count(), 400 - 4 * 31);
}
