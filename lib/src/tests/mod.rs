use bstr::ByteSlice;
use pretty_assertions::assert_eq;

use crate::{compile, CompileError, MatchedText, Replacer, StreamRegex};

/// Splits `input` into chunks of `size` grapheme clusters, the way a
/// stream producer would deliver it.
fn chunks(input: &str, size: usize) -> Vec<String> {
    let graphemes: Vec<&str> = input.as_bytes().graphemes().collect();
    graphemes.chunks(size).map(|chunk| chunk.concat()).collect()
}

/// Routes `log` output to the test harness; `RUST_LOG=trace` shows the
/// automaton's step-by-step decisions.
fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn match_all(regex: &StreamRegex, input: &str, chunk_size: usize) -> Vec<String> {
    init_logger();
    let mut stream = regex.match_stream();
    let mut found = Vec::new();
    for chunk in chunks(input, chunk_size) {
        found.extend(stream.push(chunk).unwrap());
    }
    found.extend(stream.finish().unwrap());
    found
}

fn replace_all<R: Replacer>(
    regex: &StreamRegex,
    input: &str,
    chunk_size: usize,
    replacement: R,
) -> String {
    init_logger();
    let mut stream = regex.replace_stream(replacement);
    let mut out = String::new();
    for chunk in chunks(input, chunk_size) {
        out.push_str(&stream.push(chunk).unwrap());
    }
    out.push_str(&stream.finish().unwrap());
    out
}

fn wrap(m: &MatchedText) -> String {
    format!("_{}_", m.text())
}

#[test]
fn simple_match() {
    let regex = compile("ab").unwrap();
    assert_eq!(match_all(&regex, "abcdef", 1), ["ab"]);
}

#[test]
fn simple_no_match() {
    let regex = compile("ab").unwrap();
    assert_eq!(match_all(&regex, "bacdef", 1), Vec::<String>::new());
}

#[test]
fn case_insensitive_first_match_only() {
    let regex =
        StreamRegex::builder().case_insensitive(true).build("ab").unwrap();
    assert_eq!(match_all(&regex, "MMm...ab--XAbssBAB", 1), ["ab"]);
}

#[test]
fn case_insensitive_global() {
    let regex = StreamRegex::builder()
        .case_insensitive(true)
        .global(true)
        .build("ab")
        .unwrap();
    assert_eq!(
        match_all(&regex, "MMm...ab--XAbssBAB", 5),
        ["ab", "Ab", "AB"]
    );
}

#[test]
fn start_anchor_match() {
    let regex = compile("^ab").unwrap();
    assert_eq!(
        replace_all(&regex, "ab--XAbssBAB", 1, wrap),
        "_ab_--XAbssBAB"
    );
}

#[test]
fn start_anchor_no_match() {
    let regex = compile("^ab").unwrap();
    assert_eq!(
        replace_all(&regex, "MMm...ab--XAbssBAB", 1, wrap),
        "MMm...ab--XAbssBAB"
    );
}

#[test]
fn end_anchor_match() {
    let regex =
        StreamRegex::builder().case_insensitive(true).build("ab$").unwrap();
    assert_eq!(
        replace_all(&regex, "MMm...ab--XAbssBAB", 1, wrap),
        "MMm...ab--XAbssB_AB_"
    );
}

#[test]
fn end_anchor_no_match() {
    let regex =
        StreamRegex::builder().case_insensitive(true).build("ab$").unwrap();
    assert_eq!(
        replace_all(&regex, "MMm...ab--XAbssBABa", 1, wrap),
        "MMm...ab--XAbssBABa"
    );
}

#[test]
fn end_anchor_only_the_final_match_counts() {
    let regex =
        StreamRegex::builder().global(true).build("ab$").unwrap();
    assert_eq!(replace_all(&regex, "abab", 1, wrap), "ab_ab_");
}

#[test]
fn capture_groups_in_function_replacement() {
    let regex = StreamRegex::builder()
        .case_insensitive(true)
        .build(r"\[([^\]]+)\]\((getjerry:\/\/[\w-/]+)\)")
        .unwrap();

    let replaced = replace_all(
        &regex,
        "[hello](getjerry://some/link-to-here)",
        4,
        |m: &MatchedText| {
            format!(
                "<a href=\"{}\">{}</a>",
                m.group(2).unwrap(),
                m.group(1).unwrap()
            )
        },
    );

    assert_eq!(
        replaced,
        "<a href=\"getjerry://some/link-to-here\">hello</a>"
    );
}

#[test]
fn capture_groups_with_uneven_chunks() {
    let regex = StreamRegex::builder()
        .case_insensitive(true)
        .build(r"\[([^\]]+)\]\((getjerry:\/\/[\w-/]+)\)")
        .unwrap();

    let mut stream = regex.replace_stream(|m: &MatchedText| {
        format!("<a href=\"{}\">{}</a>", m.group(2).unwrap(), m.group(1).unwrap())
    });

    let mut out = String::new();
    for chunk in [
        "I have a link: ",
        "[hel",
        "lo](getjerry:/",
        "/some/link-to-here)",
    ] {
        out.push_str(&stream.push(chunk).unwrap());
    }
    out.push_str(&stream.finish().unwrap());

    assert_eq!(
        out,
        "I have a link: <a href=\"getjerry://some/link-to-here\">hello</a>"
    );
}

#[test]
fn non_capturing_groups_and_optional_captures() {
    let regex = StreamRegex::builder()
        .global(true)
        .case_insensitive(true)
        .build(r"(?:<|\[)\s*ACTION:\s*([\w-]+)\s*(?:;\s*DATA:\s*({[^>\]]+}))?\s*(?:>|\])")
        .unwrap();

    let mut actions: Vec<String> = Vec::new();
    let mut out = String::new();

    let mut stream = regex.replace_stream(|m: &MatchedText| {
        actions.push(format!(
            "{}({})",
            m.group(1).unwrap(),
            m.group(2).unwrap_or("")
        ));
        String::new()
    });

    for chunk in [
        "Hell",
        "o, ho",
        "w can I assist you today?",
        "<ACTI",
        "ON:action1;DATA:{",
        "\"a\":1}> This is a<ACTION: acti",
        "on2> sample <action:  action3>text.",
    ] {
        out.push_str(&stream.push(chunk).unwrap());
    }
    out.push_str(&stream.finish().unwrap());

    assert_eq!(out, "Hello, how can I assist you today? This is a sample text.");
    assert_eq!(actions, ["action1({\"a\":1})", "action2()", "action3()"]);
}

#[test]
fn exact_count_quantifier() {
    let regex = StreamRegex::builder()
        .global(true)
        .build(r"a+b{1}[cd]{2}(ef)")
        .unwrap();
    assert_eq!(
        match_all(&regex, "abaabcbaaaeaaabdcef333", 3),
        ["aaabdcef"]
    );
}

#[test]
fn bounded_count_quantifier() {
    let regex = StreamRegex::builder()
        .global(true)
        .build(r"a+b{1,5}[cd]{2}(ef)")
        .unwrap();
    assert_eq!(
        match_all(&regex, "abaabcbaaaeaaabbdcef333", 3),
        ["aaabbdcef"]
    );
}

#[test]
fn open_ended_count_quantifier() {
    let regex = StreamRegex::builder()
        .global(true)
        .build(r"a+b{1,}[cd]{2}(ef)")
        .unwrap();
    assert_eq!(
        match_all(&regex, "abaabcbaaaeaaabbdcef333", 3),
        ["aaabbdcef"]
    );
}

#[test]
fn emoji_matches_as_one_unit() {
    let regex = StreamRegex::builder().global(true).build("👍").unwrap();

    // Deliver the stream byte by byte: no chunk ever holds a whole
    // code point, let alone a whole cluster.
    let mut stream = regex.match_stream();
    let mut found = Vec::new();
    for byte in "😄👍".as_bytes() {
        found.extend(stream.push([*byte]).unwrap());
    }
    found.extend(stream.finish().unwrap());

    assert_eq!(found, ["👍"]);
}

#[test]
fn emoji_replace() {
    let regex = StreamRegex::builder().global(true).build("👍").unwrap();
    assert_eq!(replace_all(&regex, "😄👍", 1, wrap), "😄_👍_");
}

#[test]
fn adjacent_matches_under_global() {
    let regex = StreamRegex::builder().global(true).build("ab").unwrap();
    assert_eq!(match_all(&regex, "abab", 1), ["ab", "ab"]);
    assert_eq!(replace_all(&regex, "abab", 1, wrap), "_ab__ab_");
}

#[test]
fn greedy_takes_the_longest_match() {
    let regex = compile("a+").unwrap();
    assert_eq!(match_all(&regex, "baaac", 1), ["aaa"]);
}

#[test]
fn non_greedy_takes_the_shortest_match() {
    let regex = StreamRegex::builder().global(true).build("a+").unwrap();

    let mut stream = regex.match_stream().greedy(false);
    let mut found = Vec::new();
    for chunk in chunks("aaa", 1) {
        found.extend(stream.push(chunk).unwrap());
    }
    found.extend(stream.finish().unwrap());

    assert_eq!(found, ["a", "a", "a"]);
}

#[test]
fn string_replacement_interpolates_groups() {
    let regex = StreamRegex::builder().global(true).build("(a)(b)").unwrap();
    assert_eq!(replace_all(&regex, "ab-ab", 1, "<$2$1>"), "<ba>-<ba>");
}

#[test]
fn chunk_boundaries_never_change_results() {
    let cases: &[(&str, &str)] = &[
        (r"a+b{1,5}[cd]{2}(ef)", "abaabcbaaaeaaabbdcef333"),
        (r"(a|b)+c", "xxabbacyy"),
        (r"\w+", "words, and more words"),
        ("👍+", "😄👍👍😄👍"),
        (r"[^x]+x", "aaxbbxcc"),
    ];

    for (pattern, input) in cases {
        let regex =
            StreamRegex::builder().global(true).build(pattern).unwrap();
        let reference = match_all(&regex, input, 1);
        for chunk_size in 2..=7 {
            assert_eq!(
                match_all(&regex, input, chunk_size),
                reference,
                "pattern `{pattern}` over `{input}` with chunk size \
                 {chunk_size}"
            );
        }
    }
}

#[test]
fn identity_replacement_is_the_identity() {
    let cases: &[(&str, &str)] = &[
        ("ab", "abcdef"),
        ("ab|abcd", "abcx"),
        (r"a+b{1,5}[cd]{2}(ef)", "abaabcbaaaeaaabbdcef333"),
        ("^ab", "ab--XAbssBAB"),
        ("ab$", "MMm...ab--XAbssBAB"),
        (r"\d+", "no digits here"),
        ("👍", "😄👍😄"),
    ];

    for (pattern, input) in cases {
        for global in [false, true] {
            let regex = StreamRegex::builder()
                .global(global)
                .build(pattern)
                .unwrap();
            let replaced = replace_all(&regex, input, 3, |m: &MatchedText| {
                m.text().to_string()
            });
            assert_eq!(
                &replaced, input,
                "pattern `{pattern}` (global: {global})"
            );
        }
    }
}

#[test]
fn replace_reader_pumps_between_io_endpoints() {
    let regex = StreamRegex::builder().global(true).build("ab").unwrap();

    let input = std::io::Cursor::new("xxabyyabzz".as_bytes());
    let mut output = Vec::new();
    regex.replace_reader(input, &mut output, "[$0]").unwrap();

    assert_eq!(String::from_utf8(output).unwrap(), "xx[ab]yy[ab]zz");
}

#[test]
fn invalid_utf8_input_is_a_stream_error() {
    let regex = compile("ab").unwrap();
    let mut stream = regex.match_stream();
    assert!(stream.push([0xFF, 0xFE]).is_err());
}

#[test]
fn pattern_flags_are_reported() {
    let regex = StreamRegex::builder()
        .global(true)
        .case_insensitive(true)
        .build("^ab$")
        .unwrap();
    assert!(regex.is_global());
    assert!(regex.is_case_insensitive());
    assert!(regex.is_start_anchored());
    assert!(regex.is_end_anchored());
    assert_eq!(regex.pattern(), "^ab$");
}

#[test]
fn compile_errors() {
    assert!(matches!(
        compile("(a"),
        Err(CompileError::ParseError(_))
    ));
    assert!(matches!(compile(""), Err(CompileError::EmptyPattern)));
    assert!(matches!(
        compile("a{4,2}"),
        Err(CompileError::InvalidQuantifier { .. })
    ));
}
