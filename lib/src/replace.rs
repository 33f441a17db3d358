/*!
Replacement of matched text, including capture-group resolution.

The streaming automaton locates matched spans but does not model capture
groups. Groups are resolved afterwards, by running an auxiliary
capture-aware regex (compiled from the same pattern) over the already
located span; the span is tiny compared to the stream, so this stays
cheap. String replacements support the classic `$1`, `$2`, `${name}`
interpolation syntax; closure replacements receive the match with its
ordered capture groups.
*/

use regex_automata::meta;
use regex_automata::util::captures::Captures;
use regex_automata::util::interpolate;
use regex_automata::PatternID;
use stream_regex_parser::ast::{AstNode, AST};
use stream_regex_parser::GrammarRule;

/// A matched stretch of text together with its capture groups.
///
/// Passed to [`Replacer`] implementations. Group 0 is the whole match;
/// explicit capture groups are numbered from 1 in the order their opening
/// parentheses appear in the pattern.
pub struct MatchedText<'h> {
    haystack: &'h str,
    caps: &'h Captures,
}

impl<'h> MatchedText<'h> {
    pub(crate) fn new(haystack: &'h str, caps: &'h Captures) -> Self {
        Self { haystack, caps }
    }

    /// The full matched text (capture group 0).
    pub fn text(&self) -> &'h str {
        self.group(0).unwrap_or_default()
    }

    /// The text captured by group `index`, if the group participated in
    /// the match.
    pub fn group(&self, index: usize) -> Option<&'h str> {
        self.caps
            .get_group(index)
            .map(|span| &self.haystack[span.start..span.end])
    }

    /// Number of explicit capture groups in the pattern (group 0 not
    /// included).
    pub fn group_count(&self) -> usize {
        self.caps.group_len().saturating_sub(1)
    }

    /// Expands `$1`-style references in `replacement`, appending the
    /// result to `dst`. Unset groups expand to the empty string.
    fn interpolate_into(&self, replacement: &str, dst: &mut String) {
        interpolate::string(
            replacement,
            |index, dst: &mut String| {
                if let Some(group) = self.group(index) {
                    dst.push_str(group);
                }
            },
            |name| {
                self.caps.group_info().to_index(PatternID::ZERO, name)
            },
            dst,
        );
    }
}

/// Produces the replacement text for one match.
///
/// Implemented by `&str` and [`String`] (with `$1`, `$2`, `${name}`
/// interpolation) and by any `FnMut(&MatchedText) -> String` closure.
pub trait Replacer {
    /// Appends the replacement for `matched` to `dst`.
    fn replace_match(&mut self, matched: &MatchedText<'_>, dst: &mut String);
}

impl Replacer for &str {
    fn replace_match(&mut self, matched: &MatchedText<'_>, dst: &mut String) {
        matched.interpolate_into(self, dst);
    }
}

impl Replacer for String {
    fn replace_match(&mut self, matched: &MatchedText<'_>, dst: &mut String) {
        matched.interpolate_into(self.as_str(), dst);
    }
}

impl<F> Replacer for F
where
    F: FnMut(&MatchedText<'_>) -> String,
{
    fn replace_match(&mut self, matched: &MatchedText<'_>, dst: &mut String) {
        dst.push_str(&(self)(matched));
    }
}

/// Renders the pattern's AST back into standard regex syntax for the
/// capture-resolution engine.
///
/// The raw pattern text can't always be handed to the standard parser
/// as-is: the dialect is laxer about character classes (a bare `-` or `&`
/// member, for instance), so class members are re-emitted with punctuation
/// escaped. Group structure and quantifiers are reproduced exactly, which
/// keeps capture group numbering identical to the source pattern.
pub(crate) fn capture_pattern(ast: &AST) -> String {
    let mut out = String::with_capacity(ast.source.len());
    print_node(ast.root(), &mut out);
    out
}

fn print_node(node: &AstNode, out: &mut String) {
    match node.kind {
        GrammarRule::expression => {
            if node.child(GrammarRule::start_anchor).is_some() {
                out.push('^');
            }
            for (i, alt) in
                node.children_of(GrammarRule::sub_expression).enumerate()
            {
                if i > 0 {
                    out.push('|');
                }
                print_node(alt, out);
            }
        }
        GrammarRule::sub_expression => {
            for item in &node.children {
                print_node(item, out);
            }
        }
        // Single-child wrappers.
        GrammarRule::expression_item
        | GrammarRule::group
        | GrammarRule::match_item
        | GrammarRule::match_character_class => {
            print_node(&node.children[0], out)
        }
        GrammarRule::anchor => out.push('$'),
        GrammarRule::group_expression => {
            out.push('(');
            if node.child(GrammarRule::non_capturing).is_some() {
                out.push_str("?:");
            }
            if let Some(expr) = node.child(GrammarRule::expression) {
                print_node(expr, out);
            }
            out.push(')');
            if let Some(q) = node.child(GrammarRule::quantifier) {
                out.push_str(q.literal_text());
            }
        }
        GrammarRule::match_expr => {
            print_node(&node.children[0], out);
            if let Some(q) = node.child(GrammarRule::quantifier) {
                out.push_str(q.literal_text());
            }
        }
        GrammarRule::any_char => out.push('.'),
        GrammarRule::character => print_character(node, out),
        GrammarRule::character_class => out.push_str(node.literal_text()),
        GrammarRule::character_group => print_character_group(node, out),
        // Anything else has no printable form; the compiler rejects such
        // nodes before the capture pattern is ever built.
        _ => {}
    }
}

fn print_character_group(node: &AstNode, out: &mut String) {
    let negated = node.child(GrammarRule::negation).is_some();
    let mut members = String::new();

    if let Some(inner) = node.child(GrammarRule::character_group_inner) {
        for item in &inner.children {
            let item = &item.children[0];
            match item.kind {
                GrammarRule::character_class => {
                    members.push_str(item.literal_text())
                }
                GrammarRule::character_range => {
                    // A reversed range is empty in this dialect; the
                    // standard parser would reject it.
                    let mut bounds = item
                        .children
                        .iter()
                        .filter_map(|c| c.literal_text().chars().next());
                    if let (Some(start), Some(end)) =
                        (bounds.next(), bounds.next())
                    {
                        if start <= end {
                            members.push_str(item.literal_text());
                        }
                    }
                }
                GrammarRule::character => print_character(item, &mut members),
                // `.` inside a class stays a literal dot in standard
                // syntax.
                GrammarRule::any_char => members.push('.'),
                _ => {}
            }
        }
    }

    if members.is_empty() {
        // `[]` matches nothing and was dropped by the compiler; `[^]`
        // matches anything. Neither form is valid standard syntax.
        out.push_str(if negated { r"[\s\S]" } else { "(?:)" });
        return;
    }

    out.push('[');
    if negated {
        out.push('^');
    }
    out.push_str(&members);
    out.push(']');
}

fn print_character(node: &AstNode, out: &mut String) {
    let text = node.literal_text();
    let bare = text.strip_prefix('\\').unwrap_or(text);
    if let Some(ch) = bare.chars().next() {
        // Escape punctuation so that characters like `-`, `&` or `{`
        // can't be misread as standard-syntax metacharacters. Escapes of
        // anything else are dropped: in this dialect `\q` is a literal
        // `q`, and that is what the automaton matches, while the standard
        // parser would reject the escape or read it as a control
        // character.
        if ch.is_ascii_punctuation() {
            out.push('\\');
        }
        out.push(ch);
    }
}

/// Rewrites a matched span through `replacer`.
///
/// Every occurrence of `group_re` within the span is substituted when
/// `global` is set, only the first otherwise; text around the occurrences
/// is kept. When the capture regex finds no occurrence at all (possible
/// for a few dialect corner cases) the span passes through unchanged.
pub(crate) fn rewrite<R: Replacer + ?Sized>(
    group_re: &meta::Regex,
    global: bool,
    matched: &str,
    replacer: &mut R,
) -> String {
    let mut out = String::with_capacity(matched.len());
    let mut last = 0;

    for caps in group_re.captures_iter(matched) {
        let m = match caps.get_match() {
            Some(m) => m,
            None => continue,
        };
        out.push_str(&matched[last..m.start()]);
        replacer.replace_match(&MatchedText::new(matched, &caps), &mut out);
        last = m.end();
        if !global {
            break;
        }
    }

    out.push_str(&matched[last..]);
    out
}
