/*!
This module compiles a pattern's AST into a linear sequence of postfix
instructions.

The postfix sequence is a reverse-Polish encoding of the pattern: operands
are grapheme matchers and operators are concatenation, alternation and the
quantifiers. Evaluating the sequence left to right with an explicit stack
always leaves exactly one balanced fragment, which is what the automaton
builder consumes.

Besides the instructions, compilation determines whether the pattern is
anchored at the stream start (`^`) or at the stream end (`$`).
*/

use std::fmt::{Display, Formatter};

use log::debug;
use smallvec::{smallvec, SmallVec};
use stream_regex_parser::ast::{AstNode, AST};
use stream_regex_parser::GrammarRule;

pub use errors::*;

mod errors;

#[cfg(test)]
mod tests;

/// The set of values a `Char` state compares an input grapheme against.
pub(crate) type OperandValues = SmallVec<[Box<str>; 2]>;

/// A grapheme matcher: a small set of values plus a negation flag.
///
/// A non-negated matcher accepts a grapheme equal to its value (operands
/// built from the pattern always hold a single value in that case). A
/// negated matcher accepts any grapheme absent from the entire value set.
/// The "any character" operand is the negation of the empty grapheme, which
/// no input grapheme ever equals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Matcher {
    pub values: OperandValues,
    pub negated: bool,
}

impl Matcher {
    pub fn matches(&self, grapheme: &str) -> bool {
        if self.negated {
            self.values.iter().all(|v| v.as_ref() != grapheme)
        } else {
            self.values.iter().all(|v| v.as_ref() == grapheme)
        }
    }
}

/// A postfix operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum PostfixOp {
    /// `.` - concatenation.
    Concat,
    /// `|` - alternation.
    Alternate,
    /// `?` - zero or one.
    ZeroOrOne,
    /// `*` - zero or more.
    ZeroOrMore,
    /// `+` - one or more.
    OneOrMore,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum PostfixKind {
    Operand(Matcher),
    Operator(PostfixOp),
}

/// A single postfix instruction.
///
/// `produced_by` records the grammar rule the instruction originated from.
/// It plays no role in matching; it exists for diagnostics and debug logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PostfixNode {
    pub produced_by: GrammarRule,
    pub kind: PostfixKind,
}

impl Display for PostfixNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            PostfixKind::Operator(op) => {
                let symbol = match op {
                    PostfixOp::Concat => ".",
                    PostfixOp::Alternate => "|",
                    PostfixOp::ZeroOrOne => "?",
                    PostfixOp::ZeroOrMore => "*",
                    PostfixOp::OneOrMore => "+",
                };
                write!(f, "{symbol}")
            }
            PostfixKind::Operand(m) => {
                if m.values.len() == 1 && !m.negated {
                    write!(f, "'{}'", m.values[0])
                } else {
                    let values: Vec<&str> =
                        m.values.iter().map(|v| v.as_ref()).collect();
                    write!(
                        f,
                        "{}{{{}}}",
                        if m.negated { "!" } else { "" },
                        values.join(",")
                    )
                }
            }
        }
    }
}

/// The result of compiling a pattern.
pub(crate) struct Compiled {
    /// The postfix instruction sequence.
    pub instructions: Vec<PostfixNode>,
    /// The pattern had a leading `^`.
    pub has_start_anchor: bool,
    /// The pattern had a trailing `$`.
    pub has_end_anchor: bool,
}

/// A parsed counted or symbolic quantifier.
enum Quantifier {
    ZeroOrOne,
    ZeroOrMore,
    OneOrMore,
    Counted { min: u32, max: Option<u32> },
}

/// Compiles a pattern's AST into postfix instructions.
///
/// Compilation is a DFS traversal of the AST that dispatches on the grammar
/// rule of each node and appends instructions to the output. Counted
/// repetition is expanded eagerly into copies of its operand, so the
/// instruction count is proportional to the bounds (`a{1,10000}` expands to
/// ten thousand optional copies).
#[derive(Default)]
pub(crate) struct Compiler {
    /// Fold operand values to lowercase so that matching can compare
    /// case-folded graphemes directly.
    ignore_case: bool,
    has_start_anchor: bool,
    has_end_anchor: bool,
}

impl Compiler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Specifies whether operand values are folded for case-insensitive
    /// matching.
    pub fn ignore_case(mut self, yes: bool) -> Self {
        self.ignore_case = yes;
        self
    }

    /// Compiles the AST into a postfix instruction sequence.
    pub fn compile(mut self, ast: &AST) -> Result<Compiled, CompileError> {
        let instructions = self.expression(ast.root(), true, None)?;

        if instructions.is_empty() {
            return Err(CompileError::EmptyPattern);
        }

        debug!(
            "compiled `{}` to {} instructions, start_anchor={}, end_anchor={}",
            ast.source,
            instructions.len(),
            self.has_start_anchor,
            self.has_end_anchor,
        );

        Ok(Compiled {
            instructions,
            has_start_anchor: self.has_start_anchor,
            has_end_anchor: self.has_end_anchor,
        })
    }

    /// Dispatches on the node's grammar rule.
    ///
    /// `negated` carries the `^` of an enclosing `[^...]` group down to the
    /// operands; it is a traversal parameter, not node state.
    fn node(
        &mut self,
        node: &AstNode,
        negated: Option<bool>,
    ) -> Result<Vec<PostfixNode>, CompileError> {
        match node.kind {
            GrammarRule::expression => self.expression(node, false, negated),
            GrammarRule::sub_expression => self.sub_expression(node, negated),
            // Single-child wrappers.
            GrammarRule::expression_item
            | GrammarRule::group
            | GrammarRule::match_item
            | GrammarRule::match_character_class
            | GrammarRule::character_group_item => {
                self.node(&node.children[0], negated)
            }
            GrammarRule::group_expression | GrammarRule::match_expr => {
                self.quantified(node, negated)
            }
            GrammarRule::character => Ok(vec![self.character(node, negated)]),
            GrammarRule::character_class => {
                self.character_class(node, negated)
            }
            GrammarRule::any_char => Ok(vec![operand(
                node.kind,
                smallvec!["".into()],
                // `.` is "anything but the empty grapheme". Inside a negated
                // group the flag flips, which makes it match nothing.
                match negated {
                    None => true,
                    Some(n) => !n,
                },
            )]),
            GrammarRule::character_group => self.character_group(node),
            GrammarRule::character_range => {
                Ok(self.character_range(node, negated))
            }
            rule => Err(CompileError::UnsupportedConstruct { rule }),
        }
    }

    /// Compiles an `expression`: alternatives joined pairwise with `|`,
    /// left-associatively in source order.
    ///
    /// Only the pattern's top-level expression can anchor the match at the
    /// stream start; a `^` inside a group belongs to that group's
    /// expression and groups cannot re-anchor the pattern.
    fn expression(
        &mut self,
        node: &AstNode,
        top_level: bool,
        negated: Option<bool>,
    ) -> Result<Vec<PostfixNode>, CompileError> {
        if top_level && node.child(GrammarRule::start_anchor).is_some() {
            self.has_start_anchor = true;
        }

        let mut result: Option<Vec<PostfixNode>> = None;

        for alt_node in node.children_of(GrammarRule::sub_expression) {
            let alt = self.sub_expression(alt_node, negated)?;
            result = Some(match result {
                None => alt,
                Some(mut acc) => match (acc.is_empty(), alt.is_empty()) {
                    (false, false) => {
                        acc.extend(alt);
                        acc.push(operator(node.kind, PostfixOp::Alternate));
                        acc
                    }
                    // An empty alternative makes the other side optional:
                    // `a|` accepts `a` or the empty string.
                    (false, true) => {
                        acc.push(operator(node.kind, PostfixOp::ZeroOrOne));
                        acc
                    }
                    (true, false) => {
                        let mut alt = alt;
                        alt.push(operator(node.kind, PostfixOp::ZeroOrOne));
                        alt
                    }
                    (true, true) => acc,
                },
            });
        }

        Ok(result.unwrap_or_default())
    }

    /// Compiles a `sub_expression`: items concatenated with `.`.
    ///
    /// Scanning stops the moment an item's literal text is `$`: the item
    /// marks the end anchor and the rest of the sequence is dropped. `$` is
    /// therefore only ever a trailing anchor, never a literal dollar sign
    /// (escape it as `\$` for that). A long-standing quirk of the dialect;
    /// patterns may rely on it, so it must not be "fixed" silently.
    fn sub_expression(
        &mut self,
        node: &AstNode,
        negated: Option<bool>,
    ) -> Result<Vec<PostfixNode>, CompileError> {
        let mut result = Vec::new();
        let mut pieces = 0;

        for item in &node.children {
            if item.literal_text() == "$" {
                self.has_end_anchor = true;
                break;
            }
            let compiled = self.node(item, negated)?;
            if compiled.is_empty() {
                continue;
            }
            result.extend(compiled);
            pieces += 1;
            if pieces > 1 {
                result.push(operator(node.kind, PostfixOp::Concat));
            }
        }

        Ok(result)
    }

    /// Compiles a `group_expression` or `match_expr`: the operand child
    /// followed by its optional quantifier.
    fn quantified(
        &mut self,
        node: &AstNode,
        negated: Option<bool>,
    ) -> Result<Vec<PostfixNode>, CompileError> {
        let operand_node = node
            .children
            .iter()
            .find(|c| {
                matches!(
                    c.kind,
                    GrammarRule::expression | GrammarRule::match_item
                )
            })
            .ok_or(CompileError::UnsupportedConstruct { rule: node.kind })?;

        let operand = self.node(operand_node, negated)?;

        let quantifier = match node.child(GrammarRule::quantifier) {
            Some(q) => Some(self.quantifier(q)?),
            None => None,
        };

        apply_quantifier(operand, quantifier)
    }

    /// Parses a `quantifier` node. The lazy `?` suffix is accepted by the
    /// grammar but carries no meaning here; non-greedy matching is a
    /// match-time option.
    fn quantifier(
        &mut self,
        node: &AstNode,
    ) -> Result<Quantifier, CompileError> {
        let inner = &node.children[0].children[0];
        match inner.kind {
            GrammarRule::simple_quantifier => match inner.literal_text() {
                "?" => Ok(Quantifier::ZeroOrOne),
                "*" => Ok(Quantifier::ZeroOrMore),
                "+" => Ok(Quantifier::OneOrMore),
                _ => Err(CompileError::UnsupportedConstruct { rule: inner.kind }),
            },
            GrammarRule::match_count_exact => {
                let n = parse_count(&inner.children[0], node)?;
                Ok(Quantifier::Counted { min: n, max: Some(n) })
            }
            GrammarRule::match_count_range => {
                let min = parse_count(&inner.children[0], node)?;
                let max = match inner.children.get(1) {
                    Some(c) => Some(parse_count(c, node)?),
                    None => None,
                };
                if matches!(max, Some(max) if max < min) {
                    return Err(CompileError::InvalidQuantifier {
                        quantifier: node.literal_text().to_owned(),
                    });
                }
                Ok(Quantifier::Counted { min, max })
            }
            rule => Err(CompileError::UnsupportedConstruct { rule }),
        }
    }

    /// Compiles a single `character` operand. The escape backslash, if
    /// present, is part of the literal text and is stripped here, so `\n`
    /// in a pattern is a literal `n`.
    fn character(&self, node: &AstNode, negated: Option<bool>) -> PostfixNode {
        let text = node.literal_text();
        let value = text.strip_prefix('\\').unwrap_or(text);
        operand(
            node.kind,
            smallvec![self.fold(value)],
            negated.unwrap_or(false),
        )
    }

    /// Compiles a `\w \W \d \D \s \S` class.
    ///
    /// The positive classes expand to unions of single-character operands;
    /// the negative ones are a single negated-set operand. The asymmetry is
    /// intentional: negation composes better as one node than as a
    /// conjunction of exclusions.
    fn character_class(
        &mut self,
        node: &AstNode,
        negated: Option<bool>,
    ) -> Result<Vec<PostfixNode>, CompileError> {
        let rule = node.kind;
        match node.literal_text() {
            r"\w" => {
                let mut nodes = Vec::new();
                self.push_range_union(&mut nodes, rule, 'a', 'z', negated);
                self.push_range_union(&mut nodes, rule, 'A', 'Z', negated);
                self.push_range_union(&mut nodes, rule, '0', '9', negated);
                self.push_union_member(&mut nodes, rule, "_", negated);
                Ok(nodes)
            }
            r"\W" => Ok(vec![operand(rule, word_values(), true)]),
            r"\d" => {
                let mut nodes = Vec::new();
                self.push_range_union(&mut nodes, rule, '0', '9', negated);
                Ok(nodes)
            }
            r"\D" => {
                let values = ('0'..='9').map(char_value).collect();
                Ok(vec![operand(rule, values, true)])
            }
            r"\s" => {
                let mut nodes = Vec::new();
                for value in WHITESPACE {
                    self.push_union_member(&mut nodes, rule, value, negated);
                }
                Ok(nodes)
            }
            r"\S" => {
                let values = WHITESPACE.iter().map(|v| (*v).into()).collect();
                Ok(vec![operand(rule, values, true)])
            }
            _ => Err(CompileError::UnsupportedConstruct { rule }),
        }
    }

    /// Compiles a `[...]` group. A leading `^` turns the whole group into a
    /// single negated-set operand; without it the members form a union.
    fn character_group(
        &mut self,
        node: &AstNode,
    ) -> Result<Vec<PostfixNode>, CompileError> {
        let negated = node.child(GrammarRule::negation).is_some();
        let inner = node
            .child(GrammarRule::character_group_inner)
            .ok_or(CompileError::UnsupportedConstruct { rule: node.kind })?;

        if !negated {
            let mut nodes = Vec::new();
            let mut members = 0;
            for item in &inner.children {
                let compiled = self.node(item, None)?;
                if compiled.is_empty() {
                    continue;
                }
                nodes.extend(compiled);
                members += 1;
                if members > 1 {
                    nodes.push(operator(inner.kind, PostfixOp::Alternate));
                }
            }
            return Ok(nodes);
        }

        // A negated group matches iff the input grapheme is absent from the
        // union of all member values, so the members collapse into one
        // negated-set operand (De Morgan applied to a union of negations).
        let mut values = OperandValues::new();
        for item in &inner.children {
            for instr in self.node(item, Some(true))? {
                if let PostfixKind::Operand(matcher) = instr.kind {
                    values.extend(matcher.values);
                }
            }
        }
        Ok(vec![operand(inner.kind, values, true)])
    }

    /// Expands an `a-z` range into a union with one operand per code point
    /// in the inclusive range. Simple over efficient; wide ranges expand
    /// proportionally.
    fn character_range(
        &self,
        node: &AstNode,
        negated: Option<bool>,
    ) -> Vec<PostfixNode> {
        let mut bounds = node
            .children
            .iter()
            .filter_map(|c| c.literal_text().chars().next());
        let mut nodes = Vec::new();
        if let (Some(start), Some(end)) = (bounds.next(), bounds.next()) {
            self.push_range_union(&mut nodes, node.kind, start, end, negated);
        }
        nodes
    }

    fn push_range_union(
        &self,
        nodes: &mut Vec<PostfixNode>,
        rule: GrammarRule,
        start: char,
        end: char,
        negated: Option<bool>,
    ) {
        for code in (start as u32)..=(end as u32) {
            if let Some(ch) = char::from_u32(code) {
                self.push_union_member(
                    nodes,
                    rule,
                    ch.encode_utf8(&mut [0u8; 4]),
                    negated,
                );
            }
        }
    }

    /// Appends one operand to a union under construction, chaining it to
    /// the previous members with `|`.
    fn push_union_member(
        &self,
        nodes: &mut Vec<PostfixNode>,
        rule: GrammarRule,
        value: &str,
        negated: Option<bool>,
    ) {
        nodes.push(operand(
            rule,
            smallvec![self.fold(value)],
            negated.unwrap_or(false),
        ));
        if nodes.len() > 1 {
            nodes.push(operator(rule, PostfixOp::Alternate));
        }
    }

    fn fold(&self, value: &str) -> Box<str> {
        if self.ignore_case {
            value.to_lowercase().into()
        } else {
            value.into()
        }
    }
}

const WHITESPACE: [&str; 6] = [" ", "\t", "\n", "\r", "\x0C", "\x0B"];

fn word_values() -> OperandValues {
    ('a'..='z')
        .chain('A'..='Z')
        .chain('0'..='9')
        .chain(std::iter::once('_'))
        .map(char_value)
        .collect()
}

fn char_value(ch: char) -> Box<str> {
    ch.to_string().into()
}

fn operand(
    rule: GrammarRule,
    values: OperandValues,
    negated: bool,
) -> PostfixNode {
    PostfixNode {
        produced_by: rule,
        kind: PostfixKind::Operand(Matcher { values, negated }),
    }
}

fn operator(rule: GrammarRule, op: PostfixOp) -> PostfixNode {
    PostfixNode { produced_by: rule, kind: PostfixKind::Operator(op) }
}

/// Applies a quantifier to compiled operand instructions.
///
/// The symbolic quantifiers append their operator. Counted repetition
/// expands eagerly: `min` mandatory concatenated copies, then either an
/// unbounded `*`-quantified trailing copy (open upper bound) or `max - min`
/// optional `?` copies concatenated in sequence. `{m,}` deliberately
/// expands to `m` copies plus a `*` copy rather than `m - 1` copies plus a
/// `+` copy, so the expansion size stays predictable.
fn apply_quantifier(
    operand: Vec<PostfixNode>,
    quantifier: Option<Quantifier>,
) -> Result<Vec<PostfixNode>, CompileError> {
    let Some(quantifier) = quantifier else { return Ok(operand) };

    if operand.is_empty() {
        return Ok(operand);
    }

    let simple = |mut operand: Vec<PostfixNode>, op| {
        operand.push(operator(GrammarRule::quantifier_type, op));
        operand
    };

    let (min, max) = match quantifier {
        Quantifier::ZeroOrOne => {
            return Ok(simple(operand, PostfixOp::ZeroOrOne))
        }
        Quantifier::ZeroOrMore => {
            return Ok(simple(operand, PostfixOp::ZeroOrMore))
        }
        Quantifier::OneOrMore => {
            return Ok(simple(operand, PostfixOp::OneOrMore))
        }
        Quantifier::Counted { min, max } => (min, max),
    };

    let mut result = Vec::new();
    let mut pushed = 0;
    let mut push_copy = |result: &mut Vec<PostfixNode>,
                         suffix: Option<PostfixOp>| {
        result.extend(operand.iter().cloned());
        if let Some(op) = suffix {
            result.push(operator(GrammarRule::quantifier, op));
        }
        pushed += 1;
        if pushed > 1 {
            result.push(operator(GrammarRule::quantifier, PostfixOp::Concat));
        }
    };

    for _ in 0..min {
        push_copy(&mut result, None);
    }

    match max {
        None => push_copy(&mut result, Some(PostfixOp::ZeroOrMore)),
        Some(max) => {
            for _ in min..max {
                push_copy(&mut result, Some(PostfixOp::ZeroOrOne));
            }
        }
    }

    Ok(result)
}

fn parse_count(
    node: &AstNode,
    quantifier: &AstNode,
) -> Result<u32, CompileError> {
    node.literal_text().parse().map_err(|_| {
        CompileError::InvalidQuantifier {
            quantifier: quantifier.literal_text().to_owned(),
        }
    })
}
