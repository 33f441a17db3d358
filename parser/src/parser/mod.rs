use pest::error::InputLocation;
use pest::iterators::Pair;
use pest::Parser as PestParser;

use crate::ast::{AstNode, AST};

#[doc(inline)]
pub use crate::parser::errors::*;
pub use crate::parser::grammar::Rule as GrammarRule;

mod errors;


/// Receives a stream-regex pattern and produces an Abstract Syntax Tree
/// (AST).
#[derive(Default)]
pub struct Parser {}

impl Parser {
    /// Creates a new pattern parser.
    pub fn new() -> Self {
        Self {}
    }

    /// Builds the Abstract Syntax Tree (AST) for a pattern.
    ///
    /// The AST returned by this function holds references to the original
    /// pattern text, which avoids copying the matched fragments but also
    /// implies that the memory backing the pattern can't be dropped until
    /// the AST is dropped.
    ///
    /// The root of the returned tree is always the pattern's top-level
    /// `expression` node.
    ///
    /// # Example
    ///
    /// ```
    /// use stream_regex_parser::Parser;
    /// let ast = Parser::new().build_ast(r"\w+@[a-z]+").unwrap();
    /// ```
    pub fn build_ast<'src>(&self, pattern: &'src str) -> Result<AST<'src>, Error> {
        let mut pairs =
            grammar::ParserImpl::parse(GrammarRule::pattern, pattern)
                .map_err(convert_pest_error)?;

        // The first (and only) pair is the `pattern` rule; its children are
        // the top-level `expression` followed by EOI.
        let root = pairs
            .next()
            .expect("the grammar always produces a `pattern` node")
            .into_inner()
            .next()
            .expect("a `pattern` node always contains an `expression`");

        debug_assert_eq!(root.as_rule(), GrammarRule::expression);

        Ok(AST { source: pattern, root: ast_node_from_pair(root) })
    }
}

/// Normalizes a pest pair into the uniform AST node shape.
///
/// Pairs that matched no inner rule become terminals carrying their matched
/// text; everything else holds its children in source order. The `EOI`
/// marker emitted by pest is not part of the pattern and is dropped.
fn ast_node_from_pair<'src>(pair: Pair<'src, GrammarRule>) -> AstNode<'src> {
    let kind = pair.as_rule();
    let text = pair.as_str();
    let children = pair
        .into_inner()
        .filter(|pair| pair.as_rule() != GrammarRule::EOI)
        .map(ast_node_from_pair)
        .collect();
    AstNode::new(kind, text, children)
}

fn convert_pest_error(err: pest::error::Error<GrammarRule>) -> Error {
    let column = match err.location {
        InputLocation::Pos(pos) => Some(pos + 1),
        InputLocation::Span((start, _)) => Some(start + 1),
    };
    Error::SyntaxError { error_msg: err.variant.message().into_owned(), column }
}

mod grammar {
    #[derive(pest_derive::Parser)]
    #[grammar = "parser/grammar.pest"]
    pub struct ParserImpl;
}
