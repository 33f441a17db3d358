/*! Abstract Syntax Tree (AST) for stream-regex patterns.

The AST is a uniform tree of [`AstNode`], one node per grammar rule matched
while parsing a pattern. Every node knows which grammar rule produced it and
holds its children in source order; nodes without children are terminals.
This uniform shape keeps the tree faithful to the grammar productions, which
is what the compiler dispatches on.

# Example

```rust
use stream_regex_parser::Parser;

let ast = Parser::new().build_ast(r"(a|b)+c").unwrap();
assert_eq!(ast.root().literal_text(), "(a|b)+c");
```
*/

use std::fmt::{Debug, Formatter};

use crate::parser::GrammarRule;

/// Abstract Syntax Tree (AST) for a stream-regex pattern.
///
/// The AST holds references to the original pattern text. This avoids making
/// copies of the matched fragments, but also implies that the memory backing
/// the pattern can't be dropped until the AST is dropped.
pub struct AST<'src> {
    /// The pattern the AST was built from.
    pub source: &'src str,
    /// The root node, always a [`GrammarRule::expression`].
    pub root: AstNode<'src>,
}

impl<'src> AST<'src> {
    /// Returns the root of the tree.
    ///
    /// The root is always the top-level `expression` node of the pattern.
    pub fn root(&self) -> &AstNode<'src> {
        &self.root
    }
}

impl<'src> Debug for AST<'src> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "AST for {:?}", self.source)
    }
}

/// A node in the AST.
///
/// The node's `kind` is the grammar rule that produced it, and `children`
/// mirrors the rule's production in source order. Rules with a fixed arity
/// always produce that arity; iteration rules (`sub_expression`,
/// `character_group_inner`) hold a variable-length sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AstNode<'src> {
    /// The grammar rule this node was derived from.
    pub kind: GrammarRule,
    /// The pattern fragment matched by this node.
    text: &'src str,
    /// Child nodes, in source order. Empty for terminals.
    pub children: Vec<AstNode<'src>>,
}

impl<'src> AstNode<'src> {
    pub(crate) fn new(
        kind: GrammarRule,
        text: &'src str,
        children: Vec<AstNode<'src>>,
    ) -> Self {
        Self { kind, text, children }
    }

    /// True if this node is a terminal (has no children).
    pub fn is_terminal(&self) -> bool {
        self.children.is_empty()
    }

    /// The literal pattern text under this node.
    ///
    /// This is the concatenation of all terminal text below the node in
    /// depth-first, left-to-right order, which for this grammar is exactly
    /// the source fragment the node matched. It is how the compiler reads
    /// the literal value of quantifiers and anchors out of the tree instead
    /// of re-deriving it from the node kind.
    pub fn literal_text(&self) -> &'src str {
        self.text
    }

    /// Returns the first child with the given rule kind, if any.
    pub fn child(&self, kind: GrammarRule) -> Option<&AstNode<'src>> {
        self.children.iter().find(|c| c.kind == kind)
    }

    /// Returns the children with the given rule kind, in source order.
    pub fn children_of(
        &self,
        kind: GrammarRule,
    ) -> impl Iterator<Item = &AstNode<'src>> + '_ {
        self.children.iter().filter(move |c| c.kind == kind)
    }
}
