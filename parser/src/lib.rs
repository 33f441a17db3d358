/*! Parses stream-regex patterns and produces an Abstract Syntax Tree (AST).

The supported dialect is a subset of the conventional regex syntax: anchors
`^`/`$`, groups `(...)`/`(?:...)`, alternation `|`, character classes
`\w \W \d \D \s \S`, character groups `[...]`/`[^...]` with alphanumeric
ranges, `.` (any character), and quantifiers `* + ? {m} {m,} {m,n}`.
Backreferences and lookaround assertions are not supported.

The parsing itself is done by a [pest](https://pest.rs) grammar; this crate
normalizes the parse tree into a uniform AST of `{kind, children}` nodes (see
[`ast::AstNode`]), where each node's kind is the [`GrammarRule`] it was
derived from. That uniform shape is what the downstream compiler dispatches
on.

# Example

```
use stream_regex_parser::{Parser, GrammarRule};

let ast = Parser::new().build_ast(r"a(b|c)*").unwrap();
assert_eq!(ast.root().kind, GrammarRule::expression);
```
*/

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod ast;
pub use parser::*;

mod parser;
