use stream_regex_parser::GrammarRule;
use thiserror::Error;

/// Errors returned while compiling a pattern.
#[derive(Error, Debug)]
pub enum CompileError {
    /// The pattern could not be parsed.
    #[error(transparent)]
    ParseError(#[from] stream_regex_parser::Error),

    /// The pattern contains no instructions (e.g. `""` or `"^"`).
    #[error("the pattern matches nothing")]
    EmptyPattern,

    /// A counted repetition has an upper bound smaller than its lower
    /// bound, like `a{5,2}`.
    #[error("invalid quantifier `{quantifier}`")]
    InvalidQuantifier {
        /// The offending quantifier, as written in the pattern.
        quantifier: String,
    },

    /// An AST node kind reached the compiler with no handling rule.
    ///
    /// This is an internal invariant violation: it can't occur for patterns
    /// that parsed successfully, and indicates a defect in this library.
    #[error("unsupported construct `{rule:?}` reached the compiler")]
    UnsupportedConstruct {
        /// The grammar rule the compiler couldn't handle.
        rule: GrammarRule,
    },

    /// The automaton builder was given an unbalanced instruction sequence.
    ///
    /// This is an internal invariant violation indicating a compiler bug;
    /// the compiler always emits balanced postfix sequences.
    #[error("invalid postfix expression")]
    InvalidPostfix,

    /// The automaton builder produced no entry state.
    ///
    /// This is an internal invariant violation; construction always yields
    /// an entry state for a non-empty instruction sequence.
    #[error("failed to build the automaton")]
    AutomatonBuild,

    /// The auxiliary pattern used for resolving capture groups could not
    /// be compiled.
    #[error("failed to compile the capture-resolution pattern: {0}")]
    Captures(#[from] regex_automata::meta::BuildError),
}
