use thiserror::Error;

/// An error occurred while parsing a stream-regex pattern.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The pattern could not be parsed by the grammar.
    ///
    /// The supported dialect is a subset of the conventional regex syntax,
    /// so a failure here is likely a feature-coverage limitation of this
    /// library rather than a malformed pattern. The underlying grammar
    /// error is included in the message.
    #[error(
        "unable to parse pattern: {error_msg}. This is probably a \
         limitation of this library and not an error in the input \
         expression"
    )]
    SyntaxError {
        /// The error reported by the underlying grammar.
        error_msg: String,
        /// 1-based column of the error within the pattern, when known.
        column: Option<usize>,
    },
}
