/*! A regular expression engine for streaming input.

This crate matches and replaces patterns against data that arrives
incrementally, without buffering the entire input in memory and with
bounded re-scan cost as new data arrives. A pattern is compiled once into a
Thompson-construction NFA; each run then advances the automaton one
grapheme cluster at a time as chunks are pushed in, so results never depend
on where the chunk boundaries fall.

The supported dialect is a subset of the conventional regex syntax:
anchors `^`/`$`, groups `(...)`/`(?:...)`, alternation `|`, character
classes `\w \W \d \D \s \S`, character groups `[...]`/`[^...]` with
ranges, `.`, and quantifiers `* + ? {m} {m,} {m,n}`. Backreferences and
lookaround are not supported.

There are two main types in this crate: [`StreamRegex`], the compiled
pattern, and the run objects it hands out: [`ReplaceStream`] for producing
a transformed output stream and [`MatchStream`] for collecting the matched
substrings. A compiled [`StreamRegex`] holds no per-run state, so it can be
shared by any number of runs.

# Example

```rust
// Compile a pattern.
let regex = stream_regex::compile(r"colou?r").unwrap();

// Replace matches while the input streams through in chunks.
let mut replace = regex.replace_stream("hue");
let mut output = String::new();
for chunk in ["The colo", "ur of the sky"] {
    output.push_str(&replace.push(chunk).unwrap());
}
output.push_str(&replace.finish().unwrap());

assert_eq!(output, "The hue of the sky");
```
*/

#![deny(missing_docs)]

pub use compiler::CompileError;
pub use matcher::StreamError;
pub use replace::{MatchedText, Replacer};
pub use stream_regex_parser::Error as ParseError;

mod compiler;
mod matcher;
mod nfa;
mod replace;

#[cfg(test)]
mod tests;

use std::io;

use bstr::ByteSlice;
use log::debug;
use regex_automata::meta;
use regex_automata::util::syntax;
use stream_regex_parser::Parser;

use crate::compiler::Compiler;
use crate::matcher::{Emitter, GraphemeBuffer, Span, SpanScanner};
use crate::nfa::Nfa;

/// Default size, in bytes, of the buffer between raw input chunks and the
/// grapheme-level stepping stage.
const DEFAULT_HIGH_WATER_MARK: usize = 1024;

/// Compiles a pattern with default flags.
///
/// This is a shorthand for [`StreamRegex::new`].
///
/// # Example
///
/// ```rust
/// let regex = stream_regex::compile(r"ab+c").unwrap();
/// assert!(!regex.is_global());
/// ```
pub fn compile(pattern: &str) -> Result<StreamRegex, CompileError> {
    StreamRegex::new(pattern)
}

/// A compiled streaming regular expression.
///
/// Compilation parses the pattern into an AST, lowers it to a postfix
/// instruction sequence, and builds the automaton, all exactly once. The
/// per-stream state lives in the run objects returned by
/// [`StreamRegex::replace_stream`] and [`StreamRegex::match_stream`], so
/// one compiled pattern can serve any number of streams.
pub struct StreamRegex {
    pattern: String,
    nfa: Nfa,
    global: bool,
    ignore_case: bool,
    match_from_start: bool,
    match_to_end: bool,
    /// Capture-aware twin of the automaton, used to resolve groups inside
    /// an already located match.
    group_re: meta::Regex,
}

impl StreamRegex {
    /// Compiles `pattern` with default flags.
    pub fn new(pattern: &str) -> Result<Self, CompileError> {
        Self::builder().build(pattern)
    }

    /// Returns a builder for setting the pattern flags.
    ///
    /// # Example
    ///
    /// ```rust
    /// use stream_regex::StreamRegex;
    ///
    /// let regex = StreamRegex::builder()
    ///     .global(true)
    ///     .case_insensitive(true)
    ///     .build("ab")
    ///     .unwrap();
    /// ```
    pub fn builder() -> StreamRegexBuilder {
        StreamRegexBuilder::default()
    }

    /// The pattern this regex was compiled from.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// True if the regex processes every match instead of only the first.
    pub fn is_global(&self) -> bool {
        self.global
    }

    /// True if matching is case-insensitive.
    pub fn is_case_insensitive(&self) -> bool {
        self.ignore_case
    }

    /// True if the pattern had a leading `^`: it can only match at the
    /// very start of the stream.
    pub fn is_start_anchored(&self) -> bool {
        self.match_from_start
    }

    /// True if the pattern had a trailing `$`: only a match ending exactly
    /// at the end of the stream counts.
    pub fn is_end_anchored(&self) -> bool {
        self.match_to_end
    }

    /// Starts a replacement run.
    ///
    /// Push input chunks with [`ReplaceStream::push`], which returns the
    /// transformed text that became available, and call
    /// [`ReplaceStream::finish`] at end of input to flush the rest.
    /// Matched text is passed through `replacement` (a string with
    /// `$1`-style interpolation, or a closure); unmatched text passes
    /// through verbatim.
    pub fn replace_stream<R: Replacer>(
        &self,
        replacement: R,
    ) -> ReplaceStream<'_, R> {
        ReplaceStream {
            regex: self,
            graphemes: GraphemeBuffer::new(),
            scanner: SpanScanner::new(&self.nfa, true, self.ignore_case),
            emitter: Emitter::new(
                self.global,
                self.match_from_start,
                self.match_to_end,
            ),
            replacer: replacement,
            spans: Vec::new(),
            high_water_mark: DEFAULT_HIGH_WATER_MARK,
        }
    }

    /// Starts a matching run.
    ///
    /// Push input chunks with [`MatchStream::push`], which returns the
    /// matched substrings that became available, and call
    /// [`MatchStream::finish`] at end of input.
    ///
    /// This runs the replacement machinery with a replacement that records
    /// every match and leaves the text unchanged.
    pub fn match_stream(&self) -> MatchStream<'_> {
        MatchStream {
            regex: self,
            graphemes: GraphemeBuffer::new(),
            scanner: SpanScanner::new(&self.nfa, true, self.ignore_case),
            emitter: Emitter::new(
                self.global,
                self.match_from_start,
                self.match_to_end,
            ),
            spans: Vec::new(),
            sink: String::new(),
        }
    }

    /// Copies `reader` to `writer`, replacing matches on the way.
    ///
    /// The input is consumed in buffered chunks of the default
    /// high-water-mark size, so only a bounded window of the stream is
    /// ever held in memory; backpressure comes from the blocking writes to
    /// `writer`.
    pub fn replace_reader<R, W, P>(
        &self,
        mut reader: R,
        mut writer: W,
        replacement: P,
    ) -> Result<(), StreamError>
    where
        R: io::Read,
        W: io::Write,
        P: Replacer,
    {
        let mut stream = self.replace_stream(replacement);
        let mut buf = vec![0u8; stream.high_water_mark];

        loop {
            let n = reader.read(&mut buf)?;
            if n == 0 {
                break;
            }
            let out = stream.push(&buf[..n])?;
            if !out.is_empty() {
                writer.write_all(out.as_bytes())?;
            }
        }

        let out = stream.finish()?;
        if !out.is_empty() {
            writer.write_all(out.as_bytes())?;
        }
        Ok(())
    }

    pub(crate) fn rewrite<R: Replacer + ?Sized>(
        &self,
        matched: &str,
        replacer: &mut R,
    ) -> String {
        replace::rewrite(&self.group_re, self.global, matched, replacer)
    }
}

/// Builds a [`StreamRegex`] with non-default flags.
#[derive(Default)]
pub struct StreamRegexBuilder {
    global: bool,
    case_insensitive: bool,
}

impl StreamRegexBuilder {
    /// Process every match in the stream instead of only the first
    /// (the `g` flag). Default `false`.
    pub fn global(mut self, yes: bool) -> Self {
        self.global = yes;
        self
    }

    /// Compare case-insensitively (the `i` flag). Default `false`.
    pub fn case_insensitive(mut self, yes: bool) -> Self {
        self.case_insensitive = yes;
        self
    }

    /// Compiles `pattern` with the configured flags.
    pub fn build(&self, pattern: &str) -> Result<StreamRegex, CompileError> {
        let ast = Parser::new().build_ast(pattern)?;

        let compiled =
            Compiler::new().ignore_case(self.case_insensitive).compile(&ast)?;

        let nfa = nfa::build(&compiled.instructions)?;
        if nfa.len() == 0 {
            return Err(CompileError::AutomatonBuild);
        }

        debug!(
            "built automaton for `{pattern}` with {} states",
            nfa.len(),
        );

        let group_re = meta::Regex::builder()
            .syntax(
                syntax::Config::new().case_insensitive(self.case_insensitive),
            )
            .build(&replace::capture_pattern(&ast))?;

        Ok(StreamRegex {
            pattern: pattern.to_owned(),
            nfa,
            global: self.global,
            ignore_case: self.case_insensitive,
            match_from_start: compiled.has_start_anchor,
            match_to_end: compiled.has_end_anchor,
            group_re,
        })
    }
}

/// A replacement run over one input stream.
///
/// Created by [`StreamRegex::replace_stream`]. Push chunks in, collect the
/// transformed text each push returns, and finish to flush whatever is
/// still pending (a candidate match can stay buffered until the automaton
/// knows whether a longer match follows).
pub struct ReplaceStream<'r, R: Replacer> {
    regex: &'r StreamRegex,
    graphemes: GraphemeBuffer,
    scanner: SpanScanner<'r>,
    emitter: Emitter,
    replacer: R,
    spans: Vec<Span>,
    high_water_mark: usize,
}

impl<'r, R: Replacer> ReplaceStream<'r, R> {
    /// Prefer the shortest match instead of the longest. Default: greedy
    /// (longest).
    pub fn greedy(mut self, yes: bool) -> Self {
        self.scanner.set_greedy(yes);
        self
    }

    /// Size, in bytes, of the internal processing buffer. Default 1024.
    pub fn high_water_mark(mut self, size: usize) -> Self {
        self.high_water_mark = size;
        self
    }

    /// Pushes a chunk of input and returns the output text that became
    /// available.
    ///
    /// The chunk can split UTF-8 sequences and grapheme clusters anywhere;
    /// chunk boundaries never affect the result.
    pub fn push(
        &mut self,
        chunk: impl AsRef<[u8]>,
    ) -> Result<String, StreamError> {
        self.graphemes.push(chunk.as_ref())?;
        let ready = self.graphemes.take_ready();
        let mut out = String::new();
        for grapheme in ready.as_bytes().graphemes() {
            self.scanner.feed(grapheme, &mut self.spans);
        }
        self.drain_spans(&mut out);
        Ok(out)
    }

    /// Signals end of input and returns the remaining output text.
    pub fn finish(mut self) -> Result<String, StreamError> {
        let tail = self.graphemes.finish()?;
        let mut out = String::new();
        for grapheme in tail.as_bytes().graphemes() {
            self.scanner.feed(grapheme, &mut self.spans);
        }
        self.scanner.finish(&mut self.spans);
        self.drain_spans(&mut out);

        let regex = self.regex;
        let replacer = &mut self.replacer;
        let mut on_replace = |m: &str| regex.rewrite(m, &mut *replacer);
        self.emitter.finish(&mut on_replace, &mut out);

        Ok(out)
    }

    fn drain_spans(&mut self, out: &mut String) {
        let regex = self.regex;
        let replacer = &mut self.replacer;
        let emitter = &mut self.emitter;
        let mut on_replace = |m: &str| regex.rewrite(m, &mut *replacer);
        for span in self.spans.drain(..) {
            emitter.emit(span, &mut on_replace, out);
        }
    }
}

/// A matching run over one input stream.
///
/// Created by [`StreamRegex::match_stream`]. Push chunks in and collect
/// the matched substrings each push returns; finish at end of input to get
/// the matches that were still pending.
pub struct MatchStream<'r> {
    regex: &'r StreamRegex,
    graphemes: GraphemeBuffer,
    scanner: SpanScanner<'r>,
    emitter: Emitter,
    spans: Vec<Span>,
    /// Discarded replacement output; matching only collects the side
    /// channel.
    sink: String,
}

impl<'r> MatchStream<'r> {
    /// Prefer the shortest match instead of the longest. Default: greedy
    /// (longest).
    pub fn greedy(mut self, yes: bool) -> Self {
        self.scanner.set_greedy(yes);
        self
    }

    /// Pushes a chunk of input and returns the matches that became
    /// available, in stream order.
    pub fn push(
        &mut self,
        chunk: impl AsRef<[u8]>,
    ) -> Result<Vec<String>, StreamError> {
        self.graphemes.push(chunk.as_ref())?;
        let ready = self.graphemes.take_ready();
        let mut found = Vec::new();
        for grapheme in ready.as_bytes().graphemes() {
            self.scanner.feed(grapheme, &mut self.spans);
        }
        self.drain_spans(&mut found);
        Ok(found)
    }

    /// Signals end of input and returns the remaining matches.
    pub fn finish(mut self) -> Result<Vec<String>, StreamError> {
        let tail = self.graphemes.finish()?;
        let mut found = Vec::new();
        for grapheme in tail.as_bytes().graphemes() {
            self.scanner.feed(grapheme, &mut self.spans);
        }
        self.scanner.finish(&mut self.spans);
        self.drain_spans(&mut found);

        let regex = self.regex;
        let sink = &mut self.sink;
        let mut recorder = Recorder { found: &mut found };
        let mut on_replace = |m: &str| regex.rewrite(m, &mut recorder);
        self.emitter.finish(&mut on_replace, sink);

        Ok(found)
    }

    fn drain_spans(&mut self, found: &mut Vec<String>) {
        let regex = self.regex;
        let emitter = &mut self.emitter;
        let sink = &mut self.sink;
        sink.clear();
        let mut recorder = Recorder { found };
        let mut on_replace = |m: &str| regex.rewrite(m, &mut recorder);
        for span in self.spans.drain(..) {
            emitter.emit(span, &mut on_replace, sink);
        }
    }
}

/// Replacer that records every match and leaves the text unchanged.
struct Recorder<'a> {
    found: &'a mut Vec<String>,
}

impl Replacer for Recorder<'_> {
    fn replace_match(&mut self, matched: &MatchedText<'_>, dst: &mut String) {
        self.found.push(matched.text().to_string());
        dst.push_str(matched.text());
    }
}
