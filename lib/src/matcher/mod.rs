/*!
This module runs a compiled automaton incrementally over a stream of text.

The simulation holds a set of live automaton states and advances it one
grapheme cluster at a time, exactly as if the whole input had been buffered
and scanned at once. Its output is a sequence of spans: stretches of input
that matched the pattern and stretches that did not. A separate
interpretation layer ([`Emitter`]) turns those spans into the public
replace/match results, applying the global, anchored and first-match-only
semantics.
*/

use std::collections::VecDeque;
use std::mem;

use bstr::ByteSlice;
use log::trace;
use thiserror::Error;

use crate::nfa::{Nfa, State, StateId};

pub(crate) use graphemes::GraphemeBuffer;

mod graphemes;


/// Errors returned while matching over a stream.
///
/// The absence of a match is never an error; these cover only transport
/// level failures. Any of them terminates the run.
#[derive(Error, Debug)]
pub enum StreamError {
    /// The input is not valid UTF-8.
    #[error("invalid UTF-8 in the input stream at byte offset {offset}")]
    InvalidUtf8 {
        /// Offset of the offending byte within the stream.
        offset: usize,
    },

    /// An I/O error occurred while reading the input or writing the
    /// output.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// A stretch of input text, classified by the automaton.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Span {
    /// The text matched the pattern.
    Matched(String),
    /// The text did not match and passes through verbatim.
    Unmatched(String),
}

/// Incremental NFA simulation over grapheme clusters.
///
/// The scanner consumes one cluster at a time and emits [`Span`]s as match
/// attempts complete. All simulation-scoped mutable state lives here (not
/// in the shared automaton), so any number of scanners can use the same
/// automaton sequentially or concurrently.
pub(crate) struct SpanScanner<'r> {
    nfa: &'r Nfa,
    /// Prefer the longest match (keep scanning after a match is found)
    /// instead of emitting the shortest one immediately.
    greedy: bool,
    /// Case-fold each input grapheme before comparing. Operand values were
    /// folded at compile time.
    ignore_case: bool,
    /// Live `Char`/`Match` states, deduplicated by epsilon closure.
    current: Vec<StateId>,
    next: Vec<StateId>,
    /// Scratch stack for the epsilon closure computation.
    closure_stack: Vec<StateId>,
    /// Per-state generation tags: a state is in the closure being built
    /// iff its tag equals `list_id`. This replaces a visited-set and makes
    /// the cyclic `*`/`+` edges terminate.
    visited: Vec<u32>,
    list_id: u32,
    /// Text consumed since the current attempt started.
    buffer: String,
    /// End (in `buffer`) of the longest match recorded so far within the
    /// current attempt.
    last_match_end: Option<usize>,
    /// Clusters to re-scan before any new input: the text consumed after a
    /// match's end is replayed once the attempt fails, so no input is lost
    /// and adjacent matches are found.
    replay: VecDeque<String>,
}

impl<'r> SpanScanner<'r> {
    pub fn new(nfa: &'r Nfa, greedy: bool, ignore_case: bool) -> Self {
        Self {
            nfa,
            greedy,
            ignore_case,
            current: Vec::new(),
            next: Vec::new(),
            closure_stack: Vec::new(),
            visited: vec![0; nfa.len()],
            list_id: 0,
            buffer: String::new(),
            last_match_end: None,
            replay: VecDeque::new(),
        }
    }

    pub fn set_greedy(&mut self, greedy: bool) {
        self.greedy = greedy;
    }

    /// Consumes one grapheme cluster, plus any clusters scheduled for
    /// replay by a previous failure.
    pub fn feed(&mut self, grapheme: &str, out: &mut Vec<Span>) {
        self.consume(grapheme, out);
        while let Some(g) = self.replay.pop_front() {
            self.consume(&g, out);
        }
    }

    /// Flushes the pending recorded match and the residual unmatched
    /// buffer at end of input.
    pub fn finish(&mut self, out: &mut Vec<Span>) {
        match self.last_match_end.take() {
            Some(end) => {
                let rest = self.buffer.split_off(end);
                out.push(Span::Matched(mem::take(&mut self.buffer)));
                if !rest.is_empty() {
                    out.push(Span::Unmatched(rest));
                }
            }
            None => {
                if !self.buffer.is_empty() {
                    out.push(Span::Unmatched(mem::take(&mut self.buffer)));
                }
            }
        }
        self.current.clear();
    }

    fn consume(&mut self, grapheme: &str, out: &mut Vec<Span>) {
        self.buffer.push_str(grapheme);

        // An empty state set means no attempt is in progress; start one
        // from the entry state's closure.
        if self.current.is_empty() {
            self.list_id += 1;
            let start = self.nfa.start();
            epsilon_closure(
                self.nfa,
                start,
                self.list_id,
                &mut self.visited,
                &mut self.closure_stack,
                &mut self.current,
            );
        }

        self.step(grapheme);

        if self
            .current
            .iter()
            .any(|&id| matches!(self.nfa.state(id), State::Match))
        {
            trace!(
                "match recorded at byte {}: {:?}",
                self.buffer.len(),
                self.buffer,
            );
            self.last_match_end = Some(self.buffer.len());

            if !self.greedy {
                // Shortest match wins: emit it and restart immediately.
                self.last_match_end = None;
                out.push(Span::Matched(mem::take(&mut self.buffer)));
                self.current.clear();
                self.list_id += 1;
                let start = self.nfa.start();
                epsilon_closure(
                    self.nfa,
                    start,
                    self.list_id,
                    &mut self.visited,
                    &mut self.closure_stack,
                    &mut self.current,
                );
                return;
            }
        }

        if self.current.is_empty() {
            // The attempt failed: no state survived this grapheme.
            match self.last_match_end.take() {
                None => {
                    out.push(Span::Unmatched(mem::take(&mut self.buffer)));
                }
                Some(end) => {
                    // Emit the recorded match. Everything consumed after
                    // its end (including the grapheme that just failed) is
                    // replayed so the next attempt sees it from the entry
                    // state.
                    let tail = self.buffer.split_off(end);
                    out.push(Span::Matched(mem::take(&mut self.buffer)));
                    let clusters: Vec<&str> =
                        tail.as_bytes().graphemes().collect();
                    for g in clusters.into_iter().rev() {
                        self.replay.push_front(g.to_string());
                    }
                }
            }
        }
    }

    /// Runs one step of the automaton on a grapheme: every live `Char`
    /// state that accepts it contributes its successor's epsilon closure
    /// to the next state set.
    fn step(&mut self, grapheme: &str) {
        self.list_id += 1;

        let folded;
        let grapheme = if self.ignore_case {
            folded = grapheme.to_lowercase();
            folded.as_str()
        } else {
            grapheme
        };

        self.next.clear();

        for i in 0..self.current.len() {
            let id = self.current[i];
            if let State::Char { matcher, out } = self.nfa.state(id) {
                if matcher.matches(grapheme) {
                    if let Some(out) = out {
                        epsilon_closure(
                            self.nfa,
                            *out,
                            self.list_id,
                            &mut self.visited,
                            &mut self.closure_stack,
                            &mut self.next,
                        );
                    }
                }
            }
        }

        mem::swap(&mut self.current, &mut self.next);
    }
}

/// Computes the set of `Char`/`Match` states reachable from `start`
/// without consuming input, appending them to `dest`.
///
/// `Split` states are epsilon transitions: instead of entering the set
/// themselves they contribute both successors, `out` before `out1`. The
/// generation tag in `visited` stops the traversal from revisiting a state
/// within the same closure, which both deduplicates the set and terminates
/// the cyclic back-edges created by `*` and `+`.
fn epsilon_closure(
    nfa: &Nfa,
    start: StateId,
    list_id: u32,
    visited: &mut [u32],
    stack: &mut Vec<StateId>,
    dest: &mut Vec<StateId>,
) {
    stack.push(start);

    while let Some(id) = stack.pop() {
        if visited[id.index()] == list_id {
            continue;
        }
        visited[id.index()] = list_id;

        match nfa.state(id) {
            State::Split { out, out1 } => {
                // LIFO stack: push `out1` first so `out` is explored first.
                if let Some(out1) = out1 {
                    stack.push(*out1);
                }
                if let Some(out) = out {
                    stack.push(*out);
                }
            }
            _ => dest.push(id),
        }
    }
}

/// Turns the scanner's spans into the public result stream.
///
/// This layer owns the cross-span semantics: `global` vs first-match-only,
/// the sticky rejection once a start-anchored pattern has failed, and the
/// deferred emission of end-anchored matches (only the match that survives
/// until end of input counts; superseded candidates are demoted back to
/// plain text).
pub(crate) struct Emitter {
    global: bool,
    match_from_start: bool,
    match_to_end: bool,
    /// At least one match has occurred (governs non-`global` runs).
    match_succeeded: bool,
    /// Sticky: set once a start-anchored pattern can no longer match.
    reject_matching: bool,
    /// The candidate match retained for an end-anchored pattern.
    recorded: Option<String>,
}

impl Emitter {
    pub fn new(
        global: bool,
        match_from_start: bool,
        match_to_end: bool,
    ) -> Self {
        Self {
            global,
            match_from_start,
            match_to_end,
            match_succeeded: false,
            reject_matching: false,
            recorded: None,
        }
    }

    /// Processes one span, appending output text to `out`. Matched spans
    /// that qualify are passed through `on_replace`; everything else is
    /// emitted verbatim.
    pub fn emit(
        &mut self,
        span: Span,
        on_replace: &mut dyn FnMut(&str) -> String,
        out: &mut String,
    ) {
        match span {
            Span::Matched(matched) => {
                if self.match_to_end {
                    // Any later span demotes the previous candidate: text
                    // now follows it, so it did not end at the end of the
                    // stream.
                    if let Some(prev) = self.recorded.take() {
                        out.push_str(&prev);
                    }
                    if self.reject_matching {
                        // A rejected match is plain text.
                        out.push_str(&matched);
                    } else {
                        self.recorded = Some(matched);
                    }
                } else if !self.reject_matching
                    && (self.global || !self.match_succeeded)
                {
                    out.push_str(&on_replace(&matched));
                } else {
                    out.push_str(&matched);
                }
                self.match_succeeded = true;
            }
            Span::Unmatched(text) => {
                if let Some(prev) = self.recorded.take() {
                    out.push_str(&prev);
                }
                out.push_str(&text);
            }
        }

        // A start-anchored pattern gets exactly one attempt at position
        // zero; after the first span of any kind, no later attempt can
        // begin at the stream start.
        if self.match_from_start {
            self.reject_matching = true;
        }
    }

    /// Flushes the surviving end-anchored candidate at end of input.
    ///
    /// `global` has no effect here: at most one match can end exactly at
    /// the end of the stream.
    pub fn finish(
        &mut self,
        on_replace: &mut dyn FnMut(&str) -> String,
        out: &mut String,
    ) {
        if self.match_to_end {
            if let Some(matched) = self.recorded.take() {
                out.push_str(&on_replace(&matched));
            }
        }
    }
}
