//! Foma finite-state transducer engine.
//!
//! This crate loads transducers serialized in foma's text format (the
//! gzip'd `.fomabin` files written by `save stack`) and evaluates them in
//! both directions: analysis (surface form to analysis tags) and generation
//! (analysis to surface form). It does not compile, minimize or weight
//! transducers; it only consumes ones compiled elsewhere.
//!
//! # Architecture
//!
//! - [`symbols`] -- Symbol model and the code-to-symbol table
//! - [`flags`] -- Flag diacritic operations (P, U, R, D, C)
//! - [`format`] -- Section headers, the props line and label orientation
//! - [`transition`] -- Arc records and the state-line grammar
//! - [`parse`] -- Sectioned line parser producing a [`parse::ParsedNet`]
//! - [`tokenizer`] -- Longest-match splitting of text into alphabet symbols
//! - [`config`] -- Traversal limits and per-lookup DFS stacks
//! - [`traversal`] -- Explicit-stack depth-first search over the graph
//! - [`transducer`] -- The assembled [`Fst`] and its public operations
//! - [`bulk`] -- Bulk lookup over many inputs, in-process or via an external tool
//!
//! # Example
//!
//! ```
//! use foma_fst::{Fst, Orientation};
//!
//! let text = [
//!     "##foma-net 1.0##",
//!     "##props##",
//!     "2 2 3 4 1 1 1 1 1 1 1 2 ab",
//!     "##sigma##",
//!     "0 @_EPSILON_SYMBOL_@",
//!     "3 +X",
//!     "4 a",
//!     "##states##",
//!     "0 4 1 0",
//!     "1 3 0 2 0",
//!     "2 -1 -1 1",
//!     "-1 -1 -1 -1 -1",
//!     "##end##",
//! ]
//! .join("\n");
//! let fst = Fst::from_text(&text, Orientation::Normal).unwrap();
//!
//! let analyses: Vec<Vec<String>> = fst.analyze("a").collect::<Result<_, _>>().unwrap();
//! assert_eq!(analyses, vec![vec!["a".to_string(), "+X".to_string()]]);
//!
//! let forms: Vec<String> = fst.generate("a+X").collect::<Result<_, _>>().unwrap();
//! assert_eq!(forms, vec!["a".to_string()]);
//! ```

pub mod bulk;
pub mod config;
pub mod flags;
pub mod format;
pub mod parse;
pub mod symbols;
pub mod tokenizer;
pub mod transducer;
pub mod transition;
pub mod traversal;

pub use config::TraversalLimits;
pub use format::Orientation;
pub use symbols::{Symbol, SymbolId, SymbolTable};
pub use transducer::{Analyses, Analysis, Fst, Generations};
pub use transition::{StateId, Transition};

/// Structural errors raised while parsing foma text.
///
/// Every variant carries the 1-based line number where the problem was
/// detected. Parsing never recovers: the first error aborts the load.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line}: expected section ##{expected}## but found ##{found}##")]
    UnexpectedSection {
        line: usize,
        expected: &'static str,
        found: String,
    },
    #[error("line {line}: unsupported net header ##{found}##")]
    UnsupportedVersion { line: usize, found: String },
    #[error("line {line}: content before the ##foma-net 1.0## header")]
    ContentBeforeHeader { line: usize },
    #[error("line {line}: section ##{section}## takes no content")]
    UnexpectedContent { line: usize, section: &'static str },
    #[error("line {line}: a second transducer starts after ##end##; only one net per input is supported")]
    MultipleTransducers { line: usize },
    #[error("line {line}: content after ##end##")]
    ContentAfterEnd { line: usize },
    #[error("line {line}: ##props## must contain exactly one line")]
    PropsLineCount { line: usize },
    #[error("line {line}: malformed props line: {reason}")]
    MalformedProps { line: usize, reason: String },
    #[error("line {line}: {token:?} is not an integer")]
    InvalidInteger { line: usize, token: String },
    #[error("line {line}: state lines have 2 to 5 fields, found {count}")]
    InvalidFieldCount { line: usize, count: usize },
    #[error("line {line}: arc omits its source state but no state has been defined yet")]
    NoImpliedState { line: usize },
    #[error("line {line}: negative state id {state}")]
    NegativeState { line: usize, state: i64 },
    #[error("line {line}: sigma code {code} is defined twice")]
    DuplicateSymbol { line: usize, code: i64 },
    #[error("line {line}: arc references undefined sigma code {code}")]
    UnknownSymbol { line: usize, code: i64 },
    #[error("line {line}: sigma code {code} has no symbol text")]
    MissingSymbolText { line: usize, code: i64 },
    #[error("line {line}: reserved symbol {text:?} is not supported")]
    UnsupportedSymbol { line: usize, text: String },
    #[error("line {line}: invalid flag diacritic {text:?}")]
    InvalidFlagDiacritic { line: usize, text: String },
    #[error("input ended inside ##{section}## without an ##end## line")]
    Truncated { section: &'static str },
}

/// Error type for loading a transducer.
#[derive(Debug, thiserror::Error)]
pub enum FstError {
    #[error("failed to read transducer: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse transducer: {0}")]
    Parse(#[from] ParseError),
    #[error("invalid label orientation {given:?}; valid choices are: normal, invert")]
    InvalidOrientation { given: String },
    #[error("failed to build the alphabet pattern: {0}")]
    AlphabetPattern(#[from] regex::Error),
    #[error("lookup failed: {0}")]
    Lookup(#[from] LookupError),
    #[error("external lookup failed: {0}")]
    ExternalLookup(String),
}

/// The input text contains a substring that no alphabet symbol matches.
///
/// This is an expected outcome for arbitrary user input; `analyze` and
/// `generate` turn it into an empty result sequence.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("cannot split {input:?} into alphabet symbols (stuck at byte {position})")]
pub struct OutOfAlphabet {
    pub input: String,
    pub position: usize,
}

/// Fatal conditions discovered while walking the graph.
///
/// A lookup sequence yields at most one of these and then ends.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LookupError {
    #[error("state {state}: flag diacritic {flag} on the input side is paired with a different output label")]
    MismatchedFlagDiacritic { state: StateId, flag: String },
    #[error("path exceeded the maximum traversal depth of {limit} arcs")]
    DepthLimitExceeded { limit: usize },
}
