// The assembled transducer: loading, lookup in both directions, formatting.

use std::collections::BTreeSet;
use std::fs;
use std::io::{self, Read};
use std::iter::FusedIterator;
use std::path::Path;

use flate2::read::GzDecoder;

use crate::config::TraversalLimits;
use crate::format::{NetProperties, Orientation};
use crate::parse::{self, ParsedNet};
use crate::symbols::{Symbol, SymbolId, SymbolTable};
use crate::tokenizer::Tokenizer;
use crate::transition::{StateId, Transition};
use crate::traversal::{Graph, Tape, Traversal};
use crate::{FstError, LookupError, OutOfAlphabet};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// One analysis: the lemma and tags of an accepting path, in order.
pub type Analysis = Vec<String>;

/// A foma transducer loaded into memory.
///
/// Immutable after loading. Every lookup keeps its own stacks, so one `Fst`
/// can serve any number of threads at once.
pub struct Fst {
    symbols: SymbolTable,
    properties: NetProperties,
    orientation: Orientation,
    graph: Graph,
    states: BTreeSet<StateId>,
    initial_state: Option<StateId>,
    tokenizer: Tokenizer,
    limits: TraversalLimits,
}

impl std::fmt::Debug for Fst {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fst")
            .field("name", &self.properties.name)
            .field("orientation", &self.orientation)
            .field("state_count", &self.states.len())
            .field("transition_count", &self.graph.transitions().len())
            .field("symbol_count", &self.symbols.len())
            .field("limits", &self.limits)
            .finish()
    }
}

impl Fst {
    /// Load a transducer from foma text.
    pub fn from_text(text: &str, orientation: Orientation) -> Result<Self, FstError> {
        let parsed = parse::parse_text(text, orientation)?;
        Self::from_parsed(parsed)
    }

    /// Load a transducer written by foma's `save stack` (gzip'd text) or an
    /// uncompressed text dump.
    pub fn from_file(path: impl AsRef<Path>, orientation: Orientation) -> Result<Self, FstError> {
        let path = path.as_ref();
        let bytes = fs::read(path)?;
        let text = if bytes.starts_with(&GZIP_MAGIC) {
            let mut text = String::new();
            GzDecoder::new(bytes.as_slice()).read_to_string(&mut text)?;
            text
        } else {
            String::from_utf8(bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        };
        tracing::debug!(
            path = %path.display(),
            bytes = text.len(),
            orientation = %orientation,
            "read transducer text"
        );
        Self::from_text(&text, orientation)
    }

    /// Assemble the lookup structures from a parsed net.
    pub fn from_parsed(parsed: ParsedNet) -> Result<Self, FstError> {
        let states = parsed.states();
        let ParsedNet {
            properties,
            symbols,
            transitions,
            accepting_states,
            orientation,
            ..
        } = parsed;

        let tokenizer = Tokenizer::build(&symbols)?;
        let initial_state = states.first().copied();
        let graph = Graph::new(transitions, accepting_states);

        Ok(Self {
            symbols,
            properties,
            orientation,
            graph,
            states,
            initial_state,
            tokenizer,
            limits: TraversalLimits::default(),
        })
    }

    /// Replace the traversal limits used by later lookups.
    pub fn with_limits(mut self, limits: TraversalLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Every analysis of `surface_form`.
    ///
    /// Input outside the alphabet yields nothing.
    pub fn analyze(&self, surface_form: &str) -> Analyses<'_> {
        Analyses {
            traversal: self.lookup(surface_form, Tape::Lower),
            symbols: &self.symbols,
        }
    }

    /// Every surface form of `analysis`, e.g. `"eat+V+Past"`.
    ///
    /// Input outside the alphabet yields nothing.
    pub fn generate(&self, analysis: &str) -> Generations<'_> {
        Generations {
            traversal: self.lookup(analysis, Tape::Upper),
            symbols: &self.symbols,
        }
    }

    /// Analyze each input; one result group per input, in input order.
    pub fn analyze_in_bulk<I, S>(&self, surface_forms: I) -> Result<Vec<Vec<Analysis>>, LookupError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        surface_forms
            .into_iter()
            .map(|form| self.analyze(form.as_ref()).collect::<Result<Vec<_>, _>>())
            .collect()
    }

    /// Generate from each input; one result group per input, in input order.
    pub fn generate_in_bulk<I, S>(&self, analyses: I) -> Result<Vec<Vec<String>>, LookupError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        analyses
            .into_iter()
            .map(|analysis| self.generate(analysis.as_ref()).collect::<Result<Vec<_>, _>>())
            .collect()
    }

    /// Split `text` into alphabet symbols, longest match first.
    pub fn tokenize(&self, text: &str) -> Result<Vec<Symbol>, OutOfAlphabet> {
        let ids = self.tokenizer.tokenize_ids(&self.symbols, text)?;
        Ok(ids
            .into_iter()
            .filter_map(|id| self.symbols.get(id).cloned())
            .collect())
    }

    fn lookup(&self, text: &str, input_tape: Tape) -> Traversal<'_> {
        let input = match self.tokenizer.tokenize_ids(&self.symbols, text) {
            Ok(input) => input,
            Err(e) => {
                tracing::debug!(input = %e.input, position = e.position, "input is outside the alphabet");
                return Traversal::empty(&self.graph, &self.symbols);
            }
        };
        Traversal::new(
            &self.graph,
            &self.symbols,
            self.initial_state,
            input,
            input_tape,
            self.limits,
        )
    }

    /// The lowest-numbered state, or `None` for a net with no states.
    pub fn initial_state(&self) -> Option<StateId> {
        self.initial_state
    }

    pub fn accepting_states(&self) -> &BTreeSet<StateId> {
        self.graph.accepting_states()
    }

    pub fn states(&self) -> &BTreeSet<StateId> {
        &self.states
    }

    /// All arcs, sorted by source state.
    pub fn transitions(&self) -> &[Transition] {
        self.graph.transitions()
    }

    /// Outgoing arcs of `state`.
    pub fn arcs_from(&self, state: StateId) -> &[Transition] {
        self.graph.arcs(state)
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn sigma(&self) -> Vec<(SymbolId, &Symbol)> {
        self.symbols.sigma()
    }

    pub fn graphemes(&self) -> Vec<(SymbolId, &Symbol)> {
        self.symbols.graphemes()
    }

    pub fn multichar_symbols(&self) -> Vec<(SymbolId, &Symbol)> {
        self.symbols.multichar_symbols()
    }

    pub fn flag_diacritics(&self) -> Vec<(SymbolId, &Symbol)> {
        self.symbols.flag_diacritics()
    }

    pub fn properties(&self) -> &NetProperties {
        &self.properties
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn limits(&self) -> TraversalLimits {
        self.limits
    }
}

/// Group an output-tape sequence into an analysis.
///
/// Runs of graphemes join into one string; every multichar symbol stands
/// alone. Epsilon, sentinels and flags contribute nothing.
pub fn format_analysis(symbols: &SymbolTable, raw: &[SymbolId]) -> Analysis {
    let mut analysis = Vec::new();
    let mut run = String::new();
    for &id in raw {
        match symbols.get(id) {
            Some(Symbol::Grapheme(ch)) => run.push(*ch),
            Some(Symbol::MultiCharacter(tag)) => {
                if !run.is_empty() {
                    analysis.push(std::mem::take(&mut run));
                }
                analysis.push(tag.to_string());
            }
            _ => {}
        }
    }
    if !run.is_empty() {
        analysis.push(run);
    }
    analysis
}

/// Concatenate an output-tape sequence into a surface form.
pub fn format_generation(symbols: &SymbolTable, raw: &[SymbolId]) -> String {
    let mut form = String::new();
    for &id in raw {
        match symbols.get(id) {
            Some(Symbol::Grapheme(ch)) => form.push(*ch),
            Some(Symbol::MultiCharacter(tag)) => form.push_str(tag),
            _ => {}
        }
    }
    form
}

/// Lazy sequence of analyses returned by [`Fst::analyze`].
pub struct Analyses<'a> {
    traversal: Traversal<'a>,
    symbols: &'a SymbolTable,
}

impl Iterator for Analyses<'_> {
    type Item = Result<Analysis, LookupError>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.traversal.next()?;
        Some(raw.map(|raw| format_analysis(self.symbols, &raw)))
    }
}

impl FusedIterator for Analyses<'_> {}

/// Lazy sequence of surface forms returned by [`Fst::generate`].
pub struct Generations<'a> {
    traversal: Traversal<'a>,
    symbols: &'a SymbolTable,
}

impl Iterator for Generations<'_> {
    type Item = Result<String, LookupError>;

    fn next(&mut self) -> Option<Self::Item> {
        let raw = self.traversal.next()?;
        Some(raw.map(|raw| format_generation(self.symbols, &raw)))
    }
}

impl FusedIterator for Generations<'_> {}
