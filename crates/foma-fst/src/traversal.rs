// Explicit-stack depth-first search over the transducer graph.

use std::collections::BTreeSet;
use std::iter::FusedIterator;

use hashbrown::HashMap;

use crate::config::{Frame, TraversalConfig, TraversalLimits};
use crate::symbols::{EPSILON, SymbolId, SymbolTable};
use crate::transition::{StateId, Transition};
use crate::LookupError;

/// Arcs grouped by source state, plus the accepting set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Graph {
    /// Sorted by source state so each state's arcs are contiguous.
    transitions: Vec<Transition>,
    arcs_by_state: HashMap<StateId, (usize, usize)>,
    accepting: BTreeSet<StateId>,
}

impl Graph {
    /// `transitions` must already be sorted by source state.
    pub fn new(transitions: Vec<Transition>, accepting: BTreeSet<StateId>) -> Self {
        let mut arcs_by_state: HashMap<StateId, (usize, usize)> = HashMap::new();
        for (i, t) in transitions.iter().enumerate() {
            arcs_by_state
                .entry(t.source)
                .and_modify(|range| range.1 = i + 1)
                .or_insert((i, i + 1));
        }
        Self {
            transitions,
            arcs_by_state,
            accepting,
        }
    }

    /// Outgoing arcs of `state`.
    #[inline]
    pub fn arcs(&self, state: StateId) -> &[Transition] {
        match self.arcs_by_state.get(&state) {
            Some(&(start, end)) => &self.transitions[start..end],
            None => &[],
        }
    }

    #[inline]
    pub fn is_accepting(&self, state: StateId) -> bool {
        self.accepting.contains(&state)
    }

    pub fn transitions(&self) -> &[Transition] {
        &self.transitions
    }

    pub fn accepting_states(&self) -> &BTreeSet<StateId> {
        &self.accepting
    }
}

/// The label tape a lookup consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tape {
    Upper,
    Lower,
}

impl Tape {
    /// `(input, output)` labels of `arc` when reading this tape.
    #[inline]
    fn labels(self, arc: &Transition) -> (SymbolId, SymbolId) {
        match self {
            Tape::Upper => (arc.upper, arc.lower),
            Tape::Lower => (arc.lower, arc.upper),
        }
    }
}

/// Lazily enumerates the output-tape symbol sequences of every accepting
/// path that consumes exactly `input`.
///
/// Epsilon and flag diacritic labels never appear in the yielded sequences.
/// After yielding an error the iterator is exhausted.
pub struct Traversal<'a> {
    graph: &'a Graph,
    symbols: &'a SymbolTable,
    input: Vec<SymbolId>,
    input_tape: Tape,
    limits: TraversalLimits,
    config: TraversalConfig,
    done: bool,
}

impl<'a> Traversal<'a> {
    pub fn new(
        graph: &'a Graph,
        symbols: &'a SymbolTable,
        initial: Option<StateId>,
        input: Vec<SymbolId>,
        input_tape: Tape,
        limits: TraversalLimits,
    ) -> Self {
        let mut config = TraversalConfig::new(symbols.flag_feature_count());
        config.reset(initial);
        Self {
            graph,
            symbols,
            input,
            input_tape,
            limits,
            config,
            done: false,
        }
    }

    /// A traversal that yields nothing.
    pub fn empty(graph: &'a Graph, symbols: &'a SymbolTable) -> Self {
        Self::new(
            graph,
            symbols,
            None,
            Vec::new(),
            Tape::Lower,
            TraversalLimits::default(),
        )
    }

    fn fail(&mut self, error: LookupError) -> Option<Result<Vec<SymbolId>, LookupError>> {
        self.done = true;
        self.config.frames.clear();
        Some(Err(error))
    }
}

impl Iterator for Traversal<'_> {
    type Item = Result<Vec<SymbolId>, LookupError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let graph = self.graph;
        let symbols = self.symbols;

        loop {
            let Some(frame) = self.config.frames.last_mut() else {
                self.done = true;
                return None;
            };
            let state = frame.state;
            let input_depth = frame.input_depth;
            let output_len = frame.output_len;
            let flag_depth = frame.flag_depth;

            if !frame.visited {
                frame.visited = true;
                if input_depth == self.input.len() && graph.is_accepting(state) {
                    self.config.output.truncate(output_len);
                    return Some(Ok(self.config.output.clone()));
                }
            }

            let arcs = graph.arcs(state);
            let Some(arc) = arcs.get(frame.next_transition) else {
                self.config.frames.pop();
                continue;
            };
            frame.next_transition += 1;

            // Undo whatever the previous sibling arc left behind.
            self.config.output.truncate(output_len);
            self.config.flag_depth = flag_depth;

            let (in_label, out_label) = self.input_tape.labels(arc);
            let next_input_depth = if in_label == EPSILON {
                input_depth
            } else if self.input.get(input_depth) == Some(&in_label) {
                input_depth + 1
            } else if let Some(flag) = symbols.flag(in_label) {
                if out_label != in_label {
                    tracing::warn!(
                        state,
                        arc = %arc.display(symbols),
                        "flag diacritic paired with a different label"
                    );
                    return self.fail(LookupError::MismatchedFlagDiacritic {
                        state,
                        flag: flag.to_string(),
                    });
                }
                if !flag.test(self.config.current_flags()) {
                    continue;
                }
                self.config.push_flags();
                flag.apply(self.config.current_flags_mut());
                input_depth
            } else {
                continue;
            };

            if out_label != EPSILON && symbols.flag(out_label).is_none() {
                self.config.output.push(out_label);
            }

            // Frames below the new one are the path's arcs; consuming ones are bounded by the input.
            let idle_arcs = self.config.frames.len().saturating_sub(next_input_depth);
            if idle_arcs > self.limits.max_depth {
                tracing::warn!(limit = self.limits.max_depth, "traversal depth limit exceeded");
                return self.fail(LookupError::DepthLimitExceeded {
                    limit: self.limits.max_depth,
                });
            }

            self.config.frames.push(Frame {
                state: arc.target,
                next_transition: 0,
                input_depth: next_input_depth,
                output_len: self.config.output.len(),
                flag_depth: self.config.flag_depth,
                visited: false,
            });
        }
    }
}

impl FusedIterator for Traversal<'_> {}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolTableBuilder;

    fn arc(source: StateId, upper: SymbolId, lower: SymbolId, target: StateId) -> Transition {
        Transition {
            source,
            upper,
            lower,
            target,
        }
    }

    fn symbols() -> SymbolTable {
        let mut builder = SymbolTableBuilder::new();
        for (i, (code, text)) in [(3, "a"), (4, "b"), (5, "+X"), (6, "@P.f.on@"), (7, "@R.f.on@")]
            .into_iter()
            .enumerate()
        {
            builder.define(i + 1, code, text).unwrap();
        }
        builder.finish()
    }

    fn graph(mut arcs: Vec<Transition>, accepting: &[StateId]) -> Graph {
        arcs.sort_unstable();
        Graph::new(arcs, accepting.iter().copied().collect())
    }

    fn run(graph: &Graph, symbols: &SymbolTable, input: &[SymbolId], tape: Tape) -> Vec<Vec<SymbolId>> {
        let mut out: Vec<Vec<SymbolId>> = Traversal::new(
            graph,
            symbols,
            Some(0),
            input.to_vec(),
            tape,
            TraversalLimits::default(),
        )
        .collect::<Result<_, _>>()
        .unwrap();
        out.sort();
        out
    }

    #[test]
    fn graph_groups_arcs_by_state() {
        let g = graph(vec![arc(1, 4, 4, 2), arc(0, 3, 3, 1), arc(0, 4, 4, 2)], &[2]);
        assert_eq!(g.arcs(0).len(), 2);
        assert_eq!(g.arcs(1), &[arc(1, 4, 4, 2)]);
        assert!(g.arcs(2).is_empty());
        assert!(g.arcs(99).is_empty());
        assert!(g.is_accepting(2));
        assert!(!g.is_accepting(0));
    }

    #[test]
    fn consume_lower_emit_upper() {
        let s = symbols();
        // a:a then epsilon:+X
        let g = graph(vec![arc(0, 3, 3, 1), arc(1, 5, EPSILON, 2)], &[2]);
        assert_eq!(run(&g, &s, &[3], Tape::Lower), vec![vec![3, 5]]);
        assert_eq!(run(&g, &s, &[3, 5], Tape::Upper), vec![vec![3]]);
        assert!(run(&g, &s, &[4], Tape::Lower).is_empty());
    }

    #[test]
    fn leftover_input_is_not_accepted() {
        let s = symbols();
        let g = graph(vec![arc(0, 3, 3, 1)], &[1]);
        assert!(run(&g, &s, &[3, 3], Tape::Lower).is_empty());
        assert!(run(&g, &s, &[], Tape::Lower).is_empty());
    }

    #[test]
    fn accepting_state_with_outgoing_arcs() {
        let s = symbols();
        // 0 accepts "", "a", "aa", ... through a loop.
        let g = graph(vec![arc(0, 3, 3, 0)], &[0]);
        assert_eq!(run(&g, &s, &[], Tape::Lower), vec![Vec::<SymbolId>::new()]);
        assert_eq!(run(&g, &s, &[3, 3, 3], Tape::Lower), vec![vec![3, 3, 3]]);
    }

    #[test]
    fn every_path_is_reported() {
        let s = symbols();
        let g = graph(
            vec![arc(0, 3, 3, 1), arc(0, 4, 3, 1), arc(1, 5, EPSILON, 2), arc(1, EPSILON, EPSILON, 2)],
            &[2],
        );
        assert_eq!(
            run(&g, &s, &[3], Tape::Lower),
            vec![vec![3], vec![3, 5], vec![4], vec![4, 5]]
        );
    }

    #[test]
    fn flags_gate_paths_and_stay_invisible() {
        let s = symbols();
        // 0 -@P.f.on@-> 1 -a-> 3   and   0 -a-> 2 -@R.f.on@-> 3
        let g = graph(
            vec![arc(0, 6, 6, 1), arc(1, 3, 3, 3), arc(0, 3, 3, 2), arc(2, 7, 7, 3)],
            &[3],
        );
        assert_eq!(run(&g, &s, &[3], Tape::Lower), vec![vec![3]]);
    }

    #[test]
    fn flag_environment_is_per_path() {
        let s = symbols();
        // 0 -@P.f.on@-> 1 -b-> 0, then 0 -a-> 2 -@R.f.on@-> 3.
        // "a" alone must fail; "ba" passes because P set the feature first.
        let g = graph(
            vec![arc(0, 6, 6, 1), arc(1, 4, 4, 0), arc(0, 3, 3, 2), arc(2, 7, 7, 3)],
            &[3],
        );
        assert_eq!(run(&g, &s, &[4, 3], Tape::Lower), vec![vec![4, 3]]);

        let g = graph(vec![arc(0, 4, 4, 0), arc(0, 3, 3, 2), arc(2, 7, 7, 3)], &[3]);
        assert!(run(&g, &s, &[4, 3], Tape::Lower).is_empty());
    }

    #[test]
    fn output_side_flag_is_suppressed() {
        let s = symbols();
        let g = graph(vec![arc(0, 6, 3, 1)], &[1]);
        assert_eq!(run(&g, &s, &[3], Tape::Lower), vec![Vec::<SymbolId>::new()]);
    }

    #[test]
    fn mismatched_flag_is_an_error_and_ends_the_lookup() {
        let s = symbols();
        let g = graph(vec![arc(0, 6, 3, 1)], &[1]);
        let mut lookup = Traversal::new(&g, &s, Some(0), vec![], Tape::Upper, TraversalLimits::default());
        assert!(matches!(
            lookup.next(),
            Some(Err(LookupError::MismatchedFlagDiacritic { state: 0, .. }))
        ));
        assert!(lookup.next().is_none());
        assert!(lookup.next().is_none());
    }

    #[test]
    fn epsilon_cycle_hits_the_depth_limit() {
        let s = symbols();
        let g = graph(vec![arc(0, 3, EPSILON, 0)], &[1]);
        let limits = TraversalLimits { max_depth: 50 };
        let mut lookup = Traversal::new(&g, &s, Some(0), vec![], Tape::Lower, limits);
        assert_eq!(
            lookup.next(),
            Some(Err(LookupError::DepthLimitExceeded { limit: 50 }))
        );
        assert!(lookup.next().is_none());
    }

    #[test]
    fn path_at_the_depth_limit_is_allowed() {
        let s = symbols();
        let g = graph(vec![arc(0, 3, 3, 1), arc(1, 3, 3, 2)], &[2]);
        let limits = TraversalLimits { max_depth: 2 };
        let found: Vec<_> = Traversal::new(&g, &s, Some(0), vec![3, 3], Tape::Lower, limits).collect();
        assert_eq!(found, vec![Ok(vec![3, 3])]);
    }

    #[test]
    fn long_input_is_not_bounded_by_the_depth_limit() {
        let s = symbols();
        let g = graph(vec![arc(0, 3, 3, 0)], &[0]);
        let input = vec![3; 2500];
        let found: Vec<_> = Traversal::new(
            &g,
            &s,
            Some(0),
            input.clone(),
            Tape::Lower,
            TraversalLimits::default(),
        )
        .collect();
        assert_eq!(found, vec![Ok(input)]);
    }

    #[test]
    fn depth_limit_counts_arcs_without_input() {
        let s = symbols();
        // a, epsilon, a, epsilon: two idle arcs.
        let g = graph(
            vec![arc(0, 3, 3, 1), arc(1, 5, EPSILON, 2), arc(2, 3, 3, 3), arc(3, 5, EPSILON, 4)],
            &[4],
        );
        let run_with = |max_depth| {
            Traversal::new(&g, &s, Some(0), vec![3, 3], Tape::Lower, TraversalLimits { max_depth })
                .collect::<Vec<_>>()
        };
        assert_eq!(run_with(2), vec![Ok(vec![3, 5, 3, 5])]);
        assert_eq!(run_with(1), vec![Err(LookupError::DepthLimitExceeded { limit: 1 })]);
    }

    #[test]
    fn empty_traversal() {
        let s = symbols();
        let g = graph(vec![arc(0, 3, 3, 1)], &[1]);
        assert_eq!(Traversal::empty(&g, &s).count(), 0);
        assert_eq!(
            Traversal::new(&g, &s, None, vec![], Tape::Lower, TraversalLimits::default()).count(),
            0
        );
    }
}
