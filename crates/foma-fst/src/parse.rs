// Sectioned parser for foma's text serialization.
//
// Reads `##foma-net 1.0##`, `##props##`, `##sigma##`, `##states##` and
// `##end##` in that order and produces a `ParsedNet`. The source state
// implied by 2- and 3-field arc lines is threaded through as local state of
// the states section.

use std::collections::BTreeSet;

use hashbrown::HashSet;

use crate::ParseError;
use crate::format::{NetProperties, Orientation, Section, parse_section_header};
use crate::symbols::{SymbolTable, SymbolTableBuilder};
use crate::transition::{StateId, StateLine, Transition};

/// Everything read from one serialized net.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedNet {
    pub properties: NetProperties,
    pub symbols: SymbolTable,
    /// Distinct arcs sorted by source state, then labels and target.
    /// Labels are already swapped when the net was read inverted.
    pub transitions: Vec<Transition>,
    /// Every state mentioned in the net that is not accepting.
    pub intermediate_states: BTreeSet<StateId>,
    pub accepting_states: BTreeSet<StateId>,
    pub orientation: Orientation,
}

impl ParsedNet {
    /// All states: intermediate and accepting.
    pub fn states(&self) -> BTreeSet<StateId> {
        self.intermediate_states
            .union(&self.accepting_states)
            .copied()
            .collect()
    }
}

/// Parse foma text into a [`ParsedNet`].
///
/// Exactly one net is accepted; anything but blank lines after `##end##` is
/// an error, as is reaching the end of input before `##end##`.
pub fn parse_text(text: &str, orientation: Orientation) -> Result<ParsedNet, ParseError> {
    let mut section: Option<Section> = None;
    let mut properties: Option<NetProperties> = None;
    let mut symbols = SymbolTableBuilder::new();
    let mut graph = GraphBuilder::new(orientation);

    for (idx, line) in text.lines().enumerate() {
        let line_no = idx + 1;

        if let Some(found) = parse_section_header(line_no, line)? {
            let expected = match section {
                None => Section::Net,
                Some(current) => match current.next() {
                    Some(next) => next,
                    None if found == Section::Net => {
                        return Err(ParseError::MultipleTransducers { line: line_no });
                    }
                    None => return Err(ParseError::ContentAfterEnd { line: line_no }),
                },
            };
            if found != expected {
                let repeated_header =
                    found == Section::Net || (found == Section::Props && section > Some(Section::Props));
                return Err(if repeated_header {
                    ParseError::MultipleTransducers { line: line_no }
                } else {
                    ParseError::UnexpectedSection {
                        line: line_no,
                        expected: expected.name(),
                        found: found.name().to_string(),
                    }
                });
            }
            if found == Section::Sigma && properties.is_none() {
                return Err(ParseError::PropsLineCount { line: line_no });
            }
            section = Some(found);
            continue;
        }

        if line.trim().is_empty() {
            continue;
        }

        match section {
            None => return Err(ParseError::ContentBeforeHeader { line: line_no }),
            Some(Section::Net) => {
                return Err(ParseError::UnexpectedContent {
                    line: line_no,
                    section: Section::Net.name(),
                });
            }
            Some(Section::Props) => {
                if properties.is_some() {
                    return Err(ParseError::PropsLineCount { line: line_no });
                }
                properties = Some(NetProperties::parse(line_no, line)?);
            }
            Some(Section::Sigma) => {
                let (code, text) = split_sigma_line(line_no, line)?;
                symbols.define(line_no, code, text)?;
            }
            Some(Section::States) => {
                let state_line = StateLine::parse(line_no, line)?;
                graph.add_line(line_no, state_line, &symbols)?;
            }
            Some(Section::End) => return Err(ParseError::ContentAfterEnd { line: line_no }),
        }
    }

    match section {
        Some(Section::End) => {}
        Some(open) => return Err(ParseError::Truncated { section: open.name() }),
        None => {
            return Err(ParseError::Truncated {
                section: Section::Net.name(),
            });
        }
    }

    // `properties` is always set once `##sigma##` was accepted.
    let properties = properties.unwrap_or_default();
    let net = graph.finish(properties, symbols.finish());

    tracing::debug!(
        states = net.intermediate_states.len() + net.accepting_states.len(),
        accepting = net.accepting_states.len(),
        arcs = net.transitions.len(),
        symbols = net.symbols.len(),
        "parsed foma net"
    );
    if net.properties.arc_count != net.transitions.len() as i64 {
        tracing::debug!(
            declared = net.properties.arc_count,
            parsed = net.transitions.len(),
            "props arc count differs from parsed arcs"
        );
    }

    Ok(net)
}

/// Split `<code><whitespace><text>`.
///
/// Foma writes exactly one separator, so a symbol that is itself
/// whitespace survives as the remainder after that separator.
fn split_sigma_line(line_no: usize, line: &str) -> Result<(i64, &str), ParseError> {
    let (code_str, rest) = match line.find(char::is_whitespace) {
        Some(pos) => line.split_at(pos),
        None => (line, ""),
    };
    let code: i64 = code_str.parse().map_err(|_| ParseError::InvalidInteger {
        line: line_no,
        token: code_str.to_string(),
    })?;

    let mut rest_chars = rest.chars();
    rest_chars.next();
    let after_separator = rest_chars.as_str();
    let text = if !after_separator.is_empty() && after_separator.trim().is_empty() {
        after_separator
    } else {
        after_separator.trim_start()
    };
    Ok((code, text))
}

/// Collects arcs and state sets while the states section is read.
struct GraphBuilder {
    orientation: Orientation,
    transitions: HashSet<Transition>,
    states: BTreeSet<StateId>,
    accepting: BTreeSet<StateId>,
    implied_state: Option<StateId>,
}

impl GraphBuilder {
    fn new(orientation: Orientation) -> Self {
        Self {
            orientation,
            transitions: HashSet::new(),
            states: BTreeSet::new(),
            accepting: BTreeSet::new(),
            implied_state: None,
        }
    }

    fn add_line(
        &mut self,
        line_no: usize,
        line: StateLine,
        symbols: &SymbolTableBuilder,
    ) -> Result<(), ParseError> {
        let (source, upper, lower, target) = match line {
            StateLine::Sentinel => return Ok(()),
            StateLine::Explicit {
                source,
                upper,
                lower,
                target,
                is_final,
            } => {
                let source = state_id(line_no, source)?;
                self.states.insert(source);
                if is_final {
                    self.accepting.insert(source);
                }
                if upper < 0 || lower < 0 || target < 0 {
                    // A state without outgoing arcs.
                    return Ok(());
                }
                (source, upper, lower, target)
            }
            StateLine::Implied {
                upper,
                lower,
                target,
            } => {
                let source = self
                    .implied_state
                    .ok_or(ParseError::NoImpliedState { line: line_no })?;
                (source, upper, lower, target)
            }
        };

        let target = state_id(line_no, target)?;
        let transition = Transition {
            source,
            upper: symbols.resolve(line_no, upper)?,
            lower: symbols.resolve(line_no, lower)?,
            target,
        };
        let transition = match self.orientation {
            Orientation::Normal => transition,
            Orientation::Invert => transition.inverted(),
        };

        self.states.insert(target);
        self.transitions.insert(transition);
        self.implied_state = Some(source);
        Ok(())
    }

    fn finish(self, properties: NetProperties, symbols: SymbolTable) -> ParsedNet {
        let mut transitions: Vec<Transition> = self.transitions.into_iter().collect();
        transitions.sort_unstable();
        let intermediate_states = self
            .states
            .difference(&self.accepting)
            .copied()
            .collect();
        ParsedNet {
            properties,
            symbols,
            transitions,
            intermediate_states,
            accepting_states: self.accepting,
            orientation: self.orientation,
        }
    }
}

fn state_id(line_no: usize, raw: i64) -> Result<StateId, ParseError> {
    StateId::try_from(raw).map_err(|_| ParseError::NegativeState {
        line: line_no,
        state: raw,
    })
}
