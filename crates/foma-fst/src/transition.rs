// Arc records and the `##states##` line grammar.

use crate::ParseError;
use crate::symbols::{SymbolId, SymbolTable};
use std::fmt;

/// A state number as written in the serialized net.
pub type StateId = u32;

/// One arc of the graph.
///
/// `upper` and `lower` are the two label tapes. Which of them is consumed
/// and which is emitted depends on the lookup direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Transition {
    pub source: StateId,
    pub upper: SymbolId,
    pub lower: SymbolId,
    pub target: StateId,
}

impl Transition {
    /// The same arc with its label tapes exchanged.
    #[inline]
    pub fn inverted(self) -> Self {
        Self {
            upper: self.lower,
            lower: self.upper,
            ..self
        }
    }

    /// Render as `0 ─a→ 1`, or `0 ─a:b→ 1` when the labels differ.
    pub fn display<'a>(&'a self, symbols: &'a SymbolTable) -> TransitionDisplay<'a> {
        TransitionDisplay {
            transition: self,
            symbols,
        }
    }
}

pub struct TransitionDisplay<'a> {
    transition: &'a Transition,
    symbols: &'a SymbolTable,
}

impl fmt::Display for TransitionDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let t = self.transition;
        let label = |id: SymbolId| match self.symbols.get(id) {
            Some(symbol) => symbol.to_string(),
            None => format!("#{id}"),
        };
        if t.upper == t.lower {
            write!(f, "{} ─{}→ {}", t.source, label(t.upper), t.target)
        } else {
            write!(
                f,
                "{} ─{}:{}→ {}",
                t.source,
                label(t.upper),
                label(t.lower),
                t.target
            )
        }
    }
}

/// One decoded line of the `##states##` section.
///
/// Raw integers are kept signed: `-1` marks "no arc" on explicit lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateLine {
    /// `-1 -1 -1 -1 -1`: no more arcs.
    Sentinel,
    /// Four or five fields: the source state is spelled out and the last
    /// field is the source's final flag.
    Explicit {
        source: i64,
        upper: i64,
        lower: i64,
        target: i64,
        is_final: bool,
    },
    /// Two or three fields: the source is the most recent explicit state.
    Implied { upper: i64, lower: i64, target: i64 },
}

impl StateLine {
    /// Decode a states line.
    ///
    /// | fields | layout                        |
    /// |--------|-------------------------------|
    /// | 5      | source upper lower target final |
    /// | 4      | source label target final     |
    /// | 3      | upper lower target            |
    /// | 2      | label target                  |
    pub fn parse(line_no: usize, line: &str) -> Result<Self, ParseError> {
        let count = line.split_whitespace().count();
        if !(2..=5).contains(&count) {
            return Err(ParseError::InvalidFieldCount {
                line: line_no,
                count,
            });
        }

        let mut v = [0i64; 5];
        for (slot, token) in v.iter_mut().zip(line.split_whitespace()) {
            *slot = token.parse().map_err(|_| ParseError::InvalidInteger {
                line: line_no,
                token: token.to_string(),
            })?;
        }

        Ok(match count {
            5 if v == [-1; 5] => StateLine::Sentinel,
            5 => StateLine::Explicit {
                source: v[0],
                upper: v[1],
                lower: v[2],
                target: v[3],
                is_final: v[4] != 0,
            },
            4 => StateLine::Explicit {
                source: v[0],
                upper: v[1],
                lower: v[1],
                target: v[2],
                is_final: v[3] != 0,
            },
            3 => StateLine::Implied {
                upper: v[0],
                lower: v[1],
                target: v[2],
            },
            _ => StateLine::Implied {
                upper: v[0],
                lower: v[0],
                target: v[1],
            },
        })
    }
}
