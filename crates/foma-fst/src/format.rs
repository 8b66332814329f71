// Foma text format: section headers, the props line, label orientation.

use crate::{FstError, ParseError};
use std::fmt;
use std::str::FromStr;

/// Header text of the only supported net version.
pub const NET_HEADER: &str = "foma-net 1.0";

/// The sections of a serialized net, in the order they must appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Section {
    Net,
    Props,
    Sigma,
    States,
    End,
}

impl Section {
    pub fn name(self) -> &'static str {
        match self {
            Section::Net => NET_HEADER,
            Section::Props => "props",
            Section::Sigma => "sigma",
            Section::States => "states",
            Section::End => "end",
        }
    }

    /// The section that must follow this one.
    pub fn next(self) -> Option<Section> {
        match self {
            Section::Net => Some(Section::Props),
            Section::Props => Some(Section::Sigma),
            Section::Sigma => Some(Section::States),
            Section::States => Some(Section::End),
            Section::End => None,
        }
    }
}

/// Recognize a `##name##` line.
///
/// Returns `None` for content lines. Any `foma-net` header parses as
/// [`Section::Net`] only when its version is supported.
pub fn parse_section_header(line_no: usize, line: &str) -> Result<Option<Section>, ParseError> {
    let Some(name) = line
        .strip_prefix("##")
        .and_then(|rest| rest.strip_suffix("##"))
    else {
        return Ok(None);
    };

    let section = match name {
        NET_HEADER => Section::Net,
        "props" => Section::Props,
        "sigma" => Section::Sigma,
        "states" => Section::States,
        "end" => Section::End,
        other if other.starts_with("foma-net") => {
            return Err(ParseError::UnsupportedVersion {
                line: line_no,
                found: other.to_string(),
            });
        }
        // Not a header we know: treat as content so the section decides.
        _ => return Ok(None),
    };
    Ok(Some(section))
}

/// Net-level properties from the `##props##` line.
///
/// Foma writes: arity, arc count, state count, line count, final count,
/// path count, five tri-state booleans (0 = no, 1 = yes, anything else =
/// unknown), an extras field and an optional name. The values are
/// informational; traversal never consults them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetProperties {
    pub arity: i64,
    pub arc_count: i64,
    pub state_count: i64,
    pub line_count: i64,
    pub final_count: i64,
    /// -1 when the net is cyclic.
    pub path_count: i64,
    pub is_deterministic: Option<bool>,
    pub is_pruned: Option<bool>,
    pub is_minimized: Option<bool>,
    pub is_epsilon_free: Option<bool>,
    pub is_loop_free: Option<bool>,
    pub extras: i64,
    pub name: Option<String>,
}

/// Number of integer fields preceding the optional name.
const PROPS_INT_FIELDS: usize = 12;

impl NetProperties {
    pub fn parse(line_no: usize, line: &str) -> Result<Self, ParseError> {
        let mut fields = line.split_whitespace();
        let mut ints = [0i64; PROPS_INT_FIELDS];
        for (i, slot) in ints.iter_mut().enumerate() {
            let token = fields.next().ok_or_else(|| ParseError::MalformedProps {
                line: line_no,
                reason: format!("expected {PROPS_INT_FIELDS} numeric fields, found {i}"),
            })?;
            *slot = token.parse().map_err(|_| ParseError::InvalidInteger {
                line: line_no,
                token: token.to_string(),
            })?;
        }

        let name: Vec<&str> = fields.collect();
        let tri_state = |v: i64| match v {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        };

        Ok(Self {
            arity: ints[0],
            arc_count: ints[1],
            state_count: ints[2],
            line_count: ints[3],
            final_count: ints[4],
            path_count: ints[5],
            is_deterministic: tri_state(ints[6]),
            is_pruned: tri_state(ints[7]),
            is_minimized: tri_state(ints[8]),
            is_epsilon_free: tri_state(ints[9]),
            is_loop_free: tri_state(ints[10]),
            extras: ints[11],
            name: (!name.is_empty()).then(|| name.join(" ")),
        })
    }
}

/// Which label tape holds the surface form.
///
/// Foma's convention is that the lower tape is the surface side. Some
/// transducers are compiled the other way round; loading them with
/// [`Orientation::Invert`] swaps upper and lower on every arc.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Orientation {
    #[default]
    Normal,
    Invert,
}

impl Orientation {
    pub const CHOICES: [&'static str; 2] = ["normal", "invert"];

    pub fn as_str(self) -> &'static str {
        match self {
            Orientation::Normal => "normal",
            Orientation::Invert => "invert",
        }
    }
}

impl fmt::Display for Orientation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Orientation {
    type Err = FstError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "normal" => Ok(Orientation::Normal),
            "invert" => Ok(Orientation::Invert),
            _ => Err(FstError::InvalidOrientation {
                given: s.to_string(),
            }),
        }
    }
}
