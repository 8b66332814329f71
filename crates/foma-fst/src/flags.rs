// Flag diacritic operations: P, U, R, D, C
//
// Features and values are interned to small integers while the sigma
// section is read, so a traversal's feature environment is a plain
// `[u16]` row indexed by feature, with 0 meaning "unset".

use hashbrown::HashMap;
use std::fmt;

/// The flag diacritic operations understood by the engine.
///
/// `R` and `D` come in two arities; each arity is its own operation.
/// Foma's `N` (negative set) and `E` (equality) are not supported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlagOp {
    /// `@P.feat.val@`: unconditionally set feature to value.
    Positive,
    /// `@U.feat.val@`: set if unset, pass if equal, fail otherwise.
    Unify,
    /// `@R.feat@`: pass iff the feature has any value.
    RequireFeature,
    /// `@R.feat.val@`: pass iff the feature equals the value.
    RequireValue,
    /// `@D.feat@`: pass iff the feature is unset.
    DisallowFeature,
    /// `@D.feat.val@`: pass unless the feature equals the value.
    DisallowValue,
    /// `@C.feat@`: unset the feature.
    Clear,
}

impl FlagOp {
    /// The single-letter opcode used in the surface syntax.
    pub fn opcode(self) -> char {
        match self {
            FlagOp::Positive => 'P',
            FlagOp::Unify => 'U',
            FlagOp::RequireFeature | FlagOp::RequireValue => 'R',
            FlagOp::DisallowFeature | FlagOp::DisallowValue => 'D',
            FlagOp::Clear => 'C',
        }
    }
}

/// Neutral value: feature has not been set.
pub const FLAG_VALUE_NEUTRAL: u16 = 0;

/// A parsed flag diacritic with its interned feature and value indices.
///
/// `value` is [`FLAG_VALUE_NEUTRAL`] for the feature-only operations.
/// The surface text is kept for display.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FlagDiacritic {
    pub op: FlagOp,
    pub feature: u16,
    pub value: u16,
    text: Box<str>,
}

impl FlagDiacritic {
    /// The surface form, e.g. `@P.UN.ON@`.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether an arc carrying this flag may be taken in `env`.
    pub fn test(&self, env: &[u16]) -> bool {
        let current = env
            .get(self.feature as usize)
            .copied()
            .unwrap_or(FLAG_VALUE_NEUTRAL);
        match self.op {
            FlagOp::Positive | FlagOp::Clear => true,
            FlagOp::Unify => current == FLAG_VALUE_NEUTRAL || current == self.value,
            FlagOp::RequireFeature => current != FLAG_VALUE_NEUTRAL,
            FlagOp::RequireValue => current == self.value,
            FlagOp::DisallowFeature => current == FLAG_VALUE_NEUTRAL,
            FlagOp::DisallowValue => current != self.value,
        }
    }

    /// Update `env` after taking the arc. Only meaningful when
    /// [`test`](Self::test) passed.
    pub fn apply(&self, env: &mut [u16]) {
        let Some(slot) = env.get_mut(self.feature as usize) else {
            return;
        };
        match self.op {
            FlagOp::Positive | FlagOp::Unify => *slot = self.value,
            FlagOp::Clear => *slot = FLAG_VALUE_NEUTRAL,
            FlagOp::RequireFeature
            | FlagOp::RequireValue
            | FlagOp::DisallowFeature
            | FlagOp::DisallowValue => {}
        }
    }
}

impl fmt::Display for FlagDiacritic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Why a `@...@` symbol could not be read as a flag diacritic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlagSyntaxError {
    /// Not of the shape `@X.something@`.
    NotAFlag,
    /// Shaped like a flag, but the opcode is not one of P, U, R, D, C.
    UnsupportedOperation,
    /// Known opcode with the wrong number of arguments or an empty one.
    Malformed,
    /// A new feature or value name would not fit the `u16` numbering.
    TooManyNames,
}

/// Interns feature and value names across all flags of one symbol table.
pub struct FlagDiacriticParser {
    features: HashMap<String, u16>,
    values: HashMap<String, u16>,
}

impl Default for FlagDiacriticParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Index of `name`, numbering new names from `first` up to `last`.
fn intern(
    names: &mut HashMap<String, u16>,
    name: &str,
    first: u16,
    last: u16,
) -> Result<u16, FlagSyntaxError> {
    if let Some(&idx) = names.get(name) {
        return Ok(idx);
    }
    let idx = u16::try_from(names.len())
        .ok()
        .and_then(|n| n.checked_add(first))
        .filter(|&idx| idx <= last)
        .ok_or(FlagSyntaxError::TooManyNames)?;
    names.insert(name.to_string(), idx);
    Ok(idx)
}

impl FlagDiacriticParser {
    pub fn new() -> Self {
        Self {
            features: HashMap::new(),
            values: HashMap::new(),
        }
    }

    /// Return the number of distinct features seen so far.
    pub fn feature_count(&self) -> u16 {
        u16::try_from(self.features.len()).unwrap_or(u16::MAX)
    }

    /// Parse a flag diacritic symbol string like `@P.FEATURE.VALUE@` or `@C.FEATURE@`.
    ///
    /// Features are numbered from 0 and values from 1 in order of first
    /// appearance, so that 0 stays free for "unset".
    pub fn parse(&mut self, symbol: &str) -> Result<FlagDiacritic, FlagSyntaxError> {
        let inner = symbol
            .strip_prefix('@')
            .and_then(|s| s.strip_suffix('@'))
            .ok_or(FlagSyntaxError::NotAFlag)?;

        let mut chars = inner.chars();
        let (Some(opcode), Some('.')) = (chars.next(), chars.next()) else {
            return Err(FlagSyntaxError::NotAFlag);
        };
        let args = chars.as_str();

        let (feature_str, value_str) = match args.split_once('.') {
            Some((feature, value)) => (feature, Some(value)),
            None => (args, None),
        };
        if feature_str.is_empty() || value_str.is_some_and(str::is_empty) {
            return Err(FlagSyntaxError::Malformed);
        }

        let op = match (opcode, value_str.is_some()) {
            ('P', true) => FlagOp::Positive,
            ('U', true) => FlagOp::Unify,
            ('R', false) => FlagOp::RequireFeature,
            ('R', true) => FlagOp::RequireValue,
            ('D', false) => FlagOp::DisallowFeature,
            ('D', true) => FlagOp::DisallowValue,
            ('C', false) => FlagOp::Clear,
            ('P' | 'U' | 'C', _) => return Err(FlagSyntaxError::Malformed),
            _ => return Err(FlagSyntaxError::UnsupportedOperation),
        };

        // Features stop one short of u16::MAX so the count still fits a u16.
        let feature = intern(&mut self.features, feature_str, 0, u16::MAX - 1)?;
        let value = match value_str {
            Some(v) => intern(&mut self.values, v, 1, u16::MAX)?,
            None => FLAG_VALUE_NEUTRAL,
        };

        Ok(FlagDiacritic {
            op,
            feature,
            value,
            text: symbol.into(),
        })
    }
}
