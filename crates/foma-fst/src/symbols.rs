// Symbol model and the sigma code table.

use crate::ParseError;
use crate::flags::{FlagDiacritic, FlagDiacriticParser, FlagSyntaxError};
use hashbrown::HashMap;
use std::fmt;

/// A sigma code as written in the serialized net.
pub type SymbolId = u32;

/// Code reserved for epsilon. Arcs may use it even when sigma omits the line.
pub const EPSILON: SymbolId = 0;

pub const EPSILON_TEXT: &str = "@_EPSILON_SYMBOL_@";
pub const UNKNOWN_TEXT: &str = "@_UNKNOWN_SYMBOL_@";
pub const IDENTITY_TEXT: &str = "@_IDENTITY_SYMBOL_@";

static EPSILON_SYMBOL: Symbol = Symbol::Epsilon;

/// One unit of the transducer's alphabet.
///
/// Symbols compare and hash by content: two graphemes are equal when their
/// characters are, two tags when their text is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    Epsilon,
    Unknown,
    Identity,
    /// Exactly one character.
    Grapheme(char),
    /// A tag such as `+V`; always longer than one character.
    MultiCharacter(Box<str>),
    Flag(FlagDiacritic),
}

impl Symbol {
    pub fn is_flag(&self) -> bool {
        matches!(self, Symbol::Flag(_))
    }

    /// Epsilon, unknown and identity are never part of sigma.
    pub fn is_sentinel(&self) -> bool {
        matches!(self, Symbol::Epsilon | Symbol::Unknown | Symbol::Identity)
    }

    /// Classify a sigma entry's text.
    fn classify(text: &str, flags: &mut FlagDiacriticParser) -> Result<Self, SymbolTextError> {
        match text {
            EPSILON_TEXT => return Ok(Symbol::Epsilon),
            UNKNOWN_TEXT => return Ok(Symbol::Unknown),
            IDENTITY_TEXT => return Ok(Symbol::Identity),
            _ => {}
        }

        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (None, _) => Err(SymbolTextError::Empty),
            (Some(ch), None) => Ok(Symbol::Grapheme(ch)),
            _ if text.starts_with('@') && text.ends_with('@') => match flags.parse(text) {
                Ok(flag) => Ok(Symbol::Flag(flag)),
                Err(FlagSyntaxError::Malformed | FlagSyntaxError::TooManyNames) => {
                    Err(SymbolTextError::InvalidFlag)
                }
                Err(FlagSyntaxError::NotAFlag | FlagSyntaxError::UnsupportedOperation) => {
                    Err(SymbolTextError::Reserved)
                }
            },
            _ => Ok(Symbol::MultiCharacter(text.into())),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::Epsilon => f.write_str(EPSILON_TEXT),
            Symbol::Unknown => f.write_str(UNKNOWN_TEXT),
            Symbol::Identity => f.write_str(IDENTITY_TEXT),
            Symbol::Grapheme(ch) => write!(f, "{ch}"),
            Symbol::MultiCharacter(tag) => f.write_str(tag),
            Symbol::Flag(flag) => flag.fmt(f),
        }
    }
}

enum SymbolTextError {
    Empty,
    Reserved,
    InvalidFlag,
}

/// Bidirectional mapping between sigma codes and [`Symbol`]s.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolTable {
    symbols: HashMap<SymbolId, Symbol>,
    /// Grapheme and multichar text to code; the tokenizer's vocabulary.
    by_text: HashMap<Box<str>, SymbolId>,
    /// Number of distinct flag diacritic features.
    flag_feature_count: u16,
}

impl SymbolTable {
    /// The symbol bound to `id`. Code 0 is epsilon even if sigma never
    /// declared it.
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        match self.symbols.get(&id) {
            Some(symbol) => Some(symbol),
            None if id == EPSILON => Some(&EPSILON_SYMBOL),
            None => None,
        }
    }

    /// The flag diacritic bound to `id`, if that code is a flag.
    #[inline]
    pub fn flag(&self, id: SymbolId) -> Option<&FlagDiacritic> {
        match self.symbols.get(&id) {
            Some(Symbol::Flag(flag)) => Some(flag),
            _ => None,
        }
    }

    /// Code of the grapheme or multichar symbol spelled `text`.
    pub fn lookup_text(&self, text: &str) -> Option<SymbolId> {
        self.by_text.get(text).copied()
    }

    /// Number of declared codes, sentinels included.
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    pub fn flag_feature_count(&self) -> u16 {
        self.flag_feature_count
    }

    /// The queryable alphabet: graphemes, multichar symbols and flags,
    /// sorted by code.
    pub fn sigma(&self) -> Vec<(SymbolId, &Symbol)> {
        self.sorted(|s| !s.is_sentinel())
    }

    pub fn graphemes(&self) -> Vec<(SymbolId, &Symbol)> {
        self.sorted(|s| matches!(s, Symbol::Grapheme(_)))
    }

    pub fn multichar_symbols(&self) -> Vec<(SymbolId, &Symbol)> {
        self.sorted(|s| matches!(s, Symbol::MultiCharacter(_)))
    }

    pub fn flag_diacritics(&self) -> Vec<(SymbolId, &Symbol)> {
        self.sorted(Symbol::is_flag)
    }

    /// Text entries the tokenizer may match: every grapheme and multichar
    /// symbol.
    pub fn text_entries(&self) -> impl Iterator<Item = (&str, SymbolId)> {
        self.by_text.iter().map(|(text, &id)| (&**text, id))
    }

    fn sorted(&self, keep: impl Fn(&Symbol) -> bool) -> Vec<(SymbolId, &Symbol)> {
        let mut entries: Vec<_> = self
            .symbols
            .iter()
            .filter(|(_, s)| keep(s))
            .map(|(&id, s)| (id, s))
            .collect();
        entries.sort_unstable_by_key(|&(id, _)| id);
        entries
    }
}

/// Accumulates sigma lines into a [`SymbolTable`].
///
/// Owns the flag interner so that every flag in one net shares a single
/// feature/value numbering.
#[derive(Default)]
pub struct SymbolTableBuilder {
    symbols: HashMap<SymbolId, Symbol>,
    by_text: HashMap<Box<str>, SymbolId>,
    flags: FlagDiacriticParser,
}

impl SymbolTableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `code` to the symbol spelled `text`.
    pub fn define(&mut self, line: usize, code: i64, text: &str) -> Result<(), ParseError> {
        let id = SymbolId::try_from(code).map_err(|_| ParseError::InvalidInteger {
            line,
            token: code.to_string(),
        })?;
        if self.symbols.contains_key(&id) {
            return Err(ParseError::DuplicateSymbol { line, code });
        }

        let symbol = Symbol::classify(text, &mut self.flags).map_err(|e| match e {
            SymbolTextError::Empty => ParseError::MissingSymbolText { line, code },
            SymbolTextError::Reserved => ParseError::UnsupportedSymbol {
                line,
                text: text.to_string(),
            },
            SymbolTextError::InvalidFlag => ParseError::InvalidFlagDiacritic {
                line,
                text: text.to_string(),
            },
        })?;

        if matches!(symbol, Symbol::Grapheme(_) | Symbol::MultiCharacter(_)) {
            if let Some(&previous) = self.by_text.get(text) {
                tracing::debug!(text, previous, code, "sigma text bound to more than one code");
            } else {
                self.by_text.insert(text.into(), id);
            }
        }
        self.symbols.insert(id, symbol);
        Ok(())
    }

    /// Resolve an arc label code.
    pub fn resolve(&self, line: usize, code: i64) -> Result<SymbolId, ParseError> {
        match SymbolId::try_from(code) {
            Ok(id) if id == EPSILON || self.symbols.contains_key(&id) => Ok(id),
            _ => Err(ParseError::UnknownSymbol { line, code }),
        }
    }

    pub fn finish(self) -> SymbolTable {
        SymbolTable {
            symbols: self.symbols,
            by_text: self.by_text,
            flag_feature_count: self.flags.feature_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(entries: &[(i64, &str)]) -> Result<SymbolTable, ParseError> {
        let mut builder = SymbolTableBuilder::new();
        for (i, &(code, text)) in entries.iter().enumerate() {
            builder.define(i + 1, code, text)?;
        }
        Ok(builder.finish())
    }

    #[test]
    fn classify_entries() {
        let table = build(&[
            (0, EPSILON_TEXT),
            (1, UNKNOWN_TEXT),
            (2, IDENTITY_TEXT),
            (3, "+V"),
            (4, "@P.UN.ON@"),
            (5, "a"),
            (6, "@"),
        ])
        .unwrap();

        assert_eq!(table.get(0), Some(&Symbol::Epsilon));
        assert_eq!(table.get(1), Some(&Symbol::Unknown));
        assert_eq!(table.get(2), Some(&Symbol::Identity));
        assert_eq!(table.get(3), Some(&Symbol::MultiCharacter("+V".into())));
        assert!(table.get(4).unwrap().is_flag());
        assert_eq!(table.get(5), Some(&Symbol::Grapheme('a')));
        assert_eq!(table.get(6), Some(&Symbol::Grapheme('@')));
        assert_eq!(table.get(7), None);
        assert_eq!(table.flag_feature_count(), 1);
    }

    #[test]
    fn sigma_excludes_sentinels() {
        let table = build(&[(0, EPSILON_TEXT), (3, "+N"), (4, "@C.x@"), (5, "b")]).unwrap();
        let ids: Vec<SymbolId> = table.sigma().iter().map(|&(id, _)| id).collect();
        assert_eq!(ids, vec![3, 4, 5]);
        assert_eq!(table.graphemes().len(), 1);
        assert_eq!(table.multichar_symbols().len(), 1);
        assert_eq!(table.flag_diacritics().len(), 1);
    }

    #[test]
    fn text_entries_skip_flags_and_sentinels() {
        let table = build(&[(0, EPSILON_TEXT), (3, "+N"), (4, "@C.x@"), (5, "b")]).unwrap();
        let mut texts: Vec<&str> = table.text_entries().map(|(t, _)| t).collect();
        texts.sort_unstable();
        assert_eq!(texts, vec!["+N", "b"]);
        assert_eq!(table.lookup_text("+N"), Some(3));
        assert_eq!(table.lookup_text("@C.x@"), None);
    }

    #[test]
    fn epsilon_is_implicit() {
        let table = build(&[(3, "a")]).unwrap();
        assert_eq!(table.get(EPSILON), Some(&Symbol::Epsilon));
        assert!(table.sigma().iter().all(|(id, _)| *id != EPSILON));
    }

    #[test]
    fn reject_duplicate_code() {
        let err = build(&[(3, "a"), (3, "b")]).unwrap_err();
        assert_eq!(err, ParseError::DuplicateSymbol { line: 2, code: 3 });
    }

    #[test]
    fn reject_reserved_at_symbols() {
        let err = build(&[(3, "@_SOMETHING_ELSE_@")]).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedSymbol { line: 1, .. }));

        let err = build(&[(3, "@N.x.y@")]).unwrap_err();
        assert!(matches!(err, ParseError::UnsupportedSymbol { .. }));
    }

    #[test]
    fn reject_malformed_flag() {
        let err = build(&[(3, "@U.x@")]).unwrap_err();
        assert!(matches!(err, ParseError::InvalidFlagDiacritic { .. }));
    }

    #[test]
    fn too_many_flag_values_is_an_invalid_flag() {
        let mut builder = SymbolTableBuilder::new();
        for i in 1..=u16::MAX {
            let code = i64::from(i) + 2;
            builder.define(usize::from(i), code, &format!("@P.x.v{i}@")).unwrap();
        }
        let err = builder.define(70_000, 70_000, "@P.x.overflow@").unwrap_err();
        assert_eq!(
            err,
            ParseError::InvalidFlagDiacritic {
                line: 70_000,
                text: "@P.x.overflow@".to_string()
            }
        );
    }

    #[test]
    fn resolve_labels() {
        let mut builder = SymbolTableBuilder::new();
        builder.define(1, 3, "a").unwrap();
        assert_eq!(builder.resolve(5, 3), Ok(3));
        assert_eq!(builder.resolve(5, 0), Ok(EPSILON));
        assert_eq!(
            builder.resolve(5, 9),
            Err(ParseError::UnknownSymbol { line: 5, code: 9 })
        );
        assert_eq!(
            builder.resolve(5, -2),
            Err(ParseError::UnknownSymbol { line: 5, code: -2 })
        );
    }

    #[test]
    fn symbols_compare_by_content() {
        let a = build(&[(3, "+V"), (4, "a")]).unwrap();
        let b = build(&[(7, "+V"), (9, "a")]).unwrap();
        assert_eq!(a.get(3), b.get(7));
        assert_eq!(a.get(4), b.get(9));
        assert_eq!(a.get(3).unwrap().to_string(), "+V");
        assert_eq!(Symbol::Epsilon.to_string(), EPSILON_TEXT);
    }
}
