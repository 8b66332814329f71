// Longest-match splitting of text into alphabet symbols.

use regex::{Regex, RegexBuilder};

use crate::OutOfAlphabet;
use crate::symbols::{SymbolId, SymbolTable};

/// Large alphabets (tens of thousands of tags) exceed the default limit.
const PATTERN_SIZE_LIMIT: usize = 64 * (1 << 20);

/// Splits input strings into grapheme and multichar symbol codes.
///
/// The pattern is an anchored alternation of every alphabet entry, longest
/// first. `regex` picks the first alternative that matches, so a tag such as
/// `+Past` wins over the grapheme `+` it starts with. Matched text is mapped
/// back to its code through the [`SymbolTable`] the tokenizer was built from.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    /// `None` when the alphabet has no text entries.
    pattern: Option<Regex>,
}

impl Tokenizer {
    pub fn build(symbols: &SymbolTable) -> Result<Self, regex::Error> {
        let mut entries: Vec<(&str, SymbolId)> = symbols.text_entries().collect();
        entries.sort_unstable_by(|(a, _), (b, _)| {
            b.chars().count().cmp(&a.chars().count()).then_with(|| a.cmp(b))
        });

        let pattern = if entries.is_empty() {
            None
        } else {
            let alternation = entries
                .iter()
                .map(|(text, _)| regex::escape(text))
                .collect::<Vec<_>>()
                .join("|");
            let regex = RegexBuilder::new(&format!("^(?:{alternation})"))
                .size_limit(PATTERN_SIZE_LIMIT)
                .build()?;
            Some(regex)
        };

        Ok(Self { pattern })
    }

    /// Split `text` into codes of `symbols`, the table passed to
    /// [`build`](Self::build).
    ///
    /// The empty string splits into no symbols.
    pub fn tokenize_ids(
        &self,
        symbols: &SymbolTable,
        text: &str,
    ) -> Result<Vec<SymbolId>, OutOfAlphabet> {
        let mut ids = Vec::new();
        let mut pos = 0;
        while pos < text.len() {
            let matched = self
                .pattern
                .as_ref()
                .and_then(|pattern| pattern.find(&text[pos..]))
                .and_then(|m| Some((symbols.lookup_text(m.as_str())?, m.end())));
            let Some((id, len)) = matched else {
                return Err(OutOfAlphabet {
                    input: text.to_string(),
                    position: pos,
                });
            };
            ids.push(id);
            pos += len;
        }
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::SymbolTableBuilder;
    use proptest::prelude::*;

    fn table(entries: &[(i64, &str)]) -> SymbolTable {
        let mut builder = SymbolTableBuilder::new();
        for (i, &(code, text)) in entries.iter().enumerate() {
            builder.define(i + 1, code, text).unwrap();
        }
        builder.finish()
    }

    fn english() -> SymbolTable {
        table(&[
            (0, "@_EPSILON_SYMBOL_@"),
            (3, "+3P"),
            (4, "+Past"),
            (5, "+PastPart"),
            (6, "+Sg"),
            (7, "+V"),
            (8, "@P.UN.ON@"),
            (9, "a"),
            (10, "e"),
            (11, "t"),
            (12, "s"),
            (13, "+"),
            (14, "P"),
        ])
    }

    #[test]
    fn prefer_longest_symbol() {
        let symbols = english();
        let tokenizer = Tokenizer::build(&symbols).unwrap();
        assert_eq!(tokenizer.tokenize_ids(&symbols, "eat+V+Past").unwrap(), vec![10, 9, 11, 7, 4]);
        assert_eq!(tokenizer.tokenize_ids(&symbols, "eat+V+PastPart").unwrap(), vec![10, 9, 11, 7, 5]);
        assert_eq!(tokenizer.tokenize_ids(&symbols, "+Pa").unwrap(), vec![13, 14, 9]);
    }

    #[test]
    fn empty_input_has_no_symbols() {
        let symbols = english();
        let tokenizer = Tokenizer::build(&symbols).unwrap();
        assert_eq!(tokenizer.tokenize_ids(&symbols, "").unwrap(), Vec::<SymbolId>::new());
    }

    #[test]
    fn out_of_alphabet_reports_position() {
        let symbols = english();
        let tokenizer = Tokenizer::build(&symbols).unwrap();
        let err = tokenizer.tokenize_ids(&symbols, "eatz").unwrap_err();
        assert_eq!(
            err,
            OutOfAlphabet {
                input: "eatz".to_string(),
                position: 3
            }
        );
    }

    #[test]
    fn flags_are_not_tokenized() {
        let symbols = english();
        let tokenizer = Tokenizer::build(&symbols).unwrap();
        assert!(tokenizer.tokenize_ids(&symbols, "@P.UN.ON@").is_err());
    }

    #[test]
    fn regex_metacharacters_are_literal() {
        let symbols = table(&[(3, "."), (4, "a"), (5, "[*]")]);
        let tokenizer = Tokenizer::build(&symbols).unwrap();
        assert_eq!(tokenizer.tokenize_ids(&symbols, "a.[*]").unwrap(), vec![4, 3, 5]);
        assert!(tokenizer.tokenize_ids(&symbols, "b").is_err());
    }

    #[test]
    fn multibyte_graphemes() {
        let symbols = table(&[(3, "â"), (4, "t"), (5, "✅")]);
        let tokenizer = Tokenizer::build(&symbols).unwrap();
        assert_eq!(tokenizer.tokenize_ids(&symbols, "tâ✅").unwrap(), vec![4, 3, 5]);
        let err = tokenizer.tokenize_ids(&symbols, "tâx").unwrap_err();
        assert_eq!(err.position, 3);
    }

    #[test]
    fn repeated_text_resolves_to_first_code() {
        let symbols = table(&[(3, "a"), (4, "b"), (5, "a")]);
        let tokenizer = Tokenizer::build(&symbols).unwrap();
        assert_eq!(tokenizer.tokenize_ids(&symbols, "aba").unwrap(), vec![3, 4, 3]);
    }

    #[test]
    fn empty_alphabet() {
        let symbols = table(&[(0, "@_EPSILON_SYMBOL_@")]);
        let tokenizer = Tokenizer::build(&symbols).unwrap();
        assert!(tokenizer.tokenize_ids(&symbols, "").unwrap().is_empty());
        assert_eq!(tokenizer.tokenize_ids(&symbols, "a").unwrap_err().position, 0);
    }

    proptest! {
        #[test]
        fn words_over_the_alphabet_always_split(picks in prop::collection::vec(0usize..8, 0..20)) {
            let texts = ["+3P", "+Past", "+PastPart", "+Sg", "+V", "a", "e", "t"];
            let input: String = picks.iter().map(|&i| texts[i]).collect();

            let symbols = english();
            let tokenizer = Tokenizer::build(&symbols).unwrap();
            let ids = tokenizer.tokenize_ids(&symbols, &input).unwrap();

            let rejoined: String = ids
                .iter()
                .map(|&id| symbols.get(id).unwrap().to_string())
                .collect();
            prop_assert_eq!(rejoined, input);
        }
    }
}
