//! Sentence splitting for turn text.

/// Splits a turn's text on a fixed delimiter.
///
/// Fragment indexes are kept as produced by the split, so skipping an empty
/// fragment leaves a gap in the numbering (`s0`, `s2`, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentenceSplitter {
    delimiter: String,
}

impl Default for SentenceSplitter {
    fn default() -> Self {
        Self::new(". ")
    }
}

impl SentenceSplitter {
    /// An empty delimiter falls back to the default `". "`
    pub fn new(delimiter: impl Into<String>) -> Self {
        let delimiter = delimiter.into();
        if delimiter.is_empty() {
            return Self {
                delimiter: ". ".to_string(),
            };
        }
        Self { delimiter }
    }

    pub fn delimiter(&self) -> &str {
        &self.delimiter
    }

    /// `(fragment index, trimmed text)` for every non-blank fragment
    pub fn split<'a>(&self, text: &'a str) -> Vec<(usize, &'a str)> {
        text.split(self.delimiter.as_str())
            .enumerate()
            .filter_map(|(i, fragment)| {
                let trimmed = fragment.trim();
                (!trimmed.is_empty()).then_some((i, trimmed))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_keeps_fragment_indexes() {
        let splitter = SentenceSplitter::default();
        let parts = splitter.split("Buenas noches. . Empezamos ya. Gracias.");
        assert_eq!(parts, vec![(0, "Buenas noches"), (2, "Empezamos ya"), (3, "Gracias.")]);
    }

    #[test]
    fn test_whitespace_only_fragment_is_dropped() {
        let parts = SentenceSplitter::default().split("Hola.  . Adiós");
        assert_eq!(parts, vec![(0, "Hola"), (2, "Adiós")]);
    }

    #[test]
    fn test_blank_text_has_no_sentences() {
        assert!(SentenceSplitter::default().split("   ").is_empty());
        assert!(SentenceSplitter::default().split("").is_empty());
    }

    #[test]
    fn test_custom_delimiter() {
        let splitter = SentenceSplitter::new("|");
        assert_eq!(splitter.split(" a | b "), vec![(0, "a"), (1, "b")]);
        assert_eq!(SentenceSplitter::new("").delimiter(), ". ");
    }
}
