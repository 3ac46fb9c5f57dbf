//! Word tokenizer shared by BM25 index construction and query scoring.

use regex::Regex;

/// Lowercasing word tokenizer.
///
/// Tokens are maximal runs of Unicode word characters (letters, digits,
/// underscore); everything else separates tokens and is dropped. Index build
/// and query time must use the same instance to score consistently.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    word: Regex,
}

impl Tokenizer {
    /// Compile the word pattern.
    ///
    /// # Errors
    /// Returns an error if the pattern cannot be compiled.
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            word: Regex::new(r"\w+")?,
        })
    }

    /// Split text into lowercase word tokens.
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        self.word
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lowercases_and_splits_on_punctuation() {
        let tokenizer = Tokenizer::new().unwrap();
        assert_eq!(
            tokenizer.tokenize("Les congés payés s'accumulent dès l'embauche."),
            vec!["les", "congés", "payés", "s", "accumulent", "dès", "l", "embauche"]
        );
    }

    #[test]
    fn test_keeps_digits_and_underscores() {
        let tokenizer = Tokenizer::new().unwrap();
        assert_eq!(
            tokenizer.tokenize("Article L3141-12 / snake_case"),
            vec!["article", "l3141", "12", "snake_case"]
        );
    }

    #[test]
    fn test_blank_input_yields_nothing() {
        let tokenizer = Tokenizer::new().unwrap();
        assert!(tokenizer.tokenize("").is_empty());
        assert!(tokenizer.tokenize("   \t\n ").is_empty());
        assert!(tokenizer.tokenize("?!-").is_empty());
    }
}
