//! Whitespace tokenizer over rendered report text.

/// A maximal run of non-whitespace characters, borrowed from the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lexeme<'a> {
    /// The lexeme text.
    pub text: &'a str,
    /// Byte offset of the lexeme in the source text.
    pub start: usize,
}

impl Lexeme<'_> {
    /// Byte offset one past the end of the lexeme.
    pub fn end(&self) -> usize {
        self.start + self.text.len()
    }
}

/// Split text into lexemes. Any Unicode whitespace, including line breaks,
/// separates lexemes.
pub fn tokenize(text: &str) -> Vec<Lexeme<'_>> {
    let mut lexemes = Vec::new();
    let mut start = None;

    for (i, c) in text.char_indices() {
        if c.is_whitespace() {
            if let Some(s) = start.take() {
                lexemes.push(Lexeme { text: &text[s..i], start: s });
            }
        } else if start.is_none() {
            start = Some(i);
        }
    }

    if let Some(s) = start {
        lexemes.push(Lexeme { text: &text[s..], start: s });
    }

    lexemes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_offsets() {
        let text = "Lote C  403279116\nFecha\t15-MAR-24 ";
        let lexemes = tokenize(text);

        let words: Vec<&str> = lexemes.iter().map(|l| l.text).collect();
        assert_eq!(words, ["Lote", "C", "403279116", "Fecha", "15-MAR-24"]);

        let batch = lexemes[2];
        assert_eq!(&text[batch.start..batch.end()], "403279116");
    }

    #[test]
    fn test_tokenize_blank() {
        assert!(tokenize("").is_empty());
        assert!(tokenize(" \n\t ").is_empty());
    }

    #[test]
    fn test_tokenize_non_ascii() {
        let lexemes = tokenize("Año  Categoría");
        assert_eq!(lexemes.len(), 2);
        assert_eq!(lexemes[1].text, "Categoría");
        assert_eq!(lexemes[1].start, "Año  ".len());
    }
}
