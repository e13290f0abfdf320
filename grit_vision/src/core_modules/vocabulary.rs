// THEORY:
// The `vocabulary` module turns the token ids the text decoder generates back
// into words. The vocabulary file is WordPiece: one token per line, the line
// number is the id, and `##` marks a piece that continues the previous word.

use crate::core_modules::error::{GritError, GritResult};
use std::fs;
use std::path::Path;

const PAD: &str = "[PAD]";
const CLS: &str = "[CLS]";
const SEP: &str = "[SEP]";
const CONTINUATION: &str = "##";

/// WordPiece vocabulary used to turn generated token ids back into text.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<String>,
}

impl Vocabulary {
    pub fn new(tokens: Vec<String>) -> Self {
        Self { tokens }
    }

    /// One token per line; line `i` is token id `i`.
    pub fn from_file(path: &Path) -> GritResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| GritError::io(path, e))?;
        let tokens: Vec<String> = text.lines().map(|line| line.trim_end().to_string()).collect();
        if tokens.is_empty() {
            return Err(GritError::config(format!("vocabulary {} is empty", path.display())));
        }
        Ok(Self::new(tokens))
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Decodes one generated sequence. Padding and the start token are
    /// skipped, the first separator ends the sentence, `##` pieces are glued to
    /// the previous word and unknown ids are dropped.
    pub fn decode(&self, ids: &[i64]) -> String {
        let mut text = String::new();
        for &id in ids {
            let Some(token) = usize::try_from(id).ok().and_then(|i| self.tokens.get(i)) else {
                continue;
            };
            match token.as_str() {
                SEP => break,
                PAD | CLS => continue,
                _ => {}
            }
            if let Some(piece) = token.strip_prefix(CONTINUATION) {
                text.push_str(piece);
            } else {
                if !text.is_empty() {
                    text.push(' ');
                }
                text.push_str(token);
            }
        }
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab() -> Vocabulary {
        Vocabulary::new(
            ["[PAD]", "[CLS]", "[SEP]", "a", "man", "riding", "skate", "##board"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        )
    }

    #[test]
    fn decodes_wordpieces_until_separator() {
        let v = vocab();
        assert_eq!(v.decode(&[1, 3, 4, 5, 3, 6, 7, 2, 4, 4]), "a man riding a skateboard");
    }

    #[test]
    fn skips_padding_and_out_of_range_ids() {
        let v = vocab();
        assert_eq!(v.decode(&[0, 4, -1, 99, 0]), "man");
        assert_eq!(v.decode(&[2, 4]), "");
    }

    #[test]
    fn loads_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vocab.txt");
        fs::write(&path, "[PAD]\n[CLS]\n[SEP]\ndog\n").unwrap();
        let v = Vocabulary::from_file(&path).unwrap();
        assert_eq!(v.len(), 4);
        assert_eq!(v.decode(&[1, 3, 2]), "dog");
    }
}
