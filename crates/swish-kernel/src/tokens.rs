//! Token sequences: the unit the pipeline orchestrator operates on.
//!
//! A `TokenSeq` is an ordered, owned list of words. It knows how to count a
//! delimiter and hand out independent slices; it does not know anything about
//! pipes or processes.

use crate::error::TokenError;

/// The standalone token that separates pipeline segments.
pub const PIPE_DELIMITER: &str = "|";

/// An ordered sequence of text tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenSeq {
    tokens: Vec<String>,
}

impl TokenSeq {
    /// Create an empty sequence.
    pub fn new() -> Self {
        Self::default()
    }

    /// Split a raw command line into tokens.
    ///
    /// Whitespace separates words unless quoted. Single quotes are literal,
    /// double quotes honour `\"` and `\\`, and a backslash outside quotes
    /// escapes the next character. Pipe characters are not split out of
    /// longer words, so `a|b` stays a single token.
    pub fn tokenize(line: &str) -> Result<Self, TokenError> {
        let mut tokens = Vec::new();
        let mut current = String::new();
        // Tracks "inside a word" separately from `current` so that `''` yields
        // an empty token rather than nothing.
        let mut in_word = false;
        let mut chars = line.chars();

        while let Some(c) = chars.next() {
            match c {
                '\'' => {
                    in_word = true;
                    loop {
                        match chars.next() {
                            Some('\'') => break,
                            Some(ch) => current.push(ch),
                            None => return Err(TokenError::UnterminatedQuote('\'')),
                        }
                    }
                }
                '"' => {
                    in_word = true;
                    loop {
                        match chars.next() {
                            Some('"') => break,
                            Some('\\') => match chars.next() {
                                Some(ch @ ('"' | '\\')) => current.push(ch),
                                Some(ch) => {
                                    current.push('\\');
                                    current.push(ch);
                                }
                                None => return Err(TokenError::UnterminatedQuote('"')),
                            },
                            Some(ch) => current.push(ch),
                            None => return Err(TokenError::UnterminatedQuote('"')),
                        }
                    }
                }
                '\\' => {
                    in_word = true;
                    if let Some(ch) = chars.next() {
                        current.push(ch);
                    }
                }
                c if c.is_whitespace() => {
                    if in_word {
                        tokens.push(std::mem::take(&mut current));
                        in_word = false;
                    }
                }
                c => {
                    in_word = true;
                    current.push(c);
                }
            }
        }

        if in_word {
            tokens.push(current);
        }

        Ok(Self { tokens })
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.tokens.get(index).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }

    pub fn push(&mut self, token: impl Into<String>) {
        self.tokens.push(token.into());
    }

    /// Number of tokens exactly equal to `needle`.
    pub fn count_occurrences(&self, needle: &str) -> usize {
        self.tokens.iter().filter(|t| *t == needle).count()
    }

    /// Copy out the tokens in `[start, end)` as an independent sequence.
    pub fn slice(&self, start: usize, end: usize) -> Result<TokenSeq, TokenError> {
        if start > end || end > self.tokens.len() {
            return Err(TokenError::SliceOutOfBounds {
                start,
                end,
                len: self.tokens.len(),
            });
        }
        Ok(Self {
            tokens: self.tokens[start..end].to_vec(),
        })
    }
}

impl From<Vec<String>> for TokenSeq {
    fn from(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

impl<S: Into<String>> FromIterator<S> for TokenSeq {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            tokens: iter.into_iter().map(Into::into).collect(),
        }
    }
}

impl std::fmt::Display for TokenSeq {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.tokens.join(" "))
    }
}
