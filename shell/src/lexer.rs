//! Lexical analysis of a single pipeline segment.
//!
//! Tokens are runs of non-whitespace characters or the content of a double-quoted
//! span. There is no escape processing, and the quotes themselves are dropped.

use std::fmt;

/// A token produced by [`split_into_tokens`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub text: String,
    /// `true` when any part of the token came from inside a double-quoted span.
    ///
    /// Quoted tokens are never treated as redirection operators.
    pub quoted: bool,
}

impl Token {
    pub fn bare(text: impl Into<String>) -> Self {
        Token {
            text: text.into(),
            quoted: false,
        }
    }

    pub fn quoted(text: impl Into<String>) -> Self {
        Token {
            text: text.into(),
            quoted: true,
        }
    }
}

/// Errors that can occur during the lexical analysis process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexingError {
    /// A single token grew past the per-token capacity.
    TokenTooLong { limit: usize },
    /// The segment holds more arguments than one command may carry.
    TooManyArguments { limit: usize },
}

impl fmt::Display for LexingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LexingError::TokenTooLong { limit } => {
                write!(f, "argument longer than {limit} characters")
            }
            LexingError::TooManyArguments { limit } => {
                write!(f, "too many arguments (at most {limit} per command)")
            }
        }
    }
}

impl std::error::Error for LexingError {}

struct LexingFSM<'a> {
    input: std::str::Chars<'a>,
    in_quote: bool,
    in_token: bool,
    quoted: bool,
    buffer: String,
    max_token_len: usize,
    max_args: usize,
}

impl<'a> LexingFSM<'a> {
    fn new(line: &'a str, max_token_len: usize, max_args: usize) -> Self {
        LexingFSM {
            input: line.chars(),
            in_quote: false,
            in_token: false,
            quoted: false,
            buffer: String::new(),
            max_token_len,
            max_args,
        }
    }

    /// Walks the input once, flushing a token on unquoted whitespace and on every
    /// closing quote.
    ///
    /// An opening quote does not flush, so `ab"cd"ef` yields `abcd` and `ef`.
    /// An unterminated quote is tolerated and its partial content becomes the last token.
    fn make_tokens(mut self) -> Result<Vec<Token>, LexingError> {
        let mut out = Vec::new();

        while let Some(ch) = self.input.next() {
            if self.in_quote {
                if ch == '"' {
                    self.in_quote = false;
                    if !self.buffer.is_empty() {
                        self.flush(&mut out)?;
                    }
                    self.reset();
                } else {
                    self.push(ch)?;
                }
            } else if ch == '"' {
                self.in_quote = true;
                self.in_token = true;
                self.quoted = true;
            } else if is_separator(ch) {
                if self.in_token {
                    self.flush(&mut out)?;
                    self.reset();
                }
            } else {
                self.in_token = true;
                self.push(ch)?;
            }
        }

        if self.in_token || self.in_quote {
            self.flush(&mut out)?;
        }

        Ok(out)
    }

    fn push(&mut self, ch: char) -> Result<(), LexingError> {
        if self.buffer.chars().count() >= self.max_token_len {
            return Err(LexingError::TokenTooLong {
                limit: self.max_token_len,
            });
        }
        self.buffer.push(ch);
        Ok(())
    }

    fn flush(&mut self, out: &mut Vec<Token>) -> Result<(), LexingError> {
        if out.len() >= self.max_args {
            return Err(LexingError::TooManyArguments {
                limit: self.max_args,
            });
        }
        out.push(Token {
            text: std::mem::take(&mut self.buffer),
            quoted: self.quoted,
        });
        Ok(())
    }

    fn reset(&mut self) {
        self.buffer.clear();
        self.in_token = false;
        self.quoted = false;
    }
}

fn is_separator(ch: char) -> bool {
    ch.is_ascii_whitespace() || ch == '\x0b'
}

/// Split one command segment into tokens.
///
/// `max_token_len` bounds the characters of a single token and `max_args` the
/// number of tokens; exceeding either is an error for the whole segment.
pub fn split_into_tokens(
    line: &str,
    max_token_len: usize,
    max_args: usize,
) -> Result<Vec<Token>, LexingError> {
    LexingFSM::new(line, max_token_len, max_args).make_tokens()
}
