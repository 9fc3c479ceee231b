/// Byte-level tokenizer for the command language.
///
/// ```text
/// link Rust\ Book https://doc.rust-lang.org/book   → Text Text Text Boundary
/// (blank line)                                      → Boundary
/// \   escapes the following byte, including space, tab and newline
/// ```
use std::collections::VecDeque;
use std::io::{self, BufReader, Read};

use tracing::trace;

use crate::error::LineError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// A non-empty word.
    Text(Vec<u8>),
    /// End of one source line's command.
    CommandBoundary,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Line the token belongs to. For text, the line its first byte was on.
    pub line: usize,
}

impl Token {
    pub fn text(data: impl Into<Vec<u8>>, line: usize) -> Self {
        Self {
            kind: TokenKind::Text(data.into()),
            line,
        }
    }

    pub fn boundary(line: usize) -> Self {
        Self {
            kind: TokenKind::CommandBoundary,
            line,
        }
    }

    pub fn is_boundary(&self) -> bool {
        matches!(self.kind, TokenKind::CommandBoundary)
    }
}

/// Lazily turns a byte source into [`Token`]s.
///
/// Single use: once it has returned `None` or an error it stays exhausted.
pub struct Tokenizer<R> {
    bytes: io::Bytes<BufReader<R>>,
    word: Vec<u8>,
    word_line: usize,
    line: usize,
    escaped: bool,
    // A newline can complete a word and a boundary at once.
    pending: VecDeque<Token>,
    finished: bool,
}

impl<R: Read> Tokenizer<R> {
    pub fn new(source: R) -> Self {
        Self {
            bytes: BufReader::new(source).bytes(),
            word: Vec::new(),
            word_line: 1,
            line: 1,
            escaped: false,
            pending: VecDeque::with_capacity(2),
            finished: false,
        }
    }

    /// Line currently being read.
    pub fn line(&self) -> usize {
        self.line
    }

    fn push_byte(&mut self, b: u8) {
        if self.word.is_empty() {
            self.word_line = self.line;
        }
        self.word.push(b);
    }

    fn flush_word(&mut self) {
        if self.word.is_empty() {
            return;
        }
        let data = std::mem::take(&mut self.word);
        self.pending.push_back(Token::text(data, self.word_line));
    }

    fn feed(&mut self, b: u8) {
        if self.escaped {
            self.escaped = false;
            self.push_byte(b);
            if b == b'\n' {
                self.line += 1;
            }
            return;
        }

        match b {
            b'\\' => self.escaped = true,
            b' ' | b'\t' => self.flush_word(),
            b'\n' => {
                self.flush_word();
                self.pending.push_back(Token::boundary(self.line));
                self.line += 1;
            }
            _ => self.push_byte(b),
        }
    }
}

impl<R: Read> Iterator for Tokenizer<R> {
    type Item = Result<Token, LineError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                trace!(line = token.line, boundary = token.is_boundary(), "token");
                return Some(Ok(token));
            }
            if self.finished {
                return None;
            }

            match self.bytes.next() {
                Some(Ok(b)) => self.feed(b),
                Some(Err(err)) => {
                    self.finished = true;
                    self.word.clear();
                    return Some(Err(LineError::new(self.line, err)));
                }
                None => {
                    // A trailing lone backslash escapes nothing and is dropped.
                    self.finished = true;
                    self.flush_word();
                    self.pending.push_back(Token::boundary(self.line));
                }
            }
        }
    }
}
