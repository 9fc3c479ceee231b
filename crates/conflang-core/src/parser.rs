use serde::Serialize;

use crate::error::LineError;
use crate::tokenizer::{Token, TokenKind};

/// One non-blank source line: a command name and its positional parameters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Command {
    pub name: String,
    pub params: Vec<String>,
    /// Line the name appeared on.
    pub line: usize,
}

/// Groups tokens into [`Command`]s, silently dropping blank lines.
///
/// The first error from upstream is passed through and ends the sequence;
/// a command still being assembled at that point is discarded.
pub struct Parser<I> {
    tokens: I,
    current: Command,
    start_of_command: bool,
    done: bool,
}

impl<I> Parser<I>
where
    I: Iterator<Item = Result<Token, LineError>>,
{
    pub fn new(tokens: I) -> Self {
        Self {
            tokens,
            current: Command::default(),
            start_of_command: true,
            done: false,
        }
    }

    fn accept_text(&mut self, data: Vec<u8>, line: usize) {
        let text = match String::from_utf8(data) {
            Ok(text) => text,
            Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
        };

        if self.start_of_command {
            self.current.name = text;
            self.current.line = line;
            self.start_of_command = false;
        } else {
            self.current.params.push(text);
        }
    }
}

impl<I> Iterator for Parser<I>
where
    I: Iterator<Item = Result<Token, LineError>>,
{
    type Item = Result<Command, LineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        while let Some(token) = self.tokens.next() {
            let token = match token {
                Ok(token) => token,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err));
                }
            };

            match token.kind {
                TokenKind::Text(data) => self.accept_text(data, token.line),
                TokenKind::CommandBoundary => {
                    if !self.start_of_command {
                        self.start_of_command = true;
                        return Some(Ok(std::mem::take(&mut self.current)));
                    }
                }
            }
        }

        self.done = true;
        None
    }
}
