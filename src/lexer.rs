use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;

use crate::ast::Token;

/// Location of a character in the query text.
///
/// `offset` counts characters from the start; `line` and `column` are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub offset: usize,
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn start() -> Self {
        Position {
            offset: 0,
            line: 1,
            column: 1,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexError {
    pub position: Position,
    pub message: String,
}

impl fmt::Display for LexError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.position)
    }
}

impl std::error::Error for LexError {}

pub struct Lexer {
    input: Vec<char>,
    position: Position,
    token_start: Position,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: Position::start(),
            token_start: Position::start(),
        }
    }

    /// Where the most recently returned token starts.
    pub fn token_position(&self) -> Position {
        self.token_start
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position.offset).copied()
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position.offset + offset).copied()
    }

    fn advance(&mut self) {
        if let Some(ch) = self.current_char() {
            self.position.offset += 1;
            if ch == '\n' {
                self.position.line += 1;
                self.position.column = 1;
            } else {
                self.position.column += 1;
            }
        }
    }

    fn error(&self, message: impl Into<String>) -> LexError {
        LexError {
            position: self.position,
            message: message.into(),
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    fn read_quoted_identifier(&mut self) -> Result<String, LexError> {
        self.advance(); // opening back-quote
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            self.advance();
            if ch == '`' {
                if result.is_empty() {
                    return Err(LexError {
                        position: self.token_start,
                        message: "Empty quoted identifier".to_string(),
                    });
                }
                return Ok(result);
            }
            result.push(ch);
        }
        Err(LexError {
            position: self.token_start,
            message: "Unterminated quoted identifier: missing closing '`'".to_string(),
        })
    }

    fn read_string(&mut self, quote: char) -> Result<String, LexError> {
        let mut result = String::new();
        self.advance(); // opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                c if c == quote => {
                    self.advance();
                    return Ok(result);
                }
                '\\' => {
                    self.advance();
                    match self.current_char() {
                        Some('n') => result.push('\n'),
                        Some('t') => result.push('\t'),
                        Some('r') => result.push('\r'),
                        Some('"') => result.push('"'),
                        Some('\'') => result.push('\''),
                        Some('\\') => result.push('\\'),
                        Some(ch) => return Err(self.error(format!("Invalid escape sequence: \\{}", ch))),
                        None => {
                            return Err(self.error("Unterminated string: unexpected end of input after backslash"));
                        }
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError {
            position: self.token_start,
            message: "Unterminated string: missing closing quote".to_string(),
        })
    }

    fn read_number(&mut self) -> Result<Token, LexError> {
        let mut number = String::new();
        let mut is_decimal = false;

        while let Some(ch) = self.current_char() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.advance();
            } else if ch == '.'
                && !is_decimal
                && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
            {
                is_decimal = true;
                number.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        let invalid = |message: String| LexError {
            position: self.token_start,
            message,
        };
        if is_decimal {
            Decimal::from_str(&number)
                .map(Token::Decimal)
                .map_err(|_| invalid(format!("Invalid decimal literal '{}'", number)))
        } else {
            number
                .parse::<i64>()
                .map(Token::Integer)
                .map_err(|_| invalid(format!("Integer literal '{}' is out of range", number)))
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        self.token_start = self.position;

        let token = match self.current_char() {
            None => Token::Eof,
            Some('.') => {
                self.advance();
                Token::Dot
            }
            Some(',') => {
                self.advance();
                Token::Comma
            }
            Some('-') => {
                self.advance();
                Token::Minus
            }
            Some('(') => {
                self.advance();
                Token::LParen
            }
            Some(')') => {
                self.advance();
                Token::RParen
            }
            Some('=') => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                }
                Token::Eq
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    Token::NotEq
                } else {
                    return Err(self.error("Unexpected '!' (did you mean '!=' or 'not'?)"));
                }
            }
            Some('>') => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            Some('<') => {
                self.advance();
                if self.current_char() == Some('=') {
                    self.advance();
                    Token::LtEq
                } else {
                    Token::Lt
                }
            }
            Some('"') => Token::String(self.read_string('"')?),
            Some('\'') => Token::String(self.read_string('\'')?),
            Some('`') => Token::Identifier(self.read_quoted_identifier()?),
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                Token::keyword(&ident.to_lowercase()).unwrap_or(Token::Identifier(ident))
            }
            Some(ch) if ch.is_ascii_digit() => self.read_number()?,
            Some(ch) => return Err(self.error(format!("Unexpected character '{}'", ch))),
        };
        Ok(token)
    }
}

#[test]
fn test_keywords_ignore_case() {
    let mut lexer = Lexer::new("FROM Where isA OrderBy is");
    assert_eq!(lexer.next_token(), Ok(Token::From));
    assert_eq!(lexer.next_token(), Ok(Token::Where));
    assert_eq!(lexer.next_token(), Ok(Token::Isa));
    assert_eq!(lexer.next_token(), Ok(Token::OrderBy));
    assert_eq!(lexer.next_token(), Ok(Token::Isa));
    assert_eq!(lexer.next_token(), Ok(Token::Eof));
}

#[test]
fn test_token_positions() {
    let mut lexer = Lexer::new("Table\n  where");
    assert_eq!(lexer.next_token(), Ok(Token::Identifier("Table".to_string())));
    assert_eq!(lexer.token_position(), Position { offset: 0, line: 1, column: 1 });
    assert_eq!(lexer.next_token(), Ok(Token::Where));
    assert_eq!(lexer.token_position(), Position { offset: 8, line: 2, column: 3 });
}
