//! An eager, line-oriented tokenizer for herc source files.
//!
//! The whole file is tokenized before the parser sees anything. The source
//! language has no constructs spanning several physical lines, so the
//! tokenizer works one line at a time and marks the end of every meaningful
//! line with a [`TokenKind::Newline`] token. Blank lines and `#` comments
//! produce no tokens at all, not even a newline.

use serde::{Deserialize, Serialize};

/// Characters that are emitted as single-character symbol tokens.
const ALLOWED_SYMBOLS: &str = ":=(),";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    Function,
    Start,
    End,
    If,
    Elif,
    Else,
    Say,
    Set,
    Add,
    Minus,
    Multiply,
    Divide,
}

impl Keyword {
    pub fn from_word(word: &str) -> Option<Self> {
        let keyword = match word {
            "function" => Keyword::Function,
            "start" => Keyword::Start,
            "end" => Keyword::End,
            "if" => Keyword::If,
            "elif" => Keyword::Elif,
            "else" => Keyword::Else,
            "say" => Keyword::Say,
            "set" => Keyword::Set,
            "add" => Keyword::Add,
            "minus" => Keyword::Minus,
            "multiply" => Keyword::Multiply,
            "divide" => Keyword::Divide,
            _ => return None,
        };
        Some(keyword)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::Function => "function",
            Keyword::Start => "start",
            Keyword::End => "end",
            Keyword::If => "if",
            Keyword::Elif => "elif",
            Keyword::Else => "else",
            Keyword::Say => "say",
            Keyword::Set => "set",
            Keyword::Add => "add",
            Keyword::Minus => "minus",
            Keyword::Multiply => "multiply",
            Keyword::Divide => "divide",
        }
    }

    /// Reserved keywords are recognized by the tokenizer but no statement
    /// form uses them yet.
    pub fn is_reserved(self) -> bool {
        matches!(
            self,
            Keyword::If
                | Keyword::Elif
                | Keyword::Else
                | Keyword::Add
                | Keyword::Minus
                | Keyword::Multiply
                | Keyword::Divide
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    Keyword(Keyword),
    Identifier,
    StringLiteral,
    Symbol,
    Newline,
    EndOfInput,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    /// 1-based physical line the token was read from.
    pub line: u32,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, line: u32) -> Self {
        Self {
            kind,
            text: text.into(),
            line,
        }
    }

    pub fn end_of_input(line: u32) -> Self {
        Self::new(TokenKind::EndOfInput, "", line)
    }

    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }

    pub fn is_symbol(&self, symbol: char) -> bool {
        self.kind == TokenKind::Symbol && self.text.len() == 1 && self.text.starts_with(symbol)
    }

    /// Human readable rendering used in error messages.
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Newline => "end of line".to_string(),
            TokenKind::EndOfInput => "end of input".to_string(),
            TokenKind::StringLiteral => format!("\"{}\"", self.text),
            TokenKind::Keyword(_) | TokenKind::Identifier | TokenKind::Symbol => {
                format!("`{}`", self.text)
            }
        }
    }
}

#[derive(Debug, thiserror::Error, Serialize, Deserialize)]
#[error("line {line}: {message}")]
pub struct LexError {
    pub message: String,
    pub line: u32,
}

#[tracing::instrument(level = "trace", skip_all)]
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
    let lines = source.lines().collect::<Vec<_>>();
    tokenize_lines(&lines)
}

pub fn tokenize_lines<S: AsRef<str>>(lines: &[S]) -> Result<Vec<Token>, LexError> {
    let mut tokens = vec![];
    for (index, raw_line) in lines.iter().enumerate() {
        let line_number = index as u32 + 1;
        let line = raw_line.as_ref().trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        tokenize_line(line, line_number, &mut tokens)?;
        tokens.push(Token::new(TokenKind::Newline, "\n", line_number));
    }
    tokens.push(Token::end_of_input(lines.len() as u32));
    Ok(tokens)
}

fn tokenize_line(line: &str, line_number: u32, tokens: &mut Vec<Token>) -> Result<(), LexError> {
    let mut chars = line.char_indices().peekable();
    while let Some((start, c)) = chars.next() {
        if c.is_whitespace() {
            continue;
        } else if c == '"' {
            let rest = &line[start + 1..];
            let Some(len) = rest.find('"') else {
                return Err(LexError {
                    message: "unterminated string literal".to_string(),
                    line: line_number,
                });
            };
            tokens.push(Token::new(
                TokenKind::StringLiteral,
                &rest[..len],
                line_number,
            ));
            // Skip the contents and the closing quote.
            let close = start + 1 + len;
            while chars.next_if(|&(i, _)| i <= close).is_some() {}
        } else if c.is_ascii_alphabetic() || c == '_' {
            let mut end = start + c.len_utf8();
            while let Some((i, next)) =
                chars.next_if(|&(_, next)| next.is_ascii_alphanumeric() || next == '_')
            {
                end = i + next.len_utf8();
            }
            let word = &line[start..end];
            let kind = match Keyword::from_word(word) {
                Some(keyword) => TokenKind::Keyword(keyword),
                None => TokenKind::Identifier,
            };
            tokens.push(Token::new(kind, word, line_number));
        } else if ALLOWED_SYMBOLS.contains(c) {
            tokens.push(Token::new(TokenKind::Symbol, c.to_string(), line_number));
        }
        // Anything else is dropped without a diagnostic.
    }
    Ok(())
}
