//! Recursive-descent parser and the AST it produces.
//!
//! Blocks are delimited by their header (`function ...:` or `start:`) and the
//! `end` keyword; indentation plays no part in parsing.

use serde::Serialize;
use tracing::trace;

use crate::tokenizer::{Keyword, Token, TokenKind};

/// Terminator of a `say` statement that did not specify `end=`. Lowered to a
/// line end rather than a string.
pub const DEFAULT_TERMINATOR: &str = "\\n";

/// Internal safety limit on loop iterations while parsing a single block.
/// It guards against parser bugs and is not a limit of the language.
pub const DEFAULT_MAX_BLOCK_STATEMENTS: usize = 10_000;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn functions(&self) -> impl Iterator<Item = &Statement> {
        self.statements
            .iter()
            .filter(|statement| matches!(statement, Statement::FunctionDef { .. }))
    }

    pub fn start_blocks(&self) -> impl Iterator<Item = &Statement> {
        self.statements
            .iter()
            .filter(|statement| matches!(statement, Statement::StartBlock { .. }))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Statement {
    Say {
        fragments: Vec<Operand>,
        terminator: String,
    },
    Set {
        name: String,
    },
    Call {
        callee: String,
        argument: Option<Operand>,
    },
    FunctionDef {
        name: String,
        parameter: Option<String>,
        body: Vec<Statement>,
    },
    StartBlock {
        body: Vec<Statement>,
    },
}

/// A say fragment or call argument, tagged with the kind of token it came from.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub enum Operand {
    Literal(String),
    Variable(String),
}

impl Operand {
    pub fn text(&self) -> &str {
        match self {
            Operand::Literal(text) | Operand::Variable(text) => text,
        }
    }

    pub fn is_variable(&self) -> bool {
        matches!(self, Operand::Variable(_))
    }

    fn from_token(token: Token) -> Option<Self> {
        match token.kind {
            TokenKind::StringLiteral => Some(Operand::Literal(token.text)),
            TokenKind::Identifier => Some(Operand::Variable(token.text)),
            _ => None,
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("line {line}: expected {expected} {context}, found {found}")]
    Expected {
        expected: &'static str,
        context: &'static str,
        found: String,
        line: u32,
    },
    #[error("line {line}: unexpected token {found} in {context}")]
    UnexpectedToken {
        found: String,
        context: &'static str,
        line: u32,
    },
    #[error("line {line}: block opened at line {opened_at} is never closed with `end`")]
    UnclosedBlock { opened_at: u32, line: u32 },
    #[error("line {line}: block exceeded the internal limit of {limit} statements")]
    BlockLimitExceeded { limit: usize, line: u32 },
}

impl ParseError {
    pub fn line(&self) -> u32 {
        match self {
            ParseError::Expected { line, .. }
            | ParseError::UnexpectedToken { line, .. }
            | ParseError::UnclosedBlock { line, .. }
            | ParseError::BlockLimitExceeded { line, .. } => *line,
        }
    }

    /// Internal errors indicate a compiler bug rather than a bad program.
    pub fn is_internal(&self) -> bool {
        matches!(self, ParseError::BlockLimitExceeded { .. })
    }
}

#[derive(Clone, Copy, Debug)]
pub struct ParserOptions {
    pub max_block_statements: usize,
}

impl Default for ParserOptions {
    fn default() -> Self {
        Self {
            max_block_statements: DEFAULT_MAX_BLOCK_STATEMENTS,
        }
    }
}

/// Parser state for a single compilation. Nothing is shared between
/// instances.
pub struct Parser {
    tokens: Vec<Token>,
    position: usize,
    advances: usize,
    /// Returned once the cursor runs past the buffer.
    sentinel: Token,
    options: ParserOptions,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_options(tokens, ParserOptions::default())
    }

    pub fn with_options(tokens: Vec<Token>, options: ParserOptions) -> Self {
        let last_line = tokens.last().map(|token| token.line).unwrap_or(0);
        Self {
            tokens,
            position: 0,
            advances: 0,
            sentinel: Token::end_of_input(last_line),
            options,
        }
    }

    /// Number of `advance` calls made so far, including ones past the end.
    pub fn advance_count(&self) -> usize {
        self.advances
    }

    #[tracing::instrument(level = "trace", skip_all)]
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Program::default();
        while self.peek().kind != TokenKind::EndOfInput {
            if let Some(statement) = self.parse_statement()? {
                program.statements.push(statement);
            }
        }
        Ok(program)
    }

    fn peek(&self) -> &Token {
        self.tokens.get(self.position).unwrap_or(&self.sentinel)
    }

    fn advance(&mut self) -> Token {
        self.advances += 1;
        match self.tokens.get(self.position) {
            Some(token) => {
                self.position += 1;
                token.clone()
            }
            None => self.sentinel.clone(),
        }
    }

    fn skip_newlines(&mut self) {
        while self.peek().kind == TokenKind::Newline {
            self.advance();
        }
    }

    fn expect_symbol(
        &mut self,
        symbol: char,
        expected: &'static str,
        context: &'static str,
    ) -> Result<Token, ParseError> {
        let token = self.advance();
        if token.is_symbol(symbol) {
            Ok(token)
        } else {
            Err(ParseError::Expected {
                expected,
                context,
                found: token.describe(),
                line: token.line,
            })
        }
    }

    fn expect_identifier(
        &mut self,
        expected: &'static str,
        context: &'static str,
    ) -> Result<String, ParseError> {
        let token = self.advance();
        if token.kind == TokenKind::Identifier {
            Ok(token.text)
        } else {
            Err(ParseError::Expected {
                expected,
                context,
                found: token.describe(),
                line: token.line,
            })
        }
    }

    /// Parses one statement. Returns `None` after skipping exactly one token
    /// when the statement start is not recognized, or without consuming
    /// anything at end of input.
    fn parse_statement(&mut self) -> Result<Option<Statement>, ParseError> {
        self.skip_newlines();

        let token = self.peek().clone();
        trace!(?token, position = self.position, "Parsing statement");

        let statement = match token.kind {
            TokenKind::EndOfInput => return Ok(None),
            TokenKind::Keyword(Keyword::Function) => self.parse_function()?,
            TokenKind::Keyword(Keyword::Start) => self.parse_start()?,
            TokenKind::Keyword(Keyword::Say) => self.parse_say()?,
            TokenKind::Keyword(Keyword::Set) => self.parse_set()?,
            TokenKind::Identifier => self.parse_call(),
            // Reserved keywords, stray symbols and literals, and `end` outside
            // a block have no statement form.
            _ => {
                let skipped = self.advance();
                trace!(?skipped, "Skipping unrecognized statement start");
                return Ok(None);
            }
        };
        Ok(Some(statement))
    }

    fn parse_block(&mut self, opened_at: u32) -> Result<Vec<Statement>, ParseError> {
        let mut body = vec![];
        let mut iterations = 0_usize;

        loop {
            self.skip_newlines();

            let token = self.peek();
            if token.is_keyword(Keyword::End) {
                self.advance();
                return Ok(body);
            }
            if token.kind == TokenKind::EndOfInput {
                return Err(ParseError::UnclosedBlock {
                    opened_at,
                    line: token.line,
                });
            }

            if let Some(statement) = self.parse_statement()? {
                body.push(statement);
            }

            iterations += 1;
            if iterations > self.options.max_block_statements {
                return Err(ParseError::BlockLimitExceeded {
                    limit: self.options.max_block_statements,
                    line: self.peek().line,
                });
            }
        }
    }

    fn parse_function(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance();
        let name = self.expect_identifier("function name", "after `function`")?;

        let next = self.advance();
        let parameter = if next.is_symbol(':') {
            None
        } else if next.kind == TokenKind::Identifier {
            self.expect_symbol(':', "`:`", "after function parameter")?;
            Some(next.text)
        } else {
            return Err(ParseError::Expected {
                expected: "`:` or a parameter name",
                context: "in function definition",
                found: next.describe(),
                line: next.line,
            });
        };

        trace!(%name, ?parameter, "Parsing function body");
        let body = self.parse_block(keyword.line)?;
        Ok(Statement::FunctionDef {
            name,
            parameter,
            body,
        })
    }

    fn parse_start(&mut self) -> Result<Statement, ParseError> {
        let keyword = self.advance();
        self.expect_symbol(':', "`:`", "after `start`")?;
        let body = self.parse_block(keyword.line)?;
        Ok(Statement::StartBlock { body })
    }

    fn parse_say(&mut self) -> Result<Statement, ParseError> {
        self.advance();

        let mut fragments = vec![];
        let mut terminator = DEFAULT_TERMINATOR.to_string();

        loop {
            let next = self.peek().clone();
            trace!(?next, "Parsing say fragment");

            match next.kind {
                TokenKind::Keyword(Keyword::End) => {
                    self.advance();
                    self.expect_symbol('=', "`=`", "after `end` in say statement")?;
                    let value = self.advance();
                    if value.kind != TokenKind::StringLiteral {
                        return Err(ParseError::Expected {
                            expected: "a string literal",
                            context: "after `end=`",
                            found: value.describe(),
                            line: value.line,
                        });
                    }
                    terminator = value.text;
                    break;
                }
                TokenKind::Newline | TokenKind::EndOfInput => {
                    self.advance();
                    break;
                }
                TokenKind::StringLiteral | TokenKind::Identifier => {
                    let token = self.advance();
                    fragments.extend(Operand::from_token(token));
                    if self.peek().is_symbol(',') {
                        self.advance();
                    }
                }
                _ => {
                    return Err(ParseError::UnexpectedToken {
                        found: next.describe(),
                        context: "say statement",
                        line: next.line,
                    });
                }
            }
        }

        Ok(Statement::Say {
            fragments,
            terminator,
        })
    }

    fn parse_set(&mut self) -> Result<Statement, ParseError> {
        self.advance();
        let name = self.expect_identifier("a variable name", "after `set`")?;
        Ok(Statement::Set { name })
    }

    fn parse_call(&mut self) -> Statement {
        let callee = self.advance().text;
        let next_kind = self.peek().kind;
        let argument = match next_kind {
            TokenKind::StringLiteral | TokenKind::Identifier => {
                let token = self.advance();
                trace!(?token, "Parsed call argument");
                Operand::from_token(token)
            }
            _ => None,
        };
        Statement::Call { callee, argument }
    }
}

pub fn parse(tokens: Vec<Token>) -> Result<Program, ParseError> {
    Parser::new(tokens).parse_program()
}
