//! herc: a transpiler from the herc scripting notation to C++.
//!
//! The pipeline runs strictly forward: [`tokenizer`] → [`parser`] →
//! [`cpp_backend`] (which builds a [`cpp::Module`] and renders it). Each
//! stage is usable on its own; [`compile`] chains all three.

pub mod cpp;
pub mod cpp_backend;
pub mod diagnostics;
pub mod indentation;
pub mod parser;
pub mod tokenizer;

use tracing::debug;

use crate::parser::{Parser, ParserOptions, Program, DEFAULT_MAX_BLOCK_STATEMENTS};
use crate::tokenizer::{LexError, Token};

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("lex error: {0}")]
    Lex(#[from] LexError),
    #[error("parse error: {0}")]
    Parse(#[from] parser::ParseError),
}

impl CompileError {
    /// 1-based source line the error was detected on.
    pub fn line(&self) -> u32 {
        match self {
            CompileError::Lex(err) => err.line,
            CompileError::Parse(err) => err.line(),
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct CompileOptions {
    pub max_block_statements: usize,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            max_block_statements: DEFAULT_MAX_BLOCK_STATEMENTS,
        }
    }
}

impl From<&CompileOptions> for ParserOptions {
    fn from(options: &CompileOptions) -> Self {
        ParserOptions {
            max_block_statements: options.max_block_statements,
        }
    }
}

/// Translates a complete source program into C++ source text.
pub fn compile(source: &str) -> Result<String, CompileError> {
    compile_with_options(source, &CompileOptions::default())
}

#[tracing::instrument(level = "trace", skip_all)]
pub fn compile_with_options(
    source: &str,
    options: &CompileOptions,
) -> Result<String, CompileError> {
    let tokens = tokenize(source)?;
    let program = parse_with_options(tokens, options)?;
    Ok(cpp_backend::generate(&program))
}

/// First stage: source text to tokens.
pub fn tokenize(source: &str) -> Result<Vec<Token>, CompileError> {
    let tokens = tokenizer::tokenize(source)?;
    debug!(tokens = tokens.len(), "Tokenized source");
    Ok(tokens)
}

/// Second stage: tokens to a program, honouring the parser limits in
/// `options`.
pub fn parse_with_options(
    tokens: Vec<Token>,
    options: &CompileOptions,
) -> Result<Program, CompileError> {
    let program = Parser::with_options(tokens, options.into()).parse_program()?;
    debug!(statements = program.statements.len(), "Parsed program");
    Ok(program)
}
