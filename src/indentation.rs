//! Best-effort indentation advice.
//!
//! The parser never looks at indentation, so nothing here can fail a
//! compilation. The checker only flags layouts that are likely to mislead a
//! reader: bodies not indented past their header and `end` lines that do not
//! line up with the block they close.

use std::fmt;

/// First words that open an indented block.
const BLOCK_OPENERS: &[&str] = &["function", "start", "if", "elif", "else"];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IndentationWarning {
    EndWithoutBlock { line: u32 },
    EndIndentMismatch { line: u32, expected: usize, found: usize },
    InsufficientIndent { line: u32, expected: usize, found: usize },
    UnclosedBlocks { count: usize },
}

impl fmt::Display for IndentationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndentationWarning::EndWithoutBlock { line } => {
                write!(f, "line {line}: 'end' without matching block start")
            }
            IndentationWarning::EndIndentMismatch {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {line}: 'end' indentation mismatch, \
                 expected {expected} spaces but got {found}"
            ),
            IndentationWarning::InsufficientIndent {
                line,
                expected,
                found,
            } => write!(
                f,
                "line {line}: inconsistent indentation, \
                 expected more than {expected} spaces but got {found}"
            ),
            IndentationWarning::UnclosedBlocks { count } => {
                write!(f, "end of file: {count} block(s) not closed with 'end'")
            }
        }
    }
}

#[tracing::instrument(level = "trace", skip_all)]
pub fn check_indentation(source: &str) -> Vec<IndentationWarning> {
    let mut warnings = vec![];
    // Indentation of every open block header.
    let mut open_blocks: Vec<usize> = vec![];

    for (index, raw_line) in source.lines().enumerate() {
        let line = index as u32 + 1;
        let trimmed = raw_line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let indent = raw_line.chars().take_while(|&c| c == ' ').count();

        if trimmed == "end" {
            match open_blocks.pop() {
                None => warnings.push(IndentationWarning::EndWithoutBlock { line }),
                Some(expected) if expected != indent => {
                    warnings.push(IndentationWarning::EndIndentMismatch {
                        line,
                        expected,
                        found: indent,
                    })
                }
                Some(_) => {}
            }
        } else if opens_block(trimmed) {
            open_blocks.push(indent);
        } else if let Some(&expected) = open_blocks.last() {
            if indent <= expected {
                warnings.push(IndentationWarning::InsufficientIndent {
                    line,
                    expected,
                    found: indent,
                });
            }
        }
    }

    if !open_blocks.is_empty() {
        warnings.push(IndentationWarning::UnclosedBlocks {
            count: open_blocks.len(),
        });
    }

    warnings
}

fn opens_block(trimmed: &str) -> bool {
    let first_word = trimmed
        .split(|c: char| c.is_whitespace() || c == ':')
        .next()
        .unwrap_or_default();
    BLOCK_OPENERS.contains(&first_word)
}
