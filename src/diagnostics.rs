use std::fmt;
use std::io::IsTerminal;
use std::ops::Range;
use std::path::Path;

use ariadne::{sources, Config, Label, Report, ReportKind};

use crate::parser::ParseError;
use crate::CompileError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticStage {
    Tokenize,
    Parse,
    Internal,
}

impl fmt::Display for DiagnosticStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticStage::Tokenize => "tokenize",
            DiagnosticStage::Parse => "parse",
            DiagnosticStage::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// A labelled character range of the diagnostic's source file.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SourceLabel {
    pub span: Range<usize>,
    pub message: String,
}

/// A single-file error report. herc compiles one source file per run, so a
/// diagnostic carries that file's name and text instead of a source map.
#[derive(Clone, Debug)]
pub struct CompilerDiagnostic {
    pub code: String,
    pub stage: DiagnosticStage,
    pub message: String,
    pub file_id: String,
    pub source: String,
    pub labels: Vec<SourceLabel>,
    pub notes: Vec<String>,
    pub help: Option<String>,
}

impl CompilerDiagnostic {
    pub fn new(
        code: impl Into<String>,
        stage: DiagnosticStage,
        message: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            stage,
            message: message.into(),
            file_id: file_id_from_path(None),
            source: String::new(),
            labels: Vec::new(),
            notes: Vec::new(),
            help: None,
        }
    }

    pub fn with_source(mut self, file_id: impl Into<String>, source: impl Into<String>) -> Self {
        self.file_id = file_id.into();
        self.source = source.into();
        self
    }

    /// Labels the trimmed contents of a 1-based source line. The label text
    /// names the line so it survives even when the span falls back to the end
    /// of the file.
    pub fn with_line_label(mut self, line: u32, message: impl fmt::Display) -> Self {
        let text = message.to_string();
        let message = if text.starts_with(&format!("line {line}:")) {
            text
        } else {
            format!("line {line}: {text}")
        };
        self.labels.push(SourceLabel {
            span: span_from_line(&self.source, line),
            message,
        });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    pub fn render_plain(&self) -> String {
        self.render_with_color(false)
    }

    pub fn render_terminal_auto(&self) -> String {
        self.render_with_color(std::io::stderr().is_terminal())
    }

    fn render_with_color(&self, use_color: bool) -> String {
        let primary_span = self
            .labels
            .first()
            .map(|label| sanitize_span(&label.span))
            .unwrap_or(0..1);

        let mut report = Report::build(ReportKind::Error, (self.file_id.clone(), primary_span))
            .with_code(self.code.clone())
            .with_message(format!("error[{}:{}]: {}", self.stage, self.code, self.message))
            .with_config(Config::default().with_color(use_color));

        for label in &self.labels {
            report = report.with_label(
                Label::new((self.file_id.clone(), sanitize_span(&label.span)))
                    .with_message(label.message.clone()),
            );
        }

        for note in &self.notes {
            report = report.with_note(note.clone());
        }

        if let Some(help) = &self.help {
            report = report.with_help(help.clone());
        }

        let mut output = Vec::new();
        let cache = sources(vec![(self.file_id.clone(), self.source.clone())]);
        match report.finish().write(cache, &mut output) {
            Ok(()) => String::from_utf8_lossy(&output).trim_end().to_string(),
            Err(_) => self.fallback_render(),
        }
    }

    /// Compiler-style `file:line: message` text, used when ariadne cannot
    /// render the report.
    fn fallback_render(&self) -> String {
        let mut out = format!("error[{}:{}]: {}", self.stage, self.code, self.message);
        for label in &self.labels {
            out.push_str(&format!("\n{}: {}", self.file_id, label.message));
        }
        for note in &self.notes {
            out.push_str(&format!("\nnote: {note}"));
        }
        if let Some(help) = &self.help {
            out.push_str(&format!("\nhelp: {help}"));
        }
        out
    }
}

impl fmt::Display for CompilerDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_plain())
    }
}

pub fn diagnostic_from_compile_error(
    source: &str,
    source_path: Option<&Path>,
    error: &CompileError,
) -> CompilerDiagnostic {
    let (code, stage, message) = match error {
        CompileError::Lex(_) => {
            ("HERC-TOKENIZE-001", DiagnosticStage::Tokenize, "tokenization failed")
        }
        CompileError::Parse(err) if err.is_internal() => {
            ("HERC-ICE-001", DiagnosticStage::Internal, "internal compiler error")
        }
        CompileError::Parse(_) => ("HERC-PARSE-001", DiagnosticStage::Parse, "parse failed"),
    };

    let label = match error {
        CompileError::Lex(err) => err.to_string(),
        CompileError::Parse(err) => err.to_string(),
    };
    let mut diagnostic = CompilerDiagnostic::new(code, stage, message)
        .with_source(file_id_from_path(source_path), source)
        .with_line_label(error.line(), label);

    match error {
        CompileError::Parse(ParseError::UnclosedBlock { opened_at, .. }) => {
            diagnostic = diagnostic.with_help(format!(
                "add `end` to close the block opened at line {opened_at}"
            ));
        }
        CompileError::Parse(ParseError::BlockLimitExceeded { limit, .. }) => {
            diagnostic = diagnostic.with_help(format!(
                "raise --max-block-statements above {limit} or split the block"
            ));
        }
        _ => {}
    }

    diagnostic
}

pub fn file_id_from_path(path: Option<&Path>) -> String {
    path.map(|value| value.display().to_string())
        .unwrap_or_else(|| "<memory>".to_string())
}

/// Character span of the trimmed contents of a 1-based line. Falls back to
/// the end of the source when the line does not exist or is blank.
pub fn span_from_line(source: &str, line_1_based: u32) -> Range<usize> {
    let mut offset = 0_usize;
    for (index, line) in source.split('\n').enumerate() {
        let len = line.chars().count();
        if index as u32 + 1 == line_1_based {
            let leading = line.chars().take_while(|c| c.is_whitespace()).count();
            let trimmed = line.trim().chars().count();
            if trimmed > 0 {
                return offset + leading..offset + leading + trimmed;
            }
            break;
        }
        offset += len + 1;
    }
    let end = source.chars().count();
    end..end
}

pub fn sanitize_span(span: &Range<usize>) -> Range<usize> {
    if span.end <= span.start {
        span.start..span.start.saturating_add(1)
    } else {
        span.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compile;

    #[test]
    fn lex_error_labels_the_offending_line() {
        let source = "start:\n    say \"ok\"\n    say \"oops\nend\n";
        let err = compile(source).expect_err("should fail");
        let diagnostic = diagnostic_from_compile_error(source, None, &err);
        assert_eq!(diagnostic.stage, DiagnosticStage::Tokenize);
        assert_eq!(diagnostic.labels.len(), 1);
        let span = diagnostic.labels[0].span.clone();
        let labelled = source
            .chars()
            .skip(span.start)
            .take(span.end - span.start)
            .collect::<String>();
        assert_eq!(labelled, "say \"oops");
    }

    #[test]
    fn unclosed_block_gets_help() {
        let source = "start:\n    say \"hi\"\n";
        let err = compile(source).expect_err("should fail");
        let diagnostic = diagnostic_from_compile_error(source, Some(Path::new("hi.herc")), &err);
        assert_eq!(diagnostic.code, "HERC-PARSE-001");
        assert_eq!(
            diagnostic.help.as_deref(),
            Some("add `end` to close the block opened at line 1")
        );
        let text = diagnostic.render_plain();
        assert!(text.contains("HERC-PARSE-001"), "{text}");
        assert!(text.contains("hi.herc"), "{text}");
    }

    #[test]
    fn line_number_lives_in_the_label() {
        let source = "start:\n    say \"a\" = \"b\"\nend\n";
        let err = compile(source).expect_err("should fail");
        let diagnostic = diagnostic_from_compile_error(source, None, &err);
        assert_eq!(diagnostic.file_id, "<memory>");
        assert!(diagnostic.notes.is_empty(), "{:?}", diagnostic.notes);
        assert!(
            diagnostic.labels[0].message.starts_with("line 2: "),
            "{}",
            diagnostic.labels[0].message
        );

        let labelled = CompilerDiagnostic::new("HERC-PARSE-001", DiagnosticStage::Parse, "x")
            .with_source("a.herc", "one\n")
            .with_line_label(9, "missing");
        assert_eq!(labelled.labels[0].message, "line 9: missing");
        assert_eq!(labelled.labels[0].span, 4..4);
    }

    #[test]
    fn block_limit_suggests_the_cli_flag() {
        let source = "start:\n    a\n    b\nend\n";
        let options = crate::CompileOptions {
            max_block_statements: 1,
        };
        let err = crate::compile_with_options(source, &options).expect_err("limit");
        let diagnostic = diagnostic_from_compile_error(source, None, &err);
        assert_eq!(diagnostic.stage, DiagnosticStage::Internal);
        assert!(diagnostic
            .help
            .as_deref()
            .is_some_and(|help| help.contains("--max-block-statements")));
    }

    #[test]
    fn plain_rendering_does_not_contain_ansi_sequences() {
        let diagnostic =
            CompilerDiagnostic::new("HERC-PARSE-001", DiagnosticStage::Parse, "parse failed")
                .with_note("unexpected token");
        let text = diagnostic.render_plain();
        assert!(!text.contains("\u{1b}["));
        assert!(text.contains("parse failed"));
    }

    #[test]
    fn span_of_missing_line_points_at_end_of_source() {
        assert_eq!(span_from_line("abc\n", 7), 4..4);
        assert_eq!(span_from_line("a\n  bé c  \n", 2), 4..8);
    }
}
