use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser as _;
use tracing::{debug, info, trace};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

use herc::diagnostics::{diagnostic_from_compile_error, CompilerDiagnostic};
use herc::parser::DEFAULT_MAX_BLOCK_STATEMENTS;
use herc::{cpp_backend, indentation, CompileError, CompileOptions};

fn main() -> anyhow::Result<()> {
    initialize_logging();

    let herc = Herc::parse();

    let outcome = match herc.subcmd {
        HercSubcommand::Build(build) => run_build(&build)?,
        HercSubcommand::Check(check) => run_check(&check)?,
    };

    if let Err(diagnostic) = outcome {
        eprintln!("{}", diagnostic.render_terminal_auto());
        std::process::exit(1);
    }

    Ok(())
}

/// Outer `Err` is an I/O problem, inner `Err` a rejected program.
type Outcome = anyhow::Result<Result<(), CompilerDiagnostic>>;

fn run_build(build: &Build) -> Outcome {
    let cpp_code = match compile_file(
        &build.source,
        &build.common,
        build.emit_intermediates.as_deref(),
    )? {
        Ok(cpp_code) => cpp_code,
        Err(diagnostic) => return Ok(Err(diagnostic)),
    };

    // Written only once the whole pipeline succeeded.
    std::fs::write(&build.output, cpp_code)
        .with_context(|| format!("cannot write to output file {}", build.output.display()))?;
    info!(output = %build.output.display(), "C++ source written");
    println!("Compilation successful: {}", build.output.display());
    Ok(Ok(()))
}

fn run_check(check: &Check) -> Outcome {
    let result = compile_file(&check.source, &check.common, None)?;
    Ok(result.map(|_| {
        println!("No errors in {}", check.source.display());
    }))
}

fn compile_file(
    source_path: &Path,
    common: &CommonOpts,
    intermediates_dir: Option<&Path>,
) -> anyhow::Result<Result<String, CompilerDiagnostic>> {
    let source = std::fs::read_to_string(source_path)
        .with_context(|| format!("cannot open input file {}", source_path.display()))?;
    trace!(source_len = source.len(), "Read input file");

    if !common.no_indent_check {
        for warning in indentation::check_indentation(&source) {
            eprintln!("warning: {warning}");
        }
    }

    if let Some(dir) = intermediates_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create directory {}", dir.display()))?;
    }

    let to_diagnostic =
        |err: CompileError| diagnostic_from_compile_error(&source, Some(source_path), &err);

    let options = CompileOptions::from(common);

    let tokens = match herc::tokenize(&source) {
        Ok(tokens) => tokens,
        Err(err) => return Ok(Err(to_diagnostic(err))),
    };
    if let Some(dir) = intermediates_dir {
        let tokens_path = dir.join("tokens.json");
        std::fs::write(&tokens_path, serde_json::to_string_pretty(&tokens)?)?;
        trace!(tokens_path = %tokens_path.display(), "Tokenized source file");
    }

    let program = match herc::parse_with_options(tokens, &options) {
        Ok(program) => program,
        Err(err) => return Ok(Err(to_diagnostic(err))),
    };
    if let Some(dir) = intermediates_dir {
        let ast_path = dir.join("ast.json");
        std::fs::write(&ast_path, serde_json::to_string_pretty(&program)?)?;
        debug!(ast_path = %ast_path.display(), "Parsed source file");
    }

    Ok(Ok(cpp_backend::generate(&program)))
}

fn initialize_logging() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(env_filter),
        )
        .init();
}

#[derive(clap::Parser)]
#[clap(name = "herc", about = "Translate herc programs to C++.")]
struct Herc {
    #[clap(subcommand)]
    subcmd: HercSubcommand,
}

#[derive(clap::Subcommand)]
enum HercSubcommand {
    /// Compile a source file and write the generated C++.
    Build(Build),
    /// Validate a source file without writing anything.
    Check(Check),
}

#[derive(clap::Args)]
struct CommonOpts {
    /// Internal safety limit on statements parsed per block
    #[clap(long, default_value_t = DEFAULT_MAX_BLOCK_STATEMENTS)]
    max_block_statements: usize,

    /// Skip the advisory indentation warnings
    #[clap(long)]
    no_indent_check: bool,
}

impl From<&CommonOpts> for CompileOptions {
    fn from(common: &CommonOpts) -> Self {
        CompileOptions {
            max_block_statements: common.max_block_statements,
        }
    }
}

#[derive(clap::Parser)]
struct Build {
    /// Path to the herc source file
    source: PathBuf,

    /// Path of the C++ file to write
    output: PathBuf,

    /// Also write tokens.json and ast.json into this directory
    #[clap(long)]
    emit_intermediates: Option<PathBuf>,

    #[clap(flatten)]
    common: CommonOpts,
}

#[derive(clap::Parser)]
struct Check {
    /// Path to the herc source file
    source: PathBuf,

    #[clap(flatten)]
    common: CommonOpts,
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;

    fn common() -> CommonOpts {
        CommonOpts {
            max_block_statements: DEFAULT_MAX_BLOCK_STATEMENTS,
            no_indent_check: true,
        }
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Herc::command().debug_assert();
    }

    #[test]
    fn build_writes_output_and_intermediates() {
        let tmp = tempfile::tempdir().expect("create tempdir");
        let source = tmp.path().join("hello.herc");
        let output = tmp.path().join("hello.cpp");
        let intermediates = tmp.path().join("target").join("herc");
        fs::write(&source, "start:\n    say \"hello\"\nend\n").expect("write source");

        let build = Build {
            source,
            output: output.clone(),
            emit_intermediates: Some(intermediates.clone()),
            common: common(),
        };
        run_build(&build).expect("io").expect("compiles");

        let cpp = fs::read_to_string(&output).expect("read output");
        assert!(cpp.contains("std::cout << \"hello\" << std::endl;"), "{cpp}");

        let tokens: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(intermediates.join("tokens.json")).expect("read tokens"),
        )
        .expect("tokens json");
        assert_eq!(tokens.as_array().map(Vec::len), Some(9));

        let ast: serde_json::Value = serde_json::from_str(
            &fs::read_to_string(intermediates.join("ast.json")).expect("read ast"),
        )
        .expect("ast json");
        assert!(ast["statements"][0]["StartBlock"].is_object(), "{ast}");
    }

    #[test]
    fn failed_build_writes_no_output() {
        let tmp = tempfile::tempdir().expect("create tempdir");
        let source = tmp.path().join("broken.herc");
        let output = tmp.path().join("broken.cpp");
        fs::write(&source, "start:\n    say \"hi\"\n").expect("write source");

        let build = Build {
            source,
            output: output.clone(),
            emit_intermediates: None,
            common: common(),
        };
        let diagnostic = run_build(&build).expect("io").expect_err("should be rejected");
        assert_eq!(diagnostic.code, "HERC-PARSE-001");
        assert!(!output.exists());
    }

    #[test]
    fn missing_source_is_an_io_error() {
        let tmp = tempfile::tempdir().expect("create tempdir");
        let check = Check {
            source: tmp.path().join("missing.herc"),
            common: common(),
        };
        let err = run_check(&check).expect_err("should fail to read");
        assert!(err.to_string().contains("cannot open input file"), "{err}");
    }

    #[test]
    fn check_honours_block_limit() {
        let tmp = tempfile::tempdir().expect("create tempdir");
        let source = tmp.path().join("long.herc");
        fs::write(&source, "start:\n    a\n    b\n    c\nend\n").expect("write source");

        let check = Check {
            source,
            common: CommonOpts {
                max_block_statements: 2,
                no_indent_check: true,
            },
        };
        let diagnostic = run_check(&check).expect("io").expect_err("limit trips");
        assert_eq!(diagnostic.code, "HERC-ICE-001");
    }

    #[test]
    fn build_output_matches_library_compile() {
        let program = "function f x:\n    say x\nend\nstart:\n    f \"a\"\nend\n";
        let tmp = tempfile::tempdir().expect("create tempdir");
        let source = tmp.path().join("f.herc");
        let output = tmp.path().join("f.cpp");
        fs::write(&source, program).expect("write source");

        let build = Build {
            source,
            output: output.clone(),
            emit_intermediates: None,
            common: common(),
        };
        run_build(&build).expect("io").expect("compiles");

        let options = CompileOptions::from(&build.common);
        assert_eq!(options.max_block_statements, CompileOptions::default().max_block_statements);
        let expected = herc::compile_with_options(program, &options).expect("compile");
        assert_eq!(fs::read_to_string(&output).expect("read output"), expected);
    }
}
