use tracing::trace;

use crate::cpp;
use crate::parser::{Operand, Program, Statement, DEFAULT_TERMINATOR};

/// Lowers a parsed program into a C++ module.
///
/// Function definitions are emitted ahead of start blocks, each group in
/// source order. Top-level statements outside any block have no place in the
/// translation unit and are dropped.
#[tracing::instrument(level = "trace", skip_all)]
pub fn compile(program: &Program) -> cpp::Module {
    let mut module = cpp::Module::default();

    for statement in program.functions() {
        if let Statement::FunctionDef {
            name,
            parameter,
            body,
        } = statement
        {
            module.add_function(lower_function(name, parameter.as_deref(), body));
        }
    }

    for statement in program.start_blocks() {
        if let Statement::StartBlock { body } = statement {
            module.add_entry_point(lower_main(body));
        }
    }

    trace!(
        functions = module.functions.len(),
        entry_points = module.entry_points.len(),
        "Lowered program"
    );
    module
}

/// Renders the C++ translation unit for `program`.
pub fn generate(program: &Program) -> String {
    compile(program).to_string()
}

fn lower_function(name: &str, parameter: Option<&str>, body: &[Statement]) -> cpp::Function {
    cpp::Function {
        name: name.to_string(),
        parameter: parameter.map(str::to_string),
        body: lower_body(body),
    }
}

fn lower_main(body: &[Statement]) -> cpp::Main {
    cpp::Main {
        body: lower_body(body),
    }
}

fn lower_body(body: &[Statement]) -> Vec<cpp::Statement> {
    body.iter().map(lower_statement).collect()
}

fn lower_statement(statement: &Statement) -> cpp::Statement {
    match statement {
        Statement::Say {
            fragments,
            terminator,
        } => {
            let mut values = fragments.iter().map(lower_operand).collect::<Vec<_>>();
            let line_end = terminator == DEFAULT_TERMINATOR;
            if !line_end {
                values.push(cpp::Value::Str(terminator.clone()));
            }
            cpp::Statement::Print { values, line_end }
        }
        Statement::Set { name } => cpp::Statement::DeclareZero { name: name.clone() },
        Statement::Call { callee, argument } => cpp::Statement::Call {
            callee: callee.clone(),
            argument: argument.as_ref().map(lower_operand),
        },
        Statement::FunctionDef {
            name,
            parameter,
            body,
        } => cpp::Statement::Function(lower_function(name, parameter.as_deref(), body)),
        Statement::StartBlock { body } => cpp::Statement::Main(lower_main(body)),
    }
}

fn lower_operand(operand: &Operand) -> cpp::Value {
    match operand {
        Operand::Literal(text) => cpp::Value::Str(text.clone()),
        Operand::Variable(name) => cpp::Value::Var(name.clone()),
    }
}
