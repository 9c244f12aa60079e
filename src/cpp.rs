//! A minimal model of the C++ subset herc emits, rendered through
//! [`fmt::Display`].

use std::fmt;

const INDENT: &str = "    ";

/// Escapes `"` and `\` so the text can sit inside a C++ string literal. No
/// other characters are touched.
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    /// A string literal, quoted and escaped on output.
    Str(String),
    /// A bare identifier reference.
    Var(String),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "\"{}\"", escape_string(s)),
            Value::Var(name) => write!(f, "{name}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Statement {
    /// `std::cout << a << b << std::endl;`. Without a line end the last value
    /// closes the chain.
    Print { values: Vec<Value>, line_end: bool },
    /// `auto name = 0;`
    DeclareZero { name: String },
    /// `callee(arg);`
    Call {
        callee: String,
        argument: Option<Value>,
    },
    Function(Function),
    Main(Main),
}

impl Statement {
    fn write_indented(&self, f: &mut fmt::Formatter, level: usize) -> fmt::Result {
        match self {
            Statement::Print { values, line_end } => {
                write!(f, "{}std::cout", indent(level))?;
                for value in values {
                    write!(f, " << {value}")?;
                }
                if *line_end {
                    write!(f, " << std::endl")?;
                }
                writeln!(f, ";")
            }
            Statement::DeclareZero { name } => writeln!(f, "{}auto {name} = 0;", indent(level)),
            Statement::Call { callee, argument } => {
                write!(f, "{}{callee}(", indent(level))?;
                if let Some(argument) = argument {
                    write!(f, "{argument}")?;
                }
                writeln!(f, ");")
            }
            Statement::Function(function) => function.write_indented(f, level),
            Statement::Main(main) => main.write_indented(f, level),
        }
    }
}

/// A `void` procedure taking at most one `auto` parameter. Header and closing
/// brace always start in column zero, only the body follows the nesting depth.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Function {
    pub name: String,
    pub parameter: Option<String>,
    pub body: Vec<Statement>,
}

impl Function {
    fn write_indented(&self, f: &mut fmt::Formatter, level: usize) -> fmt::Result {
        match &self.parameter {
            Some(parameter) => writeln!(f, "void {}(auto {parameter}) {{", self.name)?,
            None => writeln!(f, "void {}() {{", self.name)?,
        }
        for statement in &self.body {
            statement.write_indented(f, level + 1)?;
        }
        writeln!(f, "}}")
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// The program entry point. Switches the Windows console to UTF-8 before
/// running its body and always returns success.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Main {
    pub body: Vec<Statement>,
}

impl Main {
    fn write_indented(&self, f: &mut fmt::Formatter, level: usize) -> fmt::Result {
        writeln!(f, "int main() {{")?;
        writeln!(f, "#ifdef _WIN32")?;
        writeln!(f, "SetConsoleOutputCP(CP_UTF8);")?;
        writeln!(f, "#endif")?;
        writeln!(f)?;
        for statement in &self.body {
            statement.write_indented(f, level + 1)?;
        }
        writeln!(f, "{}return 0;", indent(level + 1))?;
        writeln!(f, "}}")
    }
}

impl fmt::Display for Main {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

/// A whole translation unit. Functions are always rendered before the entry
/// points so that every call site follows its definition.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Module {
    pub functions: Vec<Function>,
    pub entry_points: Vec<Main>,
}

impl Module {
    pub fn add_function(&mut self, function: Function) {
        self.functions.push(function);
    }

    pub fn add_entry_point(&mut self, main: Main) {
        self.entry_points.push(main);
    }
}

impl fmt::Display for Module {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "#include <iostream>")?;
        writeln!(f, "#include <string>")?;
        writeln!(f)?;
        writeln!(f, "#ifdef _WIN32")?;
        writeln!(f, "#include <windows.h>")?;
        writeln!(f, "#endif")?;
        writeln!(f)?;
        for function in &self.functions {
            writeln!(f, "{function}")?;
        }
        for main in &self.entry_points {
            writeln!(f, "{main}")?;
        }
        Ok(())
    }
}

fn indent(level: usize) -> String {
    INDENT.repeat(level)
}
