/// Mapping-template expression AST
///
/// Request and response templates are assembled as `Expr` trees and printed
/// with a fixed layout, so identical input always produces identical text.

use std::fmt::{self, Write};

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `#set( $name = value )`
    Set { name: String, value: Box<Expr> },
    /// `$path`
    Ref(String),
    /// `$target(args...)`
    Call { target: String, args: Vec<Expr> },
    /// `$util.qr(expr)`
    QuietRef(Box<Expr>),
    /// Double-quoted, interpolating string
    Str(String),
    /// Single-quoted string; never interpolated
    Literal(String),
    Int(i64),
    Raw(String),
    Obj(Vec<(String, Expr)>),
    List(Vec<Expr>),
    ForEach {
        var: String,
        iterable: Box<Expr>,
        body: Vec<Expr>,
    },
    If {
        condition: String,
        then: Vec<Expr>,
        otherwise: Option<Vec<Expr>>,
    },
    Return(Option<Box<Expr>>),
}

pub fn set(name: &str, value: Expr) -> Expr {
    Expr::Set {
        name: name.to_string(),
        value: Box::new(value),
    }
}

pub fn r(path: &str) -> Expr {
    Expr::Ref(path.to_string())
}

pub fn call(target: &str, args: Vec<Expr>) -> Expr {
    Expr::Call {
        target: target.to_string(),
        args,
    }
}

pub fn qr(expr: Expr) -> Expr {
    Expr::QuietRef(Box::new(expr))
}

pub fn string(text: impl Into<String>) -> Expr {
    Expr::Str(text.into())
}

pub fn literal(text: impl Into<String>) -> Expr {
    Expr::Literal(text.into())
}

pub fn raw(text: impl Into<String>) -> Expr {
    Expr::Raw(text.into())
}

pub fn obj(pairs: Vec<(&str, Expr)>) -> Expr {
    Expr::Obj(pairs.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
}

pub fn list(items: Vec<Expr>) -> Expr {
    Expr::List(items)
}

pub fn for_each(var: &str, iterable: Expr, body: Vec<Expr>) -> Expr {
    Expr::ForEach {
        var: var.to_string(),
        iterable: Box::new(iterable),
        body,
    }
}

pub fn if_then(condition: impl Into<String>, then: Vec<Expr>) -> Expr {
    Expr::If {
        condition: condition.into(),
        then,
        otherwise: None,
    }
}

pub fn if_else(condition: impl Into<String>, then: Vec<Expr>, otherwise: Vec<Expr>) -> Expr {
    Expr::If {
        condition: condition.into(),
        then,
        otherwise: Some(otherwise),
    }
}

pub fn ret(value: Option<Expr>) -> Expr {
    Expr::Return(value.map(Box::new))
}

/// `$util.error(message, type)`
pub fn error(message: impl Into<String>, kind: &str) -> Expr {
    call("util.error", vec![string(message), string(kind)])
}

const INDENT: &str = "  ";

impl Expr {
    fn write_statement(&self, out: &mut String, depth: usize) -> fmt::Result {
        let pad = INDENT.repeat(depth);
        match self {
            Expr::Set { name, value } => {
                writeln!(out, "{}#set( ${} = {} )", pad, name, value.inline(depth))
            }
            Expr::ForEach {
                var,
                iterable,
                body,
            } => {
                writeln!(out, "{}#foreach( ${} in {} )", pad, var, iterable.inline(depth))?;
                for statement in body {
                    statement.write_statement(out, depth + 1)?;
                }
                writeln!(out, "{}#end", pad)
            }
            Expr::If {
                condition,
                then,
                otherwise,
            } => {
                writeln!(out, "{}#if( {} )", pad, condition)?;
                for statement in then {
                    statement.write_statement(out, depth + 1)?;
                }
                if let Some(otherwise) = otherwise {
                    writeln!(out, "{}#else", pad)?;
                    for statement in otherwise {
                        statement.write_statement(out, depth + 1)?;
                    }
                }
                writeln!(out, "{}#end", pad)
            }
            Expr::Return(None) => writeln!(out, "{}#return", pad),
            Expr::Return(Some(value)) => writeln!(out, "{}#return( {} )", pad, value.inline(depth)),
            other => writeln!(out, "{}{}", pad, other.inline(depth)),
        }
    }

    fn inline(&self, depth: usize) -> String {
        match self {
            Expr::Ref(path) => format!("${}", path),
            Expr::Call { target, args } => {
                let args = args
                    .iter()
                    .map(|a| a.inline(depth))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("${}({})", target, args)
            }
            Expr::QuietRef(inner) => format!("$util.qr({})", inner.inline(depth)),
            Expr::Str(text) => format!("\"{}\"", text.replace('"', "\"\"")),
            Expr::Literal(text) => format!("'{}'", text.replace('\'', "''")),
            Expr::Int(value) => value.to_string(),
            Expr::Raw(text) => text.clone(),
            Expr::List(items) => {
                let items = items
                    .iter()
                    .map(|i| i.inline(depth))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("[{}]", items)
            }
            Expr::Obj(pairs) if pairs.is_empty() => "{}".to_string(),
            Expr::Obj(pairs) => {
                let inner = INDENT.repeat(depth + 1);
                let body = pairs
                    .iter()
                    .map(|(key, value)| format!("{}\"{}\": {}", inner, key, value.inline(depth + 1)))
                    .collect::<Vec<_>>()
                    .join(",\n");
                format!("{{\n{}\n{}}}", body, INDENT.repeat(depth))
            }
            statement => {
                let mut out = String::new();
                // Writing into a String cannot fail
                let _ = statement.write_statement(&mut out, depth);
                out.trim_end().to_string()
            }
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_statement(&mut out, 0)?;
        f.write_str(&out)
    }
}

/// A whole template: statements printed in order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Template {
    statements: Vec<Expr>,
}

impl Template {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, statement: Expr) {
        self.statements.push(statement);
    }

    pub fn extend(&mut self, statements: impl IntoIterator<Item = Expr>) {
        self.statements.extend(statements);
    }
}

impl fmt::Display for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for statement in &self.statements {
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}
