//! Embedded CCL evaluator.
//!
//! CCL is a constraint-oriented configuration language: every value is
//! simultaneously data and a type.  This module provides the small slice of
//! an evaluator the translation pipeline consumes: compiling source text
//! into a value tree, field iteration, kind queries, operator expansion,
//! canonical formatting, and subsumption.
//!
//! The evaluator does not resolve cross-definition references or
//! attributes; unresolved identifiers evaluate as the top type.

pub mod ast;
pub mod format;
pub mod kind;
pub mod lexer;
pub mod parser;
pub mod value;

use std::fmt;

pub use ast::{Expr, Op};
pub use kind::Kind;
pub use value::{FieldInfo, FieldOptions, Value};

/// Error raised by the evaluator: lexing, parsing, or a semantic query
/// applied to a value of the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Error {
    message: String,
}

impl Error {
    pub fn new(message: impl Into<String>) -> Self {
        Error {
            message: message.into(),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Error {}

/// An evaluator instance.  Cheap to construct; callers create a fresh one
/// per top-level operation so no state leaks between requests.
#[derive(Debug, Default)]
pub struct Runtime;

impl Runtime {
    pub fn new() -> Self {
        Runtime
    }

    /// Compile a unit of CCL source text.  `name` identifies the unit in
    /// diagnostics.
    pub fn compile(&self, name: &str, src: &str) -> Result<Instance, Error> {
        let unit = parser::parse_file(src)
            .map_err(|e| Error::new(format!("{name}: {e}")))?;
        Ok(Instance {
            value: Value::new(Expr::Struct(unit)),
        })
    }
}

/// A compiled unit: a struct value holding the unit's top-level fields.
#[derive(Debug, Clone)]
pub struct Instance {
    value: Value,
}

impl Instance {
    pub fn value(&self) -> Value {
        self.value.clone()
    }
}

/// Parse a single expression into a value, e.g. `{ a: int }`.
pub fn parse_value(src: &str) -> Result<Value, Error> {
    Ok(Value::new(parser::parse_expr_str(src)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compile_yields_struct_of_definitions() {
        let r = Runtime::new();
        let inst = r.compile(".", "#Event: { name: string }").unwrap();
        let v = inst.value();
        assert_eq!(v.incomplete_kind(), Kind::STRUCT);
        let fields = v.fields(FieldOptions::default()).unwrap();
        assert_eq!(fields.len(), 1);
        assert_eq!(fields[0].label, "#Event");
        assert!(fields[0].definition);
    }

    #[test]
    fn compile_errors_carry_the_unit_name() {
        let r = Runtime::new();
        let err = r.compile("unit.ccl", "#Bad: }").unwrap_err();
        assert!(err.to_string().starts_with("unit.ccl:"));
    }
}
