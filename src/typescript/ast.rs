//! Printable TypeScript AST.
//!
//! A small node set is enough for declaration files: literals, local
//! definitions (`const`/`type`/`interface`), bindings (objects, typed
//! arrays, disjunctions), scalars, type references, and key/value pairs.

use std::fmt;

use serde_json::Value as Json;

const INDENT: &str = "  ";

#[derive(Debug, Clone)]
pub enum AstKind {
    Local(Local),
    Binding(Binding),
    Scalar(Scalar),
    Type(TypeRef),
    KeyValue(KeyValue),
}

impl fmt::Display for AstKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstKind::Local(v) => write!(f, "{v}"),
            AstKind::Binding(v) => write!(f, "{v}"),
            AstKind::Scalar(v) => write!(f, "{v}"),
            AstKind::Type(v) => write!(f, "{v}"),
            AstKind::KeyValue(v) => write!(f, "{v}"),
        }
    }
}

/// A scalar value such as a string, number, or boolean.  Strings render
/// quoted.
#[derive(Debug, Clone)]
pub struct Scalar {
    pub value: Json,
}

impl Scalar {
    /// The raw text of the value, without string quoting.  Used for
    /// generating const-object keys.
    pub fn unquoted(&self) -> String {
        match &self.value {
            Json::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// A reference to a type by name, or raw type text.
#[derive(Debug, Clone)]
pub struct TypeRef {
    pub value: String,
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalKind {
    Const,
    Type,
    Interface,
}

impl fmt::Display for LocalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LocalKind::Const => write!(f, "const"),
            LocalKind::Type => write!(f, "type"),
            LocalKind::Interface => write!(f, "interface"),
        }
    }
}

/// A local definition for a variable or type.
#[derive(Debug, Clone)]
pub struct Local {
    pub kind: LocalKind,
    pub name: String,
    /// Optional type annotation, valid for const definitions only.
    pub ty: Option<String>,
    pub is_export: bool,
    pub value: Box<AstKind>,
    /// Records an `as T` suffix, eg. `const Foo = {...} as const;`.
    pub as_type: Option<String>,
}

impl fmt::Display for Local {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name.replace('#', "");

        let mut def = match self.kind {
            LocalKind::Const | LocalKind::Type => match &self.ty {
                None => format!("{} {} = {}", self.kind, name, self.value),
                Some(ty) => format!("{} {}: {} = {}", self.kind, name, ty, self.value),
            },
            LocalKind::Interface => format!("interface {} {}", name, self.value),
        };

        if let Some(as_type) = &self.as_type {
            def = format!("{def} as {as_type}");
        }

        if self.is_export {
            write!(f, "export {def};")
        } else {
            write!(f, "{def}")
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// A plain array literal: `[1, 2, 3]`.
    Array,
    /// A typed array: `Array<T>`.  Members are joined as a disjunction.
    TypedArray,
    /// An object literal; fields terminate with `,`.
    Object,
    /// An object used as a type; fields terminate with `;`.
    Type,
    /// Values combined with ` | `.
    Disjunction,
}

/// A complex value: an array, object, or disjunction.
#[derive(Debug, Clone)]
pub struct Binding {
    pub indent_level: usize,
    pub kind: BindingKind,
    pub members: Vec<AstKind>,
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            BindingKind::Array => {
                if self.members.is_empty() {
                    return write!(f, "[]");
                }
                let joined = self
                    .members
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(f, "[{joined}]")
            }
            BindingKind::TypedArray => {
                if self.members.is_empty() {
                    return write!(f, "Array<unknown>");
                }
                let joined = self
                    .members
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(" | ");
                write!(f, "Array<{joined}>")
            }
            BindingKind::Disjunction => {
                let joined = self
                    .members
                    .iter()
                    .map(|m| m.to_string())
                    .collect::<Vec<_>>()
                    .join(" | ");
                write!(f, "{joined}")
            }
            BindingKind::Object | BindingKind::Type => {
                if self.members.is_empty() {
                    return write!(f, "{{}}");
                }
                let term = if self.kind == BindingKind::Type { ";" } else { "," };
                writeln!(f, "{{")?;
                for member in &self.members {
                    for _ in 0..=self.indent_level {
                        write!(f, "{INDENT}")?;
                    }
                    writeln!(f, "{member}{term}")?;
                }
                for _ in 0..self.indent_level {
                    write!(f, "{INDENT}")?;
                }
                write!(f, "}}")
            }
        }
    }
}

/// A key and value within an object binding.
#[derive(Debug, Clone)]
pub struct KeyValue {
    pub key: String,
    pub value: Box<AstKind>,
    pub optional: bool,
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let plain = !self.key.is_empty()
            && self
                .key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_');
        let key = if plain {
            self.key.clone()
        } else {
            Json::String(self.key.clone()).to_string()
        };
        if self.optional {
            write!(f, "{key}?: {}", self.value)
        } else {
            write!(f, "{key}: {}", self.value)
        }
    }
}
