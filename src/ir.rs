//! Language-neutral intermediate representation of parsed schemas.
//!
//! Every target language needs the same disambiguation work done on CCL
//! syntax: enums recovered from binary unions, defaults split from their
//! base type, optionality captured per struct member.  The parser does that
//! work once, producing this tree; emitters consume it without touching CCL
//! syntax again.

use serde_json::Value as Json;

/// A parsed schema node.  Nesting is exclusive to `Struct`, `Array`, and
/// `Enum`; idents and scalars are always leaves.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedType {
    Struct(ParsedStruct),
    Array(ParsedArray),
    Enum(ParsedEnum),
    Ident(ParsedIdent),
    Scalar(ParsedScalar),
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedStruct {
    pub name: String,
    /// Members in CCL iteration order; labels are pairwise distinct.
    pub members: Vec<StructField>,
    pub default: Option<Box<ParsedType>>,
}

/// A struct member together with its optionality flag.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    pub node: ParsedType,
    pub optional: bool,
}

/// An array type.  CCL arrays are not constrained to a single element
/// type, so all parsed element types are held in `members`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedArray {
    pub name: String,
    pub members: Vec<ParsedType>,
    pub default: Option<Box<ParsedType>>,
    pub optional: bool,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedEnum {
    pub name: String,
    /// Ordered; duplicates are permitted here and collapsed at emit time
    /// by printed form.
    pub members: Vec<ParsedType>,
    pub default: Option<Box<ParsedType>>,
}

/// A single type identifier, eg. `string` or `int`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedIdent {
    pub name: String,
    /// The identifier text, verbatim.
    pub ident: String,
    pub default: Option<Box<ParsedType>>,
}

/// A single concrete value, eg. `"foo"` or `42`.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScalar {
    pub name: String,
    pub value: Json,
    pub default: Option<Box<ParsedType>>,
}

impl ParsedType {
    /// The variant name, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            ParsedType::Struct(_) => "struct",
            ParsedType::Array(_) => "array",
            ParsedType::Enum(_) => "enum",
            ParsedType::Ident(_) => "ident",
            ParsedType::Scalar(_) => "scalar",
        }
    }

    pub fn name(&self) -> &str {
        match self {
            ParsedType::Struct(n) => &n.name,
            ParsedType::Array(n) => &n.name,
            ParsedType::Enum(n) => &n.name,
            ParsedType::Ident(n) => &n.name,
            ParsedType::Scalar(n) => &n.name,
        }
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        let name = name.into();
        match self {
            ParsedType::Struct(n) => n.name = name,
            ParsedType::Array(n) => n.name = name,
            ParsedType::Enum(n) => n.name = name,
            ParsedType::Ident(n) => n.name = name,
            ParsedType::Scalar(n) => n.name = name,
        }
    }

    pub fn default(&self) -> Option<&ParsedType> {
        match self {
            ParsedType::Struct(n) => n.default.as_deref(),
            ParsedType::Array(n) => n.default.as_deref(),
            ParsedType::Enum(n) => n.default.as_deref(),
            ParsedType::Ident(n) => n.default.as_deref(),
            ParsedType::Scalar(n) => n.default.as_deref(),
        }
    }

    pub fn set_default(&mut self, default: ParsedType) {
        let default = Some(Box::new(default));
        match self {
            ParsedType::Struct(n) => n.default = default,
            ParsedType::Array(n) => n.default = default,
            ParsedType::Enum(n) => n.default = default,
            ParsedType::Ident(n) => n.default = default,
            ParsedType::Scalar(n) => n.default = default,
        }
    }
}
