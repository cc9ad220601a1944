//! Schema translation for CCL definitions.
//!
//! CCL is a constraint-oriented configuration language whose values are
//! simultaneously types and data.  This crate parses CCL definitions into
//! a language-neutral IR and lowers them into TypeScript declarations and
//! JSON schemas; in the other direction it infers a best-guess CCL type
//! from a concrete JSON value, and it can merge two CCL types into one
//! that accepts the union of their values.
//!
//! The pipeline is pure and synchronous: each entry point is a function
//! from input text to output text, with errors aborting the operation.

pub mod canon;
pub mod ccl;
pub mod cli;
pub mod error;
pub mod events;
pub mod fakedata;
pub mod fromjson;
pub mod ir;
pub mod jq;
pub mod jsonschema;
pub mod merge;
pub mod openapi;
pub mod parse;
pub mod typescript;

use serde_json::{Map, Value as Json};

pub use error::{Error, Result};

/// A target-language backend: lowers parsed IR into declaration text.
/// `typescript` is the built-in implementation.
pub trait Generator {
    fn generate(&self, parsed: &[ir::ParsedType]) -> Result<String>;
}

/// The TypeScript backend.
#[derive(Debug, Default)]
pub struct TypeScript;

impl Generator for TypeScript {
    fn generate(&self, parsed: &[ir::ParsedType]) -> Result<String> {
        typescript::marshal_parsed(parsed)
    }
}

/// Infer a CCL type from a JSON object; the result accepts the input.
pub fn infer_from_value(input: &Map<String, Json>) -> Result<String> {
    fromjson::from_json(input)
}

/// Generate TypeScript declarations from CCL source.
pub fn ccl_to_typescript(src: &str) -> Result<String> {
    typescript::marshal_string(src)
}

/// Generate TypeScript declarations from a compiled CCL value.
pub fn ccl_value_to_typescript(v: &ccl::Value) -> Result<String> {
    typescript::marshal_value(v)
}

/// Generate JSON schemas for each top-level definition in the source.
pub fn ccl_to_schemas(src: &str) -> Result<jsonschema::Schemas> {
    jsonschema::marshal_string(src)
}

/// Generate a single JSON schema for a compiled CCL value.
pub fn ccl_value_to_schema(v: &ccl::Value) -> Result<Map<String, Json>> {
    jsonschema::marshal_value(v)
}

/// Merge two CCL sources into canonical source accepting both.
pub fn merge_ccl(a: &str, b: &str) -> Result<String> {
    merge::merge_strings(a, b)
}

/// Re-print CCL source canonically.
pub fn canonical(src: &str) -> Result<String> {
    canon::format_source(src)
}
