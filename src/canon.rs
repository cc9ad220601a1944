//! Canonical CCL pretty-printing.

use crate::ccl::format::{self, FormatOptions};
use crate::ccl::{Runtime, Value};
use crate::error::Result;

/// Render a value as canonical CCL: two-space indentation, doc comments
/// and optional markers preserved.
pub fn format_value(v: &Value) -> Result<String> {
    Ok(format::node(v.syntax(), &FormatOptions::default()))
}

/// Compile source text and re-render it canonically.
pub fn format_source(src: &str) -> Result<String> {
    let runtime = Runtime::new();
    let inst = runtime.compile(".", src)?;
    format_value(&inst.value())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_layout() {
        let out = format_source("#Def:    {   name:string,   age?:int   }").unwrap();
        assert_eq!(out, "{\n  #Def: {\n    name: string\n    age?: int\n  }\n}");
    }
}
