//! Infer a CCL type from a concrete JSON value.
//!
//! Works backwards from values, so it never generates constraints; the
//! output is a starting point for a properly defined type.  Map iteration
//! order is caller-observable and not stabilised: compare results by
//! subsumption, not by string equality.

use serde_json::{Map, Value as Json};
use tracing::debug;

use crate::ccl::ast::{self, Ellipsis, Expr, Field, ListLit, StructLit};
use crate::ccl::format::{self, FormatOptions};
use crate::ccl::{Kind, Value};
use crate::error::{Error, Result};

/// Generate CCL source describing a type that accepts the input.
///
/// Inference runs on untrusted user input and must never crash the host:
/// panics from the AST builder are caught and reported as errors.
pub fn from_json(input: &Map<String, Json>) -> Result<String> {
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let mut def = StructLit { fields: Vec::new() };
        walk(input, &mut def);
        format::node(&Expr::Struct(def), &FormatOptions::default())
    }));

    match outcome {
        Ok(text) => Ok(text),
        Err(panic) => Err(Error::Inference(format!(
            "error generating type from JSON: {}",
            panic_message(&panic)
        ))),
    }
}

/// Add a field to the definition for each key in the map.
fn walk(obj: &Map<String, Json>, def: &mut StructLit) {
    for (key, value) in obj {
        let typ = kind(value);

        let expr = match value {
            Json::Array(items) => infer_slice(items),
            Json::Object(map) if typ == Kind::STRUCT => {
                let mut inner = StructLit { fields: Vec::new() };
                walk(map, &mut inner);
                Expr::Struct(inner)
            }
            _ => type_expr(typ),
        };

        def.fields.push(Field::new(key.clone(), expr));
    }
}

/// The element type of a slice: `[...T]` where `T` is the disjunction of
/// observed primitive kinds, a deduplicated struct, or a parenthesised
/// union of structs.
fn infer_slice(items: &[Json]) -> Expr {
    let (typ, structs) = walk_slice(items);
    debug!(kind = %typ, candidates = structs.len(), "inferred slice element type");

    let elem = if typ == Kind::STRUCT && structs.len() == 1 {
        Expr::Struct(structs.into_iter().next().unwrap())
    } else if typ == Kind::STRUCT && structs.len() > 1 {
        Expr::Paren(Box::new(ast::union(
            structs.into_iter().map(Expr::Struct).collect(),
        )))
    } else {
        type_expr(typ)
    };

    Expr::List(ListLit {
        elts: vec![Expr::Ellipsis(Ellipsis {
            ty: Some(Box::new(elem)),
        })],
    })
}

/// Walk a slice, collecting the kinds occurring in it.  Primitive kinds
/// accumulate into the returned bitmask; struct elements are parsed into
/// candidate definitions and deduplicated by semantic equivalence (each
/// subsumes the other).
fn walk_slice(slice: &[Json]) -> (Kind, Vec<StructLit>) {
    let mut found = Kind::BOTTOM;
    let mut structs = Vec::new();

    for item in slice {
        let k = kind(item);
        if k == Kind::STRUCT {
            let mut parsed = StructLit { fields: Vec::new() };
            if let Json::Object(map) = item {
                walk(map, &mut parsed);
            }
            structs.push(parsed);
        }
        found = found | k;
    }

    if found == Kind::BOTTOM {
        // Empty slice; any element is admissible.
        return (Kind::TOP, Vec::new());
    }

    // Two candidates are the same type when each subsumes the other.  The
    // comparison goes through values rather than syntax because field
    // ordering differs between observations.
    let mut deduped: Vec<StructLit> = Vec::new();
    'next: for next in structs {
        let next_value = Value::new(Expr::Struct(next.clone()));
        for existing in &deduped {
            let existing_value = Value::new(Expr::Struct(existing.clone()));
            if next_value.subsumes(&existing_value) && existing_value.subsumes(&next_value) {
                continue 'next;
            }
        }
        deduped.push(next);
    }

    (found, deduped)
}

/// The type expression for a kind mask: a single ident, or a parenthesised
/// union of idents for compound masks.
fn type_expr(k: Kind) -> Expr {
    if k.is_top() {
        return Expr::ident("_");
    }
    if k == Kind::NUMBER {
        return Expr::ident("number");
    }
    let mut idents = Vec::new();
    for (bit, name) in [
        (Kind::NULL, "null"),
        (Kind::BOOL, "bool"),
        (Kind::INT, "int"),
        (Kind::FLOAT, "float"),
        (Kind::STRING, "string"),
        (Kind::LIST, "[...]"),
        (Kind::STRUCT, "{...}"),
    ] {
        if k.contains(bit) {
            idents.push(Expr::ident(name));
        }
    }
    match idents.len() {
        0 => Expr::ident("_"),
        1 => idents.into_iter().next().unwrap(),
        _ => Expr::Paren(Box::new(ast::union(idents))),
    }
}

/// The kind of a JSON value.  Numbers with a zero fractional part are
/// ints; null is tracked as nullable but renders as the top type.
fn kind(v: &Json) -> Kind {
    match v {
        Json::Number(n) => match n.as_f64() {
            Some(f) if f.fract() == 0.0 => Kind::INT,
            Some(_) => Kind::FLOAT,
            None => Kind::INT,
        },
        Json::Bool(_) => Kind::BOOL,
        Json::String(_) => Kind::STRING,
        Json::Object(_) => Kind::STRUCT,
        Json::Array(_) => Kind::LIST,
        Json::Null => Kind::NULL | Kind::TOP,
    }
}

fn panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccl::parse_value;
    use serde_json::json;

    fn infer(value: Json) -> String {
        let Json::Object(map) = value else {
            panic!("test input must be an object");
        };
        from_json(&map).unwrap()
    }

    /// The concrete CCL rendering of a JSON value, for validation checks.
    fn concrete(value: &Json) -> Expr {
        match value {
            Json::Null => Expr::ident("_"),
            Json::Bool(b) => Expr::bool_lit(*b),
            Json::Number(n) => {
                if let Some(i) = n.as_i64() {
                    if n.as_f64().is_some_and(|f| f.fract() != 0.0) {
                        Expr::float_lit(n.as_f64().unwrap())
                    } else {
                        Expr::int_lit(i)
                    }
                } else {
                    Expr::float_lit(n.as_f64().unwrap())
                }
            }
            Json::String(s) => Expr::str_lit(s.clone()),
            Json::Array(items) => Expr::List(ListLit {
                elts: items.iter().map(concrete).collect(),
            }),
            Json::Object(map) => Expr::Struct(StructLit {
                fields: map
                    .iter()
                    .map(|(k, v)| Field::new(k.clone(), concrete(v)))
                    .collect(),
            }),
        }
    }

    /// Invariant: the inferred type accepts the value it came from.
    fn assert_accepts(value: Json) -> String {
        let text = infer(value.clone());
        let ty = parse_value(&text).unwrap();
        let instance = Value::new(concrete(&value));
        assert!(
            ty.subsumes(&instance),
            "inferred type does not accept its input:\n{text}\nvalue: {value}"
        );
        text
    }

    #[test]
    fn primitives() {
        let text = assert_accepts(json!({
            "name": "Alice",
            "count": 3,
            "ratio": 2.5,
            "enabled": true,
            "missing": null,
        }));
        let ty = parse_value(&text).unwrap();
        let expected = parse_value(
            "{ name: string, count: int, ratio: float, enabled: bool, missing: _ }",
        )
        .unwrap();
        assert!(ty.subsumes(&expected) && expected.subsumes(&ty));
    }

    #[test]
    fn nested_objects_recurse() {
        let text = assert_accepts(json!({"user": {"email": "a@b.c", "id": 7}}));
        let ty = parse_value(&text).unwrap();
        let expected = parse_value("{ user: { email: string, id: int } }").unwrap();
        assert!(ty.subsumes(&expected) && expected.subsumes(&ty));
    }

    #[test]
    fn array_of_structs_dedupes() {
        let text = assert_accepts(json!({"items": [{"a": 1}, {"a": 2}]}));
        let ty = parse_value(&text).unwrap();
        let expected = parse_value("{ items: [...{ a: int }] }").unwrap();
        assert!(ty.subsumes(&expected) && expected.subsumes(&ty));
        // A single struct candidate survives the dedup.
        assert_eq!(text.matches("a:").count(), 1);
    }

    #[test]
    fn array_of_mixed_shape_structs() {
        let text = assert_accepts(json!({"items": [{"a": 1}, {"b": "x"}]}));
        let ty = parse_value(&text).unwrap();
        let expected =
            parse_value("{ items: [...({ a: int } | { b: string })] }").unwrap();
        assert!(ty.subsumes(&expected) && expected.subsumes(&ty));
    }

    #[test]
    fn array_of_primitives() {
        let text = assert_accepts(json!({"tags": ["a", "b"], "mixed": ["a", 1]}));
        let ty = parse_value(&text).unwrap();
        let expected = parse_value("{ tags: [...string], mixed: [...(int | string)] }").unwrap();
        assert!(ty.subsumes(&expected) && expected.subsumes(&ty));
    }

    #[test]
    fn empty_array_accepts_anything() {
        let text = assert_accepts(json!({"empty": []}));
        assert!(text.contains("empty: [..._]"));
    }

    #[test]
    fn inferred_output_recompiles() {
        let text = infer(json!({"deep": [{"xs": [1, {"y": true}]}]}));
        parse_value(&text).unwrap();
    }
}
