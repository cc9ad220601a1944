//! Structural merge of two CCL values.
//!
//! The merged type accepts every value accepted by either input.  Common
//! struct fields merge recursively; everything else forms a union,
//! deduplicated by canonical printed form.  The dedup key is the formatted
//! syntax rather than subsumption because subsumption is unreliable on
//! lists; preserve that contract.

use tracing::debug;

use crate::ccl::ast::{self, Expr, Field, StructLit};
use crate::ccl::format::{self, FormatOptions};
use crate::ccl::{FieldOptions, Kind, Runtime, Value};
use crate::error::{Error, Result};

/// Merge two values, returning a value which accepts both.
///
/// Two passes make the operation commutative for field-presence asymmetry:
/// the second pass picks up anything the first saw only from one side.
pub fn merge(a: &Value, b: &Value) -> Result<Value> {
    let merged = recursively_merge(a, b)?;
    recursively_merge(b, &merged)
}

/// Compile and merge two CCL sources, returning canonical merged source.
pub fn merge_strings(a: &str, b: &str) -> Result<String> {
    let a = Runtime::new().compile("a", a)?.value();
    let b = Runtime::new().compile("b", b)?.value();
    let merged = merge(&a, &b)?;
    crate::canon::format_value(&merged)
}

fn recursively_merge(a: &Value, b: &Value) -> Result<Value> {
    // A bottom side holds no data; the other side is the merge.
    if b.incomplete_kind().is_bottom() {
        return Ok(a.clone());
    }
    if a.incomplete_kind().is_bottom() {
        return Ok(b.clone());
    }
    if a.incomplete_kind() != Kind::STRUCT || b.incomplete_kind() != Kind::STRUCT {
        return Err(Error::Merge(format!(
            "can only merge structs, got {} and {}",
            a.incomplete_kind(),
            b.incomplete_kind()
        )));
    }

    let mut def = StructLit { fields: Vec::new() };

    for af in a.fields(FieldOptions::all())? {
        let Some(bf) = b.lookup(&af.label) else {
            // Present only in A; usable in one definition, so optional.
            def.fields.push(make_field(&af.label, af.value.syntax().clone(), true, &af));
            continue;
        };

        debug!(label = %af.label, "merging common field");
        let a_vals = expand_values(&af.value);
        let b_vals = expand_values(&bf.value);
        let optional = af.optional || bf.optional;

        if a_vals.len() <= 1 && b_vals.len() <= 1 {
            let ak = af.value.incomplete_kind();
            let bk = bf.value.incomplete_kind();

            // Different kinds immediately union the two definitions.
            if ak != bk {
                let value = ast::union(vec![
                    af.value.syntax().clone(),
                    bf.value.syntax().clone(),
                ]);
                def.fields.push(make_field(&af.label, value, optional, &af));
                continue;
            }

            // The same scalar kind: keep A's definition.
            if scalar_equals(ak, bk) {
                def.fields
                    .push(make_field(&af.label, af.value.syntax().clone(), optional, &af));
                continue;
            }

            // Two structs merge member by member.
            if ak == Kind::STRUCT && bk == Kind::STRUCT {
                let next = recursively_merge(&af.value, &bf.value)?;
                def.fields
                    .push(make_field(&af.label, next.into_expr(), optional, &af));
                continue;
            }

            // Only lists remain; they fall through to the union case.
        }

        // Union case: concatenate both sides and deduplicate by canonical
        // printed form.
        let mut seen: Vec<String> = Vec::new();
        let mut deduped: Vec<Expr> = Vec::new();
        for item in a_vals.iter().chain(b_vals.iter()) {
            let code = format::node(item.syntax(), &FormatOptions::default());
            if seen.contains(&code) {
                continue;
            }
            seen.push(code);
            deduped.push(item.syntax().clone());
        }
        def.fields
            .push(make_field(&af.label, ast::union(deduped), optional, &af));
    }

    // Fields of B that A does not have were skipped above; append them,
    // optional for the same reason as A-only fields.
    for bf in b.fields(FieldOptions::all())? {
        if a.lookup(&bf.label).is_some() {
            continue;
        }
        def.fields.push(make_field(&bf.label, bf.value.syntax().clone(), true, &bf));
    }

    Ok(Value::new(Expr::Struct(def)))
}

fn make_field(
    label: &str,
    value: Expr,
    optional: bool,
    source: &crate::ccl::FieldInfo,
) -> Field {
    Field {
        label: label.to_string(),
        value,
        optional: optional || source.optional,
        hidden: source.hidden,
        doc: source.doc.clone(),
    }
}

/// Expand a union tree into its member values.  Anything else is a single
/// value.
fn expand_values(v: &Value) -> Vec<Value> {
    if let Expr::Binary(b) = v.syntax() {
        if b.op == ast::BinOp::Or {
            return ast::or_leaves(v.syntax())
                .into_iter()
                .map(|e| Value::new(e.clone()))
                .collect();
        }
    }
    vec![v.clone()]
}

fn is_scalar(k: Kind) -> bool {
    // Structs and lists are never shallowly equal; their members may
    // differ.
    k != Kind::STRUCT && k != Kind::LIST
}

fn scalar_equals(a: Kind, b: Kind) -> bool {
    is_scalar(a) && is_scalar(b) && a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccl::parse_value;

    fn merged(a: &str, b: &str) -> Value {
        merge(&parse_value(a).unwrap(), &parse_value(b).unwrap()).unwrap()
    }

    fn assert_equivalent(actual: &Value, expected: &str) {
        let expected = parse_value(expected).unwrap();
        let text = crate::canon::format_value(actual).unwrap();
        assert!(
            expected.subsumes(actual),
            "merged type is wider than expected.\ngot:\n{text}"
        );
        assert!(
            actual.subsumes(&expected),
            "merged type is narrower than expected.\ngot:\n{text}"
        );
    }

    #[test]
    fn disjoint_fields_become_optional() {
        let m = merged("{ name: string, id: int }", "{ name: string, email: string }");
        assert_equivalent(&m, "{ name: string, id?: int, email?: string }");

        // Both inputs are accepted by the merged type.
        assert!(m.subsumes(&parse_value("{ name: string, id: int }").unwrap()));
        assert!(m.subsumes(&parse_value("{ name: string, email: string }").unwrap()));
    }

    #[test]
    fn merge_is_commutative() {
        let ab = merged("{ a: int, c: string }", "{ b: bool, c: string }");
        let ba = merged("{ b: bool, c: string }", "{ a: int, c: string }");
        assert!(ab.subsumes(&ba));
        assert!(ba.subsumes(&ab));
    }

    #[test]
    fn merge_with_self_is_identity() {
        let src = "{ name: string, nested: { id: int } }";
        let m = merged(src, src);
        assert_equivalent(&m, src);
    }

    #[test]
    fn differing_kinds_form_a_union() {
        let m = merged("{ v: string }", "{ v: int }");
        assert_equivalent(&m, "{ v: string | int }");
    }

    #[test]
    fn unions_concatenate_and_dedupe() {
        let m = merged("{ v: string | int }", "{ v: int | bool }");
        assert_equivalent(&m, "{ v: string | int | bool }");
    }

    #[test]
    fn structs_merge_recursively() {
        let m = merged(
            "{ user: { id: int, name: string } }",
            "{ user: { name: string, email: string } }",
        );
        assert_equivalent(
            &m,
            "{ user: { name: string, id?: int, email?: string } }",
        );
    }

    #[test]
    fn bottom_is_the_identity() {
        let a = parse_value("{ x: int }").unwrap();
        let m = merge(&a, &Value::bottom()).unwrap();
        assert!(m.subsumes(&a) && a.subsumes(&m));
        let m = merge(&Value::bottom(), &a).unwrap();
        assert!(m.subsumes(&a) && a.subsumes(&m));
    }

    #[test]
    fn non_struct_inputs_are_rejected() {
        let a = parse_value("string").unwrap();
        let b = parse_value("{ x: int }").unwrap();
        assert!(matches!(merge(&a, &b), Err(Error::Merge(_))));
    }

    #[test]
    fn merged_source_is_canonical() {
        let out = merge_strings("a: string", "b: int").unwrap();
        let v = parse_value(&out).unwrap();
        assert_equivalent(&v, "{ a?: string, b?: int }");
    }
}
