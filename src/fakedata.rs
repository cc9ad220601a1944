//! Deterministic example values for schemas.
//!
//! Generates a JSON value accepted by a parsed schema, preferring declared
//! defaults, then the first literal or enum member, then a per-primitive
//! zero value.  Constraint extraction lives here too: bounds read from a
//! CCL value, including those implied by sized integer idents.

use serde_json::{json, Map, Value as Json};

use crate::ccl::ast::{Expr, UnaryOp};
use crate::ccl::{Op, Value};
use crate::error::{Error, Result};
use crate::ir::{ParsedType, StructField};

// ------------------------------ Examples ---------------------------------- //

/// An example value for each top-level parsed definition, keyed by name
/// with sigils stripped.
pub fn examples(nodes: &[ParsedType]) -> Result<Map<String, Json>> {
    let mut out = Map::new();
    for node in nodes {
        let name = node.name().trim_start_matches('#').to_string();
        out.insert(name, example(node)?);
    }
    Ok(out)
}

/// An example value accepted by the given schema node.
pub fn example(node: &ParsedType) -> Result<Json> {
    if let Some(default) = node.default() {
        return example(default);
    }
    match node {
        ParsedType::Scalar(s) => Ok(s.value.clone()),
        ParsedType::Ident(i) => Ok(ident_example(&i.ident)),
        ParsedType::Enum(e) => {
            let first = e
                .members
                .first()
                .ok_or_else(|| Error::Format("enum has no members".to_string()))?;
            example(first)
        }
        ParsedType::Array(a) => {
            let mut items = Vec::new();
            for member in &a.members {
                items.push(example(member)?);
            }
            Ok(Json::Array(items))
        }
        ParsedType::Struct(s) => {
            let mut map = Map::new();
            for StructField { node, optional } in &s.members {
                if *optional && node.default().is_none() {
                    continue;
                }
                map.insert(node.name().to_string(), example(node)?);
            }
            Ok(Json::Object(map))
        }
    }
}

fn ident_example(name: &str) -> Json {
    match name {
        "string" | "bytes" => json!(""),
        "bool" => json!(false),
        "int" | "uint" | "int8" | "int16" | "int32" | "int64" | "uint8" | "uint16" | "uint32"
        | "uint64" => json!(0),
        "float" | "float32" | "float64" | "number" => json!(0.0),
        "null" => Json::Null,
        _ => Json::Null,
    }
}

// ----------------------------- Constraints -------------------------------- //

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rule {
    Gte,
    Lte,
    Gt,
    Lt,
    Eq,
    OneOf,
}

/// A single constraint extracted from a CCL value.
#[derive(Debug, Clone, PartialEq)]
pub struct Constraint {
    pub rule: Rule,
    pub value: Json,
}

/// Extract the constraints a scalar-ish value places on its instances:
/// relational bounds, fixed literals, and one-of sets.  Sized integer
/// idents contribute their implied bounds.
pub fn constraints(v: &Value) -> Vec<Constraint> {
    let mut out = Vec::new();
    collect_constraints(v.syntax(), &mut out);
    out
}

fn collect_constraints(expr: &Expr, out: &mut Vec<Constraint>) {
    match expr {
        Expr::Ident(id) => ident_bounds(&id.name, out),
        Expr::BasicLit(_) => {
            if let Ok(value) = Value::new(expr.clone()).decode() {
                out.push(Constraint {
                    rule: Rule::Eq,
                    value,
                });
            }
        }
        Expr::Unary(u) => {
            let rule = match u.op {
                UnaryOp::Ge => Some(Rule::Gte),
                UnaryOp::Le => Some(Rule::Lte),
                UnaryOp::Gt => Some(Rule::Gt),
                UnaryOp::Lt => Some(Rule::Lt),
                UnaryOp::Ne | UnaryOp::Default => None,
            };
            if let Some(rule) = rule {
                if let Ok(value) = Value::new((*u.x).clone()).decode() {
                    out.push(Constraint { rule, value });
                }
            }
        }
        Expr::Binary(_) => {
            let v = Value::new(expr.clone());
            match v.expr() {
                (Op::And, vals) => {
                    for val in vals {
                        collect_constraints(val.syntax(), out);
                    }
                }
                (Op::Or, vals) => {
                    // A union of concrete scalars is a one-of set.
                    let decoded: Vec<Json> = vals
                        .iter()
                        .filter_map(|v| v.decode().ok())
                        .collect();
                    if decoded.len() == vals.len() && !decoded.is_empty() {
                        out.push(Constraint {
                            rule: Rule::OneOf,
                            value: Json::Array(decoded),
                        });
                    }
                }
                _ => {}
            }
        }
        Expr::Paren(inner) => collect_constraints(inner, out),
        _ => {}
    }
}

fn ident_bounds(name: &str, out: &mut Vec<Constraint>) {
    let bounds: Option<(i64, i64)> = match name {
        "uint8" => Some((0, u8::MAX as i64)),
        "uint16" => Some((0, u16::MAX as i64)),
        "uint32" => Some((0, u32::MAX as i64)),
        "int8" => Some((i8::MIN as i64, i8::MAX as i64)),
        "int16" => Some((i16::MIN as i64, i16::MAX as i64)),
        "int32" => Some((i32::MIN as i64, i32::MAX as i64)),
        "uint" | "uint64" => {
            out.push(Constraint {
                rule: Rule::Gte,
                value: json!(0),
            });
            None
        }
        _ => None,
    };
    if let Some((min, max)) = bounds {
        out.push(Constraint {
            rule: Rule::Gte,
            value: json!(min),
        });
        out.push(Constraint {
            rule: Rule::Lte,
            value: json!(max),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccl::Runtime;

    fn parse(src: &str) -> Vec<ParsedType> {
        let inst = Runtime::new().compile(".", src).unwrap();
        crate::parse::parse_value(&inst.value()).unwrap()
    }

    #[test]
    fn defaults_win() {
        let nodes = parse("#Def: int & >= 5 & <= 10 | *8");
        assert_eq!(example(&nodes[0]).unwrap(), json!(8));
    }

    #[test]
    fn struct_examples_skip_optional_fields_without_defaults() {
        let nodes = parse(
            "#E: {\n  name: string\n  level: int | *3\n  note?: string\n  attempts?: int | *1\n}",
        );
        assert_eq!(
            example(&nodes[0]).unwrap(),
            json!({"name": "", "level": 3, "attempts": 1})
        );
    }

    #[test]
    fn enums_pick_the_first_member() {
        let nodes = parse(r#"#E: { status: "ok" | "err" }"#);
        assert_eq!(example(&nodes[0]).unwrap(), json!({"status": "ok"}));
    }

    #[test]
    fn examples_are_keyed_by_stripped_name() {
        let nodes = parse("#A: { v: bool }\n#B: [...int]");
        let all = examples(&nodes).unwrap();
        assert_eq!(all["A"], json!({"v": false}));
        assert_eq!(all["B"], json!([0]));
    }

    #[test]
    fn constraint_extraction() {
        let v = crate::ccl::parse_value("uint8").unwrap();
        assert_eq!(
            constraints(&v),
            vec![
                Constraint { rule: Rule::Gte, value: json!(0) },
                Constraint { rule: Rule::Lte, value: json!(255) },
            ]
        );

        let v = crate::ccl::parse_value("12").unwrap();
        assert_eq!(
            constraints(&v),
            vec![Constraint { rule: Rule::Eq, value: json!(12) }]
        );

        let v = crate::ccl::parse_value("uint8 & <= 4").unwrap();
        assert_eq!(
            constraints(&v),
            vec![
                Constraint { rule: Rule::Gte, value: json!(0) },
                Constraint { rule: Rule::Lte, value: json!(255) },
                Constraint { rule: Rule::Lte, value: json!(4) },
            ]
        );

        let v = crate::ccl::parse_value("1 | 2").unwrap();
        assert_eq!(
            constraints(&v),
            vec![Constraint { rule: Rule::OneOf, value: json!([1, 2]) }]
        );
    }
}
