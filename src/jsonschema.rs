//! JSON-schema emission and its reverse.
//!
//! Emission delegates to the OpenAPI generator and projects out the schema
//! map; `unmarshal_string` walks a JSON-schema object back into canonical
//! CCL source.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::{Map, Value as Json};

use crate::ccl::ast::{
    BinOp, BinaryExpr, Ellipsis, Expr, Field, ListLit, Lit, StructLit, UnaryExpr, UnaryOp,
};
use crate::ccl::format::{self, FormatOptions};
use crate::ccl::{Runtime, Value};
use crate::error::{Error, Result};
use crate::openapi;

/// All schemas generated for a CCL unit, keyed by identifier (sigil
/// stripped).
#[derive(Debug, Clone, Default)]
pub struct Schemas {
    pub all: BTreeMap<String, Map<String, Json>>,
}

impl Schemas {
    /// The schema for the given identifier, if one was generated.
    pub fn find(&self, identifier: &str) -> Option<&Map<String, Json>> {
        self.all.get(identifier)
    }
}

/// The slice of the generated OpenAPI document we care about; the rest is
/// discarded.
#[derive(Deserialize)]
struct Genned {
    components: Components,
}

#[derive(Deserialize)]
struct Components {
    schemas: BTreeMap<String, Map<String, Json>>,
}

/// Generate schemas for each top-level definition in the source text.
pub fn marshal_string(src: &str) -> Result<Schemas> {
    let runtime = Runtime::new();
    let inst = runtime.compile(".", src)?;

    let bytes = openapi::gen(&inst, &openapi::Config::default())?;

    let genned: Genned =
        serde_json::from_slice(&bytes).map_err(|e| Error::Format(e.to_string()))?;
    Ok(Schemas {
        all: genned.components.schemas,
    })
}

/// Generate a single schema for a CCL value.  The value is wrapped in a
/// synthetic definition and the schema for that definition is returned.
pub fn marshal_value(v: &Value) -> Result<Map<String, Json>> {
    let formatted = crate::canon::format_value(v)?;
    let schemas = marshal_string(&format!("#event: {formatted}"))?;
    schemas
        .find("event")
        .cloned()
        .ok_or_else(|| Error::Format("no schema generated for value".to_string()))
}

/// Convert a JSON-schema object back into canonical CCL source.
pub fn unmarshal_string(input: &str) -> Result<String> {
    let parsed: Json = serde_json::from_str(input).map_err(|e| Error::Format(e.to_string()))?;
    let obj = parsed
        .as_object()
        .ok_or_else(|| Error::Format("schema must be a JSON object".to_string()))?;
    let expr = schema_to_expr(obj)?;
    Ok(format::node(&expr, &FormatOptions::default()))
}

fn schema_to_expr(schema: &Map<String, Json>) -> Result<Expr> {
    // Enumerated values take precedence over the declared type; a
    // single-element enum collapses to the scalar itself.
    if let Some(Json::Array(values)) = schema.get("enum") {
        let mut exprs = Vec::new();
        for value in values {
            exprs.push(json_to_lit(value)?);
        }
        if exprs.is_empty() {
            return Err(Error::Format("empty enum in schema".to_string()));
        }
        return Ok(crate::ccl::ast::union(exprs));
    }

    let ty = schema.get("type").and_then(Json::as_str);
    match ty {
        Some("object") => {
            let required: Vec<&str> = schema
                .get("required")
                .and_then(Json::as_array)
                .map(|xs| xs.iter().filter_map(Json::as_str).collect())
                .unwrap_or_default();

            let mut fields = Vec::new();
            if let Some(Json::Object(properties)) = schema.get("properties") {
                for (key, prop) in properties {
                    let prop = prop
                        .as_object()
                        .ok_or_else(|| Error::Format(format!("property {key} is not an object")))?;
                    let mut field = Field::new(key.clone(), schema_to_expr(prop)?);
                    field.optional = !required.contains(&key.as_str());
                    field.doc = prop
                        .get("description")
                        .and_then(Json::as_str)
                        .map(str::to_string);
                    fields.push(field);
                }
            }
            Ok(Expr::Struct(StructLit { fields }))
        }
        Some("array") => {
            let ty = match schema.get("items").and_then(Json::as_object) {
                Some(items) => Some(Box::new(schema_to_expr(items)?)),
                None => None,
            };
            Ok(Expr::List(ListLit {
                elts: vec![Expr::Ellipsis(Ellipsis { ty })],
            }))
        }
        Some("string") => Ok(Expr::ident("string")),
        Some("boolean") => Ok(Expr::ident("bool")),
        Some("integer") => Ok(with_bounds(Expr::ident("int"), schema)),
        Some("number") => Ok(with_bounds(Expr::ident("number"), schema)),
        Some(other) => Err(Error::Format(format!("unknown schema type: {other}"))),
        None => {
            if let Some(Json::Array(members)) = schema.get("oneOf") {
                let mut exprs = Vec::new();
                for member in members {
                    let member = member
                        .as_object()
                        .ok_or_else(|| Error::Format("oneOf member is not an object".to_string()))?;
                    exprs.push(schema_to_expr(member)?);
                }
                return Ok(crate::ccl::ast::union(exprs));
            }
            Ok(Expr::ident("_"))
        }
    }
}

/// Reattach numeric bounds as relational constraints.
fn with_bounds(base: Expr, schema: &Map<String, Json>) -> Expr {
    let mut expr = base;
    if let Some(min) = schema.get("minimum") {
        if let Ok(bound) = json_to_lit(min) {
            let op = if schema.get("exclusiveMinimum").and_then(Json::as_bool) == Some(true) {
                UnaryOp::Gt
            } else {
                UnaryOp::Ge
            };
            expr = and(expr, Expr::Unary(UnaryExpr { op, x: Box::new(bound) }));
        }
    }
    if let Some(max) = schema.get("maximum") {
        if let Ok(bound) = json_to_lit(max) {
            let op = if schema.get("exclusiveMaximum").and_then(Json::as_bool) == Some(true) {
                UnaryOp::Lt
            } else {
                UnaryOp::Le
            };
            expr = and(expr, Expr::Unary(UnaryExpr { op, x: Box::new(bound) }));
        }
    }
    expr
}

fn and(x: Expr, y: Expr) -> Expr {
    Expr::Binary(BinaryExpr {
        op: BinOp::And,
        x: Box::new(x),
        y: Box::new(y),
    })
}

fn json_to_lit(value: &Json) -> Result<Expr> {
    let lit = match value {
        Json::Null => Lit::Null,
        Json::Bool(v) => Lit::Bool(*v),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Lit::Int(i)
            } else {
                Lit::Float(n.as_f64().ok_or_else(|| {
                    Error::Format(format!("unrepresentable number in schema: {n}"))
                })?)
            }
        }
        Json::String(v) => Lit::Str(v.clone()),
        other => {
            return Err(Error::Format(format!(
                "cannot use {other} as an enum value"
            )))
        }
    };
    Ok(Expr::BasicLit(crate::ccl::ast::BasicLit { lit }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn marshal_finds_definitions() {
        let schemas = marshal_string("#Event: {\n  name: string\n}").unwrap();
        let event = schemas.find("Event").unwrap();
        assert_eq!(event["type"], json!("object"));
        assert!(schemas.find("missing").is_none());
    }

    #[test]
    fn marshal_value_wraps_in_a_synthetic_definition() {
        let v = crate::ccl::parse_value("{ name: string, v?: string }").unwrap();
        let schema = marshal_value(&v).unwrap();
        assert_eq!(schema["type"], json!("object"));
        assert_eq!(schema["required"], json!(["name"]));
    }

    #[test]
    fn unmarshal_builds_canonical_ccl() {
        let input = r#"{
            "type": "object",
            "properties": {
                "name": {"enum": ["test.event"], "type": "string", "description": "The unique name of the event"},
                "ts": {"type": "number"},
                "data": {
                    "type": "object",
                    "properties": {"email": {"type": "string"}},
                    "required": ["email"]
                }
            },
            "required": ["name", "data"]
        }"#;
        let out = unmarshal_string(input).unwrap();
        let expected = concat!(
            "{\n",
            "  data: {\n",
            "    email: string\n",
            "  }\n",
            "  // The unique name of the event\n",
            "  name: \"test.event\"\n",
            "  ts?: number\n",
            "}",
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn unmarshal_reattaches_bounds() {
        let input = r#"{"type": "integer", "minimum": 1, "maximum": 10}"#;
        assert_eq!(unmarshal_string(input).unwrap(), "int & >=1 & <=10");
    }

    #[test]
    fn round_trip_is_semantically_stable() {
        let src = "#Event: {\n  name: string\n  count: int\n  tags?: [...string]\n}";
        let schemas = marshal_string(src).unwrap();
        let schema_json = serde_json::to_string(schemas.find("Event").unwrap()).unwrap();
        let ccl = unmarshal_string(&schema_json).unwrap();

        // The regenerated type must accept what the original accepts.
        let original = crate::ccl::parse_value("{\n  name: string\n  count: int\n  tags?: [...string]\n}").unwrap();
        let regenerated = crate::ccl::parse_value(&ccl).unwrap();
        assert!(regenerated.subsumes(&original));
        assert!(original.subsumes(&regenerated));
    }
}
