//! OpenAPI schema generation for compiled CCL units.
//!
//! Produces a v3 document with one schema per top-level definition.  This
//! is the one consumer that keeps refinements: relational constraints
//! become `minimum`/`maximum` bounds, defaults become `default`, and field
//! docs become `description`.

use serde_json::{json, Map, Value as Json};

use crate::ccl::ast::{BinOp, Expr, Lit, UnaryOp};
use crate::ccl::{self, FieldOptions, Instance, Value};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub pkg_name: String,
    pub version: String,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            pkg_name: String::new(),
            version: "3.0.0".to_string(),
        }
    }
}

/// Generate an OpenAPI document for the instance, as JSON bytes shaped
/// `{openapi, info, components: {schemas}}`.  Schemas are generated for
/// each top-level definition; plain fields produce none.
pub fn gen(inst: &Instance, config: &Config) -> Result<Vec<u8>> {
    let v = inst.value();
    v.validate()?;

    let mut schemas = Map::new();
    for field in v.fields(FieldOptions::default())? {
        if !field.definition {
            continue;
        }
        let name = field.label.trim_start_matches('#').to_string();
        let mut schema = schema_for(&field.value)?;
        if let Some(doc) = &field.doc {
            schema.insert("description".to_string(), json!(doc));
        }
        schemas.insert(name, Json::Object(schema));
    }

    let doc = json!({
        "openapi": config.version,
        "info": {
            "title": config.pkg_name,
            "version": config.version,
        },
        "components": {
            "schemas": schemas,
        },
    });
    serde_json::to_vec(&doc).map_err(|e| Error::Format(e.to_string()))
}

/// The schema for a single CCL value.
pub fn schema_for(v: &Value) -> Result<Map<String, Json>> {
    schema_expr(v.syntax())
}

fn schema_expr(expr: &Expr) -> Result<Map<String, Json>> {
    match expr {
        Expr::Paren(inner) => schema_expr(inner),
        Expr::Ident(id) => Ok(ident_schema(&id.name)),
        Expr::BasicLit(b) => Ok(lit_schema(&b.lit)),
        Expr::Struct(_) => struct_schema(expr),
        Expr::List(l) => list_schema(l),
        Expr::Unary(u) => match u.op {
            UnaryOp::Default => {
                let mut schema = schema_expr(&u.x)?;
                insert_default(&mut schema, &u.x);
                Ok(schema)
            }
            _ => {
                // A bare constraint: the bound implies a numeric type.
                let mut schema = Map::new();
                schema.insert("type".to_string(), json!("number"));
                apply_bound(&mut schema, u.op, &u.x);
                Ok(schema)
            }
        },
        Expr::Binary(b) => match b.op {
            BinOp::Or => union_schema(expr),
            BinOp::And => intersection_schema(expr),
        },
        other => Err(Error::Format(format!(
            "cannot generate a schema for this value: {other:?}"
        ))),
    }
}

fn ident_schema(name: &str) -> Map<String, Json> {
    let mut schema = Map::new();
    match name {
        "string" | "bytes" => {
            schema.insert("type".to_string(), json!("string"));
        }
        "bool" => {
            schema.insert("type".to_string(), json!("boolean"));
        }
        "int" | "int8" | "int16" | "int32" | "int64" => {
            schema.insert("type".to_string(), json!("integer"));
        }
        "uint" | "uint8" | "uint16" | "uint32" | "uint64" => {
            schema.insert("type".to_string(), json!("integer"));
            schema.insert("minimum".to_string(), json!(0));
        }
        "float" | "float32" | "float64" | "number" => {
            schema.insert("type".to_string(), json!("number"));
        }
        "null" => {
            schema.insert("nullable".to_string(), json!(true));
        }
        // `_` and unresolved references accept anything.
        _ => {}
    }
    schema
}

fn lit_schema(lit: &Lit) -> Map<String, Json> {
    let mut schema = Map::new();
    match lit {
        Lit::Null => {
            schema.insert("nullable".to_string(), json!(true));
        }
        Lit::Bool(v) => {
            schema.insert("type".to_string(), json!("boolean"));
            schema.insert("enum".to_string(), json!([v]));
        }
        Lit::Int(v) => {
            schema.insert("type".to_string(), json!("integer"));
            schema.insert("enum".to_string(), json!([v]));
        }
        Lit::Float(v) => {
            schema.insert("type".to_string(), json!("number"));
            schema.insert("enum".to_string(), json!([v]));
        }
        Lit::Str(v) => {
            schema.insert("type".to_string(), json!("string"));
            schema.insert("enum".to_string(), json!([v]));
        }
    }
    schema
}

fn struct_schema(expr: &Expr) -> Result<Map<String, Json>> {
    let v = Value::new(expr.clone());
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("object"));

    let mut properties = Map::new();
    let mut required = Vec::new();
    for field in v.fields(FieldOptions::default())? {
        let mut prop = schema_expr(field.value.syntax())?;
        if let Some(doc) = &field.doc {
            prop.insert("description".to_string(), json!(doc));
        }
        if !field.optional {
            required.push(json!(field.label));
        }
        properties.insert(field.label, Json::Object(prop));
    }

    if !properties.is_empty() {
        schema.insert("properties".to_string(), Json::Object(properties));
    }
    if !required.is_empty() {
        schema.insert("required".to_string(), Json::Array(required));
    }
    Ok(schema)
}

fn list_schema(list: &ccl::ast::ListLit) -> Result<Map<String, Json>> {
    let mut schema = Map::new();
    schema.insert("type".to_string(), json!("array"));

    match list.elts.first() {
        None => Ok(schema),
        Some(Expr::Ellipsis(e)) => {
            if let Some(ty) = &e.ty {
                schema.insert("items".to_string(), Json::Object(schema_expr(ty)?));
            }
            Ok(schema)
        }
        Some(_) => {
            // A tuple of literal positions.
            let mut members = Vec::new();
            for elt in &list.elts {
                members.push(Json::Object(schema_expr(elt)?));
            }
            let n = members.len();
            schema.insert("items".to_string(), json!({ "oneOf": members }));
            schema.insert("minItems".to_string(), json!(n));
            schema.insert("maxItems".to_string(), json!(n));
            Ok(schema)
        }
    }
}

fn union_schema(expr: &Expr) -> Result<Map<String, Json>> {
    let leaves = ccl::ast::or_leaves(expr);

    // A marked branch is a default, not a union member.
    if let Some(last) = leaves.last() {
        if let Expr::Unary(u) = &**last {
            if u.op == UnaryOp::Default {
                if let Expr::Binary(b) = expr {
                    let mut schema = schema_expr(&b.x)?;
                    insert_default(&mut schema, &u.x);
                    return Ok(schema);
                }
            }
        }
    }

    // All literals of one kind collapse into an enum.
    let lits: Option<Vec<&Lit>> = leaves
        .iter()
        .map(|l| match l {
            Expr::BasicLit(b) => Some(&b.lit),
            _ => None,
        })
        .collect();
    if let Some(lits) = lits {
        let ty = lits.first().map(|l| lit_type_name(l));
        if lits.iter().all(|l| Some(lit_type_name(l)) == ty) {
            let mut schema = Map::new();
            if let Some(ty) = ty {
                if ty != "null" {
                    schema.insert("type".to_string(), json!(ty));
                }
            }
            let values: Vec<Json> = lits.iter().map(|l| lit_value(l)).collect();
            schema.insert("enum".to_string(), Json::Array(values));
            return Ok(schema);
        }
    }

    let mut members = Vec::new();
    for leaf in leaves {
        members.push(Json::Object(schema_expr(leaf)?));
    }
    let mut schema = Map::new();
    schema.insert("oneOf".to_string(), Json::Array(members));
    Ok(schema)
}

fn intersection_schema(expr: &Expr) -> Result<Map<String, Json>> {
    let mut schema = Map::new();
    for leaf in ccl::ast::and_leaves(expr) {
        match leaf {
            Expr::Unary(u) if u.op != UnaryOp::Default => {
                apply_bound(&mut schema, u.op, &u.x);
            }
            other => {
                let base = schema_expr(other)?;
                for (k, v) in base {
                    schema.entry(k).or_insert(v);
                }
            }
        }
    }
    Ok(schema)
}

fn apply_bound(schema: &mut Map<String, Json>, op: UnaryOp, bound: &Expr) {
    let Ok(value) = Value::new(bound.clone()).decode() else {
        return;
    };
    match op {
        UnaryOp::Ge => {
            schema.insert("minimum".to_string(), value);
        }
        UnaryOp::Gt => {
            schema.insert("minimum".to_string(), value);
            schema.insert("exclusiveMinimum".to_string(), json!(true));
        }
        UnaryOp::Le => {
            schema.insert("maximum".to_string(), value);
        }
        UnaryOp::Lt => {
            schema.insert("maximum".to_string(), value);
            schema.insert("exclusiveMaximum".to_string(), json!(true));
        }
        UnaryOp::Ne | UnaryOp::Default => {}
    }
}

fn insert_default(schema: &mut Map<String, Json>, expr: &Expr) {
    if let Ok(value) = Value::new(expr.clone()).decode() {
        schema.insert("default".to_string(), value);
    }
}

fn lit_type_name(lit: &Lit) -> &'static str {
    match lit {
        Lit::Null => "null",
        Lit::Bool(_) => "boolean",
        Lit::Int(_) => "integer",
        Lit::Float(_) => "number",
        Lit::Str(_) => "string",
    }
}

fn lit_value(lit: &Lit) -> Json {
    match lit {
        Lit::Null => Json::Null,
        Lit::Bool(v) => json!(v),
        Lit::Int(v) => json!(v),
        Lit::Float(v) => json!(v),
        Lit::Str(v) => json!(v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccl::Runtime;

    fn schemas(src: &str) -> Map<String, Json> {
        let inst = Runtime::new().compile(".", src).unwrap();
        let bytes = gen(&inst, &Config::default()).unwrap();
        let doc: Json = serde_json::from_slice(&bytes).unwrap();
        doc["components"]["schemas"].as_object().unwrap().clone()
    }

    #[test]
    fn object_schema_with_required_fields() {
        let s = schemas("#Event: {\n  name: string\n  v?: string\n}");
        assert_eq!(
            s["Event"],
            json!({
                "type": "object",
                "properties": {
                    "name": {"type": "string"},
                    "v": {"type": "string"},
                },
                "required": ["name"],
            })
        );
    }

    #[test]
    fn bounds_and_docs_survive() {
        let s = schemas("#PR: {\n  // The pull request number\n  number: int & >=1\n}");
        assert_eq!(
            s["PR"],
            json!({
                "type": "object",
                "properties": {
                    "number": {
                        "type": "integer",
                        "minimum": 1,
                        "description": "The pull request number",
                    },
                },
                "required": ["number"],
            })
        );
    }

    #[test]
    fn scalar_enums_and_defaults() {
        let s = schemas(r#"#E: {
  action: "a" | "b"
  level: int | *3
}"#);
        assert_eq!(
            s["E"]["properties"]["action"],
            json!({"type": "string", "enum": ["a", "b"]})
        );
        assert_eq!(
            s["E"]["properties"]["level"],
            json!({"type": "integer", "default": 3})
        );
    }

    #[test]
    fn arrays_and_unions() {
        let s = schemas("#E: {\n  tags: [...string]\n  val: string | int\n}");
        assert_eq!(
            s["E"]["properties"]["tags"],
            json!({"type": "array", "items": {"type": "string"}})
        );
        assert_eq!(
            s["E"]["properties"]["val"],
            json!({"oneOf": [{"type": "string"}, {"type": "integer"}]})
        );
    }

    #[test]
    fn plain_fields_generate_no_schema() {
        let s = schemas("#Def: { a: int }\nplain: { b: int }");
        assert!(s.contains_key("Def"));
        assert_eq!(s.len(), 1);
    }
}
