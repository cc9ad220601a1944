//! CCL value → IR parser.
//!
//! All CCL-specific disambiguation lives here: telling enums apart from
//! constrained idents and from defaulted types, recovering array element
//! shapes from list syntax, and capturing per-field optionality.  Emitters
//! never look at CCL syntax; they consume the IR this module produces.

use tracing::debug;

use crate::ccl::ast::{Expr, UnaryOp};
use crate::ccl::{self, FieldOptions, Kind, Op, Value};
use crate::error::{Error, Result};
use crate::ir::{ParsedArray, ParsedEnum, ParsedIdent, ParsedScalar, ParsedType, StructField};

/// Parse a top-level struct of named definitions into an ordered sequence
/// of IR nodes, one per field.
pub fn parse_value(v: &Value) -> Result<Vec<ParsedType>> {
    v.validate()?;

    // Definitions visible, concrete-only disabled; hidden fields are
    // suppressed by the default iteration.
    let fields = v.fields(FieldOptions::default())?;

    let mut parsed = Vec::new();
    for field in fields {
        debug!(label = %field.label, "parsing definition");
        if let Some(node) = parse_node(&field.label, &field.value)? {
            parsed.push(node);
        }
    }
    Ok(parsed)
}

/// Parse one CCL value into an IR node.  Returns `None` for syntax that
/// produces no node of its own (a bare default marker).
fn parse_node(label: &str, v: &Value) -> Result<Option<ParsedType>> {
    // The incomplete kind alone cannot distinguish a static string from a
    // string type or an enum of strings; anything that is not a struct or
    // list needs its syntax walked.
    let kind = v.incomplete_kind();
    if kind == Kind::STRUCT {
        let mut s = parse_struct(v)?;
        s.name = label.to_string();
        return Ok(Some(ParsedType::Struct(s)));
    }
    if kind == Kind::LIST {
        let mut arr = parse_array(v)?;
        arr.name = label.to_string();
        return Ok(Some(ParsedType::Array(arr)));
    }
    let syntax = v.syntax().clone();
    parse_syntax(label, v, &syntax)
}

/// Parse from a syntax node.  Reused by array parsing, where elements are
/// syntax rather than fields.
fn parse_syntax(label: &str, v: &Value, syn: &Expr) -> Result<Option<ParsedType>> {
    match syn {
        // A bare default marker contributes no node; the enclosing binary
        // expression claims it.
        Expr::Unary(_) => Ok(None),
        Expr::Binary(_) => {
            // This could be an enum, a constrained ident, or a type with a
            // default value.
            let (op, vals) = v.expr();
            match op {
                Op::Or => parse_union(label, v),
                Op::And => {
                    // Struct-with-struct intersections were already handled
                    // by the kind dispatch, so this is a refined type.
                    parse_constrained_ident(label, &vals)
                }
                // The operator is not reported when a default marker is in
                // play; the same union logic applies.
                Op::NoOp => parse_union(label, v),
            }
        }
        Expr::BasicLit(_) => Ok(Some(parse_scalar(label, &Value::new(syn.clone()))?)),
        Expr::Ident(id) => Ok(Some(ParsedType::Ident(ParsedIdent {
            name: label.to_string(),
            ident: id.name.clone(),
            default: None,
        }))),
        Expr::Struct(_) => {
            let value = Value::new(syn.clone());
            let mut s = parse_struct(&value)?;
            s.name = label.to_string();
            Ok(Some(ParsedType::Struct(s)))
        }
        Expr::Paren(inner) => parse_syntax(label, &Value::new((**inner).clone()), inner),
        other => Err(Error::Parse(format!(
            "unhandled ccl type: {} ({})",
            v.incomplete_kind(),
            variant_name(other)
        ))),
    }
}

/// Expand a union into an enum, or recover a defaulted base type.
///
/// When the right operand of the union is a default marker the expression
/// is not an enum at all: the left side is the type and the marked value is
/// its default.
fn parse_union(label: &str, v: &Value) -> Result<Option<ParsedType>> {
    if let Expr::Binary(b) = v.syntax() {
        if let Expr::Unary(u) = &*b.y {
            if u.op == UnaryOp::Default {
                let base = Value::new((*b.x).clone());
                let default = Value::new((*u.x).clone());
                let mut parsed = parse_node(label, &base)?.ok_or_else(|| {
                    Error::Parse("defaulted expression has no base type".to_string())
                })?;
                if let Some(def) = parse_node("", &default)? {
                    parsed.set_default(def);
                }
                return Ok(Some(parsed));
            }
        }
    }

    let mut parsed = ParsedEnum {
        name: label.to_string(),
        ..ParsedEnum::default()
    };
    for leaf in ccl::ast::or_leaves(v.syntax()) {
        let member = Value::new(leaf.clone());
        let node = parse_node("", &member)
            .map_err(|e| Error::Parse(format!("error parsing enum member: {e}")))?;
        if let Some(node) = node {
            parsed.members.push(node);
        }
    }
    Ok(Some(ParsedType::Enum(parsed)))
}

/// All operands of a refinement share the same type family; the first is
/// the refined ident and the remainder are constraints, which the IR
/// discards.
fn parse_constrained_ident(label: &str, vals: &[Value]) -> Result<Option<ParsedType>> {
    let first = vals
        .first()
        .ok_or_else(|| Error::Parse("empty intersection".to_string()))?;
    parse_node(label, first)
}

/// Parse a struct's fields into members, capturing optionality.  The
/// struct's own name is set by the caller.
fn parse_struct(v: &Value) -> Result<crate::ir::ParsedStruct> {
    let mut parsed = crate::ir::ParsedStruct::default();

    for field in v.fields(FieldOptions::all())? {
        if field.hidden {
            // Hidden fields never appear in the IR.
            continue;
        }
        let Some(member) = parse_node(&field.label, &field.value)? else {
            continue;
        };
        parsed.members.push(StructField {
            node: member,
            optional: field.optional,
        });
    }

    Ok(parsed)
}

/// Parse a list value.  The syntax is either a list literal or a binary
/// expression whose left side is the list and whose right side carries the
/// default list.
fn parse_array(v: &Value) -> Result<ParsedArray> {
    let mut parsed = ParsedArray::default();

    let mut syn = v.syntax().clone();
    if let Expr::Binary(b) = &syn {
        if let Expr::Unary(u) = &*b.y {
            if u.op == UnaryOp::Default {
                let default = Value::new((*u.x).clone());
                parsed.default = parse_node("", &default)
                    .map_err(|e| Error::Parse(format!("error parsing default: {e}")))?
                    .map(Box::new);
            }
        }
        syn = (*b.x).clone();
    }

    let Expr::List(list) = &syn else {
        return Err(Error::Parse(format!(
            "unknown list syntax: {}",
            variant_name(&syn)
        )));
    };

    if list.elts.is_empty() {
        return Ok(parsed);
    }

    // A leading ellipsis fixes the element shape; otherwise the list is a
    // tuple of literal positions.
    let elts: Vec<Expr> = match &list.elts[0] {
        Expr::Ellipsis(e) => match &e.ty {
            Some(ty) => vec![(**ty).clone()],
            None => Vec::new(),
        },
        _ => list.elts.clone(),
    };

    for elt in &elts {
        let value = Value::new(elt.clone());
        if let Some(node) = parse_syntax("", &value, elt)? {
            parsed.members.push(node);
        }
    }
    Ok(parsed)
}

fn parse_scalar(label: &str, v: &Value) -> Result<ParsedType> {
    let value = v.decode()?;
    Ok(ParsedType::Scalar(ParsedScalar {
        name: label.to_string(),
        value,
        default: None,
    }))
}

fn variant_name(expr: &Expr) -> &'static str {
    match expr {
        Expr::Ident(_) => "Ident",
        Expr::BasicLit(_) => "BasicLit",
        Expr::Binary(_) => "BinaryExpr",
        Expr::Unary(_) => "UnaryExpr",
        Expr::Struct(_) => "StructLit",
        Expr::List(_) => "ListLit",
        Expr::Ellipsis(_) => "Ellipsis",
        Expr::Paren(_) => "Paren",
        Expr::Bottom => "Bottom",
    }
}
