//! TypeScript declaration generator.
//!
//! Lowers the IR into `export interface` / `export type` / `export const`
//! declarations.  Emission is depth-first: the depth counter doubles as the
//! top-level-vs-nested flag and as the indentation level, so it is threaded
//! explicitly through every call.

pub mod ast;

use tracing::debug;

use self::ast::{AstKind, Binding, BindingKind, KeyValue, Local, LocalKind, Scalar, TypeRef};
use crate::ccl::{Runtime, Value};
use crate::error::Result;
use crate::ir::{ParsedArray, ParsedEnum, ParsedStruct, ParsedType};

/// Generate TypeScript declarations from CCL source text.
pub fn marshal_string(src: &str) -> Result<String> {
    let runtime = Runtime::new();
    let inst = runtime.compile(".", src)?;
    marshal_value(&inst.value())
}

/// Generate TypeScript declarations from a CCL value holding a top-level
/// struct of named definitions.
pub fn marshal_value(v: &Value) -> Result<String> {
    v.validate()?;
    let parsed = crate::parse::parse_value(v)?;
    marshal_parsed(&parsed)
}

/// Generate TypeScript declarations from parsed IR.  Declarations are
/// separated by blank lines and the output terminates with a newline.
pub fn marshal_parsed(nodes: &[ParsedType]) -> Result<String> {
    let mut decls: Vec<String> = Vec::new();
    for node in nodes {
        debug!(name = node.name(), kind = node.kind(), "emitting declaration");
        decls.extend(top_decls(node)?);
    }
    Ok(decls.join("\n\n") + "\n")
}

/// Emit the top-level declarations for one IR node, hoisted declarations
/// first.  Top-level nodes sit at depth 1.
fn top_decls(node: &ParsedType) -> Result<Vec<String>> {
    let name = export_name(node.name());
    match node {
        ParsedType::Struct(s) => {
            let (mut decls, binding) = struct_binding(s, 1)?;
            decls.push(
                Local {
                    kind: LocalKind::Interface,
                    name,
                    ty: None,
                    is_export: true,
                    value: Box::new(binding),
                    as_type: None,
                }
                .to_string(),
            );
            Ok(decls)
        }
        ParsedType::Array(a) => {
            let (mut decls, binding) = array_binding(a, 1)?;
            decls.push(type_alias(&name, binding));
            Ok(decls)
        }
        ParsedType::Enum(e) => {
            let (decls, _) = hoist_enum(&name, e)?;
            Ok(decls)
        }
        ParsedType::Ident(i) => Ok(vec![type_alias(
            &name,
            AstKind::Type(TypeRef {
                value: ident_to_ts(&i.ident),
            }),
        )]),
        ParsedType::Scalar(s) => Ok(vec![type_alias(
            &name,
            AstKind::Scalar(Scalar {
                value: s.value.clone(),
            }),
        )]),
    }
}

/// Emit a node in type position.  Returns any hoisted top-level
/// declarations alongside the inline fragment.
fn fragment(node: &ParsedType, depth: usize) -> Result<(Vec<String>, AstKind)> {
    match node {
        ParsedType::Ident(i) => Ok((
            Vec::new(),
            AstKind::Type(TypeRef {
                value: ident_to_ts(&i.ident),
            }),
        )),
        ParsedType::Scalar(s) => Ok((
            Vec::new(),
            AstKind::Scalar(Scalar {
                value: s.value.clone(),
            }),
        )),
        ParsedType::Struct(s) => {
            let (decls, binding) = struct_binding(s, depth)?;
            Ok((decls, binding))
        }
        ParsedType::Array(a) => array_binding(a, depth),
        ParsedType::Enum(e) => enum_fragment(e, depth),
    }
}

/// An object type literal.  Members sit one depth further in; the closing
/// brace is indented to `depth - 1`.
fn struct_binding(s: &ParsedStruct, depth: usize) -> Result<(Vec<String>, AstKind)> {
    let mut decls = Vec::new();
    let mut members = Vec::new();
    for field in &s.members {
        let (hoisted, frag) = fragment(&field.node, depth + 1)?;
        decls.extend(hoisted);
        members.push(AstKind::KeyValue(KeyValue {
            key: field.node.name().to_string(),
            value: Box::new(frag),
            optional: field.optional,
        }));
    }
    Ok((
        decls,
        AstKind::Binding(Binding {
            indent_level: depth - 1,
            kind: BindingKind::Type,
            members,
        }),
    ))
}

/// A typed array.  Members are emitted at the array's own depth: the array
/// is not an indented container, so its elements print at one depth less
/// than ordinary nesting would give them.
fn array_binding(a: &ParsedArray, depth: usize) -> Result<(Vec<String>, AstKind)> {
    let mut decls = Vec::new();
    let mut members = Vec::new();
    for member in &a.members {
        let (hoisted, frag) = fragment(member, depth)?;
        decls.extend(hoisted);
        members.push(frag);
    }
    Ok((
        decls,
        AstKind::Binding(Binding {
            indent_level: depth - 1,
            kind: BindingKind::TypedArray,
            members,
        }),
    ))
}

/// Emit an enum in type position.
///
/// Anonymous enums and enums of type idents inline as a disjunction, as do
/// scalar enums with fewer than three members.  Everything else hoists: a
/// scalar enum becomes the const-object pair, any other member mix becomes
/// an exported type alias.
fn enum_fragment(e: &ParsedEnum, depth: usize) -> Result<(Vec<String>, AstKind)> {
    let all_ident = e.members.iter().all(|m| matches!(m, ParsedType::Ident(_)));
    let all_scalar = e.members.iter().all(|m| matches!(m, ParsedType::Scalar(_)));

    let inline = e.name.is_empty()
        || all_ident
        || (all_scalar && dedup_count(e)? < 3);

    if inline {
        let mut decls = Vec::new();
        let mut members = Vec::new();
        let mut seen = Vec::new();
        for member in &e.members {
            let (hoisted, frag) = fragment(member, depth)?;
            decls.extend(hoisted);
            let printed = frag.to_string();
            if seen.contains(&printed) {
                continue;
            }
            seen.push(printed);
            members.push(frag);
        }
        return Ok((
            decls,
            AstKind::Binding(Binding {
                indent_level: depth - 1,
                kind: BindingKind::Disjunction,
                members,
            }),
        ));
    }

    hoist_enum(&export_name(&e.name), e)
}

/// Emit an enum as top-level declarations, returning a reference to it as
/// the fragment.
fn hoist_enum(name: &str, e: &ParsedEnum) -> Result<(Vec<String>, AstKind)> {
    let all_scalar = e.members.iter().all(|m| matches!(m, ParsedType::Scalar(_)));

    // Hoisted members render at depth 1: they now live in a top-level
    // declaration of their own.
    let mut decls = Vec::new();
    let mut members = Vec::new();
    let mut seen = Vec::new();
    for member in &e.members {
        let (hoisted, frag) = fragment(member, 1)?;
        decls.extend(hoisted);
        let printed = frag.to_string();
        if seen.contains(&printed) {
            continue;
        }
        seen.push(printed);
        members.push(frag);
    }

    if all_scalar {
        // An object of the enum's values keyed by their uppercased text,
        // then a type alias deriving the union from the object.
        let entries = members
            .iter()
            .map(|m| {
                let AstKind::Scalar(s) = m else {
                    unreachable!("scalar enum member");
                };
                AstKind::KeyValue(KeyValue {
                    key: s.unquoted().to_uppercase(),
                    value: Box::new(m.clone()),
                    optional: false,
                })
            })
            .collect();

        let const_obj = Local {
            kind: LocalKind::Const,
            name: name.to_string(),
            ty: None,
            is_export: true,
            value: Box::new(AstKind::Binding(Binding {
                indent_level: 0,
                kind: BindingKind::Object,
                members: entries,
            })),
            as_type: Some("const".to_string()),
        };
        let alias = type_alias(
            name,
            AstKind::Type(TypeRef {
                value: format!("typeof {name}[keyof typeof {name}]"),
            }),
        );
        decls.push(format!("{const_obj}\n{alias}"));
    } else {
        decls.push(type_alias(
            name,
            AstKind::Binding(Binding {
                indent_level: 0,
                kind: BindingKind::Disjunction,
                members,
            }),
        ));
    }

    Ok((
        decls,
        AstKind::Type(TypeRef {
            value: name.to_string(),
        }),
    ))
}

/// Number of distinct printed member forms, for the inline threshold.
fn dedup_count(e: &ParsedEnum) -> Result<usize> {
    let mut seen = Vec::new();
    for member in &e.members {
        let (_, frag) = fragment(member, 1)?;
        let printed = frag.to_string();
        if !seen.contains(&printed) {
            seen.push(printed);
        }
    }
    Ok(seen.len())
}

fn type_alias(name: &str, value: AstKind) -> String {
    Local {
        kind: LocalKind::Type,
        name: name.to_string(),
        ty: None,
        is_export: true,
        value: Box::new(value),
        as_type: None,
    }
    .to_string()
}

/// The exported declaration name: sigil stripped, first character
/// uppercased, remainder preserved.
fn export_name(label: &str) -> String {
    let stripped = label.trim_start_matches('#');
    let mut chars = stripped.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// TypeScript type text for a CCL type identifier.
fn ident_to_ts(name: &str) -> String {
    match name {
        "bool" => "boolean".to_string(),
        "float" | "int" | "number" | "uint" | "int8" | "int16" | "int32" | "int64" | "uint8"
        | "uint16" | "uint32" | "uint64" | "float32" | "float64" => "number".to_string(),
        "_" => "unknown".to_string(),
        "[...]" => "Array<unknown>".to_string(),
        "{...}" => "{ [key: string]: unknown }".to_string(),
        other => other.replace('#', ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_enum_of_two_scalars() {
        let out = marshal_string(r#"#X: { kind: "a" | "b" }"#).unwrap();
        assert_eq!(out, "export interface X {\n  kind: \"a\" | \"b\";\n};\n");
    }

    #[test]
    fn three_scalars_hoist_to_a_const_enum() {
        let out = marshal_string(r#"#X: { status: "ok" | "err" | "pending" }"#).unwrap();
        let expected = concat!(
            "export const Status = {\n",
            "  OK: \"ok\",\n",
            "  ERR: \"err\",\n",
            "  PENDING: \"pending\",\n",
            "} as const;\n",
            "export type Status = typeof Status[keyof typeof Status];\n",
            "\n",
            "export interface X {\n",
            "  status: Status;\n",
            "};\n",
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn array_of_heterogeneous_primitives() {
        let out = marshal_string("#Y: [...string | int]").unwrap();
        assert_eq!(out, "export type Y = Array<string | number>;\n");
    }

    #[test]
    fn enum_members_deduplicate_by_printed_form() {
        let out = marshal_string("#Y: [...int | float]").unwrap();
        assert_eq!(out, "export type Y = Array<number>;\n");
    }

    #[test]
    fn nested_structs_inline() {
        let out = marshal_string(
            "#Event: {\n  name: string\n  data: {\n    enabled: bool\n  }\n}",
        )
        .unwrap();
        let expected = concat!(
            "export interface Event {\n",
            "  name: string;\n",
            "  data: {\n",
            "    enabled: boolean;\n",
            "  };\n",
            "};\n",
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn array_elements_print_at_the_array_depth() {
        let out = marshal_string("#Event: {\n  friends: [...{\n    id: int\n  }]\n}").unwrap();
        let expected = concat!(
            "export interface Event {\n",
            "  friends: Array<{\n",
            "    id: number;\n",
            "  }>;\n",
            "};\n",
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn top_level_scalars_and_idents() {
        assert_eq!(
            marshal_string("#MyVar: string").unwrap(),
            "export type MyVar = string;\n"
        );
        assert_eq!(
            marshal_string(r#"#Def: "scalar""#).unwrap(),
            "export type Def = \"scalar\";\n"
        );
    }

    #[test]
    fn top_level_ident_enum_is_a_type_alias() {
        assert_eq!(
            marshal_string("#Mixed: string | int").unwrap(),
            "export type Mixed = string | number;\n"
        );
    }

    #[test]
    fn optional_and_quoted_keys() {
        let out = marshal_string("#User: {\n  \"e-mail\": string\n  name?: string\n}").unwrap();
        let expected = concat!(
            "export interface User {\n",
            "  \"e-mail\": string;\n",
            "  name?: string;\n",
            "};\n",
        );
        assert_eq!(out, expected);
    }

    #[test]
    fn hoisted_declarations_precede_their_container() {
        let out = marshal_string(
            "#Event: {\n  action: \"push\" | \"pull\" | \"rebase\"\n  count: int\n}",
        )
        .unwrap();
        let action = out.find("export const Action").unwrap();
        let event = out.find("export interface Event").unwrap();
        assert!(action < event);
        assert!(out.contains("  action: Action;\n"));
    }

    #[test]
    fn mixed_member_enum_hoists_a_type_alias() {
        let out = marshal_string("#Event: {\n  value: \"auto\" | int\n}").unwrap();
        let expected = concat!(
            "export type Value = \"auto\" | number;\n",
            "\n",
            "export interface Event {\n",
            "  value: Value;\n",
            "};\n",
        );
        assert_eq!(out, expected);
    }
}
