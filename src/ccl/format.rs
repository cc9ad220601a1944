//! Canonical formatting of CCL syntax trees.

use super::ast::{Expr, Field, Lit, StructLit};

#[derive(Debug, Clone, Copy)]
pub struct FormatOptions {
    pub tab_indent: bool,
    pub spaces: usize,
    /// Print doc comments above fields.
    pub docs: bool,
    /// Print the `?` marker on optional fields.
    pub optional: bool,
}

impl Default for FormatOptions {
    fn default() -> Self {
        FormatOptions {
            tab_indent: false,
            spaces: 2,
            docs: true,
            optional: true,
        }
    }
}

/// Render a syntax node as canonical source text.
pub fn node(expr: &Expr, opts: &FormatOptions) -> String {
    let mut out = String::new();
    write_expr(&mut out, expr, 0, opts);
    out
}

fn indent(out: &mut String, level: usize, opts: &FormatOptions) {
    if opts.tab_indent {
        for _ in 0..level {
            out.push('\t');
        }
    } else {
        for _ in 0..level * opts.spaces {
            out.push(' ');
        }
    }
}

fn write_expr(out: &mut String, expr: &Expr, level: usize, opts: &FormatOptions) {
    match expr {
        Expr::Ident(id) => out.push_str(&id.name),
        Expr::BasicLit(b) => write_lit(out, &b.lit),
        Expr::Binary(b) => {
            write_expr(out, &b.x, level, opts);
            out.push(' ');
            out.push_str(&b.op.to_string());
            out.push(' ');
            write_expr(out, &b.y, level, opts);
        }
        Expr::Unary(u) => {
            out.push_str(&u.op.to_string());
            write_expr(out, &u.x, level, opts);
        }
        Expr::Struct(s) => write_struct(out, s, level, opts),
        Expr::List(l) => {
            out.push('[');
            for (n, elt) in l.elts.iter().enumerate() {
                if n > 0 {
                    out.push_str(", ");
                }
                write_expr(out, elt, level, opts);
            }
            out.push(']');
        }
        Expr::Ellipsis(e) => {
            out.push_str("...");
            if let Some(ty) = &e.ty {
                write_expr(out, ty, level, opts);
            }
        }
        Expr::Paren(inner) => {
            out.push('(');
            write_expr(out, inner, level, opts);
            out.push(')');
        }
        Expr::Bottom => out.push_str("_|_"),
    }
}

fn write_struct(out: &mut String, s: &StructLit, level: usize, opts: &FormatOptions) {
    if s.fields.is_empty() {
        out.push_str("{}");
        return;
    }
    out.push_str("{\n");
    for field in &s.fields {
        write_field(out, field, level + 1, opts);
    }
    indent(out, level, opts);
    out.push('}');
}

fn write_field(out: &mut String, field: &Field, level: usize, opts: &FormatOptions) {
    if opts.docs {
        if let Some(doc) = &field.doc {
            for line in doc.lines() {
                indent(out, level, opts);
                out.push_str("// ");
                out.push_str(line);
                out.push('\n');
            }
        }
    }
    indent(out, level, opts);
    out.push_str(&quote_label(&field.label));
    if field.optional && opts.optional {
        out.push('?');
    }
    out.push_str(": ");
    write_expr(out, &field.value, level, opts);
    out.push('\n');
}

fn quote_label(label: &str) -> String {
    let ident_like = !label.is_empty()
        && label
            .chars()
            .next()
            .is_some_and(|c| c.is_ascii_alphabetic() || c == '_' || c == '#')
        && label
            .chars()
            .skip(1)
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if ident_like {
        label.to_string()
    } else {
        serde_json::Value::String(label.to_string()).to_string()
    }
}

fn write_lit(out: &mut String, lit: &Lit) {
    match lit {
        Lit::Null => out.push_str("null"),
        Lit::Bool(v) => out.push_str(if *v { "true" } else { "false" }),
        Lit::Int(v) => out.push_str(&v.to_string()),
        Lit::Float(v) => {
            if v.fract() == 0.0 && v.is_finite() {
                out.push_str(&format!("{v:.1}"));
            } else {
                out.push_str(&v.to_string());
            }
        }
        Lit::Str(v) => out.push_str(&serde_json::Value::String(v.clone()).to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccl::parse_value;

    fn fmt(src: &str) -> String {
        node(parse_value(src).unwrap().syntax(), &FormatOptions::default())
    }

    #[test]
    fn formats_structs() {
        assert_eq!(
            fmt("{ name: string, age?: int & >=0 | *21 }"),
            "{\n  name: string\n  age?: int & >=0 | *21\n}"
        );
    }

    #[test]
    fn formats_nested_structs_with_indent() {
        assert_eq!(
            fmt("{ a: { b: [...string] } }"),
            "{\n  a: {\n    b: [...string]\n  }\n}"
        );
    }

    #[test]
    fn formats_literals() {
        assert_eq!(fmt("[1, 2.5, \"x\", true, null]"), "[1, 2.5, \"x\", true, null]");
        assert_eq!(fmt("1.0"), "1.0");
    }

    #[test]
    fn quotes_non_ident_labels() {
        assert_eq!(
            fmt("{ \"e-mail\": string }"),
            "{\n  \"e-mail\": string\n}"
        );
    }

    #[test]
    fn doc_comments_round_trip() {
        let src = "{\n  // The name.\n  name: string\n}";
        assert_eq!(fmt(src), src);
    }

    #[test]
    fn optional_markers_can_be_suppressed() {
        let opts = FormatOptions { optional: false, ..FormatOptions::default() };
        let v = parse_value("{ a?: int }").unwrap();
        assert_eq!(node(v.syntax(), &opts), "{\n  a: int\n}");
    }
}
