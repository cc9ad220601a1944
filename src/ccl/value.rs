//! Evaluated CCL values.
//!
//! A `Value` is a handle over a syntax node with the semantic queries the
//! translation pipeline needs: incomplete kind, field iteration, operator
//! expansion, primitive decoding, and subsumption.

use serde_json::json;

use super::ast::{self, BinOp, Expr, Lit, Op, UnaryOp};
use super::kind::Kind;
use super::Error;

#[derive(Debug, Clone, PartialEq)]
pub struct Value {
    expr: Expr,
}

/// A single field yielded by `Value::fields`.
#[derive(Debug, Clone)]
pub struct FieldInfo {
    pub label: String,
    pub value: Value,
    pub optional: bool,
    pub hidden: bool,
    pub definition: bool,
    pub doc: Option<String>,
}

/// Which fields `Value::fields` yields.  The default matches the
/// evaluator's top-level iteration: definitions visible, hidden fields
/// suppressed, optional fields included.
#[derive(Debug, Clone, Copy)]
pub struct FieldOptions {
    pub definitions: bool,
    pub hidden: bool,
    pub optional: bool,
}

impl Default for FieldOptions {
    fn default() -> Self {
        FieldOptions {
            definitions: true,
            hidden: false,
            optional: true,
        }
    }
}

impl FieldOptions {
    /// Everything, including hidden fields.
    pub fn all() -> Self {
        FieldOptions {
            definitions: true,
            hidden: true,
            optional: true,
        }
    }
}

impl Value {
    pub fn new(expr: Expr) -> Self {
        Value { expr }
    }

    pub fn bottom() -> Self {
        Value { expr: Expr::Bottom }
    }

    /// The underlying syntax node, defaults and constraints included.
    pub fn syntax(&self) -> &Expr {
        &self.expr
    }

    /// Alias of `syntax`, mirroring the evaluator's source accessor.
    pub fn source(&self) -> &Expr {
        &self.expr
    }

    pub fn into_expr(self) -> Expr {
        self.expr
    }

    pub fn validate(&self) -> Result<(), Error> {
        if self.incomplete_kind().is_bottom() {
            return Err(Error::new("value is bottom"));
        }
        Ok(())
    }

    /// The kind this value would have once all constraints are satisfied.
    pub fn incomplete_kind(&self) -> Kind {
        kind_of(&self.expr)
    }

    /// The top-level operator and its flattened operands.
    ///
    /// A disjunction that carries a default marker is not reported as `Or`;
    /// the caller is expected to inspect the syntax tree for that shape, as
    /// the marked branch is a default rather than a union member.
    pub fn expr(&self) -> (Op, Vec<Value>) {
        match &self.expr {
            Expr::Binary(b) if b.op == BinOp::Or => {
                let leaves = ast::or_leaves(&self.expr);
                let has_default = leaves
                    .iter()
                    .any(|e| matches!(e, Expr::Unary(u) if u.op == UnaryOp::Default));
                if has_default {
                    return (Op::NoOp, vec![self.clone()]);
                }
                (
                    Op::Or,
                    leaves.into_iter().map(|e| Value::new(e.clone())).collect(),
                )
            }
            Expr::Binary(b) if b.op == BinOp::And => (
                Op::And,
                ast::and_leaves(&self.expr)
                    .into_iter()
                    .map(|e| Value::new(e.clone()))
                    .collect(),
            ),
            _ => (Op::NoOp, vec![self.clone()]),
        }
    }

    /// Iterate the fields of a struct-kinded value.
    pub fn fields(&self, opts: FieldOptions) -> Result<Vec<FieldInfo>, Error> {
        let mut out = Vec::new();
        collect_fields(&self.expr, &mut out)?;
        out.retain(|f| {
            (opts.hidden || !f.hidden)
                && (opts.definitions || !f.definition)
                && (opts.optional || !f.optional)
        });
        Ok(out)
    }

    /// Look up a field by label, searching all fields including hidden.
    pub fn lookup(&self, label: &str) -> Option<FieldInfo> {
        let mut all = Vec::new();
        collect_fields(&self.expr, &mut all).ok()?;
        all.into_iter().find(|f| f.label == label)
    }

    /// Decode a concrete value into a language-neutral primitive.
    pub fn decode(&self) -> Result<serde_json::Value, Error> {
        decode_expr(&self.expr)
    }

    /// `self subsumes other`: every value accepted by `other` is accepted
    /// by `self`.
    pub fn subsumes(&self, other: &Value) -> bool {
        subsumes_expr(&self.expr, &other.expr)
    }

    /// The meet of two values.  The result's kind is the intersection of
    /// the operand kinds; bottom when they are disjoint.
    pub fn unify(&self, other: &Value) -> Value {
        if self.incomplete_kind().is_bottom() || other.incomplete_kind().is_bottom() {
            return Value::bottom();
        }
        if (self.incomplete_kind() & other.incomplete_kind()).is_bottom() {
            return Value::bottom();
        }
        Value::new(Expr::Binary(ast::BinaryExpr {
            op: BinOp::And,
            x: Box::new(self.expr.clone()),
            y: Box::new(other.expr.clone()),
        }))
    }
}

// ------------------------------ Kinds ------------------------------------- //

fn kind_of(expr: &Expr) -> Kind {
    match expr {
        Expr::Ident(id) => Kind::of_ident(&id.name),
        Expr::BasicLit(b) => match b.lit {
            Lit::Null => Kind::NULL,
            Lit::Bool(_) => Kind::BOOL,
            Lit::Int(_) => Kind::INT,
            Lit::Float(_) => Kind::FLOAT,
            Lit::Str(_) => Kind::STRING,
        },
        Expr::Struct(_) => Kind::STRUCT,
        Expr::List(_) => Kind::LIST,
        Expr::Binary(b) => match b.op {
            BinOp::Or => kind_of(&b.x) | kind_of(&b.y),
            BinOp::And => kind_of(&b.x) & kind_of(&b.y),
        },
        Expr::Unary(u) => match u.op {
            UnaryOp::Default => kind_of(&u.x),
            // A relational constraint accepts the whole family of its
            // operand's kind: `>=5` admits ints and floats.
            _ => {
                let k = kind_of(&u.x);
                if k.contains(Kind::INT) || k.contains(Kind::FLOAT) {
                    Kind::NUMBER
                } else {
                    k
                }
            }
        },
        Expr::Ellipsis(e) => e.ty.as_ref().map_or(Kind::TOP, |t| kind_of(t)),
        Expr::Paren(inner) => kind_of(inner),
        Expr::Bottom => Kind::BOTTOM,
    }
}

// ------------------------------ Fields ------------------------------------ //

fn collect_fields(expr: &Expr, out: &mut Vec<FieldInfo>) -> Result<(), Error> {
    match expr {
        Expr::Struct(s) => {
            for f in &s.fields {
                out.push(FieldInfo {
                    label: f.label.clone(),
                    value: Value::new(f.value.clone()),
                    optional: f.optional,
                    hidden: f.hidden,
                    definition: f.is_definition(),
                    doc: f.doc.clone(),
                });
            }
            Ok(())
        }
        // Unification of two structs iterates the merged field set; a label
        // on both sides carries the meet of the two values.
        Expr::Binary(b) if b.op == BinOp::And => {
            let mut left = Vec::new();
            collect_fields(&b.x, &mut left)?;
            let mut right = Vec::new();
            collect_fields(&b.y, &mut right)?;
            for rf in right {
                if let Some(lf) = left.iter_mut().find(|lf| lf.label == rf.label) {
                    lf.value = lf.value.unify(&rf.value);
                    lf.optional = lf.optional && rf.optional;
                } else {
                    left.push(rf);
                }
            }
            out.extend(left);
            Ok(())
        }
        Expr::Paren(inner) => collect_fields(inner, out),
        Expr::Unary(u) if u.op == UnaryOp::Default => collect_fields(&u.x, out),
        other => Err(Error::new(format!(
            "cannot iterate fields of {} value",
            kind_of(other)
        ))),
    }
}

// ------------------------------ Decode ------------------------------------ //

fn decode_expr(expr: &Expr) -> Result<serde_json::Value, Error> {
    match expr {
        Expr::BasicLit(b) => Ok(match &b.lit {
            Lit::Null => serde_json::Value::Null,
            Lit::Bool(v) => json!(v),
            Lit::Int(v) => json!(v),
            Lit::Float(v) => json!(v),
            Lit::Str(v) => json!(v),
        }),
        Expr::List(l) => {
            let mut out = Vec::new();
            for elt in &l.elts {
                if matches!(elt, Expr::Ellipsis(_)) {
                    return Err(Error::new("cannot decode open list"));
                }
                out.push(decode_expr(elt)?);
            }
            Ok(serde_json::Value::Array(out))
        }
        Expr::Struct(s) => {
            let mut map = serde_json::Map::new();
            for f in &s.fields {
                if f.optional || f.hidden {
                    continue;
                }
                map.insert(f.label.clone(), decode_expr(&f.value)?);
            }
            Ok(serde_json::Value::Object(map))
        }
        Expr::Unary(u) if u.op == UnaryOp::Default => decode_expr(&u.x),
        Expr::Paren(inner) => decode_expr(inner),
        other => Err(Error::new(format!(
            "cannot decode non-concrete {} value",
            kind_of(other)
        ))),
    }
}

// ---------------------------- Subsumption --------------------------------- //

fn strip(expr: &Expr) -> &Expr {
    match expr {
        Expr::Paren(inner) => strip(inner),
        Expr::Unary(u) if u.op == UnaryOp::Default => strip(&u.x),
        other => other,
    }
}

fn subsumes_expr(a: &Expr, b: &Expr) -> bool {
    let a = strip(a);
    let b = strip(b);

    if matches!(b, Expr::Bottom) {
        return true;
    }
    if matches!(a, Expr::Bottom) {
        return false;
    }

    // Top accepts anything.
    if let Expr::Ident(id) = a {
        if id.name == "_" {
            return true;
        }
    }

    // A union on the right requires every branch to be subsumed.
    if let Expr::Binary(bb) = b {
        if bb.op == BinOp::Or {
            return ast::or_leaves(b).into_iter().all(|l| subsumes_expr(a, l));
        }
    }

    match a {
        Expr::Binary(ab) if ab.op == BinOp::Or => {
            ast::or_leaves(a).into_iter().any(|l| subsumes_expr(l, b))
        }
        // Every conjunct must admit the candidate.
        Expr::Binary(ab) if ab.op == BinOp::And => {
            ast::and_leaves(a).into_iter().all(|l| subsumes_expr(l, b))
        }
        Expr::Ident(id) => {
            let ak = Kind::of_ident(&id.name);
            match b {
                Expr::Ident(bid) => ak.contains(Kind::of_ident(&bid.name)),
                Expr::BasicLit(_) => ak.contains(kind_of(b)),
                // A constraint is narrower than its kind family.
                Expr::Binary(bb) if bb.op == BinOp::And => {
                    ast::and_leaves(b).iter().any(|l| subsumes_expr(a, l))
                }
                Expr::Unary(_) => ak.contains(kind_of(b)),
                _ => false,
            }
        }
        Expr::BasicLit(al) => match b {
            Expr::BasicLit(bl) => al.lit == bl.lit,
            _ => false,
        },
        Expr::Unary(au) => subsumes_constraint(au, b),
        Expr::Struct(_) => subsumes_struct(a, b),
        Expr::List(al) => subsumes_list(al, b),
        _ => false,
    }
}

fn subsumes_constraint(au: &ast::UnaryExpr, b: &Expr) -> bool {
    // Constraint vs constraint: same operator with a bound at least as
    // permissive.
    if let Expr::Unary(bu) = b {
        if au.op == bu.op {
            if let (Ok(av), Ok(bv)) = (decode_expr(&au.x), decode_expr(&bu.x)) {
                if let (Some(af), Some(bf)) = (av.as_f64(), bv.as_f64()) {
                    return match au.op {
                        UnaryOp::Ge => af <= bf,
                        UnaryOp::Gt => af <= bf,
                        UnaryOp::Le => af >= bf,
                        UnaryOp::Lt => af >= bf,
                        UnaryOp::Ne => av == bv,
                        UnaryOp::Default => true,
                    };
                }
                return av == bv;
            }
        }
        return false;
    }

    // Constraint vs concrete literal: evaluate the comparison.
    let (Ok(bound), Ok(val)) = (decode_expr(&au.x), decode_expr(b)) else {
        return false;
    };
    match (bound.as_f64(), val.as_f64()) {
        (Some(bf), Some(vf)) => match au.op {
            UnaryOp::Gt => vf > bf,
            UnaryOp::Ge => vf >= bf,
            UnaryOp::Lt => vf < bf,
            UnaryOp::Le => vf <= bf,
            UnaryOp::Ne => vf != bf,
            UnaryOp::Default => true,
        },
        _ => match au.op {
            UnaryOp::Ne => bound != val,
            _ => false,
        },
    }
}

fn subsumes_struct(a: &Expr, b: &Expr) -> bool {
    let av = Value::new(a.clone());
    let bv = Value::new(b.clone());
    if bv.incomplete_kind() != Kind::STRUCT {
        return false;
    }
    let Ok(afields) = av.fields(FieldOptions::all()) else {
        return false;
    };
    let Ok(bfields) = bv.fields(FieldOptions::all()) else {
        return false;
    };
    for af in &afields {
        match bfields.iter().find(|bf| bf.label == af.label) {
            Some(bf) => {
                // A required field cannot subsume an optional one: the
                // candidate admits values without it.
                if !af.optional && bf.optional {
                    return false;
                }
                if !af.value.subsumes(&bf.value) {
                    return false;
                }
            }
            None => {
                if !af.optional {
                    return false;
                }
            }
        }
    }
    // Structs are open: extra fields on the candidate are fine.
    true
}

fn subsumes_list(al: &ast::ListLit, b: &Expr) -> bool {
    let Expr::List(bl) = b else { return false };

    match al.elts.first() {
        Some(Expr::Ellipsis(ae)) => {
            let Some(aty) = ae.ty.as_deref() else {
                // `[...]` accepts any list.
                return true;
            };
            match bl.elts.first() {
                Some(Expr::Ellipsis(be)) => match be.ty.as_deref() {
                    Some(bty) => subsumes_expr(aty, bty),
                    None => matches!(strip(aty), Expr::Ident(id) if id.name == "_"),
                },
                _ => bl.elts.iter().all(|e| subsumes_expr(aty, e)),
            }
        }
        _ => {
            // Tuple vs tuple: positionwise.
            if bl.elts.iter().any(|e| matches!(e, Expr::Ellipsis(_))) {
                return false;
            }
            al.elts.len() == bl.elts.len()
                && al
                    .elts
                    .iter()
                    .zip(bl.elts.iter())
                    .all(|(x, y)| subsumes_expr(x, y))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccl::parse_value;

    fn v(src: &str) -> Value {
        parse_value(src).unwrap()
    }

    #[test]
    fn kinds_of_unions_and_constraints() {
        assert_eq!(v("string").incomplete_kind(), Kind::STRING);
        assert_eq!(v("\"a\" | \"b\"").incomplete_kind(), Kind::STRING);
        assert_eq!(v("{ a: int }").incomplete_kind(), Kind::STRUCT);
        assert_eq!(v("[...int]").incomplete_kind(), Kind::LIST);
        assert_eq!(v("int & >=5").incomplete_kind(), Kind::INT);
        assert_eq!(v("int | *8").incomplete_kind(), Kind::INT);
        assert_eq!(
            v("string | int").incomplete_kind(),
            Kind::STRING | Kind::INT
        );
    }

    #[test]
    fn expr_reports_ops() {
        let (op, vals) = v("\"a\" | \"b\" | \"c\"").expr();
        assert_eq!(op, Op::Or);
        assert_eq!(vals.len(), 3);

        let (op, _) = v("int & >=5").expr();
        assert_eq!(op, Op::And);

        // A defaulted disjunction is not reported as a union.
        let (op, _) = v("int | *8").expr();
        assert_eq!(op, Op::NoOp);

        let (op, _) = v("string").expr();
        assert_eq!(op, Op::NoOp);
    }

    #[test]
    fn subsumption_basics() {
        assert!(v("string").subsumes(&v("\"hi\"")));
        assert!(!v("\"hi\"").subsumes(&v("string")));
        assert!(v("_").subsumes(&v("{ a: int }")));
        assert!(v("number").subsumes(&v("int")));
        assert!(!v("int").subsumes(&v("number")));
        assert!(v("\"a\" | \"b\"").subsumes(&v("\"a\"")));
        assert!(v("string | int").subsumes(&v("\"a\" | \"b\"")));
    }

    #[test]
    fn subsumption_structs() {
        assert!(v("{ a: int }").subsumes(&v("{ a: 1, b: 2 }")));
        assert!(!v("{ a: int }").subsumes(&v("{ b: 2 }")));
        assert!(v("{ a?: int }").subsumes(&v("{ b: 2 }")));
        assert!(v("{ a: { b: string } }").subsumes(&v("{ a: { b: \"x\" } }")));
        // Same fields in a different order are mutually subsuming.
        assert!(v("{ a: int, b: string }").subsumes(&v("{ b: string, a: int }")));
        assert!(v("{ b: string, a: int }").subsumes(&v("{ a: int, b: string }")));
    }

    #[test]
    fn subsumption_lists_and_constraints() {
        assert!(v("[...string]").subsumes(&v("[\"a\", \"b\"]")));
        assert!(v("[...string]").subsumes(&v("[...string]")));
        assert!(!v("[...string]").subsumes(&v("[1]")));
        assert!(v("[...]").subsumes(&v("[1, \"a\"]")));
        assert!(v("int & >=5").subsumes(&v("7")));
        assert!(!v("int & >=5").subsumes(&v("3")));
    }

    #[test]
    fn fields_honor_options() {
        let val = v("{ a: int, b?: string, _c: bool }");
        let defaults = val.fields(FieldOptions::default()).unwrap();
        assert_eq!(defaults.len(), 2);
        let all = val.fields(FieldOptions::all()).unwrap();
        assert_eq!(all.len(), 3);
        assert!(val.lookup("_c").is_some());
        assert!(val.lookup("missing").is_none());
    }

    #[test]
    fn unification_of_structs_merges_fields() {
        let val = v("{ a: int } & { b: string }");
        assert_eq!(val.incomplete_kind(), Kind::STRUCT);
        let fields = val.fields(FieldOptions::all()).unwrap();
        assert_eq!(fields.len(), 2);
    }

    #[test]
    fn decode_concrete_values() {
        assert_eq!(v("42").decode().unwrap(), serde_json::json!(42));
        assert_eq!(v("\"x\"").decode().unwrap(), serde_json::json!("x"));
        assert_eq!(
            v("[1, 2]").decode().unwrap(),
            serde_json::json!([1, 2])
        );
        assert!(v("string").decode().is_err());
    }
}
