//! Recursive-descent parser producing the CCL syntax tree.
//!
//! A compilation unit is a sequence of fields; the parser returns them as a
//! single `StructLit`.  Fields are separated by newlines or commas, and doc
//! comments immediately preceding a field are attached to it.

use super::ast::{
    BinOp, BinaryExpr, Ellipsis, Expr, Field, ListLit, StructLit, UnaryExpr, UnaryOp,
};
use super::lexer::{tokenize, Token};
use super::Error;

pub fn parse_file(src: &str) -> Result<StructLit, Error> {
    let tokens = tokenize(src)?;
    let mut p = Parser { tokens, pos: 0 };

    // A unit is either a sequence of top-level fields or one brace-wrapped
    // struct; both denote the same struct value.
    let first = p
        .tokens
        .iter()
        .find(|t| !matches!(t, Token::Newline | Token::Comment(_)));
    if first == Some(&Token::LBrace) {
        while matches!(p.peek(), Token::Newline | Token::Comment(_)) {
            p.pos += 1;
        }
        let expr = p.parse_expr()?;
        p.skip_separators();
        p.expect(Token::Eof)?;
        return match expr {
            Expr::Struct(unit) => Ok(unit),
            other => Err(Error::new(format!(
                "compilation unit must be a struct, found {other:?}"
            ))),
        };
    }

    let fields = p.parse_fields(Token::Eof)?;
    p.expect(Token::Eof)?;
    Ok(StructLit { fields })
}

/// Parse a single expression, e.g. `{ a: int }` or `string | int`.
pub fn parse_expr_str(src: &str) -> Result<Expr, Error> {
    let tokens = tokenize(src)?;
    let mut p = Parser { tokens, pos: 0 };
    p.skip_separators();
    let expr = p.parse_expr()?;
    p.skip_separators();
    p.expect(Token::Eof)?;
    Ok(expr)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn next(&mut self) -> Token {
        let tok = self.tokens.get(self.pos).cloned().unwrap_or(Token::Eof);
        self.pos += 1;
        tok
    }

    fn expect(&mut self, want: Token) -> Result<(), Error> {
        let got = self.next();
        if got == want {
            Ok(())
        } else {
            Err(Error::new(format!("expected {want:?}, found {got:?}")))
        }
    }

    fn skip_separators(&mut self) {
        while matches!(self.peek(), Token::Newline | Token::Comma) {
            self.pos += 1;
        }
    }

    /// Parse fields until `close` is seen.  Leaves `close` unconsumed.
    fn parse_fields(&mut self, close: Token) -> Result<Vec<Field>, Error> {
        let mut fields = Vec::new();
        loop {
            // Collect doc comment lines; anything not directly followed by
            // a field is dropped as trivia.
            let mut doc_lines: Vec<String> = Vec::new();
            loop {
                match self.peek() {
                    Token::Comment(text) => {
                        doc_lines.push(text.clone());
                        self.pos += 1;
                    }
                    Token::Newline | Token::Comma => {
                        self.pos += 1;
                        // A blank line detaches preceding comments.
                        if matches!(self.peek(), Token::Newline) {
                            doc_lines.clear();
                        }
                    }
                    _ => break,
                }
            }

            if *self.peek() == close {
                return Ok(fields);
            }

            // `...` inside a struct marks it open; structs are open here
            // regardless, so the marker is consumed and dropped.
            if *self.peek() == Token::Ellipsis {
                self.pos += 1;
                continue;
            }

            let mut field = self.parse_field()?;
            if !doc_lines.is_empty() {
                field.doc = Some(doc_lines.join("\n"));
            }
            fields.push(field);

            match self.peek() {
                Token::Newline | Token::Comma => self.skip_separators(),
                // A trailing comment on the field's line is not a doc.
                Token::Comment(_) => self.pos += 1,
                tok if *tok == close => return Ok(fields),
                other => {
                    return Err(Error::new(format!(
                        "expected field separator, found {other:?}"
                    )))
                }
            }
        }
    }

    fn parse_field(&mut self) -> Result<Field, Error> {
        let label = match self.next() {
            Token::Ident(name) => name,
            Token::Str(name) => name,
            other => return Err(Error::new(format!("expected field label, found {other:?}"))),
        };
        let optional = if *self.peek() == Token::Question {
            self.pos += 1;
            true
        } else {
            false
        };
        self.expect(Token::Colon)?;
        self.skip_newlines_only();
        let value = self.parse_expr()?;
        let hidden = label.starts_with('_') && !label.starts_with("__");
        Ok(Field {
            label,
            value,
            optional,
            hidden,
            doc: None,
        })
    }

    fn skip_newlines_only(&mut self) {
        while matches!(self.peek(), Token::Newline) {
            self.pos += 1;
        }
    }

    fn parse_expr(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_and()?;
        while *self.peek() == Token::Pipe {
            self.pos += 1;
            self.skip_newlines_only();
            let rhs = self.parse_and()?;
            lhs = Expr::Binary(BinaryExpr {
                op: BinOp::Or,
                x: Box::new(lhs),
                y: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expr, Error> {
        let mut lhs = self.parse_unary()?;
        while *self.peek() == Token::Amp {
            self.pos += 1;
            self.skip_newlines_only();
            let rhs = self.parse_unary()?;
            lhs = Expr::Binary(BinaryExpr {
                op: BinOp::And,
                x: Box::new(lhs),
                y: Box::new(rhs),
            });
        }
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, Error> {
        let op = match self.peek() {
            Token::Star => Some(UnaryOp::Default),
            Token::Gt => Some(UnaryOp::Gt),
            Token::Ge => Some(UnaryOp::Ge),
            Token::Lt => Some(UnaryOp::Lt),
            Token::Le => Some(UnaryOp::Le),
            Token::Ne => Some(UnaryOp::Ne),
            _ => None,
        };
        if let Some(op) = op {
            self.pos += 1;
            self.skip_newlines_only();
            let x = self.parse_unary()?;
            return Ok(Expr::Unary(UnaryExpr { op, x: Box::new(x) }));
        }
        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Result<Expr, Error> {
        match self.next() {
            Token::Ident(name) => match name.as_str() {
                "true" => Ok(Expr::bool_lit(true)),
                "false" => Ok(Expr::bool_lit(false)),
                "null" => Ok(Expr::BasicLit(super::ast::BasicLit {
                    lit: super::ast::Lit::Null,
                })),
                _ => Ok(Expr::ident(name)),
            },
            Token::Int(v) => Ok(Expr::int_lit(v)),
            Token::Float(v) => Ok(Expr::float_lit(v)),
            Token::Str(v) => Ok(Expr::str_lit(v)),
            Token::LBrace => {
                let fields = self.parse_fields(Token::RBrace)?;
                self.expect(Token::RBrace)?;
                Ok(Expr::Struct(StructLit { fields }))
            }
            Token::LBrack => self.parse_list(),
            Token::LParen => {
                self.skip_newlines_only();
                let inner = self.parse_expr()?;
                self.skip_newlines_only();
                self.expect(Token::RParen)?;
                Ok(Expr::Paren(Box::new(inner)))
            }
            other => Err(Error::new(format!("unexpected token {other:?}"))),
        }
    }

    fn parse_list(&mut self) -> Result<Expr, Error> {
        let mut elts = Vec::new();
        self.skip_newlines_only();
        if *self.peek() == Token::Ellipsis {
            self.pos += 1;
            let ty = if matches!(self.peek(), Token::RBrack) {
                None
            } else {
                Some(Box::new(self.parse_expr()?))
            };
            elts.push(Expr::Ellipsis(Ellipsis { ty }));
        } else {
            while *self.peek() != Token::RBrack {
                elts.push(self.parse_expr()?);
                self.skip_newlines_only();
                if *self.peek() == Token::Comma {
                    self.pos += 1;
                    self.skip_newlines_only();
                }
            }
        }
        self.skip_newlines_only();
        self.expect(Token::RBrack)?;
        Ok(Expr::List(ListLit { elts }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ccl::ast::Lit;

    #[test]
    fn parses_definitions_with_defaults() {
        let unit = parse_file("#Def: int & >= 5 & <= 10 | *8").unwrap();
        assert_eq!(unit.fields.len(), 1);
        let field = &unit.fields[0];
        assert_eq!(field.label, "#Def");
        match &field.value {
            Expr::Binary(b) => {
                assert_eq!(b.op, BinOp::Or);
                assert!(matches!(&*b.x, Expr::Binary(inner) if inner.op == BinOp::And));
                match &*b.y {
                    Expr::Unary(u) => {
                        assert_eq!(u.op, UnaryOp::Default);
                        assert_eq!(*u.x, Expr::int_lit(8));
                    }
                    other => panic!("expected default marker, got {other:?}"),
                }
            }
            other => panic!("expected binary expr, got {other:?}"),
        }
    }

    #[test]
    fn parses_structs_with_docs_and_optional() {
        let unit = parse_file(
            r#"#Person: {
  // The person's name.
  name: string
  age?: int
  _internal: bool
}"#,
        )
        .unwrap();
        let person = match &unit.fields[0].value {
            Expr::Struct(s) => s,
            other => panic!("expected struct, got {other:?}"),
        };
        assert_eq!(person.fields.len(), 3);
        assert_eq!(person.fields[0].doc.as_deref(), Some("The person's name."));
        assert!(person.fields[1].optional);
        assert!(person.fields[2].hidden);
    }

    #[test]
    fn parses_lists() {
        let unit = parse_file("#Types: [...string | int] | *[\"a\"]").unwrap();
        match &unit.fields[0].value {
            Expr::Binary(b) => {
                assert!(matches!(&*b.x, Expr::List(l) if matches!(l.elts[0], Expr::Ellipsis(_))));
                assert!(matches!(&*b.y, Expr::Unary(u) if u.op == UnaryOp::Default));
            }
            other => panic!("expected binary, got {other:?}"),
        }

        let unit = parse_file("#Idents: [\"person\", \"dog\", \"cat\"]").unwrap();
        match &unit.fields[0].value {
            Expr::List(l) => {
                assert_eq!(l.elts.len(), 3);
                assert_eq!(l.elts[0], Expr::str_lit("person"));
            }
            other => panic!("expected list, got {other:?}"),
        }
    }

    #[test]
    fn brace_wrapped_units_denote_the_same_struct() {
        let unit = parse_file("{ name: string, id: int }").unwrap();
        assert_eq!(unit.fields.len(), 2);
        assert_eq!(unit.fields[0].label, "name");
        assert!(parse_file("[1, 2]").is_err());
    }

    #[test]
    fn parses_quoted_labels_and_null() {
        let unit = parse_file("\"e-mail\": string, missing: null").unwrap();
        assert_eq!(unit.fields[0].label, "e-mail");
        assert!(matches!(
            &unit.fields[1].value,
            Expr::BasicLit(b) if b.lit == Lit::Null
        ));
    }
}
