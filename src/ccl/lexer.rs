//! Tokenizer for CCL source text.
//!
//! Newlines are significant (they terminate fields, like commas) and are
//! emitted as tokens.  Line comments are collected so the parser can attach
//! them to the following field as documentation.

use super::Error;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),
    Comment(String),
    Newline,
    LBrace,
    RBrace,
    LBrack,
    RBrack,
    LParen,
    RParen,
    Colon,
    Comma,
    Question,
    Pipe,
    Amp,
    Star,
    Ellipsis,
    Gt,
    Ge,
    Lt,
    Le,
    Ne,
    Eof,
}

pub fn tokenize(src: &str) -> Result<Vec<Token>, Error> {
    let mut tokens = Vec::new();
    let bytes = src.as_bytes();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        match c {
            ' ' | '\t' | '\r' => i += 1,
            '\n' => {
                tokens.push(Token::Newline);
                i += 1;
            }
            '{' => {
                tokens.push(Token::LBrace);
                i += 1;
            }
            '}' => {
                tokens.push(Token::RBrace);
                i += 1;
            }
            '[' => {
                tokens.push(Token::LBrack);
                i += 1;
            }
            ']' => {
                tokens.push(Token::RBrack);
                i += 1;
            }
            '(' => {
                tokens.push(Token::LParen);
                i += 1;
            }
            ')' => {
                tokens.push(Token::RParen);
                i += 1;
            }
            ':' => {
                tokens.push(Token::Colon);
                i += 1;
            }
            ',' => {
                tokens.push(Token::Comma);
                i += 1;
            }
            '?' => {
                tokens.push(Token::Question);
                i += 1;
            }
            '|' => {
                tokens.push(Token::Pipe);
                i += 1;
            }
            '&' => {
                tokens.push(Token::Amp);
                i += 1;
            }
            '*' => {
                tokens.push(Token::Star);
                i += 1;
            }
            '.' => {
                if bytes.len() >= i + 3 && &src[i..i + 3] == "..." {
                    tokens.push(Token::Ellipsis);
                    i += 3;
                } else {
                    return Err(Error::new(format!("unexpected character at offset {i}: .")));
                }
            }
            '>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Ge);
                    i += 2;
                } else {
                    tokens.push(Token::Gt);
                    i += 1;
                }
            }
            '<' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Le);
                    i += 2;
                } else {
                    tokens.push(Token::Lt);
                    i += 1;
                }
            }
            '!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    tokens.push(Token::Ne);
                    i += 2;
                } else {
                    return Err(Error::new(format!("unexpected character at offset {i}: !")));
                }
            }
            '/' => {
                if bytes.get(i + 1) == Some(&b'/') {
                    let start = i + 2;
                    let mut end = start;
                    while end < bytes.len() && bytes[end] != b'\n' {
                        end += 1;
                    }
                    tokens.push(Token::Comment(src[start..end].trim().to_string()));
                    i = end;
                } else {
                    return Err(Error::new(format!("unexpected character at offset {i}: /")));
                }
            }
            '"' => {
                let (s, next) = scan_string(src, i)?;
                tokens.push(Token::Str(s));
                i = next;
            }
            '-' => {
                if bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit()) {
                    let (tok, next) = scan_number(src, i)?;
                    tokens.push(tok);
                    i = next;
                } else {
                    return Err(Error::new(format!("unexpected character at offset {i}: -")));
                }
            }
            c if c.is_ascii_digit() => {
                let (tok, next) = scan_number(src, i)?;
                tokens.push(tok);
                i = next;
            }
            c if is_ident_start(c) => {
                let start = i;
                let mut end = i;
                while end < bytes.len() && is_ident_part(bytes[end] as char) {
                    end += 1;
                }
                tokens.push(Token::Ident(src[start..end].to_string()));
                i = end;
            }
            other => {
                return Err(Error::new(format!(
                    "unexpected character at offset {i}: {other}"
                )))
            }
        }
    }

    tokens.push(Token::Eof);
    Ok(tokens)
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '#'
}

fn is_ident_part(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn scan_string(src: &str, start: usize) -> Result<(String, usize), Error> {
    let bytes = src.as_bytes();
    let mut out = String::new();
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => return Ok((out, i + 1)),
            b'\\' => {
                let esc = bytes
                    .get(i + 1)
                    .ok_or_else(|| Error::new("unterminated escape in string literal"))?;
                match esc {
                    b'"' => out.push('"'),
                    b'\\' => out.push('\\'),
                    b'n' => out.push('\n'),
                    b't' => out.push('\t'),
                    b'r' => out.push('\r'),
                    other => {
                        return Err(Error::new(format!(
                            "unsupported escape in string literal: \\{}",
                            *other as char
                        )))
                    }
                }
                i += 2;
            }
            b'\n' => return Err(Error::new("unterminated string literal")),
            _ => {
                // Copy the full UTF-8 character, not just the lead byte.
                let ch = src[i..].chars().next().unwrap_or('\u{fffd}');
                out.push(ch);
                i += ch.len_utf8();
            }
        }
    }
    Err(Error::new("unterminated string literal"))
}

fn scan_number(src: &str, start: usize) -> Result<(Token, usize), Error> {
    let bytes = src.as_bytes();
    let mut i = start;
    if bytes[i] == b'-' {
        i += 1;
    }
    let mut is_float = false;
    while i < bytes.len() {
        match bytes[i] {
            b'0'..=b'9' => i += 1,
            b'.' => {
                // A second dot belongs to an ellipsis, not this number.
                if is_float || !bytes.get(i + 1).is_some_and(|b| b.is_ascii_digit()) {
                    break;
                }
                is_float = true;
                i += 1;
            }
            b'e' | b'E' => {
                is_float = true;
                i += 1;
                if matches!(bytes.get(i), Some(b'+') | Some(b'-')) {
                    i += 1;
                }
            }
            _ => break,
        }
    }
    let text = &src[start..i];
    if is_float {
        let v: f64 = text
            .parse()
            .map_err(|_| Error::new(format!("malformed number literal: {text}")))?;
        Ok((Token::Float(v), i))
    } else {
        let v: i64 = text
            .parse()
            .map_err(|_| Error::new(format!("malformed number literal: {text}")))?;
        Ok((Token::Int(v), i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_fields_and_operators() {
        let toks = tokenize("#Def: int & >= 5 | *8").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Ident("#Def".into()),
                Token::Colon,
                Token::Ident("int".into()),
                Token::Amp,
                Token::Ge,
                Token::Int(5),
                Token::Pipe,
                Token::Star,
                Token::Int(8),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn scans_strings_and_comments() {
        let toks = tokenize("// doc line\nname: \"a\\\"b\"").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::Comment("doc line".into()),
                Token::Newline,
                Token::Ident("name".into()),
                Token::Colon,
                Token::Str("a\"b".into()),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn scans_ellipsis_and_numbers() {
        let toks = tokenize("[...string, 3.14, -2]").unwrap();
        assert_eq!(
            toks,
            vec![
                Token::LBrack,
                Token::Ellipsis,
                Token::Ident("string".into()),
                Token::Comma,
                Token::Float(3.14),
                Token::Comma,
                Token::Int(-2),
                Token::RBrack,
                Token::Eof,
            ]
        );
    }
}
