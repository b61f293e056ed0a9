use crate::error::{CriteriaError, Result};

/// Token kinds produced by the expression lexer. Keywords are not
/// distinguished here; the parser matches identifiers case-insensitively.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Tok {
    Ident(String),
    Int(i64),
    Real(f64),
    Str(String),
    /// `:name`
    Param(String),
    Dot,
    Comma,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Plus,
    Minus,
    Star,
    Slash,
    Eq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Debug, Clone)]
pub(crate) struct Lexeme {
    pub tok: Tok,
    pub pos: usize,
}

fn parse_error(message: impl Into<String>, position: usize) -> CriteriaError {
    CriteriaError::Parse {
        message: message.into(),
        position,
    }
}

pub(crate) fn lex(input: &str) -> Result<Vec<Lexeme>> {
    let bytes = input.as_bytes();
    let mut out = Vec::with_capacity(input.len() / 3 + 1);
    let mut i = 0;

    while i < bytes.len() {
        let start = i;
        let c = bytes[i];
        match c {
            b' ' | b'\t' | b'\r' | b'\n' => {
                i += 1;
                continue;
            }
            b'.' => {
                out.push(Lexeme { tok: Tok::Dot, pos: start });
                i += 1;
            }
            b',' => {
                out.push(Lexeme { tok: Tok::Comma, pos: start });
                i += 1;
            }
            b'(' => {
                out.push(Lexeme { tok: Tok::LParen, pos: start });
                i += 1;
            }
            b')' => {
                out.push(Lexeme { tok: Tok::RParen, pos: start });
                i += 1;
            }
            b'[' => {
                out.push(Lexeme { tok: Tok::LBracket, pos: start });
                i += 1;
            }
            b']' => {
                out.push(Lexeme { tok: Tok::RBracket, pos: start });
                i += 1;
            }
            b'+' => {
                out.push(Lexeme { tok: Tok::Plus, pos: start });
                i += 1;
            }
            b'-' => {
                out.push(Lexeme { tok: Tok::Minus, pos: start });
                i += 1;
            }
            b'*' => {
                out.push(Lexeme { tok: Tok::Star, pos: start });
                i += 1;
            }
            b'/' => {
                out.push(Lexeme { tok: Tok::Slash, pos: start });
                i += 1;
            }
            b'=' => {
                out.push(Lexeme { tok: Tok::Eq, pos: start });
                i += 1;
            }
            b'!' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    out.push(Lexeme { tok: Tok::Neq, pos: start });
                    i += 2;
                } else {
                    return Err(parse_error("unexpected character '!'", start));
                }
            }
            b'<' => match bytes.get(i + 1) {
                Some(b'>') => {
                    out.push(Lexeme { tok: Tok::Neq, pos: start });
                    i += 2;
                }
                Some(b'=') => {
                    out.push(Lexeme { tok: Tok::Le, pos: start });
                    i += 2;
                }
                _ => {
                    out.push(Lexeme { tok: Tok::Lt, pos: start });
                    i += 1;
                }
            },
            b'>' => {
                if bytes.get(i + 1) == Some(&b'=') {
                    out.push(Lexeme { tok: Tok::Ge, pos: start });
                    i += 2;
                } else {
                    out.push(Lexeme { tok: Tok::Gt, pos: start });
                    i += 1;
                }
            }
            b':' => {
                i += 1;
                let name_start = i;
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                if i == name_start {
                    return Err(parse_error("expected parameter name after ':'", start));
                }
                out.push(Lexeme {
                    tok: Tok::Param(input[name_start..i].to_owned()),
                    pos: start,
                });
            }
            b'\'' => {
                i += 1;
                let mut text = String::new();
                loop {
                    match bytes.get(i) {
                        None => return Err(parse_error("unterminated string literal", start)),
                        Some(b'\'') => {
                            // doubled quote is an escaped quote
                            if bytes.get(i + 1) == Some(&b'\'') {
                                text.push('\'');
                                i += 2;
                            } else {
                                i += 1;
                                break;
                            }
                        }
                        Some(_) => {
                            let ch = input[i..].chars().next().unwrap();
                            text.push(ch);
                            i += ch.len_utf8();
                        }
                    }
                }
                out.push(Lexeme {
                    tok: Tok::Str(text),
                    pos: start,
                });
            }
            b'0'..=b'9' => {
                while i < bytes.len() && bytes[i].is_ascii_digit() {
                    i += 1;
                }
                let mut real = false;
                if i + 1 < bytes.len() && bytes[i] == b'.' && bytes[i + 1].is_ascii_digit() {
                    real = true;
                    i += 1;
                    while i < bytes.len() && bytes[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text = &input[start..i];
                let tok = if real {
                    Tok::Real(
                        text.parse()
                            .map_err(|_| parse_error("invalid numeric literal", start))?,
                    )
                } else {
                    Tok::Int(
                        text.parse()
                            .map_err(|_| parse_error("invalid numeric literal", start))?,
                    )
                };
                out.push(Lexeme { tok, pos: start });
            }
            _ if c.is_ascii_alphabetic() || c == b'_' => {
                while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                    i += 1;
                }
                out.push(Lexeme {
                    tok: Tok::Ident(input[start..i].to_owned()),
                    pos: start,
                });
            }
            _ => {
                let ch = input[start..].chars().next().unwrap();
                return Err(parse_error(format!("unexpected character '{ch}'"), start));
            }
        }
    }

    Ok(out)
}
