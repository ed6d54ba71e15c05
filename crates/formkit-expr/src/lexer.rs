//! Tokenizer for the formula language

use crate::ExprError;

/// Token kinds
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// Numeric literal
    Number(f64),
    /// Quoted string literal (escapes resolved)
    Str(String),
    /// `@NAME` field reference
    Field(String),
    /// Bare word: keyword or function name
    Ident(String),
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    AndAnd,
    OrOr,
    Bang,
    Question,
    Colon,
    LParen,
    RParen,
    Comma,
}

/// Token with its byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    /// Token
    pub token: Token,
    /// Byte offset in the source
    pub position: usize,
}

/// Split an expression into tokens
pub fn tokenize(source: &str) -> Result<Vec<Spanned>, ExprError> {
    let bytes = source.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let start = pos;
        let token = match c {
            b'0'..=b'9' | b'.' => {
                let (number, next) = lex_number(source, pos)?;
                pos = next;
                Token::Number(number)
            }
            b'\'' | b'"' => {
                let (text, next) = lex_string(source, pos)?;
                pos = next;
                Token::Str(text)
            }
            b'@' => {
                let end = ident_end(bytes, pos + 1);
                if end == pos + 1 {
                    return Err(ExprError::Lex { position: pos, found: '@' });
                }
                pos = end;
                Token::Field(source[start + 1..end].to_string())
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                let end = ident_end(bytes, pos);
                pos = end;
                Token::Ident(source[start..end].to_string())
            }
            _ => {
                let (token, width) = lex_operator(bytes, pos).ok_or_else(|| ExprError::Lex {
                    position: pos,
                    found: source[pos..].chars().next().unwrap_or('?'),
                })?;
                pos += width;
                token
            }
        };

        tokens.push(Spanned { token, position: start });
    }

    Ok(tokens)
}

fn ident_end(bytes: &[u8], mut pos: usize) -> usize {
    if pos < bytes.len() && (bytes[pos].is_ascii_alphabetic() || bytes[pos] == b'_') {
        pos += 1;
        while pos < bytes.len() && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_') {
            pos += 1;
        }
    }
    pos
}

fn lex_number(source: &str, start: usize) -> Result<(f64, usize), ExprError> {
    let bytes = source.as_bytes();
    let mut pos = start;
    while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
        pos += 1;
    }
    // exponent
    if pos < bytes.len() && (bytes[pos] == b'e' || bytes[pos] == b'E') {
        let mut ahead = pos + 1;
        if ahead < bytes.len() && (bytes[ahead] == b'+' || bytes[ahead] == b'-') {
            ahead += 1;
        }
        if ahead < bytes.len() && bytes[ahead].is_ascii_digit() {
            pos = ahead;
            while pos < bytes.len() && bytes[pos].is_ascii_digit() {
                pos += 1;
            }
        }
    }

    source[start..pos]
        .parse::<f64>()
        .map(|n| (n, pos))
        .map_err(|_| ExprError::Syntax {
            position: start,
            message: format!("malformed number `{}`", &source[start..pos]),
        })
}

fn lex_string(source: &str, start: usize) -> Result<(String, usize), ExprError> {
    let mut chars = source[start..].char_indices();
    let (_, quote) = chars.next().ok_or(ExprError::UnterminatedString(start))?;
    let mut text = String::new();

    while let Some((offset, c)) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some((_, 'n')) => text.push('\n'),
                Some((_, 't')) => text.push('\t'),
                Some((_, escaped)) => text.push(escaped),
                None => break,
            },
            c if c == quote => return Ok((text, start + offset + c.len_utf8())),
            c => text.push(c),
        }
    }

    Err(ExprError::UnterminatedString(start))
}

fn lex_operator(bytes: &[u8], pos: usize) -> Option<(Token, usize)> {
    let next = bytes.get(pos + 1).copied();
    let pair = match (bytes[pos], next) {
        (b'=', Some(b'=')) => Some(Token::EqEq),
        (b'!', Some(b'=')) => Some(Token::NotEq),
        (b'<', Some(b'>')) => Some(Token::NotEq),
        (b'<', Some(b'=')) => Some(Token::Le),
        (b'>', Some(b'=')) => Some(Token::Ge),
        (b'&', Some(b'&')) => Some(Token::AndAnd),
        (b'|', Some(b'|')) => Some(Token::OrOr),
        _ => None,
    };
    if let Some(token) = pair {
        return Some((token, 2));
    }

    let single = match bytes[pos] {
        b'+' => Token::Plus,
        b'-' => Token::Minus,
        b'*' => Token::Star,
        b'/' => Token::Slash,
        b'%' => Token::Percent,
        b'^' => Token::Caret,
        // lone `=` reads as equality, as in lookup conditions
        b'=' => Token::EqEq,
        b'<' => Token::Lt,
        b'>' => Token::Gt,
        b'!' => Token::Bang,
        b'?' => Token::Question,
        b':' => Token::Colon,
        b'(' => Token::LParen,
        b')' => Token::RParen,
        b',' => Token::Comma,
        _ => return None,
    };
    Some((single, 1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<Token> {
        tokenize(source).unwrap().into_iter().map(|s| s.token).collect()
    }

    #[test]
    fn test_field_and_operators() {
        assert_eq!(
            kinds("@PREMIUM * 10 >= 2.5e1"),
            vec![
                Token::Field("PREMIUM".into()),
                Token::Star,
                Token::Number(10.0),
                Token::Ge,
                Token::Number(25.0),
            ]
        );
    }

    #[test]
    fn test_strings_and_escapes() {
        assert_eq!(
            kinds(r#"'it\'s' == "a\"b""#),
            vec![
                Token::Str("it's".into()),
                Token::EqEq,
                Token::Str("a\"b".into()),
            ]
        );
        assert_eq!(
            tokenize("'open").unwrap_err(),
            ExprError::UnterminatedString(0)
        );
    }

    #[test]
    fn test_prefix_fields_stay_distinct() {
        assert_eq!(
            kinds("@PR == @PR_VARIANT"),
            vec![
                Token::Field("PR".into()),
                Token::EqEq,
                Token::Field("PR_VARIANT".into()),
            ]
        );
    }

    #[test]
    fn test_lex_errors() {
        assert!(matches!(tokenize("@ 1"), Err(ExprError::Lex { position: 0, found: '@' })));
        assert!(matches!(tokenize("1 # 2"), Err(ExprError::Lex { found: '#', .. })));
        assert!(matches!(tokenize("1..2"), Err(ExprError::Syntax { .. })));
    }
}
