use crate::{Result, Sexpr, SexprError};

struct Cursor<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Cursor<'a> {
    fn new(content: &'a str) -> Self {
        Self {
            chars: content.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.bump();
        }
    }

    fn error(&self, message: impl Into<String>) -> SexprError {
        SexprError::Syntax {
            line: self.line,
            column: self.column,
            message: message.into(),
        }
    }
}

/// Parse a document consisting of exactly one top-level expression
pub fn parse(content: &str) -> Result<Sexpr> {
    let mut cursor = Cursor::new(content);
    cursor.skip_whitespace();
    let root = parse_node(&mut cursor)?;
    cursor.skip_whitespace();
    if cursor.peek().is_some() {
        return Err(cursor.error("trailing content after root expression"));
    }
    Ok(root)
}

fn parse_node(cursor: &mut Cursor) -> Result<Sexpr> {
    match cursor.peek() {
        None => Err(cursor.error("unexpected end of input")),
        Some('(') => parse_list(cursor),
        Some(')') => Err(cursor.error("unexpected ')'")),
        Some('"') => parse_string(cursor),
        Some(_) => Ok(parse_symbol(cursor)),
    }
}

fn parse_list(cursor: &mut Cursor) -> Result<Sexpr> {
    cursor.bump();
    let mut items = Vec::new();
    loop {
        cursor.skip_whitespace();
        match cursor.peek() {
            None => return Err(cursor.error("unterminated list")),
            Some(')') => {
                cursor.bump();
                return Ok(Sexpr::List(items));
            }
            Some(_) => items.push(parse_node(cursor)?),
        }
    }
}

fn parse_string(cursor: &mut Cursor) -> Result<Sexpr> {
    cursor.bump();
    let mut value = String::new();
    loop {
        match cursor.bump() {
            None => return Err(cursor.error("unterminated string")),
            Some('"') => return Ok(Sexpr::String(value)),
            Some('\\') => match cursor.bump() {
                Some('n') => value.push('\n'),
                Some('t') => value.push('\t'),
                Some('r') => value.push('\r'),
                Some(c) => value.push(c),
                None => return Err(cursor.error("unterminated escape sequence")),
            },
            Some(c) => value.push(c),
        }
    }
}

fn parse_symbol(cursor: &mut Cursor) -> Sexpr {
    let mut value = String::new();
    while let Some(c) = cursor.peek() {
        if c.is_whitespace() || c == '(' || c == ')' || c == '"' {
            break;
        }
        value.push(c);
        cursor.bump();
    }
    Sexpr::Symbol(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested() {
        let node = parse("(kicad_symbol_lib (version 20231120) (symbol \"R\" (pin_names hide)))")
            .unwrap();
        assert_eq!(node.name(), Some("kicad_symbol_lib"));
        assert_eq!(node.child("version/@0").unwrap().as_int(), Some(20231120));
        let symbol = node.child("symbol").unwrap();
        assert_eq!(symbol.child("@0").unwrap().as_str(), Some("R"));
        assert!(symbol.child("pin_names").unwrap().contains_token("hide"));
    }

    #[test]
    fn test_parse_escapes() {
        let node = parse(r#"(text "a\"b\\c\nd")"#).unwrap();
        assert_eq!(node.child("@0").unwrap().value().unwrap(), "a\"b\\c\nd");
    }

    #[test]
    fn test_syntax_errors() {
        assert!(matches!(
            parse("(a (b c)"),
            Err(SexprError::Syntax { message, .. }) if message == "unterminated list"
        ));
        assert!(matches!(
            parse("(a \"b)"),
            Err(SexprError::Syntax { message, .. }) if message == "unterminated string"
        ));
        assert!(matches!(
            parse("(a)\n(b)"),
            Err(SexprError::Syntax { line: 2, .. })
        ));
        assert!(parse("").is_err());
    }
}
