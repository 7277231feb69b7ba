//! Lexer for Skema source
//!
//! Byte-level scanner producing a flat token stream with 1-based source
//! positions. The parser never looks at raw text again; everything it needs
//! is in `TokenKind`.

use crate::ast::NumberValue;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LParen,
    RParen,
    /// `'` shorthand for `quote`.
    Quote,
    /// `#(` opening a vector literal.
    VectorOpen,
    Boolean(bool),
    Character(char),
    Number(NumberValue),
    String(String),
    Identifier(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
    pub column: u32,
}

impl Token {
    fn new(kind: TokenKind, line: u32, column: u32) -> Self {
        Token { kind, line, column }
    }
}

/// Tokenize a whole source file. Errors carry 1-based line/column.
pub fn tokenize(source: &str) -> Result<Vec<Token>, String> {
    Scanner::new(source).run()
}

struct Scanner {
    src: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
}

fn is_delimiter(c: char) -> bool {
    c.is_whitespace() || matches!(c, '(' | ')' | '"' | ';' | '\'')
}

impl Scanner {
    fn new(source: &str) -> Self {
        Scanner {
            src: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
        }
    }

    fn peek(&self) -> Option<char> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some(';') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn run(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = Vec::new();
        loop {
            self.skip_trivia();
            let (line, column) = (self.line, self.column);
            let Some(c) = self.peek() else { break };
            match c {
                '(' => {
                    self.bump();
                    tokens.push(Token::new(TokenKind::LParen, line, column));
                }
                ')' => {
                    self.bump();
                    tokens.push(Token::new(TokenKind::RParen, line, column));
                }
                '\'' => {
                    self.bump();
                    tokens.push(Token::new(TokenKind::Quote, line, column));
                }
                '"' => {
                    let s = self.scan_string(line, column)?;
                    tokens.push(Token::new(TokenKind::String(s), line, column));
                }
                '#' => {
                    let kind = self.scan_hash(line, column)?;
                    tokens.push(Token::new(kind, line, column));
                }
                _ if Self::starts_number(c, self.peek_at(1)) => {
                    let n = self.scan_number(line, column)?;
                    tokens.push(Token::new(TokenKind::Number(n), line, column));
                }
                _ => {
                    let text = self.scan_atom();
                    tokens.push(Token::new(TokenKind::Identifier(text), line, column));
                }
            }
        }
        Ok(tokens)
    }

    fn starts_number(c: char, next: Option<char>) -> bool {
        if c.is_ascii_digit() {
            return true;
        }
        let next_is_digit = next.is_some_and(|n| n.is_ascii_digit());
        match c {
            '-' | '+' => next_is_digit || (next == Some('.')),
            '.' => next_is_digit,
            _ => false,
        }
    }

    /// Consume everything up to the next delimiter.
    fn scan_atom(&mut self) -> String {
        let mut text = String::new();
        while let Some(c) = self.peek() {
            if is_delimiter(c) {
                break;
            }
            text.push(c);
            self.bump();
        }
        text
    }

    fn scan_number(&mut self, line: u32, column: u32) -> Result<NumberValue, String> {
        let text = self.scan_atom();
        let looks_float = text.contains(['.', 'e', 'E']);
        if !looks_float {
            if let Ok(i) = text.parse::<i64>() {
                return Ok(NumberValue::Integer(i));
            }
        }
        text.parse::<f64>()
            .map(NumberValue::Float)
            .map_err(|_| format!("malformed number '{}' at line {}, column {}", text, line, column))
    }

    fn scan_string(&mut self, line: u32, column: u32) -> Result<String, String> {
        self.bump(); // opening quote
        let mut s = String::new();
        loop {
            match self.bump() {
                None => {
                    return Err(format!(
                        "unterminated string literal starting at line {}, column {}",
                        line, column
                    ));
                }
                Some('"') => return Ok(s),
                Some('\\') => match self.bump() {
                    Some('n') => s.push('\n'),
                    Some('t') => s.push('\t'),
                    Some('r') => s.push('\r'),
                    Some('\\') => s.push('\\'),
                    Some('"') => s.push('"'),
                    other => {
                        return Err(format!(
                            "unknown string escape '\\{}' at line {}, column {}",
                            other.map(String::from).unwrap_or_default(),
                            self.line,
                            self.column
                        ));
                    }
                },
                Some(c) => s.push(c),
            }
        }
    }

    fn scan_hash(&mut self, line: u32, column: u32) -> Result<TokenKind, String> {
        self.bump(); // '#'
        match self.peek() {
            Some('(') => {
                self.bump();
                Ok(TokenKind::VectorOpen)
            }
            Some('t') | Some('f') => {
                let value = self.bump() == Some('t');
                if self.peek().is_some_and(|c| !is_delimiter(c)) {
                    return Err(format!(
                        "bad boolean literal at line {}, column {}",
                        line, column
                    ));
                }
                Ok(TokenKind::Boolean(value))
            }
            Some('\\') => {
                self.bump();
                let Some(first) = self.bump() else {
                    return Err(format!(
                        "unterminated character literal at line {}, column {}",
                        line, column
                    ));
                };
                if !first.is_alphabetic() {
                    return Ok(TokenKind::Character(first));
                }
                let mut name = String::from(first);
                while let Some(c) = self.peek() {
                    if is_delimiter(c) {
                        break;
                    }
                    name.push(c);
                    self.bump();
                }
                match name.as_str() {
                    _ if name.chars().count() == 1 => Ok(TokenKind::Character(first)),
                    "newline" => Ok(TokenKind::Character('\n')),
                    "space" => Ok(TokenKind::Character(' ')),
                    "tab" => Ok(TokenKind::Character('\t')),
                    _ => Err(format!(
                        "unknown character name '#\\{}' at line {}, column {}",
                        name, line, column
                    )),
                }
            }
            _ => Err(format!(
                "unexpected '#' syntax at line {}, column {}",
                line, column
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_call() {
        assert_eq!(
            kinds("(+ 1 2.5)"),
            vec![
                TokenKind::LParen,
                TokenKind::Identifier("+".to_string()),
                TokenKind::Number(NumberValue::Integer(1)),
                TokenKind::Number(NumberValue::Float(2.5)),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_positions_are_one_based() {
        let tokens = tokenize("(dot a\n  b)").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 2));
        assert_eq!((tokens[2].line, tokens[2].column), (1, 6));
        // `b` sits on line 2 after two spaces of indent
        assert_eq!((tokens[3].line, tokens[3].column), (2, 3));
    }

    #[test]
    fn test_negative_numbers_vs_minus_identifier() {
        assert_eq!(
            kinds("(- x -5)"),
            vec![
                TokenKind::LParen,
                TokenKind::Identifier("-".to_string()),
                TokenKind::Identifier("x".to_string()),
                TokenKind::Number(NumberValue::Integer(-5)),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_booleans_and_vector_open() {
        assert_eq!(
            kinds("#t #f #(1)"),
            vec![
                TokenKind::Boolean(true),
                TokenKind::Boolean(false),
                TokenKind::VectorOpen,
                TokenKind::Number(NumberValue::Integer(1)),
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn test_characters() {
        assert_eq!(
            kinds(r"#\a #\newline #\space #\+"),
            vec![
                TokenKind::Character('a'),
                TokenKind::Character('\n'),
                TokenKind::Character(' '),
                TokenKind::Character('+'),
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#""a\nb\"c""#),
            vec![TokenKind::String("a\nb\"c".to_string())]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("; a comment\nx ; trailing\ny"),
            vec![
                TokenKind::Identifier("x".to_string()),
                TokenKind::Identifier("y".to_string()),
            ]
        );
    }

    #[test]
    fn test_quote_shorthand() {
        assert_eq!(
            kinds("'x"),
            vec![TokenKind::Quote, TokenKind::Identifier("x".to_string())]
        );
    }

    #[test]
    fn test_scheme_identifier_charset() {
        assert_eq!(
            kinds("set! number->string v+ <="),
            vec![
                TokenKind::Identifier("set!".to_string()),
                TokenKind::Identifier("number->string".to_string()),
                TokenKind::Identifier("v+".to_string()),
                TokenKind::Identifier("<=".to_string()),
            ]
        );
    }

    #[test]
    fn test_unterminated_string_is_an_error() {
        let err = tokenize("\"abc").unwrap_err();
        assert!(err.contains("unterminated string"));
        assert!(err.contains("line 1, column 1"));
    }

    #[test]
    fn test_malformed_number_is_an_error() {
        let err = tokenize("1.2.3").unwrap_err();
        assert!(err.contains("malformed number"));
    }

    #[test]
    fn test_exponent_notation() {
        assert_eq!(
            kinds("1e3 -2.5e-2"),
            vec![
                TokenKind::Number(NumberValue::Float(1000.0)),
                TokenKind::Number(NumberValue::Float(-0.025)),
            ]
        );
    }
}
