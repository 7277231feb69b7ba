//! Recursive-descent parser for Skema
//!
//! Consumes the token stream from the lexer and produces an arena-allocated
//! AST. Special forms are recognised by their head identifier; everything
//! else parses as an application. Errors are plain strings carrying 1-based
//! line/column, in the shape the CLI prints directly.

use crate::arena::Arena;
use crate::ast::{AstKind, AstNode, Binding, DoBinding, LetKind, Loc};
use crate::diagnostics::{Category, DiagnosticContext};
use crate::intern::{StringTable, Symbol};
use crate::lexer::{Token, TokenKind, tokenize};

pub struct Parser<'a, 'c> {
    arena: &'a Arena,
    strings: &'c mut StringTable,
    diagnostics: &'c DiagnosticContext,
    tokens: Vec<Token>,
    pos: usize,
}

impl<'a, 'c> Parser<'a, 'c> {
    pub fn new(
        arena: &'a Arena,
        strings: &'c mut StringTable,
        diagnostics: &'c DiagnosticContext,
        source: &str,
    ) -> Result<Self, String> {
        let tokens = tokenize(source)?;
        Ok(Parser {
            arena,
            strings,
            diagnostics,
            tokens,
            pos: 0,
        })
    }

    /// Parse every top-level form in the file.
    pub fn parse_program(&mut self) -> Result<&'a [&'a AstNode<'a>], String> {
        let mut forms = Vec::new();
        while self.peek().is_some() {
            forms.push(self.parse_expr()?);
        }
        Ok(self.arena.alloc_slice(&forms))
    }

    // =========================================================================
    // Token cursor
    // =========================================================================

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn loc(token: &Token) -> Loc {
        Loc::new(token.line, token.column)
    }

    /// Position for error messages when the stream ran out.
    fn last_loc(&self) -> Loc {
        self.tokens
            .last()
            .map(|t| Loc::new(t.line, t.column))
            .unwrap_or_else(Loc::dummy)
    }

    fn expect_rparen(&mut self, context: &str) -> Result<(), String> {
        match self.advance() {
            Some(t) if t.kind == TokenKind::RParen => Ok(()),
            Some(t) => Err(format!(
                "expected ')' to close {} at line {}, column {}",
                context, t.line, t.column
            )),
            None => Err(format!(
                "unexpected end of input while parsing {} (last token at {})",
                context,
                self.last_loc()
            )),
        }
    }

    fn expect_lparen(&mut self, context: &str) -> Result<(), String> {
        match self.advance() {
            Some(t) if t.kind == TokenKind::LParen => Ok(()),
            Some(t) => Err(format!(
                "expected '(' in {} at line {}, column {}",
                context, t.line, t.column
            )),
            None => Err(format!(
                "unexpected end of input while parsing {}",
                context
            )),
        }
    }

    fn expect_identifier(&mut self, context: &str) -> Result<(Symbol, Loc), String> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Identifier(text),
                line,
                column,
            }) => Ok((self.strings.intern(&text), Loc::new(line, column))),
            Some(t) => Err(format!(
                "expected a name in {} at line {}, column {}",
                context, t.line, t.column
            )),
            None => Err(format!(
                "unexpected end of input while parsing {}",
                context
            )),
        }
    }

    fn at_rparen(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token {
                kind: TokenKind::RParen,
                ..
            })
        )
    }

    // =========================================================================
    // Node construction
    // =========================================================================

    fn node(&self, kind: AstKind<'a>, loc: Loc) -> Result<&'a AstNode<'a>, String> {
        match self.arena.alloc(AstNode::new(kind, loc)) {
            Some(node) => Ok(node),
            None => {
                self.diagnostics
                    .error(Category::ArenaExhausted, loc, "arena allocation failed");
                Err(format!("out of arena memory at {}", loc))
            }
        }
    }

    fn slice(&self, nodes: &[&'a AstNode<'a>]) -> &'a [&'a AstNode<'a>] {
        self.arena.alloc_slice(nodes)
    }

    // =========================================================================
    // Grammar
    // =========================================================================

    fn parse_expr(&mut self) -> Result<&'a AstNode<'a>, String> {
        let Some(token) = self.advance() else {
            return Err(format!(
                "unexpected end of input at {}",
                self.last_loc()
            ));
        };
        let loc = Self::loc(&token);
        match token.kind {
            TokenKind::Number(n) => self.node(AstKind::Number(n), loc),
            TokenKind::Boolean(b) => self.node(AstKind::Boolean(b), loc),
            TokenKind::Character(c) => self.node(AstKind::Character(c), loc),
            TokenKind::String(s) => {
                let sym = self.strings.intern(&s);
                self.node(AstKind::String(sym), loc)
            }
            TokenKind::Identifier(text) => {
                let sym = self.strings.intern(&text);
                self.node(AstKind::Identifier(sym), loc)
            }
            TokenKind::Quote => {
                let datum = self.parse_datum()?;
                self.node(AstKind::Quote(datum), loc)
            }
            TokenKind::VectorOpen => self.parse_vector(loc),
            TokenKind::LParen => self.parse_form(loc),
            TokenKind::RParen => Err(format!(
                "unexpected ')' at line {}, column {}",
                token.line, token.column
            )),
        }
    }

    /// A parenthesised form: special form or application.
    fn parse_form(&mut self, loc: Loc) -> Result<&'a AstNode<'a>, String> {
        if self.at_rparen() {
            return Err(format!("empty application at {}", loc));
        }
        let head = match self.peek() {
            Some(Token {
                kind: TokenKind::Identifier(text),
                ..
            }) => Some(text.clone()),
            _ => None,
        };
        if let Some(keyword) = head {
            match keyword.as_str() {
                "if" => {
                    self.advance();
                    return self.parse_if(loc);
                }
                "lambda" => {
                    self.advance();
                    return self.parse_lambda(loc);
                }
                "define" => {
                    self.advance();
                    return self.parse_define(loc);
                }
                "set!" => {
                    self.advance();
                    return self.parse_set(loc);
                }
                "let" => {
                    self.advance();
                    return self.parse_let(LetKind::Plain, loc);
                }
                "let*" => {
                    self.advance();
                    return self.parse_let(LetKind::Star, loc);
                }
                "letrec" => {
                    self.advance();
                    return self.parse_let(LetKind::Rec, loc);
                }
                "begin" => {
                    self.advance();
                    return self.parse_begin(loc);
                }
                "do" => {
                    self.advance();
                    return self.parse_do(loc);
                }
                "quote" => {
                    self.advance();
                    let datum = self.parse_datum()?;
                    self.expect_rparen("quote")?;
                    return self.node(AstKind::Quote(datum), loc);
                }
                _ => {}
            }
        }

        // Application
        let callee = self.parse_expr()?;
        let mut args = Vec::new();
        while !self.at_rparen() {
            if self.peek().is_none() {
                return Err(format!(
                    "unexpected end of input in application starting at {}",
                    loc
                ));
            }
            args.push(self.parse_expr()?);
        }
        self.expect_rparen("application")?;
        self.node(
            AstKind::Call {
                callee,
                args: self.slice(&args),
            },
            loc,
        )
    }

    fn parse_if(&mut self, loc: Loc) -> Result<&'a AstNode<'a>, String> {
        let cond = self.parse_expr()?;
        let then = self.parse_expr()?;
        let alt = if self.at_rparen() {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect_rparen("if")?;
        self.node(AstKind::If { cond, then, alt }, loc)
    }

    fn parse_lambda(&mut self, loc: Loc) -> Result<&'a AstNode<'a>, String> {
        self.expect_lparen("lambda parameter list")?;
        let params = self.parse_params("lambda")?;
        let body = self.parse_body("lambda")?;
        self.node(
            AstKind::Lambda {
                params: self.arena.alloc_slice(&params),
                body,
            },
            loc,
        )
    }

    /// Parameter names up to the closing paren. Names must be unique.
    fn parse_params(&mut self, context: &str) -> Result<Vec<Symbol>, String> {
        let mut params = Vec::new();
        while !self.at_rparen() {
            let (sym, ploc) = self.expect_identifier(context)?;
            if params.contains(&sym) {
                return Err(format!(
                    "duplicate parameter '{}' in {} at {}",
                    self.strings.resolve(sym),
                    context,
                    ploc
                ));
            }
            params.push(sym);
        }
        self.expect_rparen("parameter list")?;
        Ok(params)
    }

    fn parse_define(&mut self, loc: Loc) -> Result<&'a AstNode<'a>, String> {
        // `(define (f a b) body...)` is sugar for a lambda binding.
        if let Some(Token {
            kind: TokenKind::LParen,
            ..
        }) = self.peek()
        {
            self.advance();
            let (name, _) = self.expect_identifier("define")?;
            let params = self.parse_params("define")?;
            let body = self.parse_body("define")?;
            let lambda = self.node(
                AstKind::Lambda {
                    params: self.arena.alloc_slice(&params),
                    body,
                },
                loc,
            )?;
            return self.node(AstKind::Define { name, value: lambda }, loc);
        }

        let (name, _) = self.expect_identifier("define")?;
        let value = self.parse_expr()?;
        self.expect_rparen("define")?;
        self.node(AstKind::Define { name, value }, loc)
    }

    fn parse_set(&mut self, loc: Loc) -> Result<&'a AstNode<'a>, String> {
        let (name, _) = self.expect_identifier("set!")?;
        let value = self.parse_expr()?;
        self.expect_rparen("set!")?;
        self.node(AstKind::Set { name, value }, loc)
    }

    fn parse_let(&mut self, kind: LetKind, loc: Loc) -> Result<&'a AstNode<'a>, String> {
        if let Some(Token {
            kind: TokenKind::Identifier(_),
            line,
            column,
        }) = self.peek()
        {
            return Err(format!(
                "named let is not supported (line {}, column {})",
                line, column
            ));
        }
        self.expect_lparen("binding list")?;
        let mut bindings = Vec::new();
        while !self.at_rparen() {
            self.expect_lparen("binding")?;
            let (name, _) = self.expect_identifier("binding")?;
            let init = self.parse_expr()?;
            self.expect_rparen("binding")?;
            bindings.push(Binding { name, init });
        }
        self.expect_rparen("binding list")?;
        let body = self.parse_body(kind.keyword())?;
        self.node(
            AstKind::Let {
                kind,
                bindings: self.arena.alloc_slice(&bindings),
                body,
            },
            loc,
        )
    }

    fn parse_begin(&mut self, loc: Loc) -> Result<&'a AstNode<'a>, String> {
        let body = self.parse_body("begin")?;
        self.node(AstKind::Begin(body), loc)
    }

    /// `(do ((var init step)...) (test result...) body...)`
    fn parse_do(&mut self, loc: Loc) -> Result<&'a AstNode<'a>, String> {
        self.expect_lparen("do binding list")?;
        let mut bindings = Vec::new();
        while !self.at_rparen() {
            self.expect_lparen("do binding")?;
            let (name, _) = self.expect_identifier("do binding")?;
            let init = self.parse_expr()?;
            let step = if self.at_rparen() {
                None
            } else {
                Some(self.parse_expr()?)
            };
            self.expect_rparen("do binding")?;
            bindings.push(DoBinding { name, init, step });
        }
        self.expect_rparen("do binding list")?;

        self.expect_lparen("do test clause")?;
        let test = self.parse_expr()?;
        let mut result = Vec::new();
        while !self.at_rparen() {
            result.push(self.parse_expr()?);
        }
        self.expect_rparen("do test clause")?;

        let mut body = Vec::new();
        while !self.at_rparen() {
            if self.peek().is_none() {
                return Err(format!("unexpected end of input in do form at {}", loc));
            }
            body.push(self.parse_expr()?);
        }
        self.expect_rparen("do")?;
        self.node(
            AstKind::Do {
                bindings: self.arena.alloc_slice(&bindings),
                test,
                result: self.slice(&result),
                body: self.slice(&body),
            },
            loc,
        )
    }

    fn parse_vector(&mut self, loc: Loc) -> Result<&'a AstNode<'a>, String> {
        let mut elements = Vec::new();
        while !self.at_rparen() {
            if self.peek().is_none() {
                return Err(format!("unterminated vector literal at {}", loc));
            }
            elements.push(self.parse_expr()?);
        }
        self.expect_rparen("vector literal")?;
        self.node(AstKind::Vector(self.slice(&elements)), loc)
    }

    /// A quoted datum: atoms and vectors only.
    fn parse_datum(&mut self) -> Result<&'a AstNode<'a>, String> {
        match self.peek() {
            Some(Token {
                kind: TokenKind::LParen,
                line,
                column,
            }) => Err(format!(
                "quoted lists are not supported (line {}, column {})",
                line, column
            )),
            Some(Token {
                kind: TokenKind::Quote,
                line,
                column,
            }) => Err(format!(
                "nested quote is not supported (line {}, column {})",
                line, column
            )),
            _ => self.parse_expr(),
        }
    }

    /// One-or-more body expressions up to the closing paren.
    fn parse_body(&mut self, context: &str) -> Result<&'a [&'a AstNode<'a>], String> {
        let mut body = Vec::new();
        while !self.at_rparen() {
            if self.peek().is_none() {
                return Err(format!(
                    "unexpected end of input in {} body",
                    context
                ));
            }
            body.push(self.parse_expr()?);
        }
        if body.is_empty() {
            let loc = self.last_loc();
            return Err(format!("{} has an empty body at {}", context, loc));
        }
        self.expect_rparen(context)?;
        Ok(self.slice(&body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NumberValue;

    fn parse_one<'a>(
        arena: &'a Arena,
        strings: &mut StringTable,
        source: &str,
    ) -> &'a AstNode<'a> {
        let diagnostics = DiagnosticContext::new();
        let mut parser = Parser::new(arena, strings, &diagnostics, source).unwrap();
        let items = parser.parse_program().unwrap();
        assert_eq!(items.len(), 1);
        items[0]
    }

    fn parse_err(source: &str) -> String {
        let arena = Arena::new();
        let mut strings = StringTable::new();
        let diagnostics = DiagnosticContext::new();
        let mut parser = Parser::new(&arena, &mut strings, &diagnostics, source).unwrap();
        parser.parse_program().unwrap_err()
    }

    #[test]
    fn test_parse_call() {
        let arena = Arena::new();
        let mut strings = StringTable::new();
        let node = parse_one(&arena, &mut strings, "(+ 1 2)");
        let AstKind::Call { callee, args } = &node.kind else {
            panic!("expected call, got {:?}", node.kind);
        };
        assert_eq!(strings.resolve(callee.as_identifier().unwrap()), "+");
        assert_eq!(args.len(), 2);
        assert!(matches!(
            args[0].kind,
            AstKind::Number(NumberValue::Integer(1))
        ));
    }

    #[test]
    fn test_parse_if_with_and_without_else() {
        let arena = Arena::new();
        let mut strings = StringTable::new();
        let node = parse_one(&arena, &mut strings, "(if (< x 0) -1 1)");
        let AstKind::If { alt, .. } = &node.kind else {
            panic!("expected if");
        };
        assert!(alt.is_some());

        let node = parse_one(&arena, &mut strings, "(if p 1)");
        let AstKind::If { alt, .. } = &node.kind else {
            panic!("expected if");
        };
        assert!(alt.is_none());
    }

    #[test]
    fn test_parse_define_function_shorthand() {
        let arena = Arena::new();
        let mut strings = StringTable::new();
        let node = parse_one(&arena, &mut strings, "(define (add a b) (+ a b))");
        let AstKind::Define { name, value } = &node.kind else {
            panic!("expected define");
        };
        assert_eq!(strings.resolve(*name), "add");
        let AstKind::Lambda { params, body } = &value.kind else {
            panic!("expected lambda value");
        };
        assert_eq!(params.len(), 2);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_parse_let_kinds() {
        let arena = Arena::new();
        let mut strings = StringTable::new();
        for (src, expected) in [
            ("(let ((x 1)) x)", LetKind::Plain),
            ("(let* ((x 1)) x)", LetKind::Star),
            ("(letrec ((x 1)) x)", LetKind::Rec),
        ] {
            let node = parse_one(&arena, &mut strings, src);
            let AstKind::Let { kind, bindings, .. } = &node.kind else {
                panic!("expected let for {}", src);
            };
            assert_eq!(*kind, expected);
            assert_eq!(bindings.len(), 1);
        }
    }

    #[test]
    fn test_parse_do_form() {
        let arena = Arena::new();
        let mut strings = StringTable::new();
        let node = parse_one(
            &arena,
            &mut strings,
            "(do ((i 0 (+ i 1)) (acc 1)) ((= i 5) acc) (set! acc (* acc 2)))",
        );
        let AstKind::Do {
            bindings,
            result,
            body,
            ..
        } = &node.kind
        else {
            panic!("expected do");
        };
        assert_eq!(bindings.len(), 2);
        assert!(bindings[0].step.is_some());
        assert!(bindings[1].step.is_none());
        assert_eq!(result.len(), 1);
        assert_eq!(body.len(), 1);
    }

    #[test]
    fn test_parse_quote_and_vector() {
        let arena = Arena::new();
        let mut strings = StringTable::new();
        let node = parse_one(&arena, &mut strings, "'x");
        assert!(matches!(node.kind, AstKind::Quote(_)));

        let node = parse_one(&arena, &mut strings, "#(1.0 2.0 3.0)");
        let AstKind::Vector(elements) = &node.kind else {
            panic!("expected vector");
        };
        assert_eq!(elements.len(), 3);
    }

    #[test]
    fn test_parse_begin_and_set() {
        let arena = Arena::new();
        let mut strings = StringTable::new();
        let node = parse_one(&arena, &mut strings, "(begin (set! x 1) x)");
        let AstKind::Begin(body) = &node.kind else {
            panic!("expected begin");
        };
        assert_eq!(body.len(), 2);
        assert!(matches!(body[0].kind, AstKind::Set { .. }));
    }

    #[test]
    fn test_locations_attached() {
        let arena = Arena::new();
        let mut strings = StringTable::new();
        let node = parse_one(&arena, &mut strings, "\n  (+ 1 2)");
        assert_eq!(node.loc, Loc::new(2, 3));
    }

    #[test]
    fn test_duplicate_lambda_params_rejected() {
        let err = parse_err("(lambda (x x) x)");
        assert!(err.contains("duplicate parameter 'x'"));
    }

    #[test]
    fn test_named_let_rejected() {
        let err = parse_err("(let loop ((i 0)) i)");
        assert!(err.contains("named let"));
    }

    #[test]
    fn test_quoted_list_rejected() {
        let err = parse_err("'(1 2 3)");
        assert!(err.contains("quoted lists"));
    }

    #[test]
    fn test_empty_body_rejected() {
        let err = parse_err("(lambda (x))");
        assert!(err.contains("empty body"));
    }

    #[test]
    fn test_unclosed_form_is_an_error() {
        let err = parse_err("(+ 1 2");
        assert!(err.contains("unexpected end of input"));
    }

    #[test]
    fn test_stray_rparen_is_an_error() {
        let err = parse_err(")");
        assert!(err.contains("unexpected ')'"));
    }
}
