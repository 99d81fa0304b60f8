//! Formula expression parser
//!
//! A recursive descent parser with one method per precedence tier.
//! Comments (`// ...`, `/* ... */`) and whitespace are trivia and may
//! appear between any two tokens; the scanner owns the lookahead that
//! keeps them distinct from the `/` operator.

use crate::ast::{BinaryOperator, Expr, Span};
use crate::error::{FormulaError, FormulaResult};

/// Parse an expression string into an AST
///
/// # Example
/// ```rust
/// use gridbase_formula::parse_expression;
///
/// let ast = parse_expression("1 + 2").unwrap();
/// let ast = parse_expression("SUM({fldA}, 10)").unwrap();
/// let ast = parse_expression("IF({fldDone}, 'yes', 'no')").unwrap();
/// ```
pub fn parse_expression(input: &str) -> FormulaResult<Expr> {
    let mut parser = Parser::new(input)?;
    let expr = parser.parse_or()?;

    // Make sure we consumed all input
    if *parser.current_token() != Token::Eof {
        return Err(FormulaError::syntax(
            format!(
                "unexpected {} after expression",
                describe(parser.current_token())
            ),
            parser.token_start,
        ));
    }

    Ok(expr)
}

/// Token types
#[derive(Debug, Clone, PartialEq)]
enum Token {
    // Literals
    Integer(i64),
    Decimal(f64),
    Str(String),
    Boolean(bool),

    // Identifiers and references
    Identifier(String),
    FieldRef { id: String, span: Span },

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Ampersand,
    AndAnd,
    OrOr,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,

    // Delimiters
    LeftParen,
    RightParen,
    Comma,

    // End of input
    Eof,
}

/// Human-readable token description for error messages
fn describe(token: &Token) -> String {
    match token {
        Token::Integer(n) => format!("number '{}'", n),
        Token::Decimal(n) => format!("number '{}'", n),
        Token::Str(s) => format!("string '{}'", s),
        Token::Boolean(b) => format!("'{}'", b),
        Token::Identifier(name) => format!("identifier '{}'", name),
        Token::FieldRef { id, .. } => format!("field reference '{{{}}}'", id),
        Token::Plus => "'+'".into(),
        Token::Minus => "'-'".into(),
        Token::Star => "'*'".into(),
        Token::Slash => "'/'".into(),
        Token::Percent => "'%'".into(),
        Token::Ampersand => "'&'".into(),
        Token::AndAnd => "'&&'".into(),
        Token::OrOr => "'||'".into(),
        Token::Equal => "'='".into(),
        Token::NotEqual => "'!='".into(),
        Token::LessThan => "'<'".into(),
        Token::LessEqual => "'<='".into(),
        Token::GreaterThan => "'>'".into(),
        Token::GreaterEqual => "'>='".into(),
        Token::LeftParen => "'('".into(),
        Token::RightParen => "')'".into(),
        Token::Comma => "','".into(),
        Token::Eof => "end of expression".into(),
    }
}

/// Expression parser with an embedded scanner
struct Parser<'a> {
    input: &'a str,
    pos: usize,
    /// Byte offset where the current token started, for error positions
    token_start: usize,
    current_token: Option<Token>,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> FormulaResult<Self> {
        let mut parser = Self {
            input,
            pos: 0,
            token_start: 0,
            current_token: None,
        };
        parser.advance_token()?;
        Ok(parser)
    }

    // === Token scanning ===

    fn advance_token(&mut self) -> FormulaResult<()> {
        self.skip_trivia()?;
        self.token_start = self.pos;
        self.current_token = Some(self.scan_token()?);
        Ok(())
    }

    fn scan_token(&mut self) -> FormulaResult<Token> {
        if self.is_at_end() {
            return Ok(Token::Eof);
        }

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        // Single-character tokens
        match c {
            '+' => {
                self.advance();
                return Ok(Token::Plus);
            }
            '-' => {
                self.advance();
                return Ok(Token::Minus);
            }
            '*' => {
                self.advance();
                return Ok(Token::Star);
            }
            '/' => {
                self.advance();
                return Ok(Token::Slash);
            }
            '%' => {
                self.advance();
                return Ok(Token::Percent);
            }
            ',' => {
                self.advance();
                return Ok(Token::Comma);
            }
            '(' => {
                self.advance();
                return Ok(Token::LeftParen);
            }
            ')' => {
                self.advance();
                return Ok(Token::RightParen);
            }
            _ => {}
        }

        // One- and two-character operators
        if c == '&' {
            self.advance();
            if self.peek_char() == Some('&') {
                self.advance();
                return Ok(Token::AndAnd);
            }
            return Ok(Token::Ampersand);
        }

        if c == '|' {
            self.advance();
            if self.peek_char() == Some('|') {
                self.advance();
                return Ok(Token::OrOr);
            }
            return Err(FormulaError::syntax("unexpected character '|'", self.token_start));
        }

        if c == '=' {
            self.advance();
            // '=' and '==' are the same operator
            if self.peek_char() == Some('=') {
                self.advance();
            }
            return Ok(Token::Equal);
        }

        if c == '!' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Ok(Token::NotEqual);
            }
            return Err(FormulaError::syntax("unexpected character '!'", self.token_start));
        }

        if c == '<' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Ok(Token::LessEqual);
            }
            return Ok(Token::LessThan);
        }

        if c == '>' {
            self.advance();
            if self.peek_char() == Some('=') {
                self.advance();
                return Ok(Token::GreaterEqual);
            }
            return Ok(Token::GreaterThan);
        }

        // String literal, either quote style
        if c == '"' || c == '\'' {
            return self.scan_string(c);
        }

        // Field reference
        if c == '{' {
            return self.scan_field_reference();
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        // Identifier or boolean
        if c.is_ascii_alphabetic() || c == '_' {
            return Ok(self.scan_identifier());
        }

        Err(FormulaError::syntax(
            format!("unexpected character '{}'", c),
            self.token_start,
        ))
    }

    fn scan_string(&mut self, quote: char) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut s = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(FormulaError::syntax("unterminated string literal", start));
                }
                Some(c) if c == quote => {
                    self.advance();
                    return Ok(Token::Str(s));
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        None => {
                            return Err(FormulaError::syntax("unterminated string literal", start));
                        }
                        Some(esc) => {
                            self.advance();
                            match esc {
                                'n' => s.push('\n'),
                                'r' => s.push('\r'),
                                't' => s.push('\t'),
                                'b' => s.push('\u{0008}'),
                                'f' => s.push('\u{000C}'),
                                'v' => s.push('\u{000B}'),
                                '\\' | '"' | '\'' => s.push(esc),
                                // Unrecognized escapes pass through literally
                                other => {
                                    s.push('\\');
                                    s.push(other);
                                }
                            }
                        }
                    }
                }
                Some(c) => {
                    s.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_field_reference(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip '{'

        let mut id = String::new();
        loop {
            match self.peek_char() {
                None => {
                    return Err(FormulaError::syntax("unterminated field reference", start));
                }
                Some('}') => {
                    self.advance();
                    let span = Span::new(start, self.pos);
                    return Ok(Token::FieldRef { id, span });
                }
                Some('\\') => {
                    self.advance();
                    match self.peek_char() {
                        None => {
                            return Err(FormulaError::syntax(
                                "unterminated field reference",
                                start,
                            ));
                        }
                        Some(esc @ ('{' | '}' | '\\')) => {
                            id.push(esc);
                            self.advance();
                        }
                        Some(other) => {
                            id.push('\\');
                            id.push(other);
                            self.advance();
                        }
                    }
                }
                Some(c) => {
                    id.push(c);
                    self.advance();
                }
            }
        }
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part, only when a digit follows the dot
        let mut is_decimal = false;
        if self.peek_char() == Some('.')
            && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit())
        {
            is_decimal = true;
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        let num_str = &self.input[start..self.pos];
        if is_decimal {
            let num: f64 = num_str
                .parse()
                .map_err(|_| FormulaError::syntax(format!("invalid number '{}'", num_str), start))?;
            Ok(Token::Decimal(num))
        } else {
            match num_str.parse::<i64>() {
                Ok(n) => Ok(Token::Integer(n)),
                // Longer than i64: keep it as a float like every other number
                Err(_) => {
                    let num: f64 = num_str.parse().map_err(|_| {
                        FormulaError::syntax(format!("invalid number '{}'", num_str), start)
                    })?;
                    Ok(Token::Decimal(num))
                }
            }
        }
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;

        while self
            .peek_char()
            .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_')
        {
            self.advance();
        }

        let text = &self.input[start..self.pos];

        // Boolean literals, any case
        if text.eq_ignore_ascii_case("true") {
            return Token::Boolean(true);
        }
        if text.eq_ignore_ascii_case("false") {
            return Token::Boolean(false);
        }

        Token::Identifier(text.to_string())
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    /// Skip whitespace and comments. Comments never reach the parser;
    /// they only separate tokens.
    fn skip_trivia(&mut self) -> FormulaResult<()> {
        loop {
            while self.peek_char().map_or(false, |c| c.is_whitespace()) {
                self.advance();
            }

            if self.input[self.pos..].starts_with("//") {
                while self.peek_char().map_or(false, |c| c != '\n') {
                    self.advance();
                }
                continue;
            }

            if self.input[self.pos..].starts_with("/*") {
                let start = self.pos;
                match self.input[self.pos + 2..].find("*/") {
                    Some(rel) => {
                        self.pos += 2 + rel + 2;
                        continue;
                    }
                    None => {
                        return Err(FormulaError::syntax("unterminated block comment", start));
                    }
                }
            }

            return Ok(());
        }
    }

    fn is_at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn current_token(&self) -> &Token {
        self.current_token.as_ref().unwrap_or(&Token::Eof)
    }

    fn consume(&mut self) -> FormulaResult<Token> {
        let token = self.current_token.take().unwrap_or(Token::Eof);
        self.advance_token()?;
        Ok(token)
    }

    fn expect_right_paren(&mut self, opening: &str) -> FormulaResult<()> {
        if *self.current_token() == Token::RightParen {
            self.consume()?;
            Ok(())
        } else {
            Err(FormulaError::syntax(
                format!(
                    "expected ')' to close {}, found {}",
                    opening,
                    describe(self.current_token())
                ),
                self.token_start,
            ))
        }
    }

    // === Expression parsing with precedence ===
    // Precedence (loosest to tightest):
    // 1. Logical or: ||
    // 2. Logical and: &&
    // 3. Concatenation: &
    // 4. Equality: =, ==, !=
    // 5. Ordering: <, <=, >, >=
    // 6. Addition/Subtraction: +, -
    // 7. Multiplication/Division/Remainder: *, /, %
    // 8. Unary minus
    // 9. Primary: literals, field references, function calls, parentheses

    fn parse_or(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_and()?;

        while *self.current_token() == Token::OrOr {
            self.consume()?;
            let right = self.parse_and()?;
            left = Expr::BinaryOp {
                op: BinaryOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_and(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_concat()?;

        while *self.current_token() == Token::AndAnd {
            self.consume()?;
            let right = self.parse_concat()?;
            left = Expr::BinaryOp {
                op: BinaryOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_concat(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_equality()?;

        while *self.current_token() == Token::Ampersand {
            self.consume()?;
            let right = self.parse_equality()?;
            left = Expr::BinaryOp {
                op: BinaryOperator::Concat,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_equality(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_relational()?;

        loop {
            let op = match self.current_token() {
                Token::Equal => BinaryOperator::Equal,
                Token::NotEqual => BinaryOperator::NotEqual,
                _ => break,
            };
            self.consume()?;
            let right = self.parse_relational()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_relational(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_additive()?;

        loop {
            let op = match self.current_token() {
                Token::LessThan => BinaryOperator::LessThan,
                Token::LessEqual => BinaryOperator::LessEqual,
                Token::GreaterThan => BinaryOperator::GreaterThan,
                Token::GreaterEqual => BinaryOperator::GreaterEqual,
                _ => break,
            };
            self.consume()?;
            let right = self.parse_additive()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let op = match self.current_token() {
                Token::Plus => BinaryOperator::Add,
                Token::Minus => BinaryOperator::Subtract,
                _ => break,
            };
            self.consume()?;
            let right = self.parse_multiplicative()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> FormulaResult<Expr> {
        let mut left = self.parse_unary()?;

        loop {
            let op = match self.current_token() {
                Token::Star => BinaryOperator::Multiply,
                Token::Slash => BinaryOperator::Divide,
                Token::Percent => BinaryOperator::Modulo,
                _ => break,
            };
            self.consume()?;
            let right = self.parse_unary()?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_unary(&mut self) -> FormulaResult<Expr> {
        if *self.current_token() == Token::Minus {
            self.consume()?;
            let operand = self.parse_unary()?;
            return Ok(Expr::UnaryNegate(Box::new(operand)));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> FormulaResult<Expr> {
        match self.current_token().clone() {
            Token::Integer(n) => {
                self.consume()?;
                Ok(Expr::IntegerLiteral(n))
            }
            Token::Decimal(n) => {
                self.consume()?;
                Ok(Expr::DecimalLiteral(n))
            }
            Token::Str(s) => {
                self.consume()?;
                Ok(Expr::StringLiteral(s))
            }
            Token::Boolean(b) => {
                self.consume()?;
                Ok(Expr::BooleanLiteral(b))
            }
            Token::FieldRef { id, span } => {
                self.consume()?;
                Ok(Expr::FieldReference { field_id: id, span })
            }
            Token::Identifier(name) => {
                self.consume()?;
                self.parse_function_call(name)
            }
            Token::LeftParen => {
                self.consume()?;
                let inner = self.parse_or()?;
                self.expect_right_paren("'('")?;
                Ok(Expr::Parenthesized(Box::new(inner)))
            }
            Token::Eof => Err(FormulaError::syntax(
                "unexpected end of expression",
                self.token_start,
            )),
            token => Err(FormulaError::syntax(
                format!("unexpected {}", describe(&token)),
                self.token_start,
            )),
        }
    }

    fn parse_function_call(&mut self, name: String) -> FormulaResult<Expr> {
        if *self.current_token() != Token::LeftParen {
            return Err(FormulaError::syntax(
                format!("expected '(' after function name '{}'", name),
                self.token_start,
            ));
        }
        self.consume()?;

        let mut args = Vec::new();
        if *self.current_token() != Token::RightParen {
            loop {
                args.push(self.parse_or()?);
                if *self.current_token() == Token::Comma {
                    self.consume()?;
                } else {
                    break;
                }
            }
        }

        self.expect_right_paren(&format!("call to '{}'", name))?;

        // Function names are case-insensitive; the canonical form is uppercase
        Ok(Expr::FunctionCall {
            name: name.to_uppercase(),
            args,
        })
    }
}
