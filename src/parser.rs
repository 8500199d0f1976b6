use std::collections::HashSet;
use std::mem;

use crate::{
    ast::{CompareOp, Expr, ExprKind, Literal, LogicalOp, SelectItem, SortDirection, Token},
    config::QueryConfig,
    error::ParseError,
    lexer::{Lexer, Position},
};

/// Page bounds applied while parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Caller-requested page size, used when the query has no `limit`
    pub limit: Option<u64>,
    /// Caller-requested offset, used when the query has no `limit`
    pub offset: Option<u64>,
    pub default_limit: u64,
    pub max_limit: u64,
}

impl Pagination {
    pub fn new(config: &QueryConfig, limit: Option<u64>, offset: Option<u64>) -> Self {
        Pagination {
            limit,
            offset,
            default_limit: config.default_limit,
            max_limit: config.max_limit,
        }
    }

    /// Page size and offset when the query text gives none.
    ///
    /// The offset is clamped so that the page end stays a valid range bound.
    pub fn page(&self) -> (u64, u64) {
        let count = self.clamp(self.limit.unwrap_or(self.default_limit));
        let offset = self.offset.unwrap_or(0);
        if offset > max_offset(count) {
            tracing::warn!(offset, count, "offset past the last addressable page, clamping");
        }
        (count, offset.min(max_offset(count)))
    }

    fn clamp(&self, count: u64) -> u64 {
        if count > self.max_limit {
            tracing::warn!(count, max_limit = self.max_limit, "limit above maximum, clamping");
        }
        count.min(self.max_limit)
    }
}

/// Largest offset whose page of `count` results ends within `i64`.
fn max_offset(count: u64) -> u64 {
    (i64::MAX as u64).saturating_sub(count)
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination::new(&QueryConfig::default(), None, None)
    }
}

pub struct Parser {
    lexer: Lexer,
    current_token: Token,
    current_position: Position,
    pagination: Pagination,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let current_token = lexer.next_token()?;
        let current_position = lexer.token_position();
        Ok(Parser {
            lexer,
            current_token,
            current_position,
            pagination: Pagination::default(),
        })
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = pagination;
        self
    }

    fn advance(&mut self) -> Result<(), ParseError> {
        self.current_token = self.lexer.next_token()?;
        self.current_position = self.lexer.token_position();
        Ok(())
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.current_position, message)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.error(format!(
                "Expected {:?}, got {:?}",
                expected, self.current_token
            )));
        }
        self.advance()
    }

    fn check(&self, token: &Token) -> bool {
        mem::discriminant(&self.current_token) == mem::discriminant(token)
    }

    fn parse_identifier(&mut self, what: &str) -> Result<String, ParseError> {
        match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Identifier(name) => {
                self.advance()?;
                Ok(name)
            }
            token => {
                let err = self.error(format!("Expected {}, got {:?}", what, token));
                self.current_token = token;
                Err(err)
            }
        }
    }

    fn parse_unsigned(&mut self, what: &str) -> Result<u64, ParseError> {
        match self.current_token {
            Token::Integer(n) if n >= 0 => {
                self.advance()?;
                Ok(n as u64)
            }
            _ => Err(self.error(format!(
                "Expected non-negative integer for {}, got {:?}",
                what, self.current_token
            ))),
        }
    }

    /// Parse a dotted attribute path: `name`, `db.name`
    fn parse_path(&mut self) -> Result<Expr, ParseError> {
        let field = self.parse_identifier("attribute name")?;
        let mut expr = Expr::new(ExprKind::FieldAccess { input: None, field });

        while self.check(&Token::Dot) {
            self.advance()?;
            let field = self.parse_identifier("attribute name after '.'")?;
            expr = Expr::new(ExprKind::FieldAccess {
                input: Some(Box::new(expr)),
                field,
            });
        }
        Ok(expr)
    }

    fn parse_literal(&mut self) -> Result<Literal, ParseError> {
        let literal = match mem::replace(&mut self.current_token, Token::Eof) {
            Token::Integer(n) => Literal::Integer(n),
            Token::Decimal(d) => Literal::Decimal(d),
            Token::String(s) => Literal::String(s),
            Token::Boolean(b) => Literal::Boolean(b),
            Token::Null => Literal::Null,
            Token::Minus => {
                self.advance()?;
                return match self.current_token {
                    Token::Integer(n) => {
                        self.advance()?;
                        Ok(Literal::Integer(-n))
                    }
                    Token::Decimal(d) => {
                        self.advance()?;
                        Ok(Literal::Decimal(-d))
                    }
                    _ => Err(self.error(format!(
                        "Expected number after '-', got {:?}",
                        self.current_token
                    ))),
                };
            }
            token => {
                let err = self.error(format!("Expected literal, got {:?}", token));
                self.current_token = token;
                return Err(err);
            }
        };
        self.advance()?;
        Ok(literal)
    }

    fn compare_op(&self) -> Option<CompareOp> {
        match self.current_token {
            Token::Eq => Some(CompareOp::Equal),
            Token::NotEq => Some(CompareOp::NotEqual),
            Token::Lt => Some(CompareOp::LessThan),
            Token::LtEq => Some(CompareOp::LessEqual),
            Token::Gt => Some(CompareOp::GreaterThan),
            Token::GtEq => Some(CompareOp::GreaterEqual),
            Token::Like => Some(CompareOp::Like),
            _ => None,
        }
    }

    fn expect_compare_op(&mut self) -> Result<CompareOp, ParseError> {
        let op = self.compare_op().ok_or_else(|| {
            self.error(format!(
                "Expected comparison operator, got {:?}",
                self.current_token
            ))
        })?;
        self.advance()?;
        Ok(op)
    }

    /// `path op literal` or `literal op path`; the latter is normalized to the former
    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let (op, path, literal) = if matches!(self.current_token, Token::Identifier(_)) {
            let path = self.parse_path()?;
            let op = self.expect_compare_op()?;
            let literal = self.parse_literal()?;
            (op, path, literal)
        } else {
            let literal = self.parse_literal()?;
            let op = self.expect_compare_op()?;
            let path = self.parse_path()?;
            (op.mirrored(), path, literal)
        };

        Ok(Expr::new(ExprKind::Comparison {
            op,
            left: Box::new(path),
            right: Box::new(Expr::literal(literal)),
        }))
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::LParen) {
            self.advance()?;
            let expr = self.parse_expression()?;
            self.expect(Token::RParen)?;
            return Ok(expr);
        }
        self.parse_comparison()
    }

    fn parse_not(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::Not) {
            self.advance()?;
            let operand = self.parse_not()?;
            return Ok(Expr::new(ExprKind::Logical {
                op: LogicalOp::Not,
                operands: vec![operand],
            }));
        }
        self.parse_primary()
    }

    fn parse_and(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_not()?;

        while self.check(&Token::And) {
            self.advance()?;
            let right = self.parse_not()?;

            left = Expr::new(ExprKind::Logical {
                op: LogicalOp::And,
                operands: vec![left, right],
            });
        }
        Ok(left)
    }

    fn parse_or(&mut self) -> Result<Expr, ParseError> {
        let mut left = self.parse_and()?;

        while self.check(&Token::Or) {
            self.advance()?;
            let right = self.parse_and()?;

            left = Expr::new(ExprKind::Logical {
                op: LogicalOp::Or,
                operands: vec![left, right],
            });
        }
        Ok(left)
    }

    /// Parse a boolean predicate
    pub fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        self.parse_or()
    }

    /// Parse a standalone predicate up to the end of input
    pub fn parse(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expression()?;
        self.expect(Token::Eof)?;
        Ok(expr)
    }
}

impl Parser {
    /// Parse a complete query
    pub fn parse_query(&mut self) -> Result<Expr, ParseError> {
        let mut query = self.parse_source()?;

        if self.check(&Token::Where) {
            self.advance()?;
            let predicate = self.parse_expression()?;
            query = Expr::new(ExprKind::Filter {
                input: Box::new(query),
                predicate: Box::new(predicate),
            });
        }

        if self.check(&Token::Loop) {
            query = self.parse_loop(query)?;
        }

        let items = if self.check(&Token::Select) {
            Some(self.parse_select_items()?)
        } else {
            None
        };

        if self.check(&Token::OrderBy) {
            query = self.parse_order_by(query, items.as_deref())?;
        }

        query = self.parse_limit(query)?;

        if let Some(items) = items {
            query = Expr::new(ExprKind::SelectList {
                input: Box::new(query),
                items,
            });
        }

        if !self.check(&Token::Eof) {
            return Err(self.error(format!(
                "Unexpected {:?} after end of query",
                self.current_token
            )));
        }
        Ok(query)
    }

    fn parse_source(&mut self) -> Result<Expr, ParseError> {
        if self.check(&Token::From) {
            self.advance()?;
        }
        let type_name = self.parse_identifier("type name")?;
        let mut source = Expr::type_select(type_name);

        while self.check(&Token::Isa) {
            self.advance()?;
            let trait_name = self.parse_identifier("trait name after 'isa'")?;
            source = Expr::new(ExprKind::TraitFilter {
                input: Box::new(source),
                trait_name,
            });
        }
        Ok(source)
    }

    fn parse_loop(&mut self, input: Expr) -> Result<Expr, ParseError> {
        self.advance()?; // consume 'loop'
        self.expect(Token::LParen)?;
        let path = self.parse_path()?;

        let mut times = None;
        if self.check(&Token::Comma) {
            self.advance()?;
            self.expect(Token::Times)?;
            self.expect(Token::Eq)?;
            let position = self.current_position;
            let n = self.parse_unsigned("loop times")?;
            if n == 0 || n > u64::from(u32::MAX) {
                return Err(ParseError::new(
                    position,
                    format!("Loop times must be between 1 and {}, got {}", u32::MAX, n),
                ));
            }
            times = Some(n as u32);
        }
        self.expect(Token::RParen)?;

        Ok(Expr::new(ExprKind::PathLoop {
            input: Box::new(input),
            path: Box::new(path),
            times,
        }))
    }

    fn parse_select_items(&mut self) -> Result<Vec<SelectItem>, ParseError> {
        self.advance()?; // consume 'select'
        let mut items = Vec::new();
        let mut aliases = HashSet::new();

        loop {
            let position = self.current_position;
            let expr = self.parse_path()?;
            let alias = if self.check(&Token::As) {
                self.advance()?;
                self.parse_identifier("alias after 'as'")?
            } else {
                expr.path_segments().unwrap_or_default().join(".")
            };

            if !aliases.insert(alias.clone()) {
                return Err(ParseError::new(
                    position,
                    format!("Duplicate select alias '{}'", alias),
                ));
            }
            items.push(SelectItem { alias, expr });

            if !self.check(&Token::Comma) {
                break;
            }
            self.advance()?;
        }
        Ok(items)
    }

    fn parse_order_by(
        &mut self,
        input: Expr,
        items: Option<&[SelectItem]>,
    ) -> Result<Expr, ParseError> {
        self.advance()?; // consume 'orderby'
        let mut key = self.parse_path()?;

        // A bare alias orders by the aliased expression
        if let ExprKind::FieldAccess { input: None, field } = &key.kind {
            if let Some(item) = items
                .into_iter()
                .flatten()
                .find(|item| &item.alias == field)
            {
                key = item.expr.clone();
            }
        }

        let direction = match self.current_token {
            Token::Asc => {
                self.advance()?;
                SortDirection::Asc
            }
            Token::Desc => {
                self.advance()?;
                SortDirection::Desc
            }
            _ => SortDirection::Asc,
        };

        Ok(Expr::new(ExprKind::OrderBy {
            input: Box::new(input),
            key: Box::new(key),
            direction,
        }))
    }

    /// Parse `limit n [offset m]`, or inject the caller's page when absent
    fn parse_limit(&mut self, input: Expr) -> Result<Expr, ParseError> {
        let (count, offset) = if self.check(&Token::Limit) {
            self.advance()?;
            let requested = self.parse_unsigned("limit")?;
            let count = self.pagination.clamp(requested);
            let offset = if self.check(&Token::Offset) {
                self.advance()?;
                let position = self.current_position;
                let offset = self.parse_unsigned("offset")?;
                if offset > max_offset(count) {
                    return Err(ParseError::new(
                        position,
                        format!("Offset {} is too large for a page of {} results", offset, count),
                    ));
                }
                offset
            } else {
                0
            };
            (count, offset)
        } else {
            self.pagination.page()
        };

        Ok(Expr::new(ExprKind::Limit {
            input: Box::new(input),
            count,
            offset,
        }))
    }
}

/// Parses `text` as a query with the given page bounds.
pub fn parse_query(text: &str, pagination: Pagination) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(Lexer::new(text))?.with_pagination(pagination);
    let query = parser.parse_query()?;
    tracing::debug!(query = %query, "parsed query");
    Ok(query)
}
