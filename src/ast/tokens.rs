use rust_decimal::Decimal;

/// Lexical tokens of the query language.
///
/// Keywords are matched case-insensitively; everything that is not a
/// keyword becomes an [`Token::Identifier`].
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Literals
    /// Integer literal
    ///
    /// # Examples
    /// ```text
    /// 42
    /// 10000
    /// ```
    Integer(i64),

    /// Exact decimal literal
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// 0.5
    /// ```
    Decimal(Decimal),

    /// String literal enclosed in double or single quotes
    ///
    /// # Examples
    /// ```text
    /// "sales_fact"
    /// 'customer*'
    /// ```
    String(String),

    /// Boolean values
    Boolean(bool),

    /// Null value
    Null,

    /// Type, trait, attribute or alias name
    ///
    /// Plain identifiers start with a letter or underscore. Names that
    /// contain other characters, or collide with keywords, are written
    /// between back-quotes.
    ///
    /// # Examples
    /// ```text
    /// hive_table
    /// `Table`
    /// `order`
    /// ```
    Identifier(String),

    // Keywords
    From,
    Where,
    /// Trait filter (`isa` or `is`)
    Isa,
    Loop,
    Times,
    Select,
    As,
    OrderBy,
    Asc,
    Desc,
    Limit,
    Offset,
    And,
    Or,
    Not,
    Like,

    // Comparison
    /// `=` or `==`
    Eq,
    /// `!=`
    NotEq,
    /// `<`
    Lt,
    /// `>`
    Gt,
    /// `<=`
    LtEq,
    /// `>=`
    GtEq,

    /// Unary minus in front of a number
    Minus,

    // Delimiters
    LParen,
    RParen,
    Dot,
    Comma,

    /// End of input
    Eof,
}

impl Token {
    /// Maps a lowercased word to its keyword token, if it is one.
    pub fn keyword(word: &str) -> Option<Token> {
        let token = match word {
            "from" => Token::From,
            "where" => Token::Where,
            "isa" | "is" => Token::Isa,
            "loop" => Token::Loop,
            "times" => Token::Times,
            "select" => Token::Select,
            "as" => Token::As,
            "orderby" => Token::OrderBy,
            "asc" => Token::Asc,
            "desc" => Token::Desc,
            "limit" => Token::Limit,
            "offset" => Token::Offset,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "like" => Token::Like,
            "true" => Token::Boolean(true),
            "false" => Token::Boolean(false),
            "null" => Token::Null,
            _ => return None,
        };
        Some(token)
    }
}
