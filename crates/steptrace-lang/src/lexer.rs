//! Indentation-aware tokenizer.
//!
//! Produces a flat token stream with synthetic `Indent`/`Dedent`/`Newline`
//! tokens, the same shape CPython's tokenizer hands its parser. Indentation
//! is only significant outside brackets; a line that ends with an open `(` or
//! `[` continues onto the next physical line.

use crate::error::SyntaxError;

/// One lexical token.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Ident(String),
    Int(i64),
    Float(f64),
    Str(String),

    // Keywords
    Def,
    Return,
    If,
    Elif,
    Else,
    While,
    For,
    In,
    Break,
    Continue,
    Pass,
    Global,
    And,
    Or,
    Not,
    True,
    False,
    NoneKw,

    // Operators and punctuation
    Plus,
    Minus,
    Star,
    Slash,
    SlashSlash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    SlashSlashAssign,
    PercentAssign,
    EqEq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Colon,
    Dot,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl Token {
    /// Short description used in parser error messages.
    pub fn describe(&self) -> String {
        match self {
            Token::Ident(name) => format!("name '{name}'"),
            Token::Int(v) => format!("number {v}"),
            Token::Float(v) => format!("number {v}"),
            Token::Str(_) => "string literal".into(),
            Token::Newline => "end of line".into(),
            Token::Indent => "indent".into(),
            Token::Dedent => "dedent".into(),
            Token::Eof => "end of input".into(),
            other => format!("'{}'", other.lexeme()),
        }
    }

    fn lexeme(&self) -> &'static str {
        match self {
            Token::Def => "def",
            Token::Return => "return",
            Token::If => "if",
            Token::Elif => "elif",
            Token::Else => "else",
            Token::While => "while",
            Token::For => "for",
            Token::In => "in",
            Token::Break => "break",
            Token::Continue => "continue",
            Token::Pass => "pass",
            Token::Global => "global",
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
            Token::True => "True",
            Token::False => "False",
            Token::NoneKw => "None",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::SlashSlash => "//",
            Token::Percent => "%",
            Token::Assign => "=",
            Token::PlusAssign => "+=",
            Token::MinusAssign => "-=",
            Token::StarAssign => "*=",
            Token::SlashAssign => "/=",
            Token::SlashSlashAssign => "//=",
            Token::PercentAssign => "%=",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::Lt => "<",
            Token::Le => "<=",
            Token::Gt => ">",
            Token::Ge => ">=",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::Dot => ".",
            _ => "?",
        }
    }
}

/// Tab stops expand to the next multiple of eight columns, matching the
/// CPython tokenizer's default.
const TAB_WIDTH: usize = 8;

/// Tokenizes `source` into a stream of `(token, line)` pairs.
///
/// The stream always ends with trailing `Dedent`s back to column zero
/// followed by a single [`Token::Eof`].
pub fn lex(source: &str) -> Result<Vec<(Token, u32)>, SyntaxError> {
    let mut tokens: Vec<(Token, u32)> = Vec::new();
    let mut indents: Vec<usize> = vec![0];
    let mut bracket_depth: usize = 0;
    let mut last_line = 0u32;

    for (idx, raw_line) in source.lines().enumerate() {
        let line = idx as u32 + 1;
        last_line = line;
        let mut chars = raw_line.chars().peekable();

        if bracket_depth == 0 {
            // Measure indentation.
            let mut width = 0usize;
            while let Some(&c) = chars.peek() {
                match c {
                    ' ' => width += 1,
                    '\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                    _ => break,
                }
                chars.next();
            }

            // Blank and comment-only lines do not affect indentation.
            match chars.peek() {
                None => continue,
                Some('#') => continue,
                _ => {}
            }

            let current = *indents.last().unwrap_or(&0);
            if width > current {
                indents.push(width);
                tokens.push((Token::Indent, line));
            } else if width < current {
                while *indents.last().unwrap_or(&0) > width {
                    indents.pop();
                    tokens.push((Token::Dedent, line));
                }
                if *indents.last().unwrap_or(&0) != width {
                    return Err(SyntaxError::new(
                        line,
                        "unindent does not match any outer indentation level",
                    ));
                }
            }
        } else {
            // Continuation line inside brackets: skip leading whitespace only.
            while matches!(chars.peek(), Some(' ') | Some('\t')) {
                chars.next();
            }
        }

        let emitted_before = tokens.len();
        while let Some(&c) = chars.peek() {
            match c {
                ' ' | '\t' => {
                    chars.next();
                }
                '#' => break,
                '\'' | '"' => {
                    chars.next();
                    tokens.push((Token::Str(lex_string(&mut chars, c, line)?), line));
                }
                '0'..='9' => tokens.push((lex_number(&mut chars, line)?, line)),
                c if c.is_alphabetic() || c == '_' => {
                    let mut name = String::new();
                    while let Some(&c) = chars.peek() {
                        if c.is_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                    tokens.push((keyword_or_ident(name), line));
                }
                _ => {
                    chars.next();
                    let tok = match c {
                        '+' => follow(&mut chars, '=', Token::PlusAssign, Token::Plus),
                        '-' => follow(&mut chars, '=', Token::MinusAssign, Token::Minus),
                        '*' => follow(&mut chars, '=', Token::StarAssign, Token::Star),
                        '%' => follow(&mut chars, '=', Token::PercentAssign, Token::Percent),
                        '<' => follow(&mut chars, '=', Token::Le, Token::Lt),
                        '>' => follow(&mut chars, '=', Token::Ge, Token::Gt),
                        '=' => follow(&mut chars, '=', Token::EqEq, Token::Assign),
                        '/' => {
                            if chars.peek() == Some(&'/') {
                                chars.next();
                                follow(&mut chars, '=', Token::SlashSlashAssign, Token::SlashSlash)
                            } else {
                                follow(&mut chars, '=', Token::SlashAssign, Token::Slash)
                            }
                        }
                        '!' => {
                            if chars.peek() == Some(&'=') {
                                chars.next();
                                Token::NotEq
                            } else {
                                return Err(SyntaxError::new(line, "unexpected character '!'"));
                            }
                        }
                        '(' => {
                            bracket_depth += 1;
                            Token::LParen
                        }
                        '[' => {
                            bracket_depth += 1;
                            Token::LBracket
                        }
                        ')' => {
                            bracket_depth = bracket_depth.saturating_sub(1);
                            Token::RParen
                        }
                        ']' => {
                            bracket_depth = bracket_depth.saturating_sub(1);
                            Token::RBracket
                        }
                        ',' => Token::Comma,
                        ':' => Token::Colon,
                        '.' => Token::Dot,
                        other => {
                            return Err(SyntaxError::new(
                                line,
                                format!("unexpected character '{other}'"),
                            ))
                        }
                    };
                    tokens.push((tok, line));
                }
            }
        }

        if bracket_depth == 0 && tokens.len() > emitted_before {
            tokens.push((Token::Newline, line));
        }
    }

    if bracket_depth > 0 {
        return Err(SyntaxError::new(last_line, "unexpected end of input inside brackets"));
    }

    let eof_line = last_line.max(1);
    while indents.len() > 1 {
        indents.pop();
        tokens.push((Token::Dedent, eof_line));
    }
    tokens.push((Token::Eof, eof_line));
    Ok(tokens)
}

fn keyword_or_ident(name: String) -> Token {
    match name.as_str() {
        "def" => Token::Def,
        "return" => Token::Return,
        "if" => Token::If,
        "elif" => Token::Elif,
        "else" => Token::Else,
        "while" => Token::While,
        "for" => Token::For,
        "in" => Token::In,
        "break" => Token::Break,
        "continue" => Token::Continue,
        "pass" => Token::Pass,
        "global" => Token::Global,
        "and" => Token::And,
        "or" => Token::Or,
        "not" => Token::Not,
        "True" => Token::True,
        "False" => Token::False,
        "None" => Token::NoneKw,
        _ => Token::Ident(name),
    }
}

/// Picks `then` when the next char is `expect`, consuming it, else `other`.
fn follow(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    expect: char,
    then: Token,
    other: Token,
) -> Token {
    if chars.peek() == Some(&expect) {
        chars.next();
        then
    } else {
        other
    }
}

fn lex_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    quote: char,
    line: u32,
) -> Result<String, SyntaxError> {
    let mut out = String::new();
    loop {
        match chars.next() {
            None => return Err(SyntaxError::new(line, "unterminated string literal")),
            Some(c) if c == quote => return Ok(out),
            Some('\\') => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some('\'') => out.push('\''),
                Some('"') => out.push('"'),
                Some(other) => {
                    // Unknown escapes pass through verbatim, like CPython's
                    // string literals (modulo the deprecation warning).
                    out.push('\\');
                    out.push(other);
                }
                None => return Err(SyntaxError::new(line, "unterminated string literal")),
            },
            Some(c) => out.push(c),
        }
    }
}

fn lex_number(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line: u32,
) -> Result<Token, SyntaxError> {
    let mut text = String::new();
    let mut is_float = false;
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            text.push(c);
            chars.next();
        } else if c == '.' && !is_float {
            is_float = true;
            text.push(c);
            chars.next();
        } else {
            break;
        }
    }
    if is_float {
        text.parse::<f64>()
            .map(Token::Float)
            .map_err(|_| SyntaxError::new(line, format!("invalid number literal '{text}'")))
    } else {
        text.parse::<i64>()
            .map(Token::Int)
            .map_err(|_| SyntaxError::new(line, format!("integer literal too large '{text}'")))
    }
}
