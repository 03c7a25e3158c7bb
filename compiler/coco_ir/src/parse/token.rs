//! Token definition for the textual IR.

use logos::Logos;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r";[^\n]*")]
pub(crate) enum Token {
    #[token("\n")]
    Newline,

    /// `%name`: parameter or named instruction.
    #[regex(r"%[A-Za-z_.][A-Za-z0-9_.]*", |lex| lex.slice()[1..].to_owned())]
    Local(String),

    /// `%17`: unnamed instruction.
    #[regex(r"%[0-9]+", |lex| lex.slice()[1..].to_owned())]
    Numbered(String),

    /// `@name`: global or function.
    #[regex(r"@[A-Za-z_.][A-Za-z0-9_.]*", |lex| lex.slice()[1..].to_owned())]
    Symbol(String),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    /// Keywords, opcodes, types and block labels.
    #[regex(r"[A-Za-z_][A-Za-z0-9_.]*", |lex| lex.slice().to_owned())]
    Word(String),

    #[token("=")]
    Eq,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
}

impl Token {
    pub(crate) fn describe(&self) -> String {
        match self {
            Token::Newline => "newline".to_owned(),
            Token::Local(n) => format!("`%{n}`"),
            Token::Numbered(n) => format!("`%{n}`"),
            Token::Symbol(n) => format!("`@{n}`"),
            Token::Int(i) => format!("`{i}`"),
            Token::Word(w) => format!("`{w}`"),
            Token::Eq => "`=`".to_owned(),
            Token::Comma => "`,`".to_owned(),
            Token::Colon => "`:`".to_owned(),
            Token::LParen => "`(`".to_owned(),
            Token::RParen => "`)`".to_owned(),
            Token::LBrace => "`{`".to_owned(),
            Token::RBrace => "`}`".to_owned(),
            Token::LBracket => "`[`".to_owned(),
            Token::RBracket => "`]`".to_owned(),
        }
    }
}

/// Lex `src` into `(token, line)` pairs. Newlines are consumed here and
/// only survive as line numbers.
pub(crate) fn lex(src: &str) -> Result<Vec<(Token, usize)>, super::ParseError> {
    let mut out = Vec::new();
    let mut line = 1;
    let mut lexer = Token::lexer(src);
    while let Some(tok) = lexer.next() {
        match tok {
            Ok(Token::Newline) => line += 1,
            Ok(tok) => out.push((tok, line)),
            Err(()) => {
                return Err(super::ParseError {
                    line,
                    message: format!("unrecognized input `{}`", lexer.slice()),
                })
            }
        }
    }
    Ok(out)
}
