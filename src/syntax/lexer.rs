//! Logos-based lexer for the analyzed language.
//!
//! The raw token stream keeps newlines; a filtering pass applies the
//! language's automatic semicolon insertion rule and drops trivia, so
//! the parser only ever sees significant tokens.

use logos::Logos;

use crate::base::Span;

#[derive(Logos, Debug, Clone, Copy, PartialEq, Eq)]
#[logos(skip r"[ \t\r]+")]
pub enum Tok {
    #[token("\n")]
    Newline,

    #[regex(r"//[^\n]*")]
    LineComment,
    #[regex(r"/\*([^*]|\*[^/])*\*/")]
    BlockComment,

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*")]
    Ident,

    #[regex(r"0[xX][0-9a-fA-F_]+|0[bB][01_]+|0[oO][0-7_]+|[0-9][0-9_]*")]
    Int,
    #[regex(r"[0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?|[0-9][0-9_]*[eE][+-]?[0-9]+|\.[0-9][0-9_]*([eE][+-]?[0-9]+)?")]
    Float,
    #[regex(r"([0-9][0-9_]*\.[0-9_]*([eE][+-]?[0-9]+)?|[0-9][0-9_]*([eE][+-]?[0-9]+)?)i")]
    Imag,
    #[regex(r"'([^'\\\n]|\\.)*'")]
    Char,
    #[regex(r#""([^"\\\n]|\\.)*""#)]
    #[regex(r"`[^`]*`")]
    Str,

    // Keywords.
    #[token("break")]
    Break,
    #[token("case")]
    Case,
    #[token("chan")]
    Chan,
    #[token("const")]
    Const,
    #[token("continue")]
    Continue,
    #[token("default")]
    Default,
    #[token("defer")]
    Defer,
    #[token("else")]
    Else,
    #[token("fallthrough")]
    Fallthrough,
    #[token("for")]
    For,
    #[token("func")]
    Func,
    #[token("go")]
    Go,
    #[token("goto")]
    Goto,
    #[token("if")]
    If,
    #[token("import")]
    Import,
    #[token("interface")]
    Interface,
    #[token("map")]
    Map,
    #[token("package")]
    Package,
    #[token("range")]
    Range,
    #[token("return")]
    Return,
    #[token("select")]
    Select,
    #[token("struct")]
    Struct,
    #[token("switch")]
    Switch,
    #[token("type")]
    Type,
    #[token("var")]
    Var,

    // Operators and delimiters.
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,
    #[token("&")]
    Amp,
    #[token("|")]
    Pipe,
    #[token("^")]
    Caret,
    #[token("<<")]
    Shl,
    #[token(">>")]
    Shr,
    #[token("&^")]
    AmpCaret,
    #[token("+=")]
    PlusEq,
    #[token("-=")]
    MinusEq,
    #[token("*=")]
    StarEq,
    #[token("/=")]
    SlashEq,
    #[token("%=")]
    PercentEq,
    #[token("&=")]
    AmpEq,
    #[token("|=")]
    PipeEq,
    #[token("^=")]
    CaretEq,
    #[token("<<=")]
    ShlEq,
    #[token(">>=")]
    ShrEq,
    #[token("&^=")]
    AmpCaretEq,
    #[token("&&")]
    AmpAmp,
    #[token("||")]
    PipePipe,
    #[token("<-")]
    Arrow,
    #[token("++")]
    PlusPlus,
    #[token("--")]
    MinusMinus,
    #[token("==")]
    EqEq,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Eq,
    #[token("!")]
    Not,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token(":=")]
    ColonEq,
    #[token("...")]
    DotDotDot,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token(",")]
    Comma,
    #[token(";")]
    Semi,
    #[token(".")]
    Dot,
    #[token(":")]
    Colon,

    /// Anything the rules above cannot claim; the parser reports it.
    #[regex(r"[^\x00-\x7f]")]
    Error,
}

impl Tok {
    /// Tokens after which a newline terminates the statement.
    fn ends_statement(self) -> bool {
        matches!(
            self,
            Tok::Ident
                | Tok::Int
                | Tok::Float
                | Tok::Imag
                | Tok::Char
                | Tok::Str
                | Tok::Break
                | Tok::Continue
                | Tok::Fallthrough
                | Tok::Return
                | Tok::PlusPlus
                | Tok::MinusMinus
                | Tok::RParen
                | Tok::RBracket
                | Tok::RBrace
        )
    }
}

/// A significant token as seen by the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: Tok,
    pub text: String,
    pub span: Span,
}

/// Tokenize `src`, applying semicolon insertion and dropping trivia.
/// Unlexable bytes surface as `Tok::Error` tokens for the parser to
/// report; they never abort the scan.
pub fn tokenize(src: &str) -> Vec<Token> {
    let mut out: Vec<Token> = Vec::new();
    let mut lexer = Tok::lexer(src);

    while let Some(item) = lexer.next() {
        let span = Span::new(lexer.span().start as u32, lexer.span().end as u32);
        let kind = item.unwrap_or(Tok::Error);
        match kind {
            Tok::Newline => {
                if out.last().is_some_and(|t| t.kind.ends_statement()) {
                    out.push(Token {
                        kind: Tok::Semi,
                        text: ";".into(),
                        span: Span::new(span.start, span.start),
                    });
                }
            }
            Tok::LineComment => {}
            Tok::BlockComment => {
                // A block comment spanning lines counts as a newline.
                if lexer.slice().contains('\n')
                    && out.last().is_some_and(|t| t.kind.ends_statement())
                {
                    out.push(Token {
                        kind: Tok::Semi,
                        text: ";".into(),
                        span: Span::new(span.start, span.start),
                    });
                }
            }
            _ => out.push(Token {
                kind,
                text: lexer.slice().to_string(),
                span,
            }),
        }
    }

    // The final statement may end at EOF without a newline.
    if out.last().is_some_and(|t| t.kind.ends_statement()) {
        let end = src.len() as u32;
        out.push(Token {
            kind: Tok::Semi,
            text: ";".into(),
            span: Span::new(end, end),
        });
    }
    out
}

/// Strip the quotes and simple escapes from a string literal.
pub fn unquote(lit: &str) -> String {
    if let Some(body) = lit.strip_prefix('`') {
        return body.strip_suffix('`').unwrap_or(body).to_string();
    }
    let body = lit
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(lit);
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('\'') => out.push('\''),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<Tok> {
        tokenize(src).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_semicolon_inserted_after_ident_at_newline() {
        assert_eq!(
            kinds("x = y\nz"),
            vec![
                Tok::Ident,
                Tok::Eq,
                Tok::Ident,
                Tok::Semi,
                Tok::Ident,
                Tok::Semi
            ]
        );
    }

    #[test]
    fn test_no_semicolon_after_operator() {
        assert_eq!(
            kinds("x +\ny"),
            vec![Tok::Ident, Tok::Plus, Tok::Ident, Tok::Semi]
        );
    }

    #[test]
    fn test_keywords_and_literals() {
        assert_eq!(
            kinds("const K = 1.5"),
            vec![Tok::Const, Tok::Ident, Tok::Eq, Tok::Float, Tok::Semi]
        );
        assert_eq!(kinds("0x1F"), vec![Tok::Int, Tok::Semi]);
        assert_eq!(kinds("2i"), vec![Tok::Imag, Tok::Semi]);
        assert_eq!(kinds("'a'"), vec![Tok::Char, Tok::Semi]);
    }

    #[test]
    fn test_comments_are_trivia() {
        assert_eq!(
            kinds("x // trailing\ny"),
            vec![Tok::Ident, Tok::Semi, Tok::Ident, Tok::Semi]
        );
        assert_eq!(kinds("/* a */ x"), vec![Tok::Ident, Tok::Semi]);
    }

    #[test]
    fn test_unquote_escapes() {
        assert_eq!(unquote(r#""net/http""#), "net/http");
        assert_eq!(unquote(r#""a\tb""#), "a\tb");
        assert_eq!(unquote("`raw\\n`"), "raw\\n");
    }

    #[test]
    fn test_compound_operators() {
        assert_eq!(
            kinds("a &^= b << 2"),
            vec![
                Tok::Ident,
                Tok::AmpCaretEq,
                Tok::Ident,
                Tok::Shl,
                Tok::Int,
                Tok::Semi
            ]
        );
    }
}
