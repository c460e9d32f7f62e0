//! Tokens and the tokenizer.
//!
//! The whole source is tokenized up front; the parser then walks a
//! `Vec<Token>` with a cursor and a saved-position stack instead of chasing
//! linked-list pointers. Element 0 is the `Start` sentinel and the final
//! element is the single `Eof`.

use crate::diag;
use crate::unicode;

/// The closed set of token kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Plus,
    Minus,
    Asterisk,
    Slash,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Assign,
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    Amp,
    Comma,
    Semicolon,
    Num,
    Str,
    Ident,
    KwInt,
    KwChar,
    KwReturn,
    KwIf,
    KwElse,
    KwFor,
    KwWhile,
    KwDo,
    KwSizeof,
    Start,
    Eof,
}

impl TokenKind {
    /// Short human-readable name used in "unexpected token" diagnostics.
    pub fn describe(self) -> &'static str {
        match self {
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Asterisk => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::Assign => "'='",
            TokenKind::Eq => "'=='",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::Amp => "'&'",
            TokenKind::Comma => "','",
            TokenKind::Semicolon => "';'",
            TokenKind::Num => "a number",
            TokenKind::Str => "a string literal",
            TokenKind::Ident => "an identifier",
            TokenKind::KwInt => "'int'",
            TokenKind::KwChar => "'char'",
            TokenKind::KwReturn => "'return'",
            TokenKind::KwIf => "'if'",
            TokenKind::KwElse => "'else'",
            TokenKind::KwFor => "'for'",
            TokenKind::KwWhile => "'while'",
            TokenKind::KwDo => "'do'",
            TokenKind::KwSizeof => "'sizeof'",
            TokenKind::Start => "start of input",
            TokenKind::Eof => "end of input",
        }
    }
}

/// One lexical unit with its source position.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// The exact source text of the token (string literals: without quotes).
    pub lexeme: String,
    /// Numeric value for `Num` tokens, 0 otherwise.
    pub val: i64,
    /// Byte offset of the token's first character in the source.
    pub offset: usize,
}

impl Token {
    fn new(kind: TokenKind, lexeme: impl Into<String>, val: i64, offset: usize) -> Self {
        Token {
            kind,
            lexeme: lexeme.into(),
            val,
            offset,
        }
    }
}

/// Fail with a framed diagnostic unless `token` is one of `kinds`.
pub fn expect(source: &str, token: &Token, kinds: &[TokenKind]) -> Result<(), String> {
    if kinds.contains(&token.kind) {
        return Ok(());
    }
    let wanted = kinds
        .iter()
        .map(|k| k.describe())
        .collect::<Vec<_>>()
        .join(" or ");
    Err(diag::render(
        source,
        token.offset,
        &format!("expected {}, got {}", wanted, token.kind.describe()),
    ))
}

/// Turns source text into the token stream.
pub struct Tokenizer<'src> {
    source: &'src str,
    chars: Vec<(usize, char)>,
    idx: usize,
}

impl<'src> Tokenizer<'src> {
    pub fn new(source: &'src str) -> Self {
        Tokenizer {
            source,
            chars: source.char_indices().collect(),
            idx: 0,
        }
    }

    /// Tokenize the whole source. The result starts with `Start` and ends
    /// with exactly one `Eof`; any lexical error aborts with a framed
    /// diagnostic.
    pub fn tokenize(mut self) -> Result<Vec<Token>, String> {
        let mut tokens = vec![Token::new(TokenKind::Start, "", 0, 0)];

        loop {
            self.skip_whitespace_and_comments()?;
            let offset = self.offset();
            let Some(c) = self.cur() else {
                tokens.push(Token::new(TokenKind::Eof, "", 0, offset));
                return Ok(tokens);
            };

            let token = match c {
                '+' => self.punct(TokenKind::Plus, "+"),
                '-' => self.punct(TokenKind::Minus, "-"),
                '*' => self.punct(TokenKind::Asterisk, "*"),
                '/' => self.punct(TokenKind::Slash, "/"),
                '(' => self.punct(TokenKind::LParen, "("),
                ')' => self.punct(TokenKind::RParen, ")"),
                '{' => self.punct(TokenKind::LBrace, "{"),
                '}' => self.punct(TokenKind::RBrace, "}"),
                '[' => self.punct(TokenKind::LBracket, "["),
                ']' => self.punct(TokenKind::RBracket, "]"),
                '&' => self.punct(TokenKind::Amp, "&"),
                ',' => self.punct(TokenKind::Comma, ","),
                ';' => self.punct(TokenKind::Semicolon, ";"),
                '=' => {
                    self.bump();
                    if self.cur() == Some('=') {
                        self.bump();
                        Token::new(TokenKind::Eq, "==", 0, offset)
                    } else {
                        Token::new(TokenKind::Assign, "=", 0, offset)
                    }
                }
                '!' => {
                    self.bump();
                    if self.cur() == Some('=') {
                        self.bump();
                        Token::new(TokenKind::NotEq, "!=", 0, offset)
                    } else {
                        return Err(self.error(offset, "Unexpected char: !"));
                    }
                }
                '<' => {
                    self.bump();
                    if self.cur() == Some('=') {
                        self.bump();
                        Token::new(TokenKind::Le, "<=", 0, offset)
                    } else {
                        Token::new(TokenKind::Lt, "<", 0, offset)
                    }
                }
                '>' => {
                    self.bump();
                    if self.cur() == Some('=') {
                        self.bump();
                        Token::new(TokenKind::Ge, ">=", 0, offset)
                    } else {
                        Token::new(TokenKind::Gt, ">", 0, offset)
                    }
                }
                '"' => self.string(offset)?,
                c if c.is_ascii_digit() => self.number(offset)?,
                c if unicode::is_ident_start(c) => self.ident_or_keyword(offset),
                c => {
                    return Err(self.error(offset, &format!("Unexpected char: {}", c)));
                }
            };
            tokens.push(token);
        }
    }

    fn punct(&mut self, kind: TokenKind, lexeme: &'static str) -> Token {
        let offset = self.offset();
        self.bump();
        Token::new(kind, lexeme, 0, offset)
    }

    fn string(&mut self, offset: usize) -> Result<Token, String> {
        self.bump(); // opening quote
        let start = self.offset();
        loop {
            match self.cur() {
                Some('"') => break,
                Some(_) => self.bump(),
                None => return Err(self.error(offset, "Unterminated string literal")),
            }
        }
        let value = &self.source[start..self.offset()];
        self.bump(); // closing quote
        Ok(Token::new(TokenKind::Str, value, 0, offset))
    }

    fn number(&mut self, offset: usize) -> Result<Token, String> {
        while self.cur().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        let lexeme = &self.source[offset..self.offset()];
        let val: i64 = lexeme
            .parse()
            .map_err(|_| self.error(offset, "Number literal out of range"))?;
        Ok(Token::new(TokenKind::Num, lexeme, val, offset))
    }

    fn ident_or_keyword(&mut self, offset: usize) -> Token {
        self.bump();
        while self.cur().is_some_and(unicode::is_ident_continue) {
            self.bump();
        }
        let lexeme = &self.source[offset..self.offset()];
        // A keyword only counts when the identifier scan stopped exactly at
        // its end, so `returna` stays an identifier.
        let kind = match lexeme {
            "int" => TokenKind::KwInt,
            "char" => TokenKind::KwChar,
            "return" => TokenKind::KwReturn,
            "if" => TokenKind::KwIf,
            "else" => TokenKind::KwElse,
            "for" => TokenKind::KwFor,
            "while" => TokenKind::KwWhile,
            "do" => TokenKind::KwDo,
            "sizeof" => TokenKind::KwSizeof,
            _ => TokenKind::Ident,
        };
        Token::new(kind, lexeme, 0, offset)
    }

    fn skip_whitespace_and_comments(&mut self) -> Result<(), String> {
        loop {
            match self.cur() {
                Some(' ') | Some('\t') | Some('\r') | Some('\n') => self.bump(),
                Some('/') if self.peek() == Some('/') => {
                    while self.cur().is_some_and(|c| c != '\n') {
                        self.bump();
                    }
                }
                Some('/') if self.peek() == Some('*') => {
                    let start = self.offset();
                    self.bump();
                    self.bump();
                    loop {
                        match self.cur() {
                            Some('*') if self.peek() == Some('/') => {
                                self.bump();
                                self.bump();
                                break;
                            }
                            Some(_) => self.bump(),
                            None => {
                                return Err(self.error(start, "Unterminated block comment"));
                            }
                        }
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn cur(&self) -> Option<char> {
        self.chars.get(self.idx).map(|&(_, c)| c)
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.idx + 1).map(|&(_, c)| c)
    }

    fn bump(&mut self) {
        self.idx += 1;
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.idx)
            .map_or(self.source.len(), |&(pos, _)| pos)
    }

    fn error(&self, offset: usize, msg: &str) -> String {
        diag::render(self.source, offset, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        Tokenizer::new(input).tokenize().unwrap()
    }

    fn kinds(tokens: &[Token]) -> Vec<TokenKind> {
        tokens.iter().map(|t| t.kind).collect()
    }

    #[test]
    fn test_punctuation_and_numbers() {
        let tokens = tokenize("()10+-333333 *400/)==!=<><=>=a100=z;");
        let want = [
            (TokenKind::Start, "", 0, 0),
            (TokenKind::LParen, "(", 0, 0),
            (TokenKind::RParen, ")", 0, 1),
            (TokenKind::Num, "10", 10, 2),
            (TokenKind::Plus, "+", 0, 4),
            (TokenKind::Minus, "-", 0, 5),
            (TokenKind::Num, "333333", 333333, 6),
            (TokenKind::Asterisk, "*", 0, 13),
            (TokenKind::Num, "400", 400, 14),
            (TokenKind::Slash, "/", 0, 17),
            (TokenKind::RParen, ")", 0, 18),
            (TokenKind::Eq, "==", 0, 19),
            (TokenKind::NotEq, "!=", 0, 21),
            (TokenKind::Lt, "<", 0, 23),
            (TokenKind::Gt, ">", 0, 24),
            (TokenKind::Le, "<=", 0, 25),
            (TokenKind::Ge, ">=", 0, 27),
            (TokenKind::Ident, "a100", 0, 29),
            (TokenKind::Assign, "=", 0, 33),
            (TokenKind::Ident, "z", 0, 34),
            (TokenKind::Semicolon, ";", 0, 35),
            (TokenKind::Eof, "", 0, 36),
        ];
        assert_eq!(tokens.len(), want.len());
        for (token, (kind, lexeme, val, offset)) in tokens.iter().zip(want) {
            assert_eq!(token.kind, kind, "kind of {:?}", token);
            assert_eq!(token.lexeme, lexeme);
            assert_eq!(token.val, val);
            assert_eq!(token.offset, offset);
        }
    }

    #[test]
    fn test_stream_ends_with_single_eof() {
        for src in ["", "   ", "1 + 2", "int main() { return 0; }"] {
            let tokens = tokenize(src);
            assert_eq!(tokens[0].kind, TokenKind::Start);
            assert_eq!(tokens.last().unwrap().kind, TokenKind::Eof);
            let eofs = tokens.iter().filter(|t| t.kind == TokenKind::Eof).count();
            assert_eq!(eofs, 1);
        }
    }

    #[test]
    fn test_adjacent_tokens_are_not_merged() {
        // `==` must never come out as two `=`.
        let tokens = tokenize("a==b=c");
        assert_eq!(
            kinds(&tokens[1..]),
            vec![
                TokenKind::Ident,
                TokenKind::Eq,
                TokenKind::Ident,
                TokenKind::Assign,
                TokenKind::Ident,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keyword_needs_boundary() {
        let tokens = tokenize("returna return* sizeofx do");
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[1].lexeme, "returna");
        assert_eq!(tokens[2].kind, TokenKind::KwReturn);
        assert_eq!(tokens[3].kind, TokenKind::Asterisk);
        assert_eq!(tokens[4].kind, TokenKind::Ident);
        assert_eq!(tokens[4].lexeme, "sizeofx");
        assert_eq!(tokens[5].kind, TokenKind::KwDo);
    }

    #[test]
    fn test_all_keywords() {
        let tokens = tokenize("int char return if else for while do sizeof");
        assert_eq!(
            kinds(&tokens[1..tokens.len() - 1]),
            vec![
                TokenKind::KwInt,
                TokenKind::KwChar,
                TokenKind::KwReturn,
                TokenKind::KwIf,
                TokenKind::KwElse,
                TokenKind::KwFor,
                TokenKind::KwWhile,
                TokenKind::KwDo,
                TokenKind::KwSizeof,
            ]
        );
    }

    #[test]
    fn test_unicode_identifier_tails() {
        let tokens = tokenize("a\u{3042}\u{30AB}\u{6F22} x\u{1F37A} _z1");
        assert_eq!(tokens[1].kind, TokenKind::Ident);
        assert_eq!(tokens[1].lexeme, "a\u{3042}\u{30AB}\u{6F22}");
        assert_eq!(tokens[2].kind, TokenKind::Ident);
        assert_eq!(tokens[2].lexeme, "x\u{1F37A}");
        assert_eq!(tokens[3].kind, TokenKind::Ident);
        assert_eq!(tokens[3].lexeme, "_z1");
    }

    #[test]
    fn test_string_literal_bytes_kept_verbatim() {
        let tokens = tokenize("\"hello\\n\"");
        assert_eq!(tokens[1].kind, TokenKind::Str);
        // No escape processing: backslash and 'n' stay two characters.
        assert_eq!(tokens[1].lexeme, "hello\\n");
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens = tokenize("1 // comment to end of line\n+ /* block\nspanning lines */ 2");
        assert_eq!(
            kinds(&tokens[1..]),
            vec![
                TokenKind::Num,
                TokenKind::Plus,
                TokenKind::Num,
                TokenKind::Eof
            ]
        );
    }

    #[test]
    fn test_lexical_errors() {
        for (src, msg) in [
            ("int a = @;", "Unexpected char: @"),
            ("a ! b", "Unexpected char: !"),
            ("\"hello", "Unterminated string literal"),
            ("1 /* no end", "Unterminated block comment"),
        ] {
            let err = Tokenizer::new(src).tokenize().unwrap_err();
            assert!(err.contains(msg), "{:?} should contain {:?}", err, msg);
            // Framed as line, caret, message.
            assert_eq!(err.lines().count(), 3, "{:?}", err);
        }
    }

    #[test]
    fn test_expect_reports_wanted_kinds() {
        let src = "int a";
        let tokens = tokenize(src);
        assert!(expect(src, &tokens[1], &[TokenKind::KwInt, TokenKind::KwChar]).is_ok());
        let err = expect(src, &tokens[2], &[TokenKind::Num]).unwrap_err();
        assert!(err.contains("expected a number, got an identifier"));
    }
}
