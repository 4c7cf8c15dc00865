//! Tokenizer for sandboxed scripts.

use std::iter::Peekable;
use std::rc::Rc;
use std::str::Chars;

use super::error::ScriptError;

#[derive(Debug, Clone, PartialEq)]
pub enum Tok {
    Num(f64),
    Str(Rc<str>),
    /// Identifiers and keywords.
    Ident(String),
    Punct(&'static str),
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub tok: Tok,
    pub line: u32,
}

/// Operators, longest first so greedy matching works.
const PUNCTS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=", "/=",
    "%=", "{", "}", "(", ")", "[", "]", ";", ",", ".", ":", "?", "+", "-", "*", "/", "%",
    "<", ">", "=", "!",
];

/// Split `source` into tokens, ending with `Tok::Eof`.
pub fn tokenize(source: &str) -> Result<Vec<Token>, ScriptError> {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        rest: source,
        line: 1,
    };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.tok == Tok::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    chars: Peekable<Chars<'a>>,
    /// Unconsumed input, kept in sync with `chars` for punctuation lookahead.
    rest: &'a str,
    line: u32,
}

impl Lexer<'_> {
    fn bump(&mut self) -> Option<char> {
        let ch = self.chars.next()?;
        self.rest = &self.rest[ch.len_utf8()..];
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    fn skip_trivia(&mut self) -> Result<(), ScriptError> {
        loop {
            if self.rest.starts_with("//") {
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else if self.rest.starts_with("/*") {
                let start = self.line;
                self.bump();
                self.bump();
                loop {
                    if self.rest.starts_with("*/") {
                        self.bump();
                        self.bump();
                        break;
                    }
                    if self.bump().is_none() {
                        return Err(ScriptError::syntax(start, "Unterminated comment"));
                    }
                }
            } else if self.chars.peek().is_some_and(|c| c.is_whitespace()) {
                self.bump();
            } else {
                return Ok(());
            }
        }
    }

    fn next_token(&mut self) -> Result<Token, ScriptError> {
        self.skip_trivia()?;
        let line = self.line;
        let Some(&ch) = self.chars.peek() else {
            return Ok(Token {
                tok: Tok::Eof,
                line,
            });
        };

        let tok = if ch.is_ascii_digit()
            || (ch == '.' && self.rest[1..].starts_with(|c: char| c.is_ascii_digit()))
        {
            self.number(line)?
        } else if ch == '"' || ch == '\'' {
            self.string(ch, line)?
        } else if ch.is_alphabetic() || ch == '_' || ch == '$' {
            let mut ident = String::new();
            while let Some(&c) = self.chars.peek() {
                if c.is_alphanumeric() || c == '_' || c == '$' {
                    ident.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            Tok::Ident(ident)
        } else if let Some(p) = PUNCTS.iter().find(|p| self.rest.starts_with(**p)) {
            for _ in 0..p.len() {
                self.bump();
            }
            Tok::Punct(p)
        } else {
            return Err(ScriptError::syntax(
                line,
                format!("Invalid or unexpected token '{ch}'"),
            ));
        };
        Ok(Token { tok, line })
    }

    fn number(&mut self, line: u32) -> Result<Tok, ScriptError> {
        if self.rest.starts_with("0x") || self.rest.starts_with("0X") {
            self.bump();
            self.bump();
            let mut digits = String::new();
            while let Some(&c) = self.chars.peek() {
                if c.is_ascii_hexdigit() {
                    digits.push(c);
                    self.bump();
                } else {
                    break;
                }
            }
            return u64::from_str_radix(&digits, 16)
                .map(|n| Tok::Num(n as f64))
                .map_err(|_| ScriptError::syntax(line, "Invalid hexadecimal literal"));
        }

        let mut text = String::new();
        let mut seen_dot = false;
        let mut seen_exp = false;
        while let Some(&c) = self.chars.peek() {
            if c.is_ascii_digit() {
                text.push(c);
            } else if c == '.' && !seen_dot && !seen_exp {
                seen_dot = true;
                text.push(c);
            } else if (c == 'e' || c == 'E') && !seen_exp {
                seen_exp = true;
                text.push(c);
                self.bump();
                if let Some(&sign) = self.chars.peek()
                    && (sign == '+' || sign == '-')
                {
                    text.push(sign);
                    self.bump();
                }
                continue;
            } else {
                break;
            }
            self.bump();
        }
        if self
            .chars
            .peek()
            .is_some_and(|c| c.is_alphabetic() || *c == '_')
        {
            return Err(ScriptError::syntax(line, "Invalid or unexpected token"));
        }
        text.parse::<f64>()
            .map(Tok::Num)
            .map_err(|_| ScriptError::syntax(line, format!("Invalid number literal {text}")))
    }

    fn string(&mut self, quote: char, line: u32) -> Result<Tok, ScriptError> {
        self.bump();
        let mut out = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(ScriptError::syntax(line, "Unterminated string literal"));
            };
            match c {
                c if c == quote => break,
                '\n' => return Err(ScriptError::syntax(line, "Unterminated string literal")),
                '\\' => {
                    let Some(esc) = self.bump() else {
                        return Err(ScriptError::syntax(line, "Unterminated string literal"));
                    };
                    match esc {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        '0' => out.push('\0'),
                        'b' => out.push('\u{8}'),
                        'f' => out.push('\u{c}'),
                        'v' => out.push('\u{b}'),
                        'u' => out.push(self.unicode_escape(line)?),
                        // Line continuation.
                        '\n' => {},
                        // Everything else, including `\/`, is the character itself.
                        other => out.push(other),
                    }
                },
                c => out.push(c),
            }
        }
        Ok(Tok::Str(out.into()))
    }

    fn unicode_escape(&mut self, line: u32) -> Result<char, ScriptError> {
        let mut hex = String::with_capacity(4);
        for _ in 0..4 {
            match self.bump() {
                Some(c) if c.is_ascii_hexdigit() => hex.push(c),
                _ => return Err(ScriptError::syntax(line, "Invalid Unicode escape sequence")),
            }
        }
        let code = u32::from_str_radix(&hex, 16)
            .map_err(|_| ScriptError::syntax(line, "Invalid Unicode escape sequence"))?;
        Ok(char::from_u32(code).unwrap_or('\u{FFFD}'))
    }
}
