//! Parameter blocks embedded in PrimeFaces `onclick` handlers, e.g.
//! `PrimeFaces.addSubmitParam('form',{'form:sidebar':'form:sidebar','form:sidebar_menuid':'6_0_3'}).submit('form')`.

use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    /// Quoted string, escapes resolved.
    Str(String),
    /// Bare word such as an unquoted object key.
    Word(String),
    Colon,
    Comma,
    Other,
}

struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
}

impl<'a> Tokenizer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            chars: input.chars().peekable(),
        }
    }

    fn quoted(&mut self, quote: char) -> Option<String> {
        let mut value = String::new();
        while let Some(c) = self.chars.next() {
            match c {
                '\\' => value.push(self.chars.next()?),
                c if c == quote => return Some(value),
                c => value.push(c),
            }
        }
        // Unterminated string.
        None
    }

    fn word(&mut self, first: char) -> String {
        let mut value = String::from(first);
        while let Some(&c) = self.chars.peek() {
            if c.is_alphanumeric() || matches!(c, '_' | '.' | '$' | '-') {
                value.push(c);
                self.chars.next();
            } else {
                break;
            }
        }
        value
    }
}

impl Iterator for Tokenizer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        loop {
            let c = self.chars.next()?;
            return match c {
                c if c.is_whitespace() => continue,
                '\'' | '"' => self.quoted(c).map(Token::Str),
                ':' => Some(Token::Colon),
                ',' => Some(Token::Comma),
                c if c.is_alphanumeric() || c == '_' || c == '$' => Some(Token::Word(self.word(c))),
                _ => Some(Token::Other),
            };
        }
    }
}

/// The `{…}` argument block of the handler, braces excluded. Skips past
/// `addSubmitParam` when present so a leading form-id argument is ignored.
fn object_block(handler: &str) -> Option<&str> {
    let from = handler.find("addSubmitParam").unwrap_or(0);
    let rest = &handler[from..];
    let open = rest.find('{')?;

    let mut quote: Option<char> = None;
    let mut escaped = false;
    let mut depth = 1;
    for (i, c) in rest[open + 1..].char_indices() {
        match (quote, c) {
            (Some(_), _) if escaped => escaped = false,
            (Some(_), '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '\'' | '"') => quote = Some(c),
            (None, '{') => depth += 1,
            (None, '}') => {
                depth -= 1;
                if depth == 0 {
                    return Some(&rest[open + 1..open + 1 + i]);
                }
            }
            (None, _) => {}
        }
    }
    None
}

/// Parse the handler's parameter object into ordered key/value pairs.
/// Malformed input yields whatever pairs were complete before the damage.
pub fn parse_params(handler: &str) -> Vec<(String, String)> {
    let Some(block) = object_block(handler) else {
        return Vec::new();
    };

    let tokens: Vec<Token> = Tokenizer::new(block).collect();
    let mut params = Vec::new();
    let mut i = 0;
    while i < tokens.len() {
        match (&tokens[i], tokens.get(i + 1), tokens.get(i + 2)) {
            (
                Token::Str(key) | Token::Word(key),
                Some(Token::Colon),
                Some(Token::Str(value) | Token::Word(value)),
            ) => {
                params.push((key.clone(), value.clone()));
                i += 3;
                if matches!(tokens.get(i), Some(Token::Comma)) {
                    i += 1;
                }
            }
            _ => i += 1,
        }
    }
    params
}

/// Value of `key` in the handler's parameter object.
pub fn param(handler: &str, key: &str) -> Option<String> {
    parse_params(handler)
        .into_iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v)
}
