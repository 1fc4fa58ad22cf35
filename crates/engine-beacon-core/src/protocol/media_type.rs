//! `Content-Type` parsing (RFC 2045 media type with parameters).
//!
//! Type, subtype and parameter names are lowercased. Parameter values may be
//! tokens or quoted strings; duplicate parameter names are rejected.

use std::collections::BTreeMap;

use crate::error::{DecodeError, Result};

/// Parsed media type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaType {
    /// `type/subtype`, lowercased.
    pub essence: String,
    /// Parameters with lowercased names.
    pub params: BTreeMap<String, String>,
}

impl MediaType {
    /// Parse a `Content-Type` header value.
    pub fn parse(header: &str) -> Result<Self> {
        let (head, rest) = match header.split_once(';') {
            Some((h, r)) => (h, Some(r)),
            None => (header, None),
        };

        let essence = head.trim().to_ascii_lowercase();
        check_essence(&essence)?;

        let mut params = BTreeMap::new();
        if let Some(rest) = rest {
            let mut cur = Cursor::new(rest);
            loop {
                cur.skip_ws();
                if cur.is_empty() {
                    break;
                }
                if cur.eat(';') {
                    continue;
                }

                let key = cur.token().to_ascii_lowercase();
                if key.is_empty() {
                    return Err(bad(header, "missing parameter name"));
                }
                cur.skip_ws();
                if !cur.eat('=') {
                    return Err(bad(header, "missing '=' after parameter name"));
                }
                cur.skip_ws();
                let value = if cur.peek() == Some('"') {
                    cur.quoted().ok_or_else(|| bad(header, "unterminated quoted string"))?
                } else {
                    let v = cur.token();
                    if v.is_empty() {
                        return Err(bad(header, "missing parameter value"));
                    }
                    v.to_string()
                };

                if params.insert(key.clone(), value).is_some() {
                    return Err(bad(header, &format!("duplicate parameter {key}")));
                }

                cur.skip_ws();
                if !cur.is_empty() && !cur.eat(';') {
                    return Err(bad(header, "unexpected characters after parameter"));
                }
            }
        }

        Ok(Self { essence, params })
    }

    /// Parameter value by (lowercase) name.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }
}

fn bad(header: &str, why: &str) -> DecodeError {
    DecodeError::BadMediaType(format!("{why} in {header:?}"))
}

fn check_essence(essence: &str) -> Result<()> {
    if essence.is_empty() {
        return Err(DecodeError::BadMediaType("no media type".into()));
    }
    let (ty, sub) = match essence.split_once('/') {
        Some((t, s)) => (t, Some(s)),
        None => (essence, None),
    };
    if !is_token(ty) {
        return Err(DecodeError::BadMediaType(format!(
            "expected token for type in {essence:?}"
        )));
    }
    if let Some(sub) = sub {
        if !is_token(sub) {
            return Err(DecodeError::BadMediaType(format!(
                "expected token for subtype in {essence:?}"
            )));
        }
    }
    Ok(())
}

fn is_tspecial(c: char) -> bool {
    matches!(
        c,
        '(' | ')' | '<' | '>' | '@' | ',' | ';' | ':' | '\\' | '"' | '/' | '[' | ']' | '?' | '='
    )
}

fn is_token_char(c: char) -> bool {
    c.is_ascii() && !c.is_ascii_control() && c != ' ' && !is_tspecial(c)
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

struct Cursor<'a> {
    rest: &'a str,
}

impl<'a> Cursor<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }

    fn is_empty(&self) -> bool {
        self.rest.is_empty()
    }

    fn peek(&self) -> Option<char> {
        self.rest.chars().next()
    }

    fn eat(&mut self, c: char) -> bool {
        match self.rest.strip_prefix(c) {
            Some(r) => {
                self.rest = r;
                true
            }
            None => false,
        }
    }

    fn skip_ws(&mut self) {
        self.rest = self.rest.trim_start_matches([' ', '\t']);
    }

    fn token(&mut self) -> &'a str {
        let end = self
            .rest
            .find(|c: char| !is_token_char(c))
            .unwrap_or(self.rest.len());
        let (tok, rest) = self.rest.split_at(end);
        self.rest = rest;
        tok
    }

    /// Consume a quoted string (leading quote included), unescaping `\x`.
    fn quoted(&mut self) -> Option<String> {
        let mut chars = self.rest.char_indices();
        chars.next(); // opening quote
        let mut out = String::new();
        let mut escaped = false;
        for (i, c) in chars {
            if escaped {
                out.push(c);
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '"' => {
                    self.rest = &self.rest[i + c.len_utf8()..];
                    return Some(out);
                }
                _ => out.push(c),
            }
        }
        None
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn parses_delimited_protobuf_header() {
        let mt = MediaType::parse(
            "application/vnd.google.protobuf; proto=io.prometheus.client.MetricFamily; encoding=delimited",
        )
        .unwrap();
        assert_eq!(mt.essence, "application/vnd.google.protobuf");
        assert_eq!(mt.param("proto"), Some("io.prometheus.client.MetricFamily"));
        assert_eq!(mt.param("encoding"), Some("delimited"));
    }

    #[test]
    fn lowercases_type_and_param_names() {
        let mt = MediaType::parse("Text/Plain; Version=0.0.4; CHARSET=utf-8").unwrap();
        assert_eq!(mt.essence, "text/plain");
        assert_eq!(mt.param("version"), Some("0.0.4"));
        assert_eq!(mt.param("charset"), Some("utf-8"));
    }

    #[test]
    fn quoted_values_and_trailing_semicolon() {
        let mt = MediaType::parse(r#"text/plain; note="a \"b\"; c";"#).unwrap();
        assert_eq!(mt.param("note"), Some(r#"a "b"; c"#));
    }

    #[test]
    fn rejects_malformed_headers() {
        for bad in [
            "",
            "   ",
            "text/",
            "/plain",
            "text/plain; =x",
            "text/plain; a",
            "text/plain; a=",
            "text/plain; a=\"open",
            "text/plain; a=1; a=2",
            "text/pl ain",
        ] {
            let err = MediaType::parse(bad).expect_err(bad);
            assert_eq!(err.code().as_str(), "BAD_MEDIA_TYPE", "header={bad:?}");
        }
    }

    #[test]
    fn bare_type_is_accepted() {
        let mt = MediaType::parse("text").unwrap();
        assert_eq!(mt.essence, "text");
        assert!(mt.params.is_empty());
    }
}
