//! A minimal line-oriented token parser for the onion service descriptor
//! text format: whitespace-separated keyword lines, each optionally
//! followed by a PEM-armored object.

use crate::err::ParseError;

/// A PEM-armored object attached to an [`Item`].
#[derive(Clone, Debug)]
pub(crate) struct Object {
    /// The label between `-----BEGIN `/`-----END ` and `-----`.
    pub(crate) tag: String,
    /// The decoded binary contents.
    pub(crate) data: Vec<u8>,
}

/// A single `keyword arg1 arg2 ... [object]` line of a descriptor.
#[derive(Clone, Debug)]
pub(crate) struct Item {
    /// The first whitespace-separated token on the line.
    pub(crate) keyword: String,
    /// Every token after the keyword.
    pub(crate) args: Vec<String>,
    /// The PEM object immediately following this line, if any.
    pub(crate) object: Option<Object>,
}

impl Item {
    /// Return the `n`th argument, or a [`ParseError::BadArguments`] if it's
    /// missing.
    pub(crate) fn arg(&self, n: usize, kw: &'static str) -> Result<&str, ParseError> {
        self.args
            .get(n)
            .map(String::as_str)
            .ok_or(ParseError::BadArguments(kw))
    }

    /// Return this item's object, or a [`ParseError::MissingToken`] if it's
    /// absent.
    pub(crate) fn require_object(&self, kw: &'static str) -> Result<&Object, ParseError> {
        self.object.as_ref().ok_or(ParseError::MissingToken(kw))
    }
}

/// Join `\\`-continued physical lines into logical lines.
fn join_continuations(text: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut pending = String::new();
    for line in text.lines() {
        if let Some(stripped) = line.strip_suffix('\\') {
            pending.push_str(stripped);
        } else {
            pending.push_str(line);
            out.push(std::mem::take(&mut pending));
        }
    }
    if !pending.is_empty() {
        out.push(pending);
    }
    out
}

/// Split a logical line into whitespace-separated tokens, honoring `#`
/// comments and quoted strings with backslash escapes.
fn tokenize(line: &str) -> Result<Vec<String>, ParseError> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        match chars.peek() {
            None => break,
            Some('#') => break,
            Some('"') => {
                chars.next();
                let mut s = String::new();
                loop {
                    match chars.next() {
                        None => return Err(ParseError::BadArguments("quoted string")),
                        Some('"') => break,
                        Some('\\') => s.push(unescape(&mut chars)?),
                        Some(c) => s.push(c),
                    }
                }
                tokens.push(s);
            }
            Some(_) => {
                let mut s = String::new();
                while matches!(chars.peek(), Some(c) if !c.is_whitespace() && *c != '#') {
                    s.push(chars.next().expect("peeked"));
                }
                tokens.push(s);
            }
        }
    }
    Ok(tokens)
}

/// Decode a single backslash escape from `chars`, which has already consumed
/// the leading backslash.
fn unescape(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Result<char, ParseError> {
    match chars.next() {
        Some('n') => Ok('\n'),
        Some('r') => Ok('\r'),
        Some('t') => Ok('\t'),
        Some('"') => Ok('"'),
        Some('\\') => Ok('\\'),
        Some('\'') => Ok('\''),
        Some('x') | Some('X') => {
            let mut v = 0u32;
            for _ in 0..2 {
                let d = chars
                    .next()
                    .and_then(|c| c.to_digit(16))
                    .ok_or(ParseError::BadArguments("hex escape"))?;
                v = v * 16 + d;
            }
            char::from_u32(v).ok_or(ParseError::BadArguments("hex escape"))
        }
        Some(c @ '0'..='7') => {
            let mut v = c.to_digit(8).expect("checked above");
            for _ in 0..2 {
                if let Some(d) = chars.peek().and_then(|c| c.to_digit(8)) {
                    v = v * 8 + d;
                    chars.next();
                } else {
                    break;
                }
            }
            char::from_u32(v).ok_or(ParseError::BadArguments("octal escape"))
        }
        _ => Err(ParseError::BadArguments("escape sequence")),
    }
}

/// Parse a whole document into a sequence of [`Item`]s.
pub(crate) fn parse_items(text: &str) -> Result<Vec<Item>, ParseError> {
    let lines = join_continuations(text);
    let mut items = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let line = lines[i].trim_end();
        i += 1;
        if line.trim().is_empty() || line.trim_start().starts_with('#') {
            continue;
        }
        let tokens = tokenize(line)?;
        if tokens.is_empty() {
            continue;
        }
        let keyword = tokens[0].clone();
        let args = tokens[1..].to_vec();

        let object = if i < lines.len() && lines[i].trim_start().starts_with("-----BEGIN ") {
            let begin = lines[i].trim();
            let tag = begin
                .strip_prefix("-----BEGIN ")
                .and_then(|s| s.strip_suffix("-----"))
                .ok_or_else(|| ParseError::BadObject("malformed BEGIN line".into()))?
                .to_string();
            let mut block = String::new();
            block.push_str(begin);
            block.push('\n');
            i += 1;
            let end_marker = format!("-----END {}-----", tag);
            loop {
                if i >= lines.len() {
                    return Err(ParseError::BadObject(format!(
                        "unterminated object {:?}",
                        tag
                    )));
                }
                let l = lines[i].trim();
                block.push_str(l);
                block.push('\n');
                i += 1;
                if l == end_marker {
                    break;
                }
            }
            let pem = pem::parse(block.as_bytes())
                .map_err(|e| ParseError::BadObject(e.to_string()))?;
            Some(Object {
                tag,
                data: pem.into_contents(),
            })
        } else {
            None
        };

        items.push(Item {
            keyword,
            args,
            object,
        });
    }
    Ok(items)
}

/// Render a single `-----BEGIN tag-----\n<base64>\n-----END tag-----\n` block.
pub(crate) fn encode_object(tag: &str, data: &[u8]) -> String {
    let pem = pem::Pem::new(tag, data);
    pem::encode(&pem)
}

#[cfg(test)]
mod test {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[test]
    fn simple_items() {
        let text = "hs-descriptor 3\ndescriptor-lifetime 180 # minutes\nrevision-counter 42\n";
        let items = parse_items(text).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0].keyword, "hs-descriptor");
        assert_eq!(items[0].args, vec!["3"]);
        assert_eq!(items[1].args, vec!["180"]);
        assert!(items[1].object.is_none());
    }

    #[test]
    fn object_round_trips() {
        let data = b"hello world";
        let block = encode_object("MESSAGE", data);
        let text = format!("superencrypted\n{}", block);
        let items = parse_items(&text).unwrap();
        assert_eq!(items.len(), 1);
        let obj = items[0].object.as_ref().unwrap();
        assert_eq!(obj.tag, "MESSAGE");
        assert_eq!(obj.data, data);
    }

    #[test]
    fn continuation_and_comment() {
        let text = "enc-key ntor \\\nAAAA # a pubkey\n";
        let items = parse_items(text).unwrap();
        assert_eq!(items[0].args, vec!["ntor", "AAAA"]);
    }
}
