//! # Attribute String Parser
//!
//! Turns what the user typed into an attribute editor (`a="1" b='2' c`)
//! into name/value pairs, the way an HTML tokenizer would read the same
//! text inside `<div …>`.
//!
//! The parser never fails. Malformed input degrades to the attributes
//! that could be recovered:
//! - an unterminated quoted value is retried with `"` and then `'`
//!   appended (`class="a` parses as `class="a"`)
//! - names the target document rejects are dropped, the rest are kept
//! - duplicate names keep their first occurrence
//!
//! Attributes come back in the order they were typed.

use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedAttribute {
    pub name: String,
    pub value: String,
}

impl ParsedAttribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Parse `input` into attributes accepted by `is_valid_name`
pub fn parse_attribute_values(
    input: &str,
    is_valid_name: impl Fn(&str) -> bool,
) -> Vec<ParsedAttribute> {
    let input = input.trim();

    let parsed = tokenize(input)
        .or_else(|| tokenize(&format!("{input}\"")))
        .or_else(|| tokenize(&format!("{input}'")));

    let Some(parsed) = parsed else {
        debug!(input, "Attribute string could not be recovered");
        return Vec::new();
    };

    parsed
        .into_iter()
        .filter(|attr| {
            let ok = is_valid_name(&attr.name);
            if !ok {
                debug!(name = %attr.name, "Dropping attribute with invalid name");
            }
            ok
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    BeforeName,
    Name,
    AfterName,
    BeforeValue,
    DoubleQuoted,
    SingleQuoted,
    Unquoted,
    AfterQuoted,
    SelfClosing,
}

#[derive(Default)]
struct Attributes {
    done: Vec<ParsedAttribute>,
    name: String,
    value: String,
    open: bool,
}

impl Attributes {
    fn start(&mut self) {
        self.finish();
        self.open = true;
    }

    fn finish(&mut self) {
        if !self.open {
            return;
        }
        self.open = false;
        let name = std::mem::take(&mut self.name);
        let value = decode_entities(&std::mem::take(&mut self.value));
        if !self.done.iter().any(|a| a.name == name) {
            self.done.push(ParsedAttribute { name, value });
        }
    }
}

/// Tokenize the attribute section of `<div {input}>`. Returns `None` when
/// the closing `>` is swallowed by an unterminated value.
fn tokenize(input: &str) -> Option<Vec<ParsedAttribute>> {
    let mut chars = input.chars().chain(std::iter::once('>'));
    let mut state = State::BeforeName;
    let mut attrs = Attributes::default();
    let mut reconsume: Option<char> = None;

    loop {
        let c = match reconsume.take().or_else(|| chars.next()) {
            Some(c) => c,
            None => return None,
        };

        match state {
            State::BeforeName => match c {
                c if c.is_ascii_whitespace() => {}
                '/' => state = State::SelfClosing,
                '>' => break,
                _ => {
                    attrs.start();
                    if c == '=' {
                        attrs.name.push(c);
                    } else {
                        reconsume = Some(c);
                    }
                    state = State::Name;
                }
            },
            State::Name => match c {
                c if c.is_ascii_whitespace() => state = State::AfterName,
                '/' => state = State::SelfClosing,
                '=' => state = State::BeforeValue,
                '>' => break,
                c => attrs.name.push(c.to_ascii_lowercase()),
            },
            State::AfterName => match c {
                c if c.is_ascii_whitespace() => {}
                '/' => state = State::SelfClosing,
                '=' => state = State::BeforeValue,
                '>' => break,
                c => {
                    attrs.start();
                    reconsume = Some(c);
                    state = State::Name;
                }
            },
            State::BeforeValue => match c {
                c if c.is_ascii_whitespace() => {}
                '"' => state = State::DoubleQuoted,
                '\'' => state = State::SingleQuoted,
                '>' => break,
                c => {
                    reconsume = Some(c);
                    state = State::Unquoted;
                }
            },
            State::DoubleQuoted => match c {
                '"' => state = State::AfterQuoted,
                c => attrs.value.push(c),
            },
            State::SingleQuoted => match c {
                '\'' => state = State::AfterQuoted,
                c => attrs.value.push(c),
            },
            State::Unquoted => match c {
                c if c.is_ascii_whitespace() => state = State::BeforeName,
                '>' => break,
                c => attrs.value.push(c),
            },
            State::AfterQuoted => match c {
                c if c.is_ascii_whitespace() => state = State::BeforeName,
                '/' => state = State::SelfClosing,
                '>' => break,
                c => {
                    reconsume = Some(c);
                    state = State::BeforeName;
                }
            },
            State::SelfClosing => match c {
                '>' => break,
                c => {
                    reconsume = Some(c);
                    state = State::BeforeName;
                }
            },
        }
    }

    attrs.finish();
    Some(attrs.done)
}

/// Decode `&amp; &lt; &gt; &quot; &apos; &nbsp;` and semicolon-terminated
/// numeric references. Anything else is left as typed.
fn decode_entities(s: &str) -> String {
    if !s.contains('&') {
        return s.to_string();
    }

    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        rest = &rest[amp..];

        let decoded = rest.find(';').and_then(|semi| {
            let body = &rest[1..semi];
            let ch = match body {
                "amp" => Some('&'),
                "lt" => Some('<'),
                "gt" => Some('>'),
                "quot" => Some('"'),
                "apos" => Some('\''),
                "nbsp" => Some('\u{a0}'),
                _ => decode_numeric(body),
            };
            ch.map(|ch| (ch, semi))
        });

        match decoded {
            Some((ch, semi)) => {
                out.push(ch);
                rest = &rest[semi + 1..];
            }
            None => {
                out.push('&');
                rest = &rest[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_numeric(body: &str) -> Option<char> {
    let digits = body.strip_prefix('#')?;
    let hex = digits
        .strip_prefix('x')
        .or_else(|| digits.strip_prefix('X'));
    let code = match hex {
        Some(hex) if !hex.is_empty() && hex.len() <= 6 => u32::from_str_radix(hex, 16).ok()?,
        Some(_) => return None,
        None if !digits.is_empty() && digits.len() <= 7 => digits.parse().ok()?,
        None => return None,
    };
    char::from_u32(code)
}
