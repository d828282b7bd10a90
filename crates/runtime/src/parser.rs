//! Tokenizer and reader: text -> quotation (SPEC_FULL §4.5/§6.2).

use concat_core::error::{ErrorKind, VmError};
use concat_core::{Result, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// `(...)`: a data list. Identifiers inside are not resolved.
    List,
    /// `[...]`: a quotation. Identifiers inside are not resolved either;
    /// this is the kind that puts the reader in "noeval" (SPEC_FULL §4.7).
    Code,
}

#[derive(Debug, Clone, PartialEq)]
enum Tok {
    Int(i64),
    Float(f64),
    Str(Vec<u8>),
    Ident(String, u32),
    Open(GroupKind),
    Close(GroupKind),
}

/// Splits one line of source into tokens. `#` begins a line comment.
fn tokenize(line: &str) -> Result<Vec<Tok>> {
    let bytes = line.as_bytes();
    let mut i = 0usize;
    let mut out = Vec::new();
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if c == '#' {
            break;
        }
        if c == '(' {
            out.push(Tok::Open(GroupKind::List));
            i += 1;
            continue;
        }
        if c == ')' {
            out.push(Tok::Close(GroupKind::List));
            i += 1;
            continue;
        }
        if c == '[' {
            out.push(Tok::Open(GroupKind::Code));
            i += 1;
            continue;
        }
        if c == ']' {
            out.push(Tok::Close(GroupKind::Code));
            i += 1;
            continue;
        }
        if c == '"' {
            let (s, next) = read_string(bytes, i)?;
            out.push(Tok::Str(s));
            i = next;
            continue;
        }
        let start = i;
        while i < bytes.len() {
            let c = bytes[i] as char;
            if c.is_whitespace() || "()[]#\"".contains(c) {
                break;
            }
            i += 1;
        }
        let word = &line[start..i];
        out.push(classify_word(word));
    }
    Ok(out)
}

fn classify_word(word: &str) -> Tok {
    let escape = word.chars().take_while(|c| *c == '\\').count() as u32;
    let rest = &word[escape as usize..];
    if escape == 0 {
        if let Ok(n) = rest.parse::<i64>() {
            return Tok::Int(n);
        }
        if is_float_literal(rest) {
            if let Ok(f) = rest.parse::<f64>() {
                return Tok::Float(f);
            }
        }
    }
    Tok::Ident(rest.to_string(), escape)
}

fn is_float_literal(s: &str) -> bool {
    let s = s.strip_prefix('-').unwrap_or(s);
    if s.is_empty() || !s.contains('.') {
        return false;
    }
    let mut chars = s.chars();
    let mut saw_digit = false;
    for c in chars.by_ref() {
        if c.is_ascii_digit() {
            saw_digit = true;
        } else if c == '.' || c == 'e' || c == 'E' || c == '+' || c == '-' {
            continue;
        } else {
            return false;
        }
    }
    saw_digit
}

fn read_string(bytes: &[u8], start: usize) -> Result<(Vec<u8>, usize)> {
    let mut i = start + 1;
    let mut out = Vec::new();
    loop {
        if i >= bytes.len() {
            return Err(VmError::new(ErrorKind::UnexpectedEol, "unterminated string literal"));
        }
        match bytes[i] {
            b'"' => {
                i += 1;
                break;
            }
            b'\\' => {
                i += 1;
                if i >= bytes.len() {
                    return Err(VmError::new(ErrorKind::BadEscape, "dangling escape at end of line"));
                }
                match bytes[i] {
                    b'n' => out.push(b'\n'),
                    b't' => out.push(b'\t'),
                    b'r' => out.push(b'\r'),
                    b'\\' => out.push(b'\\'),
                    b'"' => out.push(b'"'),
                    b'0' => out.push(0),
                    b'x' => {
                        if i + 2 >= bytes.len() {
                            return Err(VmError::new(ErrorKind::BadEscape, "truncated \\xHH escape"));
                        }
                        let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                            .map_err(|_| VmError::new(ErrorKind::BadEscape, "invalid \\xHH escape"))?;
                        let byte = u8::from_str_radix(hex, 16)
                            .map_err(|_| VmError::new(ErrorKind::BadEscape, "invalid \\xHH escape"))?;
                        out.push(byte);
                        i += 2;
                    }
                    other => {
                        return Err(VmError::new(
                            ErrorKind::BadEscape,
                            format!("unknown escape \\{}", other as char),
                        ));
                    }
                }
                i += 1;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }
    Ok((out, i))
}

/// Incremental reader: accumulates tokens across lines, tracking nested
/// `(...)`/`[...]` groups (SPEC_FULL §3.5 `open_list`/`groupi`). A line
/// that leaves every group closed yields a completed top-level quotation;
/// an unbalanced line returns `None` and waits for more input. This is how
/// a `File` value feeding `stdin` line by line builds a multi-line `[...]`.
#[derive(Debug, Default)]
pub struct Reader {
    groups: Vec<(GroupKind, Vec<Value>)>,
    top: Vec<Value>,
}

impl Reader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Nesting depth; SPEC_FULL's `groupi`.
    pub fn groupi(&self) -> usize {
        self.groups.len()
    }

    /// True when the innermost open group is a quotation, the condition
    /// under which the reader is in "noeval" mode (SPEC_FULL §4.7).
    pub fn in_noeval(&self) -> bool {
        matches!(self.groups.last(), Some((GroupKind::Code, _)))
    }

    fn push_value(&mut self, v: Value) {
        match self.groups.last_mut() {
            Some((_, items)) => items.push(v),
            None => self.top.push(v),
        }
    }

    /// Feeds one line of source. Returns `Some(quotation)` once every group
    /// opened since this reader was created (or last drained) has closed.
    pub fn feed_line(&mut self, line: &str) -> Result<Option<Value>> {
        for tok in tokenize(line)? {
            match tok {
                Tok::Int(n) => self.push_value(Value::Int(n)),
                Tok::Float(f) => self.push_value(Value::Float(f)),
                Tok::Str(bytes) => self.push_value(Value::String(concat_core::StrView::from_bytes(bytes))),
                Tok::Ident(name, depth) => {
                    self.push_value(Value::Ident(concat_core::StrView::from_str(&name), depth))
                }
                Tok::Open(kind) => self.groups.push((kind, Vec::new())),
                Tok::Close(kind) => {
                    let (opened, items) = self
                        .groups
                        .pop()
                        .ok_or_else(|| VmError::new(ErrorKind::UnexpectedEoc, "unmatched closing bracket"))?;
                    if opened != kind {
                        return Err(VmError::new(ErrorKind::UnexpectedEoc, "mismatched bracket kind"));
                    }
                    let value = match kind {
                        GroupKind::List => Value::list(items),
                        GroupKind::Code => Value::code(items),
                    };
                    self.push_value(value);
                }
            }
        }
        if self.groups.is_empty() {
            Ok(Some(Value::code(std::mem::take(&mut self.top))))
        } else {
            Ok(None)
        }
    }

    /// True if this reader has no pending partial input.
    pub fn is_idle(&self) -> bool {
        self.groups.is_empty() && self.top.is_empty()
    }
}

/// One-shot parse of a complete, self-contained source string (used by the
/// `-e`/`-f` front-end paths, SPEC_FULL §6.1). Errors if any group is left
/// unbalanced.
pub fn parse(src: &str) -> Result<Value> {
    let mut reader = Reader::new();
    let mut result = None;
    for line in src.split('\n') {
        if let Some(code) = reader.feed_line(line)? {
            result = Some(match result {
                None => code,
                Some(prev) => concat_core::Value::code(
                    [as_items(prev), as_items(code)].concat(),
                ),
            });
        }
    }
    if !reader.is_idle() {
        return Err(VmError::new(ErrorKind::UnexpectedEol, "unclosed group at end of input"));
    }
    Ok(result.unwrap_or_else(|| Value::empty_code()))
}

fn as_items(v: Value) -> Vec<Value> {
    match v {
        Value::Code(c) => c.as_slice().to_vec(),
        other => vec![other],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(v: &Value) -> Vec<i64> {
        match v {
            Value::Code(c) => c
                .as_slice()
                .iter()
                .map(|x| match x {
                    Value::Int(n) => *n,
                    _ => panic!("not an int: {x:?}"),
                })
                .collect(),
            _ => panic!("not code"),
        }
    }

    #[test]
    fn parses_integers() {
        assert_eq!(ints(&parse("1 2 3").unwrap()), vec![1, 2, 3]);
    }

    #[test]
    fn parses_negative_and_float() {
        let v = parse("-5 3.14").unwrap();
        match v {
            Value::Code(c) => {
                assert_eq!(c.as_slice()[0], Value::Int(-5));
                assert_eq!(c.as_slice()[1], Value::Float(3.14));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn parses_string_with_escapes() {
        let v = parse(r#" "a\nb\"c" "#).unwrap();
        match v {
            Value::Code(c) => match &c.as_slice()[0] {
                Value::String(s) => assert_eq!(s.as_str(), "a\nb\"c"),
                other => panic!("{other:?}"),
            },
            _ => panic!(),
        }
    }

    #[test]
    fn parses_escaped_identifier_depth() {
        let v = parse(r"\\foo").unwrap();
        match &v {
            Value::Code(c) => match &c.as_slice()[0] {
                Value::Ident(s, depth) => {
                    assert_eq!(s.as_str(), "foo");
                    assert_eq!(*depth, 2);
                }
                other => panic!("{other:?}"),
            },
            _ => panic!(),
        }
    }

    #[test]
    fn nested_groups_round_trip() {
        let v = parse("(1 2 3) [dup *]").unwrap();
        match &v {
            Value::Code(c) => {
                assert!(matches!(c.as_slice()[0], Value::List(_)));
                assert!(matches!(c.as_slice()[1], Value::Code(_)));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn unbalanced_bracket_waits_then_completes_across_lines() {
        let mut reader = Reader::new();
        assert_eq!(reader.feed_line("[ 1 2").unwrap(), None);
        assert!(reader.in_noeval());
        let done = reader.feed_line("3 ]").unwrap();
        assert!(done.is_some());
        assert!(reader.is_idle());
    }

    #[test]
    fn mismatched_brackets_error() {
        assert!(parse("(1 2]").is_err());
    }

    #[test]
    fn line_comment_is_ignored() {
        assert_eq!(ints(&parse("1 2 # trailing comment\n3").unwrap()), vec![1, 2, 3]);
    }
}
