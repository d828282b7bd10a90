//! `printf`-style formatter (SPEC_FULL §4.6). Supports `%d %f %s %v %V`
//! with the `- + # 0 '` flags, width, precision and `%n$` positional
//! selection. `%v` prints a value in its human form; `%V` prints it as
//! source that reparses to the same structure (SPEC_FULL §8.2).

use concat_core::error::{ErrorKind, VmError};
use concat_core::{Result, Value};
use std::fmt::Write as _;

/// Structured list-formatting knobs (SPEC_FULL §4.6), used by state-dump
/// and REPL-line output rather than by `%v`/`%V` directly.
#[derive(Debug, Clone)]
pub struct ListFormat {
    pub reverse: bool,
    pub max_elements: Option<usize>,
    pub max_bytes: Option<usize>,
    pub truncation_marker: String,
    pub separator: String,
    pub brace_open: String,
    pub brace_close: String,
}

impl Default for ListFormat {
    fn default() -> Self {
        ListFormat {
            reverse: false,
            max_elements: None,
            max_bytes: None,
            truncation_marker: "...".to_string(),
            separator: " ".to_string(),
            brace_open: "(".to_string(),
            brace_close: ")".to_string(),
        }
    }
}

pub fn format_list(items: &[Value], human: bool, opts: &ListFormat) -> String {
    let mut out = String::new();
    out.push_str(&opts.brace_open);
    let order: Vec<&Value> = if opts.reverse { items.iter().rev().collect() } else { items.iter().collect() };
    let limit = opts.max_elements.unwrap_or(order.len()).min(order.len());
    for (i, v) in order.iter().take(limit).enumerate() {
        if i > 0 {
            out.push_str(&opts.separator);
        }
        out.push_str(&display_value(v, human));
        if let Some(max) = opts.max_bytes {
            if out.len() > max {
                out.truncate(max);
                out.push_str(&opts.truncation_marker);
                out.push_str(&opts.brace_close);
                return out;
            }
        }
    }
    if limit < order.len() {
        if limit > 0 {
            out.push_str(&opts.separator);
        }
        out.push_str(&opts.truncation_marker);
    }
    out.push_str(&opts.brace_close);
    out
}

fn escape_string_source(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for &b in s.as_bytes() {
        match b {
            b'\n' => out.push_str("\\n"),
            b'\t' => out.push_str("\\t"),
            b'\r' => out.push_str("\\r"),
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            0x20..=0x7e => out.push(b as char),
            _ => {
                let _ = write!(out, "\\x{b:02x}");
            }
        }
    }
    out.push('"');
    out
}

fn float_source(f: f64) -> String {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 {
        format!("{f:.1}")
    } else {
        format!("{f}")
    }
}

/// Prints one value. `human` selects `%v`; `!human` selects `%V`.
pub fn display_value(v: &Value, human: bool) -> String {
    match v {
        Value::Opcode(n) => {
            crate::opcode::Op::from_index(*n).map(|op| op.name().to_string()).unwrap_or_else(|| format!("<opcode {n}>"))
        }
        Value::Int(n) => n.to_string(),
        Value::Float(f) => if human { format!("{f}") } else { float_source(*f) },
        Value::String(s) => if human { s.as_str().to_string() } else { escape_string_source(s.as_str()) },
        Value::Ident(s, depth) => format!("{}{}", "\\".repeat(*depth as usize), s.as_str()),
        Value::Bytecode(_) => "<bytecode>".to_string(),
        Value::List(l) => {
            let def = ListFormat { brace_open: "(".into(), brace_close: ")".into(), ..Default::default() };
            format_list(l.as_slice(), human, &def)
        }
        Value::Code(c) => {
            let def = ListFormat { brace_open: "[".into(), brace_close: "]".into(), ..Default::default() };
            format_list(c.as_slice(), human, &def)
        }
        Value::Dict(_) => "<dict>".to_string(),
        Value::Ref(_) => "<ref>".to_string(),
        Value::File(_) => "<file>".to_string(),
        Value::Fd(fd) => format!("<fd {fd}>"),
        Value::Vm(vm) => format!("<vm {:?}>", vm.state()),
    }
}

struct Spec {
    left_align: bool,
    zero_pad: bool,
    plus_sign: bool,
    alt_form: bool,
    thousands: bool,
    width: Option<usize>,
    precision: Option<usize>,
    arg_index: Option<usize>,
    conv: char,
}

fn parse_spec(chars: &mut std::iter::Peekable<std::str::Chars>) -> Result<Spec> {
    let mut spec = Spec {
        left_align: false,
        zero_pad: false,
        plus_sign: false,
        alt_form: false,
        thousands: false,
        width: None,
        precision: None,
        arg_index: None,
        conv: '\0',
    };
    // Flags
    loop {
        match chars.peek() {
            Some('-') => { spec.left_align = true; chars.next(); }
            Some('0') => { spec.zero_pad = true; chars.next(); }
            Some('+') => { spec.plus_sign = true; chars.next(); }
            Some('#') => { spec.alt_form = true; chars.next(); }
            Some('\'') => { spec.thousands = true; chars.next(); }
            Some(' ') => { chars.next(); }
            _ => break,
        }
    }
    // width (or positional n$)
    let mut num = String::new();
    while let Some(c) = chars.peek() {
        if c.is_ascii_digit() {
            num.push(*c);
            chars.next();
        } else {
            break;
        }
    }
    if chars.peek() == Some(&'$') {
        chars.next();
        spec.arg_index = Some(num.parse().unwrap_or(1));
        num.clear();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                num.push(*c);
                chars.next();
            } else {
                break;
            }
        }
    }
    if !num.is_empty() {
        spec.width = num.parse().ok();
    }
    if chars.peek() == Some(&'.') {
        chars.next();
        let mut prec = String::new();
        while let Some(c) = chars.peek() {
            if c.is_ascii_digit() {
                prec.push(*c);
                chars.next();
            } else {
                break;
            }
        }
        spec.precision = Some(prec.parse().unwrap_or(0));
    }
    spec.conv = chars
        .next()
        .ok_or_else(|| VmError::new(ErrorKind::BadArgs, "truncated format conversion"))?;
    Ok(spec)
}

fn pad(s: String, spec: &Spec) -> String {
    let width = match spec.width {
        Some(w) => w,
        None => return s,
    };
    if s.len() >= width {
        return s;
    }
    let fill = if spec.zero_pad && !spec.left_align { '0' } else { ' ' };
    let padding: String = std::iter::repeat(fill).take(width - s.len()).collect();
    if spec.left_align {
        format!("{s}{padding}")
    } else {
        format!("{padding}{s}")
    }
}

/// Formats `fmt` against `args`, consuming them left to right unless a
/// `%n$` positional selector overrides the cursor.
pub fn format(fmt: &str, args: &[Value]) -> Result<String> {
    let mut out = String::new();
    let mut chars = fmt.chars().peekable();
    let mut cursor = 0usize;
    while let Some(c) = chars.next() {
        if c != '%' {
            out.push(c);
            continue;
        }
        if chars.peek() == Some(&'%') {
            chars.next();
            out.push('%');
            continue;
        }
        let spec = parse_spec(&mut chars)?;
        let idx = match spec.arg_index {
            Some(n) => n.saturating_sub(1),
            None => {
                let i = cursor;
                cursor += 1;
                i
            }
        };
        let arg = args
            .get(idx)
            .ok_or_else(|| VmError::new(ErrorKind::MissingArgs, "format argument list exhausted"))?;
        let rendered = match spec.conv {
            'd' => match arg {
                Value::Int(n) => {
                    let mut s = n.unsigned_abs().to_string();
                    if spec.thousands {
                        s = group_thousands(&s);
                    }
                    if *n < 0 {
                        format!("-{s}")
                    } else if spec.plus_sign {
                        format!("+{s}")
                    } else {
                        s
                    }
                }
                Value::Float(f) => (*f as i64).to_string(),
                other => return Err(other.type_error("int")),
            },
            'f' => match arg {
                Value::Float(f) => format!("{:.*}", spec.precision.unwrap_or(6), f),
                Value::Int(n) => format!("{:.*}", spec.precision.unwrap_or(6), *n as f64),
                other => return Err(other.type_error("float")),
            },
            's' => match arg {
                Value::String(s) => s.as_str().to_string(),
                other => display_value(other, true),
            },
            'v' => display_value(arg, true),
            'V' => display_value(arg, false),
            other => {
                return Err(VmError::new(ErrorKind::BadArgs, format!("unknown conversion %{other}")));
            }
        };
        out.push_str(&pad(rendered, &spec));
    }
    Ok(out)
}

fn group_thousands(digits: &str) -> String {
    let bytes = digits.as_bytes();
    let mut out = Vec::new();
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 && (bytes.len() - i) % 3 == 0 {
            out.push(b',' as u8);
        }
        out.push(*b);
    }
    String::from_utf8(out).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_int_and_float() {
        assert_eq!(format("%d", &[Value::Int(42)]).unwrap(), "42");
        assert_eq!(format("%.2f", &[Value::Float(3.14159)]).unwrap(), "3.14");
    }

    #[test]
    fn formats_string_and_value() {
        assert_eq!(format("%s", &[Value::string("hi")]).unwrap(), "hi");
        assert_eq!(format("%v", &[Value::list(vec![Value::Int(1), Value::Int(2)])]).unwrap(), "(1 2)");
    }

    #[test]
    fn positional_selector() {
        assert_eq!(format("%2$d-%1$d", &[Value::Int(1), Value::Int(2)]).unwrap(), "2-1");
    }

    #[test]
    fn width_and_zero_pad() {
        assert_eq!(format("%05d", &[Value::Int(7)]).unwrap(), "00007");
        assert_eq!(format("%-5d|", &[Value::Int(7)]).unwrap(), "7    |");
    }

    #[test]
    fn source_form_float_round_trips_as_float() {
        let s = display_value(&Value::Float(3.0), false);
        assert_eq!(s, "3.0");
    }

    #[test]
    fn source_form_string_escapes() {
        let s = display_value(&Value::string("a\nb"), false);
        assert_eq!(s, "\"a\\nb\"");
    }
}
