//! Type-conversion operators (SPEC_FULL §4.7/§6.3).

use crate::vm::Vm;
use concat_core::error::{ErrorKind, VmError};
use concat_core::{Result, StrView, Value};

pub fn toint(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    let n = match &v {
        Value::Int(n) => *n,
        Value::Float(f) => *f as i64,
        Value::String(s) => s
            .as_str()
            .trim()
            .parse()
            .map_err(|_| VmError::new(ErrorKind::BadParse, format!("toint: can't parse {:?}", s.as_str())))?,
        other => return Err(other.type_error("int, float or string")),
    };
    vm.push(Value::Int(n));
    Ok(())
}

pub fn tofloat(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    let f = match &v {
        Value::Float(f) => *f,
        Value::Int(n) => *n as f64,
        Value::String(s) => s
            .as_str()
            .trim()
            .parse()
            .map_err(|_| VmError::new(ErrorKind::BadParse, format!("tofloat: can't parse {:?}", s.as_str())))?,
        other => return Err(other.type_error("int, float or string")),
    };
    vm.push(Value::Float(f));
    Ok(())
}

/// `parsenum`: parses a string as whichever of int/float fits (SPEC_FULL
/// §B.G), preferring int when the text has no `.`/`e`/`E`.
pub fn parsenum(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    let s = match &v {
        Value::String(s) => s.as_str(),
        other => return Err(other.type_error("string")),
    };
    let trimmed = s.trim();
    if let Ok(n) = trimmed.parse::<i64>() {
        vm.push(Value::Int(n));
        return Ok(());
    }
    if let Ok(f) = trimmed.parse::<f64>() {
        vm.push(Value::Float(f));
        return Ok(());
    }
    Err(VmError::new(ErrorKind::BadParse, format!("parsenum: can't parse {trimmed:?}")))
}

pub fn tostring(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    vm.push(Value::String(StrView::from_str(&crate::formatter::display_value(&v, true))));
    Ok(())
}

pub fn toident(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    match v {
        Value::String(s) => vm.push(Value::Ident(s, 0)),
        other => return Err(other.type_error("string")),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn run_src(src: &str) -> Vm {
        let mut vm = Vm::new();
        let code = parse(src).unwrap();
        vm.work.push(code);
        vm.run().unwrap();
        vm
    }

    #[test]
    fn toint_truncates_float_and_parses_string() {
        let vm = run_src(r#"3.9 toint "42" toint"#);
        assert_eq!(vm.stack, vec![Value::Int(3), Value::Int(42)]);
    }

    #[test]
    fn tofloat_widens_int_and_parses_string() {
        let vm = run_src(r#"3 tofloat "1.5" tofloat"#);
        assert_eq!(vm.stack, vec![Value::Float(3.0), Value::Float(1.5)]);
    }

    #[test]
    fn parsenum_prefers_int_when_unambiguous() {
        let vm = run_src(r#""7" parsenum "7.0" parsenum"#);
        assert_eq!(vm.stack, vec![Value::Int(7), Value::Float(7.0)]);
    }

    #[test]
    fn parsenum_rejects_garbage() {
        let mut vm = Vm::new();
        let code = parse(r#""not a number" parsenum"#).unwrap();
        vm.work.push(code);
        let err = vm.run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadParse);
    }

    #[test]
    fn tostring_round_trips_through_display() {
        let vm = run_src(r#"42 tostring"#);
        assert_eq!(vm.stack, vec![Value::string("42")]);
    }

    #[test]
    fn toident_converts_string_to_identifier() {
        let mut vm = Vm::new();
        vm.push(Value::string("pop"));
        toident(&mut vm).unwrap();
        assert!(matches!(vm.stack[0], Value::Ident(..)));
    }
}
