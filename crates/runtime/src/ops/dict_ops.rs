//! Dictionary operators (SPEC_FULL §4.3/§4.7/§6.3).
//!
//! `scope`/`savescope`/`usescope`/`_endscope`/`_popscope` resolve an Open
//! Question (DESIGN.md): `scope` pushes a fresh lexical layer onto the live
//! dictionary (paired with `_endscope` to discard it, or `_popscope` to pop
//! it back as a value); `savescope`/`usescope` snapshot/install the whole
//! dictionary rather than a single layer, for passing scopes as data.

use crate::vm::Vm;
use concat_core::error::{ErrorKind, VmError};
use concat_core::{Result, Value};

fn key_name(v: Value) -> Result<String> {
    match v {
        Value::Ident(s, _) => Ok(s.as_str().to_string()),
        Value::String(s) => Ok(s.as_str().to_string()),
        other => Err(other.type_error("ident or string")),
    }
}

pub fn defined(vm: &mut Vm) -> Result<()> {
    let key = key_name(vm.pop()?)?;
    let found = vm.dict.defined(&key);
    vm.push(Value::bool(found));
    Ok(())
}

pub fn getdef(vm: &mut Vm) -> Result<()> {
    let key = key_name(vm.pop()?)?;
    let val = vm
        .dict
        .lookup(&key)
        .cloned()
        .ok_or_else(|| VmError::new(ErrorKind::Dict, format!("getdef: {key} is not defined")))?;
    vm.push(val);
    Ok(())
}

/// `def`: `(value key -- )`. Binds `key` to `value` in the innermost scope.
pub fn def(vm: &mut Vm) -> Result<()> {
    let key = key_name(vm.pop()?)?;
    let val = vm.pop()?;
    vm.dict.put(key, val);
    Ok(())
}

/// `mapdef`: `(key [f] -- )`. Rebinds `key` to the result of running `f`
/// against its current value.
pub fn mapdef(vm: &mut Vm) -> Result<()> {
    let f = vm.pop()?;
    let key = key_name(vm.pop()?)?;
    let current = vm
        .dict
        .swap_out(&key)
        .ok_or_else(|| VmError::new(ErrorKind::Dict, format!("mapdef: {key} is not defined")))?;
    vm.push(current);
    vm.eval_quotation(f)?;
    let updated = vm.pop()?;
    vm.dict.put(key, updated);
    Ok(())
}

/// `resolve`: `(ident -- value)`. Looks up `ident`'s binding and pushes it
/// as data, without evaluating it.
pub fn resolve(vm: &mut Vm) -> Result<()> {
    let key = key_name(vm.pop()?)?;
    let val = vm.dict.lookup(&key).cloned().ok_or_else(|| VmError::undefined(&key))?;
    vm.push(val);
    Ok(())
}

/// `rresolve`: repeats `resolve` while the result is itself an identifier.
pub fn rresolve(vm: &mut Vm) -> Result<()> {
    resolve(vm)?;
    while let Value::Ident(..) = vm.peek()? {
        let name = match vm.pop()? {
            Value::Ident(s, _) => s.as_str().to_string(),
            _ => unreachable!(),
        };
        let val = vm.dict.lookup(&name).cloned().ok_or_else(|| VmError::undefined(&name))?;
        vm.push(val);
    }
    Ok(())
}

pub fn scope(vm: &mut Vm) -> Result<()> {
    vm.dict.new_scope();
    Ok(())
}

pub fn savescope(vm: &mut Vm) -> Result<()> {
    vm.push(Value::Dict(vm.dict.clone()));
    Ok(())
}

pub fn usescope(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::Dict(d) => {
            vm.dict.push_scope(&d);
            Ok(())
        }
        other => Err(other.type_error("dict")),
    }
}

/// `_endscope`: discards the innermost lexical layer installed by `scope`.
pub fn endscope_internal(vm: &mut Vm) -> Result<()> {
    vm.dict
        .pop_scope()
        .ok_or_else(|| VmError::new(ErrorKind::Dict, "_endscope: no scope to close"))?;
    Ok(())
}

/// `_popscope`: like `_endscope`, but pushes the closed layer as a `Dict`
/// value rather than discarding it.
pub fn popscope_internal(vm: &mut Vm) -> Result<()> {
    let popped = vm
        .dict
        .pop_scope()
        .ok_or_else(|| VmError::new(ErrorKind::Dict, "_popscope: no scope to close"))?;
    vm.push(Value::Dict(popped));
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
    fn def_then_identifier_resolves() {
        let vm = run_src(r"42 \answer def answer");
        assert_eq!(vm.stack, vec![Value::Int(42)]);
    }

    #[test]
    fn defined_reports_presence() {
        let vm = run_src(r"\pop defined \nonexistent_thing_xyz defined");
        assert_eq!(vm.stack, vec![Value::bool(true), Value::bool(false)]);
    }

    #[test]
    fn scope_shadows_and_endscope_restores() {
        let vm = run_src(r"1 \x def scope 2 \x def x _endscope x");
        assert_eq!(vm.stack, vec![Value::Int(2), Value::Int(1)]);
    }
}
