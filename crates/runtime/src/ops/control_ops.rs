//! Exception handling and process control (SPEC_FULL §4.7/§6.3/§7).
//!
//! `trycatch` drives `Vm::cont` directly rather than encoding the four
//! `original_source/ops.c` handler frames as data: it snapshots the data
//! stack as a list value, pushes one composite handler (`[snapshot,
//! _catch, ...catch-quotation-items]`) onto `cont`, and lets
//! `Vm::run_until`'s existing generic recovery (push the error code unless
//! it's already a thrown payload, then resume `work` with the handler) do
//! the rest. `_catch` is `catch_internal` below: it splices the saved stack
//! back in under the payload. `_endtry`/`catch_unguard` have no work left to
//! do under this design (the stack restore and unlock already happen
//! inline) and are bound as no-ops purely so the names remain callable.

use crate::opcode::Op;
use crate::vm::Vm;
use concat_core::error::ErrorKind;
use concat_core::{Result, Value, VmError};

pub fn trycatch(vm: &mut Vm) -> Result<()> {
    let catch_q = vm.pop_code()?;
    let try_q = vm.pop()?;
    let snapshot = Value::list(vm.stack.clone());
    let mut handler_items = vec![snapshot, Value::Opcode(Op::CatchInternal.index())];
    handler_items.extend(catch_q.as_slice().iter().cloned());
    vm.cont.push(Value::code(handler_items));
    let depth = vm.cont.len();
    let result = vm.eval_quotation(try_q);
    // If the try body raised and our handler already ran (consumed by
    // `run_until`'s recovery), `cont` is now shorter than `depth` and there
    // is nothing left of ours to pop. Only a clean, error-free try leaves
    // our frame sitting untouched on top.
    if result.is_ok() && vm.cont.len() >= depth {
        vm.cont.pop();
    }
    result
}

/// `_catch`: restores the data stack to its pre-`trycatch` snapshot, with
/// the error payload (already pushed by `run_until`, directly below the
/// snapshot this handler itself just pushed) on top.
pub fn catch_internal(vm: &mut Vm) -> Result<()> {
    let snapshot = vm.pop()?;
    let payload = vm.pop()?;
    let items = match snapshot {
        Value::List(l) => l.as_slice().to_vec(),
        other => return Err(other.type_error("list")),
    };
    vm.stack = items;
    vm.push(payload);
    Ok(())
}

pub fn endtry_internal(_vm: &mut Vm) -> Result<()> {
    Ok(())
}

/// `trydebug`: runs `try` as-is; since no interactive debugger exists in
/// this port, any raised error is reported as `NoDebug` rather than handed
/// to a debug prompt (SPEC_FULL §9 scopes the debugger UI out).
pub fn trydebug(vm: &mut Vm) -> Result<()> {
    let try_q = vm.pop()?;
    match vm.eval_quotation(try_q) {
        Ok(()) => Ok(()),
        Err(e) if e.is_fatal() => Err(e),
        Err(e) => Err(VmError::new(ErrorKind::NoDebug, format!("no debugger attached to handle: {e}"))),
    }
}

/// `catch_interactive`: the REPL's sticky `cont`-stack handler, not a
/// combinator. It's installed once (by `-d`/the interactive front-end) and
/// invoked by `run_until`'s generic recovery on every subsequent error: print
/// whatever recovery left on top of the stack, clear `work`/`cont`, put
/// itself back as the sole handler, and re-push `stdin` so the REPL keeps
/// reading lines.
pub fn catch_interactive(vm: &mut Vm) -> Result<()> {
    if let Ok(v) = vm.pop() {
        eprintln!("{}", crate::formatter::display_value(&v, true));
    }
    vm.work.clear();
    vm.cont.clear();
    vm.cont.push(Value::Opcode(Op::CatchInteractive.index()));
    vm.work.push(Value::File(crate::ops::io_ops::stdin_handle()));
    Ok(())
}

pub fn catch_unguard(_vm: &mut Vm) -> Result<()> {
    Ok(())
}

/// `throw`: raises whatever value is already on top of the stack as the
/// thrown payload (`run_until` knows not to push a second copy for
/// `Throw`/`UserThrow`).
pub fn throw(vm: &mut Vm) -> Result<()> {
    vm.peek()?;
    Err(VmError::throw())
}

pub fn perror(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    eprintln!("{}", crate::formatter::display_value(&v, true));
    Ok(())
}

pub fn break_(_vm: &mut Vm) -> Result<()> {
    Err(VmError::new(ErrorKind::Break, "break"))
}

/// `quit`: a `Fatal` error skips `cont`-stack recovery entirely (SPEC_FULL
/// §7) and unwinds straight out to the CLI, which maps it to a clean exit.
pub fn quit(_vm: &mut Vm) -> Result<()> {
    Err(VmError::new(ErrorKind::Fatal, "quit"))
}

/// `debug`: without an interactive debugger, the trap itself just reports
/// that none is available.
pub fn debug(_vm: &mut Vm) -> Result<()> {
    Err(VmError::new(ErrorKind::NoDebug, "no debugger attached"))
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
    fn trycatch_restores_stack_and_runs_catch() {
        // The snapshot preserves whatever was below the try (`1 2`); the
        // catch quotation is responsible for clearing the error code it
        // finds on top plus any of that leftover state it doesn't want.
        let vm = run_src(r#"1 2 [ 1 0 / ] [ pop pop pop "caught" ] trycatch"#);
        assert_eq!(vm.stack, vec![Value::string("caught")]);
    }

    #[test]
    fn trycatch_passes_thrown_payload_to_catch() {
        let vm = run_src(r#"[ "boom" throw ] [ ] trycatch"#);
        assert_eq!(vm.stack, vec![Value::string("boom")]);
    }

    #[test]
    fn successful_try_leaves_cont_stack_clean() {
        let vm = run_src(r#"[ 1 2 + ] [ pop "unreachable" ] trycatch"#);
        assert_eq!(vm.stack, vec![Value::Int(3)]);
        assert!(vm.cont.is_empty());
    }

    #[test]
    fn nested_trycatch_only_unwinds_to_its_own_handler() {
        let vm = run_src(r#"[ [ 1 0 / ] [ pop "inner" ] trycatch ] [ pop "outer" ] trycatch"#);
        assert_eq!(vm.stack, vec![Value::string("inner")]);
    }

    #[test]
    fn catch_interactive_recovers_and_reinstalls_itself() {
        // Called directly (not via `run`) so the re-pushed stdin file never
        // actually gets stepped. That would block on the real process
        // stdin.
        let mut vm = Vm::new();
        vm.work.push(Value::string("leftover"));
        vm.cont.push(Value::Opcode(Op::CatchInteractive.index()));
        vm.push(Value::Int(ErrorKind::BadArgs as i64));
        catch_interactive(&mut vm).unwrap();
        assert!(vm.stack.is_empty());
        assert_eq!(vm.cont, vec![Value::Opcode(Op::CatchInteractive.index())]);
        assert_eq!(vm.work.len(), 1);
        assert!(matches!(vm.work[0], Value::File(_)));
    }
}
