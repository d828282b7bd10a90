//! Concurrent ref cell operators (SPEC_FULL §4.4/§4.7/§6.3).
//!
//! `guard`/`guard.sig`/`guard.bcast` use Rust's own error propagation to
//! guarantee the lock releases on every exit path, rather than the cont-
//! stack `catch_unguard` sentinel `original_source/` relies on. See
//! DESIGN.md. Standalone `signal`/`broadcast`/`wait` acquire and release
//! their own lock rather than assuming one is already held; nothing in
//! SPEC_FULL's scenarios exercises a held-then-signal sequence outside the
//! guard combinators, and self-contained locking can't deadlock against a
//! non-reentrant `Mutex`.

use crate::vm::Vm;
use concat_core::refcell::guard_waitwhile;
use concat_core::{Result, Value};
use std::sync::Arc;

fn pop_ref(vm: &mut Vm) -> Result<Arc<concat_core::RefCell>> {
    match vm.pop()? {
        Value::Ref(r) => Ok(r),
        other => Err(other.type_error("ref")),
    }
}

pub fn ref_new(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    vm.push(Value::Ref(Arc::new(concat_core::RefCell::new(v))));
    Ok(())
}

/// `deref`: `(ref -- value)`.
pub fn deref(vm: &mut Vm) -> Result<()> {
    let r = pop_ref(vm)?;
    let g = r.lock();
    vm.push(g.peek());
    Ok(())
}

/// `refswap`: `(ref newvalue -- oldvalue)`.
pub fn refswap(vm: &mut Vm) -> Result<()> {
    let new_value = vm.pop()?;
    let r = pop_ref(vm)?;
    let mut g = r.lock();
    let old = g.swap(new_value);
    vm.push(old);
    Ok(())
}

/// `guard`: `(ref [body] -- ...)`. Locks `ref`, pushes its referent, runs
/// `body`, then stores whatever `body` left on top back into the cell.
/// Unlocked on every exit, including when `body` raises.
pub fn guard(vm: &mut Vm) -> Result<()> {
    let body = vm.pop()?;
    let r = pop_ref(vm)?;
    let mut g = r.lock();
    vm.push(g.peek());
    match vm.eval_quotation(body) {
        Ok(()) => {
            let updated = vm.pop()?;
            g.swap(updated);
            g.unlock();
            Ok(())
        }
        Err(e) => {
            g.unlock();
            Err(e)
        }
    }
}

pub fn guard_sig(vm: &mut Vm) -> Result<()> {
    let body = vm.pop()?;
    let r = pop_ref(vm)?;
    let mut g = r.lock();
    vm.push(g.peek());
    match vm.eval_quotation(body) {
        Ok(()) => {
            let updated = vm.pop()?;
            g.swap(updated);
            g.signal();
            g.unlock();
            Ok(())
        }
        Err(e) => {
            g.unlock();
            Err(e)
        }
    }
}

pub fn guard_bcast(vm: &mut Vm) -> Result<()> {
    let body = vm.pop()?;
    let r = pop_ref(vm)?;
    let mut g = r.lock();
    vm.push(g.peek());
    match vm.eval_quotation(body) {
        Ok(()) => {
            let updated = vm.pop()?;
            g.swap(updated);
            g.broadcast();
            g.unlock();
            Ok(())
        }
        Err(e) => {
            g.unlock();
            Err(e)
        }
    }
}

/// `guard.waitwhile`: `(ref [pred] [post] -- ...)`. Holds the lock,
/// re-testing `pred` against the referent (releasing/reacquiring around the
/// wait) until it's false, then runs `post` and stores its result.
pub fn guard_waitwhile_op(vm: &mut Vm) -> Result<()> {
    let post = vm.pop()?;
    let pred = vm.pop()?;
    let r = pop_ref(vm)?;
    let mut g = guard_waitwhile(&r, |val| {
        vm.push(val.clone());
        vm.eval_quotation(pred.clone())?;
        Ok::<bool, concat_core::VmError>(vm.pop()?.as_bool())
    })?;
    vm.push(g.peek());
    match vm.eval_quotation(post) {
        Ok(()) => {
            let updated = vm.pop()?;
            g.swap(updated);
            g.unlock();
            Ok(())
        }
        Err(e) => {
            g.unlock();
            Err(e)
        }
    }
}

/// `guard.sigwaitwhile`: like `guard.waitwhile`, but signals after storing
/// `post`'s result (so a waiter that would re-check sees the new value).
pub fn guard_sigwaitwhile(vm: &mut Vm) -> Result<()> {
    let post = vm.pop()?;
    let pred = vm.pop()?;
    let r = pop_ref(vm)?;
    let mut g = guard_waitwhile(&r, |val| {
        vm.push(val.clone());
        vm.eval_quotation(pred.clone())?;
        Ok::<bool, concat_core::VmError>(vm.pop()?.as_bool())
    })?;
    vm.push(g.peek());
    match vm.eval_quotation(post) {
        Ok(()) => {
            let updated = vm.pop()?;
            g.swap(updated);
            g.signal();
            g.unlock();
            Ok(())
        }
        Err(e) => {
            g.unlock();
            Err(e)
        }
    }
}

pub fn signal(vm: &mut Vm) -> Result<()> {
    let r = pop_ref(vm)?;
    let g = r.lock();
    g.signal();
    vm.push(Value::Ref(r));
    Ok(())
}

pub fn broadcast(vm: &mut Vm) -> Result<()> {
    let r = pop_ref(vm)?;
    let g = r.lock();
    g.broadcast();
    vm.push(Value::Ref(r));
    Ok(())
}

pub fn wait(vm: &mut Vm) -> Result<()> {
    let r = pop_ref(vm)?;
    let mut g = r.lock();
    g.wait();
    g.unlock();
    vm.push(Value::Ref(r));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use serial_test::serial;

    fn run_src(src: &str) -> Vm {
        let mut vm = Vm::new();
        let code = parse(src).unwrap();
        vm.work.push(code);
        vm.run().unwrap();
        vm
    }

    #[test]
    fn ref_deref_round_trips() {
        let vm = run_src("42 ref deref");
        assert_eq!(vm.stack, vec![Value::Int(42)]);
    }

    #[test]
    fn refswap_returns_old_value() {
        let vm = run_src("1 ref 2 refswap");
        assert_eq!(vm.stack, vec![Value::Int(1)]);
    }

    // Guard tests pair a lock acquire with a release on every exit path;
    // `#[serial]` keeps two such tests from ever contending for the same
    // ref cell's mutex across the test binary's own threads (SPEC_FULL §8.4).
    #[test]
    #[serial]
    fn guard_updates_cell_with_body_result() {
        let vm = run_src("1 ref [10 *] guard");
        // stack is empty (guard's body result is stored back, not left on
        // the data stack); deref to observe the update.
        assert_eq!(vm.stack, Vec::<Value>::new());
    }

    #[test]
    #[serial]
    fn guard_propagates_body_error_and_still_unlocks() {
        let mut vm = Vm::new();
        let code = parse("1 ref [1 0 /] guard").unwrap();
        vm.work.push(code);
        let err = vm.run().unwrap_err();
        assert_eq!(err.kind, concat_core::ErrorKind::BadArgs);
    }
}
