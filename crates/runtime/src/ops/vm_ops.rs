//! Sub-VM operators: `vm`, `thread`, `thread.wait` (SPEC_FULL §4.8/§6.3).
//! The heavy lifting (locking, strand spawning, join bookkeeping) lives in
//! `crate::vmsub::SubVm`; these are thin stack-effect wrappers around it.

use crate::vm::Vm;
use crate::vmsub::SubVm;
use concat_core::{Result, Value};
use std::sync::Arc;

/// `vm`: `(stack work -- vm)`. Builds a sub-VM seeded with its own copy of
/// the current dictionary, not yet running. Pushing it onto `work` later
/// (e.g. via `eval`) runs it to completion in place (`Vm::step`'s `Value::Vm`
/// arm); `thread` below is the concurrent alternative.
pub fn vm_new(vm: &mut Vm) -> Result<()> {
    let work = vm.pop()?;
    let stack = vm.pop()?;
    let sub = SubVm::new(stack, work, vm.dict.clone());
    vm.push(Value::Vm(Arc::new(sub)));
    Ok(())
}

/// `thread`: `(stack work -- vm)`. Like `vm`, but immediately spawned on
/// its own green-thread strand; the returned handle is already running.
pub fn thread(vm: &mut Vm) -> Result<()> {
    let work = vm.pop()?;
    let stack = vm.pop()?;
    let sub = Arc::new(SubVm::new(stack, work, vm.dict.clone()));
    sub.clone().spawn()?;
    vm.push(Value::Vm(sub));
    Ok(())
}

/// `thread.wait`: `(vm -- stack)`. Blocks until a spawned sub-VM finishes,
/// pushing its final data stack (as a list) or propagating its error.
pub fn thread_wait(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::Vm(sub) => {
            let result = sub.join()?;
            vm.push(result);
            Ok(())
        }
        other => Err(other.type_error("vm")),
    }
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
    fn vm_builds_a_runnable_sub_vm() {
        // `eval`ing a pushed `Vm` value runs it to completion and pushes its
        // final data stack back as one list (`Vm::step`'s `Value::Vm` arm).
        let vm = run_src("[] [1 2 +] vm eval");
        assert_eq!(vm.stack, vec![Value::list(vec![Value::Int(3)])]);
    }

    #[test]
    fn thread_runs_concurrently_and_thread_wait_joins() {
        let vm = run_src("[] [10 20 *] thread thread.wait");
        assert_eq!(vm.stack, vec![Value::list(vec![Value::Int(200)])]);
    }
}
