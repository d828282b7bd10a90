//! Sub-VM values (SPEC_FULL §3.5/§4.8): a `Vm` wrapped behind
//! `concat_core::VmHandle` so it can live inside another `Vm`'s data stack.
//! `thread`/`thread.wait` run it on a `may` green-thread strand rather than
//! an OS thread, cheap enough that a concat program can fork hundreds of
//! them without exhausting real threads, matching the teacher crate's own
//! `may`-based concurrency.

use crate::vm::Vm;
use concat_core::error::ErrorKind;
use concat_core::{Dict, Result, Value, VmError, VmHandle, VmState};
use std::sync::{Arc, Mutex};

fn as_vec(v: Value) -> Vec<Value> {
    match v {
        Value::List(l) | Value::Code(l) => l.as_slice().to_vec(),
        other => vec![other],
    }
}

pub struct SubVm {
    inner: Mutex<Vm>,
    state: Mutex<VmState>,
    result: Mutex<Option<Result<Value>>>,
    strand: Mutex<Option<may::coroutine::JoinHandle<()>>>,
}

impl std::fmt::Debug for SubVm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SubVm({:?})", *self.state.lock().unwrap_or_else(|e| e.into_inner()))
    }
}

impl SubVm {
    pub fn new(stack: Value, work: Value, dict: Dict) -> Self {
        let mut vm = Vm::with_dict(dict);
        vm.stack = as_vec(stack);
        vm.work = as_vec(work);
        SubVm {
            inner: Mutex::new(vm),
            state: Mutex::new(VmState::Stopped),
            result: Mutex::new(None),
            strand: Mutex::new(None),
        }
    }

    fn set_state(&self, s: VmState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = s;
    }
}

impl VmHandle for SubVm {
    fn state(&self) -> VmState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn run_to_completion(&self) -> Result<Value> {
        self.set_state(VmState::Running);
        let outcome = {
            let mut vm = self.inner.lock().unwrap_or_else(|e| e.into_inner());
            vm.run().map(|()| Value::list(vm.stack.clone()))
        };
        self.set_state(VmState::Finished);
        *self.result.lock().unwrap_or_else(|e| e.into_inner()) = Some(outcome.clone());
        outcome
    }

    fn spawn(self: Arc<Self>) -> Result<()> {
        self.set_state(VmState::Running);
        let strand_owner = self.clone();
        let handle = may::coroutine::spawn(move || {
            let _ = strand_owner.run_to_completion();
        });
        *self.strand.lock().unwrap_or_else(|e| e.into_inner()) = Some(handle);
        Ok(())
    }

    fn join(&self) -> Result<Value> {
        if let Some(handle) = self.strand.lock().unwrap_or_else(|e| e.into_inner()).take() {
            handle.join().map_err(|_| VmError::new(ErrorKind::Thread, "sub-vm strand panicked"))?;
        }
        self.result
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .unwrap_or_else(|| Err(VmError::new(ErrorKind::Thread, "thread.wait: sub-vm was never run")))
    }

    fn stack(&self) -> Value {
        Value::list(self.inner.lock().unwrap_or_else(|e| e.into_inner()).stack.clone())
    }

    fn wstack(&self) -> Value {
        Value::list(self.inner.lock().unwrap_or_else(|e| e.into_inner()).work.clone())
    }

    fn set_stack(&self, v: Value) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).stack = as_vec(v);
    }

    fn set_wstack(&self, v: Value) {
        self.inner.lock().unwrap_or_else(|e| e.into_inner()).work = as_vec(v);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn run_to_completion_returns_final_stack() {
        let work = crate::parser::parse("1 2 +").unwrap();
        let sub = SubVm::new(Value::empty_list(), work, Dict::new());
        let result = sub.run_to_completion().unwrap();
        assert_eq!(result, Value::list(vec![Value::Int(3)]));
        assert_eq!(sub.state(), VmState::Finished);
    }

    // `may`'s coroutine scheduler is a process-wide pool; `#[serial]` avoids
    // two spawn/join tests racing each other onto it (SPEC_FULL §8.4).
    #[test]
    #[serial]
    fn spawn_then_join_on_a_strand() {
        let work = crate::parser::parse("10 20 *").unwrap();
        let sub = Arc::new(SubVm::new(Value::empty_list(), work, Dict::new()));
        sub.clone().spawn().unwrap();
        let result = sub.join().unwrap();
        assert_eq!(result, Value::list(vec![Value::Int(200)]));
    }
}
