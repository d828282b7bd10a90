//! Mutex+condvar protected mutable cell (SPEC_FULL §3.4/§4.4).

use crate::error::{ErrorKind, Result, VmError};
use crate::value::Value;
use std::sync::{Condvar, Mutex, MutexGuard};

/// `Ref = {value, mutex, condvar}`. `Arc<RefCell>` supplies the refcount
/// SPEC_FULL describes explicitly; Rust's `Arc` makes a separate field
/// unnecessary.
#[derive(Debug, Default)]
pub struct RefCell {
    value: Mutex<Value>,
    condvar: Condvar,
}

/// A held lock on a `RefCell`, returned by `lock`/`trylock`. Dropping it
/// without calling `unlock` is still safe (the `MutexGuard` releases), but
/// opcodes use `unlock` explicitly to match SPEC_FULL's guard discipline.
pub struct RefGuard<'a> {
    cell: &'a RefCell,
    guard: Option<MutexGuard<'a, Value>>,
}

impl RefCell {
    pub fn new(value: Value) -> Self {
        RefCell { value: Mutex::new(value), condvar: Condvar::new() }
    }

    pub fn lock(&self) -> RefGuard<'_> {
        RefGuard { cell: self, guard: Some(self.value.lock().unwrap_or_else(|e| e.into_inner())) }
    }

    pub fn try_lock(&self) -> Option<RefGuard<'_>> {
        self.value.try_lock().ok().map(|g| RefGuard { cell: self, guard: Some(g) })
    }
}

impl<'a> RefGuard<'a> {
    /// Read the current value without taking it.
    pub fn peek(&self) -> Value {
        self.guard.as_ref().expect("guard held").clone()
    }

    /// `refswap`: replace the cell's contents, returning the old value.
    pub fn swap(&mut self, new_value: Value) -> Value {
        let slot = self.guard.as_mut().expect("guard held");
        std::mem::replace(slot, new_value)
    }

    /// Releases the lock and blocks until signaled, then re-acquires.
    /// Precondition/postcondition: caller holds the lock (SPEC_FULL §4.4).
    pub fn wait(&mut self) {
        let guard = self.guard.take().expect("guard held");
        let guard = self.cell.condvar.wait(guard).unwrap_or_else(|e| e.into_inner());
        self.guard = Some(guard);
    }

    pub fn signal(&self) {
        self.cell.condvar.notify_one();
    }

    pub fn broadcast(&self) {
        self.cell.condvar.notify_all();
    }

    /// Releases the underlying mutex. Matches the explicit SPEC_FULL
    /// `unlock` primitive, rather than only relying on `Drop`.
    pub fn unlock(mut self) {
        self.guard.take();
    }
}

/// `guard_waitwhile`: loop while `pred` holds, releasing the lock between
/// iterations; the caller supplies `pred`/`post` as closures since the VM
/// layer (not `concat-core`) knows how to evaluate quotations.
pub fn guard_waitwhile<PredErr>(
    cell: &RefCell,
    mut pred: impl FnMut(&Value) -> std::result::Result<bool, PredErr>,
) -> std::result::Result<RefGuard<'_>, PredErr> {
    let mut guard = cell.lock();
    loop {
        let keep_waiting = pred(&guard.peek())?;
        if !keep_waiting {
            return Ok(guard);
        }
        guard.wait();
    }
}

pub fn try_lock_or(cell: &RefCell) -> Result<RefGuard<'_>> {
    cell.try_lock().ok_or_else(|| VmError::new(ErrorKind::Locked, "ref cell already locked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn swap_returns_previous_value() {
        let cell = RefCell::new(Value::Int(1));
        let mut g = cell.lock();
        let old = g.swap(Value::Int(2));
        assert_eq!(old, Value::Int(1));
        assert_eq!(g.peek(), Value::Int(2));
    }

    #[test]
    fn signal_wakes_one_waiter() {
        let cell = Arc::new(RefCell::new(Value::Int(0)));
        let waiter_cell = cell.clone();
        let handle = thread::spawn(move || {
            let mut g = waiter_cell.lock();
            while g.peek() == Value::Int(0) {
                g.wait();
            }
            g.peek()
        });
        thread::sleep(std::time::Duration::from_millis(20));
        {
            let mut g = cell.lock();
            g.swap(Value::Int(42));
            g.signal();
        }
        assert_eq!(handle.join().unwrap(), Value::Int(42));
    }

    #[test]
    fn n_times_k_threads_increment_to_n_times_k() {
        let cell = Arc::new(RefCell::new(Value::Int(0)));
        let n = 50;
        let k = 4;
        let handles: Vec<_> = (0..k)
            .map(|_| {
                let cell = cell.clone();
                thread::spawn(move || {
                    for _ in 0..n {
                        let mut g = cell.lock();
                        let v = match g.peek() {
                            Value::Int(x) => x,
                            _ => unreachable!(),
                        };
                        g.swap(Value::Int(v + 1));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        let g = cell.lock();
        assert_eq!(g.peek(), Value::Int(n * k));
    }
}
