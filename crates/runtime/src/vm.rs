//! The four-stack evaluator (SPEC_FULL §3.5/§4.7).
//!
//! `work`, `stack` and `cont` are plain `Vec<Value>` rather than the
//! spec's CoW list buffers: SPEC_FULL §9 explicitly allows any dispatch
//! strategy as long as observable stack effects match and tail-calls don't
//! grow the Rust call stack. Driving every opcode, quotation expansion and
//! combinator off the *same* `work` vector, via one flat loop, is what
//! actually delivers that guarantee here: a looping quotation never
//! recurses in Rust, it just keeps popping itself off `work`.

use crate::opcode::Op;
use crate::parser::Reader;
use concat_core::error::ErrorKind;
use concat_core::{Dict, Result, Value, VmError};

/// Sentinel message marking a `VmError` that isn't a real fault: it means
/// a `trycatch` handler further out on `cont` has already been scheduled
/// onto `work`, and this `run_until` frame should stop draining without
/// re-running error recovery (SPEC_FULL §7 propagation, extended to work
/// across nested Rust calls for combinators, see DESIGN.md).
const RESUMED_ELSEWHERE: &str = "\0resumed-elsewhere";

pub struct Vm {
    pub stack: Vec<Value>,
    pub work: Vec<Value>,
    pub cont: Vec<Value>,
    pub dict: Dict,
    pub reader: Reader,
}

impl Default for Vm {
    fn default() -> Self {
        Vm {
            stack: Vec::new(),
            work: Vec::new(),
            cont: Vec::new(),
            dict: crate::stdlib::initial_dict(),
            reader: Reader::new(),
        }
    }
}

impl Vm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dict(dict: Dict) -> Self {
        Vm { dict, ..Self::default() }
    }

    // --- stack helpers -----------------------------------------------

    pub fn push(&mut self, v: Value) {
        self.stack.push(v);
    }

    pub fn pop(&mut self) -> Result<Value> {
        self.stack.pop().ok_or_else(|| VmError::new(ErrorKind::Empty, "data stack underflow"))
    }

    pub fn peek(&self) -> Result<&Value> {
        self.stack.last().ok_or_else(|| VmError::new(ErrorKind::Empty, "data stack underflow"))
    }

    pub fn pop_int(&mut self) -> Result<i64> {
        match self.pop()? {
            Value::Int(n) => Ok(n),
            other => Err(other.type_error("int")),
        }
    }

    pub fn pop_bool(&mut self) -> Result<bool> {
        Ok(self.pop()?.as_bool())
    }

    pub fn pop_number(&mut self) -> Result<f64> {
        match self.pop()? {
            Value::Int(n) => Ok(n as f64),
            Value::Float(f) => Ok(f),
            other => Err(other.type_error("number")),
        }
    }

    pub fn pop_code(&mut self) -> Result<concat_core::ListView> {
        match self.pop()? {
            Value::Code(c) => Ok(c),
            other => Err(other.type_error("code")),
        }
    }

    // --- evaluator loop -------------------------------------------------

    /// Runs until `work` is drained back down to `base_len`. Used both by
    /// `run()` (`base_len == 0`) and by every combinator that needs to
    /// evaluate a quotation argument (`dip`, `each`, `times`, `if`, ...).
    pub fn run_until(&mut self, base_len: usize) -> Result<()> {
        while self.work.len() > base_len {
            let v = self.work.pop().expect("checked non-empty above");
            match self.step(v) {
                Ok(()) => {}
                Err(e) if e.message == RESUMED_ELSEWHERE => continue,
                Err(e) => {
                    if e.is_fatal() {
                        return Err(e);
                    }
                    match self.cont.pop() {
                        Some(handler) => {
                            if !matches!(e.kind, ErrorKind::Throw | ErrorKind::UserThrow) {
                                self.stack.push(Value::Int(e.kind as i64));
                            }
                            self.work.push(handler);
                            if self.work.len() < base_len {
                                return Err(VmError::new(ErrorKind::Break, RESUMED_ELSEWHERE));
                            }
                        }
                        None => return Err(e),
                    }
                }
            }
        }
        Ok(())
    }

    pub fn run(&mut self) -> Result<()> {
        self.run_until(0)
    }

    /// Evaluates a single quotation to completion before returning,
    /// sharing `work`/`cont`/`stack` with the rest of the VM (so
    /// `trycatch` installed outside this call still works, SPEC_FULL §9 /
    /// DESIGN.md). Used by every combinator.
    pub fn eval_quotation(&mut self, q: Value) -> Result<()> {
        let base = self.work.len();
        self.work.push(q);
        self.run_until(base)
    }

    pub fn eval_code_items(&mut self, items: &[Value]) -> Result<()> {
        self.eval_quotation(Value::code(items.to_vec()))
    }

    /// Dispatches exactly one popped `work` item (SPEC_FULL §4.7).
    fn step(&mut self, v: Value) -> Result<()> {
        match v {
            Value::Opcode(idx) => {
                let op = Op::from_index(idx)
                    .ok_or_else(|| VmError::new(ErrorKind::BadOp, format!("no such opcode {idx}")))?;
                crate::ops::dispatch(self, op)
            }
            Value::Ident(name, depth) if depth > 0 => {
                self.stack.push(Value::Ident(name, depth - 1));
                Ok(())
            }
            Value::Ident(name, _) => self.resolve_and_dispatch(name.as_str()),
            Value::String(_) => {
                self.stack.push(v);
                Ok(())
            }
            Value::Bytecode(_) => {
                Err(VmError::new(ErrorKind::NotImplemented, "bytecode values are not implemented"))
            }
            Value::Code(c) => self.step_code_head(c),
            Value::List(_) => {
                self.stack.push(v);
                Ok(())
            }
            Value::File(f) => self.step_file(f),
            Value::Vm(sub) => {
                let result = sub.run_to_completion()?;
                self.stack.push(result);
                Ok(())
            }
            other => {
                self.stack.push(other);
                Ok(())
            }
        }
    }

    /// Pops and dispatches one element off a *bare* code value's own body,
    /// pushing the (now one-shorter) remainder back onto `work` so the
    /// outer loop keeps draining it (`original_source/src/vm.c`'s
    /// `code_return:` loop). A quotation reached this way iterates; the
    /// distinction from `step_code_element` below is what makes a bare
    /// `[1 2 +]` on `work` run while the very same value, met as an
    /// *element* of some enclosing body (e.g. the `[2 *]` argument to
    /// `dip`), is pushed as a literal instead. See `step_code_element`.
    fn step_code_head(&mut self, mut c: concat_core::ListView) -> Result<()> {
        let Some(head) = c.lpop() else { return Ok(()) };
        if !c.is_empty() {
            self.work.push(Value::Code(c));
        }
        self.step_code_element(head)
    }

    /// Dispatches one value popped from the body of a code value that is
    /// already being iterated (as opposed to `step`, which dispatches a
    /// bare `work` item). Opcodes still fire and idents still resolve,
    /// but a nested `List` or `Code` element is pushed to the data stack
    /// as-is rather than unwrapped, matching `original_source/src/vm.c`'s
    /// inner dispatch (`_LST_TAG: PUSH(t);`, no further type check). Files
    /// follow the same rule: a bare file on `work` reads itself line by
    /// line, but one reached as an element of a quotation is just pushed
    /// (`original_source/src/vm.c`, `TYPE_FILE` comment in the inner loop).
    fn step_code_element(&mut self, v: Value) -> Result<()> {
        match v {
            Value::Opcode(idx) => {
                let op = Op::from_index(idx)
                    .ok_or_else(|| VmError::new(ErrorKind::BadOp, format!("no such opcode {idx}")))?;
                crate::ops::dispatch(self, op)
            }
            Value::Ident(name, depth) if depth > 0 => {
                self.stack.push(Value::Ident(name, depth - 1));
                Ok(())
            }
            Value::Ident(name, _) => self.resolve_and_dispatch(name.as_str()),
            Value::Bytecode(_) => {
                Err(VmError::new(ErrorKind::NotImplemented, "bytecode values are not implemented"))
            }
            Value::Vm(sub) => {
                let result = sub.run_to_completion()?;
                self.stack.push(result);
                Ok(())
            }
            other => {
                self.stack.push(other);
                Ok(())
            }
        }
    }

    fn resolve_and_dispatch(&mut self, name: &str) -> Result<()> {
        let binding = self.dict.lookup(name).cloned().ok_or_else(|| VmError::undefined(name))?;
        match binding {
            Value::Opcode(idx) => {
                let op = Op::from_index(idx)
                    .ok_or_else(|| VmError::new(ErrorKind::BadOp, format!("no such opcode {idx}")))?;
                crate::ops::dispatch(self, op)
            }
            other => {
                self.work.push(other);
                Ok(())
            }
        }
    }

    fn step_file(&mut self, f: std::sync::Arc<dyn concat_core::FileHandle>) -> Result<()> {
        match f.read_line() {
            Ok(Some(line)) => {
                // File stays "in place" underneath whatever this line
                // parsed to, so the parsed code runs to completion first
                // and control returns here to read the next line.
                self.work.push(Value::File(f));
                if let Some(code) = self.reader.feed_line(&line)? {
                    self.work.push(code);
                }
                Ok(())
            }
            Ok(None) => Ok(()), // EOF: file value is dropped
            Err(e) => Err(VmError::new(ErrorKind::IoError, e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_src(src: &str) -> Vm {
        let mut vm = Vm::new();
        let code = crate::parser::parse(src).unwrap();
        vm.work.push(code);
        vm.run().unwrap();
        vm
    }

    #[test]
    fn scenario_1_addition() {
        let vm = run_src("1 2 +");
        assert_eq!(vm.stack, vec![Value::Int(3)]);
    }

    #[test]
    fn scenario_2_if() {
        let vm = run_src("3 [2 *] [1 +] if");
        assert_eq!(vm.stack, vec![Value::Int(6)]);
    }

    #[test]
    fn scenario_4_string_cat() {
        let vm = run_src(r#""hello" " " "world" cat cat"#);
        assert_eq!(vm.stack, vec![Value::string("hello world")]);
    }

    #[test]
    fn scenario_6_trycatch() {
        let vm = run_src(r#"[ 1 0 / ] [ pop "caught" ] trycatch"#);
        assert_eq!(vm.stack, vec![Value::string("caught")]);
    }

    #[test]
    fn law_dup_pop_is_identity() {
        let vm = run_src("42 dup pop");
        assert_eq!(vm.stack, vec![Value::Int(42)]);
    }

    #[test]
    fn law_swap_swap_is_identity() {
        let vm = run_src("1 2 swap swap");
        assert_eq!(vm.stack, vec![Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn undefined_identifier_raises() {
        let mut vm = Vm::new();
        let code = crate::parser::parse("totally_unbound_name").unwrap();
        vm.work.push(code);
        let err = vm.run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::Undefined);
    }
}
