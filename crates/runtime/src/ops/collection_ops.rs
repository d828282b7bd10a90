//! Sequence operations shared by `List`/`Code`/`String` (SPEC_FULL §4.7/§6.3).
//!
//! Open Question resolutions (recorded in DESIGN.md): `empty` constructs a
//! fresh empty list rather than testing emptiness (`size` already covers
//! that via `size 0 =`); `small` has no distinguishable representation in
//! this port and is therefore an identity no-op; `rappend` is Scheme's
//! "append-reverse" (`reverse(b) ++ a`), a common accumulator-reversal
//! utility in this family of languages; `size`/`lpop`/`rpop`/`first`/`last`
//! consume their sequence argument, letting callers `dup` first when they
//! want to keep it.

use crate::vm::Vm;
use concat_core::error::{ErrorKind, VmError};
use concat_core::{ListView, Result, StrView, Value};

pub fn empty(vm: &mut Vm) -> Result<()> {
    vm.push(Value::empty_list());
    Ok(())
}

pub fn small(vm: &mut Vm) -> Result<()> {
    let _ = vm; // identity: no small-buffer optimization exists in this representation
    Ok(())
}

pub fn size(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    let n = match &v {
        Value::List(l) | Value::Code(l) => l.len(),
        Value::String(s) | Value::Bytecode(s) => s.len(),
        other => return Err(other.type_error("sequence")),
    };
    vm.push(Value::Int(n as i64));
    Ok(())
}

pub fn lpop(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::List(mut l) => {
            let elem = l.lpop().ok_or_else(|| VmError::new(ErrorKind::BadArgs, "lpop: empty list"))?;
            vm.push(Value::List(l));
            vm.push(elem);
        }
        Value::Code(mut l) => {
            let elem = l.lpop().ok_or_else(|| VmError::new(ErrorKind::BadArgs, "lpop: empty code"))?;
            vm.push(Value::Code(l));
            vm.push(elem);
        }
        Value::String(mut s) => {
            let b = s.lpop().ok_or_else(|| VmError::new(ErrorKind::BadArgs, "lpop: empty string"))?;
            vm.push(Value::String(s));
            vm.push(Value::String(StrView::from_bytes(vec![b])));
        }
        other => return Err(other.type_error("sequence")),
    }
    Ok(())
}

pub fn rpop(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::List(mut l) => {
            let elem = l.rpop().ok_or_else(|| VmError::new(ErrorKind::BadArgs, "rpop: empty list"))?;
            vm.push(Value::List(l));
            vm.push(elem);
        }
        Value::Code(mut l) => {
            let elem = l.rpop().ok_or_else(|| VmError::new(ErrorKind::BadArgs, "rpop: empty code"))?;
            vm.push(Value::Code(l));
            vm.push(elem);
        }
        Value::String(mut s) => {
            let b = s.rpop().ok_or_else(|| VmError::new(ErrorKind::BadArgs, "rpop: empty string"))?;
            vm.push(Value::String(s));
            vm.push(Value::String(StrView::from_bytes(vec![b])));
        }
        other => return Err(other.type_error("sequence")),
    }
    Ok(())
}

pub fn lpush(vm: &mut Vm) -> Result<()> {
    let seq = vm.pop()?;
    let elem = vm.pop()?;
    match seq {
        Value::List(mut l) => {
            l.lpush(elem);
            vm.push(Value::List(l));
        }
        Value::Code(mut l) => {
            l.lpush(elem);
            vm.push(Value::Code(l));
        }
        other => return Err(other.type_error("list or code")),
    }
    Ok(())
}

pub fn rpush(vm: &mut Vm) -> Result<()> {
    let seq = vm.pop()?;
    let elem = vm.pop()?;
    match seq {
        Value::List(mut l) => {
            l.rpush(elem);
            vm.push(Value::List(l));
        }
        Value::Code(mut l) => {
            l.rpush(elem);
            vm.push(Value::Code(l));
        }
        other => return Err(other.type_error("list or code")),
    }
    Ok(())
}

pub fn cat(vm: &mut Vm) -> Result<()> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    let result = match (a, b) {
        (Value::String(a), Value::String(b)) => Value::String(StrView::concat(&a, &b)),
        (Value::List(a), Value::List(b)) => Value::List(ListView::concat(&a, &b)),
        (Value::Code(a), Value::Code(b)) => Value::Code(ListView::concat(&a, &b)),
        (a, _) => return Err(a.type_error("matching sequence types")),
    };
    vm.push(result);
    Ok(())
}

/// `rappend`: `(a b -- c)` where `c = reverse(b) ++ a`, Scheme's
/// "append-reverse", used to reverse a list onto an accumulator in one pass.
pub fn rappend(vm: &mut Vm) -> Result<()> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    let (bv, is_code) = match &b {
        Value::List(l) => (l.as_slice().to_vec(), false),
        Value::Code(l) => (l.as_slice().to_vec(), true),
        other => return Err(other.type_error("list or code")),
    };
    let av = match &a {
        Value::List(l) if !is_code => l.as_slice().to_vec(),
        Value::Code(l) if is_code => l.as_slice().to_vec(),
        other => return Err(other.type_error("matching sequence types")),
    };
    let mut merged = bv;
    merged.reverse();
    merged.extend(av);
    vm.push(if is_code { Value::code(merged) } else { Value::list(merged) });
    Ok(())
}

pub fn splitn(vm: &mut Vm) -> Result<()> {
    let n = vm.pop_int()? as usize;
    match vm.pop()? {
        Value::List(l) => {
            let (head, tail) = l.split_at(n);
            vm.push(Value::List(head));
            vm.push(Value::List(tail));
        }
        Value::Code(l) => {
            let (head, tail) = l.split_at(n);
            vm.push(Value::Code(head));
            vm.push(Value::Code(tail));
        }
        Value::String(s) => {
            let (head, tail) = s.split_at(n);
            vm.push(Value::String(head));
            vm.push(Value::String(tail));
        }
        other => return Err(other.type_error("sequence")),
    }
    Ok(())
}

pub fn last(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    let elem = match &v {
        Value::List(l) | Value::Code(l) => {
            l.ith(l.len().saturating_sub(1)).cloned().ok_or_else(|| VmError::new(ErrorKind::BadArgs, "last: empty sequence"))?
        }
        Value::String(s) => {
            if s.is_empty() {
                return Err(VmError::new(ErrorKind::BadArgs, "last: empty string"));
            }
            Value::String(s.sublist(s.len() - 1, 1))
        }
        other => return Err(other.type_error("list, code or string")),
    };
    vm.push(elem);
    Ok(())
}

pub fn rest(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::List(l) => {
            let (_, tail) = l.split_at(1);
            vm.push(Value::List(tail));
        }
        Value::Code(l) => {
            let (_, tail) = l.split_at(1);
            vm.push(Value::Code(tail));
        }
        Value::String(s) => {
            let (_, tail) = s.split_at(1);
            vm.push(Value::String(tail));
        }
        other => return Err(other.type_error("sequence")),
    }
    Ok(())
}

pub fn nth(vm: &mut Vm) -> Result<()> {
    let i = vm.pop_int()? as usize;
    let v = vm.pop()?;
    let elem = match &v {
        Value::List(l) | Value::Code(l) => {
            l.ith(i).cloned().ok_or_else(|| VmError::new(ErrorKind::BadArgs, "nth: index out of range"))?
        }
        Value::String(s) => {
            if i >= s.len() {
                return Err(VmError::new(ErrorKind::BadArgs, "nth: index out of range"));
            }
            Value::String(s.sublist(i, 1))
        }
        other => return Err(other.type_error("sequence")),
    };
    vm.push(elem);
    Ok(())
}

/// `dnth`: drop the `i`-th element, pushing the shortened sequence.
pub fn dnth(vm: &mut Vm) -> Result<()> {
    let i = vm.pop_int()? as usize;
    match vm.pop()? {
        Value::List(l) => {
            if i >= l.len() {
                return Err(VmError::new(ErrorKind::BadArgs, "dnth: index out of range"));
            }
            let mut items = l.as_slice().to_vec();
            items.remove(i);
            vm.push(Value::list(items));
        }
        Value::Code(l) => {
            if i >= l.len() {
                return Err(VmError::new(ErrorKind::BadArgs, "dnth: index out of range"));
            }
            let mut items = l.as_slice().to_vec();
            items.remove(i);
            vm.push(Value::code(items));
        }
        other => return Err(other.type_error("list or code")),
    }
    Ok(())
}

pub fn setnth(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    let i = vm.pop_int()? as usize;
    match vm.pop()? {
        Value::List(mut l) => {
            if !l.setith(i, v) {
                return Err(VmError::new(ErrorKind::BadArgs, "setnth: index out of range"));
            }
            vm.push(Value::List(l));
        }
        Value::Code(mut l) => {
            if !l.setith(i, v) {
                return Err(VmError::new(ErrorKind::BadArgs, "setnth: index out of range"));
            }
            vm.push(Value::Code(l));
        }
        other => return Err(other.type_error("list or code")),
    }
    Ok(())
}

pub fn swapnth(vm: &mut Vm) -> Result<()> {
    let j = vm.pop_int()? as usize;
    let i = vm.pop_int()? as usize;
    match vm.pop()? {
        Value::List(l) => {
            let mut items = l.as_slice().to_vec();
            if i >= items.len() || j >= items.len() {
                return Err(VmError::new(ErrorKind::BadArgs, "swapnth: index out of range"));
            }
            items.swap(i, j);
            vm.push(Value::list(items));
        }
        Value::Code(l) => {
            let mut items = l.as_slice().to_vec();
            if i >= items.len() || j >= items.len() {
                return Err(VmError::new(ErrorKind::BadArgs, "swapnth: index out of range"));
            }
            items.swap(i, j);
            vm.push(Value::code(items));
        }
        other => return Err(other.type_error("list or code")),
    }
    Ok(())
}

pub fn sort(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::List(l) => {
            let mut items = l.as_slice().to_vec();
            items.sort_by(|a, b| a.compare(b));
            vm.push(Value::list(items));
        }
        other => return Err(other.type_error("list")),
    }
    Ok(())
}

pub fn rsort(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::List(l) => {
            let mut items = l.as_slice().to_vec();
            items.sort_by(|a, b| b.compare(a));
            vm.push(Value::list(items));
        }
        other => return Err(other.type_error("list")),
    }
    Ok(())
}

pub fn clearlist(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::List(_) => vm.push(Value::empty_list()),
        Value::Code(_) => vm.push(Value::empty_code()),
        other => return Err(other.type_error("list or code")),
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
    fn size_reports_length_and_consumes_its_argument() {
        let vm = run_src("[1 2 3] size");
        assert_eq!(vm.stack, vec![Value::Int(3)]);
    }

    #[test]
    fn lpop_rpop_split_ends_off_a_list() {
        let vm = run_src("[1 2 3] lpop");
        assert_eq!(vm.stack, vec![Value::list(vec![Value::Int(2), Value::Int(3)]), Value::Int(1)]);
        let vm = run_src("[1 2 3] rpop");
        assert_eq!(vm.stack, vec![Value::list(vec![Value::Int(1), Value::Int(2)]), Value::Int(3)]);
    }

    #[test]
    fn lpop_on_empty_list_is_bad_args() {
        let mut vm = Vm::new();
        let code = parse("[] lpop").unwrap();
        vm.work.push(code);
        let err = vm.run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadArgs);
    }

    #[test]
    fn lpush_rpush_add_at_either_end() {
        let vm = run_src("[2 3] 1 swap lpush [1 2] 3 swap rpush");
        assert_eq!(
            vm.stack,
            vec![
                Value::code(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
                Value::code(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
            ]
        );
    }

    #[test]
    fn cat_concatenates_matching_sequence_types() {
        let vm = run_src(r#"[1 2] [3 4] cat "ab" "cd" cat"#);
        assert_eq!(
            vm.stack,
            vec![Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]), Value::string("abcd")]
        );
    }

    #[test]
    fn rappend_reverses_b_onto_a() {
        let vm = run_src("[1 2] [3 4] rappend");
        assert_eq!(vm.stack, vec![Value::list(vec![Value::Int(4), Value::Int(3), Value::Int(1), Value::Int(2)])]);
    }

    #[test]
    fn splitn_divides_a_sequence_at_n() {
        let vm = run_src("[1 2 3 4] 2 splitn");
        assert_eq!(
            vm.stack,
            vec![Value::list(vec![Value::Int(1), Value::Int(2)]), Value::list(vec![Value::Int(3), Value::Int(4)])]
        );
    }

    #[test]
    fn nth_dnth_setnth_swapnth_index_into_a_list() {
        let vm = run_src("[1 2 3] 1 nth [1 2 3] 1 dnth [1 2 3] 1 99 setnth [1 2 3] 0 2 swapnth");
        assert_eq!(
            vm.stack,
            vec![
                Value::Int(2),
                Value::list(vec![Value::Int(1), Value::Int(3)]),
                Value::list(vec![Value::Int(1), Value::Int(99), Value::Int(3)]),
                Value::list(vec![Value::Int(3), Value::Int(2), Value::Int(1)]),
            ]
        );
    }

    #[test]
    fn out_of_range_nth_is_bad_args() {
        let mut vm = Vm::new();
        let code = parse("[1 2 3] 10 nth").unwrap();
        vm.work.push(code);
        let err = vm.run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadArgs);
    }

    #[test]
    fn last_and_rest_agree_with_a_manual_split() {
        let vm = run_src("[1 2 3] last [1 2 3] rest");
        assert_eq!(vm.stack, vec![Value::Int(3), Value::list(vec![Value::Int(2), Value::Int(3)])]);
    }

    #[test]
    fn sort_and_rsort_order_a_list() {
        let vm = run_src("[3 1 2] sort [3 1 2] rsort");
        assert_eq!(
            vm.stack,
            vec![
                Value::list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
                Value::list(vec![Value::Int(3), Value::Int(2), Value::Int(1)]),
            ]
        );
    }

    #[test]
    fn clearlist_empties_without_changing_the_type() {
        let vm = run_src("[1 2 3] clearlist");
        assert_eq!(vm.stack, vec![Value::empty_code()]);
    }

    #[test]
    fn empty_pushes_a_fresh_empty_list() {
        let vm = run_src("empty");
        assert_eq!(vm.stack, vec![Value::empty_list()]);
    }
}
