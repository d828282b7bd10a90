//! Stack-shuffling primitives (SPEC_FULL §4.7/§6.3).

use crate::vm::Vm;
use concat_core::error::{ErrorKind, VmError};
use concat_core::{Result, Value};

pub fn pop(vm: &mut Vm) -> Result<()> {
    vm.pop()?;
    Ok(())
}

pub fn dup(vm: &mut Vm) -> Result<()> {
    let v = vm.peek()?.clone();
    vm.push(v);
    Ok(())
}

pub fn swap(vm: &mut Vm) -> Result<()> {
    let a = vm.pop()?;
    let b = vm.pop()?;
    vm.push(a);
    vm.push(b);
    Ok(())
}

pub fn dup2(vm: &mut Vm) -> Result<()> {
    let len = vm.stack.len();
    if len < 2 {
        return Err(VmError::empty("dup2 needs two items"));
    }
    let a = vm.stack[len - 2].clone();
    let b = vm.stack[len - 1].clone();
    vm.push(a);
    vm.push(b);
    Ok(())
}

pub fn dup3(vm: &mut Vm) -> Result<()> {
    let len = vm.stack.len();
    if len < 3 {
        return Err(VmError::empty("dup3 needs three items"));
    }
    let slice = vm.stack[len - 3..].to_vec();
    vm.stack.extend(slice);
    Ok(())
}

/// `dupn`: `(x1..xn n -- x1..xn x1..xn)`.
pub fn dupn(vm: &mut Vm) -> Result<()> {
    let n = vm.pop_int()? as usize;
    if vm.stack.len() < n {
        return Err(VmError::empty("dupn: not enough items"));
    }
    let start = vm.stack.len() - n;
    let slice = vm.stack[start..].to_vec();
    vm.stack.extend(slice);
    Ok(())
}

/// `dign`: pulls the item `n` deep (0 = top) out of the stack and puts it
/// on top, closing the gap it left behind.
pub fn dign(vm: &mut Vm) -> Result<()> {
    let n = vm.pop_int()? as usize;
    let len = vm.stack.len();
    if n >= len {
        return Err(VmError::empty("dign: not enough items"));
    }
    let idx = len - 1 - n;
    let v = vm.stack.remove(idx);
    vm.push(v);
    Ok(())
}

/// `buryn`: inverse of `dign`. Takes the top item and reinserts it `n`
/// positions down from the (new) top.
pub fn buryn(vm: &mut Vm) -> Result<()> {
    let n = vm.pop_int()? as usize;
    let v = vm.pop()?;
    let len = vm.stack.len();
    if n > len {
        return Err(VmError::empty("buryn: not enough items"));
    }
    vm.stack.insert(len - n, v);
    Ok(())
}

/// `flipn`: reverses the order of the top `n` items in place.
pub fn flipn(vm: &mut Vm) -> Result<()> {
    let n = vm.pop_int()? as usize;
    let len = vm.stack.len();
    if n > len {
        return Err(VmError::empty("flipn: not enough items"));
    }
    vm.stack[len - n..].reverse();
    Ok(())
}

/// `popd`: `(a b -- b)`.
pub fn popd(vm: &mut Vm) -> Result<()> {
    let b = vm.pop()?;
    vm.pop()?;
    vm.push(b);
    Ok(())
}

/// `dupd`: `(a b -- a a b)`.
pub fn dupd(vm: &mut Vm) -> Result<()> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    vm.push(a.clone());
    vm.push(a);
    vm.push(b);
    Ok(())
}

/// `swapd`: `(a b c -- b a c)`.
pub fn swapd(vm: &mut Vm) -> Result<()> {
    let c = vm.pop()?;
    let b = vm.pop()?;
    let a = vm.pop()?;
    vm.push(b);
    vm.push(a);
    vm.push(c);
    Ok(())
}

pub fn dig2(vm: &mut Vm) -> Result<()> {
    vm.push(Value::Int(2));
    dign(vm)
}

pub fn dig3(vm: &mut Vm) -> Result<()> {
    vm.push(Value::Int(3));
    dign(vm)
}

pub fn bury2(vm: &mut Vm) -> Result<()> {
    vm.push(Value::Int(2));
    buryn(vm)
}

pub fn bury3(vm: &mut Vm) -> Result<()> {
    vm.push(Value::Int(3));
    buryn(vm)
}

pub fn flip3(vm: &mut Vm) -> Result<()> {
    vm.push(Value::Int(3));
    flipn(vm)
}

pub fn flip4(vm: &mut Vm) -> Result<()> {
    vm.push(Value::Int(4));
    flipn(vm)
}

pub fn first(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    let first = match &v {
        Value::List(l) | Value::Code(l) => {
            l.ith(0).cloned().ok_or_else(|| VmError::new(ErrorKind::BadArgs, "first: empty sequence"))?
        }
        Value::String(s) => {
            if s.is_empty() {
                return Err(VmError::new(ErrorKind::BadArgs, "first: empty string"));
            }
            Value::String(s.sublist(0, 1))
        }
        other => return Err(other.type_error("list, code or string")),
    };
    vm.push(first);
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
    fn pop_discards_the_top() {
        let vm = run_src("1 2 pop");
        assert_eq!(vm.stack, vec![Value::Int(1)]);
    }

    #[test]
    fn dup_duplicates_the_top() {
        let vm = run_src("1 dup");
        assert_eq!(vm.stack, vec![Value::Int(1), Value::Int(1)]);
    }

    #[test]
    fn swap_exchanges_the_top_two() {
        let vm = run_src("1 2 swap");
        assert_eq!(vm.stack, vec![Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn dup2_and_dup3_duplicate_the_top_group() {
        let vm = run_src("1 2 dup2");
        assert_eq!(vm.stack, vec![Value::Int(1), Value::Int(2), Value::Int(1), Value::Int(2)]);
        let vm = run_src("1 2 3 dup3");
        assert_eq!(
            vm.stack,
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn dupn_duplicates_the_top_n_items() {
        let vm = run_src("1 2 3 3 dupn");
        assert_eq!(
            vm.stack,
            vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(1), Value::Int(2), Value::Int(3)]
        );
    }

    #[test]
    fn dign_pulls_an_item_to_the_top() {
        let vm = run_src("1 2 3 2 dign");
        assert_eq!(vm.stack, vec![Value::Int(2), Value::Int(3), Value::Int(1)]);
    }

    #[test]
    fn buryn_reinserts_the_top_item_n_deep() {
        let vm = run_src("1 2 3 2 buryn");
        assert_eq!(vm.stack, vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
    }

    #[test]
    fn dign_then_buryn_is_identity() {
        let vm = run_src("1 2 3 4 2 dign 2 buryn");
        assert_eq!(vm.stack, vec![Value::Int(1), Value::Int(2), Value::Int(3), Value::Int(4)]);
    }

    #[test]
    fn flipn_reverses_the_top_n_items() {
        let vm = run_src("1 2 3 4 3 flipn");
        assert_eq!(vm.stack, vec![Value::Int(1), Value::Int(4), Value::Int(3), Value::Int(2)]);
    }

    #[test]
    fn popd_dupd_swapd_operate_one_level_down() {
        let vm = run_src("1 2 popd");
        assert_eq!(vm.stack, vec![Value::Int(2)]);
        let vm = run_src("1 2 dupd");
        assert_eq!(vm.stack, vec![Value::Int(1), Value::Int(1), Value::Int(2)]);
        let vm = run_src("1 2 3 swapd");
        assert_eq!(vm.stack, vec![Value::Int(2), Value::Int(1), Value::Int(3)]);
    }

    #[test]
    fn dig2_dig3_bury2_bury3_are_fixed_arity_sugar() {
        let vm = run_src("1 2 3 dig2");
        assert_eq!(vm.stack, vec![Value::Int(2), Value::Int(3), Value::Int(1)]);
        let vm = run_src("1 2 3 4 dig3");
        assert_eq!(vm.stack, vec![Value::Int(2), Value::Int(3), Value::Int(4), Value::Int(1)]);
        let vm = run_src("1 2 3 bury2");
        assert_eq!(vm.stack, vec![Value::Int(3), Value::Int(1), Value::Int(2)]);
        let vm = run_src("1 2 3 4 bury3");
        assert_eq!(vm.stack, vec![Value::Int(4), Value::Int(1), Value::Int(2), Value::Int(3)]);
    }

    #[test]
    fn flip3_flip4_reverse_fixed_windows() {
        let vm = run_src("1 2 3 flip3");
        assert_eq!(vm.stack, vec![Value::Int(3), Value::Int(2), Value::Int(1)]);
        let vm = run_src("1 2 3 4 flip4");
        assert_eq!(vm.stack, vec![Value::Int(4), Value::Int(3), Value::Int(2), Value::Int(1)]);
    }

    #[test]
    fn first_on_a_list_or_string_peeks_the_head_element() {
        let vm = run_src(r#"[1 2 3] first "abc" first"#);
        assert_eq!(vm.stack, vec![Value::Int(1), Value::string("a")]);
    }

    #[test]
    fn first_on_empty_is_bad_args() {
        let mut vm = Vm::new();
        let code = parse("[] first").unwrap();
        vm.work.push(code);
        let err = vm.run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadArgs);
    }

    #[test]
    fn dup_on_empty_stack_is_an_empty_error() {
        let mut vm = Vm::new();
        let err = dup(&mut vm).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Empty);
    }
}
