//! Arithmetic, comparison and bitwise operators (SPEC_FULL §4.7/§6.3, §B.G).
//!
//! Integer `/`/`%` truncate toward zero and raise `BadArgs` on division by
//! zero, matching `original_source/`'s integer division rather than C's
//! UB-on-INT_MIN-only-overflow corner case. Mixed int/float arithmetic
//! promotes to float. `and`/`or`/`xor`/`not` are boolean (`as_bool`-based),
//! distinct from the `b`-prefixed bitwise family.

use crate::vm::Vm;
use concat_core::error::{ErrorKind, VmError};
use concat_core::{Result, Value};

enum Num {
    Int(i64),
    Float(f64),
}

fn pop_num(vm: &mut Vm) -> Result<Num> {
    match vm.pop()? {
        Value::Int(n) => Ok(Num::Int(n)),
        Value::Float(f) => Ok(Num::Float(f)),
        other => Err(other.type_error("number")),
    }
}

fn push_num(vm: &mut Vm, n: Num) {
    vm.push(match n {
        Num::Int(n) => Value::Int(n),
        Num::Float(f) => Value::Float(f),
    });
}

fn binary(vm: &mut Vm, int_op: impl Fn(i64, i64) -> Result<i64>, float_op: impl Fn(f64, f64) -> f64) -> Result<()> {
    let b = pop_num(vm)?;
    let a = pop_num(vm)?;
    let result = match (a, b) {
        (Num::Int(a), Num::Int(b)) => Num::Int(int_op(a, b)?),
        (Num::Int(a), Num::Float(b)) => Num::Float(float_op(a as f64, b)),
        (Num::Float(a), Num::Int(b)) => Num::Float(float_op(a, b as f64)),
        (Num::Float(a), Num::Float(b)) => Num::Float(float_op(a, b)),
    };
    push_num(vm, result);
    Ok(())
}

pub fn add(vm: &mut Vm) -> Result<()> {
    binary(vm, |a, b| Ok(a.wrapping_add(b)), |a, b| a + b)
}

pub fn sub(vm: &mut Vm) -> Result<()> {
    binary(vm, |a, b| Ok(a.wrapping_sub(b)), |a, b| a - b)
}

pub fn mul(vm: &mut Vm) -> Result<()> {
    binary(vm, |a, b| Ok(a.wrapping_mul(b)), |a, b| a * b)
}

pub fn div(vm: &mut Vm) -> Result<()> {
    binary(
        vm,
        |a, b| {
            if b == 0 {
                Err(VmError::new(ErrorKind::BadArgs, "division by zero"))
            } else {
                Ok(a.wrapping_div(b)) // truncates toward zero
            }
        },
        |a, b| a / b,
    )
}

pub fn modulo(vm: &mut Vm) -> Result<()> {
    binary(
        vm,
        |a, b| {
            if b == 0 {
                Err(VmError::new(ErrorKind::BadArgs, "modulo by zero"))
            } else {
                Ok(a.wrapping_rem(b)) // sign follows the dividend, matching truncating division
            }
        },
        |a, b| a % b,
    )
}

pub fn neg(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::Int(n) => vm.push(Value::Int(-n)),
        Value::Float(f) => vm.push(Value::Float(-f)),
        other => return Err(other.type_error("number")),
    }
    Ok(())
}

pub fn abs(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::Int(n) => vm.push(Value::Int(n.abs())),
        Value::Float(f) => vm.push(Value::Float(f.abs())),
        other => return Err(other.type_error("number")),
    }
    Ok(())
}

pub fn min(vm: &mut Vm) -> Result<()> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    vm.push(if a.compare(&b).is_le() { a } else { b });
    Ok(())
}

pub fn max(vm: &mut Vm) -> Result<()> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    vm.push(if a.compare(&b).is_ge() { a } else { b });
    Ok(())
}

pub fn logand(vm: &mut Vm) -> Result<()> {
    let b = vm.pop()?.as_bool();
    let a = vm.pop()?.as_bool();
    vm.push(Value::bool(a && b));
    Ok(())
}

pub fn logor(vm: &mut Vm) -> Result<()> {
    let b = vm.pop()?.as_bool();
    let a = vm.pop()?.as_bool();
    vm.push(Value::bool(a || b));
    Ok(())
}

pub fn logxor(vm: &mut Vm) -> Result<()> {
    let b = vm.pop()?.as_bool();
    let a = vm.pop()?.as_bool();
    vm.push(Value::bool(a ^ b));
    Ok(())
}

pub fn lognot(vm: &mut Vm) -> Result<()> {
    let a = vm.pop()?.as_bool();
    vm.push(Value::bool(!a));
    Ok(())
}

fn compare(vm: &mut Vm, f: impl Fn(std::cmp::Ordering) -> bool) -> Result<()> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    vm.push(Value::bool(f(a.compare(&b))));
    Ok(())
}

pub fn lt(vm: &mut Vm) -> Result<()> {
    compare(vm, |o| o.is_lt())
}

pub fn lte(vm: &mut Vm) -> Result<()> {
    compare(vm, |o| o.is_le())
}

pub fn gt(vm: &mut Vm) -> Result<()> {
    compare(vm, |o| o.is_gt())
}

pub fn gte(vm: &mut Vm) -> Result<()> {
    compare(vm, |o| o.is_ge())
}

pub fn numeq(vm: &mut Vm) -> Result<()> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    vm.push(Value::bool(a == b));
    Ok(())
}

pub fn neq(vm: &mut Vm) -> Result<()> {
    let b = vm.pop()?;
    let a = vm.pop()?;
    vm.push(Value::bool(a != b));
    Ok(())
}

pub fn band(vm: &mut Vm) -> Result<()> {
    let b = vm.pop_int()?;
    let a = vm.pop_int()?;
    vm.push(Value::Int(a & b));
    Ok(())
}

pub fn bor(vm: &mut Vm) -> Result<()> {
    let b = vm.pop_int()?;
    let a = vm.pop_int()?;
    vm.push(Value::Int(a | b));
    Ok(())
}

pub fn bxor(vm: &mut Vm) -> Result<()> {
    let b = vm.pop_int()?;
    let a = vm.pop_int()?;
    vm.push(Value::Int(a ^ b));
    Ok(())
}

pub fn bnot(vm: &mut Vm) -> Result<()> {
    let a = vm.pop_int()?;
    vm.push(Value::Int(!a));
    Ok(())
}

pub fn shl(vm: &mut Vm) -> Result<()> {
    let n = vm.pop_int()?;
    let a = vm.pop_int()?;
    vm.push(Value::Int(a.wrapping_shl(n as u32)));
    Ok(())
}

pub fn shr(vm: &mut Vm) -> Result<()> {
    let n = vm.pop_int()?;
    let a = vm.pop_int()?;
    vm.push(Value::Int(a.wrapping_shr(n as u32)));
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
    fn int_add_sub_mul() {
        let vm = run_src("2 3 + 4 * 1 -");
        assert_eq!(vm.stack, vec![Value::Int(19)]);
    }

    #[test]
    fn mixed_int_float_promotes_to_float() {
        let vm = run_src("1 2.5 +");
        assert_eq!(vm.stack, vec![Value::Float(3.5)]);
    }

    #[test]
    fn int_div_and_mod_truncate_toward_zero() {
        let vm = run_src("-7 2 / -7 2 %");
        assert_eq!(vm.stack, vec![Value::Int(-3), Value::Int(-1)]);
    }

    #[test]
    fn div_by_zero_is_bad_args() {
        let mut vm = Vm::new();
        let code = parse("1 0 /").unwrap();
        vm.work.push(code);
        let err = vm.run().unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadArgs);
    }

    #[test]
    fn comparisons() {
        let vm = run_src("1 2 < 2 1 < 1 1 <=");
        assert_eq!(vm.stack, vec![Value::bool(true), Value::bool(false), Value::bool(true)]);
    }

    #[test]
    fn logand_logor_are_boolean_not_bitwise() {
        let vm = run_src("1 0 and 1 0 or");
        assert_eq!(vm.stack, vec![Value::bool(false), Value::bool(true)]);
    }

    #[test]
    fn bitwise_family_operates_on_ints() {
        let vm = run_src("6 3 band 6 3 bor 1 2 shl");
        assert_eq!(vm.stack, vec![Value::Int(2), Value::Int(7), Value::Int(4)]);
    }

    #[test]
    fn min_max_abs_neg() {
        let vm = run_src("3 5 min 3 5 max -4 abs 7 neg");
        assert_eq!(vm.stack, vec![Value::Int(3), Value::Int(5), Value::Int(4), Value::Int(-7)]);
    }
}
