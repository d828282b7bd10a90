//! The initial dictionary (SPEC_FULL §6.3): every opcode bound under its
//! printable name, the numeric constants, and the handful of standard words
//! that are genuinely just sugar over core ops rather than their own
//! primitive (`map`/`filter`/`cleave`/`spread`/`bi`/`tri`/`linrec`/`binrec`
//! are native, see `combinator_ops`, because they're the *composable*
//! standard quotations; `inc` has no such justification, so it stays a
//! literal one-line quotation).

use crate::opcode::Op;
use concat_core::{Dict, Value};

fn quotation(src: &str) -> Value {
    match crate::parser::parse(src).expect("stdlib quotation source must parse") {
        Value::Code(top) => top.as_slice()[0].clone(),
        other => panic!("stdlib quotation {src:?} did not parse to a single top-level item: {other:?}"),
    }
}

pub fn initial_dict() -> Dict {
    let mut dict = Dict::new();
    for op in Op::all() {
        dict.put(op.name(), Value::Opcode(op.index()));
    }

    dict.put("true", Value::Int(1));
    dict.put("false", Value::Int(0));
    dict.put("pi", Value::Float(std::f64::consts::PI));
    dict.put("e", Value::Float(std::f64::consts::E));

    // `inc`: used by SPEC_FULL's own `while` worked example but not itself
    // an opcode in either the original table or this port's.
    dict.put("inc", quotation("[1 +]"));

    dict
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::Vm;

    fn run_src(src: &str) -> Vm {
        let mut vm = Vm::new();
        let code = crate::parser::parse(src).unwrap();
        vm.work.push(code);
        vm.run().unwrap();
        vm
    }

    #[test]
    fn every_opcode_name_resolves_to_itself() {
        let dict = initial_dict();
        for op in Op::all() {
            assert_eq!(dict.lookup(op.name()), Some(&Value::Opcode(op.index())));
        }
    }

    #[test]
    fn constants_are_bound() {
        let vm = run_src("true false");
        assert_eq!(vm.stack, vec![Value::Int(1), Value::Int(0)]);
    }

    #[test]
    fn inc_increments() {
        let vm = run_src("41 inc");
        assert_eq!(vm.stack, vec![Value::Int(42)]);
    }

    #[test]
    fn while_with_inc_and_dot_counts_up() {
        // SPEC_FULL §8.3 scenario 5, minus asserting on stdout.
        let vm = run_src("0 [ dup 10 < ] [ dup . inc ] while pop");
        assert_eq!(vm.stack, Vec::<Value>::new());
    }
}
