//! The tagged value (SPEC_FULL §3.1/§4.1).
//!
//! A conforming implementation may use a wider tagged-union representation
//! instead of literal NaN-boxing at some performance cost (SPEC_FULL §9);
//! this is that representation. Every variant here corresponds to one
//! `Valstruct` tag from the spec: `Opcode`, small `Int`, `Float` (the
//! inverse-NaN-boxed double collapses to a plain `f64` once we're not
//! bit-packing), `String`/`Ident`/`Bytecode` (string-buffer view),
//! `List`/`Code` (list-buffer view), `Dict`, `Ref`, `File`, `Fd`, `Vm`.
//!
//! `Value` intentionally has no `Bool` tag: SPEC_FULL §6.3 defines `true`/
//! `false` as the integer constants `1`/`0`, and `as_bool` is a predicate
//! over the existing types (§4.1), not a tenth type of its own.

use crate::dict::Dict;
use crate::error::{ErrorKind, VmError};
use crate::listbuf::ListView;
use crate::refcell::RefCell;
use crate::strbuf::StrView;
use std::fmt;
use std::sync::Arc;

/// State exposed by a sub-VM handle to generic code in `concat-core` that
/// doesn't know about the evaluator (SPEC_FULL §3.5/§4.8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Stopped,
    Running,
    Finished,
}

/// Trait boundary so `concat-core::Value` can hold a sub-VM without
/// depending on `concat-runtime`'s evaluator. `concat-runtime` provides the
/// concrete implementation.
pub trait VmHandle: fmt::Debug + Send + Sync {
    fn state(&self) -> VmState;
    /// Runs the sub-VM to completion, returning its final data stack or
    /// propagating whatever error it raised (SPEC_FULL §4.8).
    fn run_to_completion(&self) -> Result<Value, VmError>;
    /// Spawns the sub-VM on its own green-thread strand (`vm.thread`).
    fn spawn(self: Arc<Self>) -> Result<(), VmError>;
    /// Joins a previously spawned strand (`thread.wait`).
    fn join(&self) -> Result<Value, VmError>;
    fn stack(&self) -> Value;
    fn wstack(&self) -> Value;
    fn set_stack(&self, v: Value);
    fn set_wstack(&self, v: Value);
}

/// A line-oriented file handle (`File` tag). `concat-runtime` supplies
/// concrete handles for real files and the stdin/stdout/stderr singletons.
pub trait FileHandle: fmt::Debug + Send + Sync {
    fn read_line(&self) -> std::io::Result<Option<String>>;
    fn write(&self, data: &[u8]) -> std::io::Result<usize>;
    fn seek(&self, pos: u64) -> std::io::Result<u64>;
    fn fpos(&self) -> std::io::Result<u64>;
    fn close(&self) -> std::io::Result<()>;
}

#[derive(Clone)]
pub enum Value {
    /// Index into the opcode table; `N_OPS` is fixed by `concat-runtime`.
    Opcode(u32),
    Int(i64),
    Float(f64),
    /// Plain string data, pushes itself.
    String(StrView),
    /// An identifier; `escape` is the number of leading backslashes still
    /// to be stripped (0 = an unescaped identifier sitting as data, e.g.
    /// produced by `toident`, not currently being resolved).
    Ident(StrView, u32),
    /// Bytecode literal. Evaluating the `bytecode` opcode against one
    /// always raises `NotImplemented` (SPEC_FULL §9); this tag exists only
    /// so parsing/printing round-trips are total.
    Bytecode(StrView),
    /// A data list: pushes itself.
    List(ListView),
    /// A quotation: tail-call-iterated when evaluated.
    Code(ListView),
    Dict(Dict),
    Ref(Arc<RefCell>),
    File(Arc<dyn FileHandle>),
    Fd(i32),
    Vm(Arc<dyn VmHandle>),
}

impl Value {
    pub fn empty_string() -> Value {
        Value::String(StrView::empty())
    }

    pub fn string(s: impl AsRef<str>) -> Value {
        Value::String(StrView::from_str(s.as_ref()))
    }

    pub fn empty_list() -> Value {
        Value::List(ListView::empty())
    }

    pub fn empty_code() -> Value {
        Value::Code(ListView::empty())
    }

    pub fn list(vals: Vec<Value>) -> Value {
        Value::List(ListView::from_vals(vals))
    }

    pub fn code(vals: Vec<Value>) -> Value {
        Value::Code(ListView::from_vals(vals))
    }

    pub fn bool(b: bool) -> Value {
        Value::Int(if b { 1 } else { 0 })
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Opcode(_) => "opcode",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Ident(..) => "ident",
            Value::Bytecode(_) => "bytecode",
            Value::List(_) => "list",
            Value::Code(_) => "code",
            Value::Dict(_) => "dict",
            Value::Ref(_) => "ref",
            Value::File(_) => "file",
            Value::Fd(_) => "fd",
            Value::Vm(_) => "vm",
        }
    }

    /// `as_bool` (SPEC_FULL §4.1): nonzero int/float, non-empty
    /// string/list/code; everything else (including the empty string/list)
    /// is false.
    pub fn as_bool(&self) -> bool {
        match self {
            Value::Int(n) => *n != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(l) | Value::Code(l) => !l.is_empty(),
            Value::Bytecode(s) => !s.is_empty(),
            _ => true,
        }
    }

    /// `ispush` (SPEC_FULL §4.1): true iff evaluating `v` merely pushes
    /// `v`. Code, identifiers, opcodes, files, fds, dicts, refs and sub-VMs
    /// are not push values.
    pub fn is_push(&self) -> bool {
        matches!(self, Value::Int(_) | Value::Float(_) | Value::String(_) | Value::List(_))
    }

    /// `protect` (SPEC_FULL §4.1): a value whose evaluation yields the
    /// original `v`. Push values pass through unchanged. An identifier
    /// gains one more escape layer. Everything else (code included) is
    /// wrapped `[v] first`: quote it inside a one-element list literal,
    /// then `first` pulls it back out without ever evaluating it.
    pub fn protect(self) -> Value {
        match self {
            push if push.is_push() => push,
            Value::Ident(s, depth) => Value::Ident(s, depth + 1),
            other => Value::code(vec![Value::list(vec![other]), Value::Opcode(FIRST_OPCODE)]),
        }
    }

    pub fn compare(&self, other: &Value) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        match (self, other) {
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Int(a), Value::Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::Float(a), Value::Int(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Value::Float(a), Value::Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Value::String(a), Value::String(b)) => a.as_bytes().cmp(b.as_bytes()),
            (Value::List(a), Value::List(b)) | (Value::Code(a), Value::Code(b)) => {
                let (sa, sb) = (a.as_slice(), b.as_slice());
                sa.iter()
                    .zip(sb.iter())
                    .map(|(x, y)| x.compare(y))
                    .find(|o| *o != Ordering::Equal)
                    .unwrap_or_else(|| sa.len().cmp(&sb.len()))
            }
            // Cross-type / unrelated non-numeric comparison is
            // implementation-defined (SPEC_FULL §9); used only within
            // homogeneous containers, so any consistent order suffices.
            _ => Ordering::Equal,
        }
    }

    pub fn type_error(&self, expected: &str) -> VmError {
        VmError::new(
            ErrorKind::BadType,
            format!("expected {expected}, got {}", self.type_name()),
        )
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Opcode(a), Value::Opcode(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Ident(a, da), Value::Ident(b, db)) => a == b && da == db,
            (Value::Bytecode(a), Value::Bytecode(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Code(a), Value::Code(b)) => a == b,
            (Value::Dict(a), Value::Dict(b)) => a == b,
            (Value::Ref(a), Value::Ref(b)) => Arc::ptr_eq(a, b),
            (Value::File(a), Value::File(b)) => Arc::ptr_eq(a, b),
            (Value::Fd(a), Value::Fd(b)) => a == b,
            (Value::Vm(a), Value::Vm(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Opcode(n) => write!(f, "Opcode({n})"),
            Value::Int(n) => write!(f, "Int({n})"),
            Value::Float(n) => write!(f, "Float({n})"),
            Value::String(s) => write!(f, "String({:?})", s.as_str()),
            Value::Ident(s, d) => write!(f, "Ident({}{})", "\\".repeat(*d as usize), s.as_str()),
            Value::Bytecode(_) => write!(f, "Bytecode(..)"),
            Value::List(l) => write!(f, "List({:?})", l.as_slice()),
            Value::Code(c) => write!(f, "Code({:?})", c.as_slice()),
            Value::Dict(_) => write!(f, "Dict(..)"),
            Value::Ref(_) => write!(f, "Ref(..)"),
            Value::File(_) => write!(f, "File(..)"),
            Value::Fd(n) => write!(f, "Fd({n})"),
            Value::Vm(v) => write!(f, "Vm({:?})", v.state()),
        }
    }
}

// Safety: every variant's payload is itself `Send + Sync` (`Arc<T>` where
// `T: Send + Sync`, or a `Copy` scalar). No variant uses any non-atomic
// interior mutability, so sharing a `Value` across strands is sound.
unsafe impl Send for Value {}
unsafe impl Sync for Value {}

/// The `first` opcode's table index, used by `protect` to build
/// `[v] first`-shaped wrappers without depending on `concat-runtime`'s
/// opcode table. `concat-runtime::opcode` asserts this matches its own
/// assignment in a test.
pub const FIRST_OPCODE: u32 = 0;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn as_bool_matches_spec_rules() {
        assert!(!Value::Int(0).as_bool());
        assert!(Value::Int(-1).as_bool());
        assert!(!Value::empty_string().as_bool());
        assert!(Value::string("x").as_bool());
        assert!(!Value::empty_list().as_bool());
        assert!(Value::list(vec![Value::Int(1)]).as_bool());
    }

    #[test]
    fn ispush_excludes_code_and_idents() {
        assert!(Value::Int(1).is_push());
        assert!(Value::string("x").is_push());
        assert!(Value::list(vec![]).is_push());
        assert!(!Value::code(vec![]).is_push());
        assert!(!Value::Ident(StrView::from_str("x"), 0).is_push());
        assert!(!Value::Opcode(0).is_push());
    }

    #[test]
    fn protect_push_values_pass_through() {
        let v = Value::Int(42);
        assert_eq!(v.clone().protect(), v);
    }

    #[test]
    fn protect_ident_adds_escape_layer() {
        let v = Value::Ident(StrView::from_str("foo"), 1);
        match v.protect() {
            Value::Ident(_, depth) => assert_eq!(depth, 2),
            other => panic!("expected Ident, got {other:?}"),
        }
    }
}
