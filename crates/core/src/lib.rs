//! Tagged value representation, CoW string/list buffers, scoped dictionary
//! and ref cell for the concat language core. See SPEC_FULL.md §3-4.

pub mod dict;
pub mod error;
pub mod listbuf;
pub mod refcell;
pub mod strbuf;
pub mod value;

pub use dict::Dict;
pub use error::{ErrorKind, Result, VmError};
pub use listbuf::{LstBuf, ListView};
pub use refcell::RefCell;
pub use strbuf::{StrBuf, StrView};
pub use value::{FileHandle, Value, VmHandle, VmState, FIRST_OPCODE};
