//! Primitive operator implementations, one module per family, plus the
//! `dispatch` table that routes a decoded `Op` to its handler (SPEC_FULL
//! §4.7/§6.3).

pub mod arith_ops;
pub mod collection_ops;
pub mod combinator_ops;
pub mod control_ops;
pub mod conv_ops;
pub mod dict_ops;
pub mod io_ops;
pub mod ref_ops;
pub mod stack_ops;
pub mod vm_ops;

use crate::opcode::Op;
use crate::vm::Vm;
use concat_core::error::{ErrorKind, VmError};
use concat_core::Result;

pub fn dispatch(vm: &mut Vm, op: Op) -> Result<()> {
    match op {
        Op::First => stack_ops::first(vm),
        Op::Pop => stack_ops::pop(vm),
        Op::Dup => stack_ops::dup(vm),
        Op::Swap => stack_ops::swap(vm),
        Op::Dup2 => stack_ops::dup2(vm),
        Op::Dup3 => stack_ops::dup3(vm),
        Op::Dupn => stack_ops::dupn(vm),
        Op::Dign => stack_ops::dign(vm),
        Op::Buryn => stack_ops::buryn(vm),
        Op::Flipn => stack_ops::flipn(vm),
        Op::Popd => stack_ops::popd(vm),
        Op::Dupd => stack_ops::dupd(vm),
        Op::Swapd => stack_ops::swapd(vm),
        Op::Dig2 => stack_ops::dig2(vm),
        Op::Dig3 => stack_ops::dig3(vm),
        Op::Bury2 => stack_ops::bury2(vm),
        Op::Bury3 => stack_ops::bury3(vm),
        Op::Flip3 => stack_ops::flip3(vm),
        Op::Flip4 => stack_ops::flip4(vm),

        Op::Empty => collection_ops::empty(vm),
        Op::Small => collection_ops::small(vm),
        Op::Size => collection_ops::size(vm),
        Op::Lpop => collection_ops::lpop(vm),
        Op::Lpush => collection_ops::lpush(vm),
        Op::Rpop => collection_ops::rpop(vm),
        Op::Rpush => collection_ops::rpush(vm),
        Op::Cat => collection_ops::cat(vm),
        Op::Rappend => collection_ops::rappend(vm),
        Op::Splitn => collection_ops::splitn(vm),
        Op::Last => collection_ops::last(vm),
        Op::Rest => collection_ops::rest(vm),
        Op::Nth => collection_ops::nth(vm),
        Op::Dnth => collection_ops::dnth(vm),
        Op::Setnth => collection_ops::setnth(vm),
        Op::Swapnth => collection_ops::swapnth(vm),
        Op::Sort => collection_ops::sort(vm),
        Op::Rsort => collection_ops::rsort(vm),
        Op::Clearlist => collection_ops::clearlist(vm),

        Op::Add => arith_ops::add(vm),
        Op::Sub => arith_ops::sub(vm),
        Op::Mul => arith_ops::mul(vm),
        Op::Div => arith_ops::div(vm),
        Op::Mod => arith_ops::modulo(vm),
        Op::Neg => arith_ops::neg(vm),
        Op::Abs => arith_ops::abs(vm),
        Op::Min => arith_ops::min(vm),
        Op::Max => arith_ops::max(vm),
        Op::LogAnd => arith_ops::logand(vm),
        Op::LogOr => arith_ops::logor(vm),
        Op::LogXor => arith_ops::logxor(vm),
        Op::LogNot => arith_ops::lognot(vm),
        Op::Lt => arith_ops::lt(vm),
        Op::Lte => arith_ops::lte(vm),
        Op::Gt => arith_ops::gt(vm),
        Op::Gte => arith_ops::gte(vm),
        Op::NumEq => arith_ops::numeq(vm),
        Op::Neq => arith_ops::neq(vm),
        Op::Band => arith_ops::band(vm),
        Op::Bor => arith_ops::bor(vm),
        Op::Bxor => arith_ops::bxor(vm),
        Op::Bnot => arith_ops::bnot(vm),
        Op::Shl => arith_ops::shl(vm),
        Op::Shr => arith_ops::shr(vm),

        Op::Toint => conv_ops::toint(vm),
        Op::Tofloat => conv_ops::tofloat(vm),
        Op::Parsenum => conv_ops::parsenum(vm),
        Op::Tostring => conv_ops::tostring(vm),
        Op::Toident => conv_ops::toident(vm),

        Op::Eval => combinator_ops::eval(vm),
        Op::Quote => combinator_ops::quote(vm),
        Op::Wrap => combinator_ops::wrap(vm),
        Op::Wrap2 => combinator_ops::wrap2(vm),
        Op::Wrap3 => combinator_ops::wrap3(vm),
        Op::Wrapn => combinator_ops::wrapn(vm),
        Op::Protect => combinator_ops::protect(vm),
        Op::Dip => combinator_ops::dip(vm),
        Op::Dip2 => combinator_ops::dip2(vm),
        Op::Dip3 => combinator_ops::dip3(vm),
        Op::Dipn => combinator_ops::dipn(vm),
        Op::Sip => combinator_ops::sip(vm),
        Op::SipN => combinator_ops::sipn(vm),
        Op::Napply => combinator_ops::napply(vm),
        Op::NapplyCap => combinator_ops::napply_cap(vm),
        Op::If => combinator_ops::if_(vm),
        Op::Ifelse => combinator_ops::ifelse(vm),
        Op::IfUnderscore => combinator_ops::if_underscore(vm),
        Op::IfelseUnderscore => combinator_ops::ifelse_underscore(vm),
        Op::Only => combinator_ops::only(vm),
        Op::Unless => combinator_ops::unless(vm),
        Op::Each => combinator_ops::each(vm),
        Op::Eachr => combinator_ops::eachr(vm),
        Op::Times => combinator_ops::times(vm),
        Op::While => combinator_ops::while_(vm),
        Op::LoopUnderscore => combinator_ops::loop_underscore(vm),
        Op::Linrec => combinator_ops::linrec(vm),
        Op::Binrec => combinator_ops::binrec(vm),
        Op::Map => combinator_ops::map(vm),
        Op::Filter => combinator_ops::filter(vm),
        Op::Cleave => combinator_ops::cleave(vm),
        Op::Spread => combinator_ops::spread(vm),
        Op::Bi => combinator_ops::bi(vm),
        Op::Tri => combinator_ops::tri(vm),

        Op::Defined => dict_ops::defined(vm),
        Op::Getdef => dict_ops::getdef(vm),
        Op::Def => dict_ops::def(vm),
        Op::Mapdef => dict_ops::mapdef(vm),
        Op::Resolve => dict_ops::resolve(vm),
        Op::Rresolve => dict_ops::rresolve(vm),
        Op::Scope => dict_ops::scope(vm),
        Op::Savescope => dict_ops::savescope(vm),
        Op::Usescope => dict_ops::usescope(vm),
        Op::EndscopeInternal => dict_ops::endscope_internal(vm),
        Op::PopscopeInternal => dict_ops::popscope_internal(vm),

        Op::Open => io_ops::open(vm),
        Op::Close => io_ops::close(vm),
        Op::Read => io_ops::read(vm),
        Op::Readline => io_ops::readline(vm),
        Op::Write => io_ops::write(vm),
        Op::Seek => io_ops::seek(vm),
        Op::Fpos => io_ops::fpos(vm),
        Op::StdinReadline => io_ops::stdin_readline(vm),
        Op::Dot => io_ops::dot(vm),

        Op::RefNew => ref_ops::ref_new(vm),
        Op::Deref => ref_ops::deref(vm),
        Op::Refswap => ref_ops::refswap(vm),
        Op::Guard => ref_ops::guard(vm),
        Op::GuardSig => ref_ops::guard_sig(vm),
        Op::GuardBcast => ref_ops::guard_bcast(vm),
        Op::GuardWaitwhile => ref_ops::guard_waitwhile_op(vm),
        Op::GuardSigWaitwhile => ref_ops::guard_sigwaitwhile(vm),
        Op::Signal => ref_ops::signal(vm),
        Op::Broadcast => ref_ops::broadcast(vm),
        Op::Wait => ref_ops::wait(vm),
        Op::VmNew => vm_ops::vm_new(vm),
        Op::Thread => vm_ops::thread(vm),
        Op::ThreadWait => vm_ops::thread_wait(vm),
        Op::Debug => control_ops::debug(vm),

        Op::Trycatch => control_ops::trycatch(vm),
        Op::Trydebug => control_ops::trydebug(vm),
        Op::EndtryInternal => control_ops::endtry_internal(vm),
        Op::CatchInternal => control_ops::catch_internal(vm),
        Op::CatchInteractive => control_ops::catch_interactive(vm),
        Op::CatchUnguard => control_ops::catch_unguard(vm),
        Op::Throw => control_ops::throw(vm),
        Op::Perror => control_ops::perror(vm),
        Op::Break => control_ops::break_(vm),
        Op::Quit => control_ops::quit(vm),

        // Bracket/paren markers are consumed by the parser while building
        // `Code`/`List` values; they never reach dispatch on a well-formed
        // program.
        Op::OpenParen | Op::CloseParen | Op::OpenBracket | Op::CloseBracket => {
            Err(VmError::new(ErrorKind::BadOp, format!("{} is a parser-only marker", op.name())))
        }

        // Bytecode literals always round-trip as data; evaluating one as an
        // opcode is not supported by this port (SPEC_FULL §9).
        Op::Bytecode => Err(VmError::new(ErrorKind::NotImplemented, "bytecode opcode is not implemented")),
    }
}
