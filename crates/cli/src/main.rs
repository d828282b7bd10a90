//! Command-line front-end for the concat evaluator (SPEC_FULL §6.1).
//!
//! Flags interleave with positionals in source order (`-e '1 2 +' -f a.ct -e
//! dup`), which is why this isn't a `clap` derive struct with one field per
//! flag: `clap` would lose the relative ordering. Instead `clap` only peels
//! off the raw argument vector (`trailing_var_arg`), and `run` walks it by
//! hand, exactly the shape SPEC_FULL describes.

use clap::Parser;
use concat_core::error::ErrorKind;
use concat_core::Value;
use concat_runtime::ops::io_ops;
use concat_runtime::{Op, Vm};
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "concat", about = "Evaluator for the concat stack language")]
struct Cli {
    /// Raw arguments, interpreted sequentially by `run` (SPEC_FULL §6.1):
    /// `-e <expr>`, `-f <file>`, `-d`, `-x`, `-de`, `-`, `--`, or a bare
    /// filename. `allow_hyphen_values` keeps clap from eating `-e`'s
    /// argument as its own flag.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn init_logging() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    match run(cli.args) {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("concat: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Pushes a parsed top-level quotation onto `work` as a single bare code
/// value, so `Vm::step` iterates it itself. Used for `-e`/`-f`/positional-
/// filename handling, which append source the same way the reader's own
/// line-feeding does.
fn append_code(vm: &mut Vm, code: Value) {
    vm.work.push(code);
}

/// `-f <file>`: reuses the `open` opcode rather than poking at
/// `concat_runtime::ops::io_ops::RealFile` directly (private, and for good
/// reason: going through `open` exercises the exact same path a concat
/// program uses to open a file itself, so there's only one code path to
/// trust).
fn push_file(vm: &mut Vm, path: &str) -> anyhow::Result<()> {
    vm.push(Value::string(path));
    vm.push(Value::string("r"));
    concat_runtime::ops::dispatch(vm, Op::Open).map_err(|e| anyhow::anyhow!("{path}: {e}"))?;
    let file = vm.pop().map_err(|e| anyhow::anyhow!("{e}"))?;
    vm.work.push(file);
    Ok(())
}

fn drain(vm: &mut Vm, debug: bool) -> anyhow::Result<Option<ExitCode>> {
    match vm.run() {
        Ok(()) => Ok(None),
        Err(e) if e.is_fatal() => Ok(Some(exit_code_for(&e.kind, true))),
        Err(e) if debug => {
            eprintln!("concat: unhandled error: {e}");
            Ok(None)
        }
        Err(e) => Ok(Some(exit_code_for(&e.kind, false))),
    }
}

/// SPEC_FULL §6.1: "negative magnitude fatal error, positive opcode error
/// code otherwise". `ErrorKind`'s discriminant ordinal stands in for the
/// original's numeric error code (there's no other canonical numbering left
/// once error payloads are plain Rust enum variants); process exit codes
/// truncate to a byte regardless; see DESIGN.md.
fn exit_code_for(kind: &ErrorKind, fatal: bool) -> ExitCode {
    let magnitude = *kind as u8;
    if fatal {
        ExitCode::from(magnitude.wrapping_neg())
    } else {
        ExitCode::from(magnitude.max(1))
    }
}

fn install_catch_interactive(vm: &mut Vm) {
    vm.cont.push(Value::Opcode(Op::CatchInteractive.index()));
}

fn push_stdin(vm: &mut Vm) {
    vm.work.push(Value::File(io_ops::stdin_handle()));
}

/// `-`/trailing stdin: a `rustyline`-driven read loop rather than the
/// literal "push a stdin file value and let the evaluator read lines
/// itself" wording. Needed so the user gets history/line-editing, and so
/// a `-de`-installed `catch_interactive` handler (which re-pushes a plain
/// stdin file to keep draining) still works unattended once this loop has
/// handed control to the evaluator. This loop is used only for genuinely
/// interactive sessions (a TTY reading one line at a time); `-de`'s
/// recovery path re-enters the evaluator's own `step_file`, not this loop.
fn interactive(vm: &mut Vm) -> anyhow::Result<Option<ExitCode>> {
    let mut rl = rustyline::DefaultEditor::new()?;
    loop {
        match rl.readline("concat> ") {
            Ok(line) => {
                let _ = rl.add_history_entry(line.as_str());
                match vm.reader.feed_line(&line) {
                    Ok(Some(code)) => append_code(vm, code),
                    Ok(None) => continue,
                    Err(e) => {
                        eprintln!("concat: parse error: {e}");
                        continue;
                    }
                }
                if let Some(code) = drain(vm, false)? {
                    return Ok(Some(code));
                }
            }
            Err(rustyline::error::ReadlineError::Interrupted) => continue,
            Err(rustyline::error::ReadlineError::Eof) => return Ok(None),
            Err(e) => return Err(e.into()),
        }
    }
}

fn run(args: Vec<String>) -> anyhow::Result<ExitCode> {
    let mut vm = Vm::new();
    let mut debug = false;
    let mut stop_flags = false;
    let mut interactive_mode = false;

    let mut i = 0;
    while i < args.len() {
        let arg = &args[i];
        if stop_flags {
            if arg == "-" {
                interactive_mode = true;
            } else {
                push_file(&mut vm, arg)?;
            }
            i += 1;
            continue;
        }
        match arg.as_str() {
            "--" => stop_flags = true,
            "-e" => {
                i += 1;
                let expr = args.get(i).ok_or_else(|| anyhow::anyhow!("-e requires an argument"))?;
                let code = concat_runtime::parser::parse(expr)?;
                append_code(&mut vm, code);
            }
            "-f" => {
                i += 1;
                let path = args.get(i).ok_or_else(|| anyhow::anyhow!("-f requires an argument"))?;
                push_file(&mut vm, path)?;
            }
            "-d" => debug = true,
            "-de" => {
                debug = true;
                install_catch_interactive(&mut vm);
            }
            "-x" => {
                if let Some(code) = drain(&mut vm, debug)? {
                    return Ok(code);
                }
            }
            "-" => interactive_mode = true,
            other => push_file(&mut vm, other)?,
        }
        i += 1;
    }

    if interactive_mode {
        push_stdin(&mut vm);
        if let Some(code) = interactive(&mut vm)? {
            return Ok(code);
        }
        return Ok(ExitCode::SUCCESS);
    }

    if let Some(code) = drain(&mut vm, debug)? {
        return Ok(code);
    }
    Ok(ExitCode::SUCCESS)
}
