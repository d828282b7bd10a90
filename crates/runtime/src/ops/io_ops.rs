//! File I/O operators and `FileHandle` implementations (SPEC_FULL §4.7/§6.3,
//! §9). Real files wrap a `BufReader`/`File` pair behind a `Mutex` so a
//! `File` value stays `Send + Sync` per `concat_core::Value`; stdin/stdout/
//! stderr are process-global singletons, matching SPEC_FULL §9's note that
//! these are shared, not duplicated per-VM.

use crate::vm::Vm;
use concat_core::error::{ErrorKind, VmError};
use concat_core::{FileHandle, Result, StrView, Value};
use std::fs::OpenOptions;
use std::io::{BufRead, BufReader, Read as _, Seek, SeekFrom, Write as _};
use std::sync::{Arc, Mutex, OnceLock};

#[derive(Debug)]
struct RealFile {
    reader: Mutex<BufReader<std::fs::File>>,
}

impl RealFile {
    fn open(path: &str, mode: &str) -> std::io::Result<Self> {
        let mut opts = OpenOptions::new();
        match mode {
            "r" => { opts.read(true); }
            "w" => { opts.write(true).create(true).truncate(true); }
            "a" => { opts.append(true).create(true); }
            "rw" | "r+" => { opts.read(true).write(true).create(true); }
            _ => { opts.read(true); }
        }
        let file = opts.open(path)?;
        Ok(RealFile { reader: Mutex::new(BufReader::new(file)) })
    }
}

impl FileHandle for RealFile {
    fn read_line(&self) -> std::io::Result<Option<String>> {
        let mut guard = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        let mut line = String::new();
        let n = guard.read_line(&mut line)?;
        if n == 0 {
            Ok(None)
        } else {
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            Ok(Some(line))
        }
    }

    fn write(&self, data: &[u8]) -> std::io::Result<usize> {
        let mut guard = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        guard.get_mut().write(data)
    }

    fn seek(&self, pos: u64) -> std::io::Result<u64> {
        let mut guard = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        guard.seek(SeekFrom::Start(pos))
    }

    fn fpos(&self) -> std::io::Result<u64> {
        let mut guard = self.reader.lock().unwrap_or_else(|e| e.into_inner());
        guard.stream_position()
    }

    fn close(&self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct StdinFile;

impl FileHandle for StdinFile {
    fn read_line(&self) -> std::io::Result<Option<String>> {
        let mut line = String::new();
        let n = std::io::stdin().read_line(&mut line)?;
        if n == 0 {
            Ok(None)
        } else {
            if line.ends_with('\n') {
                line.pop();
                if line.ends_with('\r') {
                    line.pop();
                }
            }
            Ok(Some(line))
        }
    }

    fn write(&self, _data: &[u8]) -> std::io::Result<usize> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "stdin is not writable"))
    }

    fn seek(&self, _pos: u64) -> std::io::Result<u64> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "stdin is not seekable"))
    }

    fn fpos(&self) -> std::io::Result<u64> {
        Ok(0)
    }

    fn close(&self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct StdoutFile;

impl FileHandle for StdoutFile {
    fn read_line(&self) -> std::io::Result<Option<String>> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "stdout is not readable"))
    }

    fn write(&self, data: &[u8]) -> std::io::Result<usize> {
        let mut out = std::io::stdout();
        out.write_all(data)?;
        out.flush()?;
        Ok(data.len())
    }

    fn seek(&self, _pos: u64) -> std::io::Result<u64> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "stdout is not seekable"))
    }

    fn fpos(&self) -> std::io::Result<u64> {
        Ok(0)
    }

    fn close(&self) -> std::io::Result<()> {
        Ok(())
    }
}

#[derive(Debug)]
struct StderrFile;

impl FileHandle for StderrFile {
    fn read_line(&self) -> std::io::Result<Option<String>> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "stderr is not readable"))
    }

    fn write(&self, data: &[u8]) -> std::io::Result<usize> {
        let mut out = std::io::stderr();
        out.write_all(data)?;
        out.flush()?;
        Ok(data.len())
    }

    fn seek(&self, _pos: u64) -> std::io::Result<u64> {
        Err(std::io::Error::new(std::io::ErrorKind::Other, "stderr is not seekable"))
    }

    fn fpos(&self) -> std::io::Result<u64> {
        Ok(0)
    }

    fn close(&self) -> std::io::Result<()> {
        Ok(())
    }
}

static STDIN: OnceLock<Arc<dyn FileHandle>> = OnceLock::new();
static STDOUT: OnceLock<Arc<dyn FileHandle>> = OnceLock::new();
static STDERR: OnceLock<Arc<dyn FileHandle>> = OnceLock::new();

pub fn stdin_handle() -> Arc<dyn FileHandle> {
    STDIN.get_or_init(|| Arc::new(StdinFile) as Arc<dyn FileHandle>).clone()
}

pub fn stdout_handle() -> Arc<dyn FileHandle> {
    STDOUT.get_or_init(|| Arc::new(StdoutFile) as Arc<dyn FileHandle>).clone()
}

pub fn stderr_handle() -> Arc<dyn FileHandle> {
    STDERR.get_or_init(|| Arc::new(StderrFile) as Arc<dyn FileHandle>).clone()
}

fn io_err(e: std::io::Error) -> VmError {
    VmError::new(ErrorKind::IoError, e.to_string())
}

/// `open`: `(path mode -- file)`.
pub fn open(vm: &mut Vm) -> Result<()> {
    let mode = match vm.pop()? {
        Value::String(s) => s.as_str().to_string(),
        other => return Err(other.type_error("string")),
    };
    let path = match vm.pop()? {
        Value::String(s) => s.as_str().to_string(),
        other => return Err(other.type_error("string")),
    };
    let file = RealFile::open(&path, &mode).map_err(io_err)?;
    vm.push(Value::File(Arc::new(file)));
    Ok(())
}

pub fn close(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::File(f) => f.close().map_err(io_err),
        other => Err(other.type_error("file")),
    }
}

/// `read`/`readline`: `(file -- file line)`. Both are line-oriented, per
/// `concat_core::FileHandle`; this port has no separate raw-byte read path.
pub fn readline(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::File(f) => {
            let line = f.read_line().map_err(io_err)?;
            vm.push(Value::File(f));
            vm.push(match line {
                Some(s) => Value::String(StrView::from_str(&s)),
                None => Value::empty_string(),
            });
            Ok(())
        }
        other => Err(other.type_error("file")),
    }
}

pub fn read(vm: &mut Vm) -> Result<()> {
    readline(vm)
}

pub fn write(vm: &mut Vm) -> Result<()> {
    let data = match vm.pop()? {
        Value::String(s) => s.as_bytes().to_vec(),
        other => return Err(other.type_error("string")),
    };
    match vm.pop()? {
        Value::File(f) => {
            f.write(&data).map_err(io_err)?;
            vm.push(Value::File(f));
            Ok(())
        }
        other => Err(other.type_error("file")),
    }
}

pub fn seek(vm: &mut Vm) -> Result<()> {
    let pos = vm.pop_int()?;
    match vm.pop()? {
        Value::File(f) => {
            f.seek(pos.max(0) as u64).map_err(io_err)?;
            vm.push(Value::File(f));
            Ok(())
        }
        other => Err(other.type_error("file")),
    }
}

pub fn fpos(vm: &mut Vm) -> Result<()> {
    match vm.pop()? {
        Value::File(f) => {
            let pos = f.fpos().map_err(io_err)?;
            vm.push(Value::File(f.clone()));
            vm.push(Value::Int(pos as i64));
            Ok(())
        }
        other => Err(other.type_error("file")),
    }
}

pub fn stdin_readline(vm: &mut Vm) -> Result<()> {
    let line = stdin_handle().read_line().map_err(io_err)?;
    vm.push(match line {
        Some(s) => Value::String(StrView::from_str(&s)),
        None => Value::empty_string(),
    });
    Ok(())
}

/// `.`: `(v -- )`. Prints `v` in its human form followed by a newline.
pub fn dot(vm: &mut Vm) -> Result<()> {
    let v = vm.pop()?;
    let mut line = crate::formatter::display_value(&v, true);
    line.push('\n');
    stdout_handle().write(line.as_bytes()).map_err(io_err)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn open_write_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.txt");
        {
            let mut f = std::fs::File::create(&path).unwrap();
            writeln!(f, "hello").unwrap();
            writeln!(f, "world").unwrap();
        }
        let handle = RealFile::open(path.to_str().unwrap(), "r").unwrap();
        assert_eq!(handle.read_line().unwrap(), Some("hello".to_string()));
        assert_eq!(handle.read_line().unwrap(), Some("world".to_string()));
        assert_eq!(handle.read_line().unwrap(), None);
    }

    #[test]
    fn write_mode_truncates_and_appends_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.txt");
        let handle = RealFile::open(path.to_str().unwrap(), "w").unwrap();
        handle.write(b"abc").unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "abc");
    }
}
