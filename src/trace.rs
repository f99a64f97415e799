use std::{
    fmt, fs,
    io::{self, BufRead, BufReader, Read},
    path::Path,
    slice,
    str::FromStr,
};

use tracing::debug;
use xz2::read::XzDecoder;

use crate::error::{Error, Result, TraceFormatReason};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Load,
    Store,
}

impl Operation {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'L' => Some(Operation::Load),
            'S' => Some(Operation::Store),
            _ => None,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Operation::Load => 'L',
            Operation::Store => 'S',
        }
    }
}

/// One trace record.
///
/// `size` is carried through to verbose output only. Every access is
/// treated as falling inside a single block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryAccess {
    pub address: u64,
    pub size: u64,
    pub operation: Operation,
}

impl MemoryAccess {
    pub fn load(address: u64, size: u64) -> Self {
        MemoryAccess {
            address,
            size,
            operation: Operation::Load,
        }
    }

    pub fn store(address: u64, size: u64) -> Self {
        MemoryAccess {
            address,
            size,
            operation: Operation::Store,
        }
    }
}

impl fmt::Display for MemoryAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:x},{}", self.operation.as_char(), self.address, self.size)
    }
}

impl FromStr for MemoryAccess {
    type Err = TraceFormatReason;

    /// Parses `<L|S> <hex addr>,<decimal size>`.
    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let bytes = line.as_bytes();
        if bytes.len() < 4 || bytes[1] != b' ' || bytes[2] == b' ' {
            return Err(TraceFormatReason::Shape);
        }
        let operation = Operation::from_char(bytes[0] as char).ok_or(TraceFormatReason::Shape)?;

        let (addr_tok, size_tok) = line[2..]
            .split_once(',')
            .ok_or(TraceFormatReason::Shape)?;
        let address = u64::from_str_radix(addr_tok, 16)
            .map_err(|_| TraceFormatReason::Address(addr_tok.to_string()))?;
        let size_tok = size_tok.trim_end();
        let size = size_tok
            .parse::<u64>()
            .map_err(|_| TraceFormatReason::Size(size_tok.to_string()))?;

        Ok(MemoryAccess {
            address,
            size,
            operation,
        })
    }
}

/// A fully buffered trace, in file order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Trace {
    accesses: Vec<MemoryAccess>,
}

impl Trace {
    /// Reads a trace file, decompressing it first if the name ends in `.xz`.
    pub fn read(path: impl AsRef<Path>) -> Result<Trace> {
        let path = path.as_ref();
        let file = fs::File::open(path).map_err(|err| Error::io(path, err))?;
        let stream: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "xz") {
            Box::new(XzDecoder::new(file))
        } else {
            Box::new(file)
        };

        let trace = Trace::parse(BufReader::new(stream)).map_err(|err| match err {
            Error::Io { source, .. } => Error::io(path, source),
            other => other,
        })?;
        debug!(path = %path.display(), accesses = trace.len(), "loaded trace");
        Ok(trace)
    }

    /// Parses every line of `reader`; the first malformed line aborts.
    pub fn parse(reader: impl BufRead) -> Result<Trace> {
        let mut accesses = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line.map_err(|err| Error::io("<trace>", err))?;
            let access = line
                .strip_suffix('\r')
                .unwrap_or(&line)
                .parse::<MemoryAccess>()
                .map_err(|reason| Error::TraceFormat {
                    line: idx + 1,
                    text: line.clone(),
                    reason,
                })?;

            accesses
                .try_reserve(1)
                .map_err(|err| Error::ResourceExhausted {
                    what: "access queue",
                    source: Some(err),
                })?;
            accesses.push(access);
        }
        Ok(Trace { accesses })
    }

    pub fn accesses(&self) -> &[MemoryAccess] {
        &self.accesses
    }

    pub fn len(&self) -> usize {
        self.accesses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accesses.is_empty()
    }
}

impl FromStr for Trace {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Trace::parse(io::Cursor::new(s))
    }
}

impl<'a> IntoIterator for &'a Trace {
    type Item = &'a MemoryAccess;
    type IntoIter = slice::Iter<'a, MemoryAccess>;

    fn into_iter(self) -> Self::IntoIter {
        self.accesses.iter()
    }
}
