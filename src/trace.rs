//! # Trace
//! the memory trace format, one record per line:
//! ```text
//! I 0400d7d4,8
//!  L 7ff0005c8,8
//!  S 7ff0005d0,4
//!  M 0421c7f0,4
//! ```
//! lines that do not have this shape are skipped by [`TraceReader`].

use std::{
    fmt,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
    str::FromStr,
};

use eyre::{Result, WrapErr};
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessKind {
    /// instruction fetch, not simulated by the data cache
    Instruction,
    Load,
    Store,
    /// a load followed by a store to the same address
    Modify,
}

impl AccessKind {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'I' => Some(AccessKind::Instruction),
            'L' => Some(AccessKind::Load),
            'S' => Some(AccessKind::Store),
            'M' => Some(AccessKind::Modify),
            _ => None,
        }
    }
    pub fn as_char(&self) -> char {
        match self {
            AccessKind::Instruction => 'I',
            AccessKind::Load => 'L',
            AccessKind::Store => 'S',
            AccessKind::Modify => 'M',
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceRecord {
    pub kind: AccessKind,
    pub addr: u64,
    /// the number of bytes accessed, it has no effect on the simulation
    pub size: i64,
}

impl TraceRecord {
    pub fn new(kind: AccessKind, addr: u64, size: i64) -> Self {
        Self { kind, addr, size }
    }
}

impl fmt::Display for TraceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:x},{}", self.kind.as_char(), self.addr, self.size)
    }
}

/// why a trace line could not be turned into a [`TraceRecord`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraceParseError {
    Empty,
    NotUtf8,
    UnknownKind(String),
    MissingAddress,
    BadAddress(String),
    MissingSize,
    BadSize(String),
}

impl fmt::Display for TraceParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceParseError::Empty => write!(f, "empty line"),
            TraceParseError::NotUtf8 => write!(f, "line is not valid utf-8"),
            TraceParseError::UnknownKind(kind) => write!(f, "unknown operation `{kind}`"),
            TraceParseError::MissingAddress => write!(f, "missing address"),
            TraceParseError::BadAddress(addr) => write!(f, "bad hex address `{addr}`"),
            TraceParseError::MissingSize => write!(f, "missing `,<size>` after the address"),
            TraceParseError::BadSize(size) => write!(f, "bad size `{size}`"),
        }
    }
}

impl std::error::Error for TraceParseError {}

fn parse_addr(addr: &str) -> Result<u64, TraceParseError> {
    let digits = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))
        .unwrap_or(addr);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return Err(TraceParseError::BadAddress(addr.to_string()));
    }
    u64::from_str_radix(digits, 16).map_err(|_| TraceParseError::BadAddress(addr.to_string()))
}

/// any signed decimal integer is a size, values beyond i64 saturate
fn parse_size(size: &str) -> Result<i64, TraceParseError> {
    let digits = size.strip_prefix(['+', '-']).unwrap_or(size);
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return Err(TraceParseError::BadSize(size.to_string()));
    }
    Ok(size.parse::<i64>().unwrap_or(if size.starts_with('-') {
        i64::MIN
    } else {
        i64::MAX
    }))
}

impl FromStr for TraceRecord {
    type Err = TraceParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        if line.is_empty() {
            return Err(TraceParseError::Empty);
        }
        let (kind, rest) = line
            .split_once(char::is_whitespace)
            .unwrap_or((line, ""));
        let kind = {
            let mut chars = kind.chars();
            match (chars.next().and_then(AccessKind::from_char), chars.next()) {
                (Some(kind), None) => kind,
                _ => return Err(TraceParseError::UnknownKind(kind.to_string())),
            }
        };
        let rest = rest.trim();
        if rest.is_empty() {
            return Err(TraceParseError::MissingAddress);
        }
        let (addr, size) = rest.split_once(',').ok_or(TraceParseError::MissingSize)?;
        let addr = parse_addr(addr.trim())?;
        let size = parse_size(size.trim())?;
        Ok(TraceRecord { kind, addr, size })
    }
}

/// read the records of a trace one by one, the bad lines are skipped
#[derive(Debug)]
pub struct TraceReader<R> {
    reader: R,
    buffer: Vec<u8>,
    line_number: usize,
    skipped: usize,
}

impl TraceReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)
            .wrap_err_with(|| format!("cannot open trace file {}", path.display()))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> TraceReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            line_number: 0,
            skipped: 0,
        }
    }
    /// the number of lines skipped so far
    pub fn skipped(&self) -> usize {
        self.skipped
    }
}

impl<R: BufRead> Iterator for TraceReader<R> {
    type Item = Result<TraceRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buffer.clear();
            match self.reader.read_until(b'\n', &mut self.buffer) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(e) => {
                    return Some(
                        Err(e).wrap_err(format!("cannot read trace line {}", self.line_number + 1)),
                    )
                }
            }
            self.line_number += 1;
            let parsed = std::str::from_utf8(&self.buffer)
                .map_err(|_| TraceParseError::NotUtf8)
                .and_then(str::parse::<TraceRecord>);
            match parsed {
                Ok(record) => return Some(Ok(record)),
                Err(TraceParseError::Empty) => {}
                Err(e) => {
                    self.skipped += 1;
                    tracing::debug!(line = self.line_number, error = %e, "skip trace line");
                }
            }
        }
    }
}
