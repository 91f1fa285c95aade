//! The value model
//!
//! A `Value` is a possibly partial description of one logical value:
//! anything from "nothing known" (`Top`) through partially decoded
//! buffers (sparse sequences) to fully concrete scalars and records.
//! The merge engine in [`crate::merge`] refines two such descriptions
//! into one.

use std::fmt;

use bytes::Bytes;

use crate::guard::VisitSet;
use crate::merge;
use crate::packet::PacketHandle;
use crate::record::Record;
use crate::sparse::{SparseBytes, SparseSeq};
use crate::{MergeResult, MAX_LENGTH};

/// Printing cuts off below this nesting depth.
const FMT_DEPTH_LIMIT: usize = 32;

/// One logical value, possibly only partially known.
#[derive(Clone, Debug)]
pub enum Value {
    /// Nothing known; the identity of merge.
    Top,
    /// The distinguished filler element padding unspecified positions.
    /// Unlike `Top` it renders as padding, but it yields to any
    /// informative peer the same way.
    Default,
    Int(i64),
    Float(f64),
    /// An opaque byte block; two blocks merge only when identical.
    Bytes(Bytes),
    Seq(Vec<Value>),
    Record(Record),
    Sparse(Box<SparseSeq>),
    SparseBytes(Box<SparseBytes>),
    /// Externally decoded packet; terminal for the merge engine.
    Packet(PacketHandle),
}

impl Value {
    /// Refine `self` with the information in `other`.
    ///
    /// Nested failures come back wrapped with one breadcrumb frame per
    /// enclosing call; see [`crate::merge::imerge`].
    pub fn imerge(self, other: &Value) -> MergeResult<(Value, bool)> {
        merge::imerge(self, other)
    }

    /// Whether the value still carries unresolved content anywhere.
    ///
    /// Walks the structure with an explicit worklist, so arbitrarily
    /// deep values cannot overflow the stack.
    pub fn is_abstract(&self) -> bool {
        let mut work = vec![self];
        while let Some(value) = work.pop() {
            match value {
                Value::Top | Value::Default => return true,
                Value::Int(_) | Value::Float(_) | Value::Bytes(_) | Value::Packet(_) => {}
                Value::Seq(items) => work.extend(items.iter()),
                Value::Record(record) => work.extend(record.values()),
                Value::Sparse(sparse) => {
                    if !sparse.is_all_touched() {
                        return true;
                    }
                    work.extend(sparse.backing().iter());
                }
                Value::SparseBytes(sparse) => {
                    if !sparse.is_all_touched() {
                        return true;
                    }
                    if sparse.backing().iter().any(Option::is_none) {
                        return true;
                    }
                }
            }
        }
        false
    }

    /// One-line summary used in error messages and log lines; never
    /// recurses into children.
    pub fn brief(&self) -> String {
        match self {
            Value::Top => "Top".to_string(),
            Value::Default => "Default".to_string(),
            Value::Int(v) => v.to_string(),
            Value::Float(v) => v.to_string(),
            Value::Bytes(b) if b.len() <= 8 => format!("x\"{}\"", hex_string(b)),
            Value::Bytes(b) => format!("bytes(len={})", b.len()),
            Value::Seq(items) => format!("seq(len={})", items.len()),
            Value::Record(record) => record.brief(),
            Value::Sparse(sparse) => sparse.brief(),
            Value::SparseBytes(sparse) => sparse.brief(),
            Value::Packet(packet) => packet.to_string(),
        }
    }

    /// Structural equality threaded through the re-entrancy guard.
    pub(crate) fn eq_guarded(&self, other: &Value, visiting: &mut VisitSet) -> bool {
        match (self, other) {
            (Value::Top, Value::Top) | (Value::Default, Value::Default) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Seq(a), Value::Seq(b)) => {
                let pair = (VisitSet::key_of(self), VisitSet::key_of(other));
                visiting.enter(pair, true, |visiting| {
                    a.len() == b.len()
                        && a.iter().zip(b).all(|(x, y)| x.eq_guarded(y, visiting))
                })
            }
            (Value::Record(a), Value::Record(b)) => {
                let pair = (VisitSet::key_of(self), VisitSet::key_of(other));
                visiting.enter(pair, true, |visiting| a.eq_guarded(b, visiting))
            }
            (Value::Sparse(a), Value::Sparse(b)) => {
                let pair = (VisitSet::key_of(self), VisitSet::key_of(other));
                visiting.enter(pair, true, |visiting| {
                    a.length_range() == b.length_range()
                        && a.sectors() == b.sectors()
                        && a.backing().len() == b.backing().len()
                        && a.backing()
                            .iter()
                            .zip(b.backing())
                            .all(|(x, y)| x.eq_guarded(y, visiting))
                })
            }
            (Value::SparseBytes(a), Value::SparseBytes(b)) => a == b,
            (Value::Packet(a), Value::Packet(b)) => a == b,
            _ => false,
        }
    }

    pub(crate) fn fmt_guarded(
        &self,
        f: &mut fmt::Formatter<'_>,
        visiting: &mut VisitSet,
        depth: usize,
    ) -> fmt::Result {
        if depth >= FMT_DEPTH_LIMIT {
            return f.write_str("...");
        }
        match self {
            Value::Top => f.write_str("Top"),
            Value::Default => f.write_str("Default"),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Bytes(b) => write_bytes(f, b),
            Value::Seq(items) => {
                let pair = (VisitSet::key_of(self), 0);
                if visiting.is_visiting(pair) {
                    return f.write_str("(...)");
                }
                visiting.enter(pair, Ok(()), |visiting| {
                    f.write_str("(")?;
                    for (i, item) in items.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        item.fmt_guarded(f, visiting, depth + 1)?;
                    }
                    f.write_str(")")
                })
            }
            Value::Record(record) => {
                let pair = (VisitSet::key_of(self), 0);
                if visiting.is_visiting(pair) {
                    return f.write_str("{...}");
                }
                visiting.enter(pair, Ok(()), |visiting| {
                    record.fmt_guarded(f, visiting, depth)
                })
            }
            Value::Sparse(sparse) => {
                let (min, max) = sparse.length_range();
                f.write_str("sparse(")?;
                write_length_range(f, min, max)?;
                f.write_str(", value = (")?;
                for (i, item) in sparse.backing().iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    item.fmt_guarded(f, visiting, depth + 1)?;
                }
                f.write_str(") + (Default, ...))")
            }
            Value::SparseBytes(sparse) => {
                let (min, max) = sparse.length_range();
                f.write_str("sparse(")?;
                write_length_range(f, min, max)?;
                f.write_str(", value = x\"")?;
                for cell in sparse.backing() {
                    match cell {
                        Some(byte) => write!(f, "{:02x}", byte)?,
                        None => f.write_str("??")?,
                    }
                }
                f.write_str("\" + (?, ...))")
            }
            Value::Packet(packet) => write!(f, "{}", packet),
        }
    }
}

fn write_length_range(f: &mut fmt::Formatter<'_>, min: usize, max: usize) -> fmt::Result {
    if min == max {
        write!(f, "length = {}", min)
    } else if max == MAX_LENGTH {
        write!(f, "min_length = {}, max_length = *", min)
    } else {
        write!(f, "min_length = {}, max_length = {}", min, max)
    }
}

fn write_bytes(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("x\"")?;
    for byte in bytes.iter().take(16) {
        write!(f, "{:02x}", byte)?;
    }
    if bytes.len() > 16 {
        f.write_str("..")?;
    }
    f.write_str("\"")
}

pub(crate) fn hex_string(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.eq_guarded(other, &mut VisitSet::new())
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_guarded(f, &mut VisitSet::new(), 0)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v as i64)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<Bytes> for Value {
    fn from(v: Bytes) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(Bytes::from(v))
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v))
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Seq(v)
    }
}

impl From<Record> for Value {
    fn from(v: Record) -> Self {
        Value::Record(v)
    }
}

impl From<SparseSeq> for Value {
    fn from(v: SparseSeq) -> Self {
        Value::Sparse(Box::new(v))
    }
}

impl From<SparseBytes> for Value {
    fn from(v: SparseBytes) -> Self {
        Value::SparseBytes(Box::new(v))
    }
}

impl From<PacketHandle> for Value {
    fn from(v: PacketHandle) -> Self {
        Value::Packet(v)
    }
}
