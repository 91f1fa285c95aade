//! Ordered named-field records
//!
//! A record is an ordered set of uniquely named fields. Reconciliation
//! is field-wise: the other record's fields are merged into ours in its
//! insertion order, reading absent fields as `Top`.

use std::fmt;
use std::mem;

use crate::guard::VisitSet;
use crate::merge;
use crate::value::Value;
use crate::MergeResult;

/// Named fields, insertion order preserved.
#[derive(Clone, Debug, Default)]
pub struct Record {
    fields: Vec<(String, Value)>,
}

impl Record {
    pub fn new() -> Self {
        Record::default()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Strict read: `None` when the field was never set.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }

    /// Permissive read: a field not yet set reads as `Top`.
    pub fn read(&self, name: &str) -> Value {
        self.get(name).cloned().unwrap_or(Value::Top)
    }

    /// Set a field, replacing in place or appending at the end.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.fields.iter_mut().find(|(field, _)| *field == name) {
            Some(slot) => slot.1 = value,
            None => self.fields.push((name, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.fields.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.fields.iter().map(|(_, value)| value)
    }

    /// Merge every field of `other`, in `other`'s insertion order, into
    /// this record. Existing fields keep their position, new fields are
    /// appended; `changed` is the OR of the per-field outcomes.
    pub fn imerge(mut self, other: &Record) -> MergeResult<(Record, bool)> {
        let mut changed = false;
        for (name, theirs) in other.iter() {
            match self.fields.iter().position(|(field, _)| field == name) {
                Some(idx) => {
                    let own = mem::replace(&mut self.fields[idx].1, Value::Top);
                    let (merged, flag) = merge::imerge(own, theirs)?;
                    self.fields[idx].1 = merged;
                    changed |= flag;
                }
                None => {
                    let (merged, flag) = merge::imerge(Value::Top, theirs)?;
                    self.fields.push((name.to_string(), merged));
                    changed |= flag;
                }
            }
        }
        Ok((self, changed))
    }

    pub(crate) fn brief(&self) -> String {
        format!("record(fields={})", self.fields.len())
    }

    pub(crate) fn eq_guarded(&self, other: &Record, visiting: &mut VisitSet) -> bool {
        self.fields.len() == other.fields.len()
            && self
                .fields
                .iter()
                .zip(&other.fields)
                .all(|((name_a, a), (name_b, b))| {
                    name_a == name_b && a.eq_guarded(b, visiting)
                })
    }

    pub(crate) fn fmt_guarded(
        &self,
        f: &mut fmt::Formatter<'_>,
        visiting: &mut VisitSet,
        depth: usize,
    ) -> fmt::Result {
        f.write_str("{")?;
        for (i, (name, value)) in self.fields.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}: ", name)?;
            value.fmt_guarded(f, visiting, depth + 1)?;
        }
        f.write_str("}")
    }
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        self.eq_guarded(other, &mut VisitSet::new())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_guarded(f, &mut VisitSet::new(), 0)
    }
}

impl<S: Into<String>> FromIterator<(S, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (S, Value)>>(iter: I) -> Self {
        let mut record = Record::new();
        for (name, value) in iter {
            record.set(name, value);
        }
        record
    }
}
