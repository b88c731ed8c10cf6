//! Local, durable node identifiers.
//!
//! Unlike `NotionId` (which names a remote object), a `NodeId` is minted by
//! this process the first time it sees a Notion entity and then persisted
//! forever in the id mapping. It is a 64-bit, time-ordered value so that IDs
//! minted later in a run (or in a later run) sort after earlier ones.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Number of low bits reserved for the per-millisecond sequence counter.
const SEQUENCE_BITS: u32 = 22;
const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;

/// Opaque, k-sortable, time-ordered 64-bit local identifier.
///
/// The high 42 bits are a millisecond timestamp, the low 22 bits a
/// per-millisecond sequence counter — enough for ~4M mints per millisecond
/// before the counter wraps into the timestamp's low bit, which is
/// acceptable for a one-shot import (never anywhere near that rate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    /// Render as a fixed-width lowercase hex string. Fixed width keeps
    /// lexicographic string order identical to numeric order.
    pub fn as_str(&self) -> String {
        format!("{:016x}", self.0)
    }

    pub fn value(&self) -> u64 {
        self.0
    }

    pub fn from_raw(value: u64) -> Self {
        Self(value)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for NodeId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for NodeId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let value = u64::from_str_radix(&s, 16).map_err(serde::de::Error::custom)?;
        Ok(Self(value))
    }
}

impl std::str::FromStr for NodeId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(u64::from_str_radix(s, 16)?))
    }
}

/// Mints fresh, monotonically increasing `NodeId`s for the lifetime of one
/// mapper instance.
pub struct NodeIdGenerator {
    last_millis: AtomicU64,
    sequence: AtomicU64,
}

impl NodeIdGenerator {
    pub fn new() -> Self {
        Self {
            last_millis: AtomicU64::new(0),
            sequence: AtomicU64::new(0),
        }
    }

    /// Mint the next id. Safe to call from multiple threads, though the
    /// mapper itself is single-threaded per spec.
    pub fn next(&self) -> NodeId {
        let now = now_millis();
        let prev = self.last_millis.swap(now, Ordering::SeqCst);
        let seq = if prev == now {
            self.sequence.fetch_add(1, Ordering::SeqCst) + 1
        } else {
            self.sequence.store(0, Ordering::SeqCst);
            0
        };
        let value = (now << SEQUENCE_BITS) | (seq & SEQUENCE_MASK);
        NodeId(value)
    }
}

impl Default for NodeIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

fn now_millis() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonically_increasing() {
        let gen = NodeIdGenerator::new();
        let mut prev = gen.next();
        for _ in 0..1000 {
            let next = gen.next();
            assert!(next > prev, "{:?} should sort after {:?}", next, prev);
            prev = next;
        }
    }

    #[test]
    fn string_form_sorts_the_same_as_numeric_form() {
        let gen = NodeIdGenerator::new();
        let a = gen.next();
        let b = gen.next();
        assert!(a < b);
        assert!(a.as_str() < b.as_str());
    }

    #[test]
    fn round_trips_through_its_string_form() {
        let gen = NodeIdGenerator::new();
        let id = gen.next();
        let parsed: NodeId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }
}
