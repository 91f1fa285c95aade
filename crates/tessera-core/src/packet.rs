//! Hook for externally decoded layered packets
//!
//! A packet object is produced and owned by the embedding toolkit; the
//! merge engine treats it as terminal. Two packets are the same exactly
//! when their serialized bytes and their layer stacks agree, and no
//! merge rule ever looks inside one.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;

/// Decoded packet contract provided by the embedder.
pub trait LayeredPacket {
    /// Serialized form of the whole packet.
    fn to_bytes(&self) -> Bytes;

    /// Names of the protocol layers, outermost first.
    fn layer_names(&self) -> Vec<String>;
}

/// Shared handle to an externally-defined packet.
#[derive(Clone)]
pub struct PacketHandle(Arc<dyn LayeredPacket>);

impl PacketHandle {
    pub fn new(packet: impl LayeredPacket + 'static) -> Self {
        PacketHandle(Arc::new(packet))
    }

    pub fn to_bytes(&self) -> Bytes {
        self.0.to_bytes()
    }

    pub fn layer_names(&self) -> Vec<String> {
        self.0.layer_names()
    }
}

impl PartialEq for PacketHandle {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.0, &other.0) {
            return true;
        }
        self.layer_names() == other.layer_names() && self.to_bytes() == other.to_bytes()
    }
}

impl Eq for PacketHandle {}

impl fmt::Debug for PacketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PacketHandle({})", self.layer_names().join("/"))
    }
}

impl fmt::Display for PacketHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "packet[{}]", self.layer_names().join("/"))
    }
}
