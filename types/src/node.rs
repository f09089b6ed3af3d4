//! Node identity type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::IdError;

/// Identity of a consensus participant.
///
/// Opaque 32-byte value (typically derived from the node's public key). The
/// dispute tracker only needs equality, hashing and a printable form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId([u8; 32]);

impl NodeId {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Parse a node id from its hex form.
    pub fn from_hex(s: &str) -> Result<Self, IdError> {
        let bytes = hex::decode(s)?;
        let actual = bytes.len();
        let arr: [u8; 32] = bytes
            .try_into()
            .map_err(|_| IdError::InvalidLength { expected: 32, actual })?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({}\u{2026})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode_upper(self.0))
    }
}

impl FromStr for NodeId {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
