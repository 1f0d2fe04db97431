//! # Snapshot Persistence Format
//!
//! Binary encoding of the persisted analytics snapshot.
//!
//! Format: Header (5 bytes) + postcard-serialized `Snapshot`.
//! - 4 bytes: Magic ("TLMK")
//! - 1 byte: Version
//!
//! Size and header are validated before the payload is decoded, so a
//! corrupted or foreign value in the metadata table is rejected cheaply.

use crate::{Snapshot, TelemarkError, primitives};

/// Header length in bytes.
const HEADER_LEN: usize = 5;

// =============================================================================
// HEADER
// =============================================================================

/// The header that precedes every stored snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnapshotHeader {
    pub magic: [u8; 4],
    pub version: u8,
}

impl SnapshotHeader {
    /// Header for the current format version.
    #[must_use]
    pub fn new() -> Self {
        Self {
            magic: *primitives::MAGIC_BYTES,
            version: primitives::FORMAT_VERSION,
        }
    }

    /// Check magic bytes and version.
    pub fn validate(&self) -> Result<(), TelemarkError> {
        if &self.magic != primitives::MAGIC_BYTES {
            return Err(TelemarkError::DeserializationError(
                "Invalid magic bytes".to_string(),
            ));
        }
        if self.version != primitives::FORMAT_VERSION {
            return Err(TelemarkError::DeserializationError(format!(
                "Unsupported snapshot version: {} (expected {})",
                self.version,
                primitives::FORMAT_VERSION
            )));
        }
        Ok(())
    }

    /// Encode the header.
    #[must_use]
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        let mut bytes = [0u8; HEADER_LEN];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4] = self.version;
        bytes
    }

    /// Decode the header from the start of `bytes`.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TelemarkError> {
        let Some(head) = bytes.get(..HEADER_LEN) else {
            return Err(TelemarkError::DeserializationError(
                "Header too short".to_string(),
            ));
        };
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&head[0..4]);
        Ok(Self {
            magic,
            version: head[4],
        })
    }
}

impl Default for SnapshotHeader {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// ENCODE / DECODE
// =============================================================================

/// Encode a snapshot (header + payload). Pure, no I/O.
pub fn snapshot_to_bytes(snapshot: &Snapshot) -> Result<Vec<u8>, TelemarkError> {
    let payload = postcard::to_stdvec(snapshot)
        .map_err(|e| TelemarkError::SerializationError(e.to_string()))?;

    let mut bytes = Vec::with_capacity(HEADER_LEN + payload.len());
    bytes.extend_from_slice(&SnapshotHeader::new().to_bytes());
    bytes.extend_from_slice(&payload);
    Ok(bytes)
}

/// Decode a snapshot. Pure, no I/O.
///
/// Validates, in order: minimum size, maximum size, header. Only then is the
/// payload handed to postcard.
pub fn snapshot_from_bytes(bytes: &[u8]) -> Result<Snapshot, TelemarkError> {
    if bytes.len() > primitives::MAX_SNAPSHOT_PAYLOAD_SIZE {
        return Err(TelemarkError::DeserializationError(format!(
            "Snapshot size {} bytes exceeds maximum allowed {} bytes",
            bytes.len(),
            primitives::MAX_SNAPSHOT_PAYLOAD_SIZE
        )));
    }

    let header = SnapshotHeader::from_bytes(bytes)?;
    header.validate()?;

    postcard::from_bytes(&bytes[HEADER_LEN..]).map_err(|e| {
        TelemarkError::DeserializationError(format!("Failed to decode snapshot: {}", e))
    })
}

// =============================================================================
// TESTS
// =============================================================================
