//! Wire codecs: the store interchange format and the data-plane snapshot
//! export.
//!
//! Store format (`EPE1`), little-endian throughout:
//!
//! ```text
//! magic "EPE1" | u32 format version | u64 node count
//! then pre-order node records:
//!   u16 segment_len | segment bytes | u8 flags | u32 child_count
//! ```
//!
//! Flags: bit 0 = allowed, bit 1 = suppressed. The root record carries an
//! empty segment. Child records follow their parent immediately, in the
//! parent's (sorted) child order, so the byte stream is stable for a given
//! store.
//!
//! Snapshot export, consumed by the sidecar:
//!
//! ```text
//! u64 version | u32 path count | (u16 len | UTF-8 path bytes)*
//! ```

use super::compiler::FlatSnapshot;
use super::store::{PolicyStore, TrieNode};

use thiserror::Error;

use std::collections::BTreeMap;

pub const STORE_MAGIC: [u8; 4] = *b"EPE1";
pub const STORE_FORMAT_VERSION: u32 = 1;

/// Decode failures for both wire formats. Encoding is infallible.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("bad magic, not a policy store")]
    BadMagic,

    #[error("unsupported store format version {0}")]
    UnsupportedVersion(u32),

    #[error("input truncated at byte {0}")]
    Truncated(usize),

    #[error("declared {declared} nodes, decoded {decoded}")]
    NodeCountMismatch { declared: u64, decoded: u64 },

    #[error("root record must carry an empty segment")]
    RootSegmentNotEmpty,

    #[error("non-root record carries an empty segment")]
    EmptySegment,

    #[error("duplicate sibling segment {0:?}")]
    DuplicateSegment(String),

    #[error("segment is not valid UTF-8")]
    InvalidUtf8,

    #[error("{0} trailing bytes after body")]
    TrailingBytes(usize),
}

// ---------------------------------------------------------------------------
// Store encode
// ---------------------------------------------------------------------------

/// Serialize a store into the `EPE1` interchange format.
pub fn encode_store(store: &PolicyStore) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&STORE_MAGIC);
    out.extend_from_slice(&STORE_FORMAT_VERSION.to_le_bytes());
    out.extend_from_slice(&store.node_count().to_le_bytes());
    encode_node(store.root(), "", &mut out);
    out
}

fn encode_node(node: &TrieNode, segment: &str, out: &mut Vec<u8>) {
    out.extend_from_slice(&(segment.len() as u16).to_le_bytes());
    out.extend_from_slice(segment.as_bytes());
    let mut flags = 0u8;
    if node.allowed {
        flags |= 0b01;
    }
    if node.suppressed {
        flags |= 0b10;
    }
    out.push(flags);
    out.extend_from_slice(&(node.children.len() as u32).to_le_bytes());
    for (key, child) in &node.children {
        encode_node(child, key, out);
    }
}

// ---------------------------------------------------------------------------
// Store decode
// ---------------------------------------------------------------------------

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(CodecError::Truncated(self.pos))?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.take(1)?[0])
    }

    fn read_u16(&mut self) -> Result<u16, CodecError> {
        let bytes = self.take(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    fn read_u32(&mut self) -> Result<u32, CodecError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_u64(&mut self) -> Result<u64, CodecError> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }
}

struct NodeRecord {
    segment: String,
    node: TrieNode,
    child_count: u32,
}

fn read_record(reader: &mut Reader<'_>) -> Result<NodeRecord, CodecError> {
    let segment_len = reader.read_u16()? as usize;
    let segment = std::str::from_utf8(reader.take(segment_len)?)
        .map_err(|_| CodecError::InvalidUtf8)?
        .to_owned();
    let flags = reader.read_u8()?;
    let child_count = reader.read_u32()?;
    Ok(NodeRecord {
        segment,
        node: TrieNode {
            allowed: flags & 0b01 != 0,
            suppressed: flags & 0b10 != 0,
            children: BTreeMap::new(),
        },
        child_count,
    })
}

/// Deserialize an `EPE1` byte stream back into a store.
///
/// The walk is iterative so adversarially deep inputs cannot exhaust the
/// stack. Any structural inconsistency (truncation, sibling duplicates,
/// wrong node count, bytes past the body) is a hard error and produces no
/// partial store.
pub fn decode_store(bytes: &[u8]) -> Result<PolicyStore, CodecError> {
    let mut reader = Reader::new(bytes);

    if reader.take(4)? != STORE_MAGIC {
        return Err(CodecError::BadMagic);
    }
    let format_version = reader.read_u32()?;
    if format_version != STORE_FORMAT_VERSION {
        return Err(CodecError::UnsupportedVersion(format_version));
    }
    let declared = reader.read_u64()?;

    let root_record = read_record(&mut reader)?;
    if !root_record.segment.is_empty() {
        return Err(CodecError::RootSegmentNotEmpty);
    }

    struct Frame {
        segment: String,
        node: TrieNode,
        remaining: u32,
    }

    let mut decoded: u64 = 1;
    let mut stack = vec![Frame {
        segment: String::new(),
        node: root_record.node,
        remaining: root_record.child_count,
    }];

    let root = loop {
        // When the top frame has all children attached, fold it into its
        // parent; the root folding out of the stack ends the walk.
        if stack.last().is_some_and(|frame| frame.remaining == 0) {
            let done = stack.pop().expect("presence just checked");
            match stack.last_mut() {
                Some(parent) => {
                    if parent
                        .node
                        .children
                        .insert(done.segment.clone(), done.node)
                        .is_some()
                    {
                        return Err(CodecError::DuplicateSegment(done.segment));
                    }
                }
                None => break done.node,
            }
            continue;
        }

        let record = read_record(&mut reader)?;
        if record.segment.is_empty() {
            return Err(CodecError::EmptySegment);
        }
        let top = stack.last_mut().expect("walk in progress has a frame");
        top.remaining -= 1;
        decoded += 1;
        stack.push(Frame {
            segment: record.segment,
            node: record.node,
            remaining: record.child_count,
        });
    };

    if decoded != declared {
        return Err(CodecError::NodeCountMismatch { declared, decoded });
    }
    if reader.remaining() != 0 {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }

    Ok(PolicyStore::from_root(root))
}

// ---------------------------------------------------------------------------
// Snapshot export
// ---------------------------------------------------------------------------

/// Encode a snapshot into the length-prefixed lookup table the sidecar
/// loads. Paths are written sorted so the output is stable.
pub fn encode_snapshot(snapshot: &FlatSnapshot) -> Vec<u8> {
    let paths = snapshot.sorted_paths();
    let mut out = Vec::new();
    out.extend_from_slice(&snapshot.version().to_le_bytes());
    out.extend_from_slice(&(paths.len() as u32).to_le_bytes());
    for path in paths {
        out.extend_from_slice(&(path.len() as u16).to_le_bytes());
        out.extend_from_slice(path.as_bytes());
    }
    out
}

/// Decode a snapshot export into `(version, paths)`. The reference decoder
/// for sidecar implementations, also used by the round-trip tests.
pub fn decode_snapshot(bytes: &[u8]) -> Result<(u64, Vec<String>), CodecError> {
    let mut reader = Reader::new(bytes);
    let version = reader.read_u64()?;
    let count = reader.read_u32()? as usize;
    let mut paths = Vec::with_capacity(count.min(4096));
    for _ in 0..count {
        let len = reader.read_u16()? as usize;
        let path = std::str::from_utf8(reader.take(len)?)
            .map_err(|_| CodecError::InvalidUtf8)?
            .to_owned();
        paths.push(path);
    }
    if reader.remaining() != 0 {
        return Err(CodecError::TrailingBytes(reader.remaining()));
    }
    Ok((version, paths))
}
