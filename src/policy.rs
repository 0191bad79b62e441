//! Hierarchical path policy: the trie store, the flat compiler, and the
//! wire codecs.
//!
//! A policy is a tree of dotted-path segments where each node carries two
//! independent flags: `allowed` (the path is explicitly permitted) and
//! `suppressed` (the subtree is blocked). Suppression always wins over
//! allowance and prunes everything beneath it. The compiler materializes
//! the effective allow set into an immutable snapshot the data plane can
//! query in O(1).

mod codec;
mod compiler;
mod path;
mod store;

pub use codec::{
    decode_snapshot, decode_store, encode_snapshot, encode_store, CodecError, STORE_FORMAT_VERSION,
    STORE_MAGIC,
};
pub use compiler::{compile, FlatSnapshot};
pub use path::{FieldPath, PathError, PathLimits};
pub use store::{Access, PolicyStore};

use thiserror::Error;

/// Errors surfaced by the policy engine core.
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("invalid path: {0}")]
    InvalidPath(#[from] PathError),

    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("capacity exceeded: {0}")]
    Capacity(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] CodecError),

    /// Internal only: the coordinator degrades this to an OBSERVE decision
    /// before it ever reaches a caller.
    #[error("agent degraded: non-finite Q value")]
    AgentDegraded,
}
