//! Dotted field-path parsing and validation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use std::fmt;

/// Reasons a raw path string is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    #[error("path is empty")]
    Empty,

    #[error("empty segment at position {0}")]
    EmptySegment(usize),

    #[error("segment at position {position} is {len} bytes, limit is {limit}")]
    SegmentTooLong {
        position: usize,
        len: usize,
        limit: usize,
    },

    #[error("path has {depth} segments, limit is {limit}")]
    TooDeep { depth: usize, limit: usize },
}

/// Size limits applied when parsing raw path strings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct PathLimits {
    /// Maximum byte length of a single segment.
    pub max_segment_bytes: usize,
    /// Maximum number of segments in a path.
    pub max_depth: usize,
}

impl Default for PathLimits {
    fn default() -> Self {
        Self {
            max_segment_bytes: 256,
            max_depth: 32,
        }
    }
}

/// A validated dotted path, e.g. `user.profile.email`.
///
/// Segments are non-empty and contain no `.`; there is no escape syntax.
/// Two paths are equal iff their segment sequences are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    segments: Vec<String>,
}

impl FieldPath {
    /// Parse and validate a raw dotted string against `limits`.
    ///
    /// The empty string, leading/trailing dots, and doubled dots (`a..b`)
    /// all produce an empty segment and are rejected.
    pub fn parse(raw: &str, limits: &PathLimits) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        for (position, segment) in raw.split('.').enumerate() {
            if segment.is_empty() {
                return Err(PathError::EmptySegment(position));
            }
            if segment.len() > limits.max_segment_bytes {
                return Err(PathError::SegmentTooLong {
                    position,
                    len: segment.len(),
                    limit: limits.max_segment_bytes,
                });
            }
            segments.push(segment.to_owned());
        }

        if segments.len() > limits.max_depth {
            return Err(PathError::TooDeep {
                depth: segments.len(),
                limit: limits.max_depth,
            });
        }

        Ok(Self { segments })
    }

    /// Number of segments.
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().map(String::as_str)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("."))
    }
}
