//! Error types shared by the judge crates.
//!
//! A [`ViolationKind`] is something the contestant did wrong. Pinned to a
//! request id it becomes a [`Violation`], which always ends the session.
//! A [`ProblemError`] means the judge's own inputs are broken.

use std::time::Duration;

use thiserror::Error;

/// Result type alias for operations that may catch the contestant out.
pub type ViolationResult<T> = Result<T, ViolationKind>;

/// Which capacity dimension overflowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Cpu,
    Memory,
}

impl std::fmt::Display for Resource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Resource::Cpu => write!(f, "CPU"),
            Resource::Memory => write!(f, "memory"),
        }
    }
}

/// A contract violation by the contestant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ViolationKind {
    #[error("NUMA {resource} capacity exceeded ({used} used of {total})")]
    CapacityExceeded {
        resource: Resource,
        used: u64,
        total: u64,
    },

    #[error("rack anti-affinity violated: rack {rack} holds partition {existing}, got {requested}")]
    RackAntiAffinity {
        rack: usize,
        existing: usize,
        requested: usize,
    },

    #[error("hard network affinity violated")]
    NetworkAffinity,

    #[error("hard rack affinity violated")]
    RackAffinity,

    #[error("partial placements are forbidden")]
    PartialPlacement,

    #[error("wrong number of NUMAs in the output: expected {expected}, got {actual}")]
    WrongNumaCount { expected: u8, actual: u8 },

    #[error("2-NUMA VMs must be placed on different NUMAs")]
    SameNuma,

    #[error("{field} index {value} out of range 1..={max}")]
    OutOfRange {
        field: &'static str,
        value: i64,
        max: usize,
    },

    #[error("malformed response: {0:?}")]
    Malformed(String),

    #[error("no response within {0:?}")]
    Timeout(Duration),

    #[error("contestant closed its output")]
    Disconnected,

    #[error("contestant exited with {0}")]
    Exit(String),
}

impl ViolationKind {
    /// Attribute this violation to a request.
    pub fn at(self, request_id: u64) -> Violation {
        Violation {
            request_id,
            kind: self,
        }
    }
}

/// A violation attributed to the request that triggered it.
///
/// Request ids count type-tagged requests from 1; id 0 covers anything
/// that happens before the first request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} (request #{request_id})")]
pub struct Violation {
    pub request_id: u64,
    pub kind: ViolationKind,
}

/// The problem or baseline input is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("line {line}: {message}")]
pub struct ProblemError {
    /// 1-based line number in the offending file.
    pub line: usize,
    pub message: String,
}

impl ProblemError {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn violation_message_names_request() {
        let v = ViolationKind::PartialPlacement.at(7);
        assert_eq!(v.to_string(), "partial placements are forbidden (request #7)");
    }

    #[test]
    fn capacity_message_names_resource() {
        let kind = ViolationKind::CapacityExceeded {
            resource: Resource::Memory,
            used: 5,
            total: 4,
        };
        assert_eq!(kind.to_string(), "NUMA memory capacity exceeded (5 used of 4)");
    }
}
