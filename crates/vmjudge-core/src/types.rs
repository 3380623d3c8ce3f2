//! Shared types used across vmjudge crates.
//!
//! All indices stored here are 0-based. The wire protocol is 1-based and
//! conversion happens exactly once, in [`crate::Topology::locate`].

use serde::{Deserialize, Serialize};

/// Index of a VM type in the problem's type table (0-based).
pub type TypeId = usize;

/// Index of a placement group in the session's group table (0-based).
pub type GroupId = usize;

// ── Problem description ────────────────────────────────────────────

/// Capacity of one NUMA slot, identical for every machine in the cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NumaCapacity {
    pub cpu: u64,
    pub mem: u64,
}

/// An immutable VM flavour: how many NUMA nodes it spans and what it
/// consumes on each of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VmType {
    /// 1 or 2.
    pub numa_count: u8,
    pub cpu: u64,
    pub mem: u64,
}

/// Strength of an affinity rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affinity {
    #[default]
    None,
    /// Violations are tolerated but cost score.
    Soft,
    /// Violations abort the session.
    Hard,
}

impl Affinity {
    /// Decode the protocol's `0 | 1 | 2` encoding.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Affinity::None),
            1 => Some(Affinity::Soft),
            2 => Some(Affinity::Hard),
            _ => None,
        }
    }

    pub fn is_active(self) -> bool {
        self != Affinity::None
    }
}

/// Constraint flags of a placement group, as declared by a type-1 request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct GroupConfig {
    /// Number of rack anti-affinity partitions; 0 disables the rule.
    pub rack_anti_affinity: u32,
    /// Max VMs of the group per machine; 0 disables the rule.
    pub host_anti_affinity: u32,
    pub network_affinity: Affinity,
    pub rack_affinity: Affinity,
}

// ── Placements ─────────────────────────────────────────────────────

/// Where a single VM instance landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub domain: usize,
    pub rack: usize,
    pub rack_global: usize,
    pub machine: usize,
    pub machine_global: usize,
    pub numa: usize,
    /// Second NUMA node for two-NUMA VM types.
    pub numa_second: Option<usize>,
    /// Rack anti-affinity partition tag.
    pub partition: usize,
}

impl Placement {
    /// The NUMA indices this placement occupies.
    pub fn numas(&self) -> impl Iterator<Item = usize> + '_ {
        std::iter::once(self.numa).chain(self.numa_second)
    }
}

/// A placed VM. The record outlives the VM so external ids stay stable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmRecord {
    pub type_id: TypeId,
    pub group_id: GroupId,
    pub placement: Placement,
    pub released: bool,
}

// ── Scoring inputs ─────────────────────────────────────────────────

/// Reference result used to normalize a run's counters into a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaselineScore {
    pub placed: u64,
    pub soft_fulfilled: u64,
}

/// Running totals of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Counters {
    pub placed: u64,
    pub soft_fulfilled: u64,
    pub soft_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn affinity_codes() {
        assert_eq!(Affinity::from_code(0), Some(Affinity::None));
        assert_eq!(Affinity::from_code(1), Some(Affinity::Soft));
        assert_eq!(Affinity::from_code(2), Some(Affinity::Hard));
        assert_eq!(Affinity::from_code(3), None);
        assert_eq!(Affinity::from_code(-1), None);
    }

    #[test]
    fn placement_numas_iterates_both_nodes() {
        let p = Placement {
            domain: 0,
            rack: 0,
            rack_global: 0,
            machine: 0,
            machine_global: 0,
            numa: 1,
            numa_second: Some(0),
            partition: 0,
        };
        assert_eq!(p.numas().collect::<Vec<_>>(), vec![1, 0]);
    }
}
