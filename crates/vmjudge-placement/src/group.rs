//! Placement-group tracker — affinity and anti-affinity bookkeeping.
//!
//! One tracker per placement group. It is fed every placement and release
//! that references the group and answers two questions:
//! 1. Did this placement break a hard rule? (returns a [`Violation`])
//! 2. Did it keep the group's soft rules? (returns `bool`)
//!
//! Counts are kept per key so a release is O(1); the touched-domain and
//! touched-rack sets detect "the group now spans more than one location"
//! without rescanning members.

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use vmjudge_core::{Affinity, GroupConfig, Placement, Violation, ViolationKind};

/// A group declared both rack rules, which cannot hold together.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("placement group can't have both rack anti-affinity and rack affinity")]
pub struct ConflictingRackRules;

/// Soft-constraint contribution of one placement batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SoftTally {
    /// VMs that were subject to a soft rule.
    pub total: u64,
    /// VMs that ended up honouring every soft rule.
    pub fulfilled: u64,
}

/// Live constraint state for a single placement group.
#[derive(Debug, Clone)]
pub struct PlacementGroup {
    config: GroupConfig,
    /// Global rack id → partition owning that rack (rack anti-affinity).
    rack_partition: HashMap<usize, usize>,
    /// Global rack id → VMs of this group on the rack. Shared by both rack
    /// rules, which are mutually exclusive.
    rack_vm_count: HashMap<usize, u32>,
    /// Global machine id → VMs of this group on the machine.
    host_vm_count: HashMap<usize, u32>,
    /// Domain → VMs of this group in the domain.
    net_vm_count: HashMap<usize, u32>,
    /// Domains currently holding at least one VM.
    touched_domains: HashSet<usize>,
    /// Racks currently holding at least one VM (rack affinity).
    touched_racks: HashSet<usize>,
}

impl PlacementGroup {
    pub fn new(config: GroupConfig) -> Result<Self, ConflictingRackRules> {
        if config.rack_anti_affinity > 0 && config.rack_affinity.is_active() {
            return Err(ConflictingRackRules);
        }
        Ok(Self {
            config,
            rack_partition: HashMap::new(),
            rack_vm_count: HashMap::new(),
            host_vm_count: HashMap::new(),
            net_vm_count: HashMap::new(),
            touched_domains: HashSet::new(),
            touched_racks: HashSet::new(),
        })
    }

    /// Whether any rule of this group is soft, i.e. worth scoring.
    pub fn has_soft_constraints(&self) -> bool {
        self.config.host_anti_affinity > 0
            || self.config.network_affinity == Affinity::Soft
            || self.config.rack_affinity == Affinity::Soft
    }

    /// Whether `machine_global` is within the host anti-affinity threshold.
    pub fn host_ok(&self, machine_global: usize) -> bool {
        let threshold = self.config.host_anti_affinity;
        threshold == 0 || self.host_vm_count.get(&machine_global).copied().unwrap_or(0) <= threshold
    }

    /// VMs of this group currently on a rack.
    pub fn rack_count(&self, rack_global: usize) -> u32 {
        self.rack_vm_count.get(&rack_global).copied().unwrap_or(0)
    }

    /// Number of distinct domains the group currently spans.
    pub fn domain_span(&self) -> usize {
        self.touched_domains.len()
    }

    /// Number of distinct racks the group currently spans (rack affinity).
    pub fn rack_span(&self) -> usize {
        self.touched_racks.len()
    }

    /// Register a placement.
    ///
    /// Returns `Ok(false)` when a soft affinity rule is now broken. Host
    /// anti-affinity never fails here; check it with [`Self::host_ok`] once
    /// the whole batch is registered.
    pub fn new_placement(&mut self, placement: &Placement, request_id: u64) -> Result<bool, Violation> {
        let mut soft_ok = true;

        if self.config.rack_anti_affinity > 0 {
            let rack = placement.rack_global;
            let count = self.rack_vm_count.entry(rack).or_insert(0);
            if *count > 0 {
                let existing = self.rack_partition.get(&rack).copied().unwrap_or(placement.partition);
                if existing != placement.partition {
                    return Err(ViolationKind::RackAntiAffinity {
                        rack,
                        existing,
                        requested: placement.partition,
                    }
                    .at(request_id));
                }
            } else {
                self.rack_partition.insert(rack, placement.partition);
            }
            *count += 1;
        }

        if self.config.host_anti_affinity > 0 {
            *self.host_vm_count.entry(placement.machine_global).or_insert(0) += 1;
        }

        if self.config.network_affinity.is_active() {
            *self.net_vm_count.entry(placement.domain).or_insert(0) += 1;
            self.touched_domains.insert(placement.domain);
            if self.touched_domains.len() > 1 {
                if self.config.network_affinity == Affinity::Hard {
                    return Err(ViolationKind::NetworkAffinity.at(request_id));
                }
                debug!(request_id, domains = self.touched_domains.len(), "soft network affinity broken");
                soft_ok = false;
            }
        }

        if self.config.rack_affinity.is_active() {
            let rack = placement.rack_global;
            *self.rack_vm_count.entry(rack).or_insert(0) += 1;
            self.touched_racks.insert(rack);
            if self.touched_racks.len() > 1 {
                if self.config.rack_affinity == Affinity::Hard {
                    return Err(ViolationKind::RackAffinity.at(request_id));
                }
                debug!(request_id, racks = self.touched_racks.len(), "soft rack affinity broken");
                soft_ok = false;
            }
        }

        Ok(soft_ok)
    }

    /// Undo a prior [`Self::new_placement`].
    pub fn delete_placement(&mut self, placement: &Placement) {
        let rack = placement.rack_global;

        if self.config.rack_anti_affinity > 0 || self.config.rack_affinity.is_active() {
            decrement(&mut self.rack_vm_count, rack);
        }
        if self.config.host_anti_affinity > 0 {
            decrement(&mut self.host_vm_count, placement.machine_global);
        }
        if self.config.network_affinity.is_active()
            && decrement(&mut self.net_vm_count, placement.domain) == 0
        {
            self.touched_domains.remove(&placement.domain);
        }
        if self.config.rack_affinity.is_active() && self.rack_count(rack) == 0 {
            self.touched_racks.remove(&rack);
        }
    }

    /// Settle the soft-constraint counters for a batch that was registered
    /// in full.
    ///
    /// `soft_ok` is the conjunction of every [`Self::new_placement`] result
    /// in the batch. Groups without a soft rule contribute nothing.
    pub fn tally_batch(&self, batch: &[Placement], soft_ok: bool) -> SoftTally {
        if !self.has_soft_constraints() {
            return SoftTally::default();
        }
        let total = batch.len() as u64;
        let fulfilled = if !soft_ok {
            0
        } else if self.config.host_anti_affinity > 0 {
            batch.iter().filter(|p| self.host_ok(p.machine_global)).count() as u64
        } else {
            total
        };
        SoftTally { total, fulfilled }
    }
}

/// Decrement a lazily-initialized counter, returning the new value.
fn decrement(counts: &mut HashMap<usize, u32>, key: usize) -> u32 {
    let count = counts.entry(key).or_insert(0);
    *count = count.saturating_sub(1);
    *count
}
