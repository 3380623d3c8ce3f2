//! Topology index — maps (domain, rack, machine, numa) to flat indices.
//!
//! The cluster is a regular grid: every domain has the same number of
//! racks, every rack the same number of machines, every machine the same
//! NUMA layout. Global ids are therefore pure arithmetic on the counts.

use serde::{Deserialize, Serialize};

use crate::error::{ViolationKind, ViolationResult};
use crate::types::Placement;

/// Grid dimensions announced in the first problem line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Topology {
    pub domains: usize,
    pub racks_per_domain: usize,
    pub machines_per_rack: usize,
    pub numas_per_machine: usize,
}

/// A 1-based coordinate exactly as the contestant wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawCoordinate {
    pub domain: i64,
    pub rack: i64,
    pub machine: i64,
    pub numa: i64,
    pub numa_second: Option<i64>,
}

impl Topology {
    pub fn new(
        domains: usize,
        racks_per_domain: usize,
        machines_per_rack: usize,
        numas_per_machine: usize,
    ) -> Self {
        Self {
            domains,
            racks_per_domain,
            machines_per_rack,
            numas_per_machine,
        }
    }

    pub fn rack_count(&self) -> usize {
        self.domains * self.racks_per_domain
    }

    pub fn machine_count(&self) -> usize {
        self.rack_count() * self.machines_per_rack
    }

    pub fn rack_global(&self, domain: usize, rack: usize) -> usize {
        rack + self.racks_per_domain * domain
    }

    pub fn machine_global(&self, domain: usize, rack: usize, machine: usize) -> usize {
        machine + self.machines_per_rack * self.rack_global(domain, rack)
    }

    /// Flat index of a NUMA cell, row-major over (domain, rack, machine, numa).
    pub fn cell(&self, domain: usize, rack: usize, machine: usize, numa: usize) -> usize {
        numa + self.numas_per_machine * self.machine_global(domain, rack, machine)
    }

    /// Validate a 1-based coordinate and turn it into a [`Placement`].
    ///
    /// A second NUMA index must differ from the first.
    pub fn locate(&self, raw: RawCoordinate, partition: usize) -> ViolationResult<Placement> {
        let numa_second = match raw.numa_second {
            Some(n) => {
                let n = check_range("numa", n, self.numas_per_machine)?;
                if raw.numa == n as i64 + 1 {
                    return Err(ViolationKind::SameNuma);
                }
                Some(n)
            }
            None => None,
        };
        let domain = check_range("network domain", raw.domain, self.domains)?;
        let rack = check_range("rack", raw.rack, self.racks_per_domain)?;
        let machine = check_range("machine", raw.machine, self.machines_per_rack)?;
        let numa = check_range("numa", raw.numa, self.numas_per_machine)?;

        Ok(Placement {
            domain,
            rack,
            rack_global: self.rack_global(domain, rack),
            machine,
            machine_global: self.machine_global(domain, rack, machine),
            numa,
            numa_second,
            partition,
        })
    }
}

/// Check `1 <= value <= max` and return the 0-based index.
fn check_range(field: &'static str, value: i64, max: usize) -> ViolationResult<usize> {
    if value >= 1 && (value as u64) <= max as u64 {
        Ok(value as usize - 1)
    } else {
        Err(ViolationKind::OutOfRange { field, value, max })
    }
}
