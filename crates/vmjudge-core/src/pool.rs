//! Resource pool — CPU/memory accounting for every NUMA node in the grid.
//!
//! Every machine shares the same per-NUMA capacities, so the grid is a
//! flat `Vec` addressed through [`Topology::cell`].

use tracing::trace;

use crate::error::{Resource, ViolationKind, ViolationResult};
use crate::topology::Topology;
use crate::types::{NumaCapacity, Placement, VmType};

/// Capacity and usage of a single NUMA node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumaNode {
    pub cpu_total: u64,
    pub mem_total: u64,
    pub cpu_used: u64,
    pub mem_used: u64,
}

impl NumaNode {
    pub fn new(capacity: NumaCapacity) -> Self {
        Self {
            cpu_total: capacity.cpu,
            mem_total: capacity.mem,
            cpu_used: 0,
            mem_used: 0,
        }
    }

    pub fn free_cpu(&self) -> u64 {
        self.cpu_total.saturating_sub(self.cpu_used)
    }

    pub fn free_mem(&self) -> u64 {
        self.mem_total.saturating_sub(self.mem_used)
    }

    /// Check whether `vm` fits without touching the counters.
    pub fn check(&self, vm: &VmType) -> ViolationResult<()> {
        let cpu = self.cpu_used + vm.cpu;
        if cpu > self.cpu_total {
            return Err(ViolationKind::CapacityExceeded {
                resource: Resource::Cpu,
                used: cpu,
                total: self.cpu_total,
            });
        }
        let mem = self.mem_used + vm.mem;
        if mem > self.mem_total {
            return Err(ViolationKind::CapacityExceeded {
                resource: Resource::Memory,
                used: mem,
                total: self.mem_total,
            });
        }
        Ok(())
    }

    pub fn allocate(&mut self, vm: &VmType) -> ViolationResult<()> {
        self.check(vm)?;
        self.cpu_used += vm.cpu;
        self.mem_used += vm.mem;
        Ok(())
    }

    /// Undo a prior [`NumaNode::allocate`] of the same type.
    pub fn release(&mut self, vm: &VmType) {
        debug_assert!(self.cpu_used >= vm.cpu && self.mem_used >= vm.mem);
        self.cpu_used = self.cpu_used.saturating_sub(vm.cpu);
        self.mem_used = self.mem_used.saturating_sub(vm.mem);
    }
}

/// The full `domain × rack × machine × numa` grid of NUMA nodes.
#[derive(Debug, Clone)]
pub struct ResourcePool {
    topology: Topology,
    nodes: Vec<NumaNode>,
}

impl ResourcePool {
    /// Build the grid; `capacities[i]` is the capacity of NUMA slot `i` on
    /// every machine.
    pub fn new(topology: Topology, capacities: &[NumaCapacity]) -> Self {
        debug_assert_eq!(capacities.len(), topology.numas_per_machine);
        let per_machine: Vec<NumaNode> = capacities.iter().copied().map(NumaNode::new).collect();
        let nodes = (0..topology.machine_count())
            .flat_map(|_| per_machine.iter().copied())
            .collect();
        Self { topology, nodes }
    }

    pub fn node(&self, cell: usize) -> &NumaNode {
        &self.nodes[cell]
    }

    pub fn allocate(&mut self, cell: usize, vm: &VmType) -> ViolationResult<()> {
        self.nodes[cell].allocate(vm)
    }

    pub fn release(&mut self, cell: usize, vm: &VmType) {
        self.nodes[cell].release(vm);
    }

    /// Allocate every NUMA node a placement occupies. Either all nodes are
    /// charged or none are.
    pub fn allocate_vm(&mut self, placement: &Placement, vm: &VmType) -> ViolationResult<()> {
        let cells: Vec<usize> = self.cells_of(placement).collect();
        for &cell in &cells {
            self.nodes[cell].check(vm)?;
        }
        for &cell in &cells {
            self.nodes[cell].allocate(vm)?;
        }
        trace!(
            machine = placement.machine_global,
            numas = cells.len(),
            cpu = vm.cpu,
            mem = vm.mem,
            "allocated"
        );
        Ok(())
    }

    pub fn release_vm(&mut self, placement: &Placement, vm: &VmType) {
        let cells: Vec<usize> = self.cells_of(placement).collect();
        for cell in cells {
            self.nodes[cell].release(vm);
        }
    }

    /// Sum of `(cpu_used, mem_used)` over the whole grid.
    pub fn total_used(&self) -> (u64, u64) {
        self.nodes
            .iter()
            .fold((0, 0), |(cpu, mem), n| (cpu + n.cpu_used, mem + n.mem_used))
    }

    fn cells_of<'a>(&'a self, placement: &'a Placement) -> impl Iterator<Item = usize> + 'a {
        placement.numas().map(move |numa| {
            self.topology
                .cell(placement.domain, placement.rack, placement.machine, numa)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::topology::RawCoordinate;

    fn small_vm() -> VmType {
        VmType { numa_count: 1, cpu: 2, mem: 2 }
    }

    fn pool() -> ResourcePool {
        ResourcePool::new(
            Topology::new(1, 1, 2, 2),
            &[NumaCapacity { cpu: 4, mem: 4 }, NumaCapacity { cpu: 8, mem: 2 }],
        )
    }

    fn place(machine: i64, numa: i64, second: Option<i64>) -> Placement {
        Topology::new(1, 1, 2, 2)
            .locate(
                RawCoordinate {
                    domain: 1,
                    rack: 1,
                    machine,
                    numa,
                    numa_second: second,
                },
                0,
            )
            .unwrap()
    }

    #[test]
    fn grid_uses_per_slot_capacities() {
        let pool = pool();
        assert_eq!(pool.node(0).cpu_total, 4);
        assert_eq!(pool.node(1).cpu_total, 8);
        assert_eq!(pool.node(2).cpu_total, 4);
        assert_eq!(pool.node(3).mem_total, 2);
    }

    #[test]
    fn allocate_then_release_round_trips() {
        let mut node = NumaNode::new(NumaCapacity { cpu: 4, mem: 4 });
        node.allocate(&small_vm()).unwrap();
        assert_eq!((node.cpu_used, node.mem_used), (2, 2));
        node.release(&small_vm());
        assert_eq!((node.cpu_used, node.mem_used), (0, 0));
    }

    #[test]
    fn allocate_fills_exactly_to_capacity() {
        let mut node = NumaNode::new(NumaCapacity { cpu: 4, mem: 4 });
        node.allocate(&small_vm()).unwrap();
        node.allocate(&small_vm()).unwrap();
        assert_eq!(node.free_cpu(), 0);
        assert_eq!(node.free_mem(), 0);
    }

    #[test]
    fn overflow_is_rejected_without_mutation() {
        let mut node = NumaNode::new(NumaCapacity { cpu: 4, mem: 1 });
        let err = node.allocate(&small_vm()).unwrap_err();
        assert_eq!(
            err,
            ViolationKind::CapacityExceeded { resource: Resource::Memory, used: 2, total: 1 }
        );
        assert_eq!((node.cpu_used, node.mem_used), (0, 0));
    }

    #[test]
    fn two_numa_vm_is_all_or_nothing() {
        let mut pool = pool();
        let wide = VmType { numa_count: 2, cpu: 1, mem: 2 };

        // Fills NUMA 2 of machine 1 on memory.
        pool.allocate_vm(&place(1, 1, Some(2)), &wide).unwrap();
        assert_eq!(pool.total_used(), (2, 4));

        let err = pool.allocate_vm(&place(1, 1, Some(2)), &wide).unwrap_err();
        assert!(matches!(err, ViolationKind::CapacityExceeded { resource: Resource::Memory, .. }));
        // NUMA 1 still had room but must not have been charged.
        assert_eq!(pool.node(0).mem_used, 2);
        assert_eq!(pool.total_used(), (2, 4));

        pool.release_vm(&place(1, 1, Some(2)), &wide);
        assert_eq!(pool.total_used(), (0, 0));
    }

    #[test]
    fn machines_are_independent() {
        let mut pool = pool();
        pool.allocate_vm(&place(1, 1, None), &small_vm()).unwrap();
        pool.allocate_vm(&place(1, 1, None), &small_vm()).unwrap();
        assert!(pool.allocate_vm(&place(1, 1, None), &small_vm()).is_err());
        pool.allocate_vm(&place(2, 1, None), &small_vm()).unwrap();
        assert_eq!(pool.node(2).cpu_used, 2);
    }
}
