//! Session state machine — one interactive judging run.
//!
//! The session reads the problem description, forwards it to the
//! contestant, and validates every placement the contestant answers with.
//! It owns all mutable state of the run:
//!
//! ```text
//! Session
//!   ├── Topology + ResourcePool   (CPU/memory per NUMA node)
//!   ├── VM types                  (fixed after AwaitingTypes)
//!   ├── PlacementGroup table      (one tracker per type-1 request)
//!   └── VM table                  (indexed by external VM id - 1)
//! ```
//!
//! Any violation ends the run immediately; the caller is responsible for
//! shutting the contestant down.

use tokio::io::{AsyncBufRead, AsyncRead, AsyncWrite};
use tracing::{debug, info};

use vmjudge_core::{
    Affinity, Counters, GroupConfig, NumaCapacity, Placement, RawCoordinate, ResourcePool,
    Topology, ViolationKind, VmRecord, VmType,
};
use vmjudge_placement::PlacementGroup;

use crate::error::SessionResult;
use crate::link::ContestantLink;
use crate::problem::{ProblemReader, parse_numbers};

/// Where the session is in the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    AwaitingTopology,
    AwaitingTypes,
    Running,
    /// Over; running again reports the same ending.
    Finished(Ending),
}

/// How a session that did not hit a violation came to an end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ending {
    /// The problem's end request was reached.
    Completed,
    /// The contestant declined a batch with `-1`.
    Declined,
}

/// Request tags of the problem stream.
const CREATE_GROUP: i64 = 1;
const PLACE_VMS: i64 = 2;
const RELEASE_VMS: i64 = 3;
const END: i64 = 4;

/// Marker for "no explicit partition" in a placement request.
const NO_PARTITION: i64 = -1;

/// Answer declining a whole placement batch.
const DECLINE: &str = "-1";

/// State of a single judging run.
pub struct Session {
    state: SessionState,
    request_id: u64,
    topology: Topology,
    pool: ResourcePool,
    types: Vec<VmType>,
    groups: Vec<PlacementGroup>,
    vms: Vec<VmRecord>,
    counters: Counters,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        let topology = Topology::new(0, 0, 0, 0);
        Self {
            state: SessionState::AwaitingTopology,
            request_id: 0,
            topology,
            pool: ResourcePool::new(topology, &[]),
            types: Vec::new(),
            groups: Vec::new(),
            vms: Vec::new(),
            counters: Counters::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Id of the request being (or last) processed; 0 before the first.
    pub fn request_id(&self) -> u64 {
        self.request_id
    }

    pub fn counters(&self) -> Counters {
        self.counters
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn groups(&self) -> &[PlacementGroup] {
        &self.groups
    }

    pub fn vms(&self) -> &[VmRecord] {
        &self.vms
    }

    /// Drive the session until it ends or fails.
    pub async fn run<P, R, W>(
        &mut self,
        problem: &mut ProblemReader<P>,
        link: &mut ContestantLink<R, W>,
    ) -> SessionResult<Ending>
    where
        P: AsyncBufRead + Unpin,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        loop {
            match self.state {
                SessionState::AwaitingTopology => self.read_topology(problem, link).await?,
                SessionState::AwaitingTypes => self.read_types(problem, link).await?,
                SessionState::Running => {
                    if let Some(ending) = self.next_request(problem, link).await? {
                        self.state = SessionState::Finished(ending);
                        info!(
                            requests = self.request_id,
                            placed = self.counters.placed,
                            ?ending,
                            "session over"
                        );
                        return Ok(ending);
                    }
                }
                SessionState::Finished(ending) => return Ok(ending),
            }
        }
    }

    /// Cluster dimensions and per-NUMA capacities.
    async fn read_topology<P, R, W>(
        &mut self,
        problem: &mut ProblemReader<P>,
        link: &mut ContestantLink<R, W>,
    ) -> SessionResult<()>
    where
        P: AsyncBufRead + Unpin,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let [domains, racks, machines, numas] = problem.next_array::<usize, 4>().await?;
        self.forward(link, &join(&[domains, racks, machines, numas])).await?;

        let mut capacities = Vec::with_capacity(numas);
        for _ in 0..numas {
            let [cpu, mem] = problem.next_array::<u64, 2>().await?;
            self.forward(link, &join(&[cpu, mem])).await?;
            capacities.push(NumaCapacity { cpu, mem });
        }

        self.topology = Topology::new(domains, racks, machines, numas);
        self.pool = ResourcePool::new(self.topology, &capacities);
        info!(domains, racks, machines, numas, "topology loaded");
        self.state = SessionState::AwaitingTypes;
        Ok(())
    }

    /// VM type table.
    async fn read_types<P, R, W>(
        &mut self,
        problem: &mut ProblemReader<P>,
        link: &mut ContestantLink<R, W>,
    ) -> SessionResult<()>
    where
        P: AsyncBufRead + Unpin,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let [count] = problem.next_array::<usize, 1>().await?;
        self.forward(link, &count.to_string()).await?;

        self.types = Vec::with_capacity(count);
        for _ in 0..count {
            let [numa_count, cpu, mem] = problem.next_array::<u64, 3>().await?;
            if !(1..=2).contains(&numa_count) {
                return Err(problem.error(format!("VM type spans {numa_count} NUMAs")).into());
            }
            self.forward(link, &join(&[numa_count, cpu, mem])).await?;
            self.types.push(VmType {
                numa_count: numa_count as u8,
                cpu,
                mem,
            });
        }
        self.flush(link).await?;

        info!(types = count, "VM types loaded");
        self.state = SessionState::Running;
        Ok(())
    }

    /// Process one request. Returns the ending once the run is over.
    async fn next_request<P, R, W>(
        &mut self,
        problem: &mut ProblemReader<P>,
        link: &mut ContestantLink<R, W>,
    ) -> SessionResult<Option<Ending>>
    where
        P: AsyncBufRead + Unpin,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        self.request_id += 1;
        let [tag] = problem.next_array::<i64, 1>().await?;
        if !(CREATE_GROUP..=END).contains(&tag) {
            return Err(problem.error(format!("unknown request type {tag}")).into());
        }
        self.forward(link, &tag.to_string()).await?;

        match tag {
            CREATE_GROUP => {
                self.create_group(problem, link).await?;
                Ok(None)
            }
            PLACE_VMS => self.place_vms(problem, link).await,
            RELEASE_VMS => {
                self.release_vms(problem, link).await?;
                Ok(None)
            }
            _ => {
                if let Err(e) = link.flush().await {
                    debug!(error = %e, "flush after end tag failed");
                }
                Ok(Some(Ending::Completed))
            }
        }
    }

    /// Type 1: declare a placement group.
    ///
    /// The first parameter line is forwarded as is. Both lines are then
    /// read as one token list and everything from the fourth token on is
    /// sent as the second line.
    async fn create_group<P, R, W>(
        &mut self,
        problem: &mut ProblemReader<P>,
        link: &mut ContestantLink<R, W>,
    ) -> SessionResult<()>
    where
        P: AsyncBufRead + Unpin,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut params = problem.next_numbers::<i64>().await?;
        self.forward(link, &join(&params)).await?;
        params.extend(problem.next_numbers::<i64>().await?);
        self.forward(link, &join(params.get(3..).unwrap_or(&[]))).await?;
        self.flush(link).await?;

        let &[_, rack_aa, host_aa, net_a, rack_a, ..] = params.as_slice() else {
            return Err(problem
                .error(format!("expected 5 group parameters, found {}", params.len()))
                .into());
        };
        let config = GroupConfig {
            rack_anti_affinity: u32::try_from(rack_aa)
                .map_err(|_| problem.error(format!("invalid rack anti-affinity {rack_aa}")))?,
            host_anti_affinity: u32::try_from(host_aa)
                .map_err(|_| problem.error(format!("invalid host anti-affinity {host_aa}")))?,
            network_affinity: affinity(problem, net_a)?,
            rack_affinity: affinity(problem, rack_a)?,
        };
        let group = PlacementGroup::new(config).map_err(|e| problem.error(e.to_string()))?;

        debug!(
            request_id = self.request_id,
            group = self.groups.len() + 1,
            ?config,
            "placement group created"
        );
        self.groups.push(group);
        Ok(())
    }

    /// Type 2: ask the contestant to place a batch of VMs and validate
    /// every answer.
    async fn place_vms<P, R, W>(
        &mut self,
        problem: &mut ProblemReader<P>,
        link: &mut ContestantLink<R, W>,
    ) -> SessionResult<Option<Ending>>
    where
        P: AsyncBufRead + Unpin,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let [count, type_no, group_no, partition] = problem.next_array::<i64, 4>().await?;
        self.forward(link, &join(&[count, type_no, group_no, partition])).await?;
        let ids = problem.next_numbers::<i64>().await?;
        if count < 0 || ids.len() as i64 != count {
            return Err(problem
                .error(format!("batch of {count} VMs lists {} ids", ids.len()))
                .into());
        }
        self.forward(link, &join(&ids)).await?;
        self.flush(link).await?;

        let type_id = index(type_no, self.types.len())
            .ok_or_else(|| problem.error(format!("unknown VM type {type_no}")))?;
        let group_id = index(group_no, self.groups.len())
            .ok_or_else(|| problem.error(format!("unknown placement group {group_no}")))?;
        let explicit_partition = match partition {
            NO_PARTITION => None,
            p if p >= 1 => Some(p as usize - 1),
            p => return Err(problem.error(format!("invalid partition {p}")).into()),
        };

        let vm_type = self.types[type_id];
        let request_id = self.request_id;
        let mut batch: Vec<Placement> = Vec::with_capacity(count as usize);
        let mut soft_ok = true;

        for position in 0..count as usize {
            let line = link.recv_line().await.map_err(|k| k.at(request_id))?;
            if line == DECLINE {
                if position > 0 {
                    return Err(ViolationKind::PartialPlacement.at(request_id).into());
                }
                info!(request_id, "contestant declined the batch");
                return Ok(Some(Ending::Declined));
            }

            let coord = parse_response(&line, vm_type.numa_count).map_err(|k| k.at(request_id))?;
            let placement = self
                .topology
                .locate(coord, explicit_partition.unwrap_or(position))
                .map_err(|k| k.at(request_id))?;

            self.pool
                .allocate_vm(&placement, &vm_type)
                .map_err(|k| k.at(request_id))?;
            let ok = self.groups[group_id].new_placement(&placement, request_id)?;
            soft_ok &= ok;

            debug!(
                request_id,
                vm = self.vms.len() + 1,
                domain = placement.domain,
                rack = placement.rack_global,
                machine = placement.machine_global,
                soft_ok = ok,
                "VM placed"
            );
            self.vms.push(VmRecord {
                type_id,
                group_id,
                placement,
                released: false,
            });
            batch.push(placement);
        }

        let tally = self.groups[group_id].tally_batch(&batch, soft_ok);
        self.counters.placed += batch.len() as u64;
        self.counters.soft_total += tally.total;
        self.counters.soft_fulfilled += tally.fulfilled;
        Ok(None)
    }

    /// Type 3: release previously placed VMs.
    async fn release_vms<P, R, W>(
        &mut self,
        problem: &mut ProblemReader<P>,
        link: &mut ContestantLink<R, W>,
    ) -> SessionResult<()>
    where
        P: AsyncBufRead + Unpin,
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let line = problem.next_numbers::<i64>().await?;
        self.forward(link, &join(&line)).await?;
        self.flush(link).await?;

        let Some((&count, ids)) = line.split_first() else {
            return Err(problem.error("empty release request").into());
        };
        if ids.len() as i64 != count {
            return Err(problem
                .error(format!("release of {count} VMs lists {} ids", ids.len()))
                .into());
        }

        for &id in ids {
            let vm_id = index(id, self.vms.len())
                .ok_or_else(|| problem.error(format!("unknown VM id {id}")))?;
            let vm = &mut self.vms[vm_id];
            if vm.released {
                return Err(problem.error(format!("VM {id} released twice")).into());
            }
            vm.released = true;
            self.groups[vm.group_id].delete_placement(&vm.placement);
            self.pool.release_vm(&vm.placement, &self.types[vm.type_id]);
        }
        debug!(request_id = self.request_id, released = ids.len(), "VMs released");
        Ok(())
    }

    async fn forward<R, W>(&self, link: &mut ContestantLink<R, W>, line: &str) -> SessionResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        link.send_line(line).await.map_err(|k| k.at(self.request_id).into())
    }

    async fn flush<R, W>(&self, link: &mut ContestantLink<R, W>) -> SessionResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        link.flush().await.map_err(|k| k.at(self.request_id).into())
    }
}

/// Parse `net rack pm numa1 [numa2]`, checking the NUMA count against the
/// VM type.
fn parse_response(line: &str, expected_numas: u8) -> Result<RawCoordinate, ViolationKind> {
    let tokens = parse_numbers::<i64>(line).map_err(|_| ViolationKind::Malformed(line.to_string()))?;
    let (coord, numas) = match tokens.as_slice() {
        &[domain, rack, machine, numa] => (
            RawCoordinate { domain, rack, machine, numa, numa_second: None },
            1,
        ),
        &[domain, rack, machine, numa, second] => (
            RawCoordinate { domain, rack, machine, numa, numa_second: Some(second) },
            2,
        ),
        _ => return Err(ViolationKind::Malformed(line.to_string())),
    };
    if numas != expected_numas {
        return Err(ViolationKind::WrongNumaCount {
            expected: expected_numas,
            actual: numas,
        });
    }
    Ok(coord)
}

/// Convert a 1-based id into an index below `len`.
fn index(id: i64, len: usize) -> Option<usize> {
    usize::try_from(id).ok().filter(|&i| (1..=len).contains(&i)).map(|i| i - 1)
}

fn affinity<P>(problem: &ProblemReader<P>, code: i64) -> SessionResult<Affinity> {
    Affinity::from_code(code)
        .ok_or_else(|| problem.error(format!("invalid affinity level {code}")).into())
}

fn join<T: ToString>(values: &[T]) -> String {
    values.iter().map(ToString::to_string).collect::<Vec<_>>().join(" ")
}
