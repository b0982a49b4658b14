//! Cycle level model of the traversal pipeline.
//!
//! Each `tick` is one clock cycle. First all wires are settled from the current registers,
//! then every stage computes its next registers from those wires and a snapshot of the ray
//! state pool, and finally all pool writes of the cycle are applied together.

mod driver;
mod handshake;
mod ist;
mod list;
mod post;
mod ray_state;
mod rd;
mod trv;

use std::{fmt, num::NonZeroUsize};

use thiserror::Error;

use crate::{
    bvh::{Bvh, BvhInvariantError},
    geometry::RayRequest,
};

pub use handshake::{Fifo, Grant, arbitrate};
pub use post::RayResult;
pub use ray_state::{Continuation, Hit, RayId, RayState, RayStatePool};
pub use trv::TrvPhase;

use ist::IstOutput;
use list::LeafExpansion;
use post::Completion;
use rd::{RayDescriptors, RdTransfers};
use trv::{LeafRequest, Traversal, TrvTransfers};

pub const DEFAULT_MAX_WORKING_RAYS: NonZeroUsize = NonZeroUsize::new(16).unwrap();
pub const DEFAULT_WATCHDOG_CYCLES: u64 = 1_000_000;

/// Path a ray takes back into traversal after its leaf candidates are tested.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum ResumeRoute {
    /// Dedicated queue with priority over fresh rays
    #[default]
    TraversalFifo,
    /// Shares the allocator's working queue, new allocations wait in that cycle
    WorkingQueue,
}

#[derive(Clone, Debug, PartialEq, Eq, bon::Builder)]
pub struct CoreConfig {
    /// Number of ray state slots, the limit of rays in flight
    #[builder(default = DEFAULT_MAX_WORKING_RAYS)]
    pub max_working_rays: NonZeroUsize,
    #[builder(default)]
    pub resume_route: ResumeRoute,
    /// Cycles without any handshake on the ray or result ports before the driver gives up,
    /// 0 disables the check
    #[builder(default = DEFAULT_WATCHDOG_CYCLES)]
    pub watchdog_cycles: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        CoreConfig::builder().build()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{requested} working rays do not fit the ray id range")]
    TooManyWorkingRays { requested: usize },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CoreError {
    #[error("BVH root is a leaf, use Bvh::with_internal_root")]
    RootIsLeaf,

    #[error("Invalid BVH: {0}")]
    InvalidBvh(#[from] BvhInvariantError),

    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Core is still busy with {in_flight} rays")]
    Busy { in_flight: usize },

    #[error("No progress for {cycles} cycles with {in_flight} rays in flight")]
    Watchdog { cycles: u64, in_flight: usize },

    #[error("Result delivered for ray slot {ray} that was not issued by this batch")]
    UnexpectedResult { ray: RayId },
}

/// Inputs driven into the core for one cycle.
#[derive(Copy, Clone, Debug, Default)]
pub struct CoreInputs {
    /// New ray offered to the allocator
    pub request: Option<RayRequest>,
    /// Consumer is ready to take a result
    pub result_ready: bool,
}

/// Port activity of one cycle.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TickReport {
    pub request_ready: bool,
    /// Slot assigned to the request, if it was accepted
    pub accepted: Option<RayId>,
    /// Result offered on the result port
    pub result: Option<RayResult>,
    /// Whether `result` was taken by the consumer
    pub delivered: bool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CoreStats {
    pub cycles: u64,
    pub rays_accepted: u64,
    pub rays_completed: u64,
    pub node_pair_visits: u64,
    pub triangle_tests: u64,
    pub hits_recorded: u64,
    pub peak_occupancy: usize,
}

impl fmt::Display for CoreStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} cycles, {} rays accepted, {} completed",
            self.cycles, self.rays_accepted, self.rays_completed
        )?;
        writeln!(
            f,
            "{} node pair visits, {} triangle tests, {} hits recorded",
            self.node_pair_visits, self.triangle_tests, self.hits_recorded
        )?;
        write!(f, "Peak occupancy: {} rays", self.peak_occupancy)
    }
}

/// Settled combinational values of one cycle.
#[derive(Clone, Debug)]
struct Wires {
    request_ready: bool,
    allocated: Option<(RayId, RayRequest)>,
    ist: Option<IstOutput>,
    /// Resume into the traversal FIFO
    trv_resume: Option<RayId>,
    /// Resume into the allocator's working queue
    rd_resume: Option<RayId>,
    trv_fifo_pop: bool,
    working_pop: bool,
    trv_accepted: Option<RayId>,
    listed: Option<LeafRequest>,
    posted: Option<RayId>,
    post_accepted: Option<RayId>,
    result: Option<RayResult>,
    delivered: bool,
}

/// The accelerator: allocator, traversal, leaf expansion, intersection and completion stages
/// over a shared, read only BVH.
#[derive(Clone, Debug)]
pub struct RtCore {
    config: CoreConfig,
    bvh: Bvh,
    pool: RayStatePool,
    rd: RayDescriptors,
    trv_fifo: Fifo<RayId>,
    trv: Traversal,
    list: LeafExpansion,
    post_fifo: Fifo<RayId>,
    post: Completion,
    stats: CoreStats,
}

impl RtCore {
    pub fn new(bvh: Bvh, config: CoreConfig) -> Result<RtCore, CoreError> {
        if bvh.root().is_leaf() {
            return Err(CoreError::RootIsLeaf);
        }
        bvh.validate()?;

        let slots = config.max_working_rays.get();
        if slots > u32::MAX as usize {
            return Err(ConfigError::TooManyWorkingRays { requested: slots }.into());
        }

        tracing::debug!(
            slots,
            resume_route = ?config.resume_route,
            nodes = bvh.nodes().len(),
            "core created"
        );

        Ok(RtCore {
            pool: RayStatePool::new(slots),
            rd: RayDescriptors::new(slots),
            trv_fifo: Fifo::new(slots),
            trv: Traversal::Idle,
            list: LeafExpansion::new(slots),
            post_fifo: Fifo::new(slots),
            post: Completion::default(),
            stats: CoreStats::default(),
            config,
            bvh,
        })
    }

    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    pub fn bvh(&self) -> &Bvh {
        &self.bvh
    }

    pub fn stats(&self) -> &CoreStats {
        &self.stats
    }

    pub fn pool(&self) -> &RayStatePool {
        &self.pool
    }

    pub fn trv_phase(&self) -> TrvPhase {
        self.trv.phase()
    }

    /// Number of rays between allocation and delivery of their result.
    pub fn in_flight(&self) -> usize {
        self.pool.live_count()
    }

    /// Advances the model by one clock cycle.
    pub fn tick(&mut self, inputs: &CoreInputs) -> TickReport {
        let wires = self.settle(inputs);
        let report = TickReport {
            request_ready: wires.request_ready,
            accepted: wires.allocated.map(|(ray, _)| ray),
            result: wires.result,
            delivered: wires.delivered,
        };

        self.update_stats(&wires);
        self.commit(wires);
        self.stats.peak_occupancy = self.stats.peak_occupancy.max(self.pool.live_count());

        report
    }

    /// Derives all wires of the cycle from the current registers, in dependency order.
    fn settle(&self, inputs: &CoreInputs) -> Wires {
        let ist = self
            .list
            .output()
            .map(|job| ist::intersect(&job, &self.pool, &self.bvh));
        let resume = ist.as_ref().and_then(|output| output.resume);
        let (trv_resume, rd_resume) = match self.config.resume_route {
            ResumeRoute::TraversalFifo => (resume, None),
            ResumeRoute::WorkingQueue => (None, resume),
        };

        let rd = self.rd.signals(rd_resume);
        let allocated = rd
            .alloc_slot
            .zip(inputs.request)
            .filter(|_| rd.alloc_ready);

        let trv_ready = self.trv.ready();
        let trv_fifo_head = self.trv_fifo.head();
        let grant = arbitrate(trv_fifo_head, rd.issue, trv_ready);
        let trv_accepted = grant.output.filter(|_| trv_ready);

        let listed = self.trv.list_request().filter(|_| self.list.ready());
        let posted = self
            .trv
            .post_request()
            .filter(|_| self.post_fifo.can_push());
        let post_accepted = self.post_fifo.head().filter(|_| self.post.ready());

        let result = self.post.output();

        Wires {
            request_ready: rd.alloc_ready,
            allocated,
            ist,
            trv_resume,
            rd_resume,
            trv_fifo_pop: trv_fifo_head.is_some() && grant.high_ready,
            working_pop: rd.issue.is_some() && grant.low_ready,
            trv_accepted,
            listed,
            posted,
            post_accepted,
            result,
            delivered: result.is_some() && inputs.result_ready,
        }
    }

    /// Clocks every stage with the settled wires, then applies the pool writes.
    fn commit(&mut self, wires: Wires) {
        let mut writes = Vec::with_capacity(4);
        let released = wires.result.filter(|_| wires.delivered).map(|result| result.ray);

        writes.extend(self.rd.clock(RdTransfers {
            allocated: wires.allocated,
            resumed: wires.rd_resume,
            released,
            issued: wires.working_pop,
        }));

        self.trv_fifo.clock(wires.trv_resume, wires.trv_fifo_pop);

        writes.extend(self.trv.clock(
            TrvTransfers {
                accepted: wires.trv_accepted,
                listed: wires.listed.is_some(),
                posted: wires.posted.is_some(),
            },
            &self.pool,
            &self.bvh,
        ));

        self.list.clock(wires.listed, &self.bvh);
        writes.extend(wires.ist.and_then(|output| output.write));

        self.post_fifo.clock(wires.posted, wires.post_accepted.is_some());
        writes.extend(
            self.post
                .clock(wires.post_accepted, wires.delivered, &self.pool),
        );

        self.pool.commit(writes);
    }

    fn update_stats(&mut self, wires: &Wires) {
        let stats = &mut self.stats;
        stats.cycles += 1;
        if let Some((ray, request)) = &wires.allocated {
            stats.rays_accepted += 1;
            tracing::trace!(
                %ray,
                origin = ?request.origin,
                direction = ?request.direction,
                "ray accepted"
            );
        }
        if let Some(result) = wires.result.filter(|_| wires.delivered) {
            stats.rays_completed += 1;
            tracing::trace!(ray = %result.ray, hit = ?result.hit, "ray completed");
        }
        if self.trv.phase() == TrvPhase::Bbox {
            stats.node_pair_visits += 1;
        }
        if let Some(output) = &wires.ist {
            stats.triangle_tests += 1;
            if output.write.is_some() {
                stats.hits_recorded += 1;
            }
        }
    }
}
