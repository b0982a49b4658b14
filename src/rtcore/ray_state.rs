use arrayvec::ArrayVec;
use index_vec::IndexVec;
use itertools::Itertools as _;

use crate::{
    bvh::{NodeIdx, TRAVERSAL_STACK_DEPTH, TriangleIdx},
    geometry::{
        BarycentricCoordinates, Candidate, FloatType, RayRequest, SlabRay, WorldPoint, WorldVector,
    },
};

index_vec::define_index_type! {
    /// Slot in the ray state pool.
    /// Handed out by the allocator and owned by a single ray until the result is delivered.
    pub struct RayId = u32;
    DISPLAY_FORMAT = "{}";
}

/// Where a paused traversal picks up again.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Continuation {
    /// Left node of the next sibling pair to test
    pub left_node: NodeIdx,
    /// Left nodes of deferred pairs, nearest on top
    pub stack: ArrayVec<NodeIdx, TRAVERSAL_STACK_DEPTH>,
    pub finished: bool,
}

impl Continuation {
    /// Traversal that starts at the root's child pair.
    pub fn start() -> Continuation {
        Continuation {
            left_node: NodeIdx::root_pair(),
            stack: ArrayVec::new(),
            finished: false,
        }
    }
}

/// Final intersection reported for a ray.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Hit {
    pub triangle: TriangleIdx,
    pub t: FloatType,
    pub uv: BarycentricCoordinates,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RayState {
    /// The ray as requested; `tmax` shrinks to the distance of the best hit so far.
    pub ray: RayRequest,
    pub slab: SlabRay,
    pub continuation: Continuation,
    /// Triangle and coordinates of the best hit so far, its distance is `ray.tmax`
    pub best: Option<(TriangleIdx, BarycentricCoordinates)>,
}

impl RayState {
    fn bind(ray: RayRequest) -> RayState {
        RayState {
            slab: SlabRay::new(&ray),
            ray,
            continuation: Continuation::start(),
            best: None,
        }
    }

    fn vacant() -> RayState {
        RayState::bind(RayRequest::new(WorldPoint::origin(), WorldVector::z()))
    }

    pub fn hit(&self) -> Option<Hit> {
        self.best.map(|(triangle, uv)| Hit {
            triangle,
            t: self.ray.tmax,
            uv,
        })
    }
}

/// Register write to the pool, produced by a stage during a clock edge and applied at its end.
#[derive(Clone, Debug, PartialEq)]
pub enum PoolWrite {
    Bind {
        ray: RayId,
        request: RayRequest,
    },
    StoreContinuation {
        ray: RayId,
        continuation: Continuation,
    },
    RecordHit {
        ray: RayId,
        triangle: TriangleIdx,
        candidate: Candidate,
    },
    Release {
        ray: RayId,
    },
}

impl PoolWrite {
    pub fn ray(&self) -> RayId {
        match self {
            PoolWrite::Bind { ray, .. }
            | PoolWrite::StoreContinuation { ray, .. }
            | PoolWrite::RecordHit { ray, .. }
            | PoolWrite::Release { ray } => *ray,
        }
    }
}

/// Per slot state of all rays in flight.
/// Every slot is either free or owned by exactly one ray; binding an owned slot or touching a
/// free one is a bug in the pipeline and panics.
#[derive(Clone, Debug)]
pub struct RayStatePool {
    slots: IndexVec<RayId, RayState>,
    live: IndexVec<RayId, bool>,
}

impl RayStatePool {
    pub fn new(capacity: usize) -> RayStatePool {
        RayStatePool {
            slots: (0..capacity).map(|_| RayState::vacant()).collect(),
            live: IndexVec::from_vec(vec![false; capacity]),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn live_count(&self) -> usize {
        self.live.iter().filter(|live| **live).count()
    }

    pub fn is_live(&self, ray: RayId) -> bool {
        self.live[ray]
    }

    pub fn get(&self, ray: RayId) -> &RayState {
        assert!(self.live[ray], "ray slot {ray} read while free");
        &self.slots[ray]
    }

    /// Applies all writes of one clock edge. At most one write may target each slot.
    pub fn commit(&mut self, writes: impl IntoIterator<Item = PoolWrite>) {
        let writes: Vec<PoolWrite> = writes.into_iter().collect();
        assert!(
            writes.iter().map(PoolWrite::ray).all_unique(),
            "conflicting pool writes in one cycle: {writes:?}"
        );
        for write in writes {
            self.apply(write);
        }
    }

    fn apply(&mut self, write: PoolWrite) {
        match write {
            PoolWrite::Bind { ray, request } => {
                assert!(!self.live[ray], "ray slot {ray} allocated twice");
                self.live[ray] = true;
                self.slots[ray] = RayState::bind(request);
            }
            PoolWrite::StoreContinuation { ray, continuation } => {
                assert!(self.live[ray], "continuation stored to free slot {ray}");
                self.slots[ray].continuation = continuation;
            }
            PoolWrite::RecordHit {
                ray,
                triangle,
                candidate,
            } => {
                assert!(self.live[ray], "hit recorded to free slot {ray}");
                let state = &mut self.slots[ray];
                state.ray.tmax = candidate.t;
                state.best = Some((triangle, candidate.uv));
            }
            PoolWrite::Release { ray } => {
                assert!(self.live[ray], "free slot {ray} released");
                self.live[ray] = false;
            }
        }
    }
}
