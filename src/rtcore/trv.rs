use super::ray_state::{Continuation, PoolWrite, RayId, RayStatePool};
use crate::{
    bvh::{Bvh, NodeIdx},
    geometry::{AABB, SlabHit, SlabRay},
};

/// Leaves of one sibling pair that a ray has to intersect, handed from traversal to leaf
/// expansion.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct LeafRequest {
    pub ray: RayId,
    pub first: NodeIdx,
    pub second: Option<NodeIdx>,
}

/// Fieldless view of the traversal state, for statistics and logging.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum TrvPhase {
    Idle,
    Load,
    BboxLoad,
    Bbox,
    NodeLoad,
    Step,
    Store,
    ListPrep,
    List,
    Post,
}

/// Handshakes of the traversal engine that fire in a cycle.
#[derive(Copy, Clone, Debug, Default)]
pub struct TrvTransfers {
    pub accepted: Option<RayId>,
    pub listed: bool,
    pub posted: bool,
}

/// Traversal engine.
/// Walks one ray at a time through the tree, one sibling pair per pass through
/// `BboxLoad..Step`, until it either hits leaves or runs out of nodes.
/// Hit leaves are handed to leaf expansion and the ray leaves the engine; it comes back
/// once all candidate triangles are tested.
#[derive(Clone, Debug)]
pub enum Traversal {
    Idle,
    Load { ray: RayId },
    BboxLoad(Walk),
    Bbox(Walk),
    NodeLoad(Walk),
    Step(Walk),
    Store { walk: Walk, leaves: LeafRequest },
    ListPrep { leaves: LeafRequest },
    List { leaves: LeafRequest },
    Post { ray: RayId },
}

/// Registers held while a ray walks the tree.
#[derive(Clone, Debug)]
pub struct Walk {
    ray: RayId,
    slab: SlabRay,
    continuation: Continuation,
    /// Left node of the pair under test
    pair: NodeIdx,
    boxes: [AABB; 2],
    is_leaf: [bool; 2],
    hits: [SlabHit; 2],
    children: [Option<NodeIdx>; 2],
}

enum StepOutcome {
    Done,
    Leaves(LeafRequest),
    Continue,
}

impl Walk {
    fn start(ray: RayId, slab: SlabRay, continuation: Continuation) -> Walk {
        Walk {
            ray,
            slab,
            pair: continuation.left_node,
            continuation,
            boxes: [AABB::EMPTY; 2],
            is_leaf: [false; 2],
            hits: [SlabHit {
                hit: false,
                entry: 0.0,
            }; 2],
            children: [None; 2],
        }
    }

    fn pair_nodes(&self) -> [NodeIdx; 2] {
        [self.pair, self.pair.sibling()]
    }

    fn load_boxes(&mut self, bvh: &Bvh) {
        for (i, index) in self.pair_nodes().into_iter().enumerate() {
            let node = bvh.node(index);
            self.boxes[i] = node.bbox;
            self.is_leaf[i] = node.is_leaf();
        }
    }

    fn test_boxes(&mut self) {
        self.hits = self.boxes.map(|bbox| self.slab.test(&bbox));
    }

    fn load_children(&mut self, bvh: &Bvh) {
        self.children = self.pair_nodes().map(|index| bvh.node(index).left_child());
    }

    /// Hit leaves of the pair just tested, left first.
    fn hit_leaves(&self) -> Option<LeafRequest> {
        let mut leaves = self
            .pair_nodes()
            .into_iter()
            .zip(self.hits.iter().zip(&self.is_leaf))
            .filter(|(_, (hit, is_leaf))| hit.hit && **is_leaf)
            .map(|(index, _)| index);
        let first = leaves.next()?;
        Some(LeafRequest {
            ray: self.ray,
            first,
            second: leaves.next(),
        })
    }

    /// Picks the next pair to test from the hits of the current one.
    fn step(&mut self) -> StepOutcome {
        let stack_was_empty = self.continuation.stack.is_empty();
        let descend = [0, 1].map(|i| self.children[i].filter(|_| self.hits[i].hit));

        let cont = &mut self.continuation;
        match descend {
            [Some(left), Some(right)] => {
                let (near, far) = if self.hits[0].entry > self.hits[1].entry {
                    (right, left)
                } else {
                    (left, right)
                };
                cont.stack.push(far);
                cont.left_node = near;
            }
            [Some(child), None] | [None, Some(child)] => cont.left_node = child,
            [None, None] => match cont.stack.pop() {
                Some(deferred) => cont.left_node = deferred,
                None => cont.finished = true,
            },
        }

        if !self.hits[0].hit && !self.hits[1].hit && stack_was_empty {
            StepOutcome::Done
        } else if let Some(leaves) = self.hit_leaves() {
            StepOutcome::Leaves(leaves)
        } else {
            self.pair = self.continuation.left_node;
            StepOutcome::Continue
        }
    }
}

impl Traversal {
    pub fn phase(&self) -> TrvPhase {
        match self {
            Traversal::Idle => TrvPhase::Idle,
            Traversal::Load { .. } => TrvPhase::Load,
            Traversal::BboxLoad(_) => TrvPhase::BboxLoad,
            Traversal::Bbox(_) => TrvPhase::Bbox,
            Traversal::NodeLoad(_) => TrvPhase::NodeLoad,
            Traversal::Step(_) => TrvPhase::Step,
            Traversal::Store { .. } => TrvPhase::Store,
            Traversal::ListPrep { .. } => TrvPhase::ListPrep,
            Traversal::List { .. } => TrvPhase::List,
            Traversal::Post { .. } => TrvPhase::Post,
        }
    }

    /// Ready to take a new or resuming ray.
    pub fn ready(&self) -> bool {
        matches!(self, Traversal::Idle)
    }

    pub fn list_request(&self) -> Option<LeafRequest> {
        match self {
            Traversal::List { leaves } => Some(*leaves),
            _ => None,
        }
    }

    /// Ray whose traversal is complete, offered to the completion queue.
    pub fn post_request(&self) -> Option<RayId> {
        match self {
            Traversal::Post { ray } => Some(*ray),
            _ => None,
        }
    }

    pub fn clock(
        &mut self,
        transfers: TrvTransfers,
        pool: &RayStatePool,
        bvh: &Bvh,
    ) -> Option<PoolWrite> {
        let mut write = None;
        let current = std::mem::replace(self, Traversal::Idle);

        *self = match current {
            Traversal::Idle => match transfers.accepted {
                Some(ray) => Traversal::Load { ray },
                None => Traversal::Idle,
            },
            Traversal::Load { ray } => {
                let state = pool.get(ray);
                if state.continuation.finished {
                    Traversal::Post { ray }
                } else {
                    Traversal::BboxLoad(Walk::start(ray, state.slab, state.continuation.clone()))
                }
            }
            Traversal::BboxLoad(mut walk) => {
                walk.load_boxes(bvh);
                Traversal::Bbox(walk)
            }
            Traversal::Bbox(mut walk) => {
                walk.test_boxes();
                Traversal::NodeLoad(walk)
            }
            Traversal::NodeLoad(mut walk) => {
                walk.load_children(bvh);
                Traversal::Step(walk)
            }
            Traversal::Step(mut walk) => match walk.step() {
                StepOutcome::Done => Traversal::Post { ray: walk.ray },
                StepOutcome::Leaves(leaves) => Traversal::Store { walk, leaves },
                StepOutcome::Continue => Traversal::BboxLoad(walk),
            },
            Traversal::Store { walk, leaves } => {
                write = Some(PoolWrite::StoreContinuation {
                    ray: walk.ray,
                    continuation: walk.continuation,
                });
                Traversal::ListPrep { leaves }
            }
            Traversal::ListPrep { leaves } => Traversal::List { leaves },
            Traversal::List { leaves } => {
                if transfers.listed {
                    Traversal::Idle
                } else {
                    Traversal::List { leaves }
                }
            }
            Traversal::Post { ray } => {
                if transfers.posted {
                    Traversal::Idle
                } else {
                    Traversal::Post { ray }
                }
            }
        };

        write
    }
}
