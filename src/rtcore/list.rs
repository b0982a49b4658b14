use super::{handshake::Fifo, ray_state::RayId, trv::LeafRequest};
use crate::bvh::{Bvh, NodeIdx, NodeKind, TriangleIdx};

/// One candidate triangle for the intersection unit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct TriangleJob {
    pub ray: RayId,
    pub triangle: TriangleIdx,
    /// Final candidate of the ray's current batch of leaves
    pub last: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
struct LeafEntry {
    ray: RayId,
    node: NodeIdx,
    last_leaf: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum SendState {
    Idle,
    Load(LeafEntry),
    Send {
        ray: RayId,
        next: TriangleIdx,
        last: TriangleIdx,
        last_leaf: bool,
    },
}

/// Leaf expansion: turns leaf nodes into a stream of one triangle per cycle.
#[derive(Clone, Debug)]
pub struct LeafExpansion {
    /// Second leaf of a pair request, enqueued in the cycle after the first
    pending: Option<LeafEntry>,
    queue: Fifo<LeafEntry>,
    send: SendState,
}

impl LeafExpansion {
    pub fn new(capacity: usize) -> LeafExpansion {
        LeafExpansion {
            pending: None,
            queue: Fifo::new(capacity),
            send: SendState::Idle,
        }
    }

    pub fn ready(&self) -> bool {
        self.pending.is_none() && self.queue.can_push()
    }

    pub fn output(&self) -> Option<TriangleJob> {
        match self.send {
            SendState::Send {
                ray,
                next,
                last,
                last_leaf,
            } => Some(TriangleJob {
                ray,
                triangle: next,
                last: last_leaf && next == last,
            }),
            _ => None,
        }
    }

    /// Nothing queued or being sent.
    pub fn is_idle(&self) -> bool {
        self.pending.is_none() && self.queue.is_empty() && self.send == SendState::Idle
    }

    /// `request` is the leaf request that transferred in this cycle, if any.
    /// The triangle on the output is always consumed, the intersection unit never stalls.
    pub fn clock(&mut self, request: Option<LeafRequest>, bvh: &Bvh) {
        let push = match self.pending {
            Some(second) if self.queue.can_push() => {
                self.pending = None;
                Some(second)
            }
            Some(_) => None,
            None => request.map(|request| {
                self.pending = request.second.map(|node| LeafEntry {
                    ray: request.ray,
                    node,
                    last_leaf: true,
                });
                LeafEntry {
                    ray: request.ray,
                    node: request.first,
                    last_leaf: request.second.is_none(),
                }
            }),
        };

        let (send, pop) = match self.send {
            SendState::Idle => match self.queue.head() {
                Some(entry) => (SendState::Load(entry), true),
                None => (SendState::Idle, false),
            },
            SendState::Load(entry) => {
                let NodeKind::Leaf { first, count } = bvh.node(entry.node).kind else {
                    unreachable!("internal node {} listed", entry.node)
                };
                assert!(count > 0, "listed leaf {} has no triangles", entry.node);
                let send = SendState::Send {
                    ray: entry.ray,
                    next: first,
                    last: first + (count as usize - 1),
                    last_leaf: entry.last_leaf,
                };
                (send, false)
            }
            SendState::Send { next, last, .. } if next == last => (SendState::Idle, false),
            SendState::Send {
                ray,
                next,
                last,
                last_leaf,
            } => {
                let send = SendState::Send {
                    ray,
                    next: next + 1,
                    last,
                    last_leaf,
                };
                (send, false)
            }
        };

        self.send = send;
        self.queue.clock(push, pop);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::scene::grid_scene;

    use assert2::assert;

    /// Runs a request through and collects the emitted jobs with their cycle numbers.
    fn expand(
        list: &mut LeafExpansion,
        request: LeafRequest,
        bvh: &Bvh,
    ) -> Vec<(usize, TriangleJob)> {
        assert!(list.ready());
        let mut jobs = Vec::new();
        list.clock(Some(request), bvh);
        for cycle in 1..100 {
            jobs.extend(list.output().map(|job| (cycle, job)));
            list.clock(None, bvh);
            if list.is_idle() {
                break;
            }
        }
        jobs
    }

    fn leaves(bvh: &Bvh) -> Vec<NodeIdx> {
        bvh.nodes()
            .indices()
            .filter(|index| bvh.node(*index).is_leaf())
            .collect()
    }

    #[test]
    fn single_leaf() {
        let bvh = Bvh::build(grid_scene(4, 4));
        let leaf = leaves(&bvh)[0];
        let ray = RayId::from_usize(3);
        let mut list = LeafExpansion::new(4);

        let request = LeafRequest {
            ray,
            first: leaf,
            second: None,
        };
        let jobs = expand(&mut list, request, &bvh);

        let expected: Vec<_> = bvh.node(leaf).triangle_indices().collect();
        assert!(jobs.iter().map(|(_, job)| job.triangle).collect::<Vec<_>>() == expected);
        assert!(jobs.iter().all(|(_, job)| job.ray == ray));
        // One triangle per cycle, only the final one tagged
        assert!(jobs.windows(2).all(|w| w[1].0 == w[0].0 + 1));
        assert!(jobs.iter().filter(|(_, job)| job.last).count() == 1);
        assert!(jobs.last().map(|(_, job)| job.last) == Some(true));
    }

    #[test]
    fn pair_of_leaves() {
        let bvh = Bvh::build(grid_scene(4, 4));
        let all = leaves(&bvh);
        let (a, b) = (all[0], all[1]);
        let mut list = LeafExpansion::new(4);

        let request = LeafRequest {
            ray: RayId::from_usize(0),
            first: a,
            second: Some(b),
        };
        list.clock(Some(request), &bvh);
        // Second leaf still pending
        assert!(!list.ready());

        let mut jobs = Vec::new();
        for _ in 0..100 {
            jobs.extend(list.output());
            list.clock(None, &bvh);
        }
        assert!(list.is_idle());

        let expected: Vec<_> = bvh
            .node(a)
            .triangle_indices()
            .chain(bvh.node(b).triangle_indices())
            .collect();
        assert!(jobs.iter().map(|job| job.triangle).collect::<Vec<_>>() == expected);
        assert!(jobs.iter().filter(|job| job.last).count() == 1);
        assert!(jobs.last().map(|job| job.last) == Some(true));
    }

    #[test]
    fn full_queue_holds_back() {
        let bvh = Bvh::build(grid_scene(4, 4));
        let all = leaves(&bvh);
        let mut list = LeafExpansion::new(1);

        let request = LeafRequest {
            ray: RayId::from_usize(0),
            first: all[0],
            second: Some(all[1]),
        };
        list.clock(Some(request), &bvh);
        // Queue holds the first leaf, the second waits for space
        assert!(!list.ready());
        list.clock(None, &bvh);
        assert!(!list.ready());
    }
}
