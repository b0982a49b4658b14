use super::{
    handshake::Fifo,
    ray_state::{PoolWrite, RayId},
};
use crate::geometry::RayRequest;

/// Ray descriptor allocator.
/// Hands out free pool slots to new rays and queues slots that are ready for traversal.
#[derive(Clone, Debug)]
pub struct RayDescriptors {
    free: Fifo<RayId>,
    working: Fifo<RayId>,
}

/// Wires driven by the allocator within a cycle.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RdSignals {
    pub alloc_ready: bool,
    /// Slot that an allocation in this cycle receives
    pub alloc_slot: Option<RayId>,
    /// Head of the working queue, offered to the traversal arbiter
    pub issue: Option<RayId>,
}

/// Handshakes involving the allocator that fire in a cycle.
#[derive(Copy, Clone, Debug, Default)]
pub struct RdTransfers {
    pub allocated: Option<(RayId, RayRequest)>,
    pub resumed: Option<RayId>,
    pub released: Option<RayId>,
    pub issued: bool,
}

impl RayDescriptors {
    pub fn new(slots: usize) -> RayDescriptors {
        RayDescriptors {
            free: Fifo::filled((0..slots).map(RayId::from_usize), slots),
            working: Fifo::new(slots),
        }
    }

    /// Allocation yields to a resuming ray, both would need the working queue's write port.
    pub fn signals(&self, resume: Option<RayId>) -> RdSignals {
        let alloc_slot = self.free.head();
        RdSignals {
            alloc_ready: alloc_slot.is_some() && resume.is_none(),
            alloc_slot,
            issue: self.working.head(),
        }
    }

    pub fn clock(&mut self, transfers: RdTransfers) -> Option<PoolWrite> {
        debug_assert!(transfers.allocated.is_none() || transfers.resumed.is_none());

        let allocated_slot = transfers.allocated.map(|(ray, _)| ray);
        self.free.clock(transfers.released, allocated_slot.is_some());
        self.working
            .clock(allocated_slot.or(transfers.resumed), transfers.issued);

        transfers
            .allocated
            .map(|(ray, request)| PoolWrite::Bind { ray, request })
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }
}
