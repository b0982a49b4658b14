use super::ray_state::{Hit, PoolWrite, RayId, RayStatePool};

/// Completed ray as presented on the result port.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct RayResult {
    pub ray: RayId,
    pub hit: Option<Hit>,
}

/// Completion stage, holds a single result until the consumer takes it.
#[derive(Clone, Debug, Default)]
pub struct Completion {
    held: Option<RayResult>,
}

impl Completion {
    pub fn ready(&self) -> bool {
        self.held.is_none()
    }

    pub fn output(&self) -> Option<RayResult> {
        self.held
    }

    /// Latches the result of `accepted`, or releases the held slot once it is `delivered`.
    pub fn clock(
        &mut self,
        accepted: Option<RayId>,
        delivered: bool,
        pool: &RayStatePool,
    ) -> Option<PoolWrite> {
        if let Some(ray) = accepted {
            debug_assert!(self.held.is_none());
            self.held = Some(RayResult {
                ray,
                hit: pool.get(ray).hit(),
            });
            return None;
        }

        if delivered {
            let result = self.held.take()?;
            return Some(PoolWrite::Release { ray: result.ray });
        }
        None
    }
}
